//! Temperature sampling: noise averaging and the ADC-complete context.
//!
//! `TemperatureSampler` owns the accumulator and publishes the windowed
//! average through a `SharedAverage`, the only value crossing from the
//! conversion context into the tick context. `AdcWorker` runs the
//! conversion context on its own thread: every armed request performs one
//! single-shot read and feeds the sampler.
//!
//! Each `AdcWorker` spawns exactly one thread, shut down and joined when the
//! worker is stopped or dropped; stopping hands the sensor back so a reset
//! can start a fresh context on the same hardware.
use crossbeam_channel as xch;
use fanctl_traits::TemperatureSensor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};

/// Signed offset added to every raw conversion so that ADC 300 reads as 25 °C.
/// Shifting it moves the whole working range up or down.
pub const CALIBRATION_OFFSET: i16 = -3;

/// Samples per averaging window.
pub const WINDOW: u8 = 20;

/// Calibrated value of one raw reading. Signed, so readings below the
/// offset still contribute their exact value to the window sum.
#[inline]
pub fn calibrate(raw: u16) -> i32 {
    i32::from(raw) + i32::from(CALIBRATION_OFFSET)
}

/// Clamp a calibrated value onto the published u16 scale.
#[inline]
fn publish(v: i32) -> u16 {
    v.clamp(0, i32::from(u16::MAX)) as u16
}

/// Block average over `WINDOW` calibrated samples.
///
/// `average == 0` doubles as the "no data yet" sentinel: the first sample
/// after boot or reset is published immediately instead of waiting for a
/// full window. Only the published value is clamped; the window sum is
/// exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningAverage {
    accumulator: i32,
    count: u8,
    average: u16,
}

impl RunningAverage {
    pub const fn new() -> Self {
        Self {
            accumulator: 0,
            count: 0,
            average: 0,
        }
    }

    /// Add one raw reading; returns the (possibly unchanged) average.
    pub fn push(&mut self, raw: u16) -> u16 {
        let sample = calibrate(raw);
        // at most 20 * 1023-ish per window, far from overflow
        self.accumulator += sample;
        if self.average == 0 {
            self.average = publish(sample);
        }
        self.count += 1;
        if self.count >= WINDOW {
            self.average = publish(self.accumulator.div_euclid(i32::from(WINDOW)));
            self.accumulator = 0;
            self.count = 0;
        }
        self.average
    }

    #[inline]
    pub fn average(&self) -> u16 {
        self.average
    }

    /// Samples accumulated in the current window (0..WINDOW).
    #[inline]
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Sum of calibrated samples in the current window.
    #[inline]
    pub fn accumulator(&self) -> i32 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Single-word cell carrying the published average between contexts.
///
/// The value is one atomic u16, so no reader can observe a torn update.
#[derive(Debug, Clone, Default)]
pub struct SharedAverage(Arc<AtomicU16>);

impl SharedAverage {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn load(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, v: u16) {
        self.0.store(v, Ordering::Release);
    }

    /// Back to the unseeded sentinel.
    pub fn reset(&self) {
        self.store(0);
    }
}

/// Conversion-complete handler: calibrate, accumulate, publish.
#[derive(Debug)]
pub struct TemperatureSampler {
    window: RunningAverage,
    shared: SharedAverage,
}

impl TemperatureSampler {
    /// Creates a sampler publishing into `shared`, starting unseeded.
    pub fn new(shared: SharedAverage) -> Self {
        shared.reset();
        Self {
            window: RunningAverage::new(),
            shared,
        }
    }

    /// Handle one finished conversion; returns the published average.
    pub fn on_conversion_complete(&mut self, raw: u16) -> u16 {
        let avg = self.window.push(raw);
        self.shared.store(avg);
        tracing::trace!(raw, avg, count = self.window.count(), "adc sample");
        avg
    }

    pub fn window(&self) -> &RunningAverage {
        &self.window
    }

    pub fn shared(&self) -> &SharedAverage {
        &self.shared
    }

    /// Drop the partial window and return to the unseeded sentinel.
    pub fn reset(&mut self) {
        self.window.reset();
        self.shared.reset();
    }
}

/// Threaded conversion context.
///
/// `arm()` requests one conversion; at most one request is pending at a
/// time, so a slow sensor never queues up a backlog of stale reads.
pub struct AdcWorker<S: TemperatureSensor + Send + 'static> {
    tx: Option<xch::Sender<()>>,
    shutdown: Arc<AtomicBool>,
    failures: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<S>>,
}

impl<S: TemperatureSensor + Send + 'static> AdcWorker<S> {
    pub fn spawn(mut sensor: S, mut sampler: TemperatureSampler) -> Self {
        let (tx, rx) = xch::bounded::<()>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let failures = Arc::new(AtomicU64::new(0));
        let failures_clone = failures.clone();

        let join_handle = std::thread::spawn(move || {
            // recv() fails once the tick side drops its sender
            while rx.recv().is_ok() {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("adc worker received shutdown signal");
                    break;
                }
                match sensor.read() {
                    Ok(raw) => {
                        sampler.on_conversion_complete(raw);
                    }
                    Err(e) => {
                        // Skip the sample; the next tick re-arms
                        let n = failures_clone.fetch_add(1, Ordering::Relaxed) + 1;
                        let err = crate::hw_error::map_sensor_error(&*e);
                        tracing::warn!(error = %err, failures = n, "conversion failed");
                    }
                }
            }
            tracing::trace!("adc worker exiting cleanly");
            sensor
        });

        Self {
            tx: Some(tx),
            shutdown,
            failures,
            join_handle: Some(join_handle),
        }
    }

    /// Request the next conversion. Returns false if one is still pending.
    pub fn arm(&self) -> bool {
        match &self.tx {
            Some(tx) => tx.try_send(()).is_ok(),
            None => false,
        }
    }

    /// Number of failed conversions since spawn.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Stop the thread and take the sensor back. `None` if the thread panicked.
    pub fn stop(mut self) -> Option<S> {
        self.join()
    }

    fn join(&mut self) -> Option<S> {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnect so a blocked recv() returns immediately
        self.tx.take();
        let handle = self.join_handle.take()?;
        match handle.join() {
            Ok(sensor) => {
                tracing::trace!("adc worker joined successfully");
                Some(sensor)
            }
            Err(e) => {
                tracing::warn!(?e, "adc worker panicked during shutdown");
                None
            }
        }
    }
}

impl<S: TemperatureSensor + Send + 'static> Drop for AdcWorker<S> {
    fn drop(&mut self) {
        let _ = self.join();
    }
}
