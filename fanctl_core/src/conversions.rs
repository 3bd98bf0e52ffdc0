//! `From` implementations bridging `fanctl_config` types to `fanctl_core` types.

use crate::config::RunCfg;

impl From<&fanctl_config::Timing> for RunCfg {
    fn from(c: &fanctl_config::Timing) -> Self {
        Self {
            tick_ms: c.tick_ms,
            watchdog_ms: c.watchdog_ms,
            max_ticks: None,
        }
    }
}

impl From<&fanctl_config::Config> for RunCfg {
    fn from(c: &fanctl_config::Config) -> Self {
        (&c.timing).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_maps_onto_run_cfg() {
        let t = fanctl_config::Timing {
            tick_ms: 10,
            watchdog_ms: 500,
        };
        let cfg: RunCfg = (&t).into();
        assert_eq!(
            cfg,
            RunCfg {
                tick_ms: 10,
                watchdog_ms: 500,
                max_ticks: None
            }
        );
    }
}
