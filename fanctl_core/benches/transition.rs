use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fanctl_core::controller::{FanState, transition};
use fanctl_core::sampler::RunningAverage;

// Slowly drifting trace crossing the whole control band
fn synth_trace(n: usize) -> Vec<u16> {
    (0..n)
        .map(|i| 280 + ((i / 7) % 70) as u16)
        .collect()
}

pub fn bench_transition(c: &mut Criterion) {
    let trace = synth_trace(4096);
    c.bench_function("transition_over_trace", |b| {
        b.iter(|| {
            let mut state = FanState::Startup;
            let mut dwell = 0u16;
            let mut acc = 0u32;
            for &avg in &trace {
                let t = transition(state, dwell, black_box(avg));
                state = t.state;
                dwell = t.dwell;
                acc = acc.wrapping_add(u32::from(t.duty));
            }
            black_box(acc)
        })
    });
    c.bench_function("running_average_push", |b| {
        b.iter(|| {
            let mut avg = RunningAverage::new();
            for &raw in &trace {
                avg.push(black_box(raw));
            }
            black_box(avg.average())
        })
    });
}

criterion_group!(benches, bench_transition);
criterion_main!(benches);
