// benches/bench_phase_layout.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use signal_preemption::control_system::DurationPolicy;
use signal_preemption::models::{Approach, Phase};
use std::time::Duration;

fn bench_phase_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_layout");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    let order = [Approach::East, Approach::South, Approach::West, Approach::North];
    let policy = DurationPolicy::Adaptive {
        cars_per_second: 5,
        min_green_time: 10,
        max_green_time: 30,
    };

    group.bench_function("normal_rotation_ticks", |b| {
        b.iter(|| {
            for index in 0..order.len() {
                let duration = policy.green_duration(black_box(index as u32 * 4));
                let mut phase = Phase::normal(&order, index, duration);
                phase.remaining_seconds = duration / 2;
                black_box(phase.tick_event(1));
            }
        });
    });

    group.bench_function("emergency_layout", |b| {
        b.iter(|| {
            let phase = Phase::emergency(&order, black_box(1), 10);
            black_box(phase.check_conflicts());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_phase_layout);
criterion_main!(benches);
