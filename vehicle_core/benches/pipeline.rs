use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vehicle_core::accel::LowPass3;
use vehicle_core::light::DayNightModel;
use vehicle_core::speed::SpeedModel;
use vehicle_core::{AccelState, Direction, LightCfg, ProximityCfg, SpeedCfg, classify};
use vehicle_traits::RawSample;

fn bench_filter_and_speed(c: &mut Criterion) {
    c.bench_function("lowpass_plus_speed_update", |b| {
        let mut f = LowPass3::new(0.8);
        let mut m = SpeedModel::new(SpeedCfg::default());
        let raw = RawSample::new(0.02, 0.4, 0.98);
        b.iter(|| {
            let [x, y, z] = f.apply(black_box(&raw));
            let snap = AccelState {
                filtered_x: x,
                filtered_y: y,
                filtered_z: z,
                magnitude_horizontal: (x * x + y * y).sqrt(),
                valid: true,
                ..AccelState::default()
            };
            black_box(m.update(&snap));
        });
    });
}

fn bench_classifiers(c: &mut Criterion) {
    let cfg = ProximityCfg::default();
    c.bench_function("proximity_classify", |b| {
        b.iter(|| {
            for d in (0..400).step_by(7) {
                black_box(classify(black_box(d), Direction::Forward, &cfg));
            }
        });
    });
    c.bench_function("day_night_update", |b| {
        let mut m = DayNightModel::new(LightCfg::default());
        let mut lux = 0.0;
        b.iter(|| {
            lux = (lux + 13.0) % 200.0;
            black_box(m.update(black_box(lux)));
        });
    });
}

criterion_group!(benches, bench_filter_and_speed, bench_classifiers);
criterion_main!(benches);
