use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tracker_core::{AxisCfg, ModeSupervisor, SupervisorCfg};
use tracker_hardware::{PlantAxis, PlantParams, SimPlant};
use tracker_traits::clock::test_clock::TestClock;

fn build(plant: &SimPlant) -> ModeSupervisor {
    let cfg = SupervisorCfg::default();
    let active_high = cfg.endstop.active_high;
    match ModeSupervisor::builder()
        .with_config(cfg)
        .with_axis_h(
            AxisCfg::default(),
            plant.light_pair(PlantAxis::H),
            Some(Box::new(plant.bridge(PlantAxis::H))),
        )
        .with_axis_v(
            AxisCfg::default(),
            plant.light_pair(PlantAxis::V),
            Some(Box::new(plant.bridge(PlantAxis::V))),
        )
        .with_limits(plant.limits(PlantAxis::H, active_high))
        .build()
    {
        Ok(sup) => sup,
        Err(e) => panic!("build supervisor: {e:?}"),
    }
}

pub fn bench_supervisor_tick(c: &mut Criterion) {
    let mut g = c.benchmark_group("supervisor_tick");
    // Allow quick tweaking without CLI flags:
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p tracker_core --bench supervisor_tick
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for &ticks in &[1_000u64, 10_000] {
        g.bench_function(format!("ticks_{ticks}"), |b| {
            b.iter_batched(
                || {
                    let clock = TestClock::new();
                    let plant = SimPlant::new(PlantParams::default(), clock.clone());
                    let sup = build(&plant);
                    (clock, plant, sup)
                },
                |(clock, _plant, mut sup)| {
                    for t in 0..ticks {
                        clock.set_ms(t);
                        let outcome = sup.tick(black_box(t));
                        black_box(outcome.is_ok());
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(supervisor, bench_supervisor_tick);
criterion_main!(supervisor);
