use criterion::{criterion_group, criterion_main, Criterion};
use sim_core::Variant;
use sim_runtime::{start, ScenarioKind, StartOptions};

fn bench_full_runs(c: &mut Criterion) {
    for kind in ScenarioKind::ALL {
        let opts = StartOptions {
            seed: Some(42),
            variant: Variant::HardRules,
            ..StartOptions::new(kind)
        };
        c.bench_function(&format!("{kind}_full_run"), |b| {
            b.iter(|| {
                let mut sim = start(&opts).expect("default config starts");
                while !sim.is_complete() {
                    let _ = sim.advance();
                }
                sim.get_full_score()
            })
        });
    }
}

fn bench_snapshot_round_trip(c: &mut Criterion) {
    let opts = StartOptions {
        seed: Some(7),
        ..StartOptions::new(ScenarioKind::FlashCrash)
    };
    let mut sim = start(&opts).expect("default config starts");
    for _ in 0..36 {
        let _ = sim.advance();
    }
    c.bench_function("flash_crash_snapshot_restore", |b| {
        b.iter(|| {
            let snapshot = sim.to_dict().expect("serializable");
            sim_runtime::restore(snapshot).expect("restorable")
        })
    });
}

criterion_group!(benches, bench_full_runs, bench_snapshot_round_trip);
criterion_main!(benches);
