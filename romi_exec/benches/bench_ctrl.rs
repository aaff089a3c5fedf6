//! # Controller Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use romi_lib::{
    cmd::{CmdMode, Command, NavPlan},
    ctrl::{Controller, CtrlParams, WheelSpeedCtrl, WheelSpeedParams},
    seq::{SeqParams, Sequencer},
    sim::{Sim, SimParams}
};
use util::{module::State, time::Ticks};

fn ctrl_benchmark(c: &mut Criterion) {
    // ---- Single wheel speed controller cycle ----

    let mut wheel = WheelSpeedCtrl::new(&WheelSpeedParams::default()).unwrap();
    wheel.set_target(150.0);
    let mut ticks: Ticks = 0;

    c.bench_function("wheel_speed_get_action", |b| b.iter(|| {
        ticks = ticks.wrapping_add(10_000);
        wheel.get_action(black_box(ticks), black_box(600.0))
    }));

    // ---- Full sequencer cycle ----

    // A line follow command that never completes, so every iteration runs
    // the controllers
    let plan = NavPlan::new(vec![
        Command::new(CmdMode::LineFollow, 1E12, 150.0, None).unwrap()
    ]).unwrap();

    let mut seq = Sequencer::new(CtrlParams::default(), SeqParams::default()).unwrap();
    seq.begin_plan(plan).unwrap();

    let mut sim = Sim::new(SimParams {
        start_y_mm: 5.0,
        ..Default::default()
    });

    c.bench_function("sequencer_cycle", |b| b.iter(|| {
        let (dems, _) = seq.proc(black_box(&sim.frame())).unwrap();
        sim.step(&dems, 0.01);
    }));
}

criterion_group!(benches, ctrl_benchmark);
criterion_main!(benches);
