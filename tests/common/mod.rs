//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use gravity_rail_sim::config::ScenarioConfig;
use gravity_rail_sim::sim::controller::{Controller, ControllerParams};
use gravity_rail_sim::sim::engine::Simulation;
use gravity_rail_sim::sim::types::{SimConfig, StepResult};
use gravity_rail_sim::sources::{ConstantProfile, Demand, Supply};
use gravity_rail_sim::storage::{CartTrack, TrackParams};

/// Tick length shared by the fixtures (s).
pub const DT_S: f64 = 10.0;

/// Six simulated hours without warm-up.
pub fn short_config() -> SimConfig {
    SimConfig::new(DT_S, 6.0 * 3600.0).expect("valid timing")
}

/// Default track with `reserve` carts parked at each end.
pub fn default_track(reserve: usize) -> CartTrack {
    CartTrack::new(TrackParams::default(), reserve, reserve).expect("default params are valid")
}

/// Default controller for [`DT_S`] ticks.
pub fn default_controller() -> Controller {
    Controller::new(ControllerParams::default(), DT_S).expect("default limits are valid")
}

/// Simulation against constant supply and demand.
pub fn constant_simulation(
    supply_w: f64,
    demand_w: f64,
    reserve: usize,
) -> Simulation<ConstantProfile, ConstantProfile> {
    Simulation::new(
        short_config(),
        default_track(reserve),
        default_controller(),
        ConstantProfile(supply_w),
        ConstantProfile(demand_w),
    )
    .expect("fixture ticks match")
}

/// Baseline preset shortened to `duration_s` after a ten-minute warm-up.
pub fn baseline_simulation(duration_s: f64) -> Simulation<Supply, Demand> {
    preset_simulation("baseline", duration_s)
}

/// Named preset shortened to `duration_s` after a ten-minute warm-up.
pub fn preset_simulation(name: &str, duration_s: f64) -> Simulation<Supply, Demand> {
    let mut cfg = ScenarioConfig::from_preset(name).expect("known preset");
    cfg.simulation.duration_s = duration_s;
    cfg.simulation.warmup_s = 600.0;
    cfg.build_simulation().expect("preset builds")
}

/// Asserts the invariants every telemetry row must satisfy.
pub fn assert_row_invariants(r: &StepResult, total_carts: usize) {
    assert_eq!(
        r.carts_on_track + r.reserve_top + r.reserve_bottom,
        total_carts,
        "cart count not conserved at tick {}",
        r.timestep
    );
    assert!(r.velocity_mps.is_finite(), "velocity not finite at tick {}", r.timestep);
    assert!(r.storage_w.is_finite(), "storage power not finite at tick {}", r.timestep);
    assert!(r.generator_force_n >= 0.0, "negative generator force at tick {}", r.timestep);
    assert!(r.friction_loss_j >= 0.0);
    assert!(r.efficiency_loss_j >= 0.0);
}
