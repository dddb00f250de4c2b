//! Simulation loop that drives the controller, the track, and the grid profiles.

use tracing::{info, trace};

use crate::error::{StorageError, StorageResult};
use crate::sources::PowerProfile;
use crate::storage::CartTrack;

use super::clock::Clock;
use super::controller::Controller;
use super::kpi::KpiReport;
use super::power_balance::{difference_w, satisfaction};
use super::types::{SimConfig, StepResult};

/// Simulation engine owning the track, the controller, and both profiles.
///
/// Generic over the supply and demand profiles for static dispatch. One
/// instance covers exactly one run; nothing is shared between runs.
pub struct Simulation<S: PowerProfile, D: PowerProfile> {
    config: SimConfig,
    track: CartTrack,
    controller: Controller,
    supply: S,
    demand: D,
    clock: Clock,
}

impl<S: PowerProfile, D: PowerProfile> Simulation<S, D> {
    /// Creates a new simulation.
    ///
    /// # Arguments
    ///
    /// * `config` - Run timing
    /// * `track` - Storage engine in its initial state
    /// * `controller` - Feedback controller built for `config.dt_s`
    /// * `supply` - Generation profile
    /// * `demand` - Consumption profile
    ///
    /// # Errors
    ///
    /// Returns `StorageError::StepMismatch` if the controller was built for a
    /// different tick, and the `SimConfig::validate` errors for bad timing.
    pub fn new(
        config: SimConfig,
        track: CartTrack,
        controller: Controller,
        supply: S,
        demand: D,
    ) -> StorageResult<Self> {
        config.validate()?;
        if controller.dt() != config.dt_s {
            return Err(StorageError::StepMismatch {
                run_dt: config.dt_s,
                controller_dt: controller.dt(),
            });
        }
        let clock = Clock::new(config.dt_s, config.end_s());
        Ok(Self {
            config,
            track,
            controller,
            supply,
            demand,
            clock,
        })
    }

    /// Executes one tick and returns its telemetry, or `None` once the end
    /// time has been passed.
    ///
    /// Order within the tick is fixed: sample the profiles, let the
    /// controller sweep, inject, and set the generator force, then integrate
    /// the physics.
    pub fn step(&mut self) -> Option<StepResult> {
        let (timestep, time_s) = self.clock.tick()?;
        let dt = self.clock.dt();

        let supply_w = self.supply.sample_at(time_s, self.config.start_day);
        let demand_w = self.demand.sample_at(time_s, self.config.start_day);

        let decision = self.controller.update(&mut self.track, supply_w, demand_w);
        let velocity_mps = self.track.velocity();
        let report = self.track.do_tick(dt);

        trace!(
            timestep,
            velocity = velocity_mps,
            carts = self.track.carts_on_track(),
            force = decision.generator_force_n,
            acceleration = report.acceleration,
            removed = decision.removed,
            losses_j = report.losses.total_j(),
            "tick"
        );

        let storage_w = report.power_w;
        Some(StepResult {
            timestep,
            time_s,
            supply_w,
            demand_w,
            storage_w,
            difference_w: difference_w(supply_w, demand_w, storage_w),
            satisfaction: satisfaction(supply_w, demand_w, storage_w),
            velocity_mps,
            generator_force_n: decision.generator_force_n,
            friction_loss_j: report.losses.friction_j,
            efficiency_loss_j: report.losses.efficiency_j,
            carts_on_track: self.track.carts_on_track(),
            reserve_top: self.track.reserve_top(),
            reserve_bottom: self.track.reserve_bottom(),
        })
    }

    /// Executes all remaining ticks and returns the complete step record vector.
    pub fn run(&mut self) -> Vec<StepResult> {
        info!(
            supply = self.supply.name(),
            demand = self.demand.name(),
            dt_s = self.config.dt_s,
            end_s = self.config.end_s(),
            steps = self.clock.total_steps(),
            carts = self.track.total_carts(),
            "simulation started"
        );

        let mut results = Vec::with_capacity(self.clock.total_steps());
        while let Some(result) = self.step() {
            results.push(result);
        }

        let kpi = self.kpi(&results);
        info!(
            steps = results.len(),
            rmse_kw = kpi.rmse_difference_kw,
            mean_satisfaction = kpi.mean_satisfaction,
            "simulation finished"
        );
        results
    }

    /// KPIs of `results` with this run's tick length and warm-up.
    pub fn kpi(&self, results: &[StepResult]) -> KpiReport {
        KpiReport::from_results(results, self.config.dt_s, self.config.warmup_s)
    }

    pub fn track(&self) -> &CartTrack {
        &self.track
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
