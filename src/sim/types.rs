//! Core simulation types: run timing and the per-tick telemetry row.

use std::fmt;

use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Longest run the loop accepts, in ticks.
pub const MAX_STEPS: usize = 10_000_000;

/// Run timing.
///
/// The loop steps from zero to `warmup_s + duration_s` inclusive. Rows inside
/// the warm-up are recorded but left out of the KPIs, since the ensemble
/// needs time to settle from an empty track.
///
/// # Examples
///
/// ```
/// use gravity_rail_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(10.0, 3600.0).unwrap();
/// assert_eq!(cfg.end_s(), 3600.0);
/// assert_eq!(cfg.total_steps(), 361);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimConfig {
    /// Tick length in seconds.
    pub dt_s: f64,
    /// Measured duration after the warm-up, in seconds.
    pub duration_s: f64,
    /// Settling time before measurement starts, in seconds.
    pub warmup_s: f64,
    /// Day offset handed to the supply and demand profiles.
    pub start_day: f64,
}

impl SimConfig {
    /// Creates a configuration without warm-up starting on day zero.
    ///
    /// # Arguments
    ///
    /// * `dt_s` - Tick length in seconds (must be > 0)
    /// * `duration_s` - Simulated seconds (must be >= 0)
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NonPositiveStep` for a non-positive tick and
    /// `StorageError::InvalidParameter` for a negative or non-finite duration.
    pub fn new(dt_s: f64, duration_s: f64) -> StorageResult<Self> {
        let cfg = Self {
            dt_s,
            duration_s,
            warmup_s: 0.0,
            start_day: 0.0,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the timing values.
    ///
    /// # Errors
    ///
    /// See [`SimConfig::new`]; a negative warm-up is rejected as well, and so
    /// is a run longer than [`MAX_STEPS`] ticks.
    pub fn validate(&self) -> StorageResult<()> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(StorageError::NonPositiveStep { dt: self.dt_s });
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(StorageError::InvalidParameter {
                what: "duration_s must be >= 0",
            });
        }
        if !(self.warmup_s.is_finite() && self.warmup_s >= 0.0) {
            return Err(StorageError::InvalidParameter {
                what: "warmup_s must be >= 0",
            });
        }
        if !self.start_day.is_finite() {
            return Err(StorageError::InvalidParameter {
                what: "start_day must be finite",
            });
        }
        if self.end_s() / self.dt_s >= MAX_STEPS as f64 {
            return Err(StorageError::InvalidParameter {
                what: "run is longer than MAX_STEPS ticks",
            });
        }
        Ok(())
    }

    /// Last simulated time of the run (s).
    pub fn end_s(&self) -> f64 {
        self.warmup_s + self.duration_s
    }

    /// Number of ticks from zero to `end_s` inclusive.
    pub fn total_steps(&self) -> usize {
        super::clock::Clock::new(self.dt_s, self.end_s()).total_steps()
    }
}

/// Telemetry for one tick.
///
/// Grid readings are taken at the start of the tick; track readings after
/// the controller has acted. `storage_w` includes the removal impulse the
/// tick released.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Tick index.
    pub timestep: usize,
    /// Simulated time in seconds.
    pub time_s: f64,
    /// Generation (W).
    pub supply_w: f64,
    /// Consumption (W).
    pub demand_w: f64,
    /// Storage power (W; positive = charging, negative = feeding the grid).
    pub storage_w: f64,
    /// `demand - supply + storage` (W).
    pub difference_w: f64,
    /// `(supply - storage) / demand`, 1 without demand.
    pub satisfaction: f64,
    /// Ensemble velocity before integration (m/s).
    pub velocity_mps: f64,
    /// Generator force applied this tick (N).
    pub generator_force_n: f64,
    /// Friction losses booked this tick (J).
    pub friction_loss_j: f64,
    /// Generator efficiency losses booked this tick.
    pub efficiency_loss_j: f64,
    pub carts_on_track: usize,
    pub reserve_top: usize,
    pub reserve_bottom: usize,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} ({:>8.2}h) | supply={:>10.1} kW  demand={:>10.1} kW  \
             storage={:>10.1} kW  diff={:>9.1} kW  sat={:>5.3} | v={:>6.2} m/s  \
             F={:>9.0} N | carts={} (top={}, bottom={})",
            self.timestep,
            self.time_s / 3600.0,
            self.supply_w / 1e3,
            self.demand_w / 1e3,
            self.storage_w / 1e3,
            self.difference_w / 1e3,
            self.satisfaction,
            self.velocity_mps,
            self.generator_force_n,
            self.carts_on_track,
            self.reserve_top,
            self.reserve_bottom,
        )
    }
}
