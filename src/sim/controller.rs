//! Feedback controller driving the cart track towards the grid imbalance.

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{StorageError, StorageResult};
use crate::storage::{CartEnd, CartTrack};

use super::power_balance::net_surplus_w;

/// Tunable limits of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerParams {
    /// Largest commanded acceleration magnitude (m/s²).
    pub max_acceleration: f64,
    /// Speed above which the controller refuses to speed the ensemble up (m/s).
    pub max_speed: f64,
    /// Whether carts swept off either end are replaced from the opposite reserve.
    pub allow_new_carts: bool,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            max_acceleration: 1.0,
            max_speed: 10.0,
            allow_new_carts: true,
        }
    }
}

/// What the controller did during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControlDecision {
    /// Carts swept off the rail after leaving it.
    pub removed: usize,
    /// Replacement carts injected by the sweep.
    pub replaced: usize,
    /// End the replenishment cart entered from, if one did.
    pub injected: Option<CartEnd>,
    /// Force that would hold the velocity constant (N).
    pub neutral_force_n: f64,
    /// Velocity change requested for this tick (m/s), after the speed governor.
    pub needed_dv: f64,
    /// Commanded acceleration after clamping (m/s²).
    pub acceleration: f64,
    /// Generator force handed to the track (N, never negative).
    pub generator_force_n: f64,
}

/// One-step-lookahead proportional controller.
///
/// Each update sweeps carts that left the rail, tops up the ensemble from the
/// reserves, then solves for the generator force whose power output matches
/// `supply - demand` to first order. The controller keeps no memory between
/// ticks: friction and gravity are recomputed from the track every update, so
/// the first-order error is corrected on the next tick. That only holds while
/// `dt` is short against the friction time constant of the ensemble; long
/// ticks let the velocity overshoot and oscillate.
#[derive(Debug, Clone)]
pub struct Controller {
    params: ControllerParams,
    dt: f64,
}

impl Controller {
    /// Creates a controller for ticks of `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NonPositiveStep` for a non-positive `dt` and
    /// `StorageError::InvalidParameter` for negative or non-finite limits.
    pub fn new(params: ControllerParams, dt: f64) -> StorageResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(StorageError::NonPositiveStep { dt });
        }
        if !(params.max_acceleration.is_finite() && params.max_acceleration >= 0.0) {
            return Err(StorageError::InvalidParameter {
                what: "max_acceleration must be >= 0",
            });
        }
        if !(params.max_speed.is_finite() && params.max_speed > 0.0) {
            return Err(StorageError::InvalidParameter {
                what: "max_speed must be > 0",
            });
        }
        Ok(Self { params, dt })
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Runs one control update on `track` for the given grid readings (W).
    ///
    /// Never fails: rejected injections are skipped and degenerate force
    /// geometry yields a zero velocity change.
    pub fn update(&self, track: &mut CartTrack, supply_w: f64, demand_w: f64) -> ControlDecision {
        let net_w = net_surplus_w(supply_w, demand_w);
        let (removed, replaced) = self.sweep_boundaries(track);
        let injected = self.replenish(track, net_w);

        let passive = track.gravity_force() + track.friction_force();
        let neutral_force = -passive;
        let neutral_power = track.generator_efficiency() * passive.abs() * track.velocity();

        let mut needed_dv = if neutral_force == 0.0 {
            0.0
        } else {
            (net_w - neutral_power) / neutral_force.abs()
        };

        let v = track.velocity();
        if v.abs() > self.params.max_speed && needed_dv * v > 0.0 {
            trace!(velocity = v, needed_dv, "speed governor engaged");
            needed_dv = 0.0;
        }

        let max_acc = self.params.max_acceleration;
        let acceleration = (needed_dv / self.dt).clamp(-max_acc, max_acc);
        let carts = track.carts_on_track() as f64;
        let requested = neutral_force + acceleration * track.params().mass_per_cart_kg * carts;
        track.set_force_of_generator(requested);

        ControlDecision {
            removed,
            replaced,
            injected,
            neutral_force_n: neutral_force,
            needed_dv,
            acceleration,
            generator_force_n: track.force_of_generator(),
        }
    }

    /// Removes every cart that has left the rail, one at a time, until none
    /// remain outside. With `allow_new_carts` each removal is followed by an
    /// injection at the opposite end.
    ///
    /// # Returns
    ///
    /// `(removed, replaced)` counts.
    pub fn sweep_boundaries(&self, track: &mut CartTrack) -> (usize, usize) {
        let mut removed = 0;
        let mut replaced = 0;
        while let Some((index, exit)) = track.first_out_of_bounds() {
            if let Err(err) = track.remove_cart(self.dt, index) {
                debug!(%err, index, "boundary removal refused");
                break;
            }
            removed += 1;
            debug!(%exit, index, carts = track.carts_on_track(), "cart left the track");

            if self.params.allow_new_carts {
                match track.add_cart(Some(exit.opposite())) {
                    Ok(_) => replaced += 1,
                    Err(err) => debug!(%err, "replacement injection skipped"),
                }
            }
        }
        (removed, replaced)
    }

    /// Adds one cart to keep the pipeline fed. On a busy track the engine
    /// picks the end from the direction of travel; on an empty one the sign
    /// of the surplus decides, and a balanced grid falls back to the engine's
    /// choice (the top, since nothing moves).
    fn replenish(&self, track: &mut CartTrack, net_w: f64) -> Option<CartEnd> {
        let end = if track.carts_on_track() > 0 {
            None
        } else if net_w > 0.0 {
            Some(CartEnd::Bottom)
        } else if net_w < 0.0 {
            Some(CartEnd::Top)
        } else {
            None
        };

        match track.add_cart(end) {
            Ok(end) => Some(end),
            Err(err) => {
                trace!(%err, "replenishment skipped");
                None
            }
        }
    }
}
