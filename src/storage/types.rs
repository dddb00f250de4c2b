//! Geometry, physical constants, and per-tick bookkeeping for the cart track.

use std::fmt;

use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.81;

/// One end of the incline. Carts parked off-track wait at either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEnd {
    /// Position 0, the foot of the incline.
    Bottom,
    /// Position `length_m`, the head of the incline.
    Top,
}

impl CartEnd {
    /// The other end of the incline.
    pub fn opposite(self) -> Self {
        match self {
            CartEnd::Bottom => CartEnd::Top,
            CartEnd::Top => CartEnd::Bottom,
        }
    }
}

impl fmt::Display for CartEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartEnd::Bottom => f.write_str("bottom"),
            CartEnd::Top => f.write_str("top"),
        }
    }
}

/// Fixed geometry and physical parameters of a track.
///
/// Validated once when a [`CartTrack`](super::CartTrack) is built; the values
/// never change during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackParams {
    /// Rail length along the incline (m).
    pub length_m: f64,
    /// Incline angle (radians, `0 <= angle < π/2`).
    pub angle_rad: f64,
    /// Minimum spacing between an entering cart and its nearest neighbour (m).
    pub minimal_distance_m: f64,
    /// Mass of a single cart (kg).
    pub mass_per_cart_kg: f64,
    /// Generator efficiency while the ensemble is not climbing (0..=1).
    pub eta_charge: f64,
    /// Generator efficiency while the ensemble moves up the track (0..=1).
    pub eta_discharge: f64,
    /// Drag coefficient times frontal area of one cart (m²).
    pub drag_area_m2: f64,
    /// Rolling resistance coefficient.
    pub rolling_coefficient: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            length_m: 10_000.0,
            angle_rad: 0.1_f64.atan(),
            minimal_distance_m: 20.0,
            mass_per_cart_kg: 67.5 * 2170.0,
            eta_charge: 0.9,
            eta_discharge: 0.9,
            // Cd 1.05 on a 2.591 m x 2.438 m container face
            drag_area_m2: 1.05 * 2.591 * 2.438,
            rolling_coefficient: 0.001,
            air_density: 1.275,
        }
    }
}

impl TrackParams {
    /// Checks every parameter against its physical range.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> StorageResult<()> {
        let invalid = |what| Err(StorageError::InvalidParameter { what });

        if !(self.length_m.is_finite() && self.length_m > 0.0) {
            return invalid("length_m must be a finite number > 0");
        }
        if !(self.angle_rad.is_finite()
            && self.angle_rad >= 0.0
            && self.angle_rad < std::f64::consts::FRAC_PI_2)
        {
            return invalid("angle_rad must be in [0, pi/2)");
        }
        if !(self.minimal_distance_m.is_finite()
            && self.minimal_distance_m >= 0.0
            && self.minimal_distance_m < self.length_m)
        {
            return invalid("minimal_distance_m must be in [0, length_m)");
        }
        if !(self.mass_per_cart_kg.is_finite() && self.mass_per_cart_kg > 0.0) {
            return invalid("mass_per_cart_kg must be a finite number > 0");
        }
        if !(self.eta_charge > 0.0 && self.eta_charge <= 1.0) {
            return invalid("eta_charge must be in (0, 1]");
        }
        if !(self.eta_discharge > 0.0 && self.eta_discharge <= 1.0) {
            return invalid("eta_discharge must be in (0, 1]");
        }
        if !(self.drag_area_m2.is_finite() && self.drag_area_m2 >= 0.0) {
            return invalid("drag_area_m2 must be >= 0");
        }
        if !(self.rolling_coefficient.is_finite() && self.rolling_coefficient >= 0.0) {
            return invalid("rolling_coefficient must be >= 0");
        }
        if !(self.air_density.is_finite() && self.air_density >= 0.0) {
            return invalid("air_density must be >= 0");
        }
        Ok(())
    }
}

/// Energy dissipated during the most recent tick (J).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Losses {
    /// Rolling resistance and aerodynamic drag.
    pub friction_j: f64,
    /// Generator conversion losses, including the removal impulse.
    pub efficiency_j: f64,
}

impl Losses {
    /// Sum of all loss terms.
    pub fn total_j(&self) -> f64 {
        self.friction_j + self.efficiency_j
    }
}

/// What one physics tick did to the ensemble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Storage output power at the start of the tick (W, positive = drawn from the grid).
    pub power_w: f64,
    /// Ensemble acceleration applied over the tick (m/s²).
    pub acceleration: f64,
    /// Losses booked for the tick.
    pub losses: Losses,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert_eq!(TrackParams::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_length() {
        let params = TrackParams {
            length_m: -1.0,
            ..TrackParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(StorageError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn rejects_zero_cart_mass() {
        let params = TrackParams {
            mass_per_cart_kg: 0.0,
            ..TrackParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_spacing_longer_than_track() {
        let params = TrackParams {
            length_m: 100.0,
            minimal_distance_m: 150.0,
            ..TrackParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_efficiency_above_one() {
        let params = TrackParams {
            eta_discharge: 1.2,
            ..TrackParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn level_track_is_allowed() {
        let params = TrackParams {
            angle_rad: 0.0,
            ..TrackParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn losses_total_sums_both_terms() {
        let losses = Losses {
            friction_j: 120.0,
            efficiency_j: 30.5,
        };
        assert_eq!(losses.total_j(), 150.5);
        assert_eq!(Losses::default().total_j(), 0.0);
    }

    #[test]
    fn cart_end_display() {
        assert_eq!(CartEnd::Bottom.to_string(), "bottom");
        assert_eq!(CartEnd::Top.to_string(), "top");
    }
}
