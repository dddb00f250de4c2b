//! Supply and demand power sources, sampled as pure functions of simulated time.

pub mod households;
pub mod series;
pub mod wind;

pub use households::{HouseholdType, Households, SyntheticHouseholds};
pub use series::TimeSeries;
pub use wind::{GustyWind, SyntheticWind, WindSupply};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_YEAR: f64 = 365.0 * SECONDS_PER_DAY;

/// Converts an annual consumption in kWh to its mean power in watts.
pub fn annual_kwh_to_w(kwh: f64) -> f64 {
    kwh * 3.6e6 / SECONDS_PER_YEAR
}

/// A read-only power profile.
///
/// Implementations must be deterministic: the same arguments always yield the
/// same value, and sampling never mutates the source.
pub trait PowerProfile {
    /// Power (W, non-negative) at `time_s` seconds after the profile origin.
    fn sample_w(&self, time_s: f64) -> f64;

    /// Short model name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Power at `time_s` seconds into day `time_days`.
    fn sample_at(&self, time_s: f64, time_days: f64) -> f64 {
        self.sample_w(time_s + time_days * SECONDS_PER_DAY)
    }
}

/// Generation side of the grid.
#[derive(Debug, Clone)]
pub enum Supply {
    Synthetic(SyntheticWind),
    Gusty(GustyWind),
    Dataset(WindSupply),
}

impl PowerProfile for Supply {
    fn sample_w(&self, time_s: f64) -> f64 {
        match self {
            Supply::Synthetic(s) => s.sample_w(time_s),
            Supply::Gusty(s) => s.sample_w(time_s),
            Supply::Dataset(s) => s.sample_w(time_s),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Supply::Synthetic(s) => s.name(),
            Supply::Gusty(s) => s.name(),
            Supply::Dataset(s) => s.name(),
        }
    }
}

/// Consumption side of the grid.
#[derive(Debug, Clone)]
pub enum Demand {
    Synthetic(SyntheticHouseholds),
    Dataset(Households),
}

impl PowerProfile for Demand {
    fn sample_w(&self, time_s: f64) -> f64 {
        match self {
            Demand::Synthetic(d) => d.sample_w(time_s),
            Demand::Dataset(d) => d.sample_w(time_s),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Demand::Synthetic(d) => d.name(),
            Demand::Dataset(d) => d.name(),
        }
    }
}

/// A constant profile, handy for tests and calibration runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantProfile(pub f64);

impl PowerProfile for ConstantProfile {
    fn sample_w(&self, _time_s: f64) -> f64 {
        self.0
    }

    fn name(&self) -> &'static str {
        "Constant"
    }
}
