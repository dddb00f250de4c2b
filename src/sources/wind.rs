//! Wind-farm supply models: a dataset-backed park and two synthetic profiles.

use std::f64::consts::PI;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;

use super::series::TimeSeries;
use super::{PowerProfile, SECONDS_PER_DAY, annual_kwh_to_w};
use crate::error::{SourceError, SourceResult};

/// Air density at sea level (kg/m³).
const AIR_DENSITY: f64 = 1.225;
/// Power coefficient of the turbine rotor.
const POWER_COEFFICIENT: f64 = 0.3;
/// Rotor swept area (m²).
const SWEPT_AREA_M2: f64 = 5027.0;
/// Rated output of a single turbine (W).
const TURBINE_RATED_W: f64 = 2.0e6;
/// Annual energy the synthetic profile is normalised to, per unit of multiplier (kWh).
const SYNTHETIC_ANNUAL_KWH: f64 = 3500.0;

/// Electrical output of one turbine at `wind_speed` (m/s), capped at rated power.
pub fn turbine_power_w(wind_speed: f64) -> f64 {
    let v = wind_speed.max(0.0);
    (0.5 * AIR_DENSITY * POWER_COEFFICIENT * SWEPT_AREA_M2 * v.powi(3)).min(TURBINE_RATED_W)
}

/// Wind park output driven by measured hourly wind speeds.
///
/// The dataset is a CSV with `date` (`YYYYMMDD`), `hour` (1-24) and
/// `wind speed` (0.1 m/s) columns, as published by weather stations. Time
/// zero is the first row. Beyond the last row the final output is held.
#[derive(Debug, Clone)]
pub struct WindSupply {
    windmills: f64,
    output: TimeSeries,
}

impl WindSupply {
    /// Loads a wind-speed dataset from `path`.
    ///
    /// # Errors
    ///
    /// Returns a `SourceError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path, windmills: u32) -> SourceResult<Self> {
        let file = File::open(path)?;
        let supply = Self::from_reader(file, windmills)?;
        info!(
            path = %path.display(),
            windmills,
            samples = supply.output.len(),
            span_h = (supply.output.end() - supply.output.start()) / 3600.0,
            mean_kw = supply.mean_output_w() / 1e3,
            "loaded wind dataset"
        );
        Ok(supply)
    }

    /// Parses a wind-speed dataset from any reader.
    ///
    /// # Errors
    ///
    /// Returns a `SourceError` on malformed rows, missing columns, or
    /// non-increasing timestamps.
    pub fn from_reader<R: Read>(reader: R, windmills: u32) -> SourceResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| SourceError::Parse {
                    row: 0,
                    what: format!("missing column `{name}`"),
                })
        };
        let date_col = column("date")?;
        let hour_col = column("hour")?;
        let speed_col = column("wind speed")?;

        let mut start: Option<NaiveDateTime> = None;
        let mut times = Vec::new();
        let mut values = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let row = i + 1;
            let field = |col: usize| record.get(col).unwrap_or("");

            let date = NaiveDate::parse_from_str(field(date_col), "%Y%m%d").map_err(|e| {
                SourceError::Parse {
                    row,
                    what: format!("bad date `{}`: {e}", field(date_col)),
                }
            })?;
            let hour: i64 = parse_number(field(hour_col), row, "hour")?;
            let tenths: f64 = parse_number(field(speed_col), row, "wind speed")?;

            let stamp = date.and_time(chrono::NaiveTime::MIN) + TimeDelta::hours(hour);
            let origin = *start.get_or_insert(stamp);
            times.push((stamp - origin).num_seconds() as f64);
            values.push(turbine_power_w(tenths * 0.1));
        }

        Self::from_series(TimeSeries::new(times, values)?, windmills)
    }

    /// Wraps an already interpolated single-turbine output series.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidParameter` if `windmills` is zero.
    pub fn from_series(output: TimeSeries, windmills: u32) -> SourceResult<Self> {
        if windmills == 0 {
            return Err(SourceError::InvalidParameter {
                what: "windmills must be > 0",
            });
        }
        Ok(Self {
            windmills: f64::from(windmills),
            output,
        })
    }

    /// Mean park output over the dataset samples (W).
    pub fn mean_output_w(&self) -> f64 {
        self.windmills * self.output.mean()
    }
}

impl PowerProfile for WindSupply {
    fn sample_w(&self, time_s: f64) -> f64 {
        self.windmills * self.output.sample(time_s)
    }

    fn name(&self) -> &'static str {
        "WindDataset"
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, row: usize, what: &str) -> SourceResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| SourceError::Parse {
        row,
        what: format!("bad {what} `{raw}`: {e}"),
    })
}

/// Deterministic wind profile: a daily swing around a seasonal mean.
///
/// ```text
/// P(t) = multiplier · avg · (1 − 0.5·sin(2πt/day) + 0.25·cos(2π·days/360))
/// ```
/// where `avg` is 3500 kWh/year expressed in watts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticWind {
    pub multiplier: f64,
}

impl SyntheticWind {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier: multiplier.max(0.0),
        }
    }
}

impl PowerProfile for SyntheticWind {
    fn sample_w(&self, time_s: f64) -> f64 {
        let average_w = annual_kwh_to_w(SYNTHETIC_ANNUAL_KWH);
        let daily = (2.0 * PI * time_s / SECONDS_PER_DAY).sin();
        let seasonal = (2.0 * PI * (time_s / SECONDS_PER_DAY) / 360.0).cos();
        self.multiplier * average_w * (1.0 - 0.5 * daily + 0.25 * seasonal)
    }

    fn name(&self) -> &'static str {
        "SyntheticWind"
    }
}

/// Lowest gust multiplier (near calm).
const GUST_MIN: f64 = 0.0;
/// Highest gust multiplier.
const GUST_MAX: f64 = 1.8;
/// Spacing of the pre-generated gust samples (s).
const GUST_STEP_S: f64 = 3600.0;
/// Most gust samples a horizon may ask for (a little over a century).
const MAX_GUST_SAMPLES: usize = 1_000_000;

/// [`SyntheticWind`] modulated by temporally correlated gusts.
///
/// An hourly multiplier follows a mean-reverting AR(1) process
///
/// ```text
/// m(k) = alpha · m(k−1) + (1 − alpha) · (1 + ε(k))
/// ```
///
/// with Gaussian `ε`. The whole sequence is drawn at construction from `seed`
/// and interpolated afterwards, so sampling stays a pure function of time.
#[derive(Debug, Clone)]
pub struct GustyWind {
    base: SyntheticWind,
    gusts: TimeSeries,
}

impl GustyWind {
    /// Pre-generates gusts covering `[0, horizon_s]`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidParameter` for an `alpha` outside `[0, 1]`,
    /// a negative noise level, or a horizon that is non-positive or longer
    /// than the gust sample limit.
    pub fn new(
        multiplier: f64,
        alpha: f64,
        gust_noise_std: f64,
        horizon_s: f64,
        seed: u64,
    ) -> SourceResult<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SourceError::InvalidParameter {
                what: "alpha must be in [0, 1]",
            });
        }
        if !(gust_noise_std.is_finite() && gust_noise_std >= 0.0) {
            return Err(SourceError::InvalidParameter {
                what: "gust_noise_std must be >= 0",
            });
        }
        if !(horizon_s.is_finite() && horizon_s > 0.0) {
            return Err(SourceError::InvalidParameter {
                what: "horizon_s must be > 0",
            });
        }

        let samples = (horizon_s / GUST_STEP_S).ceil();
        if samples >= MAX_GUST_SAMPLES as f64 {
            return Err(SourceError::InvalidParameter {
                what: "horizon_s exceeds the gust sample limit",
            });
        }
        let steps = samples as usize + 1;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut m = 1.0;
        let mut times = Vec::with_capacity(steps + 1);
        let mut values = Vec::with_capacity(steps + 1);
        for k in 0..=steps {
            times.push(k as f64 * GUST_STEP_S);
            values.push(m);
            let epsilon = gaussian_noise(&mut rng, gust_noise_std);
            m = (alpha * m + (1.0 - alpha) * (1.0 + epsilon)).clamp(GUST_MIN, GUST_MAX);
        }

        Ok(Self {
            base: SyntheticWind::new(multiplier),
            gusts: TimeSeries::new(times, values)?,
        })
    }

    /// Gust multiplier at `time_s`.
    pub fn gust(&self, time_s: f64) -> f64 {
        self.gusts.sample(time_s)
    }
}

impl PowerProfile for GustyWind {
    fn sample_w(&self, time_s: f64) -> f64 {
        self.base.sample_w(time_s) * self.gust(time_s)
    }

    fn name(&self) -> &'static str {
        "GustyWind"
    }
}

/// Gaussian noise with zero mean via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * std_dev
}
