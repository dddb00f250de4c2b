//! Household demand: a standard-profile dataset and a synthetic evening-peak model.

use std::f64::consts::PI;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::series::TimeSeries;
use super::{PowerProfile, SECONDS_PER_DAY, annual_kwh_to_w};
use crate::error::{SourceError, SourceResult};

/// Spacing the profile fractions are defined over (s).
const PROFILE_STEP_S: f64 = 900.0;
const START_FORMAT: &str = "%d-%m-%Y %H:%M";
/// Tolerance on the per-column fraction sum.
const FRACTION_TOLERANCE: f64 = 1e-4;

/// One household category of a consumption profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HouseholdType {
    /// Households of this type.
    pub count: f64,
    /// Annual consumption of a single household (kWh).
    pub annual_kwh: f64,
}

/// Aggregate household demand from a normalised 15-minute profile.
///
/// The CSV carries a `start` column (`dd-mm-YYYY HH:MM`) and one column per
/// household type holding the fraction of annual consumption used in that
/// quarter hour. Columns are matched to `types` in order; extra columns are
/// ignored. Time zero is the first row.
#[derive(Debug, Clone)]
pub struct Households {
    total: TimeSeries,
}

impl Households {
    /// Loads a consumption profile from `path`.
    ///
    /// # Errors
    ///
    /// Returns a `SourceError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path, types: &[HouseholdType]) -> SourceResult<Self> {
        let file = File::open(path)?;
        let households = Self::from_reader(file, types)?;
        info!(
            path = %path.display(),
            types = types.len(),
            samples = households.total.len(),
            span_h = (households.total.end() - households.total.start()) / 3600.0,
            mean_kw = households.mean_demand_w() / 1e3,
            "loaded household profile"
        );
        Ok(households)
    }

    /// Parses a consumption profile from any reader.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidParameter` if more types are given than
    /// the profile has columns, and `SourceError::Parse` on malformed rows.
    pub fn from_reader<R: Read>(reader: R, types: &[HouseholdType]) -> SourceResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let start_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("start"))
            .ok_or_else(|| SourceError::Parse {
                row: 0,
                what: "missing column `start`".to_string(),
            })?;
        let fraction_cols: Vec<usize> = (0..headers.len()).filter(|&c| c != start_col).collect();
        if types.len() > fraction_cols.len() {
            return Err(SourceError::InvalidParameter {
                what: "more household types than profile columns",
            });
        }
        let scale: Vec<f64> = types
            .iter()
            .map(|t| t.annual_kwh * 3.6e6 / PROFILE_STEP_S * t.count)
            .collect();

        let mut origin: Option<NaiveDateTime> = None;
        let mut times = Vec::new();
        let mut values = Vec::new();
        let mut fraction_sums = vec![0.0; types.len()];
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let row = i + 1;
            let raw_start = record.get(start_col).unwrap_or("");
            let stamp = NaiveDateTime::parse_from_str(raw_start, START_FORMAT).map_err(|e| {
                SourceError::Parse {
                    row,
                    what: format!("bad start `{raw_start}`: {e}"),
                }
            })?;
            let origin = *origin.get_or_insert(stamp);
            times.push((stamp - origin).num_seconds() as f64);

            let mut power_w = 0.0;
            for (k, &col) in fraction_cols.iter().take(types.len()).enumerate() {
                let raw = record.get(col).unwrap_or("");
                let fraction: f64 = raw.parse().map_err(|e| SourceError::Parse {
                    row,
                    what: format!("bad fraction `{raw}` in `{}`: {e}", &headers[col]),
                })?;
                fraction_sums[k] += fraction;
                power_w += fraction * scale[k];
            }
            values.push(power_w);
        }

        for (k, sum) in fraction_sums.iter().enumerate() {
            if (sum - 1.0).abs() > FRACTION_TOLERANCE {
                warn!(
                    column = &headers[fraction_cols[k]],
                    sum = *sum,
                    "profile fractions do not sum to 1"
                );
            }
        }

        Ok(Self {
            total: TimeSeries::new(times, values)?,
        })
    }

    /// Mean aggregate demand over the profile samples (W).
    pub fn mean_demand_w(&self) -> f64 {
        self.total.mean()
    }
}

impl PowerProfile for Households {
    fn sample_w(&self, time_s: f64) -> f64 {
        self.total.sample(time_s)
    }

    fn name(&self) -> &'static str {
        "HouseholdProfile"
    }
}

/// Synthetic demand of `multiplier` average households with one daily peak.
///
/// `P(t) = multiplier · avg · (1 + 0.4·sin(2πt/day − phase))`, where `avg` is
/// 3500 kWh/year in watts. The default phase of π puts the peak at 18:00.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticHouseholds {
    pub multiplier: f64,
    pub phase_rad: f64,
}

impl SyntheticHouseholds {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier: multiplier.max(0.0),
            phase_rad: PI,
        }
    }
}

impl PowerProfile for SyntheticHouseholds {
    fn sample_w(&self, time_s: f64) -> f64 {
        let swing = (2.0 * PI * time_s / SECONDS_PER_DAY - self.phase_rad).sin();
        self.multiplier * annual_kwh_to_w(3500.0) * (1.0 + 0.4 * swing)
    }

    fn name(&self) -> &'static str {
        "SyntheticHouseholds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "\
start,E1A,E1B
01-01-2019 00:00,0.25,0.5
01-01-2019 00:15,0.25,0.5
01-01-2019 00:30,0.5,0.0
";

    fn one_type(count: f64) -> Vec<HouseholdType> {
        vec![HouseholdType {
            count,
            annual_kwh: 3500.0,
        }]
    }

    #[test]
    fn scales_fractions_to_power() {
        let homes = Households::from_reader(PROFILE.as_bytes(), &one_type(2.0)).unwrap();
        let expected = 0.25 * 3500.0 * 3.6e6 / 900.0 * 2.0;
        assert!((homes.sample_w(0.0) - expected).abs() < 1e-6);
        assert!((homes.sample_w(1800.0) - 2.0 * expected).abs() < 1e-6);
    }

    #[test]
    fn mean_demand_averages_samples() {
        let homes = Households::from_reader(PROFILE.as_bytes(), &one_type(2.0)).unwrap();
        let quarter = 0.25 * 3500.0 * 3.6e6 / 900.0 * 2.0;
        assert!((homes.mean_demand_w() - 4.0 / 3.0 * quarter).abs() < 1e-6);
    }

    #[test]
    fn sums_types_and_interpolates() {
        let types = [
            HouseholdType {
                count: 1.0,
                annual_kwh: 1000.0,
            },
            HouseholdType {
                count: 1.0,
                annual_kwh: 2000.0,
            },
        ];
        let homes = Households::from_reader(PROFILE.as_bytes(), &types).unwrap();
        let unit = 3.6e6 / 900.0;
        let at0 = (0.25 * 1000.0 + 0.5 * 2000.0) * unit;
        let at2 = 0.5 * 1000.0 * unit;
        assert!((homes.sample_w(0.0) - at0).abs() < 1e-6);
        assert!((homes.sample_w(1350.0) - 0.5 * (at0 + at2)).abs() < 1e-6);
    }

    #[test]
    fn too_many_types_is_rejected() {
        let types = vec![
            HouseholdType {
                count: 1.0,
                annual_kwh: 1.0
            };
            3
        ];
        assert!(matches!(
            Households::from_reader(PROFILE.as_bytes(), &types),
            Err(SourceError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let raw = "start,E1A\n2019-01-01 00:00,0.5\n01-01-2019 00:15,0.5\n";
        assert!(matches!(
            Households::from_reader(raw.as_bytes(), &one_type(1.0)),
            Err(SourceError::Parse { row: 1, .. })
        ));
    }

    #[test]
    fn synthetic_peaks_in_the_evening() {
        let homes = SyntheticHouseholds::new(1.0);
        let avg = annual_kwh_to_w(3500.0);
        let evening = homes.sample_w(18.0 * 3600.0);
        let morning = homes.sample_w(6.0 * 3600.0);
        assert!((evening - 1.4 * avg).abs() < 1e-9);
        assert!((morning - 0.6 * avg).abs() < 1e-9);
    }

    #[test]
    fn synthetic_never_negative() {
        let homes = SyntheticHouseholds::new(1000.0);
        for k in 0..96 {
            assert!(homes.sample_w(k as f64 * 900.0) >= 0.0);
        }
    }
}
