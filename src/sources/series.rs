use crate::error::{SourceError, SourceResult};

/// An ordered series of samples with linear interpolation between them.
///
/// Outside the sampled range the first or last value is held, so a series is
/// defined for every time. Dataset-backed sources document that clamp as their
/// out-of-range behaviour.
///
/// # Examples
///
/// ```
/// use gravity_rail_sim::sources::series::TimeSeries;
///
/// let series = TimeSeries::new(vec![0.0, 10.0], vec![0.0, 100.0]).unwrap();
/// assert_eq!(series.sample(2.5), 25.0);
/// assert_eq!(series.sample(-1.0), 0.0);
/// assert_eq!(series.sample(99.0), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Builds a series from matching time and value vectors.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::TooShort` with fewer than two samples,
    /// `SourceError::Parse` on a length mismatch or a non-finite value, and
    /// `SourceError::NotIncreasing` if the times are not strictly increasing.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> SourceResult<Self> {
        if times.len() != values.len() {
            return Err(SourceError::Parse {
                row: times.len().min(values.len()),
                what: format!("{} times but {} values", times.len(), values.len()),
            });
        }
        if times.len() < 2 {
            return Err(SourceError::TooShort { len: times.len() });
        }
        for (row, (t, v)) in times.iter().zip(&values).enumerate() {
            if !t.is_finite() || !v.is_finite() {
                return Err(SourceError::Parse {
                    row,
                    what: "non-finite sample".to_string(),
                });
            }
        }
        if let Some(row) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SourceError::NotIncreasing { row: row + 1 });
        }
        Ok(Self { times, values })
    }

    /// Interpolated value at `time`.
    pub fn sample(&self, time: f64) -> f64 {
        let last = self.times.len() - 1;
        if time <= self.times[0] {
            return self.values[0];
        }
        if time >= self.times[last] {
            return self.values[last];
        }

        // First index with times[i] > time; the bracket is [i - 1, i].
        let upper = self.times.partition_point(|&t| t <= time);
        let lower = upper - 1;
        let frac = (time - self.times[lower]) / (self.times[upper] - self.times[lower]);
        self.values[lower] + frac * (self.values[upper] - self.values[lower])
    }

    /// Time of the first sample.
    pub fn start(&self) -> f64 {
        self.times[0]
    }

    /// Time of the last sample.
    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Mean of the sample values (unweighted).
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}
