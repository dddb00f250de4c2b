/// A fixed-step clock over simulated time.
///
/// Yields steps `0..=total` where step `k` sits at `k * dt` seconds, so the
/// final step lands on or just before the configured end time.
///
/// # Examples
///
/// ```
/// use gravity_rail_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(10.0, 25.0);
/// let mut times = Vec::new();
///
/// clock.run(|_, t| times.push(t));
/// assert_eq!(times, vec![0.0, 10.0, 20.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    /// Next step to hand out
    current: usize,
    /// Number of steps in the run
    total: usize,
    /// Step length in seconds
    dt: f64,
}

impl Clock {
    /// Creates a clock stepping by `dt` from zero up to `end_s` inclusive.
    ///
    /// # Arguments
    ///
    /// * `dt` - Step length in seconds (must be > 0)
    /// * `end_s` - Last simulated time that may still be stepped
    ///
    /// A non-positive `dt` or a negative end yields an empty clock.
    pub fn new(dt: f64, end_s: f64) -> Self {
        let total = if dt > 0.0 && end_s >= 0.0 && end_s.is_finite() {
            // Small tolerance so an end that is an exact multiple of dt is kept.
            ((end_s / dt + 1e-9).floor() as usize).saturating_add(1)
        } else {
            0
        };
        Self { current: 0, total, dt }
    }

    pub fn total_steps(&self) -> usize {
        self.total
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated time of `step` in seconds.
    pub fn time_of(&self, step: usize) -> f64 {
        step as f64 * self.dt
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some((step, time_s))` - The step number and its time before advancing
    /// * `None` - If the clock has passed the end time
    pub fn tick(&mut self) -> Option<(usize, f64)> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some((step, self.time_of(step)))
        } else {
            None
        }
    }

    /// Runs a function for each remaining step with its simulated time.
    pub fn run(&mut self, mut f: impl FnMut(usize, f64)) {
        while let Some((step, time_s)) = self.tick() {
            f(step, time_s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusive_end() {
        let clock = Clock::new(10.0, 30.0);
        assert_eq!(clock.total_steps(), 4);
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(0.5, 0.5);
        assert_eq!(clock.tick(), Some((0, 0.0)));
        assert_eq!(clock.tick(), Some((1, 0.5)));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_zero_end_runs_once() {
        let mut clock = Clock::new(10.0, 0.0);
        let mut count = 0;
        clock.run(|_, _| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_huge_end_saturates() {
        let clock = Clock::new(1.0, 1e300);
        assert_eq!(clock.total_steps(), usize::MAX);
    }

    #[test]
    fn test_invalid_step_is_empty() {
        let mut clock = Clock::new(0.0, 100.0);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        Clock::new(1.0, -1.0).run(|_, _| was_called = true);
        assert!(!was_called);
    }
}
