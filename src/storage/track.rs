use crate::error::{InjectionError, StorageError, StorageResult};

use super::types::{CartEnd, GRAVITY, Losses, TickReport, TrackParams};

/// The storage engine: every cart on the incline plus the reserves parked at
/// either end.
///
/// All carts on the rail move as one rigid block and share a single velocity.
/// Positions are measured along the track from the bottom (0) to the top
/// (`length_m`); positive velocity means the ensemble is climbing.
///
/// The total number of carts is fixed at construction. Every state transition
/// moves a cart between the rail and a reserve, never in or out of the system:
///
/// ```
/// use gravity_rail_sim::storage::{CartEnd, CartTrack, TrackParams};
///
/// let mut track = CartTrack::new(TrackParams::default(), 2, 2).unwrap();
/// track.add_cart(Some(CartEnd::Bottom)).unwrap();
/// assert_eq!(track.carts_on_track() + track.reserve_top() + track.reserve_bottom(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct CartTrack {
    params: TrackParams,
    positions: Vec<f64>,
    velocity: f64,
    reserve_top: usize,
    reserve_bottom: usize,
    total_carts: usize,
    force_of_generator: f64,
    /// Impulse from cart removals, consumed by the next `do_tick` (W).
    other_power: f64,
    losses: Losses,
}

impl CartTrack {
    /// Creates an empty track with the given reserves.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidParameter` if `params` fails validation.
    pub fn new(params: TrackParams, reserve_top: usize, reserve_bottom: usize) -> StorageResult<Self> {
        Self::with_ensemble(params, Vec::new(), 0.0, reserve_top, reserve_bottom)
    }

    /// Creates a track with carts already on the rail moving at `velocity`.
    ///
    /// The carts in `positions` count towards the conserved total alongside
    /// both reserves.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidParameter` if `params` fails validation or
    /// a position or the velocity is not finite.
    pub fn with_ensemble(
        params: TrackParams,
        positions: Vec<f64>,
        velocity: f64,
        reserve_top: usize,
        reserve_bottom: usize,
    ) -> StorageResult<Self> {
        params.validate()?;
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(StorageError::InvalidParameter {
                what: "cart positions must be finite",
            });
        }
        if !velocity.is_finite() {
            return Err(StorageError::InvalidParameter {
                what: "velocity must be finite",
            });
        }

        let total_carts = positions.len() + reserve_top + reserve_bottom;
        let velocity = if positions.is_empty() { 0.0 } else { velocity };
        Ok(Self {
            params,
            positions,
            velocity,
            reserve_top,
            reserve_bottom,
            total_carts,
            force_of_generator: 0.0,
            other_power: 0.0,
            losses: Losses::default(),
        })
    }

    pub fn params(&self) -> &TrackParams {
        &self.params
    }

    /// Positions of the carts on the rail, in insertion order (m).
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn carts_on_track(&self) -> usize {
        self.positions.len()
    }

    /// Ensemble velocity (m/s); zero whenever the rail is empty.
    pub fn velocity(&self) -> f64 {
        if self.positions.is_empty() {
            0.0
        } else {
            self.velocity
        }
    }

    pub fn reserve_top(&self) -> usize {
        self.reserve_top
    }

    pub fn reserve_bottom(&self) -> usize {
        self.reserve_bottom
    }

    /// Parked carts at `end`.
    pub fn reserve(&self, end: CartEnd) -> usize {
        match end {
            CartEnd::Bottom => self.reserve_bottom,
            CartEnd::Top => self.reserve_top,
        }
    }

    fn reserve_mut(&mut self, end: CartEnd) -> &mut usize {
        match end {
            CartEnd::Bottom => &mut self.reserve_bottom,
            CartEnd::Top => &mut self.reserve_top,
        }
    }

    /// Number of carts in the system, fixed at construction.
    pub fn total_carts(&self) -> usize {
        self.total_carts
    }

    pub fn force_of_generator(&self) -> f64 {
        self.force_of_generator
    }

    /// Sets the generator force (N). The generator can only resist motion, so
    /// negative and non-finite requests are stored as zero.
    pub fn set_force_of_generator(&mut self, force: f64) {
        self.force_of_generator = if force.is_finite() { force.max(0.0) } else { 0.0 };
    }

    /// Pending removal impulse (W, zero or negative).
    pub fn other_power(&self) -> f64 {
        self.other_power
    }

    /// Losses booked by the most recent tick.
    pub fn losses(&self) -> Losses {
        self.losses
    }

    /// Combined mass of the carts on the rail (kg).
    pub fn mass_on_track(&self) -> f64 {
        self.positions.len() as f64 * self.params.mass_per_cart_kg
    }

    /// Kinetic energy of the moving ensemble (J).
    pub fn kinetic_energy_j(&self) -> f64 {
        let v = self.velocity();
        0.5 * self.mass_on_track() * v * v
    }

    /// Gravity along the incline (N); negative pulls the ensemble downhill.
    pub fn gravity_force(&self) -> f64 {
        -self.params.angle_rad.sin() * GRAVITY * self.mass_on_track()
    }

    /// Drag plus rolling resistance (N); always opposes the velocity.
    pub fn friction_force(&self) -> f64 {
        let v = self.velocity();
        let p = &self.params;
        let per_cart = 0.5 * p.air_density * v * v * p.drag_area_m2
            + p.angle_rad.cos() * GRAVITY * p.mass_per_cart_kg * p.rolling_coefficient;
        -sign(v) * self.positions.len() as f64 * per_cart
    }

    /// Generator efficiency for the current direction of travel.
    pub fn generator_efficiency(&self) -> f64 {
        if self.velocity() > 0.0 {
            self.params.eta_discharge
        } else {
            self.params.eta_charge
        }
    }

    /// Instantaneous storage power (W). Positive while the generator holds
    /// the climbing ensemble against gravity, negative while it brakes a
    /// descent or releases a removal impulse.
    pub fn output_power_w(&self) -> f64 {
        self.params.eta_charge * self.other_power
            + self.generator_efficiency() * self.force_of_generator * self.velocity()
    }

    /// End a new cart would enter from when the caller does not choose: the
    /// bottom while climbing, the top otherwise.
    pub fn inferred_entry_end(&self) -> CartEnd {
        if self.velocity() > 0.0 {
            CartEnd::Bottom
        } else {
            CartEnd::Top
        }
    }

    /// Distance between the entry point at `end` and the nearest cart, or
    /// `None` on an empty rail.
    fn entry_gap(&self, end: CartEnd) -> Option<f64> {
        let positions = self.positions.iter().copied();
        match end {
            CartEnd::Bottom => positions.reduce(f64::min),
            CartEnd::Top => positions.reduce(f64::max).map(|p| self.params.length_m - p),
        }
    }

    /// Injects a parked cart at `end` (or the inferred end when `None`).
    ///
    /// The entering cart starts at rest and is coupled into the ensemble
    /// conserving kinetic energy, so the shared velocity drops to
    /// `sign(v)·sqrt(n·v²/(n+1))`.
    ///
    /// # Errors
    ///
    /// Returns an `InjectionError` and leaves the state untouched if the
    /// reserve at that end is empty or the nearest cart is closer than
    /// `minimal_distance_m`.
    pub fn add_cart(&mut self, end: Option<CartEnd>) -> Result<CartEnd, InjectionError> {
        let end = end.unwrap_or_else(|| self.inferred_entry_end());

        if self.reserve(end) == 0 {
            return Err(InjectionError::ReserveEmpty { end });
        }
        match self.entry_gap(end) {
            Some(gap_m) if gap_m < self.params.minimal_distance_m => {
                return Err(InjectionError::TooClose { end, gap_m });
            }
            _ => {}
        }

        let n = self.positions.len() as f64;
        let v = self.velocity();
        self.velocity = sign(v) * (n * v * v / (n + 1.0)).sqrt();

        let entry = match end {
            CartEnd::Bottom => 0.0,
            CartEnd::Top => self.params.length_m,
        };
        self.positions.push(entry);
        *self.reserve_mut(end) -= 1;
        Ok(end)
    }

    /// Takes the cart at `index` off the rail and parks it at the nearer end.
    ///
    /// The cart's kinetic energy leaves through the generator on the next
    /// tick: it is booked as `-KE / dt` in the pending removal impulse.
    /// Returns the reserve the cart was parked in.
    ///
    /// # Errors
    ///
    /// Returns `EmptyTrack`, `CartIndexOutOfRange`, or `NonPositiveStep`
    /// without changing the state.
    pub fn remove_cart(&mut self, dt: f64, index: usize) -> StorageResult<CartEnd> {
        if self.positions.is_empty() {
            return Err(StorageError::EmptyTrack);
        }
        if index >= self.positions.len() {
            return Err(StorageError::CartIndexOutOfRange {
                index,
                len: self.positions.len(),
            });
        }
        if dt.is_nan() || dt <= 0.0 {
            return Err(StorageError::NonPositiveStep { dt });
        }

        let end = if self.positions[index] > self.params.length_m / 2.0 {
            CartEnd::Top
        } else {
            CartEnd::Bottom
        };
        let v = self.velocity();
        let kinetic_j = 0.5 * self.params.mass_per_cart_kg * v * v;
        self.other_power -= kinetic_j / dt;

        self.positions.remove(index);
        *self.reserve_mut(end) += 1;
        if self.positions.is_empty() {
            self.velocity = 0.0;
        }
        Ok(end)
    }

    /// First cart that has run past either end of the rail, with the end it
    /// left through.
    pub fn first_out_of_bounds(&self) -> Option<(usize, CartEnd)> {
        let length = self.params.length_m;
        self.positions.iter().enumerate().find_map(|(i, &p)| {
            if p > length {
                Some((i, CartEnd::Top))
            } else if p < 0.0 {
                Some((i, CartEnd::Bottom))
            } else {
                None
            }
        })
    }

    /// Advances the ensemble by `dt` seconds.
    ///
    /// Books the tick's losses, consumes the pending removal impulse, then
    /// integrates `a = (gravity + friction + generator) / mass` with
    /// `x += v·dt + a·dt²/2` for every cart and `v += a·dt`.
    pub fn do_tick(&mut self, dt: f64) -> TickReport {
        let v = self.velocity();
        let friction = self.friction_force();
        let eta = self.generator_efficiency();
        let power_w = self.output_power_w();

        self.losses = Losses {
            friction_j: (friction * v).abs() * dt,
            efficiency_j: (1.0 - self.params.eta_charge) * self.other_power.abs()
                + ((1.0 - eta) * self.force_of_generator * v).abs() * dt,
        };
        self.other_power = 0.0;

        if self.positions.is_empty() {
            self.velocity = 0.0;
            return TickReport {
                power_w,
                acceleration: 0.0,
                losses: self.losses,
            };
        }

        let acceleration =
            (self.gravity_force() + friction + self.force_of_generator) / self.mass_on_track();
        let displacement = v * dt + 0.5 * acceleration * dt * dt;
        for position in &mut self.positions {
            *position += displacement;
        }
        self.velocity = v + acceleration * dt;

        TickReport {
            power_w,
            acceleration,
            losses: self.losses,
        }
    }
}

/// Sign with `sign(0) == 0`, unlike `f64::signum`.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn track_with(positions: Vec<f64>, velocity: f64, top: usize, bottom: usize) -> CartTrack {
        CartTrack::with_ensemble(TrackParams::default(), positions, velocity, top, bottom)
            .expect("default params are valid")
    }

    fn conserved(track: &CartTrack) -> bool {
        track.carts_on_track() + track.reserve_top() + track.reserve_bottom() == track.total_carts()
    }

    #[test]
    fn new_rejects_invalid_geometry() {
        let params = TrackParams {
            length_m: 0.0,
            ..TrackParams::default()
        };
        assert!(CartTrack::new(params, 1, 1).is_err());
    }

    #[test]
    fn inject_bottom_on_empty_track() {
        let mut track = track_with(vec![], 0.0, 0, 1);
        assert_eq!(track.add_cart(Some(CartEnd::Bottom)), Ok(CartEnd::Bottom));
        assert_eq!(track.positions(), &[0.0]);
        assert_eq!(track.reserve_bottom(), 0);
        assert_eq!(track.velocity(), 0.0);
    }

    #[test]
    fn inject_top_enters_at_track_length() {
        let mut track = track_with(vec![], 0.0, 1, 0);
        assert_eq!(track.add_cart(Some(CartEnd::Top)), Ok(CartEnd::Top));
        assert_eq!(track.positions(), &[track.params().length_m]);
        assert_eq!(track.reserve_top(), 0);
    }

    #[test]
    fn empty_reserve_rejects_without_change() {
        let mut track = track_with(vec![500.0], 2.0, 3, 0);
        let err = track.add_cart(Some(CartEnd::Bottom));
        assert_eq!(err, Err(InjectionError::ReserveEmpty { end: CartEnd::Bottom }));
        assert_eq!(track.positions(), &[500.0]);
        assert_eq!(track.velocity(), 2.0);
        assert_eq!(track.reserve_top(), 3);
    }

    #[test]
    fn spacing_violation_rejects_without_change() {
        let min = TrackParams::default().minimal_distance_m;
        let mut track = track_with(vec![min * 0.5], 3.0, 0, 5);
        let result = track.add_cart(Some(CartEnd::Bottom));
        assert!(matches!(result, Err(InjectionError::TooClose { end: CartEnd::Bottom, .. })));
        assert_eq!(track.positions(), &[min * 0.5]);
        assert_eq!(track.velocity(), 3.0);
        assert_eq!(track.reserve_bottom(), 5);
    }

    #[test]
    fn spacing_is_respected_after_success() {
        let params = TrackParams::default();
        let mut track = track_with(vec![params.length_m - params.minimal_distance_m], -1.0, 2, 0);
        assert!(track.add_cart(Some(CartEnd::Top)).is_ok());
        let entered = track.positions()[1];
        let gap = (entered - track.positions()[0]).abs();
        assert!(gap >= params.minimal_distance_m);
    }

    #[test]
    fn coupling_conserves_kinetic_energy() {
        let v = 4.0;
        let n = 3.0;
        let mut track = track_with(vec![100.0, 200.0, 300.0], v, 0, 1);
        let ke_before = track.kinetic_energy_j();
        track.add_cart(Some(CartEnd::Bottom)).expect("room at the bottom");

        let expected = (n * v * v / (n + 1.0)).sqrt();
        assert!((track.velocity() - expected).abs() < EPS);
        assert!((track.kinetic_energy_j() - ke_before).abs() < 1e-6 * ke_before);
    }

    #[test]
    fn coupling_keeps_direction_when_descending() {
        let mut track = track_with(vec![5_000.0], -6.0, 1, 0);
        track.add_cart(Some(CartEnd::Top)).expect("room at the top");
        assert!((track.velocity() + (36.0_f64 / 2.0).sqrt()).abs() < EPS);
    }

    #[test]
    fn inferred_end_follows_velocity_sign() {
        assert_eq!(track_with(vec![500.0], 1.0, 1, 1).inferred_entry_end(), CartEnd::Bottom);
        assert_eq!(track_with(vec![500.0], -1.0, 1, 1).inferred_entry_end(), CartEnd::Top);
        assert_eq!(track_with(vec![], 0.0, 1, 1).inferred_entry_end(), CartEnd::Top);

        let mut track = track_with(vec![5_000.0], 2.0, 1, 1);
        assert_eq!(track.add_cart(None), Ok(CartEnd::Bottom));
    }

    #[test]
    fn remove_sole_cart_books_impulse_and_empties_track() {
        let v = 5.0;
        let dt = 2.0;
        let mut track = track_with(vec![10_001.0], v, 0, 0);
        let mass = track.params().mass_per_cart_kg;

        assert_eq!(track.remove_cart(dt, 0), Ok(CartEnd::Top));
        assert_eq!(track.carts_on_track(), 0);
        assert_eq!(track.reserve_top(), 1);
        assert!((track.other_power() + 0.5 * mass * v * v / dt).abs() < 1e-6);

        let report = track.do_tick(dt);
        assert_eq!(report.acceleration, 0.0);
        assert_eq!(track.velocity(), 0.0);
        assert_eq!(track.other_power(), 0.0);
        assert!(conserved(&track));
    }

    #[test]
    fn remove_classifies_exit_by_midpoint() {
        let mut track = track_with(vec![-0.5, 6_000.0], 1.0, 0, 0);
        assert_eq!(track.remove_cart(1.0, 0), Ok(CartEnd::Bottom));
        assert_eq!(track.remove_cart(1.0, 0), Ok(CartEnd::Top));
        assert_eq!(track.reserve_bottom(), 1);
        assert_eq!(track.reserve_top(), 1);
    }

    #[test]
    fn remove_on_empty_track_errors() {
        let mut track = track_with(vec![], 0.0, 1, 1);
        assert_eq!(track.remove_cart(1.0, 0), Err(StorageError::EmptyTrack));
        assert!(conserved(&track));
    }

    #[test]
    fn remove_rejects_bad_index_and_step() {
        let mut track = track_with(vec![100.0], 1.0, 0, 0);
        assert_eq!(
            track.remove_cart(1.0, 3),
            Err(StorageError::CartIndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(track.remove_cart(0.0, 0), Err(StorageError::NonPositiveStep { dt: 0.0 }));
        assert_eq!(track.carts_on_track(), 1);
    }

    #[test]
    fn zero_tick_is_identity() {
        let mut track = track_with(vec![10.0, 400.0, 9_000.0], 3.5, 4, 4);
        track.set_force_of_generator(1.0e5);
        let before = track.positions().to_vec();
        track.do_tick(0.0);
        assert_eq!(track.positions(), before.as_slice());
        assert_eq!(track.velocity(), 3.5);
    }

    #[test]
    fn tick_near_top_follows_kinematics_and_leaves_track() {
        let length = TrackParams::default().length_m;
        let v = 5.0;
        let dt = 1.0;
        let mut track = track_with(vec![length - 1.0], v, 0, 0);
        let a = (track.gravity_force() + track.friction_force()) / track.mass_on_track();
        assert!(a < 0.0);

        let report = track.do_tick(dt);
        assert!((report.acceleration - a).abs() < EPS);
        let expected = length - 1.0 + v * dt + 0.5 * a * dt * dt;
        assert!((track.positions()[0] - expected).abs() < EPS);
        assert!((track.velocity() - (v + a * dt)).abs() < EPS);
        assert_eq!(track.first_out_of_bounds(), Some((0, CartEnd::Top)));
    }

    #[test]
    fn friction_opposes_motion_and_vanishes_at_rest() {
        assert!(track_with(vec![1.0], 2.0, 0, 0).friction_force() < 0.0);
        assert!(track_with(vec![1.0], -2.0, 0, 0).friction_force() > 0.0);
        assert_eq!(track_with(vec![1.0], 0.0, 0, 0).friction_force(), 0.0);
    }

    #[test]
    fn gravity_scales_with_carts() {
        let one = track_with(vec![1.0], 0.0, 0, 0).gravity_force();
        let three = track_with(vec![1.0, 50.0, 90.0], 0.0, 0, 0).gravity_force();
        assert!(one < 0.0);
        assert!((three - 3.0 * one).abs() < 1e-6);
        assert_eq!(track_with(vec![], 0.0, 0, 0).gravity_force(), 0.0);
    }

    #[test]
    fn efficiency_switches_on_direction() {
        let params = TrackParams {
            eta_charge: 0.8,
            eta_discharge: 0.7,
            ..TrackParams::default()
        };
        let up = CartTrack::with_ensemble(params.clone(), vec![1.0], 1.0, 0, 0).unwrap();
        let down = CartTrack::with_ensemble(params, vec![1.0], -1.0, 0, 0).unwrap();
        assert_eq!(up.generator_efficiency(), 0.7);
        assert_eq!(down.generator_efficiency(), 0.8);
    }

    #[test]
    fn output_power_includes_removal_impulse() {
        let mut track = track_with(vec![100.0, 10_500.0], 2.0, 0, 0);
        track.set_force_of_generator(1_000.0);
        track.remove_cart(1.0, 1).unwrap();
        let p = track.params();
        let expected = p.eta_charge * track.other_power() + p.eta_discharge * 1_000.0 * 2.0;
        assert!((track.output_power_w() - expected).abs() < 1e-6);
    }

    #[test]
    fn generator_force_is_never_negative() {
        let mut track = track_with(vec![], 0.0, 0, 0);
        track.set_force_of_generator(-5.0);
        assert_eq!(track.force_of_generator(), 0.0);
        track.set_force_of_generator(f64::NAN);
        assert_eq!(track.force_of_generator(), 0.0);
    }

    #[test]
    fn losses_follow_friction_and_efficiency() {
        let dt = 0.5;
        let mut track = track_with(vec![100.0], 3.0, 0, 0);
        track.set_force_of_generator(2_000.0);
        let friction = track.friction_force();
        let eta = track.generator_efficiency();
        let report = track.do_tick(dt);
        assert!((report.losses.friction_j - (friction * 3.0).abs() * dt).abs() < 1e-6);
        assert!((report.losses.efficiency_j - ((1.0 - eta) * 2_000.0 * 3.0).abs() * dt).abs() < 1e-6);
    }

    #[test]
    fn conservation_across_mixed_operations() {
        let mut track = track_with(vec![], 0.0, 3, 3);
        let total = track.total_carts();
        track.add_cart(Some(CartEnd::Top)).unwrap();
        track.add_cart(Some(CartEnd::Bottom)).unwrap();
        for _ in 0..50 {
            track.do_tick(1.0);
            while let Some((i, _)) = track.first_out_of_bounds() {
                track.remove_cart(1.0, i).unwrap();
            }
            let _ = track.add_cart(None);
            assert_eq!(track.total_carts(), total);
            assert!(conserved(&track));
            assert!(track.velocity().is_finite());
        }
    }
}
