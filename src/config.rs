//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::controller::{Controller, ControllerParams};
use crate::sim::engine::Simulation;
use crate::sim::types::{MAX_STEPS, SimConfig};
use crate::sources::{
    Demand, GustyWind, HouseholdType, Households, SECONDS_PER_DAY, Supply, SyntheticHouseholds,
    SyntheticWind, WindSupply,
};
use crate::storage::{CartTrack, TrackParams};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Track geometry and physical parameters.
    #[serde(default)]
    pub track: TrackConfig,
    /// Initial reserve split.
    #[serde(default)]
    pub carts: CartsConfig,
    /// Controller limits.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Generation profile.
    #[serde(default)]
    pub supply: SupplyConfig,
    /// Consumption profile.
    #[serde(default)]
    pub demand: DemandConfig,
}

/// Run timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Tick length in seconds (must be > 0).
    pub dt_s: f64,
    /// Measured duration in seconds.
    pub duration_s: f64,
    /// Settling time before measurement, in seconds.
    pub warmup_s: f64,
    /// Day offset into the supply and demand profiles.
    pub start_day: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_s: 10.0,
            duration_s: SECONDS_PER_DAY,
            warmup_s: 3600.0,
            start_day: 0.0,
        }
    }
}

/// Track geometry and physical parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackConfig {
    pub length_m: f64,
    pub angle_rad: f64,
    pub minimal_distance_m: f64,
    pub mass_per_cart_kg: f64,
    pub eta_charge: f64,
    pub eta_discharge: f64,
    pub drag_area_m2: f64,
    pub rolling_coefficient: f64,
    pub air_density: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        let p = TrackParams::default();
        Self {
            length_m: p.length_m,
            angle_rad: p.angle_rad,
            minimal_distance_m: p.minimal_distance_m,
            mass_per_cart_kg: p.mass_per_cart_kg,
            eta_charge: p.eta_charge,
            eta_discharge: p.eta_discharge,
            drag_area_m2: p.drag_area_m2,
            rolling_coefficient: p.rolling_coefficient,
            air_density: p.air_density,
        }
    }
}

impl TrackConfig {
    pub fn params(&self) -> TrackParams {
        TrackParams {
            length_m: self.length_m,
            angle_rad: self.angle_rad,
            minimal_distance_m: self.minimal_distance_m,
            mass_per_cart_kg: self.mass_per_cart_kg,
            eta_charge: self.eta_charge,
            eta_discharge: self.eta_discharge,
            drag_area_m2: self.drag_area_m2,
            rolling_coefficient: self.rolling_coefficient,
            air_density: self.air_density,
        }
    }
}

/// Carts parked at each end when the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartsConfig {
    pub reserve_top: usize,
    pub reserve_bottom: usize,
}

impl Default for CartsConfig {
    fn default() -> Self {
        Self {
            reserve_top: 500,
            reserve_bottom: 500,
        }
    }
}

/// Controller limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Largest commanded acceleration magnitude (m/s²).
    pub max_acceleration: f64,
    /// Speed governor threshold (m/s).
    pub max_speed: f64,
    /// Replace carts swept off either end from the opposite reserve.
    pub allow_new_carts: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let p = ControllerParams::default();
        Self {
            max_acceleration: p.max_acceleration,
            max_speed: p.max_speed,
            allow_new_carts: p.allow_new_carts,
        }
    }
}

/// Generation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SupplyConfig {
    /// Supply model: `"synthetic"`, `"gusty"`, or `"dataset"`.
    pub model: String,
    /// Scale of the synthetic models, in average households.
    pub multiplier: f64,
    /// Turbines in the park for the dataset model.
    pub windmills: u32,
    /// Wind-speed CSV for the dataset model.
    pub path: Option<PathBuf>,
    /// AR(1) persistence of the gust multiplier (0.0-1.0).
    pub alpha: f64,
    /// Standard deviation of the gust innovations.
    pub gust_noise_std: f64,
    /// Seed for the gust process.
    pub seed: u64,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            model: "synthetic".to_string(),
            multiplier: 1000.0,
            windmills: 60,
            path: None,
            alpha: 0.85,
            gust_noise_std: 0.3,
            seed: 42,
        }
    }
}

/// Consumption profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Demand model: `"synthetic"` or `"dataset"`.
    pub model: String,
    /// Average households for the synthetic model.
    pub multiplier: f64,
    /// Households per profile column for the dataset model.
    pub households: Vec<f64>,
    /// Annual consumption per household, per profile column (kWh).
    pub annual_kwh: Vec<f64>,
    /// Consumption profile CSV for the dataset model.
    pub path: Option<PathBuf>,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            model: "synthetic".to_string(),
            multiplier: 1000.0,
            households: vec![1000.0],
            annual_kwh: vec![3500.0],
            path: None,
        }
    }
}

impl DemandConfig {
    /// Household categories in profile column order. Missing annual figures
    /// default to zero consumption.
    pub fn household_types(&self) -> Vec<HouseholdType> {
        self.households
            .iter()
            .enumerate()
            .map(|(i, &count)| HouseholdType {
                count,
                annual_kwh: self.annual_kwh.get(i).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.dt_s"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a thousand households against a
    /// synthetic wind park of matching size for one day.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            track: TrackConfig::default(),
            carts: CartsConfig::default(),
            controller: ControllerConfig::default(),
            supply: SupplyConfig::default(),
            demand: DemandConfig::default(),
        }
    }

    /// Returns the windy preset: gusty wind over two days with deeper reserves.
    pub fn windy() -> Self {
        Self {
            simulation: SimulationConfig {
                duration_s: 2.0 * SECONDS_PER_DAY,
                ..SimulationConfig::default()
            },
            carts: CartsConfig {
                reserve_top: 1000,
                reserve_bottom: 1000,
            },
            supply: SupplyConfig {
                model: "gusty".to_string(),
                multiplier: 1200.0,
                alpha: 0.8,
                gust_noise_std: 0.4,
                ..SupplyConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the large-park preset: a town-sized grid and fifteen thousand
    /// carts parked at each end.
    pub fn large_park() -> Self {
        Self {
            carts: CartsConfig {
                reserve_top: 15_000,
                reserve_bottom: 15_000,
            },
            controller: ControllerConfig {
                max_speed: 15.0,
                ..ControllerConfig::default()
            },
            supply: SupplyConfig {
                multiplier: 67_000.0,
                ..SupplyConfig::default()
            },
            demand: DemandConfig {
                multiplier: 67_000.0,
                households: vec![67_000.0],
                ..DemandConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "windy", "large_park"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "windy" => Ok(Self::windy()),
            "large_park" => Ok(Self::large_park()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !(s.dt_s.is_finite() && s.dt_s > 0.0) {
            errors.push(ConfigError::new("simulation.dt_s", "must be > 0"));
        }
        if !(s.duration_s.is_finite() && s.duration_s >= 0.0) {
            errors.push(ConfigError::new("simulation.duration_s", "must be >= 0"));
        }
        if !(s.warmup_s.is_finite() && s.warmup_s >= 0.0) {
            errors.push(ConfigError::new("simulation.warmup_s", "must be >= 0"));
        }
        if !(s.start_day.is_finite() && s.start_day >= 0.0) {
            errors.push(ConfigError::new("simulation.start_day", "must be >= 0"));
        }
        if s.dt_s > 0.0 && (s.warmup_s + s.duration_s) / s.dt_s >= MAX_STEPS as f64 {
            errors.push(ConfigError::new(
                "simulation.duration_s",
                format!("warm-up plus duration exceeds {MAX_STEPS} ticks"),
            ));
        }

        if let Err(e) = self.track.params().validate() {
            errors.push(ConfigError::new("track", e.to_string()));
        }

        let c = &self.controller;
        if !(c.max_acceleration.is_finite() && c.max_acceleration >= 0.0) {
            errors.push(ConfigError::new("controller.max_acceleration", "must be >= 0"));
        }
        if !(c.max_speed.is_finite() && c.max_speed > 0.0) {
            errors.push(ConfigError::new("controller.max_speed", "must be > 0"));
        }

        let sup = &self.supply;
        match sup.model.as_str() {
            "synthetic" | "gusty" => {}
            "dataset" => {
                if sup.path.is_none() {
                    errors.push(ConfigError::new("supply.path", "required for the dataset model"));
                }
                if sup.windmills == 0 {
                    errors.push(ConfigError::new("supply.windmills", "must be > 0"));
                }
            }
            other => errors.push(ConfigError::new(
                "supply.model",
                format!("must be \"synthetic\", \"gusty\" or \"dataset\", got \"{other}\""),
            )),
        }
        if !(sup.multiplier.is_finite() && sup.multiplier >= 0.0) {
            errors.push(ConfigError::new("supply.multiplier", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&sup.alpha) {
            errors.push(ConfigError::new("supply.alpha", "must be in [0.0, 1.0]"));
        }
        if !(sup.gust_noise_std.is_finite() && sup.gust_noise_std >= 0.0) {
            errors.push(ConfigError::new("supply.gust_noise_std", "must be >= 0"));
        }

        let dem = &self.demand;
        match dem.model.as_str() {
            "synthetic" => {}
            "dataset" => {
                if dem.path.is_none() {
                    errors.push(ConfigError::new("demand.path", "required for the dataset model"));
                }
                if dem.households.is_empty() {
                    errors.push(ConfigError::new("demand.households", "must list at least one type"));
                }
            }
            other => errors.push(ConfigError::new(
                "demand.model",
                format!("must be \"synthetic\" or \"dataset\", got \"{other}\""),
            )),
        }
        if !(dem.multiplier.is_finite() && dem.multiplier >= 0.0) {
            errors.push(ConfigError::new("demand.multiplier", "must be >= 0"));
        }
        if dem.households.iter().chain(&dem.annual_kwh).any(|v| !(v.is_finite() && *v >= 0.0)) {
            errors.push(ConfigError::new(
                "demand.households",
                "counts and annual_kwh must be >= 0",
            ));
        }
        if dem.annual_kwh.len() > dem.households.len() {
            errors.push(ConfigError::new(
                "demand.annual_kwh",
                "has more entries than demand.households",
            ));
        }

        errors
    }

    /// Run timing for [`Simulation`].
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid timing values.
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let s = &self.simulation;
        let cfg = SimConfig {
            dt_s: s.dt_s,
            duration_s: s.duration_s,
            warmup_s: s.warmup_s,
            start_day: s.start_day,
        };
        cfg.validate()
            .map_err(|e| ConfigError::new("simulation", e.to_string()))?;
        Ok(cfg)
    }

    /// Builds the track with both reserves filled and the rail empty.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the track parameters are invalid.
    pub fn build_track(&self) -> Result<CartTrack, ConfigError> {
        CartTrack::new(
            self.track.params(),
            self.carts.reserve_top,
            self.carts.reserve_bottom,
        )
        .map_err(|e| ConfigError::new("track", e.to_string()))
    }

    /// Builds the controller for this scenario's tick length.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for invalid limits or tick length.
    pub fn build_controller(&self) -> Result<Controller, ConfigError> {
        let params = ControllerParams {
            max_acceleration: self.controller.max_acceleration,
            max_speed: self.controller.max_speed,
            allow_new_carts: self.controller.allow_new_carts,
        };
        Controller::new(params, self.simulation.dt_s)
            .map_err(|e| ConfigError::new("controller", e.to_string()))
    }

    /// Builds the supply profile, loading its dataset when needed.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown model, a missing dataset path,
    /// or a dataset that fails to load.
    pub fn build_supply(&self) -> Result<Supply, ConfigError> {
        let sup = &self.supply;
        match sup.model.as_str() {
            "synthetic" => Ok(Supply::Synthetic(SyntheticWind::new(sup.multiplier))),
            "gusty" => {
                let horizon_s = self.simulation.warmup_s
                    + self.simulation.duration_s
                    + self.simulation.start_day * SECONDS_PER_DAY
                    + self.simulation.dt_s;
                GustyWind::new(
                    sup.multiplier,
                    sup.alpha,
                    sup.gust_noise_std,
                    horizon_s,
                    sup.seed,
                )
                .map(Supply::Gusty)
                .map_err(|e| ConfigError::new("supply", e.to_string()))
            }
            "dataset" => {
                let path = sup
                    .path
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("supply.path", "required for the dataset model"))?;
                WindSupply::from_path(path, sup.windmills)
                    .map(Supply::Dataset)
                    .map_err(|e| ConfigError::new("supply.path", e.to_string()))
            }
            other => Err(ConfigError::new(
                "supply.model",
                format!("unknown model \"{other}\""),
            )),
        }
    }

    /// Builds the demand profile, loading its dataset when needed.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown model, a missing dataset path,
    /// or a dataset that fails to load.
    pub fn build_demand(&self) -> Result<Demand, ConfigError> {
        let dem = &self.demand;
        match dem.model.as_str() {
            "synthetic" => Ok(Demand::Synthetic(SyntheticHouseholds::new(dem.multiplier))),
            "dataset" => {
                let path = dem
                    .path
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("demand.path", "required for the dataset model"))?;
                Households::from_path(path, &dem.household_types())
                    .map(Demand::Dataset)
                    .map_err(|e| ConfigError::new("demand.path", e.to_string()))
            }
            other => Err(ConfigError::new(
                "demand.model",
                format!("unknown model \"{other}\""),
            )),
        }
    }

    /// Assembles a ready-to-run simulation.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` hit while building a component.
    pub fn build_simulation(&self) -> Result<Simulation<Supply, Demand>, ConfigError> {
        Simulation::new(
            self.sim_config()?,
            self.build_track()?,
            self.build_controller()?,
            self.build_supply()?,
            self.build_demand()?,
        )
        .map_err(|e| ConfigError::new("simulation", e.to_string()))
    }
}
