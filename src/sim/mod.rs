/// Fixed-step simulated-time clock.
pub mod clock;
pub mod controller;
pub mod engine;
pub mod kpi;
pub mod power_balance;
pub mod types;

pub use controller::{ControlDecision, Controller, ControllerParams};
pub use engine::Simulation;
