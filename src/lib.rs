//! Gravity cart storage simulator.
//!
//! A set of heavy carts on a fixed-angle incline buffers the mismatch between
//! an intermittent wind supply and household demand. The [`storage`] engine
//! owns the cart ensemble and its physics; the [`sim`] controller decides
//! every tick which carts enter or leave and how hard the generator brakes.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod io;
/// Simulation loop, controller, clock, and KPI modules.
pub mod sim;
pub mod sources;
pub mod storage;
