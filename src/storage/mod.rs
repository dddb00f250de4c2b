//! Gravity storage engine: an ensemble of carts on a fixed-angle incline.

/// Cart track state, force model, and physics integration.
pub mod track;
pub mod types;

pub use track::CartTrack;
pub use types::{CartEnd, GRAVITY, Losses, TickReport, TrackParams};
