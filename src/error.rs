//! Error types for the storage engine, time-series sources, and scenario loading.

use thiserror::Error;

use crate::storage::CartEnd;

/// Result type for storage engine operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the storage engine.
///
/// Construction errors are fatal for a run; the remaining variants describe
/// operations that could not be applied and leave the state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// A geometry or physical parameter is outside its valid range.
    #[error("invalid track parameter: {what}")]
    InvalidParameter { what: &'static str },

    /// The operation needs at least one cart on the track.
    #[error("no carts on the track")]
    EmptyTrack,

    /// A cart index does not refer to a cart on the track.
    #[error("cart index {index} out of range (carts on track: {len})")]
    CartIndexOutOfRange { index: usize, len: usize },

    /// The tick length must be strictly positive for this operation.
    #[error("time step must be > 0, got {dt}")]
    NonPositiveStep { dt: f64 },

    /// The controller was built for a different tick than the run uses.
    #[error("controller tick {controller_dt} s does not match run tick {run_dt} s")]
    StepMismatch { run_dt: f64, controller_dt: f64 },
}

/// Reasons a cart injection was refused.
///
/// Rejections are routine: the controller absorbs them and carries on.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InjectionError {
    /// No parked carts left at the requested end.
    #[error("{end} reserve is empty")]
    ReserveEmpty { end: CartEnd },

    /// The nearest cart at the requested end is closer than the minimal spacing.
    #[error("nearest cart at {end} is only {gap_m:.2} m from the entry point")]
    TooClose { end: CartEnd, gap_m: f64 },
}

/// Result type for loading time-series sources.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while building supply or demand sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The dataset file could not be opened or read.
    #[error("cannot read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset is not valid CSV.
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A field could not be interpreted.
    #[error("row {row}: {what}")]
    Parse { row: usize, what: String },

    /// Interpolation needs at least two samples.
    #[error("time series needs at least 2 samples, got {len}")]
    TooShort { len: usize },

    /// Sample times must be strictly increasing.
    #[error("sample times must be strictly increasing (row {row})")]
    NotIncreasing { row: usize },

    /// A model parameter is outside its valid range.
    #[error("invalid source parameter: {what}")]
    InvalidParameter { what: &'static str },
}
