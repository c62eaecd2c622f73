#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::binning::{
    build_intensity_matrix,
    BinningConfig,
};
pub use crate::models::{
    Array2D,
    ChromatogramKind,
    IntensityMatrix,
    IonChromatogram,
    MassSpectrum,
    Scan,
};
pub use crate::noise::{
    trough_noise,
    window_noise,
    NoiseConfig,
    WindowNoiseConfig,
    WindowSize,
};
pub use crate::utils::TimeSpec;

// Declare modules
pub mod binning;
pub mod errors;
pub mod models;
pub mod noise;
pub mod utils;

// Re-export errors
pub use crate::errors::{
    DataShapeError,
    GcmsQueryError,
    InsufficientDataError,
    ParameterError,
};
