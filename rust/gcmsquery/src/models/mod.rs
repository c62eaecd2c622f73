pub mod base;
pub mod chromatogram;
pub mod intensity_matrix;
pub mod scan;
pub mod spectrum;

pub use base::Array2D;
pub use chromatogram::{
    ChromatogramKind,
    IonChromatogram,
};
pub use intensity_matrix::IntensityMatrix;
pub use scan::Scan;
pub use spectrum::MassSpectrum;
