pub mod experiment;
pub mod peak;

pub use experiment::Experiment;
pub use peak::{
    IonAreas,
    Peak,
    PeakBounds,
    PeakKind,
};
