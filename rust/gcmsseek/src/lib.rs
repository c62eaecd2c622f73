pub mod alignment;
pub mod area;
pub mod config;
pub mod detection;
pub mod errors;
pub mod filters;
pub mod models;
pub mod pipeline;

pub use alignment::{
    common_ion,
    fill_gaps,
    Alignment,
    AlignmentConfig,
    AlignmentTables,
    AreaSource,
    GapFillConfig,
};
pub use area::AreaConfig;
pub use config::PipelineConfig;
pub use detection::{
    biller_biemann,
    DetectionConfig,
};
pub use errors::{
    GcmsSeekError,
    Result,
};
pub use filters::{
    FilterConfig,
    IonCutoff,
};
pub use models::{
    Experiment,
    IonAreas,
    Peak,
    PeakBounds,
    PeakKind,
};
pub use pipeline::{
    align_between_states,
    align_experiments,
    process_matrix,
    process_run,
};
