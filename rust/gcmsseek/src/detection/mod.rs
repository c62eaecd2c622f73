pub mod biller_biemann;

pub use biller_biemann::{
    biller_biemann,
    get_maxima_indices,
    get_maxima_list,
    get_maxima_list_reduced,
    get_maxima_matrix,
    sum_maxima,
    DetectionConfig,
};
