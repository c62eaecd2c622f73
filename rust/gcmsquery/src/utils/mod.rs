pub mod sorted;
pub mod stats;
pub mod time;

pub use time::TimeSpec;
