//! Load passes for the CAL-ACCESS to OCD pipeline.

pub mod candidacies;
pub mod common;
pub mod contests;
pub mod observability;
pub mod parties;
pub mod schedule_g;
pub mod seed;

// Re-export commonly used types
pub use cal_core::domain::Form501Filing;
