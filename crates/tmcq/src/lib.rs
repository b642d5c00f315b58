//! T-MCQ competency scoring for doctors: composite scores, tier
//! classification, consultation audit alerts, and score trends, plus the
//! assessment service and HTTP routes built on top of them.

pub mod assessments;
pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;

pub use error::AppError;
