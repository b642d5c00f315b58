//! T-MCQ composite scoring, audit alerting, and trend statistics.
//!
//! Everything in this module is pure: no I/O, no clock reads, and identical
//! inputs always produce identical outputs. Range checks are the caller's job
//! through [`validate_score`]; the calculators themselves never clamp.

mod alerts;
mod audit;
mod composite;
mod grading;
mod trend;
mod weights;

pub use alerts::{
    build_alert_message, evaluate_alert, should_alert, AlertNotice, AlertSeverity, AlertType,
};
pub use audit::{
    compute_audit_global_score, AiAuditOutput, AnamneseDetails, AuditSeverity,
    PrescriptionAnalysis,
};
pub use composite::{
    compute_composite, compute_composite_from_sub_scores, CompetencyTier, CompositeScore,
    SubScoreSet,
};
pub use grading::{
    grade_case, grade_qcm, AnswerChoice, CaseAnswerKey, CaseGrade, QuestionFeedback,
};
pub use trend::{classify_trend, compute_trend, DoctorTrendStats, Trend};
pub use weights::{
    AlertThresholds, AuditWeights, CompositeWeights, TierThresholds, TREND_BAND, TREND_WINDOW,
};

#[cfg(test)]
pub(crate) use audit::fixtures;

/// Lowest and highest admissible raw score.
pub const SCORE_RANGE: (f64, f64) = (0.0, 100.0);

/// Errors raised when raw inputs cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("{field} must be a finite score between 0 and 100 (got {value})")]
    InvalidScore { field: &'static str, value: f64 },
    #[error("clinical case has no questions to grade against")]
    EmptyAnswerKey,
}

/// Reject NaN, infinities, and values outside `[0, 100]`.
pub fn validate_score(field: &'static str, value: f64) -> Result<f64, ScoringError> {
    let (min, max) = SCORE_RANGE;
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ScoringError::InvalidScore { field, value })
    }
}

/// Round half away from zero. Results beyond the `i32` range saturate at
/// `i32::MIN`/`i32::MAX`; validated inputs never get there.
pub(crate) fn round_score(value: f64) -> i32 {
    value.round() as i32
}
