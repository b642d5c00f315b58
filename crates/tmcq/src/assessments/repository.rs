use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    AlertFilter, AlertId, AlertRecord, AuditFilter, AuditStats, CaseAttemptRecord, CaseStats,
    ConsultationAuditRecord, ConsultationRequest, DoctorId, EvaluationRecord, QcmAttemptRecord,
    QcmKey, QcmStats, SeverityCounts, TierDistribution,
};
use crate::scoring::{AiAuditOutput, CaseAnswerKey, DoctorTrendStats};

/// Storage abstraction for attempts, evaluations, audits, and alerts.
///
/// Evaluation, audit, and alert tables are append-only; the only mutation is
/// the exactly-once alert resolution.
pub trait AssessmentStore: Send + Sync {
    fn qcm_key(&self, qcm_id: &str) -> Result<Option<QcmKey>, StoreError>;
    fn case_key(&self, case_id: &str) -> Result<Option<Vec<CaseAnswerKey>>, StoreError>;

    fn append_qcm_attempt(&self, record: QcmAttemptRecord) -> Result<(), StoreError>;
    fn append_case_attempt(&self, record: CaseAttemptRecord) -> Result<(), StoreError>;
    fn qcm_stats(&self, doctor_id: &DoctorId) -> Result<QcmStats, StoreError>;
    fn case_stats(&self, doctor_id: &DoctorId) -> Result<CaseStats, StoreError>;

    fn append_evaluation(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError>;
    /// Evaluations of a doctor ordered by evaluation date, oldest first.
    fn evaluation_history(&self, doctor_id: &DoctorId)
        -> Result<Vec<EvaluationRecord>, StoreError>;
    /// Most recent evaluation of every evaluated doctor.
    fn latest_evaluations(&self) -> Result<Vec<EvaluationRecord>, StoreError>;
    /// Evaluations of all doctors dated at or after `since`.
    fn evaluations_since(&self, since: DateTime<Utc>) -> Result<Vec<EvaluationRecord>, StoreError>;

    fn append_audit(&self, record: ConsultationAuditRecord) -> Result<(), StoreError>;
    fn audit_stats(&self, doctor_id: &DoctorId) -> Result<AuditStats, StoreError>;
    /// Audits matching the filter, newest first. `limit` and `offset` are ignored.
    fn audits(&self, filter: &AuditFilter) -> Result<Vec<ConsultationAuditRecord>, StoreError>;

    fn append_alert(&self, record: AlertRecord) -> Result<AlertRecord, StoreError>;
    /// Flip `resolved` once; a second call fails with `AlreadyResolved`.
    fn resolve_alert(&self, id: &AlertId, at: DateTime<Utc>) -> Result<AlertRecord, StoreError>;
    /// Alerts matching the filter, newest first.
    fn alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("alert already resolved")]
    AlreadyResolved,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Review collaborator turning a consultation transcript into an audit document.
pub trait ConsultationAuditor: Send + Sync {
    fn audit(&self, request: &ConsultationRequest) -> Result<AiAuditOutput, AuditorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditorError {
    #[error("audit service unavailable: {0}")]
    Unavailable(String),
    #[error("audit service returned a malformed document: {0}")]
    MalformedResponse(String),
}

/// Outbound hook receiving every persisted alert (pager, e-mail, dashboard feed).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: &AlertRecord) -> Result<(), AlertError>;
}

/// Alert dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Per-doctor dashboard view assembled from the store.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorStatsView {
    pub doctor_id: DoctorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_evaluation: Option<EvaluationRecord>,
    pub qcm: QcmStats,
    pub clinical_cases: CaseStats,
    pub audits: AuditStats,
    pub unresolved_alerts: usize,
    pub trend: DoctorTrendStats,
}

/// Cross-doctor overview for supervisors.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStatsView {
    pub doctors_evaluated: usize,
    pub tier_distribution: TierDistribution,
    pub unresolved_alerts: SeverityCounts,
    pub flagged_audits: usize,
    /// Mean T-MCQ over the recent window, two decimals; `None` without evaluations.
    pub average_tmcq_30_days: Option<f64>,
}
