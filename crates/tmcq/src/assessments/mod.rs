//! Doctor assessment tracking: attempts, T-MCQ evaluations, consultation
//! audits, and the alerts they raise.
//!
//! Storage, the audit reviewer, and alert delivery are collaborator traits so
//! the service and router can be exercised against in-memory implementations.

pub mod domain;
pub mod history;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AlertFilter, AlertId, AlertRecord, AttemptId, AuditFilter, AuditId, AuditStats,
    CaseAttemptRecord, CaseAttemptRequest, CaseStats, ConsultationAuditRecord,
    ConsultationRequest, DoctorId, EvaluationId, EvaluationInput, EvaluationRecord,
    PatientContext, QcmAttemptOutcome, QcmAttemptRecord, QcmAttemptRequest, QcmKey, QcmStats,
    SeverityCounts, TierDistribution,
};
pub use history::{load_history, load_history_from_path, HistoryEntry, HistoryImportError};
pub use repository::{
    AlertError, AlertPublisher, AssessmentStore, AuditorError, ConsultationAuditor,
    DoctorStatsView, GlobalStatsView, StoreError,
};
pub use router::{assessment_router, RecordAuditRequest};
pub use service::{
    AssessmentService, AssessmentServiceError, AuditOutcome, DEFAULT_AUDIT_PAGE_SIZE,
    DEFAULT_HISTORY_LIMIT, RECENT_AVERAGE_DAYS,
};
