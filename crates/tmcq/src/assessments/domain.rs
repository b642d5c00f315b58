use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{
    AiAuditOutput, AlertNotice, AlertSeverity, AlertType, AnswerChoice, AuditSeverity,
    CompetencyTier, CompositeScore, QuestionFeedback,
};

/// Identifier wrapper for doctors known to the assessment store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoctorId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub String);

/// Raw sub-scores for a manual T-MCQ evaluation, each expected in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub qcm_score: f64,
    pub clinical_cases_score: f64,
    pub ai_audit_score: f64,
}

/// Append-only T-MCQ evaluation persisted per doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    pub doctor_id: DoctorId,
    pub qcm_score: f64,
    pub clinical_cases_score: f64,
    pub ai_audit_score: f64,
    pub tmcq: CompositeScore,
    pub evaluation_date: DateTime<Utc>,
}

/// Optional patient metadata forwarded to the audit service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    #[serde(default)]
    pub patient_age: Option<u16>,
    #[serde(default)]
    pub patient_sex: Option<String>,
    #[serde(default)]
    pub chief_complaint: Option<String>,
}

/// Consultation transcript submitted for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub doctor_id: DoctorId,
    #[serde(default)]
    pub consultation_id: Option<String>,
    pub transcript: String,
    #[serde(flatten)]
    pub patient: PatientContext,
}

/// Stored consultation review: the audit document verbatim plus derived scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationAuditRecord {
    pub id: AuditId,
    pub doctor_id: DoctorId,
    pub consultation_id: Option<String>,
    #[serde(flatten)]
    pub patient: PatientContext,
    pub raw_transcript: String,
    pub ai_output: AiAuditOutput,
    pub global_score: i32,
    pub flagged: bool,
    pub severity: AuditSeverity,
    pub created_at: DateTime<Utc>,
}

/// Doctor alert. `resolved` flips to true once and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: AlertId,
    pub doctor_id: DoctorId,
    pub audit_id: Option<AuditId>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn from_notice(
        id: AlertId,
        doctor_id: DoctorId,
        audit_id: Option<AuditId>,
        notice: AlertNotice,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            doctor_id,
            audit_id,
            alert_type: notice.alert_type,
            severity: notice.severity,
            message: notice.message,
            resolved: false,
            resolved_at: None,
            created_at,
        }
    }

    /// Mark the alert resolved. Returns false when it already was.
    pub fn mark_resolved(&mut self, at: DateTime<Utc>) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.resolved_at = Some(at);
        true
    }
}

/// Answer key the content store holds for a generated QCM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcmKey {
    pub correct_answer: AnswerChoice,
    #[serde(default)]
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcmAttemptRequest {
    pub doctor_id: DoctorId,
    pub qcm_id: String,
    pub selected_answer: AnswerChoice,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcmAttemptRecord {
    pub id: AttemptId,
    pub doctor_id: DoctorId,
    pub qcm_id: String,
    pub selected_answer: AnswerChoice,
    pub is_correct: bool,
    pub time_taken_seconds: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Result returned to the doctor after answering a QCM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcmAttemptOutcome {
    pub attempt_id: AttemptId,
    pub is_correct: bool,
    pub correct_answer: AnswerChoice,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAttemptRequest {
    pub doctor_id: DoctorId,
    pub case_id: String,
    pub answers: Vec<AnswerChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAttemptRecord {
    pub id: AttemptId,
    pub doctor_id: DoctorId,
    pub case_id: String,
    pub answers: Vec<AnswerChoice>,
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub feedback: Vec<QuestionFeedback>,
    pub created_at: DateTime<Utc>,
}

/// QCM attempt aggregate for one doctor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QcmStats {
    pub total_attempts: usize,
    pub correct_answers: usize,
    pub success_rate: Option<f64>,
}

impl QcmStats {
    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a QcmAttemptRecord>) -> Self {
        let mut stats = QcmStats::default();
        for attempt in attempts {
            stats.total_attempts += 1;
            if attempt.is_correct {
                stats.correct_answers += 1;
            }
        }
        if stats.total_attempts > 0 {
            stats.success_rate =
                Some(stats.correct_answers as f64 / stats.total_attempts as f64 * 100.0);
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseStats {
    pub total_attempts: usize,
    pub average_score: Option<f64>,
}

impl CaseStats {
    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a CaseAttemptRecord>) -> Self {
        let scores: Vec<f64> = attempts
            .into_iter()
            .map(|attempt| f64::from(attempt.score))
            .collect();
        Self {
            total_attempts: scores.len(),
            average_score: mean(&scores),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_audits: usize,
    pub average_score: Option<f64>,
    pub flagged_count: usize,
}

impl AuditStats {
    pub fn from_audits<'a>(
        audits: impl IntoIterator<Item = &'a ConsultationAuditRecord>,
    ) -> Self {
        let mut flagged_count = 0;
        let scores: Vec<f64> = audits
            .into_iter()
            .inspect(|audit| {
                if audit.flagged {
                    flagged_count += 1;
                }
            })
            .map(|audit| f64::from(audit.global_score))
            .collect();
        Self {
            total_audits: scores.len(),
            average_score: mean(&scores),
            flagged_count,
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Listing filter for alerts; every field narrows the result when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub resolved: Option<bool>,
    #[serde(default)]
    pub severity: Option<AlertSeverity>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn unresolved_for(doctor_id: &DoctorId) -> Self {
        Self {
            resolved: Some(false),
            doctor_id: Some(doctor_id.0.clone()),
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &AlertRecord) -> bool {
        self.resolved.map_or(true, |resolved| alert.resolved == resolved)
            && self.severity.map_or(true, |severity| alert.severity == severity)
            && self
                .doctor_id
                .as_deref()
                .map_or(true, |doctor_id| alert.doctor_id.0 == doctor_id)
    }
}

/// Listing filter for consultation audits. Paging is applied by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    #[serde(default)]
    pub flagged: Option<bool>,
    #[serde(default)]
    pub severity: Option<AuditSeverity>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl AuditFilter {
    pub fn flagged_only() -> Self {
        Self {
            flagged: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, audit: &ConsultationAuditRecord) -> bool {
        self.flagged.map_or(true, |flagged| audit.flagged == flagged)
            && self.severity.map_or(true, |severity| audit.severity == severity)
            && self
                .doctor_id
                .as_deref()
                .map_or(true, |doctor_id| audit.doctor_id.0 == doctor_id)
    }
}

/// Doctors per tier, counted over each doctor's latest evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub apte: usize,
    pub supervision: usize,
    pub formation_requise: usize,
}

impl TierDistribution {
    pub fn from_evaluations<'a>(
        evaluations: impl IntoIterator<Item = &'a EvaluationRecord>,
    ) -> Self {
        let mut distribution = Self::default();
        for record in evaluations {
            match record.tmcq.status {
                CompetencyTier::Apte => distribution.apte += 1,
                CompetencyTier::Supervision => distribution.supervision += 1,
                CompetencyTier::FormationRequise => distribution.formation_requise += 1,
            }
        }
        distribution
    }
}

/// Alert counts keyed by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a AlertRecord>) -> Self {
        let mut counts = Self::default();
        for alert in alerts {
            match alert.severity {
                AlertSeverity::Low => counts.low += 1,
                AlertSeverity::Medium => counts.medium += 1,
                AlertSeverity::High => counts.high += 1,
                AlertSeverity::Critical => counts.critical += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high + self.critical
    }
}
