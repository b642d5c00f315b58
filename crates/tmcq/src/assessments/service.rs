use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    AlertFilter, AlertId, AlertRecord, AttemptId, AuditFilter, AuditId, CaseAttemptRecord,
    CaseAttemptRequest, ConsultationAuditRecord, ConsultationRequest, DoctorId, EvaluationId,
    EvaluationInput, EvaluationRecord, QcmAttemptOutcome, QcmAttemptRecord, QcmAttemptRequest,
    SeverityCounts, TierDistribution,
};
use super::repository::{
    AlertError, AlertPublisher, AssessmentStore, AuditorError, ConsultationAuditor,
    DoctorStatsView, GlobalStatsView, StoreError,
};
use crate::scoring::{
    compute_audit_global_score, compute_composite, compute_trend, evaluate_alert, grade_case,
    grade_qcm, validate_score, AiAuditOutput, DoctorTrendStats, ScoringError,
};

/// Number of evaluations returned by history listings unless overridden.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Page size for audit listings when the caller sets no limit.
pub const DEFAULT_AUDIT_PAGE_SIZE: usize = 50;

/// Days covered by the recent T-MCQ average in the global overview.
pub const RECENT_AVERAGE_DAYS: i64 = 30;

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static AUDIT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ALERT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ATTEMPT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

fn next_audit_id() -> AuditId {
    let id = AUDIT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AuditId(format!("audit-{id:06}"))
}

fn next_alert_id() -> AlertId {
    let id = ALERT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AlertId(format!("alert-{id:06}"))
}

fn next_attempt_id(kind: &str) -> AttemptId {
    let id = ATTEMPT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AttemptId(format!("{kind}-att-{id:06}"))
}

/// Result of recording one consultation review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOutcome {
    pub audit: ConsultationAuditRecord,
    pub alert: Option<AlertRecord>,
}

/// Service composing the assessment store, audit reviewer, and alert hook
/// around the scoring engine.
pub struct AssessmentService<S, P, L> {
    store: Arc<S>,
    alerts: Arc<P>,
    auditor: Arc<L>,
    history_limit: usize,
}

impl<S, P, L> AssessmentService<S, P, L>
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    pub fn new(store: Arc<S>, alerts: Arc<P>, auditor: Arc<L>) -> Self {
        Self {
            store,
            alerts,
            auditor,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Compute and persist a T-MCQ from explicitly supplied sub-scores.
    pub fn record_evaluation(
        &self,
        doctor_id: &DoctorId,
        input: EvaluationInput,
    ) -> Result<EvaluationRecord, AssessmentServiceError> {
        require_present("doctor_id", &doctor_id.0)?;
        let qcm_score = validate_score("qcm_score", input.qcm_score)?;
        let clinical_cases_score =
            validate_score("clinical_cases_score", input.clinical_cases_score)?;
        let ai_audit_score = validate_score("ai_audit_score", input.ai_audit_score)?;

        let tmcq = compute_composite(qcm_score, clinical_cases_score, ai_audit_score);
        let record = EvaluationRecord {
            id: next_evaluation_id(),
            doctor_id: doctor_id.clone(),
            qcm_score,
            clinical_cases_score,
            ai_audit_score,
            tmcq,
            evaluation_date: Utc::now(),
        };

        let stored = self.store.append_evaluation(record)?;
        info!(
            doctor_id = %stored.doctor_id.0,
            evaluation_id = %stored.id.0,
            total = stored.tmcq.total,
            status = stored.tmcq.status.label(),
            "t-mcq evaluation recorded"
        );
        Ok(stored)
    }

    /// Derive the three sub-scores from stored attempts and audits, then
    /// record an evaluation. Missing data counts as zero.
    pub fn evaluate_from_store(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<EvaluationRecord, AssessmentServiceError> {
        let qcm = self.store.qcm_stats(doctor_id)?;
        let cases = self.store.case_stats(doctor_id)?;
        let audits = self.store.audit_stats(doctor_id)?;

        let input = EvaluationInput {
            qcm_score: qcm.success_rate.unwrap_or(0.0),
            clinical_cases_score: cases.average_score.unwrap_or(0.0),
            ai_audit_score: audits.average_score.unwrap_or(0.0),
        };
        debug!(doctor_id = %doctor_id.0, ?input, "derived evaluation inputs from store");

        self.record_evaluation(doctor_id, input)
    }

    /// Send a transcript to the audit reviewer and record its verdict.
    pub fn audit_consultation(
        &self,
        request: ConsultationRequest,
    ) -> Result<AuditOutcome, AssessmentServiceError> {
        require_present("doctor_id", &request.doctor_id.0)?;
        require_present("transcript", &request.transcript)?;

        let output = self.auditor.audit(&request)?;
        self.record_audit(request, output)
    }

    /// Persist an audit document with its derived score, and raise the
    /// highest-priority alert when one is warranted.
    pub fn record_audit(
        &self,
        request: ConsultationRequest,
        output: AiAuditOutput,
    ) -> Result<AuditOutcome, AssessmentServiceError> {
        require_present("doctor_id", &request.doctor_id.0)?;
        output.validate()?;

        let global_score = compute_audit_global_score(&output);
        let notice = evaluate_alert(&output);
        let created_at = Utc::now();

        let audit = ConsultationAuditRecord {
            id: next_audit_id(),
            doctor_id: request.doctor_id,
            consultation_id: request.consultation_id,
            patient: request.patient,
            raw_transcript: request.transcript,
            severity: output.severity,
            ai_output: output,
            global_score,
            flagged: notice.is_some(),
            created_at,
        };
        self.store.append_audit(audit.clone())?;
        info!(
            doctor_id = %audit.doctor_id.0,
            audit_id = %audit.id.0,
            global_score,
            flagged = audit.flagged,
            "consultation audit recorded"
        );

        let alert = match notice {
            Some(notice) => {
                let record = AlertRecord::from_notice(
                    next_alert_id(),
                    audit.doctor_id.clone(),
                    Some(audit.id.clone()),
                    notice,
                    created_at,
                );
                let stored = self.store.append_alert(record)?;
                warn!(
                    doctor_id = %stored.doctor_id.0,
                    alert_id = %stored.id.0,
                    alert_type = stored.alert_type.label(),
                    severity = stored.severity.label(),
                    "doctor alert raised"
                );
                self.alerts.publish(&stored)?;
                Some(stored)
            }
            None => None,
        };

        Ok(AuditOutcome { audit, alert })
    }

    pub fn record_qcm_attempt(
        &self,
        request: QcmAttemptRequest,
    ) -> Result<QcmAttemptOutcome, AssessmentServiceError> {
        require_present("doctor_id", &request.doctor_id.0)?;
        let key = self
            .store
            .qcm_key(&request.qcm_id)?
            .ok_or(StoreError::NotFound)?;

        let is_correct = grade_qcm(request.selected_answer, key.correct_answer);
        let record = QcmAttemptRecord {
            id: next_attempt_id("qcm"),
            doctor_id: request.doctor_id,
            qcm_id: request.qcm_id,
            selected_answer: request.selected_answer,
            is_correct,
            time_taken_seconds: request.time_taken_seconds,
            created_at: Utc::now(),
        };
        let attempt_id = record.id.clone();
        info!(doctor_id = %record.doctor_id.0, qcm_id = %record.qcm_id, is_correct, "qcm attempt recorded");
        self.store.append_qcm_attempt(record)?;

        Ok(QcmAttemptOutcome {
            attempt_id,
            is_correct,
            correct_answer: key.correct_answer,
            justification: key.justification,
        })
    }

    pub fn record_case_attempt(
        &self,
        request: CaseAttemptRequest,
    ) -> Result<CaseAttemptRecord, AssessmentServiceError> {
        require_present("doctor_id", &request.doctor_id.0)?;
        let key = self
            .store
            .case_key(&request.case_id)?
            .ok_or(StoreError::NotFound)?;

        let grade = grade_case(&request.answers, &key)?;
        let record = CaseAttemptRecord {
            id: next_attempt_id("case"),
            doctor_id: request.doctor_id,
            case_id: request.case_id,
            answers: request.answers,
            score: grade.score,
            correct_count: grade.correct_count,
            total_questions: grade.total_questions,
            feedback: grade.feedback,
            created_at: Utc::now(),
        };
        info!(doctor_id = %record.doctor_id.0, case_id = %record.case_id, score = record.score, "clinical case attempt recorded");
        self.store.append_case_attempt(record.clone())?;
        Ok(record)
    }

    pub fn resolve_alert(&self, alert_id: &AlertId) -> Result<AlertRecord, AssessmentServiceError> {
        let resolved = self.store.resolve_alert(alert_id, Utc::now())?;
        info!(alert_id = %resolved.id.0, doctor_id = %resolved.doctor_id.0, "alert resolved");
        Ok(resolved)
    }

    pub fn alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>, AssessmentServiceError> {
        let mut alerts = self.store.alerts(filter)?;
        if let Some(limit) = filter.limit {
            alerts.truncate(limit);
        }
        Ok(alerts)
    }

    /// Stored audits matching the filter, newest first, one page at a time.
    pub fn audits(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<ConsultationAuditRecord>, AssessmentServiceError> {
        let limit = filter.limit.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0);
        let page: Vec<_> = self
            .store
            .audits(filter)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();
        debug!(?filter, returned = page.len(), "audits listed");
        Ok(page)
    }

    /// Overview across all doctors: tiers of each latest evaluation, open
    /// alerts by severity, flagged audits, and the recent T-MCQ average.
    pub fn global_stats(&self) -> Result<GlobalStatsView, AssessmentServiceError> {
        let latest = self.store.latest_evaluations()?;
        let unresolved = self.store.alerts(&AlertFilter {
            resolved: Some(false),
            ..AlertFilter::default()
        })?;
        let flagged_audits = self.store.audits(&AuditFilter::flagged_only())?.len();

        let since = Utc::now() - Duration::days(RECENT_AVERAGE_DAYS);
        let recent = self.store.evaluations_since(since)?;
        let average_tmcq_30_days = if recent.is_empty() {
            None
        } else {
            let sum: f64 = recent
                .iter()
                .map(|record| f64::from(record.tmcq.total))
                .sum();
            Some((sum / recent.len() as f64 * 100.0).round() / 100.0)
        };
        debug!(doctors = latest.len(), recent = recent.len(), "global stats assembled");

        Ok(GlobalStatsView {
            doctors_evaluated: latest.len(),
            tier_distribution: TierDistribution::from_evaluations(&latest),
            unresolved_alerts: SeverityCounts::from_alerts(&unresolved),
            flagged_audits,
            average_tmcq_30_days,
        })
    }

    /// Most recent evaluations first, capped at the configured history limit.
    pub fn evaluation_history(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<Vec<EvaluationRecord>, AssessmentServiceError> {
        let mut history = self.store.evaluation_history(doctor_id)?;
        history.reverse();
        history.truncate(self.history_limit);
        Ok(history)
    }

    pub fn doctor_trend(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<DoctorTrendStats, AssessmentServiceError> {
        let history = self.store.evaluation_history(doctor_id)?;
        let totals: Vec<_> = history.iter().map(|record| record.tmcq).collect();
        Ok(compute_trend(&totals))
    }

    pub fn doctor_stats(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<DoctorStatsView, AssessmentServiceError> {
        let history = self.store.evaluation_history(doctor_id)?;
        let scores: Vec<_> = history.iter().map(|record| record.tmcq).collect();
        let unresolved_alerts = self
            .store
            .alerts(&AlertFilter::unresolved_for(doctor_id))?
            .len();

        Ok(DoctorStatsView {
            doctor_id: doctor_id.clone(),
            latest_evaluation: history.last().cloned(),
            qcm: self.store.qcm_stats(doctor_id)?,
            clinical_cases: self.store.case_stats(doctor_id)?,
            audits: self.store.audit_stats(doctor_id)?,
            unresolved_alerts,
            trend: compute_trend(&scores),
        })
    }
}

fn require_present(field: &'static str, value: &str) -> Result<(), AssessmentServiceError> {
    if value.trim().is_empty() {
        Err(AssessmentServiceError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auditor(#[from] AuditorError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}
