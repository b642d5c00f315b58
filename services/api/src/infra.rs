use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tmcq::assessments::{
    AlertError, AlertFilter, AlertId, AlertPublisher, AlertRecord, AssessmentStore, AuditFilter,
    AuditStats, AuditorError, CaseAttemptRecord, CaseStats, ConsultationAuditRecord, ConsultationAuditor,
    ConsultationRequest, DoctorId, EvaluationRecord, QcmAttemptRecord, QcmKey, QcmStats,
    StoreError,
};
use tmcq::error::AppError;
use tmcq::scoring::{AiAuditOutput, CaseAnswerKey};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Answer keys for QCMs and clinical cases, loaded from a JSON file.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnswerKeyCatalog {
    #[serde(default)]
    pub(crate) qcms: HashMap<String, QcmKey>,
    #[serde(default)]
    pub(crate) cases: HashMap<String, Vec<CaseAnswerKey>>,
}

impl AnswerKeyCatalog {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[derive(Default)]
struct AssessmentTables {
    qcm_keys: HashMap<String, QcmKey>,
    case_keys: HashMap<String, Vec<CaseAnswerKey>>,
    qcm_attempts: Vec<QcmAttemptRecord>,
    case_attempts: Vec<CaseAttemptRecord>,
    evaluations: Vec<EvaluationRecord>,
    audits: Vec<ConsultationAuditRecord>,
    alerts: Vec<AlertRecord>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentStore {
    tables: Arc<Mutex<AssessmentTables>>,
}

impl InMemoryAssessmentStore {
    pub(crate) fn with_catalog(catalog: AnswerKeyCatalog) -> Self {
        let store = Self::default();
        for (qcm_id, key) in catalog.qcms {
            store.register_qcm(qcm_id, key);
        }
        for (case_id, key) in catalog.cases {
            store.register_case(case_id, key);
        }
        store
    }

    pub(crate) fn register_qcm(&self, qcm_id: impl Into<String>, key: QcmKey) {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.qcm_keys.insert(qcm_id.into(), key);
    }

    pub(crate) fn register_case(&self, case_id: impl Into<String>, key: Vec<CaseAnswerKey>) {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.case_keys.insert(case_id.into(), key);
    }
}

impl AssessmentStore for InMemoryAssessmentStore {
    fn qcm_key(&self, qcm_id: &str) -> Result<Option<QcmKey>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.qcm_keys.get(qcm_id).cloned())
    }

    fn case_key(&self, case_id: &str) -> Result<Option<Vec<CaseAnswerKey>>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard.case_keys.get(case_id).cloned())
    }

    fn append_qcm_attempt(&self, record: QcmAttemptRecord) -> Result<(), StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.qcm_attempts.push(record);
        Ok(())
    }

    fn append_case_attempt(&self, record: CaseAttemptRecord) -> Result<(), StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.case_attempts.push(record);
        Ok(())
    }

    fn qcm_stats(&self, doctor_id: &DoctorId) -> Result<QcmStats, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(QcmStats::from_attempts(
            guard
                .qcm_attempts
                .iter()
                .filter(|attempt| &attempt.doctor_id == doctor_id),
        ))
    }

    fn case_stats(&self, doctor_id: &DoctorId) -> Result<CaseStats, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(CaseStats::from_attempts(
            guard
                .case_attempts
                .iter()
                .filter(|attempt| &attempt.doctor_id == doctor_id),
        ))
    }

    fn append_evaluation(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        if guard.evaluations.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Conflict);
        }
        guard.evaluations.push(record.clone());
        Ok(record)
    }

    fn evaluation_history(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        let mut history: Vec<_> = guard
            .evaluations
            .iter()
            .filter(|record| &record.doctor_id == doctor_id)
            .cloned()
            .collect();
        history.sort_by_key(|record| record.evaluation_date);
        Ok(history)
    }

    fn append_audit(&self, record: ConsultationAuditRecord) -> Result<(), StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.audits.push(record);
        Ok(())
    }

    fn audit_stats(&self, doctor_id: &DoctorId) -> Result<AuditStats, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(AuditStats::from_audits(
            guard
                .audits
                .iter()
                .filter(|audit| &audit.doctor_id == doctor_id),
        ))
    }

    fn append_alert(&self, record: AlertRecord) -> Result<AlertRecord, StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        if guard.alerts.iter().any(|existing| existing.id == record.id) {
            return Err(StoreError::Conflict);
        }
        guard.alerts.push(record.clone());
        Ok(record)
    }

    fn resolve_alert(&self, id: &AlertId, at: DateTime<Utc>) -> Result<AlertRecord, StoreError> {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let alert = guard
            .alerts
            .iter_mut()
            .find(|alert| &alert.id == id)
            .ok_or(StoreError::NotFound)?;
        if !alert.mark_resolved(at) {
            return Err(StoreError::AlreadyResolved);
        }
        Ok(alert.clone())
    }

    fn alerts(&self, filter: &AlertFilter) -> Result<Vec<AlertRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .alerts
            .iter()
            .rev()
            .filter(|alert| filter.matches(alert))
            .cloned()
            .collect())
    }

    fn latest_evaluations(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        let mut latest: HashMap<&str, &EvaluationRecord> = HashMap::new();
        for record in &guard.evaluations {
            let entry = latest.entry(record.doctor_id.0.as_str()).or_insert(record);
            if record.evaluation_date >= entry.evaluation_date {
                *entry = record;
            }
        }
        let mut records: Vec<EvaluationRecord> = latest.into_values().cloned().collect();
        records.sort_by(|a, b| a.doctor_id.0.cmp(&b.doctor_id.0));
        Ok(records)
    }

    fn evaluations_since(&self, since: DateTime<Utc>) -> Result<Vec<EvaluationRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .evaluations
            .iter()
            .filter(|record| record.evaluation_date >= since)
            .cloned()
            .collect())
    }

    fn audits(&self, filter: &AuditFilter) -> Result<Vec<ConsultationAuditRecord>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        Ok(guard
            .audits
            .iter()
            .rev()
            .filter(|audit| filter.matches(audit))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<AlertRecord>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: &AlertRecord) -> Result<(), AlertError> {
        info!(
            alert_id = %alert.id.0,
            doctor_id = %alert.doctor_id.0,
            severity = alert.severity.label(),
            "alert forwarded"
        );
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert.clone());
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    #[cfg(test)]
    pub(crate) fn events(&self) -> Vec<AlertRecord> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

/// Auditor used when no review provider is wired in. Precomputed audit
/// documents can still be submitted through `/api/v1/audits`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UnconfiguredAuditor;

impl ConsultationAuditor for UnconfiguredAuditor {
    fn audit(&self, request: &ConsultationRequest) -> Result<AiAuditOutput, AuditorError> {
        warn!(doctor_id = %request.doctor_id.0, "consultation audit requested without a provider");
        Err(AuditorError::Unavailable(
            "no consultation audit provider configured".to_string(),
        ))
    }
}
