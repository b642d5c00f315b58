use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::assessments::domain::{
    AlertFilter, AlertId, AlertRecord, AuditFilter, AuditStats, CaseAttemptRecord, CaseStats,
    ConsultationAuditRecord, ConsultationRequest, DoctorId, EvaluationRecord, PatientContext,
    QcmAttemptRecord, QcmKey, QcmStats,
};
use crate::assessments::repository::{
    AlertError, AlertPublisher, AssessmentStore, AuditorError, ConsultationAuditor, StoreError,
};
use crate::assessments::{assessment_router, AssessmentService};
use crate::scoring::{fixtures::uniform_audit, AiAuditOutput, AnswerChoice, CaseAnswerKey};

pub(super) type TestService = AssessmentService<MemoryStore, MemoryAlerts, ScriptedAuditor>;

pub(super) fn doctor() -> DoctorId {
    DoctorId("doc-aline".to_string())
}

pub(super) fn consultation(doctor_id: &DoctorId) -> ConsultationRequest {
    ConsultationRequest {
        doctor_id: doctor_id.clone(),
        consultation_id: Some("consult-17".to_string()),
        transcript: "Patient reports three days of fever and headache.".to_string(),
        patient: PatientContext {
            patient_age: Some(34),
            patient_sex: Some("F".to_string()),
            chief_complaint: Some("fever".to_string()),
        },
    }
}

pub(super) fn audit(score: f64) -> AiAuditOutput {
    uniform_audit(score)
}

pub(super) fn build_service() -> (TestService, Arc<MemoryStore>, Arc<MemoryAlerts>) {
    build_service_with_auditor(ScriptedAuditor::returning(audit(82.0)))
}

pub(super) fn build_service_with_auditor(
    auditor: ScriptedAuditor,
) -> (TestService, Arc<MemoryStore>, Arc<MemoryAlerts>) {
    let store = Arc::new(MemoryStore::seeded());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = AssessmentService::new(store.clone(), alerts.clone(), Arc::new(auditor));
    (service, store, alerts)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    assessment_router(Arc::new(service))
}

#[derive(Default)]
struct Tables {
    qcm_keys: HashMap<String, QcmKey>,
    case_keys: HashMap<String, Vec<CaseAnswerKey>>,
    qcm_attempts: Vec<QcmAttemptRecord>,
    case_attempts: Vec<CaseAttemptRecord>,
    evaluations: Vec<EvaluationRecord>,
    audits: Vec<ConsultationAuditRecord>,
    alerts: Vec<AlertRecord>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub(super) fn seeded() -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().expect("store mutex poisoned");
            tables.qcm_keys.insert(
                "qcm-malaria-1".to_string(),
                QcmKey {
                    correct_answer: AnswerChoice::C,
                    justification: "Artemether-lumefantrine is first line.".to_string(),
                },
            );
            tables.case_keys.insert(
                "case-chest-pain".to_string(),
                vec![
                    CaseAnswerKey {
                        correct: AnswerChoice::A,
                        rationale: "ECG within ten minutes.".to_string(),
                    },
                    CaseAnswerKey {
                        correct: AnswerChoice::D,
                        rationale: "Aspirin unless contraindicated.".to_string(),
                    },
                ],
            );
        }
        store
    }

    pub(super) fn alerts_snapshot(&self) -> Vec<AlertRecord> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .alerts
            .clone()
    }

    pub(super) fn audits_snapshot(&self) -> Vec<ConsultationAuditRecord> {
        self.tables
            .lock()
            .expect("store mutex poisoned")
            .audits
            .clone()
    }
}

impl AssessmentStore for MemoryStore {
    fn qcm_key(&self, qcm_id: &str) -> Result<Option<QcmKey>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.qcm_keys.get(qcm_id).cloned())
    }

    fn case_key(&self, case_id: &str) -> Result<Option<Vec<CaseAnswerKey>>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables.case_keys.get(case_id).cloned())
    }

    fn append_qcm_attempt(&self, record: QcmAttemptRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.qcm_attempts.push(record);
        Ok(())
    }

    fn append_case_attempt(&self, record: CaseAttemptRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.case_attempts.push(record);
        Ok(())
    }

    fn qcm_stats(&self, doctor_id: &DoctorId) -> Result<QcmStats, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(QcmStats::from_attempts(
            tables
                .qcm_attempts
                .iter()
                .filter(|attempt| &attempt.doctor_id == doctor_id),
        ))
    }

    fn case_stats(&self, doctor_id: &DoctorId) -> Result<CaseStats, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(CaseStats::from_attempts(
            tables
                .case_attempts
                .iter()
                .filter(|attempt| &attempt.doctor_id == doctor_id),
        ))
    }

    fn append_evaluation(&self, record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.evaluations.push(record.clone());
        Ok(record)
    }

    fn evaluation_history(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        let mut history: Vec<_> = tables
            .evaluations
            .iter()
            .filter(|record| &record.doctor_id == doctor_id)
            .cloned()
            .collect();
        history.sort_by_key(|record| record.evaluation_date);
        Ok(history)
    }

    fn append_audit(&self, record: ConsultationAuditRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        tables.audits.push(record);
        Ok(())
    }

    fn audit_stats(&self, doctor_id: &DoctorId) -> Result<AuditStats, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(AuditStats::from_audits(
            tables
                .audits
                .iter()
                .filter(|audit| &audit.doctor_id == doctor_id),
        ))
    }

    fn append_alert(&self, record: AlertRecord) -> Result<AlertRecord, StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        if tables.alerts.iter().any(|alert| alert.id == record.id) {
            return Err(StoreError::Conflict);
        }
        tables.alerts.push(record.clone());
        Ok(record)
    }

    fn resolve_alert(&self, id: &AlertId, at: DateTime<Utc>) -> Result<AlertRecord, StoreError> {
        let mut tables = self.tables.lock().expect("store mutex poisoned");
        let alert = tables
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
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .alerts
            .iter()
            .rev()
            .filter(|alert| filter.matches(alert))
            .cloned()
            .collect())
    }

    fn latest_evaluations(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        let mut latest: HashMap<String, EvaluationRecord> = HashMap::new();
        for record in &tables.evaluations {
            let newer = latest
                .get(&record.doctor_id.0)
                .map_or(true, |current| record.evaluation_date >= current.evaluation_date);
            if newer {
                latest.insert(record.doctor_id.0.clone(), record.clone());
            }
        }
        let mut records: Vec<_> = latest.into_values().collect();
        records.sort_by(|a, b| a.doctor_id.0.cmp(&b.doctor_id.0));
        Ok(records)
    }

    fn evaluations_since(&self, since: DateTime<Utc>) -> Result<Vec<EvaluationRecord>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .evaluations
            .iter()
            .filter(|record| record.evaluation_date >= since)
            .cloned()
            .collect())
    }

    fn audits(&self, filter: &AuditFilter) -> Result<Vec<ConsultationAuditRecord>, StoreError> {
        let tables = self.tables.lock().expect("store mutex poisoned");
        Ok(tables
            .audits
            .iter()
            .rev()
            .filter(|audit| filter.matches(audit))
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<AlertRecord>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<AlertRecord> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: &AlertRecord) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert.clone());
        Ok(())
    }
}

pub(super) struct OfflineAlerts;

impl AlertPublisher for OfflineAlerts {
    fn publish(&self, _alert: &AlertRecord) -> Result<(), AlertError> {
        Err(AlertError::Transport("pager offline".to_string()))
    }
}

/// Auditor returning a canned document, or a canned failure.
pub(super) struct ScriptedAuditor {
    output: Option<AiAuditOutput>,
    requests: Mutex<Vec<ConsultationRequest>>,
}

impl ScriptedAuditor {
    pub(super) fn returning(output: AiAuditOutput) -> Self {
        Self {
            output: Some(output),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn offline() -> Self {
        Self {
            output: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn request_count(&self) -> usize {
        self.requests.lock().expect("auditor mutex poisoned").len()
    }
}

impl ConsultationAuditor for ScriptedAuditor {
    fn audit(&self, request: &ConsultationRequest) -> Result<AiAuditOutput, AuditorError> {
        self.requests
            .lock()
            .expect("auditor mutex poisoned")
            .push(request.clone());
        self.output
            .clone()
            .ok_or_else(|| AuditorError::Unavailable("no provider configured".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl AssessmentStore for UnavailableStore {
    fn qcm_key(&self, _qcm_id: &str) -> Result<Option<QcmKey>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn case_key(&self, _case_id: &str) -> Result<Option<Vec<CaseAnswerKey>>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn append_qcm_attempt(&self, _record: QcmAttemptRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn append_case_attempt(&self, _record: CaseAttemptRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn qcm_stats(&self, _doctor_id: &DoctorId) -> Result<QcmStats, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn case_stats(&self, _doctor_id: &DoctorId) -> Result<CaseStats, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn append_evaluation(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn evaluation_history(
        &self,
        _doctor_id: &DoctorId,
    ) -> Result<Vec<EvaluationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn append_audit(&self, _record: ConsultationAuditRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn audit_stats(&self, _doctor_id: &DoctorId) -> Result<AuditStats, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn append_alert(&self, _record: AlertRecord) -> Result<AlertRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn resolve_alert(&self, _id: &AlertId, _at: DateTime<Utc>) -> Result<AlertRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn alerts(&self, _filter: &AlertFilter) -> Result<Vec<AlertRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn latest_evaluations(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn evaluations_since(&self, _since: DateTime<Utc>) -> Result<Vec<EvaluationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn audits(&self, _filter: &AuditFilter) -> Result<Vec<ConsultationAuditRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
