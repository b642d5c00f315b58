use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{
    AlertFilter, AlertId, AuditFilter, CaseAttemptRequest, ConsultationRequest, DoctorId,
    EvaluationInput, QcmAttemptRequest,
};
use super::repository::{AlertPublisher, AssessmentStore, AuditorError, ConsultationAuditor, StoreError};
use super::service::{AssessmentService, AssessmentServiceError};
use crate::scoring::AiAuditOutput;

type SharedService<S, P, L> = Arc<AssessmentService<S, P, L>>;

/// Audit document produced elsewhere, submitted together with its consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAuditRequest {
    #[serde(flatten)]
    pub consultation: ConsultationRequest,
    pub ai_output: AiAuditOutput,
}

/// Router builder exposing evaluation, audit, attempt, and alert endpoints.
pub fn assessment_router<S, P, L>(service: SharedService<S, P, L>) -> Router
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    Router::new()
        .route(
            "/api/v1/doctors/:doctor_id/evaluations",
            post(record_evaluation_handler::<S, P, L>).get(history_handler::<S, P, L>),
        )
        .route(
            "/api/v1/doctors/:doctor_id/evaluations/compute",
            post(compute_evaluation_handler::<S, P, L>),
        )
        .route(
            "/api/v1/doctors/:doctor_id/trend",
            get(trend_handler::<S, P, L>),
        )
        .route(
            "/api/v1/doctors/:doctor_id/stats",
            get(stats_handler::<S, P, L>),
        )
        .route(
            "/api/v1/evaluate/consultation",
            post(consultation_handler::<S, P, L>),
        )
        .route(
            "/api/v1/audits",
            post(record_audit_handler::<S, P, L>).get(audits_handler::<S, P, L>),
        )
        .route("/api/v1/evaluate/qcm", post(qcm_attempt_handler::<S, P, L>))
        .route(
            "/api/v1/evaluate/clinical-case",
            post(case_attempt_handler::<S, P, L>),
        )
        .route("/api/v1/alerts", get(alerts_handler::<S, P, L>))
        .route(
            "/api/v1/alerts/:alert_id/resolve",
            put(resolve_alert_handler::<S, P, L>),
        )
        .route("/api/v1/stats", get(global_stats_handler::<S, P, L>))
        .with_state(service)
}

pub(crate) async fn record_evaluation_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(doctor_id): Path<String>,
    Json(input): Json<EvaluationInput>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.record_evaluation(&DoctorId(doctor_id), input) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn compute_evaluation_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(doctor_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.evaluate_from_store(&DoctorId(doctor_id)) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(doctor_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    let doctor_id = DoctorId(doctor_id);
    match service.evaluation_history(&doctor_id) {
        Ok(evaluations) => {
            let payload = json!({
                "doctor_id": doctor_id.0,
                "count": evaluations.len(),
                "evaluations": evaluations,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn trend_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(doctor_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.doctor_trend(&DoctorId(doctor_id)) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(doctor_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.doctor_stats(&DoctorId(doctor_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn consultation_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Json(request): Json<ConsultationRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.audit_consultation(request) {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_audit_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Json(request): Json<RecordAuditRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.record_audit(request.consultation, request.ai_output) {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn audits_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Query(filter): Query<AuditFilter>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.audits(&filter) {
        Ok(audits) => {
            let payload = json!({
                "count": audits.len(),
                "audits": audits,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn qcm_attempt_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Json(request): Json<QcmAttemptRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.record_qcm_attempt(request) {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn case_attempt_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Json(request): Json<CaseAttemptRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.record_case_attempt(request) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn alerts_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Query(filter): Query<AlertFilter>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.alerts(&filter) {
        Ok(alerts) => {
            let payload = json!({
                "count": alerts.len(),
                "alerts": alerts,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn global_stats_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.global_stats() {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resolve_alert_handler<S, P, L>(
    State(service): State<SharedService<S, P, L>>,
    Path(alert_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: AlertPublisher + 'static,
    L: ConsultationAuditor + 'static,
{
    match service.resolve_alert(&AlertId(alert_id)) {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn status_for(err: &AssessmentServiceError) -> StatusCode {
    match err {
        AssessmentServiceError::MissingField(_) | AssessmentServiceError::Scoring(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AssessmentServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Store(StoreError::Conflict | StoreError::AlreadyResolved) => {
            StatusCode::CONFLICT
        }
        AssessmentServiceError::Auditor(AuditorError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AssessmentServiceError::Auditor(AuditorError::MalformedResponse(_)) => {
            StatusCode::BAD_GATEWAY
        }
        AssessmentServiceError::Store(StoreError::Unavailable(_))
        | AssessmentServiceError::Alert(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: AssessmentServiceError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "assessment request failed");
    }
    let payload = json!({
        "error": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
