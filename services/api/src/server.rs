use crate::cli::ServeArgs;
use crate::infra::{
    AnswerKeyCatalog, AppState, InMemoryAlertPublisher, InMemoryAssessmentStore,
    UnconfiguredAuditor,
};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tmcq::assessments::AssessmentService;
use tmcq::config::{AppConfig, AppEnvironment};
use tmcq::error::AppError;
use tmcq::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = build_store(args.answer_keys.take(), config.environment)?;
    let assessment_service = Arc::new(
        AssessmentService::new(
            Arc::new(store),
            Arc::new(InMemoryAlertPublisher::default()),
            Arc::new(UnconfiguredAuditor),
        )
        .with_history_limit(config.assessments.history_limit),
    );

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "t-mcq assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_store(
    answer_keys: Option<PathBuf>,
    environment: AppEnvironment,
) -> Result<InMemoryAssessmentStore, AppError> {
    match answer_keys {
        Some(path) => {
            let catalog = AnswerKeyCatalog::from_path(&path)?;
            info!(
                path = %path.display(),
                qcms = catalog.qcms.len(),
                cases = catalog.cases.len(),
                "answer keys loaded"
            );
            Ok(InMemoryAssessmentStore::with_catalog(catalog))
        }
        None => {
            if environment.is_production() {
                warn!("no answer keys loaded; qcm and clinical case grading will return 404");
            }
            Ok(InMemoryAssessmentStore::default())
        }
    }
}
