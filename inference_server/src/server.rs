use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use fish_core::{ErrorKind, FEATURE_NAMES, PredictorError};
use log::{error, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::engine::Predictor;
use crate::misc::{CURRENCY, ErrorBody, HealthBody, ModelInfo, PredictRequest, PredictResponse};

/// Shared application state: the read-only predictor and the per-request budget.
#[derive(Clone)]
struct AppState {
    predictor: Arc<Predictor>,
    request_timeout: Duration,
}

/// Per-request failure rendered as `{error_kind, message}`.
pub struct ApiError(PredictorError);

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InvalidFeatureVector => StatusCode::BAD_REQUEST,
            ErrorKind::InferenceError | ErrorKind::ArtifactNotFound | ErrorKind::ArtifactCorrupt => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// POST /predict runs one inference.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| PredictorError::InvalidFeatureVector(rejection.body_text()))
        .inspect_err(|e| warn!("Rejected prediction request: {}", e))?;

    let features = request
        .into_features()
        .inspect_err(|e| warn!("Rejected prediction request: {}", e))?;

    let predictor = state.predictor.clone();
    let task = tokio::task::spawn_blocking(move || predictor.predict(&features));

    let outcome = match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(PredictorError::InferenceError(format!("inference task failed: {}", e))),
        Err(_) => Err(PredictorError::InferenceError(format!(
            "inference timed out after {} ms",
            state.request_timeout.as_millis()
        ))),
    };

    match outcome {
        Ok(prediction) => Ok(Json(prediction.into())),
        Err(e) => {
            error!("Inference failed: {}", e);
            Err(e.into())
        }
    }
}

/// GET /health reports readiness. A running server always has a model.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthBody {
        status: "ready",
        model_kind: state.predictor.model().kind().to_string(),
    })
}

/// GET /model describes the loaded artifact.
async fn model_info(State(state): State<AppState>) -> impl IntoResponse {
    let model = state.predictor.model();
    Json(ModelInfo {
        model_kind: model.kind().to_string(),
        source: model.source().map(|path| path.display().to_string()),
        feature_names: FEATURE_NAMES,
        currency: CURRENCY,
    })
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn init(predictor: Arc<Predictor>, request_timeout: Duration) -> Self {
        let state = AppState {
            predictor,
            request_timeout,
        };

        Self { state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/predict", post(predict))
            .route("/health", get(health))
            .route("/model", get(model_info))
            .with_state(self.state.clone())
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("HTTP server running on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
