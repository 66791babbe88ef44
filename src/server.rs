//! HTTP front end for protocol validation.
//!
//! Endpoints:
//! - POST /api/v1/repositories/:repo_name/validate - Validate a protocol update
//! - GET  /health                                  - Health check

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::breaking::BreakingChangeDetector;
use crate::config::GuardConfig;
use crate::history::RevisionHistory;
use crate::schema::SchemaDefinition;
use crate::validate::{ProtocolValidator, ValidationResult};

// ============================================================================
// State
// ============================================================================

/// Everything a validation request needs. Immutable after startup.
pub struct ServiceContext {
    schema: SchemaDefinition,
    history: Arc<dyn RevisionHistory>,
    detector: BreakingChangeDetector,
    timeout: Duration,
}

impl ServiceContext {
    pub fn new(
        schema: SchemaDefinition,
        history: Arc<dyn RevisionHistory>,
        detector: BreakingChangeDetector,
        timeout: Duration,
    ) -> Self {
        Self {
            schema,
            history,
            detector,
            timeout,
        }
    }

    pub fn from_config(config: &GuardConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.load_schema()?,
            Arc::new(config.git_history()),
            BreakingChangeDetector::new(config.breaking.clone()),
            Duration::from_secs(config.validation_timeout_secs),
        ))
    }

    fn validate(&self, repository_id: &str, raw_text: &str) -> ValidationResult {
        ProtocolValidator::new(&self.schema, self.history.as_ref())
            .with_detector(self.detector.clone())
            .validate(repository_id, raw_text)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub protocol: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "ctrepo-server",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

async fn validate_protocol(
    State(ctx): State<Arc<ServiceContext>>,
    Path(repo_name): Path<String>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Protocol content is required");
    };

    let timeout = ctx.timeout;
    let worker = Arc::clone(&ctx);
    let repository = repo_name.clone();
    // The git history read shells out, so keep it off the async workers. A
    // timed out task keeps running until its git command hits the history's
    // own deadline (see `GuardConfig::git_history`).
    let task =
        tokio::task::spawn_blocking(move || worker.validate(&repository, &request.protocol));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Err(e)) => {
            error!(repository = %repo_name, error = %e, "validation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Validation failed")
        }
        Err(_) => {
            warn!(repository = %repo_name, ?timeout, "validation timed out");
            error_response(StatusCode::GATEWAY_TIMEOUT, "Validation timed out")
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/repositories/:repo_name/validate",
            post(validate_protocol),
        )
        .with_state(ctx)
}

/// Binds `config.bind` and serves until the process is stopped.
pub async fn serve(config: &GuardConfig) -> anyhow::Result<()> {
    let ctx = Arc::new(ServiceContext::from_config(config)?);
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        addr = %config.bind,
        repo_root = %config.repo_root.display(),
        "ctrepo-server listening"
    );
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
