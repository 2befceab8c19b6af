//! HTTP front end: renders named templates from a template directory.

use crate::delimiters::Delimiters;
use crate::error::{Result, WeftError};
use crate::fs_utils::resolve_template_path;
use crate::render::{RenderOptions, render};
use crate::value::Map;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ServerState {
    template_dir: Arc<PathBuf>,
}

/// Delimiter overrides of a render request; missing entries use defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DelimiterRequest {
    pub left: String,
    pub right: String,
    pub left_loop_variable: String,
    pub right_loop_variable: String,
    pub left_loop_block: String,
    pub right_loop_block: String,
}

impl From<DelimiterRequest> for Delimiters {
    fn from(req: DelimiterRequest) -> Self {
        Delimiters::new(
            &req.left,
            &req.right,
            &req.left_loop_variable,
            &req.right_loop_variable,
            &req.left_loop_block,
            &req.right_loop_block,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    /// Template file name inside the template directory
    pub template: String,
    #[serde(default)]
    pub variables: Map,
    #[serde(default)]
    pub delimiters: DelimiterRequest,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps engine failures onto HTTP statuses
pub struct ApiError(WeftError);

impl From<WeftError> for ApiError {
    fn from(err: WeftError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WeftError::PathTraversal { .. } => StatusCode::BAD_REQUEST,
            WeftError::TemplateNotFound { .. } => StatusCode::NOT_FOUND,
            WeftError::MissingVariable { .. }
            | WeftError::MalformedDelimiterConfig { .. }
            | WeftError::ReindentUnderflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /
async fn root() -> &'static str {
    "Template engine server listening..."
}

/// POST /render
async fn render_handler(
    State(state): State<ServerState>,
    Json(req): Json<RenderRequest>,
) -> std::result::Result<Response, ApiError> {
    let path = resolve_template_path(&req.template, &state.template_dir)?;
    let template = match tokio::fs::read_to_string(&path).await {
        Ok(template) => template,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WeftError::TemplateNotFound { name: req.template }.into());
        }
        Err(e) => return Err(WeftError::Io(e).into()),
    };

    let options = RenderOptions {
        delimiters: req.delimiters.into(),
        strict: req.strict,
        ..RenderOptions::default()
    };
    let rendered = render(&template, &req.variables, &options)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        rendered,
    )
        .into_response())
}

/// PUT /templates/:name
async fn register_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
    body: String,
) -> std::result::Result<StatusCode, ApiError> {
    let path = resolve_template_path(&name, &state.template_dir)?;
    tokio::fs::write(&path, body).await.map_err(WeftError::Io)?;
    tracing::info!(template = %name, "registered template");
    Ok(StatusCode::CREATED)
}

/// Builds the router serving templates stored in `template_dir`
pub fn router(template_dir: PathBuf) -> Router {
    let state = ServerState {
        template_dir: Arc::new(template_dir),
    };

    Router::new()
        .route("/", get(root))
        .route("/render", post(render_handler))
        .route("/templates/:name", put(register_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router on `addr` until the process is stopped
///
/// # Errors
///
/// Returns `WeftError::Io` if the template directory cannot be created or the
/// address cannot be bound.
pub async fn serve(addr: SocketAddr, template_dir: PathBuf) -> Result<()> {
    tokio::fs::create_dir_all(&template_dir).await?;
    let app = router(template_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "template engine server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
