//! API endpoints for training programs and the public catalog.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::{self, SummaryError};
use crate::server::endpoints::dashboard::summary_error_to_response;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// Query parameters for listing programs.
#[derive(Debug, Deserialize)]
pub struct ProgramListParams {
    /// Whose private programs to include besides the public ones
    pub user_id: Option<String>,
    #[serde(default)]
    pub public_only: bool,
    #[serde(default)]
    pub skip: u32,
    pub limit: Option<u32>,
}

/// Body of a catalog adoption request.
#[derive(Debug, Deserialize)]
pub struct AdoptRequest {
    pub user_id: String,
}

/// GET /api/v1/training-programs/?user_id=&public_only=&skip=&limit=
///
/// `limit` defaults to, and is capped at, the configured page size.
pub async fn list_programs(
    State(s): State<Arc<AppState>>,
    Query(params): Query<ProgramListParams>,
) -> Response {
    let limit = params
        .limit
        .unwrap_or(s.config.max_page_size)
        .min(s.config.max_page_size);
    info!(
        "GET /training-programs/ (user={:?}, public_only={}, skip={}, limit={})",
        params.user_id, params.public_only, params.skip, limit
    );

    match s
        .db
        .list_programs(params.user_id.as_deref(), params.public_only, params.skip, limit)
    {
        Ok(programs) => (StatusCode::OK, Json(programs)).into_response(),
        Err(e) => summary_error_to_response(SummaryError::from(e)),
    }
}

/// GET /api/v1/training-programs/:program_id
pub async fn get_program(
    Path(program_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /training-programs/{}", program_id);

    match audit::load_program(&s.db, &program_id) {
        Ok(program) => (StatusCode::OK, Json(program)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}

/// GET /api/v1/training-programs/:program_id/requirement-check
///
/// Lists categories whose requirement differs from the sum of their parts.
pub async fn get_requirement_check(
    Path(program_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /training-programs/{}/requirement-check", program_id);

    let result = audit::load_program(&s.db, &program_id).and_then(|program| {
        let forest = audit::load_program_categories(&s.db, &program_id)?;
        Ok(audit::check_program_requirements(&program, &forest)?)
    });

    match result {
        Ok(mismatches) => (StatusCode::OK, Json(mismatches)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}

/// GET /api/v1/catalog
///
/// Returns the loaded public program templates.
pub async fn get_catalog(State(s): State<Arc<AppState>>) -> Response {
    let templates: Vec<_> = s.catalog.programs.values().collect();
    (StatusCode::OK, Json(templates)).into_response()
}

/// POST /api/v1/catalog/:code/adopt
///
/// Copies a catalog template into a private program owned by the caller.
pub async fn adopt_catalog_program(
    Path(code): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<AdoptRequest>,
) -> Response {
    info!("POST /catalog/{}/adopt (user={})", code, body.user_id);

    let Some(template) = s.catalog.get(&code) else {
        warn!("Program template {} not found", code);
        return ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Program template not found",
            Some(format!("No catalog template with code {code}")),
        ))
        .into_response();
    };

    match audit::adopt_program(&s.db, template, &body.user_id) {
        Ok(program) => (StatusCode::CREATED, Json(program)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}
