//! API endpoints for credit summaries and category trees.
//!
//! Every request recomputes its result from the current store contents.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::audit::{self, SummaryError};
use crate::server::types::{ApiErrorType, UserQueryParams};
use crate::types::AppState;

/// Converts SummaryError to API response.
pub(crate) fn summary_error_to_response(error: SummaryError) -> Response {
    match &error {
        SummaryError::ProgramNotFound { .. } => {
            warn!("{}", error);
            ApiErrorType::from((
                StatusCode::NOT_FOUND,
                "Training program not found",
                Some(error.to_string()),
            ))
            .into_response()
        }
        SummaryError::Audit(audit_error) => {
            warn!("Rejected credit data: {}", audit_error);
            ApiErrorType::from((
                StatusCode::UNPROCESSABLE_ENTITY,
                "Course or category data is inconsistent",
                Some(audit_error.to_string()),
            ))
            .with_kind(audit_error.kind())
            .into_response()
        }
        SummaryError::Database(db_error) => {
            error!("Database error: {}", db_error);
            ApiErrorType::from((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to access credit data",
                Some(db_error.to_string()),
            ))
            .into_response()
        }
    }
}

/// GET /api/v1/dashboard/credit-summary/:program_id?user_id=
///
/// Returns the credit summary of the user's courses against the program.
pub async fn get_credit_summary(
    Path(program_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
) -> Response {
    info!(
        "GET /dashboard/credit-summary/{} (user={})",
        program_id, params.user_id
    );

    match audit::load_credit_summary(&s.db, &program_id, &params.user_id) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}

/// GET /api/v1/course-categories/training-program/:program_id
///
/// Returns the program's category forest.
pub async fn get_program_categories(
    Path(program_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /course-categories/training-program/{}", program_id);

    let result = audit::load_program(&s.db, &program_id)
        .and_then(|_| audit::load_program_categories(&s.db, &program_id));

    match result {
        Ok(forest) => (StatusCode::OK, Json(forest)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}

/// GET /api/v1/course-categories/training-program/:program_id/flat
///
/// Returns the categories in pre-order with their full path names.
pub async fn get_flat_program_categories(
    Path(program_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /course-categories/training-program/{}/flat", program_id);

    let result = audit::load_program(&s.db, &program_id)
        .and_then(|_| audit::load_program_categories(&s.db, &program_id))
        .and_then(|forest| audit::flatten_categories(&forest).map_err(SummaryError::from));

    match result {
        Ok(flat) => (StatusCode::OK, Json(flat)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}
