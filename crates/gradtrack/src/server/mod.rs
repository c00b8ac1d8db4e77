use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::server::endpoints::{courses, dashboard, programs, status};
use crate::types::AppState;

mod endpoints;
pub mod types;


/// Prefix of every versioned API route
pub const API_PREFIX: &str = "/api/v1";

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let program_router = Router::new()
        .route("/training-programs/", get(programs::list_programs))
        .route("/training-programs/:program_id", get(programs::get_program))
        .route(
            "/training-programs/:program_id/requirement-check",
            get(programs::get_requirement_check),
        )
        .route("/catalog", get(programs::get_catalog))
        .route("/catalog/:code/adopt", post(programs::adopt_catalog_program));

    let category_router = Router::new()
        .route(
            "/course-categories/training-program/:program_id",
            get(dashboard::get_program_categories),
        )
        .route(
            "/course-categories/training-program/:program_id/flat",
            get(dashboard::get_flat_program_categories),
        );

    let course_router = Router::new()
        .route(
            "/courses/",
            get(courses::list_courses).post(courses::create_course),
        )
        .route("/courses/:course_id", delete(courses::delete_course));

    let api = Router::new()
        .route(
            "/dashboard/credit-summary/:program_id",
            get(dashboard::get_credit_summary),
        )
        .merge(program_router)
        .merge(category_router)
        .merge(course_router);

    Router::new()
        .route("/health", get(status::get_health))
        .nest(API_PREFIX, api)
        .with_state(app_state)
}
