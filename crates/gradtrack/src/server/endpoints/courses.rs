//! API endpoints for a user's recorded courses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::audit::{generate_id, AuditError, Course, Grading, GradingSystem, SummaryError};
use crate::server::endpoints::dashboard::summary_error_to_response;
use crate::server::types::{ApiErrorType, UserQueryParams};
use crate::types::AppState;

/// Body of a course creation request. The id is assigned by the server.
#[derive(Debug, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub credits: Decimal,
    pub grading_system: GradingSystem,
    #[serde(default)]
    pub grade: Option<Decimal>,
    #[serde(default)]
    pub passed: Option<bool>,
    pub category_id: String,
}

impl NewCourse {
    /// Builds a validated course with a fresh id.
    fn into_course(self) -> Result<Course, AuditError> {
        let id = generate_id();
        let grading = Grading::from_parts(self.grading_system, self.grade, self.passed)
            .ok_or_else(|| AuditError::InvalidCourse {
                course_id: id.clone(),
                message: format!(
                    "grading system `{}` needs exactly its own grade/passed field",
                    self.grading_system.as_str()
                ),
            })?;

        let now = Utc::now();
        let course = Course {
            id,
            name: self.name,
            credits: self.credits,
            grading,
            category_id: self.category_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        course.validate()?;
        Ok(course)
    }
}

/// GET /api/v1/courses/?user_id=
pub async fn list_courses(
    State(s): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
) -> Response {
    info!("GET /courses/ (user={})", params.user_id);

    match s.db.get_courses(&params.user_id) {
        Ok(courses) => (StatusCode::OK, Json(courses)).into_response(),
        Err(e) => summary_error_to_response(SummaryError::from(e)),
    }
}

/// POST /api/v1/courses/?user_id=
///
/// Records a course. The category must exist in some program.
pub async fn create_course(
    State(s): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
    Json(body): Json<NewCourse>,
) -> Response {
    info!("POST /courses/ (user={}, course={})", params.user_id, body.name);

    let result = body
        .into_course()
        .map_err(SummaryError::from)
        .and_then(|course| {
            if !s.db.category_exists(&course.category_id)? {
                return Err(SummaryError::from(AuditError::InvalidReference {
                    course_id: course.id.clone(),
                    category_id: course.category_id.clone(),
                }));
            }
            s.db.insert_course(&params.user_id, &course)?;
            Ok(course)
        });

    match result {
        Ok(course) => (StatusCode::CREATED, Json(course)).into_response(),
        Err(e) => summary_error_to_response(e),
    }
}

/// DELETE /api/v1/courses/:course_id?user_id=
pub async fn delete_course(
    Path(course_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Query(params): Query<UserQueryParams>,
) -> Response {
    info!("DELETE /courses/{} (user={})", course_id, params.user_id);

    match s.db.delete_course(&params.user_id, &course_id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiErrorType::from((
            StatusCode::NOT_FOUND,
            "Course not found",
            Some(format!("No course {course_id} for user {}", params.user_id)),
        ))
        .into_response(),
        Err(e) => summary_error_to_response(SummaryError::from(e)),
    }
}
