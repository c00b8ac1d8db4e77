//! Error types for the credit audit subsystem.

use thiserror::Error;

/// Input validation failures of the aggregation engine.
///
/// None of these are transient: the engine does no I/O, so retrying with the
/// same input gives the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// A course points at a category that is not in the forest
    #[error("Course {course_id} references unknown category {category_id}")]
    InvalidReference {
        course_id: String,
        category_id: String,
    },

    /// A category was reached twice while walking the forest
    #[error("Category {category_id} was visited twice; the category tree is cyclic")]
    CyclicCategoryTree { category_id: String },

    /// A course record breaks the credits/grade invariants
    #[error("Invalid course {course_id}: {message}")]
    InvalidCourse { course_id: String, message: String },

    /// A stored category names a parent that does not exist
    #[error("Category {category_id} references missing parent {parent_id}")]
    OrphanCategory {
        category_id: String,
        parent_id: String,
    },

    /// Credit arithmetic left the representable decimal range
    #[error("Credit total of {scope} is too large to represent")]
    CreditOverflow { scope: String },
}

impl AuditError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditError::InvalidReference { .. } => "invalid_reference",
            AuditError::CyclicCategoryTree { .. } => "cyclic_category_tree",
            AuditError::InvalidCourse { .. } => "invalid_course",
            AuditError::OrphanCategory { .. } => "orphan_category",
            AuditError::CreditOverflow { .. } => "credit_overflow",
        }
    }
}

/// Errors from loading inputs out of the store and summarizing them.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Training program {program_id} not found")]
    ProgramNotFound { program_id: String },

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
