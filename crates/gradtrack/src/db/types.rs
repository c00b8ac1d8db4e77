/// Database row types for programs, categories and courses
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::audit::{AuditError, Category, Course, Grading, GradingSystem, TrainingProgram};

#[derive(Debug, Clone)]
pub struct DbProgram {
    pub program_id: String,
    pub name: String,
    pub total_credits: Decimal,
    pub is_public: bool,
    pub owner_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DbCategory {
    pub category_id: String,
    pub program_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub required_credits: Decimal,
}

#[derive(Debug, Clone)]
pub struct DbCourse {
    pub course_id: String,
    pub name: String,
    pub credits: Decimal,
    pub grading_system: String,
    pub grade: Option<Decimal>,
    pub passed: Option<bool>,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reads a decimal stored as TEXT.
pub fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a nullable decimal stored as TEXT.
pub fn optional_decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Decimal::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

impl From<DbProgram> for TrainingProgram {
    fn from(row: DbProgram) -> Self {
        TrainingProgram {
            id: row.program_id,
            name: row.name,
            total_required_credits: row.total_credits,
            is_public: row.is_public,
            owner_id: row.owner_id,
        }
    }
}

impl From<DbCategory> for Category {
    fn from(row: DbCategory) -> Self {
        Category::new(row.category_id, row.name, row.required_credits, row.parent_id)
    }
}

impl TryFrom<DbCourse> for Course {
    type Error = AuditError;

    fn try_from(row: DbCourse) -> Result<Self, Self::Error> {
        let invalid = |message: String| AuditError::InvalidCourse {
            course_id: row.course_id.clone(),
            message,
        };

        let system = GradingSystem::parse(&row.grading_system)
            .ok_or_else(|| invalid(format!("unknown grading system `{}`", row.grading_system)))?;
        let grading = Grading::from_parts(system, row.grade, row.passed).ok_or_else(|| {
            invalid(format!(
                "grading system `{}` does not match the stored grade/passed columns",
                row.grading_system
            ))
        })?;

        Ok(Course {
            id: row.course_id,
            name: row.name,
            credits: row.credits,
            grading,
            category_id: row.category_id,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}
