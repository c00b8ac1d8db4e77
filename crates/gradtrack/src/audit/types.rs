/// Types for training programs, courses and credit summaries
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::AuditError;
use super::gpa;

/// Grading system of a course, as stored and sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingSystem {
    Percentage,
    PassFail,
}

impl GradingSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingSystem::Percentage => "percentage",
            GradingSystem::PassFail => "pass_fail",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(GradingSystem::Percentage),
            "pass_fail" => Some(GradingSystem::PassFail),
            _ => None,
        }
    }
}

/// Outcome of a course. A percentage course always carries a grade and a
/// pass/fail course always carries a passed flag, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Grading {
    Percentage { grade: Decimal },
    PassFail { passed: bool },
}

impl Grading {
    pub fn system(&self) -> GradingSystem {
        match self {
            Grading::Percentage { .. } => GradingSystem::Percentage,
            Grading::PassFail { .. } => GradingSystem::PassFail,
        }
    }

    /// Rebuilds a grading from its flat column form.
    pub fn from_parts(
        system: GradingSystem,
        grade: Option<Decimal>,
        passed: Option<bool>,
    ) -> Option<Self> {
        match (system, grade, passed) {
            (GradingSystem::Percentage, Some(grade), None) => Some(Grading::Percentage { grade }),
            (GradingSystem::PassFail, None, Some(passed)) => Some(Grading::PassFail { passed }),
            _ => None,
        }
    }

    pub fn grade(&self) -> Option<Decimal> {
        match self {
            Grading::Percentage { grade } => Some(*grade),
            Grading::PassFail { .. } => None,
        }
    }

    pub fn passed(&self) -> Option<bool> {
        match self {
            Grading::Percentage { .. } => None,
            Grading::PassFail { passed } => Some(*passed),
        }
    }
}

/// A single course recorded by a student against one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CourseRecord", into = "CourseRecord")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub credits: Decimal,
    pub grading: Grading,
    pub category_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    /// Creates a percentage-graded course.
    pub fn percentage(
        id: impl Into<String>,
        name: impl Into<String>,
        credits: Decimal,
        grade: Decimal,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            credits,
            grading: Grading::Percentage { grade },
            category_id: category_id.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Creates a pass/fail course.
    pub fn pass_fail(
        id: impl Into<String>,
        name: impl Into<String>,
        credits: Decimal,
        passed: bool,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            credits,
            grading: Grading::PassFail { passed },
            category_id: category_id.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Checks credits are positive and a percentage grade lies in [0, 100].
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.credits <= Decimal::ZERO {
            return Err(AuditError::InvalidCourse {
                course_id: self.id.clone(),
                message: format!("credits must be positive, got {}", self.credits),
            });
        }

        if let Grading::Percentage { grade } = self.grading {
            if grade < Decimal::ZERO || grade > Decimal::ONE_HUNDRED {
                return Err(AuditError::InvalidCourse {
                    course_id: self.id.clone(),
                    message: format!("grade must be within [0, 100], got {}", grade),
                });
            }
        }

        Ok(())
    }

    /// Grade point of this course rounded to 3 places, `None` for pass/fail.
    pub fn grade_point(&self) -> Option<Decimal> {
        self.grading
            .grade()
            .map(|grade| gpa::round_gpa(gpa::grade_point(grade)))
    }
}

/// Flat wire form of a course, with the grade point included on output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    id: String,
    name: String,
    credits: Decimal,
    grading_system: GradingSystem,
    #[serde(default)]
    grade: Option<Decimal>,
    #[serde(default)]
    passed: Option<bool>,
    #[serde(default, skip_deserializing)]
    gpa: Option<Decimal>,
    category_id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CourseRecord> for Course {
    type Error = AuditError;

    fn try_from(record: CourseRecord) -> Result<Self, Self::Error> {
        let grading = Grading::from_parts(record.grading_system, record.grade, record.passed)
            .ok_or_else(|| AuditError::InvalidCourse {
                course_id: record.id.clone(),
                message: format!(
                    "grading system `{}` does not match the populated grade/passed fields",
                    record.grading_system.as_str()
                ),
            })?;

        Ok(Course {
            id: record.id,
            name: record.name,
            credits: record.credits,
            grading,
            category_id: record.category_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl From<Course> for CourseRecord {
    fn from(course: Course) -> Self {
        let gpa = course.grade_point();
        CourseRecord {
            id: course.id,
            name: course.name,
            credits: course.credits,
            grading_system: course.grading.system(),
            grade: course.grading.grade(),
            passed: course.grading.passed(),
            gpa,
            category_id: course.category_id,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// A node of a training program's category tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub required_credits: Decimal,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(rename = "subcategories", default)]
    pub children: Vec<Category>,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        required_credits: Decimal,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            required_credits,
            parent_id,
            children: Vec::new(),
        }
    }

    /// Appends a child, setting its parent to this node.
    pub fn with_child(mut self, mut child: Category) -> Self {
        child.parent_id = Some(self.id.clone());
        self.children.push(child);
        self
    }
}

/// A degree plan with a declared total credit requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgram {
    pub id: String,
    pub name: String,
    #[serde(rename = "total_credits")]
    pub total_required_credits: Decimal,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl TrainingProgram {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_required_credits: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_required_credits,
            is_public: false,
            owner_id: None,
        }
    }
}

/// Aggregated progress of one category and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: String,
    pub category_name: String,
    pub required_credits: Decimal,
    pub earned_credits: Decimal,
    pub remaining_credits: Decimal,
    pub is_complete: bool,
    pub has_subcategories: bool,
    pub parent_id: Option<String>,
    pub subcategories: Vec<CategorySummary>,
}

impl CategorySummary {
    pub fn progress_percent(&self) -> Option<Decimal> {
        progress_percent(self.earned_credits, self.required_credits)
    }
}

/// Program-wide credit and GPA summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditSummary {
    pub total_required_credits: Decimal,
    pub total_earned_credits: Decimal,
    pub remaining_credits: Decimal,
    pub overall_gpa: Decimal,
    /// Credits of the percentage-graded courses counted in the GPA
    pub gpa_credits: Decimal,
    pub categories: Vec<CategorySummary>,
}

impl CreditSummary {
    pub fn progress_percent(&self) -> Option<Decimal> {
        progress_percent(self.total_earned_credits, self.total_required_credits)
    }
}

/// Earned over required as a whole percentage, `None` when nothing is required
/// or the ratio is out of range.
fn progress_percent(earned: Decimal, required: Decimal) -> Option<Decimal> {
    if required.is_zero() {
        return None;
    }
    let percent = earned.checked_div(required)?.checked_mul(Decimal::ONE_HUNDRED)?;
    Some(percent.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

/// Credit-weighted GPA with its denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gpa {
    /// Unrounded weighted average
    pub raw: Decimal,
    pub credits: Decimal,
}

impl Gpa {
    /// GPA rounded to 3 decimal places, half away from zero.
    pub fn rounded(&self) -> Decimal {
        gpa::round_gpa(self.raw)
    }
}

/// A category with its ancestor path, for selection lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatCategory {
    pub id: String,
    pub name: String,
    pub required_credits: Decimal,
    pub parent_id: Option<String>,
    pub full_name: String,
}

/// A category whose declared requirement differs from what its children add up to.
///
/// `category_id` is `None` for the program-level check of root categories
/// against the program total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementMismatch {
    pub category_id: Option<String>,
    pub name: String,
    pub declared: Decimal,
    pub children_sum: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_course_wire_format() {
        let course: Course = serde_json::from_str(
            r#"{ "id": "c1", "name": "Calculus", "credits": 3.5, "grading_system": "percentage",
                 "grade": 90, "passed": null, "category_id": "math" }"#,
        )
        .unwrap();
        assert_eq!(course.credits, dec!(3.5));
        assert_eq!(course.grading, Grading::Percentage { grade: dec!(90) });

        let value = serde_json::to_value(&course).unwrap();
        assert_eq!(value["grading_system"], "percentage");
        assert_eq!(value["gpa"].as_f64(), Some(3.813));
        assert_eq!(value["passed"], serde_json::Value::Null);

        let pass_fail: Course = serde_json::from_str(
            r#"{ "id": "c2", "name": "Swimming", "credits": 1, "grading_system": "pass_fail",
                 "passed": true, "category_id": "pe" }"#,
        )
        .unwrap();
        assert_eq!(pass_fail.grade_point(), None);
        assert_eq!(pass_fail.grading.passed(), Some(true));
    }

    #[test]
    fn test_course_with_mismatched_grading_is_rejected() {
        let both = serde_json::from_str::<Course>(
            r#"{ "id": "c1", "name": "X", "credits": 1, "grading_system": "pass_fail",
                 "grade": 80, "passed": true, "category_id": "a" }"#,
        );
        assert!(both.is_err());

        let neither = serde_json::from_str::<Course>(
            r#"{ "id": "c1", "name": "X", "credits": 1, "grading_system": "percentage",
                 "category_id": "a" }"#,
        );
        assert!(neither.is_err());
    }

    #[test]
    fn test_category_reads_subcategories() {
        let category: Category = serde_json::from_str(
            r#"{ "id": "r", "name": "Required", "required_credits": 4, "parent_id": null,
                 "subcategories": [ { "id": "m", "name": "Math", "required_credits": 4, "parent_id": "r" } ] }"#,
        )
        .unwrap();
        assert_eq!(category.children.len(), 1);
        assert!(category.children[0].children.is_empty());
    }

    #[test]
    fn test_progress_percent() {
        let summary = CreditSummary {
            total_required_credits: dec!(150),
            total_earned_credits: dec!(50),
            remaining_credits: dec!(100),
            overall_gpa: dec!(3.5),
            gpa_credits: dec!(50),
            categories: Vec::new(),
        };
        assert_eq!(summary.progress_percent(), Some(dec!(33)));

        let empty = CreditSummary {
            total_required_credits: dec!(0),
            ..summary
        };
        assert_eq!(empty.progress_percent(), None);
    }
}
