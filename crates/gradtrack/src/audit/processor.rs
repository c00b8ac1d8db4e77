/// Credit aggregation over a program's category forest
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::error::AuditError;
use super::gpa::compute_gpa;
use super::types::*;

enum Visit<'a> {
    Enter(&'a Category),
    Exit(&'a Category),
}

/// Computes the credit summary of `courses` against a training program.
///
/// Each category earns the credits of the courses attached to it plus
/// everything its descendants earn. The program total counts every course,
/// attached or not, so the category breakdown may add up to less than
/// `total_earned_credits`.
///
/// # Errors
/// * `InvalidCourse` - a course has non-positive credits or a grade outside [0, 100]
/// * `CyclicCategoryTree` - a category id shows up twice in the forest
/// * `InvalidReference` - a course names a category missing from a non-empty forest
/// * `CreditOverflow` - a credit total leaves the decimal range
///
/// Any error aborts the computation; no partial summary is produced.
pub fn compute_credit_summary(
    program: &TrainingProgram,
    forest: &[Category],
    courses: &[Course],
) -> Result<CreditSummary, AuditError> {
    for course in courses {
        course.validate()?;
    }

    let known_ids = collect_category_ids(forest)?;
    let own_earned = index_course_credits(&known_ids, courses)?;

    let categories = summarize_forest(forest, &own_earned)?;

    let total_earned_credits = checked_credit_sum(courses.iter().map(|c| c.credits), &program.id)?;
    let remaining_credits = remaining(program.total_required_credits, total_earned_credits);
    let gpa = compute_gpa(courses)?;

    debug!(
        "Summarized program {} ({} categories, {} courses): earned {} of {}, GPA {}",
        program.id,
        known_ids.len(),
        courses.len(),
        total_earned_credits,
        program.total_required_credits,
        gpa.rounded()
    );

    Ok(CreditSummary {
        total_required_credits: program.total_required_credits,
        total_earned_credits,
        remaining_credits,
        overall_gpa: gpa.rounded(),
        gpa_credits: gpa.credits,
        categories,
    })
}

/// Sums credit values, failing instead of overflowing.
pub(super) fn checked_credit_sum<I>(values: I, scope: &str) -> Result<Decimal, AuditError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
        .ok_or_else(|| AuditError::CreditOverflow {
            scope: scope.to_string(),
        })
}

/// `required - earned`, floored at 0. Earned credits are never negative, so
/// the subtraction can only overflow below zero.
fn remaining(required: Decimal, earned: Decimal) -> Decimal {
    required
        .checked_sub(earned)
        .map_or(Decimal::ZERO, |left| left.max(Decimal::ZERO))
}

/// Collects every category id in the forest, failing on the first id seen twice.
fn collect_category_ids(forest: &[Category]) -> Result<HashSet<&str>, AuditError> {
    let mut visited = HashSet::new();
    let mut stack: Vec<&Category> = forest.iter().rev().collect();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id.as_str()) {
            return Err(AuditError::CyclicCategoryTree {
                category_id: node.id.clone(),
            });
        }
        stack.extend(node.children.iter().rev());
    }

    Ok(visited)
}

/// Sums course credits per category id.
///
/// With an empty forest nothing can be attributed, so references are not
/// checked and every course only counts toward the program total.
fn index_course_credits<'a>(
    known_ids: &HashSet<&str>,
    courses: &'a [Course],
) -> Result<HashMap<&'a str, Decimal>, AuditError> {
    let mut index: HashMap<&str, Decimal> = HashMap::new();
    if known_ids.is_empty() {
        return Ok(index);
    }

    for course in courses {
        if !known_ids.contains(course.category_id.as_str()) {
            return Err(AuditError::InvalidReference {
                course_id: course.id.clone(),
                category_id: course.category_id.clone(),
            });
        }
        let earned = index.entry(course.category_id.as_str()).or_default();
        *earned = earned
            .checked_add(course.credits)
            .ok_or_else(|| AuditError::CreditOverflow {
                scope: course.category_id.clone(),
            })?;
    }

    Ok(index)
}

/// Builds the summaries bottom-up with an explicit stack.
///
/// Expects ids to be unique (checked by `collect_category_ids`). Output order
/// mirrors input order at every level.
fn summarize_forest(
    forest: &[Category],
    own_earned: &HashMap<&str, Decimal>,
) -> Result<Vec<CategorySummary>, AuditError> {
    let mut stack: Vec<Visit> = forest.iter().rev().map(Visit::Enter).collect();
    let mut finished: Vec<CategorySummary> = Vec::new();

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(node) => {
                stack.push(Visit::Exit(node));
                stack.extend(node.children.iter().rev().map(Visit::Enter));
            }
            Visit::Exit(node) => {
                // Children finished right before their parent, in order
                let subcategories = finished.split_off(finished.len() - node.children.len());
                let own = own_earned.get(node.id.as_str()).copied().unwrap_or_default();
                let earned_credits = checked_credit_sum(
                    std::iter::once(own).chain(subcategories.iter().map(|s| s.earned_credits)),
                    &node.id,
                )?;

                finished.push(CategorySummary {
                    category_id: node.id.clone(),
                    category_name: node.name.clone(),
                    required_credits: node.required_credits,
                    earned_credits,
                    remaining_credits: remaining(node.required_credits, earned_credits),
                    is_complete: earned_credits >= node.required_credits,
                    has_subcategories: !node.children.is_empty(),
                    parent_id: node.parent_id.clone(),
                    subcategories,
                });
            }
        }
    }

    Ok(finished)
}
