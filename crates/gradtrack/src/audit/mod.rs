/// Credit audit: category aggregation, GPA and program catalog
mod catalog;
mod error;
mod gpa;
mod processor;
mod tree;
mod types;

pub use catalog::*;
pub use error::*;
pub use gpa::{compute_gpa, grade_point, round_gpa, GPA_DECIMAL_PLACES};
pub use processor::compute_credit_summary;
pub use tree::{build_category_forest, check_program_requirements, flatten_categories, PATH_SEPARATOR};
pub use types::*;

use tracing::{info, warn};

use crate::db::CreditDbManager;

/// Loads a program or fails with `ProgramNotFound`.
pub fn load_program(db: &CreditDbManager, program_id: &str) -> Result<TrainingProgram, SummaryError> {
    db.get_program(program_id)?
        .ok_or_else(|| SummaryError::ProgramNotFound {
            program_id: program_id.to_string(),
        })
}

/// Loads the category forest of a program.
pub fn load_program_categories(
    db: &CreditDbManager,
    program_id: &str,
) -> Result<Vec<Category>, SummaryError> {
    let rows = db.get_program_category_rows(program_id)?;
    let forest = build_category_forest(rows.into_iter().map(Category::from).collect())?;
    Ok(forest)
}

/// Loads a program, its categories and a user's courses, then summarizes them.
///
/// # Arguments
/// * `db` - The store providing programs, categories and courses
/// * `program_id` - The training program to evaluate against
/// * `user_id` - Whose courses to count
///
/// # Returns
/// * `Ok(CreditSummary)` - Freshly computed summary
/// * `Err` - Unknown program, database failure, or invalid input
pub fn load_credit_summary(
    db: &CreditDbManager,
    program_id: &str,
    user_id: &str,
) -> Result<CreditSummary, SummaryError> {
    let program = load_program(db, program_id)?;
    let forest = load_program_categories(db, program_id)?;
    let courses = db.get_courses(user_id)?;

    info!(
        "Computing credit summary for user {} on program {} ({} courses)",
        user_id,
        program_id,
        courses.len()
    );

    compute_credit_summary(&program, &forest, &courses).map_err(|e| {
        warn!("Credit summary for program {} rejected: {}", program_id, e);
        SummaryError::from(e)
    })
}

/// Imports every catalog template as a public program, skipping ones already present.
///
/// Returns the number of programs imported.
pub fn import_catalog(db: &CreditDbManager, catalog: &ProgramCatalog) -> Result<usize, SummaryError> {
    let mut imported = 0;

    for template in catalog.programs.values() {
        let (program, forest) = template.instantiate(None)?;
        if db.program_exists(&program.id)? {
            continue;
        }

        db.import_program(&program, &forest)?;
        imported += 1;
    }

    info!("Imported {} public programs from the catalog", imported);
    Ok(imported)
}

/// Copies a catalog template into a private program owned by `owner_id`.
pub fn adopt_program(
    db: &CreditDbManager,
    template: &ProgramTemplate,
    owner_id: &str,
) -> Result<TrainingProgram, SummaryError> {
    let (program, forest) = template.instantiate(Some(owner_id))?;
    db.import_program(&program, &forest)?;
    info!("User {} adopted program template {} as {}", owner_id, template.code, program.id);
    Ok(program)
}
