//! Category tree assembly, flattening and requirement checks.
//!
//! Everything here walks the tree with an explicit stack so that malformed
//! input surfaces as an error instead of unbounded recursion.

use std::collections::{HashMap, HashSet};

use super::error::AuditError;
use super::processor::checked_credit_sum;
use super::types::{Category, FlatCategory, RequirementMismatch, TrainingProgram};

/// Separator between ancestor names in a flattened category's full name
pub const PATH_SEPARATOR: &str = " > ";

/// Assembles a forest from flat category rows.
///
/// Rows without a parent become roots. Siblings keep the relative order they
/// have in `rows`. Any `children` already present on a row are kept and
/// newly attached children are appended after them.
///
/// # Errors
/// * `OrphanCategory` - a row names a parent id no row has
/// * `CyclicCategoryTree` - an id occurs twice, or rows form a parent cycle
///   and so can never be reached from a root
pub fn build_category_forest(rows: Vec<Category>) -> Result<Vec<Category>, AuditError> {
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(ids.len());
    for (index, id) in ids.iter().enumerate() {
        if position.insert(id.as_str(), index).is_some() {
            return Err(AuditError::CyclicCategoryTree {
                category_id: id.clone(),
            });
        }
    }

    let mut roots = Vec::new();
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    for (index, row) in rows.iter().enumerate() {
        match &row.parent_id {
            None => roots.push(index),
            Some(parent_id) => match position.get(parent_id.as_str()) {
                Some(&parent) => children_of[parent].push(index),
                None => {
                    return Err(AuditError::OrphanCategory {
                        category_id: row.id.clone(),
                        parent_id: parent_id.clone(),
                    })
                }
            },
        }
    }

    // Post-order of everything reachable from the roots
    let mut order = Vec::with_capacity(rows.len());
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    while let Some((index, expanded)) = stack.pop() {
        if expanded {
            order.push(index);
        } else {
            stack.push((index, true));
            stack.extend(children_of[index].iter().rev().map(|&c| (c, false)));
        }
    }

    if order.len() < rows.len() {
        let reached: HashSet<usize> = order.iter().copied().collect();
        let stuck = (0..rows.len()).find(|index| !reached.contains(index)).unwrap_or(0);
        return Err(AuditError::CyclicCategoryTree {
            category_id: ids[stuck].clone(),
        });
    }

    let mut slots: Vec<Option<Category>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<Category>> = vec![None; slots.len()];
    for index in order {
        let Some(mut node) = slots[index].take() else {
            continue;
        };
        for &child in &children_of[index] {
            if let Some(child_node) = built[child].take() {
                node.children.push(child_node);
            }
        }
        built[index] = Some(node);
    }

    Ok(roots.into_iter().filter_map(|root| built[root].take()).collect())
}

/// Flattens a forest in pre-order, naming each category by its ancestor path.
///
/// A child of "Required" named "Math" gets the full name "Required > Math".
pub fn flatten_categories(forest: &[Category]) -> Result<Vec<FlatCategory>, AuditError> {
    let mut visited = HashSet::new();
    let mut flat = Vec::new();
    let mut stack: Vec<(&Category, Option<String>)> =
        forest.iter().rev().map(|node| (node, None)).collect();

    while let Some((node, prefix)) = stack.pop() {
        if !visited.insert(node.id.as_str()) {
            return Err(AuditError::CyclicCategoryTree {
                category_id: node.id.clone(),
            });
        }

        let full_name = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{}", node.name),
            None => node.name.clone(),
        };

        stack.extend(
            node.children
                .iter()
                .rev()
                .map(|child| (child, Some(full_name.clone()))),
        );

        flat.push(FlatCategory {
            id: node.id.clone(),
            name: node.name.clone(),
            required_credits: node.required_credits,
            parent_id: node.parent_id.clone(),
            full_name,
        });
    }

    Ok(flat)
}

/// Reports categories whose requirement differs from the sum of their children.
///
/// Root categories are checked against the program total the same way.
/// Leaves and an empty forest have nothing to check. Mismatches are
/// informational; aggregation does not depend on them. Fails only when a
/// sum of requirements leaves the decimal range.
pub fn check_program_requirements(
    program: &TrainingProgram,
    forest: &[Category],
) -> Result<Vec<RequirementMismatch>, AuditError> {
    let mut mismatches = Vec::new();

    if !forest.is_empty() {
        let roots_sum = checked_credit_sum(forest.iter().map(|c| c.required_credits), &program.id)?;
        if roots_sum != program.total_required_credits {
            mismatches.push(RequirementMismatch {
                category_id: None,
                name: program.name.clone(),
                declared: program.total_required_credits,
                children_sum: roots_sum,
            });
        }
    }

    let mut visited = HashSet::new();
    let mut stack: Vec<&Category> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if !visited.insert(node.id.as_str()) {
            continue;
        }
        if !node.children.is_empty() {
            let children_sum =
                checked_credit_sum(node.children.iter().map(|c| c.required_credits), &node.id)?;
            if children_sum != node.required_credits {
                mismatches.push(RequirementMismatch {
                    category_id: Some(node.id.clone()),
                    name: node.name.clone(),
                    declared: node.required_credits,
                    children_sum,
                });
            }
        }
        stack.extend(node.children.iter().rev());
    }

    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn row(id: &str, parent: Option<&str>, required: Decimal) -> Category {
        Category::new(id, id.to_uppercase(), required, parent.map(str::to_string))
    }

    #[test]
    fn test_build_forest_preserves_row_order() {
        let rows = vec![
            row("b1", Some("b"), dec!(2)),
            row("a", None, dec!(4)),
            row("b", None, dec!(5)),
            row("a2", Some("a"), dec!(2)),
            row("a1", Some("a"), dec!(2)),
            row("b1x", Some("b1"), dec!(2)),
        ];
        let forest = build_category_forest(rows).unwrap();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id, "a");
        assert_eq!(forest[1].id, "b");
        let a_children: Vec<&str> = forest[0].children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(a_children, vec!["a2", "a1"]);
        assert_eq!(forest[1].children[0].children[0].id, "b1x");
    }

    #[test]
    fn test_build_forest_orphan() {
        let rows = vec![row("a", None, dec!(1)), row("x", Some("nowhere"), dec!(1))];
        let err = build_category_forest(rows).unwrap_err();
        assert_eq!(
            err,
            AuditError::OrphanCategory {
                category_id: "x".to_string(),
                parent_id: "nowhere".to_string(),
            }
        );
    }

    #[test]
    fn test_build_forest_parent_cycle() {
        let rows = vec![
            row("root", None, dec!(1)),
            row("p", Some("q"), dec!(1)),
            row("q", Some("p"), dec!(1)),
        ];
        let err = build_category_forest(rows).unwrap_err();
        assert_eq!(err.kind(), "cyclic_category_tree");
    }

    #[test]
    fn test_build_forest_duplicate_id() {
        let rows = vec![row("a", None, dec!(1)), row("a", None, dec!(2))];
        assert!(matches!(
            build_category_forest(rows),
            Err(AuditError::CyclicCategoryTree { .. })
        ));
    }

    #[test]
    fn test_flatten_full_names() {
        let forest = vec![
            Category::new("req", "Required", dec!(20), None)
                .with_child(
                    Category::new("math", "Math", dec!(10), None)
                        .with_child(Category::new("calc", "Calculus", dec!(10), None)),
                )
                .with_child(Category::new("cs", "Programming", dec!(10), None)),
            Category::new("elec", "Electives", dec!(5), None),
        ];
        let flat = flatten_categories(&forest).unwrap();

        let names: Vec<&str> = flat.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Required",
                "Required > Math",
                "Required > Math > Calculus",
                "Required > Programming",
                "Electives",
            ]
        );
        assert_eq!(flat[2].parent_id.as_deref(), Some("math"));
        assert_eq!(flat[2].name, "Calculus");
    }

    #[test]
    fn test_requirement_check() {
        let program = TrainingProgram::new("p", "Physics 2023", dec!(30));
        let forest = vec![
            Category::new("core", "Core", dec!(20), None)
                .with_child(Category::new("m", "Mechanics", dec!(8), None))
                .with_child(Category::new("e", "Electromagnetism", dec!(8), None)),
            Category::new("gen", "General", dec!(10), None),
        ];
        let mismatches = check_program_requirements(&program, &forest).unwrap();

        assert_eq!(
            mismatches,
            vec![RequirementMismatch {
                category_id: Some("core".to_string()),
                name: "Core".to_string(),
                declared: dec!(20),
                children_sum: dec!(16),
            }]
        );
    }

    #[test]
    fn test_requirement_check_program_total() {
        let program = TrainingProgram::new("p", "Physics 2023", dec!(160));
        let forest = vec![Category::new("gen", "General", dec!(10), None)];
        let mismatches = check_program_requirements(&program, &forest).unwrap();

        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].category_id, None);
        assert_eq!(mismatches[0].children_sum, dec!(10));

        assert!(check_program_requirements(&program, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_requirement_check_overflow() {
        let program = TrainingProgram::new("p", "Overflow", Decimal::MAX);
        let forest = vec![Category::new("root", "Root", Decimal::MAX, None)
            .with_child(Category::new("l", "Left", Decimal::MAX, None))
            .with_child(Category::new("r", "Right", Decimal::MAX, None))];

        let err = check_program_requirements(&program, &forest).unwrap_err();
        assert_eq!(
            err,
            AuditError::CreditOverflow {
                scope: "root".to_string()
            }
        );
    }
}
