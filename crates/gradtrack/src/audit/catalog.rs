/// Catalog of public training program templates
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::error::AuditError;
use super::tree::{build_category_forest, check_program_requirements};
use super::types::{Category, TrainingProgram};
use crate::config::ConfigError;

/// All program templates, keyed by template code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramCatalog {
    pub programs: BTreeMap<String, ProgramTemplate>,
}

/// A public training program (e.g. "CS2024", "PHYS2023")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramTemplate {
    pub code: String,
    pub name: String,
    pub total_credits: Decimal,
    #[serde(default)]
    pub categories: Vec<CategoryTemplate>,
}

/// Category of a template; ids are assigned on instantiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTemplate {
    pub name: String,
    pub required_credits: Decimal,
    #[serde(default)]
    pub subcategories: Vec<CategoryTemplate>,
}

impl ProgramCatalog {
    /// Loads every `*.json` template in `catalog_dir`.
    ///
    /// A missing directory yields an empty catalog. Templates whose category
    /// requirements don't add up are still loaded, with a warning.
    pub fn load_from_directory(catalog_dir: &Path) -> Result<Self, ConfigError> {
        let mut programs = BTreeMap::new();

        if !catalog_dir.is_dir() {
            warn!("Program catalog directory {} not found", catalog_dir.display());
            return Ok(Self { programs });
        }

        let entries = fs::read_dir(catalog_dir).map_err(|source| ConfigError::Io {
            path: catalog_dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let path = entry
                .map_err(|source| ConfigError::Io {
                    path: catalog_dir.to_path_buf(),
                    source,
                })?
                .path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let template: ProgramTemplate =
                serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;

            let invalid = |source| ConfigError::Template {
                code: template.code.clone(),
                source,
            };
            let (program, forest) = template.instantiate(None).map_err(invalid)?;
            for mismatch in check_program_requirements(&program, &forest).map_err(invalid)? {
                warn!(
                    "Template {}: {} requires {} but its parts add up to {}",
                    template.code, mismatch.name, mismatch.declared, mismatch.children_sum
                );
            }

            programs.insert(template.code.clone(), template);
        }

        info!("Loaded {} program templates from {}", programs.len(), catalog_dir.display());

        Ok(Self { programs })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<&ProgramTemplate> {
        self.programs.get(code)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ProgramTemplate {
    /// Turns the template into a program and its category forest.
    ///
    /// Without an owner the result is the public program, with ids derived
    /// from the template code so repeated imports collide. With an owner the
    /// result is a private copy with fresh random ids.
    pub fn instantiate(
        &self,
        owner_id: Option<&str>,
    ) -> Result<(TrainingProgram, Vec<Category>), AuditError> {
        let program_id = match owner_id {
            None => self.code.clone(),
            Some(_) => generate_id(),
        };

        let program = TrainingProgram {
            id: program_id.clone(),
            name: self.name.clone(),
            total_required_credits: self.total_credits,
            is_public: owner_id.is_none(),
            owner_id: owner_id.map(str::to_string),
        };

        let mut counter = 0usize;
        let mut next_id = || {
            counter += 1;
            match owner_id {
                None => format!("{program_id}-{counter}"),
                Some(_) => generate_id(),
            }
        };

        // Pre-order over (template, parent id) pairs, then assembled by the
        // tree builder
        let mut rows = Vec::new();
        let mut stack: Vec<(&CategoryTemplate, Option<String>)> =
            self.categories.iter().rev().map(|c| (c, None)).collect();
        while let Some((template, parent_id)) = stack.pop() {
            let id = next_id();
            stack.extend(
                template
                    .subcategories
                    .iter()
                    .rev()
                    .map(|child| (child, Some(id.clone()))),
            );
            rows.push(Category::new(id, template.name.clone(), template.required_credits, parent_id));
        }

        let forest = build_category_forest(rows)?;
        Ok((program, forest))
    }
}

/// Random 128-bit hex identifier
pub fn generate_id() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}
