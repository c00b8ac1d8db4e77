/// Database module for training programs, category trees and courses

mod types;

pub use types::{DbCategory, DbCourse, DbProgram};

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::audit::{Category, Course, TrainingProgram};
use types::{decimal_column, optional_decimal_column};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_credits.sql");

/// SQLite-backed program, category and course provider.
pub struct CreditDbManager {
    db: Mutex<Connection>,
}

impl CreditDbManager {
    /// Opens (or creates) the database file and initializes the schema
    pub fn open(db_path: &str) -> Result<Self> {
        Self::with_connection(Connection::open(db_path)?)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // SQLite keeps the connection consistent across a poisoned lock
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Checks whether a program exists
    pub fn program_exists(&self, program_id: &str) -> Result<bool> {
        let db = self.conn();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM programs WHERE program_id = ?",
            [program_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Checks whether any program has a category with this id
    pub fn category_exists(&self, category_id: &str) -> Result<bool> {
        let db = self.conn();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM categories WHERE category_id = ?",
            [category_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Inserts a program together with its whole category forest atomically
    pub fn import_program(&self, program: &TrainingProgram, forest: &[Category]) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        insert_program_row(&tx, program)?;

        let mut count = 0;
        let mut stack: Vec<(&Category, i64)> = forest
            .iter()
            .enumerate()
            .rev()
            .map(|(position, category)| (category, position as i64))
            .collect();
        while let Some((category, position)) = stack.pop() {
            insert_category_row(&tx, &program.id, category, position)?;
            count += 1;
            stack.extend(
                category
                    .children
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(position, child)| (child, position as i64)),
            );
        }

        tx.commit()?;
        debug!("Imported program {} with {} categories", program.id, count);
        Ok(())
    }

    /// Records a course for a user
    pub fn insert_course(&self, user_id: &str, course: &Course) -> Result<()> {
        let db = self.conn();
        let now = Utc::now();

        db.execute(
            "INSERT INTO courses (
                course_id, user_id, name, credits, grading_system, grade, passed,
                category_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            (
                &course.id,
                user_id,
                &course.name,
                course.credits.to_string(),
                course.grading.system().as_str(),
                course.grading.grade().map(|g| g.to_string()),
                course.grading.passed(),
                &course.category_id,
                course.created_at.unwrap_or(now),
                course.updated_at.unwrap_or(now),
            ),
        )?;

        Ok(())
    }

    /// Gets a program by id
    pub fn get_program(&self, program_id: &str) -> Result<Option<TrainingProgram>> {
        let db = self.conn();
        db.query_row(
            "SELECT program_id, name, total_credits, is_public, owner_id
             FROM programs
             WHERE program_id = ?",
            [program_id],
            |row| {
                Ok(DbProgram {
                    program_id: row.get(0)?,
                    name: row.get(1)?,
                    total_credits: decimal_column(row, 2)?,
                    is_public: row.get(3)?,
                    owner_id: row.get(4)?,
                })
            },
        )
        .optional()
        .map(|program| program.map(TrainingProgram::from))
    }

    /// Lists programs visible to `owner_id` in insertion order.
    ///
    /// Public programs are always included. Programs owned by `owner_id` are
    /// included unless `public_only` is set.
    pub fn list_programs(
        &self,
        owner_id: Option<&str>,
        public_only: bool,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<TrainingProgram>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT program_id, name, total_credits, is_public, owner_id
             FROM programs
             WHERE is_public = 1 OR (owner_id = ?1 AND ?2 = 0)
             ORDER BY rowid
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map((owner_id, public_only, limit, skip), |row| {
            Ok(DbProgram {
                program_id: row.get(0)?,
                name: row.get(1)?,
                total_credits: decimal_column(row, 2)?,
                is_public: row.get(3)?,
                owner_id: row.get(4)?,
            })
        })?;

        rows.map(|row| row.map(TrainingProgram::from)).collect()
    }

    /// Gets the flat category rows of a program.
    ///
    /// Rows come back ordered by sibling position, so assembling them with
    /// `build_category_forest` reproduces the stored child order.
    pub fn get_program_category_rows(&self, program_id: &str) -> Result<Vec<DbCategory>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT category_id, program_id, parent_id, name, required_credits
             FROM categories
             WHERE program_id = ?
             ORDER BY position, rowid",
        )?;

        let rows = stmt.query_map([program_id], |row| {
            Ok(DbCategory {
                category_id: row.get(0)?,
                program_id: row.get(1)?,
                parent_id: row.get(2)?,
                name: row.get(3)?,
                required_credits: decimal_column(row, 4)?,
            })
        })?;

        rows.collect()
    }

    /// Gets all courses recorded by a user, oldest first
    pub fn get_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT course_id, name, credits, grading_system, grade, passed,
                    category_id, created_at, updated_at
             FROM courses
             WHERE user_id = ?
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt.query_map([user_id], |row| {
            let raw = DbCourse {
                course_id: row.get(0)?,
                name: row.get(1)?,
                credits: decimal_column(row, 2)?,
                grading_system: row.get(3)?,
                grade: optional_decimal_column(row, 4)?,
                passed: row.get(5)?,
                category_id: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            };
            Course::try_from(raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))
        })?;

        rows.collect()
    }

    /// Removes a course. Returns whether a row was deleted.
    pub fn delete_course(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let db = self.conn();
        let changed = db.execute(
            "DELETE FROM courses WHERE user_id = ?1 AND course_id = ?2",
            (user_id, course_id),
        )?;
        Ok(changed > 0)
    }
}

fn insert_program_row(db: &Connection, program: &TrainingProgram) -> Result<()> {
    db.execute(
        "INSERT INTO programs (program_id, name, total_credits, is_public, owner_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &program.id,
            &program.name,
            program.total_required_credits.to_string(),
            program.is_public,
            &program.owner_id,
            Utc::now(),
        ),
    )?;
    Ok(())
}

fn insert_category_row(
    db: &Connection,
    program_id: &str,
    category: &Category,
    position: i64,
) -> Result<()> {
    db.execute(
        "INSERT INTO categories (category_id, program_id, parent_id, name, required_credits, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &category.id,
            program_id,
            &category.parent_id,
            &category.name,
            category.required_credits.to_string(),
            position,
        ),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_program() -> (TrainingProgram, Vec<Category>) {
        let program = TrainingProgram::new("cs", "Computer Science", dec!(30.5));
        let forest = vec![
            Category::new("core", "Core", dec!(20), None)
                .with_child(Category::new("math", "Math", dec!(10), None))
                .with_child(Category::new("prog", "Programming", dec!(10), None)),
            Category::new("pe", "Physical Education", dec!(0.5), None),
        ];
        (program, forest)
    }

    #[test]
    fn test_program_round_trip() {
        let db = CreditDbManager::open_in_memory().unwrap();
        let (program, forest) = sample_program();
        db.import_program(&program, &forest).unwrap();

        assert!(db.program_exists("cs").unwrap());
        assert!(!db.program_exists("ee").unwrap());
        assert_eq!(db.get_program("cs").unwrap(), Some(program));
        assert_eq!(db.get_program("ee").unwrap(), None);

        let rows = db.get_program_category_rows("cs").unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.program_id == "cs"));
    }

    #[test]
    fn test_category_rows_follow_position() {
        let db = CreditDbManager::open_in_memory().unwrap();
        {
            let conn = db.conn();
            insert_program_row(&conn, &TrainingProgram::new("math", "Mathematics", dec!(12))).unwrap();

            let root = Category::new("root", "Required", dec!(12), None);
            insert_category_row(&conn, "math", &root, 0).unwrap();
            let late = Category::new("late", "Topology", dec!(6), Some("root".into()));
            insert_category_row(&conn, "math", &late, 1).unwrap();
            let early = Category::new("early", "Algebra", dec!(6), Some("root".into()));
            insert_category_row(&conn, "math", &early, 0).unwrap();
        }

        let ids: Vec<String> = db
            .get_program_category_rows("math")
            .unwrap()
            .into_iter()
            .map(|row| row.category_id)
            .collect();
        assert_eq!(ids, vec!["root", "early", "late"]);
    }

    #[test]
    fn test_import_is_atomic() {
        let db = CreditDbManager::open_in_memory().unwrap();
        let (program, mut forest) = sample_program();
        // Second root reuses an id, so the category insert fails
        forest[1].id = "core".to_string();

        assert!(db.import_program(&program, &forest).is_err());
        assert!(!db.program_exists("cs").unwrap());
        assert!(db.get_program_category_rows("cs").unwrap().is_empty());
    }

    #[test]
    fn test_courses_round_trip() {
        let db = CreditDbManager::open_in_memory().unwrap();
        let calculus = Course::percentage("c1", "Calculus", dec!(3.5), dec!(87.5), "math");
        let swimming = Course::pass_fail("c2", "Swimming", dec!(0.5), true, "pe");
        db.insert_course("alice", &calculus).unwrap();
        db.insert_course("alice", &swimming).unwrap();
        db.insert_course("bob", &Course::pass_fail("c3", "Lab", dec!(1), false, "pe"))
            .unwrap();

        let courses = db.get_courses("alice").unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].id, "c1");
        assert_eq!(courses[0].credits, dec!(3.5));
        assert_eq!(courses[0].grading.grade(), Some(dec!(87.5)));
        assert_eq!(courses[1].grading.passed(), Some(true));
        assert!(courses[1].created_at.is_some());

        assert!(db.delete_course("alice", "c1").unwrap());
        assert!(!db.delete_course("alice", "c1").unwrap());
        assert_eq!(db.get_courses("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_course_row_is_an_error() {
        let db = CreditDbManager::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO courses (course_id, user_id, name, credits, grading_system, grade,
                    passed, category_id, created_at, updated_at)
                 VALUES ('c1', 'alice', 'Broken', '3', 'percentage', NULL, 1, 'math',
                    '2025-04-24 00:00:00', '2025-04-24 00:00:00')",
                [],
            )
            .unwrap();

        assert!(db.get_courses("alice").is_err());
    }

    #[test]
    fn test_list_programs_visibility() {
        let db = CreditDbManager::open_in_memory().unwrap();
        let mut public = TrainingProgram::new("cs", "Computer Science", dec!(30));
        public.is_public = true;
        let mut owned = TrainingProgram::new("alice-cs", "My Computer Science", dec!(30));
        owned.owner_id = Some("alice".to_string());
        let mut other = TrainingProgram::new("bob-cs", "Bob's Plan", dec!(30));
        other.owner_id = Some("bob".to_string());
        for program in [&public, &owned, &other] {
            db.import_program(program, &[]).unwrap();
        }

        let ids = |programs: Vec<TrainingProgram>| -> Vec<String> {
            programs.into_iter().map(|p| p.id).collect()
        };
        assert_eq!(ids(db.list_programs(Some("alice"), false, 0, 10).unwrap()), vec!["cs", "alice-cs"]);
        assert_eq!(ids(db.list_programs(Some("alice"), true, 0, 10).unwrap()), vec!["cs"]);
        assert_eq!(ids(db.list_programs(None, false, 0, 10).unwrap()), vec!["cs"]);
        assert_eq!(ids(db.list_programs(Some("alice"), false, 1, 10).unwrap()), vec!["alice-cs"]);
        assert_eq!(ids(db.list_programs(Some("alice"), false, 0, 1).unwrap()), vec!["cs"]);
    }

    #[test]
    fn test_category_exists() {
        let db = CreditDbManager::open_in_memory().unwrap();
        let (program, forest) = sample_program();
        db.import_program(&program, &forest).unwrap();

        assert!(db.category_exists("math").unwrap());
        assert!(!db.category_exists("art").unwrap());
    }
}
