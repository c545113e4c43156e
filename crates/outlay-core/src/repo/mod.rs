//! Repository storage layer
//!
//! Persistence abstraction for the two entity families. Two implementations
//! satisfy the same behavioral contract:
//! - `memory` - Mutex-guarded maps, ephemeral, for tests and dry runs
//! - `sqlite` - pooled rusqlite with migrations, survives restarts
//!
//! A shared conformance suite (`tests/repository_conformance.rs`) runs
//! against both.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Expense, ExpenseCategory, ExpenseStatus, NewExpense};

pub mod memory;
pub mod sqlite;

pub use memory::{MemoryCategoryRepository, MemoryExpenseRepository, MemoryStore};
pub use sqlite::{Database, SqliteCategoryRepository, SqliteExpenseRepository};

/// Category persistence contract
///
/// Identity is the case-normalized display name; `add` of a clashing name
/// fails with `DuplicateEntity`. Deletion of a category that expenses still
/// reference fails with `CategoryInUse`.
pub trait CategoryRepository: Send + Sync {
    /// Add a category. Fails with `DuplicateEntity` on a name clash.
    fn add(&self, name: &str) -> Result<ExpenseCategory>;

    /// Get a category by id. Fails with `NotFound`.
    fn get(&self, id: i64) -> Result<ExpenseCategory>;

    /// Get a category by case-normalized name. Fails with `NotFound`.
    fn get_by_name(&self, name: &str) -> Result<ExpenseCategory>;

    /// List all categories, ordered by name.
    fn list(&self) -> Result<Vec<ExpenseCategory>>;

    /// Rename a category. Fails with `NotFound` or `DuplicateEntity`.
    fn update(&self, category: &ExpenseCategory) -> Result<()>;

    /// Delete a category. Fails with `NotFound` or `CategoryInUse`.
    fn delete(&self, id: i64) -> Result<()>;
}

/// Expense persistence contract
pub trait ExpenseRepository: Send + Sync {
    /// Persist a new expense and return it with its assigned id.
    ///
    /// Fails with `NotFound` when the category reference does not resolve,
    /// or `Validation` when the record violates its invariants.
    fn add(&self, expense: &NewExpense) -> Result<Expense>;

    /// Get an expense by id. Fails with `NotFound`.
    fn get(&self, id: i64) -> Result<Expense>;

    /// List all expenses, newest first.
    fn list(&self) -> Result<Vec<Expense>>;

    /// Update an existing expense. Fails with `NotFound`.
    fn update(&self, expense: &Expense) -> Result<()>;

    /// Delete an expense by id. Fails with `NotFound`.
    fn delete(&self, id: i64) -> Result<()>;

    /// Search expenses matching every predicate in the filter.
    fn search(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>>;
}

/// Composable search predicates for expenses
///
/// Callers combine predicates without knowing the storage engine's query
/// language; each implementation translates the filter itself.
#[derive(Debug, Default, Clone)]
pub struct ExpenseFilter {
    pub category_id: Option<i64>,
    pub status: Option<ExpenseStatus>,
    pub created_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub min_confidence: Option<f64>,
}

impl ExpenseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, id: i64) -> Self {
        self.category_id = Some(id);
        self
    }

    pub fn status(mut self, status: ExpenseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_range = Some((from, to));
        self
    }

    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    /// Evaluate the filter against one expense (used by the in-memory
    /// implementation; the SQL implementation compiles it instead).
    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(id) = self.category_id {
            if expense.category_id != id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if expense.status != status {
                return false;
            }
        }
        if let Some((from, to)) = self.created_range {
            if expense.created_at < from || expense.created_at > to {
                return false;
            }
        }
        if let Some(min) = self.min_confidence {
            if expense.confidence < min {
                return false;
            }
        }
        true
    }

    /// Compile the filter to a WHERE clause and parameters.
    pub(crate) fn build(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(id) = self.category_id {
            conditions.push("category_id = ?".to_string());
            params.push(Box::new(id));
        }
        if let Some(status) = self.status {
            conditions.push("status = ?".to_string());
            params.push(Box::new(status.as_str().to_string()));
        }
        if let Some((from, to)) = self.created_range {
            conditions.push("created_at >= ? AND created_at <= ?".to_string());
            params.push(Box::new(from.to_rfc3339()));
            params.push(Box::new(to.to_rfc3339()));
        }
        if let Some(min) = self.min_confidence {
            conditions.push("confidence >= ?".to_string());
            params.push(Box::new(min));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use rust_decimal::Decimal;

    fn expense(category_id: i64, status: ExpenseStatus, confidence: f64) -> Expense {
        Expense {
            id: 1,
            amount: Decimal::new(1000, 2),
            currency: Currency::Eur,
            description: "test".into(),
            category_id,
            status,
            confidence,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let e = expense(1, ExpenseStatus::Confirmed, 0.9);
        assert!(ExpenseFilter::new().matches(&e));
    }

    #[test]
    fn predicates_compose() {
        let e = expense(2, ExpenseStatus::Confirmed, 0.9);
        let filter = ExpenseFilter::new()
            .category(2)
            .status(ExpenseStatus::Confirmed)
            .min_confidence(0.8);
        assert!(filter.matches(&e));

        assert!(!filter.clone().category(3).matches(&e));
        assert!(!ExpenseFilter::new().min_confidence(0.95).matches(&e));
        assert!(!ExpenseFilter::new()
            .status(ExpenseStatus::Pending)
            .matches(&e));
    }

    #[test]
    fn build_produces_conjunction() {
        let (where_clause, params) = ExpenseFilter::new()
            .category(1)
            .status(ExpenseStatus::Confirmed)
            .build();
        assert_eq!(where_clause, "WHERE category_id = ? AND status = ?");
        assert_eq!(params.len(), 2);

        let (empty, none) = ExpenseFilter::new().build();
        assert!(empty.is_empty());
        assert!(none.is_empty());
    }
}
