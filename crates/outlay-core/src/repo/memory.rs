//! In-memory repository implementation
//!
//! Mutex-guarded maps behind the repository traits. Ephemeral, no external
//! I/O; both repositories share one `MemoryStore` so the category-in-use
//! check sees the expenses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{normalize_name, Expense, ExpenseCategory, NewExpense};

use super::{CategoryRepository, ExpenseFilter, ExpenseRepository};

#[derive(Default)]
struct MemoryInner {
    categories: HashMap<i64, ExpenseCategory>,
    expenses: HashMap<i64, Expense>,
    next_category_id: i64,
    next_expense_id: i64,
}

/// Shared backing store for the in-memory repositories
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build both repositories over one shared store.
    pub fn repositories(
        self: &Arc<Self>,
    ) -> (MemoryCategoryRepository, MemoryExpenseRepository) {
        (
            MemoryCategoryRepository {
                store: Arc::clone(self),
            },
            MemoryExpenseRepository {
                store: Arc::clone(self),
            },
        )
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::StorageUnavailable("memory store lock poisoned".into()))
    }
}

/// In-memory category repository
#[derive(Clone)]
pub struct MemoryCategoryRepository {
    store: Arc<MemoryStore>,
}

impl CategoryRepository for MemoryCategoryRepository {
    fn add(&self, name: &str) -> Result<ExpenseCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name is empty".into()));
        }

        let mut inner = self.store.lock()?;
        let wanted = normalize_name(name);
        if inner
            .categories
            .values()
            .any(|c| normalize_name(&c.name) == wanted)
        {
            return Err(Error::DuplicateEntity(format!("category '{}'", name)));
        }

        inner.next_category_id += 1;
        let category = ExpenseCategory {
            id: inner.next_category_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    fn get(&self, id: i64) -> Result<ExpenseCategory> {
        let inner = self.store.lock()?;
        inner
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    fn get_by_name(&self, name: &str) -> Result<ExpenseCategory> {
        let inner = self.store.lock()?;
        let wanted = normalize_name(name);
        inner
            .categories
            .values()
            .find(|c| normalize_name(&c.name) == wanted)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("category '{}'", name)))
    }

    fn list(&self) -> Result<Vec<ExpenseCategory>> {
        let inner = self.store.lock()?;
        let mut categories: Vec<_> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| normalize_name(&a.name).cmp(&normalize_name(&b.name)));
        Ok(categories)
    }

    fn update(&self, category: &ExpenseCategory) -> Result<()> {
        let mut inner = self.store.lock()?;
        if !inner.categories.contains_key(&category.id) {
            return Err(Error::NotFound(format!("category {}", category.id)));
        }

        let wanted = normalize_name(&category.name);
        if inner
            .categories
            .values()
            .any(|c| c.id != category.id && normalize_name(&c.name) == wanted)
        {
            return Err(Error::DuplicateEntity(format!(
                "category '{}'",
                category.name
            )));
        }

        inner.categories.insert(category.id, category.clone());
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.store.lock()?;
        if !inner.categories.contains_key(&id) {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        if inner.expenses.values().any(|e| e.category_id == id) {
            let name = inner
                .categories
                .get(&id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            return Err(Error::CategoryInUse(name));
        }
        inner.categories.remove(&id);
        Ok(())
    }
}

/// In-memory expense repository
#[derive(Clone)]
pub struct MemoryExpenseRepository {
    store: Arc<MemoryStore>,
}

impl ExpenseRepository for MemoryExpenseRepository {
    fn add(&self, expense: &NewExpense) -> Result<Expense> {
        expense.validate()?;

        let mut inner = self.store.lock()?;
        if !inner.categories.contains_key(&expense.category_id) {
            return Err(Error::NotFound(format!(
                "category {}",
                expense.category_id
            )));
        }

        inner.next_expense_id += 1;
        let stored = Expense {
            id: inner.next_expense_id,
            amount: expense.amount,
            currency: expense.currency,
            description: expense.description.clone(),
            category_id: expense.category_id,
            status: expense.status,
            confidence: expense.confidence,
            created_at: Utc::now(),
        };
        inner.expenses.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn get(&self, id: i64) -> Result<Expense> {
        let inner = self.store.lock()?;
        inner
            .expenses
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))
    }

    fn list(&self) -> Result<Vec<Expense>> {
        let inner = self.store.lock()?;
        let mut expenses: Vec<_> = inner.expenses.values().cloned().collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }

    fn update(&self, expense: &Expense) -> Result<()> {
        let mut inner = self.store.lock()?;
        if !inner.expenses.contains_key(&expense.id) {
            return Err(Error::NotFound(format!("expense {}", expense.id)));
        }
        if !inner.categories.contains_key(&expense.category_id) {
            return Err(Error::NotFound(format!(
                "category {}",
                expense.category_id
            )));
        }
        inner.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut inner = self.store.lock()?;
        if inner.expenses.remove(&id).is_none() {
            return Err(Error::NotFound(format!("expense {}", id)));
        }
        Ok(())
    }

    fn search(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let inner = self.store.lock()?;
        let mut expenses: Vec<_> = inner
            .expenses
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }
}
