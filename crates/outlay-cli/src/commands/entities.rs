//! Category and expense listing commands

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use outlay_core::models::ExpenseStatus;
use outlay_core::repo::{CategoryRepository, ExpenseFilter, ExpenseRepository};

use super::core::open_db;

pub fn cmd_categories_list(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let (categories, expenses) = db.repositories();

    let all = categories.list()?;
    if all.is_empty() {
        println!("No categories. Run 'outlay init' to seed defaults.");
        return Ok(());
    }

    println!("📁 Categories:");
    for category in all {
        let count = expenses
            .search(&ExpenseFilter::new().category(category.id))?
            .len();
        println!("   {:<20} {} expenses", category.name, count);
    }
    Ok(())
}

pub fn cmd_categories_add(db_path: &Path, name: &str) -> Result<()> {
    let db = open_db(db_path)?;
    let (categories, _) = db.repositories();

    let category = categories.add(name)?;
    println!("✅ Added category '{}'", category.name);
    Ok(())
}

pub fn cmd_categories_remove(db_path: &Path, name: &str) -> Result<()> {
    let db = open_db(db_path)?;
    let (categories, _) = db.repositories();

    let category = categories.get_by_name(name)?;
    match categories.delete(category.id) {
        Ok(()) => {
            println!("🗑️  Removed category '{}'", category.name);
            Ok(())
        }
        Err(outlay_core::Error::CategoryInUse(name)) => {
            println!(
                "❌ Category '{}' still has expenses; reassign or delete them first.",
                name
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn cmd_expenses_list(
    db_path: &Path,
    category: Option<&str>,
    status: Option<&str>,
    min_confidence: Option<f64>,
) -> Result<()> {
    let db = open_db(db_path)?;
    let (categories, expenses) = db.repositories();

    let mut filter = ExpenseFilter::new();
    if let Some(name) = category {
        filter = filter.category(categories.get_by_name(name)?.id);
    }
    if let Some(s) = status {
        filter = filter.status(ExpenseStatus::from_str(s).map_err(|e| anyhow::anyhow!(e))?);
    }
    if let Some(min) = min_confidence {
        filter = filter.min_confidence(min);
    }

    let found = expenses.search(&filter)?;
    if found.is_empty() {
        println!("No matching expenses.");
        return Ok(());
    }

    println!("💸 Expenses:");
    for expense in &found {
        let category_name = categories
            .get(expense.category_id)
            .map(|c| c.name)
            .unwrap_or_else(|_| format!("#{}", expense.category_id));
        println!(
            "   {:>10} {} {:<12} {:<10} {:.2}  {}",
            expense.amount.to_string(),
            expense.currency,
            category_name,
            expense.status,
            expense.confidence,
            expense.description,
        );
    }
    println!("   {} total", found.len());
    Ok(())
}
