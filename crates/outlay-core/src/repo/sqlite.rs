//! SQLite repository implementation with connection pooling and migrations
//!
//! Durable variant of the repository contract. Amounts are stored as TEXT
//! so decimal values round-trip exactly; timestamps are RFC 3339 strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{Currency, Expense, ExpenseCategory, ExpenseStatus, NewExpense};

use super::{CategoryRepository, ExpenseFilter, ExpenseRepository};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a stored RFC 3339 timestamp
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations.
    pub fn new(path: &str) -> Result<Self> {
        // Expense rows reference categories; keep the constraint enforced
        // on every pooled connection.
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("outlay_test_{}_{}.db", std::process::id(), id));
        let path = path.to_string_lossy().into_owned();

        let _ = std::fs::remove_file(&path);
        Self::new(&path)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Build both repositories over this database.
    pub fn repositories(&self) -> (SqliteCategoryRepository, SqliteExpenseRepository) {
        (
            SqliteCategoryRepository { db: self.clone() },
            SqliteExpenseRepository { db: self.clone() },
        )
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                description TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                status TEXT NOT NULL,
                confidence REAL NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_status ON expenses(status);
            CREATE INDEX IF NOT EXISTS idx_expenses_created ON expenses(created_at);
            "#,
        )?;
        info!(path = %self.db_path, "Database migrations applied");
        Ok(())
    }
}

/// SQLite category repository
#[derive(Clone)]
pub struct SqliteCategoryRepository {
    db: Database,
}

fn category_from_row(row: (i64, String, String)) -> ExpenseCategory {
    ExpenseCategory {
        id: row.0,
        name: row.1,
        created_at: parse_datetime(&row.2),
    }
}

impl CategoryRepository for SqliteCategoryRepository {
    fn add(&self, name: &str) -> Result<ExpenseCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name is empty".into()));
        }

        let conn = self.db.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ? COLLATE NOCASE",
                params![name],
                |row| row.get(0),
            )
            .ok();
        if existing.is_some() {
            return Err(Error::DuplicateEntity(format!("category '{}'", name)));
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO categories (name, created_at) VALUES (?, ?)",
            params![name, created_at.to_rfc3339()],
        )?;

        Ok(ExpenseCategory {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    fn get(&self, id: i64) -> Result<ExpenseCategory> {
        let conn = self.db.conn()?;
        let row: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();
        row.map(category_from_row)
            .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    fn get_by_name(&self, name: &str) -> Result<ExpenseCategory> {
        let conn = self.db.conn()?;
        let row: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT id, name, created_at FROM categories WHERE name = ? COLLATE NOCASE",
                params![name.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .ok();
        row.map(category_from_row)
            .ok_or_else(|| Error::NotFound(format!("category '{}'", name)))
    }

    fn list(&self) -> Result<Vec<ExpenseCategory>> {
        let conn = self.db.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name COLLATE NOCASE")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<(i64, String, String)>>>()?;
        Ok(rows.into_iter().map(category_from_row).collect())
    }

    fn update(&self, category: &ExpenseCategory) -> Result<()> {
        let conn = self.db.conn()?;

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ?",
                params![category.id],
                |row| row.get(0),
            )
            .ok();
        if exists.is_none() {
            return Err(Error::NotFound(format!("category {}", category.id)));
        }

        let clash: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ? COLLATE NOCASE AND id != ?",
                params![category.name.trim(), category.id],
                |row| row.get(0),
            )
            .ok();
        if clash.is_some() {
            return Err(Error::DuplicateEntity(format!(
                "category '{}'",
                category.name
            )));
        }

        conn.execute(
            "UPDATE categories SET name = ? WHERE id = ?",
            params![category.name.trim(), category.id],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn()?;

        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            let name: String = conn
                .query_row(
                    "SELECT name FROM categories WHERE id = ?",
                    params![id],
                    |row| row.get(0),
                )
                .unwrap_or_default();
            return Err(Error::CategoryInUse(name));
        }

        let deleted = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        Ok(())
    }
}

/// SQLite expense repository
#[derive(Clone)]
pub struct SqliteExpenseRepository {
    db: Database,
}

type ExpenseRow = (i64, String, String, String, i64, String, f64, String);

const EXPENSE_COLUMNS: &str =
    "id, amount, currency, description, category_id, status, confidence, created_at";

fn expense_from_row(row: ExpenseRow) -> Result<Expense> {
    let (id, amount, currency, description, category_id, status, confidence, created_at) = row;
    Ok(Expense {
        id,
        amount: Decimal::from_str(&amount)
            .map_err(|e| Error::Validation(format!("Stored amount '{}' invalid: {}", amount, e)))?,
        currency: currency
            .parse::<Currency>()
            .map_err(Error::Validation)?,
        description,
        category_id,
        status: status.parse::<ExpenseStatus>().map_err(Error::Validation)?,
        confidence,
        created_at: parse_datetime(&created_at),
    })
}

fn map_expense_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

impl ExpenseRepository for SqliteExpenseRepository {
    fn add(&self, expense: &NewExpense) -> Result<Expense> {
        expense.validate()?;

        let conn = self.db.conn()?;
        let category_exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ?",
                params![expense.category_id],
                |row| row.get(0),
            )
            .ok();
        if category_exists.is_none() {
            return Err(Error::NotFound(format!(
                "category {}",
                expense.category_id
            )));
        }

        let created_at = Utc::now();
        conn.execute(
            r#"
            INSERT INTO expenses (amount, currency, description, category_id, status, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                expense.amount.to_string(),
                expense.currency.as_str(),
                expense.description,
                expense.category_id,
                expense.status.as_str(),
                expense.confidence,
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(Expense {
            id: conn.last_insert_rowid(),
            amount: expense.amount,
            currency: expense.currency,
            description: expense.description.clone(),
            category_id: expense.category_id,
            status: expense.status,
            confidence: expense.confidence,
            created_at,
        })
    }

    fn get(&self, id: i64) -> Result<Expense> {
        let conn = self.db.conn()?;
        let row: Option<ExpenseRow> = conn
            .query_row(
                &format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS),
                params![id],
                map_expense_row,
            )
            .ok();
        match row {
            Some(r) => expense_from_row(r),
            None => Err(Error::NotFound(format!("expense {}", id))),
        }
    }

    fn list(&self) -> Result<Vec<Expense>> {
        self.search(&ExpenseFilter::new())
    }

    fn update(&self, expense: &Expense) -> Result<()> {
        let conn = self.db.conn()?;

        let category_exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ?",
                params![expense.category_id],
                |row| row.get(0),
            )
            .ok();
        if category_exists.is_none() {
            return Err(Error::NotFound(format!(
                "category {}",
                expense.category_id
            )));
        }

        let updated = conn.execute(
            r#"
            UPDATE expenses
            SET amount = ?, currency = ?, description = ?, category_id = ?, status = ?, confidence = ?
            WHERE id = ?
            "#,
            params![
                expense.amount.to_string(),
                expense.currency.as_str(),
                expense.description,
                expense.category_id,
                expense.status.as_str(),
                expense.confidence,
                expense.id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("expense {}", expense.id)));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let conn = self.db.conn()?;
        let deleted = conn.execute("DELETE FROM expenses WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("expense {}", id)));
        }
        Ok(())
    }

    fn search(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let conn = self.db.conn()?;
        let (where_clause, params) = filter.build();
        let query = format!(
            "SELECT {} FROM expenses {} ORDER BY created_at DESC, id DESC",
            EXPENSE_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), map_expense_row)?
            .collect::<rusqlite::Result<Vec<ExpenseRow>>>()?;

        rows.into_iter().map(expense_from_row).collect()
    }
}
