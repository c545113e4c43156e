//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `build_service` - shared construction helpers
//! - `cmd_init` - Initialize the database and seed categories
//! - `cmd_status` - Provider and database status

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use outlay_core::ai::{Provider, ProviderClient};
use outlay_core::config::Settings;
use outlay_core::repo::{CategoryRepository, Database, ExpenseRepository};
use outlay_core::service::ClassificationService;

/// Categories seeded by `outlay init`
const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Groceries",
    "Travel",
    "Transport",
    "Housing",
    "Utilities",
    "Health",
    "Entertainment",
    "Shopping",
    "Other",
];

/// Open the database at the given path
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path.to_string_lossy();
    Database::new(&path_str).context("Failed to open database")
}

/// Build the classification service over the database
pub fn build_service(db: &Database) -> Result<ClassificationService> {
    let settings = Settings::from_env().context("Invalid configuration")?;
    let provider =
        ProviderClient::from_settings(&settings).context("Failed to create provider backend")?;

    let (categories, expenses) = db.repositories();
    let categories: Arc<dyn CategoryRepository> = Arc::new(categories);
    let expenses: Arc<dyn ExpenseRepository> = Arc::new(expenses);

    ClassificationService::new(provider, categories, expenses, settings)
        .context("Failed to build classification service")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let (categories, _) = db.repositories();

    let mut seeded = 0;
    for name in DEFAULT_CATEGORIES {
        match categories.add(name) {
            Ok(_) => seeded += 1,
            Err(outlay_core::Error::DuplicateEntity(_)) => {}
            Err(e) => return Err(e).context("Failed to seed categories"),
        }
    }
    println!("   Seeded {} default categories", seeded);

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Point OLLAMA_HOST at your Ollama server (or set OUTLAY_PROVIDER)");
    println!("  2. Classify an expense: outlay classify \"Coffee at Starbucks for $5.50\"");

    Ok(())
}

pub async fn cmd_status(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let (categories, expenses) = db.repositories();

    println!("📊 Outlay status");
    println!("   Database: {}", db.path());
    println!("   Categories: {}", categories.list()?.len());
    println!("   Expenses: {}", expenses.list()?.len());

    let settings = Settings::from_env().context("Invalid configuration")?;
    println!(
        "   Watermarks: low {:.2} / high {:.2}",
        settings.watermarks.low, settings.watermarks.high
    );

    match ProviderClient::from_settings(&settings) {
        Ok(provider) => {
            let reachable = provider.health_check().await;
            println!(
                "   Provider: {} ({} at {}) - {}",
                settings.provider,
                provider.model(),
                provider.host(),
                if reachable { "reachable" } else { "UNREACHABLE" }
            );
        }
        Err(e) => {
            println!("   Provider: not configured ({})", e);
            println!("   💡 Tip: set OLLAMA_HOST, or OUTLAY_PROVIDER=mock to try it out");
        }
    }

    Ok(())
}
