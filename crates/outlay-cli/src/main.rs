//! Outlay CLI - LLM-backed expense classifier
//!
//! Usage:
//!   outlay init                            Initialize database and seed categories
//!   outlay classify "Coffee $5.50"         Classify an expense (asks on low confidence)
//!   outlay categories list                 Manage categories
//!   outlay expenses --status confirmed     List stored expenses
//!   outlay status                          Show provider and database status

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Classify {
            description,
            currency,
            no_confirm,
            json,
        } => {
            commands::cmd_classify(&cli.db, &description, currency.as_deref(), no_confirm, json)
                .await
        }
        Commands::Categories { action } => match action {
            None | Some(CategoriesAction::List) => commands::cmd_categories_list(&cli.db),
            Some(CategoriesAction::Add { name }) => commands::cmd_categories_add(&cli.db, &name),
            Some(CategoriesAction::Remove { name }) => {
                commands::cmd_categories_remove(&cli.db, &name)
            }
        },
        Commands::Expenses {
            category,
            status,
            min_confidence,
        } => commands::cmd_expenses_list(
            &cli.db,
            category.as_deref(),
            status.as_deref(),
            min_confidence,
        ),
        Commands::Status => commands::cmd_status(&cli.db).await,
    }
}
