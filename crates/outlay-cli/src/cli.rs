//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Outlay - Classify free-text expenses with an LLM, human in the loop
#[derive(Parser)]
#[command(name = "outlay")]
#[command(about = "LLM-backed expense classifier with human review", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "outlay.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed default categories
    Init,

    /// Classify an expense description
    ///
    /// Low-confidence results ask for confirmation on stdin; answer with
    /// y(es), n(o), or a corrected category name.
    Classify {
        /// The expense text, e.g. "Coffee at Starbucks for $5.50"
        description: String,

        /// Currency code override (USD, EUR, ...)
        #[arg(short, long)]
        currency: Option<String>,

        /// Never prompt; leave low-confidence results unclassified
        #[arg(long)]
        no_confirm: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// List stored expenses
    Expenses {
        /// Filter by category name
        #[arg(long)]
        category: Option<String>,

        /// Filter by status: pending, confirmed, rejected
        #[arg(long)]
        status: Option<String>,

        /// Only show expenses at or above this confidence
        #[arg(long)]
        min_confidence: Option<f64>,
    },

    /// Show provider and database status
    Status,
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List all categories
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,
    },

    /// Remove a category (fails while expenses reference it)
    Remove {
        /// Category name
        name: String,
    },
}
