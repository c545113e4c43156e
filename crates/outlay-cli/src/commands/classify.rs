//! Classification command with interactive confirmation
//!
//! Renders the typed outcomes from the core into terminal output; all
//! business logic lives in `outlay_core::service`.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use outlay_core::models::{Currency, Expense};
use outlay_core::service::{
    ClassificationOutcome, ClassificationService, ResolutionDecision, ResolutionOutcome,
};
use uuid::Uuid;

use super::core::{build_service, open_db};

pub async fn cmd_classify(
    db_path: &Path,
    description: &str,
    currency: Option<&str>,
    no_confirm: bool,
    json: bool,
) -> Result<()> {
    let db = open_db(db_path)?;
    let service = build_service(&db)?;

    let currency = currency
        .map(Currency::from_str)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let outcome = service
        .classify_and_maybe_confirm(description, currency)
        .await?;

    match outcome {
        ClassificationOutcome::Committed(expense) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&expense)?);
            } else {
                print_committed(&expense, &db)?;
            }
        }
        ClassificationOutcome::PendingReview {
            session_id,
            candidate,
        } => {
            println!(
                "🤔 Suggested: {} (confidence {:.2})",
                candidate.category, candidate.confidence
            );
            if let Some(ref rationale) = candidate.rationale {
                println!("   {}", rationale);
            }

            if no_confirm {
                println!("   Left unconfirmed (--no-confirm); nothing was saved.");
                return Ok(());
            }

            let decision = prompt_decision(&candidate.category)?;
            resolve(&service, session_id, decision, &db, json).await?;
        }
        ClassificationOutcome::Failed(reason) => {
            println!("❌ Classification failed: {}", reason);
            println!("   Nothing was saved. Try rephrasing the description.");
        }
    }

    Ok(())
}

/// Ask the user to confirm, reject, or correct the suggested category.
fn prompt_decision(suggested: &str) -> Result<ResolutionDecision> {
    print!("   Confirm '{}'? [y]es / [n]o / category name: ", suggested);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read confirmation")?;
    let answer = line.trim();

    Ok(match answer.to_lowercase().as_str() {
        "" | "y" | "yes" => ResolutionDecision::confirm(),
        "n" | "no" => ResolutionDecision::Reject,
        _ => ResolutionDecision::Confirm {
            category: Some(answer.to_string()),
            amount: None,
            currency: None,
        },
    })
}

async fn resolve(
    service: &ClassificationService,
    session_id: Uuid,
    decision: ResolutionDecision,
    db: &outlay_core::repo::Database,
    json: bool,
) -> Result<()> {
    match service.resolve_session(session_id, decision).await? {
        ResolutionOutcome::Committed(expense) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&expense)?);
            } else {
                print_committed(&expense, db)?;
            }
        }
        ResolutionOutcome::Discarded => {
            println!("🗑️  Discarded; nothing was saved.");
        }
    }
    Ok(())
}

fn print_committed(expense: &Expense, db: &outlay_core::repo::Database) -> Result<()> {
    use outlay_core::repo::CategoryRepository;

    let (categories, _) = db.repositories();
    let category = categories
        .get(expense.category_id)
        .map(|c| c.name)
        .unwrap_or_else(|_| format!("#{}", expense.category_id));

    println!(
        "✅ Saved: {} {} - {} [{}] (confidence {:.2})",
        expense.amount, expense.currency, expense.description, category, expense.confidence
    );
    Ok(())
}
