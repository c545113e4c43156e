//! CLI command tests

use clap::Parser;

use crate::cli::{CategoriesAction, Cli, Commands};
use crate::commands;

fn temp_db() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outlay.db");
    (dir, path)
}

#[test]
fn cli_parses_classify() {
    let cli = Cli::parse_from([
        "outlay",
        "classify",
        "Coffee at Starbucks for $5.50",
        "--currency",
        "USD",
        "--no-confirm",
    ]);
    match cli.command {
        Commands::Classify {
            description,
            currency,
            no_confirm,
            json,
        } => {
            assert_eq!(description, "Coffee at Starbucks for $5.50");
            assert_eq!(currency.as_deref(), Some("USD"));
            assert!(no_confirm);
            assert!(!json);
        }
        _ => panic!("expected classify command"),
    }
}

#[test]
fn cli_parses_categories_default_action() {
    let cli = Cli::parse_from(["outlay", "categories"]);
    assert!(matches!(cli.command, Commands::Categories { action: None }));

    let cli = Cli::parse_from(["outlay", "categories", "add", "Books"]);
    assert!(matches!(
        cli.command,
        Commands::Categories {
            action: Some(CategoriesAction::Add { .. })
        }
    ));
}

#[test]
fn init_seeds_categories() {
    let (_dir, path) = temp_db();
    commands::cmd_init(&path).unwrap();

    let db = commands::open_db(&path).unwrap();
    let (categories, _) = db.repositories();
    use outlay_core::repo::CategoryRepository;
    assert!(categories.list().unwrap().len() >= 10);
    assert!(categories.get_by_name("Food").is_ok());

    // Re-running init is harmless
    commands::cmd_init(&path).unwrap();
}

#[test]
fn categories_add_and_remove() {
    let (_dir, path) = temp_db();
    commands::cmd_init(&path).unwrap();

    commands::cmd_categories_add(&path, "Books").unwrap();
    commands::cmd_categories_remove(&path, "books").unwrap();

    let db = commands::open_db(&path).unwrap();
    let (categories, _) = db.repositories();
    use outlay_core::repo::CategoryRepository;
    assert!(categories.get_by_name("Books").is_err());
}

#[test]
fn expenses_list_empty_is_ok() {
    let (_dir, path) = temp_db();
    commands::cmd_init(&path).unwrap();
    commands::cmd_expenses_list(&path, None, None, None).unwrap();
    commands::cmd_expenses_list(&path, Some("Food"), Some("confirmed"), Some(0.5)).unwrap();
}
