//! End-to-end classification pipeline tests
//!
//! Exercise the full flow with the mock provider: auto-accept, human
//! review, rejection, session resolution races, and expiry.

use std::sync::Arc;
use std::time::Duration;

use outlay_core::ai::{ClassificationCandidate, MockProvider, ProviderClient};
use outlay_core::config::Settings;
use outlay_core::error::Error;
use outlay_core::models::{Currency, ExpenseStatus};
use outlay_core::policy::{RejectReason, Watermarks};
use outlay_core::repo::{
    CategoryRepository, Database, ExpenseFilter, ExpenseRepository, MemoryStore,
};
use outlay_core::service::{
    ClassificationOutcome, ClassificationService, ResolutionDecision, ResolutionOutcome,
};
use rust_decimal::Decimal;

struct Harness {
    service: ClassificationService,
    expenses: Arc<dyn ExpenseRepository>,
}

fn settings() -> Settings {
    Settings {
        provider: "mock".into(),
        backoff_base: Duration::from_millis(1),
        ..Settings::default()
    }
}

fn candidate(category: &str, confidence: f64) -> ClassificationCandidate {
    ClassificationCandidate {
        category: category.into(),
        confidence,
        amount: None,
        currency: None,
        rationale: None,
    }
}

fn harness(provider: MockProvider, settings: Settings) -> Harness {
    let store = MemoryStore::new();
    let (categories, expenses) = store.repositories();
    for name in ["Food", "Travel", "Other"] {
        categories.add(name).unwrap();
    }
    let expenses: Arc<dyn ExpenseRepository> = Arc::new(expenses);
    let service = ClassificationService::new(
        ProviderClient::Mock(provider),
        Arc::new(categories),
        Arc::clone(&expenses),
        settings,
    )
    .unwrap();
    Harness { service, expenses }
}

#[tokio::test]
async fn high_confidence_commits_without_session() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.95));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();

    let expense = match outcome {
        ClassificationOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };
    assert_eq!(expense.amount, Decimal::new(550, 2));
    assert_eq!(expense.status, ExpenseStatus::Confirmed);
    assert_eq!(expense.confidence, 0.95);
    // Provider supplied no currency; the configured default applies
    assert_eq!(expense.currency, Currency::Eur);

    assert_eq!(h.service.sessions().pending_count().unwrap(), 0);
    assert_eq!(h.expenses.list().unwrap().len(), 1);
}

#[tokio::test]
async fn mid_confidence_opens_session_and_confirm_commits() {
    // Match the review band so 0.55 lands between the watermarks
    let mut s = settings();
    s.watermarks = Watermarks::new(0.5, 0.85).unwrap();
    let provider = MockProvider::with_candidate(candidate("Food", 0.55));
    let h = harness(provider, s);

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();

    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, ref candidate } => {
            assert_eq!(candidate.category, "Food");
            session_id
        }
        other => panic!("expected pending review, got {:?}", other),
    };

    // Nothing persisted until the human answers
    assert!(h.expenses.list().unwrap().is_empty());
    assert_eq!(h.service.sessions().pending_count().unwrap(), 1);

    let resolution = h
        .service
        .resolve_session(session_id, ResolutionDecision::confirm())
        .await
        .unwrap();
    let expense = match resolution {
        ResolutionOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };

    // Plain confirm preserves the candidate's confidence
    assert_eq!(expense.confidence, 0.55);
    assert_eq!(expense.status, ExpenseStatus::Confirmed);
    assert_eq!(expense.amount, Decimal::new(550, 2));
    assert_eq!(h.expenses.list().unwrap().len(), 1);
}

#[tokio::test]
async fn low_confidence_fails_without_side_effects() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.30));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ClassificationOutcome::Failed(RejectReason::LowConfidence)
    ));
    assert!(h.expenses.list().unwrap().is_empty());
    assert_eq!(h.service.sessions().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn unknown_category_fails_regardless_of_confidence() {
    let provider = MockProvider::with_candidate(candidate("NotARealCategory", 0.99));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ClassificationOutcome::Failed(RejectReason::UnknownCategory)
    ));
    assert!(h.expenses.list().unwrap().is_empty());
    assert_eq!(h.service.sessions().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn second_resolution_fails_and_one_expense_results() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    h.service
        .resolve_session(session_id, ResolutionDecision::confirm())
        .await
        .unwrap();

    let err = h
        .service
        .resolve_session(session_id, ResolutionDecision::confirm())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionAlreadyResolved(_)));

    // Exactly one expense from the full sequence
    assert_eq!(h.expenses.list().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_resolutions_have_one_winner() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    let (a, b) = tokio::join!(
        h.service
            .resolve_session(session_id, ResolutionDecision::confirm()),
        h.service
            .resolve_session(session_id, ResolutionDecision::Reject),
    );

    assert_eq!(
        a.is_ok() as usize + b.is_ok() as usize,
        1,
        "exactly one resolution must win"
    );
    // The loser saw a typed error, and at most one expense exists
    assert!(h.expenses.list().unwrap().len() <= 1);
}

#[tokio::test]
async fn reject_discards_candidate() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    let resolution = h
        .service
        .resolve_session(session_id, ResolutionDecision::Reject)
        .await
        .unwrap();
    assert!(matches!(resolution, ResolutionOutcome::Discarded));
    assert!(h.expenses.list().unwrap().is_empty());
}

#[tokio::test]
async fn expired_session_rejects_late_confirm() {
    let mut s = settings();
    s.session_ttl = Duration::ZERO;
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, s);

    let outcome = h
        .service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    let err = h
        .service
        .resolve_session(session_id, ResolutionDecision::confirm())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired(_)));
    assert!(h.expenses.list().unwrap().is_empty());
}

#[tokio::test]
async fn corrected_confirm_is_fully_trusted_and_remembered() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Train ticket to Berlin 45", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    let resolution = h
        .service
        .resolve_session(
            session_id,
            ResolutionDecision::Confirm {
                category: Some("Travel".into()),
                amount: None,
                currency: None,
            },
        )
        .await
        .unwrap();

    let expense = match resolution {
        ResolutionOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };
    // Human override is an explicit decision
    assert_eq!(expense.confidence, 1.0);

    let corrections = h.service.sessions().recent_corrections();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].corrected_category, "Travel");
}

#[tokio::test]
async fn confirm_with_amount_override() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Team dinner 80", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    let resolution = h
        .service
        .resolve_session(
            session_id,
            ResolutionDecision::Confirm {
                category: None,
                amount: Some(Decimal::new(9250, 2)),
                currency: Some(Currency::Usd),
            },
        )
        .await
        .unwrap();

    let expense = match resolution {
        ResolutionOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };
    assert_eq!(expense.amount, Decimal::new(9250, 2));
    assert_eq!(expense.currency, Currency::Usd);
    // Amount edits alone do not override the model's confidence
    assert_eq!(expense.confidence, 0.70);
}

#[tokio::test]
async fn sweep_expires_pending_sessions() {
    let mut s = settings();
    s.session_ttl = Duration::ZERO;
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, s);

    h.service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();

    assert_eq!(h.service.sweep_expired_sessions().unwrap(), 1);
    assert_eq!(h.service.sessions().pending_count().unwrap(), 0);
}

#[tokio::test]
async fn pipeline_works_against_sqlite() {
    let db = Database::in_memory().unwrap();
    let (categories, expenses) = db.repositories();
    for name in ["Food", "Travel", "Other"] {
        categories.add(name).unwrap();
    }
    let expenses: Arc<dyn ExpenseRepository> = Arc::new(expenses);

    let provider = MockProvider::with_candidate(candidate("Food", 0.95));
    let service = ClassificationService::new(
        ProviderClient::Mock(provider),
        Arc::new(categories),
        Arc::clone(&expenses),
        settings(),
    )
    .unwrap();

    let outcome = service
        .classify_and_maybe_confirm("Coffee at Starbucks for $5.50", None)
        .await
        .unwrap();
    let expense = match outcome {
        ClassificationOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };

    let stored = expenses
        .search(&ExpenseFilter::new().status(ExpenseStatus::Confirmed))
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, expense.id);
    assert_eq!(stored[0].amount, Decimal::new(550, 2));
}

#[tokio::test]
async fn corrected_confirm_creates_new_category() {
    let provider = MockProvider::with_candidate(candidate("Food", 0.70));
    let h = harness(provider, settings());

    let outcome = h
        .service
        .classify_and_maybe_confirm("Office chair 120", None)
        .await
        .unwrap();
    let session_id = match outcome {
        ClassificationOutcome::PendingReview { session_id, .. } => session_id,
        other => panic!("expected pending review, got {:?}", other),
    };

    // The human picks a category that does not exist yet
    let resolution = h
        .service
        .resolve_session(
            session_id,
            ResolutionDecision::Confirm {
                category: Some("Furniture".into()),
                amount: None,
                currency: None,
            },
        )
        .await
        .unwrap();

    let expense = match resolution {
        ResolutionOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };
    assert_eq!(expense.confidence, 1.0);
    assert_eq!(h.expenses.get(expense.id).unwrap().category_id, expense.category_id);
}

#[tokio::test]
async fn commit_resolves_label_case_insensitively() {
    let store = MemoryStore::new();
    let (categories, expenses) = store.repositories();
    categories.add("Food").unwrap();
    let categories_dyn: Arc<dyn CategoryRepository> = Arc::new(categories.clone());
    let expenses_dyn: Arc<dyn ExpenseRepository> = Arc::new(expenses);

    let provider = MockProvider::with_candidate(candidate("food", 0.95));
    let service = ClassificationService::new(
        ProviderClient::Mock(provider),
        categories_dyn,
        expenses_dyn,
        settings(),
    )
    .unwrap();

    let outcome = service
        .classify_and_maybe_confirm("Groceries 20", None)
        .await
        .unwrap();
    let expense = match outcome {
        ClassificationOutcome::Committed(e) => e,
        other => panic!("expected committed, got {:?}", other),
    };

    // Lowercase answer resolved to the existing category, not a duplicate
    assert_eq!(categories.list().unwrap().len(), 1);
    assert_eq!(expense.category_id, categories.get_by_name("Food").unwrap().id);
}
