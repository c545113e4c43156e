//! Classification service
//!
//! Orchestrates the pipeline: validate input, invoke the provider with
//! bounded backoff, apply the confidence policy, and commit the outcome
//! through the repositories. Stateless between calls except for the
//! confirmation session store.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::{
    ClassificationCandidate, ClassificationRequest, Correction, Provider, ProviderClient,
};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::{normalize_name, Currency, Expense, ExpenseStatus, NewExpense};
use crate::policy::{decide, Decision, RejectReason};
use crate::preprocess::{preprocess, CleanInput};
use crate::repo::{CategoryRepository, ExpenseRepository};
use crate::session::{PendingExpense, SessionState, SessionStore};

/// Result of a classification request
#[derive(Debug, Clone)]
pub enum ClassificationOutcome {
    /// Auto-accepted and persisted
    Committed(Expense),
    /// Awaiting human confirmation; no expense written yet
    PendingReview {
        session_id: Uuid,
        candidate: ClassificationCandidate,
    },
    /// Rejected by the confidence policy; surfaced as a normal negative
    /// outcome, not an error
    Failed(RejectReason),
}

/// Human decision delivered by an adapter
#[derive(Debug, Clone)]
pub enum ResolutionDecision {
    /// Commit the pending expense, optionally with corrected fields
    Confirm {
        category: Option<String>,
        amount: Option<Decimal>,
        currency: Option<Currency>,
    },
    /// Discard the candidate
    Reject,
}

impl ResolutionDecision {
    /// Plain confirm with no corrections
    pub fn confirm() -> Self {
        Self::Confirm {
            category: None,
            amount: None,
            currency: None,
        }
    }
}

/// Result of resolving a confirmation session
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// Confirmed and persisted
    Committed(Expense),
    /// Rejected; nothing written
    Discarded,
}

/// The classification pipeline entry point shared by all adapters
pub struct ClassificationService {
    provider: ProviderClient,
    categories: Arc<dyn CategoryRepository>,
    expenses: Arc<dyn ExpenseRepository>,
    sessions: Arc<SessionStore>,
    settings: Settings,
}

impl ClassificationService {
    pub fn new(
        provider: ProviderClient,
        categories: Arc<dyn CategoryRepository>,
        expenses: Arc<dyn ExpenseRepository>,
        settings: Settings,
    ) -> Result<Self> {
        settings.validate()?;
        let sessions = Arc::new(SessionStore::new(settings.session_ttl));
        Ok(Self {
            provider,
            categories,
            expenses,
            sessions,
            settings,
        })
    }

    /// The session store, shared with adapters that poll sessions directly.
    pub fn sessions(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    /// Classify an expense description and commit, queue, or reject it.
    pub async fn classify_and_maybe_confirm(
        &self,
        description: &str,
        currency: Option<Currency>,
    ) -> Result<ClassificationOutcome> {
        // 1. Validate input; no provider call on bad text
        let cleaned = preprocess(description)?;

        let categories = self.categories.list()?;
        if categories.is_empty() {
            return Err(Error::Validation(
                "No categories configured; seed categories before classifying".into(),
            ));
        }
        let labels: Vec<String> = categories.into_iter().map(|c| c.name).collect();

        let request = ClassificationRequest {
            description: cleaned.text.clone(),
            labels,
            corrections: self.sessions.recent_corrections(),
        };

        // 2. Provider call with bounded backoff
        let candidate = self.classify_with_retry(&request).await?;
        info!(
            category = %candidate.category,
            confidence = candidate.confidence,
            "Provider returned candidate"
        );

        // 3. Policy
        match decide(&candidate, &request.labels, &self.settings.watermarks) {
            Decision::AutoAccept => {
                let expense = self
                    .commit(
                        &cleaned.text,
                        &candidate.category,
                        self.resolve_amount(&cleaned, &candidate),
                        self.resolve_currency(currency, &candidate),
                        candidate.confidence,
                    )
                    .await?;
                info!(expense_id = expense.id, "Classification auto-accepted");
                Ok(ClassificationOutcome::Committed(expense))
            }
            Decision::NeedsReview => {
                let pending = PendingExpense {
                    description: cleaned.text.clone(),
                    amount: self.resolve_amount(&cleaned, &candidate),
                    currency: self.resolve_currency(currency, &candidate),
                    category: candidate.category.clone(),
                    confidence: candidate.confidence,
                };
                let session = self.sessions.open(candidate.clone(), pending)?;
                info!(session_id = %session.id, "Classification needs review");
                Ok(ClassificationOutcome::PendingReview {
                    session_id: session.id,
                    candidate,
                })
            }
            Decision::Reject(reason) => {
                info!(reason = %reason, "Classification rejected");
                Ok(ClassificationOutcome::Failed(reason))
            }
        }
    }

    /// Apply a human decision to a pending session.
    pub async fn resolve_session(
        &self,
        session_id: Uuid,
        decision: ResolutionDecision,
    ) -> Result<ResolutionOutcome> {
        match decision {
            ResolutionDecision::Reject => {
                self.sessions.resolve(session_id, SessionState::Rejected)?;
                info!(session_id = %session_id, "Candidate discarded by human");
                Ok(ResolutionOutcome::Discarded)
            }
            ResolutionDecision::Confirm {
                category,
                amount,
                currency,
            } => {
                let session = self
                    .sessions
                    .resolve(session_id, SessionState::Confirmed)?;

                let corrected_category = category
                    .filter(|c| normalize_name(c) != normalize_name(&session.pending.category));

                // A category override is an explicit human decision;
                // store it fully trusted and remember the correction.
                let (label, confidence) = match corrected_category {
                    Some(ref corrected) => {
                        self.sessions.record_correction(Correction {
                            description: session.pending.description.clone(),
                            corrected_category: corrected.clone(),
                        });
                        info!(
                            session_id = %session_id,
                            from = %session.pending.category,
                            to = %corrected,
                            "Category corrected by human"
                        );
                        (corrected.clone(), 1.0)
                    }
                    None => (session.pending.category.clone(), session.pending.confidence),
                };

                let expense = self
                    .commit(
                        &session.pending.description,
                        &label,
                        amount.unwrap_or(session.pending.amount),
                        currency.unwrap_or(session.pending.currency),
                        confidence,
                    )
                    .await?;
                info!(session_id = %session_id, expense_id = expense.id, "Session confirmed");
                Ok(ResolutionOutcome::Committed(expense))
            }
        }
    }

    /// Run an expiry sweep over the session store.
    pub fn sweep_expired_sessions(&self) -> Result<usize> {
        self.sessions.sweep_expired()
    }

    async fn classify_with_retry(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationCandidate> {
        let attempts = self.settings.retry_attempts;
        let mut delay = self.settings.backoff_base;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.provider.classify(request).await {
                Ok(candidate) => return Ok(candidate),
                Err(e) if e.kind.is_transient() => {
                    warn!(attempt, error = %e, "Transient provider error");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
                // Malformed output and auth failures will not improve
                // with another attempt.
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::ClassificationUnavailable {
            attempts,
            last_error,
        })
    }

    /// Get-or-create the category and persist the expense.
    async fn commit(
        &self,
        description: &str,
        category_label: &str,
        amount: Decimal,
        currency: Currency,
        confidence: f64,
    ) -> Result<Expense> {
        let category = match self.categories.get_by_name(category_label) {
            Ok(c) => c,
            Err(Error::NotFound(_)) => {
                debug!(category = %category_label, "Creating category on commit");
                match self.categories.add(category_label) {
                    Ok(c) => c,
                    // Lost a create race; the other writer's row wins
                    Err(Error::DuplicateEntity(_)) => self.categories.get_by_name(category_label)?,
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        let new_expense = NewExpense {
            amount,
            currency,
            description: description.to_string(),
            category_id: category.id,
            status: ExpenseStatus::Confirmed,
            confidence,
        };

        self.add_with_retry(&new_expense).await
    }

    /// Persist an expense, retrying transient storage unavailability under
    /// the same backoff policy as provider calls. Logical errors surface
    /// immediately.
    async fn add_with_retry(&self, expense: &NewExpense) -> Result<Expense> {
        let attempts = self.settings.retry_attempts;
        let mut delay = self.settings.backoff_base;

        for attempt in 1..=attempts {
            match self.expenses.add(expense) {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(attempt, error = %e, "Transient storage error on commit");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
        unreachable!("loop returns on the final attempt")
    }

    fn resolve_amount(&self, cleaned: &CleanInput, candidate: &ClassificationCandidate) -> Decimal {
        match candidate.amount.or(cleaned.detected_amount) {
            Some(amount) => amount,
            None => {
                warn!("No amount found in candidate or text, storing zero");
                Decimal::ZERO
            }
        }
    }

    fn resolve_currency(
        &self,
        explicit: Option<Currency>,
        candidate: &ClassificationCandidate,
    ) -> Currency {
        explicit
            .or(candidate.currency)
            .unwrap_or(self.settings.default_currency)
    }
}
