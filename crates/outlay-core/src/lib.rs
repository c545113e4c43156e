//! Outlay Core Library
//!
//! Shared functionality for the Outlay expense classifier:
//! - Pluggable LLM provider backends (Ollama, OpenAI-compatible, mock)
//! - Confidence policy with configurable watermarks
//! - Repository storage (in-memory and SQLite) for categories and expenses
//! - Classification service orchestrating the pipeline
//! - Confirmation state machine for human-in-the-loop review

pub mod ai;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod preprocess;
pub mod repo;
pub mod service;
pub mod session;

pub use ai::{
    ClassificationCandidate, ClassificationRequest, Correction, MockProvider, OllamaProvider,
    OpenAiCompatProvider, Provider, ProviderClient,
};
pub use config::Settings;
pub use error::{Error, ProviderError, ProviderErrorKind, Result};
pub use models::{Currency, Expense, ExpenseCategory, ExpenseStatus, NewExpense};
pub use policy::{decide, Decision, RejectReason, Watermarks};
pub use preprocess::{preprocess, CleanInput};
pub use repo::{
    CategoryRepository, Database, ExpenseFilter, ExpenseRepository, MemoryStore,
    SqliteCategoryRepository, SqliteExpenseRepository,
};
pub use service::{
    ClassificationOutcome, ClassificationService, ResolutionDecision, ResolutionOutcome,
};
pub use session::{ConfirmationSession, PendingExpense, SessionState, SessionStore};
