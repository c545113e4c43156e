//! Confirmation state machine
//!
//! Tracks classifications awaiting human confirmation. Sessions are keyed by
//! id and decoupled from any transport; adapters deliver confirm/reject
//! events and the store serializes them so exactly one resolution wins.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ai::{ClassificationCandidate, Correction};
use crate::error::{Error, Result};
use crate::models::Currency;

/// How many recent human corrections are kept as provider context
const MAX_CORRECTIONS: usize = 20;

/// State of a confirmation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for a human decision
    AwaitingConfirmation,
    /// Human confirmed; expense committed
    Confirmed,
    /// Human rejected; candidate discarded
    Rejected,
    /// Timeout elapsed; candidate discarded
    Expired,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingConfirmation)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target expense fields held by a session until resolution
///
/// Nothing is written to a repository while the session is open.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingExpense {
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub category: String,
    pub confidence: f64,
}

/// A pending classification awaiting human confirmation
#[derive(Debug, Clone)]
pub struct ConfirmationSession {
    pub id: Uuid,
    /// The originating provider candidate
    pub candidate: ClassificationCandidate,
    /// The expense that would be committed on confirm
    pub pending: PendingExpense,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConfirmationSession {
    fn expired_by(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::AwaitingConfirmation && now > self.expires_at
    }
}

/// Store for confirmation sessions
///
/// Safe for concurrent access from multiple interface adapters; resolution
/// attempts on the same session are serialized by the store lock, so a
/// second resolution always observes the terminal state. Expiry is checked
/// lazily on access and can also be driven by `sweep_expired`.
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: Mutex<HashMap<Uuid, ConfirmationSession>>,
    corrections: Mutex<VecDeque<Correction>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(300)),
            sessions: Mutex::new(HashMap::new()),
            corrections: Mutex::new(VecDeque::new()),
        }
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, HashMap<Uuid, ConfirmationSession>>> {
        self.sessions
            .lock()
            .map_err(|_| Error::StorageUnavailable("session store lock poisoned".into()))
    }

    /// Open a session for a candidate that needs review.
    pub fn open(
        &self,
        candidate: ClassificationCandidate,
        pending: PendingExpense,
    ) -> Result<ConfirmationSession> {
        let now = Utc::now();
        let session = ConfirmationSession {
            id: Uuid::new_v4(),
            candidate,
            pending,
            state: SessionState::AwaitingConfirmation,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.lock_sessions()?;
        sessions.insert(session.id, session.clone());
        debug!(session_id = %session.id, expires_at = %session.expires_at, "Confirmation session opened");
        Ok(session)
    }

    /// Look up a session, marking it expired first when its timeout has
    /// elapsed.
    pub fn get(&self, id: Uuid) -> Result<ConfirmationSession> {
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

        if session.expired_by(Utc::now()) {
            expire(session);
        }
        Ok(session.clone())
    }

    /// Resolve a session to a terminal state, returning its payload.
    ///
    /// Exactly one caller wins; later attempts fail with
    /// `SessionAlreadyResolved` (or `SessionExpired` once the timeout has
    /// passed). An expired session never transitions to Confirmed.
    pub fn resolve(&self, id: Uuid, target: SessionState) -> Result<ConfirmationSession> {
        debug_assert!(target == SessionState::Confirmed || target == SessionState::Rejected);

        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

        if session.expired_by(Utc::now()) {
            expire(session);
            return Err(Error::SessionExpired(id));
        }
        match session.state {
            SessionState::AwaitingConfirmation => {}
            SessionState::Expired => return Err(Error::SessionExpired(id)),
            _ => return Err(Error::SessionAlreadyResolved(id)),
        }

        session.state = target;
        info!(session_id = %id, state = %target, "Confirmation session resolved");
        Ok(session.clone())
    }

    /// Mark every timed-out session expired. Returns how many changed state.
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.lock_sessions()?;
        let mut swept = 0;
        for session in sessions.values_mut() {
            if session.expired_by(now) {
                expire(session);
                swept += 1;
            }
        }
        Ok(swept)
    }

    /// Number of sessions still awaiting confirmation.
    pub fn pending_count(&self) -> Result<usize> {
        let sessions = self.lock_sessions()?;
        Ok(sessions
            .values()
            .filter(|s| s.state == SessionState::AwaitingConfirmation)
            .count())
    }

    /// Record a human category correction for provider context.
    pub fn record_correction(&self, correction: Correction) {
        if let Ok(mut corrections) = self.corrections.lock() {
            if corrections.len() == MAX_CORRECTIONS {
                corrections.pop_front();
            }
            corrections.push_back(correction);
        }
    }

    /// Recent corrections, oldest first.
    pub fn recent_corrections(&self) -> Vec<Correction> {
        self.corrections
            .lock()
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Transition a session to Expired, logging the discarded classification
/// for later analysis.
fn expire(session: &mut ConfirmationSession) {
    session.state = SessionState::Expired;
    info!(
        session_id = %session.id,
        category = %session.pending.category,
        confidence = session.pending.confidence,
        description = %session.pending.description,
        "Confirmation session expired; classification discarded"
    );
}
