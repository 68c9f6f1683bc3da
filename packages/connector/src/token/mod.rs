//! Resumption tokens: durable, expiring cursors over paged list results.
//!
//! A [`Cursor`] is never modified once stored. Continuing a list mints a new
//! cursor and retires the one that was resumed.

mod file;
mod memory;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::Result;
use crate::oai::Verb;
use crate::query::{FilterSuffix, HarvestParams};

pub use file::FileCursorStore;
pub use memory::MemoryCursorStore;

/// Attempts at generating a token that is not yet stored.
const MINT_ATTEMPTS: usize = 3;

/// Everything needed to continue a list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    pub verb: Verb,
    pub params: HarvestParams,
    /// Access restrictions the session started with.
    pub filter: FilterSuffix,
    /// Position in index document order.
    pub raw_offset: usize,
    /// Position in the logical record stream.
    pub virtual_offset: usize,
    pub total_raw: usize,
    pub total_virtual: usize,
}

/// A stored cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub token: String,
    #[serde(flatten)]
    pub state: CursorState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Cursor {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Key-value persistence for cursors.
pub trait CursorStore: Send + Sync {
    /// Store a new cursor. Returns `false` if the token is already taken.
    fn insert(&self, cursor: &Cursor) -> Result<bool>;

    /// Load a cursor by token.
    fn get(&self, token: &str) -> Result<Option<Cursor>>;

    /// Delete a cursor. Returns whether it existed.
    fn remove(&self, token: &str) -> Result<bool>;

    /// All stored cursors.
    fn list(&self) -> Result<Vec<Cursor>>;
}

/// A fresh token: a time-ordered unique id mixed with random bytes and
/// hashed, so the creation time cannot be read back from it.
fn generate_token() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::now_v7().as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let mut token = format!("{:x}", hasher.finalize());
    token.truncate(32);
    token
}

/// Check the surface form of a token: 32 lower-case hex characters.
///
/// # Examples
/// ```
/// use oai_connector::token::is_well_formed;
///
/// assert!(is_well_formed("0190a1b2c3d47e8f9a0b1c2d3e4f5a6b"));
/// assert!(!is_well_formed("../../etc/passwd"));
/// assert!(!is_well_formed("0190A1B2C3D47E8F9A0B1C2D3E4F5A6B"));
/// ```
#[must_use]
pub fn is_well_formed(token: &str) -> bool {
    token.len() == 32 && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Mints, resolves and retires cursors with a fixed lifetime.
#[derive(Clone)]
pub struct ResumptionTokenStore {
    store: Arc<dyn CursorStore>,
    lifetime: Duration,
}

impl std::fmt::Debug for ResumptionTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumptionTokenStore")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl ResumptionTokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn CursorStore>, lifetime_secs: u64) -> Self {
        let secs = i64::try_from(lifetime_secs).unwrap_or(i64::MAX);
        Self {
            store,
            lifetime: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Persist a new cursor under a fresh, opaque token.
    #[tracing::instrument(skip(self, state), fields(raw_offset = state.raw_offset))]
    pub fn mint(&self, state: CursorState, now: DateTime<Utc>) -> Result<Cursor> {
        let mut cursor = Cursor {
            token: String::new(),
            state,
            created_at: now,
            expires_at: now
                .checked_add_signed(self.lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        for _ in 0..MINT_ATTEMPTS {
            cursor.token = generate_token();
            if self.store.insert(&cursor)? {
                tracing::info!(token = %cursor.token, "resumption token minted");
                return Ok(cursor);
            }
            tracing::warn!(token = %cursor.token, "token collision, regenerating");
        }
        Err(crate::error::ConnectorError::Storage(
            "could not allocate a unique resumption token".to_string(),
        ))
    }

    /// Look up a live cursor. Malformed, unknown and expired tokens all
    /// resolve to `None`.
    #[tracing::instrument(skip(self))]
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Cursor>> {
        if !is_well_formed(token) {
            tracing::debug!("malformed resumption token");
            return Ok(None);
        }
        match self.store.get(token)? {
            Some(cursor) if cursor.is_expired(now) => {
                tracing::debug!(expired_at = %cursor.expires_at, "resumption token expired");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Delete a cursor that has been continued.
    pub fn retire(&self, token: &str) -> Result<()> {
        if self.store.remove(token)? {
            tracing::info!(token, "resumption token retired");
        }
        Ok(())
    }

    /// Delete all expired cursors. Returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0;
        for cursor in self.store.list()? {
            if cursor.is_expired(now) && self.store.remove(&cursor.token)? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "expired resumption tokens swept");
        }
        Ok(removed)
    }
}
