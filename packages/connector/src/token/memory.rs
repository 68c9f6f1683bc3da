//! In-process cursor store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ConnectorError, Result};

use super::{Cursor, CursorStore};

/// Cursors kept in memory. Lost on restart; meant for tests and single-shot
/// command line harvests.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: Mutex<HashMap<String, Cursor>>,
}

impl MemoryCursorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Cursor>>> {
        self.cursors
            .lock()
            .map_err(|_| ConnectorError::Storage("cursor map lock poisoned".to_string()))
    }
}

impl CursorStore for MemoryCursorStore {
    fn insert(&self, cursor: &Cursor) -> Result<bool> {
        let mut cursors = self.lock()?;
        if cursors.contains_key(&cursor.token) {
            return Ok(false);
        }
        cursors.insert(cursor.token.clone(), cursor.clone());
        Ok(true)
    }

    fn get(&self, token: &str) -> Result<Option<Cursor>> {
        Ok(self.lock()?.get(token).cloned())
    }

    fn remove(&self, token: &str) -> Result<bool> {
        Ok(self.lock()?.remove(token).is_some())
    }

    fn list(&self) -> Result<Vec<Cursor>> {
        Ok(self.lock()?.values().cloned().collect())
    }
}
