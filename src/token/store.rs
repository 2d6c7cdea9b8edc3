//! Token Store
//!
//! Ordered, in-memory collection of token records synced from the token
//! service. The local reveal overlay is kept in a separate set keyed by id
//! so server-synced fields and UI state never share a struct.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::types::{TokenId, TokenRecord};

#[derive(Default)]
struct StoreState {
    records: Vec<TokenRecord>,
    revealed: HashSet<TokenId>,
}

/// Token store.
///
/// Server-derived data only changes through [`TokenStore::replace_all`] and
/// [`TokenStore::remove`]; there is no API for patching a record.
#[derive(Default)]
pub struct TokenStore {
    state: Mutex<StoreState>,
}

impl TokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically replace the whole collection, keeping the given order.
    ///
    /// Every reveal flag is reset. Records repeating an id already seen are
    /// dropped; the number dropped is returned.
    pub fn replace_all(&self, records: Vec<TokenRecord>) -> usize {
        let mut seen = HashSet::with_capacity(records.len());
        let total = records.len();
        let unique: Vec<TokenRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.id))
            .collect();
        let dropped = total - unique.len();

        let mut state = self.state();
        state.records = unique;
        state.revealed.clear();
        dropped
    }

    /// Flip the reveal flag of one record.
    ///
    /// Returns the new flag, or `None` (and changes nothing) when the id is
    /// not in the store.
    pub fn toggle_revealed(&self, id: TokenId) -> Option<bool> {
        let mut state = self.state();
        if !state.records.iter().any(|r| r.id == id) {
            return None;
        }
        if state.revealed.remove(&id) {
            Some(false)
        } else {
            state.revealed.insert(id);
            Some(true)
        }
    }

    /// Set the reveal flag of one record in a single step.
    ///
    /// Returns the flag now in effect, or `None` when the id is not in the
    /// store. Only the overlay is written.
    pub fn set_revealed(&self, id: TokenId, revealed: bool) -> Option<bool> {
        let mut state = self.state();
        if !state.records.iter().any(|r| r.id == id) {
            return None;
        }
        if revealed {
            state.revealed.insert(id);
        } else {
            state.revealed.remove(&id);
        }
        Some(revealed)
    }

    /// Whether the record's secret is revealed. Absent ids are masked.
    pub fn is_revealed(&self, id: TokenId) -> bool {
        self.state().revealed.contains(&id)
    }

    /// Read one record.
    pub fn get(&self, id: TokenId) -> Option<TokenRecord> {
        self.state().records.iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.state().records.iter().any(|r| r.id == id)
    }

    /// Drop a record after its deletion was confirmed by the service.
    pub fn remove(&self, id: TokenId) -> bool {
        let mut state = self.state();
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        state.revealed.remove(&id);
        state.records.len() != before
    }

    /// Records in store order, each paired with its reveal flag.
    pub fn entries(&self) -> Vec<(TokenRecord, bool)> {
        let state = self.state();
        state
            .records
            .iter()
            .map(|r| (r.clone(), state.revealed.contains(&r.id)))
            .collect()
    }

    /// Records in store order.
    pub fn records(&self) -> Vec<TokenRecord> {
        self.state().records.clone()
    }

    pub fn ids(&self) -> Vec<TokenId> {
        self.state().records.iter().map(|r| r.id).collect()
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().records.is_empty()
    }
}
