//! In-memory table of registered oracles and the indexes the contract gave them.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::RelayError;
use crate::models::{Identity, IndexAssignment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleEntry {
    pub identity: Identity,
    pub indexes: IndexAssignment,
}

/// Append-only, insertion-ordered registry. Filled during bootstrap and
/// shared read-only (behind an `Arc`) afterwards.
#[derive(Debug, Default, Clone)]
pub struct OracleRegistry {
    entries: Vec<OracleEntry>,
    identities: HashSet<Identity>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, identity: Identity, indexes: IndexAssignment) -> Result<(), RelayError> {
        if !self.identities.insert(identity.clone()) {
            return Err(RelayError::DuplicateIdentity(identity));
        }
        self.entries.push(OracleEntry { identity, indexes });
        Ok(())
    }

    /// Every recorded identity holding `index` in any of its slots, in registration order.
    pub fn matching_identities(&self, index: u8) -> Vec<Identity> {
        self.entries
            .iter()
            .filter(|entry| entry.indexes.contains(index))
            .map(|entry| entry.identity.clone())
            .collect()
    }

    pub fn get(&self, identity: &Identity) -> Option<IndexAssignment> {
        self.entries
            .iter()
            .find(|entry| &entry.identity == identity)
            .map(|entry| entry.indexes)
    }

    pub fn entries(&self) -> &[OracleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
