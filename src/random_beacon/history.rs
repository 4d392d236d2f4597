/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The append-only history of random beacon signatures.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    threshold::types::GroupSignatureBytes,
    types::{
        crypto_primitives::hash,
        data_types::{CryptoHash, Round},
        groups::GroupRegistry,
    },
};

use super::{
    committees::{self, Committees},
    messages::beacon_message,
};

/// Random beacon output for a single round: the group signature produced by the previous round's
/// random beacon committee.
///
/// The entry for round 0 is not a signature, but the hash of the genesis seed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BeaconEntry {
    pub round: Round,
    pub signature: GroupSignatureBytes,
}

impl BeaconEntry {
    /// Get the hash of the entry's signature. This is what seeds committee selection for the entry's
    /// round and what the next round's beacon signature is computed over.
    pub fn signature_hash(&self) -> CryptoHash {
        hash(&[self.signature.bytes()])
    }
}

/// Ordered, append-only sequence of [`BeaconEntry`]s, indexed by round.
///
/// ## Invariants
///
/// 1. The entry at position `r` is the entry for round `r`.
/// 2. Entries are never modified or removed once appended.
/// 3. The entry for round `r + 1` can only be appended after the entry for round `r`.
///
/// Cloning a `RandomBeaconHistory` is cheap: clones share the same underlying entries, so any task
/// can keep a handle to read the history concurrently with the single writer (the
/// [`RandomBeacon`](super::implementation::RandomBeacon)). Readers never observe a half-appended
/// entry.
#[derive(Clone)]
pub struct RandomBeaconHistory(Arc<RwLock<Vec<BeaconEntry>>>);

impl RandomBeaconHistory {
    /// Create a history containing only the genesis entry derived from `genesis_seed`.
    pub fn new(genesis_seed: &[u8]) -> Self {
        let genesis = BeaconEntry {
            round: Round::new(0),
            signature: GroupSignatureBytes::new(hash(&[genesis_seed]).bytes().to_vec()),
        };
        Self(Arc::new(RwLock::new(vec![genesis])))
    }

    /// Get the number of entries in the history. This is also the round of the next entry to be
    /// appended.
    pub fn len(&self) -> u64 {
        self.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Get the entry for `round`, if it has been appended.
    pub fn get(&self, round: Round) -> Option<BeaconEntry> {
        self.read().get(round.int() as usize).cloned()
    }

    /// Get the entry with the highest round.
    pub fn latest(&self) -> BeaconEntry {
        // Safety: the history always contains at least the genesis entry.
        self.read().last().cloned().unwrap()
    }

    /// Get a snapshot of all entries, ordered by round.
    pub fn entries(&self) -> Vec<BeaconEntry> {
        self.read().clone()
    }

    /// Compute the committees of `round` from the history and the group registry.
    ///
    /// # Precondition
    ///
    /// `groups` is not empty.
    pub fn committees(
        &self,
        round: Round,
        groups: &GroupRegistry,
    ) -> Result<Committees, HistoryError> {
        let entry = self.get(round).ok_or(HistoryError::MissingEntry { round })?;
        Ok(committees::committees(&entry, groups.len()))
    }

    /// Get the message that the random beacon committee signs to produce the entry for `next_round`.
    ///
    /// Fails if the entry for the round before `next_round` has not been appended yet: a beacon
    /// signature is never produced before the one it is chained to.
    pub fn signing_message(&self, next_round: Round) -> Result<Vec<u8>, HistoryError> {
        let prev_round = next_round
            .prev()
            .ok_or(HistoryError::MissingEntry { round: next_round })?;
        let prev = self
            .get(prev_round)
            .ok_or(HistoryError::MissingEntry { round: prev_round })?;
        Ok(beacon_message(next_round, &prev.signature_hash()))
    }

    /// Append `entry` to the history. `entry.round` must be the round right after the latest entry's.
    pub(crate) fn append(&self, entry: BeaconEntry) -> Result<(), HistoryError> {
        let mut entries = self.write();
        let expected = Round::new(entries.len() as u64);
        if entry.round != expected {
            return Err(HistoryError::NotNext {
                expected,
                got: entry.round,
            });
        }
        entries.push(entry);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<BeaconEntry>> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<BeaconEntry>> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    MissingEntry { round: Round },
    NotNext { expected: Round, got: Round },
}
