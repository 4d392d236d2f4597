/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that progressively combine partial signatures into group signatures.

use std::collections::BTreeMap;

use crate::threshold::{
    self,
    types::{GroupSignature, PartialSignature},
    ThresholdError,
};

use super::data_types::{Round, VerifyingKeyBytes};

/// Types that progressively combine matching shares, each signed by a member of a group, into a
/// single output signed by the whole group.
pub trait Collector {
    /// The specific share type that this `Collector` takes in as input.
    type Share;

    /// The specific type that this `Collector` returns as output once it has collected enough shares.
    type Output;

    /// Get the round that this `Collector` is currently configured to collect shares about.
    fn round(&self) -> Round;

    /// Collect a `share` sent by `origin`, returning an `Output` if a threshold of matching, valid,
    /// distinct shares has been collected.
    ///
    /// # No-ops
    ///
    /// Calling this method is a no-op (returning `None`) if:
    /// - The share is not about [`round`](Self::round).
    /// - `origin` is not the group member holding the share's index.
    /// - A share with the same index was already collected.
    /// - The share's partial signature does not verify.
    /// - An `Output` was already returned.
    fn collect(&mut self, origin: &VerifyingKeyBytes, share: Self::Share) -> Option<Self::Output>;
}

/// Verified partial signatures on a single message, at most one per share index.
#[derive(Clone, Default)]
pub(crate) struct PartialSignatures(BTreeMap<u32, PartialSignature>);

impl PartialSignatures {
    pub(crate) fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub(crate) fn contains(&self, index: u32) -> bool {
        self.0.contains_key(&index)
    }

    /// Insert `partial`, returning whether its index was not already present. The first partial
    /// signature for an index is kept.
    pub(crate) fn insert(&mut self, partial: PartialSignature) -> bool {
        if self.contains(partial.index) {
            return false;
        }
        self.0.insert(partial.index, partial);
        true
    }

    pub(crate) fn len(&self) -> u32 {
        self.0.len() as u32
    }

    /// Recover the group signature from the collected partial signatures.
    pub(crate) fn recover(&self, threshold: u32) -> Result<GroupSignature, ThresholdError> {
        threshold::recover_signature(threshold, self.0.values())
    }
}
