/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Threshold signing groups and the registry of all groups.
//!
//! The group registry is fixed at genesis and identical at every node. Every round, the
//! [committee selector](crate::random_beacon::committees) picks three groups from it to serve as the
//! round's random beacon, block proposer, and notary committees.

use std::sync::Arc;

use crate::threshold::types::PublicPolynomial;

use super::data_types::{GroupID, VerifyingKeyBytes};

/// A threshold signing group: its members and the commitment to the polynomial that shares its secret
/// key.
///
/// The member at position `i` of [`members`](Self::members) is the holder of the secret key share
/// with index `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    members: Vec<VerifyingKeyBytes>,
    public_polynomial: PublicPolynomial,
}

impl Group {
    pub fn new(members: Vec<VerifyingKeyBytes>, public_polynomial: PublicPolynomial) -> Self {
        Self {
            members,
            public_polynomial,
        }
    }

    pub fn members(&self) -> &[VerifyingKeyBytes] {
        &self.members
    }

    /// Get the verifying key of the member holding the share with `index`.
    pub fn member(&self, index: u32) -> Option<&VerifyingKeyBytes> {
        self.members.get(index as usize)
    }

    /// Check whether `member` holds the share with `index` in this group.
    pub fn is_member_at(&self, member: &VerifyingKeyBytes, index: u32) -> bool {
        self.member(index).is_some_and(|m| m == member)
    }

    pub fn contains(&self, member: &VerifyingKeyBytes) -> bool {
        self.members.contains(member)
    }

    pub fn size(&self) -> u32 {
        self.members.len() as u32
    }

    /// Get the number of distinct partial signatures needed to produce a group signature.
    pub fn threshold(&self) -> u32 {
        self.public_polynomial.threshold()
    }

    pub fn public_polynomial(&self) -> &PublicPolynomial {
        &self.public_polynomial
    }
}

/// All threshold signing groups, identified by their position in the registry.
///
/// Cloning a `GroupRegistry` is cheap: clones share the same underlying groups.
#[derive(Clone, Debug)]
pub struct GroupRegistry(Arc<Vec<Group>>);

impl GroupRegistry {
    pub fn new(groups: Vec<Group>) -> Self {
        Self(Arc::new(groups))
    }

    pub fn get(&self, group: GroupID) -> Option<&Group> {
        self.0.get(group.int() as usize)
    }

    /// Get the number of registered groups.
    pub fn len(&self) -> u32 {
        self.0.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate through the registered groups together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (GroupID, &Group)> {
        self.0
            .iter()
            .enumerate()
            .map(|(id, group)| (GroupID::new(id as u32), group))
    }
}
