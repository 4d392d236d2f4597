/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The committee selector.
//!
//! Every round has three committees: the random beacon committee, which produces the next round's beacon
//! signature, the block proposer committee, and the notary committee. Each is one of the registered
//! groups, picked by hashing the round's beacon entry together with a tag naming the role.
//!
//! Selection is a pure function of the beacon entry and the number of registered groups. It does not
//! depend on local state, wall-clock time, or the order in which messages arrived, so every node with
//! the same history computes the same committees. Since a beacon entry is a threshold signature that
//! no single member can predict or bias, no node can choose its own committees.

use crate::types::{
    crypto_primitives::hash,
    data_types::{CryptoHash, GroupID},
};

use super::history::BeaconEntry;

pub const RANDOM_BEACON_TAG: &[u8] = b"random beacon";
pub const BLOCK_PROPOSER_TAG: &[u8] = b"block proposer";
pub const NOTARY_TAG: &[u8] = b"notary";

/// The three committees of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Committees {
    pub random_beacon: GroupID,
    pub block_proposer: GroupID,
    pub notary: GroupID,
}

/// Select the committees of `entry.round` from `num_groups` registered groups.
///
/// # Panics
///
/// If `num_groups` is 0.
pub fn committees(entry: &BeaconEntry, num_groups: u32) -> Committees {
    let rand = entry.signature_hash();
    Committees {
        random_beacon: select(&rand, RANDOM_BEACON_TAG, num_groups),
        block_proposer: select(&rand, BLOCK_PROPOSER_TAG, num_groups),
        notary: select(&rand, NOTARY_TAG, num_groups),
    }
}

fn select(rand: &CryptoHash, tag: &[u8], num_groups: u32) -> GroupID {
    let digest = hash(&[&rand.bytes(), tag]).bytes();
    // Safety: a 32-byte digest always has an 8-byte prefix.
    let prefix = u64::from_le_bytes(digest[0..8].try_into().unwrap());
    GroupID::new((prefix % num_groups as u64) as u32)
}
