/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages sent between random beacon committee members.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    threshold::types::PartialSignatureBytes,
    types::data_types::{CryptoHash, Round},
};

pub const RANDOM_BEACON_DOMAIN: &[u8] = b"random beacon";

/// One random beacon committee member's share of the beacon signature for `round`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RandBeaconSigShare {
    pub round: Round,
    pub partial: PartialSignatureBytes,
}

/// The message signed to produce the beacon signature for `round`, given the hash of the previous
/// round's beacon signature.
pub fn beacon_message(round: Round, prev_signature_hash: &CryptoHash) -> Vec<u8> {
    let mut message = Vec::with_capacity(RANDOM_BEACON_DOMAIN.len() + 8 + 32);
    message.extend_from_slice(RANDOM_BEACON_DOMAIN);
    message.extend_from_slice(&round.to_le_bytes());
    message.extend_from_slice(&prev_signature_hash.bytes());
    message
}
