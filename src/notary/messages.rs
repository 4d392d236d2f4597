/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Messages sent by notary committee members.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    threshold::types::PartialSignatureBytes,
    types::data_types::{CryptoHash, Round},
};

pub const NOTARIZATION_DOMAIN: &[u8] = b"notarization";

/// One notary committee member's partial signature on the block proposal with hash `proposal` in
/// `round`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NtShare {
    pub round: Round,
    pub proposal: CryptoHash,
    pub partial: PartialSignatureBytes,
}

/// The message that notary committee members sign to notarize the proposal with hash `proposal` in
/// `round`.
///
/// The message is domain-separated from [beacon messages](crate::random_beacon::messages::beacon_message),
/// since a group can serve as notary committee in one round and as random beacon committee in another.
pub fn notarization_message(round: Round, proposal: &CryptoHash) -> Vec<u8> {
    let mut message = Vec::with_capacity(NOTARIZATION_DOMAIN.len() + 8 + 32);
    message.extend_from_slice(NOTARIZATION_DOMAIN);
    message.extend_from_slice(&round.to_le_bytes());
    message.extend_from_slice(&proposal.bytes());
    message
}
