/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The notary subprotocol.
//!
//! In every round, the members of the round's notary committee threshold-sign one of the block
//! proposals made by the round's block proposer committee. A threshold of
//! [notarization shares](messages::NtShare) on the same proposal combines into a
//! [notarization](types::Notarization), which finalizes the proposal as the round's block.
//!
//! ## Notarization attempts
//!
//! At the start of each round, the node starts one [`Notary`](implementation::Notary) per membership
//! it holds in the round's notary committee. Each runs on its own thread, goes through the states in
//! [`NotaryState`](types::NotaryState), and signs at most one proposal.
//!
//! An attempt is stopped by whichever of two signals fires first:
//! 1. Its deadline, `block_time` after the round started. No proposal was signed, so the round is
//!    likely to be skipped.
//! 2. The round's cancel token, fired when the round ends by any means, e.g., because a block was
//!    already finalized with other members' shares.
//!
//! ## Safety
//!
//! Honest notaries sign at most one proposal per round. So if the threshold is greater than half the
//! committee, at most one proposal per round can ever be notarized.

pub mod implementation;

pub mod messages;

pub mod types;
