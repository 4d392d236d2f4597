/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The chain of finalized blocks, and the pluggable components it drives.
//!
//! Every round finalizes at most one block. A block is a [proposal](crate::types::block::BlockProposal)
//! that collected a notarization from the round's notary committee, and is finalized by the
//! [`Chain`](implementation::Chain) if it extends the current head. Rounds in which no proposal is
//! notarized are skipped: the next block then extends the head of the last finalized round.
//!
//! The ledger state, the transaction pool, and whatever reacts to new blocks are supplied by the user
//! through the traits in [`pluggables`].

pub mod implementation;

pub mod pluggables;
