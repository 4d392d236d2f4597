/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A consensus core driven by a threshold random beacon.
//!
//! Nodes are organized into registered [groups](types::groups::Group), each with a threshold BLS
//! public key. In every round, the latest [random beacon](random_beacon) entry selects three of these
//! groups as the round's committees:
//! 1. The **block proposer** committee, whose members propose blocks extending the chain head.
//! 2. The **notary** committee, whose members threshold-sign one proposal each. A threshold of
//!    signature shares on the same proposal [notarizes](notary) it, and the resulting block becomes the
//!    new head of the [chain](chain).
//! 3. The **random beacon** committee, whose members threshold-sign the current beacon entry once the
//!    round ends. The resulting signature is the next beacon entry, which starts the next round.
//!
//! The [node] orchestrates these subprotocols, and a [replica] runs a node together with its
//! networking and event handling threads.

pub mod cancellation;

pub mod chain;

pub(crate) mod event_bus;

pub mod events;

pub mod logging;

pub mod networking;

pub mod node;

pub mod notary;

pub mod random_beacon;

pub mod replica;

pub mod threshold;

pub mod types;
