/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The random beacon subprotocol.
//!
//! The random beacon is a chain of threshold signatures, one per round. The signature for round `r + 1`
//! is produced by round `r`'s random beacon committee over (`r + 1`, hash of round `r`'s signature).
//! Since a threshold signature is unique, and no coalition smaller than the threshold can compute it
//! in advance, each signature is unpredictable randomness that nobody can bias.
//!
//! Each round's signature seeds the [committee selector](committees), which decides which groups act
//! as the round's random beacon, block proposer, and notary committees.
//!
//! ## Flow
//!
//! 1. When round `r` ends, each member of round `r`'s random beacon committee signs a
//!    [`RandBeaconSigShare`](messages::RandBeaconSigShare) for round `r + 1` with
//!    [`sign_beacon_share`](implementation::sign_beacon_share) and broadcasts it.
//! 2. Every node [collects](implementation::RandomBeacon::on_receive_share) the shares. Once it has a
//!    threshold of valid ones, it recovers the group signature and appends it to its
//!    [history](history::RandomBeaconHistory).
//! 3. The new entry starts round `r + 1`.

pub mod committees;

pub mod history;

pub mod implementation;

pub mod messages;

pub mod types;
