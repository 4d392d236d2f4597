/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable peer-to-peer (P2P) networking.
//!
//! Nodes exchange messages through a user-supplied implementation of the [`Network`](network::Network)
//! trait. The network is assumed to be unreliable: messages may be dropped, duplicated, or delivered
//! out of order, and every message handler in the node tolerates this.

pub mod network;

pub mod messages;

pub(crate) mod receiving;

pub(crate) mod sending;
