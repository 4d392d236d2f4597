/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for sending messages to the P2P network.

use std::sync::mpsc::Sender;

use ed25519_dalek::VerifyingKey;

use super::{messages::Message, network::Network};

/// Handle for broadcasting messages to the [`Network`].
///
/// It can be used to broadcast instances of any type that implement the [`Into<Message>`] trait.
///
/// Broadcasts are also delivered straight into the node's own inbox, so a node processes its own
/// proposals and shares without waiting for the network to echo them back.
#[derive(Clone)]
pub(crate) struct SenderHandle<N: Network> {
    network: N,
    me: VerifyingKey,
    loopback: Sender<(VerifyingKey, Message)>,
}

impl<N: Network> SenderHandle<N> {
    pub(crate) fn new(
        network: N,
        me: VerifyingKey,
        loopback: Sender<(VerifyingKey, Message)>,
    ) -> Self {
        Self {
            network,
            me,
            loopback,
        }
    }

    pub(crate) fn broadcast<S: Into<Message>>(&mut self, msg: S) {
        let msg = msg.into();
        let _ = self.loopback.send((self.me, msg.clone()));
        self.network.broadcast(msg)
    }
}
