/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use ed25519_dalek::VerifyingKey;

use super::messages::Message;

pub trait Network: Clone + Send {
    /// Start participating in the network: listen on `my_addr`, and join the network through the peer
    /// listening on `seed_addr`.
    fn start(&mut self, my_addr: &str, seed_addr: &str);

    /// Send a message to all peers without blocking. The node delivers its own broadcasts to itself, so
    /// the provider does not need to echo them back.
    fn broadcast(&mut self, message: Message);

    /// Receive a message from any peer. Returns immediately with a None if no message is available now.
    fn recv(&mut self) -> Option<(VerifyingKey, Message)>;
}
