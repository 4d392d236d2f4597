/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a replica.
//!
//! A replica is one process taking part in consensus. Each replica is identified by an
//! [Ed25519 public key](ed25519_dalek::VerifyingKey), and is a member of one or more of the registered
//! [groups](crate::types::groups::Group), in each of which it holds a threshold secret key share.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the replica](ReplicaSpec) with:
//!   1. `ReplicaSpec::builder` to construct a `ReplicaSpecBuilder`,
//!   2. The setters of the `ReplicaSpecBuilder`, and
//!   3. The `ReplicaSpecBuilder::build` method to construct a [ReplicaSpec],
//! - The function to [start](ReplicaSpec::start) a [Replica] given its specification,
//! - [The type](Replica) which keeps the replica alive.
//!
//! ## Starting a replica
//!
//! Here is an example that demonstrates how to build and start running a replica using the builder
//! pattern:
//!
//! ```ignore
//! let replica =
//!     ReplicaSpec::builder()
//!     .network(network)
//!     .state(state)
//!     .txn_pool(txn_pool)
//!     .updater(updater)
//!     .credentials(credentials)
//!     .groups(groups)
//!     .my_addr("127.0.0.1:9000".to_string())
//!     .seed_addr("127.0.0.1:9001".to_string())
//!     .configuration(configuration)
//!     .on_finalize_block(finalize_block_handler)
//!     .build()
//!     .start()?;
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the trait implementations and the identity required to run
//! a replica:
//! - `.network(...)`
//! - `.state(...)`
//! - `.txn_pool(...)`
//! - `.updater(...)`
//! - `.credentials(...)`
//! - `.groups(...)`
//! - `.my_addr(...)`
//! - `.seed_addr(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! - `.genesis_seed(...)`: the seed of the first beacon entry. Every replica must use the same seed.
//!
//! And setters for registering user-defined event handlers for events from [crate::events]:
//! - `.on_start_round(...)`
//! - `.on_end_round(...)`
//! - `.on_round_timeout(...)`
//! - `.on_propose(...)`
//! - `.on_notarize(...)`
//! - `.on_sign_beacon_share(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_notary_timeout(...)`
//! - `.on_finalize_block(...)`
//! - `.on_append_beacon(...)`
//!
//! The replica's [configuration](Configuration) can also be defined using the builder pattern, for
//! example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .block_time(Duration::from_millis(500))
//!     .round_timeout(Duration::from_secs(2))
//!     .group_size(4)
//!     .group_threshold(3)
//!     .txn_batch_limit(100)
//!     .log_events(true)
//!     .build()
//! ```

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::{self, Sender},
    thread::JoinHandle,
    time::Duration,
};

use ed25519_dalek::VerifyingKey;
use typed_builder::TypedBuilder;

use crate::{
    chain::{
        implementation::{Chain, ChainHeadCamera},
        pluggables::{State, TxnPool, Updater},
    },
    event_bus::*,
    events::*,
    networking::{
        messages::Message, network::Network, receiving::start_polling, sending::SenderHandle,
    },
    node::{Node, NodeConfiguration},
    random_beacon::{history::RandomBeaconHistory, implementation::RandomBeacon},
    types::{
        credentials::{CredentialsError, Membership, NodeCredentials},
        crypto_primitives::Keypair,
        data_types::{GroupID, Transaction},
        groups::GroupRegistry,
    },
};

/// The genesis seed used when none is set on the [`ReplicaSpec`].
pub const DEFAULT_GENESIS_SEED: &[u8] = b"dex";

/// Stores the user-defined parameters required to start the replica, that is:
/// 1. The block time: how long each notary waits for a valid proposal before giving up on the round.
/// 2. The round timeout: how long a round may stay open without a finalized block before it is
///    skipped. This should be comfortably longer than the block time.
/// 3. The expected size and threshold of every group. These are checked against the
///    [group registry](crate::types::groups::GroupRegistry) when the replica starts.
/// 4. The maximum number of transactions in a proposal.
/// 5. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Group threshold
///
/// Safety requires that at most one proposal per round can be notarized, which holds if the threshold
/// is greater than half the group size and honest notaries sign one proposal per round. Liveness
/// requires that a threshold of each group's members are honest and online.
///
/// ## Log Events
///
/// The replica logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Copy, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.block_time(...)`
    - `.round_timeout(...)`
    - `.group_size(...)`
    - `.group_threshold(...)`
    - `.txn_batch_limit(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set how long a notary waits for a valid proposal in each round. Required."))]
    pub block_time: Duration,
    #[builder(setter(doc = "Set how long a round may stay open without a finalized block. Required."))]
    pub round_timeout: Duration,
    #[builder(setter(doc = "Set the number of members in every group. Required."))]
    pub group_size: u32,
    #[builder(setter(doc = "Set the number of signature shares needed to produce a group signature. Required."))]
    pub group_threshold: u32,
    #[builder(setter(doc = "Set the maximum number of transactions in a proposal. Required."))]
    pub txn_batch_limit: u32,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

impl From<Configuration> for NodeConfiguration {
    fn from(value: Configuration) -> Self {
        NodeConfiguration {
            block_time: value.block_time,
            round_timeout: value.round_timeout,
            txn_batch_limit: value.txn_batch_limit,
        }
    }
}

/// Stores all necessary parameters and trait implementations required to run the [Replica].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ReplicaSpec]. On the builder call the following methods to construct a valid [ReplicaSpec].

    Required:
    - `.network(...)`
    - `.state(...)`
    - `.txn_pool(...)`
    - `.updater(...)`
    - `.credentials(...)`
    - `.groups(...)`
    - `.my_addr(...)`
    - `.seed_addr(...)`
    - `.configuration(...)`

    Optional:
    - `.genesis_seed(...)`
    - `.on_start_round(...)`
    - `.on_end_round(...)`
    - `.on_round_timeout(...)`
    - `.on_propose(...)`
    - `.on_notarize(...)`
    - `.on_sign_beacon_share(...)`
    - `.on_receive_proposal(...)`
    - `.on_notary_timeout(...)`
    - `.on_finalize_block(...)`
    - `.on_append_beacon(...)`
"))]
pub struct ReplicaSpec<N: Network + 'static, S: State, P: TxnPool, U: Updater> {
    // Required parameters
    #[builder(setter(doc = "Set the implementation of peer-to-peer networking. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the genesis ledger state. The argument must implement the [State](crate::chain::pluggables::State) trait. Required."))]
    state: S,
    #[builder(setter(doc = "Set the pool of pending transactions. The argument must implement the [TxnPool](crate::chain::pluggables::TxnPool) trait. Required."))]
    txn_pool: P,
    #[builder(setter(doc = "Set the subscriber to chain head updates. The argument must implement the [Updater](crate::chain::pluggables::Updater) trait. Required."))]
    updater: U,
    #[builder(setter(doc = "Set the replica's [credentials](crate::types::credentials::NodeCredentials): its signing key and its group secret key shares. Required."))]
    credentials: NodeCredentials,
    #[builder(setter(doc = "Set the [registry](crate::types::groups::GroupRegistry) of all groups. Every replica must use the same registry. Required."))]
    groups: GroupRegistry,
    #[builder(setter(doc = "Set the address this replica listens on. Required."))]
    my_addr: String,
    #[builder(setter(doc = "Set the address of the peer through which this replica joins the network. Required."))]
    seed_addr: String,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the necessary parameters to run a replica. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default = DEFAULT_GENESIS_SEED.to_vec(), setter(doc = "Set the seed of the genesis beacon entry. Optional."))]
    genesis_seed: Vec<u8>,
    #[builder(default, setter(transform = |handler: impl Fn(&StartRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartRoundEvent>),
    doc = "Register a handler closure to be invoked after the replica starts a round. Optional."))]
    on_start_round: Option<HandlerPtr<StartRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&EndRoundEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<EndRoundEvent>),
    doc = "Register a handler closure to be invoked after the replica ends a round. Optional."))]
    on_end_round: Option<HandlerPtr<EndRoundEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RoundTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RoundTimeoutEvent>),
    doc = "Register a handler closure to be invoked after a round times out without a finalized block. Optional."))]
    on_round_timeout: Option<HandlerPtr<RoundTimeoutEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a block proposal. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NotarizeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NotarizeEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a notarization share. Optional."))]
    on_notarize: Option<HandlerPtr<NotarizeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SignBeaconShareEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SignBeaconShareEvent>),
    doc = "Register a handler closure to be invoked after the replica broadcasts a random beacon share. Optional."))]
    on_sign_beacon_share: Option<HandlerPtr<SignBeaconShareEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a handler closure to be invoked after the replica receives a block proposal for the current round. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&NotaryTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<NotaryTimeoutEvent>),
    doc = "Register a handler closure to be invoked after one of the replica's notaries times out. Optional."))]
    on_notary_timeout: Option<HandlerPtr<NotaryTimeoutEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&FinalizeBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<FinalizeBlockEvent>),
    doc = "Register a handler closure to be invoked after a block becomes the chain head. Optional."))]
    on_finalize_block: Option<HandlerPtr<FinalizeBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AppendBeaconEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AppendBeaconEvent>),
    doc = "Register a handler closure to be invoked after an entry is appended to the random beacon history. Optional."))]
    on_append_beacon: Option<HandlerPtr<AppendBeaconEvent>>,
}

impl<N: Network + 'static, S: State, P: TxnPool, U: Updater> ReplicaSpec<N, S, P, U> {
    /// Starts all threads and channels associated with running a replica, and returns the handles to
    /// them in a [Replica] struct.
    ///
    /// Fails without starting anything if the credentials or the group registry are unusable.
    pub fn start(mut self) -> Result<Replica<N>, StartError> {
        let memberships = self.credentials.memberships()?;
        let keypair = Keypair::new(self.credentials.signing_key());
        self.check_groups(&keypair.public(), &memberships)?;

        self.network.start(&self.my_addr, &self.seed_addr);

        let history = RandomBeaconHistory::new(&self.genesis_seed);
        let beacon = RandomBeacon::new(history.clone(), self.groups.clone());
        let chain = Chain::new(self.state, self.txn_pool, self.updater);
        let chain_head = chain.camera();

        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_start_round,
            self.on_end_round,
            self.on_round_timeout,
            self.on_propose,
            self.on_notarize,
            self.on_sign_beacon_share,
            self.on_receive_proposal,
            self.on_notary_timeout,
            self.on_finalize_block,
            self.on_append_beacon,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let me = keypair.public();
        let node = Node::new(
            self.configuration.into(),
            keypair,
            memberships,
            self.groups,
            chain,
            beacon,
            self.network.clone(),
            event_publisher,
        );
        let to_node = node.inbox();

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let poller = start_polling(
            self.network.clone(),
            to_node.clone(),
            poller_shutdown_receiver,
        );

        let (node_shutdown, node_shutdown_receiver) = mpsc::channel();
        let node = node.start(node_shutdown_receiver);

        let (event_bus_shutdown, event_bus_shutdown_receiver) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let event_bus = match (event_subscriber, event_bus_shutdown_receiver) {
            (Some(event_subscriber), Some(event_bus_shutdown_receiver)) => Some(start_event_bus(
                event_handlers,
                event_subscriber,
                event_bus_shutdown_receiver,
            )),
            _ => None,
        };

        Ok(Replica {
            sender: SenderHandle::new(self.network, me, to_node),
            history,
            chain_head,
            poller: Some(poller),
            poller_shutdown,
            node: Some(node),
            node_shutdown,
            event_bus,
            event_bus_shutdown,
        })
    }

    /// Check that the configured threshold is a strict majority of the group size, that the registry
    /// is usable, and that every membership in the credentials is a real member slot of a registered
    /// group.
    fn check_groups(&self, me: &VerifyingKey, memberships: &[Membership]) -> Result<(), StartError> {
        let Configuration {
            group_size: size,
            group_threshold: threshold,
            ..
        } = self.configuration;
        if 2 * threshold <= size {
            return Err(StartError::UnsafeThreshold { size, threshold });
        }
        if self.groups.is_empty() {
            return Err(StartError::EmptyGroupRegistry);
        }

        for (id, group) in self.groups.iter() {
            if group.size() != self.configuration.group_size
                || group.threshold() != self.configuration.group_threshold
            {
                return Err(StartError::GroupParameters {
                    group: id,
                    size: group.size(),
                    threshold: group.threshold(),
                });
            }
        }

        for membership in memberships {
            let group = self
                .groups
                .get(membership.group())
                .ok_or(StartError::UnknownGroup(membership.group()))?;
            let index = membership.share().index();
            if !group.is_member_at(&me.to_bytes(), index) {
                return Err(StartError::NotAMember(membership.group()));
            }
            if group.public_polynomial().public_key_share(index) != membership.share().public() {
                return Err(StartError::ShareMismatch(membership.group()));
            }
        }

        Ok(())
    }
}

/// A handle to the background threads of a replica. When this value is dropped, all background
/// threads are gracefully shut down.
pub struct Replica<N: Network + 'static> {
    sender: SenderHandle<N>,
    history: RandomBeaconHistory,
    chain_head: ChainHeadCamera,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Sender<()>,
    node: Option<JoinHandle<()>>,
    node_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<N: Network + 'static> Replica<N> {
    /// Broadcast `txn` to the network, and add it to this replica's own transaction pool.
    pub fn submit_transaction(&mut self, txn: Transaction) {
        self.sender.broadcast(Message::Transaction(txn))
    }

    /// Returns a read handle to the replica's random beacon history.
    pub fn history(&self) -> &RandomBeaconHistory {
        &self.history
    }

    /// Returns a [Chain Head Camera](ChainHeadCamera) which can be used to peek at the latest
    /// finalized block.
    pub fn chain_head(&self) -> &ChainHeadCamera {
        &self.chain_head
    }
}

impl<N: Network + 'static> Drop for Replica<N> {
    fn drop(&mut self) {
        // Safety: the order of thread shutdown in this function is important. The node publishes to
        // the event bus and receives messages from the poller, so the event bus goes first and the
        // poller last.

        self.event_bus_shutdown
            .iter()
            .for_each(|shutdown| shutdown.send(()).unwrap());
        if let Some(event_bus) = self.event_bus.take() {
            event_bus.join().unwrap();
        }

        self.node_shutdown.send(()).unwrap();
        if let Some(node) = self.node.take() {
            node.join().unwrap();
        }

        // The poller may already have stopped on its own, since the node's inbox closed.
        let _ = self.poller_shutdown.send(());
        if let Some(poller) = self.poller.take() {
            poller.join().unwrap();
        }
    }
}

/// Reasons why a [`ReplicaSpec`] cannot be started.
#[derive(Debug)]
pub enum StartError {
    Credentials(CredentialsError),
    EmptyGroupRegistry,
    UnsafeThreshold {
        size: u32,
        threshold: u32,
    },
    GroupParameters {
        group: GroupID,
        size: u32,
        threshold: u32,
    },
    UnknownGroup(GroupID),
    NotAMember(GroupID),
    ShareMismatch(GroupID),
}

impl From<CredentialsError> for StartError {
    fn from(value: CredentialsError) -> Self {
        StartError::Credentials(value)
    }
}

impl Display for StartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StartError::Credentials(err) => write!(f, "invalid credentials: {}", err),
            StartError::EmptyGroupRegistry => write!(f, "no groups are registered"),
            StartError::UnsafeThreshold { size, threshold } => write!(
                f,
                "group threshold {} is not above half of the group size {}",
                threshold, size
            ),
            StartError::GroupParameters {
                group,
                size,
                threshold,
            } => write!(
                f,
                "group {} has size {} and threshold {}, which do not match the configuration",
                group, size, threshold
            ),
            StartError::UnknownGroup(group) => write!(f, "group {} is not registered", group),
            StartError::NotAMember(group) => {
                write!(f, "this replica does not hold its share's slot in group {}", group)
            }
            StartError::ShareMismatch(group) => write!(
                f,
                "secret key share does not match the public polynomial of group {}",
                group
            ),
        }
    }
}

impl std::error::Error for StartError {}
