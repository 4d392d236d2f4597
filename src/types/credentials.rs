/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The secrets a node needs to take part in consensus, and the memberships derived from them.
//!
//! [`NodeCredentials`] are distributed out-of-band as a single opaque binary blob, loaded once at
//! startup with [`load_credentials`], and never change afterwards. A node that cannot load its
//! credentials cannot function, so every error in this module is fatal to
//! [starting a replica](crate::replica::ReplicaSpec::start).

use std::{
    fmt::{self, Display, Formatter},
    fs, io,
    path::Path,
    sync::Arc,
};

use borsh::{BorshDeserialize, BorshSerialize};
use zeroize::Zeroize;

use crate::threshold::{
    types::{SecretKeyShare, SecretKeyShareBytes},
    ThresholdError,
};

use super::{crypto_primitives::SigningKey, data_types::GroupID};

/// The node's Ed25519 secret key, the groups it belongs to, and its secret key share in each of those
/// groups. `group_shares[i]` is the share for `groups[i]`.
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NodeCredentials {
    secret_key: [u8; 32],
    groups: Vec<GroupID>,
    group_shares: Vec<SecretKeyShareBytes>,
}

impl NodeCredentials {
    pub fn new(
        signing_key: &SigningKey,
        groups: Vec<GroupID>,
        group_shares: Vec<SecretKeyShareBytes>,
    ) -> Self {
        Self {
            secret_key: signing_key.to_bytes(),
            groups,
            group_shares,
        }
    }

    /// Get the node's Ed25519 signing key.
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.secret_key)
    }

    /// Get the ids of the groups the node belongs to.
    pub fn groups(&self) -> &[GroupID] {
        &self.groups
    }

    /// Parse the group shares into one [`Membership`] per group.
    pub fn memberships(&self) -> Result<Vec<Membership>, CredentialsError> {
        if self.groups.len() != self.group_shares.len() {
            return Err(CredentialsError::MismatchedShares {
                groups: self.groups.len(),
                shares: self.group_shares.len(),
            });
        }

        self.groups
            .iter()
            .zip(&self.group_shares)
            .map(|(group, share)| {
                SecretKeyShare::from_bytes(share)
                    .map(|share| Membership::new(*group, share))
                    .map_err(|err| CredentialsError::InvalidShare { group: *group, err })
            })
            .collect()
    }

    /// Serialize the credentials into the blob format read by [`from_bytes`](Self::from_bytes) and
    /// [`load_credentials`].
    pub fn to_bytes(&self) -> Vec<u8> {
        // Safety: serializing into a Vec cannot fail.
        self.try_to_vec().unwrap()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialsError> {
        NodeCredentials::try_from_slice(bytes).map_err(CredentialsError::Decode)
    }
}

impl Drop for NodeCredentials {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

/// Read and decode the credentials blob stored at `path`.
pub fn load_credentials<P: AsRef<Path>>(path: P) -> Result<NodeCredentials, CredentialsError> {
    let bytes = fs::read(path).map_err(CredentialsError::Open)?;
    NodeCredentials::from_bytes(&bytes)
}

/// A node's participation in one group: the group's id and the node's secret key share in it.
///
/// Memberships are derived once from [`NodeCredentials`] and live as long as the node. They are
/// cheap to clone, which lets signing work run on worker threads without copying secrets.
#[derive(Clone, Debug)]
pub struct Membership {
    group: GroupID,
    share: Arc<SecretKeyShare>,
}

impl Membership {
    pub fn new(group: GroupID, share: SecretKeyShare) -> Self {
        Self {
            group,
            share: Arc::new(share),
        }
    }

    pub fn group(&self) -> GroupID {
        self.group
    }

    pub fn share(&self) -> &SecretKeyShare {
        &self.share
    }
}

#[derive(Debug)]
pub enum CredentialsError {
    Open(io::Error),
    Decode(io::Error),
    MismatchedShares { groups: usize, shares: usize },
    InvalidShare { group: GroupID, err: ThresholdError },
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::Open(err) => write!(f, "open credential file failed: {}", err),
            CredentialsError::Decode(err) => write!(f, "decode credential file failed: {}", err),
            CredentialsError::MismatchedShares { groups, shares } => write!(
                f,
                "credentials list {} groups but {} group shares",
                groups, shares
            ),
            CredentialsError::InvalidShare { group, err } => {
                write!(f, "invalid secret key share for group {}: {:?}", group, err)
            }
        }
    }
}

impl std::error::Error for CredentialsError {}
