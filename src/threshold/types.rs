/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Key, share, and signature types of the threshold signature scheme, and their byte representations.
//!
//! The `...Bytes` types are what travels over the network and into credentials: they are plain
//! `borsh`-serializable byte containers that are parsed (and subgroup-checked) into the typed
//! representations before any cryptographic use.

use std::fmt::{self, Debug, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};
use zeroize::Zeroize;

use super::{
    group::{Element, Scalar, G1, G2, SCALAR_LENGTH},
    poly::{Eval, Poly},
    ThresholdError,
};

/// A group signature, i.e., a signature that verifies under a group public key.
pub type GroupSignature = G2;

/// A group public key.
pub type GroupPublicKey = G1;

/// A signature share made by a single member of a group.
pub type PartialSignature = Eval<G2>;

/// The share of a group secret key held by one member of the group.
///
/// The scalar is zeroized when the share is dropped.
#[derive(Clone, PartialEq)]
pub struct SecretKeyShare {
    index: u32,
    private: Scalar,
}

impl SecretKeyShare {
    pub(crate) fn new(index: u32, private: Scalar) -> Self {
        Self { index, private }
    }

    /// Get the index of this share in the group, i.e., the position of its holder in the group's
    /// member list.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn private(&self) -> &Scalar {
        &self.private
    }

    /// Get the public key share corresponding to this secret key share.
    pub fn public(&self) -> G1 {
        let mut public = G1::one();
        public.mul(&self.private);
        public
    }

    /// Serialize the share as a 4-byte big-endian index followed by the 32-byte big-endian scalar.
    pub fn to_bytes(&self) -> SecretKeyShareBytes {
        let mut bytes = Vec::with_capacity(4 + SCALAR_LENGTH);
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.private.serialize());
        SecretKeyShareBytes(bytes)
    }

    /// Parse a share serialized with [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &SecretKeyShareBytes) -> Result<Self, ThresholdError> {
        let bytes = &bytes.0;
        if bytes.len() != 4 + SCALAR_LENGTH {
            return Err(ThresholdError::InvalidShare);
        }
        let index = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let private = Scalar::deserialize(&bytes[4..]).ok_or(ThresholdError::InvalidShare)?;
        Ok(Self { index, private })
    }
}

impl Drop for SecretKeyShare {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

impl Debug for SecretKeyShare {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyShare")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Commitment to the private polynomial of a group, in G1.
///
/// Its constant term is the [group public key](Self::group_public_key), and its evaluation at a member's
/// index is that member's public key share. The number of its coefficients is the group's threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPolynomial(Poly<G1>);

impl PublicPolynomial {
    pub(crate) fn new(poly: Poly<G1>) -> Self {
        Self(poly)
    }

    /// Get the number of distinct partial signatures required to recover a group signature.
    pub fn threshold(&self) -> u32 {
        self.0.required()
    }

    /// Get the group public key.
    pub fn group_public_key(&self) -> GroupPublicKey {
        *self.0.constant()
    }

    /// Get the public key share of the member with `index`.
    pub fn public_key_share(&self, index: u32) -> G1 {
        self.0.evaluate(index).value
    }

    pub fn to_bytes(&self) -> PublicPolynomialBytes {
        PublicPolynomialBytes(self.0.coefficients().map(|coeff| coeff.serialize()).collect())
    }

    pub fn from_bytes(bytes: &PublicPolynomialBytes) -> Result<Self, ThresholdError> {
        if bytes.0.is_empty() {
            return Err(ThresholdError::InvalidPublicKey);
        }
        let coeffs = bytes
            .0
            .iter()
            .map(|coeff| G1::deserialize(coeff).ok_or(ThresholdError::InvalidPublicKey))
            .collect::<Result<Vec<G1>, ThresholdError>>()?;
        Ok(Self(Poly::from(coeffs)))
    }
}

/// Serialized [`SecretKeyShare`].
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SecretKeyShareBytes(Vec<u8>);

impl SecretKeyShareBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &Vec<u8> {
        &self.0
    }
}

impl Drop for SecretKeyShareBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Debug for SecretKeyShareBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKeyShareBytes(..)")
    }
}

/// Serialized [`PublicPolynomial`]: one compressed G1 point per coefficient.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PublicPolynomialBytes(Vec<Vec<u8>>);

impl PublicPolynomialBytes {
    pub fn new(coeffs: Vec<Vec<u8>>) -> Self {
        Self(coeffs)
    }
}

/// Serialized [`PartialSignature`]: the signer's share index and its compressed G2 signature share.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PartialSignatureBytes {
    pub index: u32,
    pub signature: Vec<u8>,
}

impl PartialSignatureBytes {
    /// Parse into a [`PartialSignature`], checking that the signature share is a valid G2 point.
    pub fn parse(&self) -> Result<PartialSignature, ThresholdError> {
        let value = G2::deserialize(&self.signature).ok_or(ThresholdError::InvalidSignature)?;
        Ok(Eval {
            index: self.index,
            value,
        })
    }
}

impl From<&PartialSignature> for PartialSignatureBytes {
    fn from(partial: &PartialSignature) -> Self {
        Self {
            index: partial.index,
            signature: partial.value.serialize(),
        }
    }
}

/// Serialized [`GroupSignature`].
#[derive(Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct GroupSignatureBytes(Vec<u8>);

impl GroupSignatureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &Vec<u8> {
        &self.0
    }

    pub fn parse(&self) -> Result<GroupSignature, ThresholdError> {
        G2::deserialize(&self.0).ok_or(ThresholdError::InvalidSignature)
    }
}

impl From<&GroupSignature> for GroupSignatureBytes {
    fn from(signature: &GroupSignature) -> Self {
        Self(signature.serialize())
    }
}

impl Debug for GroupSignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
