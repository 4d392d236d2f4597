/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Threshold BLS signatures over BLS12-381.
//!
//! Every committee (random beacon, block proposer, or notary committee) in a round is a *group* of
//! nodes that jointly hold a group secret key, shared with a `t`-of-`n` polynomial. Each member signs
//! with its own [`SecretKeyShare`], producing a [`PartialSignature`]. Any `t` valid partial signatures
//! over the same message combine into the unique group signature on that message, which verifies
//! under the group public key. Since the group signature does not depend on *which* `t` members
//! contributed, it is a source of unbiasable randomness: this is what the random beacon is built on.
//!
//! The curve arithmetic is provided by [`blst`]. This module wraps it into the four operations the
//! consensus core needs:
//! 1. [`sign_share`]: sign a message with a secret key share.
//! 2. [`verify_share`]: verify a partial signature against the group's [`PublicPolynomial`].
//! 3. [`recover_signature`]: combine `t` partial signatures into the group signature.
//! 4. [`verify`]: verify a group signature under the group public key.
//!
//! [`deal`] creates the shares of a new group. It is a trusted-dealer procedure, meant for tooling
//! and tests: distributed key generation is not part of the consensus core.

pub mod group;

pub mod poly;

pub mod types;

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use self::{
    group::{pairing_check, Element, G1, G2},
    poly::Poly,
    types::{
        GroupPublicKey, GroupSignature, PartialSignature, PartialSignatureBytes, PublicPolynomial,
        SecretKeyShare,
    },
};

/// Create a new group with `n` members and threshold `t`, returning its public polynomial and the
/// secret key shares of its members, ordered by index.
pub fn deal<R: RngCore + CryptoRng>(
    n: u32,
    t: u32,
    rng: &mut R,
) -> Result<(PublicPolynomial, Vec<SecretKeyShare>), ThresholdError> {
    if t == 0 || t > n {
        return Err(ThresholdError::InvalidThreshold { n, t });
    }

    let mut private = poly::new_from(t - 1, rng);
    let public = PublicPolynomial::new(Poly::<G1>::commit(&private));
    let shares = (0..n)
        .map(|index| SecretKeyShare::new(index, private.evaluate(index).value))
        .collect();
    private.zeroize();

    Ok((public, shares))
}

/// Sign `message` with `share`.
pub fn sign_share(share: &SecretKeyShare, message: &[u8]) -> PartialSignatureBytes {
    let mut signature = G2::hash_message(message);
    signature.mul(share.private());
    PartialSignatureBytes {
        index: share.index(),
        signature: signature.serialize(),
    }
}

/// Verify that `partial` is a signature over `message` by the member of the group committed to by
/// `public` whose index is `partial.index`, returning the parsed partial signature if so.
pub fn verify_share(
    public: &PublicPolynomial,
    message: &[u8],
    partial: &PartialSignatureBytes,
) -> Result<PartialSignature, ThresholdError> {
    let parsed = partial.parse()?;
    let public_key_share = public.public_key_share(parsed.index);
    if pairing_check(&public_key_share, &parsed.value, &G2::hash_message(message)) {
        Ok(parsed)
    } else {
        Err(ThresholdError::InvalidSignature)
    }
}

/// Combine at least `threshold` partial signatures with distinct indices into the group signature.
///
/// The partial signatures must already have been [verified](verify_share): recovery from invalid
/// partial signatures produces a group signature that does not verify.
pub fn recover_signature<'a, I>(threshold: u32, partials: I) -> Result<GroupSignature, ThresholdError>
where
    I: IntoIterator<Item = &'a PartialSignature>,
{
    Poly::<G2>::recover(threshold, partials)
}

/// Verify that `signature` is a signature over `message` under `public_key`.
pub fn verify(
    public_key: &GroupPublicKey,
    message: &[u8],
    signature: &GroupSignature,
) -> Result<(), ThresholdError> {
    if pairing_check(public_key, signature, &G2::hash_message(message)) {
        Ok(())
    } else {
        Err(ThresholdError::InvalidSignature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdError {
    InvalidThreshold { n: u32, t: u32 },
    InvalidSignature,
    InvalidPublicKey,
    InvalidShare,
    NotEnoughPartialSignatures(usize, usize),
    DuplicateIndex,
    NoInverse,
}
