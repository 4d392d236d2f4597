/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Polynomials over the BLS12-381 scalar field and over its groups.
//!
//! A private polynomial of degree `t - 1` shares a secret (its constant term) between `n` members so
//! that any `t` of them can jointly produce signatures under the matching group public key. Member `i`
//! holds the evaluation of the polynomial at `x = i + 1`: the polynomial is never evaluated at `x = 0`,
//! since that is the secret.

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::{
    group::{Element, Scalar},
    ThresholdError,
};

/// Evaluation of a polynomial at the `x` corresponding to `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eval<C: Element> {
    pub index: u32,
    pub value: C,
}

/// A polynomial with coefficients of type `C`, lowest degree first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly<C>(Vec<C>);

/// Create a new scalar polynomial of degree `degree` with random coefficients.
pub fn new_from<R: RngCore + CryptoRng>(degree: u32, rng: &mut R) -> Poly<Scalar> {
    Poly((0..=degree).map(|_| Scalar::rand(rng)).collect())
}

impl<C> Poly<C> {
    /// Create a new polynomial from `coeffs`.
    pub fn from(coeffs: Vec<C>) -> Self {
        Self(coeffs)
    }

    /// Get the constant term of the polynomial.
    pub fn constant(&self) -> &C {
        &self.0[0]
    }

    /// Get the number of evaluations required to recover the constant term, i.e., the threshold.
    pub fn required(&self) -> u32 {
        self.0.len() as u32
    }

    /// Iterate over the coefficients of the polynomial, lowest degree first.
    pub fn coefficients(&self) -> std::slice::Iter<'_, C> {
        self.0.iter()
    }
}

impl<C: Element> Poly<C> {
    /// Commit to a scalar polynomial by multiplying each of its coefficients with the generator
    /// of `C`.
    pub fn commit(scalars: &Poly<Scalar>) -> Self {
        Self(
            scalars
                .0
                .iter()
                .map(|coeff| {
                    let mut commitment = C::one();
                    commitment.mul(coeff);
                    commitment
                })
                .collect(),
        )
    }

    /// Evaluate the polynomial at `x = index + 1` using Horner's method.
    pub fn evaluate(&self, index: u32) -> Eval<C> {
        let mut xi = Scalar::zero();
        xi.set_int(index as u64 + 1);

        let value = self.0.iter().rev().fold(C::zero(), |mut sum, coeff| {
            sum.mul(&xi);
            sum.add(coeff);
            sum
        });
        Eval { index, value }
    }

    /// Recover the constant term of a polynomial with `threshold` coefficients from at least `threshold`
    /// evaluations, using Lagrange interpolation at `x = 0`.
    ///
    /// Only the `threshold` evaluations with the lowest indices are used. Every index in `evals` must
    /// be distinct.
    pub fn recover<'a, I>(threshold: u32, evals: I) -> Result<C, ThresholdError>
    where
        C: 'a,
        I: IntoIterator<Item = &'a Eval<C>>,
    {
        let mut evals: Vec<&Eval<C>> = evals.into_iter().collect();
        if evals.len() < threshold as usize {
            return Err(ThresholdError::NotEnoughPartialSignatures(
                threshold as usize,
                evals.len(),
            ));
        }
        evals.sort_by_key(|eval| eval.index);
        if evals.windows(2).any(|pair| pair[0].index == pair[1].index) {
            return Err(ThresholdError::DuplicateIndex);
        }
        let evals = &evals[..threshold as usize];

        let mut result = C::zero();
        for eval in evals {
            let mut xi = Scalar::zero();
            xi.set_int(eval.index as u64 + 1);

            let (mut num, mut den) = (Scalar::one(), Scalar::one());
            for other in evals.iter().filter(|other| other.index != eval.index) {
                let mut xj = Scalar::zero();
                xj.set_int(other.index as u64 + 1);

                num.mul(&xj);

                let mut diff = xj;
                diff.sub(&xi);
                den.mul(&diff);
            }

            let inv = den.inverse().ok_or(ThresholdError::NoInverse)?;
            num.mul(&inv);

            let mut scaled = eval.value.clone();
            scaled.mul(&num);
            result.add(&scaled);
        }

        Ok(result)
    }
}

impl Zeroize for Poly<Scalar> {
    fn zeroize(&mut self) {
        self.0.iter_mut().for_each(|coeff| coeff.zeroize());
    }
}
