/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that are used across multiple sub-protocols or components of the consensus core.
//!
//! Other types, specific to single components, can be found in the "types" or "messages" submodules
//! of their components, e.g., [`crate::notary::types`].

pub mod block;

pub mod collectors;

pub mod credentials;

pub mod crypto_primitives;

pub mod data_types;

pub mod groups;
