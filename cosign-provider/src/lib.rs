// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Gatekeeper external data provider that checks cosign signatures of
//! container images against a trusted certificate chain.

pub mod config;
pub mod error;
pub mod provider;
pub mod router;
pub mod server;
pub mod trust;
pub mod verifier;

pub use error::{Error, Result};
