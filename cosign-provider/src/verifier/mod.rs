// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Image signature verification.
//!
//! [`ImageVerifier`] hides how signatures are discovered and checked.
//! [`CosignVerifier`] pulls cosign signature images and checks their signing
//! certificates against the trust bundle.

use anyhow::Result;
use async_trait::async_trait;

use crate::trust::TrustBundle;

pub mod auth;
pub mod cosign;

pub use auth::RegistryCredentials;
pub use cosign::CosignVerifier;

/// An image identifier accepted by the reference parser of a verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    identifier: String,
}

impl ImageReference {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.identifier
    }
}

/// A signature that was checked against the trust bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// Digest of the signature layer.
    pub layer_digest: String,

    /// Manifest digest the signature vouches for.
    pub image_digest: String,
}

#[async_trait]
pub trait ImageVerifier: Send + Sync {
    fn parse_reference(&self, identifier: &str) -> Result<ImageReference>;

    /// Signatures of `reference` that chain up to `trust`. An empty list
    /// means no signature could be trusted.
    async fn verify_image_signatures(
        &self,
        reference: &ImageReference,
        trust: &TrustBundle,
    ) -> Result<Vec<VerifiedSignature>>;
}
