// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Sources of the certificate chain image signatures are checked against.

use async_trait::async_trait;
use log::debug;

use crate::{Error, Result};

pub mod file;
pub mod secret;

pub use file::FileTrustSource;
pub use secret::SecretTrustSource;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Root certificates, DER encoded, in the order they appear in the PEM chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustBundle {
    certificates: Vec<Vec<u8>>,
}

impl TrustBundle {
    /// Decode every `CERTIFICATE` block of a PEM chain. Other blocks are
    /// skipped. A chain without any certificate is rejected.
    pub fn from_pem(chain: &[u8]) -> Result<Self> {
        let blocks = pem::parse_many(chain).map_err(|source| Error::MalformedPem { source })?;

        let certificates: Vec<Vec<u8>> = blocks
            .into_iter()
            .filter(|block| {
                let keep = block.tag() == CERTIFICATE_TAG;
                if !keep {
                    debug!("skip PEM block {} in trust bundle", block.tag());
                }
                keep
            })
            .map(pem::Pem::into_contents)
            .collect();

        if certificates.is_empty() {
            return Err(Error::EmptyTrustBundle);
        }

        Ok(Self { certificates })
    }

    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

/// Produces the trust bundle on demand. Implementations are asked once per
/// request and must not cache.
#[async_trait]
pub trait TrustSource: Send + Sync {
    async fn load(&self) -> Result<TrustBundle>;
}
