// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use async_trait::async_trait;
use log::debug;
use tokio::fs;

use super::{TrustBundle, TrustSource};
use crate::{Error, Result};

pub const DEFAULT_TRUST_BUNDLE_PATH: &str = "/etc/ssl/certs/chain.crt";

/// Reads the PEM chain from a local file every time it is asked for.
#[derive(Debug, Clone)]
pub struct FileTrustSource {
    path: String,
}

impl FileTrustSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TrustSource for FileTrustSource {
    async fn load(&self) -> Result<TrustBundle> {
        let chain = fs::read(&self.path)
            .await
            .map_err(|source| Error::ReadTrustFile {
                path: self.path.clone(),
                source,
            })?;
        let bundle = TrustBundle::from_pem(&chain)?;
        debug!(
            "loaded {} certificate(s) from {}",
            bundle.len(),
            self.path
        );
        Ok(bundle)
    }
}
