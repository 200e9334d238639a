// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Credentials used to pull signature images from a registry.

use std::collections::HashMap;

use anyhow::*;
use base64::{engine::general_purpose::STANDARD, Engine};
use oci_client::{secrets::RegistryAuth, Reference};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DockerAuthConfig {
    auth: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum RegistryCredentials {
    #[default]
    Anonymous,
    Basic {
        username: String,
        password: String,
    },
    /// Per registry entries of a docker `config.json`. Registries without an
    /// entry are accessed anonymously.
    DockerConfig(DockerConfigFile),
}

impl RegistryCredentials {
    pub fn basic(username: &str, password: &str) -> Self {
        Self::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn docker_config(auth_file: &[u8]) -> Result<Self> {
        let config: DockerConfigFile =
            serde_json::from_slice(auth_file).context("illegal docker config file")?;
        Ok(Self::DockerConfig(config))
    }

    /// Get a credential (RegistryAuth) for the given Reference.
    pub fn credential_for_reference(&self, reference: &Reference) -> Result<RegistryAuth> {
        match self {
            Self::Anonymous => Ok(RegistryAuth::Anonymous),
            Self::Basic { username, password } => {
                Ok(RegistryAuth::Basic(username.clone(), password.clone()))
            }
            Self::DockerConfig(config) => {
                let entry = config.auths.iter().find(|(key, _)| {
                    let host = registry_host(key);
                    host == reference.registry() || host == reference.resolve_registry()
                });
                match entry {
                    Some((key, auth_config)) => decode_auth(&auth_config.auth)
                        .with_context(|| format!("illegal auth entry for {key}")),
                    None => Ok(RegistryAuth::Anonymous),
                }
            }
        }
    }
}

/// Host part of a `config.json` key, which may be a bare host or a URL like
/// `https://index.docker.io/v1/`.
fn registry_host(key: &str) -> &str {
    let key = key
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    key.split('/').next().unwrap_or(key)
}

fn decode_auth(auth: &str) -> Result<RegistryAuth> {
    let decoded = String::from_utf8(STANDARD.decode(auth)?)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow!("auth is not in user:password form"))?;
    Ok(RegistryAuth::Basic(username.into(), password.into()))
}
