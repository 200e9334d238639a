// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{env, path::Path};

use anyhow::*;
use config::{Config, File};
use log::{debug, info};
use serde::Deserialize;

use crate::trust::{
    file::DEFAULT_TRUST_BUNDLE_PATH,
    secret::{DEFAULT_SECRET_KEY, DEFAULT_SECRET_NAME},
};

pub const DEFAULT_BIND: &str = "0.0.0.0:8090";

/// Environment variable consulted when no config path is given on the
/// command line.
pub const CONFIG_PATH_ENV: &str = "COSIGN_PROVIDER_CONFIG";

fn default_bind() -> String {
    DEFAULT_BIND.into()
}

fn default_secret_name() -> String {
    DEFAULT_SECRET_NAME.into()
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.into()
}

fn default_trust_bundle_path() -> String {
    DEFAULT_TRUST_BUNDLE_PATH.into()
}

/// Where the trusted certificate chain comes from.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrustConfig {
    /// A Kubernetes secret holding the PEM chain under `key`.
    KubernetesSecret {
        #[serde(default = "default_secret_name")]
        name: String,

        #[serde(default = "default_secret_key")]
        key: String,

        /// Defaults to the namespace of the service account.
        #[serde(default)]
        namespace: Option<String>,
    },

    /// A PEM file on the local file system.
    File {
        #[serde(default = "default_trust_bundle_path")]
        path: String,
    },
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self::KubernetesSecret {
            name: default_secret_name(),
            key: default_secret_key(),
            namespace: None,
        }
    }
}

/// Credentials used to pull signatures from the registry. Inline basic
/// credentials win over a docker config file. Anonymous access is used when
/// neither is set.
#[derive(Clone, Deserialize, Debug, PartialEq, Default)]
pub struct RegistryConfig {
    pub username: Option<String>,

    pub password: Option<String>,

    /// Path of a docker `config.json` with per registry `auths`.
    pub docker_config: Option<String>,
}

impl RegistryConfig {
    pub fn credentials(&self) -> Result<Option<(&str, &str)>> {
        match (&self.username, &self.password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some((username, password))),
            _ => bail!("registry username and password must be given together"),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub trust: TrustConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trust: TrustConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ProviderConfig {
    pub fn new(config_path: Option<String>) -> Result<Self> {
        let config_path = config_path.or_else(|| {
            if let std::result::Result::Ok(env_path) = env::var(CONFIG_PATH_ENV) {
                debug!("Read config path from env: {env_path}");
                return Some(env_path);
            }
            None
        });

        match config_path {
            Some(path) => {
                info!("Use configuration file {path}");
                if !Path::new(&path).exists() {
                    bail!("Config file {path} not found.")
                }

                Self::from_file(&path)
            }
            None => {
                info!("No config path specified, use a default config.");
                Ok(Self::default())
            }
        }
    }

    /// Load `ProviderConfig` from a configuration file. Supported formats are all formats supported by the
    /// `config` crate.
    fn from_file(config_path: &str) -> Result<Self> {
        let c = Config::builder()
            .set_default("bind", DEFAULT_BIND)?
            .add_source(File::with_name(config_path))
            .build()?;

        let res = c.try_deserialize().context("invalid config")?;
        Ok(res)
    }
}
