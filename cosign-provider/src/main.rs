// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use cosign_provider::{
    config::{ProviderConfig, RegistryConfig, TrustConfig},
    router::Router,
    server,
    trust::{
        secret::{service_account_namespace, SERVICE_ACCOUNT_NAMESPACE_PATH},
        FileTrustSource, SecretTrustSource, TrustSource,
    },
    verifier::{CosignVerifier, ImageVerifier, RegistryCredentials},
};
use log::info;
use tokio::signal::unix::{signal, SignalKind};

/// Cosign provider arguments info.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    ///
    /// `--config /etc/cosign-provider.toml`
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address, overrides the one of the config file
    ///
    /// `--bind 0.0.0.0:8090`
    #[arg(short, long)]
    bind: Option<String>,
}

async fn trust_source(config: &TrustConfig) -> Result<Arc<dyn TrustSource>> {
    match config {
        TrustConfig::File { path } => {
            info!("Read trust bundle from file {path}");
            Ok(Arc::new(FileTrustSource::new(path.clone())))
        }
        TrustConfig::KubernetesSecret {
            name,
            key,
            namespace,
        } => {
            let namespace = match namespace {
                Some(namespace) => namespace.clone(),
                None => service_account_namespace(SERVICE_ACCOUNT_NAMESPACE_PATH).await?,
            };
            let client = kube::Client::try_default()
                .await
                .context("create kubernetes client")?;
            info!("Read trust bundle from secret {namespace}/{name}, key {key}");
            Ok(Arc::new(SecretTrustSource::new(
                client,
                namespace,
                name.clone(),
                key.clone(),
            )))
        }
    }
}

async fn verifier(config: &RegistryConfig) -> Result<Arc<dyn ImageVerifier>> {
    let credentials = match (config.credentials()?, &config.docker_config) {
        (Some((username, password)), _) => {
            info!("Pull signatures as registry user {username}");
            RegistryCredentials::basic(username, password)
        }
        (None, Some(path)) => {
            info!("Read registry credentials from {path}");
            let file = tokio::fs::read(path)
                .await
                .with_context(|| format!("read docker config {path}"))?;
            RegistryCredentials::docker_config(&file)?
        }
        (None, None) => RegistryCredentials::Anonymous,
    };
    Ok(Arc::new(CosignVerifier::new(credentials)))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    let mut config = ProviderConfig::new(cli.config)?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let address: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("illegal bind address {}", config.bind))?;

    let router = Router::new(
        trust_source(&config.trust).await?,
        verifier(&config.registry).await?,
    );

    info!("Starting cosign provider on {address}");

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let shutdown = async move {
        tokio::select! {
            _ = hangup.recv() => info!("Client terminal disconnected."),
            _ = interrupt.recv() => info!("SIGINT received, gracefully shutdown."),
            _ = terminate.recv() => info!("SIGTERM received, gracefully shutdown."),
        }
    };

    server::serve(address, Arc::new(router), shutdown, |_| {}).await
}
