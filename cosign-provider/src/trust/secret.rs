// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use log::debug;
use tokio::fs;

use super::{TrustBundle, TrustSource};
use crate::{Error, Result};

pub const DEFAULT_SECRET_NAME: &str = "kyverno-chain";

pub const DEFAULT_SECRET_KEY: &str = "chain";

/// Namespace of the pod, mounted with its service account token.
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Reads the PEM chain from a Kubernetes secret every time it is asked for.
#[derive(Clone)]
pub struct SecretTrustSource {
    client: Client,
    namespace: String,
    name: String,
    key: String,
}

impl SecretTrustSource {
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl TrustSource for SecretTrustSource {
    async fn load(&self) -> Result<TrustBundle> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let secret = secrets
            .get(&self.name)
            .await
            .map_err(|source| Error::GetSecret {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                source,
            })?;

        let chain = chain(&secret, &self.key).ok_or_else(|| Error::SecretKeyMissing {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            key: self.key.clone(),
        })?;

        let bundle = TrustBundle::from_pem(chain)?;
        debug!(
            "loaded {} certificate(s) from secret {}/{}",
            bundle.len(),
            self.namespace,
            self.name
        );
        Ok(bundle)
    }
}

/// PEM chain stored in the secret under `key`.
fn chain<'a>(secret: &'a Secret, key: &str) -> Option<&'a [u8]> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.as_slice())
}

/// Namespace the provider runs in, as seen by its service account.
pub async fn service_account_namespace(path: &str) -> Result<String> {
    let namespace = fs::read_to_string(path)
        .await
        .map_err(|source| Error::ReadNamespace {
            path: path.to_string(),
            source,
        })?;
    Ok(namespace.trim().to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::ByteString;
    use rstest::rstest;

    use super::*;

    fn secret(data: Option<Vec<(&str, &[u8])>>) -> Secret {
        Secret {
            data: data.map(|entries| {
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
                    .collect::<BTreeMap<_, _>>()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn chain_under_key() {
        let secret = secret(Some(vec![
            ("chain", b"pem".as_slice()),
            ("other", b"x".as_slice()),
        ]));
        assert_eq!(chain(&secret, DEFAULT_SECRET_KEY), Some(b"pem".as_slice()));
        assert_eq!(chain(&secret, "other"), Some(b"x".as_slice()));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(vec![]))]
    #[case(Some(vec![("ca.crt", b"pem".as_slice())]))]
    fn chain_missing(#[case] data: Option<Vec<(&str, &[u8])>>) {
        assert_eq!(chain(&secret(data), DEFAULT_SECRET_KEY), None);
    }

    #[test]
    fn missing_key_message() {
        let err = Error::SecretKeyMissing {
            namespace: "gatekeeper-system".into(),
            name: DEFAULT_SECRET_NAME.into(),
            key: DEFAULT_SECRET_KEY.into(),
        };
        assert_eq!(
            err.to_string(),
            "secret gatekeeper-system/kyverno-chain has no data under key \"chain\""
        );
    }

    #[tokio::test]
    async fn read_namespace_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("namespace");
        std::fs::write(&path, "gatekeeper-system\n").expect("write namespace");

        let namespace = service_account_namespace(&path.to_string_lossy())
            .await
            .expect("read namespace");
        assert_eq!(namespace, "gatekeeper-system");
    }

    #[tokio::test]
    async fn missing_namespace_file() {
        let err = service_account_namespace("/nonexistent/namespace")
            .await
            .expect_err("no such file");
        assert!(matches!(err, Error::ReadNamespace { .. }), "{err:?}");
    }
}
