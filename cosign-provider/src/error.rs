// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Request level failures. The `Display` output of each variant is what the
/// caller sees in `systemError`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("only POST is allowed")]
    MethodNotAllowed,

    #[error("unable to read request body: {source}")]
    ReadBody {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unable to unmarshal request body: {source}")]
    MalformedBody {
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to read trust bundle file {path}: {source}")]
    ReadTrustFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to read namespace from {path}: {source}")]
    ReadNamespace {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to get secret {namespace}/{name}: {source}")]
    GetSecret {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("secret {namespace}/{name} has no data under key {key:?}")]
    SecretKeyMissing {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("illegal PEM in trust bundle: {source}")]
    MalformedPem {
        #[source]
        source: pem::PemError,
    },

    #[error("trust bundle contains no certificates")]
    EmptyTrustBundle,

    #[error("unable to parse image reference {identifier:?}: {source}")]
    ParseReference {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build response failed: {source}")]
    Response {
        #[source]
        source: anyhow::Error,
    },
}
