// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Gatekeeper external data envelope.

use serde::{Deserialize, Serialize};

/// API version of the external data envelope spoken with Gatekeeper.
pub const API_VERSION: &str = "externaldata.gatekeeper.sh/v1alpha1";

pub const PROVIDER_RESPONSE_KIND: &str = "ProviderResponse";

/// Suffix appended to the key of an image with at least one valid signature.
const VALID_SUFFIX: &str = "_valid";

/// Suffix appended to the key of an image without a valid signature.
const INVALID_SUFFIX: &str = "_invalid";

#[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub request: Request,
}

#[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
pub struct Request {
    /// Image identifiers to validate.
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub api_version: String,

    pub kind: String,

    pub response: Response,
}

#[derive(Deserialize, Serialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub idempotent: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_error: String,
}

#[derive(Deserialize, Serialize, Debug, Default, PartialEq, Clone)]
pub struct Item {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Item {
    pub fn valid(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(format!("{key}{VALID_SUFFIX}")),
            error: None,
        }
    }

    pub fn invalid(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: None,
            error: Some(format!("{key}{INVALID_SUFFIX}")),
        }
    }
}

impl ProviderResponse {
    fn new(response: Response) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: PROVIDER_RESPONSE_KIND.to_string(),
            response,
        }
    }

    /// Response carrying one item per validated key.
    pub fn items(items: Vec<Item>) -> Self {
        Self::new(Response {
            items,
            ..Default::default()
        })
    }

    /// Response reporting that the whole request could not be processed.
    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new(Response {
            system_error: message.into(),
            ..Default::default()
        })
    }
}
