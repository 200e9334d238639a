// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::sync::Arc;

use http_body::Limited;
use hyper::{header, Body, Method, Request, Response, StatusCode};
use log::{info, warn};

use crate::provider::{Item, ProviderRequest, ProviderResponse};
use crate::trust::TrustSource;
use crate::verifier::ImageVerifier;
use crate::{Error, Result};

/// URL of the Gatekeeper external data endpoint.
pub const VALIDATE_URL: &str = "/validate";

/// Largest request body read from a caller.
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Serves the external data endpoint. The trust source and the verifier are
/// both handed in, so one router covers every place the chain can live in.
pub struct Router {
    trust: Arc<dyn TrustSource>,
    verifier: Arc<dyn ImageVerifier>,
}

impl Router {
    pub fn new(trust: Arc<dyn TrustSource>, verifier: Arc<dyn ImageVerifier>) -> Self {
        Self { trust, verifier }
    }

    /// Build json response. Gatekeeper reads errors from the payload, so the
    /// status is always 200.
    fn json_response(&self, response: &ProviderResponse) -> Result<Response<Body>> {
        let json = serde_json::to_vec(response).map_err(|e| Error::Response { source: e.into() })?;
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json))
            .map_err(|e| Error::Response { source: e.into() })
    }

    /// Build 404 Not Found response.
    fn not_found(&self) -> Result<Response<Body>> {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("URL NOT FOUND"))
            .map_err(|e| Error::Response { source: e.into() })
    }

    pub async fn route(&self, req: Request<Body>) -> Result<Response<Body>> {
        if req.uri().path() != VALIDATE_URL {
            return self.not_found();
        }

        let response = match self.validate(req).await {
            Ok(items) => ProviderResponse::items(items),
            Err(e) => {
                warn!("validation request failed: {e}");
                ProviderResponse::system_error(e.to_string())
            }
        };
        self.json_response(&response)
    }

    /// Validate every key of the request in order. Any error returned here
    /// aborts the whole batch.
    async fn validate(&self, req: Request<Body>) -> Result<Vec<Item>> {
        if req.method() != Method::POST {
            return Err(Error::MethodNotAllowed);
        }

        let body = hyper::body::to_bytes(Limited::new(req.into_body(), MAX_BODY_SIZE))
            .await
            .map_err(|source| Error::ReadBody { source })?;
        let provider_request: ProviderRequest =
            serde_json::from_slice(&body).map_err(|source| Error::MalformedBody { source })?;

        let trust = self.trust.load().await?;

        let keys = provider_request.request.keys;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            info!("verify signature for: {key}");
            let reference =
                self.verifier
                    .parse_reference(&key)
                    .map_err(|source| Error::ParseReference {
                        identifier: key.clone(),
                        source,
                    })?;

            match self
                .verifier
                .verify_image_signatures(&reference, &trust)
                .await
            {
                Ok(signatures) if !signatures.is_empty() => {
                    info!(
                        "{} valid signature(s) found for {key}: {signatures:?}",
                        signatures.len()
                    );
                    items.push(Item::valid(&key));
                }
                Ok(_) => {
                    info!("no valid signatures found for: {key}");
                    items.push(Item::invalid(&key));
                }
                Err(e) => {
                    info!("signature verification failed for {key}: {e:#}");
                    items.push(Item::invalid(&key));
                }
            }
        }

        Ok(items)
    }
}
