// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fs::{self, File};
use std::io::Write;
use utoipa::{OpenApi, ToSchema};

#[derive(ToSchema)]
pub struct Request {
    /// Image identifiers to validate
    pub keys: Vec<String>,
}

#[derive(ToSchema)]
pub struct ProviderRequest {
    /// externaldata.gatekeeper.sh/v1alpha1
    #[schema(rename = "apiVersion")]
    pub api_version: String,

    /// ProviderRequest
    pub kind: String,

    pub request: Request,
}

#[derive(ToSchema)]
pub struct Item {
    /// Image identifier as sent by the caller
    pub key: String,

    /// `<key>_valid`, set when at least one signature chains to the trust bundle
    pub value: Option<String>,

    /// `<key>_invalid`, set when no signature could be trusted
    pub error: Option<String>,
}

#[derive(ToSchema)]
pub struct Response {
    /// One item per key, in request order
    pub items: Option<Vec<Item>>,

    /// Set instead of `items` when the request could not be processed at all
    #[schema(rename = "systemError")]
    pub system_error: Option<String>,
}

#[derive(ToSchema)]
pub struct ProviderResponse {
    /// externaldata.gatekeeper.sh/v1alpha1
    #[schema(rename = "apiVersion")]
    pub api_version: String,

    /// ProviderResponse
    pub kind: String,

    pub response: Response,
}

#[utoipa::path(
    post,
    path = "/validate",
    request_body = ProviderRequest,
    responses(
        (status = 200, description = "validation result, errors are reported in the payload",
                content_type = "application/json",
                body = ProviderResponse,
                example = json!({
                    "apiVersion": "externaldata.gatekeeper.sh/v1alpha1",
                    "kind": "ProviderResponse",
                    "response": {"items": [
                        {"key": "repo/img@sha256:abc", "value": "repo/img@sha256:abc_valid"}
                    ]}
                })),
        (status = 404, description = "unknown path")
    )
)]
fn _validate() {}

fn generate_openapi_document() -> std::io::Result<()> {
    #[derive(OpenApi)]
    #[openapi(
    info(
        title = "Cosign Provider API",
        description = "Gatekeeper external data provider validating cosign signatures of container images."),

    servers(
        (url = "http://127.0.0.1:8090", description = "Cosign Provider API")
     ),

    paths(_validate),
    components(schemas(ProviderRequest, Request, ProviderResponse, Response, Item))
 )]
    struct ApiDoc;
    fs::create_dir_all("openapi")?;
    let mut file = File::create("openapi/api.json")?;
    let json = ApiDoc::openapi().to_pretty_json()?;
    file.write_all(json.as_bytes())
}

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    generate_openapi_document().expect("Generate RESTful OpenAPI document failed.");
    Ok(())
}
