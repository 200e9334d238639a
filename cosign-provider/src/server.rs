// Copyright (c) 2026 The Cosign Provider Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use log::{debug, error, info};

use crate::router::Router;

async fn api_handler(
    router: Arc<Router>,
    remote_addr: SocketAddr,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    debug!("{} {} from {remote_addr}", req.method(), req.uri().path());
    match router.route(req).await {
        Ok(res) => Ok(res),
        Err(e) => {
            error!("failed to answer request from {remote_addr}: {e}");
            let mut res = Response::new(Body::from(e.to_string()));
            *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            Ok(res)
        }
    }
}

/// Serve `router` on `address` until `shutdown` resolves. In-flight requests
/// are allowed to finish. `on_bound` receives the address actually bound,
/// which differs from `address` when port 0 is asked for.
pub async fn serve<F>(
    address: SocketAddr,
    router: Arc<Router>,
    shutdown: F,
    on_bound: impl FnOnce(SocketAddr),
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let api_service = make_service_fn(move |conn: &AddrStream| {
        let router = router.clone();
        let remote_addr = conn.remote_addr();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                api_handler(router.clone(), remote_addr, req)
            }))
        }
    });

    let server = Server::try_bind(&address)
        .with_context(|| format!("bind {address} failed"))?
        .serve(api_service);

    let local_addr = server.local_addr();
    info!("Cosign provider listening on http://{local_addr}");
    on_bound(local_addr);

    server
        .with_graceful_shutdown(shutdown)
        .await
        .context("cosign provider server error")
}
