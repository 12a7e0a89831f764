//! The HTTP server.
//!
//! | Method | Path            | Body                                  |
//! |--------|-----------------|---------------------------------------|
//! | GET    | `/`             | the web client's `index.html`         |
//! | GET    | `/static/<file>`| other web client files                |
//! | POST   | `/mr`           | `{cm_reading, advance, water_m}`      |
//! | GET    | `/years`        |                                       |
//! | POST   | `/search`       | `{year, month}`                       |

mod payload;
mod routes;

pub(crate) use routes::App;

use crate::error::{Error, ErrorType, IntoResult};
use crate::service::BillingService;
use crate::Result;
use anyhow::{anyhow, Context};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Request bodies larger than this are rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// A bound, not yet running, server.
pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
}

impl Server {
    /// Binds the listener. `static_dir` is where the web client files are served from.
    pub async fn bind(
        addr: SocketAddr,
        service: BillingService,
        static_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))
            .pub_result(ErrorType::Service)?;
        Ok(Self {
            listener,
            app: Arc::new(App::new(service, static_dir)),
        })
    }

    /// The address the listener is bound to. Useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Unable to get the listener address")
            .pub_result(ErrorType::Service)
    }

    /// Accepts connections until `shutdown` completes. Each connection is served on its own task.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept a connection: {e}");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let app = self.app.clone();
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let app = app.clone();
                            async move { handle(&app, req).await }
                        });
                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            debug!("Connection error from {remote_addr}: {err:?}");
                        }
                    });
                }
            }
        }
    }
}

async fn handle(
    app: &App,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let response = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => {
            routes::route(app, &parts.method, parts.uri.path(), collected.to_bytes()).await
        }
        Err(e) => routes::error_response(&Error::new(
            ErrorType::Request,
            anyhow!("Unable to read the request body: {e}"),
        )),
    };
    info!(
        "{} {} {}",
        parts.method,
        parts.uri.path(),
        response.status().as_u16()
    );
    Ok(response)
}
