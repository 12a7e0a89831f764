//! Request routing and the handlers for each endpoint.

use crate::error::{Error, ErrorType, IntoResult};
use crate::server::payload::{
    BillResponse, ErrorResponse, SearchRequest, StatusResponse, SubmitRequest, YearsResponse,
    ERROR, NOT_FOUND, SUCCESS,
};
use crate::service::{BillingService, Lookup};
use crate::Result;
use anyhow::{anyhow, Context};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{error, warn};

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const STATIC_PREFIX: &str = "/static/";
const INDEX_HTML: &str = "index.html";

/// Everything a request handler needs.
#[derive(Clone)]
pub(crate) struct App {
    service: BillingService,
    static_dir: PathBuf,
}

impl App {
    pub(crate) fn new(service: BillingService, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            static_dir: static_dir.into(),
        }
    }
}

/// Dispatches a request with an already collected body. Never fails: errors become JSON error
/// responses.
pub(crate) async fn route(
    app: &App,
    method: &Method,
    path: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let result = match (method, path) {
        (&Method::GET, "/") => serve_file(&app.static_dir, INDEX_HTML).await,
        (&Method::POST, "/mr") => submit(app, &body).await,
        (&Method::GET, "/years") => years(app).await,
        (&Method::POST, "/search") => search(app, &body).await,
        (&Method::GET, p) if p.starts_with(STATIC_PREFIX) => {
            serve_file(&app.static_dir, &p[STATIC_PREFIX.len()..]).await
        }
        (_, "/") | (_, "/years") => Ok(method_not_allowed("GET")),
        (_, "/mr") | (_, "/search") => Ok(method_not_allowed("POST")),
        _ => Ok(not_found(format!("No route for {method} {path}"))),
    };
    result.unwrap_or_else(|e| error_response(&e))
}

/// A storage failure is a 500 even when only the last reading failed to update and the bill was
/// stored. The message tells the user which happened.
async fn submit(app: &App, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request: SubmitRequest = parse_body(body)?;
    let record = app.service.submit_reading(request.into()).await?;
    Ok(json(
        StatusCode::OK,
        &BillResponse {
            status: SUCCESS,
            record: &record,
        },
    ))
}

async fn years(app: &App) -> Result<Response<Full<Bytes>>> {
    let years = app.service.list_years().await?;
    Ok(json(
        StatusCode::OK,
        &YearsResponse {
            status: SUCCESS,
            years: years.into_iter().collect(),
        },
    ))
}

async fn search(app: &App, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let request: SearchRequest = parse_body(body)?;
    Ok(match app.service.lookup(&request.month, &request.year).await? {
        Lookup::Found(record) => json(
            StatusCode::OK,
            &BillResponse {
                status: SUCCESS,
                record: &record,
            },
        ),
        Lookup::NotFound => json(StatusCode::OK, &StatusResponse { status: NOT_FOUND }),
    })
}

async fn serve_file(dir: &Path, name: &str) -> Result<Response<Full<Bytes>>> {
    let relative = Path::new(name);
    let safe = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Ok(not_found(format!("No file named '{name}'")));
    }
    let path = dir.join(relative);
    match tokio::fs::read(&path).await {
        Ok(contents) => Ok(with_body(StatusCode::OK, content_type(&path), contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Ok(not_found(format!("No file named '{name}'")))
        }
        Err(e) => Err(e)
            .with_context(|| format!("Unable to read '{}'", path.display()))
            .pub_result(ErrorType::Service),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(anyhow!("The request body is empty, expected a JSON object"))
            .pub_result(ErrorType::Request);
    }
    serde_json::from_slice(body)
        .context("Invalid request body")
        .pub_result(ErrorType::Request)
}

/// Maps an error to a JSON response with a status code that reflects its type.
pub(crate) fn error_response(e: &Error) -> Response<Full<Bytes>> {
    let status = match e.error_type() {
        ErrorType::Request | ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::Uninitialized => StatusCode::SERVICE_UNAVAILABLE,
        ErrorType::Storage | ErrorType::Config | ErrorType::Service => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        error!("{e}");
    } else {
        warn!("{e}");
    }
    json(
        status,
        &ErrorResponse {
            status: ERROR,
            message: e.to_string(),
        },
    )
}

fn not_found(message: String) -> Response<Full<Bytes>> {
    json(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            status: ERROR,
            message,
        },
    )
}

fn method_not_allowed(allow: &'static str) -> Response<Full<Bytes>> {
    let mut response = json(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            status: ERROR,
            message: format!("Method not allowed, use {allow}"),
        },
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => with_body(status, APPLICATION_JSON, body),
        Err(e) => {
            error!("Unable to serialize the response: {e}");
            with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                TEXT_PLAIN,
                "Unable to serialize the response",
            )
        }
    }
}

fn with_body(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => APPLICATION_JSON,
        Some("webmanifest") => "application/manifest+json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("mp3") => "audio/mpeg",
        Some("txt") => TEXT_PLAIN,
        _ => "application/octet-stream",
    }
}
