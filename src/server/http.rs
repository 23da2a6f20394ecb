//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::auth::ConsentGate;
use crate::config::DocuSignConfig;
use crate::routes::{self, BoxBody};
use crate::services::DocuSignClient;
use crate::types::ServiceError;

/// Largest accepted request body (envelope creation carries base64 PDFs)
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Paths that exist, for telling 405 from 404
const KNOWN_PATHS: &[&str] = &[
    "/health",
    "/healthz",
    "/api/v1/auth/docusign",
    "/api/v1/auth/docusign/callback",
    "/api/v1/docusign/envelopes",
    "/api/v1/docusign/envelopes/list",
    "/api/v1/docusign/envelopes/document",
    "/api/v1/docusign/envelopes/sender-view",
    "/api/v1/docusign/envelopes/recipient-view",
];

/// Shared application state
pub struct AppState {
    /// DocuSign client, also the gate's token authority
    pub client: Arc<DocuSignClient>,
    pub gate: ConsentGate,
}

impl AppState {
    /// Build the client from `config` and put the gate in front of it.
    pub fn new(config: DocuSignConfig) -> Result<Self, ServiceError> {
        let client = Arc::new(DocuSignClient::new(config)?);
        let gate = ConsentGate::new(client.clone());
        Ok(Self { client, gate })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>, listen: SocketAddr) -> Result<(), ServiceError> {
    let listener = TcpListener::bind(listen).await?;

    info!(
        "docusign-gate listening on {} (DocuSign: {})",
        listen,
        state.client.config().url
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Read the body and hand off to [`dispatch`]
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let body = match read_body(req).await {
        Ok(body) => body,
        Err(e) => return Ok(routes::error_response(e)),
    };

    Ok(dispatch(state, &method, &path, query.as_deref(), body).await)
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes, ServiceError> {
    match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ServiceError::PayloadTooLarge)
        }
        Err(e) => Err(ServiceError::Http(format!("Failed to read body: {}", e))),
    }
}

/// Route a request whose body has already been read.
pub async fn dispatch(
    state: Arc<AppState>,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> Response<BoxBody> {
    let result = match (method, path) {
        (&Method::OPTIONS, _) => Ok(routes::preflight_response()),

        // Liveness probe
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => Ok(routes::health_check()),

        // Consent gate acknowledgement and OAuth redirect target
        (&Method::POST, "/api/v1/auth/docusign") => {
            routes::handle_docusign_auth(&state, body).await
        }
        (&Method::GET, "/api/v1/auth/docusign/callback") => {
            routes::handle_docusign_callback(&state, query).await
        }

        // Envelope operations
        (&Method::POST, "/api/v1/docusign/envelopes/list") => {
            routes::handle_list_envelopes(&state, body).await
        }
        (&Method::POST, "/api/v1/docusign/envelopes/document") => {
            routes::handle_envelope_document(&state, body).await
        }
        (&Method::POST, "/api/v1/docusign/envelopes/sender-view") => {
            routes::handle_sender_view(&state, body).await
        }
        (&Method::POST, "/api/v1/docusign/envelopes/recipient-view") => {
            routes::handle_recipient_view(&state, body).await
        }
        (&Method::POST, "/api/v1/docusign/envelopes") => {
            routes::handle_create_envelope(&state, body).await
        }

        (_, p) if KNOWN_PATHS.contains(&p) => Err(ServiceError::MethodNotAllowed(format!(
            "{} {}",
            method, p
        ))),
        (_, p) => Err(ServiceError::NotFound(p.to_string())),
    };

    result.unwrap_or_else(|e| {
        debug!(path = %path, error = %e, "Request failed");
        routes::error_response(e)
    })
}
