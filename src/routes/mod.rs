//! HTTP routes for docusign-gate
//!
//! Gated routes take a JSON body with the caller identity next to the route
//! parameters:
//!
//! ```json
//! { "caller": { "id": "...", "email": "...", "docusign": { ... } }, "envelopeId": "..." }
//! ```

pub mod auth_routes;
pub mod envelopes;
pub mod health;

pub use auth_routes::{handle_docusign_auth, handle_docusign_callback};
pub use envelopes::{
    handle_create_envelope, handle_envelope_document, handle_list_envelopes,
    handle_recipient_view, handle_sender_view,
};
pub use health::health_check;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{CallerIdentity, GateOutcome};
use crate::server::AppState;
use crate::services::docusign::Credential;
use crate::types::ServiceError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Message sent with every consent-required answer
pub const CONSENT_REQUIRED_MESSAGE: &str = "Please perform DocuSign login";

/// Response header carrying a credential the gate just refreshed
/// (standard base64 of its JSON form). The host should store it in place of
/// the one it sent.
pub const REFRESHED_CREDENTIAL_HEADER: &str = "x-docusign-credential";

/// Gated request body: the caller plus route parameters at the same level
#[derive(Debug, Deserialize)]
pub struct Gated<T> {
    pub caller: CallerIdentity,
    #[serde(flatten)]
    pub params: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ConsentRequiredResponse<'a> {
    pub message: &'static str,
    pub url: &'a str,
}

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    full_body(Bytes::new())
}

fn with_cors(mut response: Response<BoxBody>) -> Response<BoxBody> {
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(REFRESHED_CREDENTIAL_HEADER),
    );
    response
}

/// Response with the given status, content type and body
pub(crate) fn bytes_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<BoxBody> {
    let mut response = Response::new(full_body(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    with_cors(response)
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    bytes_response(status, "application/json", json)
}

/// 200 with no body
pub(crate) fn ok_response() -> Response<BoxBody> {
    with_cors(Response::new(empty_body()))
}

/// CORS preflight response
pub fn preflight_response() -> Response<BoxBody> {
    let mut response = ok_response();
    *response.status_mut() = StatusCode::NO_CONTENT;
    response.headers_mut().insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

/// 418 with the consent URL the user must visit.
///
/// The teapot status is what host front-ends key on to start the consent flow.
pub fn consent_required_response(consent_url: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::IM_A_TEAPOT,
        &ConsentRequiredResponse {
            message: CONSENT_REQUIRED_MESSAGE,
            url: consent_url,
        },
    )
}

/// Generic error responder
pub fn error_response(err: ServiceError) -> Response<BoxBody> {
    let (status, message) = err.into_status_code_and_body();
    if status.is_server_error() {
        warn!(status = status.as_u16(), "{}", message);
    }
    json_response(status, &ErrorResponse { error: message })
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| ServiceError::BadRequest(format!("Invalid JSON: {}", e)))
}

pub(crate) fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!("{} is required", field)));
    }
    Ok(value)
}

/// A caller the gate let through.
pub(crate) struct Passed<'c> {
    /// Credential to use downstream
    pub credential: &'c Credential,
    /// Whether `credential` replaces the one the host sent
    pub refreshed: bool,
}

impl Passed<'_> {
    /// Finish a gated handler: errors become error responses, and a refreshed
    /// credential rides along in [`REFRESHED_CREDENTIAL_HEADER`] either way.
    pub fn respond(
        &self,
        result: Result<Response<BoxBody>, ServiceError>,
    ) -> Result<Response<BoxBody>, ServiceError> {
        let mut response = result.unwrap_or_else(error_response);
        if self.refreshed {
            match credential_header(self.credential) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(REFRESHED_CREDENTIAL_HEADER, value);
                }
                Err(e) => warn!(error = %e, "Could not attach refreshed credential"),
            }
        }
        Ok(response)
    }
}

fn credential_header(credential: &Credential) -> Result<HeaderValue, ServiceError> {
    let json = serde_json::to_vec(credential)
        .map_err(|e| ServiceError::Internal(format!("credential encoding: {}", e)))?;
    HeaderValue::from_str(&STANDARD.encode(json))
        .map_err(|e| ServiceError::Internal(format!("credential header: {}", e)))
}

/// Run the consent gate for `caller`.
///
/// `Ok` carries the credential to use downstream (refreshed if it was about to
/// expire); `Err` is the response to send instead.
pub(crate) async fn pass_gate<'c>(
    state: &AppState,
    caller: &'c mut CallerIdentity,
) -> Result<Passed<'c>, Response<BoxBody>> {
    match state.gate.authorize(caller).await {
        GateOutcome::Blocked { consent_url } => Err(consent_required_response(&consent_url)),
        GateOutcome::Proceed { refreshed } => {
            if refreshed {
                info!(user_id = %caller.id, "DocuSign credential refreshed for request");
            }
            match caller.docusign.as_ref() {
                Some(credential) => Ok(Passed {
                    credential,
                    refreshed,
                }),
                None => Err(error_response(ServiceError::Internal(
                    "gate passed without a credential".into(),
                ))),
            }
        }
    }
}
