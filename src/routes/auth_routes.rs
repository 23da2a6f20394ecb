//! DocuSign consent routes
//!
//! - POST /api/v1/auth/docusign          - gate check; 200 once the caller may use DocuSign
//! - GET  /api/v1/auth/docusign/callback - OAuth redirect target; exchanges the code

use bytes::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{json_response, ok_response, parse_json, pass_gate, BoxBody};
use crate::auth::CallerIdentity;
use crate::server::AppState;
use crate::services::docusign::{Credential, Grant};
use crate::types::ServiceError;

#[derive(Debug, Deserialize)]
pub struct AuthCheckRequest {
    pub caller: CallerIdentity,
}

/// Query DocuSign appends to the redirect URI
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Credential issued on the callback; the host stores it against `user_id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub user_id: String,
    pub credential: Credential,
}

/// Replacement credential returned by the gate check after a refresh
#[derive(Debug, Serialize)]
pub struct RefreshedResponse<'a> {
    pub credential: &'a Credential,
}

/// POST /api/v1/auth/docusign
///
/// Acknowledges with an empty 200 once the gate lets the caller through, or
/// with `{ credential }` when the gate had to refresh it.
pub async fn handle_docusign_auth(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let AuthCheckRequest { mut caller } = parse_json(&body)?;

    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    if !passed.refreshed {
        return Ok(ok_response());
    }
    let body = RefreshedResponse {
        credential: passed.credential,
    };
    passed.respond(Ok(json_response(StatusCode::OK, &body)))
}

/// GET /api/v1/auth/docusign/callback?code=...&state=...
///
/// Exchanges the authorization code and returns the new credential, with the
/// OAuth `state` echoed back as the user id it was issued for.
pub async fn handle_docusign_callback(
    state: &AppState,
    query: Option<&str>,
) -> Result<Response<BoxBody>, ServiceError> {
    let params: CallbackQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| ServiceError::BadRequest(format!("Invalid query: {}", e)))?;

    if let Some(error) = params.error {
        warn!(error = %error, "DocuSign consent declined");
        let detail = params.error_description.unwrap_or_default();
        return Err(ServiceError::BadRequest(format!(
            "DocuSign consent failed: {} {}",
            error, detail
        )
        .trim_end()
        .to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("code is required".into()))?;
    let user_id = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::BadRequest("state is required".into()))?;

    let credential = state.client.exchange(Grant::AuthorizationCode(&code)).await?;
    info!(user_id = %user_id, "DocuSign consent completed");

    Ok(json_response(
        StatusCode::OK,
        &CallbackResponse {
            user_id,
            credential,
        },
    ))
}
