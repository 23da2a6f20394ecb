//! DocuSign wire types
//!
//! Field names follow the DocuSign REST API (eSignature v2.1) and OAuth service.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::DocuSignError;

/// Tokens within this many seconds of expiry are treated as expired by the gate.
pub const REFRESH_MARGIN_SECS: i64 = 3600;

/// A caller's DocuSign OAuth credential.
///
/// Replaced wholesale on refresh; never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    pub refresh_token: String,

    /// Lifetime in seconds as reported by the token endpoint
    pub expires_in: i64,

    /// Absolute expiry: issue time + `expires_in`
    pub expiration: DateTime<Utc>,

    #[serde(rename = "userInfo")]
    pub user_info: UserInfo,
}

impl Credential {
    /// Assemble a credential from a token response expiring at `expiration`.
    pub(crate) fn issue(
        token: TokenResponse,
        refresh_token: String,
        user_info: UserInfo,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            expiration,
            access_token: token.access_token,
            token_type: token.token_type,
            refresh_token,
            expires_in: token.expires_in,
            user_info,
        }
    }

    /// True when the token outlives `now` by more than the refresh margin.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        Duration::try_seconds(REFRESH_MARGIN_SECS)
            .and_then(|margin| now.checked_add_signed(margin))
            .is_some_and(|deadline| deadline < self.expiration)
    }

    /// The account every envelope operation runs against.
    pub fn primary_account(&self) -> Option<&Account> {
        self.user_info.accounts.first()
    }
}

/// Absolute expiry of a token issued at `issued_at` that lives `expires_in` seconds.
///
/// Out-of-range lifetimes are a malformed response, not a panic.
pub(crate) fn expiry_after(
    issued_at: DateTime<Utc>,
    expires_in: i64,
) -> Result<DateTime<Utc>, DocuSignError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            DocuSignError::InvalidResponse(format!("expires_in out of range: {}", expires_in))
        })
}

/// `/oauth/userinfo` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    #[serde(default)]
    pub is_default: bool,

    /// e.g. `https://demo.docusign.net`
    pub base_uri: String,
}

/// `/oauth/token` response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// An envelope as returned by the list endpoint.
///
/// Only the id and status are read locally; everything else rides along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "envelopeId")]
    pub envelope_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopesResponse {
    #[serde(default)]
    pub envelopes: Option<Vec<Envelope>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeSummary {
    #[serde(rename = "envelopeId")]
    pub envelope_id: String,
}

/// Embedded view URL (sender edit view or recipient signing view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningView {
    pub url: String,
}

/// One PDF to place in a new envelope
#[derive(Debug, Clone)]
pub struct FormDocument {
    pub name: String,
    pub file: Bytes,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditViewRequest {
    pub return_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecipientViewRequest {
    pub return_url: String,
    pub client_user_id: String,
    pub user_name: String,
    pub email: String,
    pub authentication_method: &'static str,
    pub x_frame_options: &'static str,
    pub x_frame_options_allow_from_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvelopeDefinition {
    pub documents: Vec<EnvelopeDocument>,
    pub email_subject: &'static str,
    pub envelope_id_stamping: bool,
    pub message_lock: bool,
    pub recipients_lock: bool,
    pub status: &'static str,
    pub recipients: Recipients,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvelopeDocument {
    pub document_base64: String,
    pub document_id: String,
    pub file_extension: &'static str,
    pub name: String,
    pub transform_pdf_fields: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct Recipients {
    pub signers: Vec<Signer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Signer {
    pub name: String,
    pub client_user_id: String,
    pub email: String,
    pub role_name: &'static str,
    pub recipient_id: &'static str,
}

/// Display name for a signer: the full name, or the phone number when the name is blank.
pub(crate) fn signer_name<'a>(full_name: Option<&'a str>, phone_number: &'a str) -> &'a str {
    match full_name {
        Some(name) if !name.is_empty() => name,
        _ => phone_number,
    }
}
