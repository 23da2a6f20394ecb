//! DocuSign REST client
//!
//! Stateless: every method is one outbound call (two for the token exchange)
//! built from the injected [`DocuSignConfig`] and the caller's [`Credential`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::DocuSignError;
use super::models::*;
use crate::config::DocuSignConfig;

/// Statuses requested when listing envelopes
const LISTED_STATUSES: &str = "completed,sent,declined,delivered";

/// Base URL and bearer header for one account's eSignature API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiBase {
    pub base_url: String,
    pub authorization: String,
}

/// OAuth grant sent to `/oauth/token`
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

impl<'a> Grant<'a> {
    fn kind(&self) -> &'static str {
        match self {
            Self::AuthorizationCode(_) => "authorization_code",
            Self::RefreshToken(_) => "refresh_token",
        }
    }

    fn form(&self) -> [(&'static str, &'a str); 2] {
        match *self {
            Self::AuthorizationCode(code) => [("grant_type", "authorization_code"), ("code", code)],
            Self::RefreshToken(token) => [("grant_type", "refresh_token"), ("refresh_token", token)],
        }
    }
}

/// Build the OAuth consent URL for a user.
///
/// Pure: identical inputs always give the identical URL.
pub fn build_consent_url(config: &DocuSignConfig, email: &str, user_id: &str) -> String {
    let redirect_uri = format!("{}/api/v1/auth/docusign/callback", config.domain);
    let params = [
        ("response_type", "code"),
        ("scope", "signature extended"),
        ("client_id", config.integration_key.as_str()),
        ("state", user_id),
        ("redirect_uri", redirect_uri.as_str()),
        ("login_hint", email),
    ];
    // string pairs always encode
    let query = serde_urlencoded::to_string(params).unwrap_or_default();
    format!("{}/oauth/auth?{}", config.url, query)
}

/// Derive the account API base and bearer header from a credential.
///
/// Always the first account; there is no account selection.
pub fn resolve_api_base(credential: &Credential) -> Result<ApiBase, DocuSignError> {
    let account = credential.primary_account().ok_or(DocuSignError::NoAccount)?;
    Ok(ApiBase {
        base_url: format!(
            "{}/restapi/v2.1/accounts/{}",
            account.base_uri.trim_end_matches('/'),
            account.account_id
        ),
        authorization: format!("Bearer {}", credential.access_token),
    })
}

/// DocuSign client
pub struct DocuSignClient {
    config: DocuSignConfig,
    http: Client,
}

impl DocuSignClient {
    /// Create a client with its own connection pool and the configured timeout.
    pub fn new(config: DocuSignConfig) -> Result<Self, DocuSignError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("docusign-gate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &DocuSignConfig {
        &self.config
    }

    /// OAuth consent URL for this user (`state` carries the user id back).
    pub fn consent_url(&self, email: &str, user_id: &str) -> String {
        build_consent_url(&self.config, email, user_id)
    }

    fn basic_auth(&self) -> String {
        let pair = format!("{}:{}", self.config.integration_key, self.config.secret_key);
        format!("Basic {}", STANDARD.encode(pair))
    }

    /// Exchange a grant for a new credential.
    ///
    /// Posts the grant to `/oauth/token`, then loads `/oauth/userinfo` with the
    /// fresh access token. Both calls must succeed; a token obtained without
    /// user info is discarded.
    pub async fn exchange(&self, grant: Grant<'_>) -> Result<Credential, DocuSignError> {
        debug!(grant = grant.kind(), "DocuSign token exchange");

        let response = self
            .http
            .post(format!("{}/oauth/token", self.config.url))
            .header(header::AUTHORIZATION, self.basic_auth())
            // RFC 6749 token requests are form-encoded, not JSON
            .form(&grant.form())
            .send()
            .await?;
        let issued_at = Utc::now();
        let token: TokenResponse = read_json(response).await?;

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            DocuSignError::InvalidResponse("token response has no refresh_token".into())
        })?;
        let expiration = expiry_after(issued_at, token.expires_in)?;

        let response = self
            .http
            .get(format!("{}/oauth/userinfo", self.config.url))
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let user_info: UserInfo = read_json(response).await?;

        info!(
            grant = grant.kind(),
            expires_in = token.expires_in,
            accounts = user_info.accounts.len(),
            "DocuSign token issued"
        );

        Ok(Credential::issue(token, refresh_token, user_info, expiration))
    }

    /// Refresh grant using the stored refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential, DocuSignError> {
        self.exchange(Grant::RefreshToken(refresh_token)).await
    }

    /// List envelopes by id, restricted to completed/sent/declined/delivered.
    ///
    /// A payload without `envelopes` is an empty list, not an error.
    pub async fn list_envelopes(
        &self,
        credential: &Credential,
        envelope_ids: &[String],
    ) -> Result<Vec<Envelope>, DocuSignError> {
        let api = resolve_api_base(credential)?;
        let ids = envelope_ids.join(",");

        let response = self
            .http
            .get(format!("{}/envelopes", api.base_url))
            .header(header::AUTHORIZATION, &api.authorization)
            .query(&[
                ("envelope_ids", ids.as_str()),
                ("status", LISTED_STATUSES),
                ("include", "documents"),
            ])
            .send()
            .await?;

        let listed: EnvelopesResponse = read_json(response).await?;
        Ok(listed.envelopes.unwrap_or_default())
    }

    /// Raw bytes of one envelope document, passed through unchecked.
    pub async fn get_envelope_document(
        &self,
        credential: &Credential,
        envelope_id: &str,
        document_id: &str,
    ) -> Result<Bytes, DocuSignError> {
        let api = resolve_api_base(credential)?;

        let response = self
            .http
            .get(format!(
                "{}/envelopes/{}/documents/{}",
                api.base_url, envelope_id, document_id
            ))
            .header(header::AUTHORIZATION, &api.authorization)
            .send()
            .await?;

        Ok(ensure_success(response).await?.bytes().await?)
    }

    /// Embedded sender ("edit") view for an envelope.
    pub async fn create_sender_view(
        &self,
        credential: &Credential,
        envelope_id: &str,
    ) -> Result<SigningView, DocuSignError> {
        let api = resolve_api_base(credential)?;
        let body = EditViewRequest {
            return_url: format!("{}/api/v1/forms/send/callback", self.config.domain),
        };

        let response = self
            .http
            .post(format!("{}/envelopes/{}/views/edit", api.base_url, envelope_id))
            .header(header::AUTHORIZATION, &api.authorization)
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    /// Embedded signing view for the envelope's single signer.
    ///
    /// The signer is identified by phone number; no email is ever sent.
    pub async fn create_recipient_view(
        &self,
        credential: &Credential,
        envelope_id: &str,
        phone_number: &str,
        full_name: Option<&str>,
        token: &str,
    ) -> Result<SigningView, DocuSignError> {
        let api = resolve_api_base(credential)?;
        let callback_query =
            serde_urlencoded::to_string([("envelopeId", envelope_id), ("token", token)])
                .unwrap_or_default();
        let body = RecipientViewRequest {
            return_url: format!(
                "{}/api/v1/forms/recipient/callback?{}",
                self.config.domain, callback_query
            ),
            client_user_id: phone_number.to_string(),
            user_name: signer_name(full_name, phone_number).to_string(),
            email: String::new(),
            authentication_method: "None",
            x_frame_options: "allow_from",
            x_frame_options_allow_from_url: self.config.frontend_origin.clone(),
        };

        let response = self
            .http
            .post(format!("{}/envelopes/{}/views/recipient", api.base_url, envelope_id))
            .header(header::AUTHORIZATION, &api.authorization)
            .json(&body)
            .send()
            .await?;

        read_json(response).await
    }

    /// Create a draft envelope holding `forms`, locked, with one embedded signer.
    ///
    /// Returns the new envelope id exactly as DocuSign reports it.
    pub async fn create_envelope(
        &self,
        credential: &Credential,
        phone_number: &str,
        full_name: Option<&str>,
        forms: &[FormDocument],
    ) -> Result<String, DocuSignError> {
        let api = resolve_api_base(credential)?;
        let definition = envelope_definition(phone_number, full_name, forms);

        let response = self
            .http
            .post(format!("{}/envelopes", api.base_url))
            .header(header::AUTHORIZATION, &api.authorization)
            .json(&definition)
            .send()
            .await?;

        let summary: EnvelopeSummary = read_json(response).await?;
        info!(
            envelope_id = %summary.envelope_id,
            documents = forms.len(),
            "DocuSign envelope created"
        );
        Ok(summary.envelope_id)
    }
}

pub(crate) fn envelope_definition(
    phone_number: &str,
    full_name: Option<&str>,
    forms: &[FormDocument],
) -> EnvelopeDefinition {
    let documents = forms
        .iter()
        .enumerate()
        .map(|(i, form)| EnvelopeDocument {
            document_base64: STANDARD.encode(&form.file),
            document_id: (i + 1).to_string(),
            file_extension: "pdf",
            name: form.name.clone(),
            transform_pdf_fields: true,
        })
        .collect();

    EnvelopeDefinition {
        documents,
        email_subject: "Please sign",
        envelope_id_stamping: true,
        message_lock: true,
        recipients_lock: true,
        status: "created",
        recipients: Recipients {
            signers: vec![Signer {
                name: signer_name(full_name, phone_number).to_string(),
                client_user_id: phone_number.to_string(),
                email: String::new(),
                role_name: "signer",
                recipient_id: "1",
            }],
        },
    }
}

/// Turn a non-2xx answer into [`DocuSignError::Status`].
async fn ensure_success(response: Response) -> Result<Response, DocuSignError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DocuSignError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, DocuSignError> {
    let bytes = ensure_success(response).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| DocuSignError::InvalidResponse(e.to_string()))
}
