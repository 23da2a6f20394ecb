//! Envelope routes
//!
//! All gated; each forwards to one DocuSign client call with the caller's
//! (possibly just refreshed) credential. The gate runs before any parameter
//! checks, so a caller without consent always gets the consent response.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{bytes_response, json_response, parse_json, pass_gate, require, BoxBody, Gated};
use crate::server::AppState;
use crate::services::docusign::{Envelope, FormDocument};
use crate::types::ServiceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvelopesParams {
    #[serde(default)]
    pub envelope_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListEnvelopesResponse {
    pub envelopes: Vec<Envelope>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParams {
    #[serde(default)]
    pub envelope_id: String,
    #[serde(default)]
    pub document_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderViewParams {
    #[serde(default)]
    pub envelope_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientViewParams {
    #[serde(default)]
    pub envelope_id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Host token appended to the signing return URL
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormUpload {
    pub name: String,
    /// PDF bytes, standard base64
    pub file_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvelopeParams {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub forms: Vec<FormUpload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvelopeResponse {
    pub envelope_id: String,
}

/// POST /api/v1/docusign/envelopes/list
pub async fn handle_list_envelopes(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let Gated { mut caller, params } = parse_json::<Gated<ListEnvelopesParams>>(&body)?;
    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    let result = state
        .client
        .list_envelopes(passed.credential, &params.envelope_ids)
        .await
        .map(|envelopes| json_response(StatusCode::OK, &ListEnvelopesResponse { envelopes }))
        .map_err(ServiceError::from);
    passed.respond(result)
}

/// POST /api/v1/docusign/envelopes/document
///
/// Streams back the document bytes as DocuSign sent them.
pub async fn handle_envelope_document(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let Gated { mut caller, params } = parse_json::<Gated<DocumentParams>>(&body)?;
    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    let result = async {
        let envelope_id = require("envelopeId", &params.envelope_id)?;
        let document_id = require("documentId", &params.document_id)?;
        let document = state
            .client
            .get_envelope_document(passed.credential, envelope_id, document_id)
            .await?;
        Ok::<_, ServiceError>(bytes_response(StatusCode::OK, "application/pdf", document))
    }
    .await;
    passed.respond(result)
}

/// POST /api/v1/docusign/envelopes/sender-view
pub async fn handle_sender_view(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let Gated { mut caller, params } = parse_json::<Gated<SenderViewParams>>(&body)?;
    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    let result = async {
        let envelope_id = require("envelopeId", &params.envelope_id)?;
        let view = state
            .client
            .create_sender_view(passed.credential, envelope_id)
            .await?;
        Ok::<_, ServiceError>(json_response(StatusCode::OK, &view))
    }
    .await;
    passed.respond(result)
}

/// POST /api/v1/docusign/envelopes/recipient-view
pub async fn handle_recipient_view(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let Gated { mut caller, params } = parse_json::<Gated<RecipientViewParams>>(&body)?;
    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    let result = async {
        let envelope_id = require("envelopeId", &params.envelope_id)?;
        let phone_number = require("phoneNumber", &params.phone_number)?;
        let view = state
            .client
            .create_recipient_view(
                passed.credential,
                envelope_id,
                phone_number,
                params.full_name.as_deref(),
                &params.token,
            )
            .await?;
        Ok::<_, ServiceError>(json_response(StatusCode::OK, &view))
    }
    .await;
    passed.respond(result)
}

/// POST /api/v1/docusign/envelopes
pub async fn handle_create_envelope(
    state: &AppState,
    body: Bytes,
) -> Result<Response<BoxBody>, ServiceError> {
    let Gated { mut caller, params } = parse_json::<Gated<CreateEnvelopeParams>>(&body)?;
    let passed = match pass_gate(state, &mut caller).await {
        Ok(passed) => passed,
        Err(blocked) => return Ok(blocked),
    };

    let result = async {
        let phone_number = require("phoneNumber", &params.phone_number)?;
        let forms = decode_forms(&params.forms)?;
        let envelope_id = state
            .client
            .create_envelope(passed.credential, phone_number, params.full_name.as_deref(), &forms)
            .await?;
        Ok::<_, ServiceError>(json_response(
            StatusCode::OK,
            &CreateEnvelopeResponse { envelope_id },
        ))
    }
    .await;
    passed.respond(result)
}

fn decode_forms(uploads: &[FormUpload]) -> Result<Vec<FormDocument>, ServiceError> {
    uploads
        .iter()
        .map(|upload| {
            let file = STANDARD.decode(&upload.file_base64).map_err(|e| {
                ServiceError::BadRequest(format!("form {} is not valid base64: {}", upload.name, e))
            })?;
            Ok(FormDocument {
                name: upload.name.clone(),
                file: Bytes::from(file),
            })
        })
        .collect()
}
