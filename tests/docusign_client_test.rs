//! DocuSign client against a wiremock stand-in for the account server and eSignature API

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docusign_gate::config::DocuSignConfig;
use docusign_gate::services::docusign::{
    Account, Credential, DocuSignClient, DocuSignError, FormDocument, Grant, UserInfo,
};

const ACCOUNT_PATH: &str = "/restapi/v2.1/accounts/acct-1";

fn client_for(server: &MockServer) -> DocuSignClient {
    let config = DocuSignConfig::new(
        server.uri(),
        "ik-123",
        "sk-456",
        "https://app.example.com",
        "https://youth.example.com",
    );
    DocuSignClient::new(config).unwrap()
}

fn credential_for(server: &MockServer) -> Credential {
    Credential {
        access_token: "access-abc".into(),
        token_type: Some("Bearer".into()),
        refresh_token: "refresh-xyz".into(),
        expires_in: 28800,
        expiration: Utc::now() + Duration::hours(8),
        user_info: UserInfo {
            sub: "user-guid".into(),
            name: Some("Sam Signer".into()),
            email: Some("sam@example.com".into()),
            accounts: vec![Account {
                account_id: "acct-1".into(),
                account_name: Some("Youth Org".into()),
                is_default: true,
                base_uri: server.uri(),
            }],
        },
    }
}

async fn mount_userinfo(server: &MockServer, bearer: &str) {
    Mock::given(method("GET"))
        .and(path("/oauth/userinfo"))
        .and(header("authorization", format!("Bearer {}", bearer).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "user-guid",
            "name": "Sam Signer",
            "email": "sam@example.com",
            "accounts": [{
                "account_id": "acct-1",
                "is_default": true,
                "account_name": "Youth Org",
                "base_uri": "https://demo.docusign.net"
            }]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exchange_posts_grant_with_basic_auth_then_loads_userinfo() {
    let server = MockServer::start().await;
    let basic = format!("Basic {}", STANDARD.encode("ik-123:sk-456"));

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", basic.as_str()))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "token_type": "Bearer",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_userinfo(&server, "fresh-access").await;

    let client = client_for(&server);
    let before = Utc::now();
    let credential = client.refresh("refresh-xyz").await.unwrap();
    let after = Utc::now();

    assert_eq!(credential.access_token, "fresh-access");
    assert_eq!(credential.refresh_token, "fresh-refresh");
    assert_eq!(credential.expires_in, 3600);
    assert!(credential.expiration >= before + Duration::seconds(3600));
    assert!(credential.expiration <= after + Duration::seconds(3600));
    assert_eq!(credential.user_info.accounts[0].account_id, "acct-1");
}

#[tokio::test]
async fn test_authorization_code_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=c0de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "first-access",
            "refresh_token": "first-refresh",
            "expires_in": 28800
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_userinfo(&server, "first-access").await;

    let credential = client_for(&server)
        .exchange(Grant::AuthorizationCode("c0de"))
        .await
        .unwrap();
    assert_eq!(credential.access_token, "first-access");
    assert!(credential.token_type.is_none());
}

#[tokio::test]
async fn test_exchange_fails_when_userinfo_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth/userinfo"))
        .respond_with(ResponseTemplate::new(500).set_body_string("userinfo down"))
        .mount(&server)
        .await;

    let err = client_for(&server).refresh("refresh-xyz").await.unwrap_err();
    assert!(matches!(
        err,
        DocuSignError::Status { status: 500, ref body } if body == "userinfo down"
    ));
}

#[tokio::test]
async fn test_rejected_grant_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let err = client_for(&server).refresh("revoked").await.unwrap_err();
    assert!(err.is_client_error());
    // no userinfo call after a failed token call
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_out_of_range_expires_in_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 9_223_372_036_854_775_i64
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .exchange(Grant::RefreshToken("rt"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocuSignError::InvalidResponse(_)));
    assert!(!err.is_client_error());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_list_envelopes_sends_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/envelopes", ACCOUNT_PATH)))
        .and(header("authorization", "Bearer access-abc"))
        .and(query_param("envelope_ids", "env-1,env-2"))
        .and(query_param("status", "completed,sent,declined,delivered"))
        .and(query_param("include", "documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultSetSize": "2",
            "envelopes": [
                { "envelopeId": "env-1", "status": "completed" },
                { "envelopeId": "env-2", "status": "sent", "envelopeDocuments": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ids = vec!["env-1".to_string(), "env-2".to_string()];
    let envelopes = client
        .list_envelopes(&credential_for(&server), &ids)
        .await
        .unwrap();

    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].envelope_id, "env-1");
    assert_eq!(envelopes[1].status.as_deref(), Some("sent"));
    assert!(envelopes[1].details.contains_key("envelopeDocuments"));
}

#[tokio::test]
async fn test_list_envelopes_without_envelopes_field_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/envelopes", ACCOUNT_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "resultSetSize": "0" })))
        .mount(&server)
        .await;

    let envelopes = client_for(&server)
        .list_envelopes(&credential_for(&server), &["env-9".to_string()])
        .await
        .unwrap();
    assert!(envelopes.is_empty());
}

#[tokio::test]
async fn test_envelope_operations_need_an_account() {
    let server = MockServer::start().await;
    let mut credential = credential_for(&server);
    credential.user_info.accounts.clear();

    let err = client_for(&server)
        .create_sender_view(&credential, "env-1")
        .await
        .unwrap_err();
    assert!(matches!(err, DocuSignError::NoAccount));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_envelope_document_returns_raw_bytes() {
    let server = MockServer::start().await;
    let pdf = b"%PDF-1.7\n\x00\x01binary".to_vec();

    Mock::given(method("GET"))
        .and(path(format!("{}/envelopes/env-1/documents/2", ACCOUNT_PATH)))
        .and(header("authorization", "Bearer access-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = client_for(&server)
        .get_envelope_document(&credential_for(&server), "env-1", "2")
        .await
        .unwrap();
    assert_eq!(bytes, Bytes::from(pdf));
}

#[tokio::test]
async fn test_create_sender_view() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/envelopes/env-1/views/edit", ACCOUNT_PATH)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "url": "https://demo.docusign.net/edit/abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = client_for(&server)
        .create_sender_view(&credential_for(&server), "env-1")
        .await
        .unwrap();
    assert_eq!(view.url, "https://demo.docusign.net/edit/abc");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({ "returnUrl": "https://app.example.com/api/v1/forms/send/callback" })
    );
}

#[tokio::test]
async fn test_create_recipient_view_embeds_signer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/envelopes/env-1/views/recipient", ACCOUNT_PATH)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "url": "https://demo.docusign.net/signing/xyz"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = client_for(&server)
        .create_recipient_view(&credential_for(&server), "env-1", "+15550100", None, "tok-1")
        .await
        .unwrap();
    assert_eq!(view.url, "https://demo.docusign.net/signing/xyz");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body["returnUrl"],
        "https://app.example.com/api/v1/forms/recipient/callback?envelopeId=env-1&token=tok-1"
    );
    assert_eq!(body["clientUserId"], "+15550100");
    assert_eq!(body["userName"], "+15550100");
    assert_eq!(body["email"], "");
    assert_eq!(body["authenticationMethod"], "None");
    assert_eq!(body["xFrameOptions"], "allow_from");
    assert_eq!(body["xFrameOptionsAllowFromUrl"], "https://youth.example.com");
}

#[tokio::test]
async fn test_create_envelope_returns_remote_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/envelopes", ACCOUNT_PATH)))
        .and(header("authorization", "Bearer access-abc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "envelopeId": "4b728be4-4f1a-4c8e-a9ad-0d9e3d8a3f10",
            "status": "created",
            "uri": "/envelopes/4b728be4-4f1a-4c8e-a9ad-0d9e3d8a3f10"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let forms = vec![
        FormDocument {
            name: "consent".into(),
            file: Bytes::from_static(b"%PDF-a"),
        },
        FormDocument {
            name: "waiver".into(),
            file: Bytes::from_static(b"%PDF-b"),
        },
    ];
    let envelope_id = client_for(&server)
        .create_envelope(&credential_for(&server), "+15550100", Some("Sam Signer"), &forms)
        .await
        .unwrap();
    assert_eq!(envelope_id, "4b728be4-4f1a-4c8e-a9ad-0d9e3d8a3f10");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let documents = body["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["documentId"], "1");
    assert_eq!(documents[1]["documentId"], "2");
    assert_eq!(documents[1]["name"], "waiver");
    assert_eq!(documents[0]["documentBase64"], STANDARD.encode(b"%PDF-a"));
    assert_eq!(body["emailSubject"], "Please sign");
    assert_eq!(body["recipients"]["signers"][0]["name"], "Sam Signer");
    assert_eq!(body["recipients"]["signers"][0]["roleName"], "signer");
    assert_eq!(body["recipients"]["signers"][0]["recipientId"], "1");
}

#[tokio::test]
async fn test_upstream_error_is_surfaced_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{}/envelopes/env-1/views/edit", ACCOUNT_PATH)))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"errorCode":"ENVELOPE_DOES_NOT_EXIST"}"#),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_sender_view(&credential_for(&server), "env-1")
        .await
        .unwrap_err();
    match err {
        DocuSignError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("ENVELOPE_DOES_NOT_EXIST"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
