//! Consent/refresh gate
//!
//! Runs in front of every route that talks to DocuSign:
//!
//! 1. No stored credential -> blocked with a consent URL
//! 2. Credential valid for more than an hour -> proceed, no network call
//! 3. Otherwise one refresh attempt: success replaces the credential and
//!    proceeds, any failure is blocked exactly like case 1
//!
//! The refreshed credential is handed back on the caller identity; persisting
//! it is the host's job. Two concurrent requests for the same caller near
//! expiry will each refresh, and DocuSign may invalidate one of the resulting
//! refresh tokens. Nothing here serialises them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::caller::CallerIdentity;
use crate::services::docusign::{Credential, DocuSignClient, DocuSignError};

/// Why a refresh did not produce a credential.
///
/// The gate answers both the same way; the split exists for logging and for
/// callers that want to treat a revoked grant differently later.
#[derive(Debug, thiserror::Error)]
pub enum RefreshFailure {
    /// DocuSign answered and refused the grant (expired/revoked refresh token, bad client)
    #[error("refresh grant rejected: {0}")]
    Rejected(DocuSignError),

    /// Network failure, timeout, 5xx or an unreadable answer
    #[error("token service unavailable: {0}")]
    Unavailable(DocuSignError),
}

impl From<DocuSignError> for RefreshFailure {
    fn from(err: DocuSignError) -> Self {
        if err.is_client_error() {
            Self::Rejected(err)
        } else {
            Self::Unavailable(err)
        }
    }
}

/// What the gate needs from the OAuth side.
#[async_trait]
pub trait TokenAuthority: Send + Sync {
    /// Consent URL for a user who must (re)authorize the application
    fn consent_url(&self, email: &str, user_id: &str) -> String;

    /// One refresh-grant exchange
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RefreshFailure>;
}

#[async_trait]
impl TokenAuthority for DocuSignClient {
    fn consent_url(&self, email: &str, user_id: &str) -> String {
        DocuSignClient::consent_url(self, email, user_id)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RefreshFailure> {
        Ok(DocuSignClient::refresh(self, refresh_token).await?)
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Continue; `refreshed` is set when the caller's credential was replaced
    Proceed { refreshed: bool },
    /// Stop and send the user to DocuSign consent
    Blocked { consent_url: String },
}

impl GateOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Consent/refresh gate
#[derive(Clone)]
pub struct ConsentGate {
    authority: Arc<dyn TokenAuthority>,
}

impl ConsentGate {
    pub fn new(authority: Arc<dyn TokenAuthority>) -> Self {
        Self { authority }
    }

    /// Decide whether `caller` may proceed, refreshing its credential if needed.
    pub async fn authorize(&self, caller: &mut CallerIdentity) -> GateOutcome {
        self.authorize_at(caller, Utc::now()).await
    }

    /// [`authorize`](Self::authorize) against an explicit clock reading.
    pub async fn authorize_at(&self, caller: &mut CallerIdentity, now: DateTime<Utc>) -> GateOutcome {
        let consent_url = self.authority.consent_url(&caller.email, &caller.id);

        let Some(credential) = caller.docusign.as_ref() else {
            debug!(user_id = %caller.id, "No DocuSign credential, consent required");
            return GateOutcome::Blocked { consent_url };
        };

        if credential.is_fresh_at(now) {
            return GateOutcome::Proceed { refreshed: false };
        }

        info!(
            user_id = %caller.id,
            expiration = %credential.expiration,
            "DocuSign token near expiry, refreshing"
        );

        let refresh_token = credential.refresh_token.clone();
        let result = self.authority.refresh(&refresh_token).await;

        match result {
            Ok(refreshed) => {
                caller.docusign = Some(refreshed);
                GateOutcome::Proceed { refreshed: true }
            }
            Err(RefreshFailure::Rejected(e)) => {
                warn!(user_id = %caller.id, error = %e, "DocuSign refresh rejected, consent required");
                GateOutcome::Blocked { consent_url }
            }
            Err(RefreshFailure::Unavailable(e)) => {
                warn!(user_id = %caller.id, error = %e, "DocuSign refresh failed, consent required");
                GateOutcome::Blocked { consent_url }
            }
        }
    }
}
