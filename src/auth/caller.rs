//! Caller identity
//!
//! The host application's user record, as far as DocuSign access is concerned.
//! Storage of the credential stays with the host.

use serde::{Deserialize, Serialize};

use crate::services::docusign::Credential;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Host user id; sent as OAuth `state` and echoed back on the callback
    pub id: String,

    /// Used as the consent screen's `login_hint`
    pub email: String,

    /// Stored DocuSign credential, if the user has ever consented
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docusign: Option<Credential>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            docusign: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.docusign = Some(credential);
        self
    }
}
