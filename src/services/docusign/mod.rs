//! DocuSign e-signature integration
//!
//! OAuth consent and token exchange against the account server, plus the
//! envelope operations the host application uses.

pub mod client;
pub mod error;
pub mod models;

pub use client::{build_consent_url, resolve_api_base, ApiBase, DocuSignClient, Grant};
pub use error::DocuSignError;
pub use models::{
    Account, Credential, Envelope, FormDocument, SigningView, UserInfo, REFRESH_MARGIN_SECS,
};
