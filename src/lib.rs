//! docusign-gate - DocuSign consent gate and e-signature client
//!
//! Sits between a host application and the DocuSign REST API.
//!
//! ## Pieces
//!
//! - **Gate**: checks a caller's stored DocuSign credential, silently refreshes
//!   it when it is about to expire, and otherwise answers with a consent URL
//! - **Client**: OAuth token exchange plus the envelope, document and embedded
//!   view operations the host needs
//! - **Server**: hyper sidecar exposing both over HTTP

pub mod auth;
pub mod config;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, ServiceError};
