//! Outbound services

pub mod docusign;

pub use docusign::{DocuSignClient, DocuSignError};
