//! DocuSign consent gate
//!
//! Provides:
//! - The caller identity carried by gated requests
//! - The consent/refresh gate that decides whether a request may reach DocuSign

pub mod caller;
pub mod gate;

pub use caller::CallerIdentity;
pub use gate::{ConsentGate, GateOutcome, RefreshFailure, TokenAuthority};
