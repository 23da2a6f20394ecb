//! Shared types

pub mod error;

pub use error::{Result, ServiceError};
