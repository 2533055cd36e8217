//! Provider error mapping
//!
//! Re-exports thoughtchain-error and converts [`ProviderError`] into it.

pub use thoughtchain_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

impl ProviderError {
    /// The workspace error kind this provider failure maps to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Network(_) => ErrorKind::NetworkFailed,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            ProviderError::Unavailable(_) => ErrorKind::ProviderUnavailable,
            ProviderError::Parse(_) => ErrorKind::ParseFailed,
            ProviderError::InvalidRequest(_) => ErrorKind::InvalidArgument,
            ProviderError::Api { .. } | ProviderError::Stream(_) | ProviderError::Empty(_) => {
                ErrorKind::GenerationFailed
            }
        }
    }

    /// Wrap into the workspace error, recording the failing operation.
    pub fn into_error(self, operation: &'static str) -> Error {
        let mut err = Error::new(self.kind(), self.to_string()).with_operation(operation);
        match &self {
            ProviderError::Api { status, .. } => {
                err = err.with_context("http_status", status.to_string());
            }
            ProviderError::RateLimited {
                retry_after: Some(secs),
            } => {
                err = err.with_context("retry_after", secs.to_string());
            }
            _ => {}
        }
        err.set_source(self)
    }
}
