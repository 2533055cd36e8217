//! What went wrong

use std::fmt;

/// Failure categories a caller can branch on.
///
/// The variants mirror the places a reasoning request can fail: the
/// configuration it was started with, the generation service it talks to,
/// or the local files it reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A configuration value is out of range or unparseable
    ConfigInvalid,
    /// A caller passed something the operation cannot use
    InvalidArgument,

    /// The completion call failed or its stream broke
    GenerationFailed,
    /// The generation service could not be reached
    NetworkFailed,
    /// The generation service asked us to slow down
    RateLimited,
    /// The generation service is up but cannot serve the request
    ProviderUnavailable,
    /// Credentials were rejected
    AuthenticationFailed,

    /// A reply or file could not be decoded
    ParseFailed,
    /// A value could not be encoded
    SerializationFailed,
    /// Reading or writing a local file failed
    IoFailed,

    /// Anything else
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::Unexpected => "Unexpected",
        }
    }

    /// True for failures of the generation service itself
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            ErrorKind::GenerationFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ProviderUnavailable
                | ErrorKind::AuthenticationFailed
        )
    }

    /// Resubmitting the same request may succeed. Bad credentials won't fix
    /// themselves, everything else on the service side might.
    pub fn is_transient(&self) -> bool {
        self.is_generation() && *self != ErrorKind::AuthenticationFailed
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_failures_are_transient() {
        assert!(ErrorKind::NetworkFailed.is_transient());
        assert!(ErrorKind::RateLimited.is_transient());
        assert!(ErrorKind::GenerationFailed.is_transient());
        assert!(!ErrorKind::AuthenticationFailed.is_transient());
        assert!(!ErrorKind::ConfigInvalid.is_transient());
    }

    #[test]
    fn test_generation_family() {
        assert!(ErrorKind::AuthenticationFailed.is_generation());
        assert!(!ErrorKind::ParseFailed.is_generation());
        assert!(!ErrorKind::IoFailed.is_generation());
    }
}
