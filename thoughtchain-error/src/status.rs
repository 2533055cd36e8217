use std::fmt;

/// Whether resubmitting a failed request is worth it.
///
/// The reasoning loop never retries on its own; the status is carried so
/// the shell can offer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    Permanent,
    Temporary,
}

impl ErrorStatus {
    pub fn is_retryable(&self) -> bool {
        *self == ErrorStatus::Temporary
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        })
    }
}
