use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// A failed thoughtchain operation.
///
/// ```rust
/// use thoughtchain_error::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::GenerationFailed, "stream closed early")
///     .with_operation("controller::iterate")
///     .with_context("iteration", "2");
///
/// assert!(err.is_retryable());
/// assert_eq!(
///     err.to_string(),
///     "GenerationFailed at controller::iterate [iteration=2]: stream closed early (temporary)"
/// );
/// ```
pub struct Error {
    kind: ErrorKind,
    status: ErrorStatus,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// The status defaults from the kind: service hiccups are temporary,
    /// everything else is permanent.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let status = if kind.is_transient() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        };
        Self {
            kind,
            status,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    /// A rejected configuration value, naming the field under `field`
    pub fn config_invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message).with_context("field", field)
    }

    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Record the failing operation. An outer call keeps the inner one
    /// under `called`, so the chain survives.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            let inner = std::mem::replace(&mut self.operation, operation);
            self.context.push(("called", inner.to_string()));
        } else {
            self.operation = operation;
        }
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying cause. Only one cause per error.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source already set");
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " [{}]", pairs.join(", "))?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        write!(f, " ({})", self.status)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Error");
        s.field("kind", &self.kind)
            .field("status", &self.status)
            .field("operation", &self.operation)
            .field("message", &self.message);
        if !self.context.is_empty() {
            s.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            s.field("source", &format_args!("{:#}", source));
        }
        s.finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IoFailed, err.to_string())
            .with_context("io_kind", format!("{:?}", err.kind()))
            .set_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_kind() {
        let err = Error::new(ErrorKind::NetworkFailed, "connection refused");
        assert_eq!(err.status(), ErrorStatus::Temporary);

        let err = Error::new(ErrorKind::ConfigInvalid, "threshold out of range");
        assert_eq!(err.status(), ErrorStatus::Permanent);
        assert_eq!(err.message(), "threshold out of range");

        let err = err.with_status(ErrorStatus::Temporary);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_outer_operation_keeps_inner() {
        let err = Error::new(ErrorKind::IoFailed, "write failed")
            .with_operation("config::save")
            .with_operation("cli::config_init");

        assert_eq!(err.operation(), "cli::config_init");
        assert_eq!(err.context(), &[("called", "config::save".to_string())]);
    }

    #[test]
    fn test_display_is_one_line() {
        let err = Error::new(ErrorKind::GenerationFailed, "model unavailable")
            .with_operation("controller::finalize")
            .with_context("model", "local-model")
            .with_context("iteration", "2");

        assert_eq!(
            err.to_string(),
            "GenerationFailed at controller::finalize [model=local-model, iteration=2]: model unavailable (temporary)"
        );
    }

    #[test]
    fn test_display_without_operation() {
        let err = Error::config_invalid("history_window", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "ConfigInvalid [field=history_window]: must be at least 1 (permanent)"
        );
    }

    #[test]
    fn test_source_is_exposed() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err =
            Error::new(ErrorKind::ParseFailed, "bad classification reply").set_source(json_err);

        assert!(err.source_ref().is_some());
        assert!(std::error::Error::source(&err).is_some());
        assert!(format!("{:?}", err).contains("source"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert_eq!(err.context(), &[("io_kind", "NotFound".to_string())]);
        assert!(!err.is_retryable());
    }
}
