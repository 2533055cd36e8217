//! # thoughtchain-error
//!
//! One error type for the whole workspace. An [`Error`] carries an
//! [`ErrorKind`] to branch on, an [`ErrorStatus`] saying whether a retry
//! could help, the operation that failed, `key: value` context added as it
//! travels up, and the wrapped cause.
//!
//! ```rust
//! use thoughtchain_error::{Error, ErrorKind};
//!
//! fn check(interval: u32) -> Result<(), Error> {
//!     if interval == 0 {
//!         return Err(Error::config_invalid("iterations_before_feedback", "must be at least 1")
//!             .with_operation("config::validate"));
//!     }
//!     Ok(())
//! }
//!
//! let err = check(0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
//! assert!(!err.is_retryable());
//! ```
//!
//! Foreign errors go in through `set_source`, never through blanket `From`
//! impls; `std::io::Error` is the one exception.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;
