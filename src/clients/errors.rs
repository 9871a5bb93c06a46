//! Error types for request execution and response access.
//!
//! # Error Handling
//!
//! The client separates failures by where they come from:
//!
//! - [`HttpError::Transport`]: the connection could not be opened, the body
//!   could not be written, or the response could not be read
//! - [`HttpError::Status`]: a non-2xx response, reported only when its
//!   content is accessed (see [`HttpStatusError`])
//! - [`HttpError::Config`]: a required collaborator is missing
//! - [`HttpError::Misuse`]: the request object was used incorrectly
//! - [`HttpError::Parse`]: the object parser rejected a body
//!
//! # Example
//!
//! ```rust,ignore
//! use bare_connection::HttpError;
//!
//! let response = request.get()?;
//! match response.text() {
//!     Ok(body) => println!("Body: {body}"),
//!     Err(HttpError::Status(e)) => println!("Server said {}: {}", e.code, e.message),
//!     Err(e) => println!("Failed: {e}"),
//! }
//! ```

use thiserror::Error;

use crate::clients::parser::ParseError;
use crate::error::ConfigError;

/// Error returned when the content of a non-2xx response is accessed.
///
/// The message is the error body, un-gzipped and decoded with the response
/// charset.
///
/// # Example
///
/// ```rust
/// use bare_connection::HttpStatusError;
///
/// let error = HttpStatusError {
///     code: 404,
///     message: "no such item".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "(404) no such item");
/// assert!(!error.is_success_code());
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("({code}) {message}")]
pub struct HttpStatusError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The decoded error body.
    pub message: String,
}

impl HttpStatusError {
    /// Returns `true` if the code is in the 2xx range.
    #[must_use]
    pub const fn is_success_code(&self) -> bool {
        self.code / 100 == 2
    }
}

/// Error returned when a request object is used incorrectly.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MisuseError {
    /// A verb method was called on a request that already ran.
    #[error("A request can only be executed once.")]
    AlreadyExecuted,
}

/// Unified error type for request execution and response access.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or connection failure.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Non-2xx response.
    #[error(transparent)]
    Status(#[from] HttpStatusError),

    /// Missing or invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request reuse or similar misuse.
    #[error(transparent)]
    Misuse(#[from] MisuseError),

    /// Object serialization or parsing failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl HttpError {
    /// Returns the status code if this is an HTTP status error.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(e) => Some(e.code),
            _ => None,
        }
    }
}
