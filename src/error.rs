//! Configuration error types for the client.
//!
//! This module contains the error type returned when configuration values are
//! rejected, or when a request needs a collaborator that was never configured.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. The one exception is the object parser: a request can
//! be built without one, and [`ConfigError::MissingObjectParser`] is only
//! reported when a body actually needs to be serialized or parsed.
//!
//! # Example
//!
//! ```rust
//! use bare_connection::{Charset, ConfigError};
//!
//! let result = Charset::new("not-a-charset");
//! assert!(matches!(result, Err(ConfigError::UnsupportedCharset { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The base URL is invalid.
    #[error("Invalid URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://api.example.com').")]
    InvalidUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// The charset label is not known.
    #[error("Unsupported charset '{charset}'.")]
    UnsupportedCharset {
        /// The label that could not be resolved.
        charset: String,
    },

    /// A body had to be serialized or parsed but no object parser was configured.
    #[error("No object parser configured. Set one with `parser(...)` before sending or parsing objects.")]
    MissingObjectParser,
}
