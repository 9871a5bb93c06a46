//! # bare-connection
//!
//! A blocking HTTP request library with retries, back-off and lazy response
//! decoding.
//!
//! ## Overview
//!
//! This crate provides:
//! - A single-use request object, [`RestRequest`], that retries transport
//!   failures and throttled responses a bounded number of times
//! - Exponential, jittered back-off via [`ExponentialBackOffPolicy`]
//! - Response decoding that resolves the charset, inflates gzip bodies and
//!   only reports a non-2xx status when the body is read
//! - `multipart/form-data` bodies built from text values and files
//! - Pluggable object serialization, with `serde_json` by default
//! - A default transport on `reqwest`'s blocking client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bare_connection::clients::{Payload, ReqwestConnectionFactory, RestRequest};
//! use bare_connection::{BaseUrl, ConnectionProperties};
//!
//! #[derive(serde::Serialize)]
//! struct NewWidget<'a> {
//!     name: &'a str,
//! }
//!
//! let properties = ConnectionProperties::builder()
//!     .url(BaseUrl::new("https://api.example.com").unwrap())
//!     .path("widgets")
//!     .build()
//!     .unwrap();
//! let factory = ReqwestConnectionFactory::new(properties).unwrap();
//!
//! let mut request = RestRequest::builder(factory).build();
//! let response = request
//!     .post(&Payload::object(&NewWidget { name: "gear" }))
//!     .unwrap();
//!
//! println!("Created: {}", response.status_code());
//! ```
//!
//! ## Retries
//!
//! A request makes at most `max_retry_attempts + 1` attempts. An attempt is
//! repeated when the transport fails and
//! [`RequestConfig::retry_on_transport_error`] is set, or when the back-off
//! policy flags the response status and is still within its delay budget.
//!
//! ```rust
//! use std::time::Duration;
//! use bare_connection::clients::ExponentialBackOffPolicy;
//! use bare_connection::RequestConfig;
//!
//! let config = RequestConfig::builder()
//!     .max_retry_attempts(3)
//!     .retry_on_transport_error(true)
//!     .build();
//!
//! let policy = ExponentialBackOffPolicy::builder()
//!     .retry_status_code(429)
//!     .retry_status_code(503)
//!     .initial_sleep(Duration::from_millis(250))
//!     .build();
//!
//! assert_eq!(config.max_retry_attempts(), 3);
//! assert_eq!(policy.initial_delay(), Duration::from_millis(250));
//! ```
//!
//! ## Design Principles
//!
//! - **Single use**: each request object runs once and owns its back-off
//!   policy, so independent requests share no mutable state
//! - **Lazy errors**: status errors surface on body access, never earlier
//! - **Fresh connections**: every attempt gets a new connection from the
//!   [`clients::ConnectionFactory`]

pub mod clients;
pub mod config;
pub mod error;

// Re-export configuration types at crate root for convenience
pub use config::{
    BaseUrl, Charset, ConnectionProperties, ConnectionPropertiesBuilder, RequestConfig,
    RequestConfigBuilder,
};
pub use error::ConfigError;

// Re-export request and response types
pub use clients::{
    HttpError, HttpMethod, HttpStatusError, MisuseError, Payload, RestRequest,
    RestRequestBuilder, RestResponse,
};
