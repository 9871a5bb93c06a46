//! Request execution, response decoding and request bodies.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`RestRequest`]: a single-use request with retry and back-off
//! - [`RestResponse`]: a response with lazily validated, decoded content
//! - [`Payload`]: the request body (bytes, text, form, multipart or object)
//! - [`ExponentialBackOffPolicy`]: the default [`BackOffPolicy`]
//! - [`Entity`]: one part of a multipart body
//! - [`MultipartEncoder`]: writes entities as `multipart/form-data`
//! - [`ObjectParser`] and [`JsonParser`]: the serialization boundary
//! - [`ConnectionFactory`] and [`Connection`]: the transport seam
//! - [`ReqwestConnectionFactory`]: the default transport
//!
//! # Example
//!
//! ```rust
//! use std::io::{self, Cursor, Read, Write};
//! use bare_connection::clients::{Connection, HttpMethod, ResponseHead, RestRequest};
//!
//! struct Canned(Vec<u8>);
//!
//! impl Connection for Canned {
//!     fn set_request_header(&mut self, _name: &str, _value: &str) {}
//!     fn request_body(&mut self) -> io::Result<&mut dyn Write> {
//!         Ok(&mut self.0)
//!     }
//!     fn read_response(&mut self) -> io::Result<ResponseHead> {
//!         Ok(ResponseHead::new(200).with_header("Content-Type", "text/plain; charset=UTF-8"))
//!     }
//!     fn response_body(&mut self) -> io::Result<Box<dyn Read + Send>> {
//!         Ok(Box::new(Cursor::new(b"pong".to_vec())))
//!     }
//!     fn disconnect(&mut self) {}
//! }
//!
//! let factory = |_method: HttpMethod| -> io::Result<Canned> { Ok(Canned(Vec::new())) };
//! let mut request = RestRequest::builder(factory).build();
//!
//! assert_eq!(request.get().unwrap().text().unwrap(), "pong");
//! ```
//!
//! # Retry Behavior
//!
//! - **Transport failure**: retried only when `retry_on_transport_error` is set
//! - **Status flagged by the back-off policy**: retried after the policy sleeps,
//!   until the policy's delay budget runs out
//! - **Any other status**: returned at once; the error is raised when the body
//!   is read
//!
//! The default `max_retry_attempts` is 5 and no back-off policy is set.

mod backoff;
mod connection;
mod entity;
mod errors;
mod form;
mod http_client;
mod http_request;
mod http_response;
mod multipart;
mod parser;
mod reqwest_connection;

pub use backoff::{
    BackOffPolicy, ExponentialBackOffPolicy, ExponentialBackOffPolicyBuilder, SleepInterrupted,
    Sleeper, ThreadSleeper, DEFAULT_INITIAL_SLEEP, DEFAULT_MAX_SLEEP, DEFAULT_MULTIPLIER,
};
pub use connection::{Connection, ConnectionFactory, ResponseHead};
pub use entity::{Entity, EntityContent, BINARY_FILE_FIELD, TEXT_FILE_FIELD};
pub use errors::{HttpError, HttpStatusError, MisuseError};
pub use form::FormParams;
pub use http_client::{
    RestRequest, RestRequestBuilder, ACCEPT_CHARSET_HEADER, ACCEPT_ENCODING_HEADER,
    CONTENT_TYPE_HEADER,
};
pub use http_request::{HttpMethod, Payload};
pub use http_response::{
    charset_from_content_type, is_success, RestResponse, SC_ACCEPTED, SC_BAD_GATEWAY,
    SC_BAD_REQUEST, SC_CONFLICT, SC_CREATED, SC_FORBIDDEN, SC_GATEWAY_TIMEOUT,
    SC_INTERNAL_ERROR, SC_NOT_FOUND, SC_NOT_MODIFIED, SC_NO_CONTENT, SC_OK,
    SC_TOO_MANY_REQUESTS, SC_UNAUTHORIZED, SC_UNAVAILABLE,
};
pub use multipart::{generate_boundary, MultipartEncoder, CRLF, DEFAULT_BINARY_CONTENT_TYPE};
pub use parser::{JsonParser, ObjectParser, ParseError};
pub use reqwest_connection::{ReqwestConnection, ReqwestConnectionFactory, CRATE_VERSION};
