//! Transport seam between the request loop and the network.
//!
//! A [`ConnectionFactory`] hands out one fresh [`Connection`] per attempt.
//! The request loop sets headers, writes the body, reads the status line and
//! headers, and either passes the connection to a
//! [`RestResponse`](crate::clients::RestResponse) or disconnects it.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use crate::clients::http_request::HttpMethod;

/// Status code and headers of a response, read before the body.
///
/// Header names are stored lower-case; a header may carry several values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHead {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers keyed by lower-case name.
    pub headers: HashMap<String, Vec<String>>,
}

impl ResponseHead {
    /// Creates a head with the given status and no headers.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Adds a header value, keeping any earlier values for the same name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns the first value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value of a header.
    #[must_use]
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// One HTTP exchange.
///
/// Calls happen in order: headers, then body, then [`read_response`], then
/// at most one [`response_body`]. [`disconnect`] may be called at any point
/// and more than once.
///
/// [`read_response`]: Connection::read_response
/// [`response_body`]: Connection::response_body
/// [`disconnect`]: Connection::disconnect
pub trait Connection {
    /// Sets a request header, replacing any earlier value.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Returns the sink for the request body.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the body can no longer be written.
    fn request_body(&mut self) -> io::Result<&mut dyn Write>;

    /// Sends the request if needed and reads the response status and headers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on any transport failure.
    fn read_response(&mut self) -> io::Result<ResponseHead>;

    /// Takes the raw response body stream, success or error alike.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if no response has been read or the body was
    /// already taken.
    fn response_body(&mut self) -> io::Result<Box<dyn Read + Send>>;

    /// Releases the underlying connection.
    fn disconnect(&mut self);
}

/// Produces a fresh, unopened connection for each attempt.
pub trait ConnectionFactory {
    /// The connection type produced.
    type Connection: Connection;

    /// Creates a connection configured for `method`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the connection cannot be prepared. The request
    /// loop treats this as a transport fault.
    fn create_connection(&self, method: HttpMethod) -> io::Result<Self::Connection>;
}

impl<F, C> ConnectionFactory for F
where
    F: Fn(HttpMethod) -> io::Result<C>,
    C: Connection,
{
    type Connection = C;

    fn create_connection(&self, method: HttpMethod) -> io::Result<C> {
        self(method)
    }
}
