//! Default transport built on `reqwest`'s blocking client.
//!
//! Requests without a body are sent when the response is read. A request
//! with a body is started as soon as the body is opened, on a helper thread,
//! and the body is streamed to it through a small bounded channel, so large
//! uploads never sit in memory as a whole. Response bodies are not
//! decompressed by `reqwest`; gzip handling is left to
//! [`RestResponse`](crate::clients::RestResponse).

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use base64::prelude::*;
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Method, Url};

use crate::clients::connection::{Connection, ConnectionFactory, ResponseHead};
use crate::clients::http_request::HttpMethod;
use crate::config::{Charset, ConnectionProperties};

/// Library version sent in the `User-Agent` header.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the chunks a streamed request body is handed over in.
const BODY_CHUNK_SIZE: usize = 8 * 1024;

/// Number of chunks that may wait for the sending thread.
const BODY_CHANNEL_CAPACITY: usize = 4;

type InFlight = JoinHandle<reqwest::Result<Response>>;

type PrepareHook = Arc<dyn Fn(&mut ReqwestConnection) + Send + Sync>;

/// Creates [`ReqwestConnection`]s for one endpoint.
///
/// The factory resolves the URL, credentials and cookies from
/// [`ConnectionProperties`] for every new connection. The underlying
/// `reqwest` client, and its connection pool, is shared by all connections.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::ReqwestConnectionFactory;
/// use bare_connection::{BaseUrl, ConnectionProperties};
///
/// let properties = ConnectionProperties::builder()
///     .url(BaseUrl::new("https://api.example.com").unwrap())
///     .path("widgets")
///     .query_param("page", "2")
///     .build()
///     .unwrap();
///
/// let factory = ReqwestConnectionFactory::new(properties)
///     .unwrap()
///     .on_prepare_connection(|connection| {
///         connection.set_header("X-Trace", "on");
///     });
/// ```
#[derive(Clone)]
pub struct ReqwestConnectionFactory {
    client: Client,
    properties: ConnectionProperties,
    query_charset: Charset,
    user_agent: String,
    on_prepare: Option<PrepareHook>,
}

// Verify the factory is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestConnectionFactory>();
};

impl ReqwestConnectionFactory {
    /// Creates a factory for the endpoint described by `properties`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the HTTP client cannot be created, for
    /// example when TLS initialization fails.
    pub fn new(properties: ConnectionProperties) -> io::Result<Self> {
        let redirect = if properties.follow_redirects() {
            Policy::default()
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .use_rustls_tls()
            .connect_timeout(properties.connect_timeout())
            .timeout(properties.read_timeout())
            .redirect(redirect)
            .build()
            .map_err(into_io_error)?;

        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        Ok(Self {
            client,
            properties,
            query_charset: Charset::utf8(),
            user_agent: format!("bare-connection v{CRATE_VERSION} | Rust {rust_version}"),
            on_prepare: None,
        })
    }

    /// Sets the charset used to percent-encode query parameters.
    #[must_use]
    pub fn with_query_charset(mut self, charset: Charset) -> Self {
        self.query_charset = charset;
        self
    }

    /// Registers a hook run on every new connection before it is handed out.
    #[must_use]
    pub fn on_prepare_connection(
        mut self,
        hook: impl Fn(&mut ReqwestConnection) + Send + Sync + 'static,
    ) -> Self {
        self.on_prepare = Some(Arc::new(hook));
        self
    }

    /// Returns the connection properties.
    #[must_use]
    pub const fn properties(&self) -> &ConnectionProperties {
        &self.properties
    }

    /// Returns the full URL connections are opened against.
    #[must_use]
    pub fn url(&self) -> String {
        self.properties.request_url(&self.query_charset)
    }

    fn credentials(&self) -> Option<String> {
        let username = self.properties.username()?;
        let password = self.properties.password()?;
        let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
        Some(format!("{} {encoded}", self.properties.authorization_type()))
    }
}

impl fmt::Debug for ReqwestConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestConnectionFactory")
            .field("url", &self.url())
            .field("query_charset", &self.query_charset)
            .field("has_prepare_hook", &self.on_prepare.is_some())
            .finish_non_exhaustive()
    }
}

impl ConnectionFactory for ReqwestConnectionFactory {
    type Connection = ReqwestConnection;

    fn create_connection(&self, method: HttpMethod) -> io::Result<ReqwestConnection> {
        let url = self.url();
        let url = Url::parse(&url).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid URL '{url}': {e}"))
        })?;

        let mut connection = ReqwestConnection {
            client: self.client.clone(),
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            in_flight: None,
            response: None,
        };

        connection.set_header(USER_AGENT.as_str(), &self.user_agent);
        if let Some(credentials) = self.credentials() {
            connection.set_header(AUTHORIZATION.as_str(), &credentials);
        }
        for cookie in self.properties.cookies() {
            connection.append_header(COOKIE.as_str(), cookie);
        }
        if let Some(hook) = &self.on_prepare {
            hook(&mut connection);
        }

        Ok(connection)
    }
}

/// One exchange over the blocking `reqwest` client.
pub struct ReqwestConnection {
    client: Client,
    method: HttpMethod,
    url: Url,
    headers: HeaderMap,
    body: Option<BufWriter<ChunkSender>>,
    in_flight: Option<InFlight>,
    response: Option<Response>,
}

impl ReqwestConnection {
    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the request headers set so far.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing earlier values. Invalid names or values are
    /// skipped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.headers.insert(name, value);
        }
    }

    /// Adds a header value, keeping earlier values.
    pub fn append_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.headers.append(name, value);
        }
    }

    fn request_builder(&self) -> RequestBuilder {
        let method = match self.method {
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        };
        self.client
            .request(method, self.url.clone())
            .headers(self.headers.clone())
    }

    /// Starts the request on a helper thread that reads its body from the
    /// returned writer. Dropping the writer ends the body.
    fn start_streaming(&mut self) -> io::Result<BufWriter<ChunkSender>> {
        let (sender, receiver) = mpsc::sync_channel(BODY_CHANNEL_CAPACITY);
        let builder = self
            .request_builder()
            .body(Body::new(ChunkReceiver::new(receiver)));

        tracing::debug!("{} {} (streaming body)", self.method, self.url);
        let handle = thread::Builder::new()
            .name("bare-connection-body".to_string())
            .spawn(move || builder.send())?;
        self.in_flight = Some(handle);

        Ok(BufWriter::with_capacity(BODY_CHUNK_SIZE, ChunkSender { sender }))
    }

    fn finish_streaming(&mut self, handle: InFlight) -> io::Result<Response> {
        let flushed = match self.body.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        };

        let sent = handle.join().map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "Request thread panicked")
        })?;
        let response = sent.map_err(into_io_error)?;
        if let Err(e) = flushed {
            tracing::warn!(
                "Server answered {} before the whole body was sent: {}",
                response.status(),
                e
            );
        }
        Ok(response)
    }

    fn send(&mut self) -> io::Result<&Response> {
        if self.response.is_none() {
            let response = match self.in_flight.take() {
                Some(handle) => self.finish_streaming(handle)?,
                None => {
                    let builder = self.request_builder();
                    tracing::debug!("{} {}", self.method, self.url);
                    builder.send().map_err(into_io_error)?
                }
            };
            self.response = Some(response);
        }

        self.response
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "No response available"))
    }
}

/// Write end of a streamed request body.
struct ChunkSender {
    sender: SyncSender<Vec<u8>>,
}

impl Write for ChunkSender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.sender.send(buf.to_vec()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Request ended before the body was sent",
            )
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read end of a streamed request body, handed to `reqwest`.
struct ChunkReceiver {
    receiver: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    position: usize,
}

impl ChunkReceiver {
    const fn new(receiver: Receiver<Vec<u8>>) -> Self {
        Self {
            receiver,
            chunk: Vec::new(),
            position: 0,
        }
    }
}

impl Read for ChunkReceiver {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position == self.chunk.len() {
            match self.receiver.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.position = 0;
                }
                // Sender dropped: the body is complete.
                Err(_) => return Ok(0),
            }
        }

        let remaining = &self.chunk[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl fmt::Debug for ReqwestConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestConnection")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("streaming", &self.in_flight.is_some())
            .field("sent", &self.response.is_some())
            .finish_non_exhaustive()
    }
}

impl Connection for ReqwestConnection {
    fn set_request_header(&mut self, name: &str, value: &str) {
        if self.in_flight.is_some() {
            tracing::warn!("Ignoring header '{}' set after the body was opened", name);
            return;
        }
        self.set_header(name, value);
    }

    fn request_body(&mut self) -> io::Result<&mut dyn Write> {
        if self.response.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Request body can't be written after the request was sent",
            ));
        }
        let writer = match self.body.take() {
            Some(writer) => writer,
            None => self.start_streaming()?,
        };
        Ok(self.body.insert(writer))
    }

    fn read_response(&mut self) -> io::Result<ResponseHead> {
        let response = self.send()?;
        Ok(ResponseHead {
            status: response.status().as_u16(),
            headers: parse_response_headers(response.headers()),
        })
    }

    fn response_body(&mut self) -> io::Result<Box<dyn Read + Send>> {
        self.response
            .take()
            .map(|response| Box::new(response) as Box<dyn Read + Send>)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotConnected, "Response body is not available")
            })
    }

    fn disconnect(&mut self) {
        self.response = None;
        // Closing the body lets an abandoned request finish on its own thread.
        self.body = None;
        self.in_flight = None;
    }
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => Some((name, value)),
        _ => {
            tracing::warn!("Skipping invalid request header '{}'", name);
            None
        }
    }
}

/// Parses response headers into a `HashMap` keyed by lower-case name.
fn parse_response_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_lowercase();
        let value = value.to_str().unwrap_or_default().to_string();
        result.entry(key).or_default().push(value);
    }
    result
}

fn into_io_error(error: reqwest::Error) -> io::Error {
    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else if error.is_connect() {
        io::ErrorKind::ConnectionRefused
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, error)
}
