//! Configuration types for requests and the default transport.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`RequestConfig`]: retry and charset settings for one request
//! - [`RequestConfigBuilder`]: a builder for [`RequestConfig`]
//! - [`ConnectionProperties`]: where and how the default transport connects
//! - [`ConnectionPropertiesBuilder`]: a builder for [`ConnectionProperties`]
//! - [`Charset`]: a validated charset label
//! - [`BaseUrl`]: a validated base URL
//!
//! # Example
//!
//! ```rust
//! use bare_connection::{Charset, RequestConfig};
//!
//! let config = RequestConfig::builder()
//!     .max_retry_attempts(3)
//!     .retry_on_transport_error(true)
//!     .incoming_charset(Charset::new("ISO-8859-1").unwrap())
//!     .build();
//!
//! assert_eq!(config.max_retry_attempts(), 3);
//! ```

mod newtypes;

pub use newtypes::{BaseUrl, Charset, PATH_SEPARATOR};

use std::time::Duration;

use crate::clients::FormParams;
use crate::error::ConfigError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 5;

/// Default content type for text, raw and object payloads.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default connect timeout of the default transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default read timeout of the default transport.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10000);

/// Default authorization scheme used with username and password.
pub const DEFAULT_AUTHORIZATION_TYPE: &str = "Basic";

/// Settings that drive one request execution.
///
/// # Thread Safety
///
/// `RequestConfig` is `Clone`, `Send`, and `Sync`, so one configuration can
/// seed many independent requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig {
    max_retry_attempts: u32,
    retry_on_transport_error: bool,
    incoming_charset: Charset,
    outgoing_charset: Charset,
    content_type: String,
}

impl RequestConfig {
    /// Creates a new builder for constructing a `RequestConfig`.
    #[must_use]
    pub fn builder() -> RequestConfigBuilder {
        RequestConfigBuilder::new()
    }

    /// Returns how many retries may follow the first attempt.
    #[must_use]
    pub const fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Returns whether transport faults are retried.
    #[must_use]
    pub const fn retry_on_transport_error(&self) -> bool {
        self.retry_on_transport_error
    }

    /// Returns the charset assumed for responses that do not declare one.
    #[must_use]
    pub const fn incoming_charset(&self) -> &Charset {
        &self.incoming_charset
    }

    /// Returns the charset used to encode request bodies.
    #[must_use]
    pub const fn outgoing_charset(&self) -> &Charset {
        &self.outgoing_charset
    }

    /// Returns the content type sent with text, raw and object payloads.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfigBuilder::new().build()
    }
}

// Verify RequestConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RequestConfig>();
};

/// Builder for constructing [`RequestConfig`] instances.
///
/// # Defaults
///
/// - `max_retry_attempts`: 5
/// - `retry_on_transport_error`: `false`
/// - `incoming_charset` / `outgoing_charset`: UTF-8
/// - `content_type`: `application/json`
#[derive(Debug, Default)]
pub struct RequestConfigBuilder {
    max_retry_attempts: Option<u32>,
    retry_on_transport_error: Option<bool>,
    incoming_charset: Option<Charset>,
    outgoing_charset: Option<Charset>,
    content_type: Option<String>,
}

impl RequestConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many retries may follow the first attempt.
    ///
    /// Zero means exactly one attempt.
    #[must_use]
    pub const fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = Some(attempts);
        self
    }

    /// Sets whether transport faults are retried while attempts remain.
    #[must_use]
    pub const fn retry_on_transport_error(mut self, retry: bool) -> Self {
        self.retry_on_transport_error = Some(retry);
        self
    }

    /// Sets the charset assumed for responses that do not declare one.
    #[must_use]
    pub fn incoming_charset(mut self, charset: Charset) -> Self {
        self.incoming_charset = Some(charset);
        self
    }

    /// Sets the charset used to encode request bodies.
    #[must_use]
    pub fn outgoing_charset(mut self, charset: Charset) -> Self {
        self.outgoing_charset = Some(charset);
        self
    }

    /// Sets the content type sent with text, raw and object payloads.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Builds the [`RequestConfig`]. Every field has a default.
    #[must_use]
    pub fn build(self) -> RequestConfig {
        RequestConfig {
            max_retry_attempts: self
                .max_retry_attempts
                .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
            retry_on_transport_error: self.retry_on_transport_error.unwrap_or(false),
            incoming_charset: self.incoming_charset.unwrap_or_default(),
            outgoing_charset: self.outgoing_charset.unwrap_or_default(),
            content_type: self
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }
}

/// Where and how the default transport opens connections.
///
/// # Key Fields
///
/// Credentials are only sent when both `username` and `password` are set.
/// Each cookie is sent as its own `Cookie` header.
#[derive(Clone, Debug)]
pub struct ConnectionProperties {
    url: BaseUrl,
    path: Option<String>,
    query: FormParams,
    username: Option<String>,
    password: Option<String>,
    authorization_type: String,
    cookies: Vec<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
    follow_redirects: bool,
}

impl ConnectionProperties {
    /// Creates a new builder for constructing `ConnectionProperties`.
    #[must_use]
    pub fn builder() -> ConnectionPropertiesBuilder {
        ConnectionPropertiesBuilder::new()
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn url(&self) -> &BaseUrl {
        &self.url
    }

    /// Returns the path appended to the base URL, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns the query parameters.
    #[must_use]
    pub const fn query(&self) -> &FormParams {
        &self.query
    }

    /// Returns the username, if configured.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password, if configured.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns the authorization scheme (e.g., "Basic").
    #[must_use]
    pub fn authorization_type(&self) -> &str {
        &self.authorization_type
    }

    /// Returns the cookies sent with every attempt.
    #[must_use]
    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the read timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns whether redirects are followed.
    #[must_use]
    pub const fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Builds the full request URL from base URL, path and query.
    ///
    /// Query keys and values are encoded with `charset`.
    #[must_use]
    pub fn request_url(&self, charset: &Charset) -> String {
        let mut url = self.url.join(self.path.as_deref().unwrap_or_default());
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query.encode(charset));
        }
        url
    }
}

/// Builder for constructing [`ConnectionProperties`] instances.
///
/// The `url` is required. All other fields have defaults.
///
/// # Defaults
///
/// - `authorization_type`: `Basic`
/// - `connect_timeout`: 1 second
/// - `read_timeout`: 10 seconds
/// - `follow_redirects`: `true`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use bare_connection::{BaseUrl, ConnectionProperties};
///
/// let properties = ConnectionProperties::builder()
///     .url(BaseUrl::new("https://api.example.com").unwrap())
///     .path("v1/items")
///     .query_param("limit", "50")
///     .read_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
///
/// assert_eq!(properties.path(), Some("v1/items"));
/// ```
#[derive(Debug, Default)]
pub struct ConnectionPropertiesBuilder {
    url: Option<BaseUrl>,
    path: Option<String>,
    query: FormParams,
    username: Option<String>,
    password: Option<String>,
    authorization_type: Option<String>,
    cookies: Vec<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    follow_redirects: Option<bool>,
}

impl ConnectionPropertiesBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn url(mut self, url: BaseUrl) -> Self {
        self.url = Some(url);
        self
    }

    /// Sets the path appended to the base URL.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn query(mut self, query: FormParams) -> Self {
        self.query = query;
        self
    }

    /// Sets the username for the authorization header.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for the authorization header.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the authorization scheme placed before the encoded credentials.
    #[must_use]
    pub fn authorization_type(mut self, authorization_type: impl Into<String>) -> Self {
        self.authorization_type = Some(authorization_type.into());
        self
    }

    /// Adds a cookie sent with every attempt.
    #[must_use]
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    /// Sets all cookies at once.
    #[must_use]
    pub fn cookies(mut self, cookies: Vec<String>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets whether redirects are followed.
    #[must_use]
    pub const fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Builds the [`ConnectionProperties`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `url` is not set.
    pub fn build(self) -> Result<ConnectionProperties, ConfigError> {
        let url = self
            .url
            .ok_or(ConfigError::MissingRequiredField { field: "url" })?;

        Ok(ConnectionProperties {
            url,
            path: self.path,
            query: self.query,
            username: self.username,
            password: self.password,
            authorization_type: self
                .authorization_type
                .unwrap_or_else(|| DEFAULT_AUTHORIZATION_TYPE.to_string()),
            cookies: self.cookies,
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            follow_redirects: self.follow_redirects.unwrap_or(true),
        })
    }
}
