//! Request execution with retries and back-off.
//!
//! [`RestRequest`] runs one logical request as one or more attempts. Each
//! attempt gets a fresh connection from the [`ConnectionFactory`]. An attempt
//! is repeated when:
//!
//! - the transport fails and `retry_on_transport_error` is set, or
//! - the configured [`BackOffPolicy`] flags the response status and agrees
//!   to back off.
//!
//! At most `max_retry_attempts + 1` attempts are made.

use std::io;
use std::sync::Arc;

use serde::Serialize;

use crate::clients::backoff::BackOffPolicy;
use crate::clients::connection::{Connection, ConnectionFactory, ResponseHead};
use crate::clients::errors::{HttpError, MisuseError};
use crate::clients::http_request::{HttpMethod, Payload};
use crate::clients::http_response::RestResponse;
use crate::clients::multipart::{generate_boundary, MultipartEncoder};
use crate::clients::parser::{JsonParser, ObjectParser, ParseError};
use crate::config::RequestConfig;
use crate::error::ConfigError;

/// Header listing the charsets the response may use.
pub const ACCEPT_CHARSET_HEADER: &str = "Accept-Charset";

/// Header listing the content codings the response may use.
pub const ACCEPT_ENCODING_HEADER: &str = "Accept-Encoding";

/// Header describing the request body.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// A single-use HTTP request.
///
/// Call exactly one of [`execute`](Self::execute), [`head`](Self::head),
/// [`get`](Self::get), [`put`](Self::put), [`post`](Self::post) or
/// [`delete`](Self::delete). A second call returns
/// [`MisuseError::AlreadyExecuted`].
///
/// # Example
///
/// ```rust,no_run
/// use bare_connection::clients::{
///     ExponentialBackOffPolicy, Payload, ReqwestConnectionFactory, RestRequest,
/// };
/// use bare_connection::{BaseUrl, ConnectionProperties, RequestConfig};
///
/// #[derive(serde::Deserialize)]
/// struct Widget {
///     id: u64,
/// }
///
/// let properties = ConnectionProperties::builder()
///     .url(BaseUrl::new("https://api.example.com").unwrap())
///     .path("widgets")
///     .build()
///     .unwrap();
///
/// let mut request = RestRequest::builder(ReqwestConnectionFactory::new(properties).unwrap())
///     .config(RequestConfig::builder().max_retry_attempts(3).build())
///     .back_off_policy(ExponentialBackOffPolicy::default())
///     .build();
///
/// let widgets: Vec<Widget> = request.get().unwrap().parse_as_list().unwrap();
/// ```
pub struct RestRequest<F, P = JsonParser> {
    factory: F,
    parser: Option<Arc<P>>,
    back_off_policy: Option<Box<dyn BackOffPolicy>>,
    config: RequestConfig,
    executed: bool,
}

impl<F: ConnectionFactory> RestRequest<F> {
    /// Creates a builder using `factory` for connections.
    ///
    /// The builder starts with the JSON parser, no back-off policy and the
    /// default [`RequestConfig`].
    #[must_use]
    pub fn builder(factory: F) -> RestRequestBuilder<F> {
        RestRequestBuilder::new(factory)
    }
}

impl<F: ConnectionFactory, P: ObjectParser> RestRequest<F, P> {
    /// Returns the request configuration.
    #[must_use]
    pub const fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Returns `true` once a verb method has been called.
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        self.executed
    }

    /// Sends a `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn head(&mut self) -> Result<RestResponse<F::Connection, P>, HttpError> {
        self.execute(HttpMethod::Head, &Payload::empty())
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn get(&mut self) -> Result<RestResponse<F::Connection, P>, HttpError> {
        self.execute(HttpMethod::Get, &Payload::empty())
    }

    /// Sends a `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn delete(&mut self) -> Result<RestResponse<F::Connection, P>, HttpError> {
        self.execute(HttpMethod::Delete, &Payload::empty())
    }

    /// Sends a `PUT` request with `payload`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn put<T: Serialize + ?Sized>(
        &mut self,
        payload: &Payload<'_, T>,
    ) -> Result<RestResponse<F::Connection, P>, HttpError> {
        self.execute(HttpMethod::Put, payload)
    }

    /// Sends a `POST` request with `payload`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn post<T: Serialize + ?Sized>(
        &mut self,
        payload: &Payload<'_, T>,
    ) -> Result<RestResponse<F::Connection, P>, HttpError> {
        self.execute(HttpMethod::Post, payload)
    }

    /// Runs the request, retrying as configured.
    ///
    /// A non-2xx status is not an error here; it is raised when the body of
    /// the returned response is read.
    ///
    /// # Errors
    ///
    /// - [`HttpError::Misuse`] if the request already ran.
    /// - [`HttpError::Config`] if an object payload is given without a parser.
    /// - [`HttpError::Transport`] if the last attempt failed in transport.
    /// - [`HttpError::Parse`] if the payload object cannot be serialized.
    pub fn execute<T: Serialize + ?Sized>(
        &mut self,
        method: HttpMethod,
        payload: &Payload<'_, T>,
    ) -> Result<RestResponse<F::Connection, P>, HttpError> {
        if self.executed {
            return Err(MisuseError::AlreadyExecuted.into());
        }
        self.executed = true;

        if matches!(payload, Payload::Object(_)) && self.parser.is_none() {
            return Err(ConfigError::MissingObjectParser.into());
        }
        if let Some(policy) = self.back_off_policy.as_mut() {
            policy.reset();
        }

        let max_retry_attempts = self.config.max_retry_attempts();
        let mut attempts: u32 = 0;
        loop {
            let retry_allowed = attempts < max_retry_attempts;
            attempts += 1;
            tracing::debug!("Sending {} request, attempt {}", method, attempts);

            let head = self
                .factory
                .create_connection(method)
                .map_err(AttemptError::Transport)
                .and_then(|mut connection| {
                    match self.send(&mut connection, payload) {
                        Ok(head) => Ok((connection, head)),
                        Err(error) => {
                            connection.disconnect();
                            Err(error)
                        }
                    }
                });

            let (connection, head) = match head {
                Ok(exchange) => exchange,
                Err(AttemptError::Transport(error)) => {
                    if retry_allowed && self.config.retry_on_transport_error() {
                        tracing::warn!(
                            "{} request failed in transport on attempt {}, retrying: {}",
                            method,
                            attempts,
                            error
                        );
                        continue;
                    }
                    return Err(HttpError::Transport(error));
                }
                Err(AttemptError::Fatal(error)) => return Err(error),
            };

            let response = RestResponse::new(
                connection,
                method,
                head,
                self.config.incoming_charset(),
                self.parser.clone(),
            );

            if retry_allowed {
                if let Some(policy) = self.back_off_policy.as_mut() {
                    let status = response.status_code();
                    if policy.is_back_off_required(status) {
                        tracing::warn!(
                            "{} request returned status {} on attempt {}, backing off",
                            method,
                            status,
                            attempts
                        );
                        if policy.back_off() {
                            continue;
                        }
                    }
                }
            }

            return Ok(response);
        }
    }

    fn send<T: Serialize + ?Sized>(
        &self,
        connection: &mut F::Connection,
        payload: &Payload<'_, T>,
    ) -> Result<ResponseHead, AttemptError> {
        let boundary = match payload {
            Payload::Multipart(_) => generate_boundary(),
            _ => String::new(),
        };

        connection.set_request_header(
            ACCEPT_CHARSET_HEADER,
            self.config.incoming_charset().name(),
        );
        connection.set_request_header(ACCEPT_ENCODING_HEADER, "gzip");
        if let Some(content_type) = payload.content_type(&self.config, &boundary) {
            connection.set_request_header(CONTENT_TYPE_HEADER, &content_type);
        }

        if !payload.is_empty() {
            self.write_body(connection, payload, &boundary)?;
        }
        Ok(connection.read_response()?)
    }

    fn write_body<T: Serialize + ?Sized>(
        &self,
        connection: &mut F::Connection,
        payload: &Payload<'_, T>,
        boundary: &str,
    ) -> Result<(), AttemptError> {
        let charset = self.config.outgoing_charset();
        let out = connection.request_body()?;
        match payload {
            Payload::Empty => {}
            Payload::Bytes(bytes) => out.write_all(bytes)?,
            Payload::Text(text) => out.write_all(&charset.encode(text))?,
            Payload::Form(params) => out.write_all(params.encode(charset).as_bytes())?,
            Payload::Multipart(entities) => {
                MultipartEncoder::new(entities).write_to(out, charset, boundary)?;
            }
            Payload::Object(object) => {
                let parser = self
                    .parser
                    .as_ref()
                    .ok_or(AttemptError::Fatal(ConfigError::MissingObjectParser.into()))?;
                parser.serialize(*object, out, charset)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

impl<F, P> std::fmt::Debug for RestRequest<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRequest")
            .field("config", &self.config)
            .field("has_parser", &self.parser.is_some())
            .field("has_back_off_policy", &self.back_off_policy.is_some())
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

/// Failure of one attempt.
enum AttemptError {
    /// May be retried when `retry_on_transport_error` is set.
    Transport(io::Error),
    /// Never retried.
    Fatal(HttpError),
}

impl From<io::Error> for AttemptError {
    fn from(error: io::Error) -> Self {
        Self::Transport(error)
    }
}

impl From<ParseError> for AttemptError {
    fn from(error: ParseError) -> Self {
        match error {
            // A failed write while serializing is a transport failure.
            ParseError::Io(error) => Self::Transport(error),
            other => Self::Fatal(other.into()),
        }
    }
}

/// Builder for [`RestRequest`].
pub struct RestRequestBuilder<F, P = JsonParser> {
    factory: F,
    parser: Option<P>,
    back_off_policy: Option<Box<dyn BackOffPolicy>>,
    config: RequestConfig,
}

impl<F: ConnectionFactory> RestRequestBuilder<F> {
    /// Creates a builder with the JSON parser and default configuration.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            parser: Some(JsonParser),
            back_off_policy: None,
            config: RequestConfig::default(),
        }
    }
}

impl<F: ConnectionFactory, P: ObjectParser> RestRequestBuilder<F, P> {
    /// Replaces the object parser.
    #[must_use]
    pub fn parser<Q: ObjectParser>(self, parser: Q) -> RestRequestBuilder<F, Q> {
        RestRequestBuilder {
            factory: self.factory,
            parser: Some(parser),
            back_off_policy: self.back_off_policy,
            config: self.config,
        }
    }

    /// Removes the object parser.
    ///
    /// Object payloads and [`RestResponse::parse_as`] then fail with
    /// [`ConfigError::MissingObjectParser`].
    #[must_use]
    pub fn without_parser(mut self) -> Self {
        self.parser = None;
        self
    }

    /// Sets the back-off policy consulted for retryable statuses.
    #[must_use]
    pub fn back_off_policy(mut self, policy: impl BackOffPolicy + 'static) -> Self {
        self.back_off_policy = Some(Box::new(policy));
        self
    }

    /// Sets the request configuration.
    #[must_use]
    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> RestRequest<F, P> {
        RestRequest {
            factory: self.factory,
            parser: self.parser.map(Arc::new),
            back_off_policy: self.back_off_policy,
            config: self.config,
            executed: false,
        }
    }
}
