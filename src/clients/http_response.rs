//! Response decoding.
//!
//! A [`RestResponse`] wraps one completed exchange. The status code is
//! captured when the response is built, but a non-2xx status only turns into
//! an error once the body is requested through [`RestResponse::content`],
//! [`RestResponse::text`] or one of the parse methods.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;

use crate::clients::connection::{Connection, ResponseHead};
use crate::clients::errors::{HttpError, HttpStatusError};
use crate::clients::http_request::HttpMethod;
use crate::clients::parser::{JsonParser, ObjectParser};
use crate::config::Charset;
use crate::error::ConfigError;

/// 200 OK.
pub const SC_OK: u16 = 200;
/// 201 Created.
pub const SC_CREATED: u16 = 201;
/// 202 Accepted.
pub const SC_ACCEPTED: u16 = 202;
/// 204 No Content.
pub const SC_NO_CONTENT: u16 = 204;
/// 304 Not Modified.
pub const SC_NOT_MODIFIED: u16 = 304;
/// 400 Bad Request.
pub const SC_BAD_REQUEST: u16 = 400;
/// 401 Unauthorized.
pub const SC_UNAUTHORIZED: u16 = 401;
/// 403 Forbidden.
pub const SC_FORBIDDEN: u16 = 403;
/// 404 Not Found.
pub const SC_NOT_FOUND: u16 = 404;
/// 409 Conflict.
pub const SC_CONFLICT: u16 = 409;
/// 429 Too Many Requests.
pub const SC_TOO_MANY_REQUESTS: u16 = 429;
/// 500 Internal Server Error.
pub const SC_INTERNAL_ERROR: u16 = 500;
/// 502 Bad Gateway.
pub const SC_BAD_GATEWAY: u16 = 502;
/// 503 Service Unavailable.
pub const SC_UNAVAILABLE: u16 = 503;
/// 504 Gateway Timeout.
pub const SC_GATEWAY_TIMEOUT: u16 = 504;

/// Returns `true` for 2xx status codes.
#[must_use]
pub const fn is_success(status_code: u16) -> bool {
    status_code >= 200 && status_code <= 299
}

/// Extracts the `charset` parameter of a `Content-Type` header value.
///
/// Parameters are split on `;`, the key is matched case-insensitively and
/// surrounding whitespace and quotes are stripped.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::charset_from_content_type;
///
/// assert_eq!(
///     charset_from_content_type("application/json; Charset = \"ISO-8859-1\""),
///     Some("ISO-8859-1")
/// );
/// assert_eq!(charset_from_content_type("text/plain"), None);
/// ```
#[must_use]
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then_some(value)
    })
}

fn resolve_charset(headers: &HashMap<String, Vec<String>>, default: &Charset) -> Charset {
    let Some(label) = headers
        .get("content-type")
        .and_then(|values| values.first())
        .and_then(|value| charset_from_content_type(value))
    else {
        return default.clone();
    };

    Charset::new(label).unwrap_or_else(|_| {
        tracing::warn!(
            "Unsupported response charset '{}', falling back to {}",
            label,
            default
        );
        default.clone()
    })
}

/// The response to a [`RestRequest`](crate::clients::RestRequest).
///
/// The response owns its connection and releases it when
/// [`disconnect`](Self::disconnect) is called or when it is dropped.
///
/// # Content decoding
///
/// - A `Content-Encoding: gzip` body is inflated transparently.
/// - `HEAD` responses and `204`/`304` statuses have an empty body.
/// - Text is decoded with the charset named in the `Content-Type` header,
///   or the configured incoming charset when none is named.
pub struct RestResponse<C: Connection, P = JsonParser> {
    connection: C,
    method: HttpMethod,
    status_code: u16,
    headers: HashMap<String, Vec<String>>,
    charset: Charset,
    parser: Option<Arc<P>>,
    content: Option<Box<dyn Read + Send>>,
    status_error: Option<HttpStatusError>,
    disconnected: bool,
}

impl<C: Connection, P> RestResponse<C, P> {
    /// Wraps a connection whose status and headers have been read.
    ///
    /// Never fails, whatever the status.
    pub(crate) fn new(
        connection: C,
        method: HttpMethod,
        head: ResponseHead,
        default_charset: &Charset,
        parser: Option<Arc<P>>,
    ) -> Self {
        let charset = resolve_charset(&head.headers, default_charset);
        Self {
            connection,
            method,
            status_code: head.status,
            headers: head.headers,
            charset,
            parser,
            content: None,
            status_error: None,
            disconnected: false,
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns `true` if the status code is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        is_success(self.status_code)
    }

    /// Returns the method of the request that produced this response.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the charset used to decode the body.
    #[must_use]
    pub const fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Returns all response headers, keyed by lower-case name.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, Vec<String>> {
        &self.headers
    }

    /// Returns the first value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns one `name=value` entry per `Set-Cookie` header.
    ///
    /// Cookie attributes after the first `;` are dropped.
    #[must_use]
    pub fn cookies(&self) -> Vec<String> {
        self.headers
            .get("set-cookie")
            .map(|values| {
                values
                    .iter()
                    .map(|cookie| cookie.split(';').next().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns the decoded body stream.
    ///
    /// The stream is opened on first call and the same stream is returned on
    /// later calls.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Status`] if the status is not 2xx, carrying the
    /// decoded error body. Returns [`HttpError::Transport`] if the body
    /// cannot be opened.
    pub fn content(&mut self) -> Result<&mut (dyn Read + Send), HttpError> {
        self.ensure_success()?;
        let stream = match self.content.take() {
            Some(stream) => stream,
            None => self.open_content()?,
        };
        Ok(self.content.insert(stream).as_mut())
    }

    /// Reads the whole body and decodes it as text.
    ///
    /// # Errors
    ///
    /// Same as [`content`](Self::content), plus transport errors while reading.
    pub fn text(mut self) -> Result<String, HttpError> {
        let charset = self.charset.clone();
        let mut bytes = Vec::new();
        self.content()?.read_to_end(&mut bytes)?;
        self.disconnect();
        Ok(charset.decode(&bytes).into_owned())
    }

    /// Releases the connection and closes the body stream if one was opened.
    ///
    /// Calling it more than once is harmless.
    pub fn disconnect(&mut self) {
        self.content = None;
        if !self.disconnected {
            self.disconnected = true;
            self.connection.disconnect();
        }
    }

    fn ensure_success(&mut self) -> Result<(), HttpError> {
        if self.is_success() {
            return Ok(());
        }
        if let Some(error) = &self.status_error {
            return Err(error.clone().into());
        }

        let message = match self.read_error_body() {
            Ok(bytes) => self.charset.decode(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(
                    "Could not read error body for status {}: {}",
                    self.status_code,
                    e
                );
                String::new()
            }
        };
        let error = HttpStatusError {
            code: self.status_code,
            message,
        };
        tracing::debug!("Request failed with status {}", self.status_code);
        self.status_error = Some(error.clone());
        Err(error.into())
    }

    fn read_error_body(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open_content()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn open_content(&mut self) -> io::Result<Box<dyn Read + Send>> {
        if self.method == HttpMethod::Head
            || self.status_code == SC_NO_CONTENT
            || self.status_code == SC_NOT_MODIFIED
        {
            return Ok(Box::new(io::empty()));
        }

        let raw = self.connection.response_body()?;
        if self.is_gzip() {
            Ok(Box::new(GzDecoder::new(raw)))
        } else {
            Ok(raw)
        }
    }

    fn is_gzip(&self) -> bool {
        self.headers
            .get("content-encoding")
            .into_iter()
            .flatten()
            .flat_map(|value| value.split(','))
            .any(|coding| {
                let coding = coding.trim();
                coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip")
            })
    }
}

impl<C: Connection, P: ObjectParser> RestResponse<C, P> {
    /// Deserializes the body as a single `T`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Status`] for a non-2xx status,
    /// [`HttpError::Config`] if no parser was configured, and
    /// [`HttpError::Parse`] if the body cannot be deserialized.
    pub fn parse_as<T: DeserializeOwned>(mut self) -> Result<T, HttpError> {
        let (parser, charset) = self.parser_and_charset()?;
        let value = parser.deserialize(self.content()?, &charset)?;
        self.disconnect();
        Ok(value)
    }

    /// Deserializes the body as a list of `T`.
    ///
    /// # Errors
    ///
    /// Same as [`parse_as`](Self::parse_as).
    pub fn parse_as_list<T: DeserializeOwned>(mut self) -> Result<Vec<T>, HttpError> {
        let (parser, charset) = self.parser_and_charset()?;
        let values = parser.deserialize_list(self.content()?, &charset)?;
        self.disconnect();
        Ok(values)
    }

    fn parser_and_charset(&mut self) -> Result<(Arc<P>, Charset), HttpError> {
        self.ensure_success()?;
        let parser = self
            .parser
            .clone()
            .ok_or(ConfigError::MissingObjectParser)?;
        Ok((parser, self.charset.clone()))
    }
}

impl<C: Connection, P> Drop for RestResponse<C, P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<C: Connection, P> fmt::Debug for RestResponse<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestResponse")
            .field("method", &self.method)
            .field("status_code", &self.status_code)
            .field("headers", &self.headers)
            .field("charset", &self.charset)
            .field("content_opened", &self.content.is_some())
            .field("disconnected", &self.disconnected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::connection::mock::{MockConnection, MockFactory, Step};
    use crate::clients::connection::ConnectionFactory;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde::Deserialize;
    use std::io::Write;

    fn response(
        factory: &MockFactory,
        method: HttpMethod,
        default_charset: &Charset,
    ) -> RestResponse<MockConnection> {
        let mut connection = factory.create_connection(method).unwrap();
        let head = connection.read_response().unwrap();
        RestResponse::new(
            connection,
            method,
            head,
            default_charset,
            Some(Arc::new(JsonParser)),
        )
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_is_success_for_2xx_only() {
        assert!(is_success(SC_OK));
        assert!(is_success(299));
        assert!(!is_success(199));
        assert!(!is_success(SC_NOT_MODIFIED));
        assert!(!is_success(SC_UNAVAILABLE));
    }

    #[test]
    fn test_charset_from_content_type_variants() {
        assert_eq!(
            charset_from_content_type("text/html;charset=utf-8"),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_content_type("text/html; boundary=x ; CHARSET=Shift_JIS"),
            Some("Shift_JIS")
        );
        assert_eq!(charset_from_content_type("text/html; charset="), None);
        assert_eq!(charset_from_content_type("charset=utf-8"), None);
    }

    #[test]
    fn test_header_charset_wins_over_default() {
        let head = ResponseHead::new(200)
            .with_header("Content-Type", "application/json; charset=ISO-8859-1");
        let factory = MockFactory::new([Step::Respond(head, b"\"Montr\xe9al\"".to_vec())]);

        let response = response(&factory, HttpMethod::Get, &Charset::utf8());
        assert_eq!(response.charset().name(), "ISO-8859-1");
        assert_eq!(response.text().unwrap(), "\"Montréal\"");
    }

    #[test]
    fn test_unknown_header_charset_falls_back_to_default() {
        let head =
            ResponseHead::new(200).with_header("Content-Type", "text/plain; charset=x-klingon");
        let factory = MockFactory::new([Step::Respond(head, b"ok".to_vec())]);
        let default = Charset::new("windows-1252").unwrap();

        let response = response(&factory, HttpMethod::Get, &default);
        assert_eq!(response.charset(), &default);
    }

    #[test]
    fn test_status_is_available_without_raising() {
        let factory = MockFactory::new([Step::body(404, b"missing")]);
        let response = response(&factory, HttpMethod::Get, &Charset::utf8());

        assert_eq!(response.status_code(), SC_NOT_FOUND);
        assert!(!response.is_success());
    }

    #[test]
    fn test_content_raises_status_error_with_body() {
        let factory = MockFactory::new([Step::body(404, b"no such widget")]);
        let mut response = response(&factory, HttpMethod::Get, &Charset::utf8());

        let error = response.content().err().unwrap();
        match error {
            HttpError::Status(status) => {
                assert_eq!(status.code, 404);
                assert_eq!(status.message, "no such widget");
            }
            other => panic!("Expected Status error, got: {other:?}"),
        }

        // Raising again reuses the message instead of re-reading the stream.
        let error = response.content().err().unwrap();
        assert_eq!(error.status_code(), Some(404));
        assert_eq!(error.to_string(), "(404) no such widget");
    }

    #[test]
    fn test_gzip_error_body_is_decoded() {
        let head = ResponseHead::new(500).with_header("Content-Encoding", "gzip");
        let factory = MockFactory::new([Step::Respond(head, gzip(b"boom"))]);
        let response = response(&factory, HttpMethod::Get, &Charset::utf8());

        let error = response.text().unwrap_err();
        assert_eq!(error.to_string(), "(500) boom");
    }

    #[test]
    fn test_unreadable_error_body_keeps_status() {
        let head = ResponseHead::new(502).with_header("Content-Encoding", "gzip");
        let factory = MockFactory::new([Step::Respond(head, Vec::new())]);
        let response = response(&factory, HttpMethod::Get, &Charset::utf8());

        let error = response.text().unwrap_err();
        assert!(matches!(
            error,
            HttpError::Status(HttpStatusError { code: 502, ref message }) if message.is_empty()
        ));
        assert_eq!(error.status_code(), Some(502));
    }

    #[test]
    fn test_gzip_content_is_transparent() {
        let plain = b"{\"name\":\"widget\"}".repeat(20);
        let head = ResponseHead::new(200).with_header("content-encoding", "gzip");
        let factory = MockFactory::new([
            Step::Respond(head, gzip(&plain)),
            Step::body(200, &plain),
        ]);

        let gzipped = response(&factory, HttpMethod::Get, &Charset::utf8())
            .text()
            .unwrap();
        let uncompressed = response(&factory, HttpMethod::Get, &Charset::utf8())
            .text()
            .unwrap();
        assert_eq!(gzipped, uncompressed);
    }

    #[test]
    fn test_content_is_memoized() {
        let factory = MockFactory::new([Step::body(200, b"abcdef")]);
        let mut response = response(&factory, HttpMethod::Get, &Charset::utf8());

        let mut first = [0u8; 3];
        response.content().unwrap().read_exact(&mut first).unwrap();
        let mut rest = String::new();
        response.content().unwrap().read_to_string(&mut rest).unwrap();

        assert_eq!(&first, b"abc");
        assert_eq!(rest, "def");
    }

    #[test]
    fn test_head_and_no_content_have_empty_body() {
        let factory = MockFactory::new([Step::body(200, b"ignored"), Step::body(204, b"junk")]);

        let head = response(&factory, HttpMethod::Head, &Charset::utf8());
        assert_eq!(head.text().unwrap(), "");
        let no_content = response(&factory, HttpMethod::Delete, &Charset::utf8());
        assert_eq!(no_content.text().unwrap(), "");
    }

    #[test]
    fn test_cookies_keep_name_value_only() {
        let head = ResponseHead::new(200)
            .with_header("Set-Cookie", "session=abc; Path=/; HttpOnly")
            .with_header("Set-Cookie", "theme=dark");
        let factory = MockFactory::new([Step::Respond(head, Vec::new())]);
        let response = response(&factory, HttpMethod::Get, &Charset::utf8());

        assert_eq!(response.cookies(), vec!["session=abc", "theme=dark"]);
    }

    #[test]
    fn test_parse_as_and_parse_as_list() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Widget {
            id: u32,
        }

        let factory = MockFactory::new([
            Step::body(200, br#"{"id":7}"#),
            Step::body(200, br#"[{"id":1},{"id":2}]"#),
        ]);

        let widget: Widget = response(&factory, HttpMethod::Get, &Charset::utf8())
            .parse_as()
            .unwrap();
        assert_eq!(widget, Widget { id: 7 });

        let widgets: Vec<Widget> = response(&factory, HttpMethod::Get, &Charset::utf8())
            .parse_as_list()
            .unwrap();
        assert_eq!(widgets, vec![Widget { id: 1 }, Widget { id: 2 }]);
    }

    #[test]
    fn test_parse_without_parser_is_config_error() {
        let factory = MockFactory::new([Step::body(200, b"{}")]);
        let mut connection = factory.create_connection(HttpMethod::Get).unwrap();
        let head = connection.read_response().unwrap();
        let response: RestResponse<_, JsonParser> =
            RestResponse::new(connection, HttpMethod::Get, head, &Charset::utf8(), None);

        let error = response.parse_as::<serde_json::Value>().unwrap_err();
        assert!(matches!(
            error,
            HttpError::Config(ConfigError::MissingObjectParser)
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent_and_runs_on_drop() {
        let factory = MockFactory::new([Step::body(200, b"x"), Step::body(200, b"y")]);

        let mut first = response(&factory, HttpMethod::Get, &Charset::utf8());
        first.disconnect();
        first.disconnect();
        drop(first);
        assert_eq!(factory.disconnects(), 1);

        drop(response(&factory, HttpMethod::Get, &Charset::utf8()));
        assert_eq!(factory.disconnects(), 2);
    }
}
