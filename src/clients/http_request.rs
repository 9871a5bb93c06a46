//! Request-side types: the HTTP verb and the body payload.

use std::fmt;

use serde::Serialize;

use crate::clients::entity::Entity;
use crate::clients::form::FormParams;
use crate::config::RequestConfig;

/// HTTP methods supported by [`RestRequest`](crate::clients::RestRequest).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP HEAD; the response never has a body.
    Head,
    /// HTTP GET.
    Get,
    /// HTTP PUT.
    Put,
    /// HTTP POST.
    Post,
    /// HTTP DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method token as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body of a request.
///
/// The payload borrows its data, so a request can be retried without the
/// caller handing the body over again.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::{FormParams, Payload};
///
/// let text = Payload::text("hello");
/// assert!(!text.is_empty());
///
/// let form: FormParams = [("q", "rust")].into_iter().collect();
/// let form = Payload::form(&form);
/// assert!(!form.is_empty());
///
/// #[derive(serde::Serialize)]
/// struct Widget {
///     id: u32,
/// }
/// let widget = Widget { id: 1 };
/// let object = Payload::object(&widget);
/// assert!(!object.is_empty());
/// ```
#[derive(Debug)]
pub enum Payload<'a, T: ?Sized = ()> {
    /// No body.
    Empty,
    /// Raw bytes written as-is.
    Bytes(&'a [u8]),
    /// Text encoded with the outgoing charset.
    Text(&'a str),
    /// Form parameters, `application/x-www-form-urlencoded`.
    Form(&'a FormParams),
    /// A `multipart/form-data` body.
    Multipart(&'a [Entity]),
    /// An object written by the configured object parser.
    Object(&'a T),
}

impl<'a> Payload<'a, ()> {
    /// A request without a body.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// Raw bytes.
    #[must_use]
    pub const fn bytes(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }

    /// Text.
    #[must_use]
    pub const fn text(text: &'a str) -> Self {
        Self::Text(text)
    }

    /// Form parameters.
    #[must_use]
    pub const fn form(params: &'a FormParams) -> Self {
        Self::Form(params)
    }

    /// Multipart entities.
    #[must_use]
    pub const fn multipart(entities: &'a [Entity]) -> Self {
        Self::Multipart(entities)
    }
}

impl<'a, T: Serialize + ?Sized> Payload<'a, T> {
    /// An application object.
    #[must_use]
    pub const fn object(object: &'a T) -> Self {
        Self::Object(object)
    }
}

impl<T: ?Sized> Payload<'_, T> {
    /// Returns `true` if there is no body to send.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the `Content-Type` header for this payload, if it has a body.
    ///
    /// Form bodies always use `application/x-www-form-urlencoded` and
    /// multipart bodies carry their boundary. Everything else uses the
    /// configured content type.
    #[must_use]
    pub fn content_type(&self, config: &RequestConfig, boundary: &str) -> Option<String> {
        let charset = config.outgoing_charset();
        match self {
            Self::Empty => None,
            Self::Form(_) => Some(format!(
                "application/x-www-form-urlencoded;charset={charset}"
            )),
            Self::Multipart(_) => Some(format!("multipart/form-data;boundary={boundary}")),
            Self::Bytes(_) | Self::Text(_) | Self::Object(_) => {
                Some(format!("{};charset={charset}", config.content_type()))
            }
        }
    }
}
