//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::{mem, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use reqwest::Url;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Path separator used when joining a base URL with a request path.
pub const PATH_SEPARATOR: &str = "/";

/// Labels that name ISO-8859-1 itself rather than windows-1252.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859-1:1987",
    "iso-ir-100",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// Replacement byte for characters ISO-8859-1 cannot represent.
const LATIN1_REPLACEMENT: u8 = b'?';

/// A validated character set.
///
/// The label is kept exactly as it was given (so `ISO-8859-1` is still sent
/// and reported as `ISO-8859-1`), while the encoding used to transcode text
/// is resolved once on construction.
///
/// Labels are resolved with the WHATWG table from `encoding_rs`, with one
/// exception: the ISO-8859-1 aliases (`latin1`, `l1`, `cp819`, ...) map to
/// windows-1252 there, which disagrees with ISO-8859-1 on bytes `0x80..=0x9F`.
/// Those labels are transcoded as true ISO-8859-1 instead, where every byte
/// is the code point of the same value. [`Charset::encoding`] still reports
/// windows-1252 for them.
///
/// UTF-16LE and UTF-16BE are encoded as UTF-16 code units; `encoding_rs`
/// only decodes them.
///
/// # Example
///
/// ```rust
/// use bare_connection::Charset;
///
/// let charset = Charset::new("ISO-8859-1").unwrap();
/// assert_eq!(charset.name(), "ISO-8859-1");
/// assert_eq!(charset.encode("café").as_ref(), b"caf\xe9");
/// ```
#[derive(Clone, Debug)]
pub struct Charset {
    label: String,
    encoding: &'static Encoding,
    latin1: bool,
}

impl Charset {
    /// Creates a new validated charset from a label such as `UTF-8`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedCharset`] if the label is unknown.
    pub fn new(label: impl Into<String>) -> Result<Self, ConfigError> {
        let label = label.into();
        let label = label.trim().to_string();
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ConfigError::UnsupportedCharset {
                charset: label.clone(),
            })?;
        let latin1 = LATIN1_LABELS
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(&label));
        Ok(Self {
            label,
            encoding,
            latin1,
        })
    }

    /// Returns the UTF-8 charset.
    #[must_use]
    pub fn utf8() -> Self {
        Self {
            label: "UTF-8".to_string(),
            encoding: UTF_8,
            latin1: false,
        }
    }

    /// Returns the label this charset was created with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.label
    }

    /// Returns the resolved encoding.
    #[must_use]
    pub const fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Encodes text into bytes of this charset.
    ///
    /// Characters that cannot be represented are replaced with numeric
    /// character references, or with `?` for ISO-8859-1.
    #[must_use]
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        if self.latin1 {
            return encode_latin1(text);
        }
        if self.encoding == UTF_16LE {
            return Cow::Owned(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        }
        if self.encoding == UTF_16BE {
            return Cow::Owned(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
        }
        let (bytes, _, _) = self.encoding.encode(text);
        bytes
    }

    /// Decodes bytes of this charset into text, replacing malformed sequences.
    #[must_use]
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        if self.latin1 {
            return mem::decode_latin1(bytes);
        }
        self.encoding.decode_without_bom_handling(bytes).0
    }
}

fn encode_latin1(text: &str) -> Cow<'_, [u8]> {
    if text.is_ascii() {
        return Cow::Borrowed(text.as_bytes());
    }
    Cow::Owned(
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(LATIN1_REPLACEMENT))
            .collect(),
    )
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.label.eq_ignore_ascii_case(&other.label)
    }
}

impl Eq for Charset {}

impl AsRef<str> for Charset {
    fn as_ref(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl Serialize for Charset {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(de::Error::custom)
    }
}

/// A validated base URL for a REST service.
///
/// The URL must parse as an absolute URL with a host. The original text is
/// kept for joining, so a trailing slash is neither added nor removed.
///
/// # Example
///
/// ```rust
/// use bare_connection::BaseUrl;
///
/// let url = BaseUrl::new("https://api.example.com").unwrap();
/// assert_eq!(url.as_ref(), "https://api.example.com");
/// assert_eq!(url.join("v1/items"), "https://api.example.com/v1/items");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl {
    url: String,
}

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the URL does not parse or has no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().to_string();
        match Url::parse(&url) {
            Ok(parsed) if parsed.has_host() => Ok(Self { url }),
            _ => Err(ConfigError::InvalidUrl { url }),
        }
    }

    /// Appends a path to this URL.
    ///
    /// Exactly one separator ends up between the URL and the path. An empty
    /// path leaves the URL untouched.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        let mut url = self.url.clone();
        if !path.is_empty() {
            match (url.ends_with(PATH_SEPARATOR), path.starts_with(PATH_SEPARATOR)) {
                (true, true) => url.push_str(&path[PATH_SEPARATOR.len()..]),
                (false, false) => {
                    url.push_str(PATH_SEPARATOR);
                    url.push_str(path);
                }
                _ => url.push_str(path),
            }
        }
        url
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
