//! Object serialization boundary.
//!
//! The request loop never knows the wire format of application objects. It
//! hands them to an [`ObjectParser`], and the response hands its content back
//! to the same parser. [`JsonParser`] is the `serde_json` implementation.
//!
//! Streams passed to a parser are taken by value and dropped when the parser
//! is done with them.

use std::io::{BufReader, Read, Write};

use encoding_rs::UTF_8;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::Charset;

/// Error returned by an [`ObjectParser`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Reading or writing the stream failed.
    #[error("I/O error while parsing: {0}")]
    Io(#[from] std::io::Error),

    /// The body was not valid JSON for the requested type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes outgoing objects and deserializes response bodies.
pub trait ObjectParser: Send + Sync {
    /// Writes `object` to `sink`, encoded with `charset`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the object cannot be serialized or written.
    fn serialize<T, W>(&self, object: &T, sink: &mut W, charset: &Charset) -> Result<(), ParseError>
    where
        T: Serialize + ?Sized,
        W: Write + ?Sized;

    /// Reads one object of type `T` from `stream`, decoded with `charset`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the stream cannot be read or parsed.
    fn deserialize<T, R>(&self, stream: R, charset: &Charset) -> Result<T, ParseError>
    where
        T: DeserializeOwned,
        R: Read;

    /// Reads a sequence of `T` from `stream`, decoded with `charset`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the stream cannot be read or parsed.
    fn deserialize_list<T, R>(&self, stream: R, charset: &Charset) -> Result<Vec<T>, ParseError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        self.deserialize(stream, charset)
    }
}

/// JSON object parser backed by `serde_json`.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::{JsonParser, ObjectParser};
/// use bare_connection::Charset;
///
/// let parser = JsonParser;
/// let mut out = Vec::new();
/// parser.serialize(&vec![1, 2, 3], &mut out, &Charset::utf8()).unwrap();
/// assert_eq!(out, b"[1,2,3]");
///
/// let values: Vec<u32> = parser.deserialize_list(out.as_slice(), &Charset::utf8()).unwrap();
/// assert_eq!(values, vec![1, 2, 3]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonParser;

impl ObjectParser for JsonParser {
    fn serialize<T, W>(&self, object: &T, sink: &mut W, charset: &Charset) -> Result<(), ParseError>
    where
        T: Serialize + ?Sized,
        W: Write + ?Sized,
    {
        let json = serde_json::to_string(object)?;
        sink.write_all(&charset.encode(&json))?;
        sink.flush()?;
        Ok(())
    }

    fn deserialize<T, R>(&self, mut stream: R, charset: &Charset) -> Result<T, ParseError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        if charset.encoding() == UTF_8 {
            return Ok(serde_json::from_reader(BufReader::new(stream))?);
        }
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(serde_json::from_str(&charset.decode(&bytes))?)
    }
}
