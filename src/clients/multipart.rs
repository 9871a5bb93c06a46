//! `multipart/form-data` body encoding.
//!
//! The encoder writes a byte-exact body for a list of [`Entity`] parts:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{field}"[; filename="{name}"]\r\n
//! Content-Type: {type}\r\n
//! [Content-Transfer-Encoding: binary\r\n]
//! \r\n
//! {body}\r\n
//! ...
//! --{boundary}--\r\n
//! ```
//!
//! File contents are streamed from disk rather than buffered.

use std::fs::File;
use std::io::{self, Write};

use chrono::Utc;

use crate::clients::entity::{Entity, EntityContent};
use crate::config::Charset;

/// Line terminator used throughout the body.
pub const CRLF: &str = "\r\n";

/// Content type used when a binary file's extension is unknown.
pub const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns a fresh boundary token: the current epoch milliseconds in lower-case hex.
#[must_use]
pub fn generate_boundary() -> String {
    format!("{:x}", Utc::now().timestamp_millis())
}

/// Writes entities as a multipart form body.
#[derive(Clone, Copy, Debug)]
pub struct MultipartEncoder<'a> {
    entities: &'a [Entity],
}

impl<'a> MultipartEncoder<'a> {
    /// Creates an encoder over the given parts, kept in order.
    #[must_use]
    pub const fn new(entities: &'a [Entity]) -> Self {
        Self { entities }
    }

    /// Writes the whole body to `out` and flushes it.
    ///
    /// Header lines and text values are encoded with `charset`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file cannot be read or the sink rejects a write.
    pub fn write_to<W: Write + ?Sized>(
        &self,
        out: &mut W,
        charset: &Charset,
        boundary: &str,
    ) -> io::Result<()> {
        for entity in self.entities {
            write_text(out, charset, &format!("--{boundary}{CRLF}"))?;
            write_text(out, charset, &content_disposition(entity))?;

            match entity.content() {
                EntityContent::Text(value) => {
                    write_text(
                        out,
                        charset,
                        &format!("Content-Type: text/plain; charset={}{CRLF}", entity.charset()),
                    )?;
                    write_text(out, charset, CRLF)?;
                    write_text(out, charset, value)?;
                }
                EntityContent::TextFile(path) => {
                    write_text(
                        out,
                        charset,
                        &format!("Content-Type: text/plain; charset={}{CRLF}", entity.charset()),
                    )?;
                    write_text(out, charset, CRLF)?;
                    copy_file(out, &mut File::open(path)?)?;
                }
                EntityContent::BinaryFile(path) => {
                    let content_type = mime_guess::from_path(path)
                        .first_raw()
                        .unwrap_or(DEFAULT_BINARY_CONTENT_TYPE);
                    write_text(out, charset, &format!("Content-Type: {content_type}{CRLF}"))?;
                    write_text(out, charset, &format!("Content-Transfer-Encoding: binary{CRLF}"))?;
                    write_text(out, charset, CRLF)?;
                    copy_file(out, &mut File::open(path)?)?;
                }
            }

            // Ends the part; the next boundary must start on its own line.
            write_text(out, charset, CRLF)?;
        }

        write_text(out, charset, &format!("--{boundary}--{CRLF}"))?;
        out.flush()
    }
}

fn content_disposition(entity: &Entity) -> String {
    entity.file_name().map_or_else(
        || format!("Content-Disposition: form-data; name=\"{}\"{CRLF}", entity.field_name()),
        |file_name| {
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"{CRLF}",
                entity.field_name()
            )
        },
    )
}

fn write_text<W: Write + ?Sized>(out: &mut W, charset: &Charset, text: &str) -> io::Result<()> {
    out.write_all(&charset.encode(text))
}

fn copy_file<W: Write + ?Sized>(out: &mut W, file: &mut File) -> io::Result<()> {
    io::copy(file, out)?;
    out.flush()
}
