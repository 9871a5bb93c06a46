//! Parts of a multipart form body.
//!
//! An [`Entity`] is one named part: a literal text value, a text file, or a
//! binary file. Entities are immutable once built and are only read while the
//! body is written.

use std::path::{Path, PathBuf};

use crate::config::Charset;

/// Form field name used for every text-file part.
pub const TEXT_FILE_FIELD: &str = "textFile";

/// Form field name used for every binary-file part.
pub const BINARY_FILE_FIELD: &str = "binaryFile";

/// The payload carried by an [`Entity`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityContent {
    /// A literal text value.
    Text(String),
    /// A text file, read from disk when the body is written.
    TextFile(PathBuf),
    /// A binary file, read from disk when the body is written.
    BinaryFile(PathBuf),
}

/// One named part of a multipart form body.
///
/// # Example
///
/// ```rust
/// use bare_connection::clients::Entity;
/// use bare_connection::Charset;
///
/// let parts = vec![
///     Entity::text("title", "Holiday"),
///     Entity::text("note", "été").with_charset(Charset::new("ISO-8859-1").unwrap()),
///     Entity::binary_file("beach.png", "/tmp/beach.png"),
/// ];
///
/// assert_eq!(parts[0].field_name(), "title");
/// assert_eq!(parts[2].field_name(), "binaryFile");
/// assert_eq!(parts[2].file_name(), Some("beach.png"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    name: String,
    charset: Charset,
    content: EntityContent,
}

impl Entity {
    /// Creates a text value part.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_content(name, EntityContent::Text(value.into()))
    }

    /// Creates a text file part. The file must be saved in the part's charset.
    #[must_use]
    pub fn text_file(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::with_content(name, EntityContent::TextFile(file.into()))
    }

    /// Creates a binary file part.
    #[must_use]
    pub fn binary_file(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self::with_content(name, EntityContent::BinaryFile(file.into()))
    }

    fn with_content(name: impl Into<String>, content: EntityContent) -> Self {
        Self {
            name: name.into(),
            charset: Charset::utf8(),
            content,
        }
    }

    /// Returns this part with a different charset.
    #[must_use]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Returns the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the part charset.
    #[must_use]
    pub const fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Returns the payload.
    #[must_use]
    pub const fn content(&self) -> &EntityContent {
        &self.content
    }

    /// Returns the referenced file, if this is a file part.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        match &self.content {
            EntityContent::Text(_) => None,
            EntityContent::TextFile(path) | EntityContent::BinaryFile(path) => Some(path.as_path()),
        }
    }

    /// Returns the `name` parameter of the part's `Content-Disposition`.
    ///
    /// File parts always use a fixed field name; their own name is sent as
    /// the `filename` parameter instead.
    #[must_use]
    pub fn field_name(&self) -> &str {
        match &self.content {
            EntityContent::Text(_) => &self.name,
            EntityContent::TextFile(_) => TEXT_FILE_FIELD,
            EntityContent::BinaryFile(_) => BINARY_FILE_FIELD,
        }
    }

    /// Returns the `filename` parameter, present only for file parts.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file().map(|_| self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_entity_uses_own_name_as_field() {
        let entity = Entity::text("comment", "hello");
        assert_eq!(entity.field_name(), "comment");
        assert!(entity.file_name().is_none());
        assert!(entity.file().is_none());
        assert_eq!(entity.content(), &EntityContent::Text("hello".to_string()));
    }

    #[test]
    fn test_file_entities_use_fixed_field_names() {
        let text = Entity::text_file("notes.txt", "/data/notes.txt");
        assert_eq!(text.field_name(), "textFile");
        assert_eq!(text.file_name(), Some("notes.txt"));

        let binary = Entity::binary_file("photo.jpg", "/data/photo.jpg");
        assert_eq!(binary.field_name(), "binaryFile");
        assert_eq!(binary.file(), Some(Path::new("/data/photo.jpg")));
    }

    #[test]
    fn test_default_charset_is_utf8() {
        let entity = Entity::text("a", "b");
        assert_eq!(entity.charset(), &Charset::utf8());

        let entity = entity.with_charset(Charset::new("ISO-8859-1").unwrap());
        assert_eq!(entity.charset().name(), "ISO-8859-1");
    }
}
