//! Integration tests for the multipart encoder.
//!
//! The encoder output is read back with a small reference parser and the
//! parts are checked against the entities that produced them.

use std::fs;
use std::path::Path;

use bare_connection::clients::{
    generate_boundary, Entity, MultipartEncoder, BINARY_FILE_FIELD, TEXT_FILE_FIELD,
};
use bare_connection::Charset;

/// One part as seen by the reference parser.
#[derive(Debug)]
struct Part {
    headers: Vec<(String, String)>,
    content: Vec<u8>,
}

impl Part {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a `Content-Disposition` parameter such as `name`.
    fn disposition_param(&self, param: &str) -> Option<String> {
        let disposition = self.header("Content-Disposition")?;
        disposition.split(';').skip(1).find_map(|p| {
            let (key, value) = p.trim().split_once('=')?;
            (key == param).then(|| value.trim_matches('"').to_string())
        })
    }
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(index, _)| index)
        .collect()
}

fn parse_multipart(body: &[u8], boundary: &str) -> Vec<Part> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--\r\n");
    assert!(
        body.ends_with(closing.as_bytes()),
        "Body must end with the closing delimiter"
    );

    let positions = find_all(body, delimiter.as_bytes());
    assert_eq!(positions.first(), Some(&0), "Body must start with a delimiter");

    positions
        .windows(2)
        .map(|pair| {
            let segment = &body[pair[0] + delimiter.len()..pair[1]];
            let segment = segment.strip_prefix(b"\r\n").expect("CRLF after delimiter");
            let segment = segment
                .strip_suffix(b"\r\n")
                .expect("CRLF before next delimiter");

            let split = find_all(segment, b"\r\n\r\n")[0];
            let headers = String::from_utf8_lossy(&segment[..split])
                .split("\r\n")
                .map(|line| {
                    let (name, value) = line.split_once(": ").expect("header line");
                    (name.to_string(), value.to_string())
                })
                .collect();
            Part {
                headers,
                content: segment[split + 4..].to_vec(),
            }
        })
        .collect()
}

fn encode(entities: &[Entity], charset: &Charset, boundary: &str) -> Vec<u8> {
    let mut out = Vec::new();
    MultipartEncoder::new(entities)
        .write_to(&mut out, charset, boundary)
        .unwrap();
    out
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_mixed_entities_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let notes = write_file(dir.path(), "notes.txt", b"line one\nline two\n");
    let binary: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
    let logo = write_file(dir.path(), "logo.png", &binary);

    let entities = vec![
        Entity::text("title", "Quarterly report"),
        Entity::text_file("report-notes", &notes),
        Entity::binary_file("company-logo", &logo),
        Entity::text("summary", ""),
    ];
    let boundary = generate_boundary();
    let body = encode(&entities, &Charset::utf8(), &boundary);
    let parts = parse_multipart(&body, &boundary);

    assert_eq!(parts.len(), 4);

    assert_eq!(parts[0].disposition_param("name").as_deref(), Some("title"));
    assert_eq!(parts[0].disposition_param("filename"), None);
    assert_eq!(
        parts[0].header("Content-Type"),
        Some("text/plain; charset=UTF-8")
    );
    assert_eq!(parts[0].content, b"Quarterly report");

    assert_eq!(
        parts[1].disposition_param("name").as_deref(),
        Some(TEXT_FILE_FIELD)
    );
    assert_eq!(
        parts[1].disposition_param("filename").as_deref(),
        Some("report-notes")
    );
    assert_eq!(
        parts[1].header("Content-Type"),
        Some("text/plain; charset=UTF-8")
    );
    assert_eq!(parts[1].content, fs::read(&notes).unwrap());

    assert_eq!(
        parts[2].disposition_param("name").as_deref(),
        Some(BINARY_FILE_FIELD)
    );
    assert_eq!(
        parts[2].disposition_param("filename").as_deref(),
        Some("company-logo")
    );
    assert_eq!(parts[2].header("Content-Type"), Some("image/png"));
    assert_eq!(parts[2].header("Content-Transfer-Encoding"), Some("binary"));
    assert_eq!(parts[2].content, binary);

    assert_eq!(parts[3].disposition_param("name").as_deref(), Some("summary"));
    assert!(parts[3].content.is_empty());
}

#[test]
fn test_file_field_names_ignore_entity_names() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "a.txt", b"a");
    let second = write_file(dir.path(), "b.bin", b"b");

    let entities = vec![
        Entity::text_file("anything", &first),
        Entity::text_file("something-else", &first),
        Entity::binary_file("blob", &second),
    ];
    let body = encode(&entities, &Charset::utf8(), "b0undary");
    let parts = parse_multipart(&body, "b0undary");

    let names: Vec<_> = parts
        .iter()
        .map(|part| part.disposition_param("name").unwrap())
        .collect();
    assert_eq!(names, vec![TEXT_FILE_FIELD, TEXT_FILE_FIELD, BINARY_FILE_FIELD]);

    let file_names: Vec<_> = parts
        .iter()
        .map(|part| part.disposition_param("filename").unwrap())
        .collect();
    assert_eq!(file_names, vec!["anything", "something-else", "blob"]);
}

#[test]
fn test_entity_charset_is_declared_per_part() {
    let entities = vec![
        Entity::text("greeting", "hello"),
        Entity::text("legacy", "hello").with_charset(Charset::new("ISO-8859-1").unwrap()),
    ];
    let body = encode(&entities, &Charset::utf8(), "xyz");
    let parts = parse_multipart(&body, "xyz");

    assert_eq!(
        parts[0].header("Content-Type"),
        Some("text/plain; charset=UTF-8")
    );
    assert_eq!(
        parts[1].header("Content-Type"),
        Some("text/plain; charset=ISO-8859-1")
    );
}

#[test]
fn test_empty_entity_list_is_closing_delimiter_only() {
    let body = encode(&[], &Charset::utf8(), "abc");
    assert_eq!(body, b"--abc--\r\n");
}

#[test]
fn test_unknown_extension_falls_back_to_octet_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "payload.zz9", &[0, 1, 2]);

    let body = encode(&[Entity::binary_file("data", &path)], &Charset::utf8(), "q");
    let parts = parse_multipart(&body, "q");

    assert_eq!(
        parts[0].header("Content-Type"),
        Some("application/octet-stream")
    );
    assert_eq!(parts[0].content, vec![0, 1, 2]);
}

#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let entities = vec![Entity::text_file("gone", dir.path().join("missing.txt"))];

    let mut out = Vec::new();
    let error = MultipartEncoder::new(&entities)
        .write_to(&mut out, &Charset::utf8(), "b")
        .unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
}
