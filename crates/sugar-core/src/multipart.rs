//! `multipart/form-data` parsing.
//!
//! Bodies are fully buffered; the parser splits them into [`Part`]s while
//! enforcing per-file, total-size and field-count limits. File parts become
//! [`UploadFile`]s during binding.

use std::collections::HashMap;

use memchr::memmem;
use serde::Deserialize;

/// Default maximum file size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum total upload size (50MB).
pub const DEFAULT_MAX_TOTAL_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum number of parts.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

/// Limits applied while parsing multipart bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultipartConfig {
    max_file_size: usize,
    max_total_size: usize,
    max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Create a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum file size.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the maximum total upload size.
    #[must_use]
    pub fn max_total_size(mut self, size: usize) -> Self {
        self.max_total_size = size;
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    #[must_use]
    pub fn get_max_file_size(&self) -> usize {
        self.max_file_size
    }

    #[must_use]
    pub fn get_max_total_size(&self) -> usize {
        self.max_total_size
    }

    #[must_use]
    pub fn get_max_fields(&self) -> usize {
        self.max_fields
    }
}

/// Errors that can occur during multipart parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultipartError {
    #[error("missing boundary in multipart Content-Type")]
    MissingBoundary,
    #[error("invalid multipart boundary")]
    InvalidBoundary,
    #[error("file too large: {size} bytes exceeds limit of {max}")]
    FileTooLarge { size: usize, max: usize },
    #[error("total upload too large: {size} bytes exceeds limit of {max}")]
    TotalTooLarge { size: usize, max: usize },
    #[error("too many fields: {count} exceeds limit of {max}")]
    TooManyFields { count: usize, max: usize },
    #[error("missing Content-Disposition header in part")]
    MissingContentDisposition,
    #[error("invalid Content-Disposition: {detail}")]
    InvalidContentDisposition { detail: String },
    #[error("invalid part headers: {detail}")]
    InvalidPartHeaders { detail: String },
    #[error("unexpected end of multipart data")]
    UnexpectedEof,
    #[error("invalid multipart format: {detail}")]
    InvalidFormat { detail: &'static str },
}

/// A parsed multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Field name from Content-Disposition.
    pub name: String,
    /// Filename from Content-Disposition, for file parts.
    pub filename: Option<String>,
    /// Content-Type of the part.
    pub content_type: Option<String>,
    /// Raw content.
    pub data: Vec<u8>,
    /// Part headers, lowercase names.
    pub headers: HashMap<String, String>,
}

impl Part {
    /// Returns true if this part is a file upload.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Content as UTF-8, if valid.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Form field the file was sent under.
    pub field_name: String,
    /// Client-supplied filename.
    pub filename: String,
    /// Content-Type, `application/octet-stream` when the client sent none.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
    /// Part headers, lowercase names.
    pub headers: HashMap<String, String>,
}

impl UploadFile {
    /// Convert a file part. Returns `None` for plain fields.
    #[must_use]
    pub fn from_part(part: Part) -> Option<Self> {
        let filename = part.filename?;
        Some(Self {
            field_name: part.name,
            filename,
            content_type: part
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: part.data,
            headers: part.headers,
        })
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Contents as UTF-8, if valid.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// Extension of the filename, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

/// Extract the boundary from a `multipart/form-data` Content-Type value.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    let mut params = content_type.trim().split(';');
    let mime = params.next().unwrap_or("").trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::InvalidBoundary);
    }

    for param in params {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = value.trim().trim_matches('"').trim_matches('\'');
            if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
                return Err(MultipartError::InvalidBoundary);
            }
            return Ok(boundary.to_string());
        }
    }

    Err(MultipartError::MissingBoundary)
}

/// Boundary-delimited multipart parser.
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: Vec<u8>,
    config: MultipartConfig,
}

impl MultipartParser {
    /// Create a parser for `boundary` (without the leading `--`).
    #[must_use]
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            config,
        }
    }

    /// Parse every part of a buffered body.
    pub fn parse(&self, body: &[u8]) -> Result<Vec<Part>, MultipartError> {
        let mut parts = Vec::new();
        let mut total_size = 0usize;
        let mut pos = self.first_delimiter(body)?;

        loop {
            let after = pos + self.delimiter.len();
            match body.get(after..after + 2) {
                Some(b"--") => break,
                Some(b"\r\n") => {}
                Some(_) => {
                    return Err(MultipartError::InvalidFormat {
                        detail: "expected CRLF after boundary",
                    });
                }
                None => return Err(MultipartError::UnexpectedEof),
            }

            if parts.len() >= self.config.max_fields {
                return Err(MultipartError::TooManyFields {
                    count: parts.len() + 1,
                    max: self.config.max_fields,
                });
            }

            let (headers, data_start) = parse_part_headers(body, after + 2)?;
            let disposition = headers
                .get("content-disposition")
                .ok_or(MultipartError::MissingContentDisposition)?;
            let (name, filename) = parse_content_disposition(disposition)?;
            let content_type = headers.get("content-type").cloned();

            // The CRLF before the next delimiter belongs to the delimiter.
            let next = self.next_delimiter(body, data_start)?;
            let data = &body[data_start..next - 2];

            if filename.is_some() && data.len() > self.config.max_file_size {
                return Err(MultipartError::FileTooLarge {
                    size: data.len(),
                    max: self.config.max_file_size,
                });
            }
            total_size += data.len();
            if total_size > self.config.max_total_size {
                return Err(MultipartError::TotalTooLarge {
                    size: total_size,
                    max: self.config.max_total_size,
                });
            }

            parts.push(Part {
                name,
                filename,
                content_type,
                data: data.to_vec(),
                headers,
            });
            pos = next;
        }

        Ok(parts)
    }

    fn first_delimiter(&self, body: &[u8]) -> Result<usize, MultipartError> {
        if body.starts_with(&self.delimiter) {
            return Ok(0);
        }
        self.next_delimiter(body, 0)
    }

    /// Position of the next delimiter that starts a line.
    fn next_delimiter(&self, body: &[u8], start: usize) -> Result<usize, MultipartError> {
        let finder = memmem::Finder::new(&self.delimiter);
        let mut from = start;
        while let Some(offset) = finder.find(&body[from..]) {
            let at = from + offset;
            if at >= start + 2 && &body[at - 2..at] == b"\r\n" {
                return Ok(at);
            }
            from = at + 1;
        }
        Err(MultipartError::UnexpectedEof)
    }
}

fn parse_part_headers(
    body: &[u8],
    start: usize,
) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;
    loop {
        let line_end = memmem::find(&body[pos..], b"\r\n")
            .map(|offset| pos + offset)
            .ok_or(MultipartError::UnexpectedEof)?;
        let line = &body[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }
        let line = std::str::from_utf8(line).map_err(|_| MultipartError::InvalidPartHeaders {
            detail: "invalid UTF-8 in header".to_string(),
        })?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| MultipartError::InvalidPartHeaders {
                detail: format!("malformed header line `{line}`"),
            })?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        pos = line_end + 2;
    }
}

/// Parse `form-data; name="field"; filename="file.txt"`.
fn parse_content_disposition(value: &str) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw));
        } else if key.eq_ignore_ascii_case("filename") {
            let unquoted = unquote(raw);
            if unquoted.contains("..") || unquoted.contains(['/', '\\', '\0']) {
                return Err(MultipartError::InvalidContentDisposition {
                    detail: "filename contains path traversal characters".to_string(),
                });
            }
            filename = Some(unquoted);
        }
    }

    let name = name.ok_or_else(|| MultipartError::InvalidContentDisposition {
        detail: "missing name parameter".to_string(),
    })?;
    Ok((name, filename))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// A parsed multipart body.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    /// Wrap parsed parts.
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Parse a body given its full Content-Type header value.
    pub fn parse(
        content_type: &str,
        body: &[u8],
        config: MultipartConfig,
    ) -> Result<Self, MultipartError> {
        let boundary = parse_boundary(content_type)?;
        let parts = MultipartParser::new(&boundary, config).parse(body)?;
        Ok(Self::from_parts(parts))
    }

    /// All parts, in body order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// First text value of a plain field.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&str> {
        self.get_fields(name).into_iter().next()
    }

    /// Every text value of a plain field.
    #[must_use]
    pub fn get_fields(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| p.name == name && !p.is_file())
            .filter_map(Part::text)
            .collect()
    }

    /// Clone the first file sent under `name`.
    #[must_use]
    pub fn get_file(&self, name: &str) -> Option<UploadFile> {
        self.get_files(name).into_iter().next()
    }

    /// Clone every file sent under `name`.
    #[must_use]
    pub fn get_files(&self, name: &str) -> Vec<UploadFile> {
        self.parts
            .iter()
            .filter(|p| p.name == name && p.is_file())
            .cloned()
            .filter_map(UploadFile::from_part)
            .collect()
    }

    /// Whether any part is named `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if there are no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----sugarboundary";

    fn body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
        let mut out = String::new();
        for (name, filename, content) in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n"
                )),
                None => out.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n")),
            }
            out.push_str("\r\n");
            out.push_str(content);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out.into_bytes()
    }

    fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[test]
    fn test_parse_boundary() {
        assert_eq!(parse_boundary("multipart/form-data; boundary=abc").unwrap(), "abc");
        assert_eq!(parse_boundary("multipart/form-data; boundary=\"q\"").unwrap(), "q");
        assert_eq!(
            parse_boundary("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(parse_boundary("text/plain; boundary=x"), Err(MultipartError::InvalidBoundary));
    }

    #[test]
    fn test_fields_and_files() {
        let raw = body(&[
            ("title", None, "hello world"),
            ("upload", Some("a.txt"), "first\r\nline"),
            ("upload", Some("b.txt"), "second"),
        ]);
        let form = MultipartForm::parse(&content_type(), &raw, MultipartConfig::default()).unwrap();
        assert_eq!(form.len(), 3);
        assert_eq!(form.get_field("title"), Some("hello world"));
        assert_eq!(form.get_field("upload"), None);

        let files = form.get_files("upload");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "a.txt");
        assert_eq!(files[0].text(), Some("first\r\nline"));
        assert_eq!(files[0].content_type, "text/plain");
        assert_eq!(files[1].extension(), Some("txt"));
    }

    #[test]
    fn test_preamble_is_skipped() {
        let mut raw = b"ignored preamble\r\n".to_vec();
        raw.extend(body(&[("a", None, "1")]));
        let form = MultipartForm::parse(&content_type(), &raw, MultipartConfig::default()).unwrap();
        assert_eq!(form.get_field("a"), Some("1"));
    }

    #[test]
    fn test_empty_form() {
        let raw = format!("--{BOUNDARY}--\r\n");
        let form =
            MultipartForm::parse(&content_type(), raw.as_bytes(), MultipartConfig::default()).unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_limits() {
        let raw = body(&[("f", Some("big.bin"), "0123456789")]);
        let err = MultipartForm::parse(&content_type(), &raw, MultipartConfig::new().max_file_size(4))
            .unwrap_err();
        assert_eq!(err, MultipartError::FileTooLarge { size: 10, max: 4 });

        let raw = body(&[("a", None, "1"), ("b", None, "2")]);
        let err = MultipartForm::parse(&content_type(), &raw, MultipartConfig::new().max_fields(1))
            .unwrap_err();
        assert!(matches!(err, MultipartError::TooManyFields { .. }));
    }

    #[test]
    fn test_truncated_body() {
        let raw = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue");
        let err = MultipartForm::parse(&content_type(), raw.as_bytes(), MultipartConfig::default())
            .unwrap_err();
        assert_eq!(err, MultipartError::UnexpectedEof);
    }

    #[test]
    fn test_rejects_path_traversal_filename() {
        let raw = body(&[("f", Some("../etc/passwd"), "x")]);
        let err =
            MultipartForm::parse(&content_type(), &raw, MultipartConfig::default()).unwrap_err();
        assert!(matches!(err, MultipartError::InvalidContentDisposition { .. }));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("\""), "\"");
    }
}
