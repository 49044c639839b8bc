//! Multipart form data writer.
//!
//! Used by the file upload encoder, and usable directly as a [`Payload`]
//! for hand-built forms.
//!
//! # Example
//!
//! ```
//! use courier_core::{BodyReader, Form, Part};
//!
//! let form = Form::new()
//!     .text("name", "John Doe")
//!     .part(Part::file("avatar", "photo.jpg", vec![0xFF, 0xD8]));
//!
//! let body = BodyReader::encode(form).expect("encode");
//! assert!(body.content_type().starts_with("multipart/form-data; boundary="));
//! ```
//!
//! [`Payload`]: crate::Payload

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// A single part in a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a text part.
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// Create a file part.
    ///
    /// The content type is guessed from the filename extension, or defaults
    /// to `application/octet-stream` if unknown.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        }
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Get the part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// A multipart form containing multiple parts, written in insertion order.
#[derive(Debug, Clone)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    ///
    /// Encoding fails if the boundary delimiter appears in any part data.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text field to the form.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Get the boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Get the parts in this form.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// The `Content-Type` header value: `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write every section followed by the closing boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Multipart`] if the boundary is unusable, a part's
    /// data contains the boundary delimiter, or a section header would
    /// contain a line break.
    pub fn encode(&self) -> Result<Bytes> {
        validate_boundary(&self.boundary)?;

        let mut buf = BytesMut::new();
        for part in &self.parts {
            write_part(&mut buf, &self.boundary, part)?;
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(buf.freeze())
    }
}

fn write_part(buf: &mut BytesMut, boundary: &str, part: &Part) -> Result<()> {
    if contains_delimiter(&part.data, boundary) {
        return Err(Error::multipart(format!(
            "data of part '{}' contains the boundary '{boundary}'",
            part.name
        )));
    }

    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"\r\n");

    buf.put_slice(b"Content-Disposition: form-data; name=\"");
    buf.put_slice(escape_header_value("name", &part.name)?.as_bytes());
    buf.put_slice(b"\"");
    if let Some(filename) = &part.filename {
        buf.put_slice(b"; filename=\"");
        buf.put_slice(escape_header_value("filename", filename)?.as_bytes());
        buf.put_slice(b"\"");
    }
    buf.put_slice(b"\r\n");

    if let Some(content_type) = &part.content_type {
        buf.put_slice(b"Content-Type: ");
        buf.put_slice(escape_header_value("content type", content_type)?.as_bytes());
        buf.put_slice(b"\r\n");
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(&part.data);
    buf.put_slice(b"\r\n");
    Ok(())
}

/// Quotes and backslashes are escaped; line breaks cannot be.
fn escape_header_value(what: &str, value: &str) -> Result<String> {
    if value.contains(['\r', '\n']) {
        return Err(Error::multipart(format!(
            "section {what} '{}' contains a line break",
            value.escape_debug()
        )));
    }
    Ok(value.replace('\\', "\\\\").replace('"', "\\\""))
}

// RFC 2046: 1 to 70 characters, no trailing space.
fn validate_boundary(boundary: &str) -> Result<()> {
    let valid_char = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c);
    if boundary.is_empty()
        || boundary.len() > 70
        || boundary.ends_with(' ')
        || !boundary.chars().all(valid_char)
    {
        return Err(Error::multipart(format!("invalid boundary '{boundary}'")));
    }
    Ok(())
}

fn contains_delimiter(data: &[u8], boundary: &str) -> bool {
    let delimiter = format!("--{boundary}");
    data.windows(delimiter.len())
        .any(|window| window == delimiter.as_bytes())
}

pub(crate) fn generate_boundary() -> String {
    format!("----CourierBoundary{}", uuid::Uuid::new_v4().simple())
}
