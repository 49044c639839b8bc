//! Request bodies and the encoders that produce them.
//!
//! Every encoder implements [`Payload`]: it reports a content type and
//! produces the encoded bytes. [`BodyReader::encode`] pairs the two into a
//! single value that the request assembler consumes exactly once.
//!
//! # Example
//!
//! ```
//! use courier_core::{BodyReader, BodyKind, encode_json};
//!
//! let body = encode_json(&serde_json::json!({"name": "Alice"})).expect("encode");
//! assert_eq!(body.kind(), BodyKind::Json);
//! assert_eq!(body.content_type(), "application/json; charset=utf-8");
//!
//! let text = BodyReader::text("Hello World");
//! assert_eq!(text.content_type(), "text/plain");
//! ```

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use bytes::{Buf, Bytes};
use derive_more::Display;

use crate::multipart::{Form, Part, generate_boundary};
use crate::{Error, Result};

/// Field name used by the multipart file encoder when none is given.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json; charset=utf-8`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json; charset=utf-8",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which encoder produced a [`BodyReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BodyKind {
    /// Plain text.
    #[display("text")]
    Text,
    /// JSON document.
    #[display("json")]
    Json,
    /// Binary serialization.
    #[display("binary")]
    Binary,
    /// URL-encoded form.
    #[display("form")]
    Form,
    /// Multipart form data.
    #[display("multipart")]
    Multipart,
    /// Caller-supplied bytes.
    #[display("raw")]
    Raw,
}

// ============================================================================
// Payload capability
// ============================================================================

/// A value that can be turned into a request body.
pub trait Payload {
    /// The tag recorded on the resulting [`BodyReader`].
    fn kind(&self) -> BodyKind;

    /// The `Content-Type` header value for the encoded bytes.
    fn content_type(&self) -> String;

    /// Encode the payload.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the value cannot be serialized, or an I/O
    /// error if the payload reads from disk.
    fn into_bytes(self) -> Result<Bytes>;
}

/// Plain text payload, sent verbatim.
#[derive(Debug, Clone)]
pub struct Text(pub String);

impl Payload for Text {
    fn kind(&self) -> BodyKind {
        BodyKind::Text
    }

    fn content_type(&self) -> String {
        ContentType::PlainText.as_str().to_string()
    }

    fn into_bytes(self) -> Result<Bytes> {
        Ok(Bytes::from(self.0))
    }
}

/// JSON payload.
#[derive(Debug, Clone, Copy)]
pub struct Json<'a, T: ?Sized>(pub &'a T);

impl<T: serde::Serialize + ?Sized> Payload for Json<'_, T> {
    fn kind(&self) -> BodyKind {
        BodyKind::Json
    }

    fn content_type(&self) -> String {
        ContentType::Json.as_str().to_string()
    }

    fn into_bytes(self) -> Result<Bytes> {
        to_json(self.0)
    }
}

/// Binary payload, serialized with `postcard`.
#[derive(Debug, Clone, Copy)]
pub struct Binary<'a, T: ?Sized>(pub &'a T);

impl<T: serde::Serialize + ?Sized> Payload for Binary<'_, T> {
    fn kind(&self) -> BodyKind {
        BodyKind::Binary
    }

    fn content_type(&self) -> String {
        ContentType::OctetStream.as_str().to_string()
    }

    fn into_bytes(self) -> Result<Bytes> {
        postcard::to_stdvec(self.0)
            .map(Bytes::from)
            .map_err(Into::into)
    }
}

/// URL-encoded form payload.
///
/// Keys are unique and always serialized in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlEncoded(pub BTreeMap<String, String>);

impl<K, V> FromIterator<(K, V)> for UrlEncoded
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl Payload for UrlEncoded {
    fn kind(&self) -> BodyKind {
        BodyKind::Form
    }

    fn content_type(&self) -> String {
        ContentType::FormUrlEncoded.as_str().to_string()
    }

    fn into_bytes(self) -> Result<Bytes> {
        to_form(&self.0)
    }
}

/// Multipart upload of one file from disk plus extra text fields.
#[derive(Debug, Clone)]
pub struct MultipartFile {
    field_name: String,
    path: PathBuf,
    fields: Vec<(String, String)>,
    boundary: String,
}

impl MultipartFile {
    /// Upload `path` under the default `"file"` field.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            field_name: DEFAULT_FILE_FIELD.to_string(),
            path: path.as_ref().to_path_buf(),
            fields: Vec::new(),
            boundary: generate_boundary(),
        }
    }

    /// Use another field name for the file section. An empty name keeps the default.
    #[must_use]
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.field_name = name;
        }
        self
    }

    /// Append a text field, written after the file section.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Use a fixed boundary instead of a generated one.
    #[must_use]
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = boundary.into();
        self
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

impl Payload for MultipartFile {
    fn kind(&self) -> BodyKind {
        BodyKind::Multipart
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn into_bytes(self) -> Result<Bytes> {
        let data = std::fs::read(&self.path).map_err(|err| {
            Error::io(
                format!("unable to read file '{}'", self.path.display()),
                err,
            )
        })?;

        let file_name = self.file_name();
        let mut form = Form::with_boundary(self.boundary)
            .part(Part::file(self.field_name, file_name, data));
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        form.encode()
    }
}

impl Payload for Form {
    fn kind(&self) -> BodyKind {
        BodyKind::Multipart
    }

    fn content_type(&self) -> String {
        Form::content_type(self)
    }

    fn into_bytes(self) -> Result<Bytes> {
        self.encode()
    }
}

// ============================================================================
// Body Reader
// ============================================================================

/// An encoded request body with its content type.
///
/// Reading through [`std::io::Read`] consumes the bytes; nothing rewinds.
#[derive(Debug)]
pub struct BodyReader {
    kind: BodyKind,
    content_type: String,
    data: Bytes,
}

impl BodyReader {
    /// Encode a payload.
    ///
    /// # Errors
    ///
    /// Propagates the payload's encoding or I/O error.
    pub fn encode<P: Payload>(payload: P) -> Result<Self> {
        let kind = payload.kind();
        let content_type = payload.content_type();
        let data = payload.into_bytes()?;
        Ok(Self {
            kind,
            content_type,
            data,
        })
    }

    /// A `text/plain` body.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = Text(text.into());
        Self {
            kind: BodyKind::Text,
            content_type: text.content_type(),
            data: Bytes::from(text.0),
        }
    }

    /// Caller-supplied bytes. An empty content type falls back to `application/octet-stream`.
    #[must_use]
    pub fn raw(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            ContentType::OctetStream.as_str().to_string()
        } else {
            content_type
        };
        Self {
            kind: BodyKind::Raw,
            content_type,
            data: data.into(),
        }
    }

    /// The encoder that produced this body.
    #[must_use]
    pub const fn kind(&self) -> BodyKind {
        self.kind
    }

    /// The `Content-Type` header value.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Remaining bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// No bytes remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume into (content type, remaining bytes).
    #[must_use]
    pub fn into_parts(self) -> (String, Bytes) {
        (self.content_type, self.data)
    }

    /// Consume into the remaining bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (&mut self.data).reader().read(buf)
    }
}

// ============================================================================
// Encoders
// ============================================================================

/// Encode a value as a JSON body.
///
/// # Errors
///
/// Returns [`Error::JsonSerialization`] if the value cannot be serialized.
pub fn encode_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<BodyReader> {
    BodyReader::encode(Json(value))
}

/// Encode a value as an `application/octet-stream` body using `postcard`.
///
/// # Errors
///
/// Returns [`Error::BinarySerialization`] if the value cannot be serialized.
pub fn encode_binary<T: serde::Serialize + ?Sized>(value: &T) -> Result<BodyReader> {
    BodyReader::encode(Binary(value))
}

/// Encode key/value pairs as a URL-encoded form body.
///
/// Later duplicates of a key replace earlier ones.
///
/// # Errors
///
/// Returns [`Error::FormSerialization`] if serialization fails.
pub fn encode_form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Result<BodyReader>
where
    K: Into<String>,
    V: Into<String>,
{
    BodyReader::encode(fields.into_iter().collect::<UrlEncoded>())
}

/// Encode a file from disk as a multipart upload.
///
/// The file goes under `field_name` (default `"file"`) with its base name as
/// filename, followed by `fields` in the given order.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::Multipart`] if a section cannot be written.
pub fn encode_file<K, V>(
    field_name: Option<&str>,
    path: impl AsRef<Path>,
    fields: impl IntoIterator<Item = (K, V)>,
) -> Result<BodyReader>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut upload = MultipartFile::new(path);
    if let Some(name) = field_name {
        upload = upload.field_name(name);
    }
    for (name, value) in fields {
        upload = upload.field(name, value);
    }
    BodyReader::encode(upload)
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form`, which supports `Vec<T>` for repeated form fields
/// (e.g., `tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use courier_core::to_form;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Login { username: String, password: String }
///
/// let login = Login { username: "alice".to_string(), password: "secret".to_string() };
/// let bytes = to_form(&login).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"username=alice&password=secret");
/// ```
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::json_deserialization(e.path().to_string(), e.inner().to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn read_all(mut body: BodyReader) -> Vec<u8> {
        let mut out = Vec::new();
        body.read_to_end(&mut out).expect("read body");
        out
    }

    #[test]
    fn content_type_as_str() {
        assert_eq!(
            ContentType::Json.as_str(),
            "application/json; charset=utf-8"
        );
        assert_eq!(
            ContentType::FormUrlEncoded.as_str(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(ContentType::PlainText.as_str(), "text/plain");
        assert_eq!(
            ContentType::OctetStream.as_str(),
            "application/octet-stream"
        );
    }

    #[test]
    fn text_body_is_verbatim() {
        let body = BodyReader::text("Hello World");
        assert_eq!(body.kind(), BodyKind::Text);
        assert_eq!(body.content_type(), "text/plain");
        assert_eq!(read_all(body), b"Hello World");
    }

    #[test]
    fn json_body_parses_back_to_input() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct User {
            name: String,
            age: u32,
        }

        let user = User {
            name: "Alice".to_string(),
            age: 30,
        };
        let body = encode_json(&user).expect("encode");
        assert_eq!(body.content_type(), "application/json; charset=utf-8");

        let decoded: User = from_json(&read_all(body)).expect("decode");
        assert_eq!(decoded, user);
    }

    #[test]
    fn json_rejects_non_string_map_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple key");

        let err = encode_json(&map).expect_err("tuple keys are not JSON");
        assert_eq!(err.kind(), crate::ErrorKind::Encoding);
    }

    #[test]
    fn binary_body_uses_postcard() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Point {
            x: u8,
            y: u8,
        }

        let body = encode_binary(&Point { x: 1, y: 2 }).expect("encode");
        assert_eq!(body.kind(), BodyKind::Binary);
        assert_eq!(body.content_type(), "application/octet-stream");

        let bytes = read_all(body);
        let decoded: Point = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, Point { x: 1, y: 2 });
    }

    #[test]
    fn form_body_is_sorted_and_escaped() {
        let body = encode_form([("b", "2"), ("a", "hello world"), ("c", "x&y")]).expect("encode");
        assert_eq!(body.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(read_all(body), b"a=hello+world&b=2&c=x%26y");
    }

    #[test]
    fn form_duplicate_keys_keep_last() {
        let body = encode_form([("k", "first"), ("k", "second")]).expect("encode");
        assert_eq!(read_all(body), b"k=second");
    }

    #[test]
    fn raw_body_never_has_empty_content_type() {
        let body = BodyReader::raw("", vec![1, 2, 3]);
        assert_eq!(body.kind(), BodyKind::Raw);
        assert_eq!(body.content_type(), "application/octet-stream");

        let body = BodyReader::raw("image/png", vec![0x89]);
        assert_eq!(body.content_type(), "image/png");
    }

    #[test]
    fn reading_consumes_the_body() {
        let mut body = BodyReader::text("abcdef");
        let mut first = [0_u8; 4];
        assert_eq!(body.read(&mut first).expect("read"), 4);
        assert_eq!(&first, b"abcd");
        assert_eq!(body.len(), 2);
        assert_eq!(read_all(body), b"ef");
    }

    #[test]
    fn file_body_contains_file_and_fields_in_order() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"file content").expect("write");

        let body = encode_file(Some("upload"), file.path(), [("z", "last?"), ("a", "no")])
            .expect("encode");
        assert_eq!(body.kind(), BodyKind::Multipart);
        assert!(
            body.content_type()
                .starts_with("multipart/form-data; boundary=")
        );

        let text = String::from_utf8(read_all(body)).expect("utf8");
        let file_name = file
            .path()
            .file_name()
            .expect("file name")
            .to_string_lossy()
            .into_owned();
        assert!(text.contains(&format!(
            "name=\"upload\"; filename=\"{file_name}\""
        )));
        assert!(text.contains("file content\r\n"));

        let z = text.find("name=\"z\"").expect("field z");
        let a = text.find("name=\"a\"").expect("field a");
        assert!(z < a, "fields must keep the supplied order");
    }

    #[test]
    fn file_body_defaults_field_name() {
        let file = tempfile::NamedTempFile::new().expect("temp file");

        let body = encode_file(None, file.path(), Vec::<(String, String)>::new()).expect("encode");
        let text = String::from_utf8(read_all(body)).expect("utf8");
        assert!(text.contains("name=\"file\"; filename="));

        let body = encode_file(Some(""), file.path(), Vec::<(String, String)>::new())
            .expect("encode");
        let text = String::from_utf8(read_all(body)).expect("utf8");
        assert!(text.contains("name=\"file\"; filename="));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = encode_file(
            None,
            "/definitely/not/here.bin",
            Vec::<(String, String)>::new(),
        )
        .expect_err("missing file");
        assert_eq!(err.kind(), crate::ErrorKind::Io);
        assert!(err.to_string().contains("/definitely/not/here.bin"));
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let result: Result<User> = from_json(br#"{"address":{}}"#);
        let msg = result.expect_err("should fail").to_string();
        assert!(msg.contains("address"), "Expected path 'address' in error: {msg}");
        assert!(msg.contains("city"), "Expected field 'city' in error: {msg}");
    }
}
