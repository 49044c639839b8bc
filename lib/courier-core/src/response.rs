//! HTTP response materialization.
//!
//! [`Response::materialize`] drains a transport body exactly once. The
//! resulting [`Response`] is immutable and its decode helpers can be called
//! any number of times.
//!
//! # Example
//!
//! ```ignore
//! let response = Response::materialize(raw).await?;
//! let user: User = response.json()?;
//! let again: User = response.json()?;
//! ```

use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, SET_COOKIE, TRANSFER_ENCODING};
use http::response::Parts;
use http_body_util::BodyExt;

use crate::{Cookie, Error, Result};

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_line: String,
    version: http::Version,
    headers: HeaderMap,
    content_length: u64,
    transfer_encoding: Vec<String>,
    cookies: Vec<Cookie>,
    content: Bytes,
    raw: Arc<Parts>,
}

impl Response {
    /// Drain `response` into an immutable snapshot.
    ///
    /// Nothing is returned unless the whole body was read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyRead`] if the body stream fails.
    pub async fn materialize<B>(response: http::Response<B>) -> Result<Self>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Display,
    {
        let (parts, body) = response.into_parts();
        let content = body
            .collect()
            .await
            .map_err(|err| Error::body_read(err.to_string()))?
            .to_bytes();
        Ok(Self::from_parts(parts, content))
    }

    /// Build a snapshot from an already-read body.
    #[must_use]
    pub fn from_parts(parts: Parts, content: Bytes) -> Self {
        let status = parts.status;
        let status_line = match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        };

        let content_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(content.len() as u64);

        let transfer_encoding = parts
            .headers
            .get_all(TRANSFER_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|coding| coding.trim().to_ascii_lowercase())
            .filter(|coding| !coding.is_empty())
            .collect();

        let cookies = parts
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(Cookie::parse)
            .collect();

        Self {
            status: status.as_u16(),
            status_line,
            version: parts.version,
            headers: parts.headers.clone(),
            content_length,
            transfer_encoding,
            cookies,
            content,
            raw: Arc::new(parts),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status line, e.g. `"200 OK"`.
    #[must_use]
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// HTTP version.
    #[must_use]
    pub const fn version(&self) -> http::Version {
        self.version
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Declared `Content-Length`, or the body length when the header is absent.
    #[must_use]
    pub const fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Transfer codings, lowercased, in header order.
    #[must_use]
    pub fn transfer_encoding(&self) -> &[String] {
        &self.transfer_encoding
    }

    /// Cookies from every `Set-Cookie` header.
    #[must_use]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Response body; empty when the server sent none.
    #[must_use]
    pub const fn content(&self) -> &Bytes {
        &self.content
    }

    /// The response head as received.
    #[must_use]
    pub fn raw(&self) -> &Parts {
        &self.raw
    }

    /// Body as UTF-8, invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`] with the failing path.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        crate::from_json(&self.content)
    }

    /// Deserialize the body as XML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::XmlDeserialization`] if the document does not match `T`.
    pub fn xml<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        quick_xml::de::from_reader(self.content.as_ref()).map_err(Into::into)
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_content(self) -> Bytes {
        self.content
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use http_body::Frame;
    use http_body_util::{Empty, Full};

    use super::*;

    fn response<B>(status: u16, headers: &[(&str, &str)], body: B) -> http::Response<B> {
        let mut builder = http::Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(body).expect("valid response")
    }

    struct Broken;

    impl http_body::Body for Broken {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<std::result::Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
        }
    }

    #[tokio::test]
    async fn materialize_copies_head_and_body() {
        let raw = response(
            200,
            &[
                ("content-type", "text/plain"),
                ("set-cookie", "session=abc; Path=/"),
                ("set-cookie", "theme=dark"),
            ],
            Full::new(Bytes::from_static(b"Complete")),
        );
        let response = Response::materialize(raw).await.expect("materialize");

        assert_eq!(response.status(), 200);
        assert_eq!(response.status_line(), "200 OK");
        assert_eq!(response.content().as_ref(), b"Complete");
        assert_eq!(response.content_length(), 8);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert!(response.is_success());
        let names: Vec<_> = response.cookies().iter().map(Cookie::name).collect();
        assert_eq!(names, ["session", "theme"]);
        assert_eq!(response.raw().status, http::StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_body_is_empty_not_absent() {
        let raw = response(204, &[], Empty::<Bytes>::new());
        let response = Response::materialize(raw).await.expect("materialize");

        assert!(response.content().is_empty());
        assert_eq!(response.content_length(), 0);
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    async fn content_length_prefers_header() {
        let raw = response(
            200,
            &[("content-length", "42")],
            Full::new(Bytes::from_static(b"short")),
        );
        let response = Response::materialize(raw).await.expect("materialize");
        assert_eq!(response.content_length(), 42);
    }

    #[tokio::test]
    async fn transfer_encoding_is_split() {
        let raw = response(
            200,
            &[("transfer-encoding", "gzip, Chunked")],
            Full::new(Bytes::from_static(b"x")),
        );
        let response = Response::materialize(raw).await.expect("materialize");
        assert_eq!(response.transfer_encoding(), ["gzip", "chunked"]);
    }

    #[tokio::test]
    async fn body_failure_returns_no_response() {
        let raw = response(200, &[], Broken);
        let err = Response::materialize(raw).await.expect_err("broken body");
        assert!(matches!(err, Error::BodyRead(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }

    #[tokio::test]
    async fn decoding_is_repeatable() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let raw = response(
            200,
            &[],
            Full::new(Bytes::from_static(br#"{"id":1,"name":"test"}"#)),
        );
        let response = Response::materialize(raw).await.expect("materialize");

        let first: User = response.json().expect("json");
        let second: User = response.json().expect("json");
        assert_eq!(first, second);
        assert_eq!(response.text(), response.text());
        assert_eq!(first.name, "test");
    }

    #[tokio::test]
    async fn xml_decoding() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Note {
            to: String,
            body: String,
        }

        let raw = response(
            200,
            &[("content-type", "application/xml")],
            Full::new(Bytes::from_static(
                b"<note><to>Tove</to><body>Don't forget me</body></note>",
            )),
        );
        let response = Response::materialize(raw).await.expect("materialize");

        let note: Note = response.xml().expect("xml");
        assert_eq!(note.to, "Tove");
        assert_eq!(note, response.xml::<Note>().expect("xml again"));
    }

    #[tokio::test]
    async fn json_error_has_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Wrapper {
            user: Inner,
        }
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Inner {
            id: u64,
        }

        let raw = response(
            200,
            &[],
            Full::new(Bytes::from_static(br#"{"user":{"id":"x"}}"#)),
        );
        let response = Response::materialize(raw).await.expect("materialize");
        let err = response.json::<Wrapper>().expect_err("type mismatch");
        assert!(matches!(err, Error::JsonDeserialization { ref path, .. } if path == "user.id"));
    }

    #[test]
    fn status_checks() {
        let parts = |status: u16| {
            let (parts, ()) = http::Response::builder()
                .status(status)
                .body(())
                .expect("valid response")
                .into_parts();
            parts
        };
        assert!(Response::from_parts(parts(301), Bytes::new()).is_redirection());
        assert!(Response::from_parts(parts(404), Bytes::new()).is_client_error());
        assert!(Response::from_parts(parts(503), Bytes::new()).is_server_error());
        assert_eq!(
            Response::from_parts(parts(599), Bytes::new()).status_line(),
            "599"
        );
    }
}
