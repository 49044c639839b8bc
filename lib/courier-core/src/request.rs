//! HTTP request building.
//!
//! [`assemble`] turns a method, an endpoint, an optional [`BodyReader`] and a
//! list of [`RequestOption`]s into a transport-ready [`Request`].
//! [`Request::builder`] is the lower-level way to construct one by hand.
//!
//! # Example
//!
//! ```
//! use courier_core::{BodyReader, Method, RequestOption, assemble};
//!
//! let request = assemble(
//!     Method::Post,
//!     "https://api.example.com/v1/test",
//!     Some(BodyReader::text("Hello World")),
//!     &[RequestOption::accept("text/plain")],
//! )
//! .expect("assemble");
//!
//! assert_eq!(request.header("content-type"), Some("text/plain"));
//! assert_eq!(request.header("accept"), Some("text/plain"));
//! ```

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{BodyReader, Error, Method, RequestOption, Result};

/// An HTTP request with method, URL, headers, optional body and cancellation handle.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    cancellation: Option<CancellationToken>,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Change the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Change the request URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Set a header, replacing any previous values for the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name or value is not valid HTTP.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Remove and return the body.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// The cancellation handle attached to this request.
    #[must_use]
    pub const fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Attach a cancellation handle.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = Some(token);
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            request: Request {
                method,
                url,
                headers: HeaderMap::new(),
                body: None,
                cancellation: None,
            },
        }
    }

    /// Sets a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let Ok((name, value)) = header_pair(name, value) {
            self.request.headers.insert(name, value);
        }
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers = headers;
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.request.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Attaches a cancellation handle.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.request.cancellation = Some(token);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        self.request
    }
}

pub(crate) fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| Error::invalid_header(name, err.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|err| Error::invalid_header(name, err.to_string()))?;
    Ok((header_name, header_value))
}

/// Assemble a transport-ready request.
///
/// Request options apply in declaration order; the body's content type is
/// then set so it always matches the encoder; [`RequestOption::Modifier`]
/// hooks run last.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `endpoint` cannot be parsed, or the first
/// error raised by an option.
pub fn assemble(
    method: Method,
    endpoint: &str,
    body: Option<BodyReader>,
    options: &[RequestOption],
) -> Result<Request> {
    let url = Url::parse(endpoint)?;
    let mut builder = Request::builder(method, url);

    let mut content_type = None;
    if let Some(body) = body {
        let (kind, bytes) = body.into_parts();
        content_type = Some(kind);
        builder = builder.body(bytes);
    }
    let mut request = builder.build();

    let (hooks, mutators): (Vec<_>, Vec<_>) = options.iter().partition(|o| o.is_modifier());
    for option in mutators {
        option.apply(&mut request)?;
    }

    if let Some(content_type) = content_type {
        request.set_header(CONTENT_TYPE.as_str(), &content_type)?;
    }

    for hook in hooks {
        hook.apply(&mut request)?;
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cookie, encode_json};

    #[test]
    fn request_builder_basic() {
        let url = Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::builder(Method::Get, url)
            .header("Accept", "application/json")
            .query("page", "1")
            .build();

        assert_eq!(request.method(), &Method::Get);
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/users?page=1"
        );
        assert_eq!(request.header("accept"), Some("application/json"));
        assert!(request.body().is_none());
        assert!(request.cancellation().is_none());
    }

    #[test]
    fn assemble_rejects_bad_url() {
        let err = assemble(Method::Get, "not a url", None, &[]).expect_err("bad url");
        assert_eq!(err.kind(), crate::ErrorKind::Url);
    }

    #[test]
    fn assemble_without_body_has_no_content_type() {
        let request = assemble(Method::Get, "http://localhost/", None, &[]).expect("assemble");
        assert!(request.header("content-type").is_none());
        assert!(request.body().is_none());
    }

    #[test]
    fn body_content_type_wins_over_header_option() {
        let body = encode_json(&serde_json::json!({"a": 1})).expect("encode");
        let request = assemble(
            Method::Post,
            "http://localhost/",
            Some(body),
            &[RequestOption::header("Content-Type", "text/html")],
        )
        .expect("assemble");

        assert_eq!(request.headers().get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(
            request.header("content-type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(request.body().map(AsRef::as_ref), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn later_header_option_wins() {
        let request = assemble(
            Method::Get,
            "http://localhost/",
            None,
            &[
                RequestOption::user_agent("first"),
                RequestOption::header("User-Agent", "second"),
            ],
        )
        .expect("assemble");
        assert_eq!(request.header("user-agent"), Some("second"));
    }

    #[test]
    fn modifier_runs_after_everything_else() {
        let request = assemble(
            Method::Post,
            "http://localhost/",
            Some(BodyReader::text("hi")),
            &[
                RequestOption::modifier(|request| {
                    let seen = request.header("authorization").unwrap_or("none").to_string();
                    let _ = request.set_header("x-seen-auth", &seen);
                    let _ = request.set_header("content-type", "text/x-custom");
                }),
                RequestOption::bearer("token"),
            ],
        )
        .expect("assemble");

        assert_eq!(request.header("x-seen-auth"), Some("Bearer token"));
        assert_eq!(request.header("content-type"), Some("text/x-custom"));
    }

    #[test]
    fn cookies_accumulate() {
        let cookies = RequestOption::cookies([Cookie::new("a", "1")]);
        let request = assemble(
            Method::Get,
            "http://localhost/",
            None,
            &[cookies.clone(), RequestOption::cookies([Cookie::new("b", "2")])],
        )
        .expect("assemble");
        assert_eq!(request.header("cookie"), Some("a=1; b=2"));
    }

    #[test]
    fn invalid_header_is_configuration_error() {
        let err = assemble(
            Method::Get,
            "http://localhost/",
            None,
            &[RequestOption::header("bad name", "x")],
        )
        .expect_err("invalid header");
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
