//! Request-scoped options.
//!
//! Each [`RequestOption`] mutates one outgoing [`Request`]. They are applied
//! by [`assemble`](crate::assemble) in declaration order, except
//! [`RequestOption::Modifier`] hooks which always run last.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::header::{ACCEPT, AUTHORIZATION, COOKIE, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::{Cookie, Error, Request, Result};

/// A caller-supplied hook run after every other request option.
#[derive(Clone)]
pub struct Modifier(Arc<dyn Fn(&mut Request) + Send + Sync>);

impl Modifier {
    /// Wrap a closure.
    pub fn new(hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    /// Run the hook.
    pub fn call(&self, request: &mut Request) {
        (self.0)(request);
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Modifier(..)")
    }
}

/// An option applied to a single request.
#[derive(Debug, Clone)]
pub enum RequestOption {
    /// Set headers, overwriting any previous value for each name.
    Headers(Vec<(String, String)>),
    /// Set the `User-Agent` header.
    UserAgent(String),
    /// Set the `Accept` header.
    Accept(String),
    /// `Authorization: Basic base64(username:password)`.
    ///
    /// Ignored unless both parts are non-empty.
    BasicAuth {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `Authorization: Basic <key>`, the key sent verbatim.
    ApiKey(String),
    /// Append cookies to the `Cookie` header.
    Cookies(Vec<Cookie>),
    /// Attach a cancellation handle.
    Cancellation(CancellationToken),
    /// Run a hook on the assembled request.
    Modifier(Modifier),
}

impl RequestOption {
    /// A single header.
    #[must_use]
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Headers(vec![(name.into(), value.into())])
    }

    /// Several headers.
    pub fn headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Headers(
            headers
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// `User-Agent` header.
    #[must_use]
    pub fn user_agent(agent: impl Into<String>) -> Self {
        Self::UserAgent(agent.into())
    }

    /// `Accept` header.
    #[must_use]
    pub fn accept(content_type: impl Into<String>) -> Self {
        Self::Accept(content_type.into())
    }

    /// Basic authentication.
    #[must_use]
    pub fn basic_auth(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// API key authentication.
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    /// Cookies to send.
    pub fn cookies(cookies: impl IntoIterator<Item = Cookie>) -> Self {
        Self::Cookies(cookies.into_iter().collect())
    }

    /// Cancellation handle.
    #[must_use]
    pub fn cancellation(token: CancellationToken) -> Self {
        Self::Cancellation(token)
    }

    /// Request hook.
    pub fn modifier(hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        Self::Modifier(Modifier::new(hook))
    }

    /// Returns `true` for hooks, which the assembler runs last.
    #[must_use]
    pub const fn is_modifier(&self) -> bool {
        matches!(self, Self::Modifier(_))
    }

    /// Apply this option to a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if a resulting header is not valid HTTP.
    pub fn apply(&self, request: &mut Request) -> Result<()> {
        match self {
            Self::Headers(headers) => {
                for (name, value) in headers {
                    request.set_header(name, value)?;
                }
            }
            Self::UserAgent(agent) => request.set_header(USER_AGENT.as_str(), agent)?,
            Self::Accept(content_type) => request.set_header(ACCEPT.as_str(), content_type)?,
            Self::BasicAuth { username, password } => {
                if !username.is_empty() && !password.is_empty() {
                    let credentials = BASE64.encode(format!("{username}:{password}"));
                    request.set_header(AUTHORIZATION.as_str(), &format!("Basic {credentials}"))?;
                }
            }
            Self::Bearer(token) => {
                request.set_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))?;
            }
            Self::ApiKey(key) => {
                request.set_header(AUTHORIZATION.as_str(), &format!("Basic {key}"))?;
            }
            Self::Cookies(cookies) => append_cookies(request, cookies)?,
            Self::Cancellation(token) => request.set_cancellation(token.clone()),
            Self::Modifier(hook) => hook.call(request),
        }
        Ok(())
    }
}

fn append_cookies(request: &mut Request, cookies: &[Cookie]) -> Result<()> {
    if cookies.is_empty() {
        return Ok(());
    }
    let rendered = cookies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    let value = match request.header(COOKIE.as_str()) {
        Some(existing) if !existing.is_empty() => format!("{existing}; {rendered}"),
        _ => rendered,
    };
    let value =
        HeaderValue::from_str(&value).map_err(|err| Error::invalid_header("cookie", err.to_string()))?;
    request.headers_mut().insert(COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::Method;

    fn request() -> Request {
        let url = Url::parse("http://localhost/").expect("valid URL");
        Request::builder(Method::Get, url).build()
    }

    fn applied(option: &RequestOption) -> Request {
        let mut request = request();
        option.apply(&mut request).expect("apply");
        request
    }

    #[test]
    fn basic_auth_header() {
        let request = applied(&RequestOption::basic_auth("user", "pass"));
        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn basic_auth_requires_both_parts() {
        let request = applied(&RequestOption::basic_auth("user", ""));
        assert!(request.header("authorization").is_none());

        let request = applied(&RequestOption::basic_auth("", "pass"));
        assert!(request.header("authorization").is_none());
    }

    #[test]
    fn bearer_and_api_key() {
        let request = applied(&RequestOption::bearer("abc"));
        assert_eq!(request.header("authorization"), Some("Bearer abc"));

        let request = applied(&RequestOption::api_key("k3y"));
        assert_eq!(request.header("authorization"), Some("Basic k3y"));
    }

    #[test]
    fn user_agent_and_accept() {
        let mut request = request();
        RequestOption::user_agent("courier-test/1.0")
            .apply(&mut request)
            .expect("apply");
        RequestOption::accept("application/xml")
            .apply(&mut request)
            .expect("apply");
        assert_eq!(request.header("user-agent"), Some("courier-test/1.0"));
        assert_eq!(request.header("accept"), Some("application/xml"));
    }

    #[test]
    fn headers_overwrite() {
        let mut request = request();
        RequestOption::headers([("X-Trace", "1"), ("X-Other", "a")])
            .apply(&mut request)
            .expect("apply");
        RequestOption::header("x-trace", "2")
            .apply(&mut request)
            .expect("apply");
        assert_eq!(request.headers().get_all("x-trace").iter().count(), 1);
        assert_eq!(request.header("x-trace"), Some("2"));
        assert_eq!(request.header("x-other"), Some("a"));
    }

    #[test]
    fn cookies_rendered_in_order() {
        let request = applied(&RequestOption::cookies([
            Cookie::new("session", "abc"),
            Cookie::new("theme", "dark"),
        ]));
        assert_eq!(request.header("cookie"), Some("session=abc; theme=dark"));
    }

    #[test]
    fn cancellation_is_attached() {
        let token = CancellationToken::new();
        let request = applied(&RequestOption::cancellation(token.clone()));
        token.cancel();
        assert!(request.cancellation().is_some_and(CancellationToken::is_cancelled));
    }

    #[test]
    fn only_hooks_are_modifiers() {
        assert!(RequestOption::modifier(|_| {}).is_modifier());
        assert!(!RequestOption::bearer("t").is_modifier());
    }
}
