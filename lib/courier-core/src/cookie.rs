//! HTTP cookies.
//!
//! Request cookies are rendered into the `Cookie` header as `name=value`
//! pairs. Response cookies are parsed from `Set-Cookie` headers, keeping the
//! attributes a client jar needs.

use std::fmt;
use std::time::{Duration, SystemTime};

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<i64>,
    expires: Option<SystemTime>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// Create a cookie with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Parse one `Set-Cookie` header value.
    ///
    /// Returns `None` when the leading `name=value` pair is missing or the
    /// name is empty. Unknown or malformed attributes are ignored.
    #[must_use]
    pub fn parse(header: &str) -> Option<Self> {
        let parsed = ::cookie::Cookie::parse(header).ok()?;

        let mut cookie = Self::new(parsed.name(), parsed.value().trim_matches('"'));
        cookie.path = parsed.path().map(ToString::to_string);
        cookie.domain = parsed
            .domain()
            .map(|domain| domain.trim_start_matches('.').to_ascii_lowercase())
            .filter(|domain| !domain.is_empty());
        cookie.max_age = parsed.max_age().map(|age| age.whole_seconds());
        cookie.expires = parsed.expires_datetime().map(SystemTime::from);
        cookie.secure = parsed.secure().unwrap_or(false);
        cookie.http_only = parsed.http_only().unwrap_or(false);
        Some(cookie)
    }

    /// Set the `Path` attribute.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the `Domain` attribute.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `Path` attribute.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// `Domain` attribute, lowercased and without a leading dot.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// `Max-Age` attribute in seconds.
    #[must_use]
    pub const fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// `Expires` attribute.
    #[must_use]
    pub const fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// `Secure` attribute.
    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    /// `HttpOnly` attribute.
    #[must_use]
    pub const fn http_only(&self) -> bool {
        self.http_only
    }

    /// When a cookie received at `received` stops being valid.
    ///
    /// `Max-Age` takes precedence over `Expires`; `None` means a session
    /// cookie.
    #[must_use]
    pub fn expires_at(&self, received: SystemTime) -> Option<SystemTime> {
        match self.max_age {
            Some(age) => {
                let age = Duration::from_secs(u64::try_from(age).unwrap_or(0));
                received.checked_add(age)
            }
            None => self.expires,
        }
    }

    /// Whether this cookie asks the client to drop a stored one: a
    /// non-positive `Max-Age`, or an `Expires` date that has passed.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        let now = SystemTime::now();
        self.expires_at(now).is_some_and(|expiry| expiry <= now)
    }
}

/// Renders the `name=value` pair sent in a `Cookie` header.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let cookie = Cookie::parse("session=abc123").expect("cookie");
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "abc123");
        assert!(cookie.path().is_none());
        assert_eq!(cookie.to_string(), "session=abc123");
    }

    #[test]
    fn parse_attributes() {
        let cookie = Cookie::parse(
            "id=\"a3fWa\"; Path=/docs; Domain=.Example.com; Max-Age=2592000; Secure; HttpOnly",
        )
        .expect("cookie");
        assert_eq!(cookie.value(), "a3fWa");
        assert_eq!(cookie.path(), Some("/docs"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.max_age(), Some(2_592_000));
        assert!(cookie.secure());
        assert!(cookie.http_only());
        assert!(!cookie.is_removal());
    }

    #[test]
    fn parse_removal() {
        let cookie = Cookie::parse("id=; Max-Age=0").expect("cookie");
        assert_eq!(cookie.value(), "");
        assert!(cookie.is_removal());
    }

    #[test]
    fn parse_past_expires_is_removal() {
        let cookie = Cookie::parse("session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
            .expect("cookie");
        assert_eq!(cookie.expires(), Some(SystemTime::UNIX_EPOCH));
        assert!(cookie.is_removal());
    }

    #[test]
    fn parse_future_expires_is_kept() {
        let cookie =
            Cookie::parse("session=abc; Expires=Fri, 01 Jan 2100 00:00:00 GMT").expect("cookie");
        assert!(!cookie.is_removal());
        assert!(cookie.expires_at(SystemTime::now()).is_some());
    }

    #[test]
    fn max_age_wins_over_expires() {
        let cookie = Cookie::parse("a=1; Max-Age=60; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
            .expect("cookie");
        assert!(!cookie.is_removal());

        let received = SystemTime::UNIX_EPOCH;
        assert_eq!(
            cookie.expires_at(received),
            Some(received + Duration::from_secs(60))
        );
        assert!(Cookie::new("a", "1").expires_at(received).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Cookie::parse("no-equals-sign").is_none());
        assert!(Cookie::parse("=value").is_none());
    }
}
