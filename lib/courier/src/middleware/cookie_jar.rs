//! Cookie jar middleware.
//!
//! Before each exchange the jar's cookies for the target URL are appended to
//! the `Cookie` header; after it, every `Set-Cookie` of the response is
//! stored. Sitting beneath redirect following, the jar sees every hop.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::SystemTime;

use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use crate::{Cookie, Error, Request, RequestOption, Response, Result};

/// Storage for cookies across requests.
pub trait CookieJar: Send + Sync {
    /// Cookies to send to `url`.
    fn cookies(&self, url: &Url) -> Vec<Cookie>;

    /// Store cookies received from `url`.
    fn set_cookies(&self, url: &Url, cookies: &[Cookie]);
}

#[derive(Debug, Clone)]
struct StoredCookie {
    cookie: Cookie,
    domain: String,
    host_only: bool,
    path: String,
    expires_at: Option<SystemTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };

        domain_ok
            && path_matches(url.path(), &self.path)
            && (!self.cookie.secure() || url.scheme() == "https")
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.cookie.name() == other.cookie.name()
            && self.domain == other.domain
            && self.path == other.path
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

// RFC 6265 5.1.4
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    request_path == cookie_path
        || request_path.strip_prefix(cookie_path).is_some_and(|rest| {
            cookie_path.ends_with('/') || rest.starts_with('/')
        })
}

// RFC 6265 5.1.4
fn default_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => url.path().get(..index).unwrap_or("/").to_string(),
    }
}

/// In-memory [`CookieJar`] keyed by domain and path.
///
/// Cookies whose `Domain` does not cover the responding host are ignored.
/// A non-positive `Max-Age` or a past `Expires` removes the stored cookie;
/// stored cookies stop being sent once they expire.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    store: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored, unexpired cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = SystemTime::now();
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|stored| !stored.is_expired(now))
            .count()
    }

    /// Returns `true` if the jar holds no cookie.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookies(&self, url: &Url) -> Vec<Cookie> {
        let now = SystemTime::now();
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.retain(|stored| !stored.is_expired(now));
        store
            .iter()
            .filter(|stored| stored.matches(url))
            .map(|stored| stored.cookie.clone())
            .collect()
    }

    fn set_cookies(&self, url: &Url, cookies: &[Cookie]) {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return;
        };

        let now = SystemTime::now();
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        for cookie in cookies {
            let (domain, host_only) = match cookie.domain() {
                Some(domain) if domain_matches(&host, domain) => (domain.to_string(), false),
                Some(_) => continue,
                None => (host.clone(), true),
            };
            let stored = StoredCookie {
                cookie: cookie.clone(),
                domain,
                host_only,
                path: cookie
                    .path()
                    .filter(|path| path.starts_with('/'))
                    .map_or_else(|| default_path(url), ToString::to_string),
                expires_at: cookie.expires_at(now),
            };

            store.retain(|existing| !existing.same_slot(&stored));
            if !stored.is_expired(now) {
                store.push(stored);
            }
        }
    }
}

/// Layer that sends and stores cookies through a [`CookieJar`].
#[derive(Clone)]
pub struct CookieJarLayer {
    jar: Arc<dyn CookieJar>,
}

impl CookieJarLayer {
    /// Create a layer over `jar`.
    #[must_use]
    pub fn new(jar: Arc<dyn CookieJar>) -> Self {
        Self { jar }
    }
}

impl std::fmt::Debug for CookieJarLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJarLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for CookieJarLayer {
    type Service = CookieJarService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieJarService {
            inner,
            jar: Arc::clone(&self.jar),
        }
    }
}

/// Service that sends and stores cookies.
#[derive(Clone)]
pub struct CookieJarService<S> {
    inner: S,
    jar: Arc<dyn CookieJar>,
}

impl<S> Service<Request> for CookieJarService<S>
where
    S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let jar = Arc::clone(&self.jar);

        Box::pin(async move {
            let mut request = request;
            let url = request.url().clone();

            RequestOption::Cookies(jar.cookies(&url)).apply(&mut request)?;
            let response = inner.call(request).await?;

            if !response.cookies().is_empty() {
                debug!(url = %url, count = response.cookies().len(), "storing cookies");
                jar.set_cookies(&url, response.cookies());
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(value: &str) -> Url {
        Url::parse(value).expect("valid URL")
    }

    fn names(cookies: &[Cookie]) -> Vec<&str> {
        cookies.iter().map(Cookie::name).collect()
    }

    #[test]
    fn host_only_cookie() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies(&url("http://example.com/login"), &[Cookie::new("session", "abc")]);

        assert_eq!(names(&jar.cookies(&url("http://example.com/"))), ["session"]);
        assert!(jar.cookies(&url("http://api.example.com/")).is_empty());
        assert!(jar.cookies(&url("http://other.org/")).is_empty());
    }

    #[test]
    fn domain_cookie_covers_subdomains() {
        let jar = MemoryCookieJar::new();
        let cookie = Cookie::parse("id=1; Domain=example.com; Path=/").expect("cookie");
        jar.set_cookies(&url("http://www.example.com/"), &[cookie]);

        assert_eq!(names(&jar.cookies(&url("http://api.example.com/x"))), ["id"]);
        assert!(jar.cookies(&url("http://badexample.com/")).is_empty());
    }

    #[test]
    fn foreign_domain_is_rejected() {
        let jar = MemoryCookieJar::new();
        let cookie = Cookie::parse("id=1; Domain=evil.com").expect("cookie");
        jar.set_cookies(&url("http://example.com/"), &[cookie]);
        assert!(jar.is_empty());
    }

    #[test]
    fn path_scoping() {
        let jar = MemoryCookieJar::new();
        let cookie = Cookie::parse("a=1; Path=/docs").expect("cookie");
        jar.set_cookies(&url("http://example.com/"), &[cookie]);

        assert_eq!(names(&jar.cookies(&url("http://example.com/docs/web"))), ["a"]);
        assert!(jar.cookies(&url("http://example.com/documents")).is_empty());
        assert_eq!(default_path(&url("http://example.com/docs/page")), "/docs");
        assert_eq!(default_path(&url("http://example.com/page")), "/");
    }

    #[test]
    fn secure_cookie_needs_https() {
        let jar = MemoryCookieJar::new();
        let cookie = Cookie::parse("s=1; Secure").expect("cookie");
        jar.set_cookies(&url("https://example.com/"), &[cookie]);

        assert!(jar.cookies(&url("http://example.com/")).is_empty());
        assert_eq!(names(&jar.cookies(&url("https://example.com/"))), ["s"]);
    }

    #[test]
    fn replace_and_remove() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://example.com/");
        jar.set_cookies(&origin, &[Cookie::new("a", "1")]);
        jar.set_cookies(&origin, &[Cookie::new("a", "2")]);
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.cookies(&origin).first().map(Cookie::value), Some("2"));

        let removal = Cookie::parse("a=; Max-Age=0").expect("cookie");
        jar.set_cookies(&origin, &[removal]);
        assert!(jar.is_empty());
    }

    #[test]
    fn past_expires_removes_cookie() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://example.com/");
        jar.set_cookies(&origin, &[Cookie::parse("session=abc; Path=/").expect("cookie")]);
        assert_eq!(names(&jar.cookies(&origin)), ["session"]);

        let logout =
            Cookie::parse("session=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT").expect("cookie");
        jar.set_cookies(&origin, &[logout]);

        assert!(jar.cookies(&origin).is_empty());
        assert!(jar.is_empty());
    }

    #[test]
    fn future_expires_keeps_cookie() {
        let jar = MemoryCookieJar::new();
        let origin = url("http://example.com/");
        let cookie = Cookie::parse("remember=1; Expires=Fri, 01 Jan 2100 00:00:00 GMT").expect("cookie");
        jar.set_cookies(&origin, &[cookie]);

        assert_eq!(names(&jar.cookies(&origin)), ["remember"]);
    }
}
