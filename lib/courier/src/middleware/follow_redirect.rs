//! Follow redirect middleware.
//!
//! Follows 3xx responses carrying a `Location` header, resolving relative
//! locations against the current URL. A redirect without `Location` is
//! returned to the caller unchanged.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Layer that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Create a new follow redirect layer with default max redirects (10).
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Create a new follow redirect layer with a custom max redirects.
    #[must_use]
    pub fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// 307 and 308 keep the method and body; the others switch to GET,
/// except that HEAD stays HEAD.
fn redirect_method(status: u16, original: Method) -> Method {
    if matches!(status, 307 | 308) || original == Method::Head {
        original
    } else {
        Method::Get
    }
}

fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    base_url.join(location).map_err(|err| {
        Error::InvalidRedirect(format!("unusable Location '{location}': {err}"))
    })
}

fn same_origin_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Build the next hop from the request that produced `status`.
fn next_request(current: &Request, status: u16, url: Url) -> Request {
    let mut next = current.clone();
    let method = redirect_method(status, current.method().clone());

    if !matches!(status, 307 | 308) {
        next.take_body();
        next.headers_mut().remove(CONTENT_TYPE);
        next.headers_mut().remove(CONTENT_LENGTH);
    }
    if !same_origin_host(current.url(), &url) {
        next.headers_mut().remove(AUTHORIZATION);
        next.headers_mut().remove(COOKIE);
    }

    next.set_method(method);
    next.set_url(url);
    next
}

impl<S> Service<Request> for FollowRedirect<S>
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
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current_request = request;
            let mut redirects = 0;

            loop {
                let response = inner.call(current_request.clone()).await?;

                if !is_redirect(response.status()) {
                    return Ok(response);
                }

                let Some(location) = response.header(LOCATION.as_str()) else {
                    return Ok(response);
                };

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: redirects,
                        max: max_redirects,
                    });
                }

                let new_url = resolve_redirect_url(current_request.url(), location)?;
                debug!(
                    status = response.status(),
                    from = %current_request.url(),
                    to = %new_url,
                    "following redirect"
                );

                current_request = next_request(&current_request, response.status(), new_url);
                redirects += 1;
            }
        })
    }
}
