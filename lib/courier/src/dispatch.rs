//! Dispatcher composition.
//!
//! A dispatcher is a Tower service turning a [`Request`] into a materialized
//! [`Response`]. [`Dispatch`] is the base one, backed by a [`Transport`];
//! [`compose`] wraps it in the built-in middleware and then in every declared
//! transport option.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};

use crate::middleware::{CookieJarLayer, DEFAULT_TIMEOUT, FollowRedirectLayer, TimeoutLayer};
use crate::{Error, Request, Response, Result, Transport, TransportOption};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased dispatcher.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for dispatcher services.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// A wrapper around a dispatcher.
///
/// Built from any Tower [`Layer`] over [`BoxedService`], or from a plain
/// function.
///
/// # Example
///
/// ```ignore
/// use courier::Middleware;
/// use courier::middleware::TimeoutLayer;
/// use std::time::Duration;
///
/// let timeout = Middleware::from_layer(TimeoutLayer::new(Duration::from_secs(2)));
/// let noop = Middleware::from_fn(|service| service);
/// ```
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>);

impl Middleware {
    /// Wrap a Tower layer.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }))
    }

    /// Wrap a function from dispatcher to dispatcher.
    pub fn from_fn(wrap: impl Fn(BoxedService) -> BoxedService + Send + Sync + 'static) -> Self {
        Self(Arc::new(wrap))
    }

    /// Apply to a dispatcher.
    #[must_use]
    pub fn wrap(&self, service: BoxedService) -> BoxedService {
        (self.0)(service)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware(..)")
    }
}

// ============================================================================
// Base Dispatcher
// ============================================================================

/// Sends a request through a [`Transport`] and materializes the response.
///
/// Honors the request's cancellation token while waiting for the response
/// head and while draining the body.
#[derive(Clone)]
pub struct Dispatch {
    transport: Arc<dyn Transport>,
}

impl Dispatch {
    /// Create a dispatcher over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

impl Service<Request> for Dispatch {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = Arc::clone(&self.transport);

        Box::pin(async move {
            let cancellation = request.cancellation().cloned();
            let exchange = async {
                let raw = transport.round_trip(request).await?;
                Response::materialize(raw).await
            };

            match cancellation {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => Err(Error::Cancelled),
                    result = exchange => result,
                },
                None => exchange.await,
            }
        })
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Build the dispatcher for one call.
///
/// From the inside out: the base [`Dispatch`], the cookie jar (last declared
/// wins), redirect following (unless any option disallows it), the default
/// timeout (unless any option sets one), then the declared options folded in
/// reverse so that the first declared is the outermost.
#[must_use]
pub fn compose(transport: Arc<dyn Transport>, options: &[TransportOption]) -> BoxedService {
    let mut service = Dispatch::new(transport).boxed_clone();

    if let Some(jar) = options.iter().rev().find_map(TransportOption::as_cookie_jar) {
        service = CookieJarLayer::new(jar).layer(service).boxed_clone();
    }

    if !options
        .iter()
        .any(|option| matches!(option, TransportOption::DisallowRedirects))
    {
        service = FollowRedirectLayer::new().layer(service).boxed_clone();
    }

    if !options
        .iter()
        .any(|option| matches!(option, TransportOption::Timeout(_)))
    {
        service = TimeoutLayer::new(DEFAULT_TIMEOUT)
            .layer(service)
            .boxed_clone();
    }

    options
        .iter()
        .rev()
        .fold(service, |service, option| option.wrap(service))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use tokio_util::sync::CancellationToken;
    use url::Url;

    use super::*;
    use crate::{Method, RawBody, TransportFuture};

    struct Echo;

    impl Transport for Echo {
        fn round_trip(&self, request: Request) -> TransportFuture<'_> {
            Box::pin(async move {
                let body: RawBody = Full::new(request.body().cloned().unwrap_or_default())
                    .map_err(|never| match never {})
                    .boxed_unsync();
                let response = http::Response::builder()
                    .status(200)
                    .body(body)
                    .map_err(|err| Error::invalid_request(err.to_string()))?;
                Ok(response)
            })
        }
    }

    struct Stalled;

    impl Transport for Stalled {
        fn round_trip(&self, _request: Request) -> TransportFuture<'_> {
            Box::pin(std::future::pending::<Result<http::Response<RawBody>>>())
        }
    }

    fn request() -> Request {
        let url = Url::parse("http://localhost/echo").expect("valid URL");
        Request::builder(Method::Post, url).body("ping").build()
    }

    #[tokio::test]
    async fn dispatch_materializes() {
        let mut service = compose(Arc::new(Echo), &[]);
        let response = service
            .ready()
            .await
            .expect("ready")
            .call(request())
            .await
            .expect("response");
        assert_eq!(response.content(), &Bytes::from_static(b"ping"));
        assert_eq!(response.content_length(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn default_timeout_applies() {
        let service = compose(Arc::new(Stalled), &[]);
        let err = service.oneshot(request()).await.expect_err("timeout");
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn declared_timeout_replaces_default() {
        let service = compose(
            Arc::new(Stalled),
            &[TransportOption::timeout(Duration::from_secs(60))],
        );
        let started = tokio::time::Instant::now();
        let err = service.oneshot(request()).await.expect_err("timeout");
        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let mut request = request();
        request.set_cancellation(token);

        let service = compose(Arc::new(Stalled), &[]);
        let err = service.oneshot(request).await.expect_err("cancelled");
        assert!(err.is_cancelled());
    }
}
