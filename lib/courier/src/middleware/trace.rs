//! Request tracing middleware.
//!
//! A [`Tracer`] observes each call without altering it: the response or
//! error produced beneath it is returned unchanged. [`LogTracer`] reports
//! through the `tracing` crate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Error, Request, Response, Result};

/// How a traced call ended.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// A response was received, whatever its status.
    Response(&'a Response),
    /// The call failed.
    Error(&'a Error),
}

/// Observer of dispatched calls.
pub trait Tracer: Send + Sync {
    /// Called before the request goes down the chain.
    fn on_start(&self, request: &Request);

    /// Called with the outcome once the chain returned.
    fn on_finish(&self, request: &Request, outcome: Outcome<'_>, elapsed: Duration);
}

/// Log level for [`LogTracer`].
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at debug level (request headers included).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// [`Tracer`] writing `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer {
    level: LogLevel,
}

impl LogTracer {
    /// Create a tracer logging at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracer logging at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }
}

impl Tracer for LogTracer {
    fn on_start(&self, request: &Request) {
        let method = request.method();
        let url = request.url();
        match self.level {
            LogLevel::Debug => {
                debug!(
                    method = %method,
                    url = %url,
                    headers = ?request.headers(),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(method = %method, url = %url, "sending request");
            }
        }
    }

    fn on_finish(&self, _request: &Request, outcome: Outcome<'_>, elapsed: Duration) {
        // Saturating conversion to u64 (truncates after ~584 million years)
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Outcome::Response(response) => {
                let status = response.status();
                if response.is_success() || response.is_redirection() {
                    info!(status, elapsed_ms, "request completed");
                } else {
                    warn!(status, elapsed_ms, "request failed with HTTP error");
                }
            }
            Outcome::Error(err) => {
                warn!(error = %err, kind = %err.kind(), elapsed_ms, "request failed");
            }
        }
    }
}

/// Layer that reports each call to a [`Tracer`].
#[derive(Clone)]
pub struct TraceLayer {
    tracer: Arc<dyn Tracer>,
}

impl TraceLayer {
    /// Create a layer reporting to `tracer`.
    #[must_use]
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }
}

impl std::fmt::Debug for TraceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceLayer").finish_non_exhaustive()
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = Trace<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Trace {
            inner,
            tracer: Arc::clone(&self.tracer),
        }
    }
}

/// Service that reports calls to a [`Tracer`] inside an `http_request` span.
#[derive(Clone)]
pub struct Trace<S> {
    inner: S,
    tracer: Arc<dyn Tracer>,
}

impl<S> Service<Request> for Trace<S>
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
        let method = request.method();
        let url = request.url().to_string();
        let span = span!(Level::INFO, "http_request", %method, %url);

        let mut inner = self.inner.clone();
        let tracer = Arc::clone(&self.tracer);
        Box::pin(
            async move {
                let start = Instant::now();
                tracer.on_start(&request);
                let observed = request.clone();

                let result = inner.call(request).await;

                let outcome = match &result {
                    Ok(response) => Outcome::Response(response),
                    Err(err) => Outcome::Error(err),
                };
                tracer.on_finish(&observed, outcome, start.elapsed());

                result
            }
            .instrument(span),
        )
    }
}
