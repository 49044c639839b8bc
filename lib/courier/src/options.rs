//! Transport-scoped options and option lists.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tower::{Layer, Service, ServiceExt};

use crate::middleware::{CookieJar, TimeoutLayer, TraceLayer, Tracer};
use crate::{BoxedService, Error, Middleware, Request, RequestOption, Response};

/// A hook observing every successful response.
#[derive(Clone)]
pub struct ResponseHook(Arc<dyn Fn(&Response) + Send + Sync>);

impl ResponseHook {
    /// Wrap a closure.
    pub fn new(hook: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }
}

impl fmt::Debug for ResponseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseHook(..)")
    }
}

/// An option wrapping the dispatcher.
///
/// Middleware-like options ([`Timeout`](Self::Timeout),
/// [`Trace`](Self::Trace), [`Callback`](Self::Callback),
/// [`Layer`](Self::Layer)) wrap in declaration order, first declared
/// outermost. [`DisallowRedirects`](Self::DisallowRedirects) and
/// [`CookieJar`](Self::CookieJar) configure the built-in stack instead.
#[derive(Clone)]
pub enum TransportOption {
    /// Fail with [`Error::Timeout`] when the wrapped call takes longer.
    ///
    /// Declaring any timeout replaces the 10 second default.
    Timeout(Duration),
    /// Return redirect responses as-is.
    DisallowRedirects,
    /// Send stored cookies and store `Set-Cookie` responses.
    CookieJar(Arc<dyn CookieJar>),
    /// Observe start and completion.
    Trace(Arc<dyn Tracer>),
    /// Run a hook on every successful response.
    Callback(ResponseHook),
    /// Caller-supplied middleware.
    Layer(Middleware),
}

impl TransportOption {
    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(duration: Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Stop at the first redirect response.
    #[must_use]
    pub const fn disallow_redirects() -> Self {
        Self::DisallowRedirects
    }

    /// Cookie jar.
    pub fn cookie_jar(jar: impl CookieJar + 'static) -> Self {
        Self::CookieJar(Arc::new(jar))
    }

    /// Tracer.
    pub fn trace(tracer: impl Tracer + 'static) -> Self {
        Self::Trace(Arc::new(tracer))
    }

    /// Response hook.
    pub fn callback(hook: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        Self::Callback(ResponseHook::new(hook))
    }

    /// Tower layer.
    pub fn layer<L>(layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::Layer(Middleware::from_layer(layer))
    }

    /// Plain function middleware.
    pub fn layer_fn(wrap: impl Fn(BoxedService) -> BoxedService + Send + Sync + 'static) -> Self {
        Self::Layer(Middleware::from_fn(wrap))
    }

    /// The jar, if this is a [`CookieJar`](Self::CookieJar) option.
    #[must_use]
    pub fn as_cookie_jar(&self) -> Option<Arc<dyn CookieJar>> {
        match self {
            Self::CookieJar(jar) => Some(Arc::clone(jar)),
            _ => None,
        }
    }

    /// Wrap `service`; configuration-only options return it unchanged.
    #[must_use]
    pub fn wrap(&self, service: BoxedService) -> BoxedService {
        match self {
            Self::Timeout(duration) => TimeoutLayer::new(*duration).layer(service).boxed_clone(),
            Self::Trace(tracer) => TraceLayer::new(Arc::clone(tracer))
                .layer(service)
                .boxed_clone(),
            Self::Callback(ResponseHook(hook)) => {
                let hook = Arc::clone(hook);
                service
                    .map_response(move |response| {
                        hook(&response);
                        response
                    })
                    .boxed_clone()
            }
            Self::Layer(middleware) => middleware.wrap(service),
            Self::DisallowRedirects | Self::CookieJar(_) => service,
        }
    }
}

impl fmt::Debug for TransportOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(duration) => f.debug_tuple("Timeout").field(duration).finish(),
            Self::DisallowRedirects => f.write_str("DisallowRedirects"),
            Self::CookieJar(_) => f.write_str("CookieJar(..)"),
            Self::Trace(_) => f.write_str("Trace(..)"),
            Self::Callback(hook) => f.debug_tuple("Callback").field(hook).finish(),
            Self::Layer(middleware) => f.debug_tuple("Layer").field(middleware).finish(),
        }
    }
}

/// Either kind of option.
#[derive(Debug, Clone)]
pub enum CallOption {
    /// Mutates the outgoing request.
    Request(RequestOption),
    /// Wraps the dispatcher.
    Transport(TransportOption),
}

impl From<RequestOption> for CallOption {
    fn from(option: RequestOption) -> Self {
        Self::Request(option)
    }
}

impl From<TransportOption> for CallOption {
    fn from(option: TransportOption) -> Self {
        Self::Transport(option)
    }
}

/// Ordered request-scoped and transport-scoped options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    request: Vec<RequestOption>,
    transport: Vec<TransportOption>,
}

impl Options {
    /// Empty option list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an option.
    pub fn push(&mut self, option: impl Into<CallOption>) {
        match option.into() {
            CallOption::Request(option) => self.request.push(option),
            CallOption::Transport(option) => self.transport.push(option),
        }
    }

    /// Request-scoped options in declaration order.
    #[must_use]
    pub fn request(&self) -> &[RequestOption] {
        &self.request
    }

    /// Transport-scoped options in declaration order.
    #[must_use]
    pub fn transport(&self) -> &[TransportOption] {
        &self.transport
    }

    /// `self` followed by `inner`, so that `self` wraps `inner`.
    #[must_use]
    pub fn merged(&self, inner: &Self) -> Self {
        Self {
            request: self.request.iter().chain(&inner.request).cloned().collect(),
            transport: self
                .transport
                .iter()
                .chain(&inner.transport)
                .cloned()
                .collect(),
        }
    }

    /// Returns `true` if no option was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.transport.is_empty()
    }
}

impl<O: Into<CallOption>> Extend<O> for Options {
    fn extend<I: IntoIterator<Item = O>>(&mut self, iter: I) {
        for option in iter {
            self.push(option);
        }
    }
}

impl<O: Into<CallOption>> FromIterator<O> for Options {
    fn from_iter<I: IntoIterator<Item = O>>(iter: I) -> Self {
        let mut options = Self::new();
        options.extend(iter);
        options
    }
}
