//! Sessions and calls.
//!
//! A [`Session`] holds default options, a transport and an optional tracer.
//! Every verb method returns a [`CallBuilder`]; all of them end in
//! [`Session::send`].
//!
//! # Example
//!
//! ```ignore
//! use courier::{Session, middleware::LogTracer};
//! use std::time::Duration;
//!
//! let session = Session::builder()
//!     .user_agent("my-app/1.0")
//!     .bearer(token)
//!     .timeout(Duration::from_secs(30))
//!     .tracer(LogTracer::new())
//!     .build();
//!
//! let response = session
//!     .post("https://api.example.com/v1/test")
//!     .text("Hello World")
//!     .send()
//!     .await?;
//! assert_eq!(response.text(), "Complete");
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tower::{Layer, Service, ServiceExt};
use tracing::debug;

use crate::middleware::{CookieJar, TraceLayer, Tracer};
use crate::{
    BodyReader, BoxedService, CallOption, CancellationToken, ClientConfig, Cookie, Error, Form,
    HyperTransport, Method, Options, Request, RequestOption, Response, Result, Transport,
    TransportOption, assemble, compose, encode_binary, encode_file, encode_form, encode_json,
};

// ============================================================================
// Session
// ============================================================================

/// Long-lived client configuration.
///
/// Immutable once built and cheap to clone. Each call resolves its own
/// dispatcher, so one session can serve concurrent tasks.
#[derive(Clone)]
pub struct Session {
    transport: Arc<dyn Transport>,
    defaults: Options,
    tracer: Option<Arc<dyn Tracer>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("defaults", &self.defaults)
            .field("traced", &self.tracer.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session with no default options over a [`HyperTransport`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new session builder.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Options applied to every call, before the call's own.
    #[must_use]
    pub const fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Start a GET call.
    pub fn get(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Get, url)
    }

    /// Start a POST call.
    pub fn post(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Post, url)
    }

    /// Start a PUT call.
    pub fn put(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Put, url)
    }

    /// Start a DELETE call.
    pub fn delete(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Delete, url)
    }

    /// Start a PATCH call.
    pub fn patch(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Patch, url)
    }

    /// Start a HEAD call.
    pub fn head(&self, url: impl Into<String>) -> CallBuilder<'_> {
        self.request(Method::Head, url)
    }

    /// Start a call with any method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> CallBuilder<'_> {
        CallBuilder::new(self, method, url.into())
    }

    /// Assemble and dispatch a call.
    ///
    /// Session defaults come first: their request options apply before the
    /// call's, and their transport options wrap the call's.
    ///
    /// # Errors
    ///
    /// Returns URL, encoding and configuration errors before any network
    /// activity, and transport errors unchanged.
    pub async fn send(&self, call: Call) -> Result<Response> {
        let Call {
            method,
            url,
            body,
            options,
        } = call;

        let options = self.defaults.merged(&options);
        let request = assemble(method, &url, body, options.request())?;
        debug!(method = %request.method(), url = %request.url(), "dispatching");

        self.dispatcher(options.transport()).oneshot(request).await
    }

    /// The dispatcher for a call declaring `options`.
    ///
    /// Built fresh for every call; the session tracer is outermost.
    #[must_use]
    pub fn dispatcher(&self, options: &[TransportOption]) -> BoxedService {
        let service = compose(Arc::clone(&self.transport), options);
        match &self.tracer {
            Some(tracer) => TraceLayer::new(Arc::clone(tracer))
                .layer(service)
                .boxed_clone(),
            None => service,
        }
    }
}

// ============================================================================
// Session Builder
// ============================================================================

/// Builder for [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    defaults: Options,
    transport: Option<Arc<dyn Transport>>,
    config: Option<ClientConfig>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("defaults", &self.defaults)
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .field("traced", &self.tracer.is_some())
            .finish()
    }
}

impl SessionBuilder {
    /// Add a default option.
    #[must_use]
    pub fn option(mut self, option: impl Into<CallOption>) -> Self {
        self.defaults.push(option);
        self
    }

    /// Add several default options.
    #[must_use]
    pub fn options<O: Into<CallOption>>(mut self, options: impl IntoIterator<Item = O>) -> Self {
        self.defaults.extend(options);
        self
    }

    /// Default header.
    #[must_use]
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(RequestOption::header(name, value))
    }

    /// Default `User-Agent`.
    #[must_use]
    pub fn user_agent(self, agent: impl Into<String>) -> Self {
        self.option(RequestOption::user_agent(agent))
    }

    /// Default `Accept`.
    #[must_use]
    pub fn accept(self, content_type: impl Into<String>) -> Self {
        self.option(RequestOption::accept(content_type))
    }

    /// Default basic authentication.
    #[must_use]
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.option(RequestOption::basic_auth(username, password))
    }

    /// Default bearer token.
    #[must_use]
    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.option(RequestOption::bearer(token))
    }

    /// Default API key.
    #[must_use]
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.option(RequestOption::api_key(key))
    }

    /// Cookies sent on every call.
    #[must_use]
    pub fn cookies(self, cookies: impl IntoIterator<Item = Cookie>) -> Self {
        self.option(RequestOption::cookies(cookies))
    }

    /// Session-wide timeout, bounding every call.
    #[must_use]
    pub fn timeout(self, duration: Duration) -> Self {
        self.option(TransportOption::timeout(duration))
    }

    /// Never follow redirects.
    #[must_use]
    pub fn disallow_redirects(self) -> Self {
        self.option(TransportOption::disallow_redirects())
    }

    /// Cookie jar shared by every call.
    #[must_use]
    pub fn cookie_jar(self, jar: Arc<dyn CookieJar>) -> Self {
        self.option(TransportOption::CookieJar(jar))
    }

    /// Session-wide Tower layer.
    #[must_use]
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.option(TransportOption::layer(layer))
    }

    /// Tracer wrapping every call, outside all middleware.
    #[must_use]
    pub fn tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    /// Use a custom transport instead of [`HyperTransport`].
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Configuration for the default [`HyperTransport`].
    ///
    /// Ignored when a custom transport is set.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the session.
    #[must_use]
    pub fn build(self) -> Session {
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(HyperTransport::with_config(self.config.unwrap_or_default()))
        });

        Session {
            transport,
            defaults: self.defaults,
            tracer: self.tracer,
        }
    }
}

// ============================================================================
// Calls
// ============================================================================

/// One fully described call, ready for [`Session::send`].
#[derive(Debug)]
pub struct Call {
    method: Method,
    url: String,
    body: Option<BodyReader>,
    options: Options,
}

impl Call {
    /// Create a call.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        body: Option<BodyReader>,
        options: Options,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            options,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL as given.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Encoded body.
    #[must_use]
    pub const fn body(&self) -> Option<&BodyReader> {
        self.body.as_ref()
    }

    /// Options declared for this call.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }
}

/// Builder for one call on a [`Session`].
///
/// Encoding errors and a second body are recorded and reported by
/// [`build`](Self::build) or [`send`](Self::send), before any network
/// activity.
#[derive(Debug)]
#[must_use = "a call does nothing until sent"]
pub struct CallBuilder<'a> {
    session: &'a Session,
    method: Method,
    url: String,
    body: Option<BodyReader>,
    options: Options,
    error: Option<Error>,
}

impl<'a> CallBuilder<'a> {
    fn new(session: &'a Session, method: Method, url: String) -> Self {
        Self {
            session,
            method,
            url,
            body: None,
            options: Options::new(),
            error: None,
        }
    }

    fn set_body(mut self, body: Result<BodyReader>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match (body, &self.body) {
            (Err(err), _) => self.error = Some(err),
            (Ok(second), Some(first)) => {
                self.error = Some(Error::MultipleBodies {
                    first: first.kind(),
                    second: second.kind(),
                });
            }
            (Ok(body), None) => self.body = Some(body),
        }
        self
    }

    /// Use an already encoded body.
    pub fn body(self, body: BodyReader) -> Self {
        self.set_body(Ok(body))
    }

    /// `text/plain` body.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.set_body(Ok(BodyReader::text(text)))
    }

    /// JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> Self {
        self.set_body(encode_json(value))
    }

    /// `application/octet-stream` body in the binary codec.
    pub fn binary<T: serde::Serialize + ?Sized>(self, value: &T) -> Self {
        self.set_body(encode_binary(value))
    }

    /// URL-encoded form body.
    pub fn form<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_body(encode_form(fields))
    }

    /// Multipart upload of a file, followed by `fields` in order.
    ///
    /// `field_name` defaults to `"file"`.
    pub fn file<K, V>(
        self,
        field_name: Option<&str>,
        path: impl AsRef<Path>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_body(encode_file(field_name, path, fields))
    }

    /// Hand-built multipart body.
    pub fn multipart(self, form: Form) -> Self {
        self.set_body(BodyReader::encode(form))
    }

    /// Add an option.
    pub fn option(mut self, option: impl Into<CallOption>) -> Self {
        self.options.push(option);
        self
    }

    /// Header.
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option(RequestOption::header(name, value))
    }

    /// Several headers.
    pub fn headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.option(RequestOption::headers(headers))
    }

    /// `User-Agent`.
    pub fn user_agent(self, agent: impl Into<String>) -> Self {
        self.option(RequestOption::user_agent(agent))
    }

    /// `Accept`.
    pub fn accept(self, content_type: impl Into<String>) -> Self {
        self.option(RequestOption::accept(content_type))
    }

    /// Basic authentication.
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.option(RequestOption::basic_auth(username, password))
    }

    /// Bearer token.
    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.option(RequestOption::bearer(token))
    }

    /// API key.
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.option(RequestOption::api_key(key))
    }

    /// Cookies.
    pub fn cookies(self, cookies: impl IntoIterator<Item = Cookie>) -> Self {
        self.option(RequestOption::cookies(cookies))
    }

    /// Cancellation handle.
    pub fn cancellation(self, token: CancellationToken) -> Self {
        self.option(RequestOption::cancellation(token))
    }

    /// Hook run on the assembled request, after every other option.
    pub fn modifier(self, hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.option(RequestOption::modifier(hook))
    }

    /// Timeout for this call.
    pub fn timeout(self, duration: Duration) -> Self {
        self.option(TransportOption::timeout(duration))
    }

    /// Do not follow redirects.
    pub fn disallow_redirects(self) -> Self {
        self.option(TransportOption::disallow_redirects())
    }

    /// Cookie jar for this call.
    pub fn cookie_jar(self, jar: Arc<dyn CookieJar>) -> Self {
        self.option(TransportOption::CookieJar(jar))
    }

    /// Tracer for this call.
    pub fn trace(self, tracer: impl Tracer + 'static) -> Self {
        self.option(TransportOption::trace(tracer))
    }

    /// Hook run on the successful response.
    pub fn callback(self, hook: impl Fn(&Response) + Send + Sync + 'static) -> Self {
        self.option(TransportOption::callback(hook))
    }

    /// Tower layer for this call.
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.option(TransportOption::layer(layer))
    }

    /// Finish describing the call.
    ///
    /// # Errors
    ///
    /// Returns the first body encoding error, or [`Error::MultipleBodies`].
    pub fn build(self) -> Result<Call> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Call::new(self.method, self.url, self.body, self.options))
    }

    /// Build and send the call.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build) and [`Session::send`].
    pub async fn send(self) -> Result<Response> {
        let session = self.session;
        let call = self.build()?;
        session.send(call).await
    }
}
