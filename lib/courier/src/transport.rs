//! Network transport using hyper-util.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use crate::{
    BoxError, Error, Request, Result, Transport, TransportFuture, config::ClientConfig,
    connector::https_connector,
};

/// Pooled HTTP/1.1 and HTTP/2 transport with rustls.
///
/// Performs exactly one exchange per call: no redirects, no cookies, no
/// timeout beyond the connect timeout. Cloning shares the connection pool.
///
/// # Example
///
/// ```ignore
/// use courier::{ClientConfig, HyperTransport, Session};
/// use std::time::Duration;
///
/// let transport = HyperTransport::with_config(
///     ClientConfig::builder()
///         .connect_timeout(Duration::from_secs(2))
///         .build(),
/// );
/// let session = Session::builder().transport(transport).build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .retry_canceled_requests(config.retry_on_connection_failure)
            .build(https_connector(&config));

        Self { inner, config }
    }

    /// The transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_hyper_request(request: Request) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(body.map_or_else(Full::default, Full::new))
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = match std::error::Error::source(&err) {
            Some(source) => format!("{err}: {source}"),
            None => err.to_string(),
        };

        if err.is_connect() {
            return Error::connection(msg);
        }

        let lower = msg.to_ascii_lowercase();
        if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: Request) -> TransportFuture<'_> {
        Box::pin(async move {
            let hyper_request = Self::build_hyper_request(request)?;
            let response = self
                .inner
                .request(hyper_request)
                .await
                .map_err(Self::map_hyper_error)?;

            Ok(response.map(|body| {
                body.map_err(|err| Box::new(err) as BoxError)
                    .boxed_unsync()
            }))
        })
    }
}
