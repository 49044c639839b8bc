//! The transport seam.
//!
//! A [`Transport`] performs one HTTP exchange and hands back the raw response
//! with its body still unread. Wire protocol, pooling, TLS and DNS all live
//! behind this trait; the runtime crate ships a hyper-based implementation and
//! tests plug in their own.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;

use crate::{Request, Result};

/// Boxed error carried by a [`RawBody`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An unread response body.
pub type RawBody = UnsyncBoxBody<Bytes, BoxError>;

/// Future returned by [`Transport::round_trip`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<http::Response<RawBody>>> + Send + 'a>>;

/// Performs a single HTTP exchange.
///
/// Implementations must not follow redirects, store cookies or enforce
/// timeouts; those are middleware concerns.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use courier_core::{RawBody, Request, Transport, TransportFuture};
/// use http_body_util::{BodyExt, Full};
///
/// struct Canned;
///
/// impl Transport for Canned {
///     fn round_trip(&self, _request: Request) -> TransportFuture<'_> {
///         Box::pin(async {
///             let body: RawBody = Full::new(Bytes::from_static(b"ok"))
///                 .map_err(|never| match never {})
///                 .boxed_unsync();
///             Ok(http::Response::new(body))
///         })
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Send the request and return the response head with an unread body.
    fn round_trip(&self, request: Request) -> TransportFuture<'_>;
}
