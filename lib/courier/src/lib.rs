//! Convenience HTTP client for Rust.
//!
//! Describe a call with a verb, a URL, at most one body and any number of
//! options, then send it through a [`Session`] backed by Hyper and Tower.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let response = courier::get("https://api.example.com/users/42")
//!     .accept("application/json")
//!     .bearer(token)
//!     .send()
//!     .await?;
//! let user: User = response.json()?;
//! ```
//!
//! Sessions carry defaults shared by every call:
//!
//! ```ignore
//! use courier::{Session, middleware::{LogTracer, MemoryCookieJar}};
//! use std::{sync::Arc, time::Duration};
//!
//! let session = Session::builder()
//!     .user_agent("my-app/1.0")
//!     .timeout(Duration::from_secs(30))
//!     .cookie_jar(Arc::new(MemoryCookieJar::new()))
//!     .tracer(LogTracer::new())
//!     .build();
//! ```

use std::sync::OnceLock;

mod config;
mod connector;
mod dispatch;
pub mod middleware;
mod options;
pub mod prelude;
mod session;
mod transport;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use connector::https_connector;
pub use dispatch::{BoxedService, Dispatch, Middleware, ServiceFuture, compose};
pub use options::{CallOption, Options, ResponseHook, TransportOption};
pub use session::{Call, CallBuilder, Session, SessionBuilder};
pub use transport::HyperTransport;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Binary, BodyKind, BodyReader, BoxError, CancellationToken, ContentType, Cookie,
    DEFAULT_FILE_FIELD, Error, ErrorKind, Form, Json, Method, Modifier, MultipartFile, Part,
    Payload, RawBody, Request, RequestBuilder, RequestOption, Response, Result, Text, Transport,
    TransportFuture, UrlEncoded, assemble, encode_binary, encode_file, encode_form, encode_json,
    from_json, to_form, to_json,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};

pub use url;

/// The process-wide session used by the free functions.
///
/// Created on first use with no default options.
///
/// Its connection pool belongs to the tokio runtime that first sends through
/// it, so the free functions are meant for programs with one runtime. Code
/// that starts several runtimes (each `#[tokio::test]` has its own) should
/// build a [`Session`] per runtime instead.
pub fn default_session() -> &'static Session {
    static DEFAULT: OnceLock<Session> = OnceLock::new();
    DEFAULT.get_or_init(Session::new)
}

/// Start a GET call on the [default session](default_session).
pub fn get(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().get(url)
}

/// Start a POST call on the [default session](default_session).
pub fn post(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().post(url)
}

/// Start a PUT call on the [default session](default_session).
pub fn put(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().put(url)
}

/// Start a DELETE call on the [default session](default_session).
pub fn delete(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().delete(url)
}

/// Start a PATCH call on the [default session](default_session).
pub fn patch(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().patch(url)
}

/// Start a HEAD call on the [default session](default_session).
pub fn head(url: impl Into<String>) -> CallBuilder<'static> {
    default_session().head(url)
}

/// Start a call with any method on the [default session](default_session).
pub fn request(method: Method, url: impl Into<String>) -> CallBuilder<'static> {
    default_session().request(method, url)
}
