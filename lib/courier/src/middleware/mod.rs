//! Tower middleware layers for courier dispatchers.
//!
//! Every layer here wraps a service from [`Request`](crate::Request) to
//! [`Response`](crate::Response). The built-in stack is assembled by
//! [`compose`](crate::compose); any of these layers can also be declared
//! explicitly through [`TransportOption::layer`](crate::TransportOption::layer).
//!
//! # Available Layers
//!
//! - [`TimeoutLayer`] - Fails with `Error::Timeout` past a deadline
//! - [`FollowRedirectLayer`] - Follows 301, 302, 303, 307 and 308 responses
//! - [`CookieJarLayer`] - Sends and stores cookies through a [`CookieJar`]
//! - [`TraceLayer`] - Reports start and completion to a [`Tracer`]
//!
//! # Example
//!
//! ```ignore
//! use courier::middleware::{LogTracer, TimeoutLayer};
//! use courier::{Session, TransportOption};
//! use std::time::Duration;
//!
//! let session = Session::builder()
//!     .tracer(LogTracer::new())
//!     .option(TransportOption::layer(TimeoutLayer::new(Duration::from_secs(5))))
//!     .build();
//! ```

mod cookie_jar;
mod follow_redirect;
mod timeout;
mod trace;

pub use cookie_jar::{CookieJar, CookieJarLayer, CookieJarService, MemoryCookieJar};
pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use timeout::{DEFAULT_TIMEOUT, Timeout, TimeoutLayer};
pub use trace::{LogLevel, LogTracer, Outcome, Trace, TraceLayer, Tracer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
