//! HTTP method types.

use std::str::FromStr;

use derive_more::Display;

use crate::Error;

/// HTTP request method.
///
/// The common verbs have their own variant; any other valid method token is
/// carried as [`Method::Extension`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - retrieve a resource.
    #[display("GET")]
    Get,
    /// POST method - create a resource.
    #[display("POST")]
    Post,
    /// PUT method - replace a resource.
    #[display("PUT")]
    Put,
    /// DELETE method - remove a resource.
    #[display("DELETE")]
    Delete,
    /// PATCH method - partially update a resource.
    #[display("PATCH")]
    Patch,
    /// HEAD method - retrieve headers only.
    #[display("HEAD")]
    Head,
    /// OPTIONS method - retrieve allowed methods.
    #[display("OPTIONS")]
    Options,
    /// TRACE method - loop-back diagnostic.
    #[display("TRACE")]
    Trace,
    /// CONNECT method - establish a tunnel.
    #[display("CONNECT")]
    Connect,
    /// Any other method, e.g. `PURGE` or WebDAV's `PROPFIND`.
    #[display("{_0}")]
    Extension(http::Method),
}

impl Method {
    /// Returns `true` if the method is safe (does not modify resources).
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options | Self::Trace)
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Standard verbs match case-insensitively; extension methods are kept
    /// exactly as written.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let method = match value.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "CONNECT" => Self::Connect,
            _ => {
                let method = http::Method::from_bytes(value.as_bytes()).map_err(|err| {
                    Error::invalid_request(format!("invalid HTTP method '{value}': {err}"))
                })?;
                Self::Extension(method)
            }
        };
        Ok(method)
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        let standard = match method.as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "TRACE" => Some(Self::Trace),
            "CONNECT" => Some(Self::Connect),
            _ => None,
        };
        standard.unwrap_or_else(|| Self::Extension(method))
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Delete => Self::DELETE,
            Method::Patch => Self::PATCH,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
            Method::Trace => Self::TRACE,
            Method::Connect => Self::CONNECT,
            Method::Extension(method) => method,
        }
    }
}
