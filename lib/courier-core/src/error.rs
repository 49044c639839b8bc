//! Error types for courier.

use derive_more::{Display, Error, From};

use crate::BodyKind;

// ============================================================================
// Error Kind
// ============================================================================

/// Coarse classification of an [`Error`].
///
/// Lets callers branch on the failure family without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The endpoint could not be parsed.
    #[display("url")]
    Url,
    /// A payload could not be serialized, or the call carried more than one body.
    #[display("encoding")]
    Encoding,
    /// A file could not be read, or a response body could not be drained.
    #[display("io")]
    Io,
    /// The transport failed to complete the exchange.
    #[display("transport")]
    Transport,
    /// The request was built from invalid configuration.
    #[display("configuration")]
    Configuration,
    /// A materialized response body could not be decoded.
    #[display("decode")]
    Decode,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// Binary serialization error.
    #[display("binary serialization error: {_0}")]
    #[from]
    BinarySerialization(postcard::Error),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// A multipart section could not be written.
    #[display("multipart encoding error: {_0}")]
    #[from(skip)]
    Multipart(#[error(not(source))] String),

    /// A second body was supplied for a call that already had one.
    #[display("request body set more than once ({first} then {second})")]
    #[from(skip)]
    MultipleBodies {
        /// Kind of the body supplied first.
        first: BodyKind,
        /// Kind of the rejected body.
        second: BodyKind,
    },

    /// Local I/O failure (e.g. reading a file to upload).
    #[display("{context}: {source}")]
    #[from(skip)]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The response body could not be fully read.
    #[display("unable to read response body: {_0}")]
    #[from(skip)]
    BodyRead(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request's cancellation token fired before the exchange completed.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// A header name or value is not valid HTTP.
    #[display("invalid header '{name}': {message}")]
    #[from(skip)]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// XML deserialization error.
    #[display("XML deserialization error: {_0}")]
    #[from]
    XmlDeserialization(quick_xml::DeError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid header error.
    #[must_use]
    pub fn invalid_header(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a multipart encoding error.
    #[must_use]
    pub fn multipart(message: impl Into<String>) -> Self {
        Self::Multipart(message.into())
    }

    /// Create a local I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a response body read error.
    #[must_use]
    pub fn body_read(message: impl Into<String>) -> Self {
        Self::BodyRead(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The failure family of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::Url,
            Self::JsonSerialization(_)
            | Self::BinarySerialization(_)
            | Self::FormSerialization(_)
            | Self::Multipart(_)
            | Self::MultipleBodies { .. } => ErrorKind::Encoding,
            Self::Io { .. } | Self::BodyRead(_) => ErrorKind::Io,
            Self::Connection(_)
            | Self::Tls(_)
            | Self::Timeout
            | Self::Cancelled
            | Self::TooManyRedirects { .. }
            | Self::InvalidRedirect(_) => ErrorKind::Transport,
            Self::InvalidHeader { .. } | Self::InvalidRequest(_) => ErrorKind::Configuration,
            Self::JsonDeserialization { .. } | Self::XmlDeserialization(_) => ErrorKind::Decode,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::json_deserialization("user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'user.address.city': missing field `city`"
        );

        let err = Error::MultipleBodies {
            first: BodyKind::Json,
            second: BodyKind::Form,
        };
        assert_eq!(
            err.to_string(),
            "request body set more than once (json then form)"
        );
    }

    #[test]
    fn error_kinds() {
        let url_err = url::Url::parse("not a url").expect_err("invalid url");
        assert_eq!(Error::from(url_err).kind(), ErrorKind::Url);
        assert_eq!(Error::multipart("bad").kind(), ErrorKind::Encoding);
        assert_eq!(
            Error::io("open", std::io::Error::other("boom")).kind(),
            ErrorKind::Io
        );
        assert_eq!(Error::body_read("eof").kind(), ErrorKind::Io);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Transport);
        assert_eq!(Error::tls("handshake").kind(), ErrorKind::Transport);
        assert_eq!(
            Error::invalid_header("bad name", "invalid").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::json_deserialization("", "eof").kind(),
            ErrorKind::Decode
        );
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;

        let err = Error::io(
            "unable to open file",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "unable to open file: missing");
        assert!(err.source().is_some());
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Cancelled.is_timeout());
        assert!(Error::Cancelled.is_cancelled());
        assert!(Error::connection("failed").is_connection());
        assert!(!Error::Timeout.is_connection());
    }
}
