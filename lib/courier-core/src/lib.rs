//! Core types for the courier HTTP client.
//!
//! This crate is transport-agnostic:
//! - [`BodyReader`] and the encoders ([`encode_json`], [`encode_form`], ...) - outgoing payloads
//! - [`Form`] and [`Part`] - multipart writer
//! - [`Request`], [`RequestOption`] and [`assemble`] - request building
//! - [`Response`] - fully read responses with decode helpers
//! - [`Transport`] - the seam to the network
//! - [`Error`], [`ErrorKind`] and [`Result`] - error handling
//! - [`StatusCode`] and [`header`] - re-exported from the `http` crate

mod body;
mod cookie;
mod error;
mod method;
mod multipart;
mod option;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{
    Binary, BodyKind, BodyReader, ContentType, DEFAULT_FILE_FIELD, Json, MultipartFile, Payload,
    Text, UrlEncoded, encode_binary, encode_file, encode_form, encode_json, from_json, to_form,
    to_json,
};
pub use cookie::Cookie;
pub use error::{Error, ErrorKind, Result};
pub use method::Method;
pub use multipart::{Form, Part};
pub use option::{Modifier, RequestOption};
pub use request::{Request, RequestBuilder, assemble};
pub use response::Response;
pub use transport::{BoxError, RawBody, Transport, TransportFuture};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};

// Re-export the cancellation handle carried by requests
pub use tokio_util::sync::CancellationToken;
