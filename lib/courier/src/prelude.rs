//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions for easy
//! glob importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::middleware::{CookieJar, LogTracer, MemoryCookieJar, Tracer};
pub use crate::{
    BodyReader, CallBuilder, CancellationToken, ClientConfig, ContentType, Cookie, Error,
    ErrorKind, Form, Method, Part, Request, RequestOption, Response, Result, Session, StatusCode,
    Transport, TransportOption, encode_binary, encode_file, encode_form, encode_json, header,
};
pub use serde::{Deserialize, Serialize};
