//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    BodyReader, CancellationToken, ContentType, Cookie, Error, ErrorKind, Form, Method, Part,
    Payload, Request, RequestOption, Response, Result, Transport, encode_binary, encode_file,
    encode_form, encode_json, from_json, to_form, to_json,
};
