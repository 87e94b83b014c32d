//! # Relaygate kernel crate.
//!
//! Route matching, filter chains and upstream forwarding.

#![deny(clippy::unwrap_used, clippy::dbg_macro, clippy::unimplemented, clippy::todo, clippy::missing_safety_doc)]
#![warn(
    clippy::missing_errors_doc,
    clippy::indexing_slicing,
    clippy::inline_always,
    clippy::fn_params_excessive_bools,
    missing_debug_implementations
)]
/// a boxed body
pub mod body;
/// request dispatching
pub mod dispatcher;
/// gateway error
pub mod error;
/// per request context
pub mod exchange;
/// filters and filter chains
pub mod filter;
/// filters applied to every route
pub mod global_filter;
/// tcp listener
pub mod listener;
/// local handlers for `forward:` routes
pub mod local;
/// predicate combinators
pub mod predicate;
/// routes and route table
pub mod route;
/// gateway service
pub mod service;
/// upstream client and forwarder
pub mod upstream;
/// util functions and structs
pub mod utils;

pub use body::RgBody;
pub use error::GatewayError;
pub use exchange::Exchange;
use hyper::{body::Bytes, Request, Response, StatusCode};
pub use tokio_util::sync::CancellationToken;

pub type BoxResult<T> = Result<T, BoxError>;
/// A boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Alias for a request with a boxed body.
pub type RgRequest = Request<RgBody>;
/// Alias for a response with a boxed body.
pub type RgResponse = Response<RgBody>;

/// Provides extension methods for [`Response`](hyper::Response).
pub trait RgResponseExt {
    fn with_code_message(code: StatusCode, message: impl Into<Bytes>) -> Self;
    fn with_code_empty(code: StatusCode) -> Self;
}

impl RgResponseExt for Response<RgBody> {
    fn with_code_message(code: StatusCode, message: impl Into<Bytes>) -> Self {
        let mut resp = Response::new(RgBody::full(message));
        *resp.status_mut() = code;
        resp
    }
    fn with_code_empty(code: StatusCode) -> Self {
        let mut resp = Response::new(RgBody::empty());
        *resp.status_mut() = code;
        resp
    }
}
