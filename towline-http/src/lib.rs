//! HTTP conveniences for towline connections.
//!
//! [`HttpConnection`] wraps a core [`towline::Connection`] with typed
//! request setters (method, headers, redirect policy) and response
//! accessors that parse the status code and header fields out of the
//! accumulated response-header buffer. The wire work stays in the transfer
//! engine; this crate only shapes its inputs and outputs.

mod connection;
mod response;

/// An HTTP-flavored connection wrapping [`towline::Connection`].
pub use connection::HttpConnection;
