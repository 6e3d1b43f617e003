//! Connection seam and IPROTO request descriptors.
//!
//! Consists of:
//! - Transport agnostic [`protocol`] layer: typed request descriptors and the
//!   msgpack codec for request and response bodies
//! - [`client`] layer: the [`AsClient`] trait a connection implements to
//!   carry those requests over the wire
//!
//! Framing, sockets, authentication and request multiplexing live behind
//! [`AsClient`] and are not part of this crate.

pub mod client;
pub mod protocol;

pub use client::{AsClient, ClientError, ServerError};
pub use protocol::api::Request;
