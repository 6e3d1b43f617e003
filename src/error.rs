//! Error handling utils.
//!
//! Every fallible routine of the crate returns [`Error`]. Errors produced by
//! the connection (closed socket, malformed response, an error reported by
//! the server, a timeout) are carried in [`Error::Client`] exactly as the
//! connection returned them. All other variants are raised locally by the
//! space/index facade.
//!
//! [`Error`] is [`Clone`]: the outcome of a memoized catalog lookup is handed
//! to every task that was waiting for it. Payloads which are not `Clone`
//! themselves are wrapped in an [`Arc`].

use std::io;
use std::sync::Arc;

use rmp::decode::{MarkerReadError, NumValueReadError, ValueReadError};
use rmp::encode::ValueWriteError;

use crate::index::IndexRef;
use crate::network::client::ClientError;
use crate::network::protocol::ProtocolError;
use crate::util::DisplayAsHexBytes;

/// A specialized [`Result`] type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Represents all error cases for all routines of the crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Catalog has no index with the given name or id in the space.
    #[error("no index {index} in space '{space}'")]
    NoSuchIndex { space: String, index: IndexRef },

    /// Catalog has no space with the given name.
    #[error("no space named '{0}'")]
    NoSuchSpace(String),

    /// The system catalog returned data which contradicts its own schema,
    /// e.g. two rows for a unique key. Not recoverable locally.
    #[error("catalog invariant violated in space '{space}': {details}")]
    CatalogInvariant { space: String, details: String },

    /// A lookup which must produce a row produced none.
    #[error("no tuple found in space '{space}'")]
    EmptyResult { space: String },

    #[error("unexpected result in space '{space}': expected {expected} row(s), got {actual}")]
    UnexpectedRowCount {
        space: String,
        expected: usize,
        actual: usize,
    },

    #[error("operation '{0}' is not supported yet")]
    NotSupported(&'static str),

    /// Failure reported by the connection, passed through unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    IO(Arc<io::Error>),

    #[error("failed to encode tuple: {0}")]
    Encode(#[from] Encode),

    #[error("failed to decode tuple: {error} when decoding msgpack {} into rust type {expected_type}", DisplayAsHexBytes(.actual_msgpack))]
    Decode {
        error: Arc<rmp_serde::decode::Error>,
        expected_type: String,
        actual_msgpack: Vec<u8>,
    },

    #[error("msgpack read error: {0}")]
    ValueRead(Arc<ValueReadError>),

    #[error("numeric value read error: {0}")]
    NumValueRead(Arc<NumValueReadError>),

    #[error("msgpack write error: {0}")]
    ValueWrite(Arc<ValueWriteError>),
}

impl Error {
    #[inline(always)]
    pub fn decode<T>(error: rmp_serde::decode::Error, data: Vec<u8>) -> Self {
        Error::Decode {
            error: Arc::new(error),
            expected_type: std::any::type_name::<T>().into(),
            actual_msgpack: data,
        }
    }

    /// Returns the server error code if this error was reported by the
    /// remote instance.
    pub fn server_error_code(&self) -> Option<u32> {
        match self {
            Error::Client(ClientError::ErrorResponse(e)) => Some(e.code),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::IO(Arc::new(error))
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(error: rmp_serde::encode::Error) -> Self {
        Encode::from(error).into()
    }
}

impl From<ValueReadError> for Error {
    fn from(error: ValueReadError) -> Self {
        Error::ValueRead(Arc::new(error))
    }
}

impl From<MarkerReadError> for Error {
    fn from(error: MarkerReadError) -> Self {
        Error::ValueRead(Arc::new(error.into()))
    }
}

impl From<NumValueReadError> for Error {
    fn from(error: NumValueReadError) -> Self {
        Error::NumValueRead(Arc::new(error))
    }
}

impl From<ValueWriteError> for Error {
    fn from(error: ValueWriteError) -> Self {
        Error::ValueWrite(Arc::new(error))
    }
}

/// Error that can happen when serializing a tuple
#[derive(Debug, Clone, thiserror::Error)]
pub enum Encode {
    #[error("{0}")]
    Rmp(Arc<rmp_serde::encode::Error>),

    #[error("invalid msgpack value (expected array, found {})", DisplayAsHexBytes(.0))]
    InvalidMP(Vec<u8>),

    #[error("failed to convert value: {0}")]
    Value(Arc<rmpv::ext::Error>),
}

impl From<rmpv::ext::Error> for Error {
    fn from(error: rmpv::ext::Error) -> Self {
        Encode::Value(Arc::new(error)).into()
    }
}

impl From<rmp_serde::encode::Error> for Encode {
    fn from(error: rmp_serde::encode::Error) -> Self {
        Encode::Rmp(Arc::new(error))
    }
}
