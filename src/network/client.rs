//! The connection seam.
//!
//! The space facade never opens sockets itself. It talks to the store
//! through any value implementing [`AsClient`]: a pipelined tcp client, a
//! connection pool or an in-memory fake in tests. The connection owns
//! framing, request ids, timeouts and reconnects; it only has to execute one
//! [`Request`] and hand back its decoded response.
//!
//! # Example
//! ```no_run
//! # async fn f(conn: impl tarantool_space::network::AsClient) {
//! use tarantool_space::network::client::AsClient as _;
//!
//! let len = conn.call("box.space.users:len", &()).await.unwrap();
//! let (len,): (u64,) = len.decode().unwrap();
//! # }
//! ```

use std::fmt;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use super::protocol::api::{Call, Request};
use crate::tuple::{ToTupleBuffer, Tuple};

/// An error reported by the store in response to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub code: u32,
    pub message: String,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code != 0 {
            write!(f, "server error #{}: {}", self.code, self.message)
        } else {
            write!(f, "server error: {}", self.message)
        }
    }
}

impl std::error::Error for ServerError {}

/// Error returned by an [`AsClient`] implementation.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ClientError {
    /// The connection was closed because of this error.
    ///
    /// It is suggested to recreate the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(Arc<io::Error>),

    /// Error happened during encoding of the request.
    #[error("{0}")]
    RequestEncode(Box<crate::error::Error>),

    /// Error happened during decoding of the response.
    #[error("{0}")]
    ResponseDecode(Box<crate::error::Error>),

    /// Service responded with an error.
    #[error("{0}")]
    ErrorResponse(ServerError),

    /// No response arrived in time.
    #[error("request timed out")]
    Timeout,
}

/// Generic API for an entity that behaves as a client of the store.
#[async_trait::async_trait(?Send)]
pub trait AsClient {
    /// Send [`Request`] and wait for response.
    /// This function yields.
    ///
    /// # Errors
    /// In case of [`ClientError::ConnectionClosed`] it is suggested to
    /// recreate the connection. Other errors are self-descriptive.
    async fn send<R: Request>(&self, request: &R) -> Result<R::Response, ClientError>;

    /// Call a remote stored procedure.
    ///
    /// `conn.call("func", &("1", "2", "3"))` is the remote-call equivalent of `func('1', '2', '3')`.
    /// The return from `conn.call` is whatever the function returns.
    async fn call<T>(&self, fn_name: &str, args: &T) -> Result<Tuple, ClientError>
    where
        T: ToTupleBuffer + ?Sized,
    {
        self.send(&Call { fn_name, args }).await
    }
}

#[async_trait::async_trait(?Send)]
impl<C> AsClient for Rc<C>
where
    C: AsClient + ?Sized,
{
    #[inline(always)]
    async fn send<R: Request>(&self, request: &R) -> Result<R::Response, ClientError> {
        (**self).send(request).await
    }
}
