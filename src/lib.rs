#![allow(clippy::let_and_return)]
//! Typed space and index access for a remote Tarantool instance.
//!
//! This library contains the following API's:
//!
//! - [Spaces](space): CRUD, atomic updates and counters, lazy primary index
//!   resolution, batched iteration
//! - [Indexes](index): metadata from the system catalog, ordered selects
//! - [Protocol description](network::protocol): request bodies and response
//!   decoding, without the actual network layer
//! - [Connection seam](network::client): the [`AsClient`](network::AsClient)
//!   trait a connection has to implement
//! - [Tuple utils](mod@tuple)
//! - [Configuration](options)
//! - [Error handling](error)
//!
//! The library does not open connections itself. Bring any type implementing
//! [`AsClient`](network::AsClient) and build a [`Space`] on top of it:
//!
//! ```no_run
//! # async fn f(conn: std::rc::Rc<impl tarantool_space::network::AsClient + 'static>) -> tarantool_space::Result<()> {
//! use tarantool_space::{Space, SpaceOptions, Tuple};
//!
//! let users = Space::fetch(conn, "users", SpaceOptions::default()).await?;
//! users.insert::<_, Tuple>(&(1, "Alice", 0)).await?;
//! let (id, name, visits): (u32, String, i64) = users.get(&(1,)).await?;
//! let updated: Vec<(u32, String, i64)> = users.increment(&(1,)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! All futures are `!Send`: the library is meant for a single threaded
//! cooperative runtime, like the fibers of Tarantool itself.
#[doc(hidden)]
pub mod define_str_enum;
pub mod error;
pub mod index;
#[doc(hidden)]
pub mod msgpack;
pub mod network;
pub mod options;
pub mod space;
pub mod tuple;
pub mod util;

pub use error::{Error, Result};
pub use index::{Index, IndexRef, IteratorType};
pub use options::{CounterField, Options, SpaceOptions};
pub use space::{Space, SystemSpace, UpdateOps};
pub use tuple::Tuple;

#[doc(hidden)]
pub use serde as __serde;
