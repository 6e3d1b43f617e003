//! Protocol description without actual network layer

pub mod api;
pub mod codec;

pub use api::Request;
pub use codec::IProtoType;

/// Request identifier which the connection uses to match a response with
/// its request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncIndex(pub u64);

impl SyncIndex {
    /// Returns the current index and advances to the next one.
    pub fn next_index(&mut self) -> Self {
        let sync = self.0;
        self.0 += 1;
        Self(sync)
    }
}

/// Error returned when a response body does not match the expected layout.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    #[error("field {key} not found in iproto response ({context})")]
    ResponseFieldNotFound {
        key: &'static str,
        context: &'static str,
    },

    #[error("malformed msgpack: {0}")]
    Malformed(String),
}
