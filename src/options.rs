//! Per-space configuration and per-request options.
//!
//! [`SpaceOptions`] can be built in code or loaded from any serde format:
//!
//! ```
//! use tarantool_space::options::{CounterField, SpaceOptions};
//!
//! let opts: SpaceOptions = serde_json::from_str(r#"{"counter_field": {"explicit": 3}}"#).unwrap();
//! assert_eq!(opts.counter_field, CounterField::Explicit(3));
//! assert_eq!(opts.pairs_batch_size, SpaceOptions::default().pairs_batch_size);
//! ```

use serde::Deserialize;

/// Default number of rows fetched per round trip by `Space::pairs`.
pub const DEFAULT_PAIRS_BATCH_SIZE: u32 = 1000;

/// Where `Space::increment` and `Space::decrement` find the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    /// The field right after the last field of the primary key. Resolving it
    /// takes the primary index metadata, which is looked up once per space.
    ///
    /// This is a convention of the calling schema: a space where the counter
    /// lives elsewhere must use [`CounterField::Explicit`].
    #[default]
    AfterPrimaryKey,

    /// Zero based field offset. No catalog lookup is needed.
    Explicit(u32),
}

/// Configuration of a `Space` handle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpaceOptions {
    pub counter_field: CounterField,

    /// Rows per request in `Space::pairs`. Must be positive.
    pub pairs_batch_size: u32,
}

impl Default for SpaceOptions {
    fn default() -> Self {
        Self {
            counter_field: CounterField::default(),
            pairs_batch_size: DEFAULT_PAIRS_BATCH_SIZE,
        }
    }
}

/// Most index methods allow to pass an `options` argument.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Options {
    /// The `offset` option specifies the number of rows to skip before starting to return rows from the query.
    ///
    /// Default: `0`
    pub offset: u32,

    /// The `limit` option specifies the number of rows to return after the `offset` option has been processed.
    ///
    /// Treats as unlimited if `None` specified.
    /// Default: `None`
    pub limit: Option<u32>,
}
