//! Indices
//!
//! Index definitions are read from the `_vindex` system space of the store:
//! one row per index, `[space_id, index_id, name, type, opts, parts]`. A
//! decoded row is [`Metadata`]; metadata bound to a connection is an
//! [`Index`], which can be used to read tuples in index order.
//!
//! See also:
//! - [Indexes](https://www.tarantool.io/en/doc/latest/book/box/data_model/#indexes)
//! - [Lua reference: Submodule box.index](https://www.tarantool.io/en/doc/latest/reference/reference_lua/box_index/)
use std::fmt;
use std::rc::Rc;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::network::client::AsClient;
use crate::network::protocol::api::Select;
use crate::network::protocol::ProtocolError;
use crate::options::Options;
use crate::space::{SpaceId, SystemSpace};
use crate::tuple::{decode_rows, DecodeOwned, ToTupleBuffer, Tuple};

pub type IndexId = u32;

/// Id of the `_vindex` index keyed by `(space_id, index_id)`.
const VINDEX_BY_ID: IndexId = 0;
/// Id of the `_vindex` index keyed by `(space_id, name)`.
const VINDEX_BY_NAME: IndexId = 2;

/// Controls how to iterate over tuples in an index.
/// Different index types support different iterator types.
/// For example, one can start iteration from a particular value
/// (request key) and then retrieve all tuples where keys are
/// greater or equal (= `GE`) to this key.
///
/// An empty request key corresponds to the first or last key in the index,
/// depending on iteration direction. For `Eq`, the key must not be empty.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum IteratorType {
    /// key == x ASC order
    #[default]
    Eq = 0,

    /// key == x DESC order
    Req = 1,

    /// all tuples
    All = 2,

    /// key <  x
    LT = 3,

    /// key <= x
    LE = 4,

    /// key >= x
    GE = 5,

    /// key >  x
    GT = 6,

    /// all bits from x are set in key
    BitsAllSet = 7,

    /// at least one x's bit is set
    BitsAnySet = 8,

    /// all bits are not set
    BitsAllNotSet = 9,

    /// key overlaps x
    Overlaps = 10,

    /// tuples in distance ascending order from specified point
    Neighbor = 11,
}

/// Returned when a catalog string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

////////////////////////////////////////////////////////////////////////////////
// IndexType
////////////////////////////////////////////////////////////////////////////////

crate::define_str_enum! {
    /// Type of index.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum IndexType {
        Hash = "hash",
        Tree = "tree",
        Bitset = "bitset",
        Rtree = "rtree",
    }
    FromStr::Err = UnknownVariant;
}

impl Default for IndexType {
    #[inline(always)]
    fn default() -> Self {
        Self::Tree
    }
}

////////////////////////////////////////////////////////////////////////////////
// FieldType
////////////////////////////////////////////////////////////////////////////////

crate::define_str_enum! {
    /// Type of index part.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum FieldType {
        Any       = "any",
        Unsigned  = "unsigned",
        String    = "string",
        Number    = "number",
        Double    = "double",
        Integer   = "integer",
        Boolean   = "boolean",
        Varbinary = "varbinary",
        Scalar    = "scalar",
        Decimal   = "decimal",
        Uuid      = "uuid",
        Datetime  = "datetime",
        Array     = "array",
        Map       = "map",
    }
    FromStr::Err = UnknownVariant;
}

////////////////////////////////////////////////////////////////////////////////
// Part
////////////////////////////////////////////////////////////////////////////////

/// Index part: which field of the tuple takes part in the key and how it is
/// compared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    /// Zero based offset of the field in the tuple.
    pub field_no: u32,
    pub field_type: FieldType,
    pub collation: Option<String>,
    pub is_nullable: bool,
}

impl Part {
    #[inline(always)]
    pub fn new(field_no: u32, field_type: FieldType) -> Self {
        Self {
            field_no,
            field_type,
            collation: None,
            is_nullable: false,
        }
    }
}

impl From<(u32, FieldType)> for Part {
    #[inline(always)]
    fn from((f, t): (u32, FieldType)) -> Self {
        Self::new(f, t)
    }
}

/// Collations are stored by id in the catalog, but may also come by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(u32),
    Str(String),
}

impl From<NumOrStr> for String {
    fn from(v: NumOrStr) -> Self {
        match v {
            NumOrStr::Num(n) => n.to_string(),
            NumOrStr::Str(s) => s,
        }
    }
}

/// Accepts both catalog layouts of a part:
/// - legacy: `[field_no, "type"]`
/// - current: `{field = field_no, type = "type", is_nullable = bool, collation = id}`
impl<'de> Deserialize<'de> for Part {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PartVisitor;

        impl<'de> Visitor<'de> for PartVisitor {
            type Value = Part;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an index part as [field, type] or {field=, type=}")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Part, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let field_no = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let field_type = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(Part::new(field_no, field_type))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Part, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut field_no = None;
                let mut field_type = None;
                let mut collation = None;
                let mut is_nullable = false;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "field" => field_no = Some(map.next_value()?),
                        "type" => field_type = Some(map.next_value()?),
                        "collation" => {
                            collation = map.next_value::<Option<NumOrStr>>()?.map(String::from)
                        }
                        "is_nullable" => is_nullable = map.next_value()?,
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(Part {
                    field_no: field_no.ok_or_else(|| de::Error::missing_field("field"))?,
                    field_type: field_type.ok_or_else(|| de::Error::missing_field("type"))?,
                    collation,
                    is_nullable,
                })
            }
        }

        deserializer.deserialize_any(PartVisitor)
    }
}

////////////////////////////////////////////////////////////////////////////////
// IndexRef
////////////////////////////////////////////////////////////////////////////////

/// Identifies an index of a space either by id or by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexRef {
    Id(IndexId),
    Name(String),
}

impl fmt::Display for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<IndexId> for IndexRef {
    #[inline(always)]
    fn from(id: IndexId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for IndexRef {
    #[inline(always)]
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl From<String> for IndexRef {
    #[inline(always)]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Metadata
////////////////////////////////////////////////////////////////////////////////

/// Representation of a tuple holding index metadata in system `_vindex` space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub space_id: SpaceId,
    pub index_id: IndexId,
    pub name: String,
    pub index_type: IndexType,
    pub unique: bool,
    /// Never empty.
    pub parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(default)]
struct IndexOpts {
    unique: bool,
}

impl Default for IndexOpts {
    fn default() -> Self {
        Self { unique: true }
    }
}

#[derive(Deserialize)]
struct IndexRow {
    space_id: SpaceId,
    index_id: IndexId,
    name: String,
    index_type: IndexType,
    opts: IndexOpts,
    parts: Vec<Part>,
}

impl Metadata {
    /// Decodes a `_vindex` row of the space named `space`.
    ///
    /// # Errors
    /// [`Error::CatalogInvariant`] if the index has no parts.
    pub fn from_catalog_row(space: &str, row: &Tuple) -> Result<Self> {
        let IndexRow {
            space_id,
            index_id,
            name,
            index_type,
            opts,
            parts,
        } = row.decode()?;
        if parts.is_empty() {
            log::error!("index '{name}' of space '{space}' has no parts");
            return Err(Error::CatalogInvariant {
                space: space.into(),
                details: format!("index '{name}' has no parts"),
            });
        }
        Ok(Self {
            space_id,
            index_id,
            name,
            index_type,
            unique: opts.unique,
            parts,
        })
    }

    /// Largest field offset referenced by any part.
    #[inline]
    pub fn max_field_no(&self) -> u32 {
        self.parts.iter().map(|p| p.field_no).max().unwrap_or(0)
    }

    /// Builds the key of `tuple` according to the index parts.
    pub fn extract_key(&self, tuple: &Tuple) -> Result<Tuple> {
        let value = tuple.to_value()?;
        let fields = value.as_array().map(Vec::as_slice).unwrap_or_default();
        let key = self
            .parts
            .iter()
            .map(|p| {
                fields.get(p.field_no as usize).cloned().ok_or_else(|| {
                    ProtocolError::Malformed(format!(
                        "tuple has no field #{} required by index '{}'",
                        p.field_no, self.name
                    ))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Tuple::from_values(&key)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Index
////////////////////////////////////////////////////////////////////////////////

/// An index of a remote space.
///
/// Cheap to clone: metadata is shared.
#[derive(Debug, Clone)]
pub struct Index<C> {
    conn: C,
    space: Rc<str>,
    meta: Rc<Metadata>,
}

impl<C> Index<C>
where
    C: AsClient,
{
    #[inline(always)]
    pub fn new(conn: C, space: impl Into<Rc<str>>, meta: Metadata) -> Self {
        Self {
            conn,
            space: space.into(),
            meta: Rc::new(meta),
        }
    }

    /// Looks up the index `index` of space `space_id` in `_vindex`.
    ///
    /// # Errors
    /// - [`Error::NoSuchIndex`] if the catalog has no such index.
    /// - [`Error::CatalogInvariant`] if the catalog has more than one.
    pub async fn fetch(
        conn: C,
        space: impl Into<Rc<str>>,
        space_id: SpaceId,
        index: IndexRef,
    ) -> Result<Self> {
        let space = space.into();
        log::debug!("looking up index {index} of space '{space}' in _vindex");
        let rows = match &index {
            IndexRef::Id(id) => {
                lookup_vindex(&conn, VINDEX_BY_ID, &(space_id, *id)).await?
            }
            IndexRef::Name(name) => {
                lookup_vindex(&conn, VINDEX_BY_NAME, &(space_id, name.as_str())).await?
            }
        };
        let row = match rows.as_slice() {
            [row] => row,
            [] => {
                return Err(Error::NoSuchIndex {
                    space: space.to_string(),
                    index,
                })
            }
            rows => {
                log::error!(
                    "_vindex returned {} rows for index {index} of space '{space}'",
                    rows.len()
                );
                return Err(Error::CatalogInvariant {
                    space: space.to_string(),
                    details: format!("{} catalog rows for index {index}", rows.len()),
                });
            }
        };
        let meta = Metadata::from_catalog_row(&space, row)?;
        Ok(Self {
            conn,
            space,
            meta: Rc::new(meta),
        })
    }

    #[inline(always)]
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    #[inline(always)]
    pub fn id(&self) -> IndexId {
        self.meta.index_id
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Reads tuples in index order starting at `key` according to
    /// `iterator_type`.
    pub async fn select<T, K>(
        &self,
        iterator_type: IteratorType,
        key: &K,
        options: &Options,
    ) -> Result<Vec<T>>
    where
        T: DecodeOwned,
        K: ToTupleBuffer + ?Sized,
    {
        let rows = self.select_rows(iterator_type, key, options).await?;
        decode_rows(rows)
    }

    pub(crate) async fn select_rows<K>(
        &self,
        iterator_type: IteratorType,
        key: &K,
        options: &Options,
    ) -> Result<Vec<Tuple>>
    where
        K: ToTupleBuffer + ?Sized,
    {
        log::trace!(
            "select {:?} from index '{}' of space '{}'",
            iterator_type,
            self.meta.name,
            self.space
        );
        let rows = self
            .conn
            .send(&Select {
                space_id: self.meta.space_id,
                index_id: self.meta.index_id,
                limit: options.limit.unwrap_or(u32::MAX),
                offset: options.offset,
                iterator_type,
                key,
            })
            .await?;
        Ok(rows)
    }

    /// Returns the only tuple matching `key` exactly.
    ///
    /// # Errors
    /// [`Error::EmptyResult`] if no tuple matches.
    pub async fn get<T, K>(&self, key: &K) -> Result<T>
    where
        T: DecodeOwned,
        K: ToTupleBuffer + ?Sized,
    {
        let options = Options {
            limit: Some(1),
            ..Default::default()
        };
        let rows = self.select_rows(IteratorType::Eq, key, &options).await?;
        single_row(&self.space, rows)?.decode()
    }

    /// Builds the key of `tuple` according to this index.
    #[inline(always)]
    pub fn extract_key(&self, tuple: &Tuple) -> Result<Tuple> {
        self.meta.extract_key(tuple)
    }
}

async fn lookup_vindex<C, K>(conn: &C, index_id: IndexId, key: &K) -> Result<Vec<Tuple>>
where
    C: AsClient,
    K: ToTupleBuffer + ?Sized,
{
    let rows = conn
        .send(&Select {
            space_id: SystemSpace::VIndex as SpaceId,
            index_id,
            limit: u32::MAX,
            offset: 0,
            iterator_type: IteratorType::Eq,
            key,
        })
        .await?;
    Ok(rows)
}

/// Checks that a lookup by unique key produced exactly one row.
pub(crate) fn single_row(space: &str, mut rows: Vec<Tuple>) -> Result<Tuple> {
    match rows.len() {
        1 => Ok(rows.remove(0)),
        0 => Err(Error::EmptyResult {
            space: space.into(),
        }),
        actual => Err(Error::UnexpectedRowCount {
            space: space.into(),
            expected: 1,
            actual,
        }),
    }
}
