//! Spaces
//!
//! A space is a container for tuples. [`Space`] is a typed handle to a space
//! of a remote store: it turns calls like [`Space::insert`] or
//! [`Space::increment`] into requests and sends them through the connection
//! it was created with.
//!
//! Space metadata comes from the `_vspace` system space, index metadata from
//! `_vindex`. The primary index is looked up lazily on first use and the
//! lookup is shared by all concurrent callers (see [`Space::primary_key`]).
//!
//! See also:
//! - [Lua reference: Submodule box.space](https://www.tarantool.io/en/doc/latest/reference/reference_lua/box_space/)
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::rc::Rc;

use futures::stream::{self, LocalBoxStream, StreamExt, TryStreamExt};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::index::{
    self, Index, IndexId, IndexRef, IteratorType, Metadata as IndexMetadata, UnknownVariant,
};
use crate::network::client::AsClient;
use crate::network::protocol::api::{Delete, Insert, Replace, Request, Select, Update, Upsert};
use crate::network::protocol::ProtocolError;
use crate::options::{CounterField, Options, SpaceOptions};
use crate::tuple::{decode_rows, DecodeOwned, Encode, ToTupleBuffer, Tuple};
use crate::util::SharedLazy;

pub type SpaceId = u32;

/// End of the reserved range of space ids.
///
/// Ids of all system spaces are less than or equal to this value.
pub const SYSTEM_ID_MAX: SpaceId = 511;

const PRIMARY_INDEX_ID: IndexId = 0;
/// Id of the `_vspace` index keyed by `name`.
const VSPACE_BY_NAME: IndexId = 2;

/// Id of a system space.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemSpace {
    /// Space id of _schema.
    Schema = 272,
    /// Space id of _collation.
    Collation = 276,
    /// Space id of _vcollation.
    VCollation = 277,
    /// Space id of _space.
    Space = 280,
    /// Space id of _vspace view.
    VSpace = 281,
    /// Space id of _sequence.
    Sequence = 284,
    /// Space id of _vsequence view.
    VSequence = 286,
    /// Space id of _index.
    Index = 288,
    /// Space id of _vindex view.
    VIndex = 289,
    /// Space id of _func.
    Func = 296,
    /// Space id of _vfunc view.
    VFunc = 297,
    /// Space id of _user.
    User = 304,
    /// Space id of _vuser view.
    VUser = 305,
}

impl From<SystemSpace> for SpaceId {
    #[inline(always)]
    fn from(ss: SystemSpace) -> Self {
        ss as SpaceId
    }
}

/// Type of engine, used by space.
#[derive(Copy, Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpaceEngineType {
    Memtx,
    Vinyl,
}

impl<'de> Deserialize<'de> for SpaceEngineType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let str = String::deserialize(deserializer)?.trim().to_lowercase();

        const MEMTX: &str = "memtx";
        const VINYL: &str = "vinyl";

        Ok(match str.as_str() {
            MEMTX => Self::Memtx,
            VINYL => Self::Vinyl,
            _ => {
                return Err(serde::de::Error::unknown_variant(&str, &[MEMTX, VINYL]));
            }
        })
    }
}

crate::define_str_enum! {
    /// Type of a field in the space format.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub enum SpaceFieldType {
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

/// Field format specifier of a space.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    #[serde(alias = "type")]
    pub field_type: SpaceFieldType,
    #[serde(default)]
    pub is_nullable: bool,
}

////////////////////////////////////////////////////////////////////////////////
// SpaceMetadata
////////////////////////////////////////////////////////////////////////////////

/// Representation of a tuple holding space metadata in system `_vspace` space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceMetadata {
    pub id: SpaceId,
    pub owner: u32,
    pub name: String,
    pub engine: SpaceEngineType,
    /// Required number of fields, 0 if not enforced.
    pub field_count: u32,
    pub format: Vec<Field>,
}

#[derive(Deserialize)]
struct SpaceRow {
    id: SpaceId,
    owner: u32,
    name: String,
    engine: SpaceEngineType,
    field_count: u32,
    _flags: IgnoredAny,
    format: Vec<Field>,
}

impl SpaceMetadata {
    /// Decodes a `_vspace` row.
    pub fn from_catalog_row(row: &Tuple) -> Result<Self> {
        let SpaceRow {
            id,
            owner,
            name,
            engine,
            field_count,
            format,
            ..
        } = row.decode()?;
        Ok(Self {
            id,
            owner,
            name,
            engine,
            field_count,
            format,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
// UpdateOps
////////////////////////////////////////////////////////////////////////////////

crate::define_str_enum! {
    /// Kind of a field update operation.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub enum OpKind {
        Add    = "+",
        Sub    = "-",
        And    = "&",
        Or     = "|",
        Xor    = "^",
        Splice = ":",
        Insert = "!",
        Delete = "#",
        Assign = "=",
    }
    FromStr::Err = UnknownVariant;
}

/// A single field update operation: `[kind, field_no, args...]` on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct Op {
    pub kind: OpKind,
    /// Zero based offset of the field the operation applies to.
    pub field_no: u32,
    pub args: Vec<rmpv::Value>,
}

impl Serialize for Op {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(2 + self.args.len()))?;
        seq.serialize_element(self.kind.as_str())?;
        seq.serialize_element(&self.field_no)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

impl Encode for Op {}

/// An ordered list of update operations, applied atomically and in order.
///
/// ```
/// use tarantool_space::space::UpdateOps;
///
/// let mut ops = UpdateOps::new();
/// ops.add(2, 10).unwrap().assign(1, "Alice").unwrap();
/// assert_eq!(ops.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOps {
    ops: Vec<Op>,
}

macro_rules! define_value_ops {
    ($( $(#[$meta:meta])* $name:ident => $kind:ident; )+) => {
        $(
            $(#[$meta])*
            pub fn $name<V>(&mut self, field_no: u32, value: V) -> Result<&mut Self>
            where
                V: Serialize,
            {
                let value = rmpv::ext::to_value(value)?;
                Ok(self.push(OpKind::$kind, field_no, vec![value]))
            }
        )+
    }
}

impl UpdateOps {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, kind: OpKind, field_no: u32, args: Vec<rmpv::Value>) -> &mut Self {
        self.ops.push(Op {
            kind,
            field_no,
            args,
        });
        self
    }

    define_value_ops! {
        /// `field += value`
        add => Add;
        /// `field -= value`
        sub => Sub;
        /// `field &= value`
        and => And;
        /// `field |= value`
        or => Or;
        /// `field ^= value`
        xor => Xor;
        /// Inserts a new field before `field_no`.
        insert => Insert;
        /// `field = value`
        assign => Assign;
    }

    /// Replaces `count` characters of a string field starting at `start` with
    /// `value`. Negative `start` counts from the end.
    pub fn splice(&mut self, field_no: u32, start: i64, count: u32, value: &str) -> &mut Self {
        self.push(
            OpKind::Splice,
            field_no,
            vec![start.into(), count.into(), value.into()],
        )
    }

    /// Deletes `count` fields starting at `field_no`.
    pub fn delete(&mut self, field_no: u32, count: u32) -> &mut Self {
        self.push(OpKind::Delete, field_no, vec![count.into()])
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Op] {
        &self.ops
    }

    #[inline(always)]
    pub fn into_inner(self) -> Vec<Op> {
        self.ops
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<UpdateOps> for Vec<Op> {
    #[inline(always)]
    fn from(ops: UpdateOps) -> Self {
        ops.ops
    }
}

/// Encodes `[arg]` for a single argument of a remote call.
struct SingleArg<'a, T: ?Sized>(&'a T);

impl<T> ToTupleBuffer for SingleArg<'_, T>
where
    T: ToTupleBuffer + ?Sized,
{
    fn write_tuple_data(&self, w: &mut impl Write) -> Result<()> {
        rmp::encode::write_array_len(w, 1)?;
        self.0.write_tuple_data(w)
    }
}

/// Decodes the first value returned by a remote call.
fn first_returned<T: DecodeOwned>(data: Tuple, method: &'static str) -> Result<T> {
    data.field(0)?.ok_or_else(|| {
        ProtocolError::ResponseFieldNotFound {
            key: "DATA[0]",
            context: method,
        }
        .into()
    })
}

////////////////////////////////////////////////////////////////////////////////
// Space
////////////////////////////////////////////////////////////////////////////////

/// A space of a remote store bound to a connection.
///
/// Clones share the connection and the memoized primary index.
pub struct Space<C> {
    conn: C,
    meta: Rc<SpaceMetadata>,
    indices: Rc<[IndexMetadata]>,
    options: SpaceOptions,
    primary_key: Rc<SharedLazy<Index<C>>>,
}

impl<C: Clone> Clone for Space<C> {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            meta: self.meta.clone(),
            indices: self.indices.clone(),
            options: self.options.clone(),
            primary_key: self.primary_key.clone(),
        }
    }
}

impl<C: Clone> fmt::Debug for Space<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("meta", &self.meta)
            .field("indices", &self.indices)
            .field("options", &self.options)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

impl<C> fmt::Display for Space<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, id={}", self.meta.name, self.meta.id)
    }
}

impl<C> Space<C>
where
    C: AsClient + Clone + 'static,
{
    /// Creates a handle from already known metadata. `indices` may be empty,
    /// indices are always looked up in the catalog when requested.
    pub fn new(
        conn: C,
        meta: SpaceMetadata,
        indices: Vec<IndexMetadata>,
        options: SpaceOptions,
    ) -> Self {
        Self {
            conn,
            meta: Rc::new(meta),
            indices: indices.into(),
            options,
            primary_key: Default::default(),
        }
    }

    /// Loads the space named `name` from `_vspace` together with its indices
    /// from `_vindex`.
    ///
    /// # Errors
    /// [`Error::NoSuchSpace`] if there is no such space.
    pub async fn fetch(conn: C, name: &str, options: SpaceOptions) -> Result<Self> {
        log::debug!("looking up space '{name}' in _vspace");
        let rows = conn
            .send(&Select {
                space_id: SystemSpace::VSpace.into(),
                index_id: VSPACE_BY_NAME,
                limit: u32::MAX,
                offset: 0,
                iterator_type: IteratorType::Eq,
                key: &(name,),
            })
            .await?;
        let row = match rows.as_slice() {
            [row] => row,
            [] => return Err(Error::NoSuchSpace(name.into())),
            rows => {
                log::error!("_vspace returned {} rows for space '{name}'", rows.len());
                return Err(Error::CatalogInvariant {
                    space: name.into(),
                    details: format!("{} catalog rows for the space", rows.len()),
                });
            }
        };
        let meta = SpaceMetadata::from_catalog_row(row)?;

        log::debug!("loading indices of space '{name}' from _vindex");
        let rows = conn
            .send(&Select {
                space_id: SystemSpace::VIndex.into(),
                index_id: PRIMARY_INDEX_ID,
                limit: u32::MAX,
                offset: 0,
                iterator_type: IteratorType::Eq,
                key: &(meta.id,),
            })
            .await?;
        let indices = rows
            .iter()
            .map(|row| IndexMetadata::from_catalog_row(name, row))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(conn, meta, indices, options))
    }

    #[inline(always)]
    pub fn id(&self) -> SpaceId {
        self.meta.id
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[inline(always)]
    pub fn engine(&self) -> SpaceEngineType {
        self.meta.engine
    }

    #[inline(always)]
    pub fn field_count(&self) -> u32 {
        self.meta.field_count
    }

    #[inline(always)]
    pub fn format(&self) -> &[Field] {
        &self.meta.format
    }

    #[inline(always)]
    pub fn meta(&self) -> &SpaceMetadata {
        &self.meta
    }

    /// Index metadata known at construction time.
    #[inline(always)]
    pub fn indices(&self) -> &[IndexMetadata] {
        &self.indices
    }

    #[inline(always)]
    pub fn options(&self) -> &SpaceOptions {
        &self.options
    }

    #[inline(always)]
    pub fn is_system(&self) -> bool {
        self.meta.id <= SYSTEM_ID_MAX
    }

    #[inline(always)]
    pub fn connection(&self) -> &C {
        &self.conn
    }

    async fn send<R: Request>(&self, request: &R) -> Result<R::Response> {
        log::trace!("{:?} request to space '{}'", R::TYPE, self.meta.name);
        Ok(self.conn.send(request).await?)
    }

    /// Looks up an index of this space by name or id.
    ///
    /// Every call is a catalog round trip; the primary index is memoized,
    /// see [`Space::primary_key`].
    ///
    /// # Errors
    /// - [`Error::NoSuchIndex`] if there is no such index.
    /// - [`Error::CatalogInvariant`] if the catalog holds more than one
    ///   matching row.
    pub async fn index(&self, index: impl Into<IndexRef>) -> Result<Index<C>> {
        Index::fetch(
            self.conn.clone(),
            self.meta.name.as_str(),
            self.meta.id,
            index.into(),
        )
        .await
    }

    /// Returns the primary index (id 0) of the space.
    ///
    /// The first call looks it up in the catalog. Calls made while the lookup
    /// is in flight wait for the same lookup, calls made after it succeeded
    /// return the stored index. If the lookup fails, every waiter gets the
    /// error and the next call tries again.
    ///
    /// A caller takes part in the lookup in flight at the moment of the
    /// call, even if the returned future is polled later.
    pub fn primary_key(&self) -> impl Future<Output = Result<Index<C>>> + '_ {
        self.primary_key.get_or_try_init(|| {
            log::debug!("resolving primary index of space '{}'", self.meta.name);
            let name: Rc<str> = self.meta.name.as_str().into();
            Index::fetch(
                self.conn.clone(),
                name,
                self.meta.id,
                IndexRef::Id(PRIMARY_INDEX_ID),
            )
        })
    }

    /// Inserts a tuple. Fails with the server's error if a tuple with the
    /// same primary key exists.
    ///
    /// Returns the inserted tuple.
    pub async fn insert<V, T>(&self, value: &V) -> Result<Vec<T>>
    where
        V: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self
            .send(&Insert {
                space_id: self.meta.id,
                value,
            })
            .await?;
        decode_rows(rows)
    }

    /// Returns all tuples matching `key` in the primary index. Zero matches
    /// is not an error.
    pub async fn select<K, T>(&self, key: &K) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self.select_by_pk(key, u32::MAX).await?;
        decode_rows(rows)
    }

    /// Returns the tuple with primary key `key`.
    ///
    /// # Errors
    /// [`Error::EmptyResult`] if there is none.
    pub async fn get<K, T>(&self, key: &K) -> Result<T>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self.select_by_pk(key, 1).await?;
        index::single_row(&self.meta.name, rows)?.decode()
    }

    async fn select_by_pk<K>(&self, key: &K, limit: u32) -> Result<Vec<Tuple>>
    where
        K: ToTupleBuffer + ?Sized,
    {
        self.send(&Select {
            space_id: self.meta.id,
            index_id: PRIMARY_INDEX_ID,
            limit,
            offset: 0,
            iterator_type: IteratorType::Eq,
            key,
        })
        .await
    }

    /// Inserts a tuple or replaces the one with the same primary key.
    pub async fn replace<V, T>(&self, value: &V) -> Result<Vec<T>>
    where
        V: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self.replace_rows(value).await?;
        decode_rows(rows)
    }

    async fn replace_rows<V>(&self, value: &V) -> Result<Vec<Tuple>>
    where
        V: ToTupleBuffer + ?Sized,
    {
        self.send(&Replace {
            space_id: self.meta.id,
            value,
        })
        .await
    }

    /// Same as [`Space::replace`] but returns the stored tuple itself.
    ///
    /// # Errors
    /// [`Error::EmptyResult`] if the store returned no tuple.
    pub async fn put<V, T>(&self, value: &V) -> Result<T>
    where
        V: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self.replace_rows(value).await?;
        match rows.first() {
            Some(row) => row.decode(),
            None => Err(Error::EmptyResult {
                space: self.meta.name.clone(),
            }),
        }
    }

    /// Applies `ops` to the tuple with primary key `key`.
    ///
    /// Returns the updated tuple, or nothing if there is no such tuple.
    pub async fn update<K, O, T>(&self, key: &K, ops: &[O]) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        O: Encode,
        T: DecodeOwned,
    {
        let rows = self
            .send(&Update {
                space_id: self.meta.id,
                index_id: PRIMARY_INDEX_ID,
                key,
                ops,
            })
            .await?;
        decode_rows(rows)
    }

    /// Update or insert a tuple.
    ///
    /// If there is a tuple with the primary key of `value`, `ops` are applied
    /// to it and `value` is ignored. Otherwise `value` is inserted as is and
    /// `ops` are ignored.
    pub async fn upsert<V, O, T>(&self, value: &V, ops: &[O]) -> Result<Vec<T>>
    where
        V: ToTupleBuffer + ?Sized,
        O: Encode,
        T: DecodeOwned,
    {
        let rows = self.upsert_rows(value, ops).await?;
        decode_rows(rows)
    }

    async fn upsert_rows<V, O>(&self, value: &V, ops: &[O]) -> Result<Vec<Tuple>>
    where
        V: ToTupleBuffer + ?Sized,
        O: Encode,
    {
        self.send(&Upsert {
            space_id: self.meta.id,
            value,
            ops,
        })
        .await
    }

    /// Deletes the tuple with primary key `key`. Returns the deleted tuple,
    /// if there was one.
    pub async fn delete<K, T>(&self, key: &K) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let rows = self
            .send(&Delete {
                space_id: self.meta.id,
                index_id: PRIMARY_INDEX_ID,
                key,
            })
            .await?;
        decode_rows(rows)
    }

    /// Zero based offset of the counter field used by
    /// [`Space::increment`] and [`Space::decrement`].
    pub async fn counter_field(&self) -> Result<u32> {
        match self.options.counter_field {
            CounterField::Explicit(field_no) => Ok(field_no),
            CounterField::AfterPrimaryKey => {
                let pk = self.primary_key().await?;
                pk.meta().max_field_no().checked_add(1).ok_or_else(|| {
                    log::error!("primary key of space '{}' ends at the last field", self.meta.name);
                    Error::CatalogInvariant {
                        space: self.meta.name.clone(),
                        details: format!("no field after primary key part #{}", u32::MAX),
                    }
                })
            }
        }
    }

    async fn add_to_counter<K, T>(&self, key: &K, delta: i64) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let field_no = self.counter_field().await?;
        let mut ops = UpdateOps::with_capacity(1);
        ops.add(field_no, delta)?;
        let rows = self.upsert_rows(key, ops.as_slice()).await?;
        decode_rows(rows)
    }

    /// Atomically adds 1 to the counter field of the tuple with primary key
    /// `key`. If there is no such tuple, `key` is inserted as the tuple.
    pub async fn increment<K, T>(&self, key: &K) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        self.add_to_counter(key, 1).await
    }

    /// Atomically subtracts 1 from the counter field of the tuple with
    /// primary key `key`. If there is no such tuple, `key` is inserted as the
    /// tuple.
    pub async fn decrement<K, T>(&self, key: &K) -> Result<Vec<T>>
    where
        K: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        self.add_to_counter(key, -1).await
    }

    async fn call_method<A>(&self, method: &str, args: &A) -> Result<Tuple>
    where
        A: ToTupleBuffer + ?Sized,
    {
        let fn_name = format!("box.space.{}:{}", self.meta.name, method);
        log::trace!("calling {fn_name}");
        Ok(self.conn.call(&fn_name, args).await?)
    }

    /// Number of tuples matching `key` in the primary index, counted by the
    /// store.
    pub async fn count<K>(&self, key: &K) -> Result<u64>
    where
        K: ToTupleBuffer + ?Sized,
    {
        let data = self.call_method("count", &SingleArg(key)).await?;
        first_returned(data, "space:count")
    }

    /// Number of tuples in the space.
    pub async fn len(&self) -> Result<u64> {
        let data = self.call_method("len", &()).await?;
        first_returned(data, "space:len")
    }

    /// Inserts a tuple with the primary key assigned by the store: one more
    /// than the current maximum. `rest` holds the remaining fields.
    ///
    /// Returns the inserted tuple.
    pub async fn auto_increment<R, T>(&self, rest: &R) -> Result<T>
    where
        R: ToTupleBuffer + ?Sized,
        T: DecodeOwned,
    {
        let data = self.call_method("auto_increment", &SingleArg(rest)).await?;
        first_returned(data, "space:auto_increment")
    }

    /// Iterates over all tuples of the space in primary key order, yielding
    /// `(primary key, tuple)` pairs.
    ///
    /// Tuples are fetched lazily in batches of
    /// [`SpaceOptions::pairs_batch_size`]. Each call starts from the
    /// beginning of the space.
    pub fn pairs<K, T>(&self) -> LocalBoxStream<'static, Result<(K, T)>>
    where
        K: DecodeOwned + 'static,
        T: DecodeOwned + 'static,
    {
        enum Position {
            Start,
            After(Tuple),
            End,
        }

        let space = self.clone();
        let batch_size = self.options.pairs_batch_size.max(1);
        stream::try_unfold(Position::Start, move |position| {
            let space = space.clone();
            async move {
                let (iterator_type, key) = match position {
                    Position::Start => (IteratorType::All, Tuple::new(&())?),
                    Position::After(key) => (IteratorType::GT, key),
                    Position::End => return Ok(None),
                };
                let pk = space.primary_key().await?;
                let options = Options {
                    offset: 0,
                    limit: Some(batch_size),
                };
                let rows = pk.select_rows(iterator_type, &key, &options).await?;

                let next = match rows.last() {
                    Some(last) if rows.len() >= batch_size as usize => {
                        Position::After(pk.extract_key(last)?)
                    }
                    _ => Position::End,
                };
                let mut batch: Vec<Result<(K, T)>> = Vec::with_capacity(rows.len());
                for row in rows {
                    let key = pk.extract_key(&row)?;
                    batch.push(Ok((key.decode()?, row.decode()?)));
                }
                Ok::<_, Error>(Some((stream::iter(batch), next)))
            }
        })
        .try_flatten()
        .boxed_local()
    }

    pub fn create_index(&self) -> Result<()> {
        Err(Error::NotSupported("create_index"))
    }

    pub fn drop(&self) -> Result<()> {
        Err(Error::NotSupported("drop"))
    }

    pub fn rename(&self, _new_name: &str) -> Result<()> {
        Err(Error::NotSupported("rename"))
    }
}
