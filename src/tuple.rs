//! Tuples
//!
//! A [`Tuple`] is an ordered sequence of fields encoded as a msgpack array.
//! It is the unit of data exchanged with the store: request keys and bodies
//! are written as tuples and every row of a response is read as one.
//!
//! Any serializable value which maps onto a msgpack array (rust tuples,
//! arrays, vectors, structs) can be sent with the help of [`Encode`] and
//! [`ToTupleBuffer`]. Rows are converted back into rust values with
//! [`Decode`].
//!
//! ```
//! use tarantool_space::tuple::Tuple;
//!
//! let tuple = Tuple::new(&(1, "Alice", 30)).unwrap();
//! assert_eq!(tuple.len(), 3);
//! let (id, name, age): (u32, String, u8) = tuple.decode().unwrap();
//! assert_eq!((id, name.as_str(), age), (1, "Alice", 30));
//! ```
use std::convert::TryFrom;
use std::fmt::{self, Debug, Formatter};
use std::io::{Cursor, Write};

use serde::Serialize;

use crate::error::{self, Error, Result};
use crate::msgpack;
use crate::network::protocol::ProtocolError;

/// Owned msgpack array.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    data: Vec<u8>,
}

impl Debug for Tuple {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Ok(v) = self.to_value() {
            f.debug_tuple("Tuple").field(&v).finish()
        } else {
            f.debug_tuple("Tuple")
                .field(&crate::util::DisplayAsHexBytes(&self.data).to_string())
                .finish()
        }
    }
}

impl Tuple {
    /// Create a new tuple from `value` implementing [`ToTupleBuffer`].
    #[inline]
    pub fn new<T>(value: &T) -> Result<Self>
    where
        T: ToTupleBuffer + ?Sized,
    {
        value.to_tuple_buffer()
    }

    /// Create a tuple from raw msgpack. Fails unless `data` holds exactly one
    /// msgpack array.
    pub fn try_from_vec(data: Vec<u8>) -> Result<Self> {
        if !msgpack::is_array(&data) {
            return Err(error::Encode::InvalidMP(data).into());
        }
        let mut cur = Cursor::new(&data);
        msgpack::skip_value(&mut cur)?;
        if cur.position() as usize != data.len() {
            return Err(error::Encode::InvalidMP(data).into());
        }
        Ok(Self { data })
    }

    #[inline]
    pub fn try_from_slice(data: &[u8]) -> Result<Self> {
        Self::try_from_vec(data.into())
    }

    /// Return the number of fields in tuple (the size of MsgPack Array).
    pub fn len(&self) -> u32 {
        let mut data = self.data.as_slice();
        rmp::decode::read_array_len(&mut data).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Will return the number of bytes in the tuple.
    #[inline]
    pub fn bsize(&self) -> usize {
        self.data.len()
    }

    /// Raw msgpack contents of the tuple.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Decode the whole tuple into a rust value.
    #[inline]
    pub fn decode<T>(&self) -> Result<T>
    where
        T: DecodeOwned,
    {
        T::decode(&self.data)
    }

    /// Decode field `fieldno` (zero based). Returns `Ok(None)` if the tuple
    /// is shorter.
    pub fn field<T>(&self, fieldno: u32) -> Result<Option<T>>
    where
        T: DecodeOwned,
    {
        let mut cur = Cursor::new(self.data.as_slice());
        let len = rmp::decode::read_array_len(&mut cur)?;
        if fieldno >= len {
            return Ok(None);
        }
        for _ in 0..fieldno {
            msgpack::skip_value(&mut cur)?;
        }
        let start = cur.position() as usize;
        msgpack::skip_value(&mut cur)?;
        let end = cur.position() as usize;
        T::decode(&self.data[start..end]).map(Some)
    }

    /// Dynamically typed view of the tuple.
    pub fn to_value(&self) -> Result<rmpv::Value> {
        let mut data = self.data.as_slice();
        rmpv::decode::read_value(&mut data).map_err(|e| ProtocolError::Malformed(e.to_string()).into())
    }

    /// Build a tuple from dynamically typed fields.
    pub fn from_values(fields: &[rmpv::Value]) -> Result<Self> {
        let data = rmp_serde::to_vec(fields)?;
        Ok(Self { data })
    }
}

impl TryFrom<Vec<u8>> for Tuple {
    type Error = Error;

    #[inline]
    fn try_from(data: Vec<u8>) -> Result<Self> {
        Self::try_from_vec(data)
    }
}

impl From<Tuple> for Vec<u8> {
    #[inline]
    fn from(t: Tuple) -> Self {
        t.data
    }
}

impl AsRef<[u8]> for Tuple {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

////////////////////////////////////////////////////////////////////////////////
/// ToTupleBuffer
////////////////////////////////////////////////////////////////////////////////

/// Types implementing this trait can be converted to a tuple (msgpack array).
pub trait ToTupleBuffer {
    fn to_tuple_buffer(&self) -> Result<Tuple> {
        let mut buf = Vec::with_capacity(128);
        self.write_tuple_data(&mut buf)?;
        Tuple::try_from_vec(buf)
    }

    fn write_tuple_data(&self, w: &mut impl Write) -> Result<()>;
}

impl ToTupleBuffer for Tuple {
    #[inline]
    fn to_tuple_buffer(&self) -> Result<Tuple> {
        Ok(self.clone())
    }

    #[inline]
    fn write_tuple_data(&self, w: &mut impl Write) -> Result<()> {
        w.write_all(&self.data).map_err(Into::into)
    }
}

impl<T> ToTupleBuffer for T
where
    T: ?Sized,
    T: Encode,
{
    #[inline]
    fn write_tuple_data(&self, w: &mut impl Write) -> Result<()> {
        self.encode(w)
    }
}

////////////////////////////////////////////////////////////////////////////////
/// Encode
////////////////////////////////////////////////////////////////////////////////

/// Types implementing this trait can be serialized into a valid tuple
/// (msgpack array).
///
/// Implement it for your structs to use them as tuples. Structs are encoded
/// as arrays, so field order must match the space format.
///
/// ```
/// use serde::Serialize;
/// use tarantool_space::tuple::{Encode, Tuple};
///
/// #[derive(Serialize)]
/// struct User {
///     id: u32,
///     name: String,
/// }
/// impl Encode for User {}
///
/// let t = Tuple::new(&User { id: 1, name: "Bob".into() }).unwrap();
/// assert_eq!(t.decode::<(u32, String)>().unwrap(), (1, "Bob".into()));
/// ```
pub trait Encode: Serialize {
    fn encode(&self, w: &mut impl Write) -> Result<()> {
        rmp_serde::encode::write(w, self).map_err(Into::into)
    }
}

impl<'a, T> Encode for &'a T
where
    T: Encode + ?Sized,
{
    fn encode(&self, w: &mut impl Write) -> Result<()> {
        T::encode(*self, w)
    }
}

impl Encode for () {
    fn encode(&self, w: &mut impl Write) -> Result<()> {
        rmp_serde::encode::write(w, &Vec::<()>::new()).map_err(Into::into)
    }
}

impl<T> Encode for [T] where T: Serialize {}
impl<T> Encode for Vec<T> where T: Serialize {}

macro_rules! impl_array {
    ($($n:literal)+) => {
        $(
            #[allow(clippy::zero_prefixed_literal)]
            impl<T> Encode for [T; $n] where T: Serialize {}
        )+
    }
}

impl_array! {
    00 01 02 03 04 05 06 07 08 09 10 11 12 13 14 15
    16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32
}

macro_rules! impl_tuple {
    () => {};
    ($h:ident $($t:ident)*) => {
        impl<$h, $($t),*> Encode for ($h, $($t),*)
        where
            $h: Serialize,
            $($t: Serialize,)*
        {}

        impl_tuple! { $($t)* }
    }
}

impl_tuple! { A B C D E F G H I J K L M N O P }

////////////////////////////////////////////////////////////////////////////////
/// Decode
////////////////////////////////////////////////////////////////////////////////

/// Types implementing this trait can be decoded from msgpack.
///
/// [`Tuple`] also implements [`Decode`] with an implementation which just
/// copies the bytes as is (and validates them).
pub trait Decode<'de>: Sized {
    fn decode(data: &'de [u8]) -> Result<Self>;
}

impl<'de, T> Decode<'de> for T
where
    T: serde::Deserialize<'de>,
{
    fn decode(data: &'de [u8]) -> Result<Self> {
        rmp_serde::from_slice(data).map_err(|e| Error::decode::<T>(e, data.into()))
    }
}

impl Decode<'_> for Tuple {
    fn decode(data: &[u8]) -> Result<Self> {
        Self::try_from_slice(data)
    }
}

/// Types implementing this trait can be decoded from msgpack by value.
///
/// `DecodeOwned` is to [`Decode`] what [`DeserializeOwned`] is to
/// [`Deserialize`].
///
/// [`Deserialize`]: serde::Deserialize
/// [`DeserializeOwned`]: serde::de::DeserializeOwned
pub trait DecodeOwned: for<'de> Decode<'de> {}
impl<T> DecodeOwned for T where T: for<'de> Decode<'de> {}

/// Decode every row of a result set into `T`.
pub(crate) fn decode_rows<T>(rows: Vec<Tuple>) -> Result<Vec<T>>
where
    T: DecodeOwned,
{
    rows.iter().map(Tuple::decode::<T>).collect()
}
