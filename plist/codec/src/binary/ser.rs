use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use bytes::{BufMut, Bytes, BytesMut};
use snafu::prelude::*;

use crate::MAX_DEPTH;
use crate::date;
use crate::error::{DepthSnafu, Error, SizeExceededSnafu};
use crate::value::Value;

use super::{
    FALSE, MAGIC, SIZE_FOLLOWS, TAG_ARRAY, TAG_ASCII, TAG_DATA, TAG_DATE, TAG_DICTIONARY,
    TAG_INTEGER, TAG_REAL, TAG_UTF16, TRUE, Trailer, marker, min_size,
};

pub fn to_bytes(value: &Value) -> Result<Bytes, Error> {
    let mut table = ObjectTable::new();
    let root = table.assign(Object::Value(value), 0)?;
    table.encode(root)
}

/// Distinct objects of a graph, in id order.
///
/// Equal objects share one id regardless of where they appear, which is how repeated strings and
/// substructures collapse to a single record.
struct ObjectTable<'a> {
    objects: Vec<Entry<'a>>,
    index: HashMap<Object<'a>, usize>,
}

struct Entry<'a> {
    object: Object<'a>,
    // Ids of array elements, or of dictionary keys followed by dictionary values.
    refs: Vec<usize>,
}

// Dictionary keys are bare strings rather than values, but they are encoded (and deduplicated)
// exactly like `Value::String`.
#[derive(Clone, Copy, Debug)]
enum Object<'a> {
    Key(&'a str),
    Value(&'a Value),
}

impl<'a> ObjectTable<'a> {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Assigns ids depth-first: a container receives its id before its children, and dictionary
    /// keys before dictionary values.
    fn assign(&mut self, object: Object<'a>, depth: usize) -> Result<usize, Error> {
        if let Some(id) = self.index.get(&object) {
            return Ok(*id);
        }
        ensure!(depth < MAX_DEPTH, DepthSnafu { depth });

        let id = self.objects.len();
        self.objects.push(Entry {
            object,
            refs: Vec::new(),
        });
        self.index.insert(object, id);

        let refs = match object {
            Object::Value(Value::Array(array)) => array
                .iter()
                .map(|element| self.assign(Object::Value(element), depth + 1))
                .collect::<Result<Vec<_>, _>>()?,
            Object::Value(Value::Dictionary(dict)) => {
                let mut refs = Vec::with_capacity(dict.len() * 2);
                for key in dict.keys() {
                    refs.push(self.assign(Object::Key(key), depth + 1)?);
                }
                for value in dict.values() {
                    refs.push(self.assign(Object::Value(value), depth + 1)?);
                }
                refs
            }
            _ => return Ok(id),
        };
        self.objects[id].refs = refs;
        Ok(id)
    }

    fn encode(&self, root: usize) -> Result<Bytes, Error> {
        let num_objects = self.objects.len();
        ensure!(
            u32::try_from(num_objects).is_ok(),
            SizeExceededSnafu {
                what: "object table",
                size: num_objects,
            },
        );
        let object_ref_size = min_size(num_objects as u64);

        let mut buf = BytesMut::new();
        buf.put_slice(MAGIC);
        let mut offsets = Vec::with_capacity(num_objects);
        for entry in &self.objects {
            offsets.push(buf.len() as u64);
            encode_object(&mut buf, entry, object_ref_size)?;
        }

        let offset_table_offset = buf.len() as u64;
        let offset_int_size = min_size(offset_table_offset);
        for offset in offsets {
            buf.put_uint(offset, offset_int_size.into());
        }

        Trailer {
            offset_int_size,
            object_ref_size,
            num_objects: num_objects as u64,
            root_object: root as u64,
            offset_table_offset,
        }
        .encode(&mut buf);

        tracing::debug!(
            num_objects,
            object_ref_size,
            offset_int_size,
            size = buf.len(),
            "encode binary plist",
        );
        Ok(buf.freeze())
    }
}

fn encode_object<B>(buf: &mut B, entry: &Entry, object_ref_size: u8) -> Result<(), Error>
where
    B: BufMut,
{
    let value = match entry.object {
        Object::Key(key) => return encode_string(buf, key),
        Object::Value(value) => value,
    };
    match value {
        Value::Bool(false) => buf.put_u8(FALSE),
        Value::Bool(true) => buf.put_u8(TRUE),
        Value::Integer(integer) => encode_integer(buf, *integer),
        Value::Real32(real) => {
            buf.put_u8(marker(TAG_REAL, 2));
            buf.put_f32(*real);
        }
        Value::Real64(real) => {
            buf.put_u8(marker(TAG_REAL, 3));
            buf.put_f64(*real);
        }
        Value::String(string) => encode_string(buf, string)?,
        Value::Data(data) => {
            encode_marker(buf, TAG_DATA, data.len())?;
            buf.put_slice(data);
        }
        Value::Date(value) => {
            buf.put_u8(marker(TAG_DATE, 3));
            buf.put_f64(date::to_binary(value));
        }
        Value::Array(array) => {
            encode_marker(buf, TAG_ARRAY, array.len())?;
            encode_refs(buf, &entry.refs, object_ref_size);
        }
        Value::Dictionary(dict) => {
            encode_marker(buf, TAG_DICTIONARY, dict.len())?;
            encode_refs(buf, &entry.refs, object_ref_size);
        }
    }
    Ok(())
}

// Negative integers always take the 8-byte form.
fn encode_integer<B>(buf: &mut B, integer: i64)
where
    B: BufMut,
{
    if integer < 0 {
        buf.put_u8(marker(TAG_INTEGER, 3));
        buf.put_i64(integer);
    } else {
        let size = min_size(integer as u64);
        buf.put_u8(marker(TAG_INTEGER, size.trailing_zeros() as u8));
        buf.put_uint(integer as u64, size.into());
    }
}

fn encode_marker<B>(buf: &mut B, tag: u8, len: usize) -> Result<(), Error>
where
    B: BufMut,
{
    let len = u32::try_from(len).ok().context(SizeExceededSnafu {
        what: "object",
        size: len,
    })?;
    if len < u32::from(SIZE_FOLLOWS) {
        buf.put_u8(marker(tag, len as u8));
    } else {
        buf.put_u8(marker(tag, SIZE_FOLLOWS));
        encode_integer(buf, len.into());
    }
    Ok(())
}

// ASCII strings are stored one byte per character; anything else as UTF-16 code units, with the
// length counted in code units.
fn encode_string<B>(buf: &mut B, string: &str) -> Result<(), Error>
where
    B: BufMut,
{
    if string.is_ascii() {
        encode_marker(buf, TAG_ASCII, string.len())?;
        buf.put_slice(string.as_bytes());
    } else {
        let units = string.encode_utf16().collect::<Vec<_>>();
        encode_marker(buf, TAG_UTF16, units.len())?;
        for unit in units {
            buf.put_u16(unit);
        }
    }
    Ok(())
}

fn encode_refs<B>(buf: &mut B, refs: &[usize], object_ref_size: u8)
where
    B: BufMut,
{
    for id in refs {
        buf.put_uint(*id as u64, object_ref_size.into());
    }
}

//
// Structural equality for deduplication.  Reals compare by bit pattern so that `0.0` and `-0.0`
// stay distinct and `NaN` deduplicates with itself.
//

impl PartialEq for Object<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_str(), other.as_str()) {
            (Some(x), Some(y)) => x == y,
            (None, None) => match (self, other) {
                (Self::Value(x), Self::Value(y)) => value_eq(x, y),
                _ => false,
            },
            _ => false,
        }
    }
}

impl Eq for Object<'_> {}

impl Hash for Object<'_> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        match self {
            Self::Key(key) => hash_str(key, state),
            Self::Value(value) => hash_value(value, state),
        }
    }
}

impl Object<'_> {
    fn as_str(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(*key),
            Self::Value(Value::String(string)) => Some(string.as_str()),
            Self::Value(_) => None,
        }
    }
}

fn value_eq(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Real32(x), Value::Real32(y)) => x.to_bits() == y.to_bits(),
        (Value::Real64(x), Value::Real64(y)) => x.to_bits() == y.to_bits(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Data(x), Value::Data(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| value_eq(x, y))
        }
        (Value::Dictionary(x), Value::Dictionary(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((xk, xv), (yk, yv))| xk == yk && value_eq(xv, yv))
        }
        _ => false,
    }
}

fn hash_str<H>(string: &str, state: &mut H)
where
    H: Hasher,
{
    TAG_ASCII.hash(state);
    string.hash(state);
}

fn hash_value<H>(value: &Value, state: &mut H)
where
    H: Hasher,
{
    match value {
        Value::Bool(value) => {
            FALSE.hash(state);
            value.hash(state);
        }
        Value::Integer(integer) => {
            TAG_INTEGER.hash(state);
            integer.hash(state);
        }
        Value::Real32(real) => {
            marker(TAG_REAL, 2).hash(state);
            real.to_bits().hash(state);
        }
        Value::Real64(real) => {
            marker(TAG_REAL, 3).hash(state);
            real.to_bits().hash(state);
        }
        Value::String(string) => hash_str(string, state),
        Value::Data(data) => {
            TAG_DATA.hash(state);
            data.hash(state);
        }
        Value::Date(value) => {
            TAG_DATE.hash(state);
            value.hash(state);
        }
        Value::Array(array) => {
            TAG_ARRAY.hash(state);
            array.len().hash(state);
            for element in array {
                hash_value(element, state);
            }
        }
        Value::Dictionary(dict) => {
            TAG_DICTIONARY.hash(state);
            dict.len().hash(state);
            for (key, value) in dict {
                key.hash(state);
                hash_value(value, state);
            }
        }
    }
}
