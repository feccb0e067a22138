use chrono::{TimeZone, Utc};
use hex_literal::hex;
use serde::{Deserialize, Serialize};

use crate::value::{Integer, Value};

pub(crate) fn vi(integer: Integer) -> Value {
    Value::Integer(integer)
}

pub(crate) fn vs(string: &str) -> Value {
    Value::String(string.to_string())
}

pub(crate) fn va<const N: usize>(items: [Value; N]) -> Value {
    Value::Array(items.into())
}

pub(crate) fn vd<const N: usize>(items: [(&str, Value); N]) -> Value {
    Value::Dictionary(
        items
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    )
}

/// Returns `len` bytes counting up from zero and wrapping at 256.
pub(crate) fn make_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Unit;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Newtype(pub(crate) String);

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Tuple(pub(crate) u8, pub(crate) String);

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Struct {
    // Ensure that the field names are unordered.
    pub(crate) a: u8,
    pub(crate) c: u8,
    pub(crate) b: u8,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) enum Enum {
    Unit,
    Newtype(String),
    Tuple(u8, String),
    Struct {
        // Ensure that the field names are unordered.
        a: u8,
        c: u8,
        b: u8,
    },
}

/// An array holding one object of every kind, encoded with one-byte offsets and references.
pub(crate) const FILLED_ARRAY: &[u8] = &hex!(
    "62706c6973743030"
    "aa 0102030405060708090a"
    "10 00"
    "22 3fc00000"
    "23 4004000000000000"
    "09"
    "08"
    "45 0001020304"
    "4f 10 14 000102030405060708090a0b0c0d0e0f10111213"
    "33 c1e9fc3af0e00000"
    "5f 10 1b 54686520636f77206a756d706564206f7665722074686520646f67"
    "6f 10 1f 01000101 00540068006500200063006f00770020006a0075006d0070006500640020006f007600650072002000740068006500200064006f0067 01020103"
    "08 13 15 1a 23 24 25 2b 42 4b 69"
    "000000000000 0101 000000000000000b 0000000000000000 00000000000000aa"
);

/// A dictionary holding one object of every kind, in an order no sorted encoder would produce.
pub(crate) const FILLED_DICT: &[u8] = &hex!(
    "62706c6973743030"
    "da 0102030405060708090a 0b0c0d0e0f1011121314"
    "56 646174613230"
    "56 646f75626c65"
    "53 696e74"
    "55 66616c7365"
    "55 7574663136"
    "54 64617465"
    "54 74727565"
    "55 666c6f6174"
    "55 6461746135"
    "55 6173636969"
    "4f 10 14 000102030405060708090a0b0c0d0e0f10111213"
    "23 4004000000000000"
    "10 00"
    "08"
    "6f 10 1f 01000101 00540068006500200063006f00770020006a0075006d0070006500640020006f007600650072002000740068006500200064006f0067 01020103"
    "33 c1e9fc3af0e00000"
    "09"
    "22 3fc00000"
    "45 0001020304"
    "5f 10 1b 54686520636f77206a756d706564206f7665722074686520646f67"
    "08 1d 24 2b 2f 35 3b 40 45 4b 51 57 6e 77 79 7a bb c4 c5 ca d0"
    "000000000000 0101 0000000000000015 0000000000000000 00000000000000ee"
);

const COW: &str = "The cow jumped over the dog";
const COW_UTF16: &str = "\u{0100}\u{0101}The cow jumped over the dog\u{0102}\u{0103}";

fn cow_date() -> Value {
    Value::Date(Utc.with_ymd_and_hms(1890, 6, 25, 6, 45, 13).unwrap())
}

pub(crate) fn filled_array() -> Value {
    va([
        vi(0),
        Value::Real32(1.5),
        Value::Real64(2.5),
        Value::Bool(true),
        Value::Bool(false),
        Value::Data(make_data(5)),
        Value::Data(make_data(20)),
        cow_date(),
        vs(COW),
        vs(COW_UTF16),
    ])
}

pub(crate) fn filled_dict() -> Value {
    vd([
        ("data20", Value::Data(make_data(20))),
        ("double", Value::Real64(2.5)),
        ("int", vi(0)),
        ("false", Value::Bool(false)),
        ("utf16", vs(COW_UTF16)),
        ("date", cow_date()),
        ("true", Value::Bool(true)),
        ("float", Value::Real32(1.5)),
        ("data5", Value::Data(make_data(5))),
        ("ascii", vs(COW)),
    ])
}
