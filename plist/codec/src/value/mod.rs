pub mod de;
pub mod ser;

mod de_impl;
mod ser_impl;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Property list value.
///
/// `Real32` and `Real64` are distinct kinds because the binary format records the width and the
/// two must round-trip independently.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(Integer),
    Real32(f32),
    Real64(f64),
    String(String),
    Data(Data),
    Date(Date),
    Array(Array),
    Dictionary(Dictionary),
}

pub type Integer = i64;

pub type Data = Vec<u8>;

// Plist dates are timezone-independent instants.
pub type Date = DateTime<Utc>;

pub type Array = Vec<Value>;

// Use `BTreeMap` because the XML encoder emits dictionary keys sorted by code point.
pub type Dictionary = BTreeMap<String, Value>;

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real32(_) => "real32",
            Self::Real64(_) => "real64",
            Self::String(_) => "string",
            Self::Data(_) => "data",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Self::Integer(integer) => Some(*integer),
            _ => None,
        }
    }

    /// Returns either real kind widened to `f64`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real32(real) => Some((*real).into()),
            Self::Real64(real) => Some(*real),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&Date> {
        match self {
            Self::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

macro_rules! impl_try_from {
    ($type:ty, $variant:ident) => {
        impl TryFrom<Value> for $type {
            type Error = Value;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    _ => Err(value),
                }
            }
        }
    };
}

impl_try_from!(bool, Bool);
impl_try_from!(Integer, Integer);
impl_try_from!(String, String);
impl_try_from!(Data, Data);
impl_try_from!(Date, Date);
impl_try_from!(Array, Array);
impl_try_from!(Dictionary, Dictionary);

macro_rules! impl_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Self {
                Self::$variant(value.into())
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(i8, Integer);
impl_from!(i16, Integer);
impl_from!(i32, Integer);
impl_from!(i64, Integer);
impl_from!(u8, Integer);
impl_from!(u16, Integer);
impl_from!(u32, Integer);
impl_from!(f32, Real32);
impl_from!(f64, Real64);
impl_from!(String, String);
impl_from!(&str, String);
impl_from!(Data, Data);
impl_from!(&[u8], Data);
impl_from!(Date, Date);
impl_from!(Array, Array);
impl_from!(Dictionary, Dictionary);
