use std::any;
use std::fmt;

use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant,
};

use crate::error::Error;

use super::{Array, Dictionary, Integer, Value};

pub fn to_value<T>(value: &T) -> Result<Value, Error>
where
    T: ?Sized + Serialize,
{
    value.serialize(Serializer)
}

pub(crate) fn serialize_key<K>(key: &K) -> Result<String, Error>
where
    K: ?Sized + Serialize,
{
    match key.serialize(Serializer)? {
        Value::String(string) => Ok(string),
        key => Err(Error::KeyType { kind: key.kind() }),
    }
}

fn to_integer<I>(value: I) -> Result<Integer, Error>
where
    I: Copy + fmt::Display + TryInto<Integer>,
{
    value.try_into().map_err(|_| Error::Structural {
        message: std::format!("{}-to-i64 overflow: {}", any::type_name::<I>(), value),
    })
}

fn unrepresentable(what: &str) -> Error {
    Error::Structural {
        message: std::format!("plist cannot represent {what}"),
    }
}

pub struct Serializer;

pub struct ArraySerializer<T>(Array, T);

pub struct DictionarySerializer<T>(Dictionary, T);

impl ArraySerializer<()> {
    fn new(len: usize) -> Self {
        Self(Array::with_capacity(len), ())
    }
}

impl ArraySerializer<&'static str> {
    fn new_tuple_variant(name: &'static str, len: usize) -> Self {
        Self(Array::with_capacity(len), name)
    }
}

impl DictionarySerializer<Option<String>> {
    fn new_map() -> Self {
        Self(Dictionary::new(), None)
    }
}

impl DictionarySerializer<()> {
    fn new_struct() -> Self {
        Self(Dictionary::new(), ())
    }
}

impl DictionarySerializer<&'static str> {
    fn new_struct_variant(name: &'static str) -> Self {
        Self(Dictionary::new(), name)
    }
}

impl ser::Serializer for Serializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = ArraySerializer<()>;
    type SerializeTuple = ArraySerializer<()>;
    type SerializeTupleStruct = ArraySerializer<()>;
    type SerializeTupleVariant = ArraySerializer<&'static str>;

    type SerializeMap = DictionarySerializer<Option<String>>;
    type SerializeStruct = DictionarySerializer<()>;
    type SerializeStructVariant = DictionarySerializer<&'static str>;

    fn serialize_bool(self, value: bool) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Bool(value))
    }

    fn serialize_i8(self, value: i8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_i16(self, value: i16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_i32(self, value: i32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_i64(self, value: i64) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Integer(value))
    }

    fn serialize_i128(self, value: i128) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_integer(value)?)
    }

    fn serialize_u8(self, value: u8) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_u16(self, value: u16) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_u32(self, value: u32) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(value.into())
    }

    fn serialize_u64(self, value: u64) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_integer(value)?)
    }

    fn serialize_u128(self, value: u128) -> Result<Self::Ok, Self::Error> {
        self.serialize_i64(to_integer(value)?)
    }

    fn serialize_f32(self, value: f32) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Real32(value))
    }

    fn serialize_f64(self, value: f64) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Real64(value))
    }

    fn serialize_char(self, value: char) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(value.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, value: &str) -> Result<Self::Ok, Self::Error> {
        Ok(Value::String(value.to_string()))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok, Self::Error> {
        Ok(Value::Data(value.to_vec()))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Err(unrepresentable("null"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Err(unrepresentable("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Self::Ok, Self::Error> {
        Err(unrepresentable(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Ok(serialize_variant(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(ArraySerializer::new(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(ArraySerializer::new(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(ArraySerializer::new(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(ArraySerializer::new_tuple_variant(variant, len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(DictionarySerializer::new_map())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(DictionarySerializer::new_struct())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(DictionarySerializer::new_struct_variant(variant))
    }
}

impl SerializeSeq for ArraySerializer<()> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(array, ()) = self;
        Ok(Value::Array(array))
    }
}

impl SerializeTuple for ArraySerializer<()> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(array, ()) = self;
        Ok(Value::Array(array))
    }
}

impl SerializeTupleStruct for ArraySerializer<()> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(array, ()) = self;
        Ok(Value::Array(array))
    }
}

impl SerializeTupleVariant for ArraySerializer<&'static str> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0.push(value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(array, name) = self;
        Ok(serialize_variant(name, Value::Array(array)))
    }
}

impl SerializeMap for DictionarySerializer<Option<String>> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.1 = Some(serialize_key(key)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .1
            .take()
            .ok_or_else(|| <Error as ser::Error>::custom("serialize_value before serialize_key"))?;
        self.0.insert(key, value.serialize(Serializer)?);
        Ok(())
    }

    fn serialize_entry<K, V>(&mut self, key: &K, value: &V) -> Result<(), Self::Error>
    where
        K: ?Sized + Serialize,
        V: ?Sized + Serialize,
    {
        self.0
            .insert(serialize_key(key)?, value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(dict, _) = self;
        Ok(Value::Dictionary(dict))
    }
}

impl SerializeStruct for DictionarySerializer<()> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0
            .insert(key.to_string(), value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(dict, ()) = self;
        Ok(Value::Dictionary(dict))
    }
}

impl SerializeStructVariant for DictionarySerializer<&'static str> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.0
            .insert(key.to_string(), value.serialize(Serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let Self(dict, name) = self;
        Ok(serialize_variant(name, Value::Dictionary(dict)))
    }
}

fn serialize_variant(variant: &'static str, value: Value) -> Value {
    Value::Dictionary([(variant.to_string(), value)].into())
}
