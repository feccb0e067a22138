use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, Error as _, IntoDeserializer,
    Unexpected, VariantAccess, Visitor,
};

use crate::date;
use crate::error::Error;

use super::{Array, Dictionary, Value};

pub fn from_value<T>(value: Value) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    T::deserialize(value)
}

impl Value {
    pub(crate) fn to_unexpected(&self) -> Unexpected<'_> {
        match self {
            Self::Bool(value) => Unexpected::Bool(*value),
            Self::Integer(integer) => Unexpected::Signed(*integer),
            Self::Real32(real) => Unexpected::Float((*real).into()),
            Self::Real64(real) => Unexpected::Float(*real),
            Self::String(string) => Unexpected::Str(string),
            Self::Data(data) => Unexpected::Bytes(data),
            Self::Date(_) => Unexpected::Other("date"),
            Self::Array(_) => Unexpected::Seq,
            Self::Dictionary(_) => Unexpected::Map,
        }
    }
}

fn visit_array<'de, V>(array: Array, visitor: V) -> Result<V::Value, Error>
where
    V: Visitor<'de>,
{
    let mut deserializer = SeqDeserializer::<_, Error>::new(array.into_iter());
    let value = visitor.visit_seq(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

fn visit_dictionary<'de, V>(dict: Dictionary, visitor: V) -> Result<V::Value, Error>
where
    V: Visitor<'de>,
{
    let mut deserializer = MapDeserializer::<_, Error>::new(dict.into_iter());
    let value = visitor.visit_map(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

impl<'de> Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self {
            Self::Bool(value) => visitor.visit_bool(value),
            Self::Integer(integer) => visitor.visit_i64(integer),
            Self::Real32(real) => visitor.visit_f32(real),
            Self::Real64(real) => visitor.visit_f64(real),
            Self::String(string) => visitor.visit_string(string),
            Self::Data(data) => visitor.visit_byte_buf(data),
            Self::Date(value) => visitor.visit_string(date::to_rfc3339(&value)),
            Self::Array(array) => visit_array(array, visitor),
            Self::Dictionary(dict) => visit_dictionary(dict, visitor),
        }
    }

    // A plist has no null; an absent dictionary entry is the only way to express `None`.
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self {
            Self::String(variant) => visitor.visit_enum(EnumDeserializer(variant, None)),
            Self::Dictionary(mut dict) => match dict.len() {
                1 => match dict.pop_first() {
                    Some((variant, value)) => {
                        visitor.visit_enum(EnumDeserializer(variant, Some(value)))
                    }
                    None => Err(Error::invalid_length(0, &visitor)),
                },
                n => Err(Error::invalid_length(n, &visitor)),
            },
            _ => Err(Error::invalid_type(self.to_unexpected(), &visitor)),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char
        str string
        bytes byte_buf
        unit unit_struct
        seq tuple tuple_struct
        map struct
        identifier
    }
}

struct EnumDeserializer(String, Option<Value>);

struct VariantDeserializer(Option<Value>);

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let Self(variant, value) = self;
        let variant = seed.deserialize(Value::String(variant))?;
        Ok((variant, VariantDeserializer(value)))
    }
}

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.0 {
            None => Ok(()),
            Some(value) => Err(Error::invalid_type(value.to_unexpected(), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.expect("newtype variant")?)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.expect("tuple variant")?.deserialize_any(visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.expect("struct variant")?.deserialize_any(visitor)
    }
}

impl VariantDeserializer {
    fn expect(self, exp: &'static str) -> Result<Value, Error> {
        self.0
            .ok_or_else(|| Error::invalid_type(Unexpected::UnitVariant, &exp))
    }
}
