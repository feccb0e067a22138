use std::any;
use std::io;
use std::marker::PhantomData;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::MAX_DEPTH;
use crate::date;
use crate::error::io::Error as IoError;
use crate::error::Error;
use crate::value::{Array, Dictionary, Value};

use super::token::{ReadError, Token, Tokenizer};

/// Decodes an XML plist, accepting any `i64` integer.
pub fn from_slice(slice: &[u8]) -> Result<Value, Error> {
    Decoder::<_, Error, NonStrict>::new(slice).decode()
}

/// Decodes an XML plist, rejecting integers outside the `i32` range.
pub fn from_slice_strict(slice: &[u8]) -> Result<Value, Error> {
    Decoder::<_, Error, Strict>::new(slice).decode()
}

pub fn from_reader<R>(reader: R) -> Result<Value, IoError>
where
    R: io::BufRead,
{
    Decoder::<_, IoError, NonStrict>::new(reader).decode()
}

pub fn from_reader_strict<R>(reader: R) -> Result<Value, IoError>
where
    R: io::BufRead,
{
    Decoder::<_, IoError, Strict>::new(reader).decode()
}

pub(crate) trait Strictness {
    fn parse_integer(integer: &str) -> Result<i64, Error>;
}

pub(crate) struct Strict;

impl Strictness for Strict {
    fn parse_integer(integer: &str) -> Result<i64, Error> {
        parse_integer::<i32>(integer).map(i64::from)
    }
}

pub(crate) struct NonStrict;

impl Strictness for NonStrict {
    fn parse_integer(integer: &str) -> Result<i64, Error> {
        parse_integer::<i64>(integer)
    }
}

fn parse_integer<I>(integer: &str) -> Result<I, Error>
where
    I: FromStr<Err = ParseIntError>,
{
    integer.parse::<I>().map_err(|error| match error.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::IntegerOverflow {
            int_type_name: any::type_name::<I>(),
            integer: integer.to_string(),
        },
        _ => Error::Integer {
            integer: integer.to_string(),
        },
    })
}

fn parse_real(real: &str) -> Result<f64, Error> {
    let (sign, magnitude) = match real.as_bytes().first() {
        Some(b'-') => (-1.0, &real[1..]),
        Some(b'+') => (1.0, &real[1..]),
        _ => (1.0, real),
    };
    if magnitude.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    if magnitude.eq_ignore_ascii_case("inf") || magnitude.eq_ignore_ascii_case("infinity") {
        return Ok(sign * f64::INFINITY);
    }
    real.parse().map_err(|_| Error::Real {
        real: real.to_string(),
    })
}

fn decode_data(data: &str) -> Result<Vec<u8>, Error> {
    let data = data
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect::<Vec<_>>();
    STANDARD.decode(data).map_err(|error| Error::Base64 {
        message: error.to_string(),
    })
}

struct Decoder<R, E, S> {
    tokenizer: Tokenizer<R, E>,
    depth: usize,
    _strictness: PhantomData<S>,
}

impl<R, E, S> Decoder<R, E, S>
where
    R: io::BufRead,
    E: ReadError,
    S: Strictness,
{
    fn new(source: R) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            depth: 0,
            _strictness: PhantomData,
        }
    }

    fn decode(mut self) -> Result<Value, E> {
        match self.next_tag()? {
            Token::Start { name, empty: false } if name == "plist" => {}
            token => return Err(unexpected("<plist>", &token)),
        }
        let token = self.next_tag()?;
        let value = self.decode_value(token)?;
        self.expect_end("plist")?;
        match self.next_tag()? {
            Token::Eof => {}
            token => return Err(unexpected("end of document", &token)),
        }
        tracing::debug!(kind = value.kind(), "decode xml plist");
        Ok(value)
    }

    /// Returns the next tag, skipping whitespace between tags.
    fn next_tag(&mut self) -> Result<Token, E> {
        loop {
            match self.tokenizer.next_token()? {
                Token::Text(text) if text.bytes().all(|byte| byte.is_ascii_whitespace()) => {}
                token => return Ok(token),
            }
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<(), E> {
        match self.next_tag()? {
            Token::End { name: actual } if actual == name => Ok(()),
            token => Err(unexpected("end tag", &token)),
        }
    }

    fn decode_value(&mut self, token: Token) -> Result<Value, E> {
        let (name, empty) = match token {
            Token::Start { name, empty } => (name, empty),
            token => return Err(unexpected("value", &token)),
        };
        Ok(match name.as_str() {
            "true" => {
                self.read_empty(&name, empty)?;
                Value::Bool(true)
            }
            "false" => {
                self.read_empty(&name, empty)?;
                Value::Bool(false)
            }
            "integer" => Value::Integer(S::parse_integer(self.read_text(&name, empty)?.trim())?),
            "real" => Value::Real64(parse_real(self.read_text(&name, empty)?.trim())?),
            "string" => Value::String(self.read_text(&name, empty)?),
            "data" => Value::Data(decode_data(&self.read_text(&name, empty)?)?),
            "date" => Value::Date(date::from_xml(self.read_text(&name, empty)?.trim())?),
            "array" => Value::Array(self.nested(|this| this.decode_array(empty))?),
            "dict" => Value::Dictionary(self.nested(|this| this.decode_dictionary(empty))?),
            _ => {
                let name = name.clone();
                return Err(unexpected("value", &Token::Start { name, empty }));
            }
        })
    }

    fn nested<T, F>(&mut self, decode: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(Error::Depth { depth: self.depth }.into());
        }
        self.depth += 1;
        let result = decode(self);
        self.depth -= 1;
        result
    }

    fn decode_array(&mut self, empty: bool) -> Result<Array, E> {
        let mut array = Array::new();
        if empty {
            return Ok(array);
        }
        loop {
            match self.next_tag()? {
                Token::End { name } if name == "array" => return Ok(array),
                token => array.push(self.decode_value(token)?),
            }
        }
    }

    // Duplicate keys keep the last value.
    fn decode_dictionary(&mut self, empty: bool) -> Result<Dictionary, E> {
        let mut dict = Dictionary::new();
        if empty {
            return Ok(dict);
        }
        loop {
            let key = match self.next_tag()? {
                Token::End { name } if name == "dict" => return Ok(dict),
                Token::Start { name, empty } if name == "key" => self.read_text(&name, empty)?,
                token => return Err(unexpected("<key>", &token)),
            };
            let token = self.next_tag()?;
            let value = self.decode_value(token)?;
            dict.insert(key, value);
        }
    }

    fn read_empty(&mut self, name: &str, empty: bool) -> Result<(), E> {
        if empty {
            Ok(())
        } else {
            self.expect_end(name)
        }
    }

    /// Reads element content verbatim, concatenating text split by comments.
    fn read_text(&mut self, name: &str, empty: bool) -> Result<String, E> {
        let mut text = String::new();
        if empty {
            return Ok(text);
        }
        loop {
            match self.tokenizer.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::End { name: actual } if actual == name => return Ok(text),
                Token::Eof => return Err(Error::XmlEof.into()),
                token => return Err(unexpected("text", &token)),
            }
        }
    }
}

fn unexpected<E>(expect: &'static str, token: &Token) -> E
where
    E: From<Error>,
{
    match token {
        Token::Eof => Error::XmlEof,
        _ => Error::UnexpectedElement {
            expect,
            actual: token.to_string(),
        },
    }
    .into()
}
