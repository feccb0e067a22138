use std::borrow::Cow;
use std::fmt;
use std::io;
use std::marker::PhantomData;

use quick_xml::Reader;
use quick_xml::escape;
use quick_xml::events::Event;
use snafu::prelude::*;

use crate::error::io::Error as IoError;
use crate::error::{Error, InvalidStringSnafu};

/// Maps `quick_xml` errors onto the error type of the entry point.
pub(crate) trait ReadError: From<Error> {
    fn from_xml(error: quick_xml::Error, position: u64) -> Self;
}

impl ReadError for Error {
    fn from_xml(error: quick_xml::Error, position: u64) -> Self {
        Error::XmlSyntax {
            position,
            message: error.to_string(),
        }
    }
}

impl ReadError for IoError {
    fn from_xml(error: quick_xml::Error, position: u64) -> Self {
        match error {
            // `quick_xml` shares the `io::Error`; we wrap it to keep its kind.
            quick_xml::Error::Io(source) => IoError::Io {
                source: io::Error::new(source.kind(), source),
            },
            error => Error::from_xml(error, position).into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Token {
    Start { name: String, empty: bool },
    End { name: String },
    Text(String),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start { name, empty: false } => std::write!(f, "<{name}>"),
            Self::Start { name, empty: true } => std::write!(f, "<{name}/>"),
            Self::End { name } => std::write!(f, "</{name}>"),
            Self::Text(text) => std::write!(f, "text {text:?}"),
            Self::Eof => f.write_str("end of document"),
        }
    }
}

/// Reduces `quick_xml` events to the tokens a plist document is made of.
///
/// The XML declaration, processing instructions, the DOCTYPE, and comments produce no token.
/// CDATA sections are reported as plain text.  Consecutive text tokens are not merged; text split
/// by a comment arrives as two tokens.
pub(crate) struct Tokenizer<R, E> {
    reader: Reader<R>,
    buf: Vec<u8>,
    _error: PhantomData<E>,
}

impl<R, E> Tokenizer<R, E>
where
    R: io::BufRead,
    E: ReadError,
{
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        // Text is reported verbatim; the decoder decides what to trim.
        reader.config_mut().trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
            _error: PhantomData,
        }
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, E> {
        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|error| E::from_xml(error, self.reader.error_position()))?;
            match event {
                Event::Start(start) => {
                    return Ok(Token::Start {
                        name: decode_name(start.name().as_ref())?,
                        empty: false,
                    });
                }
                Event::Empty(start) => {
                    return Ok(Token::Start {
                        name: decode_name(start.name().as_ref())?,
                        empty: true,
                    });
                }
                Event::End(end) => {
                    return Ok(Token::End {
                        name: decode_name(end.name().as_ref())?,
                    });
                }
                Event::Text(text) => return Ok(Token::Text(decode_text(&text)?)),
                Event::CData(text) => return Ok(Token::Text(decode_utf8(&text)?.to_string())),
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
                Event::Eof => return Ok(Token::Eof),
            }
        }
    }
}

fn decode_utf8(raw: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(raw)
        .ok()
        .context(InvalidStringSnafu { encoding: "utf-8" })
}

fn decode_name(raw: &[u8]) -> Result<String, Error> {
    decode_utf8(raw).map(str::to_string)
}

fn decode_text(raw: &[u8]) -> Result<String, Error> {
    escape::unescape(decode_utf8(raw)?)
        .map(Cow::into_owned)
        .map_err(|error| Error::Escape {
            message: error.to_string(),
        })
}
