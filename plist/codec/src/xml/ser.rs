use std::io;
use std::marker::PhantomData;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{BufMut, Bytes, BytesMut};
use snafu::prelude::*;

use crate::MAX_DEPTH;
use crate::date;
use crate::error::io::{Error as IoError, IoSnafu};
use crate::error::{DepthSnafu, Error};
use crate::value::Value;

use super::{FOOTER, HEADER, MAX_INDENT};

pub fn to_bytes(value: &Value) -> Result<Bytes, Error> {
    let mut buf = BytesMut::new();
    Encoder::<_, Error>::new(&mut buf).encode(value)?;
    Ok(buf.freeze())
}

/// Writes an XML plist.
///
/// On error, whatever was written to `writer` so far is not a usable document.
pub fn to_writer<W>(writer: W, value: &Value) -> Result<(), IoError>
where
    W: io::Write,
{
    Encoder::new(writer).encode(value)
}

pub(crate) trait Write<E> {
    fn write_slice(&mut self, slice: &[u8]) -> Result<(), E>;

    fn write_str(&mut self, string: &str) -> Result<(), E> {
        self.write_slice(string.as_bytes())
    }

    fn write_indent(&mut self, indent: usize) -> Result<(), E> {
        const TABS: &[u8; MAX_INDENT] = b"\t\t\t\t\t\t\t\t";
        self.write_slice(&TABS[..indent.min(MAX_INDENT)])
    }

    /// Writes `string` with `<`, `>`, and `&` escaped, and nothing else.
    fn write_escaped(&mut self, string: &str) -> Result<(), E> {
        let mut rest = string;
        while let Some(i) = rest.find(['<', '>', '&']) {
            self.write_str(&rest[..i])?;
            self.write_str(match rest.as_bytes()[i] {
                b'<' => "&lt;",
                b'>' => "&gt;",
                _ => "&amp;",
            })?;
            rest = &rest[i + 1..];
        }
        self.write_str(rest)
    }

    fn write_element(&mut self, indent: usize, name: &str, text: &str) -> Result<(), E> {
        self.write_indent(indent)?;
        self.write_str("<")?;
        self.write_str(name)?;
        self.write_str(">")?;
        self.write_str(text)?;
        self.write_str("</")?;
        self.write_str(name)?;
        self.write_str(">\n")
    }

    fn write_line(&mut self, indent: usize, line: &str) -> Result<(), E> {
        self.write_indent(indent)?;
        self.write_str(line)?;
        self.write_str("\n")
    }
}

impl<B> Write<Error> for B
where
    B: BufMut,
{
    fn write_slice(&mut self, slice: &[u8]) -> Result<(), Error> {
        self.put_slice(slice);
        Ok(())
    }
}

impl<W> Write<IoError> for W
where
    W: io::Write,
{
    fn write_slice(&mut self, slice: &[u8]) -> Result<(), IoError> {
        self.write_all(slice).context(IoSnafu)
    }
}

struct Encoder<W, E>(W, PhantomData<E>);

impl<W, E> Encoder<W, E>
where
    W: Write<E>,
    E: From<Error>,
{
    fn new(writer: W) -> Self {
        Self(writer, PhantomData)
    }

    fn encode(mut self, value: &Value) -> Result<(), E> {
        self.0.write_str(HEADER)?;
        self.encode_value(value, 0)?;
        self.0.write_str(FOOTER)
    }

    fn encode_value(&mut self, value: &Value, depth: usize) -> Result<(), E> {
        ensure!(depth < MAX_DEPTH, DepthSnafu { depth });
        let w = &mut self.0;
        match value {
            Value::Bool(true) => w.write_line(depth, "<true/>"),
            Value::Bool(false) => w.write_line(depth, "<false/>"),
            Value::Integer(integer) => w.write_element(depth, "integer", &integer.to_string()),
            Value::Real32(real) => w.write_element(depth, "real", &format_real32(*real)),
            Value::Real64(real) => w.write_element(depth, "real", &format_real64(*real)),
            Value::String(string) => {
                w.write_indent(depth)?;
                w.write_str("<string>")?;
                w.write_escaped(string)?;
                w.write_str("</string>\n")
            }
            Value::Data(data) => self.encode_data(data, depth),
            Value::Date(value) => w.write_element(depth, "date", &date::to_xml(value)),
            Value::Array(array) if array.is_empty() => w.write_line(depth, "<array/>"),
            Value::Array(array) => {
                w.write_line(depth, "<array>")?;
                for element in array {
                    self.encode_value(element, depth + 1)?;
                }
                self.0.write_line(depth, "</array>")
            }
            Value::Dictionary(dict) if dict.is_empty() => w.write_line(depth, "<dict/>"),
            Value::Dictionary(dict) => {
                w.write_line(depth, "<dict>")?;
                for (key, value) in dict {
                    self.0.write_indent(depth + 1)?;
                    self.0.write_str("<key>")?;
                    self.0.write_escaped(key)?;
                    self.0.write_str("</key>\n")?;
                    self.encode_value(value, depth + 1)?;
                }
                self.0.write_line(depth, "</dict>")
            }
        }
    }

    // Lines are as wide as fits in 76 columns after the indent, counting a tab as 8 columns.
    fn encode_data(&mut self, data: &[u8], depth: usize) -> Result<(), E> {
        let indent = depth.min(MAX_INDENT);
        let width = 76 - indent * 8;
        let encoded = STANDARD.encode(data);
        self.0.write_line(indent, "<data>")?;
        for line in encoded.as_bytes().chunks(width) {
            self.0.write_indent(indent)?;
            self.0.write_slice(line)?;
            self.0.write_str("\n")?;
        }
        self.0.write_line(indent, "</data>")
    }
}

fn format_real32(real: f32) -> String {
    if real.is_finite() {
        strip_zero_fraction(std::format!("{real:?}"))
    } else {
        format_non_finite(real.is_nan(), real > 0.0)
    }
}

fn format_real64(real: f64) -> String {
    if real.is_finite() {
        strip_zero_fraction(std::format!("{real:?}"))
    } else {
        format_non_finite(real.is_nan(), real > 0.0)
    }
}

fn strip_zero_fraction(mut text: String) -> String {
    if text.ends_with(".0") {
        text.truncate(text.len() - 2);
    }
    text
}

fn format_non_finite(is_nan: bool, is_positive: bool) -> String {
    match (is_nan, is_positive) {
        (true, _) => "nan",
        (false, true) => "+infinity",
        (false, false) => "-infinity",
    }
    .to_string()
}
