pub mod binary;
pub mod date;
pub mod error;
pub mod value;
pub mod xml;

#[cfg(test)]
mod testing;

//
// Implementer's Notes:
//
// * We support the two property list formats Apple tools produce: XML (`PropertyList-1.0.dtd`)
//   and binary (`bplist00`).  We do not support the old-style ASCII format, nor the binary
//   object types that the formats never carry in practice (UID, set, ordered set, null).
//
// * `Value` is a closed enum, so "null" and "unknown kind" cannot occur inside a graph.  The
//   structural errors that remain are raised where foreign data enters the model (`to_value`)
//   and where a graph exceeds a wire-format limit.
//
// * The two formats are not equally expressive:
//
//   | Value                  | Binary                       | XML                          |
//   |------------------------|------------------------------|------------------------------|
//   | Integer                | i64                          | i64 (i32 with `_strict`)     |
//   | Real32                 | 4-byte real                  | read back as Real64          |
//   | Date                   | millisecond precision        | second precision             |
//
// * As with the serde codecs, we divided the interface into pure-memory and I/O functions, which
//   resulted in one error type for each group of functions.
//

use std::io::{self, Read};

use bytes::Bytes;
use snafu::prelude::*;

use crate::error::io::{Error as IoError, IoSnafu};

pub use crate::error::{Error, ErrorKind};
pub use crate::value::Value;
pub use crate::value::de::from_value;
pub use crate::value::ser::to_value;

/// Nesting limit shared by the decoders and encoders.
pub(crate) const MAX_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Format {
    Xml,
    Binary,
}

impl Format {
    /// Guesses the format from the leading bytes of a document.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"bplist") {
            Self::Binary
        } else {
            Self::Xml
        }
    }
}

pub fn to_bytes(value: &Value, format: Format) -> Result<Bytes, Error> {
    match format {
        Format::Xml => xml::ser::to_bytes(value),
        Format::Binary => binary::ser::to_bytes(value),
    }
}

pub fn to_writer<W>(mut writer: W, value: &Value, format: Format) -> Result<(), IoError>
where
    W: io::Write,
{
    match format {
        Format::Xml => xml::ser::to_writer(writer, value),
        Format::Binary => {
            let bytes = binary::ser::to_bytes(value)?;
            writer.write_all(&bytes).context(IoSnafu)
        }
    }
}

pub fn from_slice(slice: &[u8], format: Format) -> Result<Value, Error> {
    match format {
        Format::Xml => xml::de::from_slice(slice),
        Format::Binary => binary::de::from_slice(slice),
    }
}

/// Decodes a document from a reader.
///
/// Binary documents are read to the end first because the trailer sits at the end.
pub fn from_reader<R>(mut reader: R, format: Format) -> Result<Value, IoError>
where
    R: io::Read,
{
    match format {
        Format::Xml => xml::de::from_reader(io::BufReader::new(reader)),
        Format::Binary => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).context(IoSnafu)?;
            Ok(binary::de::from_slice(&buf)?)
        }
    }
}
