pub mod io;

use std::fmt;

use bytes::Bytes;
use snafu::prelude::*;

#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    //
    // Binary format errors.
    //
    #[snafu(display("expect binary plist magic: {magic:?}"))]
    Magic { magic: Bytes },
    #[snafu(display("incomplete binary plist: {size} bytes at offset {offset}"))]
    Incomplete { offset: usize, size: usize },

    #[snafu(display("invalid {field} size: {size}"))]
    IntSize { field: &'static str, size: u8 },
    #[snafu(display("object id out of range: {id} >= {num_objects}"))]
    ObjectId { id: u64, num_objects: u64 },
    #[snafu(display("unsupported object marker: 0x{marker:02x} at offset {offset}"))]
    Marker { marker: u8, offset: usize },

    // A well-formed binary plist is a DAG.  We refuse to follow an object table that loops back
    // into an object that is still being decoded.
    #[snafu(display("object reference cycle: {id}"))]
    Cycle { id: u64 },
    #[snafu(display("nesting depth limit exceeded: {depth}"))]
    Depth { depth: usize },
    #[snafu(display("object graph expands too far for a {size}-byte input"))]
    Expansion { size: usize },

    #[snafu(display("invalid {encoding} string"))]
    InvalidString { encoding: &'static str },
    #[snafu(display("{what} size limit exceeded: {size}"))]
    SizeExceeded { what: &'static str, size: usize },

    //
    // Value errors.
    //
    #[snafu(display("expect string dictionary key: {kind}"))]
    KeyType { kind: &'static str },
    #[snafu(display("invalid date: {date:?}"))]
    Date { date: String },
    #[snafu(display("invalid integer: {integer:?}"))]
    Integer { integer: String },
    #[snafu(display("{int_type_name} overflow: {integer:?}"))]
    IntegerOverflow {
        int_type_name: &'static str,
        integer: String,
    },
    #[snafu(display("invalid real: {real:?}"))]
    Real { real: String },
    #[snafu(display("invalid base64 data: {message}"))]
    Base64 { message: String },

    //
    // XML format errors.
    //
    #[snafu(display("unexpected end of xml document"))]
    XmlEof,
    #[snafu(display("xml syntax error at byte {position}: {message}"))]
    XmlSyntax { position: u64, message: String },
    #[snafu(display("invalid xml escape: {message}"))]
    Escape { message: String },
    #[snafu(display("expect {expect}: {actual}"))]
    UnexpectedElement {
        expect: &'static str,
        actual: String,
    },

    //
    // `de` and `ser` errors.
    //
    // Serialization fails when the input is something the plist data model cannot represent
    // (null, unit, out-of-range integers, etc.), which is why it is kept apart from `Custom`.
    #[snafu(display("{message}"))]
    Structural { message: String },
    #[snafu(display("{message}"))]
    Custom { message: String },
}

/// Coarse classification of errors, for callers that map them onto their own taxonomy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Bad magic, or input that is not a plist document at all.
    UnsupportedFormat,
    /// Input ends before a required field.
    TruncatedInput,
    /// Recognized but unimplemented marker, or a malformed object graph.
    UnsupportedFeature,
    /// Text or bytes not convertible to the requested type.
    ValueConversion,
    /// Input value that the plist data model or wire format cannot represent.
    Structural,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Magic { .. } | Self::XmlSyntax { .. } | Self::UnexpectedElement { .. } => {
                ErrorKind::UnsupportedFormat
            }
            Self::Incomplete { .. } | Self::ObjectId { .. } | Self::XmlEof => {
                ErrorKind::TruncatedInput
            }
            Self::IntSize { .. }
            | Self::Marker { .. }
            | Self::Cycle { .. }
            | Self::Depth { .. }
            | Self::Expansion { .. }
            | Self::Escape { .. } => ErrorKind::UnsupportedFeature,
            Self::InvalidString { .. }
            | Self::Date { .. }
            | Self::Integer { .. }
            | Self::IntegerOverflow { .. }
            | Self::Real { .. }
            | Self::Base64 { .. }
            | Self::Custom { .. } => ErrorKind::ValueConversion,
            Self::KeyType { .. } | Self::SizeExceeded { .. } | Self::Structural { .. } => {
                ErrorKind::Structural
            }
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T>(message: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Custom {
            message: message.to_string(),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(message: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Structural {
            message: message.to_string(),
        }
    }
}
