//! Binary property list, version 00.
//!
//! Layout: the 8-byte magic, the object records, the offset table, and a 32-byte trailer.  Every
//! record starts with a marker byte whose high nibble is the type tag and whose low nibble is
//! either the inline size or `0xf`, meaning the size follows as an integer record.

pub mod de;
pub mod ser;

use bytes::{Buf, BufMut};

pub(crate) const MAGIC: &[u8; 8] = b"bplist00";

pub(crate) const TRAILER_SIZE: usize = 32;

pub(crate) const FALSE: u8 = 0x08;
pub(crate) const TRUE: u8 = 0x09;

pub(crate) const TAG_SIMPLE: u8 = 0x0;
pub(crate) const TAG_INTEGER: u8 = 0x1;
pub(crate) const TAG_REAL: u8 = 0x2;
pub(crate) const TAG_DATE: u8 = 0x3;
pub(crate) const TAG_DATA: u8 = 0x4;
pub(crate) const TAG_ASCII: u8 = 0x5;
pub(crate) const TAG_UTF16: u8 = 0x6;
pub(crate) const TAG_ARRAY: u8 = 0xa;
pub(crate) const TAG_DICTIONARY: u8 = 0xd;

pub(crate) const SIZE_FOLLOWS: u8 = 0xf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Trailer {
    pub(crate) offset_int_size: u8,
    pub(crate) object_ref_size: u8,
    pub(crate) num_objects: u64,
    pub(crate) root_object: u64,
    pub(crate) offset_table_offset: u64,
}

impl Trailer {
    pub(crate) fn decode(trailer: &[u8; TRAILER_SIZE]) -> Self {
        let mut buf = &trailer[..];
        buf.advance(6);
        Self {
            offset_int_size: buf.get_u8(),
            object_ref_size: buf.get_u8(),
            num_objects: buf.get_u64(),
            root_object: buf.get_u64(),
            offset_table_offset: buf.get_u64(),
        }
    }

    pub(crate) fn encode<B>(&self, buf: &mut B)
    where
        B: BufMut,
    {
        buf.put_bytes(0, 6);
        buf.put_u8(self.offset_int_size);
        buf.put_u8(self.object_ref_size);
        buf.put_u64(self.num_objects);
        buf.put_u64(self.root_object);
        buf.put_u64(self.offset_table_offset);
    }
}

pub(crate) fn marker(tag: u8, info: u8) -> u8 {
    (tag << 4) | (info & 0xf)
}

/// Returns the smallest of 1, 2, 4, or 8 bytes that holds `n`.
pub(crate) fn min_size(n: u64) -> u8 {
    if n < 1 << 8 {
        1
    } else if n < 1 << 16 {
        2
    } else if n < 1 << 32 {
        4
    } else {
        8
    }
}
