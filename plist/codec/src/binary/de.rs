use bytes::{Buf, Bytes};
use snafu::prelude::*;

use crate::MAX_DEPTH;
use crate::date;
use crate::error::{
    CycleSnafu, DepthSnafu, Error, ExpansionSnafu, IncompleteSnafu, IntSizeSnafu,
    InvalidStringSnafu, MagicSnafu, MarkerSnafu, ObjectIdSnafu,
};
use crate::value::{Array, Dictionary, Value};

use super::{
    FALSE, MAGIC, SIZE_FOLLOWS, TAG_ARRAY, TAG_ASCII, TAG_DATA, TAG_DATE, TAG_DICTIONARY,
    TAG_INTEGER, TAG_REAL, TAG_SIMPLE, TAG_UTF16, TRAILER_SIZE, TRUE, Trailer,
};

pub fn from_slice(slice: &[u8]) -> Result<Value, Error> {
    Decoder::new(slice)?.decode()
}

// Shared references let a small input describe an exponentially large value tree.  We cap the
// decoded size at this multiple of the input size, where an object costs one unit plus the length
// of its payload.
const MAX_EXPANSION: usize = 256;

struct Decoder<'a> {
    buf: &'a [u8],
    trailer: Trailer,
    offsets: Vec<usize>,
    // Objects whose decoding has started but not finished.
    in_progress: Vec<bool>,
    depth: usize,
    budget: usize,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Result<Self, Error> {
        ensure!(
            buf.starts_with(MAGIC),
            MagicSnafu {
                magic: Bytes::copy_from_slice(&buf[..buf.len().min(MAGIC.len())]),
            },
        );
        let trailer = buf
            .last_chunk::<TRAILER_SIZE>()
            .filter(|_| buf.len() >= MAGIC.len() + TRAILER_SIZE)
            .map(Trailer::decode)
            .context(IncompleteSnafu {
                offset: MAGIC.len(),
                size: TRAILER_SIZE,
            })?;
        tracing::debug!(
            offset_int_size = trailer.offset_int_size,
            object_ref_size = trailer.object_ref_size,
            num_objects = trailer.num_objects,
            root_object = trailer.root_object,
            offset_table_offset = trailer.offset_table_offset,
            "decode binary plist",
        );

        ensure!(
            (1..=8).contains(&trailer.offset_int_size),
            IntSizeSnafu {
                field: "offset int",
                size: trailer.offset_int_size,
            },
        );
        ensure!(
            (1..=8).contains(&trailer.object_ref_size),
            IntSizeSnafu {
                field: "object ref",
                size: trailer.object_ref_size,
            },
        );

        // Check the table bounds before allocating anything sized by `num_objects`.
        let table_offset = to_usize(trailer.offset_table_offset);
        let offset_int_size = usize::from(trailer.offset_int_size);
        let table = to_usize(trailer.num_objects)
            .checked_mul(offset_int_size)
            .and_then(|size| slice(buf, table_offset, size).ok())
            .context(IncompleteSnafu {
                offset: table_offset,
                size: usize::MAX,
            })?;
        let offsets = table
            .chunks_exact(offset_int_size)
            .map(|mut entry| to_usize(entry.get_uint(offset_int_size)))
            .collect::<Vec<_>>();

        ensure!(
            trailer.root_object < trailer.num_objects,
            ObjectIdSnafu {
                id: trailer.root_object,
                num_objects: trailer.num_objects,
            },
        );

        Ok(Self {
            buf,
            trailer,
            in_progress: vec![false; offsets.len()],
            offsets,
            depth: 0,
            budget: buf.len().saturating_mul(MAX_EXPANSION),
        })
    }

    fn decode(mut self) -> Result<Value, Error> {
        self.decode_object(self.trailer.root_object)
    }

    fn decode_object(&mut self, id: u64) -> Result<Value, Error> {
        let index = to_usize(id);
        ensure!(
            index < self.offsets.len(),
            ObjectIdSnafu {
                id,
                num_objects: self.trailer.num_objects,
            },
        );
        ensure!(!self.in_progress[index], CycleSnafu { id });
        ensure!(self.depth < MAX_DEPTH, DepthSnafu { depth: self.depth });
        self.charge(1)?;

        self.in_progress[index] = true;
        self.depth += 1;
        let result = self.decode_object_at(self.offsets[index]);
        self.depth -= 1;
        self.in_progress[index] = false;
        result
    }

    fn decode_object_at(&mut self, offset: usize) -> Result<Value, Error> {
        let marker = self.read_uint(offset, 1)? as u8;
        let (tag, info) = (marker >> 4, marker & 0xf);
        let body = offset + 1;
        let unsupported = || MarkerSnafu { marker, offset }.build();
        match tag {
            TAG_SIMPLE => match marker {
                FALSE => Ok(Value::Bool(false)),
                TRUE => Ok(Value::Bool(true)),
                _ => Err(unsupported()),
            },
            TAG_INTEGER => {
                ensure!(info <= 3, MarkerSnafu { marker, offset });
                // Widths below 8 bytes are unsigned; the 8-byte width is two's complement.
                Ok(Value::Integer(self.read_uint(body, 1 << info)? as i64))
            }
            TAG_REAL => match info {
                2 => Ok(Value::Real32(f32::from_bits(self.read_uint(body, 4)? as u32))),
                3 => Ok(Value::Real64(f64::from_bits(self.read_uint(body, 8)?))),
                _ => Err(unsupported()),
            },
            TAG_DATE => {
                ensure!(info == 3, MarkerSnafu { marker, offset });
                let seconds = f64::from_bits(self.read_uint(body, 8)?);
                Ok(Value::Date(date::from_binary(seconds)?))
            }
            TAG_DATA => {
                let (len, start) = self.read_size(info, body)?;
                let data = slice(self.buf, start, len)?;
                self.charge(len)?;
                Ok(Value::Data(data.to_vec()))
            }
            TAG_ASCII => {
                let (len, start) = self.read_size(info, body)?;
                let bytes = slice(self.buf, start, len)?;
                self.charge(len)?;
                ensure!(bytes.is_ascii(), InvalidStringSnafu { encoding: "ascii" });
                Ok(Value::String(bytes.iter().copied().map(char::from).collect()))
            }
            TAG_UTF16 => {
                let (len, start) = self.read_size(info, body)?;
                let size = len.checked_mul(2).context(IncompleteSnafu {
                    offset: start,
                    size: usize::MAX,
                })?;
                let units = slice(self.buf, start, size)?;
                self.charge(len)?;
                let units = units
                    .chunks_exact(2)
                    .map(|mut unit| unit.get_u16())
                    .collect::<Vec<_>>();
                String::from_utf16(&units)
                    .ok()
                    .context(InvalidStringSnafu { encoding: "utf-16" })
                    .map(Value::String)
            }
            TAG_ARRAY => {
                let (len, start) = self.read_size(info, body)?;
                let refs = self.read_refs(start, len)?;
                refs.into_iter()
                    .map(|id| self.decode_object(id))
                    .collect::<Result<Array, _>>()
                    .map(Value::Array)
            }
            TAG_DICTIONARY => {
                let (len, start) = self.read_size(info, body)?;
                let keys = self.read_refs(start, len)?;
                let values = self.read_refs(start + keys.len() * self.ref_size(), len)?;
                let mut dict = Dictionary::new();
                for (key, value) in keys.into_iter().zip(values) {
                    let key = match self.decode_object(key)? {
                        Value::String(key) => key,
                        key => return Err(Error::KeyType { kind: key.kind() }),
                    };
                    dict.insert(key, self.decode_object(value)?);
                }
                Ok(Value::Dictionary(dict))
            }
            _ => Err(unsupported()),
        }
    }

    fn charge(&mut self, cost: usize) -> Result<(), Error> {
        self.budget = self.budget.checked_sub(cost).context(ExpansionSnafu {
            size: self.buf.len(),
        })?;
        Ok(())
    }

    /// Reads the size of a record and returns it with the offset of the record body.
    fn read_size(&self, info: u8, offset: usize) -> Result<(usize, usize), Error> {
        if info != SIZE_FOLLOWS {
            return Ok((usize::from(info), offset));
        }
        let marker = self.read_uint(offset, 1)? as u8;
        ensure!(
            marker >> 4 == TAG_INTEGER && marker & 0xf <= 3,
            MarkerSnafu { marker, offset },
        );
        let size = 1 << (marker & 0xf);
        let len = self.read_uint(offset + 1, size)?;
        Ok((to_usize(len), offset + 1 + size))
    }

    fn read_refs(&self, offset: usize, len: usize) -> Result<Vec<u64>, Error> {
        let ref_size = self.ref_size();
        let refs = len
            .checked_mul(ref_size)
            .and_then(|size| slice(self.buf, offset, size).ok())
            .context(IncompleteSnafu {
                offset,
                size: usize::MAX,
            })?;
        Ok(refs
            .chunks_exact(ref_size)
            .map(|mut id| id.get_uint(ref_size))
            .collect())
    }

    fn read_uint(&self, offset: usize, size: usize) -> Result<u64, Error> {
        Ok(slice(self.buf, offset, size)?.get_uint(size))
    }

    fn ref_size(&self) -> usize {
        self.trailer.object_ref_size.into()
    }
}

fn slice(buf: &[u8], offset: usize, size: usize) -> Result<&[u8], Error> {
    offset
        .checked_add(size)
        .and_then(|end| buf.get(offset..end))
        .context(IncompleteSnafu { offset, size })
}

// Values that do not fit `usize` cannot address anything in the buffer, so saturating is enough
// to make the subsequent bounds checks fail.
fn to_usize(n: u64) -> usize {
    n.try_into().unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hex_literal::hex;

    use crate::error::ErrorKind;
    use crate::testing::{
        FILLED_ARRAY, FILLED_DICT, filled_array, filled_dict, make_data, va, vd, vi, vs,
    };

    use super::*;

    fn test(testdata: &[u8], expect: Value) {
        assert_eq!(from_slice(testdata), Ok(expect));
    }

    fn test_err(testdata: &[u8], expect: Error) {
        assert_eq!(from_slice(testdata), Err(expect));
    }

    // Wraps one object record, placed at offset 8, into a complete plist.
    fn single_object(body: &[u8]) -> Vec<u8> {
        let mut testdata = b"bplist00".to_vec();
        testdata.extend_from_slice(body);
        let table_offset = testdata.len() as u64;
        testdata.push(8);
        testdata.extend_from_slice(&hex!("000000000000 0101 0000000000000001 0000000000000000"));
        testdata.extend_from_slice(&table_offset.to_be_bytes());
        testdata
    }

    #[test]
    fn magic() {
        test_err(
            b"",
            Error::Magic {
                magic: Bytes::new(),
            },
        );
        test_err(
            b"bplist",
            Error::Magic {
                magic: Bytes::from_static(b"bplist"),
            },
        );
        test_err(
            &hex!("62706c6973743031 10 00 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            Error::Magic {
                magic: Bytes::from_static(b"bplist01"),
            },
        );
        test_err(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            Error::Magic {
                magic: Bytes::from_static(b"<?xml ve"),
            },
        );
        assert_eq!(
            from_slice(b"garbage!garbage!").unwrap_err().kind(),
            ErrorKind::UnsupportedFormat,
        );
    }

    #[test]
    fn truncated() {
        test_err(
            b"bplist00",
            Error::Incomplete {
                offset: 8,
                size: TRAILER_SIZE,
            },
        );
        // Object offset points past the end of the buffer.
        test_err(
            &hex!("62706c6973743030 10 00 ff 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            Error::Incomplete {
                offset: 255,
                size: 1,
            },
        );
        // Offset table extends into the trailer and beyond.
        test_err(
            &hex!("62706c6973743030 10 00 08 000000000000 0101 00000000000000ff 0000000000000000 000000000000000a"),
            Error::Incomplete {
                offset: 10,
                size: usize::MAX,
            },
        );
    }

    #[test]
    fn trailer_sizes() {
        test_err(
            &hex!("62706c6973743030 10 00 08 000000000000 0001 0000000000000001 0000000000000000 000000000000000a"),
            Error::IntSize {
                field: "offset int",
                size: 0,
            },
        );
        test_err(
            &hex!("62706c6973743030 10 00 08 000000000000 0109 0000000000000001 0000000000000000 000000000000000a"),
            Error::IntSize {
                field: "object ref",
                size: 9,
            },
        );
        test_err(
            &hex!("62706c6973743030 10 00 08 000000000000 0101 0000000000000001 0000000000000001 000000000000000a"),
            Error::ObjectId {
                id: 1,
                num_objects: 1,
            },
        );
    }

    #[test]
    fn bool() {
        test(
            &hex!("62706c6973743030 09 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            Value::Bool(true),
        );
        test(
            &hex!("62706c6973743030 08 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            Value::Bool(false),
        );
    }

    #[test]
    fn integer() {
        fn test_int(body: &[u8], expect: i64) {
            test(&single_object(body), vi(expect));
        }

        test_int(&hex!("10 00"), 0);
        test_int(&hex!("10 ff"), 255);
        test_int(&hex!("11 0100"), 256);
        test_int(&hex!("11 ffff"), 65535);
        test_int(&hex!("12 00010000"), 65536);
        // Widths below 8 bytes are not sign-extended.
        test_int(&hex!("12 ffffffff"), 4294967295);
        test_int(&hex!("13 0000000100000000"), 4294967296);
        test_int(&hex!("13 ffffffffffffffff"), -1);
        test_int(&hex!("13 8000000000000000"), i64::MIN);
    }

    #[test]
    fn integer_fixtures() {
        test(
            &hex!("62706c6973743030 10 00 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            vi(0),
        );
        test(
            &hex!("62706c6973743030 11 7fff 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000b"),
            vi(32767),
        );
        test(
            &hex!("62706c6973743030 12 80000000 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000d"),
            vi(2147483648),
        );
        test(
            &hex!("62706c6973743030 13 ffffffffffffff81 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000011"),
            vi(-127),
        );
    }

    #[test]
    fn real() {
        test(
            &hex!("62706c6973743030 22 3fc00000 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000d"),
            Value::Real32(1.5),
        );
        test(
            &hex!("62706c6973743030 23 4004000000000000 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000011"),
            Value::Real64(2.5),
        );
        test_err(
            &hex!("62706c6973743030 21 3fc0 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000b"),
            Error::Marker {
                marker: 0x21,
                offset: 8,
            },
        );
    }

    #[test]
    fn date() {
        test(
            &hex!("62706c6973743030 33 c1cd278fe0000000 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000011"),
            Value::Date(Utc.with_ymd_and_hms(1970, 1, 1, 12, 0, 0).unwrap()),
        );
        test(
            &hex!("62706c6973743030 33 c1e9fc3af0e00000 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000011"),
            Value::Date(Utc.with_ymd_and_hms(1890, 6, 25, 6, 45, 13).unwrap()),
        );
        test(
            &hex!("62706c6973743030 33 41c1b835e1800000 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000011"),
            Value::Date(Utc.with_ymd_and_hms(2019, 11, 4, 14, 22, 59).unwrap()),
        );
        test_err(
            &hex!("62706c6973743030 32 00000000 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000d"),
            Error::Marker {
                marker: 0x32,
                offset: 8,
            },
        );
    }

    #[test]
    fn string() {
        test(
            &hex!("62706c6973743030 50 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            vs(""),
        );
        test(
            &hex!("62706c6973743030 51 20 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            vs(" "),
        );
        test(
            &hex!("62706c6973743030 61 0100 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000b"),
            vs("\u{0100}"),
        );
        test(
            &hex!("62706c6973743030 62 0100 0101 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000d"),
            vs("\u{0100}\u{0101}"),
        );
        // Surrogate pair.
        test(
            &hex!("62706c6973743030 62 d83d de00 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000d"),
            vs("\u{1f600}"),
        );

        test_err(
            &hex!("62706c6973743030 51 80 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            Error::InvalidString { encoding: "ascii" },
        );
        test_err(
            &hex!("62706c6973743030 61 d83d 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000b"),
            Error::InvalidString { encoding: "utf-16" },
        );
    }

    #[test]
    fn long_string() {
        let text = "The dog jumped over the moon";
        let mut body = hex!("5f 10 1c").to_vec();
        body.extend_from_slice(text.as_bytes());
        test(&single_object(&body), vs(text));
    }

    #[test]
    fn data() {
        for len in [0usize, 1, 2, 14, 15, 16, 100, 1000] {
            let data = make_data(len);
            let mut body = Vec::new();
            if len < 15 {
                body.push(0x40 | len as u8);
            } else if len < 256 {
                body.extend_from_slice(&[0x4f, 0x10, len as u8]);
            } else {
                body.extend_from_slice(&[0x4f, 0x11]);
                body.extend_from_slice(&(len as u16).to_be_bytes());
            }
            body.extend_from_slice(&data);
            test(&single_object(&body), Value::Data(data));
        }
    }

    #[test]
    fn size_follows() {
        // The size must be an integer record.
        test_err(
            &hex!("62706c6973743030 4f 20 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            Error::Marker {
                marker: 0x20,
                offset: 9,
            },
        );
        test_err(
            &hex!("62706c6973743030 4f 10 ff 00 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000c"),
            Error::Incomplete {
                offset: 11,
                size: 255,
            },
        );
    }

    #[test]
    fn empty_containers() {
        test(
            &hex!("62706c6973743030 a0 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            va([]),
        );
        test(
            &hex!("62706c6973743030 d0 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            vd([]),
        );
    }

    #[test]
    fn array() {
        // [1, "a", 1] with the repeated integer shared.
        test(
            &hex!(
                "62706c6973743030"
                "a3 01 02 01"
                "10 01"
                "51 61"
                "08 0c 0e"
                "000000000000 0101 0000000000000003 0000000000000000 0000000000000010"
            ),
            va([vi(1), vs("a"), vi(1)]),
        );
    }

    #[test]
    fn dictionary() {
        // {"a": 1, "b": "a"} with the key and the value sharing one object.
        test(
            &hex!(
                "62706c6973743030"
                "d2 01 02 03 01"
                "51 61"
                "51 62"
                "10 01"
                "08 0d 0f 11"
                "000000000000 0101 0000000000000004 0000000000000000 0000000000000013"
            ),
            vd([("a", vi(1)), ("b", vs("a"))]),
        );
        test_err(
            &hex!(
                "62706c6973743030"
                "d1 01 01"
                "10 01"
                "08 0b"
                "000000000000 0101 0000000000000002 0000000000000000 000000000000000d"
            ),
            Error::KeyType { kind: "integer" },
        );
    }

    #[test]
    fn filled_fixtures() {
        test(FILLED_ARRAY, filled_array());
        test(FILLED_DICT, filled_dict());
    }

    #[test]
    fn cycle() {
        // An array that contains itself.
        test_err(
            &hex!("62706c6973743030 a1 00 08 000000000000 0101 0000000000000001 0000000000000000 000000000000000a"),
            Error::Cycle { id: 0 },
        );
        // Two arrays that contain each other.
        test_err(
            &hex!(
                "62706c6973743030"
                "a1 01"
                "a1 00"
                "08 0a"
                "000000000000 0101 0000000000000002 0000000000000000 000000000000000c"
            ),
            Error::Cycle { id: 0 },
        );
        assert_eq!(Error::Cycle { id: 0 }.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn shared_reference() {
        // A DAG: both elements refer to the same array.
        test(
            &hex!(
                "62706c6973743030"
                "a2 01 01"
                "a0"
                "08 0b"
                "000000000000 0101 0000000000000002 0000000000000000 000000000000000c"
            ),
            va([va([]), va([])]),
        );
    }

    // Object `i` is an array that refers twice to object `i + 1`; the last object is empty.
    fn doubling_chain(n: usize) -> Vec<u8> {
        let mut testdata = b"bplist00".to_vec();
        let mut offsets = Vec::new();
        for i in 1..=n {
            offsets.push(testdata.len() as u8);
            testdata.extend_from_slice(&[0xa2, i as u8, i as u8]);
        }
        offsets.push(testdata.len() as u8);
        testdata.push(0xa0);
        let table_offset = testdata.len() as u64;
        testdata.extend_from_slice(&offsets);
        testdata.extend_from_slice(&hex!("000000000000 0101"));
        testdata.extend_from_slice(&(n as u64 + 1).to_be_bytes());
        testdata.extend_from_slice(&0u64.to_be_bytes());
        testdata.extend_from_slice(&table_offset.to_be_bytes());
        testdata
    }

    #[test]
    fn expansion() {
        let expect = (0..4).fold(va([]), |value, _| va([value.clone(), value]));
        test(&doubling_chain(4), expect);

        // Expands to 2^61 - 1 arrays.
        let testdata = doubling_chain(60);
        let error = from_slice(&testdata).unwrap_err();
        assert_eq!(
            error,
            Error::Expansion {
                size: testdata.len(),
            },
        );
        assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn unsupported_marker() {
        test_err(
            &hex!("62706c6973743030 70 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            Error::Marker {
                marker: 0x70,
                offset: 8,
            },
        );
        test_err(
            &hex!("62706c6973743030 00 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000009"),
            Error::Marker {
                marker: 0x00,
                offset: 8,
            },
        );
        test_err(
            &hex!("62706c6973743030 14 00000000000000000000000000000001 08 000000000000 0101 0000000000000001 0000000000000000 0000000000000019"),
            Error::Marker {
                marker: 0x14,
                offset: 8,
            },
        );
    }

    #[test]
    fn depth() {
        let n = MAX_DEPTH + 1;
        let mut testdata = b"bplist00".to_vec();
        let mut offsets = Vec::new();
        for id in 0..n {
            offsets.push(testdata.len() as u64);
            if id + 1 < n {
                testdata.push(0xa1);
                testdata.extend_from_slice(&((id + 1) as u16).to_be_bytes());
            } else {
                testdata.push(0xa0);
            }
        }
        let table_offset = testdata.len() as u64;
        for offset in offsets {
            testdata.extend_from_slice(&(offset as u16).to_be_bytes());
        }
        testdata.extend_from_slice(&hex!("000000000000 0202"));
        testdata.extend_from_slice(&(n as u64).to_be_bytes());
        testdata.extend_from_slice(&0u64.to_be_bytes());
        testdata.extend_from_slice(&table_offset.to_be_bytes());
        test_err(&testdata, Error::Depth { depth: MAX_DEPTH });
    }
}
