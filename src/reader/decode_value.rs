use log::warn;

use crate::error::TiffResult;
use crate::io::{ByteOrder, EndianSlice};
use crate::tags::{FieldType, IfdPointer};
use crate::value::{Rational, SRational, ValueCollection};

/// Trait for types a tag payload can be decoded into; the read-side
/// counterpart of the writer's `TiffValue`.
pub trait DecodeValue: Sized {
    /// Field types this Rust type accepts. The first entry is the canonical
    /// one reported in `TypeMismatch` errors.
    const FIELD_TYPES: &'static [FieldType];

    /// Decodes `count` elements from a complete payload buffer.
    fn decode(bytes: &[u8], count: u64, order: ByteOrder) -> TiffResult<ValueCollection<Self>>;

    fn accepts(field_type: FieldType) -> bool {
        Self::FIELD_TYPES.contains(&field_type)
    }
}

fn decode_scalars<T>(
    bytes: &[u8],
    count: u64,
    order: ByteOrder,
    read: impl Fn(&mut EndianSlice) -> TiffResult<T>,
) -> TiffResult<ValueCollection<T>> {
    let count = usize::try_from(count)?;
    let mut slice = EndianSlice::new(bytes, order);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read(&mut slice)?);
    }
    Ok(ValueCollection::from_vec(values))
}

macro_rules! decode_scalar {
    ($ty:ty, [$($field_type:expr),+], $read:ident) => {
        impl DecodeValue for $ty {
            const FIELD_TYPES: &'static [FieldType] = &[$($field_type),+];

            fn decode(
                bytes: &[u8],
                count: u64,
                order: ByteOrder,
            ) -> TiffResult<ValueCollection<Self>> {
                decode_scalars(bytes, count, order, |slice| slice.$read())
            }
        }
    };
}

decode_scalar!(u8, [FieldType::Byte, FieldType::Undefined], read_u8);
decode_scalar!(i8, [FieldType::SByte], read_i8);
decode_scalar!(u16, [FieldType::Short], read_u16);
decode_scalar!(i16, [FieldType::SShort], read_i16);
decode_scalar!(u32, [FieldType::Long], read_u32);
decode_scalar!(i32, [FieldType::SLong], read_i32);
decode_scalar!(u64, [FieldType::Long8], read_u64);
decode_scalar!(i64, [FieldType::SLong8], read_i64);
decode_scalar!(f32, [FieldType::Float], read_f32);
decode_scalar!(f64, [FieldType::Double], read_f64);
decode_scalar!(Rational, [FieldType::Rational], read_rational);
decode_scalar!(SRational, [FieldType::SRational], read_srational);

/// IFD-typed values decode to their offsets; whether to traverse them is the
/// caller's choice. The plain long types are accepted because classic files
/// store directory pointers as `LONG`.
impl DecodeValue for IfdPointer {
    const FIELD_TYPES: &'static [FieldType] = &[
        FieldType::Ifd,
        FieldType::Ifd8,
        FieldType::Long,
        FieldType::Long8,
    ];

    fn decode(bytes: &[u8], count: u64, order: ByteOrder) -> TiffResult<ValueCollection<Self>> {
        // The payload length decides the element width: 8 for IFD8/LONG8,
        // 4 otherwise.
        let wide = count != 0 && bytes.len() as u64 / count == 8;
        decode_scalars(bytes, count, order, |slice| {
            if wide {
                slice.read_u64().map(IfdPointer)
            } else {
                slice.read_u32().map(|n| IfdPointer(u64::from(n)))
            }
        })
    }
}

/// ASCII payloads are a NUL-terminated concatenation; each string becomes one
/// collection element with its terminator stripped. A missing final NUL is
/// common in the wild and tolerated.
impl DecodeValue for String {
    const FIELD_TYPES: &'static [FieldType] = &[FieldType::Ascii];

    fn decode(bytes: &[u8], count: u64, _order: ByteOrder) -> TiffResult<ValueCollection<Self>> {
        let len = usize::try_from(count)?.min(bytes.len());
        let payload = &bytes[..len];

        let mut strings = Vec::new();
        let mut rest = payload;
        loop {
            match rest.iter().position(|&b| b == 0) {
                Some(nul) => {
                    strings.push(String::from_utf8(rest[..nul].to_vec())?);
                    rest = &rest[nul + 1..];
                    if rest.is_empty() {
                        break;
                    }
                }
                None => {
                    if !rest.is_empty() {
                        warn!("ASCII value is missing its final NUL terminator");
                        strings.push(String::from_utf8(rest.to_vec())?);
                    }
                    break;
                }
            }
        }
        Ok(ValueCollection::from_vec(strings))
    }
}
