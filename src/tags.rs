//! Tag and field-type enumerations shared by the reader and writer.

macro_rules! tags {
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident {
            $( $(#[$ident_attr:meta])* $tag:ident = $val:expr, )*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        $vis enum $name {
            $( $(#[$ident_attr])* $tag, )*
            /// A private or extension value not named above.
            Unknown(u16),
        }

        impl $name {
            #[inline(always)]
            pub const fn from_u16(val: u16) -> Self {
                match val {
                    $( $val => $name::$tag, )*
                    other => $name::Unknown(other),
                }
            }

            #[inline(always)]
            pub const fn to_u16(self) -> u16 {
                match self {
                    $( $name::$tag => $val, )*
                    $name::Unknown(other) => other,
                }
            }
        }

        impl From<$name> for u16 {
            fn from(val: $name) -> u16 {
                val.to_u16()
            }
        }
    };
}

tags! {
/// The baseline and extension tags this codec itself consumes.
///
/// Anything else travels through [`Tag::Unknown`]; the reader and writer
/// treat all tags uniformly by their 16-bit id.
pub enum Tag {
    ImageWidth = 256,
    ImageLength = 257,
    BitsPerSample = 258,
    Compression = 259,
    PhotometricInterpretation = 262,
    ImageDescription = 270,
    StripOffsets = 273,
    SamplesPerPixel = 277,
    RowsPerStrip = 278,
    StripByteCounts = 279,
    XResolution = 282,
    YResolution = 283,
    ResolutionUnit = 296,
    Software = 305,
    DateTime = 306,
    Artist = 315,
    ColorMap = 320,
    TileWidth = 322,
    TileLength = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SubIfd = 330,
    SampleFormat = 339,
    YCbCrCoefficients = 529,
    YCbCrSubSampling = 530,
    Copyright = 33432,
}
}

tags! {
/// The photometric models of tag 262.
pub enum PhotometricModel {
    WhiteIsZero = 0,
    BlackIsZero = 1,
    Rgb = 2,
    Paletted = 3,
    TransparencyMask = 4,
    Cmyk = 5,
    YCbCr = 6,
}
}

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum FieldType {
    /// 8-bit unsigned integer
    Byte = 1,
    /// 7-bit ASCII code bytes; NUL-terminated per string
    Ascii = 2,
    /// 16-bit unsigned integer
    Short = 3,
    /// 32-bit unsigned integer
    Long = 4,
    /// Fraction stored as two 32-bit unsigned integers
    Rational = 5,
    /// 8-bit signed integer
    SByte = 6,
    /// 8-bit byte of field-dependent meaning
    Undefined = 7,
    /// 16-bit signed integer
    SShort = 8,
    /// 32-bit signed integer
    SLong = 9,
    /// Fraction stored as two 32-bit signed integers
    SRational = 10,
    /// 32-bit IEEE floating point
    Float = 11,
    /// 64-bit IEEE floating point
    Double = 12,
    /// 32-bit unsigned IFD offset
    Ifd = 13,
    /// BigTIFF 64-bit unsigned integer
    Long8 = 16,
    /// BigTIFF 64-bit signed integer
    SLong8 = 17,
    /// BigTIFF 64-bit unsigned IFD offset
    Ifd8 = 18,
}
}

impl FieldType {
    /// Fixed width of one element, or `None` for type codes this codec does
    /// not know. Unknown entries are still enumerable; only typed reads need
    /// the width.
    pub fn byte_len(self) -> Option<u8> {
        Some(match self {
            FieldType::Byte | FieldType::SByte | FieldType::Ascii | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
            FieldType::Unknown(_) => return None,
        })
    }
}

/// Identifies the offset of an IFD.
///
/// Stored as a 32-bit value ([`FieldType::Ifd`]) in classic files and as a
/// 64-bit value ([`FieldType::Ifd8`]) in BigTIFF. Zero marks the end of a
/// chain and is never a valid location.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct IfdPointer(pub u64);
