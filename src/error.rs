use std::error::Error;
use std::fmt;
use std::io;
use std::str;
use std::string;

use crate::tags::FieldType;

/// Tiff error kinds.
#[derive(Debug)]
#[non_exhaustive]
pub enum TiffError {
    /// The file is not structured the way the format requires.
    Malformed(MalformedError),

    /// The backing store ended before the requested bytes.
    Truncated,

    /// The operation or value is not supported by this codec.
    Unsupported(UnsupportedError),

    /// A tag is present but holds a different field type than requested.
    TypeMismatch {
        tag: u16,
        requested: FieldType,
        actual: FieldType,
    },

    /// The requested tag is absent from the directory.
    NotFound { tag: u16 },

    /// A caller-supplied or configured size cap was exceeded.
    SizeLimitExceeded { needed: u64, limit: u64 },

    /// The writer emitted an offset beyond 32 bits while in classic mode.
    BigTiffRequired,

    /// The reader or writer was used after being closed.
    Disposed,

    /// The writer was used after its header was flushed.
    Completed,

    /// The operation observed a cancelled token.
    Cancelled,

    /// A pixel buffer row outside the buffer was requested.
    OutOfRange { row: u32, rows: u32 },

    /// An I/O error surfaced from the backing store.
    Io(io::Error),
}

/// The file is not formatted properly.
///
/// This indicates either a corrupted input or a producer that violates the
/// format. The list of variants may grow; matching against it exhaustively is
/// not covered by interface stability guarantees.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MalformedError {
    SignatureNotFound,
    InvalidByteOrder(u16),
    InvalidBigTiffConstants { offset_size: u16, reserved: u16 },
    ZeroIfdOffset,
    EntryCountOutOfBounds { count: u64, bound: u64 },
    NonMonotoneTagOrder { tag: u16 },
    DuplicateTag(u16),
    IfdCycle { offset: u64 },
    PayloadSizeOverflow,
    InvalidAscii,
    InvalidColorMap { expected: usize, actual: usize },
    MissingUncompressedData,
}

impl fmt::Display for MalformedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::MalformedError::*;
        match *self {
            SignatureNotFound => write!(fmt, "TIFF signature not found."),
            InvalidByteOrder(marker) => {
                write!(fmt, "Invalid byte order marker {:#06x}.", marker)
            }
            InvalidBigTiffConstants {
                offset_size,
                reserved,
            } => write!(
                fmt,
                "Invalid BigTIFF header constants: offset size {}, reserved {}.",
                offset_size, reserved
            ),
            ZeroIfdOffset => write!(fmt, "Offset zero is not a valid IFD location."),
            EntryCountOutOfBounds { count, bound } => write!(
                fmt,
                "IFD entry count {} exceeds the configured bound {}.",
                count, bound
            ),
            NonMonotoneTagOrder { tag } => write!(
                fmt,
                "IFD entries are not in ascending tag order at tag {}.",
                tag
            ),
            DuplicateTag(tag) => write!(fmt, "Tag {} occurs more than once in one IFD.", tag),
            IfdCycle { offset } => write!(fmt, "The IFD chain revisits offset {}.", offset),
            PayloadSizeOverflow => write!(fmt, "Entry payload size overflows 64 bits."),
            InvalidAscii => write!(fmt, "ASCII payload contains ill-formed data."),
            InvalidColorMap { expected, actual } => write!(
                fmt,
                "ColorMap holds {} values, expected {}.",
                actual, expected
            ),
            MissingUncompressedData => write!(
                fmt,
                "Decode context holds no uncompressed data; a data middleware must run first."
            ),
        }
    }
}

/// The codec does not support the requested feature or value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UnsupportedError {
    UnknownFieldType(u16),
    SyncAccessToAsyncStore,
    BitDepth(u8),
    Subsampling(u16, u16),
    PixelFormat(&'static str),
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::UnsupportedError::*;
        match *self {
            UnknownFieldType(code) => write!(fmt, "Unknown field type code {}.", code),
            SyncAccessToAsyncStore => write!(
                fmt,
                "Synchronous access to an async-only backing store is not supported."
            ),
            BitDepth(bits) => write!(fmt, "{} bits per sample is unsupported here.", bits),
            Subsampling(h, v) => write!(fmt, "Chroma subsampling {}x{} is unsupported.", h, v),
            PixelFormat(requested) => write!(
                fmt,
                "The decode target does not hold {} samples.",
                requested
            ),
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TiffError::Malformed(ref e) => write!(fmt, "Format error: {}", e),
            TiffError::Truncated => write!(fmt, "The file ended before the requested bytes."),
            TiffError::Unsupported(ref e) => write!(fmt, "Unsupported: {}", e),
            TiffError::TypeMismatch {
                tag,
                requested,
                actual,
            } => write!(
                fmt,
                "Tag {} holds {:?}, but {:?} was requested.",
                tag, actual, requested
            ),
            TiffError::NotFound { tag } => write!(fmt, "Tag {} not found.", tag),
            TiffError::SizeLimitExceeded { needed, limit } => write!(
                fmt,
                "Value of {} bytes exceeds the size limit of {} bytes.",
                needed, limit
            ),
            TiffError::BigTiffRequired => write!(
                fmt,
                "The file grew beyond 4 GiB; it must be written as BigTIFF."
            ),
            TiffError::Disposed => write!(fmt, "The reader or writer has been closed."),
            TiffError::Completed => write!(fmt, "The writer has already flushed its header."),
            TiffError::Cancelled => write!(fmt, "The operation was cancelled."),
            TiffError::OutOfRange { row, rows } => {
                write!(fmt, "Row {} requested from a buffer of {} rows.", row, rows)
            }
            TiffError::Io(ref e) => e.fmt(fmt),
        }
    }
}

impl Error for TiffError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TiffError::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(err: io::Error) -> TiffError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => TiffError::Truncated,
            _ => TiffError::Io(err),
        }
    }
}

impl From<MalformedError> for TiffError {
    fn from(err: MalformedError) -> TiffError {
        TiffError::Malformed(err)
    }
}

impl From<UnsupportedError> for TiffError {
    fn from(err: UnsupportedError) -> TiffError {
        TiffError::Unsupported(err)
    }
}

impl From<str::Utf8Error> for TiffError {
    fn from(_err: str::Utf8Error) -> TiffError {
        TiffError::Malformed(MalformedError::InvalidAscii)
    }
}

impl From<string::FromUtf8Error> for TiffError {
    fn from(_err: string::FromUtf8Error) -> TiffError {
        TiffError::Malformed(MalformedError::InvalidAscii)
    }
}

impl From<std::num::TryFromIntError> for TiffError {
    fn from(_err: std::num::TryFromIntError) -> TiffError {
        TiffError::Malformed(MalformedError::PayloadSizeOverflow)
    }
}

/// Result of a decoding/encoding operation.
pub type TiffResult<T> = Result<T, TiffError>;
