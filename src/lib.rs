//! Streaming two-directional codec for TIFF and BigTIFF files.
//!
//! TIFF organises a file as a header followed by a chain of Image File
//! Directories (IFDs); each directory entry either carries a small inline
//! value or points at an out-of-line blob. This crate covers three layers:
//!
//! * the directory/value codec ([`reader`], [`writer`]) with byte-order,
//!   alignment and inline-vs-pointer packing for both classic TIFF and the
//!   64-bit BigTIFF variant,
//! * a forward-only file writer that patches next-IFD pointers after the
//!   fact and detects retroactive BigTIFF promotion,
//! * a middleware [`decode`] pipeline turning uncompressed sample bytes into
//!   typed pixel buffers via photometric interpreters.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

pub mod decode;
mod error;
pub mod io;
mod pixel;
pub mod reader;
pub mod reader_async;
pub mod tags;
mod value;
pub mod writer;

pub use self::error::{MalformedError, TiffError, TiffResult, UnsupportedError};
pub use self::pixel::{PixelBuffer, RowSpan};
pub use self::value::{Rational, SRational, ValueCollection};

/// Classic or 64-bit file layout.
///
/// Classic: 16-bit entry counts, 32-bit offsets, 12-byte entries, 8-byte
/// header. Big: 64-bit counts, 64-bit offsets, 20-byte entries, 16-byte
/// header. A writer's mode is fixed at creation; a classic file that outgrows
/// 32-bit offsets fails at header flush.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TiffMode {
    Classic,
    Big,
}

impl TiffMode {
    /// Header size in bytes; also the writer's initial position.
    pub fn header_len(self) -> u64 {
        match self {
            TiffMode::Classic => 8,
            TiffMode::Big => 16,
        }
    }

    /// Version magic stored after the byte-order marker.
    pub fn magic(self) -> u16 {
        match self {
            TiffMode::Classic => 42,
            TiffMode::Big => 43,
        }
    }

    /// Bytes available for an entry's inline value.
    pub fn inline_cap(self) -> usize {
        match self {
            TiffMode::Classic => 4,
            TiffMode::Big => 8,
        }
    }

    /// Size of the entry-count field preceding a directory.
    pub fn count_len(self) -> usize {
        match self {
            TiffMode::Classic => 2,
            TiffMode::Big => 8,
        }
    }

    /// Fixed size of one directory entry.
    pub fn entry_len(self) -> usize {
        match self {
            TiffMode::Classic => 12,
            TiffMode::Big => 20,
        }
    }

    /// Width of offset fields (first-IFD and next-IFD pointers).
    pub fn offset_len(self) -> usize {
        match self {
            TiffMode::Classic => 4,
            TiffMode::Big => 8,
        }
    }
}
