//! File-level reading: header parsing and IFD chain traversal.

use std::collections::HashSet;

use log::debug;

use crate::error::{MalformedError, TiffError, TiffResult};
use crate::io::{ByteOrder, ContentSource};
use crate::TiffMode;

mod decode_value;
mod ifd;

pub use self::decode_value::DecodeValue;
pub use self::ifd::{IfdReader, RawEntry};

pub(crate) use self::ifd::{locate_payload, parse_entries, PayloadLocation};

/// How forgiving the reader is about real-world format violations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Resort non-monotone directories with a warning.
    #[default]
    Lenient,
    /// Fail on any ordering violation.
    Strict,
}

/// Knobs for directory enumeration and value resolution.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    pub strictness: Strictness,
    /// Upper bound on the entry count of a single IFD.
    pub max_entry_count: u64,
    /// Default cap on one resolved value payload, in bytes.
    pub value_size_limit: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            max_entry_count: 65535,
            value_size_limit: 1024 * 1024,
        }
    }
}

/// Reader for one TIFF file over a positioned source.
///
/// Owns its backing store; [`close`](Self::close) releases it and
/// [`into_inner`](Self::into_inner) hands it back untouched.
#[derive(Debug)]
pub struct TiffFileReader<S> {
    source: S,
    byte_order: ByteOrder,
    mode: TiffMode,
    first_ifd_offset: u64,
    options: ReadOptions,
    closed: bool,
}

impl<S: ContentSource> TiffFileReader<S> {
    pub fn open(source: S) -> TiffResult<Self> {
        Self::open_with_options(source, ReadOptions::default())
    }

    pub fn open_with_options(mut source: S, options: ReadOptions) -> TiffResult<Self> {
        let mut header = [0u8; 16];
        let got = source.read_at(0, &mut header)?;
        if got < 8 {
            return Err(TiffError::Malformed(MalformedError::SignatureNotFound));
        }

        let byte_order = ByteOrder::from_header([header[0], header[1]])?;
        let magic = byte_order.get_u16(&header[2..4]);
        let (mode, first_ifd_offset) = match magic {
            42 => (
                TiffMode::Classic,
                u64::from(byte_order.get_u32(&header[4..8])),
            ),
            43 => {
                if got < 16 {
                    return Err(TiffError::Truncated);
                }
                let offset_size = byte_order.get_u16(&header[4..6]);
                let reserved = byte_order.get_u16(&header[6..8]);
                if offset_size != 8 || reserved != 0 {
                    return Err(TiffError::Malformed(
                        MalformedError::InvalidBigTiffConstants {
                            offset_size,
                            reserved,
                        },
                    ));
                }
                (TiffMode::Big, byte_order.get_u64(&header[8..16]))
            }
            _ => return Err(TiffError::Malformed(MalformedError::SignatureNotFound)),
        };

        debug!(
            "opened {:?} file, {:?}, first IFD at {}",
            mode, byte_order, first_ifd_offset
        );

        Ok(Self {
            source,
            byte_order,
            mode,
            first_ifd_offset,
            options,
            closed: false,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn mode(&self) -> TiffMode {
        self.mode
    }

    /// The header's first-IFD offset; zero means an empty chain.
    pub fn first_ifd_offset(&self) -> u64 {
        self.first_ifd_offset
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.closed {
            Err(TiffError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Reads the directory at the header's first-IFD offset.
    pub fn first_ifd(&mut self) -> TiffResult<IfdReader<'_, S>> {
        let offset = self.first_ifd_offset;
        self.ifd(offset)
    }

    /// Reads the directory at `offset`; any valid offset is accepted,
    /// including sub-IFDs linked from IFD-typed tags.
    pub fn ifd(&mut self, offset: u64) -> TiffResult<IfdReader<'_, S>> {
        self.check_open()?;
        let (entries, next_ifd) = self.read_ifd_raw(offset)?;
        Ok(IfdReader::new(self, offset, entries, next_ifd))
    }

    fn read_ifd_raw(&mut self, offset: u64) -> TiffResult<(Vec<RawEntry>, u64)> {
        if offset == 0 {
            return Err(TiffError::Malformed(MalformedError::ZeroIfdOffset));
        }

        let count = self.read_entry_count(offset)?;
        let body_len = count * self.mode.entry_len() as u64 + self.mode.offset_len() as u64;
        let mut body = vec![0u8; usize::try_from(body_len)?];
        self.source
            .read_exact_at(offset + self.mode.count_len() as u64, &mut body)?;

        parse_entries(&body, count, self.mode, self.byte_order, &self.options)
    }

    fn read_entry_count(&mut self, offset: u64) -> TiffResult<u64> {
        let mut raw = [0u8; 8];
        let count_len = self.mode.count_len();
        self.source.read_exact_at(offset, &mut raw[..count_len])?;
        let count = match self.mode {
            TiffMode::Classic => u64::from(self.byte_order.get_u16(&raw[..2])),
            TiffMode::Big => self.byte_order.get_u64(&raw),
        };
        if count > self.options.max_entry_count {
            return Err(TiffError::Malformed(MalformedError::EntryCountOutOfBounds {
                count,
                bound: self.options.max_entry_count,
            }));
        }
        Ok(count)
    }

    /// Walks the next-IFD chain from the header, returning each directory
    /// offset in order. A revisited offset is a cycle and fails.
    pub fn chain_offsets(&mut self) -> TiffResult<Vec<u64>> {
        self.check_open()?;
        let mut seen = HashSet::new();
        let mut offsets = Vec::new();
        let mut offset = self.first_ifd_offset;

        while offset != 0 {
            if !seen.insert(offset) {
                return Err(TiffError::Malformed(MalformedError::IfdCycle { offset }));
            }
            offsets.push(offset);

            let count = self.read_entry_count(offset)?;
            let pointer_pos =
                offset + self.mode.count_len() as u64 + count * self.mode.entry_len() as u64;
            let mut raw = [0u8; 8];
            let offset_len = self.mode.offset_len();
            self.source
                .read_exact_at(pointer_pos, &mut raw[..offset_len])?;
            offset = match self.mode {
                TiffMode::Classic => u64::from(self.byte_order.get_u32(&raw[..4])),
                TiffMode::Big => self.byte_order.get_u64(&raw),
            };
        }
        Ok(offsets)
    }

    /// Releases the backing store. Idempotent.
    pub fn close(&mut self) -> TiffResult<()> {
        if !self.closed {
            self.source.close()?;
            self.closed = true;
        }
        Ok(())
    }

    /// Returns the backing store without closing it.
    pub fn into_inner(self) -> S {
        self.source
    }
}
