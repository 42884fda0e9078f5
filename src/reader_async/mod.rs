//! Async mirror of the file reader.
//!
//! Parsing logic is shared with the sync reader; only the I/O points differ.
//! Every method checks the cancellation token before touching the store, so a
//! cancelled token surfaces at the next suspension point and never later.

use std::collections::HashSet;

use crate::error::{MalformedError, TiffError, TiffResult};
use crate::io::{AsyncContentSource, ByteOrder, CancellationToken};
use crate::reader::{locate_payload, parse_entries, DecodeValue, PayloadLocation, RawEntry};
use crate::reader::ReadOptions;
use crate::value::ValueCollection;
use crate::tags::Tag;
use crate::TiffMode;

/// Async reader for one TIFF file over a positioned async source.
#[derive(Debug)]
pub struct AsyncTiffFileReader<S> {
    source: S,
    byte_order: ByteOrder,
    mode: TiffMode,
    first_ifd_offset: u64,
    options: ReadOptions,
    closed: bool,
}

impl<S: AsyncContentSource> AsyncTiffFileReader<S> {
    pub async fn open(source: S, token: &CancellationToken) -> TiffResult<Self> {
        Self::open_with_options(source, ReadOptions::default(), token).await
    }

    pub async fn open_with_options(
        mut source: S,
        options: ReadOptions,
        token: &CancellationToken,
    ) -> TiffResult<Self> {
        token.check()?;
        let mut header = [0u8; 16];
        let got = source.read_at(0, &mut header).await?;
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

    pub fn first_ifd_offset(&self) -> u64 {
        self.first_ifd_offset
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.closed {
            Err(TiffError::Disposed)
        } else {
            Ok(())
        }
    }

    pub async fn first_ifd(
        &mut self,
        token: &CancellationToken,
    ) -> TiffResult<AsyncIfdReader<'_, S>> {
        let offset = self.first_ifd_offset;
        self.ifd(offset, token).await
    }

    pub async fn ifd(
        &mut self,
        offset: u64,
        token: &CancellationToken,
    ) -> TiffResult<AsyncIfdReader<'_, S>> {
        self.check_open()?;
        if offset == 0 {
            return Err(TiffError::Malformed(MalformedError::ZeroIfdOffset));
        }

        let count = self.read_entry_count(offset, token).await?;
        let body_len = count * self.mode.entry_len() as u64 + self.mode.offset_len() as u64;
        let mut body = vec![0u8; usize::try_from(body_len)?];
        token.check()?;
        self.source
            .read_exact_at(offset + self.mode.count_len() as u64, &mut body)
            .await?;

        let (entries, next_ifd) =
            parse_entries(&body, count, self.mode, self.byte_order, &self.options)?;
        Ok(AsyncIfdReader {
            file: self,
            offset,
            entries,
            next_ifd,
        })
    }

    async fn read_entry_count(
        &mut self,
        offset: u64,
        token: &CancellationToken,
    ) -> TiffResult<u64> {
        token.check()?;
        let mut raw = [0u8; 8];
        let count_len = self.mode.count_len();
        self.source
            .read_exact_at(offset, &mut raw[..count_len])
            .await?;
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

    /// Walks the next-IFD chain, failing on a revisited offset.
    pub async fn chain_offsets(&mut self, token: &CancellationToken) -> TiffResult<Vec<u64>> {
        self.check_open()?;
        let mut seen = HashSet::new();
        let mut offsets = Vec::new();
        let mut offset = self.first_ifd_offset;

        while offset != 0 {
            if !seen.insert(offset) {
                return Err(TiffError::Malformed(MalformedError::IfdCycle { offset }));
            }
            offsets.push(offset);

            let count = self.read_entry_count(offset, token).await?;
            let pointer_pos =
                offset + self.mode.count_len() as u64 + count * self.mode.entry_len() as u64;
            let mut raw = [0u8; 8];
            let offset_len = self.mode.offset_len();
            token.check()?;
            self.source
                .read_exact_at(pointer_pos, &mut raw[..offset_len])
                .await?;
            offset = match self.mode {
                TiffMode::Classic => u64::from(self.byte_order.get_u32(&raw[..4])),
                TiffMode::Big => self.byte_order.get_u64(&raw),
            };
        }
        Ok(offsets)
    }

    /// Releases the backing store. Idempotent.
    pub async fn close(&mut self) -> TiffResult<()> {
        if !self.closed {
            self.source.close().await?;
            self.closed = true;
        }
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Async twin of the sync `IfdReader`.
pub struct AsyncIfdReader<'a, S> {
    file: &'a mut AsyncTiffFileReader<S>,
    offset: u64,
    entries: Vec<RawEntry>,
    next_ifd: u64,
}

impl<'a, S: AsyncContentSource> AsyncIfdReader<'a, S> {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn next_ifd(&self) -> Option<u64> {
        (self.next_ifd != 0).then_some(self.next_ifd)
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn find(&self, tag: Tag) -> Option<&RawEntry> {
        let id = tag.to_u16();
        self.entries
            .binary_search_by_key(&id, |entry| entry.tag)
            .ok()
            .map(|index| &self.entries[index])
    }

    pub async fn read_values<T: DecodeValue>(
        &mut self,
        tag: Tag,
        token: &CancellationToken,
    ) -> TiffResult<ValueCollection<T>> {
        let limit = self.file.options.value_size_limit;
        self.read_values_limited(tag, limit, token).await
    }

    pub async fn read_values_limited<T: DecodeValue>(
        &mut self,
        tag: Tag,
        size_limit: u64,
        token: &CancellationToken,
    ) -> TiffResult<ValueCollection<T>> {
        let entry = *self
            .find(tag)
            .ok_or(TiffError::NotFound { tag: tag.to_u16() })?;
        let mode = self.file.mode;
        let order = self.file.byte_order;

        match locate_payload::<T>(&entry, mode, order, size_limit)? {
            PayloadLocation::Inline { len } => {
                T::decode(&entry.inline_bytes(mode)[..len], entry.count, order)
            }
            PayloadLocation::OutOfLine(region) => {
                token.check()?;
                let mut payload = vec![0u8; region.length as usize];
                self.file
                    .source
                    .read_exact_at(region.offset, &mut payload)
                    .await?;
                T::decode(&payload, entry.count, order)
            }
        }
    }
}
