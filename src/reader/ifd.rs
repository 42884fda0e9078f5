//! Directory enumeration and typed tag resolution.

use log::warn;

use crate::error::{MalformedError, TiffError, TiffResult, UnsupportedError};
use crate::io::{ByteOrder, ContentSource, EndianSlice, Region};
use crate::reader::{DecodeValue, ReadOptions, Strictness, TiffFileReader};
use crate::tags::{FieldType, Tag};
use crate::value::ValueCollection;
use crate::TiffMode;

/// One wire-level directory entry: tag id, field type, element count and the
/// raw value-or-offset bytes. Unknown field types are carried opaquely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEntry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u64,
    inline: [u8; 8],
}

impl RawEntry {
    pub(crate) fn new(tag: u16, field_type: FieldType, count: u64, inline: [u8; 8]) -> Self {
        Self {
            tag,
            field_type,
            count,
            inline,
        }
    }

    /// Total payload size in bytes, or `None` when the field type's width is
    /// unknown.
    pub fn payload_size(&self) -> Option<u64> {
        let width = self.field_type.byte_len()?;
        self.count.checked_mul(u64::from(width))
    }

    /// The raw value slot (4 meaningful bytes in classic mode, 8 in big).
    pub fn inline_bytes(&self, mode: TiffMode) -> &[u8] {
        &self.inline[..mode.inline_cap()]
    }

    /// Interprets the value slot as a payload offset.
    pub fn payload_offset(&self, mode: TiffMode, order: ByteOrder) -> u64 {
        match mode {
            TiffMode::Classic => u64::from(order.get_u32(&self.inline[..4])),
            TiffMode::Big => order.get_u64(&self.inline),
        }
    }
}

/// Where an entry's payload lives.
pub(crate) enum PayloadLocation {
    Inline { len: usize },
    OutOfLine(Region),
}

/// Applies the type and size checks of a typed read and decides where the
/// payload bytes are. Shared between the sync and async readers.
pub(crate) fn locate_payload<T: DecodeValue>(
    entry: &RawEntry,
    mode: TiffMode,
    order: ByteOrder,
    size_limit: u64,
) -> TiffResult<PayloadLocation> {
    if let FieldType::Unknown(code) = entry.field_type {
        return Err(TiffError::Unsupported(UnsupportedError::UnknownFieldType(
            code,
        )));
    }
    if !T::accepts(entry.field_type) {
        return Err(TiffError::TypeMismatch {
            tag: entry.tag,
            requested: T::FIELD_TYPES[0],
            actual: entry.field_type,
        });
    }

    let size = entry
        .payload_size()
        .ok_or(TiffError::Malformed(MalformedError::PayloadSizeOverflow))?;
    if size > size_limit {
        return Err(TiffError::SizeLimitExceeded {
            needed: size,
            limit: size_limit,
        });
    }

    if size <= mode.inline_cap() as u64 {
        Ok(PayloadLocation::Inline { len: size as usize })
    } else {
        Ok(PayloadLocation::OutOfLine(Region {
            offset: entry.payload_offset(mode, order),
            length: size,
        }))
    }
}

/// Parses the entry array and next-IFD pointer from one contiguous buffer,
/// enforcing the ordering rules. Shared between the sync and async readers.
pub(crate) fn parse_entries(
    raw: &[u8],
    count: u64,
    mode: TiffMode,
    order: ByteOrder,
    options: &ReadOptions,
) -> TiffResult<(Vec<RawEntry>, u64)> {
    let mut slice = EndianSlice::new(raw, order);
    let mut entries = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let tag = slice.read_u16()?;
        let field_type = FieldType::from_u16(slice.read_u16()?);
        let value_count = match mode {
            TiffMode::Classic => u64::from(slice.read_u32()?),
            TiffMode::Big => slice.read_u64()?,
        };
        let mut inline = [0u8; 8];
        let cap = mode.inline_cap();
        inline[..cap].copy_from_slice(slice.read_bytes(cap)?);
        entries.push(RawEntry::new(tag, field_type, value_count, inline));
    }

    let next_ifd = match mode {
        TiffMode::Classic => u64::from(slice.read_u32()?),
        TiffMode::Big => slice.read_u64()?,
    };

    let mut sorted = true;
    for pair in entries.windows(2) {
        if pair[1].tag == pair[0].tag {
            return Err(TiffError::Malformed(MalformedError::DuplicateTag(
                pair[0].tag,
            )));
        }
        if pair[1].tag < pair[0].tag {
            sorted = false;
        }
    }

    if !sorted {
        let offending = entries
            .windows(2)
            .find(|pair| pair[1].tag < pair[0].tag)
            .map(|pair| pair[1].tag)
            .unwrap_or_default();
        match options.strictness {
            Strictness::Strict => {
                return Err(TiffError::Malformed(MalformedError::NonMonotoneTagOrder {
                    tag: offending,
                }));
            }
            Strictness::Lenient => {
                warn!(
                    "IFD entries out of ascending tag order at tag {}; resorting",
                    offending
                );
                entries.sort_by_key(|entry| entry.tag);
                for pair in entries.windows(2) {
                    if pair[1].tag == pair[0].tag {
                        return Err(TiffError::Malformed(MalformedError::DuplicateTag(
                            pair[0].tag,
                        )));
                    }
                }
            }
        }
    }

    Ok((entries, next_ifd))
}

/// A parsed directory bound to its file reader for out-of-line resolution.
pub struct IfdReader<'a, S> {
    file: &'a mut TiffFileReader<S>,
    offset: u64,
    entries: Vec<RawEntry>,
    next_ifd: u64,
}

impl<'a, S: ContentSource> IfdReader<'a, S> {
    pub(crate) fn new(
        file: &'a mut TiffFileReader<S>,
        offset: u64,
        entries: Vec<RawEntry>,
        next_ifd: u64,
    ) -> Self {
        Self {
            file,
            offset,
            entries,
            next_ifd,
        }
    }

    /// The file offset this IFD was read from.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The chained directory's offset; `None` terminates the chain.
    pub fn next_ifd(&self) -> Option<u64> {
        (self.next_ifd != 0).then_some(self.next_ifd)
    }

    /// All entries in ascending tag order.
    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.find(tag).is_some()
    }

    /// Binary search by tag id.
    pub fn find(&self, tag: Tag) -> Option<&RawEntry> {
        let id = tag.to_u16();
        self.entries
            .binary_search_by_key(&id, |entry| entry.tag)
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Resolves a tag into a typed collection, honouring the configured value
    /// size limit.
    pub fn read_values<T: DecodeValue>(&mut self, tag: Tag) -> TiffResult<ValueCollection<T>> {
        let limit = self.file.options().value_size_limit;
        self.read_values_limited(tag, limit)
    }

    /// Same as [`read_values`](Self::read_values) with a caller-supplied size
    /// cap.
    pub fn read_values_limited<T: DecodeValue>(
        &mut self,
        tag: Tag,
        size_limit: u64,
    ) -> TiffResult<ValueCollection<T>> {
        let entry = *self
            .find(tag)
            .ok_or(TiffError::NotFound { tag: tag.to_u16() })?;
        let mode = self.file.mode();
        let order = self.file.byte_order();

        match locate_payload::<T>(&entry, mode, order, size_limit)? {
            PayloadLocation::Inline { len } => {
                T::decode(&entry.inline_bytes(mode)[..len], entry.count, order)
            }
            PayloadLocation::OutOfLine(region) => {
                let mut payload = vec![0u8; region.length as usize];
                self.file.source_mut().read_exact_at(region.offset, &mut payload)?;
                T::decode(&payload, entry.count, order)
            }
        }
    }
}
