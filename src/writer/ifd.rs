//! Directory builder.
//!
//! Entries are collected in a map keyed by tag id, which both deduplicates
//! (last add wins) and yields the ascending order the format demands. Commit
//! is two-pass: out-of-line payloads first, then the entry array, so every
//! entry references an already-written offset and nothing needs buffering
//! beyond the pending map.

use std::collections::BTreeMap;

use crate::error::{TiffError, TiffResult};
use crate::io::{ContentSink, ContentSource};
use crate::tags::{FieldType, Tag};
use crate::writer::{marshal, TiffFileWriter, TiffValue};
use crate::TiffMode;

struct PendingEntry {
    field_type: FieldType,
    count: u64,
    payload: Vec<u8>,
}

/// Builder for one IFD, bound to its parent [`TiffFileWriter`].
///
/// Dropping the builder without [`commit`](IfdWriter::commit) discards the
/// pending entries; nothing has been written for them yet.
pub struct IfdWriter<'a, S> {
    writer: &'a mut TiffFileWriter<S>,
    previous: Option<u64>,
    entries: BTreeMap<u16, PendingEntry>,
}

impl<'a, S: ContentSource + ContentSink> IfdWriter<'a, S> {
    pub(super) fn new(writer: &'a mut TiffFileWriter<S>, previous: Option<u64>) -> Self {
        Self {
            writer,
            previous,
            entries: BTreeMap::new(),
        }
    }

    /// Buffers one entry. Adding the same tag again replaces the earlier
    /// value.
    pub fn add_entry<V: TiffValue + ?Sized>(&mut self, tag: Tag, value: &V) -> TiffResult<()> {
        let payload = marshal(value, self.writer.byte_order())?;
        self.entries.insert(
            tag.to_u16(),
            PendingEntry {
                field_type: V::FIELD_TYPE,
                count: value.count(),
                payload,
            },
        );
        Ok(())
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag.to_u16())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the directory and links it into the file.
    ///
    /// Out-of-line payloads go first, each word-aligned; then the entry
    /// array with a zero next-IFD pointer; finally the previous IFD (or the
    /// header) is pointed at the new directory. Returns the IFD's offset.
    pub fn commit(mut self) -> TiffResult<u64> {
        let mode = self.writer.mode();
        let order = self.writer.byte_order();
        let inline_cap = mode.inline_cap();

        if mode == TiffMode::Classic && self.entries.len() > usize::from(u16::MAX) {
            return Err(TiffError::SizeLimitExceeded {
                needed: self.entries.len() as u64,
                limit: u64::from(u16::MAX),
            });
        }

        // Pass 1: spill payloads that do not fit inline, replacing each with
        // the offset of its blob.
        for entry in self.entries.values_mut() {
            if entry.payload.len() > inline_cap {
                let region = self.writer.write_aligned_bytes(&entry.payload)?;
                let mut pointer = Vec::with_capacity(inline_cap);
                match mode {
                    TiffMode::Classic => order.put_u32(&mut pointer, region.offset as u32),
                    TiffMode::Big => order.put_u64(&mut pointer, region.offset),
                }
                entry.payload = pointer;
            } else {
                entry.payload.resize(inline_cap, 0);
            }
        }

        // Pass 2: the directory itself.
        let ifd_offset = self.writer.align_to_word()?;

        match mode {
            TiffMode::Classic => self.writer.write_u16(self.entries.len() as u16)?,
            TiffMode::Big => self.writer.write_u64(self.entries.len() as u64)?,
        }

        for (tag, entry) in &self.entries {
            self.writer.write_u16(*tag)?;
            self.writer.write_u16(entry.field_type.to_u16())?;
            match mode {
                TiffMode::Classic => self.writer.write_u32(u32::try_from(entry.count)?)?,
                TiffMode::Big => self.writer.write_u64(entry.count)?,
            }
            self.writer.write_bytes(&entry.payload)?;
        }

        self.writer.write_offset_field(0)?;

        match self.previous {
            Some(prev) => self.writer.update_next_ifd_pointer(prev, ifd_offset)?,
            None => self.writer.set_first_ifd_offset(ifd_offset),
        }

        Ok(ifd_offset)
    }
}
