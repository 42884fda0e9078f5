//! Forward-only file writer with offset and alignment bookkeeping.
//!
//! The writer emits payloads and directories as it goes and patches the
//! header and next-IFD pointers after the fact. It tracks whether any offset
//! ever left 32-bit range; a classic-mode file that did can no longer be
//! finished and fails at header flush with `BigTiffRequired`.

use log::debug;

use crate::error::{TiffError, TiffResult};
use crate::io::{ByteOrder, ContentSink, ContentSource, Region};
use crate::TiffMode;

mod ifd;
mod tiff_value;

pub use self::ifd::IfdWriter;
pub use self::tiff_value::{Ifd, Ifd8, TiffValue};

pub(crate) use self::tiff_value::marshal;

/// Positioned stream writer for one TIFF file.
///
/// Created with a fixed [`TiffMode`]; the mode decides header size, entry
/// width and the inline value cap. All multi-byte values are emitted in the
/// declared [`ByteOrder`].
#[derive(Debug)]
pub struct TiffFileWriter<S> {
    store: S,
    byte_order: ByteOrder,
    mode: TiffMode,
    position: u64,
    requires_big: bool,
    first_ifd_offset: u64,
    completed: bool,
    closed: bool,
    /// Set when the store failed mid-write; only disposal remains possible.
    poisoned: bool,
}

impl<S: ContentSource + ContentSink> TiffFileWriter<S> {
    /// Little-endian writer positioned just past the (not yet written) header.
    pub fn new(store: S, mode: TiffMode) -> Self {
        Self::with_byte_order(store, mode, ByteOrder::LittleEndian)
    }

    pub fn with_byte_order(store: S, mode: TiffMode, byte_order: ByteOrder) -> Self {
        Self {
            store,
            byte_order,
            mode,
            position: mode.header_len(),
            requires_big: false,
            first_ifd_offset: 0,
            completed: false,
            closed: false,
            poisoned: false,
        }
    }

    pub fn mode(&self) -> TiffMode {
        self.mode
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether an emitted offset has left 32-bit range.
    pub fn requires_big(&self) -> bool {
        self.requires_big
    }

    fn check_writable(&self) -> TiffResult<()> {
        if self.closed || self.poisoned {
            Err(TiffError::Disposed)
        } else if self.completed {
            Err(TiffError::Completed)
        } else {
            Ok(())
        }
    }

    fn store_write(&mut self, offset: u64, bytes: &[u8]) -> TiffResult<()> {
        if let Err(err) = self.store.write_at(offset, bytes) {
            self.poisoned = true;
            return Err(err);
        }
        Ok(())
    }

    fn advance(&mut self, n: u64) {
        self.position += n;
        if self.position > u64::from(u32::MAX) {
            self.requires_big = true;
        }
    }

    /// Moves the cursor. Permitted freely; positions between seeks only grow.
    pub fn seek(&mut self, offset: u64) -> TiffResult<()> {
        self.check_writable()?;
        self.position = offset;
        if self.position > u64::from(u32::MAX) {
            self.requires_big = true;
        }
        Ok(())
    }

    /// Pads to the next 2-byte boundary and returns the aligned position.
    /// Idempotent on even positions.
    pub fn align_to_word(&mut self) -> TiffResult<u64> {
        self.check_writable()?;
        if self.position % 2 != 0 {
            self.store_write(self.position, &[0])?;
            self.advance(1);
        }
        Ok(self.position)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> TiffResult<()> {
        self.check_writable()?;
        self.store_write(self.position, bytes)?;
        self.advance(bytes.len() as u64);
        Ok(())
    }

    /// Aligns, then writes; returns the written region.
    pub fn write_aligned_bytes(&mut self, bytes: &[u8]) -> TiffResult<Region> {
        let offset = self.align_to_word()?;
        self.write_bytes(bytes)?;
        Ok(Region {
            offset,
            length: bytes.len() as u64,
        })
    }

    /// Marshals a value in the file's byte order and writes it aligned.
    ///
    /// For ASCII this writes the NUL-terminated concatenation; the returned
    /// region length is the total byte count.
    pub fn write_aligned_values<V: TiffValue + ?Sized>(&mut self, value: &V) -> TiffResult<Region> {
        let payload = marshal(value, self.byte_order)?;
        self.write_aligned_bytes(&payload)
    }

    pub fn write_u16(&mut self, n: u16) -> TiffResult<()> {
        let mut buf = Vec::with_capacity(2);
        self.byte_order.put_u16(&mut buf, n);
        self.write_bytes(&buf)
    }

    pub fn write_u32(&mut self, n: u32) -> TiffResult<()> {
        let mut buf = Vec::with_capacity(4);
        self.byte_order.put_u32(&mut buf, n);
        self.write_bytes(&buf)
    }

    pub fn write_u64(&mut self, n: u64) -> TiffResult<()> {
        let mut buf = Vec::with_capacity(8);
        self.byte_order.put_u64(&mut buf, n);
        self.write_bytes(&buf)
    }

    /// Writes an offset-sized field (4 bytes classic, 8 bytes big).
    pub(crate) fn write_offset_field(&mut self, offset: u64) -> TiffResult<()> {
        match self.mode {
            TiffMode::Classic => self.write_u32(offset as u32),
            TiffMode::Big => self.write_u64(offset),
        }
    }

    /// Opens an IFD builder bound to this writer.
    ///
    /// `previous` is the offset of the IFD the new directory should be
    /// chained after; `None` makes the committed directory the file's first.
    pub fn ifd_writer(&mut self, previous: Option<u64>) -> IfdWriter<'_, S> {
        IfdWriter::new(self, previous)
    }

    /// Records where the header should point.
    pub fn set_first_ifd_offset(&mut self, offset: u64) {
        self.first_ifd_offset = offset;
    }

    pub fn first_ifd_offset(&self) -> u64 {
        self.first_ifd_offset
    }

    /// Writes the final header and flushes the store.
    ///
    /// Fails with [`TiffError::BigTiffRequired`] when the file needs 64-bit
    /// offsets but was opened classic; no header is produced in that case.
    /// The writer accepts no further writes afterwards.
    pub fn flush_header(&mut self) -> TiffResult<()> {
        self.check_writable()?;
        if self.requires_big && self.mode == TiffMode::Classic {
            return Err(TiffError::BigTiffRequired);
        }

        let mut header = Vec::with_capacity(self.mode.header_len() as usize);
        header.extend_from_slice(&self.byte_order.header_bytes());
        self.byte_order.put_u16(&mut header, self.mode.magic());
        match self.mode {
            TiffMode::Classic => {
                self.byte_order
                    .put_u32(&mut header, self.first_ifd_offset as u32);
            }
            TiffMode::Big => {
                self.byte_order.put_u16(&mut header, 8);
                self.byte_order.put_u16(&mut header, 0);
                self.byte_order.put_u64(&mut header, self.first_ifd_offset);
            }
        }
        self.store_write(0, &header)?;
        if let Err(err) = self.store.flush() {
            self.poisoned = true;
            return Err(err);
        }
        self.completed = true;
        debug!(
            "flushed {:?} header, first IFD at {}",
            self.mode, self.first_ifd_offset
        );
        Ok(())
    }

    /// Re-links the chain: overwrites the next-IFD field of the directory at
    /// `prev_ifd_offset` with `new_ifd_offset`.
    ///
    /// Reads the entry count in place, skips the fixed-width entry array and
    /// patches the trailing pointer. The cursor does not move.
    pub fn update_next_ifd_pointer(
        &mut self,
        prev_ifd_offset: u64,
        new_ifd_offset: u64,
    ) -> TiffResult<()> {
        self.check_writable()?;

        let mut count_raw = [0u8; 8];
        let count_len = self.mode.count_len();
        self.store
            .read_exact_at(prev_ifd_offset, &mut count_raw[..count_len])?;
        let entry_count = match self.mode {
            TiffMode::Classic => u64::from(self.byte_order.get_u16(&count_raw[..2])),
            TiffMode::Big => self.byte_order.get_u64(&count_raw),
        };

        let pointer_pos = prev_ifd_offset
            + count_len as u64
            + entry_count * self.mode.entry_len() as u64;
        let mut field = Vec::with_capacity(8);
        match self.mode {
            TiffMode::Classic => self.byte_order.put_u32(&mut field, new_ifd_offset as u32),
            TiffMode::Big => self.byte_order.put_u64(&mut field, new_ifd_offset),
        }
        self.store_write(pointer_pos, &field)?;
        Ok(())
    }

    /// Releases the backing store. Idempotent.
    pub fn close(&mut self) -> TiffResult<()> {
        if !self.closed {
            ContentSink::close(&mut self.store)?;
            self.closed = true;
        }
        Ok(())
    }

    /// Returns the backing store without closing it.
    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;

    #[test]
    fn align_is_idempotent_on_even_positions() {
        let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);
        assert_eq!(writer.position(), 8);
        assert_eq!(writer.align_to_word().unwrap(), 8);
        writer.write_bytes(&[1]).unwrap();
        assert_eq!(writer.align_to_word().unwrap(), 10);
        assert_eq!(writer.align_to_word().unwrap(), 10);
    }

    #[test]
    fn seek_past_32_bits_requires_big() {
        let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);
        assert!(!writer.requires_big());
        writer.seek(u64::from(u32::MAX)).unwrap();
        assert!(!writer.requires_big());
        writer.seek(u64::from(u32::MAX) + 1).unwrap();
        assert!(writer.requires_big());
    }

    #[test]
    fn no_write_after_header_flush() {
        let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);
        writer.flush_header().unwrap();
        assert!(matches!(
            writer.write_bytes(&[1]),
            Err(TiffError::Completed)
        ));
    }

    #[test]
    fn no_write_after_close() {
        let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Classic);
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.write_bytes(&[1]), Err(TiffError::Disposed)));
    }

    #[test]
    fn big_header_layout() {
        let mut writer = TiffFileWriter::new(MemoryStore::new(), TiffMode::Big);
        writer.set_first_ifd_offset(16);
        writer.flush_header().unwrap();
        let bytes = writer.into_inner().into_bytes();
        assert_eq!(&bytes[..2], b"II");
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 43);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 8);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 0);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 16);
    }
}
