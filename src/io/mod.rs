//! Positioned I/O over a seekable backing store.
//!
//! The codec never reads or writes through a shared cursor: every operation
//! names its own offset, which keeps independent sessions re-entrant as long
//! as they do not share one `Seek`-based wrapper. Sync and async flavours
//! exist side by side; lifting sync into async is free, while requiring sync
//! of an async-only store fails with `Unsupported` rather than blocking.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{TiffError, TiffResult, UnsupportedError};

mod byte_order;

pub use self::byte_order::{ByteOrder, EndianSlice};

/// A byte range inside the backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: u64,
    pub length: u64,
}

/// Random-access positioned reads.
pub trait ContentSource {
    /// Reads into `buf` starting at `offset`, returning the number of bytes
    /// read. Short counts are permitted only at end of file.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TiffResult<usize>;

    /// Releases the backing store. Idempotent; later operations fail with
    /// [`TiffError::Disposed`].
    fn close(&mut self) -> TiffResult<()>;

    /// Fills `buf` completely or fails with [`TiffError::Truncated`].
    fn read_exact_at(&mut self, mut offset: u64, mut buf: &mut [u8]) -> TiffResult<()> {
        while !buf.is_empty() {
            let n = self.read_at(offset, buf)?;
            if n == 0 {
                return Err(TiffError::Truncated);
            }
            offset += n as u64;
            buf = &mut buf[n..];
        }
        Ok(())
    }
}

/// Random-access positioned writes.
pub trait ContentSink {
    /// Writes all of `buf` at `offset`, extending the store when writing past
    /// its current end.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> TiffResult<()>;

    fn flush(&mut self) -> TiffResult<()>;

    /// Releases the backing store. Idempotent; later operations fail with
    /// [`TiffError::Disposed`].
    fn close(&mut self) -> TiffResult<()>;
}

/// Async twin of [`ContentSource`].
#[async_trait]
pub trait AsyncContentSource: Send {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TiffResult<usize>;

    async fn close(&mut self) -> TiffResult<()>;

    async fn read_exact_at(&mut self, mut offset: u64, buf: &mut [u8]) -> TiffResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(TiffError::Truncated);
            }
            offset += n as u64;
            filled += n;
        }
        Ok(())
    }
}

/// Async twin of [`ContentSink`].
#[async_trait]
pub trait AsyncContentSink: Send {
    async fn write_at(&mut self, offset: u64, buf: &[u8]) -> TiffResult<()>;

    async fn flush(&mut self) -> TiffResult<()>;

    async fn close(&mut self) -> TiffResult<()>;
}

/// In-memory backing store, used for value marshalling and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Vec<u8>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.closed {
            Err(TiffError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl From<Vec<u8>> for MemoryStore {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            closed: false,
        }
    }
}

impl ContentSource for MemoryStore {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TiffResult<usize> {
        self.check_open()?;
        let len = self.bytes.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }

    fn close(&mut self) -> TiffResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl ContentSink for MemoryStore {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> TiffResult<()> {
        self.check_open()?;
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(TiffError::Truncated)? as usize;
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset as usize..end].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> TiffResult<()> {
        self.check_open()
    }

    fn close(&mut self) -> TiffResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Positioned I/O over any `Read + Seek` / `Write + Seek` stream, e.g. a
/// [`std::fs::File`] or a cursor.
///
/// The wrapper serialises access through the stream's single cursor, so one
/// `SeekStream` must not be shared between concurrent sessions; open one per
/// session instead.
#[derive(Debug)]
pub struct SeekStream<T> {
    inner: T,
    closed: bool,
}

impl<T> SeekStream<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Returns the backing stream without closing it.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.closed {
            Err(TiffError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<T: Read + Seek> ContentSource for SeekStream<T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TiffResult<usize> {
        self.check_open()?;
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    fn close(&mut self) -> TiffResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl<T: Write + Seek> ContentSink for SeekStream<T> {
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> TiffResult<()> {
        self.check_open()?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> TiffResult<()> {
        self.check_open()?;
        self.inner.flush()?;
        Ok(())
    }

    fn close(&mut self) -> TiffResult<()> {
        if !self.closed {
            self.inner.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}

/// Lifts a sync store into the async traits.
///
/// The wrapped operations complete without suspending, which is correct for
/// memory- and file-backed stores.
#[derive(Debug)]
pub struct BlockingAdapter<S> {
    inner: S,
}

impl<S> BlockingAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: ContentSource + Send> AsyncContentSource for BlockingAdapter<S> {
    async fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TiffResult<usize> {
        self.inner.read_at(offset, buf)
    }

    async fn close(&mut self) -> TiffResult<()> {
        self.inner.close()
    }
}

#[async_trait]
impl<S: ContentSink + Send> AsyncContentSink for BlockingAdapter<S> {
    async fn write_at(&mut self, offset: u64, buf: &[u8]) -> TiffResult<()> {
        self.inner.write_at(offset, buf)
    }

    async fn flush(&mut self) -> TiffResult<()> {
        self.inner.flush()
    }

    async fn close(&mut self) -> TiffResult<()> {
        self.inner.close()
    }
}

/// Marks an async-only store as unusable from sync callers.
///
/// Every sync operation fails with `Unsupported`; blocking a cooperative
/// runtime on the inner store is never an option.
#[derive(Debug)]
pub struct SyncOverAsync<A> {
    inner: A,
}

impl<A> SyncOverAsync<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A> ContentSource for SyncOverAsync<A> {
    fn read_at(&mut self, _offset: u64, _buf: &mut [u8]) -> TiffResult<usize> {
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore,
        ))
    }

    fn close(&mut self) -> TiffResult<()> {
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore,
        ))
    }
}

impl<A> ContentSink for SyncOverAsync<A> {
    fn write_at(&mut self, _offset: u64, _buf: &[u8]) -> TiffResult<()> {
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore,
        ))
    }

    fn flush(&mut self) -> TiffResult<()> {
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore,
        ))
    }

    fn close(&mut self) -> TiffResult<()> {
        Err(TiffError::Unsupported(
            UnsupportedError::SyncAccessToAsyncStore,
        ))
    }
}

/// Cooperative cancellation signal threaded through async operations.
///
/// Cloning shares the flag. A set token makes the next suspension point fail
/// with [`TiffError::Cancelled`]; already-issued writes complete first.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> TiffResult<()> {
        if self.is_cancelled() {
            Err(TiffError::Cancelled)
        } else {
            Ok(())
        }
    }
}
