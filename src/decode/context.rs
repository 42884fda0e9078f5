//! Per-image decode state shared along the pipeline.

use crate::error::{MalformedError, TiffError, TiffResult, UnsupportedError};
use crate::io::{ByteOrder, CancellationToken};
use crate::pixel::PixelBuffer;

/// The pixel region a decode operation covers, in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ReadRegion {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// The typed destination a photometric interpreter writes into.
pub enum PixelSink<'a> {
    U8(&'a mut PixelBuffer<u8>),
    U16(&'a mut PixelBuffer<u16>),
}

impl<'a> PixelSink<'a> {
    pub fn as_u8(&mut self) -> TiffResult<&mut PixelBuffer<u8>> {
        match self {
            PixelSink::U8(buffer) => Ok(buffer),
            PixelSink::U16(_) => Err(TiffError::Unsupported(UnsupportedError::PixelFormat(
                "8-bit",
            ))),
        }
    }

    pub fn as_u16(&mut self) -> TiffResult<&mut PixelBuffer<u16>> {
        match self {
            PixelSink::U16(buffer) => Ok(buffer),
            PixelSink::U8(_) => Err(TiffError::Unsupported(UnsupportedError::PixelFormat(
                "16-bit",
            ))),
        }
    }
}

/// Geometry and byte-order facts an interpreter needs, detached from the
/// context so the pixel sink can be borrowed at the same time.
#[derive(Clone, Copy, Debug)]
pub struct DecodeLayout {
    pub image_width: u32,
    pub image_height: u32,
    pub region: ReadRegion,
    /// Byte offset into `uncompressed_data` where the region's first row
    /// starts.
    pub source_read_offset: usize,
    pub byte_order: ByteOrder,
}

/// Mutable bundle passed by reference through one pipeline traversal.
///
/// A context must not be driven by two concurrent invocations; distinct
/// contexts may traverse the same pipeline in parallel.
pub struct DecodeContext<'a> {
    source_data: Vec<u8>,
    uncompressed_data: Option<Vec<u8>>,
    layout: DecodeLayout,
    sink: PixelSink<'a>,
    token: CancellationToken,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        source_data: Vec<u8>,
        image_size: (u32, u32),
        region: ReadRegion,
        sink: PixelSink<'a>,
        token: CancellationToken,
    ) -> Self {
        Self {
            source_data,
            uncompressed_data: None,
            layout: DecodeLayout {
                image_width: image_size.0,
                image_height: image_size.1,
                region,
                source_read_offset: 0,
                byte_order: ByteOrder::LittleEndian,
            },
            sink,
            token,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.layout.byte_order = byte_order;
        self
    }

    pub fn with_source_read_offset(mut self, offset: usize) -> Self {
        self.layout.source_read_offset = offset;
        self
    }

    pub fn layout(&self) -> DecodeLayout {
        self.layout
    }

    pub fn source_data(&self) -> &[u8] {
        &self.source_data
    }

    /// Moves the compressed bytes out, e.g. for a pass-through data stage.
    pub fn take_source_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.source_data)
    }

    pub fn set_uncompressed_data(&mut self, data: Vec<u8>) {
        self.uncompressed_data = Some(data);
    }

    pub fn uncompressed_data(&self) -> Option<&[u8]> {
        self.uncompressed_data.as_deref()
    }

    /// Splits the context into the uncompressed bytes and the pixel sink so
    /// an interpreter can read one while writing the other.
    pub fn interpret_parts(&mut self) -> TiffResult<(&[u8], &mut PixelSink<'a>)> {
        match self.uncompressed_data.as_deref() {
            Some(data) => Ok((data, &mut self.sink)),
            None => Err(TiffError::Malformed(
                MalformedError::MissingUncompressedData,
            )),
        }
    }

    pub fn sink(&mut self) -> &mut PixelSink<'a> {
        &mut self.sink
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
