//! Chunky RGB interpreters for 8 and 16 bits per sample.

use async_trait::async_trait;

use crate::decode::photometric::{row_target, source_window};
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::{TiffResult, UnsupportedError};

#[derive(Debug, Clone, Copy)]
pub struct Rgb {
    bits: u8,
}

impl Rgb {
    pub fn new(bits: u8) -> TiffResult<Self> {
        match bits {
            8 | 16 => Ok(Self { bits }),
            other => Err(UnsupportedError::BitDepth(other).into()),
        }
    }
}

#[async_trait]
impl DecodeMiddleware for Rgb {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_rgb(data, sink, layout, self.bits)?;
        }
        next.run(ctx).await
    }
}

fn interpret_rgb(
    data: &[u8],
    sink: &mut PixelSink<'_>,
    layout: DecodeLayout,
    bits: u8,
) -> TiffResult<()> {
    let region = layout.region;
    let samples = region.width as usize * 3;

    match bits {
        8 => {
            let buffer = sink.as_u8()?;
            let stride = layout.image_width as usize * 3;
            for r in 0..region.height {
                let start = layout.source_read_offset
                    + (region.y + r) as usize * stride
                    + region.x as usize * 3;
                let src = source_window(data, start, samples)?;
                let mut row = row_target(buffer, r, samples)?;
                row[..samples].copy_from_slice(src);
            }
        }
        16 => {
            let buffer = sink.as_u16()?;
            let stride = layout.image_width as usize * 6;
            for r in 0..region.height {
                let start = layout.source_read_offset
                    + (region.y + r) as usize * stride
                    + region.x as usize * 6;
                let src = source_window(data, start, samples * 2)?;
                let mut row = row_target(buffer, r, samples)?;
                for (sample, raw) in row[..samples].iter_mut().zip(src.chunks_exact(2)) {
                    *sample = layout.byte_order.get_u16(raw);
                }
            }
        }
        _ => unreachable!("constructor validated the depth"),
    }
    Ok(())
}
