//! Palette-indexed interpreter for 4- and 8-bit indices.

use async_trait::async_trait;

use crate::decode::photometric::{packed_sample, row_target};
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::{MalformedError, TiffError, TiffResult, UnsupportedError};

/// Expands N-bit indices through a `3 × 2^N` ColorMap of 16-bit values.
///
/// Writes RGB16 when the target is 16-bit, or RGB8 by high-byte truncation
/// when it is 8-bit.
#[derive(Debug, Clone)]
pub struct Paletted {
    bits: u8,
    colormap: Vec<u16>,
}

impl Paletted {
    pub fn new(bits: u8, colormap: Vec<u16>) -> TiffResult<Self> {
        if !matches!(bits, 4 | 8) {
            return Err(UnsupportedError::BitDepth(bits).into());
        }
        let expected = 3 * (1usize << bits);
        if colormap.len() != expected {
            return Err(TiffError::Malformed(MalformedError::InvalidColorMap {
                expected,
                actual: colormap.len(),
            }));
        }
        Ok(Self { bits, colormap })
    }
}

#[async_trait]
impl DecodeMiddleware for Paletted {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_paletted(data, sink, layout, self.bits, &self.colormap)?;
        }
        next.run(ctx).await
    }
}

fn interpret_paletted(
    data: &[u8],
    sink: &mut PixelSink<'_>,
    layout: DecodeLayout,
    bits: u8,
    colormap: &[u16],
) -> TiffResult<()> {
    let region = layout.region;
    let width = region.width as usize;
    let samples = width * 3;
    let entries = 1usize << bits;
    let stride = (layout.image_width as usize * usize::from(bits) + 7) / 8;

    for r in 0..region.height {
        let start = layout.source_read_offset + (region.y + r) as usize * stride;
        let src = data.get(start.min(data.len())..).unwrap_or(&[]);

        match sink {
            PixelSink::U16(buffer) => {
                let mut row = row_target(buffer, r, samples)?;
                for c in 0..width {
                    let index = usize::from(packed_sample(src, region.x as usize + c, bits)?);
                    row[c * 3] = colormap[index];
                    row[c * 3 + 1] = colormap[entries + index];
                    row[c * 3 + 2] = colormap[2 * entries + index];
                }
            }
            PixelSink::U8(buffer) => {
                let mut row = row_target(buffer, r, samples)?;
                for c in 0..width {
                    let index = usize::from(packed_sample(src, region.x as usize + c, bits)?);
                    row[c * 3] = (colormap[index] >> 8) as u8;
                    row[c * 3 + 1] = (colormap[entries + index] >> 8) as u8;
                    row[c * 3 + 2] = (colormap[2 * entries + index] >> 8) as u8;
                }
            }
        }
    }
    Ok(())
}
