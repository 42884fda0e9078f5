//! 8-bit YCbCr interpreter with chroma subsampling.

use async_trait::async_trait;

use crate::decode::photometric::row_target;
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::{TiffError, TiffResult, UnsupportedError};

/// Converts subsampled YCbCr macroblocks to RGB8.
///
/// Subsampling factors come from the YCbCrSubSampling tag, the luma
/// coefficients from YCbCrCoefficients. Data is laid out block-wise: `h × v`
/// luma samples followed by one Cb and one Cr; edge blocks are padded to full
/// size with the last valid samples replicated.
#[derive(Debug, Clone, Copy)]
pub struct YCbCr8 {
    horizontal: u16,
    vertical: u16,
    /// Kr, Kg, Kb.
    coefficients: [f32; 3],
}

impl YCbCr8 {
    /// ITU-R BT.601 coefficients, the TIFF default.
    pub const DEFAULT_COEFFICIENTS: [f32; 3] = [0.299, 0.587, 0.114];

    pub fn new(horizontal: u16, vertical: u16) -> TiffResult<Self> {
        Self::with_coefficients(horizontal, vertical, Self::DEFAULT_COEFFICIENTS)
    }

    pub fn with_coefficients(
        horizontal: u16,
        vertical: u16,
        coefficients: [f32; 3],
    ) -> TiffResult<Self> {
        if !matches!(horizontal, 1 | 2 | 4) || !matches!(vertical, 1 | 2 | 4) {
            return Err(TiffError::Unsupported(UnsupportedError::Subsampling(
                horizontal, vertical,
            )));
        }
        Ok(Self {
            horizontal,
            vertical,
            coefficients,
        })
    }
}

#[async_trait]
impl DecodeMiddleware for YCbCr8 {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_ycbcr(data, sink, layout, self)?;
        }
        next.run(ctx).await
    }
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn interpret_ycbcr(
    data: &[u8],
    sink: &mut PixelSink<'_>,
    layout: DecodeLayout,
    config: &YCbCr8,
) -> TiffResult<()> {
    let region = layout.region;
    let width = region.width as usize;
    let h = usize::from(config.horizontal);
    let v = usize::from(config.vertical);
    let block_len = h * v + 2;
    let blocks_per_row = (layout.image_width as usize + h - 1) / h;

    let [kr, kg, kb] = config.coefficients;
    let buffer = sink.as_u8()?;

    for r in 0..region.height {
        let abs_row = (region.y + r) as usize;
        let mut row = row_target(buffer, r, width * 3)?;

        for c in 0..width {
            let abs_col = region.x as usize + c;
            let block_index = (abs_row / v) * blocks_per_row + abs_col / h;
            let block_start = layout.source_read_offset + block_index * block_len;
            let block = data
                .get(block_start..block_start + block_len)
                .ok_or(TiffError::Truncated)?;

            let y = f32::from(block[(abs_row % v) * h + abs_col % h]);
            let cb = f32::from(block[h * v]) - 128.0;
            let cr = f32::from(block[h * v + 1]) - 128.0;

            let red = y + 2.0 * (1.0 - kr) * cr;
            let blue = y + 2.0 * (1.0 - kb) * cb;
            let green = (y - kr * red - kb * blue) / kg;

            row[c * 3] = clamp_u8(red);
            row[c * 3 + 1] = clamp_u8(green);
            row[c * 3 + 2] = clamp_u8(blue);
        }
    }
    Ok(())
}
