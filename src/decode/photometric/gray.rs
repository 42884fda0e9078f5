//! Grayscale interpreters for 1, 4, 8 and 16 bits per sample.

use async_trait::async_trait;

use crate::decode::photometric::{invert_in_place, packed_sample, row_target, source_window};
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::{TiffResult, UnsupportedError};

fn check_bits(bits: u8) -> TiffResult<u8> {
    match bits {
        1 | 4 | 8 | 16 => Ok(bits),
        other => Err(UnsupportedError::BitDepth(other).into()),
    }
}

/// Minimum-is-black grayscale.
#[derive(Debug, Clone, Copy)]
pub struct BlackIsZero {
    bits: u8,
}

impl BlackIsZero {
    pub fn new(bits: u8) -> TiffResult<Self> {
        Ok(Self {
            bits: check_bits(bits)?,
        })
    }
}

#[async_trait]
impl DecodeMiddleware for BlackIsZero {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_gray(data, sink, layout, self.bits, false)?;
        }
        next.run(ctx).await
    }
}

/// Minimum-is-white grayscale: the bitwise complement of [`BlackIsZero`] at
/// the same depth.
#[derive(Debug, Clone, Copy)]
pub struct WhiteIsZero {
    bits: u8,
}

impl WhiteIsZero {
    pub fn new(bits: u8) -> TiffResult<Self> {
        Ok(Self {
            bits: check_bits(bits)?,
        })
    }
}

#[async_trait]
impl DecodeMiddleware for WhiteIsZero {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_gray(data, sink, layout, self.bits, true)?;
        }
        next.run(ctx).await
    }
}

fn interpret_gray(
    data: &[u8],
    sink: &mut PixelSink<'_>,
    layout: DecodeLayout,
    bits: u8,
    invert: bool,
) -> TiffResult<()> {
    let region = layout.region;
    let width = region.width as usize;

    match bits {
        8 => {
            let buffer = sink.as_u8()?;
            let stride = layout.image_width as usize;
            for r in 0..region.height {
                let start = layout.source_read_offset
                    + (region.y + r) as usize * stride
                    + region.x as usize;
                let src = source_window(data, start, width)?;
                let mut row = row_target(buffer, r, width)?;
                row[..width].copy_from_slice(src);
                if invert {
                    invert_in_place(&mut row[..width]);
                }
            }
        }
        16 => {
            let buffer = sink.as_u16()?;
            let stride = layout.image_width as usize * 2;
            for r in 0..region.height {
                let start = layout.source_read_offset
                    + (region.y + r) as usize * stride
                    + region.x as usize * 2;
                let src = source_window(data, start, width * 2)?;
                let mut row = row_target(buffer, r, width)?;
                for (sample, raw) in row[..width].iter_mut().zip(src.chunks_exact(2)) {
                    let value = layout.byte_order.get_u16(raw);
                    *sample = if invert { !value } else { value };
                }
            }
        }
        1 | 4 => {
            let buffer = sink.as_u8()?;
            let stride = (layout.image_width as usize * usize::from(bits) + 7) / 8;
            let max = (1u16 << bits) as u8 - 1;
            let scale = 255 / max;
            for r in 0..region.height {
                let start = layout.source_read_offset + (region.y + r) as usize * stride;
                // The last row may be shorter than the stride; per-sample
                // extraction reports truncation if the bits run out.
                let src = data.get(start.min(data.len())..).unwrap_or(&[]);
                let mut row = row_target(buffer, r, width)?;
                for (c, sample) in row[..width].iter_mut().enumerate() {
                    let mut value = packed_sample(src, region.x as usize + c, bits)?;
                    if invert {
                        value = max - value;
                    }
                    *sample = value * scale;
                }
            }
        }
        _ => unreachable!("constructor validated the depth"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ReadRegion;
    use crate::io::CancellationToken;
    use crate::pixel::PixelBuffer;

    fn run_gray(bits: u8, invert: bool, data: Vec<u8>, width: u32, height: u32) -> Vec<u8> {
        let mut buffer = PixelBuffer::<u8>::new(width, height, 1);
        {
            let mut ctx = DecodeContext::new(
                Vec::new(),
                (width, height),
                ReadRegion::full(width, height),
                PixelSink::U8(&mut buffer),
                CancellationToken::new(),
            );
            ctx.set_uncompressed_data(data);
            let layout = ctx.layout();
            let (src, sink) = ctx.interpret_parts().unwrap();
            interpret_gray(src, sink, layout, bits, invert).unwrap();
        }
        buffer.into_vec()
    }

    #[test]
    fn black_is_zero_8_copies() {
        assert_eq!(
            run_gray(8, false, vec![0x00, 0x55, 0xAA, 0xFF], 4, 1),
            vec![0x00, 0x55, 0xAA, 0xFF]
        );
    }

    #[test]
    fn white_is_zero_8_inverts() {
        assert_eq!(
            run_gray(8, true, vec![0x00, 0x55, 0xAA, 0xFF], 4, 1),
            vec![0xFF, 0xAA, 0x55, 0x00]
        );
    }

    #[test]
    fn one_bit_expands_to_full_range() {
        // 0b1010_0000 over 4 pixels
        assert_eq!(run_gray(1, false, vec![0xA0], 4, 1), vec![255, 0, 255, 0]);
        assert_eq!(run_gray(1, true, vec![0xA0], 4, 1), vec![0, 255, 0, 255]);
    }

    #[test]
    fn four_bit_scales_by_seventeen() {
        // nibbles 0x5, 0xF
        assert_eq!(run_gray(4, false, vec![0x5F], 2, 1), vec![85, 255]);
        assert_eq!(run_gray(4, true, vec![0x5F], 2, 1), vec![170, 0]);
    }

    #[test]
    fn rejects_unsupported_depth() {
        assert!(BlackIsZero::new(2).is_err());
        assert!(WhiteIsZero::new(32).is_err());
    }
}
