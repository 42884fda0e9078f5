//! Transparency mask interpreter.

use async_trait::async_trait;

use crate::decode::photometric::{packed_sample, row_target};
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::TiffResult;

/// Expands a 1-bit coverage mask to 8-bit alpha: set bits become opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparencyMask;

#[async_trait]
impl DecodeMiddleware for TransparencyMask {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_mask(data, sink, layout)?;
        }
        next.run(ctx).await
    }
}

fn interpret_mask(data: &[u8], sink: &mut PixelSink<'_>, layout: DecodeLayout) -> TiffResult<()> {
    let region = layout.region;
    let width = region.width as usize;
    let stride = (layout.image_width as usize + 7) / 8;
    let buffer = sink.as_u8()?;

    for r in 0..region.height {
        let start = layout.source_read_offset + (region.y + r) as usize * stride;
        let src = data.get(start.min(data.len())..).unwrap_or(&[]);
        let mut row = row_target(buffer, r, width)?;
        for (c, sample) in row[..width].iter_mut().enumerate() {
            *sample = packed_sample(src, region.x as usize + c, 1)? * 0xFF;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ReadRegion;
    use crate::io::CancellationToken;
    use crate::pixel::PixelBuffer;

    #[test]
    fn bits_become_alpha() {
        let mut buffer = PixelBuffer::<u8>::new(4, 1, 1);
        {
            let mut ctx = DecodeContext::new(
                Vec::new(),
                (4, 1),
                ReadRegion::full(4, 1),
                PixelSink::U8(&mut buffer),
                CancellationToken::new(),
            );
            ctx.set_uncompressed_data(vec![0b1001_0000]);
            let layout = ctx.layout();
            let (data, sink) = ctx.interpret_parts().unwrap();
            interpret_mask(data, sink, layout).unwrap();
        }
        assert_eq!(buffer.into_vec(), vec![255, 0, 0, 255]);
    }
}
