//! 8-bit CMYK interpreter.

use async_trait::async_trait;

use crate::decode::photometric::{row_target, source_window};
use crate::decode::{DecodeContext, DecodeLayout, DecodeMiddleware, PipelineNode, PixelSink};
use crate::error::TiffResult;

/// Copies chunky 8-bit CMYK samples into a four-sample-per-pixel buffer
/// unchanged. Separating the inks into colour is a rendering concern and
/// stays with the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cmyk8;

#[async_trait]
impl DecodeMiddleware for Cmyk8 {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let layout = ctx.layout();
        {
            let (data, sink) = ctx.interpret_parts()?;
            interpret_cmyk(data, sink, layout)?;
        }
        next.run(ctx).await
    }
}

fn interpret_cmyk(data: &[u8], sink: &mut PixelSink<'_>, layout: DecodeLayout) -> TiffResult<()> {
    let region = layout.region;
    let samples = region.width as usize * 4;
    let stride = layout.image_width as usize * 4;
    let buffer = sink.as_u8()?;

    for r in 0..region.height {
        let start =
            layout.source_read_offset + (region.y + r) as usize * stride + region.x as usize * 4;
        let src = source_window(data, start, samples)?;
        let mut row = row_target(buffer, r, samples)?;
        row[..samples].copy_from_slice(src);
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
    fn ink_channels_are_copied_verbatim() {
        let mut buffer = PixelBuffer::<u8>::new(2, 1, 4);
        {
            let mut ctx = DecodeContext::new(
                Vec::new(),
                (2, 1),
                ReadRegion::full(2, 1),
                PixelSink::U8(&mut buffer),
                CancellationToken::new(),
            );
            ctx.set_uncompressed_data(vec![10, 20, 30, 40, 50, 60, 70, 80]);
            let layout = ctx.layout();
            let (data, sink) = ctx.interpret_parts().unwrap();
            interpret_cmyk(data, sink, layout).unwrap();
        }
        assert_eq!(
            buffer.into_vec(),
            vec![10, 20, 30, 40, 50, 60, 70, 80]
        );
    }

    #[test]
    fn region_selects_ink_columns() {
        let mut buffer = PixelBuffer::<u8>::new(1, 1, 4);
        {
            // 2-pixel-wide source image; the region covers the second pixel.
            let mut ctx = DecodeContext::new(
                Vec::new(),
                (2, 1),
                ReadRegion {
                    x: 1,
                    y: 0,
                    width: 1,
                    height: 1,
                },
                PixelSink::U8(&mut buffer),
                CancellationToken::new(),
            );
            ctx.set_uncompressed_data(vec![1, 2, 3, 4, 5, 6, 7, 8]);
            let layout = ctx.layout();
            let (data, sink) = ctx.interpret_parts().unwrap();
            interpret_cmyk(data, sink, layout).unwrap();
        }
        assert_eq!(buffer.into_vec(), vec![5, 6, 7, 8]);
    }
}
