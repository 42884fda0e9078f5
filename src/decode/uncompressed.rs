use async_trait::async_trait;

use crate::decode::{DecodeContext, DecodeMiddleware, PipelineNode};
use crate::error::TiffResult;

/// Data stage for uncompressed strips and tiles.
///
/// Moves the source bytes into `uncompressed_data` unchanged. Compression
/// codecs plug into the same seam: fill `uncompressed_data`, then call
/// `next`.
#[derive(Debug, Default)]
pub struct UncompressedData;

#[async_trait]
impl DecodeMiddleware for UncompressedData {
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()> {
        let data = ctx.take_source_data();
        ctx.set_uncompressed_data(data);
        next.run(ctx).await
    }
}
