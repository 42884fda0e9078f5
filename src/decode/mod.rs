//! The decode pipeline: a reified chain of middleware.
//!
//! A pipeline is built once and traversed many times. Each node checks the
//! context's cancellation token before dispatching, and a middleware that
//! chooses not to call `next` short-circuits the rest of the chain. Errors
//! from `next` propagate unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{TiffError, TiffResult};

mod context;
pub mod photometric;
mod uncompressed;

pub use self::context::{DecodeContext, DecodeLayout, PixelSink, ReadRegion};
pub use self::uncompressed::UncompressedData;

/// An interceptor in the decode pipeline.
///
/// Implementations must be stateless or internally synchronised: distinct
/// contexts may traverse the same pipeline concurrently.
#[async_trait]
pub trait DecodeMiddleware: Send + Sync {
    /// Processes `ctx` and decides whether to continue with `next.run(ctx)`.
    async fn invoke(&self, ctx: &mut DecodeContext<'_>, next: &PipelineNode) -> TiffResult<()>;
}

/// One link of the pipeline; the empty node is the no-op terminal.
pub struct PipelineNode {
    stage: Option<(Arc<dyn DecodeMiddleware>, Box<PipelineNode>)>,
}

impl PipelineNode {
    fn terminal() -> Self {
        Self { stage: None }
    }

    /// Dispatches into this node, checking for cancellation first.
    pub fn run<'l, 'p>(&'l self, ctx: &'l mut DecodeContext<'p>) -> BoxFuture<'l, TiffResult<()>>
    where
        'p: 'l,
    {
        Box::pin(async move {
            if ctx.is_cancelled() {
                return Err(TiffError::Cancelled);
            }
            match &self.stage {
                None => Ok(()),
                Some((middleware, next)) => middleware.invoke(ctx, next).await,
            }
        })
    }
}

/// Fixes middleware ordering at construction time.
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn DecodeMiddleware>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<M: DecodeMiddleware + 'static>(self, middleware: M) -> Self {
        self.then_arc(Arc::new(middleware))
    }

    pub fn then_arc(mut self, middleware: Arc<dyn DecodeMiddleware>) -> Self {
        self.stages.push(middleware);
        self
    }

    pub fn build(self) -> DecodePipeline {
        let mut node = PipelineNode::terminal();
        for middleware in self.stages.into_iter().rev() {
            node = PipelineNode {
                stage: Some((middleware, Box::new(node))),
            };
        }
        DecodePipeline { head: node }
    }
}

/// A built middleware chain.
pub struct DecodePipeline {
    head: PipelineNode,
}

impl DecodePipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs one full traversal for `ctx`. The context lives exactly for this
    /// call; driving one context from two invocations at once is not
    /// supported.
    pub async fn decode(&self, ctx: &mut DecodeContext<'_>) -> TiffResult<()> {
        self.head.run(ctx).await
    }
}
