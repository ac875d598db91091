pub mod dashscope;
pub mod image;
pub mod media;
pub mod optimizer;

use std::future::Future;

use anyhow::Result;

pub use dashscope::{
    DashScopeClient, GenerationRequest, GenerationResponse, ImageSynthesisRequest,
    ImageSynthesisResponse,
};
pub use image::{ImageGenerationError, ImageGenerator};
pub use optimizer::{OptimizationError, PromptOptimizer};

/// A hosted chat-completion endpoint.
pub trait CompletionBackend {
    fn complete(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<GenerationResponse>> + Send;
}

/// A hosted text-to-image endpoint. Implementations resolve asynchronous
/// tasks themselves and hand back the final outcome.
pub trait ImageSynthesisBackend {
    fn synthesize(
        &self,
        request: &ImageSynthesisRequest,
    ) -> impl Future<Output = Result<ImageSynthesisResponse>> + Send;
}
