use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::llm::dashscope::ImageSynthesisRequest;
use crate::llm::ImageSynthesisBackend;
use crate::utils::timing::log_llm_timing;

const IMAGE_COUNT: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ImageGenerationError {
    #[error("Image generation failed: the prompt is empty")]
    EmptyPrompt,
    #[error("Image generation failed: status {status_code}, error {code}: {message}")]
    Rejected {
        status_code: u16,
        code: String,
        message: String,
    },
    #[error("Image generation failed: the model returned no image results")]
    NoResults,
    #[error("Image generation failed: {0:#}")]
    Transport(anyhow::Error),
}

/// Sends an optimized prompt to the text-to-image model with fixed parameters.
pub struct ImageGenerator<B> {
    backend: B,
    model: String,
    size: String,
}

impl<B: ImageSynthesisBackend> ImageGenerator<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        ImageGenerator {
            backend,
            model: config.image_model.clone(),
            size: config.image_size.clone(),
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, optimized_prompt: &str) -> ImageSynthesisRequest {
        ImageSynthesisRequest {
            model: self.model.clone(),
            prompt: optimized_prompt.to_string(),
            n: IMAGE_COUNT,
            size: self.size.clone(),
            prompt_extend: true,
            watermark: true,
        }
    }

    /// Returns the URL of the first generated image. Failures are not retried.
    pub async fn generate(&self, optimized_prompt: &str) -> Result<String, ImageGenerationError> {
        if optimized_prompt.trim().is_empty() {
            return Err(ImageGenerationError::EmptyPrompt);
        }

        let request = self.build_request(optimized_prompt);
        let metadata = json!({ "size": request.size, "n": request.n });
        let response = log_llm_timing(
            "dashscope",
            &self.model,
            "generate_image",
            Some(metadata),
            || self.backend.synthesize(&request),
        )
        .await
        .map_err(|err| {
            error!("Image synthesis call failed: {err:#}");
            ImageGenerationError::Transport(err)
        })?;

        if !response.is_ok() {
            let err = ImageGenerationError::Rejected {
                status_code: response.status_code,
                code: response.code.unwrap_or_else(|| "unknown".to_string()),
                message: response
                    .message
                    .unwrap_or_else(|| "no message provided".to_string()),
            };
            error!("{err}");
            return Err(err);
        }

        let Some(first) = response.output.results.first() else {
            error!(
                "Image synthesis succeeded without results (request_id={:?})",
                response.request_id
            );
            return Err(ImageGenerationError::NoResults);
        };
        let url = first
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ImageGenerationError::NoResults)?;

        if let Some(actual_prompt) = first.actual_prompt.as_deref() {
            info!("Prompt extended by the image model: {:?}", actual_prompt);
        }
        if response.output.results.len() > 1 {
            warn!(
                "Image synthesis returned {} results; using the first",
                response.output.results.len()
            );
        }
        info!("Image generated: {}", url);
        Ok(url.to_string())
    }
}
