use serde_json::json;
use tracing::{error, info};

use crate::config::{Config, PROMPT_OPTIMIZER_SYSTEM_PROMPT};
use crate::llm::dashscope::{ChatMessage, GenerationRequest};
use crate::llm::CompletionBackend;
use crate::state::{ConversationLog, Role};
use crate::utils::timing::log_llm_timing;

const RESULT_FORMAT: &str = "message";

#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("Prompt optimization failed: the drawing request is empty")]
    EmptyInput,
    #[error("Prompt optimization failed: {0:#}")]
    Remote(anyhow::Error),
    #[error("Prompt optimization failed: the model returned no usable content")]
    EmptyResponse,
}

/// Rewrites a drawing request into an image prompt, using the session log as
/// multi-turn context.
pub struct PromptOptimizer<B> {
    backend: B,
    model: String,
    temperature: f32,
    system_prompt: String,
}

impl<B: CompletionBackend> PromptOptimizer<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        PromptOptimizer {
            backend,
            model: config.optimizer_model.clone(),
            temperature: config.optimizer_temperature,
            system_prompt: PROMPT_OPTIMIZER_SYSTEM_PROMPT.to_string(),
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System instruction, then every recorded user/assistant pair in order,
    /// then the new request as the final user message.
    pub fn build_messages(&self, log: &ConversationLog, user_text: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2 + log.len() * 2);
        messages.push(ChatMessage::new(Role::System, self.system_prompt.as_str()));
        messages.extend(
            log.turns()
                .map(|turn| ChatMessage::new(turn.role(), turn.content())),
        );
        messages.push(ChatMessage::new(Role::User, user_text));
        messages
    }

    pub async fn optimize(
        &self,
        log: &mut ConversationLog,
        user_text: &str,
    ) -> Result<String, OptimizationError> {
        if user_text.trim().is_empty() {
            return Err(OptimizationError::EmptyInput);
        }

        if log.is_empty() {
            info!("No prior exchanges; optimizing a first-pass prompt");
        } else {
            info!(
                "Loaded {} prior exchange(s); optimizing as a multi-turn edit",
                log.len()
            );
        }

        let request = GenerationRequest {
            model: self.model.clone(),
            messages: self.build_messages(log, user_text),
            temperature: self.temperature,
            result_format: RESULT_FORMAT.to_string(),
        };

        let metadata = json!({ "history_pairs": log.len(), "messages": request.messages.len() });
        let response = log_llm_timing(
            "dashscope",
            &self.model,
            "optimize_prompt",
            Some(metadata),
            || self.backend.complete(&request),
        )
        .await
        .map_err(|err| {
            error!("Prompt optimization call failed: {err:#}");
            OptimizationError::Remote(err)
        })?;

        let optimized = response
            .first_content()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                error!(
                    "Prompt optimization returned no usable content (request_id={:?})",
                    response.request_id
                );
                OptimizationError::EmptyResponse
            })?
            .to_string();

        log.append(user_text, optimized.as_str());
        info!("Prompt optimized: user={:?} -> prompt={:?}", user_text, optimized);
        Ok(optimized)
    }
}
