use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::llm::media::save_image;
use crate::llm::{
    CompletionBackend, ImageGenerationError, ImageGenerator, ImageSynthesisBackend,
    OptimizationError, PromptOptimizer,
};
use crate::state::{GeneratedImage, IllegalTransition, RequestPhase, Session};
use crate::utils::timing::{complete_request_timer, start_request_timer};

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
    #[error(transparent)]
    ImageGeneration(#[from] ImageGenerationError),
    #[error(transparent)]
    State(#[from] IllegalTransition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub optimized_prompt: String,
    pub image_url: String,
    pub saved_path: Option<PathBuf>,
}

/// Receives step-by-step progress for one draw request.
pub trait ProgressSink {
    fn phase(&mut self, phase: RequestPhase);
    fn step(&mut self, message: &str);
    fn warn(&mut self, message: &str);
}

/// Prints progress to the terminal.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn phase(&mut self, _phase: RequestPhase) {}

    fn step(&mut self, message: &str) {
        println!("  · {message}");
    }

    fn warn(&mut self, message: &str) {
        println!("  ! {message}");
    }
}

/// Optimize → generate (→ save) for one user action.
pub struct DrawPipeline<C, I> {
    optimizer: PromptOptimizer<C>,
    generator: ImageGenerator<I>,
    auto_save_dir: Option<PathBuf>,
}

fn advance(
    phase: &mut RequestPhase,
    next: RequestPhase,
    progress: &mut impl ProgressSink,
) -> Result<(), IllegalTransition> {
    phase.transition(next)?;
    progress.phase(next);
    Ok(())
}

impl<C, I> DrawPipeline<C, I>
where
    C: CompletionBackend,
    I: ImageSynthesisBackend,
{
    pub fn new(optimizer: PromptOptimizer<C>, generator: ImageGenerator<I>) -> Self {
        DrawPipeline {
            optimizer,
            generator,
            auto_save_dir: None,
        }
    }

    pub fn with_auto_save(mut self, dir: Option<PathBuf>) -> Self {
        self.auto_save_dir = dir;
        self
    }

    #[cfg(test)]
    pub fn optimizer(&self) -> &PromptOptimizer<C> {
        &self.optimizer
    }

    #[cfg(test)]
    pub fn generator(&self) -> &ImageGenerator<I> {
        &self.generator
    }

    pub async fn run(
        &self,
        session: &mut Session,
        user_text: &str,
        progress: &mut impl ProgressSink,
    ) -> Result<DrawOutcome, DrawError> {
        session.requests_started += 1;
        let mut timer = start_request_timer(session.requests_started, user_text);
        let mut phase = RequestPhase::Idle;

        let result = self
            .run_phases(session, user_text, &mut phase, progress)
            .await;

        match &result {
            Ok(outcome) => {
                complete_request_timer(&mut timer, "success", Some(outcome.image_url.clone()))
            }
            Err(err) => {
                if !phase.is_terminal() && phase.can_transition_to(RequestPhase::Failed) {
                    phase = RequestPhase::Failed;
                    progress.phase(phase);
                }
                error!("Draw request failed in {:?}: {}", phase, err);
                complete_request_timer(&mut timer, "error", Some(err.to_string()));
            }
        }
        result
    }

    async fn run_phases(
        &self,
        session: &mut Session,
        user_text: &str,
        phase: &mut RequestPhase,
        progress: &mut impl ProgressSink,
    ) -> Result<DrawOutcome, DrawError> {
        advance(phase, RequestPhase::Optimizing, progress)?;
        progress.step("Parsing the drawing request...");
        if session.log.is_empty() {
            progress.step("No earlier turns; writing a first prompt.");
        } else {
            progress.step(&format!(
                "Loaded {} earlier turn(s); refining the previous prompt.",
                session.log.len()
            ));
        }
        progress.step(&format!(
            "Calling {} to optimize the prompt...",
            self.optimizer.model()
        ));
        let optimized_prompt = self.optimizer.optimize(&mut session.log, user_text).await?;
        advance(phase, RequestPhase::Optimized, progress)?;
        progress.step(&format!("Optimized prompt: {optimized_prompt}"));

        advance(phase, RequestPhase::Generating, progress)?;
        progress.step(&format!(
            "Calling {} to generate the image...",
            self.generator.model()
        ));
        let image_url = self.generator.generate(&optimized_prompt).await?;
        progress.step("Image URL extracted from the model response.");
        advance(phase, RequestPhase::Done, progress)?;

        session.last_image = Some(GeneratedImage {
            url: image_url.clone(),
            prompt: optimized_prompt.clone(),
        });

        let mut saved_path = None;
        if let Some(dir) = &self.auto_save_dir {
            match save_image(&image_url, dir).await {
                Ok(path) => {
                    progress.step(&format!("Saved to {}", path.display()));
                    saved_path = Some(path);
                }
                Err(err) => {
                    warn!("Auto-save failed: {err}");
                    progress.warn(&format!("Image generated but not saved: {err}"));
                }
            }
        }

        info!("Draw request completed: url={}", image_url);
        Ok(DrawOutcome {
            optimized_prompt,
            image_url,
            saved_path,
        })
    }
}
