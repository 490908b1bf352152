use std::{
    fmt,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    config::PipelineConfig,
    gemini::GeminiClient,
    model::{GenerativeClient, Part},
    prompt::PromptSpec,
};

/// The step of a stage that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStep {
    /// The request itself was unusable, e.g. no prompt stages.
    Input,
    Upload,
    Generate,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Input => "input",
            PipelineStep::Upload => "upload",
            PipelineStep::Generate => "generate",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one analysis, tagged with where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisError {
    /// Zero-based index of the prompt stage that failed.
    pub stage: usize,
    pub step: PipelineStep,
    /// Message from the originating error, unmodified.
    pub message: String,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API call failed: {}", self.message)
    }
}

impl std::error::Error for AnalysisError {}

/// Text produced by one stage along with its timing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageResponse {
    pub text: String,
    pub duration: Duration,
}

/// Outcome of [`SignAnalysisPipeline::analyze`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisResult {
    /// One response per prompt stage, in input order.
    Success(Vec<StageResponse>),
    Error(AnalysisError),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }

    /// The response texts in stage order, or the error.
    pub fn into_texts(self) -> Result<Vec<String>, AnalysisError> {
        match self {
            AnalysisResult::Success(responses) => {
                Ok(responses.into_iter().map(|r| r.text).collect())
            }
            AnalysisResult::Error(err) => Err(err),
        }
    }
}

/// Runs prompt stages against one image through a [`GenerativeClient`].
///
/// Stages run strictly in order. Each stage uploads the image again and then
/// issues a single generation call with the stage's system instruction and
/// `[file, prompt]` as content. The first failure ends the run.
#[derive(Clone)]
pub struct SignAnalysisPipeline {
    client: Arc<dyn GenerativeClient>,
    model: String,
}

impl SignAnalysisPipeline {
    pub fn new(client: Arc<dyn GenerativeClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Builds a pipeline backed by [`GeminiClient`].
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(GeminiClient::from_config(config)),
            config.model.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn analyze(&self, image_path: &Path, prompt_specs: &[PromptSpec]) -> AnalysisResult {
        if prompt_specs.is_empty() {
            return AnalysisResult::Error(AnalysisError {
                stage: 0,
                step: PipelineStep::Input,
                message: "no prompt stages supplied".to_string(),
            });
        }

        let mut responses = Vec::with_capacity(prompt_specs.len());
        for (stage, spec) in prompt_specs.iter().enumerate() {
            match self.run_stage(image_path, spec).await {
                Ok(response) => responses.push(response),
                Err((step, message)) => {
                    log::warn!("Stage {stage} failed during {step}: {message}");
                    return AnalysisResult::Error(AnalysisError {
                        stage,
                        step,
                        message,
                    });
                }
            }
        }

        AnalysisResult::Success(responses)
    }

    async fn run_stage(
        &self,
        image_path: &Path,
        spec: &PromptSpec,
    ) -> Result<StageResponse, (PipelineStep, String)> {
        let start_time = Instant::now();
        let prompt = spec.resolve_prompt();

        log::debug!("Uploading {}", image_path.display());
        let handle = self
            .client
            .upload(image_path)
            .await
            .map_err(|e| (PipelineStep::Upload, e.to_string()))?;

        log::debug!("Generating with {} against {}", self.model, handle.name);
        let contents = [Part::File(handle), Part::Text(prompt)];
        let text = self
            .client
            .generate_content(&self.model, spec.system_instruction(), &contents)
            .await
            .map_err(|e| (PipelineStep::Generate, e.to_string()))?;

        let duration = start_time.elapsed();
        log::debug!("Stage completed in {duration:?}");

        Ok(StageResponse { text, duration })
    }
}
