//! Curb-sign reader backed by a remote multimodal model.
//!
//! A photo of a curb-regulation sign is run through one or more prompt
//! stages. Every stage uploads the image, sends its system instruction and
//! resolved prompt to the model, and keeps the returned text. The crate does
//! no image analysis of its own; interpreting the sign is the model's job.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use curb_sign::{PipelineConfig, PromptSpec, SignAnalysisPipeline};
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = SignAnalysisPipeline::from_config(&config);
//! let specs = [PromptSpec::new("You read parking signs.", "Can a {vehicle_type} park here?")
//!     .with_variable("vehicle_type", "van")];
//! let texts = pipeline
//!     .analyze(std::path::Path::new("sign.jpg"), &specs)
//!     .await
//!     .into_texts()?;
//! println!("{}", texts[0]);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod model;
pub mod pipeline;
pub mod prompt;

pub use config::PipelineConfig;
pub use error::{ClientError, ConfigError, PromptError};
pub use gemini::GeminiClient;
pub use model::{FileHandle, GenerativeClient, Part};
pub use pipeline::{AnalysisError, AnalysisResult, PipelineStep, SignAnalysisPipeline, StageResponse};
pub use prompt::{FALLBACK_VALUE, PromptSet, PromptSpec};
