// src/error.rs
//! Error kinds surfaced by the generation pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing configuration, profile, prompt catalog or job input
    #[error("{0}")]
    Config(String),

    /// Local model service unreachable, timed out or returned an error
    #[error("{0}")]
    Inference(String),

    /// Template and data do not line up
    #[error("{0}")]
    Render(String),

    /// Neither typesetting engine usable, or the converter exited non-zero
    #[error("{0}")]
    Conversion(String),

    /// Generated documents could not be written to the output directory
    #[error("{0}")]
    Output(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Human-readable name of the failing stage, used in the final report
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Inference(_) => "inference",
            Self::Render(_) => "rendering",
            Self::Conversion(_) => "PDF conversion",
            Self::Output(_) => "output",
        }
    }

    /// Wraps an `anyhow` chain from a file-system helper into a config error,
    /// keeping every context layer in the message.
    pub fn config_from(err: anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }

    /// Same as [`config_from`](Self::config_from) for failed artifact writes
    pub fn output_from(err: anyhow::Error) -> Self {
        Self::Output(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineError::config("x").stage(), "configuration");
        assert_eq!(PipelineError::inference("x").stage(), "inference");
        assert_eq!(PipelineError::render("x").stage(), "rendering");
        assert_eq!(PipelineError::conversion("x").stage(), "PDF conversion");
        assert_eq!(PipelineError::output("x").stage(), "output");
    }

    #[test]
    fn test_config_from_keeps_context_chain() {
        let err: anyhow::Result<()> =
            Err(anyhow::anyhow!("No such file")).context("Failed to read file: profile.yaml");
        let wrapped = PipelineError::config_from(err.unwrap_err());
        let msg = wrapped.to_string();
        assert!(msg.contains("Failed to read file: profile.yaml"));
        assert!(msg.contains("No such file"));
    }
}
