// src/lib.rs
//! Tailored CV and cover letter generation backed by a local language model

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod generation;
pub mod job_input;
pub mod pipeline;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{ArtifactSet, JobSource, PdfOutcome, Pipeline, RunOutcome, RunStage};
