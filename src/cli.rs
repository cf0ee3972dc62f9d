// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::pipeline::JobSource;

#[derive(Debug, Parser)]
#[command(name = "cv-tailor", version)]
#[command(about = "Generate a CV and cover letter tailored to a job description")]
pub struct Cli {
    /// Job input YAML with `company` and `job_description`. Prompts interactively when omitted.
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Configuration file (defaults to ./cv_tailor.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Prompt catalog YAML
    #[arg(long)]
    pub prompts: Option<PathBuf>,

    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model name known to the inference service
    #[arg(long)]
    pub model: Option<String>,

    /// Write Markdown only
    #[arg(long)]
    pub skip_pdf: bool,

    /// Do not probe the inference service before starting
    #[arg(long)]
    pub skip_connection_check: bool,
}

impl Cli {
    /// Command-line values win over the file and environment
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(path) = &self.profile {
            config = config.with_profile_path(path.clone());
        }
        if let Some(path) = &self.prompts {
            config = config.with_prompts_path(path.clone());
        }
        if let Some(dir) = &self.templates_dir {
            config = config.with_templates_dir(dir.clone());
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        config
    }

    pub fn job_source(&self) -> JobSource {
        match &self.job {
            Some(path) => JobSource::File(path.clone()),
            None => JobSource::Interactive,
        }
    }
}
