// src/types/job.rs
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Target company and job description for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobInput {
    pub company: String,
    pub job_description: String,
}

/// On-disk shape of a job input file; keys are optional so that a missing key
/// can be reported by name.
#[derive(Debug, Deserialize)]
struct JobInputFile {
    company: Option<String>,
    job_description: Option<String>,
}

impl JobInput {
    pub fn new(company: impl Into<String>, job_description: impl Into<String>) -> Result<Self> {
        let company = company.into().trim().to_string();
        let job_description = job_description.into().trim().to_string();

        if company.is_empty() {
            return Err(PipelineError::config("Job input is missing `company`"));
        }
        if job_description.is_empty() {
            return Err(PipelineError::config(
                "Job input is missing `job_description`",
            ));
        }

        Ok(Self {
            company,
            job_description,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: JobInputFile = serde_yaml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Failed to parse job input: {}", e)))?;
        Self::new(
            raw.company.unwrap_or_default(),
            raw.job_description.unwrap_or_default(),
        )
    }

    /// First `max_chars` characters of the description, cut on a char boundary
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.job_description.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.job_description[..idx],
            None => &self.job_description,
        }
    }
}
