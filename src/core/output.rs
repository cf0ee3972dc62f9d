// src/core/output.rs
//! Deterministic artifact naming and Markdown persistence

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::FsOps;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Cv,
    CoverLetter,
}

impl DocumentKind {
    pub fn doc_type(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "CV",
            DocumentKind::CoverLetter => "CoverLetter",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Cv => f.write_str("CV"),
            DocumentKind::CoverLetter => f.write_str("cover letter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub markdown: PathBuf,
    pub pdf: PathBuf,
}

/// Spaces become underscores; anything outside `[A-Za-z0-9_-]` is dropped
pub fn sanitize_company(company: &str) -> String {
    let sanitized: String = company
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if sanitized.trim_matches('_').is_empty() {
        "General".to_string()
    } else {
        sanitized
    }
}

pub struct OutputWriter {
    output_dir: PathBuf,
    date: NaiveDate,
}

impl OutputWriter {
    pub fn new(output_dir: PathBuf, date: NaiveDate) -> Self {
        Self { output_dir, date }
    }

    /// Writer stamped with today's local date
    pub fn for_today(output_dir: PathBuf) -> Self {
        Self::new(output_dir, chrono::Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `<output_dir>/<DocType>_<Company>_<YYYY-MM-DD>.{md,pdf}`
    pub fn paths(&self, kind: DocumentKind, company: &str) -> ArtifactPaths {
        let stem = format!(
            "{}_{}_{}",
            kind.doc_type(),
            sanitize_company(company),
            self.date.format("%Y-%m-%d")
        );
        ArtifactPaths {
            markdown: self.output_dir.join(format!("{}.md", stem)),
            pdf: self.output_dir.join(format!("{}.pdf", stem)),
        }
    }

    /// Write the Markdown of every document, replacing files from an earlier
    /// run the same day. Either all documents are written or none are left behind.
    pub async fn write_markdown(
        &self,
        company: &str,
        documents: &[(DocumentKind, &str)],
    ) -> Result<Vec<ArtifactPaths>> {
        let paths: Vec<ArtifactPaths> = documents
            .iter()
            .map(|(kind, _)| self.paths(*kind, company))
            .collect();
        let files: Vec<(&Path, &str)> = paths
            .iter()
            .zip(documents)
            .map(|(p, (_, markdown))| (p.markdown.as_path(), *markdown))
            .collect();

        FsOps::write_all(&files)
            .await
            .map_err(PipelineError::output_from)?;
        for p in &paths {
            info!("Markdown saved: {}", p.markdown.display());
        }
        Ok(paths)
    }
}
