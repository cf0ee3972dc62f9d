// src/pipeline.rs
//! One linear generation run: profile and job in, Markdown and PDF out

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::core::prompt_catalog::GENERATION_TASKS;
use crate::core::template_engine::{DEFAULT_COVER_LETTER_TEMPLATE, DEFAULT_CV_TEMPLATE};
use crate::core::{
    DocumentConverter, DocumentKind, InferenceBackend, OutputWriter, PdfEngine, PromptCatalog,
    TemplateEngine,
};
use crate::error::{PipelineError, Result};
use crate::generation::{
    select_content, validators, GeneratedContent, SectionGenerator, SectionName,
};
use crate::job_input;
use crate::types::{JobInput, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Idle,
    ProfileLoaded,
    JobInputReady,
    SectionsGenerated,
    ContentSelected,
    MarkdownRendered,
    PdfConverted,
    PdfFailed,
    Done,
    Aborted,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::ProfileLoaded => "profile loaded",
            RunStage::JobInputReady => "job input ready",
            RunStage::SectionsGenerated => "sections generated",
            RunStage::ContentSelected => "content selected",
            RunStage::MarkdownRendered => "markdown rendered",
            RunStage::PdfConverted => "pdf converted",
            RunStage::PdfFailed => "pdf failed",
            RunStage::Done => "done",
            RunStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Where the job input comes from
#[derive(Debug, Clone)]
pub enum JobSource {
    File(PathBuf),
    Interactive,
    Provided(JobInput),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfOutcome {
    Converted(PdfEngine),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub kind: DocumentKind,
    pub markdown_path: PathBuf,
    pub pdf_path: PathBuf,
    pub pdf: PdfOutcome,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub company: String,
    pub archetypes: Vec<String>,
    pub artifacts: Vec<ArtifactSet>,
    /// Format problems found in the generated sections
    pub warnings: Vec<String>,
}

pub struct Pipeline<'a> {
    config: &'a AppConfig,
    backend: &'a dyn InferenceBackend,
    writer: OutputWriter,
    converter: Option<DocumentConverter>,
    stage: RunStage,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a AppConfig, backend: &'a dyn InferenceBackend) -> Self {
        Self {
            config,
            backend,
            writer: OutputWriter::for_today(config.output_dir.clone()),
            converter: Some(DocumentConverter::new(
                &config.pdf,
                config.templates_dir.clone(),
            )),
            stage: RunStage::Idle,
        }
    }

    /// Stamp artifacts with `date` instead of today
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.writer = OutputWriter::new(self.config.output_dir.clone(), date);
        self
    }

    pub fn with_converter(mut self, converter: DocumentConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Write Markdown only
    pub fn without_pdf(mut self) -> Self {
        self.converter = None;
        self
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, next: RunStage) {
        debug!("Run stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    pub async fn run(&mut self, source: JobSource) -> Result<RunOutcome> {
        match self.execute(source).await {
            Ok(outcome) => {
                self.advance(RunStage::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!("Run aborted in {} stage: {}", e.stage(), e);
                self.advance(RunStage::Aborted);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, source: JobSource) -> Result<RunOutcome> {
        let profile = Profile::load(&self.config.profile_path).await?;
        info!("Loaded profile for {}", profile.basics.name);
        self.advance(RunStage::ProfileLoaded);

        let job = match source {
            JobSource::File(path) => job_input::from_file(&path).await?,
            JobSource::Interactive => {
                job_input::interactive(std::io::stdin().lock(), std::io::stdout())?
            }
            JobSource::Provided(job) => job,
        };
        self.advance(RunStage::JobInputReady);

        // Everything that can fail on bad files is loaded before the first model call
        let catalog = PromptCatalog::load(&self.config.prompts_path).await?;
        catalog.ensure_tasks(&GENERATION_TASKS)?;
        let cv_template =
            TemplateEngine::load(&self.config.cv_template_path(), DEFAULT_CV_TEMPLATE).await?;
        let letter_template = TemplateEngine::load(
            &self.config.cover_letter_template_path(),
            DEFAULT_COVER_LETTER_TEMPLATE,
        )
        .await?;

        let basics = basics_values(&profile);
        let no_content = GeneratedContent {
            archetypes: Vec::new(),
            sections: Vec::new(),
        };
        check_placeholders("CV", &cv_template, &self.cv_values(&basics, &no_content, &job))?;
        check_placeholders(
            "cover letter",
            &letter_template,
            &self.letter_values(&basics, &no_content, &job),
        )?;

        let raw = SectionGenerator::new(
            self.backend,
            &catalog,
            &self.config.generation,
            &profile,
            &job,
        )
        .generate_all()
        .await?;
        self.advance(RunStage::SectionsGenerated);

        let content = select_content(raw, &profile, &job, &self.config.generation);
        let warnings = self.validate(&content, &profile);
        self.advance(RunStage::ContentSelected);

        let cv_markdown = TemplateEngine::render(&cv_template, &self.cv_values(&basics, &content, &job))?;
        let letter_markdown =
            TemplateEngine::render(&letter_template, &self.letter_values(&basics, &content, &job))?;
        self.advance(RunStage::MarkdownRendered);

        let mut written = self
            .writer
            .write_markdown(
                &job.company,
                &[
                    (DocumentKind::Cv, cv_markdown.as_str()),
                    (DocumentKind::CoverLetter, letter_markdown.as_str()),
                ],
            )
            .await?
            .into_iter();
        let (Some(cv_paths), Some(letter_paths)) = (written.next(), written.next()) else {
            return Err(PipelineError::output("Markdown writer returned fewer documents than requested"));
        };

        let cv_pdf = self.convert(&cv_paths.markdown, &cv_paths.pdf, Some(&basics)).await;
        let letter_pdf = self
            .convert(&letter_paths.markdown, &letter_paths.pdf, None)
            .await;

        let outcomes = [&cv_pdf, &letter_pdf];
        if outcomes.iter().any(|o| matches!(o, PdfOutcome::Failed(_))) {
            self.advance(RunStage::PdfFailed);
        } else if outcomes.iter().all(|o| matches!(o, PdfOutcome::Converted(_))) {
            self.advance(RunStage::PdfConverted);
        }

        Ok(RunOutcome {
            company: job.company,
            archetypes: content.archetypes,
            artifacts: vec![
                ArtifactSet {
                    kind: DocumentKind::Cv,
                    markdown_path: cv_paths.markdown,
                    pdf_path: cv_paths.pdf,
                    pdf: cv_pdf,
                },
                ArtifactSet {
                    kind: DocumentKind::CoverLetter,
                    markdown_path: letter_paths.markdown,
                    pdf_path: letter_paths.pdf,
                    pdf: letter_pdf,
                },
            ],
            warnings,
        })
    }

    fn validate(&self, content: &GeneratedContent, profile: &Profile) -> Vec<String> {
        let mut warnings = Vec::new();
        for section in &content.sections {
            let problems = validators::validate(section, &self.config.generation)
                .into_iter()
                .chain(validators::fact_check(section, profile))
                .chain(validators::profile_match(section, profile));
            for problem in problems {
                warn!("{}: {}", section.name.label(), problem);
                warnings.push(format!("{}: {}", section.name.label(), problem));
            }
        }
        warnings
    }

    /// A failed conversion is reported, never fatal: the Markdown is already on disk
    async fn convert(
        &self,
        md_path: &std::path::Path,
        pdf_path: &std::path::Path,
        template_values: Option<&HashMap<String, String>>,
    ) -> PdfOutcome {
        let Some(converter) = &self.converter else {
            return PdfOutcome::Skipped;
        };

        match converter.convert(md_path, pdf_path, template_values).await {
            Ok(engine) => PdfOutcome::Converted(engine),
            Err(e) => {
                warn!("PDF conversion failed for {}: {}", md_path.display(), e);
                PdfOutcome::Failed(e.to_string())
            }
        }
    }

    fn cv_values(
        &self,
        basics: &HashMap<String, String>,
        content: &GeneratedContent,
        job: &JobInput,
    ) -> HashMap<String, String> {
        let mut values = self.common_values(basics, job);
        for name in [
            SectionName::Summary,
            SectionName::Skills,
            SectionName::Experience,
            SectionName::Projects,
            SectionName::Education,
            SectionName::Certifications,
        ] {
            values.insert(name.template_key().to_string(), content.text(name).to_string());
        }
        values
    }

    fn letter_values(
        &self,
        basics: &HashMap<String, String>,
        content: &GeneratedContent,
        job: &JobInput,
    ) -> HashMap<String, String> {
        let mut values = self.common_values(basics, job);
        values.insert(
            SectionName::CoverLetter.template_key().to_string(),
            content.text(SectionName::CoverLetter).to_string(),
        );
        values
    }

    fn common_values(&self, basics: &HashMap<String, String>, job: &JobInput) -> HashMap<String, String> {
        let mut values = basics.clone();
        values.insert("contact".to_string(), contact_line(basics));
        values.insert("company".to_string(), job.company.clone());
        values.insert(
            "date".to_string(),
            self.writer.date().format("%B %-d, %Y").to_string(),
        );
        values
    }
}

const CONTACT_KEYS: [&str; 5] = ["email", "phone", "location", "linkedin", "website"];

/// Profile basics as template values; absent fields are empty strings
pub fn basics_values(profile: &Profile) -> HashMap<String, String> {
    let basics = &profile.basics;
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    HashMap::from([
        ("name".to_string(), basics.name.clone()),
        ("title".to_string(), profile.title_or_default().to_string()),
        ("email".to_string(), field(&basics.email)),
        ("phone".to_string(), field(&basics.phone)),
        ("location".to_string(), field(&basics.location)),
        ("linkedin".to_string(), field(&basics.linkedin)),
        ("website".to_string(), field(&basics.website)),
    ])
}

/// Render error for placeholders `template` uses that no run can fill
fn check_placeholders(
    label: &str,
    template: &str,
    available: &HashMap<String, String>,
) -> Result<()> {
    let unknown: Vec<String> = TemplateEngine::variables(template)
        .into_iter()
        .filter(|name| !available.contains_key(name))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(PipelineError::render(format!(
        "{} template has no value for: {}",
        label,
        unknown.join(", ")
    )))
}

fn contact_line(basics: &HashMap<String, String>) -> String {
    CONTACT_KEYS
        .iter()
        .filter_map(|k| basics.get(*k))
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ")
}
