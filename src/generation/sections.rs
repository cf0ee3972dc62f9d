// src/generation/sections.rs
//! One inference call per CV section, awaited strictly in sequence

use serde::Serialize;
use tracing::{debug, info};

use super::selector::{parse_archetypes, rank_projects};
use super::text::clean_ai_output;
use crate::config::GenerationConfig;
use crate::core::prompt_catalog::{
    ARCHETYPE_ANALYSIS, CERTIFICATIONS, COVER_LETTER, EDUCATION, EXPERIENCE,
    PROFESSIONAL_SUMMARY, SMART_PROJECTS, SMART_SKILLS, SMART_SOFT_SKILLS,
};
use crate::core::{InferenceBackend, PromptCatalog};
use crate::error::{PipelineError, Result};
use crate::types::{JobInput, Profile};

/// Cleaned model output per section, before selection against the profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSections {
    pub archetypes: Vec<String>,
    pub summary: String,
    pub skills: String,
    pub soft_skills: Option<String>,
    pub experience: String,
    pub projects: String,
    pub education: String,
    pub certifications: String,
    pub cover_letter: String,
}

pub struct SectionGenerator<'a> {
    backend: &'a dyn InferenceBackend,
    catalog: &'a PromptCatalog,
    config: &'a GenerationConfig,
    profile: &'a Profile,
    job: &'a JobInput,
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value)
        .map_err(|e| PipelineError::config(format!("Failed to serialize {}: {}", what, e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| PipelineError::config(format!("Failed to serialize {}: {}", what, e)))
}

impl<'a> SectionGenerator<'a> {
    pub fn new(
        backend: &'a dyn InferenceBackend,
        catalog: &'a PromptCatalog,
        config: &'a GenerationConfig,
        profile: &'a Profile,
        job: &'a JobInput,
    ) -> Self {
        Self {
            backend,
            catalog,
            config,
            profile,
            job,
        }
    }

    /// Run every section prompt. The first failing call aborts the run.
    pub async fn generate_all(&self) -> Result<RawSections> {
        let archetypes = self.archetypes().await?;
        info!("Identified archetypes: {:?}", archetypes);
        let context = archetype_context(&archetypes);

        Ok(RawSections {
            summary: self.summary(&context).await?,
            skills: self.skills(&context).await?,
            soft_skills: self.soft_skills().await?,
            experience: self.experience(&context).await?,
            projects: self.projects(&context).await?,
            education: self.education(&context).await?,
            certifications: self.certifications(&context).await?,
            cover_letter: self.cover_letter(&context).await?,
            archetypes,
        })
    }

    fn excerpt(&self) -> String {
        self.job.excerpt(self.config.jd_excerpt_chars).to_string()
    }

    async fn ask(&self, task: &str, label: &str, values: &[(&str, String)]) -> Result<String> {
        let prompt = self.catalog.render(task, values)?;
        let raw = self.backend.generate(label, &prompt).await?;
        let cleaned = clean_ai_output(&raw);
        debug!("Cleaned {} output ({} chars)", label, cleaned.len());
        Ok(cleaned)
    }

    pub async fn archetypes(&self) -> Result<Vec<String>> {
        let allowed = self.catalog.task_archetypes();
        let prompt = self.catalog.render(
            ARCHETYPE_ANALYSIS,
            &[
                ("TASK_ARCHETYPES", allowed.join(", ")),
                ("JD_EXCERPT", self.excerpt()),
            ],
        )?;
        let raw = self.backend.generate("archetype analysis", &prompt).await?;
        Ok(parse_archetypes(&raw, allowed))
    }

    pub async fn summary(&self, archetypes: &str) -> Result<String> {
        let background = match self.profile.basics.summary.as_deref() {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => self
                .profile
                .experience
                .iter()
                .map(|e| format!("{} at {}", e.role, e.employer))
                .collect::<Vec<_>>()
                .join("; "),
        };

        self.ask(
            PROFESSIONAL_SUMMARY,
            "professional summary",
            &[
                ("CURRENT_ROLE", self.profile.title_or_default().to_string()),
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                ("BACKGROUND_SUMMARY", background),
            ],
        )
        .await
    }

    pub async fn skills(&self, archetypes: &str) -> Result<String> {
        let all_skills = self.profile.all_skills();
        if all_skills.is_empty() {
            return Ok(String::new());
        }
        self.ask(
            SMART_SKILLS,
            "skills",
            &[
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                ("ALL_SKILLS_JSON", to_json(&all_skills, "skills")?),
            ],
        )
        .await
    }

    pub async fn soft_skills(&self) -> Result<Option<String>> {
        if self.profile.soft_skills.is_empty() {
            return Ok(None);
        }
        let output = self
            .ask(
                SMART_SOFT_SKILLS,
                "soft skills",
                &[
                    ("JD_EXCERPT", self.excerpt()),
                    ("SOFT_SKILLS_JSON", to_json(&self.profile.soft_skills, "soft skills")?),
                ],
            )
            .await?;
        Ok(Some(output))
    }

    pub async fn experience(&self, archetypes: &str) -> Result<String> {
        if self.profile.experience.is_empty() {
            return Ok(String::new());
        }
        self.ask(
            EXPERIENCE,
            "experience",
            &[
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                ("EXPERIENCE_YAML", to_yaml(&self.profile.experience, "experience")?),
                ("MAX_BULLETS", self.config.max_bullets_per_role.to_string()),
            ],
        )
        .await
    }

    pub async fn projects(&self, archetypes: &str) -> Result<String> {
        let candidates = rank_projects(
            &self.profile.projects,
            &self.job.job_description,
            self.config.candidate_pool_size,
        );
        if candidates.is_empty() {
            return Ok(String::new());
        }
        debug!(
            "Project candidates: {:?}",
            candidates.iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
        );

        self.ask(
            SMART_PROJECTS,
            "projects",
            &[
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                ("CANDIDATE_PROJECTS_YAML", to_yaml(&candidates, "projects")?),
                ("MAX_PROJECTS", self.config.max_projects.min(candidates.len()).to_string()),
            ],
        )
        .await
    }

    pub async fn education(&self, archetypes: &str) -> Result<String> {
        if self.profile.education.is_empty() {
            return Ok(String::new());
        }
        self.ask(
            EDUCATION,
            "education",
            &[
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                ("EDUCATION_YAML", to_yaml(&self.profile.education, "education")?),
            ],
        )
        .await
    }

    pub async fn certifications(&self, archetypes: &str) -> Result<String> {
        if self.profile.certifications.is_empty() {
            return Ok(String::new());
        }
        self.ask(
            CERTIFICATIONS,
            "certifications",
            &[
                ("ARCHETYPES", archetypes.to_string()),
                ("JD_EXCERPT", self.excerpt()),
                (
                    "CERTIFICATIONS_YAML",
                    to_yaml(&self.profile.certifications, "certifications")?,
                ),
            ],
        )
        .await
    }

    pub async fn cover_letter(&self, archetypes: &str) -> Result<String> {
        self.ask(
            COVER_LETTER,
            "cover letter",
            &[
                ("COMPANY", self.job.company.clone()),
                ("JD_EXCERPT", self.excerpt()),
                ("ARCHETYPES", archetypes.to_string()),
                ("CANDIDATE_NAME", self.profile.basics.name.clone()),
                ("CANDIDATE_LABEL", self.profile.title_or_default().to_string()),
                ("CAREER_GOALS", self.profile.career_goals_text()),
            ],
        )
        .await
    }
}

fn archetype_context(archetypes: &[String]) -> String {
    if archetypes.is_empty() {
        "general".to_string()
    } else {
        archetypes.join(", ")
    }
}
