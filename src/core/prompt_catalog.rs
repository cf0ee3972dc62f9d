// src/core/prompt_catalog.rs
//! Externally editable prompt templates with `<<KEY>>` placeholders

use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::core::FsOps;
use crate::error::{PipelineError, Result};

/// Catalog shipped with the binary, used when no `prompts.yaml` is present
pub const DEFAULT_PROMPTS: &str = include_str!("../../assets/prompts.yaml");

pub const ARCHETYPE_ANALYSIS: &str = "archetype_analysis";
pub const PROFESSIONAL_SUMMARY: &str = "professional_summary";
pub const EDUCATION: &str = "education";
pub const CERTIFICATIONS: &str = "certifications";
pub const SMART_SKILLS: &str = "smart_skills";
pub const SMART_SOFT_SKILLS: &str = "smart_soft_skills";
pub const SMART_PROJECTS: &str = "smart_projects";
pub const EXPERIENCE: &str = "experience";
pub const COVER_LETTER: &str = "cover_letter";

/// Every task one run renders
pub const GENERATION_TASKS: [&str; 9] = [
    ARCHETYPE_ANALYSIS,
    PROFESSIONAL_SUMMARY,
    EDUCATION,
    CERTIFICATIONS,
    SMART_SKILLS,
    SMART_SOFT_SKILLS,
    SMART_PROJECTS,
    EXPERIENCE,
    COVER_LETTER,
];

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<<([A-Z0-9_]+)>>").expect("valid placeholder regex"))
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    prompts: HashMap<String, String>,
    #[serde(default)]
    task_archetypes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: HashMap<String, String>,
    task_archetypes: Vec<String>,
}

impl PromptCatalog {
    /// Load the catalog from `path`, falling back to the built-in catalog
    /// when the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        match FsOps::read_optional(path)
            .await
            .map_err(PipelineError::config_from)?
        {
            Some(content) => Self::from_yaml_str(&content)
                .map_err(|e| PipelineError::config(format!("{} ({})", e, path.display()))),
            None => {
                warn!(
                    "Prompt catalog {} not found, using built-in prompts",
                    path.display()
                );
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_PROMPTS)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content).map_err(|e| {
            PipelineError::config(format!("Failed to parse prompt catalog: {}", e))
        })?;

        if file.prompts.is_empty() {
            return Err(PipelineError::config("Prompt catalog defines no prompts"));
        }

        // An empty archetype list in a user catalog means "use the built-in one"
        let task_archetypes = if file.task_archetypes.is_empty() && content != DEFAULT_PROMPTS {
            Self::builtin()?.task_archetypes
        } else {
            file.task_archetypes
        };

        Ok(Self {
            prompts: file.prompts,
            task_archetypes,
        })
    }

    pub fn task_archetypes(&self) -> &[String] {
        &self.task_archetypes
    }

    pub fn has_task(&self, task: &str) -> bool {
        self.prompts.contains_key(task)
    }

    /// Config error naming every task in `tasks` that has no template
    pub fn ensure_tasks(&self, tasks: &[&str]) -> Result<()> {
        let missing: Vec<&str> = tasks.iter().copied().filter(|t| !self.has_task(t)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::config(format!(
                "Prompt catalog has no template for: {}",
                missing.join(", ")
            )))
        }
    }

    /// Substitute `values` into the template for `task`. Substituted values
    /// are not scanned again, so a value may itself contain `<<...>>`.
    pub fn render(&self, task: &str, values: &[(&str, String)]) -> Result<String> {
        let template = self.prompts.get(task).ok_or_else(|| {
            PipelineError::config(format!("Prompt catalog has no task named '{}'", task))
        })?;

        let lookup: HashMap<&str, &str> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let mut missing: Vec<String> = Vec::new();

        let rendered = placeholder_regex().replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            match lookup.get(key) {
                Some(value) => value.to_string(),
                None => {
                    if !missing.iter().any(|m| m == key) {
                        missing.push(key.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(PipelineError::config(format!(
                "Prompt '{}' has unresolved placeholders: {}",
                task,
                missing.join(", ")
            )));
        }

        debug!("Rendered prompt '{}' ({} chars)", task, rendered.len());
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
prompts:
  greet: "Hello <<NAME>>, welcome to <<COMPANY>>. Bye <<NAME>>."
"#;

    #[test]
    fn test_builtin_catalog_has_all_tasks() {
        let catalog = PromptCatalog::builtin().unwrap();
        catalog.ensure_tasks(&GENERATION_TASKS).unwrap();
        assert_eq!(catalog.task_archetypes().len(), 11);
    }

    #[test]
    fn test_render_substitutes_every_occurrence() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        let out = catalog
            .render(
                "greet",
                &[("NAME", "Jane".to_string()), ("COMPANY", "Acme".to_string())],
            )
            .unwrap();
        assert_eq!(out, "Hello Jane, welcome to Acme. Bye Jane.");
    }

    #[test]
    fn test_render_rejects_unresolved_placeholder() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        let err = catalog
            .render("greet", &[("NAME", "Jane".to_string())])
            .unwrap_err();
        match err {
            PipelineError::Config(msg) => assert!(msg.contains("COMPANY")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_values_are_not_expanded_again() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        let out = catalog
            .render(
                "greet",
                &[
                    ("NAME", "<<COMPANY>>".to_string()),
                    ("COMPANY", "Acme".to_string()),
                ],
            )
            .unwrap();
        assert!(out.starts_with("Hello <<COMPANY>>, welcome to Acme."));
    }

    #[test]
    fn test_unknown_task() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        let err = catalog.render("nope", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_ensure_tasks_lists_missing_templates() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        catalog.ensure_tasks(&["greet"]).unwrap();
        match catalog.ensure_tasks(&["greet", EXPERIENCE, COVER_LETTER]).unwrap_err() {
            PipelineError::Config(msg) => assert!(msg.ends_with("experience, cover_letter")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_user_catalog_without_archetypes_uses_builtin_list() {
        let catalog = PromptCatalog::from_yaml_str(CATALOG).unwrap();
        assert!(catalog
            .task_archetypes()
            .iter()
            .any(|a| a == "software_engineering"));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = PromptCatalog::load(&dir.path().join("prompts.yaml"))
            .await
            .unwrap();
        assert!(catalog.has_task(COVER_LETTER));
    }

    #[tokio::test]
    async fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.yaml");
        std::fs::write(&path, "prompts: [unclosed").unwrap();
        let err = PromptCatalog::load(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
