// src/core/template_engine.rs
//! Markdown and typesetting template rendering with `{{name}}` placeholders

use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::core::FsOps;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CV_TEMPLATE: &str = include_str!("../../assets/cv.md");
pub const DEFAULT_COVER_LETTER_TEMPLATE: &str = include_str!("../../assets/cover_letter.md");
pub const DEFAULT_XELATEX_TEMPLATE: &str = include_str!("../../assets/resume_xelatex.tex");
pub const DEFAULT_PDFLATEX_TEMPLATE: &str = include_str!("../../assets/resume_pdflatex.tex");

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid template variable regex")
    })
}

pub struct TemplateEngine;

impl TemplateEngine {
    /// Replace every `{{key}}` with its value. Values are inserted verbatim
    /// and never re-scanned. Any key without a value is a render error.
    pub fn render(template: &str, variables: &HashMap<String, String>) -> Result<String> {
        let mut missing = BTreeSet::new();

        let rendered = variable_regex().replace_all(template, |caps: &Captures| {
            match variables.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    missing.insert(caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            let keys: Vec<String> = missing.into_iter().collect();
            return Err(PipelineError::render(format!(
                "Template references values that were not provided: {}",
                keys.join(", ")
            )));
        }

        Ok(rendered.into_owned())
    }

    /// Names of every variable the template references, sorted
    pub fn variables(template: &str) -> Vec<String> {
        let names: BTreeSet<String> = variable_regex()
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .collect();
        names.into_iter().collect()
    }

    /// Read a template from disk, or use `builtin` when the file is absent
    pub async fn load(path: &Path, builtin: &str) -> Result<String> {
        match FsOps::read_optional(path)
            .await
            .map_err(PipelineError::config_from)?
        {
            Some(content) => {
                debug!("Loaded template {}", path.display());
                Ok(content)
            }
            None => {
                warn!("Template {} not found, using built-in default", path.display());
                Ok(builtin.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_tolerates_inner_whitespace() {
        let out = TemplateEngine::render(
            "# {{name}}\n{{ title }}",
            &vars(&[("name", "Jane"), ("title", "Engineer")]),
        )
        .unwrap();
        assert_eq!(out, "# Jane\nEngineer");
    }

    #[test]
    fn test_missing_values_are_named() {
        let err = TemplateEngine::render("{{a}} {{b}} {{c}}", &vars(&[("b", "x")])).unwrap_err();
        match err {
            PipelineError::Render(msg) => {
                assert!(msg.contains("a, c"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_values_are_inserted_verbatim() {
        let out =
            TemplateEngine::render("{{body}}", &vars(&[("body", "literal {{name}}")])).unwrap();
        assert_eq!(out, "literal {{name}}");
    }

    #[test]
    fn test_builtin_templates_reference_known_variables() {
        assert_eq!(
            TemplateEngine::variables(DEFAULT_COVER_LETTER_TEMPLATE),
            vec!["body", "company", "contact", "date", "name", "title"]
        );
        let cv_vars = TemplateEngine::variables(DEFAULT_CV_TEMPLATE);
        for key in ["name", "summary", "skills", "experience", "projects", "education"] {
            assert!(cv_vars.iter().any(|v| v == key), "cv template lacks {}", key);
        }
    }

    #[test]
    fn test_typesetting_templates_leave_the_header_to_the_markdown() {
        for template in [DEFAULT_XELATEX_TEMPLATE, DEFAULT_PDFLATEX_TEMPLATE] {
            let (preamble, body) = template.split_once("\\begin{document}").unwrap();
            assert!(preamble.contains("pdfauthor={ {{name}} }"));
            assert!(!body.contains("{{"), "document body repeats profile basics");
            assert!(body.contains("$body$"));
        }
        assert!(DEFAULT_CV_TEMPLATE.starts_with("# {{name}}"));
    }

    #[tokio::test]
    async fn test_load_prefers_file_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.md");

        let fallback = TemplateEngine::load(&path, "builtin").await.unwrap();
        assert_eq!(fallback, "builtin");

        std::fs::write(&path, "custom {{name}}").unwrap();
        let custom = TemplateEngine::load(&path, "builtin").await.unwrap();
        assert_eq!(custom, "custom {{name}}");
    }
}
