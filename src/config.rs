// src/config.rs
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "cv_tailor.toml";

/// Application configuration. Every field has a default so an absent or
/// partial `cv_tailor.toml` is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile_path: PathBuf,
    pub prompts_path: PathBuf,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inference: InferenceConfig,
    pub generation: GenerationConfig,
    pub pdf: PdfConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_projects: usize,
    pub max_bullets_per_role: usize,
    pub candidate_pool_size: usize,
    pub max_key_skills: usize,
    /// How much of the job description is pasted into each prompt
    pub jd_excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub pandoc: String,
    /// Searched after `PATH` when probing for TeX engines
    pub extra_tex_dirs: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("profile.yaml"),
            prompts_path: PathBuf::from("prompts.yaml"),
            templates_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("docs"),
            inference: InferenceConfig::default(),
            generation: GenerationConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "phi3:latest".to_string(),
            temperature: 0.2,
            timeout_secs: 300,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_projects: 3,
            max_bullets_per_role: 5,
            candidate_pool_size: 8,
            max_key_skills: 8,
            jd_excerpt_chars: 1000,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".to_string(),
            extra_tex_dirs: vec![PathBuf::from("/Library/TeX/texbin")],
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `cv_tailor.toml` in the working
    /// directory when no path is given. A missing default file yields the
    /// defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).map_err(|e| {
                PipelineError::config(format!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                ))
            })?;
            let parsed = Self::from_toml_str(&content).map_err(|e| {
                PipelineError::config(format!("{} ({})", e, config_path.display()))
            })?;
            info!("Loaded configuration from {}", config_path.display());
            parsed
        } else if explicit {
            return Err(PipelineError::config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Failed to parse configuration: {}", e)))
    }

    /// `OLLAMA_HOST` and `CV_TAILOR_MODEL` take precedence over the file
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.trim().is_empty()) {
            self.inference.base_url = normalize_base_url(&host);
        }
        if let Some(model) = lookup("CV_TAILOR_MODEL").filter(|v| !v.trim().is_empty()) {
            self.inference.model = model.trim().to_string();
        }
    }

    pub fn with_profile_path(mut self, path: PathBuf) -> Self {
        self.profile_path = path;
        self
    }

    pub fn with_prompts_path(mut self, path: PathBuf) -> Self {
        self.prompts_path = path;
        self
    }

    pub fn with_templates_dir(mut self, dir: PathBuf) -> Self {
        self.templates_dir = dir;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.inference.model = model;
        self
    }

    pub fn cv_template_path(&self) -> PathBuf {
        self.templates_dir.join("cv.md")
    }

    pub fn cover_letter_template_path(&self) -> PathBuf {
        self.templates_dir.join("cover_letter.md")
    }
}

/// `OLLAMA_HOST` is commonly given as `host:port` without a scheme
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("docs"));
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.generation.max_projects, 3);
        assert_eq!(config.generation.max_bullets_per_role, 5);
        assert_eq!(config.generation.candidate_pool_size, 8);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
output_dir = "out"

[inference]
model = "llama3"
timeout_secs = 60
"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.inference.model, "llama3");
        assert_eq!(config.inference.timeout_secs, 60);
        assert_eq!(config.inference.base_url, "http://localhost:11434");
        assert_eq!(config.profile_path, PathBuf::from("profile.yaml"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[inference\nmodel = 1").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let err = AppConfig::load(Some(Path::new("/no/such/cv_tailor.toml"))).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("OLLAMA_HOST", "127.0.0.1:9999/"), ("CV_TAILOR_MODEL", "mistral")]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.inference.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.inference.model, "mistral");
    }

    #[test]
    fn test_builder_overrides() {
        let config = AppConfig::default()
            .with_output_dir(PathBuf::from("artifacts"))
            .with_templates_dir(PathBuf::from("tpl"));
        assert_eq!(config.output_dir, PathBuf::from("artifacts"));
        assert_eq!(config.cv_template_path(), PathBuf::from("tpl/cv.md"));
    }
}
