// src/types/profile.rs
//! Personal profile loaded once per run from `profile.yaml`

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::core::FsOps;
use crate::error::{PipelineError, Result};

// ===== Profile Structure =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub basics: Basics,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    #[serde(alias = "skills_buckets")]
    pub skills: Skills,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub cover_letter_preferences: CoverLetterPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basics {
    pub name: String,
    #[serde(default, alias = "label", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    #[serde(alias = "studyType")]
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(alias = "company")]
    pub employer: String,
    #[serde(alias = "position")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub period: Period,
    #[serde(default, alias = "highlights")]
    pub bullets: Vec<String>,
}

/// Either a free-form `dates` string or a start/end pair. YAML years are
/// accepted as plain numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(
        default,
        alias = "startDate",
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<String>,
    #[serde(
        default,
        alias = "endDate",
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<String>,
}

/// Flat list or named groups. Groups may be a plain list or a `{ items: [...] }` bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Skills {
    Flat(Vec<String>),
    Grouped(BTreeMap<String, SkillGroup>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillGroup {
    List(Vec<String>),
    Bucket { items: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "scalar_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, alias = "technologies", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Certification {
    Named(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issuer: Option<String>,
        #[serde(
            default,
            alias = "year",
            deserialize_with = "scalar_string",
            skip_serializing_if = "Option::is_none"
        )]
        date: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Language {
    Plain(String),
    Detailed {
        language: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fluency: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverLetterPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<CareerGoals>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CareerGoals {
    Text(String),
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(|s| match s {
        Scalar::Text(t) => t,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

// ===== Loading =====

impl Profile {
    /// Load and validate the profile. Any I/O, syntax or shape problem is a config error.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = FsOps::read_input(path)
            .await
            .map_err(PipelineError::config_from)?;
        Self::from_yaml_str(&content).map_err(|e| {
            PipelineError::config(format!("{} ({})", e, path.display()))
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let profile: Profile = serde_yaml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Failed to parse profile: {}", e)))?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        if self.basics.name.trim().is_empty() {
            return Err(PipelineError::config("Profile basics.name must not be empty"));
        }
        Ok(())
    }

    // ===== Derived views =====

    /// All technical skills, deduplicated and sorted
    pub fn all_skills(&self) -> Vec<String> {
        let set: BTreeSet<String> = self
            .skills
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        set.into_iter().collect()
    }

    pub fn title_or_default(&self) -> &str {
        self.basics
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Professional")
    }

    /// `**Languages:** English (Native), German` line, built without the model
    pub fn languages_line(&self) -> Option<String> {
        let entries: Vec<String> = self
            .languages
            .iter()
            .map(|lang| match lang {
                Language::Plain(name) => name.clone(),
                Language::Detailed { language, fluency } => match fluency {
                    Some(f) if !f.trim().is_empty() => format!("{} ({})", language, f),
                    _ => language.clone(),
                },
            })
            .filter(|e| !e.trim().is_empty())
            .collect();

        if entries.is_empty() {
            None
        } else {
            Some(format!("**Languages:** {}", entries.join(", ")))
        }
    }

    pub fn career_goals_text(&self) -> String {
        match &self.cover_letter_preferences.career_goals {
            Some(CareerGoals::Text(t)) => t.clone(),
            Some(CareerGoals::List(items)) => items.join(", "),
            None => String::new(),
        }
    }
}

impl Skills {
    pub fn iter(&self) -> Box<dyn Iterator<Item = &String> + '_> {
        match self {
            Skills::Flat(list) => Box::new(list.iter()),
            Skills::Grouped(groups) => Box::new(groups.values().flat_map(|g| g.items().iter())),
        }
    }
}

impl SkillGroup {
    pub fn items(&self) -> &[String] {
        match self {
            SkillGroup::List(items) | SkillGroup::Bucket { items } => items,
        }
    }
}

impl Period {
    /// `dates` verbatim, otherwise `start - end`, with `Present` for open-ended entries
    pub fn date_range(&self) -> String {
        if let Some(dates) = self.dates.as_deref().filter(|d| !d.trim().is_empty()) {
            return dates.to_string();
        }
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => format!("{} - {}", start, end),
            (Some(start), None) => format!("{} - Present", start),
            (None, Some(end)) => end.clone(),
            (None, None) => String::new(),
        }
    }
}

impl Certification {
    pub fn name(&self) -> &str {
        match self {
            Certification::Named(name) | Certification::Detailed { name, .. } => name,
        }
    }
}

impl Project {
    /// Every piece of free text attached to the project, for keyword scoring
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![self.name.as_str(), self.description.as_str()];
        parts.extend(self.highlights.iter().map(String::as_str));
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_PROFILE: &str = r#"
basics:
  name: Jane Doe
  label: Data Engineer
  summary: Engineer with a focus on data pipelines.
  email: jane@example.com
education:
  - institution: TU Berlin
    studyType: M.Sc. Computer Science
    startDate: 2018
    endDate: 2020
    courses: [Databases, Machine Learning]
experience:
  - company: Acme Analytics
    position: Data Engineer
    startDate: 2021-01
    highlights:
      - Built batch pipelines in Python and SQL
      - Migrated reporting to Power Dashboards
skills_buckets:
  programming:
    items: [Python, SQL, Rust]
  tools: [Docker, Airflow]
projects:
  - name: Traffic Forecasting
    description: Forecasting city traffic with Python and Kalman filters
    highlights: [Reduced error by 20%]
  - name: Robot Arm
    description: Embedded control in C++
certifications:
  - name: AWS Cloud Practitioner
    issuer: Amazon
    year: 2022
  - Scrum Master
languages:
  - language: English
    fluency: Native
  - German
soft_skills: [Communication, Mentoring]
cover_letter_preferences:
  career_goals: [Lead data platforms, Mentor engineers]
"#;

    pub(crate) fn sample_profile() -> Profile {
        Profile::from_yaml_str(SAMPLE_PROFILE).unwrap()
    }

    #[test]
    fn test_parses_original_style_keys() {
        let profile = sample_profile();
        assert_eq!(profile.basics.title.as_deref(), Some("Data Engineer"));
        assert_eq!(profile.experience[0].employer, "Acme Analytics");
        assert_eq!(profile.experience[0].role, "Data Engineer");
        assert_eq!(profile.experience[0].bullets.len(), 2);
        assert_eq!(profile.education[0].degree, "M.Sc. Computer Science");
        assert_eq!(profile.certifications.len(), 2);
    }

    #[test]
    fn test_all_skills_sorted_and_deduplicated() {
        let profile = Profile::from_yaml_str(
            r#"
basics: { name: A }
education: []
experience: []
skills: [SQL, Python, SQL, " Rust "]
"#,
        )
        .unwrap();
        assert_eq!(profile.all_skills(), vec!["Python", "Rust", "SQL"]);
        assert_eq!(sample_profile().all_skills().len(), 5);
    }

    #[test]
    fn test_numeric_years_become_date_range() {
        let profile = sample_profile();
        assert_eq!(profile.education[0].period.date_range(), "2018 - 2020");
        assert_eq!(profile.experience[0].period.date_range(), "2021-01 - Present");
    }

    #[test]
    fn test_missing_required_section_is_config_error() {
        let err = Profile::from_yaml_str("basics: { name: A }\neducation: []\nskills: []\n")
            .unwrap_err();
        match err {
            PipelineError::Config(msg) => assert!(msg.contains("experience")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = Profile::from_yaml_str(
            "basics: { name: '  ' }\neducation: []\nexperience: []\nskills: []\n",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_languages_line_and_goals() {
        let profile = sample_profile();
        assert_eq!(
            profile.languages_line().as_deref(),
            Some("**Languages:** English (Native), German")
        );
        assert_eq!(
            profile.career_goals_text(),
            "Lead data platforms, Mentor engineers"
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_config_error() {
        let err = Profile::load(Path::new("/no/such/profile.yaml")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
