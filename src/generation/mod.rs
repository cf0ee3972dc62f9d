// src/generation/mod.rs
//! Section generation: prompts in, cleaned and selected Markdown out

pub mod sections;
pub mod selector;
pub mod text;
pub mod validators;

pub use sections::{RawSections, SectionGenerator};
pub use selector::select_content;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionName {
    Summary,
    Skills,
    Experience,
    Projects,
    Education,
    Certifications,
    CoverLetter,
}

impl SectionName {
    /// Placeholder name in the Markdown templates
    pub fn template_key(&self) -> &'static str {
        match self {
            SectionName::Summary => "summary",
            SectionName::Skills => "skills",
            SectionName::Experience => "experience",
            SectionName::Projects => "projects",
            SectionName::Education => "education",
            SectionName::Certifications => "certifications",
            SectionName::CoverLetter => "body",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionName::Summary => "professional summary",
            SectionName::Skills => "skills",
            SectionName::Experience => "experience",
            SectionName::Projects => "projects",
            SectionName::Education => "education",
            SectionName::Certifications => "certifications",
            SectionName::CoverLetter => "cover letter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    pub name: SectionName,
    pub text: String,
}

impl GeneratedSection {
    pub fn new(name: SectionName, text: impl Into<String>) -> Self {
        Self {
            name,
            text: text.into(),
        }
    }
}

/// Final section texts for one run, ready for the templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub archetypes: Vec<String>,
    pub sections: Vec<GeneratedSection>,
}

impl GeneratedContent {
    pub fn section(&self, name: SectionName) -> Option<&GeneratedSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Text of `name`, empty when the section was not produced
    pub fn text(&self, name: SectionName) -> &str {
        self.section(name).map(|s| s.text.as_str()).unwrap_or("")
    }
}
