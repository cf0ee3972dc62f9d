// src/generation/selector.rs
//! Deterministic relevance ranking of profile content against a job description.
//!
//! Relevance is keyword overlap: both sides are split into lowercase tokens
//! (`[a-z0-9+#]+`) and an entry scores one point per distinct token it shares
//! with the job description. Ties keep profile order, so identical inputs
//! always give identical selections.

use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use tracing::warn;

use super::sections::RawSections;
use super::text::{clean_skills_output, enforce_bullet_limit, extract_json, normalize_spacing};
use super::{GeneratedContent, GeneratedSection, SectionName};
use crate::config::GenerationConfig;
use crate::types::profile::{Certification, Project};
use crate::types::{JobInput, Profile};

pub const MAX_ARCHETYPES: usize = 3;
pub const KEY_SKILLS_CATEGORY: &str = "Key Skills";
pub const SOFT_SKILLS_CATEGORY: &str = "Soft Skills";
const MAX_SOFT_SKILLS: usize = 4;

/// Filled from its own prompt; a model line under this heading is ignored
const SOFT_SKILLS_KEY: &str = "soft skills";
/// The spoken-languages line comes from the profile, so a model line with
/// this heading is kept only for technical skills, under a clearer name
const LANGUAGES_KEY: &str = "languages";
const PROGRAMMING_LANGUAGES_CATEGORY: &str = "Programming Languages";

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9+#]+").expect("valid token regex"))
}

pub fn tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_regex()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn token_set(text: &str) -> BTreeSet<String> {
    tokens(text).into_iter().collect()
}

/// Number of distinct tokens of `text` that also occur in `reference`
pub fn overlap_score(text: &str, reference: &BTreeSet<String>) -> usize {
    token_set(text)
        .iter()
        .filter(|t| reference.contains(*t))
        .count()
}

/// True when every token of `phrase` appears contiguously in `haystack`
pub(crate) fn mentions(haystack: &[String], phrase: &str) -> bool {
    let needle = tokens(phrase);
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Whole-token match in either direction, so "AWS Cloud Practitioner - Amazon (2022)"
/// refers to "AWS Cloud Practitioner"
pub(crate) fn refers_to(text: &str, name: &str) -> bool {
    mentions(&tokens(text), name) || mentions(&tokens(name), text)
}

/// Text of a leading `**Name**` header. Bold labels ending in a colon
/// (`**Tech:**`) are not headers.
pub(crate) fn bold_header(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("**")?;
    let name = rest[..rest.find("**")?].trim();
    (!name.is_empty() && !name.ends_with(':')).then_some(name)
}

// ===== Projects =====

/// Candidate pool for the project prompt: best `pool_size` projects by overlap
pub fn rank_projects<'a>(projects: &'a [Project], job_description: &str, pool_size: usize) -> Vec<&'a Project> {
    let jd_tokens = token_set(job_description);
    let mut scored: Vec<(usize, &Project)> = projects
        .iter()
        .map(|p| (overlap_score(&p.searchable_text(), &jd_tokens), p))
        .collect();

    // sort_by is stable, equal scores stay in profile order
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(pool_size).map(|(_, p)| p).collect()
}

// ===== Archetypes =====

/// Archetypes named by the model, restricted to `allowed`, deduplicated, at most three
pub fn filter_archetypes<I, S>(candidates: I, allowed: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut selected: Vec<String> = Vec::new();
    for candidate in candidates {
        let normalized = candidate
            .as_ref()
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        if let Some(name) = allowed.iter().find(|a| a.to_lowercase() == normalized) {
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        if selected.len() == MAX_ARCHETYPES {
            break;
        }
    }
    selected
}

/// Read `{"archetypes": [...]}` from model output. Without parseable JSON
/// the allowed names found verbatim in the text are used.
pub fn parse_archetypes(output: &str, allowed: &[String]) -> Vec<String> {
    let from_json = extract_json(output).and_then(|value| {
        value.get("archetypes").and_then(|a| a.as_array()).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        })
    });

    match from_json {
        Some(names) => filter_archetypes(names, allowed),
        None => {
            let lower = output.to_lowercase();
            let mut found: Vec<(usize, &String)> = allowed
                .iter()
                .filter_map(|a| lower.find(&a.to_lowercase()).map(|pos| (pos, a)))
                .collect();
            found.sort_by_key(|(pos, _)| *pos);
            filter_archetypes(found.into_iter().map(|(_, a)| a.as_str()), allowed)
        }
    }
}

// ===== Skills =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillLine {
    pub category: String,
    pub skills: Vec<String>,
}

impl SkillLine {
    pub fn to_markdown(&self) -> String {
        format!("**{}:** {}", self.category, self.skills.join(", "))
    }
}

/// Parse `**Category:** a, b` lines out of model output
pub fn parse_skill_lines(output: &str) -> Vec<SkillLine> {
    clean_skills_output(output)
        .lines()
        .filter_map(|line| {
            let plain = line.replace("**", "");
            let (category, rest) = plain.split_once(':')?;
            let skills: Vec<String> = rest
                .split(',')
                .map(|s| s.trim().trim_end_matches('.').trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            Some(SkillLine {
                category: category.trim().to_string(),
                skills,
            })
        })
        .collect()
}

/// Reconcile the model's skill grouping with the profile.
///
/// Skills the profile does not list are dropped, as are skills that merely
/// repeat their category name. Profile skills the job description mentions
/// but the model left out are added under `Key Skills`. When nothing usable
/// remains, the best-overlapping profile skills fill `Key Skills` instead.
pub fn select_skills(
    model_output: &str,
    profile_skills: &[String],
    job_description: &str,
    max_key_skills: usize,
) -> Vec<SkillLine> {
    let canonical: HashMap<String, &String> = profile_skills
        .iter()
        .map(|s| (s.trim().to_lowercase(), s))
        .collect();
    let mut used: HashSet<String> = HashSet::new();
    let mut lines: Vec<SkillLine> = Vec::new();

    for line in parse_skill_lines(model_output) {
        let category = match line.category.to_lowercase().as_str() {
            SOFT_SKILLS_KEY => continue,
            LANGUAGES_KEY => PROGRAMMING_LANGUAGES_CATEGORY.to_string(),
            _ => line.category,
        };
        let category_tokens = tokens(&category);

        let mut kept = Vec::new();
        for skill in &line.skills {
            let key = skill.to_lowercase();
            let Some(profile_skill) = canonical.get(&key) else {
                continue;
            };
            if mentions(&category_tokens, skill) || used.contains(&key) {
                continue;
            }
            used.insert(key);
            kept.push((*profile_skill).clone());
        }

        if !kept.is_empty() {
            lines.push(SkillLine {
                category,
                skills: kept,
            });
        }
    }

    let jd_tokens = tokens(job_description);
    let missing: Vec<String> = profile_skills
        .iter()
        .filter(|s| !used.contains(&s.trim().to_lowercase()) && mentions(&jd_tokens, s))
        .cloned()
        .collect();

    if !missing.is_empty() {
        match lines.iter_mut().find(|l| l.category == KEY_SKILLS_CATEGORY) {
            Some(line) => line.skills.extend(missing),
            None => lines.push(SkillLine {
                category: KEY_SKILLS_CATEGORY.to_string(),
                skills: missing,
            }),
        }
    }

    if lines.is_empty() && !profile_skills.is_empty() {
        let jd_set: BTreeSet<String> = jd_tokens.into_iter().collect();
        let mut ranked: Vec<(usize, &String)> = profile_skills
            .iter()
            .map(|s| (overlap_score(s, &jd_set), s))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        lines.push(SkillLine {
            category: KEY_SKILLS_CATEGORY.to_string(),
            skills: ranked
                .into_iter()
                .take(max_key_skills.max(1))
                .map(|(_, s)| s.clone())
                .collect(),
        });
    }

    lines
}

// ===== Content assembly =====

/// Salutation and sign-off lines; the cover letter template supplies its own
const LETTER_FRAME_PREFIXES: &[&str] = &[
    "dear ",
    "sincerely",
    "best regards",
    "kind regards",
    "warm regards",
    "regards,",
    "yours ",
];

/// Apply the selection rules to raw model output. Sections the model left
/// empty are rebuilt from the profile so that no profile content is lost.
pub fn select_content(
    raw: RawSections,
    profile: &Profile,
    job: &JobInput,
    config: &GenerationConfig,
) -> GeneratedContent {
    let sections = vec![
        GeneratedSection::new(SectionName::Summary, select_summary(&raw.summary, profile)),
        GeneratedSection::new(
            SectionName::Skills,
            select_skills_section(&raw, profile, job, config),
        ),
        GeneratedSection::new(
            SectionName::Experience,
            select_experience(&raw.experience, profile, config),
        ),
        GeneratedSection::new(
            SectionName::Projects,
            select_projects(&raw.projects, profile, job, config),
        ),
        GeneratedSection::new(SectionName::Education, select_education(&raw.education, profile)),
        GeneratedSection::new(
            SectionName::Certifications,
            select_certifications(&raw.certifications, profile),
        ),
        GeneratedSection::new(SectionName::CoverLetter, select_cover_letter(&raw.cover_letter)),
    ];

    GeneratedContent {
        archetypes: raw.archetypes,
        sections,
    }
}

fn select_summary(raw: &str, profile: &Profile) -> String {
    let summary = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !summary.is_empty() {
        return summary;
    }
    warn!("Model returned no summary, using the profile summary");
    profile.basics.summary.clone().unwrap_or_default()
}

fn select_skills_section(
    raw: &RawSections,
    profile: &Profile,
    job: &JobInput,
    config: &GenerationConfig,
) -> String {
    let mut lines: Vec<String> = select_skills(
        &raw.skills,
        &profile.all_skills(),
        &job.job_description,
        config.max_key_skills,
    )
    .iter()
    .map(SkillLine::to_markdown)
    .collect();

    if let Some(output) = &raw.soft_skills {
        if let Some(line) = select_soft_skills(output, &profile.soft_skills) {
            lines.push(line.to_markdown());
        }
    }
    if let Some(languages) = profile.languages_line() {
        lines.push(languages);
    }

    normalize_spacing(&lines.join("\n"))
}

/// Soft skills named by the model that the profile lists, or the first few
/// from the profile when the model named none of them
pub fn select_soft_skills(output: &str, pool: &[String]) -> Option<SkillLine> {
    let mut chosen: Vec<String> = Vec::new();
    for skill in parse_skill_lines(output).into_iter().flat_map(|l| l.skills) {
        let key = skill.to_lowercase();
        if let Some(known) = pool.iter().find(|p| p.trim().to_lowercase() == key) {
            if !chosen.contains(known) {
                chosen.push(known.clone());
            }
        }
    }
    if chosen.is_empty() {
        chosen = pool.iter().take(MAX_SOFT_SKILLS).cloned().collect();
    }
    chosen.truncate(MAX_SOFT_SKILLS);

    (!chosen.is_empty()).then(|| SkillLine {
        category: SOFT_SKILLS_CATEGORY.to_string(),
        skills: chosen,
    })
}

fn select_experience(raw: &str, profile: &Profile, config: &GenerationConfig) -> String {
    let text = enforce_bullet_limit(raw, config.max_bullets_per_role);
    if !text.is_empty() || profile.experience.is_empty() {
        return text;
    }

    warn!("Model returned no experience, rebuilding it from the profile");
    let blocks: Vec<String> = profile
        .experience
        .iter()
        .map(|exp| {
            let mut header = format!("**{}**, {}", exp.role, exp.employer);
            if let Some(location) = exp.location.as_deref().filter(|l| !l.trim().is_empty()) {
                header.push_str(&format!(", {}", location));
            }
            let mut block = vec![header, exp.period.date_range()];
            block.extend(exp.bullets.iter().map(|b| format!("- {}", b)));
            block.join("\n")
        })
        .collect();
    enforce_bullet_limit(&blocks.join("\n"), config.max_bullets_per_role)
}

/// Keep the model's project blocks whose `**Name**` header names a profile
/// project, at most `max_projects` distinct ones. Text before the first
/// header and blocks for unknown projects are dropped.
fn select_projects(
    raw: &str,
    profile: &Profile,
    job: &JobInput,
    config: &GenerationConfig,
) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut chosen: Vec<&str> = Vec::new();
    let mut keep_block = false;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(header) = bold_header(line) {
            keep_block = match profile.projects.iter().find(|p| refers_to(header, &p.name)) {
                Some(project) if chosen.contains(&project.name.as_str()) => false,
                Some(project) if chosen.len() < config.max_projects => {
                    chosen.push(project.name.as_str());
                    true
                }
                Some(_) => false,
                None => {
                    warn!("Dropping project not found in profile: {}", header);
                    false
                }
            };
        }
        if keep_block {
            kept.push(line);
        }
    }

    if !chosen.is_empty() || profile.projects.is_empty() {
        return enforce_bullet_limit(&kept.join("\n"), config.max_bullets_per_role);
    }

    warn!("No usable projects from the model, using the best matching profile projects");
    let blocks: Vec<String> = rank_projects(&profile.projects, &job.job_description, config.max_projects)
        .into_iter()
        .map(|project| {
            let mut block = match project.date.as_deref() {
                Some(date) => vec![format!("**{}**, {}", project.name, date)],
                None => vec![format!("**{}**", project.name)],
            };
            if project.highlights.is_empty() && !project.description.trim().is_empty() {
                block.push(format!("- {}", project.description.trim()));
            }
            block.extend(project.highlights.iter().map(|h| format!("- {}", h)));
            block.join("\n")
        })
        .collect();
    enforce_bullet_limit(&blocks.join("\n"), config.max_bullets_per_role)
}

fn select_education(raw: &str, profile: &Profile) -> String {
    let text = enforce_bullet_limit(raw, usize::MAX);
    if !text.is_empty() || profile.education.is_empty() {
        return text;
    }

    warn!("Model returned no education, rebuilding it from the profile");
    let blocks: Vec<String> = profile
        .education
        .iter()
        .map(|edu| {
            let dates = edu.period.date_range();
            let mut header = format!("**{}** - {}", edu.degree, edu.institution);
            if !dates.is_empty() {
                header.push_str(&format!(", {}", dates));
            }
            if edu.courses.is_empty() {
                header
            } else {
                format!("{}\n- Relevant Coursework: {}", header, edu.courses.join(", "))
            }
        })
        .collect();
    enforce_bullet_limit(&blocks.join("\n"), usize::MAX)
}

fn format_certification(cert: &Certification) -> String {
    match cert {
        Certification::Named(name) => format!("- {}", name),
        Certification::Detailed { name, issuer, date } => {
            let mut line = format!("- {}", name);
            if let Some(issuer) = issuer {
                line.push_str(&format!(" - {}", issuer));
            }
            if let Some(date) = date {
                line.push_str(&format!(" ({})", date));
            }
            line
        }
    }
}

/// Model lines naming a profile certification; the rest is dropped
fn select_certifications(raw: &str, profile: &Profile) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line)
            .trim();
        if profile.certifications.iter().any(|c| refers_to(entry, c.name())) {
            lines.push(format!("- {}", entry));
        } else {
            warn!("Dropping certification not found in profile: {}", entry);
        }
    }
    if !lines.is_empty() || profile.certifications.is_empty() {
        return lines.join("\n");
    }

    warn!("No usable certifications from the model, listing the profile certifications");
    profile
        .certifications
        .iter()
        .map(format_certification)
        .collect::<Vec<_>>()
        .join("\n")
}

fn select_cover_letter(raw: &str) -> String {
    let body: Vec<&str> = raw
        .lines()
        .filter(|line| {
            let lower = line.trim().to_lowercase();
            !LETTER_FRAME_PREFIXES.iter().any(|p| lower.starts_with(p))
        })
        .collect();
    normalize_spacing(&body.join("\n"))
}
