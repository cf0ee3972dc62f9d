// src/generation/validators.rs
//! Format checks on generated sections. Problems are reported, never fatal.

use regex::Regex;
use std::sync::OnceLock;

use super::selector::{bold_header, mentions, parse_skill_lines, refers_to, tokens};
use super::{GeneratedSection, SectionName};
use crate::config::GenerationConfig;
use crate::types::Profile;

pub const COVER_LETTER_MIN_WORDS: usize = 180;
pub const COVER_LETTER_MAX_WORDS: usize = 350;
pub const COVER_LETTER_MIN_PARAGRAPHS: usize = 3;
const SUMMARY_MAX_LINES: usize = 6;
/// Role titles shorter than this are too generic to check
const MIN_CHECKED_ROLE_CHARS: usize = 4;

/// First names models tend to invent for the candidate or a referee
const COMMON_INVENTED_NAMES: &[&str] = &[
    "alex", "alexander", "john", "michael", "david", "james", "robert", "daniel", "matthew",
    "christopher", "andrew", "joseph", "william", "sarah", "emily", "jessica", "ashley",
    "amanda", "jennifer", "laura", "mark", "thomas", "ryan", "kevin", "brian", "eric",
    "steven", "jason",
];

fn first_person_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(I|my|me)\b").expect("valid regex"))
}

fn certification_format_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-–—].*\([^)]+\)").expect("valid regex"))
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}

/// All format problems found in `section`
pub fn validate(section: &GeneratedSection, config: &GenerationConfig) -> Vec<String> {
    let text = section.text.trim();
    if text.is_empty() {
        return match section.name {
            SectionName::CoverLetter => vec!["Cover letter is empty".to_string()],
            _ => Vec::new(),
        };
    }

    match section.name {
        SectionName::Summary => validate_summary(text),
        SectionName::Skills => validate_skills(text),
        SectionName::Experience => validate_experience(text, config.max_bullets_per_role),
        SectionName::Projects => validate_projects(text, config.max_projects),
        SectionName::Education => validate_education(text),
        SectionName::Certifications => validate_certifications(text),
        SectionName::CoverLetter => validate_cover_letter(text),
    }
}

fn validate_summary(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if lines > SUMMARY_MAX_LINES {
        errors.push(format!(
            "Summary should have at most {} lines, got {}",
            SUMMARY_MAX_LINES, lines
        ));
    }
    if first_person_regex().is_match(text) {
        errors.push("Summary should not use first-person pronouns".to_string());
    }
    errors
}

fn validate_skills(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("**"))
        .map(|l| format!("Skills line is not in '**Category:** skill, skill' format: {}", l))
        .collect()
}

fn validate_experience(text: &str, max_bullets: usize) -> Vec<String> {
    let mut errors = Vec::new();
    let mut bullets = 0;
    let check = |bullets: usize, errors: &mut Vec<String>| {
        if bullets > max_bullets {
            errors.push(format!(
                "Experience role has {} bullets; max {} per role",
                bullets, max_bullets
            ));
        }
    };

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_bullet(line) {
            bullets += 1;
        } else {
            check(bullets, &mut errors);
            bullets = 0;
        }
    }
    check(bullets, &mut errors);
    errors
}

fn validate_projects(text: &str, expected: usize) -> Vec<String> {
    let blocks = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("**"))
        .count();
    if blocks < expected {
        vec![format!(
            "Projects should have {} blocks starting with **Project Name**, found {}",
            expected, blocks
        )]
    } else {
        Vec::new()
    }
}

fn validate_education(text: &str) -> Vec<String> {
    if text.lines().any(|l| l.trim().starts_with("**")) {
        Vec::new()
    } else {
        vec!["Education should contain degree lines formatted as **Degree** - Institution, Dates".to_string()]
    }
}

fn validate_certifications(text: &str) -> Vec<String> {
    let has_bullets = text.lines().any(|l| is_bullet(l.trim()));
    if has_bullets && !certification_format_regex().is_match(text) {
        vec!["Certifications should use format: - Name - Issuer (Year)".to_string()]
    } else {
        Vec::new()
    }
}

fn validate_cover_letter(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let words = text.split_whitespace().count();
    if words < COVER_LETTER_MIN_WORDS {
        errors.push(format!(
            "Cover letter should have at least {} words, got {}",
            COVER_LETTER_MIN_WORDS, words
        ));
    }
    if words > COVER_LETTER_MAX_WORDS {
        errors.push(format!(
            "Cover letter should have at most {} words, got {}",
            COVER_LETTER_MAX_WORDS, words
        ));
    }
    let paragraphs = text.split("\n\n").filter(|p| !p.trim().is_empty()).count();
    if paragraphs < COVER_LETTER_MIN_PARAGRAPHS {
        errors.push(format!(
            "Cover letter should have at least {} paragraphs, got {}",
            COVER_LETTER_MIN_PARAGRAPHS, paragraphs
        ));
    }
    errors
}

// ===== Profile consistency =====

/// Claims in `section` that the profile does not back up
pub fn fact_check(section: &GeneratedSection, profile: &Profile) -> Vec<String> {
    let text = section.text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    match section.name {
        SectionName::Experience => check_experience_facts(text, profile),
        SectionName::Projects => text
            .lines()
            .filter_map(bold_header)
            .filter(|name| !profile.projects.iter().any(|p| refers_to(name, &p.name)))
            .map(|name| format!("Project '{}' is not in the profile", name))
            .collect(),
        SectionName::Certifications => text
            .lines()
            .map(str::trim)
            .filter_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("* ")))
            .filter(|entry| !profile.certifications.iter().any(|c| refers_to(entry, c.name())))
            .map(|entry| format!("Certification '{}' is not in the profile", entry.trim()))
            .collect(),
        SectionName::Skills => check_skill_facts(text, profile),
        SectionName::Education => {
            let found = tokens(text);
            profile
                .education
                .iter()
                .filter(|e| !mentions(&found, &e.institution))
                .map(|e| format!("Institution '{}' from the profile is missing", e.institution))
                .collect()
        }
        SectionName::Summary | SectionName::CoverLetter => Vec::new(),
    }
}

fn check_experience_facts(text: &str, profile: &Profile) -> Vec<String> {
    let found = tokens(text);
    let mut errors = Vec::new();

    for exp in &profile.experience {
        let Some(first_word) = tokens(&exp.employer).into_iter().next() else {
            continue;
        };
        if !mentions(&found, &exp.employer) && !found.contains(&first_word) {
            errors.push(format!("Employer '{}' from the profile is missing", exp.employer));
        }
        if exp.role.trim().chars().count() >= MIN_CHECKED_ROLE_CHARS && !mentions(&found, &exp.role) {
            errors.push(format!("Role '{}' is missing or reworded", exp.role));
        }
    }

    for employer in text.lines().filter_map(header_employer) {
        if !profile.experience.iter().any(|e| refers_to(employer, &e.employer)) {
            errors.push(format!("Employer '{}' is not in the profile", employer));
        }
    }
    errors
}

/// `Employer` in a `**Role**, Employer, Location` header
fn header_employer(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("**")?;
    let (_, after) = rest.split_once("**")?;
    let employer = after.trim_start().strip_prefix(',')?.split(',').next()?.trim();
    (!employer.is_empty()).then_some(employer)
}

fn check_skill_facts(text: &str, profile: &Profile) -> Vec<String> {
    let known: Vec<String> = profile
        .all_skills()
        .iter()
        .chain(&profile.soft_skills)
        .map(|s| s.trim().to_lowercase())
        .collect();

    parse_skill_lines(text)
        .into_iter()
        // the spoken-languages line is built from the profile itself
        .filter(|line| !line.category.eq_ignore_ascii_case("languages"))
        .flat_map(|line| line.skills)
        .filter(|skill| !known.contains(&skill.to_lowercase()))
        .map(|skill| format!("Skill '{}' is not in the profile", skill))
        .collect()
}

/// Person names other than the candidate's
pub fn profile_match(section: &GeneratedSection, profile: &Profile) -> Vec<String> {
    let own_name = tokens(&profile.basics.name);
    let found = tokens(&section.text);

    COMMON_INVENTED_NAMES
        .iter()
        .filter(|name| {
            !own_name.iter().any(|part| part == *name) && found.iter().any(|word| word == *name)
        })
        .map(|name| {
            format!(
                "Name '{}' appears; only the candidate ({}) should be named",
                name, profile.basics.name
            )
        })
        .collect()
}
