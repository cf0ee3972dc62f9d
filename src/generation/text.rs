// src/generation/text.rs
//! Clean-up of raw model output before it reaches a template

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Conversational openers the model tends to add around the requested content
const BANNED_PREFIXES: &[&str] = &[
    "Here is",
    "Here are",
    "Below is",
    "Sure,",
    "Certainly",
    "Note:",
    "I selected",
    "I've selected",
    "Based on",
    "These",
    "This demonstrates",
    "Let me know",
    "In this version",
    "The following",
    "Here's",
    "Note that ",
];

/// Lines starting with one of these are dropped, case-insensitively
const BANNED_LINE_STARTS: &[&str] = &[
    "---",
    "### Follow Up Question",
    "### Additional",
    "### Follow-up",
    "### Followup",
    "### Next Steps",
    "### Note:",
];

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("valid regex"))
        }
    };
}

cached_regex!(hex_escape_regex, r"\\x([0-9A-Fa-f]{2})");
cached_regex!(unicode_escape_regex, r"\\u([0-9A-Fa-f]{4})");
cached_regex!(code_fence_regex, r"```[a-zA-Z]*");
cached_regex!(json_object_regex, r"(?s)\{.*\}");
cached_regex!(skill_line_regex, r"^\*\*.+?\*\*:|^\*\*.+?:\*\*");

fn decode_escape(caps: &Captures) -> String {
    u32::from_str_radix(&caps[1], 16)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| caps[0].to_string())
}

/// Turn literal `\xNN` and `\uNNNN` sequences into the characters they name
pub fn fix_unicode_escapes(text: &str) -> String {
    let text = hex_escape_regex().replace_all(text, decode_escape);
    unicode_escape_regex()
        .replace_all(&text, decode_escape)
        .into_owned()
}

/// Strip code fences, chatty preambles, horizontal rules and trailing
/// "next steps" style headings from model output.
pub fn clean_ai_output(text: &str) -> String {
    let text = fix_unicode_escapes(text);
    let text = code_fence_regex().replace_all(&text, "");

    let lines: Vec<&str> = text
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            let lower = trimmed.to_lowercase();
            let banned_start = BANNED_LINE_STARTS
                .iter()
                .any(|p| lower.starts_with(&p.to_lowercase()));
            let banned_prefix = BANNED_PREFIXES.iter().any(|p| trimmed.starts_with(p));
            !banned_start && !banned_prefix
        })
        .collect();

    lines.join("\n").trim().to_string()
}

/// First `{ ... }` span in the text parsed as JSON
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let found = json_object_regex().find(text)?;
    serde_json::from_str(found.as_str()).ok()
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}

/// Keep at most `max_bullets` bullets under each header line. Blank lines
/// are dropped and a single blank line is put before every header after
/// the first.
pub fn enforce_bullet_limit(text: &str, max_bullets: usize) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    let mut count = 0;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_bullet(line) {
            if count < max_bullets {
                cleaned.push(line);
                count += 1;
            }
        } else {
            if !cleaned.is_empty() {
                cleaned.push("");
            }
            cleaned.push(line);
            count = 0;
        }
    }

    cleaned.join("\n")
}

/// Keep only `**Category:** a, b` lines
pub fn clean_skills_output(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| skill_line_regex().is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One blank line between every non-empty line so pandoc keeps them apart
pub fn normalize_spacing(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
