// src/job_input.rs
//! Job input from a YAML file or from an interactive terminal session

use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

use crate::core::FsOps;
use crate::error::{PipelineError, Result};
use crate::types::JobInput;

/// Line that ends the pasted job description in interactive mode
pub const SENTINEL: &str = "DONE";

const FALLBACK_COMPANY: &str = "General";

pub async fn from_file(path: &Path) -> Result<JobInput> {
    let content = FsOps::read_input(path)
        .await
        .map_err(PipelineError::config_from)?;
    let job = JobInput::from_yaml_str(&content)
        .map_err(|e| PipelineError::config(format!("{} ({})", e, path.display())))?;
    info!("Loaded job input for {} from {}", job.company, path.display());
    Ok(job)
}

/// Prompt for the company, then collect description lines until the
/// sentinel or end of input.
pub fn interactive<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<JobInput> {
    let io_err = |e: std::io::Error| PipelineError::config(format!("Failed to read job input: {}", e));

    writeln!(output, "\n{}", "=".repeat(50)).map_err(io_err)?;
    writeln!(output, "ENTER COMPANY NAME").map_err(io_err)?;
    writeln!(output, "{}", "=".repeat(50)).map_err(io_err)?;
    write!(output, "Target Company: ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut company = String::new();
    input.read_line(&mut company).map_err(io_err)?;
    let company = match company.trim() {
        "" => FALLBACK_COMPANY.to_string(),
        name => name.to_string(),
    };

    writeln!(output, "\n{}", "=".repeat(50)).map_err(io_err)?;
    writeln!(output, "PASTE JOB DESCRIPTION (type '{}' to finish)", SENTINEL).map_err(io_err)?;
    writeln!(output, "{}", "=".repeat(50)).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut lines = Vec::new();
    for line in input.lines() {
        let line = line.map_err(io_err)?;
        if line.trim() == SENTINEL {
            break;
        }
        lines.push(line);
    }

    JobInput::new(company, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_interactive_stops_at_sentinel() {
        let stdin = Cursor::new("Acme Corp\nWe need Rust.\n  Also SQL.\nDONE\nignored line\n");
        let mut stdout = Vec::new();

        let job = interactive(stdin, &mut stdout).unwrap();

        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.job_description, "We need Rust.\n  Also SQL.");
        assert!(String::from_utf8(stdout).unwrap().contains("Target Company"));
    }

    #[test]
    fn test_interactive_stops_at_eof() {
        let stdin = Cursor::new("Acme\nline one\nline two");
        let job = interactive(stdin, std::io::sink()).unwrap();
        assert_eq!(job.job_description, "line one\nline two");
    }

    #[test]
    fn test_interactive_blank_company_falls_back() {
        let stdin = Cursor::new("\nSome role\n DONE \n");
        let job = interactive(stdin, std::io::sink()).unwrap();
        assert_eq!(job.company, "General");
    }

    #[test]
    fn test_interactive_empty_description_is_config_error() {
        let stdin = Cursor::new("Acme\nDONE\n");
        let err = interactive(stdin, std::io::sink()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_input.yaml");
        std::fs::write(
            &path,
            "company: Acme\njob_description: |\n  Python and SQL.\n",
        )
        .unwrap();

        let job = from_file(&path).await.unwrap();
        assert_eq!(job.company, "Acme");
        assert_eq!(job.job_description, "Python and SQL.");
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let err = from_file(Path::new("/no/such/job.yaml")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
