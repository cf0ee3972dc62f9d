// src/core/converter.rs
//! Markdown to PDF conversion through pandoc and a LaTeX engine

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PdfConfig;
use crate::core::template_engine::{
    TemplateEngine, DEFAULT_PDFLATEX_TEMPLATE, DEFAULT_XELATEX_TEMPLATE,
};
use crate::error::{PipelineError, Result};

/// Typesetting engine handed to pandoc. Xelatex is preferred; pdflatex is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfEngine {
    Xelatex,
    Pdflatex,
}

impl PdfEngine {
    pub const PREFERENCE: [PdfEngine; 2] = [PdfEngine::Xelatex, PdfEngine::Pdflatex];

    pub fn binary(&self) -> &'static str {
        match self {
            PdfEngine::Xelatex => "xelatex",
            PdfEngine::Pdflatex => "pdflatex",
        }
    }

    /// File name of the typesetting template inside the templates directory
    pub fn template_file(&self) -> &'static str {
        match self {
            PdfEngine::Xelatex => "resume_xelatex.tex",
            PdfEngine::Pdflatex => "resume_pdflatex.tex",
        }
    }

    fn builtin_template(&self) -> &'static str {
        match self {
            PdfEngine::Xelatex => DEFAULT_XELATEX_TEMPLATE,
            PdfEngine::Pdflatex => DEFAULT_PDFLATEX_TEMPLATE,
        }
    }
}

impl std::fmt::Display for PdfEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// Looks up executables in an ordered list of directories
#[derive(Debug, Clone)]
pub struct ToolProbe {
    search_dirs: Vec<PathBuf>,
}

impl ToolProbe {
    /// `PATH` entries followed by `extra_dirs`
    pub fn from_env(extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        search_dirs.extend(extra_dirs.iter().cloned());
        Self { search_dirs }
    }

    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// Resolve `program`. Anything containing a path separator is taken as a path.
    pub fn find(&self, program: &str) -> Option<PathBuf> {
        let as_path = Path::new(program);
        if as_path.components().count() > 1 {
            return is_executable(as_path).then(|| as_path.to_path_buf());
        }

        self.search_dirs
            .iter()
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    /// First available engine in preference order
    pub fn select_engine(&self) -> Option<(PdfEngine, PathBuf)> {
        PdfEngine::PREFERENCE.iter().find_map(|engine| {
            let found = self.find(engine.binary());
            if found.is_none() {
                debug!("{} not found", engine);
            }
            found.map(|path| (*engine, path))
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

/// Escape LaTeX special characters and normalise typographic punctuation
pub fn latex_escape(text: &str) -> String {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len());
    for c in collapsed.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            other => out.push(other),
        }
    }
    out
}

pub struct DocumentConverter {
    pandoc: String,
    probe: ToolProbe,
    templates_dir: PathBuf,
}

impl DocumentConverter {
    pub fn new(config: &PdfConfig, templates_dir: PathBuf) -> Self {
        Self {
            pandoc: config.pandoc.clone(),
            probe: ToolProbe::from_env(&config.extra_tex_dirs),
            templates_dir,
        }
    }

    pub fn with_probe(pandoc: String, probe: ToolProbe, templates_dir: PathBuf) -> Self {
        Self {
            pandoc,
            probe,
            templates_dir,
        }
    }

    /// Convert `md_path` into `pdf_path`. With `template_values`, the
    /// engine-specific typesetting template is filled (values LaTeX-escaped)
    /// and passed to pandoc; without, pandoc's default template is used.
    pub async fn convert(
        &self,
        md_path: &Path,
        pdf_path: &Path,
        template_values: Option<&HashMap<String, String>>,
    ) -> Result<PdfEngine> {
        let pandoc = self.probe.find(&self.pandoc).ok_or_else(|| {
            PipelineError::conversion(format!("Converter '{}' not found", self.pandoc))
        })?;

        let (engine, engine_path) = self.probe.select_engine().ok_or_else(|| {
            PipelineError::conversion("Neither xelatex nor pdflatex is installed")
        })?;
        if engine != PdfEngine::Xelatex {
            warn!("xelatex not found, falling back to {}", engine);
        }
        info!("Converting {} with {}", md_path.display(), engine);

        // Kept alive until pandoc exits
        let template_file = match template_values {
            Some(values) => Some(self.write_typesetting_template(engine, values).await?),
            None => None,
        };

        let mut cmd = Command::new(&pandoc);
        cmd.arg(md_path)
            .arg("-o")
            .arg(pdf_path)
            .arg(format!("--pdf-engine={}", engine_path.display()))
            .arg("--wrap=preserve");
        if let Some(file) = &template_file {
            cmd.arg(format!("--template={}", file.path().display()));
        }

        let output = cmd.output().await.map_err(|e| {
            PipelineError::conversion(format!("Failed to execute {}: {}", pandoc.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::conversion(format!(
                "pandoc exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!("PDF created: {} ({})", pdf_path.display(), engine);
        Ok(engine)
    }

    async fn write_typesetting_template(
        &self,
        engine: PdfEngine,
        values: &HashMap<String, String>,
    ) -> Result<tempfile::NamedTempFile> {
        let path = self.templates_dir.join(engine.template_file());
        let template = TemplateEngine::load(&path, engine.builtin_template()).await?;

        let escaped: HashMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.clone(), latex_escape(v)))
            .collect();
        let filled = TemplateEngine::render(&template, &escaped)?;

        let mut file = tempfile::Builder::new()
            .prefix("cv_tailor_")
            .suffix(".tex")
            .tempfile()
            .map_err(|e| PipelineError::conversion(format!("Failed to create template file: {}", e)))?;
        file.write_all(filled.as_bytes())
            .map_err(|e| PipelineError::conversion(format!("Failed to write template file: {}", e)))?;

        debug!("Typesetting template written to {}", file.path().display());
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latex_escape() {
        assert_eq!(latex_escape("R&D 100% $5 #1 a_b"), r"R\&D 100\% \$5 \#1 a\_b");
        assert_eq!(latex_escape("{x} ~ ^ \\"), r"\{x\} \textasciitilde{} \textasciicircum{} \textbackslash{}");
        assert_eq!(latex_escape("\u{201C}Hi\u{201D} \u{2014}  there"), "\"Hi\" - there");
    }

    #[test]
    fn test_engine_names() {
        assert_eq!(PdfEngine::Xelatex.to_string(), "xelatex");
        assert_eq!(PdfEngine::Pdflatex.template_file(), "resume_pdflatex.tex");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        const FAKE_PANDOC: &str = r#"#!/bin/sh
dir=$(dirname "$0")
out=""
while [ $# -gt 0 ]; do
  echo "$1" >> "$dir/pandoc.args"
  if [ "$1" = "-o" ]; then
    shift
    out="$1"
    echo "$1" >> "$dir/pandoc.args"
  fi
  shift
done
printf '%%PDF-fake' > "$out"
"#;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        /// Collects formatted log output written while it is the default subscriber
        #[derive(Clone, Default)]
        struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

        impl std::io::Write for LogCapture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
            type Writer = LogCapture;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        impl LogCapture {
            fn contents(&self) -> String {
                String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
            }
        }

        fn basics() -> HashMap<String, String> {
            ["name", "title", "email", "phone", "location", "linkedin", "website"]
                .iter()
                .map(|k| (k.to_string(), format!("{}_value", k)))
                .collect()
        }

        #[test]
        fn test_probe_prefers_xelatex() {
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "pdflatex", "#!/bin/sh\n");
            script(bin.path(), "xelatex", "#!/bin/sh\n");

            let probe = ToolProbe::with_dirs(vec![bin.path().to_path_buf()]);
            let (engine, _) = probe.select_engine().unwrap();
            assert_eq!(engine, PdfEngine::Xelatex);
        }

        #[test]
        fn test_probe_ignores_non_executable_files() {
            let bin = tempfile::tempdir().unwrap();
            std::fs::write(bin.path().join("xelatex"), "not executable").unwrap();
            let probe = ToolProbe::with_dirs(vec![bin.path().to_path_buf()]);
            assert!(probe.select_engine().is_none());
        }

        #[tokio::test]
        async fn test_falls_back_to_pdflatex() {
            let bin = tempfile::tempdir().unwrap();
            let pandoc = script(bin.path(), "pandoc", FAKE_PANDOC);
            script(bin.path(), "pdflatex", "#!/bin/sh\n");
            let out = tempfile::tempdir().unwrap();
            let md = out.path().join("CV_Acme_2024-05-01.md");
            let pdf = out.path().join("CV_Acme_2024-05-01.pdf");
            std::fs::write(&md, "# Jane").unwrap();

            let converter = DocumentConverter::with_probe(
                pandoc.display().to_string(),
                ToolProbe::with_dirs(vec![bin.path().to_path_buf()]),
                out.path().join("templates"),
            );
            let engine = converter.convert(&md, &pdf, Some(&basics())).await.unwrap();

            assert_eq!(engine, PdfEngine::Pdflatex);
            assert!(pdf.exists());
            let args = std::fs::read_to_string(bin.path().join("pandoc.args")).unwrap();
            assert!(args.contains("pdflatex"));
            assert!(args.contains("--template="));
            assert!(args.contains("--wrap=preserve"));
        }

        #[tokio::test]
        async fn test_log_names_engine_used() {
            let logs = LogCapture::default();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(logs.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();
            let _guard = tracing::subscriber::set_default(subscriber);

            let bin = tempfile::tempdir().unwrap();
            let pandoc = script(bin.path(), "pandoc", FAKE_PANDOC);
            script(bin.path(), "pdflatex", "#!/bin/sh\n");
            let out = tempfile::tempdir().unwrap();
            let md = out.path().join("CoverLetter_Acme_2024-05-01.md");
            let pdf = out.path().join("CoverLetter_Acme_2024-05-01.pdf");
            std::fs::write(&md, "Dear team").unwrap();

            let converter = DocumentConverter::with_probe(
                pandoc.display().to_string(),
                ToolProbe::with_dirs(vec![bin.path().to_path_buf()]),
                out.path().join("templates"),
            );
            converter.convert(&md, &pdf, None).await.unwrap();

            let logged = logs.contents();
            assert!(logged.contains("xelatex not found, falling back to pdflatex"));
            assert!(logged.contains("PDF created"));
            assert!(logged.contains("(pdflatex)"));
        }

        #[tokio::test]
        async fn test_no_engine_is_conversion_error() {
            let bin = tempfile::tempdir().unwrap();
            let pandoc = script(bin.path(), "pandoc", FAKE_PANDOC);
            let converter = DocumentConverter::with_probe(
                pandoc.display().to_string(),
                ToolProbe::with_dirs(vec![bin.path().to_path_buf()]),
                bin.path().to_path_buf(),
            );

            let err = converter
                .convert(Path::new("a.md"), Path::new("a.pdf"), None)
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::Conversion(_)));
        }

        #[tokio::test]
        async fn test_non_zero_exit_carries_stderr() {
            let bin = tempfile::tempdir().unwrap();
            let pandoc = script(bin.path(), "pandoc", "#!/bin/sh\necho 'LaTeX Error: boom' >&2\nexit 43\n");
            script(bin.path(), "xelatex", "#!/bin/sh\n");

            let converter = DocumentConverter::with_probe(
                pandoc.display().to_string(),
                ToolProbe::with_dirs(vec![bin.path().to_path_buf()]),
                bin.path().to_path_buf(),
            );
            let err = converter
                .convert(Path::new("a.md"), Path::new("a.pdf"), None)
                .await
                .unwrap_err();
            match err {
                PipelineError::Conversion(msg) => assert!(msg.contains("LaTeX Error: boom")),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_missing_pandoc() {
            let bin = tempfile::tempdir().unwrap();
            script(bin.path(), "xelatex", "#!/bin/sh\n");
            let converter = DocumentConverter::with_probe(
                "pandoc".to_string(),
                ToolProbe::with_dirs(vec![bin.path().to_path_buf()]),
                bin.path().to_path_buf(),
            );
            let err = converter
                .convert(Path::new("a.md"), Path::new("a.pdf"), None)
                .await
                .unwrap_err();
            match err {
                PipelineError::Conversion(msg) => assert!(msg.contains("pandoc")),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }
}
