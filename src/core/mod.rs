// src/core/mod.rs
//! Core services shared by the generation pipeline

pub mod converter;
pub mod fs_ops;
pub mod output;
pub mod prompt_catalog;
pub mod service_client;
pub mod template_engine;

pub use converter::{DocumentConverter, PdfEngine, ToolProbe};
pub use fs_ops::FsOps;
pub use output::{ArtifactPaths, DocumentKind, OutputWriter};
pub use prompt_catalog::PromptCatalog;
pub use service_client::{InferenceBackend, OllamaClient};
pub use template_engine::TemplateEngine;
