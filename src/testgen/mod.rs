pub mod materialize;
pub mod pipeline;
pub mod suite;

pub use pipeline::{run_pipeline, PipelineRun};
pub use suite::{GeneratedTest, TestSuite};

use std::io;
use std::path::Path;

/// The C source file under test. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub module: String,
    pub contents: String,
}

impl SourceFile {
    pub fn new(module: impl Into<String>, contents: impl Into<String>) -> Self {
        SourceFile {
            module: module.into(),
            contents: contents.into(),
        }
    }

    /// Load from disk. The module name defaults to the file stem, lowered
    /// to the `[a-z0-9_]` alphabet used in test names.
    pub fn from_path(path: &Path, module_override: Option<String>) -> io::Result<Self> {
        let contents = fs_read(path)?;

        let module = module_override.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("module")
                .to_string()
        });

        Ok(SourceFile::new(normalize_module(&module), contents))
    }
}

fn fs_read(path: &Path) -> io::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to read {}: {e}", path.display()),
        )
    })
}

fn normalize_module(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if normalized.is_empty() {
        "module".to_string()
    } else {
        normalized
    }
}
