use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::testgen::suite::TestSuite;

/* ============================================================
   Public entry
   ============================================================ */

/// Write one file per generated test under `out_dir`, named
/// `test_<module>_<function>.c`. Files whose content already matches are
/// left untouched.
pub fn write_suite(out_dir: &Path, module: &str, suite: &TestSuite) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let module = sanitize_name(module);
    let mut written = Vec::with_capacity(suite.len());

    for test in suite.iter() {
        let function = sanitize_name(&test.function);
        let path = out_dir.join(format!("test_{module}_{function}.c"));
        write_if_changed(&path, &test.code)?;
        written.push(path);
    }

    Ok(written)
}

/* ============================================================
   Helpers
   ============================================================ */

fn write_if_changed(path: &Path, content: &str) -> io::Result<()> {
    let body = format!("{}\n", content.trim_end());

    if let Ok(existing) = fs::read_to_string(path) {
        if existing == body {
            return Ok(());
        }
    }

    fs::write(path, body)
}

fn sanitize_name(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
