//! services/web/src/adapters/snippets.rs
//!
//! File-backed implementation of the `SnippetStore` port. Resolves a
//! page's code listing reference to its source text plus the
//! SyntaxHighlighter brush and script for the listing's file extension.

use async_trait::async_trait;
use std::path::PathBuf;
use survey_core::domain::CodeSnippet;
use survey_core::ports::{PortError, PortResult, SnippetStore};

/// Maps a file extension to its (brush alias, highlighter script) pair.
const SH_BRUSHES: &[(&str, &str, &str)] = &[
    ("sh", "bash", "shBrushBash.js"),
    ("adb", "ada", "shBrushAda.js"),
    ("c", "c", "shBrushCpp.js"),
    ("cs", "csharp", "shBrushCSharp.js"),
    ("cpp", "cpp", "shBrushCpp.js"),
    ("css", "css", "shBrushCss.js"),
    ("js", "js", "shBrushJScript.js"),
    ("java", "java", "shBrushJava.js"),
    ("pl", "perl", "shBrushPerl.js"),
    ("php", "php", "shBrushPhp.js"),
    ("txt", "text", "shBrushPlain.js"),
    ("ps", "powershell", "shBrushPowerShell.js"),
    ("py", "python", "shBrushPython.js"),
    ("rb", "ruby", "shBrushRuby.js"),
    ("sql", "sql", "shBrushSql.js"),
];

fn brush_for_extension(ext: &str) -> Option<(&'static str, &'static str)> {
    SH_BRUSHES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, brush, script)| (*brush, *script))
}

/// A snippet store reading code listings from the config directory.
pub struct FileSnippetStore {
    dir: PathBuf,
}

impl FileSnippetStore {
    /// Creates a new `FileSnippetStore` rooted at `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl SnippetStore for FileSnippetStore {
    async fn load(&self, file: &str) -> PortResult<CodeSnippet> {
        if file.contains("..") || file.contains('/') || file.contains('\\') {
            return Err(PortError::NotFound(format!("Invalid snippet reference '{}'", file)));
        }

        let ext = file.rsplit('.').next().unwrap_or("");
        let (brush, script) = brush_for_extension(ext).ok_or_else(|| {
            PortError::NotFound(format!("No highlighter for snippet '{}'", file))
        })?;

        let source = tokio::fs::read_to_string(self.dir.join(file))
            .await
            .map_err(|e| PortError::NotFound(format!("Snippet '{}' unreadable: {}", file, e)))?;

        Ok(CodeSnippet {
            source,
            brush: brush.to_string(),
            script: script.to_string(),
        })
    }
}
