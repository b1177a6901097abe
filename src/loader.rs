use crate::ast::{Mapping, ParsedDocument};
use crate::error::{ImportError, LoonError};
use crate::parser::Parser;
use crate::utils::has_loon_extension;
use log::debug;
use miette::{NamedSource, SourceSpan};
use std::fs;
use std::path::{Path, PathBuf};

/// Drives parsing of a document and, recursively, of everything it imports.
///
/// One loader lives for one top-level parse. It carries the state that must be
/// shared across files: the import chain (for cycle detection) and the global
/// space registry.
#[derive(Debug, Default)]
pub struct Loader {
    // Files currently being parsed, outermost first.
    resolving_stack: Vec<PathBuf>,
    /// Every closed space by name, across all files. Last writer wins.
    pub spaces: Mapping,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `source` as the contents of `file_path`. Relative imports are
    /// resolved against the directory of `file_path`.
    pub fn load_source(
        &mut self,
        source: &str,
        file_path: PathBuf,
    ) -> Result<ParsedDocument, LoonError> {
        self.resolving_stack.push(canonical_or_self(&file_path));
        let mut parser = Parser::new_with_name(source, file_path);
        let result = parser.parse_document(self);
        self.resolving_stack.pop();
        result
    }

    /// Handles an `@target` line found in `importer`.
    pub(crate) fn import(
        &mut self,
        target: &str,
        importer: &Path,
        src: &NamedSource<String>,
        span: SourceSpan,
    ) -> Result<ParsedDocument, LoonError> {
        let invalid = |reason: &str| -> LoonError {
            ImportError::InvalidTarget {
                path: target.to_string(),
                reason: reason.to_string(),
                src: src.clone(),
                span,
            }
            .into()
        };

        if !has_loon_extension(target) {
            return Err(invalid("imported files must have the .loon extension"));
        }

        let current_dir = importer.parent().unwrap_or_else(|| Path::new("."));
        let path = fs::canonicalize(current_dir.join(target))
            .map_err(|_| invalid("file does not exist"))?;

        if self.resolving_stack.contains(&path) {
            let cycle = self
                .resolving_stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<String>>()
                .join(" -> ");
            return Err(ImportError::Cycle {
                cycle,
                src: src.clone(),
                span,
            }
            .into());
        }

        let source = fs::read_to_string(&path).map_err(|e| ImportError::Io {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;

        debug!("Importing {}", path.display());
        let document = self.load_source(&source, path)?;
        debug!(
            "Imported {} visible and {} hidden label(s) from {}",
            document.labels.len(),
            document.hidden.len(),
            target
        );
        Ok(document)
    }
}

fn canonical_or_self(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
