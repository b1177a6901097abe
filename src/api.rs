use crate::ast::{Mapping, ParsedDocument};
use crate::error::{ImportError, LoonError};
use crate::loader::Loader;
use crate::resolver::Resolver;
use crate::serialization::{to_value, Value};
use crate::utils::has_loon_extension;
use log::{debug, warn};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// The result of evaluating a LOON document.
///
/// `labels` holds the visible labels with every reference resolved; hidden
/// labels never appear there. The unresolved document is kept for tools that
/// want to inspect references as written.
pub struct AnalysisResult {
    pub labels: Mapping,
    /// Every closed space by name, across the whole import tree. Last writer wins.
    pub spaces: Mapping,
    pub unresolved_document: ParsedDocument,
}

impl Serialize for AnalysisResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.to_value();
        value.serialize(serializer)
    }
}

impl AnalysisResult {
    /// Converts the visible labels into a generic, serializable `Value`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.labels
                .iter()
                .map(|(name, value)| (name.clone(), to_value(value)))
                .collect(),
        )
    }

    /// Serializes the visible labels into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the visible labels into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

/// Parses and evaluates a LOON source string.
///
/// Imports are resolved relative to `file_name`, which is also the name used in
/// diagnostics. All files are parsed first; references are resolved afterwards,
/// so a label may refer to labels defined later or in files imported later.
///
/// # Errors
///
/// Returns a `LoonError` for any syntax, container, reference or import failure.
/// There is no partial result.
pub fn analyze(source: &str, file_name: &str) -> Result<AnalysisResult, LoonError> {
    let (document, loader) = load(source, file_name)?;

    let (labels, spaces) = {
        let mut resolver = Resolver::new(&document.labels, &document.hidden);
        let labels = resolver.resolve_labels(&document.labels)?;
        (labels, resolve_registry(&mut resolver, &loader.spaces))
    };

    Ok(AnalysisResult {
        labels,
        spaces,
        unresolved_document: document,
    })
}

/// Evaluates `source` and returns only the resolved visible labels.
///
/// # Errors
///
/// See [`analyze`].
pub fn evaluate(source: &str, source_path: &Path) -> Result<Mapping, LoonError> {
    let (document, _) = load(source, &source_path.to_string_lossy())?;
    Resolver::new(&document.labels, &document.hidden).resolve_labels(&document.labels)
}

// First pass over `source` and everything it imports.
fn load(source: &str, file_name: &str) -> Result<(ParsedDocument, Loader), LoonError> {
    let mut path = PathBuf::from(file_name);
    if path.is_relative() {
        if let Ok(current_dir) = std::env::current_dir() {
            path = current_dir.join(path);
        }
    }

    let mut loader = Loader::new();
    let document = loader.load_source(source, path)?;
    debug!(
        "Parsed {} visible and {} hidden label(s); resolving references",
        document.labels.len(),
        document.hidden.len()
    );
    Ok((document, loader))
}

/// Resolves the space registry entry by entry. Spaces of hidden labels are
/// never emitted, so one that fails to resolve is left out with a warning
/// instead of failing the document.
fn resolve_registry(resolver: &mut Resolver<'_>, spaces: &Mapping) -> Mapping {
    spaces
        .iter()
        .filter_map(|(name, value)| match resolver.resolve_value(value.clone()) {
            Ok(resolved) => Some((name.clone(), resolved)),
            Err(err) => {
                warn!("Space '{}' left out of the registry: {}", name, err);
                None
            }
        })
        .collect()
}

/// Reads and evaluates a `.loon` file.
///
/// # Errors
///
/// Fails with `ImportError::InvalidEntryFile` if the file does not end in
/// `.loon`, `ImportError::Io` if it cannot be read, and otherwise as [`analyze`].
pub fn analyze_file(path: impl AsRef<Path>) -> Result<AnalysisResult, LoonError> {
    let path = path.as_ref();
    let display = path.to_string_lossy().to_string();
    if !has_loon_extension(path) {
        return Err(ImportError::InvalidEntryFile { path: display }.into());
    }

    let source = std::fs::read_to_string(path).map_err(|e| ImportError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;
    analyze(&source, &display)
}
