use crate::ast::{LoonValue, Mapping, ParsedDocument, RefOrigin, SpaceContent};
use crate::error::{LoonError, MixedContainerError, ReferenceError, SyntaxError};
use crate::infer::infer_value;
use crate::lexer::{Lexer, Line, LineKind};
use crate::loader::Loader;
use crate::resolver::{RefPath, Resolver};
use crate::utils::is_valid_name;
use log::{debug, trace, warn};
use miette::NamedSource;
use std::path::PathBuf;
use std::sync::Arc;

/// An entry waiting in a label body until `end` folds it into the label's mapping.
#[derive(Debug, Clone, PartialEq)]
enum LabelItem {
    /// Stored under its key (assignments, closed spaces, wrapped injections).
    Entry(String, LoonValue),
    /// Merged key by key into the label.
    Merge(Mapping),
    /// A bare scalar. It becomes a key mapped to `null`.
    Bare(LoonValue),
}

#[derive(Debug)]
struct OpenSpace {
    name: String,
    content: SpaceContent,
    opened_at: (usize, usize),
}

#[derive(Debug)]
struct OpenLabel {
    name: String,
    hidden: bool,
    items: Vec<LabelItem>,
    space: Option<OpenSpace>,
    opened_at: (usize, usize),
}

/// What a line contributes to the current container.
enum Insertion {
    Pair(String, LoonValue),
    Item(LoonValue),
    Merge(Mapping),
}

/// The line-driven evaluator for one LOON file.
///
/// Lines move the parser between three states: no open label, inside a label,
/// and inside a space of that label. Labels are committed on `end`; references
/// are left as placeholders for [`Resolver`] to fill in once every file is parsed.
#[derive(Debug)]
pub struct Parser {
    source: Arc<NamedSource<String>>,
    lines: Vec<Line>,
    file_path: PathBuf,
    document: ParsedDocument,
    current: Option<OpenLabel>,
}

impl Parser {
    pub fn new(source_text: &str) -> Self {
        Self::new_with_name(source_text, PathBuf::from("source.loon"))
    }

    pub fn new_with_name(source_text: &str, file_path: PathBuf) -> Self {
        let source = Arc::new(NamedSource::new(
            file_path.to_string_lossy().to_string(),
            source_text.to_string(),
        ));
        let lines = Lexer::new(source_text).lex();

        Self {
            source,
            lines,
            file_path,
            document: ParsedDocument::new(),
            current: None,
        }
    }

    /// Evaluates every line. Imports are parsed through `loader`, which also
    /// receives every closed space.
    pub fn parse_document(&mut self, loader: &mut Loader) -> Result<ParsedDocument, LoonError> {
        let lines = std::mem::take(&mut self.lines);
        for line in &lines {
            trace!("{}:{} {:?}", self.file_path.display(), line.number, line.kind);
            self.parse_line(line, loader)?;
        }

        if let Some(label) = &self.current {
            return Err(match &label.space {
                Some(space) => SyntaxError::UnclosedSpace {
                    name: space.name.clone(),
                    src: self.src(),
                    span: space.opened_at.into(),
                },
                None => SyntaxError::UnclosedLabel {
                    name: label.name.clone(),
                    src: self.src(),
                    span: label.opened_at.into(),
                },
            }
            .into());
        }

        Ok(std::mem::take(&mut self.document))
    }

    fn parse_line(&mut self, line: &Line, loader: &mut Loader) -> Result<(), LoonError> {
        match &line.kind {
            LineKind::LabelOpen { name, hidden } => self.open_label(line, name, *hidden),
            LineKind::SpaceOpen(name) => self.open_space(line, name),
            LineKind::SpaceClose => self.close_space(line, loader),
            LineKind::LabelClose => self.close_label(line),
            LineKind::Assignment { key, value } => self.assign(line, key, value),
            LineKind::Import(target) => self.import(line, target, loader),
            LineKind::Injection { target, value_only } => self.inject(line, target, *value_only),
            LineKind::Bare(text) => self.bare(line, text),
        }
    }

    // === Labels and spaces ===

    fn open_label(&mut self, line: &Line, name: &str, hidden: bool) -> Result<(), LoonError> {
        if let Some(open) = &self.current {
            return Err(SyntaxError::UnclosedLabel {
                name: open.name.clone(),
                src: self.src(),
                span: open.opened_at.into(),
            }
            .into());
        }
        self.check_name(line, "label", name)?;

        self.current = Some(OpenLabel {
            name: name.to_string(),
            hidden,
            items: Vec::new(),
            space: None,
            opened_at: line.span(),
        });
        Ok(())
    }

    fn open_space(&mut self, line: &Line, name: &str) -> Result<(), LoonError> {
        let label = self.require_label(line)?;
        if let Some(open) = &label.space {
            return Err(SyntaxError::NestedSpace {
                name: name.to_string(),
                open: open.name.clone(),
                src: self.src(),
                span: open.opened_at.into(),
            }
            .into());
        }
        self.check_name(line, "space", name)?;

        if let Some(label) = self.current.as_mut() {
            label.space = Some(OpenSpace {
                name: name.to_string(),
                content: SpaceContent::Empty,
                opened_at: line.span(),
            });
        }
        Ok(())
    }

    fn close_space(&mut self, line: &Line, loader: &mut Loader) -> Result<(), LoonError> {
        let Some(space) = self.current.as_mut().and_then(|label| label.space.take()) else {
            return Err(SyntaxError::NoOpenSpace {
                src: self.src(),
                span: line.span().into(),
            }
            .into());
        };

        let value = space.content.into_value();
        debug!("Closed space '{}' as {}", space.name, value.kind_name());
        loader.spaces.insert(space.name.clone(), value.clone());
        if let Some(label) = self.current.as_mut() {
            label.items.push(LabelItem::Entry(space.name, value));
        }
        Ok(())
    }

    fn close_label(&mut self, line: &Line) -> Result<(), LoonError> {
        let label = self.require_label(line)?;
        if let Some(space) = &label.space {
            return Err(SyntaxError::UnclosedSpace {
                name: space.name.clone(),
                src: self.src(),
                span: space.opened_at.into(),
            }
            .into());
        }

        let Some(label) = self.current.take() else {
            return Ok(());
        };
        let body = fold_items(label.items);
        debug!(
            "Committed {} label '{}' ({} keys)",
            if label.hidden { "hidden" } else { "visible" },
            label.name,
            body.len()
        );
        self.commit_label(label.name, label.hidden, body);
        Ok(())
    }

    fn commit_label(&mut self, name: String, hidden: bool, body: Mapping) {
        let doc = &mut self.document;
        let (target, other) = if hidden {
            (&mut doc.hidden, &mut doc.labels)
        } else {
            (&mut doc.labels, &mut doc.hidden)
        };

        let moved = other.shift_remove(&name).is_some();
        if moved || target.contains_key(&name) {
            warn!("Label '{}' is defined more than once; the last definition wins", name);
        }
        target.insert(name, LoonValue::Mapping(body));
    }

    // === Content lines ===

    fn assign(&mut self, line: &Line, key: &str, value: &str) -> Result<(), LoonError> {
        self.require_label(line)?;
        if key.is_empty() {
            return Err(SyntaxError::MissingKey {
                src: self.src(),
                span: line.span().into(),
            }
            .into());
        }

        let key = match key.strip_prefix('$') {
            Some(alias) => self.alias_key(line, alias.trim())?,
            None => key.to_string(),
        };
        let value = self.infer(line, value)?;
        self.insert(line, Insertion::Pair(key, value))
    }

    fn bare(&mut self, line: &Line, text: &str) -> Result<(), LoonError> {
        let value = self.infer(line, text)?;
        self.insert(line, Insertion::Item(value))
    }

    /// `$alias = value`: the key is the name of an already declared label, space or field.
    fn alias_key(&self, line: &Line, alias: &str) -> Result<String, LoonError> {
        let path = self.ref_path(line, alias)?;
        let missing = match Resolver::new(&self.document.labels, &self.document.hidden).lookup(&path) {
            Ok(Some(_)) => return Ok(path.identity_name().to_string()),
            Ok(None) => path.identity_name().to_string(),
            Err(name) => name,
        };
        Err(ReferenceError::AliasTargetNotFound {
            alias: alias.to_string(),
            name: missing,
            src: self.src(),
            span: line.span().into(),
        }
        .into())
    }

    /// `-> ref` merges `{name: value}`, `-> ref&` the value itself. The target
    /// must already be defined; injection is never deferred.
    fn inject(&mut self, line: &Line, target: &str, value_only: bool) -> Result<(), LoonError> {
        self.require_label(line)?;
        let path = self.ref_path(line, target)?;

        let found = Resolver::new(&self.document.labels, &self.document.hidden).lookup(&path);
        let value = match found {
            Ok(Some(value)) => value.clone(),
            Ok(None) => return Err(self.not_found(line, target, path.identity_name())),
            Err(name) => return Err(self.not_found(line, target, &name)),
        };

        if !value_only {
            let mut entries = Mapping::new();
            entries.insert(path.identity_name().to_string(), value);
            return self.insert(line, Insertion::Merge(entries));
        }

        if let Some(label) = self.current.as_ref().filter(|label| label.space.is_none()) {
            if matches!(value, LoonValue::List(_) | LoonValue::Null) {
                return Err(ReferenceError::InvalidInjection {
                    reference: target.to_string(),
                    found: value.kind_name().to_string(),
                    label: label.name.clone(),
                    src: self.src(),
                    span: line.span().into(),
                }
                .into());
            }
        }
        self.insert(line, Insertion::Item(value))
    }

    /// `@file.loon`: at top level the imported labels join this document; inside a
    /// label they are nested as one mapping under the label's name (or appended to
    /// the open space).
    fn import(&mut self, line: &Line, target: &str, loader: &mut Loader) -> Result<(), LoonError> {
        let imported = loader.import(target, &self.file_path, &self.source, line.span().into())?;
        let doc = &mut self.document;

        let Some(label) = self.current.as_mut() else {
            for (name, value) in imported.labels {
                if doc.labels.contains_key(&name) || doc.hidden.shift_remove(&name).is_some() {
                    warn!("Import of '{}' overwrites label '{}'", target, name);
                }
                doc.labels.insert(name, value);
            }
            doc.hidden.extend(imported.hidden);
            return Ok(());
        };

        // Nested labels stay reachable by reference without becoming output labels.
        let nested = LoonValue::Mapping(imported.labels.clone());
        doc.hidden.extend(imported.labels);
        doc.hidden.extend(imported.hidden);

        match label.space.as_mut() {
            Some(space) => space.content.push_item(nested),
            None => label
                .items
                .push(LabelItem::Entry(label.name.clone(), nested)),
        }
        Ok(())
    }

    fn insert(&mut self, line: &Line, insertion: Insertion) -> Result<(), LoonError> {
        let Some(label) = self.current.as_mut() else {
            return Err(SyntaxError::NoOpenLabel {
                construct: line.text.clone(),
                src: (*self.source).clone(),
                span: line.span().into(),
            }
            .into());
        };

        let Some(space) = label.space.as_mut() else {
            label.items.push(match insertion {
                Insertion::Pair(key, value) => LabelItem::Entry(key, value),
                Insertion::Item(LoonValue::UnresolvedRef(mut reference)) => {
                    let key = RefPath::parse(&reference.expr)
                        .map(|path| path.identity_name().to_string())
                        .unwrap_or_else(|| reference.expr.clone());
                    reference.merge = true;
                    LabelItem::Entry(key, LoonValue::UnresolvedRef(reference))
                }
                Insertion::Item(LoonValue::Mapping(entries)) | Insertion::Merge(entries) => {
                    LabelItem::Merge(entries)
                }
                Insertion::Item(value) => LabelItem::Bare(value),
            });
            return Ok(());
        };

        let conflict = match insertion {
            Insertion::Pair(key, value) => space.content.insert_pair(key, value).err().map(|_| "key-value"),
            Insertion::Merge(entries) => space
                .content
                .merge_mapping(entries)
                .err()
                .map(|_| "structured injection"),
            Insertion::Item(value) => {
                space.content.push_item(value);
                None
            }
        };

        match conflict {
            Some(attempted) => Err(MixedContainerError {
                space: space.name.clone(),
                attempted: attempted.to_string(),
                src: (*self.source).clone(),
                span: line.span().into(),
            }
            .into()),
            None => Ok(()),
        }
    }

    // === Helpers ===

    fn src(&self) -> NamedSource<String> {
        (*self.source).clone()
    }

    fn require_label(&self, line: &Line) -> Result<&OpenLabel, LoonError> {
        self.current.as_ref().ok_or_else(|| {
            SyntaxError::NoOpenLabel {
                construct: line.text.clone(),
                src: self.src(),
                span: line.span().into(),
            }
            .into()
        })
    }

    fn check_name(&self, line: &Line, construct: &str, name: &str) -> Result<(), LoonError> {
        if is_valid_name(name) {
            return Ok(());
        }
        Err(SyntaxError::InvalidName {
            construct: construct.to_string(),
            name: name.to_string(),
            src: self.src(),
            span: line.span().into(),
        }
        .into())
    }

    fn ref_path(&self, line: &Line, expr: &str) -> Result<RefPath, LoonError> {
        RefPath::parse(expr).ok_or_else(|| {
            SyntaxError::MalformedReference {
                reference: expr.to_string(),
                src: self.src(),
                span: line.span().into(),
            }
            .into()
        })
    }

    /// Infers a value and rejects `[...]` tokens that are not valid references.
    fn infer(&self, line: &Line, token: &str) -> Result<LoonValue, LoonError> {
        let mut value = infer_value(token);
        if let LoonValue::UnresolvedRef(reference) = &mut value {
            self.ref_path(line, &reference.expr)?;
            reference.origin = Some(RefOrigin {
                src: Arc::clone(&self.source),
                span: line.span().into(),
            });
        }
        Ok(value)
    }

    fn not_found(&self, line: &Line, reference: &str, name: &str) -> LoonError {
        ReferenceError::NotFound {
            reference: reference.to_string(),
            name: name.to_string(),
            src: self.src(),
            span: line.span().into(),
        }
        .into()
    }
}

/// Folds a label body into its mapping, in order. Later keys overwrite earlier ones.
fn fold_items(items: Vec<LabelItem>) -> Mapping {
    let mut body = Mapping::new();
    for item in items {
        match item {
            LabelItem::Entry(key, value) => {
                body.insert(key, value);
            }
            LabelItem::Merge(entries) => body.extend(entries),
            LabelItem::Bare(value) => {
                body.insert(value.to_string(), LoonValue::Null);
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Reference;
    use crate::error::ImportError;
    use miette::Report;

    fn parse_ok(source: &str) -> ParsedDocument {
        let mut loader = Loader::new();
        let mut parser = Parser::new_with_name(source, PathBuf::from("test.loon"));
        match parser.parse_document(&mut loader) {
            Ok(doc) => doc,
            Err(err) => {
                let report = Report::from(err);
                panic!("{:#}", report);
            }
        }
    }

    fn parse_err(source: &str) -> LoonError {
        let mut loader = Loader::new();
        Parser::new(source)
            .parse_document(&mut loader)
            .expect_err("expected the document to be rejected")
    }

    fn num(n: f64) -> LoonValue {
        LoonValue::Number(n)
    }

    #[test]
    fn test_label_with_assignments() {
        let doc = parse_ok("(server)\nhost = localhost\nport = 8080\nend\n");
        let server = doc.labels["server"].as_mapping().unwrap();
        assert_eq!(server["host"], LoonValue::String("localhost".into()));
        assert_eq!(server["port"], num(8080.0));
        assert_eq!(server.keys().collect::<Vec<_>>(), vec!["host", "port"]);
    }

    #[test]
    fn test_hidden_label_goes_to_hidden_set() {
        let doc = parse_ok("%(secret)\nk = 1\nend\n(pub)\nv = 2\nend\n");
        assert!(doc.hidden.contains_key("secret"));
        assert!(!doc.labels.contains_key("secret"));
        assert!(doc.labels.contains_key("pub"));
    }

    #[test]
    fn test_space_mapping_and_registry() {
        let mut loader = Loader::new();
        let doc = Parser::new("(app)\n:db\na = 1\nb = 2\nend:\nend\n")
            .parse_document(&mut loader)
            .unwrap();

        let mut expected = Mapping::new();
        expected.insert("a".into(), num(1.0));
        expected.insert("b".into(), num(2.0));
        let expected = LoonValue::Mapping(expected);

        assert_eq!(doc.labels["app"].get("db"), Some(&expected));
        assert_eq!(loader.spaces.get("db"), Some(&expected));
    }

    #[test]
    fn test_space_list() {
        let doc = parse_ok("(app)\n:ports\n80\n443\nend:\nend\n");
        assert_eq!(
            doc.labels["app"].get("ports"),
            Some(&LoonValue::List(vec![num(80.0), num(443.0)]))
        );
    }

    #[test]
    fn test_sticky_conversion() {
        let doc = parse_ok("(a)\n:s\nx = 1\ny\nend:\nend\n");
        let mut single = Mapping::new();
        single.insert("x".into(), num(1.0));
        assert_eq!(
            doc.labels["a"].get("s"),
            Some(&LoonValue::List(vec![
                LoonValue::Mapping(single),
                LoonValue::String("y".into())
            ]))
        );
    }

    #[test]
    fn test_key_value_after_list_is_rejected() {
        let err = parse_err("(a)\n:s\ny\nx = 1\nend:\nend\n");
        match err {
            LoonError::MixedContainer(e) => {
                assert_eq!(e.space, "s");
                assert_eq!(e.attempted, "key-value");
            }
            other => panic!("expected a mixed container error, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_values_in_label_become_null_keys() {
        let doc = parse_ok("(flags)\nverbose\n\"dry run\"\n42\nTRUE\nend\n");
        let flags = doc.labels["flags"].as_mapping().unwrap();
        assert_eq!(
            flags.keys().collect::<Vec<_>>(),
            vec!["verbose", "dry run", "42", "true"]
        );
        assert!(flags.values().all(|v| *v == LoonValue::Null));
    }

    #[test]
    fn test_references_are_left_as_placeholders() {
        let doc = parse_ok("(a)\nx = [b.n]\n[b:space]\nend\n");
        let a = doc.labels["a"].as_mapping().unwrap();
        assert_eq!(a["x"], LoonValue::UnresolvedRef("b.n".into()));
        assert_eq!(
            a["space"],
            LoonValue::UnresolvedRef(Reference {
                merge: true,
                ..Reference::new("b:space")
            })
        );
    }

    #[test]
    fn test_references_remember_their_line() {
        let doc = parse_ok("(a)
x = 1
y = [b.n]
end
");
        let Some(LoonValue::UnresolvedRef(reference)) = doc.labels["a"].get("y") else {
            panic!("expected a placeholder");
        };
        let origin = reference.origin.as_ref().unwrap();
        assert_eq!(origin.span.offset(), 10);
        assert_eq!(origin.span.len(), "y = [b.n]".len());
    }

    #[test]
    fn test_value_only_injection_of_pending_reference_merges() {
        let doc = parse_ok("(base)
link = [target]
end
(app)
-> base.link&
end
");
        assert_eq!(
            doc.labels["app"].get("target"),
            Some(&LoonValue::UnresolvedRef(Reference {
                merge: true,
                ..Reference::new("target")
            }))
        );
    }

    #[test]
    fn test_alias_key_uses_target_name() {
        let doc = parse_ok(
            "(db)\nhost = x\nend\n(app)\n:conn\nend:\nend\n(cfg)\n$db = 1\n$app:conn = 2\n$db.host = 3\nend\n",
        );
        let cfg = doc.labels["cfg"].as_mapping().unwrap();
        assert_eq!(cfg["db"], num(1.0));
        assert_eq!(cfg["conn"], num(2.0));
        assert_eq!(cfg["host"], num(3.0));
    }

    #[test]
    fn test_alias_to_later_label_fails() {
        let err = parse_err("(cfg)\n$later = 1\nend\n(later)\nend\n");
        match err {
            LoonError::Reference(ReferenceError::AliasTargetNotFound { alias, name, .. }) => {
                assert_eq!(alias, "later");
                assert_eq!(name, "later");
            }
            other => panic!("expected an alias error, got {other:?}"),
        }
    }

    #[test]
    fn test_injection_wraps_by_default() {
        let doc = parse_ok(
            "(base)\nhost = h\n:ports\n1\nend:\nend\n(app)\n-> base.host\n-> base:ports\nend\n",
        );
        let app = doc.labels["app"].as_mapping().unwrap();
        assert_eq!(app["host"], LoonValue::String("h".into()));
        assert_eq!(app["ports"], LoonValue::List(vec![num(1.0)]));
    }

    #[test]
    fn test_value_only_injection_merges_label() {
        let doc = parse_ok("(base)\na = 1\nb = 2\nend\n(app)\n-> base&\nc = 3\nend\n");
        let app = doc.labels["app"].as_mapping().unwrap();
        assert_eq!(app.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_value_only_injection_into_space_appends() {
        let doc = parse_ok("(base)\nhost = h\nend\n(app)\n:hosts\n-> base.host&\nother\nend:\nend\n");
        assert_eq!(
            doc.labels["app"].get("hosts"),
            Some(&LoonValue::List(vec![
                LoonValue::String("h".into()),
                LoonValue::String("other".into())
            ]))
        );
    }

    #[test]
    fn test_structured_injection_into_list_space_fails() {
        let err = parse_err("(base)\nk = 1\nend\n(app)\n:s\nitem\n-> base.k\nend:\nend\n");
        match err {
            LoonError::MixedContainer(e) => assert_eq!(e.attempted, "structured injection"),
            other => panic!("expected a mixed container error, got {other:?}"),
        }
    }

    #[test]
    fn test_injection_is_not_deferred() {
        let err = parse_err("(app)\n-> later.k\nend\n(later)\nk = 1\nend\n");
        match err {
            LoonError::Reference(ReferenceError::NotFound { name, .. }) => assert_eq!(name, "later"),
            other => panic!("expected a missing reference, got {other:?}"),
        }
    }

    #[test]
    fn test_injection_of_missing_field_fails() {
        let err = parse_err("(base)\nend\n(app)\n-> base.nope\nend\n");
        assert!(matches!(
            err,
            LoonError::Reference(ReferenceError::NotFound { ref name, .. }) if name == "nope"
        ));
    }

    #[test]
    fn test_value_only_list_injection_into_label_fails() {
        let err = parse_err("(base)\n:l\n1\nend:\nend\n(app)\n-> base:l&\nend\n");
        assert!(matches!(
            err,
            LoonError::Reference(ReferenceError::InvalidInjection { .. })
        ));
    }

    #[test]
    fn test_label_redefinition_overwrites() {
        let doc = parse_ok("(a)\nx = 1\nend\n(b)\nend\n(a)\ny = 2\nend\n");
        assert_eq!(doc.labels.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.labels["a"].get("x"), None);
        assert_eq!(doc.labels["a"].get("y"), Some(&num(2.0)));
    }

    #[test]
    fn test_redefinition_moves_between_visibilities() {
        let doc = parse_ok("(a)\nend\n%(a)\nend\n");
        assert!(!doc.labels.contains_key("a"));
        assert!(doc.hidden.contains_key("a"));
    }

    #[test]
    fn test_empty_space_is_null() {
        let doc = parse_ok("(a)\n:nothing\nend:\nend\n");
        assert_eq!(doc.labels["a"].get("nothing"), Some(&LoonValue::Null));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            parse_err("x = 1\n"),
            LoonError::Syntax(SyntaxError::NoOpenLabel { .. })
        ));
        assert!(matches!(
            parse_err(":space\n"),
            LoonError::Syntax(SyntaxError::NoOpenLabel { .. })
        ));
        assert!(matches!(
            parse_err("end\n"),
            LoonError::Syntax(SyntaxError::NoOpenLabel { .. })
        ));
        assert!(matches!(
            parse_err("(a)\nend:\nend\n"),
            LoonError::Syntax(SyntaxError::NoOpenSpace { .. })
        ));
        assert!(matches!(
            parse_err("(a)\n(b)\nend\n"),
            LoonError::Syntax(SyntaxError::UnclosedLabel { .. })
        ));
        assert!(matches!(
            parse_err("(a)\n:s\nend\n"),
            LoonError::Syntax(SyntaxError::UnclosedSpace { .. })
        ));
        assert!(matches!(
            parse_err("(a)\n:s\n:t\n"),
            LoonError::Syntax(SyntaxError::NestedSpace { .. })
        ));
        assert!(matches!(
            parse_err("(a)\n"),
            LoonError::Syntax(SyntaxError::UnclosedLabel { .. })
        ));
        assert!(matches!(
            parse_err("(two words)\nend\n"),
            LoonError::Syntax(SyntaxError::InvalidName { .. })
        ));
        assert!(matches!(
            parse_err("(a)\n= 1\nend\n"),
            LoonError::Syntax(SyntaxError::MissingKey { .. })
        ));
        assert!(matches!(
            parse_err("(a)\nx = [a.b.c]\nend\n"),
            LoonError::Syntax(SyntaxError::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_error_span_points_at_line() {
        let source = "(a)\nx = 1\nend\nstray = 2\n";
        match parse_err(source) {
            LoonError::Syntax(SyntaxError::NoOpenLabel { construct, span, .. }) => {
                assert_eq!(construct, "stray = 2");
                assert_eq!(&source[span.offset()..span.offset() + span.len()], "stray = 2");
            }
            other => panic!("expected NoOpenLabel, got {other:?}"),
        }
    }

    #[test]
    fn test_import_outside_loon_extension() {
        let err = parse_err("@config.txt\n");
        assert!(matches!(
            err,
            LoonError::Import(ImportError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_fold_items_order_and_overwrite() {
        let mut merged = Mapping::new();
        merged.insert("a".into(), num(9.0));
        merged.insert("c".into(), num(3.0));
        let body = fold_items(vec![
            LabelItem::Entry("a".into(), num(1.0)),
            LabelItem::Bare(LoonValue::String("b".into())),
            LabelItem::Merge(merged),
        ]);
        assert_eq!(body.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(body["a"], num(9.0));
        assert_eq!(body["b"], LoonValue::Null);
    }
}
