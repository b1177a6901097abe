use crate::ast::{LoonValue, Mapping, Reference};
use crate::error::{LoonError, ReferenceError};
use crate::utils::is_valid_name;
use log::debug;
use miette::{NamedSource, SourceSpan};

/// A parsed reference expression: `label`, `label.identity`, `label:space` or
/// `label:space.identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPath {
    pub label: String,
    pub space: Option<String>,
    pub identity: Option<String>,
}

impl RefPath {
    /// Parses a reference expression. Returns `None` if any segment is empty or
    /// not a valid name, which also rules out deeper paths like `a.b.c`.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        let (scope, identity) = match expr.split_once('.') {
            Some((scope, identity)) => (scope, Some(identity.trim())),
            None => (expr, None),
        };
        let (label, space) = match scope.split_once(':') {
            Some((label, space)) => (label.trim(), Some(space.trim())),
            None => (scope.trim(), None),
        };

        let valid = is_valid_name(label)
            && space.is_none_or(is_valid_name)
            && identity.is_none_or(is_valid_name);
        if !valid {
            return None;
        }

        Some(RefPath {
            label: label.to_string(),
            space: space.map(str::to_string),
            identity: identity.map(str::to_string),
        })
    }

    /// The name the referenced thing is known by: the identity, else the space, else the label.
    pub fn identity_name(&self) -> &str {
        self.identity
            .as_deref()
            .or(self.space.as_deref())
            .unwrap_or(&self.label)
    }
}

/// Resolves references against the merged visible and hidden label sets.
///
/// The label sets are borrowed as a snapshot; nothing here mutates them.
pub struct Resolver<'a> {
    labels: &'a Mapping,
    hidden: &'a Mapping,
    // References currently being followed, to detect cycles.
    resolving_stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(labels: &'a Mapping, hidden: &'a Mapping) -> Self {
        Resolver {
            labels,
            hidden,
            resolving_stack: Vec::new(),
        }
    }

    /// Hidden labels shadow visible labels of the same name.
    fn label(&self, name: &str) -> Option<&'a LoonValue> {
        self.hidden.get(name).or_else(|| self.labels.get(name))
    }

    /// Looks up `path` without resolving anything it finds.
    ///
    /// Returns `Err(name)` with the missing label or space, `Ok(None)` when only
    /// the final identity is absent.
    pub fn lookup(&self, path: &RefPath) -> Result<Option<&'a LoonValue>, String> {
        let label = self.label(&path.label).ok_or_else(|| path.label.clone())?;
        let scope = match &path.space {
            Some(space) => label.get(space).ok_or_else(|| space.clone())?,
            None => label,
        };
        Ok(match &path.identity {
            Some(identity) => scope.get(identity),
            None => Some(scope),
        })
    }

    /// Resolves a whole set of labels, replacing every placeholder.
    pub fn resolve_labels(&mut self, labels: &Mapping) -> Result<Mapping, LoonError> {
        debug!("Resolving references in {} label(s)", labels.len());
        labels
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.resolve_value(value.clone())?)))
            .collect()
    }

    /// Walks `value` and replaces each [`LoonValue::UnresolvedRef`] with its target.
    pub fn resolve_value(&mut self, value: LoonValue) -> Result<LoonValue, LoonError> {
        match value {
            LoonValue::UnresolvedRef(reference) => self.resolve_reference(&reference),
            LoonValue::Mapping(map) => self.resolve_mapping(map).map(LoonValue::Mapping),
            LoonValue::List(items) => items
                .into_iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, LoonError>>()
                .map(LoonValue::List),
            other => Ok(other),
        }
    }

    // A merge reference that resolves to a mapping is spliced in at its own position.
    fn resolve_mapping(&mut self, map: Mapping) -> Result<Mapping, LoonError> {
        let mut resolved = Mapping::new();
        for (key, value) in map {
            match value {
                LoonValue::UnresolvedRef(reference) if reference.merge => {
                    match self.resolve_reference(&reference)? {
                        LoonValue::Mapping(entries) => resolved.extend(entries),
                        other => {
                            resolved.insert(key, other);
                        }
                    }
                }
                other => {
                    let value = self.resolve_value(other)?;
                    resolved.insert(key, value);
                }
            }
        }
        Ok(resolved)
    }

    /// Resolves a single reference to a placeholder-free value.
    /// A missing final identity resolves to `null`.
    pub fn resolve_reference(&mut self, reference: &Reference) -> Result<LoonValue, LoonError> {
        let expr = reference.expr.as_str();
        if self.resolving_stack.iter().any(|r| r == expr) {
            let chain = self
                .resolving_stack
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(expr))
                .map(|r| format!("[{r}]"))
                .collect::<Vec<String>>()
                .join(" -> ");
            let (src, span) = origin_of(reference);
            return Err(ReferenceError::Cycle { chain, src, span }.into());
        }

        self.resolving_stack.push(expr.to_string());
        let resolved = self.follow(reference);
        self.resolving_stack.pop();
        resolved
    }

    fn follow(&mut self, reference: &Reference) -> Result<LoonValue, LoonError> {
        let dangling = |name: &str| -> LoonError {
            let (src, span) = origin_of(reference);
            ReferenceError::Dangling {
                reference: reference.expr.clone(),
                name: name.to_string(),
                src,
                span,
            }
            .into()
        };

        let path = RefPath::parse(&reference.expr).ok_or_else(|| dangling(&reference.expr))?;
        let label = self.label(&path.label).ok_or_else(|| dangling(&path.label))?;

        let scope = match &path.space {
            Some(space) => {
                let entry = self.field(label, space)?.ok_or_else(|| dangling(space))?;
                self.unwrap_reference(entry)?
            }
            None => label.clone(),
        };

        let target = match &path.identity {
            Some(identity) => match self.field(&scope, identity)? {
                Some(value) => value,
                None => return Ok(LoonValue::Null),
            },
            None => scope,
        };

        self.resolve_value(target)
    }

    /// Finds `key` in a mapping that may still hold placeholders. Later entries
    /// win, so merge references after the last plain `key` are resolved to see
    /// whether they supply it.
    fn field(&mut self, scope: &LoonValue, key: &str) -> Result<Option<LoonValue>, LoonError> {
        let Some(map) = scope.as_mapping() else {
            return Ok(None);
        };
        for (name, value) in map.iter().rev() {
            match value {
                LoonValue::UnresolvedRef(reference) if reference.merge => {
                    match self.resolve_reference(reference)? {
                        LoonValue::Mapping(entries) => {
                            if let Some(found) = entries.get(key) {
                                return Ok(Some(found.clone()));
                            }
                        }
                        other if name == key => return Ok(Some(other)),
                        _ => {}
                    }
                }
                _ if name == key => return Ok(Some(value.clone())),
                _ => {}
            }
        }
        Ok(None)
    }

    // A space entry written as `db = [other:db]` is only a pointer to the real scope.
    fn unwrap_reference(&mut self, value: LoonValue) -> Result<LoonValue, LoonError> {
        match value {
            LoonValue::UnresolvedRef(reference) => self.resolve_reference(&reference),
            other => Ok(other),
        }
    }
}

fn origin_of(reference: &Reference) -> (Option<NamedSource<String>>, Option<SourceSpan>) {
    match &reference.origin {
        Some(origin) => (Some((*origin.src).clone()), Some(origin.span)),
        None => (None, None),
    }
}
