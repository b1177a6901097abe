use indexmap::IndexMap;
use miette::{NamedSource, SourceSpan};
use std::fmt::Display;
use std::sync::Arc;

/// An ordered string-keyed mapping. Insertion order is the order of appearance in the source.
pub type Mapping = IndexMap<String, LoonValue>;

/// Every value a LOON document can produce.
#[derive(Debug, PartialEq, Clone)]
pub enum LoonValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Mapping(Mapping),
    List(Vec<LoonValue>),
    /// A `[ref]` whose target is looked up only after the whole document is known.
    UnresolvedRef(Reference),
}

/// The line a reference was written on, kept for errors raised after parsing.
#[derive(Debug, Clone)]
pub struct RefOrigin {
    pub src: Arc<NamedSource<String>>,
    pub span: SourceSpan,
}

/// A reference expression waiting for the second pass.
#[derive(Debug, Clone)]
pub struct Reference {
    pub expr: String,
    /// Set for a `[ref]` standing alone in a label body. A mapping target is
    /// merged into the enclosing label; anything else stays under its key.
    pub merge: bool,
    pub origin: Option<RefOrigin>,
}

impl Reference {
    pub fn new(expr: impl Into<String>) -> Self {
        Reference {
            expr: expr.into(),
            merge: false,
            origin: None,
        }
    }
}

// The origin only feeds diagnostics and takes no part in equality.
impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr && self.merge == other.merge
    }
}

impl From<&str> for Reference {
    fn from(expr: &str) -> Self {
        Reference::new(expr)
    }
}

impl LoonValue {
    /// Looks up `key` if this value is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LoonValue> {
        match self {
            LoonValue::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        if let LoonValue::Mapping(map) = self {
            Some(map)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[LoonValue]> {
        if let LoonValue::List(items) = self {
            Some(items)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let LoonValue::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        if let LoonValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let LoonValue::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// True if this value, or anything nested in it, still holds an unresolved reference.
    #[must_use]
    pub fn has_unresolved(&self) -> bool {
        match self {
            LoonValue::UnresolvedRef(_) => true,
            LoonValue::Mapping(map) => map.values().any(LoonValue::has_unresolved),
            LoonValue::List(items) => items.iter().any(LoonValue::has_unresolved),
            _ => false,
        }
    }

    /// Short name of the value's kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            LoonValue::String(_) => "string",
            LoonValue::Number(_) => "number",
            LoonValue::Boolean(_) => "boolean",
            LoonValue::Null => "null",
            LoonValue::Mapping(_) => "mapping",
            LoonValue::List(_) => "list",
            LoonValue::UnresolvedRef(_) => "reference",
        }
    }
}

impl Display for LoonValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoonValue::String(s) => write!(f, "{s}"),
            LoonValue::Number(n) => write!(f, "{n}"),
            LoonValue::Boolean(b) => write!(f, "{b}"),
            LoonValue::Null => write!(f, "null"),
            LoonValue::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            LoonValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            LoonValue::UnresolvedRef(reference) => write!(f, "[{}]", reference.expr),
        }
    }
}

/// What a space has accumulated so far. The first inserted item picks the mode.
#[derive(Debug, PartialEq, Clone, Default)]
pub enum SpaceContent {
    #[default]
    Empty,
    Mapping(Mapping),
    List(Vec<LoonValue>),
}

/// Returned when a key/value pair reaches a space that is already a list.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ListModeConflict;

impl SpaceContent {
    /// `key = value` inside a space.
    pub fn insert_pair(&mut self, key: String, value: LoonValue) -> Result<(), ListModeConflict> {
        match self {
            SpaceContent::Empty => {
                let mut map = Mapping::new();
                map.insert(key, value);
                *self = SpaceContent::Mapping(map);
                Ok(())
            }
            SpaceContent::Mapping(map) => {
                map.insert(key, value);
                Ok(())
            }
            SpaceContent::List(_) => Err(ListModeConflict),
        }
    }

    /// Merges a whole mapping into the space, as a structured injection does.
    pub fn merge_mapping(&mut self, entries: Mapping) -> Result<(), ListModeConflict> {
        match self {
            SpaceContent::Empty => {
                *self = SpaceContent::Mapping(entries);
                Ok(())
            }
            SpaceContent::Mapping(map) => {
                map.extend(entries);
                Ok(())
            }
            SpaceContent::List(_) => Err(ListModeConflict),
        }
    }

    /// Appends a bare item. A mapping-mode space turns into a list of single-key
    /// mappings first, keeping the original order.
    pub fn push_item(&mut self, value: LoonValue) {
        match std::mem::take(self) {
            SpaceContent::Empty => *self = SpaceContent::List(vec![value]),
            SpaceContent::Mapping(map) => {
                let mut items: Vec<LoonValue> = map
                    .into_iter()
                    .map(|(key, value)| {
                        let mut single = Mapping::new();
                        single.insert(key, value);
                        LoonValue::Mapping(single)
                    })
                    .collect();
                items.push(value);
                *self = SpaceContent::List(items);
            }
            SpaceContent::List(mut items) => {
                items.push(value);
                *self = SpaceContent::List(items);
            }
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, SpaceContent::List(_))
    }

    /// The value a closed space contributes. A space that never received anything is `null`.
    #[must_use]
    pub fn into_value(self) -> LoonValue {
        match self {
            SpaceContent::Empty => LoonValue::Null,
            SpaceContent::Mapping(map) => LoonValue::Mapping(map),
            SpaceContent::List(items) => LoonValue::List(items),
        }
    }
}

/// The outcome of parsing one file, before references are resolved.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ParsedDocument {
    /// Labels that appear in the output, in definition order.
    pub labels: Mapping,
    /// `%(name)` labels plus labels pulled in only for reference resolution.
    pub hidden: Mapping,
}

impl ParsedDocument {
    pub fn new() -> Self {
        Self::default()
    }
}
