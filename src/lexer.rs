/// The shape of a single significant line. LOON syntax is line-granular, so each
/// line maps to exactly one of these kinds.
#[derive(Debug, PartialEq, Clone)]
pub enum LineKind {
    /// `(name)` opens a visible label, `%(name)` a hidden one.
    /// The name is stored as written; the parser validates it.
    LabelOpen { name: String, hidden: bool },
    /// `:name` opens a space inside the current label.
    SpaceOpen(String),
    /// `end:` closes the current space.
    SpaceClose,
    /// `end` closes the current label.
    LabelClose,
    /// `key = value`, split at the first `=`. Both sides are trimmed.
    Assignment { key: String, value: String },
    /// `@path` imports another document.
    Import(String),
    /// `-> ref` or `-> ref&`. The trailing `&` sets `value_only`.
    Injection { target: String, value_only: bool },
    /// Any other line: a value appended to the current container.
    Bare(String),
}

/// A classified line with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub kind: LineKind,
    /// The trimmed line text.
    pub text: String,
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first non-whitespace character.
    pub pos_start: usize,
    /// Byte offset just past the last non-whitespace character.
    pub pos_end: usize,
}

impl Line {
    /// `(offset, length)` of the line, in the form `SourceSpan` converts from.
    pub fn span(&self) -> (usize, usize) {
        (self.pos_start, self.pos_end - self.pos_start)
    }
}

/// Splits LOON source into classified lines, dropping blank lines and `<` comments.
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    pub fn lex(&mut self) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut offset = 0;

        for (index, raw) in self.input.split_inclusive('\n').enumerate() {
            let line_offset = offset;
            offset += raw.len();

            let leading = raw.len() - raw.trim_start().len();
            let text = raw.trim();
            if text.is_empty() || text.starts_with('<') {
                continue;
            }

            let pos_start = line_offset + leading;
            lines.push(Line {
                kind: classify(text),
                text: text.to_string(),
                number: index + 1,
                pos_start,
                pos_end: pos_start + text.len(),
            });
        }

        lines
    }
}

/// Classifies one trimmed, non-empty, non-comment line. The checks run in a
/// fixed precedence order and the first match wins.
pub fn classify(text: &str) -> LineKind {
    if text.ends_with(')') {
        if let Some(name) = text.strip_prefix("%(") {
            return LineKind::LabelOpen {
                name: name[..name.len() - 1].to_string(),
                hidden: true,
            };
        }
        if let Some(name) = text.strip_prefix('(') {
            return LineKind::LabelOpen {
                name: name[..name.len() - 1].to_string(),
                hidden: false,
            };
        }
    }
    if let Some(name) = text.strip_prefix(':') {
        return LineKind::SpaceOpen(name.trim().to_string());
    }
    if text == "end:" {
        return LineKind::SpaceClose;
    }
    if text == "end" {
        return LineKind::LabelClose;
    }
    if let Some((key, value)) = text.split_once('=') {
        return LineKind::Assignment {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        };
    }
    if let Some(path) = text.strip_prefix('@') {
        return LineKind::Import(path.trim().to_string());
    }
    if let Some(target) = text.strip_prefix("->") {
        let target = target.trim();
        return match target.strip_suffix('&') {
            Some(target) => LineKind::Injection {
                target: target.trim().to_string(),
                value_only: true,
            },
            None => LineKind::Injection {
                target: target.to_string(),
                value_only: false,
            },
        };
    }
    LineKind::Bare(text.to_string())
}
