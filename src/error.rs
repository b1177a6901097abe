use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LoonError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MixedContainer(#[from] MixedContainerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SyntaxError {
    #[error("`{construct}` used outside of a label")]
    #[diagnostic(
        code(loon::syntax::no_open_label),
        help("Open a label with `(name)` or `%(name)` before this line.")
    )]
    NoOpenLabel {
        construct: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("no label is open here")]
        span: SourceSpan,
    },

    #[error("`end:` without an open space")]
    #[diagnostic(
        code(loon::syntax::no_open_space),
        help("A space is opened with `:name` inside a label body.")
    )]
    NoOpenSpace {
        #[source_code]
        src: NamedSource<String>,
        #[label("nothing to close")]
        span: SourceSpan,
    },

    #[error("Label '{name}' is never closed")]
    #[diagnostic(
        code(loon::syntax::unclosed_label),
        help("Close the label with `end` before opening another one or ending the file.")
    )]
    UnclosedLabel {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("label opened here")]
        span: SourceSpan,
    },

    #[error("Space '{name}' is never closed")]
    #[diagnostic(
        code(loon::syntax::unclosed_space),
        help("Close the space with `end:` before closing its label.")
    )]
    UnclosedSpace {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("space opened here")]
        span: SourceSpan,
    },

    #[error("Cannot open space '{name}' inside space '{open}'")]
    #[diagnostic(
        code(loon::syntax::nested_space),
        help("Spaces do not nest. Close '{open}' with `end:` first.")
    )]
    NestedSpace {
        name: String,
        open: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("space '{open}' is still open")]
        span: SourceSpan,
    },

    #[error("Invalid {construct} name '{name}'")]
    #[diagnostic(
        code(loon::syntax::invalid_name),
        help("Names must be non-empty and may not contain whitespace or any of ()[]:.=@$%&<")
    )]
    InvalidName {
        construct: String,
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid name")]
        span: SourceSpan,
    },

    #[error("Assignment without a key")]
    #[diagnostic(
        code(loon::syntax::missing_key),
        help("Assignments are written as `key = value`.")
    )]
    MissingKey {
        #[source_code]
        src: NamedSource<String>,
        #[label("expected a key before `=`")]
        span: SourceSpan,
    },

    #[error("Malformed reference '{reference}'")]
    #[diagnostic(
        code(loon::syntax::malformed_reference),
        help("References have the form `label`, `label.field`, `label:space` or `label:space.field`.")
    )]
    MalformedReference {
        reference: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("cannot parse this reference")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
#[error("Cannot mix {attempted} with list in space '{space}'")]
#[diagnostic(
    code(loon::space::mixed_container),
    help("A space that already holds a list only accepts bare values and value-only injections.")
)]
pub struct MixedContainerError {
    pub space: String,
    pub attempted: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("space '{space}' is already a list")]
    pub span: SourceSpan,
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ReferenceError {
    #[error("Reference '{reference}' not found: '{name}' does not exist")]
    #[diagnostic(
        code(loon::reference::not_found),
        help("Injected labels must be closed with `end` before the `->` line.")
    )]
    NotFound {
        reference: String,
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("'{name}' is not defined at this point")]
        span: SourceSpan,
    },

    #[error("Reference '[{reference}]' could not be resolved: '{name}' does not exist")]
    #[diagnostic(
        code(loon::reference::dangling),
        help("Define '{name}' somewhere in this document or in one of its imports.")
    )]
    Dangling {
        reference: String,
        name: String,
        #[source_code]
        src: Option<NamedSource<String>>,
        #[label("'{name}' is not defined anywhere")]
        span: Option<SourceSpan>,
    },

    #[error("Alias target '{alias}' not found: '{name}' does not exist")]
    #[diagnostic(
        code(loon::reference::alias_target_not_found),
        help("`$key` aliases are resolved immediately; declare '{name}' before this line.")
    )]
    AliasTargetNotFound {
        alias: String,
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("alias target is not defined at this point")]
        span: SourceSpan,
    },

    #[error("Reference cycle detected: {chain}")]
    #[diagnostic(
        code(loon::reference::cycle),
        help("A reference may not (directly or indirectly) resolve to itself.")
    )]
    Cycle {
        chain: String,
        #[source_code]
        src: Option<NamedSource<String>>,
        #[label("this reference closes the cycle")]
        span: Option<SourceSpan>,
    },

    #[error("Cannot inject {found} '{reference}' directly into label '{label}'")]
    #[diagnostic(
        code(loon::reference::invalid_injection),
        help("Inject it without `&` so it is stored under its own name, or inject it inside a space.")
    )]
    InvalidInjection {
        reference: String,
        found: String,
        label: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("value-only injection of a {found}")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ImportError {
    #[error("Invalid import target '{path}': {reason}")]
    #[diagnostic(
        code(loon::import::invalid_target),
        help("Imports must name an existing `.loon` file, relative to the importing file.")
    )]
    InvalidTarget {
        path: String,
        reason: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("imported here")]
        span: SourceSpan,
    },

    #[error("Import cycle detected: {cycle}")]
    #[diagnostic(
        code(loon::import::cycle),
        help("Files may not import themselves, directly or through other files.")
    )]
    Cycle {
        cycle: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("this import closes the cycle")]
        span: SourceSpan,
    },

    #[error("Input file '{path}' must be a .loon file")]
    #[diagnostic(code(loon::import::invalid_entry_file))]
    InvalidEntryFile { path: String },

    #[error("Failed to read '{path}': {message}")]
    #[diagnostic(code(loon::import::io))]
    Io { path: String, message: String },
}
