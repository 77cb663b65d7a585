//! Raw parse tree produced directly by [`crate::parse_string`].
//!
//! This tree mirrors the textual structure of a configuration file
//! (directives, blocks, comments) without any notion of include
//! resolution or directive semantics - that lowering happens one
//! layer up, in the engine that turns a [`RawConfig`] into a typed
//! node tree.

use crate::ast::Span;

/// A parsed configuration file: a flat sequence of top-level items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawConfig {
    pub items: Vec<RawItem>,
}

/// One item inside a file or a block body.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Directive(RawDirective),
    Comment(RawComment),
}

/// A directive, with or without a `{ ... }` body.
///
/// `server;` and `server { listen 80; }` are both directives: the
/// former has `block: None`, the latter `block: Some(..)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDirective {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<RawArgument>,
    pub block: Option<RawBlock>,
    pub span: Span,
}

/// The `{ ... }` body of a block directive.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub items: Vec<RawItem>,
    pub span: Span,
    /// Verbatim body text for directives like `content_by_lua_block`
    /// whose bodies are not Nginx syntax and must not be re-tokenized.
    pub raw_content: Option<String>,
}

/// One argument of a directive.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArgument {
    pub value: ArgumentValue,
    pub span: Span,
    pub raw: String,
}

/// The lexical form an argument was written in.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// Bare word or identifier, e.g. `80`, `on`, `/var/www`.
    Literal(String),
    /// `"..."` string, already escape-processed.
    QuotedString(String),
    /// `'...'` string, already escape-processed.
    SingleQuotedString(String),
    /// `$name` or `${name}` variable reference.
    Variable(String),
}

impl ArgumentValue {
    /// The argument's value with quoting stripped, as it would be
    /// passed to the directive at runtime.
    pub fn as_str(&self) -> &str {
        match self {
            ArgumentValue::Literal(s)
            | ArgumentValue::QuotedString(s)
            | ArgumentValue::SingleQuotedString(s) => s,
            ArgumentValue::Variable(s) => s,
        }
    }
}

/// A `# ...` comment line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawComment {
    pub text: String,
    pub span: Span,
}

impl RawDirective {
    /// Directive arguments rendered as bare strings, quoting stripped.
    pub fn arg_strings(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }
}
