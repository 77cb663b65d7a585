//! Tokenizer and raw parse tree for Nginx-style configuration text.
//!
//! This crate is the bottom layer of the configuration engine: it turns
//! source text into a [`raw::RawConfig`] tree that mirrors the file's
//! textual structure (directives, blocks, comments) with no knowledge of
//! directive semantics or include resolution. The engine crate lowers a
//! `RawConfig` into its own typed node tree.
//!
//! ```
//! let raw = ngconf_syntax::parse_string("listen 80;\nserver_name example.com;").unwrap();
//! assert_eq!(raw.items.len(), 2);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod raw;

pub use ast::{Position, Span};
pub use error::{LexerError, ParseError, ParseResult};
pub use raw::{ArgumentValue, RawArgument, RawBlock, RawComment, RawConfig, RawDirective, RawItem};

use lexer::{Lexer, Token, TokenKind};

/// Directives whose body is a nested block rather than a terminating `;`.
pub const BLOCK_DIRECTIVES: &[&str] = &[
    "http",
    "server",
    "location",
    "upstream",
    "events",
    "stream",
    "mail",
    "types",
    "if",
    "limit_except",
    "geo",
    "map",
    "split_clients",
    "match",
];

/// Whether `name` is one of the well-known block directives.
pub fn is_block_directive(name: &str) -> bool {
    BLOCK_DIRECTIVES.contains(&name)
}

/// Like [`is_block_directive`], but also accepts names from `additional`.
///
/// Used when the caller knows of further block-bodied directives, such as
/// configuration-specific `upstream`-like names introduced by third-party
/// modules.
pub fn is_block_directive_with_extras(name: &str, additional: &[&str]) -> bool {
    is_block_directive(name) || additional.contains(&name)
}

/// Whether `name`'s block body should be treated as opaque, unparsed text
/// rather than nested Nginx syntax (e.g. `content_by_lua_block`).
pub fn is_raw_block_directive(name: &str) -> bool {
    name.ends_with("_by_lua_block")
}

/// Parses a whole configuration file's contents into a [`RawConfig`].
pub fn parse_string(source: &str) -> ParseResult<RawConfig> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

/// Parses a configuration file at `path` into a [`RawConfig`].
pub fn parse_config(path: &std::path::Path) -> ParseResult<RawConfig> {
    let source = std::fs::read_to_string(path).map_err(|e| ParseError::IoError(e.to_string()))?;
    parse_string(&source)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn parse(&mut self) -> ParseResult<RawConfig> {
        let items = self.parse_items(false)?;
        Ok(RawConfig { items })
    }

    fn parse_items(&mut self, in_block: bool) -> ParseResult<Vec<RawItem>> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            match &self.current().kind {
                TokenKind::Eof => {
                    if in_block {
                        return Err(ParseError::UnclosedBlock {
                            position: self.current().span.start,
                        });
                    }
                    break;
                }
                TokenKind::CloseBrace => {
                    if in_block {
                        break;
                    }
                    return Err(ParseError::UnmatchedCloseBrace {
                        position: self.current().span.start,
                    });
                }
                TokenKind::Comment(text) => {
                    let text = text.clone();
                    let span = self.current().span;
                    self.advance();
                    items.push(RawItem::Comment(RawComment { text, span }));
                }
                TokenKind::Ident(_) | TokenKind::Argument(_) => {
                    items.push(RawItem::Directive(self.parse_directive()?));
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "directive or comment".to_string(),
                        found: other.display_name().to_string(),
                        position: self.current().span.start,
                    });
                }
            }
        }
        Ok(items)
    }

    fn parse_directive(&mut self) -> ParseResult<RawDirective> {
        let name_token = self.advance();
        let name = match &name_token.kind {
            TokenKind::Ident(s) | TokenKind::Argument(s) => s.clone(),
            _ => {
                return Err(ParseError::ExpectedDirectiveName {
                    position: name_token.span.start,
                });
            }
        };
        let name_span = name_token.span;
        let start = name_span.start;

        let mut args = Vec::new();
        loop {
            match &self.current().kind {
                TokenKind::Semicolon | TokenKind::OpenBrace | TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::CloseBrace => {
                    return Err(ParseError::UnmatchedCloseBrace {
                        position: self.current().span.start,
                    });
                }
                _ => {
                    let token = self.advance();
                    let value = match token.kind {
                        TokenKind::Ident(s) | TokenKind::Argument(s) => ArgumentValue::Literal(s),
                        TokenKind::DoubleQuotedString(s) => ArgumentValue::QuotedString(s),
                        TokenKind::SingleQuotedString(s) => ArgumentValue::SingleQuotedString(s),
                        TokenKind::Variable(s) => ArgumentValue::Variable(s),
                        other => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "argument".to_string(),
                                found: other.display_name().to_string(),
                                position: token.span.start,
                            });
                        }
                    };
                    args.push(RawArgument {
                        value,
                        span: token.span,
                        raw: token.raw,
                    });
                }
            }
        }

        let raw_block = is_raw_block_directive(&name);

        let block = match &self.current().kind {
            TokenKind::OpenBrace => {
                let brace_start = self.current().span.start;
                self.advance();
                if raw_block {
                    Some(self.read_raw_block(brace_start)?)
                } else {
                    let items = self.parse_items(true)?;
                    let end = self.current().span.end;
                    if !matches!(self.current().kind, TokenKind::CloseBrace) {
                        return Err(ParseError::UnclosedBlock {
                            position: brace_start,
                        });
                    }
                    self.advance();
                    Some(RawBlock {
                        items,
                        span: Span::new(brace_start, end),
                        raw_content: None,
                    })
                }
            }
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Eof => {
                return Err(ParseError::MissingSemicolon {
                    position: self.current().span.start,
                });
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "';' or '{'".to_string(),
                    found: other.display_name().to_string(),
                    position: self.current().span.start,
                });
            }
        };

        let end = block
            .as_ref()
            .map(|b| b.span.end)
            .unwrap_or_else(|| self.tokens[self.pos.saturating_sub(1)].span.end);

        Ok(RawDirective {
            name,
            name_span,
            args,
            block,
            span: Span::new(start, end),
        })
    }

    /// Reads an opaque block body verbatim, tracking brace depth so that
    /// embedded `{`/`}` characters inside the foreign body (e.g. Lua code)
    /// don't need to balance against the outer Nginx grammar.
    fn read_raw_block(&mut self, brace_start: crate::ast::Position) -> ParseResult<RawBlock> {
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            let token = self.advance();
            match &token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::UnclosedBlock {
                        position: brace_start,
                    });
                }
                TokenKind::OpenBrace => {
                    depth += 1;
                    text.push_str(&token.leading_whitespace);
                    text.push_str(&token.raw);
                }
                TokenKind::CloseBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let end = token.span.end;
                        return Ok(RawBlock {
                            items: Vec::new(),
                            span: Span::new(brace_start, end),
                            raw_content: Some(text),
                        });
                    }
                    text.push_str(&token.leading_whitespace);
                    text.push_str(&token.raw);
                }
                TokenKind::Newline => text.push('\n'),
                _ => {
                    text.push_str(&token.leading_whitespace);
                    text.push_str(&token.raw);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_directive() {
        let raw = parse_string("listen 80;").unwrap();
        assert_eq!(raw.items.len(), 1);
        match &raw.items[0] {
            RawItem::Directive(d) => {
                assert_eq!(d.name, "listen");
                assert_eq!(d.arg_strings(), vec!["80"]);
                assert!(d.block.is_none());
            }
            _ => panic!("expected directive"),
        }
    }

    #[test]
    fn parses_nested_blocks() {
        let raw = parse_string("http {\n  server {\n    listen 80;\n  }\n}").unwrap();
        let RawItem::Directive(http) = &raw.items[0] else {
            panic!("expected directive");
        };
        assert_eq!(http.name, "http");
        let block = http.block.as_ref().unwrap();
        assert_eq!(block.items.len(), 1);
        let RawItem::Directive(server) = &block.items[0] else {
            panic!("expected directive");
        };
        assert_eq!(server.name, "server");
    }

    #[test]
    fn keeps_comments_as_items() {
        let raw = parse_string("# top comment\nlisten 80;").unwrap();
        assert_eq!(raw.items.len(), 2);
        matches!(&raw.items[0], RawItem::Comment(_));
    }

    #[test]
    fn reads_raw_lua_block_verbatim() {
        let raw = parse_string("content_by_lua_block {\n  ngx.say('{ not nginx }')\n}").unwrap();
        let RawItem::Directive(d) = &raw.items[0] else {
            panic!("expected directive");
        };
        let block = d.block.as_ref().unwrap();
        assert!(block.items.is_empty());
        assert!(block.raw_content.as_ref().unwrap().contains("ngx.say"));
    }

    #[test]
    fn rejects_unmatched_close_brace() {
        let err = parse_string("}").unwrap_err();
        assert!(matches!(err, ParseError::UnmatchedCloseBrace { .. }));
    }

    #[test]
    fn rejects_unclosed_block() {
        let err = parse_string("http {").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedBlock { .. }));
    }

    #[test]
    fn rejects_missing_semicolon() {
        let err = parse_string("listen 80").unwrap_err();
        assert!(matches!(err, ParseError::MissingSemicolon { .. }));
    }

    #[test]
    fn recognizes_block_directives() {
        assert!(is_block_directive("server"));
        assert!(!is_block_directive("listen"));
        assert!(is_block_directive_with_extras("upstream_check", &["upstream_check"]));
    }

    #[test]
    fn recognizes_lua_block_directives() {
        assert!(is_raw_block_directive("content_by_lua_block"));
        assert!(!is_raw_block_directive("content_by_lua"));
    }
}
