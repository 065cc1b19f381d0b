use crate::ast::*;
use crate::lexer::{Keyword, LexError, Lexed, Lexer, Punct, Token};
use thiserror::Error;

mod declarations;
mod expressions;
mod modules;
mod statements;

#[derive(Clone, Debug, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// Syntactic extensions the embedder has switched on; see
/// `interpreter::features`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParserOptions {
    pub optional_chaining: bool,
    pub nullish_coalescing: bool,
    pub numeric_separators: bool,
    pub class_fields: bool,
    pub logical_assignment: bool,
}

pub struct Parser {
    lexer: Lexer,
    current: Lexed,
    prev_ends_expr: bool,
    strict: bool,
    kind: ProgramKind,
    options: ParserOptions,
    in_generator: bool,
    in_async: bool,
    in_function: bool,
    /// Suppress the `in` relational operator (for-statement heads).
    no_in: bool,
    template_sites: usize,
}

/// Saved lexer/token state for bounded backtracking (arrow-function
/// heads are the only consumer).
struct Checkpoint {
    lexer_pos: (usize, u32, u32),
    current: Lexed,
    prev_ends_expr: bool,
}

impl Parser {
    pub fn new(source: &str, kind: ProgramKind, options: ParserOptions) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        lexer.numeric_separators = options.numeric_separators;
        let current = lexer.next(true)?;
        Ok(Self {
            lexer,
            current,
            prev_ends_expr: false,
            strict: kind == ProgramKind::Module,
            kind,
            options,
            in_generator: false,
            in_async: false,
            in_function: false,
            no_in: false,
            template_sites: 0,
        })
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        let strict = self.directive_prologue(&mut body)?;
        if strict {
            self.strict = true;
        }
        while self.current.token != Token::Eof {
            body.push(self.parse_statement_or_module_item()?);
        }
        Ok(Program {
            kind: self.kind,
            body,
            strict: self.strict,
        })
    }

    /// Parse leading string-literal expression statements; returns true if
    /// one of them is the "use strict" directive.
    fn directive_prologue(&mut self, out: &mut Vec<Statement>) -> Result<bool, ParseError> {
        let mut strict = self.strict;
        while let Token::Str { value, .. } = &self.current.token {
            let text = value.to_rust_string();
            // A directive must be a complete expression statement.
            let checkpoint = self.checkpoint();
            let stmt = self.parse_statement()?;
            match &stmt {
                Statement::Expression(Expression::Literal(Literal::String(_))) => {
                    if text == "use strict" {
                        strict = true;
                        self.strict = true;
                    }
                    out.push(stmt);
                }
                _ => {
                    self.restore(checkpoint);
                    break;
                }
            }
        }
        Ok(strict)
    }

    // ── token plumbing ────────────────────────────────────────────────

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            lexer_pos: self.lexer.save(),
            current: self.current.clone(),
            prev_ends_expr: self.prev_ends_expr,
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.lexer.restore(cp.lexer_pos);
        self.current = cp.current;
        self.prev_ends_expr = cp.prev_ends_expr;
    }

    /// True when a `/` after this token must be division, not a regexp.
    fn ends_expression(token: &Token) -> bool {
        match token {
            Token::Ident(_)
            | Token::Num { .. }
            | Token::BigInt(_)
            | Token::Str { .. }
            | Token::RegExp { .. } => true,
            Token::TemplatePiece { tail, .. } => *tail,
            Token::Keyword(k) => matches!(
                k,
                Keyword::This
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Null
                    | Keyword::Super
                    | Keyword::Get
                    | Keyword::Set
                    | Keyword::Of
                    | Keyword::Static
            ),
            Token::Punct(p) => matches!(
                p,
                Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus
            ),
            _ => false,
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.prev_ends_expr = Self::ends_expression(&self.current.token);
        self.current = self.lexer.next(!self.prev_ends_expr)?;
        Ok(())
    }

    /// Replace the current `}` with the next template piece.
    fn advance_template(&mut self) -> Result<(), ParseError> {
        debug_assert_eq!(self.current.token, Token::Punct(Punct::RBrace));
        self.current = self.lexer.template_continue()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.current.line,
            column: self.current.column,
        }
    }

    fn is_punct(&self, p: Punct) -> bool {
        self.current.token == Token::Punct(p)
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        self.current.token == Token::Keyword(k)
    }

    fn eat_punct(&mut self, p: Punct) -> Result<bool, ParseError> {
        if self.is_punct(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_keyword(&mut self, k: Keyword) -> Result<bool, ParseError> {
        if self.is_keyword(k) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<(), ParseError> {
        if self.eat_punct(p)? {
            Ok(())
        } else {
            Err(self.error(format!("Expected {p:?}, found {:?}", self.current.token)))
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(k)? {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}'", k.as_identifier_name())))
        }
    }

    /// Automatic semicolon insertion (§12.9): an explicit `;`, or a `}` /
    /// end of input / line break before the offending token.
    fn semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(Punct::Semicolon)? {
            return Ok(());
        }
        if self.is_punct(Punct::RBrace)
            || self.current.token == Token::Eof
            || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.error(format!("Expected ';', found {:?}", self.current.token)))
    }

    // ── identifiers ───────────────────────────────────────────────────

    /// The current token viewed as an IdentifierName (any keyword counts),
    /// used after `.` and in property positions.
    fn identifier_name(&self) -> Option<String> {
        match &self.current.token {
            Token::Ident(name) => Some(name.clone()),
            Token::Keyword(k) => Some(k.as_identifier_name().to_string()),
            _ => None,
        }
    }

    /// The current token viewed as a binding identifier / identifier
    /// reference, honouring contextual keyword rules.
    fn identifier_reference(&self) -> Option<String> {
        match &self.current.token {
            Token::Ident(name) => Some(name.clone()),
            Token::Keyword(k) => match k {
                Keyword::Get | Keyword::Set | Keyword::Of | Keyword::Static | Keyword::Async => {
                    Some(k.as_identifier_name().to_string())
                }
                Keyword::Let if !self.strict => Some("let".to_string()),
                Keyword::Yield if !self.strict && !self.in_generator => Some("yield".to_string()),
                Keyword::Await if self.kind == ProgramKind::Script && !self.in_async => {
                    Some("await".to_string())
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_binding_identifier(&mut self) -> Result<String, ParseError> {
        match self.identifier_reference() {
            Some(name) => {
                if self.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error(format!("Cannot bind '{name}' in strict mode")));
                }
                self.advance()?;
                Ok(name)
            }
            None => Err(self.error(format!(
                "Expected identifier, found {:?}",
                self.current.token
            ))),
        }
    }

    /// PropertyName: identifier names, string/number literals, or a
    /// computed `[expr]` key.
    fn parse_property_name(&mut self) -> Result<PropName, ParseError> {
        if self.is_punct(Punct::LBracket) {
            self.advance()?;
            let expr = self.parse_assignment_expression()?;
            self.expect_punct(Punct::RBracket)?;
            return Ok(PropName::Computed(Box::new(expr)));
        }
        if let Some(name) = self.identifier_name() {
            self.advance()?;
            return Ok(PropName::Ident(name));
        }
        match self.current.token.clone() {
            Token::Str { value, legacy_octal } => {
                if legacy_octal && self.strict {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode"));
                }
                self.advance()?;
                Ok(PropName::Str(value))
            }
            Token::Num {
                value,
                legacy_octal,
            } => {
                if legacy_octal && self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode"));
                }
                self.advance()?;
                Ok(PropName::Num(value))
            }
            other => Err(self.error(format!("Invalid property name {other:?}"))),
        }
    }

    fn next_template_site(&mut self) -> usize {
        let site = self.template_sites;
        self.template_sites += 1;
        site
    }
}

impl Lexer {
    // Narrow save/restore surface for the parser's backtracking.
    pub(crate) fn save(&self) -> (usize, u32, u32) {
        (self.pos(), self.line(), self.column())
    }

    pub(crate) fn restore(&mut self, state: (usize, u32, u32)) {
        self.set_pos(state);
    }
}

/// Convenience entry points used by the engine and the shell.
pub fn parse_script(source: &str, options: ParserOptions) -> Result<Program, ParseError> {
    Parser::new(source, ProgramKind::Script, options)?.parse_program()
}

pub fn parse_module(source: &str, options: ParserOptions) -> Result<Program, ParseError> {
    Parser::new(source, ProgramKind::Module, options)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(src: &str) -> Program {
        parse_script(src, ParserOptions::default()).expect("parse error")
    }

    #[test]
    fn parses_directive_prologue() {
        let p = script("'use strict'; var x = 1;");
        assert!(p.strict);
        assert_eq!(p.body.len(), 2);
    }

    #[test]
    fn modules_are_strict() {
        let p = parse_module("export const x = 1;", ParserOptions::default()).unwrap();
        assert!(p.strict);
    }

    #[test]
    fn asi_at_newline_and_eof() {
        let p = script("let a = 1\nlet b = 2");
        assert_eq!(p.body.len(), 2);
    }

    #[test]
    fn reserved_binding_rejected_in_strict() {
        assert!(parse_script("'use strict'; var eval = 1;", ParserOptions::default()).is_err());
    }

    #[test]
    fn keywords_as_property_names() {
        script("let o = { default: 1, new: 2, in: 3 }; o.typeof;");
    }

    #[test]
    fn optional_chaining_requires_flag() {
        assert!(parse_script("a?.b", ParserOptions::default()).is_err());
        let opts = ParserOptions {
            optional_chaining: true,
            ..Default::default()
        };
        assert!(parse_script("a?.b", opts).is_ok());
    }
}
