use super::*;

impl Parser {
    pub(super) fn parse_statement_or_module_item(&mut self) -> Result<Statement, ParseError> {
        if self.kind == ProgramKind::Module {
            if self.is_keyword(Keyword::Import) && !self.import_is_call() {
                return self.parse_import_declaration();
            }
            if self.is_keyword(Keyword::Export) {
                return self.parse_export_declaration();
            }
        }
        self.parse_statement()
    }

    /// `import` starting a dynamic `import(...)` expression statement
    /// rather than an import declaration.
    fn import_is_call(&mut self) -> bool {
        let cp = self.checkpoint();
        let result = self.advance().is_ok() && self.is_punct(Punct::LParen);
        self.restore(cp);
        result
    }

    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        // Guards that need lookahead run before the borrow on the token.
        let let_declares = self.is_keyword(Keyword::Let) && self.let_starts_declaration();
        let async_function = self.is_keyword(Keyword::Async) && self.async_starts_function();
        match &self.current.token {
            Token::Punct(Punct::Semicolon) => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            Token::Punct(Punct::LBrace) => {
                self.advance()?;
                let body = self.parse_statement_list(Punct::RBrace)?;
                self.expect_punct(Punct::RBrace)?;
                Ok(Statement::Block(body))
            }
            Token::Keyword(Keyword::Var) => {
                let decl = self.parse_variable_declaration(DeclarationKind::Var)?;
                self.semicolon()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::Let) if let_declares => {
                let decl = self.parse_variable_declaration(DeclarationKind::Let)?;
                self.semicolon()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::Const) => {
                let decl = self.parse_variable_declaration(DeclarationKind::Const)?;
                self.semicolon()?;
                Ok(Statement::Variable(decl))
            }
            Token::Keyword(Keyword::If) => self.parse_if(),
            Token::Keyword(Keyword::While) => self.parse_while(),
            Token::Keyword(Keyword::Do) => self.parse_do_while(),
            Token::Keyword(Keyword::For) => self.parse_for(),
            Token::Keyword(Keyword::Return) => self.parse_return(),
            Token::Keyword(Keyword::Break) => {
                self.advance()?;
                let label = self.optional_label()?;
                self.semicolon()?;
                Ok(Statement::Break(label))
            }
            Token::Keyword(Keyword::Continue) => {
                self.advance()?;
                let label = self.optional_label()?;
                self.semicolon()?;
                Ok(Statement::Continue(label))
            }
            Token::Keyword(Keyword::Throw) => {
                self.advance()?;
                if self.current.newline_before {
                    return Err(self.error("Illegal newline after 'throw'"));
                }
                let expr = self.parse_expression()?;
                self.semicolon()?;
                Ok(Statement::Throw(expr))
            }
            Token::Keyword(Keyword::Try) => self.parse_try(),
            Token::Keyword(Keyword::Switch) => self.parse_switch(),
            Token::Keyword(Keyword::With) => {
                if self.strict {
                    return Err(self.error("'with' statements are not allowed in strict mode"));
                }
                self.advance()?;
                self.expect_punct(Punct::LParen)?;
                let object = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                let body = self.parse_statement()?;
                Ok(Statement::With(object, Box::new(body)))
            }
            Token::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.semicolon()?;
                Ok(Statement::Debugger)
            }
            Token::Keyword(Keyword::Function) => {
                let func = self.parse_function(FunctionKind::Normal, true)?;
                Ok(Statement::FunctionDeclaration(func))
            }
            Token::Keyword(Keyword::Async) if async_function => {
                self.advance()?;
                let func = self.parse_function(FunctionKind::Async, true)?;
                Ok(Statement::FunctionDeclaration(func))
            }
            Token::Keyword(Keyword::Class) => {
                let class = self.parse_class()?;
                if class.name.is_none() {
                    return Err(self.error("Class declarations require a name"));
                }
                Ok(Statement::ClassDeclaration(class))
            }
            _ => {
                // Labelled statement: IdentifierReference ':'
                if let Some(name) = self.identifier_reference() {
                    let cp = self.checkpoint();
                    self.advance()?;
                    if self.eat_punct(Punct::Colon)? {
                        let body = self.parse_statement()?;
                        return Ok(Statement::Labeled(name, Box::new(body)));
                    }
                    self.restore(cp);
                }
                let expr = self.parse_expression()?;
                self.semicolon()?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    pub(super) fn parse_statement_list(&mut self, end: Punct) -> Result<Vec<Statement>, ParseError> {
        let mut out = Vec::new();
        while !self.is_punct(end) && self.current.token != Token::Eof {
            out.push(self.parse_statement()?);
        }
        Ok(out)
    }

    /// `let` only introduces a declaration when followed by something that
    /// can begin a binding; otherwise it is an ordinary identifier.
    fn let_starts_declaration(&mut self) -> bool {
        let cp = self.checkpoint();
        let starts = self.advance().is_ok()
            && (self.identifier_reference().is_some()
                || self.is_punct(Punct::LBracket)
                || self.is_punct(Punct::LBrace));
        self.restore(cp);
        starts
    }

    pub(super) fn async_starts_function(&mut self) -> bool {
        let cp = self.checkpoint();
        let result = self.advance().is_ok()
            && self.is_keyword(Keyword::Function)
            && !self.current.newline_before;
        self.restore(cp);
        result
    }

    fn optional_label(&mut self) -> Result<Option<String>, ParseError> {
        if self.current.newline_before {
            return Ok(None);
        }
        if let Some(name) = self.identifier_reference() {
            self.advance()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While { test, body })
    }

    fn parse_do_while(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let body = Box::new(self.parse_statement()?);
        self.expect_keyword(Keyword::While)?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        // The trailing semicolon after do/while is always optional.
        let _ = self.eat_punct(Punct::Semicolon)?;
        Ok(Statement::DoWhile { body, test })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        if !self.in_function {
            return Err(self.error("'return' outside of function"));
        }
        self.advance()?;
        if self.is_punct(Punct::Semicolon)
            || self.is_punct(Punct::RBrace)
            || self.current.token == Token::Eof
            || self.current.newline_before
        {
            self.semicolon()?;
            return Ok(Statement::Return(None));
        }
        let expr = self.parse_expression()?;
        self.semicolon()?;
        Ok(Statement::Return(Some(expr)))
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let is_await = self.in_async && self.eat_keyword(Keyword::Await)?;
        self.expect_punct(Punct::LParen)?;

        // Empty initialiser: classic for.
        if self.eat_punct(Punct::Semicolon)? {
            return self.parse_for_tail(None, is_await);
        }

        let let_declares = self.is_keyword(Keyword::Let) && self.let_starts_declaration();
        let decl_kind = match &self.current.token {
            Token::Keyword(Keyword::Var) => Some(DeclarationKind::Var),
            Token::Keyword(Keyword::Let) if let_declares => Some(DeclarationKind::Let),
            Token::Keyword(Keyword::Const) => Some(DeclarationKind::Const),
            _ => None,
        };

        if let Some(kind) = decl_kind {
            self.advance()?;
            let pattern = self.parse_binding_pattern()?;
            if self.is_keyword(Keyword::In) {
                self.advance()?;
                let right = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Statement::ForIn {
                    left: ForHead::Declaration(kind, pattern),
                    right,
                    body,
                });
            }
            if self.is_keyword(Keyword::Of) {
                self.advance()?;
                let right = self.parse_assignment_expression()?;
                self.expect_punct(Punct::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Statement::ForOf {
                    left: ForHead::Declaration(kind, pattern),
                    right,
                    body,
                    is_await,
                });
            }
            // Classic for with declarations: finish the declarator list.
            let mut declarators = Vec::new();
            let init = if self.eat_punct(Punct::Eq)? {
                Some(self.parse_assignment_expression_no_in()?)
            } else {
                None
            };
            if init.is_none()
                && (kind == DeclarationKind::Const || !matches!(pattern, Pattern::Identifier(_)))
            {
                return Err(self.error("Missing initializer in declaration"));
            }
            declarators.push(Declarator { pattern, init });
            while self.eat_punct(Punct::Comma)? {
                declarators.push(self.parse_declarator(kind, true)?);
            }
            self.expect_punct(Punct::Semicolon)?;
            let decl = VariableDeclaration { kind, declarators };
            return self.parse_for_tail(Some(ForInit::Declaration(decl)), is_await);
        }

        // Expression initialiser; `in`/`of` may follow.
        let expr = self.parse_expression_no_in()?;
        if self.is_keyword(Keyword::In) {
            self.advance()?;
            let left = ForHead::Assign(self.expression_to_pattern(expr)?);
            let right = self.parse_expression()?;
            self.expect_punct(Punct::RParen)?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Statement::ForIn { left, right, body });
        }
        if self.is_keyword(Keyword::Of) {
            self.advance()?;
            let left = ForHead::Assign(self.expression_to_pattern(expr)?);
            let right = self.parse_assignment_expression()?;
            self.expect_punct(Punct::RParen)?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Statement::ForOf {
                left,
                right,
                body,
                is_await,
            });
        }
        self.expect_punct(Punct::Semicolon)?;
        self.parse_for_tail(Some(ForInit::Expression(expr)), is_await)
    }

    fn parse_for_tail(
        &mut self,
        init: Option<ForInit>,
        is_await: bool,
    ) -> Result<Statement, ParseError> {
        if is_await {
            return Err(self.error("'for await' requires an of-loop"));
        }
        let test = if self.is_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;
        let update = if self.is_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect_punct(Punct::LBrace)?;
        let block = self.parse_statement_list(Punct::RBrace)?;
        self.expect_punct(Punct::RBrace)?;

        let handler = if self.eat_keyword(Keyword::Catch)? {
            // Optional catch binding.
            let param = if self.eat_punct(Punct::LParen)? {
                let p = self.parse_binding_pattern()?;
                self.expect_punct(Punct::RParen)?;
                Some(p)
            } else {
                None
            };
            self.expect_punct(Punct::LBrace)?;
            let body = self.parse_statement_list(Punct::RBrace)?;
            self.expect_punct(Punct::RBrace)?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally)? {
            self.expect_punct(Punct::LBrace)?;
            let body = self.parse_statement_list(Punct::RBrace)?;
            self.expect_punct(Punct::RBrace)?;
            Some(body)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Statement::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;

        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.is_punct(Punct::RBrace) {
            let test = if self.eat_keyword(Keyword::Case)? {
                let t = self.parse_expression()?;
                Some(t)
            } else if self.eat_keyword(Keyword::Default)? {
                if seen_default {
                    return Err(self.error("More than one default clause in switch"));
                }
                seen_default = true;
                None
            } else {
                return Err(self.error("Expected 'case' or 'default'"));
            };
            self.expect_punct(Punct::Colon)?;
            let mut body = Vec::new();
            while !self.is_punct(Punct::RBrace)
                && !self.is_keyword(Keyword::Case)
                && !self.is_keyword(Keyword::Default)
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect_punct(Punct::RBrace)?;
        Ok(Statement::Switch {
            discriminant,
            cases,
        })
    }
}
