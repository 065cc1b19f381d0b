use super::*;

impl Parser {
    /// Parse the declarator list after `var`/`let`/`const` (the keyword is
    /// still the current token).
    pub(super) fn parse_variable_declaration(
        &mut self,
        kind: DeclarationKind,
    ) -> Result<VariableDeclaration, ParseError> {
        self.advance()?;
        let mut declarators = vec![self.parse_declarator(kind, false)?];
        while self.eat_punct(Punct::Comma)? {
            declarators.push(self.parse_declarator(kind, false)?);
        }
        Ok(VariableDeclaration { kind, declarators })
    }

    pub(super) fn parse_declarator(
        &mut self,
        kind: DeclarationKind,
        no_in: bool,
    ) -> Result<Declarator, ParseError> {
        let pattern = self.parse_binding_pattern()?;
        let init = if self.eat_punct(Punct::Eq)? {
            Some(if no_in {
                self.parse_assignment_expression_no_in()?
            } else {
                self.parse_assignment_expression()?
            })
        } else {
            None
        };
        if init.is_none() {
            if kind == DeclarationKind::Const {
                return Err(self.error("Missing initializer in const declaration"));
            }
            if !matches!(pattern, Pattern::Identifier(_)) {
                return Err(self.error("Missing initializer in destructuring declaration"));
            }
        }
        Ok(Declarator { pattern, init })
    }

    /// BindingIdentifier | ArrayBindingPattern | ObjectBindingPattern.
    pub(super) fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        if self.is_punct(Punct::LBracket) {
            return self.parse_array_binding();
        }
        if self.is_punct(Punct::LBrace) {
            return self.parse_object_binding();
        }
        Ok(Pattern::Identifier(self.parse_binding_identifier()?))
    }

    /// A binding element: pattern with an optional default initializer.
    fn parse_binding_element(&mut self) -> Result<Pattern, ParseError> {
        let pattern = self.parse_binding_pattern()?;
        if self.eat_punct(Punct::Eq)? {
            let default = self.parse_assignment_expression()?;
            return Ok(Pattern::Default(Box::new(pattern), Box::new(default)));
        }
        Ok(pattern)
    }

    fn parse_array_binding(&mut self) -> Result<Pattern, ParseError> {
        self.expect_punct(Punct::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct(Punct::RBracket)? {
                break;
            }
            if self.eat_punct(Punct::Comma)? {
                elements.push(None);
                continue;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                let rest = self.parse_binding_pattern()?;
                elements.push(Some(Pattern::Rest(Box::new(rest))));
                self.expect_punct(Punct::RBracket)?;
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.is_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Pattern::Array(elements))
    }

    fn parse_object_binding(&mut self) -> Result<Pattern, ParseError> {
        self.expect_punct(Punct::LBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;
        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                let name = self.parse_binding_identifier()?;
                rest = Some(Box::new(Pattern::Identifier(name)));
                self.expect_punct(Punct::RBrace)?;
                break;
            }
            // `{ key: pattern }` or shorthand `{ name }` / `{ name = dflt }`.
            let shorthand_name = self.identifier_reference();
            let key = self.parse_property_name()?;
            if self.eat_punct(Punct::Colon)? {
                let value = self.parse_binding_element()?;
                properties.push(ObjectPatternProperty {
                    key,
                    value,
                    shorthand: false,
                });
            } else {
                let name = shorthand_name
                    .ok_or_else(|| self.error("Invalid shorthand property pattern"))?;
                let base = Pattern::Identifier(name);
                let value = if self.eat_punct(Punct::Eq)? {
                    let default = self.parse_assignment_expression()?;
                    Pattern::Default(Box::new(base), Box::new(default))
                } else {
                    base
                };
                properties.push(ObjectPatternProperty {
                    key,
                    value,
                    shorthand: true,
                });
            }
            if !self.is_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Pattern::Object { properties, rest })
    }

    // ── functions ─────────────────────────────────────────────────────

    /// Parse a function whose `function` keyword is the current token.
    /// `declaration` requires a name (default exports relax this at the
    /// call site by passing false).
    pub(super) fn parse_function(
        &mut self,
        base_kind: FunctionKind,
        declaration: bool,
    ) -> Result<FunctionNode, ParseError> {
        self.expect_keyword(Keyword::Function)?;
        let kind = if self.eat_punct(Punct::Star)? {
            match base_kind {
                FunctionKind::Async => FunctionKind::AsyncGenerator,
                _ => FunctionKind::Generator,
            }
        } else {
            base_kind
        };
        let name = if declaration || self.identifier_reference().is_some() {
            Some(self.parse_binding_identifier()?)
        } else {
            None
        };
        let params = self.parse_formal_parameters()?;
        let (body, strict) = self.parse_function_body(kind)?;
        Ok(FunctionNode {
            name,
            params,
            body,
            kind,
            strict,
        })
    }

    pub(super) fn parse_formal_parameters(&mut self) -> Result<Vec<Pattern>, ParseError> {
        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        loop {
            if self.eat_punct(Punct::RParen)? {
                break;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                let rest = self.parse_binding_pattern()?;
                params.push(Pattern::Rest(Box::new(rest)));
                self.expect_punct(Punct::RParen)?;
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.is_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(params)
    }

    /// Parse a `{ ... }` function body under the right generator/async
    /// context; returns the body and whether it is strict.
    pub(super) fn parse_function_body(
        &mut self,
        kind: FunctionKind,
    ) -> Result<(FunctionBody, bool), ParseError> {
        let saved_strict = self.strict;
        let saved_gen = self.in_generator;
        let saved_async = self.in_async;
        let saved_fn = self.in_function;
        self.in_generator = kind.is_generator();
        self.in_async = kind.is_async();
        self.in_function = true;

        let result = (|| {
            self.expect_punct(Punct::LBrace)?;
            let mut body = Vec::new();
            let strict = self.directive_prologue(&mut body)?;
            if strict {
                self.strict = true;
            }
            while !self.is_punct(Punct::RBrace) && self.current.token != Token::Eof {
                body.push(self.parse_statement()?);
            }
            self.expect_punct(Punct::RBrace)?;
            Ok((FunctionBody::Block(body), self.strict))
        })();

        self.strict = saved_strict;
        self.in_generator = saved_gen;
        self.in_async = saved_async;
        self.in_function = saved_fn;
        result
    }

    /// Arrow function body: concise expression or block.
    pub(super) fn parse_arrow_body(
        &mut self,
        is_async: bool,
    ) -> Result<(FunctionBody, bool), ParseError> {
        if self.is_punct(Punct::LBrace) {
            let kind = if is_async {
                FunctionKind::AsyncArrow
            } else {
                FunctionKind::Arrow
            };
            return self.parse_function_body(kind);
        }
        let saved_gen = self.in_generator;
        let saved_async = self.in_async;
        let saved_fn = self.in_function;
        self.in_generator = false;
        self.in_async = is_async;
        self.in_function = true;
        let expr = self.parse_assignment_expression();
        self.in_generator = saved_gen;
        self.in_async = saved_async;
        self.in_function = saved_fn;
        Ok((FunctionBody::Expression(Box::new(expr?)), self.strict))
    }

    // ── classes ───────────────────────────────────────────────────────

    pub(super) fn parse_class(&mut self) -> Result<ClassNode, ParseError> {
        self.expect_keyword(Keyword::Class)?;
        // Class bodies are always strict.
        let saved_strict = self.strict;
        self.strict = true;

        let result = (|| {
            let name = if self.identifier_reference().is_some() {
                Some(self.parse_binding_identifier()?)
            } else {
                None
            };
            let heritage = if self.eat_keyword(Keyword::Extends)? {
                Some(Box::new(self.parse_left_hand_side_expression()?))
            } else {
                None
            };
            self.expect_punct(Punct::LBrace)?;
            let mut elements = Vec::new();
            let mut seen_constructor = false;
            while !self.is_punct(Punct::RBrace) {
                if self.eat_punct(Punct::Semicolon)? {
                    continue;
                }
                elements.push(self.parse_class_element(&mut seen_constructor)?);
            }
            self.expect_punct(Punct::RBrace)?;
            Ok(ClassNode {
                name,
                heritage,
                elements,
            })
        })();

        self.strict = saved_strict;
        result
    }

    fn parse_class_element(
        &mut self,
        seen_constructor: &mut bool,
    ) -> Result<ClassElement, ParseError> {
        let is_static = if self.is_keyword(Keyword::Static) {
            let cp = self.checkpoint();
            self.advance()?;
            // `static` alone may itself be a method or field name.
            if self.is_punct(Punct::LParen) || self.is_punct(Punct::Eq) {
                self.restore(cp);
                false
            } else {
                true
            }
        } else {
            false
        };

        let mut kind = FunctionKind::Method;
        let mut accessor: Option<MethodKind> = None;

        if self.is_keyword(Keyword::Async) && !self.modifier_is_name()? {
            self.advance()?;
            kind = FunctionKind::Async;
            if self.eat_punct(Punct::Star)? {
                kind = FunctionKind::AsyncGenerator;
            }
        } else if self.eat_punct(Punct::Star)? {
            kind = FunctionKind::Generator;
        } else if self.is_keyword(Keyword::Get) && !self.modifier_is_name()? {
            self.advance()?;
            accessor = Some(MethodKind::Get);
        } else if self.is_keyword(Keyword::Set) && !self.modifier_is_name()? {
            self.advance()?;
            accessor = Some(MethodKind::Set);
        }

        let key = self.parse_property_name()?;

        // Class field (feature-gated): `name = value;` or bare `name;`.
        if accessor.is_none() && kind == FunctionKind::Method && !self.is_punct(Punct::LParen) {
            if !self.options.class_fields {
                return Err(self.error("Class fields require the 'class-fields' feature"));
            }
            let value = if self.eat_punct(Punct::Eq)? {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            let _ = self.eat_punct(Punct::Semicolon)?;
            return Ok(ClassElement::Field {
                key,
                value,
                is_static,
            });
        }

        let is_constructor = !is_static
            && accessor.is_none()
            && kind == FunctionKind::Method
            && matches!(&key, PropName::Ident(n) if n == "constructor");
        if is_constructor {
            if *seen_constructor {
                return Err(self.error("A class may only have one constructor"));
            }
            *seen_constructor = true;
            kind = FunctionKind::ClassConstructor;
        }

        let func_kind = match accessor {
            Some(MethodKind::Get) => FunctionKind::Getter,
            Some(MethodKind::Set) => FunctionKind::Setter,
            _ => kind,
        };
        let params = self.parse_formal_parameters()?;
        match accessor {
            Some(MethodKind::Get) if !params.is_empty() => {
                return Err(self.error("Getter must have no parameters"));
            }
            Some(MethodKind::Set) if params.len() != 1 => {
                return Err(self.error("Setter must have exactly one parameter"));
            }
            _ => {}
        }
        let (body, strict) = self.parse_function_body(func_kind)?;
        let method_kind = match accessor {
            Some(k) => k,
            None if is_constructor => MethodKind::Constructor,
            None => MethodKind::Method,
        };
        Ok(ClassElement::Method {
            key,
            kind: method_kind,
            func: FunctionNode {
                name: None,
                params,
                body,
                kind: func_kind,
                strict,
            },
            is_static,
        })
    }

    /// After `async`/`get`/`set`, decide whether the keyword is itself the
    /// member name (`async() {}`, `get = 1`) rather than a modifier.
    fn modifier_is_name(&mut self) -> Result<bool, ParseError> {
        let cp = self.checkpoint();
        self.advance()?;
        let is_name = self.is_punct(Punct::LParen)
            || self.is_punct(Punct::Eq)
            || self.is_punct(Punct::Semicolon)
            || self.is_punct(Punct::RBrace);
        self.restore(cp);
        Ok(is_name)
    }

    // ── expression-to-pattern reinterpretation ────────────────────────

    /// Reinterpret an already-parsed expression as an assignment target
    /// pattern (destructuring assignment, for-in/of heads).
    pub(super) fn expression_to_pattern(&self, expr: Expression) -> Result<Pattern, ParseError> {
        match expr {
            Expression::Identifier(name) => Ok(Pattern::Identifier(name)),
            Expression::Member { .. } => Ok(Pattern::Member(Box::new(expr))),
            Expression::Array(elements) => {
                let mut out = Vec::new();
                let count = elements.len();
                for (i, el) in elements.into_iter().enumerate() {
                    match el {
                        ArrayElement::Elision => out.push(None),
                        ArrayElement::Item(e) => out.push(Some(self.expression_to_pattern(e)?)),
                        ArrayElement::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.error("Rest element must be last"));
                            }
                            let inner = self.expression_to_pattern(e)?;
                            out.push(Some(Pattern::Rest(Box::new(inner))));
                        }
                    }
                }
                Ok(Pattern::Array(out))
            }
            Expression::Object(props) => {
                let mut properties = Vec::new();
                let mut rest = None;
                let count = props.len();
                for (i, prop) in props.into_iter().enumerate() {
                    match prop {
                        ObjectProperty::Init { key, value } => {
                            let pattern = self.expression_to_pattern(value)?;
                            properties.push(ObjectPatternProperty {
                                key,
                                value: pattern,
                                shorthand: false,
                            });
                        }
                        ObjectProperty::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.error("Rest property must be last"));
                            }
                            rest = Some(Box::new(self.expression_to_pattern(e)?));
                        }
                        _ => return Err(self.error("Invalid destructuring target")),
                    }
                }
                Ok(Pattern::Object { properties, rest })
            }
            Expression::Assign(AssignOp::Assign, target, default) => {
                let inner = self.expression_to_pattern(*target)?;
                Ok(Pattern::Default(Box::new(inner), default))
            }
            _ => Err(self.error("Invalid assignment target")),
        }
    }
}
