use super::*;

impl Parser {
    /// Expression: AssignmentExpression (`,` AssignmentExpression)*.
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_assignment_expression()?;
        if !self.is_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat_punct(Punct::Comma)? {
            parts.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(parts))
    }

    pub(super) fn parse_expression_no_in(&mut self) -> Result<Expression, ParseError> {
        let saved = self.no_in;
        self.no_in = true;
        let result = self.parse_expression();
        self.no_in = saved;
        result
    }

    pub(super) fn parse_assignment_expression_no_in(&mut self) -> Result<Expression, ParseError> {
        let saved = self.no_in;
        self.no_in = true;
        let result = self.parse_assignment_expression();
        self.no_in = saved;
        result
    }

    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, ParseError> {
        // YieldExpression only inside generator bodies.
        if self.in_generator && self.is_keyword(Keyword::Yield) {
            return self.parse_yield();
        }

        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let left = self.parse_conditional()?;

        let op = match &self.current.token {
            Token::Punct(p) => match p {
                Punct::Eq => Some(AssignOp::Assign),
                Punct::PlusEq => Some(AssignOp::Add),
                Punct::MinusEq => Some(AssignOp::Sub),
                Punct::StarEq => Some(AssignOp::Mul),
                Punct::SlashEq => Some(AssignOp::Div),
                Punct::PercentEq => Some(AssignOp::Mod),
                Punct::StarStarEq => Some(AssignOp::Exp),
                Punct::ShlEq => Some(AssignOp::LeftShift),
                Punct::ShrEq => Some(AssignOp::RightShift),
                Punct::UShrEq => Some(AssignOp::UnsignedRightShift),
                Punct::AmpEq => Some(AssignOp::BitAnd),
                Punct::PipeEq => Some(AssignOp::BitOr),
                Punct::CaretEq => Some(AssignOp::BitXor),
                Punct::AmpAmpEq => Some(AssignOp::LogicalAnd),
                Punct::PipePipeEq => Some(AssignOp::LogicalOr),
                Punct::QuestionQuestionEq => Some(AssignOp::Nullish),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        if matches!(
            op,
            AssignOp::LogicalAnd | AssignOp::LogicalOr | AssignOp::Nullish
        ) && !self.options.logical_assignment
        {
            return Err(self.error(
                "Logical assignment requires the 'logical-assignment' feature",
            ));
        }
        self.advance()?;
        let right = self.parse_assignment_expression()?;

        if op == AssignOp::Assign {
            match &left {
                Expression::Array(_) | Expression::Object(_) => {
                    let pattern = self.expression_to_pattern(left)?;
                    return Ok(Expression::AssignPattern(
                        Box::new(pattern),
                        Box::new(right),
                    ));
                }
                Expression::Identifier(name) => {
                    if self.strict && (name == "eval" || name == "arguments") {
                        return Err(self.error("Invalid assignment target in strict mode"));
                    }
                }
                Expression::Member { .. } => {}
                _ => return Err(self.error("Invalid assignment target")),
            }
        } else if !matches!(
            &left,
            Expression::Identifier(_) | Expression::Member { .. }
        ) {
            return Err(self.error("Invalid assignment target"));
        }
        Ok(Expression::Assign(op, Box::new(left), Box::new(right)))
    }

    fn parse_yield(&mut self) -> Result<Expression, ParseError> {
        self.advance()?;
        let delegate = !self.current.newline_before && self.eat_punct(Punct::Star)?;
        let argument = if delegate {
            Some(Box::new(self.parse_assignment_expression()?))
        } else if self.current.newline_before || !self.can_start_expression() {
            None
        } else {
            Some(Box::new(self.parse_assignment_expression()?))
        };
        Ok(Expression::Yield { argument, delegate })
    }

    fn can_start_expression(&self) -> bool {
        match &self.current.token {
            Token::Eof => false,
            Token::Punct(p) => !matches!(
                p,
                Punct::RParen
                    | Punct::RBracket
                    | Punct::RBrace
                    | Punct::Semicolon
                    | Punct::Comma
                    | Punct::Colon
            ),
            _ => true,
        }
    }

    /// Bounded backtracking for arrow heads: `x =>`, `(params) =>`,
    /// `async x =>`, `async (params) =>`.
    fn try_parse_arrow(&mut self) -> Result<Option<Expression>, ParseError> {
        let is_async_head = self.is_keyword(Keyword::Async);
        let cp = self.checkpoint();

        if is_async_head {
            self.advance()?;
            if self.current.newline_before {
                self.restore(cp);
                return Ok(None);
            }
        }

        // Single-identifier head.
        if let Some(name) = self.identifier_reference() {
            self.advance()?;
            if self.is_punct(Punct::Arrow) && !self.current.newline_before {
                self.advance()?;
                let (body, strict) = self.parse_arrow_body(is_async_head)?;
                return Ok(Some(Expression::Function(FunctionNode {
                    name: None,
                    params: vec![Pattern::Identifier(name)],
                    body,
                    kind: if is_async_head {
                        FunctionKind::AsyncArrow
                    } else {
                        FunctionKind::Arrow
                    },
                    strict,
                })));
            }
            self.restore(cp);
            return Ok(None);
        }

        // Parenthesised head.
        if self.is_punct(Punct::LParen) {
            let attempt = (|| -> Result<Option<Expression>, ParseError> {
                let params = self.parse_formal_parameters()?;
                if !self.is_punct(Punct::Arrow) || self.current.newline_before {
                    return Ok(None);
                }
                self.advance()?;
                let (body, strict) = self.parse_arrow_body(is_async_head)?;
                Ok(Some(Expression::Function(FunctionNode {
                    name: None,
                    params,
                    body,
                    kind: if is_async_head {
                        FunctionKind::AsyncArrow
                    } else {
                        FunctionKind::Arrow
                    },
                    strict,
                })))
            })();
            match attempt {
                Ok(Some(arrow)) => return Ok(Some(arrow)),
                _ => {
                    self.restore(cp);
                    return Ok(None);
                }
            }
        }

        self.restore(cp);
        Ok(None)
    }

    fn parse_conditional(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_short_circuit()?;
        if !self.eat_punct(Punct::Question)? {
            return Ok(test);
        }
        // The consequent permits `in` regardless of the enclosing head.
        let saved = self.no_in;
        self.no_in = false;
        let consequent = self.parse_assignment_expression();
        self.no_in = saved;
        let consequent = consequent?;
        self.expect_punct(Punct::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// `??` and `||`/`&&` with the no-mixing rule.
    fn parse_short_circuit(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;
        let mut saw_or = false;
        let mut saw_nullish = false;
        loop {
            if self.is_punct(Punct::PipePipe) {
                if saw_nullish {
                    return Err(self.error("Cannot mix '??' with '||' without parentheses"));
                }
                saw_or = true;
                self.advance()?;
                let right = self.parse_logical_and()?;
                left = Expression::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
            } else if self.is_punct(Punct::QuestionQuestion) {
                if !self.options.nullish_coalescing {
                    return Err(self.error("'??' requires the 'nullish-coalescing' feature"));
                }
                if saw_or {
                    return Err(self.error("Cannot mix '??' with '||' without parentheses"));
                }
                saw_nullish = true;
                self.advance()?;
                let right = self.parse_logical_and()?;
                left = Expression::Logical(LogicalOp::Nullish, Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_binary(0)?;
        while self.is_punct(Punct::AmpAmp) {
            self.advance()?;
            let right = self.parse_binary(0)?;
            left = Expression::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match &self.current.token {
            Token::Punct(p) => match p {
                Punct::Pipe => (BinaryOp::BitOr, 1),
                Punct::Caret => (BinaryOp::BitXor, 2),
                Punct::Amp => (BinaryOp::BitAnd, 3),
                Punct::EqEq => (BinaryOp::LooseEq, 4),
                Punct::NotEq => (BinaryOp::LooseNotEq, 4),
                Punct::EqEqEq => (BinaryOp::StrictEq, 4),
                Punct::NotEqEq => (BinaryOp::StrictNotEq, 4),
                Punct::Lt => (BinaryOp::Lt, 5),
                Punct::Gt => (BinaryOp::Gt, 5),
                Punct::LtEq => (BinaryOp::LtEq, 5),
                Punct::GtEq => (BinaryOp::GtEq, 5),
                Punct::Shl => (BinaryOp::LeftShift, 6),
                Punct::Shr => (BinaryOp::RightShift, 6),
                Punct::UShr => (BinaryOp::UnsignedRightShift, 6),
                Punct::Plus => (BinaryOp::Add, 7),
                Punct::Minus => (BinaryOp::Sub, 7),
                Punct::Star => (BinaryOp::Mul, 8),
                Punct::Slash => (BinaryOp::Div, 8),
                Punct::Percent => (BinaryOp::Mod, 8),
                _ => return None,
            },
            Token::Keyword(Keyword::In) if !self.no_in => (BinaryOp::In, 5),
            Token::Keyword(Keyword::InstanceOf) => (BinaryOp::InstanceOf, 5),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over the plain binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_exponentiation()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(prec + 1)?;
            left = Expression::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `**` is right-associative and binds tighter than `*`.
    fn parse_exponentiation(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_unary()?;
        if self.is_punct(Punct::StarStar) {
            if matches!(left, Expression::Unary(..)) {
                return Err(self.error("Unparenthesized unary operand of '**'"));
            }
            self.advance()?;
            let right = self.parse_exponentiation()?;
            return Ok(Expression::Binary(
                BinaryOp::Exp,
                Box::new(left),
                Box::new(right),
            ));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match &self.current.token {
            Token::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            Token::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            Token::Punct(Punct::Bang) => Some(UnaryOp::Not),
            Token::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            Token::Keyword(Keyword::TypeOf) => Some(UnaryOp::TypeOf),
            Token::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            Token::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary()?;
            if op == UnaryOp::Delete && self.strict {
                if let Expression::Identifier(_) = &operand {
                    return Err(self.error("Cannot delete a variable in strict mode"));
                }
            }
            return Ok(Expression::Unary(op, Box::new(operand)));
        }

        if self.in_async && self.is_keyword(Keyword::Await) {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expression::Await(Box::new(operand)));
        }

        // Prefix update.
        if self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus) {
            let op = if self.is_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            let target = self.parse_unary()?;
            self.check_update_target(&target)?;
            return Ok(Expression::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }

        self.parse_postfix()
    }

    fn check_update_target(&self, target: &Expression) -> Result<(), ParseError> {
        match target {
            Expression::Identifier(name) => {
                if self.strict && (name == "eval" || name == "arguments") {
                    Err(self.error("Invalid update target in strict mode"))
                } else {
                    Ok(())
                }
            }
            Expression::Member { .. } => Ok(()),
            _ => Err(self.error("Invalid update expression target")),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_left_hand_side_expression()?;
        // No line terminator before postfix ++/--.
        if !self.current.newline_before
            && (self.is_punct(Punct::PlusPlus) || self.is_punct(Punct::MinusMinus))
        {
            let op = if self.is_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.check_update_target(&expr)?;
            self.advance()?;
            return Ok(Expression::Update {
                op,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = if self.is_keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        let mut any_optional = false;
        loop {
            match &self.current.token {
                Token::Punct(Punct::Dot) => {
                    self.advance()?;
                    let name = self
                        .identifier_name()
                        .ok_or_else(|| self.error("Expected property name after '.'"))?;
                    self.advance()?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property: MemberKey::Ident(name),
                        optional: false,
                    };
                }
                Token::Punct(Punct::LBracket) => {
                    self.advance()?;
                    let key = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket)?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property: MemberKey::Computed(Box::new(key)),
                        optional: false,
                    };
                }
                Token::Punct(Punct::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    };
                }
                Token::Punct(Punct::QuestionDot) => {
                    if !self.options.optional_chaining {
                        return Err(self.error("'?.' requires the 'optional-chaining' feature"));
                    }
                    any_optional = true;
                    self.advance()?;
                    if self.is_punct(Punct::LParen) {
                        let args = self.parse_arguments()?;
                        expr = Expression::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                        };
                    } else if self.is_punct(Punct::LBracket) {
                        self.advance()?;
                        let key = self.parse_expression()?;
                        self.expect_punct(Punct::RBracket)?;
                        expr = Expression::Member {
                            object: Box::new(expr),
                            property: MemberKey::Computed(Box::new(key)),
                            optional: true,
                        };
                    } else {
                        let name = self
                            .identifier_name()
                            .ok_or_else(|| self.error("Expected property name after '?.'"))?;
                        self.advance()?;
                        expr = Expression::Member {
                            object: Box::new(expr),
                            property: MemberKey::Ident(name),
                            optional: true,
                        };
                    }
                }
                Token::TemplatePiece { .. } => {
                    let template = self.parse_template_literal()?;
                    expr = Expression::TaggedTemplate(Box::new(expr), template);
                }
                _ => break,
            }
        }
        if any_optional {
            expr = Expression::OptionalChain(Box::new(expr));
        }
        Ok(expr)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.expect_keyword(Keyword::New)?;
        // `new.target`.
        if self.eat_punct(Punct::Dot)? {
            match self.identifier_name().as_deref() {
                Some("target") => {
                    self.advance()?;
                    return Ok(Expression::NewTarget);
                }
                _ => return Err(self.error("Expected 'target' after 'new.'")),
            }
        }
        let mut callee = if self.is_keyword(Keyword::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        // Member accesses bind to the constructor expression before the
        // argument list does.
        loop {
            match &self.current.token {
                Token::Punct(Punct::Dot) => {
                    self.advance()?;
                    let name = self
                        .identifier_name()
                        .ok_or_else(|| self.error("Expected property name after '.'"))?;
                    self.advance()?;
                    callee = Expression::Member {
                        object: Box::new(callee),
                        property: MemberKey::Ident(name),
                        optional: false,
                    };
                }
                Token::Punct(Punct::LBracket) => {
                    self.advance()?;
                    let key = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket)?;
                    callee = Expression::Member {
                        object: Box::new(callee),
                        property: MemberKey::Computed(Box::new(key)),
                        optional: false,
                    };
                }
                _ => break,
            }
        }
        let args = if self.is_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        loop {
            if self.eat_punct(Punct::RParen)? {
                break;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                args.push(Argument::Spread(self.parse_assignment_expression()?));
            } else {
                args.push(Argument::Item(self.parse_assignment_expression()?));
            }
            if !self.is_punct(Punct::RParen) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.current.token.clone() {
            Token::Num {
                value,
                legacy_octal,
            } => {
                if legacy_octal && self.strict {
                    return Err(self.error("Octal literals are not allowed in strict mode"));
                }
                self.advance()?;
                Ok(Expression::Literal(Literal::Number(value)))
            }
            Token::BigInt(value) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::BigInt(value)))
            }
            Token::Str { value, legacy_octal } => {
                if legacy_octal && self.strict {
                    return Err(self.error("Octal escape sequences are not allowed in strict mode"));
                }
                self.advance()?;
                Ok(Expression::Literal(Literal::String(value)))
            }
            Token::RegExp { pattern, flags } => {
                self.advance()?;
                Ok(Expression::Literal(Literal::RegExp(pattern, flags)))
            }
            Token::TemplatePiece { .. } => {
                let template = self.parse_template_literal()?;
                Ok(Expression::Template(template))
            }
            Token::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(Expression::Literal(Literal::Null))
            }
            Token::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Expression::This)
            }
            Token::Keyword(Keyword::Super) => {
                self.advance()?;
                if self.is_punct(Punct::LParen) {
                    let args = self.parse_arguments()?;
                    return Ok(Expression::SuperCall(args));
                }
                if self.eat_punct(Punct::Dot)? {
                    let name = self
                        .identifier_name()
                        .ok_or_else(|| self.error("Expected property name after 'super.'"))?;
                    self.advance()?;
                    return Ok(Expression::SuperProperty(MemberKey::Ident(name)));
                }
                if self.eat_punct(Punct::LBracket)? {
                    let key = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket)?;
                    return Ok(Expression::SuperProperty(MemberKey::Computed(Box::new(
                        key,
                    ))));
                }
                Err(self.error("'super' must be followed by a call or member access"))
            }
            Token::Keyword(Keyword::Function) => {
                let func = self.parse_function(FunctionKind::Normal, false)?;
                Ok(Expression::Function(func))
            }
            Token::Keyword(Keyword::Async) if self.async_starts_function() => {
                self.advance()?;
                let func = self.parse_function(FunctionKind::Async, false)?;
                Ok(Expression::Function(func))
            }
            Token::Keyword(Keyword::Class) => {
                let class = self.parse_class()?;
                Ok(Expression::Class(class))
            }
            Token::Keyword(Keyword::Import) => {
                self.advance()?;
                self.expect_punct(Punct::LParen)?;
                let specifier = self.parse_assignment_expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(Expression::ImportCall(Box::new(specifier)))
            }
            Token::Punct(Punct::LParen) => {
                self.advance()?;
                let saved = self.no_in;
                self.no_in = false;
                let expr = self.parse_expression();
                self.no_in = saved;
                let expr = expr?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::LBracket) => self.parse_array_literal(),
            Token::Punct(Punct::LBrace) => self.parse_object_literal(),
            _ => {
                if let Some(name) = self.identifier_reference() {
                    self.advance()?;
                    return Ok(Expression::Identifier(name));
                }
                Err(self.error(format!(
                    "Unexpected token {:?} in expression",
                    self.current.token
                )))
            }
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect_punct(Punct::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct(Punct::RBracket)? {
                break;
            }
            if self.eat_punct(Punct::Comma)? {
                elements.push(ArrayElement::Elision);
                continue;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                elements.push(ArrayElement::Spread(self.parse_assignment_expression()?));
            } else {
                elements.push(ArrayElement::Item(self.parse_assignment_expression()?));
            }
            if !self.is_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect_punct(Punct::LBrace)?;
        let mut properties = Vec::new();
        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            if self.eat_punct(Punct::Ellipsis)? {
                properties.push(ObjectProperty::Spread(self.parse_assignment_expression()?));
                if !self.is_punct(Punct::RBrace) {
                    self.expect_punct(Punct::Comma)?;
                }
                continue;
            }
            properties.push(self.parse_object_property()?);
            if !self.is_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }
        Ok(Expression::Object(properties))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, ParseError> {
        // Modifier detection mirrors class elements: async / * / get / set.
        let mut kind = FunctionKind::Method;
        let mut accessor: Option<AccessorKind> = None;
        let mut is_method = false;

        if self.is_keyword(Keyword::Async) && !self.object_modifier_is_name()? {
            self.advance()?;
            kind = FunctionKind::Async;
            is_method = true;
            if self.eat_punct(Punct::Star)? {
                kind = FunctionKind::AsyncGenerator;
            }
        } else if self.is_punct(Punct::Star) {
            self.advance()?;
            kind = FunctionKind::Generator;
            is_method = true;
        } else if self.is_keyword(Keyword::Get) && !self.object_modifier_is_name()? {
            self.advance()?;
            accessor = Some(AccessorKind::Get);
        } else if self.is_keyword(Keyword::Set) && !self.object_modifier_is_name()? {
            self.advance()?;
            accessor = Some(AccessorKind::Set);
        }

        let shorthand_name = if !is_method && accessor.is_none() {
            self.identifier_reference()
        } else {
            None
        };
        let key = self.parse_property_name()?;

        if let Some(acc) = accessor {
            let func_kind = match acc {
                AccessorKind::Get => FunctionKind::Getter,
                AccessorKind::Set => FunctionKind::Setter,
            };
            let params = self.parse_formal_parameters()?;
            match acc {
                AccessorKind::Get if !params.is_empty() => {
                    return Err(self.error("Getter must have no parameters"));
                }
                AccessorKind::Set if params.len() != 1 => {
                    return Err(self.error("Setter must have exactly one parameter"));
                }
                _ => {}
            }
            let (body, strict) = self.parse_function_body(func_kind)?;
            return Ok(ObjectProperty::Accessor {
                key,
                kind: acc,
                func: FunctionNode {
                    name: None,
                    params,
                    body,
                    kind: func_kind,
                    strict,
                },
            });
        }

        if self.is_punct(Punct::LParen) {
            let params = self.parse_formal_parameters()?;
            let (body, strict) = self.parse_function_body(kind)?;
            return Ok(ObjectProperty::Method {
                key,
                func: FunctionNode {
                    name: None,
                    params,
                    body,
                    kind: if kind == FunctionKind::Method {
                        FunctionKind::Method
                    } else {
                        kind
                    },
                    strict,
                },
            });
        }
        if is_method {
            return Err(self.error("Expected method body"));
        }

        if self.eat_punct(Punct::Colon)? {
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Init { key, value });
        }

        // Shorthand `{ name }` or cover-grammar `{ name = default }` (the
        // latter is only valid when reinterpreted as a pattern).
        let name =
            shorthand_name.ok_or_else(|| self.error("Invalid shorthand property"))?;
        if self.eat_punct(Punct::Eq)? {
            let default = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Init {
                key,
                value: Expression::Assign(
                    AssignOp::Assign,
                    Box::new(Expression::Identifier(name)),
                    Box::new(default),
                ),
            });
        }
        Ok(ObjectProperty::Init {
            key,
            value: Expression::Identifier(name),
        })
    }

    fn object_modifier_is_name(&mut self) -> Result<bool, ParseError> {
        let cp = self.checkpoint();
        self.advance()?;
        let is_name = self.is_punct(Punct::Colon)
            || self.is_punct(Punct::Comma)
            || self.is_punct(Punct::RBrace)
            || self.is_punct(Punct::LParen)
            || self.is_punct(Punct::Eq);
        self.restore(cp);
        Ok(is_name)
    }

    pub(super) fn parse_template_literal(&mut self) -> Result<TemplateLiteral, ParseError> {
        let site = self.next_template_site();
        let mut cooked = Vec::new();
        let mut raw = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let Token::TemplatePiece {
                cooked: piece_cooked,
                raw: piece_raw,
                tail,
            } = self.current.token.clone()
            else {
                return Err(self.error("Expected template literal"));
            };
            cooked.push(piece_cooked);
            raw.push(piece_raw);
            if tail {
                self.advance()?;
                break;
            }
            self.advance()?;
            expressions.push(self.parse_expression()?);
            if !self.is_punct(Punct::RBrace) {
                return Err(self.error("Expected '}' in template substitution"));
            }
            self.advance_template()?;
        }
        Ok(TemplateLiteral {
            cooked,
            raw,
            expressions,
            site,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_script, ParserOptions};
    use crate::ast::*;

    fn expr(src: &str) -> Expression {
        let program = parse_script(src, ParserOptions::default()).expect("parse error");
        match program.body.into_iter().next().unwrap() {
            Statement::Expression(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        match expr("1 + 2 * 3") {
            Expression::Binary(BinaryOp::Add, _, rhs) => {
                assert!(matches!(*rhs, Expression::Binary(BinaryOp::Mul, ..)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exponent_right_associative() {
        match expr("2 ** 3 ** 2") {
            Expression::Binary(BinaryOp::Exp, _, rhs) => {
                assert!(matches!(*rhs, Expression::Binary(BinaryOp::Exp, ..)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arrow_functions() {
        assert!(matches!(
            expr("x => x + 1"),
            Expression::Function(FunctionNode {
                kind: FunctionKind::Arrow,
                ..
            })
        ));
        assert!(matches!(
            expr("(a, b = 2, ...rest) => { return a; }"),
            Expression::Function(_)
        ));
    }

    #[test]
    fn parenthesized_is_not_arrow() {
        assert!(matches!(expr("(a + b)"), Expression::Binary(..)));
    }

    #[test]
    fn destructuring_assignment() {
        assert!(matches!(expr("[a, b] = c"), Expression::AssignPattern(..)));
        assert!(matches!(expr("({x} = y)"), Expression::AssignPattern(..)));
    }

    #[test]
    fn new_member_binding() {
        // new a.b(): the member access belongs to the constructor.
        match expr("new a.b()") {
            Expression::New { callee, .. } => {
                assert!(matches!(*callee, Expression::Member { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn template_literals() {
        match expr("`a${1}b${2}c`") {
            Expression::Template(t) => {
                assert_eq!(t.cooked.len(), 3);
                assert_eq!(t.expressions.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn optional_chain_wraps_root() {
        let opts = ParserOptions {
            optional_chaining: true,
            ..Default::default()
        };
        let program = parse_script("a?.b.c", opts).unwrap();
        match &program.body[0] {
            Statement::Expression(Expression::OptionalChain(_)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn object_literal_shapes() {
        match expr("({ a: 1, b, c() {}, get d() { return 1; }, ...e })") {
            Expression::Object(props) => assert_eq!(props.len(), 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dynamic_import_expression() {
        assert!(matches!(expr("import('mod')"), Expression::ImportCall(_)));
    }

    #[test]
    fn sequence_expression() {
        assert!(matches!(expr("(1, 2, 3)"), Expression::Sequence(v) if v.len() == 3));
    }
}
