use crate::ast::*;
use crate::interpreter::agent::Agent;
use crate::interpreter::completion::Completion;
use crate::interpreter::environment::{Environment, EnvRef};
use crate::interpreter::helpers::{strict_equals, IteratorRecord};
use crate::interpreter::object::{ObjectKind, ParameterMap, UserFunction};
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::JsValue;
use rustc_hash::FxHashMap;
use std::rc::Rc;

impl Agent {
    // ── script evaluation (§16.1.6–7) ────────────────────────────────

    pub(crate) fn script_evaluation(&mut self, program: &Program, global_env: &EnvRef) -> Completion {
        if let Err(e) = self.global_declaration_instantiation(&program.body, global_env) {
            return Completion::Throw(e);
        }
        self.evaluate_statements(&program.body)
    }

    /// GlobalDeclarationInstantiation (§16.1.7).
    fn global_declaration_instantiation(
        &mut self,
        body: &[Statement],
        env: &EnvRef,
    ) -> Result<(), JsValue> {
        let lex_names = lexically_declared_names(body);
        let var_names = var_declared_names(body);
        for name in &lex_names {
            if !self.global_can_declare_lexical(env, name)? {
                return Err(
                    self.syntax_error(&format!("Identifier '{name}' has already been declared"))
                );
            }
            if var_names.contains(name) {
                return Err(
                    self.syntax_error(&format!("Identifier '{name}' has already been declared"))
                );
            }
        }

        // Functions first (last declaration of a name wins), then vars.
        let functions = var_scoped_functions(body);
        let mut declared_fns: Vec<&str> = Vec::new();
        for func in functions.iter().rev() {
            let name = func.name.as_deref().expect("declared function has a name");
            if declared_fns.contains(&name) {
                continue;
            }
            declared_fns.push(name);
        }
        for name in &var_names {
            if declared_fns.contains(&name.as_str()) {
                continue;
            }
            self.create_global_var_binding(env, name)?;
        }
        for (kind, name) in lexical_declarations(body) {
            match kind {
                DeclarationKind::Const => self.env_create_immutable_binding(env, &name),
                _ => self.env_create_mutable_binding(env, &name, false)?,
            }
        }
        // Instantiate functions in source order after binding creation.
        for func in &functions {
            let name = func.name.clone().expect("declared function has a name");
            let value = self.instantiate_function(func, env, None);
            self.create_global_function_binding(env, &name, value)?;
        }
        Ok(())
    }

    // ── statement lists ──────────────────────────────────────────────

    /// Evaluate a statement list, tracking the completion value per
    /// UpdateEmpty.
    pub fn evaluate_statements(&mut self, statements: &[Statement]) -> Completion {
        let mut value = JsValue::Undefined;
        for statement in statements {
            match self.evaluate_statement(statement) {
                Completion::Normal(v) => {
                    if !v.is_undefined() || statement_produces_value(statement) {
                        value = v;
                    }
                }
                abrupt => return abrupt.update_value(value),
            }
        }
        Completion::Normal(value)
    }

    pub fn evaluate_statement(&mut self, statement: &Statement) -> Completion {
        self.evaluate_statement_with_labels(statement, &[])
    }

    fn evaluate_statement_with_labels(
        &mut self,
        statement: &Statement,
        labels: &[String],
    ) -> Completion {
        match statement {
            Statement::Empty | Statement::Debugger => Completion::empty(),
            Statement::Expression(expr) => self.evaluate_expression(expr),
            Statement::Block(body) => self.evaluate_block(body),
            Statement::Variable(decl) => self.evaluate_variable_declaration(decl),
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                let t = crate::try_normal!(self.evaluate_expression(test));
                if self.to_boolean(&t) {
                    self.evaluate_statement(consequent)
                } else if let Some(alternate) = alternate {
                    self.evaluate_statement(alternate)
                } else {
                    Completion::empty()
                }
            }
            Statement::While { test, body } => self.evaluate_while(test, body, labels),
            Statement::DoWhile { body, test } => self.evaluate_do_while(body, test, labels),
            Statement::For {
                init,
                test,
                update,
                body,
            } => self.evaluate_for(init.as_ref(), test.as_ref(), update.as_ref(), body, labels),
            Statement::ForIn { left, right, body } => {
                self.evaluate_for_in(left, right, body, labels)
            }
            Statement::ForOf {
                left,
                right,
                body,
                is_await,
            } => self.evaluate_for_of(left, right, body, *is_await, labels),
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expr) => crate::try_normal!(self.evaluate_expression(expr)),
                    None => JsValue::Undefined,
                };
                Completion::Return(value)
            }
            Statement::Break(label) => Completion::Break(label.clone()),
            Statement::Continue(label) => Completion::Continue(label.clone()),
            Statement::Throw(expr) => {
                let value = crate::try_normal!(self.evaluate_expression(expr));
                Completion::Throw(value)
            }
            Statement::Try {
                block,
                handler,
                finalizer,
            } => self.evaluate_try(block, handler.as_ref(), finalizer.as_ref()),
            Statement::Switch {
                discriminant,
                cases,
            } => {
                let completion = self.evaluate_switch(discriminant, cases);
                completion.consume_break(labels)
            }
            Statement::Labeled(label, inner) => {
                let mut inner_labels = labels.to_vec();
                inner_labels.push(label.clone());
                let completion = self.evaluate_statement_with_labels(inner, &inner_labels);
                completion.consume_break(&inner_labels)
            }
            Statement::With(object, body) => self.evaluate_with(object, body),
            Statement::FunctionDeclaration(_) => Completion::empty(), // hoisted
            Statement::ClassDeclaration(node) => {
                let value = match self.class_definition_evaluation(node, None) {
                    Ok(v) => v,
                    Err(e) => return Completion::Throw(e),
                };
                let env = self.lexical_env();
                let name = node.name.clone().expect("class declaration has a name");
                crate::try_op!(self.env_initialize_binding(&env, &name, value));
                Completion::empty()
            }
            // Imports bind at link time.
            Statement::Import(_) => Completion::empty(),
            Statement::Export(decl) => match decl {
                ExportDeclaration::Declaration(inner) => self.evaluate_statement(inner),
                ExportDeclaration::Default(inner) => match inner.as_ref() {
                    Statement::Expression(expr) => {
                        let value = if expr.is_anonymous_function_definition() {
                            crate::try_normal!(self.named_evaluation(expr, "default"))
                        } else {
                            crate::try_normal!(self.evaluate_expression(expr))
                        };
                        let env = self.lexical_env();
                        crate::try_op!(self.env_initialize_binding(
                            &env,
                            crate::interpreter::module::DEFAULT_EXPORT_BINDING,
                            value
                        ));
                        Completion::empty()
                    }
                    other => self.evaluate_statement(other),
                },
                // Re-export forms have no runtime component.
                ExportDeclaration::Named { .. } | ExportDeclaration::Star { .. } => {
                    Completion::empty()
                }
            },
        }
    }

    // ── blocks (§14.2) ───────────────────────────────────────────────

    fn evaluate_block(&mut self, body: &[Statement]) -> Completion {
        let outer = self.lexical_env();
        let block_env = Environment::new_declarative(Some(outer.clone()));
        if let Err(e) = self.block_declaration_instantiation(body, &block_env) {
            return Completion::Throw(e);
        }
        self.set_lexical_env(block_env);
        let completion = self.evaluate_statements(body);
        self.set_lexical_env(outer);
        completion
    }

    /// BlockDeclarationInstantiation: lexical bindings plus block-level
    /// function declarations (hoisted and initialised).
    pub(crate) fn block_declaration_instantiation(
        &mut self,
        body: &[Statement],
        env: &EnvRef,
    ) -> Result<(), JsValue> {
        for (kind, name) in lexical_declarations(body) {
            match kind {
                DeclarationKind::Const => self.env_create_immutable_binding(env, &name),
                _ => self.env_create_mutable_binding(env, &name, false)?,
            }
        }
        for statement in body {
            if let Statement::FunctionDeclaration(func) = statement {
                let name = func.name.clone().expect("declared function has a name");
                self.env_create_mutable_binding(env, &name, false)?;
                let value = self.instantiate_function(func, env, None);
                self.env_initialize_binding(env, &name, value)?;
            }
        }
        Ok(())
    }

    // ── declarations (§14.3) ─────────────────────────────────────────

    fn evaluate_variable_declaration(&mut self, decl: &VariableDeclaration) -> Completion {
        for declarator in &decl.declarators {
            match decl.kind {
                DeclarationKind::Var => {
                    let Some(init) = &declarator.init else {
                        continue;
                    };
                    // var bindings already exist (hoisted); this is an
                    // assignment through the resolved reference.
                    if let Pattern::Identifier(name) = &declarator.pattern {
                        let reference = crate::try_op!(self.resolve_binding(name));
                        let value = if init.is_anonymous_function_definition() {
                            crate::try_normal!(self.named_evaluation(init, name))
                        } else {
                            crate::try_normal!(self.evaluate_expression(init))
                        };
                        crate::try_op!(self.put_value(&reference, value));
                    } else {
                        let value = crate::try_normal!(self.evaluate_expression(init));
                        crate::try_op!(self.destructuring_assign(&declarator.pattern, value));
                    }
                }
                DeclarationKind::Let | DeclarationKind::Const => {
                    let env = self.lexical_env();
                    let value = match &declarator.init {
                        Some(init) => {
                            if let (Pattern::Identifier(name), true) = (
                                &declarator.pattern,
                                init.is_anonymous_function_definition(),
                            ) {
                                crate::try_normal!(self.named_evaluation(init, name))
                            } else {
                                crate::try_normal!(self.evaluate_expression(init))
                            }
                        }
                        None => JsValue::Undefined,
                    };
                    crate::try_op!(self.binding_initialize(&declarator.pattern, value, &env));
                }
            }
        }
        Completion::empty()
    }

    /// BindingInitialization: initialise pre-created bindings through a
    /// pattern.
    pub fn binding_initialize(
        &mut self,
        pattern: &Pattern,
        value: JsValue,
        env: &EnvRef,
    ) -> Result<(), JsValue> {
        match pattern {
            Pattern::Identifier(name) => self.env_initialize_binding(env, name, value),
            Pattern::Default(inner, default) => {
                let value = if value.is_undefined() {
                    let v = match (inner.as_ref(), default.is_anonymous_function_definition()) {
                        (Pattern::Identifier(name), true) => {
                            match self.named_evaluation(default, name) {
                                Completion::Normal(v) => v,
                                Completion::Throw(e) => return Err(e),
                                _ => JsValue::Undefined,
                            }
                        }
                        _ => match self.evaluate_expression(default) {
                            Completion::Normal(v) => v,
                            Completion::Throw(e) => return Err(e),
                            _ => JsValue::Undefined,
                        },
                    };
                    v
                } else {
                    value
                };
                self.binding_initialize(inner, value, env)
            }
            Pattern::Rest(inner) => self.binding_initialize(inner, value, env),
            Pattern::Array(elements) => {
                let record = self.get_iterator(&value, false)?;
                let result = self.binding_initialize_array(elements, &record, env);
                match result {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        let _ = self.iterator_close(&record, Err(e.clone()));
                        Err(e)
                    }
                }
            }
            Pattern::Object { properties, rest } => {
                self.require_object_coercible(&value)?;
                let mut seen = Vec::new();
                for prop in properties {
                    let key = self.evaluate_property_name(&prop.key)?;
                    seen.push(key.clone());
                    let v = self.get_v(&value, &key)?;
                    self.binding_initialize(&prop.value, v, env)?;
                }
                if let Some(rest) = rest {
                    let realm = self.current_realm();
                    let target = self.create_ordinary_object(realm);
                    self.copy_data_properties(target, &value, &seen)?;
                    self.binding_initialize(rest, JsValue::object(target), env)?;
                }
                Ok(())
            }
            Pattern::Member(_) => Err(self.syntax_error("Invalid binding pattern")),
        }
    }

    fn binding_initialize_array(
        &mut self,
        elements: &[Option<Pattern>],
        record: &IteratorRecord,
        env: &EnvRef,
    ) -> Result<(), JsValue> {
        let mut exhausted = false;
        for element in elements {
            match element {
                None => {
                    if !exhausted && self.iterator_step(record)?.is_none() {
                        exhausted = true;
                    }
                }
                Some(Pattern::Rest(inner)) => {
                    let mut rest = Vec::new();
                    while !exhausted {
                        match self.iterator_step(record)? {
                            Some(result) => rest.push(self.iterator_value(&result)?),
                            None => exhausted = true,
                        }
                    }
                    let array = self.create_array_from_list(&rest);
                    self.binding_initialize(inner, array, env)?;
                }
                Some(pattern) => {
                    let value = if exhausted {
                        JsValue::Undefined
                    } else {
                        match self.iterator_step(record)? {
                            Some(result) => self.iterator_value(&result)?,
                            None => {
                                exhausted = true;
                                JsValue::Undefined
                            }
                        }
                    };
                    self.binding_initialize(pattern, value, env)?;
                }
            }
        }
        if !exhausted {
            self.iterator_close(record, Ok(JsValue::Undefined))?;
        }
        Ok(())
    }

    // ── loops (§14.7) ────────────────────────────────────────────────

    fn evaluate_while(
        &mut self,
        test: &Expression,
        body: &Statement,
        labels: &[String],
    ) -> Completion {
        let mut value = JsValue::Undefined;
        loop {
            let t = crate::try_normal!(self.evaluate_expression(test));
            if !self.to_boolean(&t) {
                return Completion::Normal(value);
            }
            match self.evaluate_statement(body) {
                Completion::Normal(v) => {
                    if !v.is_undefined() {
                        value = v;
                    }
                }
                c if c.is_continue_for(labels) => {}
                Completion::Break(None) => return Completion::Normal(value),
                Completion::Break(Some(l)) if labels.contains(&l) => {
                    return Completion::Normal(value);
                }
                abrupt => return abrupt.update_value(value),
            }
        }
    }

    fn evaluate_do_while(
        &mut self,
        body: &Statement,
        test: &Expression,
        labels: &[String],
    ) -> Completion {
        let mut value = JsValue::Undefined;
        loop {
            match self.evaluate_statement(body) {
                Completion::Normal(v) => {
                    if !v.is_undefined() {
                        value = v;
                    }
                }
                c if c.is_continue_for(labels) => {}
                Completion::Break(None) => return Completion::Normal(value),
                Completion::Break(Some(l)) if labels.contains(&l) => {
                    return Completion::Normal(value);
                }
                abrupt => return abrupt.update_value(value),
            }
            let t = crate::try_normal!(self.evaluate_expression(test));
            if !self.to_boolean(&t) {
                return Completion::Normal(value);
            }
        }
    }

    fn evaluate_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        labels: &[String],
    ) -> Completion {
        let outer = self.lexical_env();
        let mut per_iteration_names: Vec<String> = Vec::new();

        let loop_env = match init {
            Some(ForInit::Declaration(decl)) if decl.kind.is_lexical() => {
                let env = Environment::new_declarative(Some(outer.clone()));
                for declarator in &decl.declarators {
                    let mut names = Vec::new();
                    declarator.pattern.bound_names(&mut names);
                    for name in names {
                        if decl.kind == DeclarationKind::Const {
                            self.env_create_immutable_binding(&env, &name);
                        } else {
                            if let Err(e) = self.env_create_mutable_binding(&env, &name, false) {
                                return Completion::Throw(e);
                            }
                            per_iteration_names.push(name);
                        }
                    }
                }
                Some(env)
            }
            _ => None,
        };
        if let Some(env) = &loop_env {
            self.set_lexical_env(env.clone());
        }

        let completion = (|this: &mut Agent| {
            match init {
                Some(ForInit::Declaration(decl)) => {
                    let c = this.evaluate_variable_declaration(decl);
                    if c.is_abrupt() {
                        return c;
                    }
                }
                Some(ForInit::Expression(expr)) => {
                    let c = this.evaluate_expression(expr);
                    if c.is_abrupt() {
                        return c;
                    }
                }
                None => {}
            }
            // Per-iteration copies of let bindings: closures in the body
            // capture that iteration's values.
            if !per_iteration_names.is_empty() {
                if let Err(e) = this.copy_per_iteration_bindings(&per_iteration_names) {
                    return Completion::Throw(e);
                }
            }
            let mut value = JsValue::Undefined;
            loop {
                if let Some(test) = test {
                    let t = match this.evaluate_expression(test) {
                        Completion::Normal(v) => v,
                        abrupt => return abrupt,
                    };
                    if !this.to_boolean(&t) {
                        return Completion::Normal(value);
                    }
                }
                match this.evaluate_statement(body) {
                    Completion::Normal(v) => {
                        if !v.is_undefined() {
                            value = v;
                        }
                    }
                    c if c.is_continue_for(labels) => {}
                    Completion::Break(None) => return Completion::Normal(value),
                    Completion::Break(Some(l)) if labels.contains(&l) => {
                        return Completion::Normal(value);
                    }
                    abrupt => return abrupt.update_value(value),
                }
                if !per_iteration_names.is_empty() {
                    if let Err(e) = this.copy_per_iteration_bindings(&per_iteration_names) {
                        return Completion::Throw(e);
                    }
                }
                if let Some(update) = update {
                    let c = this.evaluate_expression(update);
                    if c.is_abrupt() {
                        return c;
                    }
                }
            }
        })(self);

        self.set_lexical_env(outer);
        completion
    }

    /// CreatePerIterationEnvironment: a fresh environment whose bindings
    /// start from the previous iteration's values.
    fn copy_per_iteration_bindings(&mut self, names: &[String]) -> Result<(), JsValue> {
        let current = self.lexical_env();
        let outer = current.borrow().outer.clone();
        let fresh = Environment::new_declarative(outer);
        for name in names {
            let value = self.get_binding_value(&current, name, true)?;
            self.env_create_mutable_binding(&fresh, name, false)?;
            self.env_initialize_binding(&fresh, name, value)?;
        }
        self.set_lexical_env(fresh);
        Ok(())
    }

    fn evaluate_for_in(
        &mut self,
        left: &ForHead,
        right: &Expression,
        body: &Statement,
        labels: &[String],
    ) -> Completion {
        let object = crate::try_normal!(self.evaluate_expression(right));
        if object.is_nullish() {
            return Completion::empty();
        }
        let id = crate::try_op!(self.to_object(&object));
        let keys = crate::try_op!(self.enumerate_properties_for_in(id));
        let mut value = JsValue::Undefined;
        for key in keys {
            // A key deleted mid-walk is skipped.
            let still_there = crate::try_op!(self.internal_has_property(id, &key));
            if !still_there {
                continue;
            }
            let key_value = key.to_value();
            match self.bind_for_head(left, key_value, body, labels, &mut value) {
                LoopStep::Continue => {}
                LoopStep::Break => return Completion::Normal(value),
                LoopStep::Abrupt(c) => return c.update_value(value),
            }
        }
        Completion::Normal(value)
    }

    fn evaluate_for_of(
        &mut self,
        left: &ForHead,
        right: &Expression,
        body: &Statement,
        is_await: bool,
        labels: &[String],
    ) -> Completion {
        let iterable = crate::try_normal!(self.evaluate_expression(right));
        let record = crate::try_op!(self.get_iterator(&iterable, is_await));
        let mut value = JsValue::Undefined;
        loop {
            let step = match self.iterator_step(&record) {
                Ok(s) => s,
                Err(e) => return Completion::Throw(e),
            };
            let Some(result) = step else {
                return Completion::Normal(value);
            };
            let mut next_value = crate::try_op!(self.iterator_value(&result));
            if is_await {
                match self.suspension_point(crate::interpreter::SuspendKind::Await, next_value) {
                    Completion::Normal(v) => next_value = v,
                    // Suspensions re-enter through the replay driver; the
                    // iterator only closes on a real abrupt exit.
                    c @ Completion::Suspend(..) => return c,
                    abrupt => {
                        let _ = self.iterator_close(&record, Ok(JsValue::Undefined));
                        return abrupt;
                    }
                }
            }
            match self.bind_for_head(left, next_value, body, labels, &mut value) {
                LoopStep::Continue => {}
                LoopStep::Break => {
                    let close = self.iterator_close(&record, Ok(JsValue::Undefined));
                    if let Err(e) = close {
                        return Completion::Throw(e);
                    }
                    return Completion::Normal(value);
                }
                LoopStep::Abrupt(c) => {
                    // A suspension is not an exit: the replay driver will
                    // re-enter this loop, so the iterator stays open.
                    if matches!(c, Completion::Suspend(..)) {
                        return c;
                    }
                    let close = match &c {
                        Completion::Throw(e) => self.iterator_close(&record, Err(e.clone())),
                        _ => self.iterator_close(&record, Ok(JsValue::Undefined)),
                    };
                    if let (Err(e), false) = (&close, matches!(c, Completion::Throw(_))) {
                        return Completion::Throw(e.clone());
                    }
                    return c.update_value(value.clone());
                }
            }
        }
    }

    /// One iteration: bind the head, run the body, classify the result.
    fn bind_for_head(
        &mut self,
        left: &ForHead,
        next_value: JsValue,
        body: &Statement,
        labels: &[String],
        value: &mut JsValue,
    ) -> LoopStep {
        let outer = self.lexical_env();
        let binding_result = match left {
            ForHead::Declaration(kind, pattern) if kind.is_lexical() => {
                let env = Environment::new_declarative(Some(outer.clone()));
                let mut names = Vec::new();
                pattern.bound_names(&mut names);
                for name in &names {
                    let r = if *kind == DeclarationKind::Const {
                        self.env_create_immutable_binding(&env, name);
                        Ok(())
                    } else {
                        self.env_create_mutable_binding(&env, name, false)
                    };
                    if let Err(e) = r {
                        return LoopStep::Abrupt(Completion::Throw(e));
                    }
                }
                self.set_lexical_env(env.clone());
                self.binding_initialize(pattern, next_value, &env)
            }
            ForHead::Declaration(_, pattern) => {
                // var heads assign through hoisted bindings.
                self.destructuring_assign(pattern, next_value)
            }
            ForHead::Assign(pattern) => self.destructuring_assign(pattern, next_value),
        };
        if let Err(e) = binding_result {
            self.set_lexical_env(outer);
            return LoopStep::Abrupt(Completion::Throw(e));
        }

        let completion = self.evaluate_statement(body);
        self.set_lexical_env(outer);
        match completion {
            Completion::Normal(v) => {
                if !v.is_undefined() {
                    *value = v;
                }
                LoopStep::Continue
            }
            c if c.is_continue_for(labels) => LoopStep::Continue,
            Completion::Break(None) => LoopStep::Break,
            Completion::Break(Some(l)) if labels.contains(&l) => LoopStep::Break,
            abrupt => LoopStep::Abrupt(abrupt),
        }
    }

    // ── try / switch / with ──────────────────────────────────────────

    fn evaluate_try(
        &mut self,
        block: &[Statement],
        handler: Option<&CatchClause>,
        finalizer: Option<&Vec<Statement>>,
    ) -> Completion {
        let block_completion = self.evaluate_block(block);
        let handled = match block_completion {
            Completion::Throw(error) => match handler {
                Some(clause) => self.evaluate_catch(clause, error),
                None => Completion::Throw(error),
            },
            other => other,
        };
        let Some(finalizer) = finalizer else {
            return handled;
        };
        let finally_completion = self.evaluate_block(finalizer);
        // The finally block's abrupt completion supersedes the protected
        // completion (§14.15.3).
        if finally_completion.is_abrupt() {
            return finally_completion;
        }
        handled
    }

    /// CatchClauseEvaluation: the parameter binds in a fresh scope.
    fn evaluate_catch(&mut self, clause: &CatchClause, error: JsValue) -> Completion {
        let outer = self.lexical_env();
        let catch_env = Environment::new_declarative(Some(outer.clone()));
        if let Some(param) = &clause.param {
            let mut names = Vec::new();
            param.bound_names(&mut names);
            for name in &names {
                if let Err(e) = self.env_create_mutable_binding(&catch_env, name, false) {
                    return Completion::Throw(e);
                }
            }
            if let Err(e) = self.binding_initialize(param, error, &catch_env) {
                return Completion::Throw(e);
            }
        }
        self.set_lexical_env(catch_env.clone());
        if let Err(e) = self.block_declaration_instantiation(&clause.body, &catch_env) {
            self.set_lexical_env(outer);
            return Completion::Throw(e);
        }
        let completion = self.evaluate_statements(&clause.body);
        self.set_lexical_env(outer);
        completion
    }

    fn evaluate_switch(&mut self, discriminant: &Expression, cases: &[SwitchCase]) -> Completion {
        let input = crate::try_normal!(self.evaluate_expression(discriminant));
        let outer = self.lexical_env();
        let switch_env = Environment::new_declarative(Some(outer.clone()));
        let all_statements: Vec<Statement> = cases.iter().flat_map(|c| c.body.clone()).collect();
        if let Err(e) = self.block_declaration_instantiation(&all_statements, &switch_env) {
            return Completion::Throw(e);
        }
        self.set_lexical_env(switch_env);

        let completion = (|this: &mut Agent| {
            let mut matched = None;
            for (i, case) in cases.iter().enumerate() {
                let Some(test) = &case.test else { continue };
                let test_value = match this.evaluate_expression(test) {
                    Completion::Normal(v) => v,
                    abrupt => return abrupt,
                };
                if strict_equals(&input, &test_value) {
                    matched = Some(i);
                    break;
                }
            }
            let start = match matched {
                Some(i) => i,
                None => match cases.iter().position(|c| c.test.is_none()) {
                    Some(i) => i,
                    None => return Completion::empty(),
                },
            };
            let mut value = JsValue::Undefined;
            for case in &cases[start..] {
                match this.evaluate_statements(&case.body) {
                    Completion::Normal(v) => {
                        if !v.is_undefined() {
                            value = v;
                        }
                    }
                    abrupt => return abrupt.update_value(value),
                }
            }
            Completion::Normal(value)
        })(self);

        self.set_lexical_env(outer);
        // The direct Break(None) consumption happens at the call site so
        // labelled switches behave.
        match completion {
            Completion::Break(None) => Completion::empty(),
            other => other,
        }
    }

    fn evaluate_with(&mut self, object: &Expression, body: &Statement) -> Completion {
        let value = crate::try_normal!(self.evaluate_expression(object));
        let id = crate::try_op!(self.to_object(&value));
        let outer = self.lexical_env();
        let with_env = Environment::new_object(id, true, Some(outer.clone()));
        self.set_lexical_env(with_env);
        let completion = self.evaluate_statement(body);
        self.set_lexical_env(outer);
        completion
    }

    // ── function declaration instantiation (§10.2.11) ────────────────

    pub(crate) fn function_declaration_instantiation(
        &mut self,
        user: &Rc<UserFunction>,
        args: &[JsValue],
        env: &EnvRef,
    ) -> Completion {
        let body = user.body.statements();
        let mut param_names = Vec::new();
        for param in &user.params {
            param.bound_names(&mut param_names);
        }
        let simple_params = user
            .params
            .iter()
            .all(|p| matches!(p, Pattern::Identifier(_)));
        let has_arguments_binding = param_names.iter().any(|n| n == "arguments");

        // Parameter bindings.
        for name in &param_names {
            if !env.borrow().bindings.contains_key(name) {
                crate::try_op!(self.env_create_mutable_binding(env, name, false));
            }
        }

        // The arguments object, unless shadowed by a parameter and not
        // for arrow functions.
        let needs_arguments = !user.kind.is_arrow() && !has_arguments_binding;
        if needs_arguments {
            let mapped = !user.strict && simple_params;
            let arguments_object =
                crate::try_op!(self.create_arguments_object(args, env, mapped, &param_names));
            crate::try_op!(self.env_create_mutable_binding(env, "arguments", false));
            crate::try_op!(self.env_initialize_binding(env, "arguments", arguments_object));
        }

        // Bind each formal against the argument list.
        let mut arg_index = 0usize;
        for param in &user.params {
            match param {
                Pattern::Rest(inner) => {
                    let rest: Vec<JsValue> = args.get(arg_index..).unwrap_or(&[]).to_vec();
                    let array = self.create_array_from_list(&rest);
                    crate::try_op!(self.binding_initialize(inner, array, env));
                    arg_index = args.len();
                }
                _ => {
                    let value = args.get(arg_index).cloned().unwrap_or(JsValue::Undefined);
                    crate::try_op!(self.binding_initialize(param, value, env));
                    arg_index += 1;
                }
            }
        }

        // var-declared names initialise to undefined unless a parameter
        // of the same name already supplied a value.
        for name in var_declared_names(body) {
            if !env.borrow().bindings.contains_key(&name) {
                crate::try_op!(self.env_create_mutable_binding(env, &name, false));
                crate::try_op!(self.env_initialize_binding(env, &name, JsValue::Undefined));
            }
        }

        // Lexically declared names (TDZ).
        for (kind, name) in lexical_declarations(body) {
            match kind {
                DeclarationKind::Const => self.env_create_immutable_binding(env, &name),
                _ => crate::try_op!(self.env_create_mutable_binding(env, &name, false)),
            }
        }

        // Hoisted function declarations.
        for func in var_scoped_functions(body) {
            let name = func.name.clone().expect("declared function has a name");
            let value = self.instantiate_function(&func, env, None);
            if !env.borrow().bindings.contains_key(&name) {
                crate::try_op!(self.env_create_mutable_binding(env, &name, false));
            }
            crate::try_op!(self.env_initialize_binding(env, &name, value));
        }

        Completion::empty()
    }

    /// CreateMappedArgumentsObject / CreateUnmappedArgumentsObject
    /// (§10.4.4.6–7).
    fn create_arguments_object(
        &mut self,
        args: &[JsValue],
        env: &EnvRef,
        mapped: bool,
        param_names: &[String],
    ) -> Result<JsValue, JsValue> {
        let realm = self.current_realm();
        let kind = if mapped {
            ObjectKind::Arguments
        } else {
            ObjectKind::Ordinary
        };
        let id = self.allocate_object(kind, realm);
        let proto = self.intrinsic(realm, Intrinsic::ObjectPrototype);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.class_name = "Arguments";
            data.prototype = proto.object_id().and_then(|p| self.get_object(p));
            data.define(
                PropertyKey::from_str("length"),
                PropertyDescriptor::data(JsValue::Number(args.len() as f64), true, false, true),
            );
            for (i, value) in args.iter().enumerate() {
                data.define(
                    PropertyKey::Index(i as u32),
                    PropertyDescriptor::data_default(value.clone()),
                );
            }
            let iterator_key = PropertyKey::Symbol(self.well_known.iterator.clone());
            let array_prototype = self.intrinsic(realm, Intrinsic::ArrayPrototype);
            // @@iterator is %Array.prototype.values%; read off the
            // prototype to avoid a bootstrap ordering knot.
            if let Some(array_proto) = array_prototype.object_id().and_then(|p| self.get_object(p)) {
                if let Some(values) = array_proto
                    .borrow()
                    .properties
                    .get(&PropertyKey::from_str("values"))
                    .and_then(|d| d.value.clone())
                {
                    data.define(iterator_key, PropertyDescriptor::builtin(values));
                }
            }
            if mapped {
                let mut mapping = FxHashMap::default();
                for (i, name) in param_names.iter().enumerate() {
                    if i < args.len() {
                        mapping.insert(i as u32, name.clone());
                    }
                }
                data.parameter_map = Some(ParameterMap {
                    env: env.clone(),
                    mapping,
                });
            }
        }

        if mapped {
            let callee = self.current_function_value();
            let obj = self.get_object(id).unwrap();
            obj.borrow_mut().define(
                PropertyKey::from_str("callee"),
                PropertyDescriptor::data(callee, true, false, true),
            );
        } else {
            let thrower = self.intrinsic(realm, Intrinsic::ThrowTypeError);
            let obj = self.get_object(id).unwrap();
            obj.borrow_mut().define(
                PropertyKey::from_str("callee"),
                PropertyDescriptor::accessor(thrower.clone(), thrower, false, false),
            );
        }
        Ok(JsValue::object(id))
    }

    fn current_function_value(&self) -> JsValue {
        self.running_context()
            .function
            .clone()
            .unwrap_or(JsValue::Undefined)
    }
}

enum LoopStep {
    Continue,
    Break,
    Abrupt(Completion),
}

/// Whether a statement contributes a completion value (for the
/// script-level completion value bookkeeping).
fn statement_produces_value(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::Expression(_)
            | Statement::If { .. }
            | Statement::While { .. }
            | Statement::DoWhile { .. }
            | Statement::For { .. }
            | Statement::ForIn { .. }
            | Statement::ForOf { .. }
            | Statement::Switch { .. }
            | Statement::Try { .. }
            | Statement::Block(_)
            | Statement::With(..)
            | Statement::Labeled(..)
    )
}

// ── static semantics: declaration collection ─────────────────────────

/// VarDeclaredNames: recurse through statements but not function
/// boundaries.
pub(crate) fn var_declared_names(statements: &[Statement]) -> Vec<String> {
    let mut out = Vec::new();
    collect_var_names(statements, &mut out);
    out
}

fn collect_var_names(statements: &[Statement], out: &mut Vec<String>) {
    for statement in statements {
        collect_var_names_one(statement, out);
    }
}

fn collect_var_names_one(statement: &Statement, out: &mut Vec<String>) {
    match statement {
        Statement::Variable(decl) if decl.kind == DeclarationKind::Var => {
            for declarator in &decl.declarators {
                let mut names = Vec::new();
                declarator.pattern.bound_names(&mut names);
                for name in names {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
        }
        Statement::Block(body) => collect_var_names(body, out),
        Statement::If {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names_one(consequent, out);
            if let Some(alternate) = alternate {
                collect_var_names_one(alternate, out);
            }
        }
        Statement::While { body, .. } | Statement::DoWhile { body, .. } => {
            collect_var_names_one(body, out);
        }
        Statement::For { init, body, .. } => {
            if let Some(ForInit::Declaration(decl)) = init {
                if decl.kind == DeclarationKind::Var {
                    for declarator in &decl.declarators {
                        let mut names = Vec::new();
                        declarator.pattern.bound_names(&mut names);
                        for name in names {
                            if !out.contains(&name) {
                                out.push(name);
                            }
                        }
                    }
                }
            }
            collect_var_names_one(body, out);
        }
        Statement::ForIn { left, body, .. } | Statement::ForOf { left, body, .. } => {
            if let ForHead::Declaration(DeclarationKind::Var, pattern) = left {
                let mut names = Vec::new();
                pattern.bound_names(&mut names);
                for name in names {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
            collect_var_names_one(body, out);
        }
        Statement::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_var_names(block, out);
            if let Some(handler) = handler {
                collect_var_names(&handler.body, out);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(finalizer, out);
            }
        }
        Statement::Switch { cases, .. } => {
            for case in cases {
                collect_var_names(&case.body, out);
            }
        }
        Statement::Labeled(_, inner) => collect_var_names_one(inner, out),
        Statement::With(_, body) => collect_var_names_one(body, out),
        Statement::Export(ExportDeclaration::Declaration(inner))
        | Statement::Export(ExportDeclaration::Default(inner)) => {
            collect_var_names_one(inner, out);
        }
        _ => {}
    }
}

/// Top-level function declarations of a scope body (var-scoped).
pub(crate) fn var_scoped_functions(statements: &[Statement]) -> Vec<FunctionNode> {
    let mut out = Vec::new();
    for statement in statements {
        match statement {
            Statement::FunctionDeclaration(func) => out.push(func.clone()),
            Statement::Export(ExportDeclaration::Declaration(inner))
            | Statement::Export(ExportDeclaration::Default(inner)) => {
                if let Statement::FunctionDeclaration(func) = inner.as_ref() {
                    out.push(func.clone());
                }
            }
            _ => {}
        }
    }
    out
}

/// LexicallyDeclaredNames of a scope body: let/const/class at the top
/// level.
pub(crate) fn lexically_declared_names(statements: &[Statement]) -> Vec<String> {
    lexical_declarations(statements)
        .into_iter()
        .map(|(_, name)| name)
        .collect()
}

pub(crate) fn lexical_declarations(statements: &[Statement]) -> Vec<(DeclarationKind, String)> {
    let mut out = Vec::new();
    for statement in statements {
        lexical_declarations_one(statement, &mut out);
    }
    out
}

fn lexical_declarations_one(statement: &Statement, out: &mut Vec<(DeclarationKind, String)>) {
    match statement {
        Statement::Variable(decl) if decl.kind.is_lexical() => {
            for declarator in &decl.declarators {
                let mut names = Vec::new();
                declarator.pattern.bound_names(&mut names);
                for name in names {
                    out.push((decl.kind, name));
                }
            }
        }
        Statement::ClassDeclaration(node) => {
            if let Some(name) = &node.name {
                out.push((DeclarationKind::Let, name.clone()));
            }
        }
        Statement::Export(ExportDeclaration::Declaration(inner))
        | Statement::Export(ExportDeclaration::Default(inner)) => {
            lexical_declarations_one(inner, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "test.js")
    }

    fn eval_number(src: &str) -> f64 {
        match eval(src) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number from {src}, got {other:?}"),
        }
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string from {src}, got {other:?}"),
        }
    }

    #[test]
    fn var_hoisting() {
        assert_eq!(
            eval_string("function f() { var seen = typeof x; var x = 1; return seen; } f()"),
            "undefined"
        );
    }

    #[test]
    fn let_tdz_throws() {
        match eval("{ tdz; let tdz = 1; }") {
            Completion::Throw(_) => {}
            other => panic!("expected ReferenceError, got {other:?}"),
        }
    }

    #[test]
    fn block_scoping_shadows() {
        assert_eq!(eval_number("let x = 1; { let x = 2; } x"), 1.0);
    }

    #[test]
    fn const_assignment_throws() {
        match eval("const k = 1; k = 2;") {
            Completion::Throw(_) => {}
            other => panic!("expected TypeError, got {other:?}"),
        }
    }

    #[test]
    fn loops_and_labels() {
        assert_eq!(eval_number("var n = 0; while (n < 5) n++; n"), 5.0);
        assert_eq!(
            eval_number("var n = 0; do { n++; } while (n < 3); n"),
            3.0
        );
        assert_eq!(
            eval_number("var s = 0; for (var i = 0; i < 4; i++) s += i; s"),
            6.0
        );
        assert_eq!(
            eval_number(
                "var c = 0;\n\
                 outer: for (var i = 0; i < 3; i++) {\n\
                   for (var j = 0; j < 3; j++) {\n\
                     if (j === 1) continue outer;\n\
                     c++;\n\
                   }\n\
                 }\n\
                 c"
            ),
            3.0
        );
        assert_eq!(
            eval_number(
                "var c = 0;\n\
                 outer: for (;;) { for (;;) { break outer; } }\n\
                 c"
            ),
            0.0
        );
    }

    #[test]
    fn for_loop_let_is_per_iteration() {
        assert_eq!(
            eval_string(
                "var fns = [];\n\
                 for (let i = 0; i < 3; i++) fns.push(function () { return i; });\n\
                 fns.map(function (f) { return f(); }).join(',')"
            ),
            "0,1,2"
        );
    }

    #[test]
    fn for_in_order_and_deletion() {
        assert_eq!(
            eval_string(
                "var o = { b: 1, a: 2, 2: 'two', 0: 'zero' };\n\
                 var keys = [];\n\
                 for (var k in o) keys.push(k);\n\
                 keys.join(',')"
            ),
            "0,2,b,a"
        );
    }

    #[test]
    fn for_of_destructuring_head() {
        assert_eq!(
            eval_number(
                "var total = 0;\n\
                 for (const [a, b] of [[1, 2], [3, 4]]) total += a * b;\n\
                 total"
            ),
            14.0
        );
    }

    #[test]
    fn try_catch_finally_precedence() {
        assert_eq!(
            eval_string(
                "function f() {\n\
                   try { throw new Error('x'); }\n\
                   catch (e) { return 'caught'; }\n\
                   finally { /* falls through */ }\n\
                 }\n\
                 f()"
            ),
            "caught"
        );
        assert_eq!(
            eval_string(
                "function f() {\n\
                   try { return 'try'; } finally { return 'finally'; }\n\
                 }\n\
                 f()"
            ),
            "finally"
        );
    }

    #[test]
    fn optional_catch_binding() {
        assert_eq!(
            eval_number("var x = 0; try { throw 1; } catch { x = 2; } x"),
            2.0
        );
    }

    #[test]
    fn switch_fallthrough_and_default() {
        let src = "function pick(v) {\n\
                     var out = [];\n\
                     switch (v) {\n\
                       case 1: out.push('one');\n\
                       case 2: out.push('two'); break;\n\
                       default: out.push('other');\n\
                     }\n\
                     return out.join(',');\n\
                   }\n";
        assert_eq!(eval_string(&format!("{src} pick(1)")), "one,two");
        assert_eq!(eval_string(&format!("{src} pick(2)")), "two");
        assert_eq!(eval_string(&format!("{src} pick(9)")), "other");
    }

    #[test]
    fn function_parameters_defaults_and_rest() {
        assert_eq!(
            eval_number("function f(a, b = a + 1, ...rest) { return b + rest.length; } f(1)"),
            2.0
        );
        assert_eq!(
            eval_number("function f(a, b = 10, ...r) { return b + r.length; } f(1, 2, 3, 4)"),
            4.0
        );
    }

    #[test]
    fn arguments_object_mapping() {
        // Sloppy + simple parameters: writes alias the binding.
        assert_eq!(
            eval_number("function f(a) { arguments[0] = 42; return a; } f(1)"),
            42.0
        );
        // Strict: no aliasing.
        assert_eq!(
            eval_number("function f(a) { 'use strict'; arguments[0] = 42; return a; } f(1)"),
            1.0
        );
    }

    #[test]
    fn closures_capture_environments() {
        assert_eq!(
            eval_number(
                "function counter() {\n\
                   var n = 0;\n\
                   return function () { return ++n; };\n\
                 }\n\
                 var c = counter();\n\
                 c(); c(); c()"
            ),
            3.0
        );
    }

    #[test]
    fn with_statement_scoping() {
        assert_eq!(
            eval_number("var o = { x: 7 }; var r; with (o) { r = x; } r"),
            7.0
        );
    }

    #[test]
    fn completion_values_of_statements() {
        assert_eq!(eval_number("if (true) { 42; } else { 0; }"), 42.0);
        assert_eq!(eval_number("var out; switch (1) { case 1: out = 5; } out"), 5.0);
    }
}
