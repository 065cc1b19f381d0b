use crate::ast::*;
use crate::interpreter::agent::{Agent, JobKind, ScriptOrModule};
use crate::interpreter::completion::{Completion, SuspendKind};
use crate::interpreter::environment::{EnvKind, EnvRef, ThisBindingStatus};
use crate::interpreter::helpers::{strict_equals, IteratorRecord};
use crate::interpreter::object::JsFunction;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{number_ops, JsBigInt, JsString, JsValue};

/// The Reference internal type (§6.2.4): an evaluator-internal lvalue.
/// Never exposed as a language value.
#[derive(Clone, Debug)]
pub struct Reference {
    pub base: ReferenceBase,
    pub key: PropertyKey,
    pub strict: bool,
    /// Super references carry their own this.
    pub this_value: Option<JsValue>,
}

#[derive(Clone, Debug)]
pub enum ReferenceBase {
    Unresolvable,
    Env(EnvRef),
    Value(JsValue),
}

impl Reference {
    fn name(&self) -> String {
        self.key.to_display_string()
    }
}

impl Agent {
    // ── references (§6.2.4.5–6.2.4.9) ────────────────────────────────

    /// ResolveBinding: walk the environment chain.
    pub fn resolve_binding(&mut self, name: &str) -> Result<Reference, JsValue> {
        let strict = self.running_context().strict;
        let mut env = Some(self.lexical_env());
        while let Some(current) = env {
            if self.env_has_binding(&current, name)? {
                return Ok(Reference {
                    base: ReferenceBase::Env(current),
                    key: PropertyKey::from_str(name),
                    strict,
                    this_value: None,
                });
            }
            env = current.borrow().outer.clone();
        }
        Ok(Reference {
            base: ReferenceBase::Unresolvable,
            key: PropertyKey::from_str(name),
            strict,
            this_value: None,
        })
    }

    /// GetValue.
    pub fn get_value(&mut self, reference: &Reference) -> Result<JsValue, JsValue> {
        match &reference.base {
            ReferenceBase::Unresolvable => {
                Err(self.reference_error(&format!("{} is not defined", reference.name())))
            }
            ReferenceBase::Env(env) => {
                let env = env.clone();
                // With-environments read through the binding object.
                let with_base = env.borrow().with_base_object();
                if let Some(base) = with_base {
                    let receiver = JsValue::object(base);
                    return self.internal_get(base, &reference.key, &receiver);
                }
                self.get_binding_value(&env, &reference.name(), reference.strict)
            }
            ReferenceBase::Value(base) => {
                let base = base.clone();
                let id = self.to_object(&base)?;
                let receiver = reference.this_value.clone().unwrap_or(base);
                self.internal_get(id, &reference.key, &receiver)
            }
        }
    }

    /// PutValue.
    pub fn put_value(&mut self, reference: &Reference, value: JsValue) -> Result<(), JsValue> {
        match &reference.base {
            ReferenceBase::Unresolvable => {
                if reference.strict {
                    return Err(
                        self.reference_error(&format!("{} is not defined", reference.name()))
                    );
                }
                // Sloppy mode: create on the global object.
                let realm = self.current_realm();
                let global = self.realms[realm].global_object;
                let receiver = JsValue::object(global);
                self.internal_set(global, &reference.key, value, &receiver)?;
                Ok(())
            }
            ReferenceBase::Env(env) => {
                let env = env.clone();
                let with_base = env.borrow().with_base_object();
                if let Some(base) = with_base {
                    let receiver = JsValue::object(base);
                    let ok = self.internal_set(base, &reference.key, value, &receiver)?;
                    if !ok && reference.strict {
                        return Err(self.type_error(&format!(
                            "Cannot assign to read only property '{}'",
                            reference.name()
                        )));
                    }
                    return Ok(());
                }
                self.env_set_mutable_binding(&env, &reference.name(), value, reference.strict)
            }
            ReferenceBase::Value(base) => {
                let base = base.clone();
                let id = self.to_object(&base)?;
                let receiver = reference.this_value.clone().unwrap_or(base);
                let ok = self.internal_set(id, &reference.key, value, &receiver)?;
                if !ok && reference.strict {
                    return Err(self.type_error(&format!(
                        "Cannot assign to read only property '{}'",
                        reference.name()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Evaluate an expression in lvalue position. The error side carries
    /// the abrupt completion (throw or suspension from a nested yield).
    pub fn evaluate_reference(&mut self, expr: &Expression) -> Result<Reference, Completion> {
        match expr {
            Expression::Identifier(name) => {
                self.resolve_binding(name).map_err(Completion::Throw)
            }
            Expression::Member {
                object,
                property,
                optional: _,
            } => {
                let base = match self.evaluate_expression(object) {
                    Completion::Normal(v) => v,
                    abrupt => return Err(abrupt),
                };
                if base.is_nullish() {
                    let key_text = match property {
                        MemberKey::Ident(name) => name.clone(),
                        MemberKey::Computed(_) => "property".to_string(),
                    };
                    let error = self.type_error(&format!(
                        "Cannot read properties of {} (reading '{key_text}')",
                        base.type_of()
                    ));
                    return Err(Completion::Throw(error));
                }
                let key = match property {
                    MemberKey::Ident(name) => PropertyKey::from_str(name),
                    MemberKey::Computed(expr) => {
                        let value = match self.evaluate_expression(expr) {
                            Completion::Normal(v) => v,
                            abrupt => return Err(abrupt),
                        };
                        self.to_property_key(&value).map_err(Completion::Throw)?
                    }
                };
                Ok(Reference {
                    base: ReferenceBase::Value(base),
                    key,
                    strict: self.running_context().strict,
                    this_value: None,
                })
            }
            Expression::SuperProperty(property) => {
                self.make_super_reference(property).map_err(Completion::Throw)
            }
            other => {
                let error = self.reference_error(&format!(
                    "Invalid assignment target ({:?})",
                    std::mem::discriminant(other)
                ));
                Err(Completion::Throw(error))
            }
        }
    }

    /// MakeSuperPropertyReference (§13.3.7.3).
    fn make_super_reference(&mut self, property: &MemberKey) -> Result<Reference, JsValue> {
        let env = self.get_this_environment(self.lexical_env());
        if !env.borrow().has_super_binding(self) {
            return Err(self.syntax_error("'super' keyword is only valid inside methods"));
        }
        let this_value = self.resolve_this_binding(self.lexical_env())?;
        let home = {
            let e = env.borrow();
            match &e.kind {
                EnvKind::Function { function_object, .. } => {
                    let obj = self.get_object(*function_object);
                    obj.and_then(|o| match &o.borrow().callable {
                        Some(JsFunction::User(u)) => u.home_object.get(),
                        _ => None,
                    })
                }
                _ => None,
            }
        };
        let Some(home) = home else {
            return Err(self.syntax_error("'super' keyword is only valid inside methods"));
        };
        let proto = self.internal_get_prototype_of(home)?;
        let key = match property {
            MemberKey::Ident(name) => PropertyKey::from_str(name),
            MemberKey::Computed(expr) => {
                let value = match self.evaluate_expression(expr) {
                    Completion::Normal(v) => v,
                    Completion::Throw(e) => return Err(e),
                    _ => JsValue::Undefined,
                };
                self.to_property_key(&value)?
            }
        };
        Ok(Reference {
            base: ReferenceBase::Value(proto),
            key,
            strict: true,
            this_value: Some(this_value),
        })
    }

    // ── expression evaluation ────────────────────────────────────────

    pub fn evaluate_expression(&mut self, expr: &Expression) -> Completion {
        match expr {
            Expression::Literal(lit) => self.evaluate_literal(lit),
            Expression::Identifier(name) => {
                let reference = match self.resolve_binding(name) {
                    Ok(r) => r,
                    Err(e) => return Completion::Throw(e),
                };
                self.get_value(&reference).into()
            }
            Expression::This => {
                let env = self.lexical_env();
                self.resolve_this_binding(env).into()
            }
            Expression::Array(elements) => self.evaluate_array_literal(elements),
            Expression::Object(properties) => self.evaluate_object_literal(properties),
            Expression::Function(node) => {
                let env = self.lexical_env();
                Completion::Normal(self.instantiate_function(node, &env, None))
            }
            Expression::Class(node) => self.class_definition_evaluation(node, None).into(),
            Expression::Template(template) => self.evaluate_template(template),
            Expression::TaggedTemplate(tag, template) => {
                self.evaluate_tagged_template(tag, template)
            }
            Expression::Unary(op, operand) => self.evaluate_unary(*op, operand),
            Expression::Binary(op, left, right) => {
                let lval = crate::try_normal!(self.evaluate_expression(left));
                // `in` with a private name and short-circuit cases never
                // reach here; both operands evaluate eagerly.
                let rval = crate::try_normal!(self.evaluate_expression(right));
                self.apply_binary(*op, &lval, &rval).into()
            }
            Expression::Logical(op, left, right) => {
                let lval = crate::try_normal!(self.evaluate_expression(left));
                let take_right = match op {
                    LogicalOp::And => self.to_boolean(&lval),
                    LogicalOp::Or => !self.to_boolean(&lval),
                    LogicalOp::Nullish => lval.is_nullish(),
                };
                if take_right {
                    self.evaluate_expression(right)
                } else {
                    Completion::Normal(lval)
                }
            }
            Expression::Update { op, prefix, target } => self.evaluate_update(*op, *prefix, target),
            Expression::Assign(op, left, right) => self.evaluate_assignment(*op, left, right),
            Expression::AssignPattern(pattern, right) => {
                let rval = crate::try_normal!(self.evaluate_expression(right));
                if let Err(e) = self.destructuring_assign(pattern, rval.clone()) {
                    return Completion::Throw(e);
                }
                Completion::Normal(rval)
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let t = crate::try_normal!(self.evaluate_expression(test));
                if self.to_boolean(&t) {
                    self.evaluate_expression(consequent)
                } else {
                    self.evaluate_expression(alternate)
                }
            }
            Expression::Call {
                callee,
                args,
                optional: _,
            } => self.evaluate_call(callee, args, false),
            Expression::New { callee, args } => self.evaluate_new(callee, args),
            Expression::Member { .. } | Expression::SuperProperty(_) => {
                let reference = match self.evaluate_reference(expr) {
                    Ok(r) => r,
                    Err(abrupt) => return abrupt,
                };
                self.get_value(&reference).into()
            }
            Expression::OptionalChain(inner) => match self.evaluate_chain(inner) {
                Ok(Some((value, _))) => Completion::Normal(value),
                Ok(None) => Completion::Normal(JsValue::Undefined),
                Err(abrupt) => abrupt,
            },
            Expression::SuperCall(args) => self.evaluate_super_call(args),
            Expression::NewTarget => {
                let env = self.get_this_environment(self.lexical_env());
                let e = env.borrow();
                match &e.kind {
                    EnvKind::Function { new_target, .. } => Completion::Normal(new_target.clone()),
                    _ => Completion::Normal(JsValue::Undefined),
                }
            }
            Expression::Sequence(parts) => {
                let mut last = JsValue::Undefined;
                for part in parts {
                    last = crate::try_normal!(self.evaluate_expression(part));
                }
                Completion::Normal(last)
            }
            Expression::Yield { argument, delegate } => {
                self.evaluate_yield(argument.as_deref(), *delegate)
            }
            Expression::Await(operand) => {
                let value = crate::try_normal!(self.evaluate_expression(operand));
                self.suspension_point(SuspendKind::Await, value)
            }
            Expression::ImportCall(specifier) => self.evaluate_import_call(specifier),
        }
    }

    fn evaluate_literal(&mut self, literal: &Literal) -> Completion {
        Completion::Normal(match literal {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(s.clone()),
            Literal::BigInt(value) => JsValue::BigInt(JsBigInt {
                value: value.clone(),
            }),
            Literal::RegExp(pattern, flags) => {
                // Inert RegExp-classed object; matching is not part of
                // the built-in surface.
                let realm = self.current_realm();
                let proto = self.intrinsic(realm, Intrinsic::RegExpPrototype);
                let id = self.object_create(proto.object_id(), realm);
                let obj = self.get_object(id).unwrap();
                {
                    let mut data = obj.borrow_mut();
                    data.class_name = "RegExp";
                    data.define(
                        PropertyKey::from_str("source"),
                        PropertyDescriptor::data(
                            JsValue::String(JsString::from_str(pattern)),
                            false,
                            false,
                            false,
                        ),
                    );
                    data.define(
                        PropertyKey::from_str("flags"),
                        PropertyDescriptor::data(
                            JsValue::String(JsString::from_str(flags)),
                            false,
                            false,
                            false,
                        ),
                    );
                    data.define(
                        PropertyKey::from_str("lastIndex"),
                        PropertyDescriptor::data(JsValue::Number(0.0), true, false, false),
                    );
                }
                JsValue::object(id)
            }
        })
    }

    fn evaluate_array_literal(&mut self, elements: &[ArrayElement]) -> Completion {
        let realm = self.current_realm();
        let array = self.array_create(0, realm);
        let mut index: u32 = 0;
        for element in elements {
            match element {
                ArrayElement::Elision => {
                    index += 1;
                    // Holes only adjust length.
                    self.write_raw_array_length(array, index);
                }
                ArrayElement::Item(expr) => {
                    let value = crate::try_normal!(self.evaluate_expression(expr));
                    crate::try_op!(self.create_data_property_or_throw(
                        array,
                        &PropertyKey::Index(index),
                        value
                    ));
                    index += 1;
                }
                ArrayElement::Spread(expr) => {
                    let source = crate::try_normal!(self.evaluate_expression(expr));
                    let values = crate::try_op!(self.iterable_to_list(&source));
                    for value in values {
                        crate::try_op!(self.create_data_property_or_throw(
                            array,
                            &PropertyKey::Index(index),
                            value
                        ));
                        index += 1;
                    }
                }
            }
        }
        self.write_raw_array_length(array, index);
        Completion::Normal(JsValue::object(array))
    }

    fn write_raw_array_length(&self, array: u64, length: u32) {
        if let Some(obj) = self.get_object(array) {
            let mut data = obj.borrow_mut();
            if let Some(desc) = data.properties.get_mut(&PropertyKey::from_str("length")) {
                if let Some(JsValue::Number(n)) = desc.value {
                    if (n as u32) < length {
                        desc.value = Some(JsValue::Number(length as f64));
                    }
                }
            }
        }
    }

    fn evaluate_object_literal(&mut self, properties: &[ObjectProperty]) -> Completion {
        let realm = self.current_realm();
        let id = self.create_ordinary_object(realm);
        for property in properties {
            match property {
                ObjectProperty::Init { key, value } => {
                    let key = crate::try_op!(self.evaluate_property_name(key));
                    let v = if value.is_anonymous_function_definition() {
                        let name = key.to_display_string();
                        crate::try_normal!(self.named_evaluation(value, &name))
                    } else {
                        crate::try_normal!(self.evaluate_expression(value))
                    };
                    crate::try_op!(self.create_data_property_or_throw(id, &key, v));
                }
                ObjectProperty::Method { key, func } => {
                    let key = crate::try_op!(self.evaluate_property_name(key));
                    let env = self.lexical_env();
                    let method =
                        self.instantiate_function(func, &env, Some(&key.to_display_string()));
                    if let Some(method_id) = method.object_id() {
                        let obj = self.get_object(method_id).unwrap();
                        if let Some(JsFunction::User(u)) = &obj.borrow().callable {
                            u.home_object.set(Some(id));
                        };
                    }
                    crate::try_op!(self.create_data_property_or_throw(id, &key, method));
                }
                ObjectProperty::Accessor { key, kind, func } => {
                    let key = crate::try_op!(self.evaluate_property_name(key));
                    let env = self.lexical_env();
                    let prefix = match kind {
                        AccessorKind::Get => "get ",
                        AccessorKind::Set => "set ",
                    };
                    let name = format!("{prefix}{}", key.to_display_string());
                    let method = self.instantiate_function(func, &env, Some(&name));
                    if let Some(method_id) = method.object_id() {
                        let obj = self.get_object(method_id).unwrap();
                        if let Some(JsFunction::User(u)) = &obj.borrow().callable {
                            u.home_object.set(Some(id));
                        };
                    }
                    let desc = match kind {
                        AccessorKind::Get => PropertyDescriptor {
                            get: Some(method),
                            enumerable: Some(true),
                            configurable: Some(true),
                            ..Default::default()
                        },
                        AccessorKind::Set => PropertyDescriptor {
                            set: Some(method),
                            enumerable: Some(true),
                            configurable: Some(true),
                            ..Default::default()
                        },
                    };
                    crate::try_op!(self.merge_accessor_and_define(id, &key, desc));
                }
                ObjectProperty::Spread(expr) => {
                    let source = crate::try_normal!(self.evaluate_expression(expr));
                    crate::try_op!(self.copy_data_properties(id, &source, &[]));
                }
            }
        }
        Completion::Normal(JsValue::object(id))
    }

    /// NamedEvaluation: anonymous function/class definitions pick up the
    /// target name.
    pub(crate) fn named_evaluation(&mut self, expr: &Expression, name: &str) -> Completion {
        match expr {
            Expression::Function(node) => {
                let env = self.lexical_env();
                Completion::Normal(self.instantiate_function(node, &env, Some(name)))
            }
            Expression::Class(node) => self.class_definition_evaluation(node, Some(name)).into(),
            _ => self.evaluate_expression(expr),
        }
    }

    fn evaluate_template(&mut self, template: &TemplateLiteral) -> Completion {
        let mut out = JsString::empty();
        for (i, chunk) in template.cooked.iter().enumerate() {
            if let Some(chunk) = chunk {
                out = out.concat(chunk);
            }
            if let Some(expr) = template.expressions.get(i) {
                let value = crate::try_normal!(self.evaluate_expression(expr));
                let s = crate::try_op!(self.to_string_value(&value));
                out = out.concat(&s);
            }
        }
        Completion::Normal(JsValue::String(out))
    }

    /// GetTemplateObject (§13.2.8.4): one frozen template object per
    /// parse site, cached on the realm.
    fn get_template_object(&mut self, template: &TemplateLiteral) -> JsValue {
        let realm = self.current_realm();
        if let Some(id) = self.realms[realm].template_cache.get(&template.site) {
            return JsValue::object(*id);
        }
        let count = template.cooked.len();
        let raw_id = self.array_create(count as u32, realm);
        let cooked_id = self.array_create(count as u32, realm);
        for (i, (cooked, raw)) in template.cooked.iter().zip(&template.raw).enumerate() {
            let cooked_value = match cooked {
                Some(s) => JsValue::String(s.clone()),
                None => JsValue::Undefined,
            };
            let frozen = |v: JsValue| PropertyDescriptor::data(v, false, true, false);
            self.get_object(cooked_id).unwrap().borrow_mut().define(
                PropertyKey::Index(i as u32),
                frozen(cooked_value),
            );
            self.get_object(raw_id).unwrap().borrow_mut().define(
                PropertyKey::Index(i as u32),
                frozen(JsValue::String(raw.clone())),
            );
        }
        for id in [raw_id, cooked_id] {
            let obj = self.get_object(id).unwrap();
            let mut data = obj.borrow_mut();
            data.extensible = false;
            if let Some(len) = data.properties.get_mut(&PropertyKey::from_str("length")) {
                len.writable = Some(false);
            }
        }
        self.get_object(cooked_id).unwrap().borrow_mut().define(
            PropertyKey::from_str("raw"),
            PropertyDescriptor::data(JsValue::object(raw_id), false, false, false),
        );
        self.realms[realm]
            .template_cache
            .insert(template.site, cooked_id);
        JsValue::object(cooked_id)
    }

    fn evaluate_tagged_template(
        &mut self,
        tag: &Expression,
        template: &TemplateLiteral,
    ) -> Completion {
        let (tag_fn, this_value) = match tag {
            Expression::Member { .. } => {
                let reference = match self.evaluate_reference(tag) {
                    Ok(r) => r,
                    Err(abrupt) => return abrupt,
                };
                let this = match &reference.base {
                    ReferenceBase::Value(v) => v.clone(),
                    _ => JsValue::Undefined,
                };
                (crate::try_op!(self.get_value(&reference)), this)
            }
            _ => (
                crate::try_normal!(self.evaluate_expression(tag)),
                JsValue::Undefined,
            ),
        };
        let template_object = self.get_template_object(template);
        let mut args = vec![template_object];
        for expr in &template.expressions {
            args.push(crate::try_normal!(self.evaluate_expression(expr)));
        }
        self.call(&tag_fn, &this_value, &args).into()
    }

    fn evaluate_unary(&mut self, op: UnaryOp, operand: &Expression) -> Completion {
        match op {
            UnaryOp::TypeOf => {
                // typeof tolerates unresolvable references.
                if let Expression::Identifier(name) = operand {
                    let reference = crate::try_op!(self.resolve_binding(name));
                    if matches!(reference.base, ReferenceBase::Unresolvable) {
                        return Completion::Normal(JsValue::String(JsString::from_str(
                            "undefined",
                        )));
                    }
                    let value = crate::try_op!(self.get_value(&reference));
                    return Completion::Normal(JsValue::String(JsString::from_str(
                        self.type_of_value(&value),
                    )));
                }
                let value = crate::try_normal!(self.evaluate_expression(operand));
                Completion::Normal(JsValue::String(JsString::from_str(
                    self.type_of_value(&value),
                )))
            }
            UnaryOp::Void => {
                crate::try_normal!(self.evaluate_expression(operand));
                Completion::Normal(JsValue::Undefined)
            }
            UnaryOp::Delete => self.evaluate_delete(operand),
            UnaryOp::Not => {
                let value = crate::try_normal!(self.evaluate_expression(operand));
                Completion::Normal(JsValue::Boolean(!self.to_boolean(&value)))
            }
            UnaryOp::Minus => {
                let value = crate::try_normal!(self.evaluate_expression(operand));
                let numeric = crate::try_op!(self.to_numeric(&value));
                Completion::Normal(match numeric {
                    JsValue::BigInt(b) => JsValue::BigInt(JsBigInt { value: -b.value }),
                    JsValue::Number(n) => JsValue::Number(number_ops::unary_minus(n)),
                    _ => unreachable!(),
                })
            }
            UnaryOp::Plus => {
                let value = crate::try_normal!(self.evaluate_expression(operand));
                Completion::Normal(JsValue::Number(crate::try_op!(self.to_number(&value))))
            }
            UnaryOp::BitNot => {
                let value = crate::try_normal!(self.evaluate_expression(operand));
                let numeric = crate::try_op!(self.to_numeric(&value));
                Completion::Normal(match numeric {
                    JsValue::BigInt(b) => JsValue::BigInt(JsBigInt {
                        value: crate::types::bigint_ops::bitwise_not(&b.value),
                    }),
                    JsValue::Number(n) => JsValue::Number(number_ops::bitwise_not(n)),
                    _ => unreachable!(),
                })
            }
        }
    }

    pub(crate) fn type_of_value(&self, value: &JsValue) -> &'static str {
        if self.is_callable(value) {
            return "function";
        }
        value.type_of()
    }

    fn evaluate_delete(&mut self, operand: &Expression) -> Completion {
        match operand {
            Expression::Member { .. } | Expression::SuperProperty(_) => {
                let reference = match self.evaluate_reference(operand) {
                    Ok(r) => r,
                    Err(abrupt) => return abrupt,
                };
                if reference.this_value.is_some() {
                    let error = self.reference_error("Unsupported reference to 'super'");
                    return Completion::Throw(error);
                }
                let ReferenceBase::Value(base) = &reference.base else {
                    return Completion::Normal(JsValue::Boolean(true));
                };
                let base = base.clone();
                let id = crate::try_op!(self.to_object(&base));
                let deleted = crate::try_op!(self.internal_delete(id, &reference.key));
                if !deleted && reference.strict {
                    let error = self.type_error(&format!(
                        "Cannot delete property '{}'",
                        reference.key
                    ));
                    return Completion::Throw(error);
                }
                Completion::Normal(JsValue::Boolean(deleted))
            }
            Expression::Identifier(name) => {
                // Strict-mode delete of a binding is a parse error; here
                // only sloppy code arrives.
                let reference = crate::try_op!(self.resolve_binding(name));
                match reference.base {
                    ReferenceBase::Unresolvable => Completion::Normal(JsValue::Boolean(true)),
                    ReferenceBase::Env(env) => {
                        let deleted = crate::try_op!(self.env_delete_binding(&env, name));
                        Completion::Normal(JsValue::Boolean(deleted))
                    }
                    ReferenceBase::Value(_) => Completion::Normal(JsValue::Boolean(true)),
                }
            }
            _ => {
                crate::try_normal!(self.evaluate_expression(operand));
                Completion::Normal(JsValue::Boolean(true))
            }
        }
    }

    fn evaluate_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expression,
    ) -> Completion {
        let reference = match self.evaluate_reference(target) {
            Ok(r) => r,
            Err(abrupt) => return abrupt,
        };
        let old = crate::try_op!(self.get_value(&reference));
        let old = crate::try_op!(self.to_numeric(&old));
        let new = match &old {
            JsValue::Number(n) => JsValue::Number(match op {
                UpdateOp::Increment => n + 1.0,
                UpdateOp::Decrement => n - 1.0,
            }),
            JsValue::BigInt(b) => JsValue::BigInt(JsBigInt {
                value: match op {
                    UpdateOp::Increment => &b.value + 1,
                    UpdateOp::Decrement => &b.value - 1,
                },
            }),
            _ => unreachable!(),
        };
        crate::try_op!(self.put_value(&reference, new.clone()));
        Completion::Normal(if prefix { new } else { old })
    }

    fn evaluate_assignment(
        &mut self,
        op: AssignOp,
        left: &Expression,
        right: &Expression,
    ) -> Completion {
        if op == AssignOp::Assign {
            let reference = match self.evaluate_reference(left) {
                Ok(r) => r,
                Err(abrupt) => return abrupt,
            };
            let value = if right.is_anonymous_function_definition() {
                crate::try_normal!(self.named_evaluation(right, &reference.name()))
            } else {
                crate::try_normal!(self.evaluate_expression(right))
            };
            crate::try_op!(self.put_value(&reference, value.clone()));
            return Completion::Normal(value);
        }

        // Logical assignment short-circuits before evaluating the right
        // side.
        if matches!(
            op,
            AssignOp::LogicalAnd | AssignOp::LogicalOr | AssignOp::Nullish
        ) {
            let reference = match self.evaluate_reference(left) {
                Ok(r) => r,
                Err(abrupt) => return abrupt,
            };
            let old = crate::try_op!(self.get_value(&reference));
            let proceed = match op {
                AssignOp::LogicalAnd => self.to_boolean(&old),
                AssignOp::LogicalOr => !self.to_boolean(&old),
                AssignOp::Nullish => old.is_nullish(),
                _ => unreachable!(),
            };
            if !proceed {
                return Completion::Normal(old);
            }
            let value = if right.is_anonymous_function_definition() {
                crate::try_normal!(self.named_evaluation(right, &reference.name()))
            } else {
                crate::try_normal!(self.evaluate_expression(right))
            };
            crate::try_op!(self.put_value(&reference, value.clone()));
            return Completion::Normal(value);
        }

        let binary = match op {
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Mod => BinaryOp::Mod,
            AssignOp::Exp => BinaryOp::Exp,
            AssignOp::LeftShift => BinaryOp::LeftShift,
            AssignOp::RightShift => BinaryOp::RightShift,
            AssignOp::UnsignedRightShift => BinaryOp::UnsignedRightShift,
            AssignOp::BitAnd => BinaryOp::BitAnd,
            AssignOp::BitOr => BinaryOp::BitOr,
            AssignOp::BitXor => BinaryOp::BitXor,
            _ => unreachable!(),
        };
        let reference = match self.evaluate_reference(left) {
            Ok(r) => r,
            Err(abrupt) => return abrupt,
        };
        let lval = crate::try_op!(self.get_value(&reference));
        let rval = crate::try_normal!(self.evaluate_expression(right));
        let result = crate::try_op!(self.apply_binary(binary, &lval, &rval));
        crate::try_op!(self.put_value(&reference, result.clone()));
        Completion::Normal(result)
    }

    /// The strict/loose binary operators (§13.5–13.10).
    pub fn apply_binary(
        &mut self,
        op: BinaryOp,
        lval: &JsValue,
        rval: &JsValue,
    ) -> Result<JsValue, JsValue> {
        use BinaryOp::*;
        match op {
            Add => {
                let lprim = self.to_primitive(lval, "default")?;
                let rprim = self.to_primitive(rval, "default")?;
                if lprim.is_string() || rprim.is_string() {
                    let ls = self.to_string_value(&lprim)?;
                    let rs = self.to_string_value(&rprim)?;
                    return Ok(JsValue::String(ls.concat(&rs)));
                }
                let lnum = self.to_numeric(&lprim)?;
                let rnum = self.to_numeric(&rprim)?;
                self.numeric_binary(Add, &lnum, &rnum)
            }
            Sub | Mul | Div | Mod | Exp | BitAnd | BitOr | BitXor | LeftShift | RightShift
            | UnsignedRightShift => {
                let lnum = self.to_numeric(lval)?;
                let rnum = self.to_numeric(rval)?;
                self.numeric_binary(op, &lnum, &rnum)
            }
            LooseEq => Ok(JsValue::Boolean(self.loose_equals(lval, rval)?)),
            LooseNotEq => Ok(JsValue::Boolean(!self.loose_equals(lval, rval)?)),
            StrictEq => Ok(JsValue::Boolean(strict_equals(lval, rval))),
            StrictNotEq => Ok(JsValue::Boolean(!strict_equals(lval, rval))),
            Lt => {
                let r = self.abstract_relational(lval, rval, true)?;
                Ok(JsValue::Boolean(r == Some(true)))
            }
            Gt => {
                let r = self.abstract_relational(rval, lval, false)?;
                Ok(JsValue::Boolean(r == Some(true)))
            }
            LtEq => {
                let r = self.abstract_relational(rval, lval, false)?;
                Ok(JsValue::Boolean(r == Some(false)))
            }
            GtEq => {
                let r = self.abstract_relational(lval, rval, true)?;
                Ok(JsValue::Boolean(r == Some(false)))
            }
            In => {
                let Some(id) = rval.object_id() else {
                    return Err(self.type_error(
                        "Cannot use 'in' operator to search for a property in a non-object",
                    ));
                };
                let key = self.to_property_key(lval)?;
                Ok(JsValue::Boolean(self.internal_has_property(id, &key)?))
            }
            InstanceOf => Ok(JsValue::Boolean(self.instanceof_operator(lval, rval)?)),
        }
    }

    fn numeric_binary(
        &mut self,
        op: BinaryOp,
        lnum: &JsValue,
        rnum: &JsValue,
    ) -> Result<JsValue, JsValue> {
        use BinaryOp::*;
        match (lnum, rnum) {
            (JsValue::BigInt(a), JsValue::BigInt(b)) => {
                crate::interpreter::helpers::bigint_binary(op, a, b).map_err(|message| {
                    if message == "Division by zero" {
                        self.range_error(message)
                    } else {
                        self.type_error(message)
                    }
                })
            }
            (JsValue::Number(a), JsValue::Number(b)) => {
                let (a, b) = (*a, *b);
                Ok(JsValue::Number(match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    Div => a / b,
                    Mod => number_ops::remainder(a, b),
                    Exp => number_ops::exponentiate(a, b),
                    BitAnd => number_ops::bitwise_and(a, b),
                    BitOr => number_ops::bitwise_or(a, b),
                    BitXor => number_ops::bitwise_xor(a, b),
                    LeftShift => number_ops::left_shift(a, b),
                    RightShift => number_ops::signed_right_shift(a, b),
                    UnsignedRightShift => number_ops::unsigned_right_shift(a, b),
                    _ => unreachable!(),
                }))
            }
            _ => Err(self.type_error("Cannot mix BigInt and other types, use explicit conversions")),
        }
    }

    // ── calls ────────────────────────────────────────────────────────

    pub(crate) fn evaluate_arguments(
        &mut self,
        args: &[Argument],
    ) -> Result<Vec<JsValue>, Completion> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Item(expr) => match self.evaluate_expression(expr) {
                    Completion::Normal(v) => out.push(v),
                    abrupt => return Err(abrupt),
                },
                Argument::Spread(expr) => {
                    let source = match self.evaluate_expression(expr) {
                        Completion::Normal(v) => v,
                        abrupt => return Err(abrupt),
                    };
                    match self.iterable_to_list(&source) {
                        Ok(values) => out.extend(values),
                        Err(e) => return Err(Completion::Throw(e)),
                    }
                }
            }
        }
        Ok(out)
    }

    fn evaluate_call(
        &mut self,
        callee: &Expression,
        args: &[Argument],
        _optional: bool,
    ) -> Completion {
        let (func, this_value) = match callee {
            Expression::Member { .. } | Expression::SuperProperty(_) => {
                let reference = match self.evaluate_reference(callee) {
                    Ok(r) => r,
                    Err(abrupt) => return abrupt,
                };
                let this = match (&reference.this_value, &reference.base) {
                    (Some(t), _) => t.clone(),
                    (None, ReferenceBase::Value(base)) => base.clone(),
                    _ => JsValue::Undefined,
                };
                (crate::try_op!(self.get_value(&reference)), this)
            }
            Expression::Identifier(name) => {
                let reference = crate::try_op!(self.resolve_binding(name));
                // A with-scope supplies its binding object as this.
                let this = match &reference.base {
                    ReferenceBase::Env(env) => env
                        .borrow()
                        .with_base_object()
                        .map(JsValue::object)
                        .unwrap_or(JsValue::Undefined),
                    _ => JsValue::Undefined,
                };
                (crate::try_op!(self.get_value(&reference)), this)
            }
            other => (
                crate::try_normal!(self.evaluate_expression(other)),
                JsValue::Undefined,
            ),
        };
        let args = match self.evaluate_arguments(args) {
            Ok(a) => a,
            Err(abrupt) => return abrupt,
        };
        self.call(&func, &this_value, &args).into()
    }

    fn evaluate_new(&mut self, callee: &Expression, args: &[Argument]) -> Completion {
        let ctor = crate::try_normal!(self.evaluate_expression(callee));
        let args = match self.evaluate_arguments(args) {
            Ok(a) => a,
            Err(abrupt) => return abrupt,
        };
        self.construct(&ctor, &args, &ctor.clone()).into()
    }

    /// SuperCall (§13.3.7.1): construct the parent, bind this, run field
    /// initialisers.
    fn evaluate_super_call(&mut self, args: &[Argument]) -> Completion {
        let env = self.get_this_environment(self.lexical_env());
        let (func_id, new_target) = {
            let e = env.borrow();
            match &e.kind {
                EnvKind::Function {
                    function_object,
                    new_target,
                    ..
                } => (*function_object, new_target.clone()),
                _ => {
                    drop(e);
                    let error =
                        self.syntax_error("'super' keyword unexpected outside a constructor");
                    return Completion::Throw(error);
                }
            }
        };
        let super_ctor = crate::try_op!(self.internal_get_prototype_of(func_id));
        if !self.is_constructor(&super_ctor) {
            let error = self.type_error("Super constructor is not a constructor");
            return Completion::Throw(error);
        }
        let args = match self.evaluate_arguments(args) {
            Ok(a) => a,
            Err(abrupt) => return abrupt,
        };
        let result = crate::try_op!(self.construct(&super_ctor, &args, &new_target));

        // BindThisValue: double super() is an error.
        {
            let mut e = env.borrow_mut();
            if let EnvKind::Function {
                this_value,
                this_status,
                ..
            } = &mut e.kind
            {
                if *this_status == ThisBindingStatus::Initialized {
                    drop(e);
                    let error = self.reference_error("Super constructor may only be called once");
                    return Completion::Throw(error);
                }
                *this_value = result.clone();
                *this_status = ThisBindingStatus::Initialized;
            }
        }
        // Instance fields of the active (derived) constructor.
        let user = {
            let obj = self.get_object(func_id).unwrap();
            let callable = obj.borrow().callable.clone();
            match callable {
                Some(JsFunction::User(u)) => Some(u),
                _ => None,
            }
        };
        if let Some(user) = user {
            crate::try_op!(self.initialize_instance_fields(&result, &user));
        }
        self.last_constructed_this = Some(result.clone());
        Completion::Normal(result)
    }

    // ── optional chains ──────────────────────────────────────────────

    /// Evaluate a `?.` chain. `Ok(None)` means the chain short-circuited
    /// at a nullish base; the pair carries (value, this-for-call).
    fn evaluate_chain(
        &mut self,
        expr: &Expression,
    ) -> Result<Option<(JsValue, JsValue)>, Completion> {
        match expr {
            Expression::Member {
                object,
                property,
                optional,
            } => {
                let Some((base, _)) = self.evaluate_chain(object)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                if base.is_nullish() {
                    let error = self.type_error(&format!(
                        "Cannot read properties of {}",
                        base.type_of()
                    ));
                    return Err(Completion::Throw(error));
                }
                let key = match property {
                    MemberKey::Ident(name) => PropertyKey::from_str(name),
                    MemberKey::Computed(e) => {
                        let v = match self.evaluate_expression(e) {
                            Completion::Normal(v) => v,
                            abrupt => return Err(abrupt),
                        };
                        self.to_property_key(&v).map_err(Completion::Throw)?
                    }
                };
                let id = self.to_object(&base).map_err(Completion::Throw)?;
                let value = self
                    .internal_get(id, &key, &base)
                    .map_err(Completion::Throw)?;
                Ok(Some((value, base)))
            }
            Expression::Call {
                callee,
                args,
                optional,
            } => {
                let Some((func, this_value)) = self.evaluate_chain(callee)? else {
                    return Ok(None);
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.evaluate_arguments(args)?;
                let result = self
                    .call(&func, &this_value, &args)
                    .map_err(Completion::Throw)?;
                Ok(Some((result, JsValue::Undefined)))
            }
            other => match self.evaluate_expression(other) {
                Completion::Normal(v) => Ok(Some((v, JsValue::Undefined))),
                abrupt => Err(abrupt),
            },
        }
    }

    // ── suspension points: yield and await ───────────────────────────

    /// One dynamic suspension point. During replay, points before the
    /// target produce their recorded resume value (or the injected
    /// abrupt completion); the target point suspends.
    pub(crate) fn suspension_point(&mut self, kind: SuspendKind, value: JsValue) -> Completion {
        let Some(ctx) = self.generator_ctx.as_mut() else {
            // Only reachable when the parser let an await through at top
            // level, which the grammar forbids.
            let error = self.syntax_error("Suspension outside a resumable function body");
            return Completion::Throw(error);
        };
        let index = ctx.counter;
        ctx.counter += 1;
        if index == ctx.target {
            return Completion::Suspend(kind, value);
        }
        if let Some((inject_at, _)) = &ctx.inject {
            if *inject_at == index {
                let (_, completion) = ctx.inject.take().unwrap();
                return completion;
            }
        }
        let resumed = ctx.resume.get(index).cloned().unwrap_or(JsValue::Undefined);
        Completion::Normal(resumed)
    }

    fn evaluate_yield(&mut self, argument: Option<&Expression>, delegate: bool) -> Completion {
        if delegate {
            return self.evaluate_yield_delegate(argument);
        }
        let value = match argument {
            Some(expr) => crate::try_normal!(self.evaluate_expression(expr)),
            None => JsValue::Undefined,
        };
        self.suspension_point(SuspendKind::Yield, value)
    }

    /// `yield*`: drain the inner iterator, re-yielding each value.
    /// Abrupt resumptions close the inner iterator before propagating.
    fn evaluate_yield_delegate(&mut self, argument: Option<&Expression>) -> Completion {
        let source = match argument {
            Some(expr) => crate::try_normal!(self.evaluate_expression(expr)),
            None => JsValue::Undefined,
        };
        let record = crate::try_op!(self.get_iterator(&source, false));
        let mut received = JsValue::Undefined;
        loop {
            let result = crate::try_op!(self.iterator_next(&record, Some(received.clone())));
            if crate::try_op!(self.iterator_complete(&result)) {
                return Completion::Normal(crate::try_op!(self.iterator_value(&result)));
            }
            let value = crate::try_op!(self.iterator_value(&result));
            match self.suspension_point(SuspendKind::Yield, value) {
                Completion::Normal(sent) => received = sent,
                Completion::Suspend(kind, v) => return Completion::Suspend(kind, v),
                abrupt => {
                    let close_result = self.iterator_close(&record, Ok(JsValue::Undefined));
                    if let Err(e) = close_result {
                        return Completion::Throw(e);
                    }
                    return abrupt;
                }
            }
        }
    }

    // ── dynamic import (§13.3.10) ────────────────────────────────────

    fn evaluate_import_call(&mut self, specifier: &Expression) -> Completion {
        let value = crate::try_normal!(self.evaluate_expression(specifier));
        let specifier = match self.to_string_value(&value) {
            Ok(s) => s.to_rust_string(),
            Err(e) => return Completion::Throw(e),
        };
        let realm = self.current_realm();
        let capability = crate::try_op!(self.new_promise_capability_default());
        let referrer = self
            .contexts
            .iter()
            .rev()
            .find_map(|c| match &c.script_or_module {
                Some(ScriptOrModule::Module(id)) => Some(*id),
                _ => None,
            });
        self.enqueue_job(
            realm,
            JobKind::DynamicImport {
                referrer,
                specifier,
                capability: capability.clone(),
            },
        );
        Completion::Normal(capability.promise)
    }

    // ── destructuring assignment (§13.15.5) ──────────────────────────

    /// DestructuringAssignmentEvaluation: assign (not bind) through the
    /// pattern.
    pub fn destructuring_assign(
        &mut self,
        pattern: &Pattern,
        value: JsValue,
    ) -> Result<(), JsValue> {
        match pattern {
            Pattern::Identifier(name) => {
                let reference = self.resolve_binding(name)?;
                self.put_value(&reference, value)
            }
            Pattern::Member(expr) => {
                let reference = match self.evaluate_reference(expr) {
                    Ok(r) => r,
                    Err(Completion::Throw(e)) => return Err(e),
                    Err(_) => return Ok(()),
                };
                self.put_value(&reference, value)
            }
            Pattern::Default(inner, default) => {
                let value = if value.is_undefined() {
                    match self.evaluate_expression(default) {
                        Completion::Normal(v) => v,
                        Completion::Throw(e) => return Err(e),
                        _ => JsValue::Undefined,
                    }
                } else {
                    value
                };
                self.destructuring_assign(inner, value)
            }
            Pattern::Rest(inner) => self.destructuring_assign(inner, value),
            Pattern::Array(elements) => {
                let record = self.get_iterator(&value, false)?;
                let result = self.destructure_array_elements(elements, &record, false);
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
                    self.destructuring_assign(&prop.value, v)?;
                }
                if let Some(rest) = rest {
                    let realm = self.current_realm();
                    let target = self.create_ordinary_object(realm);
                    self.copy_data_properties(target, &value, &seen)?;
                    self.destructuring_assign(rest, JsValue::object(target))?;
                }
                Ok(())
            }
        }
    }

    /// Shared array-pattern walk; `binding` switches between assignment
    /// and initialisation (the caller provides the leaf operation via
    /// `destructuring_assign` vs `binding_initialization`).
    fn destructure_array_elements(
        &mut self,
        elements: &[Option<Pattern>],
        record: &IteratorRecord,
        _binding: bool,
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
                    self.destructuring_assign(inner, array)?;
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
                    self.destructuring_assign(pattern, value)?;
                }
            }
        }
        if !exhausted {
            self.iterator_close(record, Ok(JsValue::Undefined))?;
        }
        Ok(())
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

    fn eval_bool(src: &str) -> bool {
        match eval(src) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean from {src}, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval_number("1 + 2 * 3"), 7.0);
        assert_eq!(eval_number("(1 + 2) * 3"), 9.0);
        assert_eq!(eval_number("2 ** 3 ** 2"), 512.0);
        assert_eq!(eval_number("7 % 4"), 3.0);
    }

    #[test]
    fn string_concatenation_wins_addition() {
        assert_eq!(eval_string("'a' + 1"), "a1");
        assert_eq!(eval_string("1 + '2' + 3"), "123");
        assert_eq!(eval_number("'3' - 1"), 2.0);
    }

    #[test]
    fn equality_operators() {
        assert!(eval_bool("1 == '1'"));
        assert!(!eval_bool("1 === '1'"));
        assert!(eval_bool("null == undefined"));
        assert!(!eval_bool("null === undefined"));
        assert!(!eval_bool("NaN === NaN"));
        assert!(eval_bool("0 === -0"));
    }

    #[test]
    fn typeof_operator() {
        assert_eq!(eval_string("typeof 1"), "number");
        assert_eq!(eval_string("typeof 'x'"), "string");
        assert_eq!(eval_string("typeof undefined"), "undefined");
        assert_eq!(eval_string("typeof null"), "object");
        assert_eq!(eval_string("typeof function(){}"), "function");
        // Unresolvable names are tolerated.
        assert_eq!(eval_string("typeof zap"), "undefined");
    }

    #[test]
    fn logical_short_circuit() {
        assert_eq!(eval_number("0 || 2"), 2.0);
        assert_eq!(eval_number("1 && 2"), 2.0);
        assert_eq!(
            eval_number("var calls = 0; function f() { calls++; return 1; } 0 && f(); calls"),
            0.0
        );
    }

    #[test]
    fn conditional_and_sequence() {
        assert_eq!(eval_number("true ? 1 : 2"), 1.0);
        assert_eq!(eval_number("(1, 2, 3)"), 3.0);
    }

    #[test]
    fn member_access_and_assignment() {
        assert_eq!(eval_number("var o = { a: 1 }; o.a = 5; o.a"), 5.0);
        assert_eq!(eval_number("var o = {}; o['k'] = 3; o.k"), 3.0);
    }

    #[test]
    fn update_expressions() {
        assert_eq!(eval_number("var x = 1; x++"), 1.0);
        assert_eq!(eval_number("var x = 1; ++x"), 2.0);
        assert_eq!(eval_number("var x = 1; x++; x"), 2.0);
    }

    #[test]
    fn delete_operator() {
        assert!(eval_bool("var o = { a: 1 }; delete o.a"));
        assert!(eval_bool("var o = { a: 1 }; delete o.a; !('a' in o)"));
    }

    #[test]
    fn template_literals() {
        assert_eq!(eval_string("var x = 2; `a${x}b${x + 1}c`"), "a2b3c");
    }

    #[test]
    fn spread_in_calls_and_arrays() {
        assert_eq!(
            eval_number("function add(a, b, c) { return a + b + c; } add(...[1, 2, 3])"),
            6.0
        );
        assert_eq!(eval_number("[0, ...[1, 2], 3].length"), 4.0);
    }

    #[test]
    fn destructuring_assignment_expression() {
        assert_eq!(eval_number("var a, b; [a, b] = [1, 2]; a + b"), 3.0);
        assert_eq!(eval_number("var x; ({ x } = { x: 9 }); x"), 9.0);
        assert_eq!(eval_number("var a, rest; [a, ...rest] = [1, 2, 3]; rest.length"), 2.0);
    }

    #[test]
    fn anonymous_functions_get_names() {
        assert_eq!(eval_string("var f = function () {}; f.name"), "f");
        assert_eq!(eval_string("var g = () => {}; g.name"), "g");
        assert_eq!(eval_string("var o = { m: function () {} }; o.m.name"), "m");
    }

    #[test]
    fn instanceof_and_in() {
        assert!(eval_bool("var o = {}; 'toString' in o"));
        assert!(eval_bool("[] instanceof Array"));
        assert!(eval_bool("[] instanceof Object"));
    }

    #[test]
    fn throw_on_nullish_member() {
        match eval("null.x") {
            Completion::Throw(_) => {}
            other => panic!("expected throw, got {other:?}"),
        }
    }
}
