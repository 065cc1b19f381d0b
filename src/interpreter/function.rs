use crate::ast::{
    ClassElement, ClassNode, Expression, FunctionBody, FunctionKind, FunctionNode, MethodKind,
    Pattern, PropName, Statement,
};
use crate::interpreter::agent::{Agent, ExecutionContext, GeneratorContext};
use crate::interpreter::completion::{Completion, SuspendKind};
use crate::interpreter::environment::{Environment, EnvKind, EnvRef, ThisBindingStatus};
use crate::interpreter::object::{
    BoundFunctionData, ConstructorKind, GeneratorData, GeneratorState, InstanceField,
    IteratorData, JsFunction, NativeFunction, ObjectKind, ThisMode, UserFunction,
};
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

impl Agent {
    // ── function object creation (§10.2) ─────────────────────────────

    /// OrdinaryFunctionCreate + the SetFunctionName/SetFunctionLength
    /// steps. `name_hint` supplies the NamedEvaluation name for
    /// anonymous definitions.
    pub fn instantiate_function(
        &mut self,
        node: &FunctionNode,
        closure: &EnvRef,
        name_hint: Option<&str>,
    ) -> JsValue {
        let realm = self.current_realm();
        let name = node
            .name
            .clone()
            .or_else(|| name_hint.map(str::to_string))
            .unwrap_or_default();
        let this_mode = if node.kind.is_arrow() {
            ThisMode::Lexical
        } else if node.strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        };
        let user = Rc::new(UserFunction {
            name: name.clone(),
            params: node.params.clone(),
            body: node.body.clone(),
            kind: node.kind,
            strict: node.strict,
            closure: closure.clone(),
            this_mode,
            realm,
            home_object: Cell::new(None),
            constructor_kind: ConstructorKind::Base,
            fields: RefCell::new(Vec::new()),
        });
        self.finish_function_object(user, node, realm, &name)
    }

    fn finish_function_object(
        &mut self,
        user: Rc<UserFunction>,
        node: &FunctionNode,
        realm: usize,
        name: &str,
    ) -> JsValue {
        let proto = self.intrinsic(realm, Intrinsic::FunctionPrototype);
        let id = self.object_create(proto.object_id(), realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.class_name = "Function";
            data.callable = Some(JsFunction::User(user));
            let length = node
                .params
                .iter()
                .take_while(|p| matches!(p, Pattern::Identifier(_) | Pattern::Array(_) | Pattern::Object { .. }))
                .count();
            data.define(
                PropertyKey::from_str("length"),
                PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
            );
            data.define(
                PropertyKey::from_str("name"),
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str(name)),
                    false,
                    false,
                    true,
                ),
            );
        }

        // MakeConstructor for plain functions; generators get a
        // constructor-less prototype chained to %GeneratorPrototype%.
        match node.kind {
            FunctionKind::Normal => {
                let proto_id = self.create_ordinary_object(realm);
                let proto_obj = self.get_object(proto_id).unwrap();
                proto_obj.borrow_mut().define(
                    PropertyKey::from_str("constructor"),
                    PropertyDescriptor::data(JsValue::object(id), true, false, true),
                );
                obj.borrow_mut().define(
                    PropertyKey::from_str("prototype"),
                    PropertyDescriptor::data(JsValue::object(proto_id), true, false, false),
                );
            }
            FunctionKind::Generator | FunctionKind::AsyncGenerator => {
                let parent = if node.kind == FunctionKind::Generator {
                    Intrinsic::GeneratorPrototype
                } else {
                    Intrinsic::AsyncGeneratorPrototype
                };
                let parent_id = self.intrinsic(realm, parent).object_id();
                let proto_id = self.object_create(parent_id, realm);
                obj.borrow_mut().define(
                    PropertyKey::from_str("prototype"),
                    PropertyDescriptor::data(JsValue::object(proto_id), true, false, false),
                );
            }
            _ => {}
        }
        JsValue::object(id)
    }

    /// A built-in function value.
    pub fn create_native_function(
        &mut self,
        name: &'static str,
        length: u32,
        constructor: bool,
        func: impl Fn(&mut Agent, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    ) -> JsValue {
        let realm = self.current_realm();
        let proto = self.intrinsic(realm, Intrinsic::FunctionPrototype);
        let id = self.object_create(proto.object_id(), realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Function";
        data.callable = Some(JsFunction::Native(NativeFunction {
            name,
            length,
            func: Rc::new(func),
            constructor,
        }));
        data.define(
            PropertyKey::from_str("length"),
            PropertyDescriptor::data(JsValue::Number(length as f64), false, false, true),
        );
        data.define(
            PropertyKey::from_str("name"),
            PropertyDescriptor::data(JsValue::String(JsString::from_str(name)), false, false, true),
        );
        drop(data);
        JsValue::object(id)
    }

    /// BoundFunctionCreate (§10.4.1.3).
    pub fn bound_function_create(
        &mut self,
        target: u64,
        bound_this: JsValue,
        bound_args: Vec<JsValue>,
    ) -> Result<JsValue, JsValue> {
        let realm = self.current_realm();
        let target_proto = self.internal_get_prototype_of(target)?;
        let id = self.allocate_object(ObjectKind::BoundFunction, realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.class_name = "Function";
            data.prototype = target_proto.object_id().and_then(|p| self.get_object(p));
            data.bound = Some(BoundFunctionData {
                target,
                bound_this,
                bound_args,
            });
        }
        // length = max(0, target.length − bound count), name = "bound " + name.
        let target_value = JsValue::object(target);
        let target_length = self.get(&target_value, &PropertyKey::from_str("length"))?;
        let bound_count = {
            let data = obj.borrow();
            data.bound.as_ref().map(|b| b.bound_args.len()).unwrap_or(0)
        };
        let length = match target_length {
            JsValue::Number(n) if n.is_finite() => (n - bound_count as f64).max(0.0),
            _ => 0.0,
        };
        let target_name = self.get(&target_value, &PropertyKey::from_str("name"))?;
        let name = match &target_name {
            JsValue::String(s) => format!("bound {}", s.to_rust_string()),
            _ => "bound".to_string(),
        };
        {
            let mut data = obj.borrow_mut();
            data.define(
                PropertyKey::from_str("length"),
                PropertyDescriptor::data(JsValue::Number(length), false, false, true),
            );
            data.define(
                PropertyKey::from_str("name"),
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str(&name)),
                    false,
                    false,
                    true,
                ),
            );
        }
        Ok(JsValue::object(id))
    }

    // ── Call / Construct (§7.3.14–15) ────────────────────────────────

    /// The Call abstract operation.
    pub fn call(
        &mut self,
        func: &JsValue,
        this_value: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        if !self.is_callable(func) {
            return Err(self.type_error(&format!("{} is not a function", self.inspect(func))));
        }
        self.internal_call(func.object_id().unwrap(), this_value, args)
    }

    /// [[Call]] dispatch over the callable kinds.
    pub fn internal_call(
        &mut self,
        id: u64,
        this_value: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        enum Callee {
            Proxy,
            Bound(u64, JsValue, Vec<JsValue>),
            Native(NativeFunction),
            User(Rc<UserFunction>),
        }
        let callee = {
            let obj = self.get_object(id).expect("stale function handle");
            let data = obj.borrow();
            if data.kind == ObjectKind::Proxy {
                Callee::Proxy
            } else if let Some(bound) = &data.bound {
                Callee::Bound(bound.target, bound.bound_this.clone(), bound.bound_args.clone())
            } else {
                match data.callable.clone() {
                    Some(JsFunction::Native(n)) => Callee::Native(n),
                    Some(JsFunction::User(u)) => Callee::User(u),
                    None => {
                        drop(data);
                        return Err(self.type_error("Object is not callable"));
                    }
                }
            }
        };
        match callee {
            Callee::Proxy => self.proxy_call(id, this_value, args),
            Callee::Bound(target, bound_this, bound_args) => {
                let mut combined = bound_args;
                combined.extend_from_slice(args);
                self.internal_call(target, &bound_this, &combined)
            }
            Callee::Native(native) => {
                // A plain call must not observe an enclosing construct's
                // new.target.
                let saved = self.native_new_target.take();
                let result = (native.func)(self, this_value, args);
                self.native_new_target = saved;
                result
            }
            Callee::User(user) => self.ordinary_call(id, user, this_value, args),
        }
    }

    fn ordinary_call(
        &mut self,
        func_id: u64,
        user: Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        match user.kind {
            FunctionKind::ClassConstructor => {
                return Err(
                    self.type_error("Class constructor cannot be invoked without 'new'")
                );
            }
            FunctionKind::Generator => {
                let bound_this = self.coerce_call_this(&user, this_value)?;
                return Ok(self.create_generator_object(func_id, user, &bound_this, args, false));
            }
            FunctionKind::AsyncGenerator => {
                let bound_this = self.coerce_call_this(&user, this_value)?;
                return Ok(self.create_generator_object(func_id, user, &bound_this, args, true));
            }
            FunctionKind::Async | FunctionKind::AsyncArrow => {
                return self.async_function_start(func_id, user, this_value, args);
            }
            _ => {}
        }
        let completion =
            self.execute_function_body(func_id, &user, this_value, args, &JsValue::Undefined, None);
        match completion {
            Completion::Normal(_) => Ok(JsValue::Undefined),
            Completion::Return(v) => Ok(v),
            Completion::Throw(e) => Err(e),
            Completion::Suspend(..) => unreachable!("suspension escaped a plain call"),
            Completion::Break(_) | Completion::Continue(_) => {
                unreachable!("loop completion escaped a function body")
            }
        }
    }

    /// The OrdinaryCallBindThis coercion for functions whose bodies run
    /// outside the immediate call (generators, async).
    fn coerce_call_this(
        &mut self,
        user: &Rc<UserFunction>,
        this_value: &JsValue,
    ) -> Result<JsValue, JsValue> {
        if user.this_mode == ThisMode::Strict || user.this_mode == ThisMode::Lexical {
            return Ok(this_value.clone());
        }
        if this_value.is_nullish() {
            return Ok(JsValue::object(self.realms[user.realm].global_object));
        }
        Ok(JsValue::object(self.to_object(this_value)?))
    }

    /// PrepareForOrdinaryCall + OrdinaryCallBindThis +
    /// OrdinaryCallEvaluateBody. The pushed context is popped on every
    /// path. `preset_this` carries the construct-time `this`.
    pub(crate) fn execute_function_body(
        &mut self,
        func_id: u64,
        user: &Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
        new_target: &JsValue,
        preset_this: Option<JsValue>,
    ) -> Completion {
        let this_status = if user.this_mode == ThisMode::Lexical {
            ThisBindingStatus::Lexical
        } else if user.kind == FunctionKind::ClassConstructor
            && user.constructor_kind == ConstructorKind::Derived
        {
            ThisBindingStatus::Uninitialized
        } else {
            ThisBindingStatus::Initialized
        };
        let env = Environment::new_function(
            func_id,
            this_status,
            new_target.clone(),
            user.closure.clone(),
        );

        // OrdinaryCallBindThis.
        if user.this_mode != ThisMode::Lexical && this_status != ThisBindingStatus::Uninitialized {
            let bound_this = match preset_this {
                Some(v) => v,
                None => {
                    if user.this_mode == ThisMode::Strict {
                        this_value.clone()
                    } else if this_value.is_nullish() {
                        JsValue::object(self.realms[user.realm].global_object)
                    } else {
                        match self.to_object(this_value) {
                            Ok(id) => JsValue::object(id),
                            Err(e) => return Completion::Throw(e),
                        }
                    }
                }
            };
            if let EnvKind::Function { this_value: slot, .. } = &mut env.borrow_mut().kind {
                *slot = bound_this;
            }
        }
        // Lexical-this functions (arrows) ignore any preset: their this
        // resolves through the captured environment chain.

        self.push_context(ExecutionContext {
            function: Some(JsValue::object(func_id)),
            realm: user.realm,
            lexical_env: env.clone(),
            variable_env: env.clone(),
            script_or_module: None,
            strict: user.strict,
        });

        let mut completion = self.function_declaration_instantiation(user, args, &env);
        if !completion.is_abrupt() {
            completion = match &user.body {
                FunctionBody::Block(statements) => {
                    let body_completion = self.evaluate_statements(statements);
                    match body_completion {
                        Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
                        other => other,
                    }
                }
                FunctionBody::Expression(expr) => {
                    let expr = expr.clone();
                    match self.evaluate_expression(&expr) {
                        Completion::Normal(v) => Completion::Return(v),
                        other => other,
                    }
                }
            };
        }

        self.pop_context();
        completion
    }

    /// The Construct abstract operation.
    pub fn construct(
        &mut self,
        func: &JsValue,
        args: &[JsValue],
        new_target: &JsValue,
    ) -> Result<JsValue, JsValue> {
        if !self.is_constructor(func) {
            return Err(self.type_error(&format!("{} is not a constructor", self.inspect(func))));
        }
        let id = func.object_id().unwrap();
        enum Ctor {
            Proxy,
            Bound(u64, Vec<JsValue>),
            Native(NativeFunction),
            User(Rc<UserFunction>),
        }
        let ctor = {
            let obj = self.get_object(id).unwrap();
            let data = obj.borrow();
            if data.kind == ObjectKind::Proxy {
                Ctor::Proxy
            } else if let Some(bound) = &data.bound {
                Ctor::Bound(bound.target, bound.bound_args.clone())
            } else {
                match data.callable.clone() {
                    Some(JsFunction::Native(n)) => Ctor::Native(n),
                    Some(JsFunction::User(u)) => Ctor::User(u),
                    None => unreachable!("constructor without callable"),
                }
            }
        };
        match ctor {
            Ctor::Proxy => self.proxy_construct(id, args, new_target),
            Ctor::Bound(target, bound_args) => {
                let mut combined = bound_args;
                combined.extend_from_slice(args);
                // new.target redirects to the bound target when it was
                // the bound function itself.
                let target_value = JsValue::object(target);
                let inner_new_target = if new_target.object_id() == Some(id) {
                    &target_value
                } else {
                    new_target
                };
                self.construct(&target_value, &combined, inner_new_target)
            }
            Ctor::Native(native) => {
                let saved = self.native_new_target.replace(new_target.clone());
                let result = (native.func)(self, &JsValue::Undefined, args);
                self.native_new_target = saved;
                result
            }
            Ctor::User(user) => self.ordinary_construct(id, user, args, new_target),
        }
    }

    fn ordinary_construct(
        &mut self,
        func_id: u64,
        user: Rc<UserFunction>,
        args: &[JsValue],
        new_target: &JsValue,
    ) -> Result<JsValue, JsValue> {
        let derived = user.constructor_kind == ConstructorKind::Derived;
        let preset_this = if derived {
            None
        } else {
            let this = self.ordinary_create_from_constructor(new_target, Intrinsic::ObjectPrototype)?;
            // Base-class instance fields initialise before the body runs.
            self.initialize_instance_fields(&this, &user)?;
            Some(this)
        };
        let this_for_return = preset_this.clone();

        // The this a nested super() call produces comes back through an
        // agent register; scope it to this construction so nested
        // constructs inside the body cannot clobber it.
        let saved_constructed = self.last_constructed_this.take();
        let completion = self.execute_function_body(
            func_id,
            &user,
            &JsValue::Undefined,
            args,
            new_target,
            preset_this,
        );
        let constructed = self.last_constructed_this.take();
        self.last_constructed_this = saved_constructed;

        let derived_this = |agent: &mut Agent| match constructed {
            Some(v) => Ok(v),
            None => Err(agent.reference_error(
                "Must call super constructor in derived class before returning",
            )),
        };
        match completion {
            Completion::Return(value) => {
                if value.is_object() {
                    return Ok(value);
                }
                if let Some(this) = this_for_return {
                    return Ok(this);
                }
                if value.is_undefined() {
                    return derived_this(self);
                }
                Err(self.type_error(
                    "Derived constructors may only return object or undefined",
                ))
            }
            Completion::Normal(_) => match this_for_return {
                Some(this) => Ok(this),
                None => derived_this(self),
            },
            Completion::Throw(e) => Err(e),
            _ => unreachable!("invalid completion from constructor body"),
        }
    }

    /// OrdinaryCreateFromConstructor: `new_target.prototype` when it is
    /// an object, else the realm default.
    pub fn ordinary_create_from_constructor(
        &mut self,
        new_target: &JsValue,
        default_proto: Intrinsic,
    ) -> Result<JsValue, JsValue> {
        let realm = self.current_realm();
        let proto = if new_target.is_object() {
            self.get(new_target, &PropertyKey::from_str("prototype"))?
        } else {
            JsValue::Undefined
        };
        let proto_id = match proto.object_id() {
            Some(id) => Some(id),
            None => self.intrinsic(realm, default_proto).object_id(),
        };
        Ok(JsValue::object(self.object_create(proto_id, realm)))
    }

    pub(crate) fn initialize_instance_fields(
        &mut self,
        this: &JsValue,
        user: &Rc<UserFunction>,
    ) -> Result<(), JsValue> {
        let fields: Vec<InstanceField> = user.fields.borrow().clone();
        for field in fields {
            let value = match &field.init {
                Some(init) => {
                    // Field initialisers see `this` and the class scope.
                    let env = Environment::new_function(
                        this.object_id().unwrap_or_default(),
                        ThisBindingStatus::Initialized,
                        JsValue::Undefined,
                        user.closure.clone(),
                    );
                    if let EnvKind::Function { this_value, .. } = &mut env.borrow_mut().kind {
                        *this_value = this.clone();
                    }
                    self.push_context(ExecutionContext {
                        function: None,
                        realm: user.realm,
                        lexical_env: env.clone(),
                        variable_env: env,
                        script_or_module: None,
                        strict: true,
                    });
                    let completion = self.evaluate_expression(init);
                    self.pop_context();
                    match completion {
                        Completion::Normal(v) => v,
                        Completion::Throw(e) => return Err(e),
                        _ => JsValue::Undefined,
                    }
                }
                None => JsValue::Undefined,
            };
            let id = this.object_id().expect("field target must be an object");
            self.create_data_property_or_throw(id, &field.key, value)?;
        }
        Ok(())
    }

    // ── class definition evaluation (§15.7.14) ───────────────────────

    pub fn class_definition_evaluation(
        &mut self,
        node: &ClassNode,
        name_hint: Option<&str>,
    ) -> Result<JsValue, JsValue> {
        let realm = self.current_realm();
        let outer_env = self.lexical_env();
        let class_env = Environment::new_declarative(Some(outer_env.clone()));
        let binding_name = node.name.clone();
        if let Some(name) = &binding_name {
            self.env_create_immutable_binding(&class_env, name);
        }

        // Heritage evaluates in the class scope.
        let (proto_parent, ctor_parent) = match &node.heritage {
            None => (
                self.intrinsic(realm, Intrinsic::ObjectPrototype).object_id(),
                self.intrinsic(realm, Intrinsic::FunctionPrototype),
            ),
            Some(expr) => {
                self.set_lexical_env(class_env.clone());
                let heritage = self.evaluate_expression(expr);
                self.set_lexical_env(outer_env.clone());
                let heritage = match heritage {
                    Completion::Normal(v) => v,
                    Completion::Throw(e) => return Err(e),
                    _ => JsValue::Undefined,
                };
                if heritage.is_null() {
                    (None, self.intrinsic(realm, Intrinsic::FunctionPrototype))
                } else {
                    if !self.is_constructor(&heritage) {
                        return Err(self.type_error("Class extends value is not a constructor"));
                    }
                    let proto = self.get(&heritage, &PropertyKey::from_str("prototype"))?;
                    if !proto.is_object() && !proto.is_null() {
                        return Err(
                            self.type_error("Class extends value has non-object prototype")
                        );
                    }
                    (proto.object_id(), heritage)
                }
            }
        };
        let derived = node.heritage.is_some();
        let proto_id = self.object_create(proto_parent, realm);

        // Locate or synthesise the constructor.
        let ctor_node = node.elements.iter().find_map(|e| match e {
            ClassElement::Method {
                kind: MethodKind::Constructor,
                func,
                ..
            } => Some(func.clone()),
            _ => None,
        });
        let ctor_node = ctor_node.unwrap_or_else(|| default_constructor(derived));

        let name = binding_name
            .clone()
            .or_else(|| name_hint.map(str::to_string))
            .unwrap_or_default();
        let user = Rc::new(UserFunction {
            name: name.clone(),
            params: ctor_node.params.clone(),
            body: ctor_node.body.clone(),
            kind: FunctionKind::ClassConstructor,
            strict: true,
            closure: class_env.clone(),
            this_mode: ThisMode::Strict,
            realm,
            home_object: Cell::new(Some(proto_id)),
            constructor_kind: if derived {
                ConstructorKind::Derived
            } else {
                ConstructorKind::Base
            },
            fields: RefCell::new(Vec::new()),
        });
        let ctor_id = {
            let id = self.object_create(ctor_parent.object_id(), realm);
            let obj = self.get_object(id).unwrap();
            let mut data = obj.borrow_mut();
            data.class_name = "Function";
            data.callable = Some(JsFunction::User(user.clone()));
            data.define(
                PropertyKey::from_str("length"),
                PropertyDescriptor::data(
                    JsValue::Number(ctor_node.params.len() as f64),
                    false,
                    false,
                    true,
                ),
            );
            data.define(
                PropertyKey::from_str("name"),
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str(&name)),
                    false,
                    false,
                    true,
                ),
            );
            data.define(
                PropertyKey::from_str("prototype"),
                PropertyDescriptor::data(JsValue::object(proto_id), false, false, false),
            );
            id
        };
        {
            let proto_obj = self.get_object(proto_id).unwrap();
            proto_obj.borrow_mut().define(
                PropertyKey::from_str("constructor"),
                PropertyDescriptor::data(JsValue::object(ctor_id), true, false, true),
            );
        }

        // Methods, accessors, and fields evaluate in the class scope.
        self.set_lexical_env(class_env.clone());
        let result = self.install_class_elements(node, proto_id, ctor_id, &user);
        self.set_lexical_env(outer_env);
        result?;

        if let Some(name) = &binding_name {
            self.env_initialize_binding(&class_env, name, JsValue::object(ctor_id))?;
        }
        Ok(JsValue::object(ctor_id))
    }

    fn install_class_elements(
        &mut self,
        node: &ClassNode,
        proto_id: u64,
        ctor_id: u64,
        ctor_user: &Rc<UserFunction>,
    ) -> Result<(), JsValue> {
        for element in &node.elements {
            match element {
                ClassElement::Method { kind: MethodKind::Constructor, .. } => {}
                ClassElement::Method {
                    key,
                    kind,
                    func,
                    is_static,
                } => {
                    let home = if *is_static { ctor_id } else { proto_id };
                    let key = self.evaluate_property_name(key)?;
                    let env = self.lexical_env();
                    let name_prefix = match kind {
                        MethodKind::Get => "get ",
                        MethodKind::Set => "set ",
                        _ => "",
                    };
                    let method_name = format!("{name_prefix}{}", key.to_display_string());
                    let method = self.instantiate_function(func, &env, Some(&method_name));
                    if let Some(method_id) = method.object_id() {
                        let obj = self.get_object(method_id).unwrap();
                        if let Some(JsFunction::User(u)) = &obj.borrow().callable {
                            u.home_object.set(Some(home));
                        };
                    }
                    let desc = match kind {
                        MethodKind::Get => PropertyDescriptor {
                            get: Some(method),
                            set: None,
                            enumerable: Some(false),
                            configurable: Some(true),
                            ..Default::default()
                        },
                        MethodKind::Set => PropertyDescriptor {
                            get: None,
                            set: Some(method),
                            enumerable: Some(false),
                            configurable: Some(true),
                            ..Default::default()
                        },
                        _ => PropertyDescriptor::data(method, true, false, true),
                    };
                    self.merge_accessor_and_define(home, &key, desc)?;
                }
                ClassElement::Field {
                    key,
                    value,
                    is_static,
                } => {
                    let key = self.evaluate_property_name(key)?;
                    if *is_static {
                        let value = match value {
                            Some(init) => match self.evaluate_expression(init) {
                                Completion::Normal(v) => v,
                                Completion::Throw(e) => return Err(e),
                                _ => JsValue::Undefined,
                            },
                            None => JsValue::Undefined,
                        };
                        self.create_data_property_or_throw(ctor_id, &key, value)?;
                    } else {
                        ctor_user.fields.borrow_mut().push(InstanceField {
                            key,
                            init: value.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Pair up a newly defined getter/setter with an existing partner on
    /// the same key instead of clobbering it.
    pub(crate) fn merge_accessor_and_define(
        &mut self,
        object: u64,
        key: &PropertyKey,
        mut desc: PropertyDescriptor,
    ) -> Result<(), JsValue> {
        if desc.is_accessor_descriptor() {
            if let Some(existing) = self.ordinary_get_own_property(object, key) {
                if existing.is_accessor_descriptor() {
                    if desc.get.is_none() {
                        desc.get = existing.get;
                    }
                    if desc.set.is_none() {
                        desc.set = existing.set;
                    }
                }
            }
        }
        self.define_property_or_throw(object, key, desc)
    }

    pub(crate) fn evaluate_property_name(
        &mut self,
        name: &PropName,
    ) -> Result<PropertyKey, JsValue> {
        match name {
            PropName::Ident(s) => Ok(PropertyKey::from_str(s)),
            PropName::Str(s) => Ok(PropertyKey::from_js_string(s.clone())),
            PropName::Num(n) => Ok(PropertyKey::from_number(*n)),
            PropName::Computed(expr) => {
                let value = match self.evaluate_expression(expr) {
                    Completion::Normal(v) => v,
                    Completion::Throw(e) => return Err(e),
                    _ => JsValue::Undefined,
                };
                self.to_property_key(&value)
            }
        }
    }

    // ── generator objects and the replay driver ──────────────────────

    fn create_generator_object(
        &mut self,
        func_id: u64,
        user: Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
        is_async: bool,
    ) -> JsValue {
        let realm = self.current_realm();
        let proto_value = self
            .get(&JsValue::object(func_id), &PropertyKey::from_str("prototype"))
            .unwrap_or(JsValue::Undefined);
        let proto_id = proto_value.object_id().or_else(|| {
            self.intrinsic(
                realm,
                if is_async {
                    Intrinsic::AsyncGeneratorPrototype
                } else {
                    Intrinsic::GeneratorPrototype
                },
            )
            .object_id()
        });
        let id = self.object_create(proto_id, realm);
        let obj = self.get_object(id).unwrap();
        let gen = GeneratorData {
            function: user,
            function_object: func_id,
            this_value: this_value.clone(),
            args: args.to_vec(),
            state: GeneratorState::SuspendedStart,
            resume: Vec::new(),
        };
        let mut data = obj.borrow_mut();
        data.class_name = if is_async { "AsyncGenerator" } else { "Generator" };
        data.iterator = Some(if is_async {
            IteratorData::AsyncGenerator(crate::interpreter::object::AsyncGeneratorData {
                gen,
                queue: std::collections::VecDeque::new(),
                draining: false,
            })
        } else {
            IteratorData::Generator(gen)
        });
        drop(data);
        JsValue::object(id)
    }

    /// Run one resume step of a sync generator: `input` is the
    /// completion injected at the paused suspension point.
    pub fn generator_resume(
        &mut self,
        gen_id: u64,
        input: Completion,
    ) -> Result<JsValue, JsValue> {
        let obj = match self.get_object(gen_id) {
            Some(o) if matches!(o.borrow().iterator, Some(IteratorData::Generator(_))) => o,
            _ => return Err(self.type_error("Generator method called on incompatible receiver")),
        };

        // Extract run parameters under the borrow, then release it.
        let (user, func_id, this_value, args, state, mut resume) = {
            let mut data = obj.borrow_mut();
            let Some(IteratorData::Generator(gen)) = &mut data.iterator else {
                unreachable!();
            };
            (
                gen.function.clone(),
                gen.function_object,
                gen.this_value.clone(),
                gen.args.clone(),
                gen.state,
                gen.resume.clone(),
            )
        };

        let target = match state {
            GeneratorState::Executing => {
                return Err(self.type_error("Generator is already running"));
            }
            GeneratorState::Completed => {
                return match input {
                    Completion::Throw(e) => Err(e),
                    Completion::Return(v) => Ok(self.create_iter_result_object(v, true)),
                    _ => Ok(self.create_iter_result_object(JsValue::Undefined, true)),
                };
            }
            GeneratorState::SuspendedStart => match input {
                Completion::Throw(e) => {
                    self.set_generator_state(gen_id, GeneratorState::Completed);
                    return Err(e);
                }
                Completion::Return(v) => {
                    self.set_generator_state(gen_id, GeneratorState::Completed);
                    return Ok(self.create_iter_result_object(v, true));
                }
                _ => 0,
            },
            GeneratorState::SuspendedYield(k) => {
                match input {
                    Completion::Normal(v) => {
                        debug_assert_eq!(resume.len(), k);
                        resume.push(v);
                        self.set_generator_inject(gen_id, None);
                    }
                    abrupt => {
                        resume.push(JsValue::Undefined);
                        self.set_generator_inject(gen_id, Some((k, abrupt)));
                    }
                }
                k + 1
            }
        };

        self.set_generator_state(gen_id, GeneratorState::Executing);
        let inject = self.take_generator_inject(gen_id);
        let completion = self.run_replay(func_id, &user, &this_value, &args, resume.clone(), target, inject);

        match completion {
            Completion::Suspend(SuspendKind::Yield, value) => {
                {
                    let mut data = obj.borrow_mut();
                    if let Some(IteratorData::Generator(gen)) = &mut data.iterator {
                        gen.state = GeneratorState::SuspendedYield(target);
                        gen.resume = resume;
                    }
                }
                Ok(self.create_iter_result_object(value, false))
            }
            Completion::Suspend(SuspendKind::Await, _) => {
                self.set_generator_state(gen_id, GeneratorState::Completed);
                Err(self.type_error("await is not valid in a synchronous generator"))
            }
            Completion::Normal(_) => {
                self.set_generator_state(gen_id, GeneratorState::Completed);
                Ok(self.create_iter_result_object(JsValue::Undefined, true))
            }
            Completion::Return(v) => {
                self.set_generator_state(gen_id, GeneratorState::Completed);
                Ok(self.create_iter_result_object(v, true))
            }
            Completion::Throw(e) => {
                self.set_generator_state(gen_id, GeneratorState::Completed);
                Err(e)
            }
            _ => unreachable!("loop completion escaped a generator body"),
        }
    }

    fn set_generator_state(&self, gen_id: u64, state: GeneratorState) {
        if let Some(obj) = self.get_object(gen_id) {
            let mut data = obj.borrow_mut();
            match &mut data.iterator {
                Some(IteratorData::Generator(gen)) => gen.state = state,
                Some(IteratorData::AsyncGenerator(agen)) => agen.gen.state = state,
                _ => {}
            }
        }
    }

    // Injection is transient per resume; it lives on the agent only for
    // the duration of generator_resume.
    fn set_generator_inject(&mut self, _gen_id: u64, inject: Option<(usize, Completion)>) {
        self.pending_inject = inject;
    }

    fn take_generator_inject(&mut self, _gen_id: u64) -> Option<(usize, Completion)> {
        self.pending_inject.take()
    }

    /// Re-execute a generator/async body from the top, consuming
    /// recorded resume values, until suspension point `target` (or
    /// completion).
    pub(crate) fn run_replay(
        &mut self,
        func_id: u64,
        user: &Rc<UserFunction>,
        this_value: &JsValue,
        args: &[JsValue],
        resume: Vec<JsValue>,
        target: usize,
        inject: Option<(usize, Completion)>,
    ) -> Completion {
        let saved_ctx = self.generator_ctx.take();
        self.generator_ctx = Some(GeneratorContext {
            counter: 0,
            target,
            resume,
            inject,
        });
        let completion = self.execute_function_body(
            func_id,
            user,
            this_value,
            args,
            &JsValue::Undefined,
            Some(this_value.clone()),
        );
        self.generator_ctx = saved_ctx;
        completion
    }
}

/// The synthesised constructor for classes that declare none: derived
/// classes forward their arguments to super.
fn default_constructor(derived: bool) -> FunctionNode {
    let body = if derived {
        vec![Statement::Expression(Expression::SuperCall(vec![
            crate::ast::Argument::Spread(Expression::Identifier("args".to_string())),
        ]))]
    } else {
        Vec::new()
    };
    let params = if derived {
        vec![Pattern::Rest(Box::new(Pattern::Identifier(
            "args".to_string(),
        )))]
    } else {
        Vec::new()
    };
    FunctionNode {
        name: None,
        params,
        body: FunctionBody::Block(body),
        kind: FunctionKind::ClassConstructor,
        strict: true,
    }
}
