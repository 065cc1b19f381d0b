use crate::interpreter::agent::Agent;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::types::JsValue;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

/// Environment records (§9.1): a binding table plus the outer chain.
/// The kind payload carries the variant-specific state; the generic
/// binding operations live on `Agent` because object-backed variants
/// route through internal methods that may run arbitrary code.
#[derive(Debug)]
pub struct Environment {
    pub kind: EnvKind,
    pub bindings: IndexMap<String, Binding>,
    pub outer: Option<EnvRef>,
}

#[derive(Debug)]
pub enum EnvKind {
    Declarative,
    Object {
        binding_object: u64,
        /// True for `with` environments: `@@unscopables` applies and the
        /// binding object is the implicit receiver.
        with_environment: bool,
    },
    Function {
        this_value: JsValue,
        this_status: ThisBindingStatus,
        function_object: u64,
        new_target: JsValue,
    },
    Global {
        binding_object: u64,
        /// Names created by CreateGlobalVarBinding, distinguishable from
        /// plain global-object properties.
        var_names: Vec<String>,
    },
    Module,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisBindingStatus {
    /// Arrow functions defer to the enclosing environment.
    Lexical,
    Initialized,
    /// Derived constructors before `super()` has run.
    Uninitialized,
}

#[derive(Clone, Debug)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub initialized: bool,
    /// Import binding: (module id, local binding name in that module's
    /// environment). Reads resolve through the other module.
    pub indirect: Option<(usize, String)>,
}

impl Binding {
    fn mutable_uninitialized() -> Binding {
        Binding {
            value: JsValue::Undefined,
            mutable: true,
            initialized: false,
            indirect: None,
        }
    }
}

impl Environment {
    pub fn new_declarative(outer: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: EnvKind::Declarative,
            bindings: IndexMap::new(),
            outer,
        }))
    }

    pub fn new_object(binding_object: u64, with_environment: bool, outer: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: EnvKind::Object {
                binding_object,
                with_environment,
            },
            bindings: IndexMap::new(),
            outer,
        }))
    }

    pub fn new_function(
        function_object: u64,
        this_status: ThisBindingStatus,
        new_target: JsValue,
        outer: EnvRef,
    ) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: EnvKind::Function {
                this_value: JsValue::Undefined,
                this_status,
                function_object,
                new_target,
            },
            bindings: IndexMap::new(),
            outer: Some(outer),
        }))
    }

    pub fn new_global(binding_object: u64) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: EnvKind::Global {
                binding_object,
                var_names: Vec::new(),
            },
            bindings: IndexMap::new(),
            outer: None,
        }))
    }

    pub fn new_module(outer: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            kind: EnvKind::Module,
            bindings: IndexMap::new(),
            outer: Some(outer),
        }))
    }

    pub fn has_this_binding(&self) -> bool {
        match &self.kind {
            EnvKind::Function { this_status, .. } => *this_status != ThisBindingStatus::Lexical,
            EnvKind::Global { .. } | EnvKind::Module => true,
            _ => false,
        }
    }

    /// HasSuperBinding: only function records whose function has a home
    /// object (methods) supply `super`.
    pub fn has_super_binding(&self, agent: &crate::interpreter::agent::Agent) -> bool {
        match &self.kind {
            EnvKind::Function {
                this_status,
                function_object,
                ..
            } => {
                if *this_status == ThisBindingStatus::Lexical {
                    return false;
                }
                agent
                    .get_object(*function_object)
                    .is_some_and(|o| match &o.borrow().callable {
                        Some(crate::interpreter::object::JsFunction::User(u)) => {
                            u.home_object.get().is_some()
                        }
                        _ => false,
                    })
            }
            _ => false,
        }
    }

    /// WithBaseObject: the implicit receiver supplied by `with` scopes.
    pub fn with_base_object(&self) -> Option<u64> {
        match &self.kind {
            EnvKind::Object {
                binding_object,
                with_environment: true,
            } => Some(*binding_object),
            _ => None,
        }
    }
}

impl Agent {
    /// HasBinding, all variants.
    pub fn env_has_binding(&mut self, env: &EnvRef, name: &str) -> Result<bool, JsValue> {
        let (kind_check, binding_hit) = {
            let e = env.borrow();
            let hit = e.bindings.contains_key(name);
            let object_check = match &e.kind {
                EnvKind::Object {
                    binding_object,
                    with_environment,
                } => Some((*binding_object, *with_environment)),
                EnvKind::Global { binding_object, .. } if !hit => Some((*binding_object, false)),
                _ => None,
            };
            (object_check, hit)
        };
        match kind_check {
            None => Ok(binding_hit),
            Some((binding_object, with_environment)) => {
                if binding_hit {
                    return Ok(true);
                }
                let key = PropertyKey::from_str(name);
                if !self.internal_has_property(binding_object, &key)? {
                    return Ok(false);
                }
                if with_environment && self.is_unscopable(binding_object, &key)? {
                    return Ok(false);
                }
                Ok(true)
            }
        }
    }

    fn is_unscopable(&mut self, object: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let unscopables_key = PropertyKey::Symbol(self.well_known.unscopables.clone());
        let receiver = JsValue::object(object);
        let unscopables = self.internal_get(object, &unscopables_key, &receiver)?;
        if let Some(id) = unscopables.object_id() {
            let value = self.internal_get(id, key, &unscopables)?;
            return Ok(self.to_boolean(&value));
        }
        Ok(false)
    }

    /// CreateMutableBinding. For object-backed records this defines a
    /// property on the binding object.
    pub fn env_create_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        deletable: bool,
    ) -> Result<(), JsValue> {
        let binding_object = match &env.borrow().kind {
            EnvKind::Object { binding_object, .. } => Some(*binding_object),
            _ => None,
        };
        if let Some(obj) = binding_object {
            let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, deletable);
            self.define_property_or_throw(obj, &PropertyKey::from_str(name), desc)?;
            return Ok(());
        }
        env.borrow_mut()
            .bindings
            .insert(name.to_string(), Binding::mutable_uninitialized());
        Ok(())
    }

    pub fn env_create_immutable_binding(&mut self, env: &EnvRef, name: &str) {
        env.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                initialized: false,
                indirect: None,
            },
        );
    }

    /// Module import indirection; initialized by definition.
    pub fn env_create_import_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        module: usize,
        local: &str,
    ) {
        env.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                mutable: false,
                initialized: true,
                indirect: Some((module, local.to_string())),
            },
        );
    }

    /// InitializeBinding.
    pub fn env_initialize_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let binding_object = match &env.borrow().kind {
            EnvKind::Object { binding_object, .. } => Some(*binding_object),
            _ => None,
        };
        if let Some(obj) = binding_object {
            let receiver = JsValue::object(obj);
            self.internal_set(obj, &PropertyKey::from_str(name), value, &receiver)?;
            return Ok(());
        }
        let mut e = env.borrow_mut();
        if let Some(binding) = e.bindings.get_mut(name) {
            binding.value = value;
            binding.initialized = true;
        }
        Ok(())
    }

    /// SetMutableBinding on this specific record.
    pub fn env_set_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Result<(), JsValue> {
        enum Route {
            Declarative,
            Object(u64),
            GlobalObject(u64),
            Missing,
        }
        let route = {
            let e = env.borrow();
            match &e.kind {
                EnvKind::Object { binding_object, .. } => Route::Object(*binding_object),
                EnvKind::Global { binding_object, .. } => {
                    if e.bindings.contains_key(name) {
                        Route::Declarative
                    } else {
                        Route::GlobalObject(*binding_object)
                    }
                }
                _ => {
                    if e.bindings.contains_key(name) {
                        Route::Declarative
                    } else {
                        Route::Missing
                    }
                }
            }
        };
        match route {
            Route::Missing => {
                if strict {
                    return Err(self.reference_error(&format!("{name} is not defined")));
                }
                // Sloppy-mode auto-creation, then retry.
                self.env_create_mutable_binding(env, name, true)?;
                self.env_initialize_binding(env, name, value)
            }
            Route::Object(obj) | Route::GlobalObject(obj) => {
                let receiver = JsValue::object(obj);
                let key = PropertyKey::from_str(name);
                let succeeded = self.internal_set(obj, &key, value, &receiver)?;
                if !succeeded && strict {
                    return Err(
                        self.type_error(&format!("Cannot assign to read only property '{name}'"))
                    );
                }
                Ok(())
            }
            Route::Declarative => {
                let mut e = env.borrow_mut();
                let binding = e.bindings.get_mut(name).expect("binding vanished");
                if !binding.initialized {
                    drop(e);
                    return Err(self.reference_error(&format!(
                        "Cannot access '{name}' before initialization"
                    )));
                }
                if !binding.mutable {
                    drop(e);
                    return Err(self.type_error("Assignment to constant variable."));
                }
                binding.value = value;
                Ok(())
            }
        }
    }

    /// Convenience wrapper used by non-reference call sites.
    pub fn set_mutable_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Result<(), JsValue> {
        self.env_set_mutable_binding(env, name, value, strict)
    }

    /// GetBindingValue. TDZ reads and unresolved indirections throw
    /// ReferenceError.
    pub fn get_binding_value(
        &mut self,
        env: &EnvRef,
        name: &str,
        strict: bool,
    ) -> Result<JsValue, JsValue> {
        enum Found {
            Value(JsValue),
            Tdz,
            Indirect(usize, String),
            Object(u64),
            Missing,
        }
        let found = {
            let e = env.borrow();
            match e.bindings.get(name) {
                Some(binding) => {
                    if let Some((module, local)) = &binding.indirect {
                        Found::Indirect(*module, local.clone())
                    } else if !binding.initialized {
                        Found::Tdz
                    } else {
                        Found::Value(binding.value.clone())
                    }
                }
                None => match &e.kind {
                    EnvKind::Object { binding_object, .. }
                    | EnvKind::Global { binding_object, .. } => Found::Object(*binding_object),
                    _ => Found::Missing,
                },
            }
        };
        match found {
            Found::Value(v) => Ok(v),
            Found::Tdz => {
                Err(self.reference_error(&format!("Cannot access '{name}' before initialization")))
            }
            Found::Indirect(module, local) => self.module_binding_value(module, &local),
            Found::Object(obj) => {
                let key = PropertyKey::from_str(name);
                if !self.internal_has_property(obj, &key)? {
                    if strict {
                        return Err(self.reference_error(&format!("{name} is not defined")));
                    }
                    return Ok(JsValue::Undefined);
                }
                let receiver = JsValue::object(obj);
                self.internal_get(obj, &key, &receiver)
            }
            Found::Missing => Err(self.reference_error(&format!("{name} is not defined"))),
        }
    }

    /// DeleteBinding: only configurable object-backed bindings delete.
    pub fn env_delete_binding(&mut self, env: &EnvRef, name: &str) -> Result<bool, JsValue> {
        let binding_object = {
            let e = env.borrow();
            if e.bindings.contains_key(name) {
                None
            } else {
                match &e.kind {
                    EnvKind::Object { binding_object, .. }
                    | EnvKind::Global { binding_object, .. } => Some(*binding_object),
                    _ => None,
                }
            }
        };
        match binding_object {
            Some(obj) => self.internal_delete(obj, &PropertyKey::from_str(name)),
            None => Ok(false),
        }
    }

    /// Walk the chain for the record that would supply `this`.
    pub fn get_this_environment(&self, mut env: EnvRef) -> EnvRef {
        loop {
            if env.borrow().has_this_binding() {
                return env;
            }
            let outer = env.borrow().outer.clone();
            env = outer.expect("no environment with a this binding");
        }
    }

    /// GetThisBinding on the chain's this-environment.
    pub fn resolve_this_binding(&mut self, env: EnvRef) -> Result<JsValue, JsValue> {
        let this_env = self.get_this_environment(env);
        let e = this_env.borrow();
        match &e.kind {
            EnvKind::Function {
                this_value,
                this_status,
                ..
            } => match this_status {
                ThisBindingStatus::Uninitialized => {
                    let msg = "Must call super constructor before accessing 'this'";
                    drop(e);
                    Err(self.reference_error(msg))
                }
                _ => Ok(this_value.clone()),
            },
            EnvKind::Global { binding_object, .. } => Ok(JsValue::object(*binding_object)),
            EnvKind::Module => Ok(JsValue::Undefined),
            _ => unreachable!("environment without this binding"),
        }
    }

    /// CreateGlobalVarBinding: a deletable=false data property on the
    /// global object, remembered in varNames.
    pub fn create_global_var_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
    ) -> Result<(), JsValue> {
        let binding_object = match &env.borrow().kind {
            EnvKind::Global { binding_object, .. } => *binding_object,
            _ => panic!("global var binding outside global environment"),
        };
        let key = PropertyKey::from_str(name);
        let has = self.internal_get_own_property(binding_object, &key)?.is_some();
        let extensible = self.internal_is_extensible(binding_object)?;
        if !has && extensible {
            let desc = PropertyDescriptor::data(JsValue::Undefined, true, true, false);
            self.define_property_or_throw(binding_object, &key, desc)?;
        }
        if let EnvKind::Global { var_names, .. } = &mut env.borrow_mut().kind {
            if !var_names.iter().any(|n| n == name) {
                var_names.push(name.to_string());
            }
        }
        Ok(())
    }

    /// CreateGlobalFunctionBinding.
    pub fn create_global_function_binding(
        &mut self,
        env: &EnvRef,
        name: &str,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let binding_object = match &env.borrow().kind {
            EnvKind::Global { binding_object, .. } => *binding_object,
            _ => panic!("global function binding outside global environment"),
        };
        let key = PropertyKey::from_str(name);
        let existing = self.internal_get_own_property(binding_object, &key)?;
        let desc = match existing {
            None => PropertyDescriptor::data(value.clone(), true, true, false),
            Some(d) if d.configurable == Some(true) => {
                PropertyDescriptor::data(value.clone(), true, true, false)
            }
            Some(_) => PropertyDescriptor {
                value: Some(value.clone()),
                ..Default::default()
            },
        };
        self.define_property_or_throw(binding_object, &key, desc)?;
        let receiver = JsValue::object(binding_object);
        self.internal_set(binding_object, &key, value, &receiver)?;
        if let EnvKind::Global { var_names, .. } = &mut env.borrow_mut().kind {
            if !var_names.iter().any(|n| n == name) {
                var_names.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Whether a global lexical declaration would collide (§9.1.1.4.14–16).
    pub fn global_can_declare_lexical(&mut self, env: &EnvRef, name: &str) -> Result<bool, JsValue> {
        let (has_decl, has_var_name) = {
            let e = env.borrow();
            let var = match &e.kind {
                EnvKind::Global { var_names, .. } => var_names.iter().any(|n| n == name),
                _ => false,
            };
            (e.bindings.contains_key(name), var)
        };
        Ok(!has_decl && !has_var_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    fn agent_env() -> (Agent, EnvRef) {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let _realm = agent.create_realm(None);
        (agent, Environment::new_declarative(None))
    }

    #[test]
    fn tdz_read_throws() {
        let (mut agent, env) = agent_env();
        agent.env_create_mutable_binding(&env, "x", false).unwrap();
        assert!(agent.get_binding_value(&env, "x", true).is_err());
        agent
            .env_initialize_binding(&env, "x", JsValue::Number(1.0))
            .unwrap();
        assert!(matches!(
            agent.get_binding_value(&env, "x", true).unwrap(),
            JsValue::Number(n) if n == 1.0
        ));
    }

    #[test]
    fn immutable_binding_rejects_assignment() {
        let (mut agent, env) = agent_env();
        agent.env_create_immutable_binding(&env, "k");
        agent
            .env_initialize_binding(&env, "k", JsValue::Number(1.0))
            .unwrap();
        assert!(agent
            .env_set_mutable_binding(&env, "k", JsValue::Number(2.0), true)
            .is_err());
    }

    #[test]
    fn missing_binding_strict_vs_sloppy() {
        let (mut agent, env) = agent_env();
        assert!(agent
            .env_set_mutable_binding(&env, "ghost", JsValue::Number(1.0), true)
            .is_err());
        assert!(agent
            .env_set_mutable_binding(&env, "ghost", JsValue::Number(1.0), false)
            .is_ok());
        assert!(agent.env_has_binding(&env, "ghost").unwrap());
    }

    #[test]
    fn global_this_is_global_object() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        let env = agent.realm(realm).global_env.clone();
        let this = agent.resolve_this_binding(env).unwrap();
        assert_eq!(this.object_id(), Some(agent.realm(realm).global_object));
    }
}
