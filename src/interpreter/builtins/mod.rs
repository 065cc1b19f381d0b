use crate::interpreter::agent::Agent;
use crate::interpreter::object::ObjectKind;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

mod array;
mod bigint;
mod boolean;
mod error;
mod function;
mod global;
mod iterator;
mod json;
mod math;
mod number;
mod object;
mod promise;
mod proxy;
mod reflect;
mod string;
mod symbol;

/// Realm bootstrap (§9.3.2 CreateIntrinsics): build the intrinsics in
/// dependency order (object prototype at the root, function prototype
/// before anything callable), then wire the constructor/prototype
/// cross-links per builtin module.
pub fn create_intrinsics(agent: &mut Agent, realm: usize) {
    // %Object.prototype% has a null prototype.
    let object_prototype = agent.allocate_object(ObjectKind::Ordinary, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::ObjectPrototype, JsValue::object(object_prototype));

    // %Function.prototype% is callable and returns undefined.
    let function_prototype = agent.allocate_object(ObjectKind::Ordinary, realm);
    {
        let obj = agent.get_object(function_prototype).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Function";
        data.prototype = agent.get_object(object_prototype);
        data.callable = Some(crate::interpreter::object::JsFunction::Native(
            crate::interpreter::object::NativeFunction {
                name: "",
                length: 0,
                func: std::rc::Rc::new(|_agent, _this, _args| Ok(JsValue::Undefined)),
                constructor: false,
            },
        ));
    }
    agent.realms[realm].set_intrinsic(
        Intrinsic::FunctionPrototype,
        JsValue::object(function_prototype),
    );

    // The global object was allocated before the intrinsics existed.
    let global = agent.realms[realm].global_object;
    agent.get_object(global).unwrap().borrow_mut().prototype = agent.get_object(object_prototype);

    // A context so that create_native_function and friends see `realm`
    // as current during the bootstrap.
    let env = agent.realms[realm].global_env.clone();
    agent.push_context(crate::interpreter::agent::ExecutionContext {
        function: None,
        realm,
        lexical_env: env.clone(),
        variable_env: env,
        script_or_module: None,
        strict: false,
    });

    global::create_throw_type_error(agent, realm);
    error::setup(agent, realm);
    object::setup(agent, realm);
    function::setup(agent, realm);
    symbol::setup(agent, realm);
    iterator::setup(agent, realm);
    array::setup(agent, realm);
    string::setup(agent, realm);
    number::setup(agent, realm);
    boolean::setup(agent, realm);
    bigint::setup(agent, realm);
    math::setup(agent, realm);
    json::setup(agent, realm);
    reflect::setup(agent, realm);
    proxy::setup(agent, realm);
    promise::setup(agent, realm);
    global::setup_regexp_prototype(agent, realm);

    agent.pop_context();
}

/// SetDefaultGlobalBindings (§9.3.4): expose the intrinsic surface on
/// the global object.
pub fn install_global_bindings(agent: &mut Agent, realm: usize) {
    let env = agent.realms[realm].global_env.clone();
    agent.push_context(crate::interpreter::agent::ExecutionContext {
        function: None,
        realm,
        lexical_env: env.clone(),
        variable_env: env,
        script_or_module: None,
        strict: false,
    });
    global::setup(agent, realm);
    agent.pop_context();
}

// ── install helpers shared by the builtin modules ────────────────────

/// A writable, non-enumerable, configurable method property.
pub(crate) fn define_method(
    agent: &mut Agent,
    target: u64,
    name: &'static str,
    length: u32,
    f: impl Fn(&mut Agent, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
) {
    let func = agent.create_native_function(name, length, false, f);
    let obj = agent.get_object(target).expect("install target");
    obj.borrow_mut()
        .define(PropertyKey::from_str(name), PropertyDescriptor::builtin(func));
}

/// A method keyed by a well-known symbol.
pub(crate) fn define_symbol_method(
    agent: &mut Agent,
    target: u64,
    key: crate::types::JsSymbol,
    name: &'static str,
    length: u32,
    f: impl Fn(&mut Agent, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
) {
    let func = agent.create_native_function(name, length, false, f);
    let obj = agent.get_object(target).expect("install target");
    obj.borrow_mut()
        .define(PropertyKey::Symbol(key), PropertyDescriptor::builtin(func));
}

pub(crate) fn define_value(
    agent: &mut Agent,
    target: u64,
    name: &str,
    value: JsValue,
    writable: bool,
    enumerable: bool,
    configurable: bool,
) {
    let obj = agent.get_object(target).expect("install target");
    obj.borrow_mut().define(
        PropertyKey::from_str(name),
        PropertyDescriptor::data(value, writable, enumerable, configurable),
    );
}

/// Create a constructor function object, link `ctor.prototype` and
/// `proto.constructor`, and return the constructor id.
pub(crate) fn create_constructor(
    agent: &mut Agent,
    name: &'static str,
    length: u32,
    prototype: u64,
    f: impl Fn(&mut Agent, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
) -> u64 {
    let ctor = agent.create_native_function(name, length, true, f);
    let ctor_id = ctor.object_id().unwrap();
    {
        let obj = agent.get_object(ctor_id).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("prototype"),
            PropertyDescriptor::data(JsValue::object(prototype), false, false, false),
        );
    }
    {
        let obj = agent.get_object(prototype).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("constructor"),
            PropertyDescriptor::data(JsValue::object(ctor_id), true, false, true),
        );
    }
    ctor_id
}

/// `@@toStringTag` metadata used by Math, JSON, Reflect, and friends.
pub(crate) fn define_to_string_tag(agent: &mut Agent, target: u64, tag: &str) {
    let key = PropertyKey::Symbol(agent.well_known.to_string_tag.clone());
    let obj = agent.get_object(target).expect("install target");
    obj.borrow_mut().define(
        key,
        PropertyDescriptor::data(
            JsValue::String(JsString::from_str(tag)),
            false,
            false,
            true,
        ),
    );
}

/// A prototype object chained to %Object.prototype%.
pub(crate) fn new_prototype_object(agent: &mut Agent, realm: usize) -> u64 {
    let object_prototype = agent.intrinsic(realm, Intrinsic::ObjectPrototype);
    agent.object_create(object_prototype.object_id(), realm)
}
