use crate::ast::{Expression, FunctionBody, FunctionKind, Pattern};
use crate::interpreter::agent::Agent;
use crate::interpreter::environment::EnvRef;
use crate::interpreter::property::{validate_and_apply, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsValue};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type ObjRef = Rc<RefCell<JsObjectData>>;

/// Which internal-method suite an object uses (§10). One algorithm table
/// per kind, selected at dispatch sites; exotic kinds replace individual
/// entries, they do not inherit from each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Ordinary,
    Array,
    StringExotic,
    Arguments,
    IntegerIndexed,
    Proxy,
    BoundFunction,
}

/// Heap object record: prototype slot, extensibility bit, the
/// insertion-ordered property store, and the kind payloads. Functions are
/// ordinary (or bound/proxy) objects with a `callable` slot.
pub struct JsObjectData {
    pub id: Option<u64>,
    pub kind: ObjectKind,
    pub class_name: &'static str,
    pub realm: usize,
    pub prototype: Option<ObjRef>,
    pub extensible: bool,
    pub properties: IndexMap<PropertyKey, PropertyDescriptor>,
    pub callable: Option<JsFunction>,
    /// Wrapper primitive ([[StringData]], [[NumberData]], ...).
    pub primitive: Option<JsValue>,
    pub parameter_map: Option<ParameterMap>,
    pub typed_array: Option<TypedArrayData>,
    pub proxy: Option<ProxyData>,
    pub bound: Option<BoundFunctionData>,
    pub iterator: Option<IteratorData>,
    pub promise: Option<PromiseData>,
}

impl JsObjectData {
    pub fn new(kind: ObjectKind, realm: usize) -> Self {
        Self {
            id: None,
            kind,
            class_name: "Object",
            realm,
            prototype: None,
            extensible: true,
            properties: IndexMap::new(),
            callable: None,
            primitive: None,
            parameter_map: None,
            typed_array: None,
            proxy: None,
            bound: None,
            iterator: None,
            promise: None,
        }
    }

    /// Direct descriptor install, bypassing [[DefineOwnProperty]]. Only
    /// for bootstrap and freshly created objects nothing else can see.
    pub fn define(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        self.properties.insert(key, desc);
    }

    pub fn own(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn is_callable(&self) -> bool {
        self.callable.is_some() || self.bound.is_some() || self.proxy_callable()
    }

    fn proxy_callable(&self) -> bool {
        self.proxy.as_ref().is_some_and(|p| p.callable)
    }

    pub fn value(&self) -> JsValue {
        JsValue::object(self.id.expect("object not yet allocated"))
    }
}

/// Callable payload. Native functions carry the host closure; user
/// functions carry parsed code plus the captured environment.
#[derive(Clone)]
pub enum JsFunction {
    User(Rc<UserFunction>),
    Native(NativeFunction),
}

pub type NativeFn = dyn Fn(&mut Agent, &JsValue, &[JsValue]) -> Result<JsValue, JsValue>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub length: u32,
    pub func: Rc<NativeFn>,
    pub constructor: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisMode {
    Lexical,
    Strict,
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructorKind {
    Base,
    Derived,
}

/// Class instance field: key evaluated at class-definition time, the
/// initializer run per construction.
#[derive(Clone)]
pub struct InstanceField {
    pub key: PropertyKey,
    pub init: Option<Expression>,
}

pub struct UserFunction {
    pub name: String,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    pub strict: bool,
    pub closure: EnvRef,
    pub this_mode: ThisMode,
    pub realm: usize,
    pub home_object: Cell<Option<u64>>,
    pub constructor_kind: ConstructorKind,
    /// Only populated on class constructors.
    pub fields: RefCell<Vec<InstanceField>>,
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::User(u) => write!(f, "JsFunction::User({:?})", u.name),
            JsFunction::Native(n) => write!(f, "JsFunction::Native({:?}/{})", n.name, n.length),
        }
    }
}

/// Mapped `arguments` aliasing: argument index to parameter binding in
/// the function environment.
pub struct ParameterMap {
    pub env: EnvRef,
    pub mapping: FxHashMap<u32, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 | ElementType::Uint8Clamped => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }
}

/// Integer-indexed exotic payload ([[ViewedArrayBuffer]] et al.).
pub struct TypedArrayData {
    pub element: ElementType,
    pub buffer: Rc<RefCell<Vec<u8>>>,
    pub byte_offset: usize,
    pub length: usize,
}

/// Proxy payload; revocation clears target and handler.
pub struct ProxyData {
    pub target: Option<u64>,
    pub handler: Option<u64>,
    pub callable: bool,
    pub constructor: bool,
}

pub struct BoundFunctionData {
    pub target: u64,
    pub bound_this: JsValue,
    pub bound_args: Vec<JsValue>,
}

pub enum IteratorData {
    Array {
        target: u64,
        index: u32,
        kind: ArrayIterationKind,
        done: bool,
    },
    String {
        string: JsString,
        position: usize,
    },
    Generator(GeneratorData),
    AsyncGenerator(AsyncGeneratorData),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrayIterationKind {
    Key,
    Value,
    KeyValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratorState {
    SuspendedStart,
    /// Paused at the suspension point with this dynamic index.
    SuspendedYield(usize),
    Executing,
    Completed,
}

/// Replayable generator body state; see `function.rs` for the driver.
pub struct GeneratorData {
    pub function: Rc<UserFunction>,
    pub function_object: u64,
    pub this_value: JsValue,
    pub args: Vec<JsValue>,
    pub state: GeneratorState,
    /// resume[k] is the value suspension point k produced when resumed.
    pub resume: Vec<JsValue>,
}

pub struct AsyncGeneratorData {
    pub gen: GeneratorData,
    pub queue: std::collections::VecDeque<AsyncGeneratorRequest>,
    pub draining: bool,
}

pub struct AsyncGeneratorRequest {
    pub completion: crate::interpreter::Completion,
    pub capability: PromiseCapability,
}

// ── promises ─────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum PromiseState {
    Pending,
    Fulfilled(JsValue),
    Rejected(JsValue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionKind {
    Fulfill,
    Reject,
}

#[derive(Clone, Debug)]
pub struct PromiseCapability {
    pub promise: JsValue,
    pub resolve: JsValue,
    pub reject: JsValue,
}

#[derive(Clone, Debug)]
pub struct PromiseReaction {
    pub capability: Option<PromiseCapability>,
    pub kind: ReactionKind,
    pub handler: Option<JsValue>,
}

#[derive(Clone, Debug)]
pub struct PromiseData {
    pub state: PromiseState,
    pub fulfill_reactions: Vec<PromiseReaction>,
    pub reject_reactions: Vec<PromiseReaction>,
    pub handled: bool,
}

impl PromiseData {
    pub fn new() -> Self {
        Self {
            state: PromiseState::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            handled: false,
        }
    }
}

// ── internal method dispatch ─────────────────────────────────────────

impl Agent {
    fn expect_object(&self, id: u64) -> ObjRef {
        self.get_object(id).expect("stale object handle")
    }

    /// [[GetPrototypeOf]]; returns the prototype as a language value.
    pub fn internal_get_prototype_of(&mut self, id: u64) -> Result<JsValue, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_get_prototype_of(id),
            _ => {
                let proto = obj.borrow().prototype.clone();
                Ok(match proto {
                    Some(p) => p.borrow().value(),
                    None => JsValue::Null,
                })
            }
        }
    }

    /// [[SetPrototypeOf]].
    pub fn internal_set_prototype_of(
        &mut self,
        id: u64,
        proto: &JsValue,
    ) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_set_prototype_of(id, proto),
            _ => Ok(self.ordinary_set_prototype_of(id, proto)),
        }
    }

    pub fn ordinary_set_prototype_of(&mut self, id: u64, proto: &JsValue) -> bool {
        let obj = self.expect_object(id);
        let new_proto = match proto {
            JsValue::Null => None,
            JsValue::Object(o) => self.get_object(o.id),
            _ => return false,
        };
        {
            let data = obj.borrow();
            let current_matches = match (&data.prototype, &new_proto) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            };
            if current_matches {
                return true;
            }
            if !data.extensible {
                return false;
            }
        }
        // Prototype chain cycle check (stops at proxies, whose
        // [[GetPrototypeOf]] is not the ordinary algorithm).
        let mut walker = new_proto.clone();
        while let Some(p) = walker {
            if Rc::ptr_eq(&p, &obj) {
                return false;
            }
            if p.borrow().kind == ObjectKind::Proxy {
                break;
            }
            walker = p.borrow().prototype.clone();
        }
        obj.borrow_mut().prototype = new_proto;
        true
    }

    /// [[IsExtensible]].
    pub fn internal_is_extensible(&mut self, id: u64) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_is_extensible(id),
            _ => Ok(obj.borrow().extensible),
        }
    }

    /// [[PreventExtensions]].
    pub fn internal_prevent_extensions(&mut self, id: u64) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_prevent_extensions(id),
            _ => {
                obj.borrow_mut().extensible = false;
                Ok(true)
            }
        }
    }

    /// [[GetOwnProperty]].
    pub fn internal_get_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_get_own_property(id, key),
            ObjectKind::StringExotic => Ok(self.string_get_own_property(id, key)),
            ObjectKind::Arguments => Ok(self.arguments_get_own_property(id, key)),
            ObjectKind::IntegerIndexed => Ok(self.integer_indexed_get_own_property(id, key)),
            _ => Ok(self.ordinary_get_own_property(id, key)),
        }
    }

    pub fn ordinary_get_own_property(
        &self,
        id: u64,
        key: &PropertyKey,
    ) -> Option<PropertyDescriptor> {
        let obj = self.expect_object(id);
        let desc = obj.borrow().properties.get(key).cloned();
        desc
    }

    /// [[DefineOwnProperty]].
    pub fn internal_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_define_own_property(id, key, desc),
            ObjectKind::Array => self.array_define_own_property(id, key, desc),
            ObjectKind::StringExotic => self.string_define_own_property(id, key, desc),
            ObjectKind::Arguments => self.arguments_define_own_property(id, key, desc),
            ObjectKind::IntegerIndexed => self.integer_indexed_define_own_property(id, key, desc),
            _ => Ok(self.ordinary_define_own_property(id, key, desc)),
        }
    }

    pub fn ordinary_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> bool {
        let obj = self.expect_object(id);
        let (current, extensible) = {
            let data = obj.borrow();
            (data.properties.get(key).cloned(), data.extensible)
        };
        match validate_and_apply(current.as_ref(), extensible, &desc) {
            Some(merged) => {
                obj.borrow_mut().properties.insert(key.clone(), merged);
                true
            }
            None => false,
        }
    }

    /// [[HasProperty]].
    pub fn internal_has_property(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_has_property(id, key),
            _ => self.ordinary_has_property(id, key),
        }
    }

    pub fn ordinary_has_property(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        if self.internal_get_own_property(id, key)?.is_some() {
            return Ok(true);
        }
        let proto = self.internal_get_prototype_of(id)?;
        match proto {
            JsValue::Object(p) => self.internal_has_property(p.id, key),
            _ => Ok(false),
        }
    }

    /// [[Get]]. The receiver travels unchanged down the prototype chain
    /// so accessors observe the original target.
    pub fn internal_get(
        &mut self,
        id: u64,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_get(id, key, receiver),
            ObjectKind::Arguments => self.arguments_get(id, key, receiver),
            ObjectKind::IntegerIndexed => self.integer_indexed_get(id, key, receiver),
            _ => self.ordinary_get(id, key, receiver),
        }
    }

    pub fn ordinary_get(
        &mut self,
        id: u64,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        let desc = self.internal_get_own_property(id, key)?;
        let Some(desc) = desc else {
            let proto = self.internal_get_prototype_of(id)?;
            return match proto {
                JsValue::Object(p) => self.internal_get(p.id, key, receiver),
                _ => Ok(JsValue::Undefined),
            };
        };
        if desc.is_data_descriptor() {
            return Ok(desc.value.unwrap_or(JsValue::Undefined));
        }
        match desc.get {
            Some(getter) if !getter.is_undefined() => self.call(&getter, receiver, &[]),
            _ => Ok(JsValue::Undefined),
        }
    }

    /// [[Set]].
    pub fn internal_set(
        &mut self,
        id: u64,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_set(id, key, value, receiver),
            ObjectKind::Arguments => self.arguments_set(id, key, value, receiver),
            ObjectKind::IntegerIndexed => self.integer_indexed_set(id, key, value, receiver),
            _ => self.ordinary_set(id, key, value, receiver),
        }
    }

    /// OrdinarySetWithOwnDescriptor (§10.1.9.2).
    pub fn ordinary_set(
        &mut self,
        id: u64,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsValue> {
        let own = self.internal_get_own_property(id, key)?;
        let own = match own {
            Some(d) => d,
            None => {
                let proto = self.internal_get_prototype_of(id)?;
                if let JsValue::Object(p) = proto {
                    return self.internal_set(p.id, key, value, receiver);
                }
                PropertyDescriptor::data_default(JsValue::Undefined)
            }
        };

        if own.is_data_descriptor() {
            if own.writable == Some(false) {
                return Ok(false);
            }
            let Some(receiver_id) = receiver.object_id() else {
                return Ok(false);
            };
            let existing = self.internal_get_own_property(receiver_id, key)?;
            return match existing {
                Some(existing) => {
                    if existing.is_accessor_descriptor() {
                        return Ok(false);
                    }
                    if existing.writable == Some(false) {
                        return Ok(false);
                    }
                    let update = PropertyDescriptor {
                        value: Some(value),
                        ..Default::default()
                    };
                    self.internal_define_own_property(receiver_id, key, update)
                }
                None => self.internal_define_own_property(
                    receiver_id,
                    key,
                    PropertyDescriptor::data_default(value),
                ),
            };
        }

        match own.set {
            Some(setter) if !setter.is_undefined() => {
                self.call(&setter, receiver, &[value])?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// [[Delete]].
    pub fn internal_delete(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_delete(id, key),
            ObjectKind::Arguments => self.arguments_delete(id, key),
            _ => Ok(self.ordinary_delete(id, key)),
        }
    }

    pub fn ordinary_delete(&mut self, id: u64, key: &PropertyKey) -> bool {
        let obj = self.expect_object(id);
        let mut data = obj.borrow_mut();
        match data.properties.get(key) {
            None => true,
            Some(desc) if desc.configurable == Some(true) => {
                data.properties.shift_remove(key);
                true
            }
            Some(_) => false,
        }
    }

    /// [[OwnPropertyKeys]]: integer indices ascending, then strings in
    /// insertion order, then symbols in insertion order.
    pub fn internal_own_property_keys(&mut self, id: u64) -> Result<Vec<PropertyKey>, JsValue> {
        let obj = self.expect_object(id);
        let kind = obj.borrow().kind;
        match kind {
            ObjectKind::Proxy => self.proxy_own_property_keys(id),
            ObjectKind::StringExotic => Ok(self.string_own_property_keys(id)),
            ObjectKind::IntegerIndexed => Ok(self.integer_indexed_own_property_keys(id)),
            _ => Ok(self.ordinary_own_property_keys(id)),
        }
    }

    pub fn ordinary_own_property_keys(&self, id: u64) -> Vec<PropertyKey> {
        let obj = self.expect_object(id);
        let data = obj.borrow();
        let mut indices: Vec<u32> = Vec::new();
        let mut strings: Vec<PropertyKey> = Vec::new();
        let mut symbols: Vec<PropertyKey> = Vec::new();
        for key in data.properties.keys() {
            match key {
                PropertyKey::Index(i) => indices.push(*i),
                PropertyKey::String(_) => strings.push(key.clone()),
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
            }
        }
        indices.sort_unstable();
        let mut out: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Index).collect();
        out.extend(strings);
        out.extend(symbols);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    fn agent_and_object() -> (Agent, u64) {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        let id = agent.create_ordinary_object(realm);
        (agent, id)
    }

    #[test]
    fn own_keys_ordering() {
        let (mut agent, id) = agent_and_object();
        let obj = agent.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.define(
                PropertyKey::from_str("b"),
                PropertyDescriptor::data_default(JsValue::Number(1.0)),
            );
            data.define(
                PropertyKey::Index(2),
                PropertyDescriptor::data_default(JsValue::Number(2.0)),
            );
            data.define(
                PropertyKey::from_str("a"),
                PropertyDescriptor::data_default(JsValue::Number(3.0)),
            );
            data.define(
                PropertyKey::Index(0),
                PropertyDescriptor::data_default(JsValue::Number(4.0)),
            );
        }
        let keys = agent.internal_own_property_keys(id).unwrap();
        let shown: Vec<String> = keys.iter().map(|k| k.to_display_string()).collect();
        assert_eq!(shown, vec!["0", "2", "b", "a"]);
    }

    #[test]
    fn get_walks_prototype_chain() {
        let (mut agent, id) = agent_and_object();
        let realm = agent.current_realm();
        let proto_id = agent.create_ordinary_object(realm);
        let proto = agent.get_object(proto_id).unwrap();
        proto.borrow_mut().define(
            PropertyKey::from_str("x"),
            PropertyDescriptor::data_default(JsValue::Number(5.0)),
        );
        agent
            .internal_set_prototype_of(id, &JsValue::object(proto_id))
            .unwrap();
        let receiver = JsValue::object(id);
        let got = agent
            .internal_get(id, &PropertyKey::from_str("x"), &receiver)
            .unwrap();
        assert!(matches!(got, JsValue::Number(n) if n == 5.0));
    }

    #[test]
    fn set_creates_own_property_at_receiver() {
        let (mut agent, id) = agent_and_object();
        let realm = agent.current_realm();
        let proto_id = agent.create_ordinary_object(realm);
        let proto = agent.get_object(proto_id).unwrap();
        proto.borrow_mut().define(
            PropertyKey::from_str("x"),
            PropertyDescriptor::data_default(JsValue::Number(5.0)),
        );
        agent
            .internal_set_prototype_of(id, &JsValue::object(proto_id))
            .unwrap();
        let receiver = JsValue::object(id);
        assert!(agent
            .internal_set(id, &PropertyKey::from_str("x"), JsValue::Number(9.0), &receiver)
            .unwrap());
        // Own property created at the receiver; the prototype's is intact.
        let own = agent
            .ordinary_get_own_property(id, &PropertyKey::from_str("x"))
            .unwrap();
        assert!(matches!(own.value, Some(JsValue::Number(n)) if n == 9.0));
        let proto_own = agent
            .ordinary_get_own_property(proto_id, &PropertyKey::from_str("x"))
            .unwrap();
        assert!(matches!(proto_own.value, Some(JsValue::Number(n)) if n == 5.0));
    }

    #[test]
    fn non_writable_rejects_set() {
        let (mut agent, id) = agent_and_object();
        let obj = agent.get_object(id).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("k"),
            PropertyDescriptor::data(JsValue::Number(1.0), false, true, true),
        );
        let receiver = JsValue::object(id);
        assert!(!agent
            .internal_set(id, &PropertyKey::from_str("k"), JsValue::Number(2.0), &receiver)
            .unwrap());
    }

    #[test]
    fn delete_honours_configurability() {
        let (mut agent, id) = agent_and_object();
        let obj = agent.get_object(id).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("gone"),
            PropertyDescriptor::data(JsValue::Number(1.0), true, true, true),
        );
        obj.borrow_mut().define(
            PropertyKey::from_str("stays"),
            PropertyDescriptor::data(JsValue::Number(2.0), true, true, false),
        );
        assert!(agent.internal_delete(id, &PropertyKey::from_str("gone")).unwrap());
        assert!(!agent.internal_delete(id, &PropertyKey::from_str("stays")).unwrap());
        assert!(agent.internal_delete(id, &PropertyKey::from_str("missing")).unwrap());
    }

    #[test]
    fn prototype_cycles_rejected() {
        let (mut agent, a) = agent_and_object();
        let realm = agent.current_realm();
        let b = agent.create_ordinary_object(realm);
        assert!(agent.internal_set_prototype_of(b, &JsValue::object(a)).unwrap());
        assert!(!agent.internal_set_prototype_of(a, &JsValue::object(b)).unwrap());
    }

    #[test]
    fn prevent_extensions_blocks_new_properties() {
        let (mut agent, id) = agent_and_object();
        assert!(agent.internal_prevent_extensions(id).unwrap());
        let ok = agent
            .internal_define_own_property(
                id,
                &PropertyKey::from_str("x"),
                PropertyDescriptor::data_default(JsValue::Number(1.0)),
            )
            .unwrap();
        assert!(!ok);
    }
}
