use crate::interpreter::agent::{Agent, ModuleResolver};
use crate::interpreter::environment::EnvRef;
use crate::types::JsValue;
use rustc_hash::FxHashMap;

/// Well-known intrinsics, indexed by position in the realm's fixed
/// table. The enum keeps bootstrap wiring cheap; `name()` provides the
/// diagnostic view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Intrinsic {
    ObjectPrototype,
    ObjectConstructor,
    FunctionPrototype,
    FunctionConstructor,
    ArrayPrototype,
    ArrayConstructor,
    StringPrototype,
    StringConstructor,
    NumberPrototype,
    NumberConstructor,
    BooleanPrototype,
    BooleanConstructor,
    SymbolPrototype,
    SymbolConstructor,
    BigIntPrototype,
    BigIntConstructor,
    ErrorPrototype,
    ErrorConstructor,
    TypeErrorPrototype,
    TypeErrorConstructor,
    RangeErrorPrototype,
    RangeErrorConstructor,
    ReferenceErrorPrototype,
    ReferenceErrorConstructor,
    SyntaxErrorPrototype,
    SyntaxErrorConstructor,
    UriErrorPrototype,
    UriErrorConstructor,
    EvalErrorPrototype,
    EvalErrorConstructor,
    Math,
    Json,
    Reflect,
    PromisePrototype,
    PromiseConstructor,
    ProxyConstructor,
    RegExpPrototype,
    IteratorPrototype,
    ArrayIteratorPrototype,
    StringIteratorPrototype,
    GeneratorPrototype,
    AsyncGeneratorPrototype,
    ThrowTypeError,
}

impl Intrinsic {
    pub const COUNT: usize = Intrinsic::ThrowTypeError as usize + 1;

    pub const ALL: [Intrinsic; Intrinsic::COUNT] = [
        Intrinsic::ObjectPrototype,
        Intrinsic::ObjectConstructor,
        Intrinsic::FunctionPrototype,
        Intrinsic::FunctionConstructor,
        Intrinsic::ArrayPrototype,
        Intrinsic::ArrayConstructor,
        Intrinsic::StringPrototype,
        Intrinsic::StringConstructor,
        Intrinsic::NumberPrototype,
        Intrinsic::NumberConstructor,
        Intrinsic::BooleanPrototype,
        Intrinsic::BooleanConstructor,
        Intrinsic::SymbolPrototype,
        Intrinsic::SymbolConstructor,
        Intrinsic::BigIntPrototype,
        Intrinsic::BigIntConstructor,
        Intrinsic::ErrorPrototype,
        Intrinsic::ErrorConstructor,
        Intrinsic::TypeErrorPrototype,
        Intrinsic::TypeErrorConstructor,
        Intrinsic::RangeErrorPrototype,
        Intrinsic::RangeErrorConstructor,
        Intrinsic::ReferenceErrorPrototype,
        Intrinsic::ReferenceErrorConstructor,
        Intrinsic::SyntaxErrorPrototype,
        Intrinsic::SyntaxErrorConstructor,
        Intrinsic::UriErrorPrototype,
        Intrinsic::UriErrorConstructor,
        Intrinsic::EvalErrorPrototype,
        Intrinsic::EvalErrorConstructor,
        Intrinsic::Math,
        Intrinsic::Json,
        Intrinsic::Reflect,
        Intrinsic::PromisePrototype,
        Intrinsic::PromiseConstructor,
        Intrinsic::ProxyConstructor,
        Intrinsic::RegExpPrototype,
        Intrinsic::IteratorPrototype,
        Intrinsic::ArrayIteratorPrototype,
        Intrinsic::StringIteratorPrototype,
        Intrinsic::GeneratorPrototype,
        Intrinsic::AsyncGeneratorPrototype,
        Intrinsic::ThrowTypeError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::ObjectPrototype => "%Object.prototype%",
            Intrinsic::ObjectConstructor => "%Object%",
            Intrinsic::FunctionPrototype => "%Function.prototype%",
            Intrinsic::FunctionConstructor => "%Function%",
            Intrinsic::ArrayPrototype => "%Array.prototype%",
            Intrinsic::ArrayConstructor => "%Array%",
            Intrinsic::StringPrototype => "%String.prototype%",
            Intrinsic::StringConstructor => "%String%",
            Intrinsic::NumberPrototype => "%Number.prototype%",
            Intrinsic::NumberConstructor => "%Number%",
            Intrinsic::BooleanPrototype => "%Boolean.prototype%",
            Intrinsic::BooleanConstructor => "%Boolean%",
            Intrinsic::SymbolPrototype => "%Symbol.prototype%",
            Intrinsic::SymbolConstructor => "%Symbol%",
            Intrinsic::BigIntPrototype => "%BigInt.prototype%",
            Intrinsic::BigIntConstructor => "%BigInt%",
            Intrinsic::ErrorPrototype => "%Error.prototype%",
            Intrinsic::ErrorConstructor => "%Error%",
            Intrinsic::TypeErrorPrototype => "%TypeError.prototype%",
            Intrinsic::TypeErrorConstructor => "%TypeError%",
            Intrinsic::RangeErrorPrototype => "%RangeError.prototype%",
            Intrinsic::RangeErrorConstructor => "%RangeError%",
            Intrinsic::ReferenceErrorPrototype => "%ReferenceError.prototype%",
            Intrinsic::ReferenceErrorConstructor => "%ReferenceError%",
            Intrinsic::SyntaxErrorPrototype => "%SyntaxError.prototype%",
            Intrinsic::SyntaxErrorConstructor => "%SyntaxError%",
            Intrinsic::UriErrorPrototype => "%URIError.prototype%",
            Intrinsic::UriErrorConstructor => "%URIError%",
            Intrinsic::EvalErrorPrototype => "%EvalError.prototype%",
            Intrinsic::EvalErrorConstructor => "%EvalError%",
            Intrinsic::Math => "%Math%",
            Intrinsic::Json => "%JSON%",
            Intrinsic::Reflect => "%Reflect%",
            Intrinsic::PromisePrototype => "%Promise.prototype%",
            Intrinsic::PromiseConstructor => "%Promise%",
            Intrinsic::ProxyConstructor => "%Proxy%",
            Intrinsic::RegExpPrototype => "%RegExp.prototype%",
            Intrinsic::IteratorPrototype => "%IteratorPrototype%",
            Intrinsic::ArrayIteratorPrototype => "%ArrayIteratorPrototype%",
            Intrinsic::StringIteratorPrototype => "%StringIteratorPrototype%",
            Intrinsic::GeneratorPrototype => "%GeneratorPrototype%",
            Intrinsic::AsyncGeneratorPrototype => "%AsyncGeneratorPrototype%",
            Intrinsic::ThrowTypeError => "%ThrowTypeError%",
        }
    }
}

/// A realm: one self-contained universe of intrinsics, a global object,
/// the global environment, and the template-object cache.
pub struct Realm {
    pub id: usize,
    pub intrinsics: Vec<JsValue>,
    pub global_object: u64,
    pub global_env: EnvRef,
    pub template_cache: FxHashMap<usize, u64>,
    pub resolver: Option<ModuleResolver>,
}

impl Realm {
    pub fn intrinsic(&self, which: Intrinsic) -> JsValue {
        self.intrinsics[which as usize].clone()
    }

    pub fn set_intrinsic(&mut self, which: Intrinsic, value: JsValue) {
        self.intrinsics[which as usize] = value;
    }

    /// Name-indexed view of the intrinsics table for diagnostics.
    pub fn intrinsics_by_name(&self) -> Vec<(&'static str, JsValue)> {
        Intrinsic::ALL
            .iter()
            .map(|which| (which.name(), self.intrinsics[*which as usize].clone()))
            .collect()
    }
}

impl Agent {
    pub fn realm(&self, id: usize) -> &Realm {
        &self.realms[id]
    }

    pub fn realm_mut(&mut self, id: usize) -> &mut Realm {
        &mut self.realms[id]
    }

    pub fn intrinsic(&self, realm: usize, which: Intrinsic) -> JsValue {
        self.realms[realm].intrinsic(which)
    }

    pub fn current_intrinsic(&self, which: Intrinsic) -> JsValue {
        self.intrinsic(self.current_realm(), which)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    #[test]
    fn intrinsics_installed_in_new_realm() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        for (name, value) in agent.realm(realm).intrinsics_by_name() {
            assert!(value.is_object(), "intrinsic {name} missing");
        }
    }

    #[test]
    fn realms_are_independent() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let a = agent.create_realm(None);
        let b = agent.create_realm(None);
        let pa = agent.intrinsic(a, Intrinsic::ObjectPrototype);
        let pb = agent.intrinsic(b, Intrinsic::ObjectPrototype);
        assert_ne!(pa.object_id(), pb.object_id());
    }

    #[test]
    fn constructor_prototype_cross_links() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        let array_ctor = agent.intrinsic(realm, Intrinsic::ArrayConstructor);
        let array_proto = agent.intrinsic(realm, Intrinsic::ArrayPrototype);
        let proto_prop = agent
            .get_value_of(&array_ctor, "prototype")
            .expect("Array.prototype");
        assert_eq!(proto_prop.object_id(), array_proto.object_id());
        let ctor_prop = agent
            .get_value_of(&array_proto, "constructor")
            .expect("Array.prototype.constructor");
        assert_eq!(ctor_prop.object_id(), array_ctor.object_id());
    }
}
