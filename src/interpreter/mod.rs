//! The runtime semantics engine: completion protocol, property model,
//! object kinds, environments, realms, the agent, abstract operations,
//! the tree-walking evaluator, and the module loader. `builtins` holds
//! the intrinsic surface installed at realm creation.

pub mod agent;
mod builtins;
mod completion;
mod environment;
mod eval;
mod exec;
mod exotic;
mod features;
mod function;
mod gc;
mod helpers;
mod inspect;
mod module;
mod object;
mod property;
mod proxy;
mod realm;

pub use agent::{Agent, AgentOptions, ExecutionContext, Job, JobKind, ModuleResolver};
pub use completion::{Completion, SuspendKind};
pub use environment::{Environment, EnvRef};
pub use eval::{Reference, ReferenceBase};
pub use features::{Feature, FeatureInfo, FeatureSet, UnknownFeature, FEATURES};
pub use helpers::{same_value, same_value_zero, strict_equals, IteratorRecord};
pub use module::{ExportResolution, ModuleRecord, ModuleStatus};
pub use object::{JsFunction, JsObjectData, ObjRef, ObjectKind, PromiseCapability};
pub use property::{PropertyDescriptor, PropertyKey};
pub use realm::{Intrinsic, Realm};

#[cfg(test)]
mod scenario_tests {
    //! End-to-end scenarios run through the full engine: source text in,
    //! observable behaviour out.

    use super::agent::{Agent, AgentOptions};
    use super::Completion;
    use crate::types::JsValue;
    use std::rc::Rc;

    fn engine() -> (Agent, usize) {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        (agent, realm)
    }

    fn eval(agent: &mut Agent, realm: usize, src: &str) -> Completion {
        agent.evaluate_script(realm, src, "scenario.js")
    }

    fn eval_fresh(src: &str) -> Completion {
        let (mut agent, realm) = engine();
        eval(&mut agent, realm, src)
    }

    fn as_number(c: Completion) -> f64 {
        match c {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    fn as_string(c: Completion) -> String {
        match c {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn as_bool(c: Completion) -> bool {
        match c {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn scenario_array_push_pop_length() {
        let (mut agent, realm) = engine();
        assert_eq!(
            as_number(eval(&mut agent, realm, "let a = [1,2,3]; a.push(4); a.length")),
            4.0
        );
        assert_eq!(as_number(eval(&mut agent, realm, "a.pop()")), 4.0);
        assert_eq!(as_number(eval(&mut agent, realm, "a.length")), 3.0);
    }

    #[test]
    fn scenario_flat_and_flat_infinity() {
        assert_eq!(
            as_string(eval_fresh("JSON.stringify([[1,2],[3,[4]]].flat())")),
            "[1,2,3,[4]]"
        );
        assert_eq!(
            as_string(eval_fresh("JSON.stringify([[1,2],[3,[4]]].flat(Infinity))")),
            "[1,2,3,4]"
        );
    }

    #[test]
    fn scenario_null_member_access_is_type_error() {
        assert!(as_bool(eval_fresh(
            "var r; try { null.x } catch (e) { r = e instanceof TypeError } r"
        )));
    }

    #[test]
    fn scenario_module_cycle_links_and_observes_tdz() {
        // a.js and b.js import each other. Evaluating a evaluates b
        // first; b sees a's hoisted function but a TDZ let binding.
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        // The host resolver keys records by specifier so the cycle sees
        // one identity per file.
        let registry: Rc<std::cell::RefCell<std::collections::HashMap<String, usize>>> =
            Rc::new(std::cell::RefCell::new(std::collections::HashMap::new()));
        let resolver: super::ModuleResolver = Rc::new(move |agent, _referrer, specifier| {
            if let Some(found) = registry.borrow().get(specifier) {
                return Ok(*found);
            }
            let realm = agent.current_realm();
            let source = match specifier {
                "a.js" => {
                    "import { observed } from 'b.js';\n\
                     export function hoisted() { return 'from-a'; }\n\
                     export let later = 'initialized';\n\
                     export { observed as reexported };"
                }
                "b.js" => {
                    "import { hoisted, later } from 'a.js';\n\
                     var seen;\n\
                     try { later; seen = 'no-tdz'; } catch (e) {\n\
                       seen = e instanceof ReferenceError ? 'tdz' : 'other';\n\
                     }\n\
                     export var observed = hoisted() + ':' + seen;"
                }
                other => {
                    let error =
                        agent.throw_error(realm, "TypeError", &format!("unknown module {other}"));
                    return Err(error);
                }
            };
            let id = agent.create_source_text_module(realm, specifier, source)?;
            registry.borrow_mut().insert(specifier.to_string(), id);
            Ok(id)
        });
        let realm = agent.create_realm(Some(resolver.clone()));
        let a = resolver(&mut agent, None, "a.js").expect("parse a.js");
        agent.link_module(a).expect("link");
        let promise = agent.evaluate_module(a);
        // Evaluation succeeded: the promise is fulfilled.
        let state = agent
            .get_object(promise.object_id().unwrap())
            .unwrap()
            .borrow()
            .promise
            .clone()
            .unwrap();
        assert!(matches!(
            state.state,
            super::object::PromiseState::Fulfilled(_)
        ));
        // b ran before a's let initialisation: hoisted function visible,
        // let binding in its temporal dead zone.
        let ns = agent.get_module_namespace(a).unwrap();
        let observed = agent
            .get_value_of(&JsValue::object(ns), "reexported")
            .unwrap();
        match observed {
            JsValue::String(s) => assert_eq!(s.to_rust_string(), "from-a:tdz"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scenario_promise_chain_and_job_ordering() {
        let (mut agent, realm) = engine();
        eval(
            &mut agent,
            realm,
            "var log = [];\n\
             var settled;\n\
             Promise.resolve(1).then(x => x + 1).then(x => { settled = x * 2; });\n\
             log.push('sync');",
        );
        assert_eq!(as_number(eval(&mut agent, realm, "settled")), 4.0);
        assert_eq!(
            as_string(eval(&mut agent, realm, "log.join(',')")),
            "sync"
        );
    }

    #[test]
    fn scenario_non_configurable_index_blocks_length_zero() {
        let (mut agent, realm) = engine();
        let result = eval(
            &mut agent,
            realm,
            "'use strict';\n\
             const a = [];\n\
             Object.defineProperty(a, '0', { value: 1, configurable: false });\n\
             a.length = 0;",
        );
        assert!(matches!(result, Completion::Throw(_)));
        assert_eq!(as_number(eval(&mut agent, realm, "a.length")), 1.0);
        assert_eq!(as_number(eval(&mut agent, realm, "a[0]")), 1.0);
    }

    #[test]
    fn context_stack_balances_across_abrupt_exits() {
        let (mut agent, realm) = engine();
        assert_eq!(agent.context_depth(), 0);
        let _ = eval(
            &mut agent,
            realm,
            "function f() { throw new Error('x'); }\n\
             try { f(); } catch (e) {}\n\
             f();",
        );
        assert_eq!(agent.context_depth(), 0);
    }

    #[test]
    fn classes_with_inheritance_and_super() {
        assert_eq!(
            as_string(eval_fresh(
                "class Animal {\n\
                   constructor(name) { this.name = name; }\n\
                   speak() { return this.name + ' makes a sound'; }\n\
                 }\n\
                 class Dog extends Animal {\n\
                   constructor(name) { super(name); }\n\
                   speak() { return super.speak() + ': woof'; }\n\
                 }\n\
                 new Dog('Rex').speak()"
            )),
            "Rex makes a sound: woof"
        );
        assert!(as_bool(eval_fresh(
            "class A {}\n\
             class B extends A {}\n\
             var b = new B();\n\
             b instanceof B && b instanceof A"
        )));
    }

    #[test]
    fn derived_constructor_requires_super_before_this() {
        assert!(as_bool(eval_fresh(
            "class A {}\n\
             class B extends A { constructor() { this.x = 1; super(); } }\n\
             try { new B(); false } catch (e) { e instanceof ReferenceError }"
        )));
    }

    #[test]
    fn getters_setters_receiver_flows() {
        assert_eq!(
            as_number(eval_fresh(
                "var base = { get v() { return this.n * 2; } };\n\
                 var child = Object.create(base);\n\
                 child.n = 21;\n\
                 child.v"
            )),
            42.0
        );
    }

    #[test]
    fn dynamic_import_resolves_namespace() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let resolver: super::ModuleResolver = Rc::new(|agent, _referrer, specifier| {
            let realm = agent.current_realm();
            match specifier {
                "answer.js" => {
                    agent.create_source_text_module(realm, "answer.js", "export const n = 42;")
                }
                other => {
                    let error =
                        agent.throw_error(realm, "TypeError", &format!("unknown module {other}"));
                    Err(error)
                }
            }
        });
        let realm = agent.create_realm(Some(resolver));
        let completion = agent.evaluate_script(
            realm,
            "var got;\n\
             import('answer.js').then(function (ns) { got = ns.n; });",
            "dynamic.js",
        );
        assert!(!matches!(completion, Completion::Throw(_)));
        let check = agent.evaluate_script(realm, "got", "check.js");
        assert!(matches!(check, Completion::Normal(JsValue::Number(n)) if n == 42.0));
    }

    #[test]
    fn uncaught_script_throw_is_the_completion() {
        let (mut agent, realm) = engine();
        let completion = eval(&mut agent, realm, "throw new RangeError('out of range');");
        match completion {
            Completion::Throw(error) => {
                assert_eq!(agent.inspect(&error), "RangeError: out of range");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cross_realm_objects_keep_their_intrinsics() {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm_a = agent.create_realm(None);
        let realm_b = agent.create_realm(None);
        let array_from_a = match agent.evaluate_script(realm_a, "[1, 2]", "a.js") {
            Completion::Normal(v) => v,
            other => panic!("unexpected {other:?}"),
        };
        // Array instanceof across realms is false: different intrinsics.
        let global_b = agent.global(realm_b).object_id().unwrap();
        agent
            .create_data_property(
                global_b,
                &super::PropertyKey::from_str("foreign"),
                array_from_a,
            )
            .unwrap();
        let check = agent.evaluate_script(realm_b, "foreign instanceof Array", "b.js");
        assert!(matches!(check, Completion::Normal(JsValue::Boolean(false))));
        // But Array.isArray is branding-based and still true.
        let check = agent.evaluate_script(realm_b, "Array.isArray(foreign)", "b2.js");
        assert!(matches!(check, Completion::Normal(JsValue::Boolean(true))));
    }

    #[test]
    fn feature_flags_gate_syntax() {
        let (mut agent, realm) = engine();
        assert!(matches!(
            eval(&mut agent, realm, "a?.b"),
            Completion::Throw(_)
        ));
        let mut flagged = Agent::new(AgentOptions {
            features: vec!["optional-chaining".into(), "nullish-coalescing".into()],
        })
        .unwrap();
        let realm = flagged.create_realm(None);
        let result = flagged.evaluate_script(realm, "var o = null; o?.missing ?? 'fallback'", "f.js");
        assert_eq!(as_string(result), "fallback");
    }
}

#[cfg(test)]
mod law_tests {
    //! The §8 laws, property-tested over generated inputs.

    use super::agent::{Agent, AgentOptions};
    use super::Completion;
    use crate::types::{number_ops, JsValue};
    use proptest::prelude::*;

    fn eval_fresh(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "law.js")
    }

    proptest! {
        #[test]
        fn to_string_is_idempotent_for_numbers(n in proptest::num::f64::ANY) {
            let mut agent = Agent::new(AgentOptions::default()).unwrap();
            agent.create_realm(None);
            let once = agent.to_string_value(&JsValue::Number(n)).unwrap();
            let twice = agent
                .to_string_value(&JsValue::String(once.clone()))
                .unwrap();
            prop_assert_eq!(once.to_rust_string(), twice.to_rust_string());
        }

        #[test]
        fn number_to_string_round_trips(n in proptest::num::f64::NORMAL) {
            // ToNumber(ToString(n)) recovers n exactly for finite values.
            let text = number_ops::to_string(n);
            let back: f64 = text.parse().unwrap();
            prop_assert_eq!(n, back);
        }

        #[test]
        fn json_round_trip_structural(n in -1000i32..1000, s in "[a-z]{0,8}") {
            let src = format!(
                "var v = {{ n: {n}, s: '{s}', list: [{n}, '{s}', true, null] }};\n\
                 JSON.stringify(JSON.parse(JSON.stringify(v))) === JSON.stringify(v)"
            );
            match eval_fresh(&src) {
                Completion::Normal(JsValue::Boolean(true)) => {}
                other => prop_assert!(false, "round trip failed: {other:?}"),
            }
        }
    }

    #[test]
    fn iterator_protocol_matches_for_of() {
        let src = "var via_for_of = [];\n\
                   for (var v of [1, 'x', true]) via_for_of.push(v);\n\
                   var manual = [];\n\
                   var it = [1, 'x', true][Symbol.iterator]();\n\
                   for (var r = it.next(); !r.done; r = it.next()) manual.push(r.value);\n\
                   JSON.stringify(via_for_of) === JSON.stringify(manual)";
        assert!(matches!(
            eval_fresh(src),
            Completion::Normal(JsValue::Boolean(true))
        ));
    }
}
