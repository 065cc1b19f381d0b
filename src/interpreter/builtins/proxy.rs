use super::define_method;
use crate::interpreter::agent::Agent;
use crate::interpreter::property::PropertyKey;
use crate::interpreter::realm::Intrinsic;
use crate::types::JsValue;

/// The Proxy constructor (§28.2). The exotic behaviour itself lives in
/// the proxy internal-method suite.
pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let ctor = agent.create_native_function("Proxy", 2, true, |agent, _this, args| {
        if agent.native_new_target.as_ref().is_none_or(|t| t.is_undefined()) {
            return Err(agent.type_error("Constructor Proxy requires 'new'"));
        }
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let handler = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let id = agent.proxy_create(&target, &handler)?;
        Ok(JsValue::object(id))
    });
    let ctor_id = ctor.object_id().unwrap();
    agent.realms[realm].set_intrinsic(Intrinsic::ProxyConstructor, ctor);

    define_method(agent, ctor_id, "revocable", 2, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let handler = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let proxy_id = agent.proxy_create(&target, &handler)?;
        let revoke = agent.create_native_function("revoke", 0, false, move |agent, _this, _args| {
            agent.proxy_revoke(proxy_id);
            Ok(JsValue::Undefined)
        });
        let realm = agent.current_realm();
        let result = agent.create_ordinary_object(realm);
        agent.create_data_property_or_throw(
            result,
            &PropertyKey::from_str("proxy"),
            JsValue::object(proxy_id),
        )?;
        agent.create_data_property_or_throw(result, &PropertyKey::from_str("revoke"), revoke)?;
        Ok(JsValue::object(result))
    });
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_bool(src: &str) -> bool {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "proxy.js") {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn get_trap_and_forwarding() {
        assert!(eval_bool(
            "var p = new Proxy({ real: 1 }, { get: function (t, k) { return k === 'fake' ? 42 : t[k]; } });\n\
             p.real === 1 && p.fake === 42"
        ));
        // No trap: operations forward to the target.
        assert!(eval_bool(
            "var t = { a: 7 }; var p = new Proxy(t, {}); p.a === 7 && ('a' in p)"
        ));
    }

    #[test]
    fn set_and_has_traps() {
        assert!(eval_bool(
            "var log = [];\n\
             var p = new Proxy({}, { set: function (t, k, v) { log.push(k); t[k] = v; return true; } });\n\
             p.x = 1;\n\
             log.length === 1 && log[0] === 'x'"
        ));
        assert!(eval_bool(
            "var p = new Proxy({}, { has: function () { return true; } }); 'anything' in p"
        ));
    }

    #[test]
    fn get_prototype_invariant_on_non_extensible_target() {
        assert!(eval_bool(
            "var t = Object.preventExtensions({});\n\
             var p = new Proxy(t, { getPrototypeOf: function () { return { fake: true }; } });\n\
             try { Object.getPrototypeOf(p); false } catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn revoked_proxy_throws() {
        assert!(eval_bool(
            "var r = Proxy.revocable({}, {});\n\
             r.revoke();\n\
             try { r.proxy.x; false } catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn apply_trap() {
        assert!(eval_bool(
            "function f(a, b) { return a + b; }\n\
             var p = new Proxy(f, { apply: function (t, thisArg, args) { return t(args[0], args[1]) * 10; } });\n\
             p(1, 2) === 30"
        ));
    }

    #[test]
    fn ownkeys_trap_with_invariants() {
        assert!(eval_bool(
            "var t = {}; Object.defineProperty(t, 'fixed', { value: 1, configurable: false });\n\
             var p = new Proxy(t, { ownKeys: function () { return ['fixed', 'extra']; } });\n\
             Object.getOwnPropertyNames(p).length === 2"
        ));
    }
}
