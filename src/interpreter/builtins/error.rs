use super::{create_constructor, define_method, define_value, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::property::PropertyKey;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

/// Error constructors and prototypes (§20.5). Each NativeError chains
/// its prototype to %Error.prototype% and its constructor to %Error%.
pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let error_prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::ErrorPrototype, JsValue::object(error_prototype));
    define_value(
        agent,
        error_prototype,
        "name",
        JsValue::String(JsString::from_str("Error")),
        true,
        false,
        true,
    );
    define_value(
        agent,
        error_prototype,
        "message",
        JsValue::String(JsString::empty()),
        true,
        false,
        true,
    );
    define_method(agent, error_prototype, "toString", 0, |agent, this, _args| {
        if !this.is_object() {
            return Err(agent.type_error("Error.prototype.toString called on non-object"));
        }
        let name = agent.get_v(this, &PropertyKey::from_str("name"))?;
        let name = if name.is_undefined() {
            JsString::from_str("Error")
        } else {
            agent.to_string_value(&name)?
        };
        let message = agent.get_v(this, &PropertyKey::from_str("message"))?;
        let message = if message.is_undefined() {
            JsString::empty()
        } else {
            agent.to_string_value(&message)?
        };
        let text = if name.is_empty() {
            message
        } else if message.is_empty() {
            name
        } else {
            name.concat(&JsString::from_str(": ")).concat(&message)
        };
        Ok(JsValue::String(text))
    });

    let error_ctor = create_constructor(agent, "Error", 1, error_prototype, move |agent, _this, args| {
        error_constructor_body(agent, args, Intrinsic::ErrorPrototype)
    });
    agent.realms[realm].set_intrinsic(Intrinsic::ErrorConstructor, JsValue::object(error_ctor));

    for (name, proto_slot, ctor_slot) in [
        ("TypeError", Intrinsic::TypeErrorPrototype, Intrinsic::TypeErrorConstructor),
        ("RangeError", Intrinsic::RangeErrorPrototype, Intrinsic::RangeErrorConstructor),
        (
            "ReferenceError",
            Intrinsic::ReferenceErrorPrototype,
            Intrinsic::ReferenceErrorConstructor,
        ),
        ("SyntaxError", Intrinsic::SyntaxErrorPrototype, Intrinsic::SyntaxErrorConstructor),
        ("URIError", Intrinsic::UriErrorPrototype, Intrinsic::UriErrorConstructor),
        ("EvalError", Intrinsic::EvalErrorPrototype, Intrinsic::EvalErrorConstructor),
    ] {
        let prototype = agent.object_create(Some(error_prototype), realm);
        define_value(
            agent,
            prototype,
            "name",
            JsValue::String(JsString::from_str(name)),
            true,
            false,
            true,
        );
        define_value(
            agent,
            prototype,
            "message",
            JsValue::String(JsString::empty()),
            true,
            false,
            true,
        );
        agent.realms[realm].set_intrinsic(proto_slot, JsValue::object(prototype));

        let ctor = create_constructor(agent, name, 1, prototype, move |agent, _this, args| {
            error_constructor_body(agent, args, proto_slot)
        });
        // NativeError constructors inherit from %Error%.
        let ctor_obj = agent.get_object(ctor).unwrap();
        ctor_obj.borrow_mut().prototype = agent.get_object(error_ctor);
        agent.realms[realm].set_intrinsic(ctor_slot, JsValue::object(ctor));
    }
}

/// The shared NativeError body: allocate from new.target's prototype,
/// then install `message` when present.
fn error_constructor_body(
    agent: &mut Agent,
    args: &[JsValue],
    default_proto: Intrinsic,
) -> Result<JsValue, JsValue> {
    let new_target = agent.native_new_target.clone().unwrap_or(JsValue::Undefined);
    let this = agent.ordinary_create_from_constructor(&new_target, default_proto)?;
    let id = this.object_id().unwrap();
    {
        let obj = agent.get_object(id).unwrap();
        obj.borrow_mut().class_name = "Error";
    }
    let message = args.first().cloned().unwrap_or(JsValue::Undefined);
    if !message.is_undefined() {
        let message = agent.to_string_value(&message)?;
        define_value(
            agent,
            id,
            "message",
            JsValue::String(message),
            true,
            false,
            true,
        );
    }
    Ok(this)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "errors.js")
    }

    fn eval_bool(src: &str) -> bool {
        match eval(src) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn error_hierarchy() {
        assert!(eval_bool("new TypeError('x') instanceof TypeError"));
        assert!(eval_bool("new TypeError('x') instanceof Error"));
        assert!(!eval_bool("new RangeError('x') instanceof TypeError"));
    }

    #[test]
    fn thrown_builtin_errors_have_the_right_prototype() {
        assert!(eval_bool("try { null.x } catch (e) { e instanceof TypeError }"));
        assert!(eval_bool("try { zap } catch (e) { e instanceof ReferenceError }"));
    }

    #[test]
    fn error_to_string() {
        assert_eq!(eval_string("new TypeError('bad').toString()"), "TypeError: bad");
        assert_eq!(eval_string("new Error().toString()"), "Error");
        assert_eq!(eval_string("String(new RangeError('r'))"), "RangeError: r");
    }

    #[test]
    fn message_is_own_but_name_is_inherited() {
        assert!(eval_bool("var e = new TypeError('m'); e.hasOwnProperty('message')"));
        assert!(eval_bool("var e = new TypeError('m'); !e.hasOwnProperty('name')"));
    }
}
