use super::{create_constructor, define_method, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::BooleanPrototype, JsValue::object(prototype));
    {
        let obj = agent.get_object(prototype).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Boolean";
        data.primitive = Some(JsValue::Boolean(false));
    }

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let b = this_boolean_value(agent, this)?;
        Ok(JsValue::String(JsString::from_str(if b { "true" } else { "false" })))
    });
    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(JsValue::Boolean(this_boolean_value(agent, this)?))
    });

    let ctor = create_constructor(agent, "Boolean", 1, prototype, |agent, _this, args| {
        let value = agent.to_boolean(&args.first().cloned().unwrap_or(JsValue::Undefined));
        if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
            let realm = agent.current_realm();
            let id = agent.wrapper_create(
                JsValue::Boolean(value),
                Intrinsic::BooleanPrototype,
                "Boolean",
                realm,
            );
            return Ok(JsValue::object(id));
        }
        Ok(JsValue::Boolean(value))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::BooleanConstructor, JsValue::object(ctor));
}

fn this_boolean_value(agent: &mut Agent, this: &JsValue) -> Result<bool, JsValue> {
    match this {
        JsValue::Boolean(b) => Ok(*b),
        JsValue::Object(o) => {
            let obj = agent.get_object(o.id).unwrap();
            let primitive = obj.borrow().primitive.clone();
            match primitive {
                Some(JsValue::Boolean(b)) => Ok(b),
                _ => Err(agent.type_error("Receiver is not a Boolean")),
            }
        }
        _ => Err(agent.type_error("Receiver is not a Boolean")),
    }
}
