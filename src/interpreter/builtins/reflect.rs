use super::{define_method, define_to_string_tag};
use crate::interpreter::agent::Agent;
use crate::interpreter::realm::Intrinsic;
use crate::types::JsValue;

/// Reflect (§28.1): the internal methods, reified one-to-one.
pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let reflect = agent.create_ordinary_object(realm);
    agent.realms[realm].set_intrinsic(Intrinsic::Reflect, JsValue::object(reflect));
    define_to_string_tag(agent, reflect, "Reflect");

    define_method(agent, reflect, "apply", 3, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        if !agent.is_callable(&target) {
            return Err(agent.type_error("Reflect.apply target must be callable"));
        }
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let arg_list = match args.get(2) {
            Some(list) => agent.create_list_from_array_like(list)?,
            None => Vec::new(),
        };
        agent.call(&target, &this_arg, &arg_list)
    });

    define_method(agent, reflect, "construct", 2, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        if !agent.is_constructor(&target) {
            return Err(agent.type_error("Reflect.construct target must be a constructor"));
        }
        let arg_list = match args.get(1) {
            Some(list) => agent.create_list_from_array_like(list)?,
            None => Vec::new(),
        };
        let new_target = args.get(2).cloned().unwrap_or_else(|| target.clone());
        if !agent.is_constructor(&new_target) {
            return Err(agent.type_error("Reflect.construct newTarget must be a constructor"));
        }
        agent.construct(&target, &arg_list, &new_target)
    });

    define_method(agent, reflect, "defineProperty", 3, |agent, _this, args| {
        let id = reflect_target(agent, args, "defineProperty")?;
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        let desc_arg = args.get(2).cloned().unwrap_or(JsValue::Undefined);
        let desc = agent.to_property_descriptor(&desc_arg)?;
        Ok(JsValue::Boolean(
            agent.internal_define_own_property(id, &key, desc)?,
        ))
    });

    define_method(agent, reflect, "deleteProperty", 2, |agent, _this, args| {
        let id = reflect_target(agent, args, "deleteProperty")?;
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        Ok(JsValue::Boolean(agent.internal_delete(id, &key)?))
    });

    define_method(agent, reflect, "get", 2, |agent, _this, args| {
        let id = reflect_target(agent, args, "get")?;
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        let receiver = args
            .get(2)
            .cloned()
            .unwrap_or_else(|| JsValue::object(id));
        agent.internal_get(id, &key, &receiver)
    });

    define_method(agent, reflect, "set", 3, |agent, _this, args| {
        let id = reflect_target(agent, args, "set")?;
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        let value = args.get(2).cloned().unwrap_or(JsValue::Undefined);
        let receiver = args
            .get(3)
            .cloned()
            .unwrap_or_else(|| JsValue::object(id));
        Ok(JsValue::Boolean(
            agent.internal_set(id, &key, value, &receiver)?,
        ))
    });

    define_method(
        agent,
        reflect,
        "getOwnPropertyDescriptor",
        2,
        |agent, _this, args| {
            let id = reflect_target(agent, args, "getOwnPropertyDescriptor")?;
            let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
            let key = agent.to_property_key(&key_arg)?;
            match agent.internal_get_own_property(id, &key)? {
                Some(desc) => Ok(agent.from_property_descriptor(&desc)),
                None => Ok(JsValue::Undefined),
            }
        },
    );

    define_method(agent, reflect, "getPrototypeOf", 1, |agent, _this, args| {
        let id = reflect_target(agent, args, "getPrototypeOf")?;
        agent.internal_get_prototype_of(id)
    });

    define_method(agent, reflect, "setPrototypeOf", 2, |agent, _this, args| {
        let id = reflect_target(agent, args, "setPrototypeOf")?;
        let proto = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        if !matches!(proto, JsValue::Object(_) | JsValue::Null) {
            return Err(agent.type_error("Reflect.setPrototypeOf prototype must be an object or null"));
        }
        Ok(JsValue::Boolean(agent.internal_set_prototype_of(id, &proto)?))
    });

    define_method(agent, reflect, "has", 2, |agent, _this, args| {
        let id = reflect_target(agent, args, "has")?;
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        Ok(JsValue::Boolean(agent.internal_has_property(id, &key)?))
    });

    define_method(agent, reflect, "isExtensible", 1, |agent, _this, args| {
        let id = reflect_target(agent, args, "isExtensible")?;
        Ok(JsValue::Boolean(agent.internal_is_extensible(id)?))
    });

    define_method(agent, reflect, "preventExtensions", 1, |agent, _this, args| {
        let id = reflect_target(agent, args, "preventExtensions")?;
        Ok(JsValue::Boolean(agent.internal_prevent_extensions(id)?))
    });

    define_method(agent, reflect, "ownKeys", 1, |agent, _this, args| {
        let id = reflect_target(agent, args, "ownKeys")?;
        let keys = agent.internal_own_property_keys(id)?;
        let values: Vec<JsValue> = keys.iter().map(|k| k.to_value()).collect();
        Ok(agent.create_array_from_list(&values))
    });
}

fn reflect_target(agent: &mut Agent, args: &[JsValue], method: &str) -> Result<u64, JsValue> {
    args.first()
        .and_then(|v| v.object_id())
        .ok_or_else(|| agent.type_error(&format!("Reflect.{method} called on non-object")))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_bool(src: &str) -> bool {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "reflect.js") {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn reflect_mirrors_internal_methods() {
        assert!(eval_bool("Reflect.has({ a: 1 }, 'a')"));
        assert!(eval_bool("Reflect.get({ a: 5 }, 'a') === 5"));
        assert!(eval_bool("var o = {}; Reflect.set(o, 'k', 1) && o.k === 1"));
        assert!(eval_bool("Reflect.ownKeys({ a: 1, b: 2 }).length === 2"));
        assert!(eval_bool(
            "var o = { x: 1 }; Reflect.deleteProperty(o, 'x') && !('x' in o)"
        ));
    }

    #[test]
    fn reflect_get_with_receiver() {
        assert!(eval_bool(
            "var o = { get v() { return this.tag; } };\n\
             Reflect.get(o, 'v', { tag: 'custom' }) === 'custom'"
        ));
    }

    #[test]
    fn reflect_construct_with_new_target() {
        assert!(eval_bool(
            "function A() {}\n\
             function B() {}\n\
             Reflect.construct(A, [], B) instanceof B"
        ));
    }
}
