use super::{create_constructor, define_method};
use crate::interpreter::agent::Agent;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = agent
        .intrinsic(realm, Intrinsic::ObjectPrototype)
        .object_id()
        .unwrap();

    define_method(agent, prototype, "hasOwnProperty", 1, |agent, this, args| {
        let key_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        let id = agent.to_object(this)?;
        let desc = agent.internal_get_own_property(id, &key)?;
        Ok(JsValue::Boolean(desc.is_some()))
    });

    define_method(agent, prototype, "isPrototypeOf", 1, |agent, this, args| {
        let Some(mut walker) = args.first().and_then(|v| v.object_id()) else {
            return Ok(JsValue::Boolean(false));
        };
        let this_id = agent.to_object(this)?;
        loop {
            match agent.internal_get_prototype_of(walker)? {
                JsValue::Object(p) => {
                    if p.id == this_id {
                        return Ok(JsValue::Boolean(true));
                    }
                    walker = p.id;
                }
                _ => return Ok(JsValue::Boolean(false)),
            }
        }
    });

    define_method(
        agent,
        prototype,
        "propertyIsEnumerable",
        1,
        |agent, this, args| {
            let key_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
            let key = agent.to_property_key(&key_arg)?;
            let id = agent.to_object(this)?;
            let desc = agent.internal_get_own_property(id, &key)?;
            Ok(JsValue::Boolean(
                desc.is_some_and(|d| d.enumerable == Some(true)),
            ))
        },
    );

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let tag = match this {
            JsValue::Undefined => "Undefined".to_string(),
            JsValue::Null => "Null".to_string(),
            _ => {
                let id = agent.to_object(this)?;
                let tag_key = PropertyKey::Symbol(agent.well_known.to_string_tag.clone());
                let tag_value = agent.internal_get(id, &tag_key, this)?;
                match tag_value {
                    JsValue::String(s) => s.to_rust_string(),
                    _ => {
                        let obj = agent.get_object(id).unwrap();
                        let data = obj.borrow();
                        match data.kind {
                            crate::interpreter::object::ObjectKind::Array => "Array".to_string(),
                            _ if data.is_callable() => "Function".to_string(),
                            _ => match data.class_name {
                                "Error" | "Boolean" | "Number" | "String" | "Arguments" => {
                                    data.class_name.to_string()
                                }
                                _ => "Object".to_string(),
                            },
                        }
                    }
                }
            }
        };
        Ok(JsValue::String(JsString::from_str(&format!(
            "[object {tag}]"
        ))))
    });

    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        Ok(JsValue::object(id))
    });

    // The Object constructor: boxing conversion, or a fresh object.
    let ctor = create_constructor(agent, "Object", 1, prototype, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        if value.is_nullish() {
            let realm = agent.current_realm();
            return Ok(JsValue::object(agent.create_ordinary_object(realm)));
        }
        Ok(JsValue::object(agent.to_object(&value)?))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::ObjectConstructor, JsValue::object(ctor));

    define_method(agent, ctor, "keys", 1, |agent, _this, args| {
        let names = own_enumerable(agent, args, Collect::Keys)?;
        Ok(agent.create_array_from_list(&names))
    });
    define_method(agent, ctor, "values", 1, |agent, _this, args| {
        let values = own_enumerable(agent, args, Collect::Values)?;
        Ok(agent.create_array_from_list(&values))
    });
    define_method(agent, ctor, "entries", 1, |agent, _this, args| {
        let entries = own_enumerable(agent, args, Collect::Entries)?;
        Ok(agent.create_array_from_list(&entries))
    });

    define_method(agent, ctor, "assign", 2, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let target_id = agent.to_object(&target)?;
        for source in args.iter().skip(1) {
            if source.is_nullish() {
                continue;
            }
            let from = agent.to_object(source)?;
            let keys = agent.internal_own_property_keys(from)?;
            for key in keys {
                let desc = agent.internal_get_own_property(from, &key)?;
                if desc.is_some_and(|d| d.enumerable == Some(true)) {
                    let value = agent.internal_get(from, &key, source)?;
                    let target_value = JsValue::object(target_id);
                    agent.set_property(&target_value, &key, value, true)?;
                }
            }
        }
        Ok(JsValue::object(target_id))
    });

    define_method(agent, ctor, "freeze", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = value.object_id() else {
            return Ok(value);
        };
        set_integrity_level(agent, id, true)?;
        Ok(value)
    });
    define_method(agent, ctor, "seal", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = value.object_id() else {
            return Ok(value);
        };
        set_integrity_level(agent, id, false)?;
        Ok(value)
    });
    define_method(agent, ctor, "isFrozen", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = value.object_id() else {
            return Ok(JsValue::Boolean(true));
        };
        Ok(JsValue::Boolean(test_integrity_level(agent, id, true)?))
    });
    define_method(agent, ctor, "isSealed", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = value.object_id() else {
            return Ok(JsValue::Boolean(true));
        };
        Ok(JsValue::Boolean(test_integrity_level(agent, id, false)?))
    });

    define_method(agent, ctor, "create", 2, |agent, _this, args| {
        let proto = args.first().cloned().unwrap_or(JsValue::Undefined);
        let proto_id = match &proto {
            JsValue::Object(o) => Some(o.id),
            JsValue::Null => None,
            _ => return Err(agent.type_error("Object prototype may only be an Object or null")),
        };
        let realm = agent.current_realm();
        let id = agent.object_create(proto_id, realm);
        if let Some(props) = args.get(1) {
            if !props.is_undefined() {
                object_define_properties(agent, id, props)?;
            }
        }
        Ok(JsValue::object(id))
    });

    define_method(agent, ctor, "defineProperty", 3, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = target.object_id() else {
            return Err(agent.type_error("Object.defineProperty called on non-object"));
        };
        let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_property_key(&key_arg)?;
        let desc_arg = args.get(2).cloned().unwrap_or(JsValue::Undefined);
        let desc = agent.to_property_descriptor(&desc_arg)?;
        agent.define_property_or_throw(id, &key, desc)?;
        Ok(target)
    });

    define_method(agent, ctor, "defineProperties", 2, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let Some(id) = target.object_id() else {
            return Err(agent.type_error("Object.defineProperties called on non-object"));
        };
        let props = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        object_define_properties(agent, id, &props)?;
        Ok(target)
    });

    define_method(
        agent,
        ctor,
        "getOwnPropertyDescriptor",
        2,
        |agent, _this, args| {
            let target = args.first().cloned().unwrap_or(JsValue::Undefined);
            let id = agent.to_object(&target)?;
            let key_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
            let key = agent.to_property_key(&key_arg)?;
            match agent.internal_get_own_property(id, &key)? {
                Some(desc) => Ok(agent.from_property_descriptor(&desc)),
                None => Ok(JsValue::Undefined),
            }
        },
    );

    define_method(agent, ctor, "getOwnPropertyNames", 1, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let id = agent.to_object(&target)?;
        let keys = agent.internal_own_property_keys(id)?;
        let names: Vec<JsValue> = keys
            .iter()
            .filter(|k| !matches!(k, PropertyKey::Symbol(_)))
            .map(|k| k.to_value())
            .collect();
        Ok(agent.create_array_from_list(&names))
    });

    define_method(
        agent,
        ctor,
        "getOwnPropertySymbols",
        1,
        |agent, _this, args| {
            let target = args.first().cloned().unwrap_or(JsValue::Undefined);
            let id = agent.to_object(&target)?;
            let keys = agent.internal_own_property_keys(id)?;
            let symbols: Vec<JsValue> = keys
                .iter()
                .filter(|k| matches!(k, PropertyKey::Symbol(_)))
                .map(|k| k.to_value())
                .collect();
            Ok(agent.create_array_from_list(&symbols))
        },
    );

    define_method(agent, ctor, "getPrototypeOf", 1, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let id = agent.to_object(&target)?;
        agent.internal_get_prototype_of(id)
    });

    define_method(agent, ctor, "setPrototypeOf", 2, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        let proto = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        if !matches!(proto, JsValue::Object(_) | JsValue::Null) {
            return Err(agent.type_error("Object prototype may only be an Object or null"));
        }
        agent.require_object_coercible(&target)?;
        let Some(id) = target.object_id() else {
            return Ok(target);
        };
        if !agent.internal_set_prototype_of(id, &proto)? {
            return Err(agent.type_error("Cannot set prototype of this object"));
        }
        Ok(target)
    });

    define_method(agent, ctor, "preventExtensions", 1, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        if let Some(id) = target.object_id() {
            if !agent.internal_prevent_extensions(id)? {
                return Err(agent.type_error("Cannot prevent extensions on this object"));
            }
        }
        Ok(target)
    });

    define_method(agent, ctor, "isExtensible", 1, |agent, _this, args| {
        let target = args.first().cloned().unwrap_or(JsValue::Undefined);
        match target.object_id() {
            Some(id) => Ok(JsValue::Boolean(agent.internal_is_extensible(id)?)),
            None => Ok(JsValue::Boolean(false)),
        }
    });

    define_method(agent, ctor, "is", 2, |_agent, _this, args| {
        let a = args.first().cloned().unwrap_or(JsValue::Undefined);
        let b = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        Ok(JsValue::Boolean(crate::interpreter::helpers::same_value(
            &a, &b,
        )))
    });
}

enum Collect {
    Keys,
    Values,
    Entries,
}

fn own_enumerable(
    agent: &mut Agent,
    args: &[JsValue],
    mode: Collect,
) -> Result<Vec<JsValue>, JsValue> {
    let target = args.first().cloned().unwrap_or(JsValue::Undefined);
    let id = agent.to_object(&target)?;
    let receiver = JsValue::object(id);
    let keys = agent.internal_own_property_keys(id)?;
    let mut out = Vec::new();
    for key in keys {
        if matches!(key, PropertyKey::Symbol(_)) {
            continue;
        }
        let Some(desc) = agent.internal_get_own_property(id, &key)? else {
            continue;
        };
        if desc.enumerable != Some(true) {
            continue;
        }
        match mode {
            Collect::Keys => out.push(key.to_value()),
            Collect::Values => out.push(agent.internal_get(id, &key, &receiver)?),
            Collect::Entries => {
                let value = agent.internal_get(id, &key, &receiver)?;
                out.push(agent.create_array_from_list(&[key.to_value(), value]));
            }
        }
    }
    Ok(out)
}

fn object_define_properties(
    agent: &mut Agent,
    target: u64,
    props: &JsValue,
) -> Result<(), JsValue> {
    let props_id = agent.to_object(props)?;
    let keys = agent.internal_own_property_keys(props_id)?;
    let mut pending = Vec::new();
    for key in keys {
        let Some(desc) = agent.internal_get_own_property(props_id, &key)? else {
            continue;
        };
        if desc.enumerable != Some(true) {
            continue;
        }
        let desc_value = agent.internal_get(props_id, &key, props)?;
        let descriptor = agent.to_property_descriptor(&desc_value)?;
        pending.push((key, descriptor));
    }
    for (key, descriptor) in pending {
        agent.define_property_or_throw(target, &key, descriptor)?;
    }
    Ok(())
}

/// SetIntegrityLevel (§7.3.16).
fn set_integrity_level(agent: &mut Agent, id: u64, frozen: bool) -> Result<(), JsValue> {
    if !agent.internal_prevent_extensions(id)? {
        return Err(agent.type_error("Cannot prevent extensions on this object"));
    }
    let keys = agent.internal_own_property_keys(id)?;
    for key in keys {
        let desc = if frozen {
            let current = agent.internal_get_own_property(id, &key)?;
            match current {
                Some(c) if c.is_accessor_descriptor() => PropertyDescriptor {
                    configurable: Some(false),
                    ..Default::default()
                },
                _ => PropertyDescriptor {
                    configurable: Some(false),
                    writable: Some(false),
                    ..Default::default()
                },
            }
        } else {
            PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            }
        };
        agent.define_property_or_throw(id, &key, desc)?;
    }
    Ok(())
}

/// TestIntegrityLevel (§7.3.17).
fn test_integrity_level(agent: &mut Agent, id: u64, frozen: bool) -> Result<bool, JsValue> {
    if agent.internal_is_extensible(id)? {
        return Ok(false);
    }
    let keys = agent.internal_own_property_keys(id)?;
    for key in keys {
        let Some(desc) = agent.internal_get_own_property(id, &key)? else {
            continue;
        };
        if desc.configurable == Some(true) {
            return Ok(false);
        }
        if frozen && desc.is_data_descriptor() && desc.writable == Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "object.js")
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn eval_bool(src: &str) -> bool {
        match eval(src) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn keys_values_entries_order() {
        assert_eq!(
            eval_string("Object.keys({ b: 1, 2: 'x', a: 3, 0: 'y' }).join(',')"),
            "0,2,b,a"
        );
        assert_eq!(
            eval_string("Object.values({ a: 1, b: 2 }).join(',')"),
            "1,2"
        );
        assert_eq!(
            eval_string("Object.entries({ a: 1 })[0].join(':')"),
            "a:1"
        );
    }

    #[test]
    fn define_property_validation() {
        assert_eq!(
            eval_string(
                "var o = {};\n\
                 Object.defineProperty(o, 'x', { value: 1, writable: false });\n\
                 o.x = 9;\n\
                 String(o.x)"
            ),
            "1"
        );
        assert!(eval_bool(
            "var o = {};\n\
             Object.defineProperty(o, 'x', { value: 1, configurable: false });\n\
             try { Object.defineProperty(o, 'x', { value: 2 }); false }\n\
             catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn freeze_and_is_frozen() {
        assert!(eval_bool("Object.isFrozen(Object.freeze({ a: 1 }))"));
        assert!(!eval_bool("Object.isFrozen({ a: 1 })"));
        assert_eq!(
            eval_string("var o = Object.freeze({ a: 1 }); o.a = 2; String(o.a)"),
            "1"
        );
    }

    #[test]
    fn create_with_null_prototype() {
        assert!(eval_bool("Object.getPrototypeOf(Object.create(null)) === null"));
        assert!(eval_bool(
            "var p = { greet: 1 }; Object.create(p).greet === 1"
        ));
    }

    #[test]
    fn to_string_tags() {
        assert_eq!(eval_string("({}).toString()"), "[object Object]");
        assert_eq!(
            eval_string("Object.prototype.toString.call([])"),
            "[object Array]"
        );
        assert_eq!(
            eval_string("Object.prototype.toString.call(null)"),
            "[object Null]"
        );
    }

    #[test]
    fn assign_copies_enumerables() {
        assert_eq!(
            eval_string("String(Object.assign({ a: 1 }, { b: 2 }, { a: 3 }).a)"),
            "3"
        );
    }

    #[test]
    fn object_is() {
        assert!(eval_bool("Object.is(NaN, NaN)"));
        assert!(!eval_bool("Object.is(0, -0)"));
    }
}
