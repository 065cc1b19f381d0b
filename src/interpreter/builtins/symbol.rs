use super::{create_constructor, define_method, define_to_string_tag, define_value, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::SymbolPrototype, JsValue::object(prototype));

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let symbol = this_symbol(agent, this)?;
        let description = symbol
            .description
            .map(|d| d.to_rust_string())
            .unwrap_or_default();
        Ok(JsValue::String(JsString::from_str(&format!(
            "Symbol({description})"
        ))))
    });
    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(JsValue::Symbol(this_symbol(agent, this)?))
    });
    {
        // `description` is an accessor on the prototype.
        let getter = agent.create_native_function("get description", 0, false, |agent, this, _args| {
            let symbol = this_symbol(agent, this)?;
            Ok(match symbol.description {
                Some(d) => JsValue::String(d),
                None => JsValue::Undefined,
            })
        });
        let obj = agent.get_object(prototype).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("description"),
            PropertyDescriptor {
                get: Some(getter),
                set: None,
                enumerable: Some(false),
                configurable: Some(true),
                ..Default::default()
            },
        );
    }
    define_to_string_tag(agent, prototype, "Symbol");

    let ctor = create_constructor(agent, "Symbol", 0, prototype, |agent, _this, args| {
        if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
            return Err(agent.type_error("Symbol is not a constructor"));
        }
        let description = match args.first() {
            None | Some(JsValue::Undefined) => None,
            Some(value) => Some(agent.to_string_value(value)?),
        };
        Ok(JsValue::Symbol(agent.new_symbol(description)))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::SymbolConstructor, JsValue::object(ctor));

    define_method(agent, ctor, "for", 1, |agent, _this, args| {
        let key_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let key = agent.to_string_value(&key_arg)?;
        Ok(JsValue::Symbol(agent.symbol_for(&key.to_rust_string())))
    });
    define_method(agent, ctor, "keyFor", 1, |agent, _this, args| {
        let Some(JsValue::Symbol(symbol)) = args.first() else {
            return Err(agent.type_error("Symbol.keyFor requires a symbol"));
        };
        Ok(match agent.symbol_key_for(symbol) {
            Some(key) => JsValue::String(JsString::from_str(&key)),
            None => JsValue::Undefined,
        })
    });

    // Well-known symbol constants.
    let well_known = [
        ("iterator", agent.well_known.iterator.clone()),
        ("asyncIterator", agent.well_known.async_iterator.clone()),
        ("toPrimitive", agent.well_known.to_primitive.clone()),
        ("toStringTag", agent.well_known.to_string_tag.clone()),
        ("hasInstance", agent.well_known.has_instance.clone()),
        ("species", agent.well_known.species.clone()),
        ("unscopables", agent.well_known.unscopables.clone()),
        (
            "isConcatSpreadable",
            agent.well_known.is_concat_spreadable.clone(),
        ),
    ];
    for (name, symbol) in well_known {
        define_value(agent, ctor, name, JsValue::Symbol(symbol), false, false, false);
    }
}

fn this_symbol(agent: &mut Agent, this: &JsValue) -> Result<crate::types::JsSymbol, JsValue> {
    match this {
        JsValue::Symbol(s) => Ok(s.clone()),
        JsValue::Object(o) => {
            let obj = agent.get_object(o.id).unwrap();
            let primitive = obj.borrow().primitive.clone();
            match primitive {
                Some(JsValue::Symbol(s)) => Ok(s),
                _ => Err(agent.type_error("Receiver is not a Symbol")),
            }
        }
        _ => Err(agent.type_error("Receiver is not a Symbol")),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_bool(src: &str) -> bool {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "symbol.js") {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn symbols_are_unique_identities() {
        assert!(!eval_bool("Symbol('a') === Symbol('a')"));
        assert!(eval_bool("var s = Symbol('a'); s === s"));
    }

    #[test]
    fn registry_symbols_are_shared() {
        assert!(eval_bool("Symbol.for('k') === Symbol.for('k')"));
        assert!(eval_bool("Symbol.keyFor(Symbol.for('k')) === 'k'"));
        assert!(eval_bool("Symbol.keyFor(Symbol('loose')) === undefined"));
    }

    #[test]
    fn symbols_as_property_keys() {
        assert!(eval_bool(
            "var s = Symbol('key'); var o = {}; o[s] = 42; o[s] === 42"
        ));
        assert!(eval_bool(
            "var s = Symbol('key'); var o = {}; o[s] = 1; Object.keys(o).length === 0"
        ));
    }

    #[test]
    fn symbol_coercion_throws() {
        assert!(eval_bool(
            "try { 'x' + Symbol(); false } catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn description_accessor() {
        assert!(eval_bool("Symbol('desc').description === 'desc'"));
        assert!(eval_bool("Symbol().description === undefined"));
    }
}
