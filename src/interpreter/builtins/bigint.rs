use super::{create_constructor, define_method, define_to_string_tag, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::helpers::string_to_bigint;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsBigInt, JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::BigIntPrototype, JsValue::object(prototype));
    define_to_string_tag(agent, prototype, "BigInt");

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let b = this_bigint_value(agent, this)?;
        Ok(JsValue::String(JsString::from_str(&b.value.to_string())))
    });
    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(JsValue::BigInt(this_bigint_value(agent, this)?))
    });

    let ctor = create_constructor(agent, "BigInt", 1, prototype, |agent, _this, args| {
        if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
            return Err(agent.type_error("BigInt is not a constructor"));
        }
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let prim = agent.to_primitive(&value, "number")?;
        match prim {
            JsValue::BigInt(b) => Ok(JsValue::BigInt(b)),
            JsValue::Number(n) => {
                if n.fract() != 0.0 || !n.is_finite() {
                    return Err(agent.range_error(
                        "The number is not a safe integer for BigInt conversion",
                    ));
                }
                Ok(JsValue::BigInt(JsBigInt::from_i64(n as i64)))
            }
            JsValue::Boolean(b) => Ok(JsValue::BigInt(JsBigInt::from_i64(b as i64))),
            JsValue::String(s) => match string_to_bigint(&s.to_rust_string()) {
                Some(value) => Ok(JsValue::BigInt(JsBigInt { value })),
                None => Err(agent.syntax_error("Cannot convert string to a BigInt")),
            },
            _ => Err(agent.type_error("Cannot convert value to a BigInt")),
        }
    });
    agent.realms[realm].set_intrinsic(Intrinsic::BigIntConstructor, JsValue::object(ctor));
}

fn this_bigint_value(agent: &mut Agent, this: &JsValue) -> Result<JsBigInt, JsValue> {
    match this {
        JsValue::BigInt(b) => Ok(b.clone()),
        JsValue::Object(o) => {
            let obj = agent.get_object(o.id).unwrap();
            let primitive = obj.borrow().primitive.clone();
            match primitive {
                Some(JsValue::BigInt(b)) => Ok(b),
                _ => Err(agent.type_error("Receiver is not a BigInt")),
            }
        }
        _ => Err(agent.type_error("Receiver is not a BigInt")),
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
        match agent.evaluate_script(realm, src, "bigint.js") {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn bigint_arithmetic_and_equality() {
        assert!(eval_bool("2n ** 64n === 18446744073709551616n"));
        assert!(eval_bool("1n + 2n === 3n"));
        assert!(eval_bool("5n / 2n === 2n"));
        assert!(eval_bool("1n == 1"));
        assert!(!eval_bool("1n === 1"));
    }

    #[test]
    fn conversions() {
        assert!(eval_bool("BigInt('42') === 42n"));
        assert!(eval_bool("BigInt(7) === 7n"));
        assert!(eval_bool(
            "try { BigInt(1.5); false } catch (e) { e instanceof RangeError }"
        ));
        assert!(eval_bool(
            "try { 1n + 1; false } catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn typeof_bigint() {
        assert!(eval_bool("typeof 1n === 'bigint'"));
    }
}
