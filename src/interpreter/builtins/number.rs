use super::{create_constructor, define_method, define_value, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::helpers::MAX_SAFE_INTEGER;
use crate::interpreter::realm::Intrinsic;
use crate::types::{number_ops, JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::NumberPrototype, JsValue::object(prototype));
    {
        let obj = agent.get_object(prototype).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "Number";
        data.primitive = Some(JsValue::Number(0.0));
    }

    define_method(agent, prototype, "toString", 1, |agent, this, args| {
        let n = this_number_value(agent, this)?;
        let radix = match args.first() {
            None | Some(JsValue::Undefined) => 10,
            Some(v) => {
                let r = agent.to_integer_or_infinity(v)?;
                if !(2.0..=36.0).contains(&r) {
                    return Err(agent.range_error("toString() radix must be between 2 and 36"));
                }
                r as u32
            }
        };
        Ok(JsValue::String(JsString::from_str(
            &number_ops::to_string_radix(n, radix),
        )))
    });

    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(JsValue::Number(this_number_value(agent, this)?))
    });

    define_method(agent, prototype, "toFixed", 1, |agent, this, args| {
        let n = this_number_value(agent, this)?;
        let digits_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let digits = agent.to_integer_or_infinity(&digits_arg)?;
        if !(0.0..=100.0).contains(&digits) {
            return Err(agent.range_error("toFixed() digits argument must be between 0 and 100"));
        }
        if n.is_nan() {
            return Ok(JsValue::String(JsString::from_str("NaN")));
        }
        if n.abs() >= 1e21 {
            return Ok(JsValue::String(JsString::from_str(&number_ops::to_string(n))));
        }
        Ok(JsValue::String(JsString::from_str(&format!(
            "{:.*}",
            digits as usize, n
        ))))
    });

    let ctor = create_constructor(agent, "Number", 1, prototype, |agent, _this, args| {
        let value = match args.first() {
            None => 0.0,
            Some(v) => {
                let numeric = agent.to_numeric(v)?;
                match numeric {
                    JsValue::Number(n) => n,
                    // Number(bigint) converts exactly.
                    JsValue::BigInt(b) => b.value.to_string().parse().unwrap_or(f64::NAN),
                    _ => f64::NAN,
                }
            }
        };
        if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
            let realm = agent.current_realm();
            let id = agent.wrapper_create(
                JsValue::Number(value),
                Intrinsic::NumberPrototype,
                "Number",
                realm,
            );
            return Ok(JsValue::object(id));
        }
        Ok(JsValue::Number(value))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::NumberConstructor, JsValue::object(ctor));

    define_value(agent, ctor, "MAX_SAFE_INTEGER", JsValue::Number(MAX_SAFE_INTEGER), false, false, false);
    define_value(agent, ctor, "MIN_SAFE_INTEGER", JsValue::Number(-MAX_SAFE_INTEGER), false, false, false);
    define_value(agent, ctor, "MAX_VALUE", JsValue::Number(f64::MAX), false, false, false);
    define_value(agent, ctor, "MIN_VALUE", JsValue::Number(5e-324), false, false, false);
    define_value(agent, ctor, "EPSILON", JsValue::Number(f64::EPSILON), false, false, false);
    define_value(agent, ctor, "NaN", JsValue::Number(f64::NAN), false, false, false);
    define_value(agent, ctor, "POSITIVE_INFINITY", JsValue::Number(f64::INFINITY), false, false, false);
    define_value(agent, ctor, "NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY), false, false, false);

    define_method(agent, ctor, "isNaN", 1, |_agent, _this, args| {
        Ok(JsValue::Boolean(matches!(
            args.first(),
            Some(JsValue::Number(n)) if n.is_nan()
        )))
    });
    define_method(agent, ctor, "isFinite", 1, |_agent, _this, args| {
        Ok(JsValue::Boolean(matches!(
            args.first(),
            Some(JsValue::Number(n)) if n.is_finite()
        )))
    });
    define_method(agent, ctor, "isInteger", 1, |_agent, _this, args| {
        Ok(JsValue::Boolean(matches!(
            args.first(),
            Some(JsValue::Number(n)) if n.is_finite() && n.fract() == 0.0
        )))
    });
    define_method(agent, ctor, "isSafeInteger", 1, |_agent, _this, args| {
        Ok(JsValue::Boolean(matches!(
            args.first(),
            Some(JsValue::Number(n))
                if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
        )))
    });

    // Number.parseInt / Number.parseFloat are installed by the global
    // bootstrap once the shared implementations exist.
}

fn this_number_value(agent: &mut Agent, this: &JsValue) -> Result<f64, JsValue> {
    match this {
        JsValue::Number(n) => Ok(*n),
        JsValue::Object(o) => {
            let obj = agent.get_object(o.id).unwrap();
            let primitive = obj.borrow().primitive.clone();
            match primitive {
                Some(JsValue::Number(n)) => Ok(n),
                _ => Err(agent.type_error("Receiver is not a Number")),
            }
        }
        _ => Err(agent.type_error("Receiver is not a Number")),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_string(src: &str) -> String {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "number.js") {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn eval_bool(src: &str) -> bool {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "number.js") {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn to_string_radix() {
        assert_eq!(eval_string("(255).toString(16)"), "ff");
        assert_eq!(eval_string("(8).toString(2)"), "1000");
        assert!(eval_bool(
            "try { (1).toString(1); false } catch (e) { e instanceof RangeError }"
        ));
    }

    #[test]
    fn predicates() {
        assert!(eval_bool("Number.isInteger(3)"));
        assert!(!eval_bool("Number.isInteger(3.5)"));
        assert!(!eval_bool("Number.isInteger('3')"));
        assert!(eval_bool("Number.isNaN(NaN)"));
        assert!(!eval_bool("Number.isNaN('NaN')"));
        assert!(eval_bool("Number.isSafeInteger(9007199254740991)"));
        assert!(!eval_bool("Number.isSafeInteger(9007199254740992)"));
    }

    #[test]
    fn to_fixed() {
        assert_eq!(eval_string("(1.005).toFixed(1)"), "1.0");
        assert_eq!(eval_string("(2.5).toFixed(0)"), "2");
        assert_eq!(eval_string("(1).toFixed(2)"), "1.00");
    }
}
