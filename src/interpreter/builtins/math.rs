use super::{define_method, define_to_string_tag, define_value};
use crate::interpreter::agent::Agent;
use crate::interpreter::realm::Intrinsic;
use crate::types::JsValue;

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let math = agent.create_ordinary_object(realm);
    agent.realms[realm].set_intrinsic(Intrinsic::Math, JsValue::object(math));
    define_to_string_tag(agent, math, "Math");

    define_value(agent, math, "PI", JsValue::Number(std::f64::consts::PI), false, false, false);
    define_value(agent, math, "E", JsValue::Number(std::f64::consts::E), false, false, false);
    define_value(agent, math, "LN2", JsValue::Number(std::f64::consts::LN_2), false, false, false);
    define_value(agent, math, "LN10", JsValue::Number(std::f64::consts::LN_10), false, false, false);
    define_value(agent, math, "SQRT2", JsValue::Number(std::f64::consts::SQRT_2), false, false, false);

    // The one-argument value-level methods share a single shape.
    macro_rules! unary {
        ($name:literal, $op:expr) => {
            define_method(agent, math, $name, 1, move |agent, _this, args| {
                let n = agent.to_number(&args.first().cloned().unwrap_or(JsValue::Undefined))?;
                let f: fn(f64) -> f64 = $op;
                Ok(JsValue::Number(f(n)))
            });
        };
    }
    unary!("abs", f64::abs);
    unary!("floor", f64::floor);
    unary!("ceil", f64::ceil);
    unary!("trunc", f64::trunc);
    unary!("sqrt", f64::sqrt);
    unary!("cbrt", f64::cbrt);
    unary!("sin", f64::sin);
    unary!("cos", f64::cos);
    unary!("tan", f64::tan);
    unary!("asin", f64::asin);
    unary!("acos", f64::acos);
    unary!("atan", f64::atan);
    unary!("exp", f64::exp);
    unary!("log", f64::ln);
    unary!("log2", f64::log2);
    unary!("log10", f64::log10);
    unary!("sign", |n: f64| {
        if n.is_nan() || n == 0.0 {
            n
        } else if n > 0.0 {
            1.0
        } else {
            -1.0
        }
    });
    // Math.round halves round toward +∞, unlike f64::round.
    unary!("round", |n: f64| {
        if n.is_nan() || n.is_infinite() || n == 0.0 {
            n
        } else {
            (n + 0.5).floor()
        }
    });

    define_method(agent, math, "max", 2, |agent, _this, args| {
        let mut result = f64::NEG_INFINITY;
        for arg in args {
            let n = agent.to_number(arg)?;
            if n.is_nan() {
                return Ok(JsValue::Number(f64::NAN));
            }
            if n > result || (n == 0.0 && result == 0.0 && n.is_sign_positive()) {
                result = n;
            }
        }
        Ok(JsValue::Number(result))
    });

    define_method(agent, math, "min", 2, |agent, _this, args| {
        let mut result = f64::INFINITY;
        for arg in args {
            let n = agent.to_number(arg)?;
            if n.is_nan() {
                return Ok(JsValue::Number(f64::NAN));
            }
            if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
                result = n;
            }
        }
        Ok(JsValue::Number(result))
    });

    define_method(agent, math, "pow", 2, |agent, _this, args| {
        let base = agent.to_number(&args.first().cloned().unwrap_or(JsValue::Undefined))?;
        let exp = agent.to_number(&args.get(1).cloned().unwrap_or(JsValue::Undefined))?;
        Ok(JsValue::Number(base.powf(exp)))
    });

    define_method(agent, math, "atan2", 2, |agent, _this, args| {
        let y = agent.to_number(&args.first().cloned().unwrap_or(JsValue::Undefined))?;
        let x = agent.to_number(&args.get(1).cloned().unwrap_or(JsValue::Undefined))?;
        Ok(JsValue::Number(y.atan2(x)))
    });

    define_method(agent, math, "hypot", 2, |agent, _this, args| {
        let mut sum = 0.0f64;
        for arg in args {
            let n = agent.to_number(arg)?;
            sum += n * n;
        }
        Ok(JsValue::Number(sum.sqrt()))
    });

    // A linear congruential generator is enough for Math.random; the
    // engine has no ambient entropy source.
    let seed = std::cell::Cell::new(0x2545F4914F6CDD1Du64);
    define_method(agent, math, "random", 0, move |_agent, _this, _args| {
        let mut x = seed.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        seed.set(x);
        Ok(JsValue::Number((x >> 11) as f64 / (1u64 << 53) as f64))
    });
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_number(src: &str) -> f64 {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "math.js") {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn rounding_family() {
        assert_eq!(eval_number("Math.floor(-1.5)"), -2.0);
        assert_eq!(eval_number("Math.ceil(-1.5)"), -1.0);
        assert_eq!(eval_number("Math.trunc(-1.5)"), -1.0);
        // Halves round toward positive infinity.
        assert_eq!(eval_number("Math.round(-1.5)"), -1.0);
        assert_eq!(eval_number("Math.round(2.5)"), 3.0);
    }

    #[test]
    fn min_max() {
        assert_eq!(eval_number("Math.max(1, 2, 3)"), 3.0);
        assert_eq!(eval_number("Math.min()"), f64::INFINITY);
        assert!(eval_number("Math.max(1, NaN)").is_nan());
    }

    #[test]
    fn coerces_arguments() {
        assert_eq!(eval_number("Math.abs('-3')"), 3.0);
        assert_eq!(eval_number("Math.pow('2', '10')"), 1024.0);
    }

    #[test]
    fn random_in_range() {
        assert_eq!(
            eval_number(
                "var ok = 0;\n\
                 for (var i = 0; i < 100; i++) { var r = Math.random(); if (r >= 0 && r < 1) ok++; }\n\
                 ok"
            ),
            100.0
        );
    }
}
