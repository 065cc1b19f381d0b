use super::{define_method, define_value, new_prototype_object};
use crate::interpreter::agent::Agent;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

/// %ThrowTypeError%: a frozen function whose only job is to throw.
pub(super) fn create_throw_type_error(agent: &mut Agent, realm: usize) {
    let thrower = agent.create_native_function("", 0, false, |agent, _this, _args| {
        Err(agent.type_error(
            "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
        ))
    });
    if let Some(id) = thrower.object_id() {
        agent.get_object(id).unwrap().borrow_mut().extensible = false;
    }
    agent.realms[realm].set_intrinsic(Intrinsic::ThrowTypeError, thrower);
}

/// %RegExp.prototype% for the inert regexp-literal objects.
pub(super) fn setup_regexp_prototype(agent: &mut Agent, realm: usize) {
    let prototype = new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::RegExpPrototype, JsValue::object(prototype));
    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let source = agent.get_value_of(this, "source")?;
        let flags = agent.get_value_of(this, "flags")?;
        let source = agent.to_string_value(&source)?;
        let flags = agent.to_string_value(&flags)?;
        Ok(JsValue::String(JsString::from_str(&format!(
            "/{source}/{flags}"
        ))))
    });
}

/// The default global bindings (§9.3.4 and §19).
pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let global = agent.realms[realm].global_object;

    define_value(
        agent,
        global,
        "globalThis",
        JsValue::object(global),
        true,
        false,
        true,
    );
    define_value(agent, global, "undefined", JsValue::Undefined, false, false, false);
    define_value(agent, global, "NaN", JsValue::Number(f64::NAN), false, false, false);
    define_value(
        agent,
        global,
        "Infinity",
        JsValue::Number(f64::INFINITY),
        false,
        false,
        false,
    );

    for (name, intrinsic) in [
        ("Object", Intrinsic::ObjectConstructor),
        ("Function", Intrinsic::FunctionConstructor),
        ("Array", Intrinsic::ArrayConstructor),
        ("String", Intrinsic::StringConstructor),
        ("Number", Intrinsic::NumberConstructor),
        ("Boolean", Intrinsic::BooleanConstructor),
        ("Symbol", Intrinsic::SymbolConstructor),
        ("BigInt", Intrinsic::BigIntConstructor),
        ("Error", Intrinsic::ErrorConstructor),
        ("TypeError", Intrinsic::TypeErrorConstructor),
        ("RangeError", Intrinsic::RangeErrorConstructor),
        ("ReferenceError", Intrinsic::ReferenceErrorConstructor),
        ("SyntaxError", Intrinsic::SyntaxErrorConstructor),
        ("URIError", Intrinsic::UriErrorConstructor),
        ("EvalError", Intrinsic::EvalErrorConstructor),
        ("Promise", Intrinsic::PromiseConstructor),
        ("Proxy", Intrinsic::ProxyConstructor),
        ("Math", Intrinsic::Math),
        ("JSON", Intrinsic::Json),
        ("Reflect", Intrinsic::Reflect),
    ] {
        let value = agent.intrinsic(realm, intrinsic);
        define_value(agent, global, name, value, true, false, true);
    }

    define_method(agent, global, "parseInt", 2, |agent, _this, args| {
        let input = args.first().cloned().unwrap_or(JsValue::Undefined);
        let text = agent.to_string_value(&input)?.to_rust_string();
        let radix_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let mut radix = agent.to_int32(&radix_arg)?;
        let trimmed = text.trim_start();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let digits = if (radix == 16 || radix == 0)
            && (digits.starts_with("0x") || digits.starts_with("0X"))
        {
            radix = 16;
            &digits[2..]
        } else {
            if radix == 0 {
                radix = 10;
            }
            digits
        };
        if !(2..=36).contains(&radix) {
            return Ok(JsValue::Number(f64::NAN));
        }
        let mut value = 0.0f64;
        let mut any = false;
        for c in digits.chars() {
            match c.to_digit(radix as u32) {
                Some(d) => {
                    value = value * radix as f64 + d as f64;
                    any = true;
                }
                None => break,
            }
        }
        if !any {
            return Ok(JsValue::Number(f64::NAN));
        }
        Ok(JsValue::Number(if negative { -value } else { value }))
    });

    define_method(agent, global, "parseFloat", 1, |agent, _this, args| {
        let input = args.first().cloned().unwrap_or(JsValue::Undefined);
        let text = agent.to_string_value(&input)?.to_rust_string();
        let trimmed = text.trim_start();
        // Longest prefix that parses as a decimal literal.
        let mut end = 0;
        let bytes = trimmed.as_bytes();
        let mut seen_dot = false;
        let mut seen_exp = false;
        let mut i = 0;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if trimmed[i..].starts_with("Infinity") {
            let value = if bytes.first() == Some(&b'-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            };
            return Ok(JsValue::Number(value));
        }
        while i < bytes.len() {
            match bytes[i] {
                b'0'..=b'9' => end = i + 1,
                b'.' if !seen_dot && !seen_exp => seen_dot = true,
                b'e' | b'E' if !seen_exp && end > 0 => {
                    seen_exp = true;
                    if i + 1 < bytes.len() && (bytes[i + 1] == b'+' || bytes[i + 1] == b'-') {
                        i += 1;
                    }
                }
                _ => break,
            }
            i += 1;
        }
        Ok(JsValue::Number(
            trimmed[..end.max(0)]
                .parse::<f64>()
                .unwrap_or(f64::NAN),
        ))
    });

    // Number.parseInt / Number.parseFloat are the same function objects
    // as the global ones.
    let number_ctor = agent
        .intrinsic(realm, Intrinsic::NumberConstructor)
        .object_id()
        .unwrap();
    let global_value = agent.global(realm);
    for name in ["parseInt", "parseFloat"] {
        let func = agent
            .get_value_of(&global_value, name)
            .unwrap_or(JsValue::Undefined);
        define_value(agent, number_ctor, name, func, true, false, true);
    }

    define_method(agent, global, "isNaN", 1, |agent, _this, args| {
        let n = agent.to_number(&args.first().cloned().unwrap_or(JsValue::Undefined))?;
        Ok(JsValue::Boolean(n.is_nan()))
    });

    define_method(agent, global, "isFinite", 1, |agent, _this, args| {
        let n = agent.to_number(&args.first().cloned().unwrap_or(JsValue::Undefined))?;
        Ok(JsValue::Boolean(n.is_finite()))
    });

    define_method(agent, global, "encodeURI", 1, |agent, _this, args| {
        encode_uri(agent, args, ";/?:@&=+$,#-_.!~*'()abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789")
    });
    define_method(agent, global, "encodeURIComponent", 1, |agent, _this, args| {
        encode_uri(agent, args, "-_.!~*'()abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789")
    });
    define_method(agent, global, "decodeURI", 1, |agent, _this, args| {
        decode_uri(agent, args, ";/?:@&=+$,#")
    });
    define_method(agent, global, "decodeURIComponent", 1, |agent, _this, args| {
        decode_uri(agent, args, "")
    });

    define_method(agent, global, "print", 1, |agent, _this, args| {
        let parts: Vec<String> = args.iter().map(|v| agent.inspect(v)).collect();
        println!("{}", parts.join(" "));
        Ok(JsValue::Undefined)
    });

    // A minimal console host object: log/error.
    let console = agent.create_ordinary_object(realm);
    define_method(agent, console, "log", 0, |agent, _this, args| {
        let parts: Vec<String> = args.iter().map(|v| agent.inspect(v)).collect();
        println!("{}", parts.join(" "));
        Ok(JsValue::Undefined)
    });
    define_method(agent, console, "error", 0, |agent, _this, args| {
        let parts: Vec<String> = args.iter().map(|v| agent.inspect(v)).collect();
        eprintln!("{}", parts.join(" "));
        Ok(JsValue::Undefined)
    });
    define_value(agent, global, "console", JsValue::object(console), true, false, true);
}

/// Encode (§19.2.6.1.1): percent-encode UTF-8 bytes of code points not
/// in `unreserved`; lone surrogates are a URIError.
fn encode_uri(agent: &mut Agent, args: &[JsValue], unreserved: &str) -> Result<JsValue, JsValue> {
    let input = args.first().cloned().unwrap_or(JsValue::Undefined);
    let s = agent.to_string_value(&input)?;
    let mut out = String::new();
    let mut units = s.units().iter().peekable();
    while let Some(&unit) = units.next() {
        let code_point = if (0xD800..0xDC00).contains(&unit) {
            match units.peek() {
                Some(&&next) if (0xDC00..0xE000).contains(&next) => {
                    units.next();
                    0x10000 + ((unit as u32 - 0xD800) << 10) + (next as u32 - 0xDC00)
                }
                _ => return Err(agent.uri_error("URI malformed")),
            }
        } else if (0xDC00..0xE000).contains(&unit) {
            return Err(agent.uri_error("URI malformed"));
        } else {
            unit as u32
        };
        let c = char::from_u32(code_point).ok_or_else(|| agent.uri_error("URI malformed"))?;
        if c.is_ascii() && unreserved.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    Ok(JsValue::String(JsString::from_str(&out)))
}

/// Decode (§19.2.6.1.2); `reserved` percent-escapes stay encoded.
fn decode_uri(agent: &mut Agent, args: &[JsValue], reserved: &str) -> Result<JsValue, JsValue> {
    let input = args.first().cloned().unwrap_or(JsValue::Undefined);
    let s = agent.to_string_value(&input)?.to_rust_string();
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        if i + 3 > bytes.len() {
            return Err(agent.uri_error("URI malformed"));
        }
        let hex = s
            .get(i + 1..i + 3)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| agent.uri_error("URI malformed"))?;
        if hex.is_ascii() && reserved.contains(hex as char) {
            out.extend_from_slice(&bytes[i..i + 3]);
        } else {
            out.push(hex);
        }
        i += 3;
    }
    match String::from_utf8(out) {
        Ok(decoded) => Ok(JsValue::String(JsString::from_str(&decoded))),
        Err(_) => Err(agent.uri_error("URI malformed")),
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "global.js")
    }

    fn eval_number(src: &str) -> f64 {
        match eval(src) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
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
    fn parse_int_radices() {
        assert_eq!(eval_number("parseInt('42')"), 42.0);
        assert_eq!(eval_number("parseInt('0xff')"), 255.0);
        assert_eq!(eval_number("parseInt('101', 2)"), 5.0);
        assert_eq!(eval_number("parseInt('  -7abc')"), -7.0);
        assert!(eval_number("parseInt('zzz')").is_nan());
    }

    #[test]
    fn parse_float_prefixes() {
        assert_eq!(eval_number("parseFloat('3.14xyz')"), 3.14);
        assert_eq!(eval_number("parseFloat('1e3')"), 1000.0);
        assert_eq!(eval_number("parseFloat('-Infinity')"), f64::NEG_INFINITY);
        assert!(eval_number("parseFloat('x')").is_nan());
    }

    #[test]
    fn global_is_nan_coerces() {
        assert!(eval_bool("isNaN('not a number')"));
        assert!(!eval_bool("isNaN('12')"));
        assert!(!eval_bool("Number.isNaN('not a number')"));
    }

    #[test]
    fn uri_round_trip() {
        assert_eq!(
            eval_string("encodeURIComponent('a b&c=é')"),
            "a%20b%26c%3D%C3%A9"
        );
        assert_eq!(
            eval_string("decodeURIComponent('a%20b%26c%3D%C3%A9')"),
            "a b&c=é"
        );
        // encodeURI keeps reserved separators intact.
        assert_eq!(
            eval_string("encodeURI('http://x/y?a=1 2')"),
            "http://x/y?a=1%202"
        );
    }

    #[test]
    fn malformed_uri_throws() {
        assert!(eval_bool(
            "try { decodeURIComponent('%E0%A4%A'); false } catch (e) { e instanceof URIError }"
        ));
        assert!(eval_bool(
            "try { encodeURI('\\uD800'); false } catch (e) { e instanceof URIError }"
        ));
    }

    #[test]
    fn global_this_self_reference() {
        assert!(eval_bool("globalThis.globalThis === globalThis"));
        assert!(eval_bool("var x = 9; globalThis.x === 9"));
    }
}
