use super::{create_constructor, define_method, define_symbol_method};
use crate::interpreter::agent::Agent;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    // %String.prototype% is itself a String exotic wrapper of "".
    let prototype = agent.string_create(JsString::empty(), realm);
    agent.realms[realm].set_intrinsic(Intrinsic::StringPrototype, JsValue::object(prototype));
    {
        let object_prototype = agent.intrinsic(realm, Intrinsic::ObjectPrototype);
        let obj = agent.get_object(prototype).unwrap();
        obj.borrow_mut().prototype =
            object_prototype.object_id().and_then(|p| agent.get_object(p));
    }

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        Ok(JsValue::String(this_string_value(agent, this)?))
    });
    define_method(agent, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(JsValue::String(this_string_value(agent, this)?))
    });

    define_method(agent, prototype, "charAt", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let position = position_arg(agent, args.first())?;
        Ok(JsValue::String(match position {
            Some(p) if p < s.len() => s.substring(p, p + 1),
            _ => JsString::empty(),
        }))
    });

    define_method(agent, prototype, "charCodeAt", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let position = position_arg(agent, args.first())?;
        Ok(match position.and_then(|p| s.code_unit(p)) {
            Some(unit) => JsValue::Number(unit as f64),
            None => JsValue::Number(f64::NAN),
        })
    });

    define_method(agent, prototype, "codePointAt", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let Some(position) = position_arg(agent, args.first())? else {
            return Ok(JsValue::Undefined);
        };
        let Some(first) = s.code_unit(position) else {
            return Ok(JsValue::Undefined);
        };
        let code_point = if (0xD800..0xDC00).contains(&first) {
            match s.code_unit(position + 1) {
                Some(second) if (0xDC00..0xE000).contains(&second) => {
                    0x10000 + ((first as u32 - 0xD800) << 10) + (second as u32 - 0xDC00)
                }
                _ => first as u32,
            }
        } else {
            first as u32
        };
        Ok(JsValue::Number(code_point as f64))
    });

    define_method(agent, prototype, "indexOf", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let search_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let search = agent.to_string_value(&search_arg)?;
        let from = match args.get(1) {
            Some(v) => agent.to_integer_or_infinity(v)?.max(0.0) as usize,
            None => 0,
        };
        Ok(JsValue::Number(match s.index_of(&search, from) {
            Some(i) => i as f64,
            None => -1.0,
        }))
    });

    define_method(agent, prototype, "lastIndexOf", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let search_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let search = agent.to_string_value(&search_arg)?;
        Ok(JsValue::Number(match s.last_index_of(&search, s.len()) {
            Some(i) => i as f64,
            None => -1.0,
        }))
    });

    define_method(agent, prototype, "includes", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let search = search_string(agent, args.first(), "includes")?;
        Ok(JsValue::Boolean(s.index_of(&search, 0).is_some()))
    });

    define_method(agent, prototype, "startsWith", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let search = search_string(agent, args.first(), "startsWith")?;
        let from = match args.get(1) {
            Some(v) => agent.to_integer_or_infinity(v)?.max(0.0) as usize,
            None => 0,
        };
        let end = from + search.len();
        Ok(JsValue::Boolean(
            end <= s.len() && s.substring(from, end) == search,
        ))
    });

    define_method(agent, prototype, "endsWith", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let search = search_string(agent, args.first(), "endsWith")?;
        let end = match args.get(1) {
            None | Some(JsValue::Undefined) => s.len(),
            Some(v) => (agent.to_integer_or_infinity(v)?.max(0.0) as usize).min(s.len()),
        };
        if search.len() > end {
            return Ok(JsValue::Boolean(false));
        }
        let start = end - search.len();
        Ok(JsValue::Boolean(s.substring(start, end) == search))
    });

    define_method(agent, prototype, "slice", 2, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let length = s.len() as f64;
        let start = slice_index(agent, args.first(), length, 0.0)?;
        let end = slice_index(agent, args.get(1), length, length)?;
        Ok(JsValue::String(s.substring(start, end.max(start))))
    });

    define_method(agent, prototype, "substring", 2, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let length = s.len() as f64;
        let a = clamped_index(agent, args.first(), length)?;
        let b = match args.get(1) {
            None | Some(JsValue::Undefined) => length as usize,
            _ => clamped_index(agent, args.get(1), length)?,
        };
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Ok(JsValue::String(s.substring(start, end)))
    });

    define_method(agent, prototype, "toUpperCase", 0, |agent, this, _args| {
        let s = coerced_this(agent, this)?;
        Ok(JsValue::String(JsString::from_str(
            &s.to_rust_string().to_uppercase(),
        )))
    });

    define_method(agent, prototype, "toLowerCase", 0, |agent, this, _args| {
        let s = coerced_this(agent, this)?;
        Ok(JsValue::String(JsString::from_str(
            &s.to_rust_string().to_lowercase(),
        )))
    });

    define_method(agent, prototype, "trim", 0, |agent, this, _args| {
        let s = coerced_this(agent, this)?;
        Ok(JsValue::String(JsString::from_str(
            s.to_rust_string().trim(),
        )))
    });

    define_method(agent, prototype, "split", 2, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let separator = args.first().cloned().unwrap_or(JsValue::Undefined);
        if separator.is_undefined() {
            let whole = agent.create_array_from_list(&[JsValue::String(s)]);
            return Ok(whole);
        }
        let separator = agent.to_string_value(&separator)?;
        let mut parts = Vec::new();
        if separator.is_empty() {
            for i in 0..s.len() {
                parts.push(JsValue::String(s.substring(i, i + 1)));
            }
        } else {
            let mut from = 0usize;
            while let Some(found) = s.index_of(&separator, from) {
                parts.push(JsValue::String(s.substring(from, found)));
                from = found + separator.len();
            }
            parts.push(JsValue::String(s.substring(from, s.len())));
        }
        Ok(agent.create_array_from_list(&parts))
    });

    define_method(agent, prototype, "repeat", 1, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let count_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let count = agent.to_integer_or_infinity(&count_arg)?;
        if count < 0.0 || count.is_infinite() {
            return Err(agent.range_error("Invalid count value"));
        }
        let mut out = JsString::empty();
        for _ in 0..(count as usize) {
            out = out.concat(&s);
        }
        Ok(JsValue::String(out))
    });

    define_method(agent, prototype, "padStart", 1, |agent, this, args| {
        pad_string(agent, this, args, true)
    });
    define_method(agent, prototype, "padEnd", 1, |agent, this, args| {
        pad_string(agent, this, args, false)
    });

    define_method(agent, prototype, "concat", 1, |agent, this, args| {
        let mut out = coerced_this(agent, this)?;
        for arg in args {
            out = out.concat(&agent.to_string_value(arg)?);
        }
        Ok(JsValue::String(out))
    });

    // The non-regexp replace path: a plain substring search.
    define_method(agent, prototype, "replace", 2, |agent, this, args| {
        let s = coerced_this(agent, this)?;
        let pattern_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let pattern = agent.to_string_value(&pattern_arg)?;
        let replacement_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let Some(found) = s.index_of(&pattern, 0) else {
            return Ok(JsValue::String(s));
        };
        let replacement = if agent.is_callable(&replacement_arg) {
            let result = agent.call(
                &replacement_arg,
                &JsValue::Undefined,
                &[
                    JsValue::String(pattern.clone()),
                    JsValue::Number(found as f64),
                    JsValue::String(s.clone()),
                ],
            )?;
            agent.to_string_value(&result)?
        } else {
            agent.to_string_value(&replacement_arg)?
        };
        let out = s
            .substring(0, found)
            .concat(&replacement)
            .concat(&s.substring(found + pattern.len(), s.len()));
        Ok(JsValue::String(out))
    });

    let iterator_symbol = agent.well_known.iterator.clone();
    define_symbol_method(
        agent,
        prototype,
        iterator_symbol,
        "[Symbol.iterator]",
        0,
        |agent, this, _args| {
            let s = coerced_this(agent, this)?;
            Ok(agent.create_string_iterator(s))
        },
    );

    // The String constructor doubles as a conversion function.
    let ctor = create_constructor(agent, "String", 1, prototype, |agent, _this, args| {
        let value = match args.first() {
            None => JsString::empty(),
            Some(JsValue::Symbol(s)) => {
                // String(symbol) is the one legal symbol-to-string path,
                // but only when called, not constructed.
                if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
                    return Err(agent.type_error("Cannot convert a Symbol value to a string"));
                }
                let text = match &s.description {
                    Some(d) => format!("Symbol({d})"),
                    None => "Symbol()".to_string(),
                };
                JsString::from_str(&text)
            }
            Some(v) => agent.to_string_value(v)?,
        };
        if agent.native_new_target.as_ref().is_some_and(|t| !t.is_undefined()) {
            let realm = agent.current_realm();
            return Ok(JsValue::object(agent.string_create(value, realm)));
        }
        Ok(JsValue::String(value))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::StringConstructor, JsValue::object(ctor));

    define_method(agent, ctor, "fromCharCode", 1, |agent, _this, args| {
        let mut units = Vec::with_capacity(args.len());
        for arg in args {
            let n = agent.to_number(arg)?;
            units.push(crate::types::number_ops::to_uint32(n) as u16);
        }
        Ok(JsValue::String(JsString::from_units(units)))
    });
}

/// thisStringValue: primitive strings and String wrappers only.
fn this_string_value(agent: &mut Agent, this: &JsValue) -> Result<JsString, JsValue> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Object(o) => {
            let obj = agent.get_object(o.id).unwrap();
            let primitive = obj.borrow().primitive.clone();
            match primitive {
                Some(JsValue::String(s)) => Ok(s),
                _ => Err(agent.type_error("Receiver is not a String")),
            }
        }
        _ => Err(agent.type_error("Receiver is not a String")),
    }
}

/// The usual prototype-method preamble: RequireObjectCoercible then
/// ToString.
fn coerced_this(agent: &mut Agent, this: &JsValue) -> Result<JsString, JsValue> {
    agent.require_object_coercible(this)?;
    agent.to_string_value(this)
}

fn position_arg(agent: &mut Agent, value: Option<&JsValue>) -> Result<Option<usize>, JsValue> {
    let position = match value {
        Some(v) => agent.to_integer_or_infinity(v)?,
        None => 0.0,
    };
    if position < 0.0 || position.is_infinite() {
        return Ok(None);
    }
    Ok(Some(position as usize))
}

fn search_string(
    agent: &mut Agent,
    value: Option<&JsValue>,
    method: &str,
) -> Result<JsString, JsValue> {
    let value = value.cloned().unwrap_or(JsValue::Undefined);
    if value
        .object_id()
        .and_then(|id| agent.get_object(id))
        .is_some_and(|o| o.borrow().class_name == "RegExp")
    {
        return Err(agent.type_error(&format!(
            "First argument to String.prototype.{method} must not be a regular expression"
        )));
    }
    agent.to_string_value(&value)
}

fn slice_index(
    agent: &mut Agent,
    value: Option<&JsValue>,
    length: f64,
    default: f64,
) -> Result<usize, JsValue> {
    let relative = match value {
        None | Some(JsValue::Undefined) => default,
        Some(v) => agent.to_integer_or_infinity(v)?,
    };
    Ok(if relative < 0.0 {
        (length + relative).max(0.0) as usize
    } else {
        relative.min(length) as usize
    })
}

fn clamped_index(
    agent: &mut Agent,
    value: Option<&JsValue>,
    length: f64,
) -> Result<usize, JsValue> {
    let n = match value {
        None | Some(JsValue::Undefined) => 0.0,
        Some(v) => agent.to_integer_or_infinity(v)?,
    };
    Ok(n.clamp(0.0, length) as usize)
}

fn pad_string(
    agent: &mut Agent,
    this: &JsValue,
    args: &[JsValue],
    at_start: bool,
) -> Result<JsValue, JsValue> {
    let s = coerced_this(agent, this)?;
    let target_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
    let target = agent.to_length(&target_arg)? as usize;
    if target <= s.len() {
        return Ok(JsValue::String(s));
    }
    let filler = match args.get(1) {
        None | Some(JsValue::Undefined) => JsString::from_str(" "),
        Some(v) => agent.to_string_value(v)?,
    };
    if filler.is_empty() {
        return Ok(JsValue::String(s));
    }
    let mut pad = JsString::empty();
    while pad.len() < target - s.len() {
        pad = pad.concat(&filler);
    }
    let pad = pad.substring(0, target - s.len());
    Ok(JsValue::String(if at_start {
        pad.concat(&s)
    } else {
        s.concat(&pad)
    }))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "string.js")
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string from {src}, got {other:?}"),
        }
    }

    fn eval_number(src: &str) -> f64 {
        match eval(src) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number from {src}, got {other:?}"),
        }
    }

    fn eval_bool(src: &str) -> bool {
        match eval(src) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean from {src}, got {other:?}"),
        }
    }

    #[test]
    fn length_and_indexing() {
        assert_eq!(eval_number("'hello'.length"), 5.0);
        assert_eq!(eval_string("'hello'[1]"), "e");
        assert_eq!(eval_string("'hello'.charAt(4)"), "o");
        assert_eq!(eval_number("'A'.charCodeAt(0)"), 65.0);
        // Surrogate pairs count as two units but one code point.
        assert_eq!(eval_number("'\\u{1F600}'.length"), 2.0);
        assert_eq!(eval_number("'\\u{1F600}'.codePointAt(0)"), 128512.0);
    }

    #[test]
    fn searching() {
        assert_eq!(eval_number("'abcabc'.indexOf('b', 2)"), 4.0);
        assert!(eval_bool("'hello'.includes('ell')"));
        assert!(eval_bool("'hello'.startsWith('he')"));
        assert!(eval_bool("'hello'.endsWith('lo')"));
        assert!(!eval_bool("'hello'.startsWith('e')"));
    }

    #[test]
    fn slicing_and_case() {
        assert_eq!(eval_string("'abcdef'.slice(1, -1)"), "bcde");
        assert_eq!(eval_string("'abcdef'.substring(4, 2)"), "cd");
        assert_eq!(eval_string("'aBc'.toUpperCase()"), "ABC");
        assert_eq!(eval_string("'  x  '.trim()"), "x");
    }

    #[test]
    fn split_and_join_roundtrip() {
        assert_eq!(eval_string("'a,b,c'.split(',').join('|')"), "a|b|c");
        assert_eq!(eval_number("'abc'.split('').length"), 3.0);
        assert_eq!(eval_number("'abc'.split(undefined).length"), 1.0);
    }

    #[test]
    fn repeat_and_pad() {
        assert_eq!(eval_string("'ab'.repeat(3)"), "ababab");
        assert_eq!(eval_string("'5'.padStart(3, '0')"), "005");
        assert_eq!(eval_string("'5'.padEnd(3)"), "5  ");
        assert!(eval_bool(
            "try { 'x'.repeat(-1); false } catch (e) { e instanceof RangeError }"
        ));
    }

    #[test]
    fn replace_without_regexp() {
        assert_eq!(eval_string("'a-b-c'.replace('-', '+')"), "a+b-c");
        assert_eq!(
            eval_string("'hello'.replace('ll', function (m) { return m.toUpperCase(); })"),
            "heLLo"
        );
    }

    #[test]
    fn wrapper_objects() {
        assert_eq!(eval_string("new String('boxed').valueOf()"), "boxed");
        assert_eq!(eval_number("new String('abc').length"), 3.0);
        assert_eq!(eval_string("typeof new String('x')"), "object");
        assert_eq!(eval_string("typeof String('x')"), "string");
    }
}
