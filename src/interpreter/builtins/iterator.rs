use super::{define_method, define_symbol_method, define_to_string_tag};
use crate::interpreter::agent::Agent;
use crate::interpreter::completion::Completion;
use crate::interpreter::object::{ArrayIterationKind, IteratorData};
use crate::interpreter::property::PropertyKey;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

/// %IteratorPrototype%, the array/string iterator prototypes, and the
/// generator prototypes (§27.1, §27.5).
pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let iterator_prototype = super::new_prototype_object(agent, realm);
    agent.realms[realm].set_intrinsic(
        Intrinsic::IteratorPrototype,
        JsValue::object(iterator_prototype),
    );
    let iterator_symbol = agent.well_known.iterator.clone();
    define_symbol_method(
        agent,
        iterator_prototype,
        iterator_symbol,
        "[Symbol.iterator]",
        0,
        |_agent, this, _args| Ok(this.clone()),
    );

    // %ArrayIteratorPrototype%.
    let array_iterator_prototype = agent.object_create(Some(iterator_prototype), realm);
    agent.realms[realm].set_intrinsic(
        Intrinsic::ArrayIteratorPrototype,
        JsValue::object(array_iterator_prototype),
    );
    define_to_string_tag(agent, array_iterator_prototype, "Array Iterator");
    define_method(agent, array_iterator_prototype, "next", 0, |agent, this, _args| {
        array_iterator_next(agent, this)
    });

    // %StringIteratorPrototype%.
    let string_iterator_prototype = agent.object_create(Some(iterator_prototype), realm);
    agent.realms[realm].set_intrinsic(
        Intrinsic::StringIteratorPrototype,
        JsValue::object(string_iterator_prototype),
    );
    define_to_string_tag(agent, string_iterator_prototype, "String Iterator");
    define_method(agent, string_iterator_prototype, "next", 0, |agent, this, _args| {
        string_iterator_next(agent, this)
    });

    // %GeneratorPrototype% with next/return/throw.
    let generator_prototype = agent.object_create(Some(iterator_prototype), realm);
    agent.realms[realm].set_intrinsic(
        Intrinsic::GeneratorPrototype,
        JsValue::object(generator_prototype),
    );
    define_to_string_tag(agent, generator_prototype, "Generator");
    define_method(agent, generator_prototype, "next", 1, |agent, this, args| {
        let Some(id) = this.object_id() else {
            return Err(agent.type_error("Generator.prototype.next called on non-object"));
        };
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.generator_resume(id, Completion::Normal(value))
    });
    define_method(agent, generator_prototype, "return", 1, |agent, this, args| {
        let Some(id) = this.object_id() else {
            return Err(agent.type_error("Generator.prototype.return called on non-object"));
        };
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.generator_resume(id, Completion::Return(value))
    });
    define_method(agent, generator_prototype, "throw", 1, |agent, this, args| {
        let Some(id) = this.object_id() else {
            return Err(agent.type_error("Generator.prototype.throw called on non-object"));
        };
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.generator_resume(id, Completion::Throw(value))
    });

    // %AsyncGeneratorPrototype%: the same surface, returning promises.
    let async_generator_prototype = agent.object_create(Some(iterator_prototype), realm);
    agent.realms[realm].set_intrinsic(
        Intrinsic::AsyncGeneratorPrototype,
        JsValue::object(async_generator_prototype),
    );
    define_to_string_tag(agent, async_generator_prototype, "AsyncGenerator");
    let async_iterator_symbol = agent.well_known.async_iterator.clone();
    define_symbol_method(
        agent,
        async_generator_prototype,
        async_iterator_symbol,
        "[Symbol.asyncIterator]",
        0,
        |_agent, this, _args| Ok(this.clone()),
    );
    define_method(agent, async_generator_prototype, "next", 1, |agent, this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.async_generator_enqueue(this, Completion::Normal(value))
    });
    define_method(agent, async_generator_prototype, "return", 1, |agent, this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.async_generator_enqueue(this, Completion::Return(value))
    });
    define_method(agent, async_generator_prototype, "throw", 1, |agent, this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.async_generator_enqueue(this, Completion::Throw(value))
    });
}

impl Agent {
    /// CreateArrayIterator (§23.1.5.1).
    pub fn create_array_iterator(&mut self, target: u64, kind: ArrayIterationKind) -> JsValue {
        let realm = self.current_realm();
        let proto = self.intrinsic(realm, Intrinsic::ArrayIteratorPrototype);
        let id = self.object_create(proto.object_id(), realm);
        let obj = self.get_object(id).unwrap();
        obj.borrow_mut().iterator = Some(IteratorData::Array {
            target,
            index: 0,
            kind,
            done: false,
        });
        JsValue::object(id)
    }

    /// CreateStringIterator (§22.1.5.1).
    pub fn create_string_iterator(&mut self, string: JsString) -> JsValue {
        let realm = self.current_realm();
        let proto = self.intrinsic(realm, Intrinsic::StringIteratorPrototype);
        let id = self.object_create(proto.object_id(), realm);
        let obj = self.get_object(id).unwrap();
        obj.borrow_mut().iterator = Some(IteratorData::String {
            string,
            position: 0,
        });
        JsValue::object(id)
    }
}

fn array_iterator_next(agent: &mut Agent, this: &JsValue) -> Result<JsValue, JsValue> {
    let Some(id) = this.object_id() else {
        return Err(agent.type_error("Array iterator next called on incompatible receiver"));
    };
    let obj = agent
        .get_object(id)
        .ok_or_else(|| agent.type_error("stale iterator"))?;
    let (target, index, kind, done) = {
        let data = obj.borrow();
        match &data.iterator {
            Some(IteratorData::Array {
                target,
                index,
                kind,
                done,
            }) => (*target, *index, *kind, *done),
            _ => {
                drop(data);
                return Err(
                    agent.type_error("Array iterator next called on incompatible receiver")
                );
            }
        }
    };
    if done {
        return Ok(agent.create_iter_result_object(JsValue::Undefined, true));
    }

    // Length is re-read every step (Get then ToLength), so growth and
    // truncation during iteration are observable.
    let target_value = JsValue::object(target);
    let length_value = agent.get(&target_value, &PropertyKey::from_str("length"))?;
    let length = agent.to_length(&length_value)?;
    if (index as u64) >= length {
        obj.borrow_mut().iterator = Some(IteratorData::Array {
            target,
            index,
            kind,
            done: true,
        });
        return Ok(agent.create_iter_result_object(JsValue::Undefined, true));
    }
    obj.borrow_mut().iterator = Some(IteratorData::Array {
        target,
        index: index + 1,
        kind,
        done: false,
    });
    let result = match kind {
        ArrayIterationKind::Key => JsValue::Number(index as f64),
        ArrayIterationKind::Value => {
            agent.get(&target_value, &PropertyKey::Index(index))?
        }
        ArrayIterationKind::KeyValue => {
            let value = agent.get(&target_value, &PropertyKey::Index(index))?;
            agent.create_array_from_list(&[JsValue::Number(index as f64), value])
        }
    };
    Ok(agent.create_iter_result_object(result, false))
}

/// Steps by code points: surrogate pairs come out as one string.
fn string_iterator_next(agent: &mut Agent, this: &JsValue) -> Result<JsValue, JsValue> {
    let Some(id) = this.object_id() else {
        return Err(agent.type_error("String iterator next called on incompatible receiver"));
    };
    let obj = agent
        .get_object(id)
        .ok_or_else(|| agent.type_error("stale iterator"))?;
    let (string, position) = {
        let data = obj.borrow();
        match &data.iterator {
            Some(IteratorData::String { string, position }) => (string.clone(), *position),
            _ => {
                drop(data);
                return Err(
                    agent.type_error("String iterator next called on incompatible receiver")
                );
            }
        }
    };
    if position >= string.len() {
        return Ok(agent.create_iter_result_object(JsValue::Undefined, true));
    }
    let first = string.code_unit(position).unwrap();
    let pair_length = if (0xD800..0xDC00).contains(&first)
        && string
            .code_unit(position + 1)
            .is_some_and(|u| (0xDC00..0xE000).contains(&u))
    {
        2
    } else {
        1
    };
    let chunk = string.substring(position, position + pair_length);
    obj.borrow_mut().iterator = Some(IteratorData::String {
        string,
        position: position + pair_length,
    });
    Ok(agent.create_iter_result_object(JsValue::String(chunk), false))
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "iter.js")
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string, got {other:?}"),
        }
    }

    fn eval_number(src: &str) -> f64 {
        match eval(src) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn for_of_over_arrays_and_strings() {
        assert_eq!(
            eval_string("var out = []; for (var v of [1, 2, 3]) out.push(v); out.join('-')"),
            "1-2-3"
        );
        assert_eq!(
            eval_string("var out = []; for (var c of 'héllo') out.push(c); out.join('')"),
            "héllo"
        );
    }

    #[test]
    fn manual_iterator_protocol_matches_for_of() {
        assert_eq!(
            eval_string(
                "var it = [10, 20][Symbol.iterator]();\n\
                 var a = it.next(), b = it.next(), c = it.next();\n\
                 [a.value, a.done, b.value, b.done, c.value, c.done].join(',')"
            ),
            "10,false,20,false,,true"
        );
    }

    #[test]
    fn generators_yield_and_resume() {
        assert_eq!(
            eval_string(
                "function* gen() { var got = yield 1; yield got + 1; }\n\
                 var g = gen();\n\
                 var a = g.next();\n\
                 var b = g.next(10);\n\
                 var c = g.next();\n\
                 [a.value, b.value, c.done].join(',')"
            ),
            "1,11,true"
        );
    }

    #[test]
    fn generator_return_and_throw() {
        assert_eq!(
            eval_string(
                "function* gen() { yield 1; yield 2; }\n\
                 var g = gen();\n\
                 g.next();\n\
                 var r = g.return(42);\n\
                 [r.value, r.done, g.next().done].join(',')"
            ),
            "42,true,true"
        );
        assert_eq!(
            eval_string(
                "function* gen() { try { yield 1; } catch (e) { yield 'caught:' + e; } }\n\
                 var g = gen();\n\
                 g.next();\n\
                 g.throw('boom').value"
            ),
            "caught:boom"
        );
    }

    #[test]
    fn yield_delegation() {
        assert_eq!(
            eval_string(
                "function* inner() { yield 'a'; yield 'b'; return 'r'; }\n\
                 function* outer() { var got = yield* inner(); yield got; }\n\
                 var out = [];\n\
                 for (var v of outer()) out.push(v);\n\
                 out.join(',')"
            ),
            "a,b,r"
        );
    }

    #[test]
    fn early_break_closes_iterator() {
        assert_eq!(
            eval_number(
                "var closed = 0;\n\
                 var iterable = {};\n\
                 iterable[Symbol.iterator] = function () {\n\
                   var n = 0;\n\
                   return {\n\
                     next: function () { return { value: n++, done: false }; },\n\
                     return: function () { closed++; return { done: true }; }\n\
                   };\n\
                 };\n\
                 for (var v of iterable) { if (v === 2) break; }\n\
                 closed"
            ),
            1.0
        );
    }

    #[test]
    fn generator_length_and_spread() {
        assert_eq!(
            eval_number("function* g() { yield 1; yield 2; } [...g()].length"),
            2.0
        );
    }
}
