use super::{create_constructor, define_method, define_symbol_method};
use crate::interpreter::agent::Agent;
use crate::interpreter::object::JsFunction;
use crate::interpreter::realm::Intrinsic;
use crate::types::{JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = agent
        .intrinsic(realm, Intrinsic::FunctionPrototype)
        .object_id()
        .unwrap();

    define_method(agent, prototype, "call", 1, |agent, this, args| {
        if !agent.is_callable(this) {
            return Err(agent.type_error("Function.prototype.call called on non-callable"));
        }
        let this_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        agent.call(this, &this_arg, args.get(1..).unwrap_or(&[]))
    });

    define_method(agent, prototype, "apply", 2, |agent, this, args| {
        if !agent.is_callable(this) {
            return Err(agent.type_error("Function.prototype.apply called on non-callable"));
        }
        let this_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let arg_list = match args.get(1) {
            None | Some(JsValue::Undefined) | Some(JsValue::Null) => Vec::new(),
            Some(list) => agent.create_list_from_array_like(list)?,
        };
        agent.call(this, &this_arg, &arg_list)
    });

    define_method(agent, prototype, "bind", 1, |agent, this, args| {
        let Some(target) = this.object_id().filter(|_| agent.is_callable(this)) else {
            return Err(agent.type_error("Function.prototype.bind called on non-callable"));
        };
        let bound_this = args.first().cloned().unwrap_or(JsValue::Undefined);
        let bound_args = args.get(1..).unwrap_or(&[]).to_vec();
        agent.bound_function_create(target, bound_this, bound_args)
    });

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let Some(id) = this.object_id().filter(|_| agent.is_callable(this)) else {
            return Err(agent.type_error("Function.prototype.toString called on non-callable"));
        };
        let obj = agent.get_object(id).unwrap();
        let text = {
            let data = obj.borrow();
            match &data.callable {
                Some(JsFunction::Native(n)) => {
                    format!("function {}() {{ [native code] }}", n.name)
                }
                Some(JsFunction::User(u)) => format!("function {}() {{ ... }}", u.name),
                None => "function () { [native code] }".to_string(),
            }
        };
        Ok(JsValue::String(JsString::from_str(&text)))
    });

    let has_instance = agent.well_known.has_instance.clone();
    define_symbol_method(
        agent,
        prototype,
        has_instance,
        "[Symbol.hasInstance]",
        1,
        |agent, this, args| {
            let value = args.first().cloned().unwrap_or(JsValue::Undefined);
            Ok(JsValue::Boolean(agent.ordinary_has_instance(this, &value)?))
        },
    );

    // The Function constructor would compile source text; dynamic code
    // creation is outside this engine's surface.
    let ctor = create_constructor(agent, "Function", 1, prototype, |agent, _this, _args| {
        Err(agent.type_error("Function constructor source compilation is not supported"))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::FunctionConstructor, JsValue::object(ctor));
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval_number(src: &str) -> f64 {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "fn.js") {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn call_and_apply() {
        assert_eq!(
            eval_number("function f(a, b) { return this.base + a + b; } f.call({ base: 10 }, 1, 2)"),
            13.0
        );
        assert_eq!(
            eval_number("function f(a, b) { return a * b; } f.apply(null, [3, 4])"),
            12.0
        );
    }

    #[test]
    fn bind_prepends_arguments() {
        assert_eq!(
            eval_number(
                "function f(a, b, c) { return this.k + a + b + c; }\n\
                 var g = f.bind({ k: 100 }, 1, 2);\n\
                 g(3)"
            ),
            106.0
        );
        assert_eq!(eval_number("function f(a, b, c) {} f.bind(null, 1).length"), 2.0);
    }

    #[test]
    fn bound_functions_construct_through_target() {
        assert_eq!(
            eval_number(
                "function Point(x, y) { this.x = x; this.y = y; }\n\
                 var P = Point.bind(null, 5);\n\
                 new P(7).x + new P(7).y"
            ),
            12.0
        );
    }
}
