use crate::interpreter::agent::Agent;
use crate::interpreter::object::{JsFunction, ObjectKind};
use crate::interpreter::property::PropertyKey;
use crate::types::{number_ops, JsValue};

const MAX_DEPTH: usize = 3;

impl Agent {
    /// Human-readable value dump for the REPL and diagnostics. Read-only
    /// where possible: getters are not invoked, cycles are cut by depth
    /// and a seen-set.
    pub fn inspect(&self, value: &JsValue) -> String {
        let mut seen = Vec::new();
        self.inspect_inner(value, 0, &mut seen)
    }

    fn inspect_inner(&self, value: &JsValue, depth: usize, seen: &mut Vec<u64>) -> String {
        match value {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => number_ops::to_string(*n),
            JsValue::String(s) => {
                if depth == 0 {
                    s.to_rust_string()
                } else {
                    format!("'{}'", s.to_rust_string())
                }
            }
            JsValue::Symbol(s) => match &s.description {
                Some(d) => format!("Symbol({d})"),
                None => "Symbol()".to_string(),
            },
            JsValue::BigInt(b) => format!("{}n", b.value),
            JsValue::Object(o) => self.inspect_object(o.id, depth, seen),
        }
    }

    fn inspect_object(&self, id: u64, depth: usize, seen: &mut Vec<u64>) -> String {
        let Some(obj) = self.get_object(id) else {
            return "[stale object]".to_string();
        };
        if seen.contains(&id) {
            return "[Circular]".to_string();
        }
        if depth > MAX_DEPTH {
            return "[Object]".to_string();
        }
        seen.push(id);
        let data = obj.borrow();

        let rendered = if data.is_callable() {
            let name = match &data.callable {
                Some(JsFunction::User(u)) if !u.name.is_empty() => u.name.clone(),
                Some(JsFunction::Native(n)) if !n.name.is_empty() => n.name.to_string(),
                _ => String::new(),
            };
            if name.is_empty() {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {name}]")
            }
        } else if data.kind == ObjectKind::Array {
            let length = match data.properties.get(&PropertyKey::from_str("length")) {
                Some(desc) => match &desc.value {
                    Some(JsValue::Number(n)) => *n as u32,
                    _ => 0,
                },
                None => 0,
            };
            let mut parts = Vec::new();
            for i in 0..length.min(32) {
                let shown = match data.properties.get(&PropertyKey::Index(i)) {
                    Some(desc) => match &desc.value {
                        Some(v) => self.inspect_inner(v, depth + 1, seen),
                        None => "[accessor]".to_string(),
                    },
                    None => "<empty>".to_string(),
                };
                parts.push(shown);
            }
            if length > 32 {
                parts.push(format!("... {} more", length - 32));
            }
            format!("[ {} ]", parts.join(", "))
        } else if data.class_name == "Error" {
            let name = self.prototype_chain_name(&data);
            let message = data
                .properties
                .get(&PropertyKey::from_str("message"))
                .and_then(|d| d.value.clone());
            match message {
                Some(JsValue::String(m)) if !m.is_empty() => {
                    format!("{name}: {}", m.to_rust_string())
                }
                _ => name,
            }
        } else {
            let mut parts = Vec::new();
            for (key, desc) in data.properties.iter().take(16) {
                if desc.enumerable != Some(true) {
                    continue;
                }
                let shown = match &desc.value {
                    Some(v) => self.inspect_inner(v, depth + 1, seen),
                    None => "[Getter/Setter]".to_string(),
                };
                parts.push(format!("{}: {shown}", key.to_display_string()));
            }
            if parts.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", parts.join(", "))
            }
        };
        seen.pop();
        rendered
    }

    /// Find an error object's constructor name through the prototype
    /// chain's own `name` properties, without running getters.
    fn prototype_chain_name(&self, data: &crate::interpreter::object::JsObjectData) -> String {
        let mut proto = data.prototype.clone();
        while let Some(p) = proto {
            let b = p.borrow();
            if let Some(desc) = b.properties.get(&PropertyKey::from_str("name")) {
                if let Some(JsValue::String(s)) = &desc.value {
                    return s.to_rust_string();
                }
            }
            proto = b.prototype.clone();
        }
        "Error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;

    fn inspect_of(src: &str) -> String {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        match agent.evaluate_script(realm, src, "inspect.js") {
            Completion::Normal(v) => agent.inspect(&v),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn primitives() {
        assert_eq!(inspect_of("42"), "42");
        assert_eq!(inspect_of("'hi'"), "hi");
        assert_eq!(inspect_of("undefined"), "undefined");
    }

    #[test]
    fn arrays_and_objects() {
        assert_eq!(inspect_of("[1, 'two', [3]]"), "[ 1, 'two', [ 3 ] ]");
        assert_eq!(inspect_of("({ a: 1, b: { c: 2 } })"), "{ a: 1, b: { c: 2 } }");
    }

    #[test]
    fn functions_and_errors() {
        assert_eq!(inspect_of("(function foo() {})"), "[Function: foo]");
        assert_eq!(inspect_of("new TypeError('bad')"), "TypeError: bad");
    }

    #[test]
    fn cycles_are_cut() {
        let shown = inspect_of("var a = []; a.push(a); a");
        assert!(shown.contains("Circular"));
    }
}
