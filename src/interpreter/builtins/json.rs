use super::{define_method, define_to_string_tag};
use crate::interpreter::agent::Agent;
use crate::interpreter::property::PropertyKey;
use crate::interpreter::realm::Intrinsic;
use crate::types::{number_ops, JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let json = agent.create_ordinary_object(realm);
    agent.realms[realm].set_intrinsic(Intrinsic::Json, JsValue::object(json));
    define_to_string_tag(agent, json, "JSON");

    define_method(agent, json, "parse", 2, |agent, _this, args| {
        let text_arg = args.first().cloned().unwrap_or(JsValue::Undefined);
        let text = agent.to_string_value(&text_arg)?.to_rust_string();
        let mut parser = JsonParser::new(&text);
        let value = parser.parse_value(agent)?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(agent.syntax_error("Unexpected token after JSON value"));
        }
        let reviver = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        if agent.is_callable(&reviver) {
            let realm = agent.current_realm();
            let holder = agent.create_ordinary_object(realm);
            agent.create_data_property_or_throw(holder, &PropertyKey::from_str(""), value)?;
            return internalize(agent, holder, &PropertyKey::from_str(""), &reviver);
        }
        Ok(value)
    });

    define_method(agent, json, "stringify", 3, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let replacer = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let space = args.get(2).cloned().unwrap_or(JsValue::Undefined);

        // The replacer may be a function or a key allowlist.
        let (replacer_fn, property_list) = if agent.is_callable(&replacer) {
            (Some(replacer), None)
        } else if agent.is_array(&replacer)? {
            let items = agent.create_list_from_array_like(&replacer)?;
            let mut list: Vec<String> = Vec::new();
            for item in items {
                let key = match &item {
                    JsValue::String(s) => Some(s.to_rust_string()),
                    JsValue::Number(n) => Some(number_ops::to_string(*n)),
                    JsValue::Object(_) => {
                        let s = agent.to_string_value(&item)?;
                        Some(s.to_rust_string())
                    }
                    _ => None,
                };
                if let Some(key) = key {
                    if !list.contains(&key) {
                        list.push(key);
                    }
                }
            }
            (None, Some(list))
        } else {
            (None, None)
        };

        let gap = match &space {
            JsValue::Number(n) => {
                let count = (n.trunc() as i64).clamp(0, 10) as usize;
                " ".repeat(count)
            }
            JsValue::String(s) => {
                let text = s.to_rust_string();
                text.chars().take(10).collect()
            }
            JsValue::Object(o) => {
                let primitive = agent.get_object(o.id).and_then(|obj| obj.borrow().primitive.clone());
                match primitive {
                    Some(JsValue::Number(n)) => " ".repeat((n.trunc() as i64).clamp(0, 10) as usize),
                    Some(JsValue::String(s)) => s.to_rust_string().chars().take(10).collect(),
                    _ => String::new(),
                }
            }
            _ => String::new(),
        };

        let mut serializer = JsonSerializer {
            replacer: replacer_fn,
            property_list,
            gap,
            stack: Vec::new(),
        };
        let realm = agent.current_realm();
        let holder = agent.create_ordinary_object(realm);
        agent.create_data_property_or_throw(holder, &PropertyKey::from_str(""), value)?;
        match serializer.serialize_property(agent, holder, &PropertyKey::from_str(""), "")? {
            Some(text) => Ok(JsValue::String(JsString::from_str(&text))),
            None => Ok(JsValue::Undefined),
        }
    });
}

// ── JSON.parse (§25.5.1) ─────────────────────────────────────────────

struct JsonParser {
    chars: Vec<char>,
    pos: usize,
}

impl JsonParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn expect_literal(&mut self, agent: &mut Agent, text: &str) -> Result<(), JsValue> {
        for expected in text.chars() {
            if self.bump() != Some(expected) {
                return Err(agent.syntax_error("Unexpected token in JSON"));
            }
        }
        Ok(())
    }

    fn parse_value(&mut self, agent: &mut Agent) -> Result<JsValue, JsValue> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_object(agent),
            Some('[') => self.parse_array(agent),
            Some('"') => Ok(JsValue::String(self.parse_string(agent)?)),
            Some('t') => {
                self.expect_literal(agent, "true")?;
                Ok(JsValue::Boolean(true))
            }
            Some('f') => {
                self.expect_literal(agent, "false")?;
                Ok(JsValue::Boolean(false))
            }
            Some('n') => {
                self.expect_literal(agent, "null")?;
                Ok(JsValue::Null)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(agent),
            _ => Err(agent.syntax_error("Unexpected token in JSON")),
        }
    }

    fn parse_object(&mut self, agent: &mut Agent) -> Result<JsValue, JsValue> {
        self.bump();
        let realm = agent.current_realm();
        let id = agent.create_ordinary_object(realm);
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(JsValue::object(id));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some('"') {
                return Err(agent.syntax_error("Expected string key in JSON object"));
            }
            let key = self.parse_string(agent)?;
            self.skip_whitespace();
            if self.bump() != Some(':') {
                return Err(agent.syntax_error("Expected ':' in JSON object"));
            }
            let value = self.parse_value(agent)?;
            agent.create_data_property_or_throw(
                id,
                &PropertyKey::from_js_string(key),
                value,
            )?;
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(agent.syntax_error("Expected ',' or '}' in JSON object")),
            }
        }
        Ok(JsValue::object(id))
    }

    fn parse_array(&mut self, agent: &mut Agent) -> Result<JsValue, JsValue> {
        self.bump();
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(agent.create_array_from_list(&items));
        }
        loop {
            items.push(self.parse_value(agent)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                _ => return Err(agent.syntax_error("Expected ',' or ']' in JSON array")),
            }
        }
        Ok(agent.create_array_from_list(&items))
    }

    fn parse_string(&mut self, agent: &mut Agent) -> Result<JsString, JsValue> {
        self.bump(); // opening quote
        let mut units: Vec<u16> = Vec::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(agent.syntax_error("Unterminated JSON string"));
            };
            match c {
                '"' => break,
                '\\' => {
                    let Some(escape) = self.bump() else {
                        return Err(agent.syntax_error("Unterminated JSON string"));
                    };
                    let unit: u16 = match escape {
                        '"' => '"' as u16,
                        '\\' => '\\' as u16,
                        '/' => '/' as u16,
                        'b' => 0x8,
                        'f' => 0xC,
                        'n' => '\n' as u16,
                        'r' => '\r' as u16,
                        't' => '\t' as u16,
                        'u' => {
                            let mut value = 0u16;
                            for _ in 0..4 {
                                let d = self
                                    .bump()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or_else(|| {
                                        agent.syntax_error("Invalid unicode escape in JSON")
                                    })?;
                                value = value * 16 + d as u16;
                            }
                            value
                        }
                        _ => return Err(agent.syntax_error("Invalid escape in JSON string")),
                    };
                    units.push(unit);
                }
                c if (c as u32) < 0x20 => {
                    return Err(agent.syntax_error("Unescaped control character in JSON string"));
                }
                c => {
                    let mut buf = [0u16; 2];
                    units.extend_from_slice(c.encode_utf16(&mut buf));
                }
            }
        }
        Ok(JsString::from_units(units))
    }

    fn parse_number(&mut self, agent: &mut Agent) -> Result<JsValue, JsValue> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(JsValue::Number)
            .map_err(|_| agent.syntax_error("Invalid number in JSON"))
    }
}

/// InternalizeJSONProperty: the reviver walk, bottom-up.
fn internalize(
    agent: &mut Agent,
    holder: u64,
    key: &PropertyKey,
    reviver: &JsValue,
) -> Result<JsValue, JsValue> {
    let holder_value = JsValue::object(holder);
    let value = agent.get(&holder_value, key)?;
    if let Some(id) = value.object_id() {
        if agent.is_array(&value)? {
            let length_value = agent.get(&value, &PropertyKey::from_str("length"))?;
            let length = agent.to_length(&length_value)?;
            for i in 0..length {
                let element_key = PropertyKey::from_number(i as f64);
                let new_element = internalize(agent, id, &element_key, reviver)?;
                if new_element.is_undefined() {
                    agent.internal_delete(id, &element_key)?;
                } else {
                    agent.create_data_property(id, &element_key, new_element)?;
                }
            }
        } else {
            let keys = agent.internal_own_property_keys(id)?;
            for k in keys {
                if matches!(k, PropertyKey::Symbol(_)) {
                    continue;
                }
                let new_value = internalize(agent, id, &k, reviver)?;
                if new_value.is_undefined() {
                    agent.internal_delete(id, &k)?;
                } else {
                    agent.create_data_property(id, &k, new_value)?;
                }
            }
        }
    }
    agent.call(reviver, &holder_value, &[key.to_value(), value])
}

// ── JSON.stringify (§25.5.2) ─────────────────────────────────────────

struct JsonSerializer {
    replacer: Option<JsValue>,
    property_list: Option<Vec<String>>,
    gap: String,
    stack: Vec<u64>,
}

impl JsonSerializer {
    /// SerializeJSONProperty; None marks an unserialisable value.
    fn serialize_property(
        &mut self,
        agent: &mut Agent,
        holder: u64,
        key: &PropertyKey,
        indent: &str,
    ) -> Result<Option<String>, JsValue> {
        let holder_value = JsValue::object(holder);
        let mut value = agent.get(&holder_value, key)?;

        // toJSON preempts everything else.
        if value.is_object() || value.is_bigint() {
            let to_json = agent.get_v(&value, &PropertyKey::from_str("toJSON"))?;
            if agent.is_callable(&to_json) {
                value = agent.call(&to_json, &value, &[key.to_value()])?;
            }
        }
        if let Some(replacer) = self.replacer.clone() {
            value = agent.call(&replacer, &holder_value, &[key.to_value(), value])?;
        }

        // Wrapper objects unwrap before classification.
        if let Some(id) = value.object_id() {
            let primitive = agent.get_object(id).and_then(|o| o.borrow().primitive.clone());
            if let Some(primitive) = primitive {
                value = match primitive {
                    JsValue::Number(_) => JsValue::Number(agent.to_number(&value)?),
                    JsValue::String(_) => JsValue::String(agent.to_string_value(&value)?),
                    JsValue::Boolean(b) => JsValue::Boolean(b),
                    other => other,
                };
            }
        }

        match &value {
            JsValue::Null => Ok(Some("null".to_string())),
            JsValue::Boolean(b) => Ok(Some(b.to_string())),
            JsValue::String(s) => Ok(Some(quote_json_string(s))),
            JsValue::Number(n) => Ok(Some(if n.is_finite() {
                number_ops::to_string(*n)
            } else {
                "null".to_string()
            })),
            JsValue::BigInt(_) => Err(agent.type_error("Do not know how to serialize a BigInt")),
            JsValue::Object(o) => {
                if agent.is_callable(&value) {
                    return Ok(None);
                }
                if agent.is_array(&value)? {
                    Ok(Some(self.serialize_array(agent, o.id, indent)?))
                } else {
                    Ok(Some(self.serialize_object(agent, o.id, indent)?))
                }
            }
            JsValue::Undefined | JsValue::Symbol(_) => Ok(None),
        }
    }

    fn enter(&mut self, agent: &mut Agent, id: u64) -> Result<(), JsValue> {
        if self.stack.contains(&id) {
            return Err(agent.type_error("Converting circular structure to JSON"));
        }
        self.stack.push(id);
        Ok(())
    }

    fn serialize_array(
        &mut self,
        agent: &mut Agent,
        id: u64,
        indent: &str,
    ) -> Result<String, JsValue> {
        self.enter(agent, id)?;
        let value = JsValue::object(id);
        let length_value = agent.get(&value, &PropertyKey::from_str("length"))?;
        let length = agent.to_length(&length_value)?;
        let inner_indent = format!("{indent}{}", self.gap);
        let mut parts = Vec::new();
        for i in 0..length {
            let part = self
                .serialize_property(agent, id, &PropertyKey::from_number(i as f64), &inner_indent)?
                .unwrap_or_else(|| "null".to_string());
            parts.push(part);
        }
        self.stack.pop();
        Ok(wrap_brackets('[', ']', &parts, indent, &inner_indent, &self.gap))
    }

    fn serialize_object(
        &mut self,
        agent: &mut Agent,
        id: u64,
        indent: &str,
    ) -> Result<String, JsValue> {
        self.enter(agent, id)?;
        let keys: Vec<PropertyKey> = match &self.property_list {
            Some(list) => list.iter().map(|k| PropertyKey::from_str(k)).collect(),
            None => agent
                .internal_own_property_keys(id)?
                .into_iter()
                .filter(|k| !matches!(k, PropertyKey::Symbol(_)))
                .collect(),
        };
        let inner_indent = format!("{indent}{}", self.gap);
        let mut parts = Vec::new();
        for key in keys {
            if self.property_list.is_none() {
                let desc = agent.internal_get_own_property(id, &key)?;
                if !desc.is_some_and(|d| d.enumerable == Some(true)) {
                    continue;
                }
            }
            if let Some(text) = self.serialize_property(agent, id, &key, &inner_indent)? {
                let separator = if self.gap.is_empty() { ":" } else { ": " };
                parts.push(format!(
                    "{}{separator}{text}",
                    quote_json_string(&JsString::from_str(&key.to_display_string()))
                ));
            }
        }
        self.stack.pop();
        Ok(wrap_brackets('{', '}', &parts, indent, &inner_indent, &self.gap))
    }
}

fn wrap_brackets(
    open: char,
    close: char,
    parts: &[String],
    indent: &str,
    inner_indent: &str,
    gap: &str,
) -> String {
    if parts.is_empty() {
        return format!("{open}{close}");
    }
    if gap.is_empty() {
        format!("{open}{}{close}", parts.join(","))
    } else {
        format!(
            "{open}\n{inner_indent}{}\n{indent}{close}",
            parts.join(&format!(",\n{inner_indent}"))
        )
    }
}

/// QuoteJSONString (§25.5.2.2).
fn quote_json_string(s: &JsString) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut units = s.units().iter().peekable();
    while let Some(&unit) = units.next() {
        match unit {
            0x22 => out.push_str("\\\""),
            0x5C => out.push_str("\\\\"),
            0x8 => out.push_str("\\b"),
            0xC => out.push_str("\\f"),
            0xA => out.push_str("\\n"),
            0xD => out.push_str("\\r"),
            0x9 => out.push_str("\\t"),
            u if u < 0x20 => out.push_str(&format!("\\u{u:04x}")),
            u if (0xD800..0xDC00).contains(&u) => {
                // Paired surrogates pass through; lone ones escape.
                match units.peek() {
                    Some(&&next) if (0xDC00..0xE000).contains(&next) => {
                        units.next();
                        let cp = 0x10000 + ((u as u32 - 0xD800) << 10) + (next as u32 - 0xDC00);
                        if let Some(c) = char::from_u32(cp) {
                            out.push(c);
                        }
                    }
                    _ => out.push_str(&format!("\\u{u:04x}")),
                }
            }
            u if (0xDC00..0xE000).contains(&u) => out.push_str(&format!("\\u{u:04x}")),
            u => {
                if let Some(c) = char::from_u32(u as u32) {
                    out.push(c);
                }
            }
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "json.js")
    }

    fn eval_string(src: &str) -> String {
        match eval(src) {
            Completion::Normal(JsValue::String(s)) => s.to_rust_string(),
            other => panic!("expected string from {src}, got {other:?}"),
        }
    }

    fn eval_bool(src: &str) -> bool {
        match eval(src) {
            Completion::Normal(JsValue::Boolean(b)) => b,
            other => panic!("expected boolean from {src}, got {other:?}"),
        }
    }

    #[test]
    fn stringify_basics() {
        assert_eq!(eval_string("JSON.stringify({ a: 1, b: [true, null] })"), r#"{"a":1,"b":[true,null]}"#);
        assert_eq!(eval_string("JSON.stringify('he\"llo')"), r#""he\"llo""#);
        assert_eq!(eval_string("JSON.stringify(NaN)"), "null");
        assert_eq!(eval_string("String(JSON.stringify(undefined))"), "undefined");
        // undefined members drop from objects, become null in arrays.
        assert_eq!(
            eval_string("JSON.stringify({ a: undefined, b: [undefined] })"),
            r#"{"b":[null]}"#
        );
    }

    #[test]
    fn stringify_with_space() {
        assert_eq!(
            eval_string("JSON.stringify({ a: [1] }, null, 2)"),
            "{\n  \"a\": [\n    1\n  ]\n}"
        );
    }

    #[test]
    fn parse_basics() {
        assert!(eval_bool("JSON.parse('{\"a\": [1, 2.5e2, \"x\"]}').a[1] === 250"));
        assert!(eval_bool("JSON.parse('null') === null"));
        assert!(eval_bool("JSON.parse('\"\\\\u0041\"') === 'A'"));
        assert!(eval_bool(
            "try { JSON.parse('{bad}'); false } catch (e) { e instanceof SyntaxError }"
        ));
    }

    #[test]
    fn round_trip_is_structural_identity() {
        assert!(eval_bool(
            "var v = { n: 1.5, s: 'x', b: true, z: null, a: [1, [2], { k: 'v' }] };\n\
             var w = JSON.parse(JSON.stringify(v));\n\
             JSON.stringify(v) === JSON.stringify(w)"
        ));
    }

    #[test]
    fn reviver_and_replacer() {
        assert!(eval_bool(
            "JSON.parse('{\"a\": 1}', function (k, v) { return typeof v === 'number' ? v * 2 : v; }).a === 2"
        ));
        assert_eq!(
            eval_string("JSON.stringify({ a: 1, b: 2 }, ['a'])"),
            r#"{"a":1}"#
        );
        assert_eq!(
            eval_string(
                "JSON.stringify({ a: 1 }, function (k, v) { return k === 'a' ? 'seen' : v; })"
            ),
            r#"{"a":"seen"}"#
        );
    }

    #[test]
    fn circular_structure_throws() {
        assert!(eval_bool(
            "var a = {}; a.self = a;\n\
             try { JSON.stringify(a); false } catch (e) { e instanceof TypeError }"
        ));
    }

    #[test]
    fn to_json_hook() {
        assert_eq!(
            eval_string("JSON.stringify({ toJSON: function () { return 'hooked'; } })"),
            r#""hooked""#
        );
    }
}
