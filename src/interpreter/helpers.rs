use crate::interpreter::agent::Agent;
use crate::interpreter::object::ObjectKind;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{bigint_ops, number_ops, JsBigInt, JsString, JsValue};
use num_bigint::BigInt;

/// Iterator record (§7.4.1): the iterator object, its cached `next`, and
/// the done flag.
#[derive(Clone, Debug)]
pub struct IteratorRecord {
    pub iterator: JsValue,
    pub next_method: JsValue,
    pub done: bool,
}

// ── value predicates and identity (§7.2) ─────────────────────────────

/// SameValue.
pub fn same_value(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => strict_equals_non_numeric(x, y),
    }
}

/// SameValueZero.
pub fn same_value_zero(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
        _ => strict_equals_non_numeric(x, y),
    }
}

/// Strict equality (`===`) without coercion.
pub fn strict_equals(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(*a, *b),
        _ => strict_equals_non_numeric(x, y),
    }
}

fn strict_equals_non_numeric(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a.id == b.id,
        _ => false,
    }
}

impl Agent {
    // ── type conversion ladders (§7.1) ───────────────────────────────

    /// ToBoolean; never fails, never observes.
    pub fn to_boolean(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::BigInt(b) => b.value != BigInt::from(0),
            JsValue::Symbol(_) | JsValue::Object(_) => true,
        }
    }

    /// ToPrimitive with an optional hint (§7.1.1). `@@toPrimitive`
    /// preempts OrdinaryToPrimitive.
    pub fn to_primitive(&mut self, value: &JsValue, hint: &str) -> Result<JsValue, JsValue> {
        if !value.is_object() {
            return Ok(value.clone());
        }
        let exotic_key = PropertyKey::Symbol(self.well_known.to_primitive.clone());
        if let Some(method) = self.get_method(value, &exotic_key)? {
            let hint_value = JsValue::String(JsString::from_str(hint));
            let result = self.call(&method, value, &[hint_value])?;
            if !result.is_object() {
                return Ok(result);
            }
            return Err(self.type_error("Cannot convert object to primitive value"));
        }
        let hint = if hint == "default" { "number" } else { hint };
        self.ordinary_to_primitive(value, hint)
    }

    fn ordinary_to_primitive(&mut self, value: &JsValue, hint: &str) -> Result<JsValue, JsValue> {
        let methods: [&str; 2] = if hint == "string" {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in methods {
            let method = self.get_v(value, &PropertyKey::from_str(name))?;
            if self.is_callable(&method) {
                let result = self.call(&method, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber (§7.1.4).
    pub fn to_number(&mut self, value: &JsValue) -> Result<f64, JsValue> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a number")),
            JsValue::BigInt(_) => Err(self.type_error("Cannot convert a BigInt value to a number")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, "number")?;
                self.to_number(&prim)
            }
        }
    }

    /// ToNumeric (§7.1.3): Number or BigInt.
    pub fn to_numeric(&mut self, value: &JsValue) -> Result<JsValue, JsValue> {
        let prim = self.to_primitive(value, "number")?;
        if let JsValue::BigInt(_) = prim {
            return Ok(prim);
        }
        Ok(JsValue::Number(self.to_number(&prim)?))
    }

    /// ToString (§7.1.17) producing the engine string type.
    pub fn to_string_value(&mut self, value: &JsValue) -> Result<JsString, JsValue> {
        match value {
            JsValue::Undefined => Ok(JsString::from_str("undefined")),
            JsValue::Null => Ok(JsString::from_str("null")),
            JsValue::Boolean(b) => Ok(JsString::from_str(if *b { "true" } else { "false" })),
            JsValue::Number(n) => Ok(JsString::from_str(&number_ops::to_string(*n))),
            JsValue::String(s) => Ok(s.clone()),
            JsValue::Symbol(_) => Err(self.type_error("Cannot convert a Symbol value to a string")),
            JsValue::BigInt(b) => Ok(JsString::from_str(&b.value.to_string())),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, "string")?;
                self.to_string_value(&prim)
            }
        }
    }

    /// ToObject (§7.1.18): primitives box into their wrapper kinds.
    pub fn to_object(&mut self, value: &JsValue) -> Result<u64, JsValue> {
        let realm = self.current_realm();
        match value {
            JsValue::Undefined | JsValue::Null => {
                Err(self.type_error("Cannot convert undefined or null to object"))
            }
            JsValue::Object(o) => Ok(o.id),
            JsValue::String(s) => Ok(self.string_create(s.clone(), realm)),
            JsValue::Boolean(_) => Ok(self.wrapper_create(
                value.clone(),
                Intrinsic::BooleanPrototype,
                "Boolean",
                realm,
            )),
            JsValue::Number(_) => Ok(self.wrapper_create(
                value.clone(),
                Intrinsic::NumberPrototype,
                "Number",
                realm,
            )),
            JsValue::Symbol(_) => Ok(self.wrapper_create(
                value.clone(),
                Intrinsic::SymbolPrototype,
                "Symbol",
                realm,
            )),
            JsValue::BigInt(_) => Ok(self.wrapper_create(
                value.clone(),
                Intrinsic::BigIntPrototype,
                "BigInt",
                realm,
            )),
        }
    }

    pub(crate) fn wrapper_create(
        &mut self,
        primitive: JsValue,
        proto: Intrinsic,
        class_name: &'static str,
        realm: usize,
    ) -> u64 {
        let proto_id = self.intrinsic(realm, proto).object_id();
        let id = self.object_create(proto_id, realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = class_name;
        data.primitive = Some(primitive);
        id
    }

    /// ToPropertyKey (§7.1.19).
    pub fn to_property_key(&mut self, value: &JsValue) -> Result<PropertyKey, JsValue> {
        let prim = self.to_primitive(value, "string")?;
        if let JsValue::Symbol(s) = prim {
            return Ok(PropertyKey::Symbol(s));
        }
        let s = self.to_string_value(&prim)?;
        Ok(PropertyKey::from_js_string(s))
    }

    /// ToIntegerOrInfinity.
    pub fn to_integer_or_infinity(&mut self, value: &JsValue) -> Result<f64, JsValue> {
        let n = self.to_number(value)?;
        Ok(if n.is_nan() {
            0.0
        } else if n.is_infinite() {
            n
        } else {
            n.trunc()
        })
    }

    /// ToLength: clamp to [0, 2^53 − 1].
    pub fn to_length(&mut self, value: &JsValue) -> Result<u64, JsValue> {
        let len = self.to_integer_or_infinity(value)?;
        if len <= 0.0 {
            return Ok(0);
        }
        Ok(len.min(MAX_SAFE_INTEGER) as u64)
    }

    /// ToIndex: RangeError outside [0, 2^53 − 1].
    pub fn to_index(&mut self, value: &JsValue) -> Result<usize, JsValue> {
        if value.is_undefined() {
            return Ok(0);
        }
        let integer = self.to_integer_or_infinity(value)?;
        if integer < 0.0 || integer > MAX_SAFE_INTEGER {
            return Err(self.range_error("Invalid index"));
        }
        Ok(integer as usize)
    }

    pub fn to_uint32(&mut self, value: &JsValue) -> Result<u32, JsValue> {
        Ok(number_ops::to_uint32(self.to_number(value)?))
    }

    pub fn to_int32(&mut self, value: &JsValue) -> Result<i32, JsValue> {
        Ok(number_ops::to_int32(self.to_number(value)?))
    }

    /// RequireObjectCoercible (§7.2.1).
    pub fn require_object_coercible(&mut self, value: &JsValue) -> Result<(), JsValue> {
        if value.is_nullish() {
            return Err(self.type_error("Cannot convert undefined or null to object"));
        }
        Ok(())
    }

    // ── callable / constructor tests ─────────────────────────────────

    pub fn is_callable(&self, value: &JsValue) -> bool {
        value
            .object_id()
            .and_then(|id| self.get_object(id))
            .is_some_and(|o| o.borrow().is_callable())
    }

    pub fn is_constructor(&self, value: &JsValue) -> bool {
        value
            .object_id()
            .and_then(|id| self.get_object(id))
            .is_some_and(|o| self.value_is_constructor(&o.borrow()))
    }

    pub(crate) fn value_is_constructor(
        &self,
        data: &crate::interpreter::object::JsObjectData,
    ) -> bool {
        use crate::interpreter::object::JsFunction;
        if let Some(proxy) = &data.proxy {
            return proxy.constructor;
        }
        if let Some(bound) = &data.bound {
            return self
                .get_object(bound.target)
                .is_some_and(|t| self.value_is_constructor(&t.borrow()));
        }
        match &data.callable {
            Some(JsFunction::Native(n)) => n.constructor,
            Some(JsFunction::User(u)) => {
                use crate::ast::FunctionKind;
                matches!(
                    u.kind,
                    FunctionKind::Normal | FunctionKind::ClassConstructor
                )
            }
            None => false,
        }
    }

    /// IsArray (§7.2.2), proxy-transparent.
    pub fn is_array(&mut self, value: &JsValue) -> Result<bool, JsValue> {
        let Some(id) = value.object_id() else {
            return Ok(false);
        };
        let obj = self.get_object(id).expect("stale handle");
        let (kind, proxy_target) = {
            let data = obj.borrow();
            (data.kind, data.proxy.as_ref().and_then(|p| p.target))
        };
        match kind {
            ObjectKind::Array => Ok(true),
            ObjectKind::Proxy => match proxy_target {
                Some(target) => self.is_array(&JsValue::object(target)),
                None => Err(self.type_error("Cannot perform operation on a revoked proxy")),
            },
            _ => Ok(false),
        }
    }

    // ── property access conveniences (§7.3) ──────────────────────────

    /// Get(O, P) for a known object value.
    pub fn get(&mut self, object: &JsValue, key: &PropertyKey) -> Result<JsValue, JsValue> {
        let id = object
            .object_id()
            .expect("Get requires an object");
        self.internal_get(id, key, object)
    }

    /// GetV(V, P): property access off any value, boxing primitives.
    pub fn get_v(&mut self, value: &JsValue, key: &PropertyKey) -> Result<JsValue, JsValue> {
        let id = self.to_object(value)?;
        self.internal_get(id, key, value)
    }

    /// Set(O, P, V, Throw).
    pub fn set_property(
        &mut self,
        object: &JsValue,
        key: &PropertyKey,
        value: JsValue,
        throw: bool,
    ) -> Result<(), JsValue> {
        let id = object.object_id().expect("Set requires an object");
        let succeeded = self.internal_set(id, key, value, object)?;
        if !succeeded && throw {
            return Err(self.type_error(&format!(
                "Cannot assign to read only property '{key}'"
            )));
        }
        Ok(())
    }

    pub fn create_data_property(
        &mut self,
        object: u64,
        key: &PropertyKey,
        value: JsValue,
    ) -> Result<bool, JsValue> {
        self.internal_define_own_property(object, key, PropertyDescriptor::data_default(value))
    }

    pub fn create_data_property_or_throw(
        &mut self,
        object: u64,
        key: &PropertyKey,
        value: JsValue,
    ) -> Result<(), JsValue> {
        if !self.create_data_property(object, key, value)? {
            return Err(self.type_error(&format!("Cannot define property '{key}'")));
        }
        Ok(())
    }

    pub fn define_property_or_throw(
        &mut self,
        object: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<(), JsValue> {
        if !self.internal_define_own_property(object, key, desc)? {
            return Err(self.type_error(&format!("Cannot define property '{key}'")));
        }
        Ok(())
    }

    pub fn delete_property_or_throw(
        &mut self,
        object: u64,
        key: &PropertyKey,
    ) -> Result<(), JsValue> {
        if !self.internal_delete(object, key)? {
            return Err(self.type_error(&format!("Cannot delete property '{key}'")));
        }
        Ok(())
    }

    /// GetMethod (§7.3.10): undefined/null → None; non-callable →
    /// TypeError.
    pub fn get_method(
        &mut self,
        value: &JsValue,
        key: &PropertyKey,
    ) -> Result<Option<JsValue>, JsValue> {
        let func = self.get_v(value, key)?;
        if func.is_nullish() {
            return Ok(None);
        }
        if !self.is_callable(&func) {
            return Err(self.type_error(&format!("{key} is not a function")));
        }
        Ok(Some(func))
    }

    /// Invoke (§7.3.20).
    pub fn invoke(
        &mut self,
        value: &JsValue,
        key: &PropertyKey,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        let func = self.get_v(value, key)?;
        if !self.is_callable(&func) {
            return Err(self.type_error(&format!("{key} is not a function")));
        }
        self.call(&func, value, args)
    }

    /// HasProperty as a value-level helper.
    pub fn has_property_value(
        &mut self,
        object: &JsValue,
        key: &PropertyKey,
    ) -> Result<bool, JsValue> {
        match object.object_id() {
            Some(id) => self.internal_has_property(id, key),
            None => Ok(false),
        }
    }

    // ── equality and relational comparison (§7.2.14, §7.2.13) ────────

    /// Abstract equality (`==`) with its coercion ladder.
    pub fn loose_equals(&mut self, x: &JsValue, y: &JsValue) -> Result<bool, JsValue> {
        use JsValue::*;
        match (x, y) {
            (Number(_), Number(_))
            | (String(_), String(_))
            | (Boolean(_), Boolean(_))
            | (Symbol(_), Symbol(_))
            | (BigInt(_), BigInt(_))
            | (Object(_), Object(_))
            | (Undefined, Undefined)
            | (Null, Null) => Ok(strict_equals(x, y)),
            (Undefined, Null) | (Null, Undefined) => Ok(true),
            (Number(n), String(s)) | (String(s), Number(n)) => {
                Ok(number_ops::equal(*n, string_to_number(s)))
            }
            (BigInt(b), String(s)) | (String(s), BigInt(b)) => {
                Ok(string_to_bigint(&s.to_rust_string()).is_some_and(|p| p == b.value))
            }
            (Boolean(_), _) => {
                let n = self.to_number(x)?;
                self.loose_equals(&Number(n), y)
            }
            (_, Boolean(_)) => {
                let n = self.to_number(y)?;
                self.loose_equals(x, &Number(n))
            }
            (Number(n), BigInt(b)) | (BigInt(b), Number(n)) => Ok(bigint_equals_number(&b.value, *n)),
            (Object(_), _) if matches!(y, Number(_) | String(_) | BigInt(_) | Symbol(_)) => {
                let prim = self.to_primitive(x, "default")?;
                self.loose_equals(&prim, y)
            }
            (_, Object(_)) if matches!(x, Number(_) | String(_) | BigInt(_) | Symbol(_)) => {
                let prim = self.to_primitive(y, "default")?;
                self.loose_equals(x, &prim)
            }
            _ => Ok(false),
        }
    }

    /// Abstract relational comparison; `None` encodes the undefined
    /// result (NaN operands).
    pub fn abstract_relational(
        &mut self,
        x: &JsValue,
        y: &JsValue,
        left_first: bool,
    ) -> Result<Option<bool>, JsValue> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, "number")?;
            let py = self.to_primitive(y, "number")?;
            (px, py)
        } else {
            let py = self.to_primitive(y, "number")?;
            let px = self.to_primitive(x, "number")?;
            (px, py)
        };
        if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
            return Ok(Some(a.units() < b.units()));
        }
        match (&px, &py) {
            (JsValue::BigInt(a), JsValue::BigInt(b)) => Ok(Some(a.value < b.value)),
            (JsValue::BigInt(a), _) => {
                let n = self.to_number(&py)?;
                Ok(bigint_less_than_number(&a.value, n))
            }
            (_, JsValue::BigInt(b)) => {
                let n = self.to_number(&px)?;
                Ok(number_less_than_bigint(n, &b.value))
            }
            _ => {
                let nx = self.to_number(&px)?;
                let ny = self.to_number(&py)?;
                Ok(number_ops::less_than(nx, ny))
            }
        }
    }

    /// InstanceofOperator (§13.10.2).
    pub fn instanceof_operator(
        &mut self,
        value: &JsValue,
        target: &JsValue,
    ) -> Result<bool, JsValue> {
        if !target.is_object() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not an object"));
        }
        let has_instance_key = PropertyKey::Symbol(self.well_known.has_instance.clone());
        if let Some(method) = self.get_method(target, &has_instance_key)? {
            let result = self.call(&method, target, &[value.clone()])?;
            return Ok(self.to_boolean(&result));
        }
        if !self.is_callable(target) {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        self.ordinary_has_instance(target, value)
    }

    /// OrdinaryHasInstance (§7.3.22).
    pub fn ordinary_has_instance(
        &mut self,
        callable: &JsValue,
        value: &JsValue,
    ) -> Result<bool, JsValue> {
        if !self.is_callable(callable) {
            return Ok(false);
        }
        // Bound functions defer to their target.
        if let Some(id) = callable.object_id() {
            let bound_target = {
                let obj = self.get_object(id).unwrap();
                let target = obj.borrow().bound.as_ref().map(|b| b.target);
                target
            };
            if let Some(target) = bound_target {
                return self.ordinary_has_instance(&JsValue::object(target), value);
            }
        }
        if !value.is_object() {
            return Ok(false);
        }
        let proto = self.get(callable, &PropertyKey::from_str("prototype"))?;
        if !proto.is_object() {
            return Err(self.type_error("Function has non-object prototype in instanceof check"));
        }
        let mut walker = value.clone();
        loop {
            let id = walker.object_id().unwrap();
            let parent = self.internal_get_prototype_of(id)?;
            match parent {
                JsValue::Object(_) => {
                    if same_value(&parent, &proto) {
                        return Ok(true);
                    }
                    walker = parent;
                }
                _ => return Ok(false),
            }
        }
    }

    // ── the iteration protocol (§7.4) ────────────────────────────────

    /// GetIterator with a sync/async hint. Async falls back to wrapping
    /// the sync iterator when `@@asyncIterator` is absent.
    pub fn get_iterator(
        &mut self,
        value: &JsValue,
        is_async: bool,
    ) -> Result<IteratorRecord, JsValue> {
        let method = if is_async {
            let async_key = PropertyKey::Symbol(self.well_known.async_iterator.clone());
            match self.get_method(value, &async_key)? {
                Some(m) => Some(m),
                None => {
                    let sync_key = PropertyKey::Symbol(self.well_known.iterator.clone());
                    self.get_method(value, &sync_key)?
                }
            }
        } else {
            let key = PropertyKey::Symbol(self.well_known.iterator.clone());
            self.get_method(value, &key)?
        };
        let Some(method) = method else {
            return Err(self.type_error(&format!("{} is not iterable", value.type_of())));
        };
        let iterator = self.call(&method, value, &[])?;
        if !iterator.is_object() {
            return Err(self.type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next_method = self.get_v(&iterator, &PropertyKey::from_str("next"))?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    /// IteratorNext.
    pub fn iterator_next(
        &mut self,
        record: &IteratorRecord,
        value: Option<JsValue>,
    ) -> Result<JsValue, JsValue> {
        let args: Vec<JsValue> = value.into_iter().collect();
        let result = self.call(&record.next_method.clone(), &record.iterator.clone(), &args)?;
        if !result.is_object() {
            return Err(self.type_error("Iterator result is not an object"));
        }
        Ok(result)
    }

    /// IteratorComplete: Get(result, "done") then ToBoolean.
    pub fn iterator_complete(&mut self, result: &JsValue) -> Result<bool, JsValue> {
        let done = self.get(result, &PropertyKey::from_str("done"))?;
        Ok(self.to_boolean(&done))
    }

    /// IteratorValue.
    pub fn iterator_value(&mut self, result: &JsValue) -> Result<JsValue, JsValue> {
        self.get(result, &PropertyKey::from_str("value"))
    }

    /// IteratorStep: the next result object, or None when exhausted.
    pub fn iterator_step(
        &mut self,
        record: &IteratorRecord,
    ) -> Result<Option<JsValue>, JsValue> {
        let result = self.iterator_next(record, None)?;
        if self.iterator_complete(&result)? {
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// IteratorClose (§7.4.6): runs the iterator's `return` method on
    /// early exit. A throw in `completion` wins over errors from
    /// `return`; otherwise a misbehaving `return` surfaces.
    pub fn iterator_close(
        &mut self,
        record: &IteratorRecord,
        completion: Result<JsValue, JsValue>,
    ) -> Result<JsValue, JsValue> {
        let return_method = match self.get_method(&record.iterator.clone(), &PropertyKey::from_str("return"))
        {
            Ok(m) => m,
            Err(e) => {
                return match completion {
                    Err(original) => Err(original),
                    Ok(_) => Err(e),
                };
            }
        };
        let Some(return_method) = return_method else {
            return completion;
        };
        let inner = self.call(&return_method, &record.iterator.clone(), &[]);
        if let Err(original) = completion {
            return Err(original);
        }
        let inner = inner?;
        if !inner.is_object() {
            return Err(self.type_error("Iterator's return method did not return an object"));
        }
        completion
    }

    /// CreateIterResultObject.
    pub fn create_iter_result_object(&mut self, value: JsValue, done: bool) -> JsValue {
        let realm = self.current_realm();
        let id = self.create_ordinary_object(realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.define(
                PropertyKey::from_str("value"),
                PropertyDescriptor::data_default(value),
            );
            data.define(
                PropertyKey::from_str("done"),
                PropertyDescriptor::data_default(JsValue::Boolean(done)),
            );
        }
        JsValue::object(id)
    }

    /// Drain an iterable into a vector (spread, Array.from fast path).
    pub fn iterable_to_list(&mut self, value: &JsValue) -> Result<Vec<JsValue>, JsValue> {
        let record = self.get_iterator(value, false)?;
        let mut out = Vec::new();
        loop {
            match self.iterator_step(&record)? {
                Some(result) => out.push(self.iterator_value(&result)?),
                None => break,
            }
        }
        Ok(out)
    }

    /// CreateListFromArrayLike (§7.3.19).
    pub fn create_list_from_array_like(
        &mut self,
        value: &JsValue,
    ) -> Result<Vec<JsValue>, JsValue> {
        if !value.is_object() {
            return Err(self.type_error("Expected an array-like object"));
        }
        let length_value = self.get(value, &PropertyKey::from_str("length"))?;
        let length = self.to_length(&length_value)?;
        let mut out = Vec::with_capacity(length.min(4096) as usize);
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            out.push(self.get(value, &key)?);
        }
        Ok(out)
    }

    /// CreateArrayFromList.
    pub fn create_array_from_list(&mut self, values: &[JsValue]) -> JsValue {
        let realm = self.current_realm();
        let id = self.array_create(values.len() as u32, realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            for (i, value) in values.iter().enumerate() {
                data.define(
                    PropertyKey::Index(i as u32),
                    PropertyDescriptor::data_default(value.clone()),
                );
            }
        }
        JsValue::object(id)
    }

    // ── species (§7.3.23, §9.4.2.3) ──────────────────────────────────

    /// SpeciesConstructor.
    pub fn species_constructor(
        &mut self,
        object: &JsValue,
        default: Intrinsic,
    ) -> Result<JsValue, JsValue> {
        let ctor = self.get(object, &PropertyKey::from_str("constructor"))?;
        if ctor.is_undefined() {
            let realm = self.current_realm();
            return Ok(self.intrinsic(realm, default));
        }
        if !ctor.is_object() {
            return Err(self.type_error("constructor is not an object"));
        }
        let species_key = PropertyKey::Symbol(self.well_known.species.clone());
        let species = self.get(&ctor, &species_key)?;
        if species.is_nullish() {
            let realm = self.current_realm();
            return Ok(self.intrinsic(realm, default));
        }
        if self.is_constructor(&species) {
            return Ok(species);
        }
        Err(self.type_error("Species is not a constructor"))
    }

    /// ArraySpeciesCreate (§9.4.2.3): honours a subclassed constructor
    /// unless the original is a plain same-realm array.
    pub fn array_species_create(
        &mut self,
        original: &JsValue,
        length: u64,
    ) -> Result<JsValue, JsValue> {
        if !self.is_array(original)? {
            let realm = self.current_realm();
            return Ok(JsValue::object(self.array_create(length as u32, realm)));
        }
        let mut ctor = self.get(original, &PropertyKey::from_str("constructor"))?;
        if ctor.is_object() {
            let species_key = PropertyKey::Symbol(self.well_known.species.clone());
            let species = self.get(&ctor, &species_key)?;
            ctor = if species.is_null() {
                JsValue::Undefined
            } else {
                species
            };
        }
        if ctor.is_undefined() {
            let realm = self.current_realm();
            return Ok(JsValue::object(self.array_create(length as u32, realm)));
        }
        if !self.is_constructor(&ctor) {
            return Err(self.type_error("Array species constructor is not a constructor"));
        }
        self.construct(&ctor, &[JsValue::Number(length as f64)], &ctor)
    }

    // ── descriptors as objects (§6.2.5.4–5) ──────────────────────────

    /// ToPropertyDescriptor.
    pub fn to_property_descriptor(
        &mut self,
        value: &JsValue,
    ) -> Result<PropertyDescriptor, JsValue> {
        if !value.is_object() {
            return Err(self.type_error("Property description must be an object"));
        }
        let mut desc = PropertyDescriptor::default();
        for field in ["enumerable", "configurable", "value", "writable", "get", "set"] {
            let key = PropertyKey::from_str(field);
            if !self.has_property_value(value, &key)? {
                continue;
            }
            let v = self.get(value, &key)?;
            match field {
                "enumerable" => desc.enumerable = Some(self.to_boolean(&v)),
                "configurable" => desc.configurable = Some(self.to_boolean(&v)),
                "writable" => desc.writable = Some(self.to_boolean(&v)),
                "value" => desc.value = Some(v),
                "get" => {
                    if !v.is_undefined() && !self.is_callable(&v) {
                        return Err(self.type_error("Getter must be a function"));
                    }
                    desc.get = Some(v);
                }
                "set" => {
                    if !v.is_undefined() && !self.is_callable(&v) {
                        return Err(self.type_error("Setter must be a function"));
                    }
                    desc.set = Some(v);
                }
                _ => unreachable!(),
            }
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(self.type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// FromPropertyDescriptor.
    pub fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let realm = self.current_realm();
        let id = self.create_ordinary_object(realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            if let Some(value) = &desc.value {
                data.define(
                    PropertyKey::from_str("value"),
                    PropertyDescriptor::data_default(value.clone()),
                );
            }
            if let Some(writable) = desc.writable {
                data.define(
                    PropertyKey::from_str("writable"),
                    PropertyDescriptor::data_default(JsValue::Boolean(writable)),
                );
            }
            if let Some(get) = &desc.get {
                data.define(
                    PropertyKey::from_str("get"),
                    PropertyDescriptor::data_default(get.clone()),
                );
            }
            if let Some(set) = &desc.set {
                data.define(
                    PropertyKey::from_str("set"),
                    PropertyDescriptor::data_default(set.clone()),
                );
            }
            if let Some(enumerable) = desc.enumerable {
                data.define(
                    PropertyKey::from_str("enumerable"),
                    PropertyDescriptor::data_default(JsValue::Boolean(enumerable)),
                );
            }
            if let Some(configurable) = desc.configurable {
                data.define(
                    PropertyKey::from_str("configurable"),
                    PropertyDescriptor::data_default(JsValue::Boolean(configurable)),
                );
            }
        }
        JsValue::object(id)
    }

    // ── object spread/rest and for-in support ────────────────────────

    /// CopyDataProperties (§7.3.25).
    pub fn copy_data_properties(
        &mut self,
        target: u64,
        source: &JsValue,
        excluded: &[PropertyKey],
    ) -> Result<(), JsValue> {
        if source.is_nullish() {
            return Ok(());
        }
        let from = self.to_object(source)?;
        let keys = self.internal_own_property_keys(from)?;
        for key in keys {
            if excluded.contains(&key) {
                continue;
            }
            let desc = self.internal_get_own_property(from, &key)?;
            if let Some(desc) = desc {
                if desc.enumerable == Some(true) {
                    let value = self.internal_get(from, &key, &JsValue::object(from))?;
                    self.create_data_property_or_throw(target, &key, value)?;
                }
            }
        }
        Ok(())
    }

    /// EnumerateObjectProperties: own-then-prototype enumerable string
    /// keys, shadowing-aware, in own-key order per object.
    pub fn enumerate_properties_for_in(&mut self, id: u64) -> Result<Vec<PropertyKey>, JsValue> {
        let mut visited: Vec<PropertyKey> = Vec::new();
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(obj_id) = current {
            for key in self.internal_own_property_keys(obj_id)? {
                if matches!(key, PropertyKey::Symbol(_)) {
                    continue;
                }
                if visited.contains(&key) {
                    continue;
                }
                visited.push(key.clone());
                if let Some(desc) = self.internal_get_own_property(obj_id, &key)? {
                    if desc.enumerable == Some(true) {
                        out.push(key);
                    }
                }
            }
            current = match self.internal_get_prototype_of(obj_id)? {
                JsValue::Object(p) => Some(p.id),
                _ => None,
            };
        }
        Ok(out)
    }
}

pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0; // 2^53 − 1

// ── string-to-number / string-to-bigint (§7.1.4.1) ───────────────────

pub fn string_to_number(s: &JsString) -> f64 {
    let text = s.to_rust_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        return u64::from_str_radix(oct, 8).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).map(|n| n as f64).unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn string_to_bigint(s: &str) -> Option<BigInt> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return BigInt::parse_bytes(hex.as_bytes(), 16);
    }
    if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        return BigInt::parse_bytes(oct.as_bytes(), 8);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return BigInt::parse_bytes(bin.as_bytes(), 2);
    }
    trimmed.parse::<BigInt>().ok()
}

fn bigint_equals_number(b: &BigInt, n: f64) -> bool {
    if n.is_nan() || n.is_infinite() || n.fract() != 0.0 {
        return false;
    }
    let as_int = n as i128;
    if as_int as f64 != n {
        return false;
    }
    *b == BigInt::from(as_int)
}

fn bigint_to_f64(b: &BigInt) -> Option<f64> {
    b.to_string().parse::<f64>().ok()
}

fn bigint_less_than_number(b: &BigInt, n: f64) -> Option<bool> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(true);
    }
    if n == f64::NEG_INFINITY {
        return Some(false);
    }
    match bigint_to_f64(b) {
        Some(bf) => Some(bf < n),
        None => Some(b.sign() == num_bigint::Sign::Minus),
    }
}

fn number_less_than_bigint(n: f64, b: &BigInt) -> Option<bool> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(false);
    }
    if n == f64::NEG_INFINITY {
        return Some(true);
    }
    match bigint_to_f64(b) {
        Some(bf) => Some(n < bf),
        None => Some(b.sign() != num_bigint::Sign::Minus),
    }
}

/// BigInt arithmetic used by the evaluator; errors become TypeError or
/// RangeError values at the call site.
pub fn bigint_binary(
    op: crate::ast::BinaryOp,
    a: &JsBigInt,
    b: &JsBigInt,
) -> Result<JsValue, &'static str> {
    use crate::ast::BinaryOp;
    let x = &a.value;
    let y = &b.value;
    let value = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => bigint_ops::divide(x, y)?,
        BinaryOp::Mod => bigint_ops::remainder(x, y)?,
        BinaryOp::Exp => bigint_ops::exponentiate(x, y)?,
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::LeftShift => bigint_ops::left_shift(x, y),
        BinaryOp::RightShift => bigint_ops::signed_right_shift(x, y),
        BinaryOp::UnsignedRightShift => bigint_ops::unsigned_right_shift(x, y)?,
        _ => return Err("unsupported BigInt operation"),
    };
    Ok(JsValue::BigInt(JsBigInt { value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    fn agent() -> Agent {
        let mut a = Agent::new(AgentOptions::default()).unwrap();
        a.create_realm(None);
        a
    }

    #[test]
    fn same_value_and_strict_equals_disagree_on_nan_and_zero() {
        let nan = JsValue::Number(f64::NAN);
        assert!(same_value(&nan, &nan));
        assert!(!strict_equals(&nan, &nan));
        let pz = JsValue::Number(0.0);
        let nz = JsValue::Number(-0.0);
        assert!(!same_value(&pz, &nz));
        assert!(strict_equals(&pz, &nz));
        assert!(same_value_zero(&pz, &nz));
    }

    #[test]
    fn to_number_coercions() {
        let mut agent = agent();
        assert!(agent.to_number(&JsValue::Undefined).unwrap().is_nan());
        assert_eq!(agent.to_number(&JsValue::Null).unwrap(), 0.0);
        assert_eq!(agent.to_number(&JsValue::Boolean(true)).unwrap(), 1.0);
        let s = JsValue::String(JsString::from_str("  0x10 "));
        assert_eq!(agent.to_number(&s).unwrap(), 16.0);
        let sym = JsValue::Symbol(agent.new_symbol(None));
        assert!(agent.to_number(&sym).is_err());
    }

    #[test]
    fn to_string_idempotent_for_primitives() {
        let mut agent = agent();
        for v in [
            JsValue::Number(0.1),
            JsValue::Number(-0.0),
            JsValue::Boolean(false),
            JsValue::Null,
            JsValue::Undefined,
        ] {
            let once = agent.to_string_value(&v).unwrap();
            let twice = agent.to_string_value(&JsValue::String(once.clone())).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn to_length_clamps() {
        let mut agent = agent();
        assert_eq!(agent.to_length(&JsValue::Number(-5.0)).unwrap(), 0);
        assert_eq!(agent.to_length(&JsValue::Number(3.9)).unwrap(), 3);
        assert_eq!(
            agent.to_length(&JsValue::Number(1e300)).unwrap(),
            MAX_SAFE_INTEGER as u64
        );
    }

    #[test]
    fn loose_equals_ladder() {
        let mut agent = agent();
        let one = JsValue::Number(1.0);
        let one_str = JsValue::String(JsString::from_str("1"));
        assert!(agent.loose_equals(&one, &one_str).unwrap());
        assert!(agent
            .loose_equals(&JsValue::Null, &JsValue::Undefined)
            .unwrap());
        assert!(!agent
            .loose_equals(&JsValue::Null, &JsValue::Number(0.0))
            .unwrap());
        assert!(agent
            .loose_equals(&JsValue::Boolean(true), &one)
            .unwrap());
    }

    #[test]
    fn relational_string_vs_number() {
        let mut agent = agent();
        let a = JsValue::String(JsString::from_str("a"));
        let b = JsValue::String(JsString::from_str("b"));
        assert_eq!(agent.abstract_relational(&a, &b, true).unwrap(), Some(true));
        let nan = JsValue::Number(f64::NAN);
        assert_eq!(
            agent.abstract_relational(&nan, &JsValue::Number(1.0), true).unwrap(),
            None
        );
    }

    #[test]
    fn iterable_to_list_over_array() {
        let mut agent = agent();
        let values = [JsValue::Number(1.0), JsValue::Number(2.0)];
        let array = agent.create_array_from_list(&values);
        let list = agent.iterable_to_list(&array).unwrap();
        assert_eq!(list.len(), 2);
        assert!(strict_equals(&list[1], &JsValue::Number(2.0)));
    }

    #[test]
    fn get_method_rejects_non_callable() {
        let mut agent = agent();
        let realm = agent.current_realm();
        let id = agent.create_ordinary_object(realm);
        let obj = agent.get_object(id).unwrap();
        obj.borrow_mut().define(
            PropertyKey::from_str("m"),
            PropertyDescriptor::data_default(JsValue::Number(1.0)),
        );
        let value = JsValue::object(id);
        assert!(agent.get_method(&value, &PropertyKey::from_str("m")).is_err());
        assert!(agent
            .get_method(&value, &PropertyKey::from_str("absent"))
            .unwrap()
            .is_none());
    }
}
