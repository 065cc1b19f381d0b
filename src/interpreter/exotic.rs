use crate::interpreter::agent::Agent;
use crate::interpreter::object::{ElementType, ObjectKind};
use crate::interpreter::property::{validate_and_apply, PropertyDescriptor, PropertyKey};
use crate::interpreter::realm::Intrinsic;
use crate::types::{number_ops, JsString, JsValue};

impl Agent {
    // ── array exotic (§10.4.2) ───────────────────────────────────────

    /// ArrayCreate: a new array-exotic object with its `length` property.
    pub fn array_create(&mut self, length: u32, realm: usize) -> u64 {
        let proto = self.intrinsic(realm, Intrinsic::ArrayPrototype);
        let id = self.allocate_object(ObjectKind::Array, realm);
        let obj = self.get_object(id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.class_name = "Array";
            data.prototype = proto.object_id().and_then(|p| self.get_object(p));
            data.define(
                PropertyKey::from_str("length"),
                PropertyDescriptor::data(JsValue::Number(length as f64), true, false, false),
            );
        }
        id
    }

    pub fn array_length(&self, id: u64) -> u32 {
        let obj = self.get_object(id).expect("stale array handle");
        let data = obj.borrow();
        match data.properties.get(&PropertyKey::from_str("length")) {
            Some(PropertyDescriptor {
                value: Some(JsValue::Number(n)),
                ..
            }) => *n as u32,
            _ => 0,
        }
    }

    fn write_array_length(&self, id: u64, value: u32, writable: Option<bool>) {
        let obj = self.get_object(id).expect("stale array handle");
        let mut data = obj.borrow_mut();
        let key = PropertyKey::from_str("length");
        if let Some(desc) = data.properties.get_mut(&key) {
            desc.value = Some(JsValue::Number(value as f64));
            if let Some(w) = writable {
                desc.writable = Some(w);
            }
        }
    }

    /// Array [[DefineOwnProperty]]: `length` runs ArraySetLength; index
    /// definitions keep `length` coherent.
    pub fn array_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        if matches!(key, PropertyKey::String(s) if s.to_rust_string() == "length") {
            return self.array_set_length(id, desc);
        }
        if let PropertyKey::Index(index) = key {
            let length_desc = self
                .ordinary_get_own_property(id, &PropertyKey::from_str("length"))
                .expect("array without length");
            let old_len = match &length_desc.value {
                Some(JsValue::Number(n)) => *n as u32,
                _ => 0,
            };
            if *index >= old_len && length_desc.writable == Some(false) {
                return Ok(false);
            }
            if !self.ordinary_define_own_property(id, key, desc) {
                return Ok(false);
            }
            if *index >= old_len {
                self.write_array_length(id, index + 1, None);
            }
            return Ok(true);
        }
        Ok(self.ordinary_define_own_property(id, key, desc))
    }

    /// ArraySetLength (§10.4.2.4). Deletes indices ≥ the new length in
    /// descending order; a failed delete truncates partway and reports
    /// failure.
    fn array_set_length(&mut self, id: u64, desc: PropertyDescriptor) -> Result<bool, JsValue> {
        let key = PropertyKey::from_str("length");
        let Some(len_value) = desc.value.clone() else {
            return Ok(self.ordinary_define_own_property(id, &key, desc));
        };
        let number_len = self.to_number(&len_value)?;
        let new_len = number_ops::to_uint32(number_len);
        if new_len as f64 != number_len {
            return Err(self.range_error("Invalid array length"));
        }
        let mut new_len_desc = desc.clone();
        new_len_desc.value = Some(JsValue::Number(new_len as f64));

        let old_desc = self
            .ordinary_get_own_property(id, &key)
            .expect("array without length");
        let old_len = match &old_desc.value {
            Some(JsValue::Number(n)) => *n as u32,
            _ => 0,
        };
        if new_len >= old_len {
            return Ok(self.ordinary_define_own_property(id, &key, new_len_desc));
        }
        if old_desc.writable == Some(false) {
            return Ok(false);
        }
        let new_writable = new_len_desc.writable != Some(false);
        if !new_writable {
            // Defer clearing writability until the deletions are done.
            new_len_desc.writable = Some(true);
        }
        if !self.ordinary_define_own_property(id, &key, new_len_desc.clone()) {
            return Ok(false);
        }

        let mut doomed: Vec<u32> = {
            let obj = self.get_object(id).unwrap();
            let data = obj.borrow();
            data.properties
                .keys()
                .filter_map(|k| k.as_index())
                .filter(|i| *i >= new_len)
                .collect()
        };
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for index in doomed {
            if !self.ordinary_delete(id, &PropertyKey::Index(index)) {
                self.write_array_length(
                    id,
                    index + 1,
                    if new_writable { None } else { Some(false) },
                );
                return Ok(false);
            }
        }
        self.write_array_length(id, new_len, if new_writable { None } else { Some(false) });
        Ok(true)
    }

    // ── string exotic (§10.4.3) ──────────────────────────────────────

    /// Allocate a String wrapper; code-unit indices and `length` come
    /// from the wrapped string.
    pub fn string_create(&mut self, value: JsString, realm: usize) -> u64 {
        let proto = self.intrinsic(realm, Intrinsic::StringPrototype);
        let id = self.allocate_object(ObjectKind::StringExotic, realm);
        let obj = self.get_object(id).unwrap();
        let mut data = obj.borrow_mut();
        data.class_name = "String";
        data.prototype = proto.object_id().and_then(|p| self.get_object(p));
        data.define(
            PropertyKey::from_str("length"),
            PropertyDescriptor::data(JsValue::Number(value.len() as f64), false, false, false),
        );
        data.primitive = Some(JsValue::String(value));
        id
    }

    /// StringGetOwnProperty: the synthetic descriptor for an in-range
    /// code-unit index.
    fn string_index_descriptor(&self, id: u64, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let index = key.as_index()? as usize;
        let obj = self.get_object(id)?;
        let data = obj.borrow();
        let Some(JsValue::String(s)) = &data.primitive else {
            return None;
        };
        let unit = s.code_unit(index)?;
        Some(PropertyDescriptor::data(
            JsValue::String(JsString::from_units(vec![unit])),
            false,
            true,
            false,
        ))
    }

    pub fn string_get_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
    ) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.ordinary_get_own_property(id, key) {
            return Some(desc);
        }
        self.string_index_descriptor(id, key)
    }

    pub fn string_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        if let Some(string_desc) = self.string_index_descriptor(id, key) {
            let extensible = {
                let obj = self.get_object(id).unwrap();
                let e = obj.borrow().extensible;
                e
            };
            // The index property is immutable; the merge either matches
            // it exactly or is rejected. Nothing is stored either way.
            return Ok(validate_and_apply(Some(&string_desc), extensible, &desc).is_some());
        }
        Ok(self.ordinary_define_own_property(id, key, desc))
    }

    pub fn string_own_property_keys(&self, id: u64) -> Vec<PropertyKey> {
        let obj = self.get_object(id).expect("stale string handle");
        let data = obj.borrow();
        let len = match &data.primitive {
            Some(JsValue::String(s)) => s.len() as u32,
            _ => 0,
        };
        let mut out: Vec<PropertyKey> = (0..len).map(PropertyKey::Index).collect();
        let mut extra_indices: Vec<u32> = data
            .properties
            .keys()
            .filter_map(|k| k.as_index())
            .filter(|i| *i >= len)
            .collect();
        extra_indices.sort_unstable();
        out.extend(extra_indices.into_iter().map(PropertyKey::Index));
        for key in data.properties.keys() {
            if matches!(key, PropertyKey::String(_)) {
                out.push(key.clone());
            }
        }
        for key in data.properties.keys() {
            if matches!(key, PropertyKey::Symbol(_)) {
                out.push(key.clone());
            }
        }
        out
    }

    // ── arguments exotic (§10.4.4) ───────────────────────────────────

    fn mapped_parameter(&self, id: u64, key: &PropertyKey) -> Option<(crate::interpreter::environment::EnvRef, String)> {
        let index = key.as_index()?;
        let obj = self.get_object(id)?;
        let data = obj.borrow();
        let map = data.parameter_map.as_ref()?;
        let name = map.mapping.get(&index)?.clone();
        Some((map.env.clone(), name))
    }

    pub fn arguments_get_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
    ) -> Option<PropertyDescriptor> {
        let mut desc = self.ordinary_get_own_property(id, key)?;
        if let Some((env, name)) = self.mapped_parameter(id, key) {
            if let Ok(value) = self.get_binding_value(&env, &name, false) {
                desc.value = Some(value);
            }
        }
        Some(desc)
    }

    pub fn arguments_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        let mapped = self.mapped_parameter(id, key);
        let mut new_arg_desc = desc.clone();
        if let Some((_, _)) = &mapped {
            // Keep the map transparent when redefining a mapped index as
            // a plain data property without a value.
            if desc.is_data_descriptor() && desc.value.is_none() && desc.writable == Some(false) {
                if let Some((env, name)) = &mapped {
                    if let Ok(v) = self.get_binding_value(env, name, false) {
                        new_arg_desc.value = Some(v);
                    }
                }
            }
        }
        if !self.ordinary_define_own_property(id, key, new_arg_desc) {
            return Ok(false);
        }
        if let Some((env, name)) = mapped {
            if desc.is_accessor_descriptor() {
                self.remove_mapped_parameter(id, key);
            } else {
                if let Some(value) = &desc.value {
                    let _ = self.set_mutable_binding(&env, &name, value.clone(), false);
                }
                if desc.writable == Some(false) {
                    self.remove_mapped_parameter(id, key);
                }
            }
        }
        Ok(true)
    }

    fn remove_mapped_parameter(&self, id: u64, key: &PropertyKey) {
        let Some(index) = key.as_index() else { return };
        if let Some(obj) = self.get_object(id) {
            if let Some(map) = obj.borrow_mut().parameter_map.as_mut() {
                map.mapping.remove(&index);
            }
        }
    }

    pub fn arguments_get(
        &mut self,
        id: u64,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        if let Some((env, name)) = self.mapped_parameter(id, key) {
            return self.get_binding_value(&env, &name, false);
        }
        self.ordinary_get(id, key, receiver)
    }

    pub fn arguments_set(
        &mut self,
        id: u64,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsValue> {
        let same_receiver = receiver.object_id() == Some(id);
        if same_receiver {
            if let Some((env, name)) = self.mapped_parameter(id, key) {
                self.set_mutable_binding(&env, &name, value.clone(), false)?;
            }
        }
        self.ordinary_set(id, key, value, receiver)
    }

    pub fn arguments_delete(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let result = self.ordinary_delete(id, key);
        if result {
            self.remove_mapped_parameter(id, key);
        }
        Ok(result)
    }

    // ── integer-indexed exotic (§10.4.5) ─────────────────────────────

    fn typed_array_length(&self, id: u64) -> usize {
        self.get_object(id)
            .and_then(|o| o.borrow().typed_array.as_ref().map(|t| t.length))
            .unwrap_or(0)
    }

    fn read_element(&self, id: u64, index: usize) -> Option<JsValue> {
        let obj = self.get_object(id)?;
        let data = obj.borrow();
        let ta = data.typed_array.as_ref()?;
        if index >= ta.length {
            return None;
        }
        let buf = ta.buffer.borrow();
        let offset = ta.byte_offset + index * ta.element.size();
        let value = match ta.element {
            ElementType::Int8 => buf[offset] as i8 as f64,
            ElementType::Uint8 | ElementType::Uint8Clamped => buf[offset] as f64,
            ElementType::Int16 => i16::from_le_bytes([buf[offset], buf[offset + 1]]) as f64,
            ElementType::Uint16 => u16::from_le_bytes([buf[offset], buf[offset + 1]]) as f64,
            ElementType::Int32 => i32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as f64,
            ElementType::Uint32 => u32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as f64,
            ElementType::Float32 => f32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as f64,
            ElementType::Float64 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&buf[offset..offset + 8]);
                f64::from_le_bytes(bytes)
            }
        };
        Some(JsValue::Number(value))
    }

    fn write_element(&mut self, id: u64, index: usize, value: &JsValue) -> Result<bool, JsValue> {
        let number = self.to_number(value)?;
        let Some(obj) = self.get_object(id) else {
            return Ok(false);
        };
        let data = obj.borrow();
        let Some(ta) = data.typed_array.as_ref() else {
            return Ok(false);
        };
        if index >= ta.length {
            return Ok(false);
        }
        let mut buf = ta.buffer.borrow_mut();
        let offset = ta.byte_offset + index * ta.element.size();
        match ta.element {
            ElementType::Int8 => buf[offset] = number_ops::to_int32(number) as i8 as u8,
            ElementType::Uint8 => buf[offset] = number_ops::to_uint32(number) as u8,
            ElementType::Uint8Clamped => {
                buf[offset] = if number.is_nan() || number <= 0.0 {
                    0
                } else if number >= 255.0 {
                    255
                } else {
                    (number + 0.5).floor() as u8
                };
            }
            ElementType::Int16 => buf[offset..offset + 2]
                .copy_from_slice(&(number_ops::to_int32(number) as i16).to_le_bytes()),
            ElementType::Uint16 => buf[offset..offset + 2]
                .copy_from_slice(&(number_ops::to_uint32(number) as u16).to_le_bytes()),
            ElementType::Int32 => {
                buf[offset..offset + 4].copy_from_slice(&number_ops::to_int32(number).to_le_bytes())
            }
            ElementType::Uint32 => buf[offset..offset + 4]
                .copy_from_slice(&number_ops::to_uint32(number).to_le_bytes()),
            ElementType::Float32 => {
                buf[offset..offset + 4].copy_from_slice(&(number as f32).to_le_bytes())
            }
            ElementType::Float64 => {
                buf[offset..offset + 8].copy_from_slice(&number.to_le_bytes())
            }
        }
        Ok(true)
    }

    pub fn integer_indexed_get_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
    ) -> Option<PropertyDescriptor> {
        if let Some(index) = key.as_index() {
            let value = self.read_element(id, index as usize)?;
            return Some(PropertyDescriptor::data(value, true, true, false));
        }
        self.ordinary_get_own_property(id, key)
    }

    pub fn integer_indexed_get(
        &mut self,
        id: u64,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        if let Some(index) = key.as_index() {
            return Ok(self
                .read_element(id, index as usize)
                .unwrap_or(JsValue::Undefined));
        }
        self.ordinary_get(id, key, receiver)
    }

    pub fn integer_indexed_set(
        &mut self,
        id: u64,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsValue> {
        if let Some(index) = key.as_index() {
            return self.write_element(id, index as usize, &value);
        }
        self.ordinary_set(id, key, value, receiver)
    }

    pub fn integer_indexed_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        if let Some(index) = key.as_index() {
            if (index as usize) >= self.typed_array_length(id) {
                return Ok(false);
            }
            if desc.is_accessor_descriptor()
                || desc.configurable == Some(true)
                || desc.enumerable == Some(false)
                || desc.writable == Some(false)
            {
                return Ok(false);
            }
            if let Some(value) = &desc.value {
                return self.write_element(id, index as usize, value);
            }
            return Ok(true);
        }
        Ok(self.ordinary_define_own_property(id, key, desc))
    }

    pub fn integer_indexed_own_property_keys(&self, id: u64) -> Vec<PropertyKey> {
        let len = self.typed_array_length(id) as u32;
        let mut out: Vec<PropertyKey> = (0..len).map(PropertyKey::Index).collect();
        let obj = self.get_object(id).expect("stale handle");
        let data = obj.borrow();
        for key in data.properties.keys() {
            if matches!(key, PropertyKey::String(_)) {
                out.push(key.clone());
            }
        }
        for key in data.properties.keys() {
            if matches!(key, PropertyKey::Symbol(_)) {
                out.push(key.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::agent::{Agent, AgentOptions};

    fn agent() -> (Agent, usize) {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        (agent, realm)
    }

    #[test]
    fn array_index_definition_grows_length() {
        let (mut agent, realm) = agent();
        let a = agent.array_create(0, realm);
        agent
            .internal_define_own_property(
                a,
                &PropertyKey::Index(5),
                PropertyDescriptor::data_default(JsValue::Number(1.0)),
            )
            .unwrap();
        assert_eq!(agent.array_length(a), 6);
    }

    #[test]
    fn array_length_truncation_deletes_indices() {
        let (mut agent, realm) = agent();
        let a = agent.array_create(0, realm);
        for i in 0..4 {
            agent
                .internal_define_own_property(
                    a,
                    &PropertyKey::Index(i),
                    PropertyDescriptor::data_default(JsValue::Number(i as f64)),
                )
                .unwrap();
        }
        let ok = agent
            .internal_define_own_property(
                a,
                &PropertyKey::from_str("length"),
                PropertyDescriptor {
                    value: Some(JsValue::Number(2.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(ok);
        assert_eq!(agent.array_length(a), 2);
        assert!(agent
            .ordinary_get_own_property(a, &PropertyKey::Index(3))
            .is_none());
        assert!(agent
            .ordinary_get_own_property(a, &PropertyKey::Index(1))
            .is_some());
    }

    #[test]
    fn array_truncation_stops_at_non_configurable_index() {
        let (mut agent, realm) = agent();
        let a = agent.array_create(0, realm);
        agent
            .internal_define_own_property(
                a,
                &PropertyKey::Index(0),
                PropertyDescriptor::data(JsValue::Number(1.0), true, true, false),
            )
            .unwrap();
        let ok = agent
            .internal_define_own_property(
                a,
                &PropertyKey::from_str("length"),
                PropertyDescriptor {
                    value: Some(JsValue::Number(0.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        // The delete fails; length ends at index + 1.
        assert!(!ok);
        assert_eq!(agent.array_length(a), 1);
        assert!(agent
            .ordinary_get_own_property(a, &PropertyKey::Index(0))
            .is_some());
    }

    #[test]
    fn invalid_array_length_is_range_error() {
        let (mut agent, realm) = agent();
        let a = agent.array_create(0, realm);
        let result = agent.internal_define_own_property(
            a,
            &PropertyKey::from_str("length"),
            PropertyDescriptor {
                value: Some(JsValue::Number(-1.0)),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn string_exposes_code_unit_indices() {
        let (mut agent, realm) = agent();
        let s = agent.string_create(JsString::from_str("ab"), realm);
        let desc = agent
            .internal_get_own_property(s, &PropertyKey::Index(1))
            .unwrap()
            .unwrap();
        assert!(matches!(
            desc.value,
            Some(JsValue::String(v)) if v.to_rust_string() == "b"
        ));
        assert!(agent
            .internal_get_own_property(s, &PropertyKey::Index(2))
            .unwrap()
            .is_none());
        let keys = agent.internal_own_property_keys(s).unwrap();
        let shown: Vec<String> = keys.iter().map(|k| k.to_display_string()).collect();
        assert_eq!(shown, vec!["0", "1", "length"]);
    }

    #[test]
    fn string_index_cannot_be_redefined() {
        let (mut agent, realm) = agent();
        let s = agent.string_create(JsString::from_str("x"), realm);
        let ok = agent
            .internal_define_own_property(
                s,
                &PropertyKey::Index(0),
                PropertyDescriptor::data_default(JsValue::Number(1.0)),
            )
            .unwrap();
        assert!(!ok);
    }
}
