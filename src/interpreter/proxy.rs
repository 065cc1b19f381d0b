use crate::interpreter::agent::Agent;
use crate::interpreter::helpers::same_value;
use crate::interpreter::object::{ObjectKind, ProxyData};
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::types::JsValue;

impl Agent {
    /// ProxyCreate (§10.5.14). Callability of the proxy mirrors the
    /// target at creation time.
    pub fn proxy_create(&mut self, target: &JsValue, handler: &JsValue) -> Result<u64, JsValue> {
        let (Some(target_id), Some(handler_id)) = (target.object_id(), handler.object_id()) else {
            return Err(self.type_error("Cannot create proxy with a non-object as target or handler"));
        };
        let (callable, constructor) = {
            let t = self.get_object(target_id).unwrap();
            let data = t.borrow();
            (data.is_callable(), self.value_is_constructor(&data))
        };
        let realm = self.current_realm();
        let id = self.allocate_object(ObjectKind::Proxy, realm);
        let obj = self.get_object(id).unwrap();
        obj.borrow_mut().proxy = Some(ProxyData {
            target: Some(target_id),
            handler: Some(handler_id),
            callable,
            constructor,
        });
        Ok(id)
    }

    pub fn proxy_revoke(&mut self, id: u64) {
        if let Some(obj) = self.get_object(id) {
            if let Some(proxy) = obj.borrow_mut().proxy.as_mut() {
                proxy.target = None;
                proxy.handler = None;
            }
        }
    }

    fn proxy_parts(&mut self, id: u64) -> Result<(u64, u64), JsValue> {
        let obj = self.get_object(id).expect("stale proxy handle");
        let data = obj.borrow();
        let proxy = data.proxy.as_ref().expect("proxy without payload");
        match (proxy.target, proxy.handler) {
            (Some(t), Some(h)) => Ok((t, h)),
            _ => {
                drop(data);
                Err(self.type_error("Cannot perform operation on a revoked proxy"))
            }
        }
    }

    /// Fetch the trap function, or None to forward to the target.
    fn proxy_trap(&mut self, handler: u64, name: &str) -> Result<Option<JsValue>, JsValue> {
        self.get_method(&JsValue::object(handler), &PropertyKey::from_str(name))
    }

    pub fn proxy_get_prototype_of(&mut self, id: u64) -> Result<JsValue, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "getPrototypeOf")? else {
            return self.internal_get_prototype_of(target);
        };
        let result = self.call(&trap, &JsValue::object(handler), &[JsValue::object(target)])?;
        if !matches!(result, JsValue::Object(_) | JsValue::Null) {
            return Err(self.type_error("'getPrototypeOf' trap must return an object or null"));
        }
        if self.internal_is_extensible(target)? {
            return Ok(result);
        }
        let actual = self.internal_get_prototype_of(target)?;
        if !same_value(&result, &actual) {
            return Err(self.type_error(
                "'getPrototypeOf' trap result differs from the prototype of a non-extensible target",
            ));
        }
        Ok(result)
    }

    pub fn proxy_set_prototype_of(&mut self, id: u64, proto: &JsValue) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "setPrototypeOf")? else {
            return self.internal_set_prototype_of(target, proto);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), proto.clone()],
        )?;
        if !self.to_boolean(&result) {
            return Ok(false);
        }
        if !self.internal_is_extensible(target)? {
            let actual = self.internal_get_prototype_of(target)?;
            if !same_value(proto, &actual) {
                return Err(self.type_error(
                    "'setPrototypeOf' trap cannot change the prototype of a non-extensible target",
                ));
            }
        }
        Ok(true)
    }

    pub fn proxy_is_extensible(&mut self, id: u64) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "isExtensible")? else {
            return self.internal_is_extensible(target);
        };
        let result = self.call(&trap, &JsValue::object(handler), &[JsValue::object(target)])?;
        let result = self.to_boolean(&result);
        let actual = self.internal_is_extensible(target)?;
        if result != actual {
            return Err(self.type_error("'isExtensible' trap result does not match the target"));
        }
        Ok(result)
    }

    pub fn proxy_prevent_extensions(&mut self, id: u64) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "preventExtensions")? else {
            return self.internal_prevent_extensions(target);
        };
        let result = self.call(&trap, &JsValue::object(handler), &[JsValue::object(target)])?;
        let result = self.to_boolean(&result);
        if result && self.internal_is_extensible(target)? {
            return Err(
                self.type_error("'preventExtensions' trap returned true but the target is extensible")
            );
        }
        Ok(result)
    }

    pub fn proxy_get_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "getOwnPropertyDescriptor")? else {
            return self.internal_get_own_property(target, key);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), key.to_value()],
        )?;
        if !matches!(result, JsValue::Object(_) | JsValue::Undefined) {
            return Err(self.type_error(
                "'getOwnPropertyDescriptor' trap must return an object or undefined",
            ));
        }
        let target_desc = self.internal_get_own_property(target, key)?;
        if result.is_undefined() {
            if let Some(td) = &target_desc {
                if td.configurable == Some(false) {
                    return Err(self.type_error(
                        "'getOwnPropertyDescriptor' trap hid a non-configurable property",
                    ));
                }
                if !self.internal_is_extensible(target)? {
                    return Err(self.type_error(
                        "'getOwnPropertyDescriptor' trap hid a property of a non-extensible target",
                    ));
                }
            }
            return Ok(None);
        }
        let desc = self.to_property_descriptor(&result)?.complete();
        if desc.configurable == Some(false) {
            match &target_desc {
                Some(td) if td.configurable == Some(false) => {
                    if td.is_data_descriptor()
                        && td.writable == Some(false)
                        && desc.writable == Some(true)
                    {
                        return Err(self.type_error(
                            "'getOwnPropertyDescriptor' trap reported a non-writable property as writable",
                        ));
                    }
                }
                _ => {
                    return Err(self.type_error(
                        "'getOwnPropertyDescriptor' trap reported a configurable property as non-configurable",
                    ));
                }
            }
        }
        Ok(Some(desc))
    }

    pub fn proxy_define_own_property(
        &mut self,
        id: u64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "defineProperty")? else {
            return self.internal_define_own_property(target, key, desc);
        };
        let desc_obj = self.from_property_descriptor(&desc);
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), key.to_value(), desc_obj],
        )?;
        if !self.to_boolean(&result) {
            return Ok(false);
        }
        let target_desc = self.internal_get_own_property(target, key)?;
        let extensible = self.internal_is_extensible(target)?;
        match &target_desc {
            None => {
                if !extensible {
                    return Err(self.type_error(
                        "'defineProperty' trap added a property to a non-extensible target",
                    ));
                }
                if desc.configurable == Some(false) {
                    return Err(self.type_error(
                        "'defineProperty' trap defined a non-configurable property that does not exist on the target",
                    ));
                }
            }
            Some(td) => {
                if desc.configurable == Some(false) && td.configurable == Some(true) {
                    return Err(self.type_error(
                        "'defineProperty' trap reported a configurable property as non-configurable",
                    ));
                }
            }
        }
        Ok(true)
    }

    pub fn proxy_has_property(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "has")? else {
            return self.internal_has_property(target, key);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), key.to_value()],
        )?;
        let result = self.to_boolean(&result);
        if !result {
            if let Some(td) = self.internal_get_own_property(target, key)? {
                if td.configurable == Some(false) {
                    return Err(self.type_error("'has' trap hid a non-configurable property"));
                }
                if !self.internal_is_extensible(target)? {
                    return Err(
                        self.type_error("'has' trap hid a property of a non-extensible target")
                    );
                }
            }
        }
        Ok(result)
    }

    pub fn proxy_get(
        &mut self,
        id: u64,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> Result<JsValue, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "get")? else {
            return self.internal_get(target, key, receiver);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), key.to_value(), receiver.clone()],
        )?;
        if let Some(td) = self.internal_get_own_property(target, key)? {
            if td.configurable == Some(false) {
                if td.is_data_descriptor() && td.writable == Some(false) {
                    let expected = td.value.clone().unwrap_or(JsValue::Undefined);
                    if !same_value(&result, &expected) {
                        return Err(self.type_error(
                            "'get' trap result differs from a non-configurable non-writable data property",
                        ));
                    }
                }
                if td.is_accessor_descriptor()
                    && td.get.as_ref().is_none_or(|g| g.is_undefined())
                    && !result.is_undefined()
                {
                    return Err(self.type_error(
                        "'get' trap returned a value for a non-configurable accessor without a getter",
                    ));
                }
            }
        }
        Ok(result)
    }

    pub fn proxy_set(
        &mut self,
        id: u64,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "set")? else {
            return self.internal_set(target, key, value, receiver);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[
                JsValue::object(target),
                key.to_value(),
                value.clone(),
                receiver.clone(),
            ],
        )?;
        if !self.to_boolean(&result) {
            return Ok(false);
        }
        if let Some(td) = self.internal_get_own_property(target, key)? {
            if td.configurable == Some(false) {
                if td.is_data_descriptor() && td.writable == Some(false) {
                    let expected = td.value.clone().unwrap_or(JsValue::Undefined);
                    if !same_value(&value, &expected) {
                        return Err(self.type_error(
                            "'set' trap changed a non-configurable non-writable data property",
                        ));
                    }
                }
                if td.is_accessor_descriptor() && td.set.as_ref().is_none_or(|s| s.is_undefined())
                {
                    return Err(self.type_error(
                        "'set' trap succeeded for a non-configurable accessor without a setter",
                    ));
                }
            }
        }
        Ok(true)
    }

    pub fn proxy_delete(&mut self, id: u64, key: &PropertyKey) -> Result<bool, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "deleteProperty")? else {
            return self.internal_delete(target, key);
        };
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), key.to_value()],
        )?;
        if !self.to_boolean(&result) {
            return Ok(false);
        }
        if let Some(td) = self.internal_get_own_property(target, key)? {
            if td.configurable == Some(false) {
                return Err(
                    self.type_error("'deleteProperty' trap deleted a non-configurable property")
                );
            }
        }
        Ok(true)
    }

    pub fn proxy_own_property_keys(&mut self, id: u64) -> Result<Vec<PropertyKey>, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "ownKeys")? else {
            return self.internal_own_property_keys(target);
        };
        let result = self.call(&trap, &JsValue::object(handler), &[JsValue::object(target)])?;
        let list = self.create_list_from_array_like(&result)?;
        let mut keys = Vec::with_capacity(list.len());
        for value in list {
            match &value {
                JsValue::String(s) => keys.push(PropertyKey::from_js_string(s.clone())),
                JsValue::Symbol(s) => keys.push(PropertyKey::Symbol(s.clone())),
                _ => {
                    return Err(
                        self.type_error("'ownKeys' trap must return only strings and symbols")
                    );
                }
            }
        }
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                if keys[i] == keys[j] {
                    return Err(self.type_error("'ownKeys' trap returned duplicate keys"));
                }
            }
        }
        let target_keys = self.internal_own_property_keys(target)?;
        let extensible = self.internal_is_extensible(target)?;
        for tk in &target_keys {
            let td = self.internal_get_own_property(target, tk)?;
            let non_configurable = td.as_ref().is_some_and(|d| d.configurable == Some(false));
            let listed = keys.contains(tk);
            if non_configurable && !listed {
                return Err(self.type_error("'ownKeys' trap omitted a non-configurable key"));
            }
            if !extensible && !listed {
                return Err(
                    self.type_error("'ownKeys' trap omitted a key of a non-extensible target")
                );
            }
        }
        if !extensible {
            for key in &keys {
                if !target_keys.contains(key) {
                    return Err(
                        self.type_error("'ownKeys' trap added a key to a non-extensible target")
                    );
                }
            }
        }
        Ok(keys)
    }

    /// Proxy [[Call]].
    pub fn proxy_call(
        &mut self,
        id: u64,
        this_value: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "apply")? else {
            return self.call(&JsValue::object(target), this_value, args);
        };
        let args_array = self.create_array_from_list(args);
        self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), this_value.clone(), args_array],
        )
    }

    /// Proxy [[Construct]].
    pub fn proxy_construct(
        &mut self,
        id: u64,
        args: &[JsValue],
        new_target: &JsValue,
    ) -> Result<JsValue, JsValue> {
        let (target, handler) = self.proxy_parts(id)?;
        let Some(trap) = self.proxy_trap(handler, "construct")? else {
            return self.construct(&JsValue::object(target), args, new_target);
        };
        let args_array = self.create_array_from_list(args);
        let result = self.call(
            &trap,
            &JsValue::object(handler),
            &[JsValue::object(target), args_array, new_target.clone()],
        )?;
        if !result.is_object() {
            return Err(self.type_error("'construct' trap must return an object"));
        }
        Ok(result)
    }
}
