use super::{create_constructor, define_method, define_symbol_method};
use crate::interpreter::agent::Agent;
use crate::interpreter::object::ArrayIterationKind;
use crate::interpreter::property::PropertyKey;
use crate::interpreter::realm::Intrinsic;
use crate::types::{number_ops, JsString, JsValue};

pub(super) fn setup(agent: &mut Agent, realm: usize) {
    let prototype = agent.array_create(0, realm);
    agent.realms[realm].set_intrinsic(Intrinsic::ArrayPrototype, JsValue::object(prototype));
    // The prototype itself is an array-exotic object but chains to
    // %Object.prototype%.
    {
        let object_prototype = agent.intrinsic(realm, Intrinsic::ObjectPrototype);
        let obj = agent.get_object(prototype).unwrap();
        obj.borrow_mut().prototype =
            object_prototype.object_id().and_then(|p| agent.get_object(p));
    }

    define_method(agent, prototype, "push", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let mut length = length_of_array_like(agent, this)?;
        if length + args.len() as u64 > number_ops_max_length() {
            return Err(agent.type_error("Array length exceeds 2^53 - 1"));
        }
        for value in args {
            let key = PropertyKey::from_number(length as f64);
            agent.set_property(&JsValue::object(id), &key, value.clone(), true)?;
            length += 1;
        }
        let length_value = JsValue::Number(length as f64);
        agent.set_property(
            &JsValue::object(id),
            &PropertyKey::from_str("length"),
            length_value.clone(),
            true,
        )?;
        Ok(length_value)
    });

    define_method(agent, prototype, "pop", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        if length == 0 {
            agent.set_property(
                &target,
                &PropertyKey::from_str("length"),
                JsValue::Number(0.0),
                true,
            )?;
            return Ok(JsValue::Undefined);
        }
        let key = PropertyKey::from_number((length - 1) as f64);
        let value = agent.get(&target, &key)?;
        let deleted = agent.internal_delete(id, &key)?;
        if !deleted {
            return Err(agent.type_error(&format!("Cannot delete property '{key}'")));
        }
        agent.set_property(
            &target,
            &PropertyKey::from_str("length"),
            JsValue::Number((length - 1) as f64),
            true,
        )?;
        Ok(value)
    });

    define_method(agent, prototype, "shift", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        if length == 0 {
            return Ok(JsValue::Undefined);
        }
        let first = agent.get(&target, &PropertyKey::Index(0))?;
        for i in 1..length {
            let from = PropertyKey::from_number(i as f64);
            let to = PropertyKey::from_number((i - 1) as f64);
            if agent.has_property_value(&target, &from)? {
                let value = agent.get(&target, &from)?;
                agent.set_property(&target, &to, value, true)?;
            } else {
                agent.delete_property_or_throw(id, &to)?;
            }
        }
        agent.delete_property_or_throw(id, &PropertyKey::from_number((length - 1) as f64))?;
        agent.set_property(
            &target,
            &PropertyKey::from_str("length"),
            JsValue::Number((length - 1) as f64),
            true,
        )?;
        Ok(first)
    });

    define_method(agent, prototype, "unshift", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let count = args.len() as u64;
        if count > 0 {
            for i in (0..length).rev() {
                let from = PropertyKey::from_number(i as f64);
                let to = PropertyKey::from_number((i + count) as f64);
                if agent.has_property_value(&target, &from)? {
                    let value = agent.get(&target, &from)?;
                    agent.set_property(&target, &to, value, true)?;
                } else {
                    agent.delete_property_or_throw(id, &to)?;
                }
            }
            for (i, value) in args.iter().enumerate() {
                agent.set_property(
                    &target,
                    &PropertyKey::from_number(i as f64),
                    value.clone(),
                    true,
                )?;
            }
        }
        let new_length = JsValue::Number((length + count) as f64);
        agent.set_property(
            &target,
            &PropertyKey::from_str("length"),
            new_length.clone(),
            true,
        )?;
        Ok(new_length)
    });

    define_method(agent, prototype, "slice", 2, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let start = relative_index(agent, args.first(), length, 0)?;
        let end = relative_index(agent, args.get(1), length, length)?;
        let count = end.saturating_sub(start);
        let result = agent.array_species_create(&target, count)?;
        let result_id = result.object_id().unwrap();
        let mut out = 0u64;
        for i in start..end {
            let from = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &from)? {
                let value = agent.get(&target, &from)?;
                agent.create_data_property_or_throw(
                    result_id,
                    &PropertyKey::from_number(out as f64),
                    value,
                )?;
            }
            out += 1;
        }
        agent.set_property(
            &result,
            &PropertyKey::from_str("length"),
            JsValue::Number(count as f64),
            true,
        )?;
        Ok(result)
    });

    define_method(agent, prototype, "splice", 2, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let start = relative_index(agent, args.first(), length, 0)?;
        let delete_count = match args.len() {
            0 => 0,
            1 => length - start,
            _ => {
                let requested = agent.to_integer_or_infinity(args.get(1).unwrap())?;
                (requested.max(0.0) as u64).min(length - start)
            }
        };
        let removed = agent.array_species_create(&target, delete_count)?;
        let removed_id = removed.object_id().unwrap();
        for i in 0..delete_count {
            let from = PropertyKey::from_number((start + i) as f64);
            if agent.has_property_value(&target, &from)? {
                let value = agent.get(&target, &from)?;
                agent.create_data_property_or_throw(
                    removed_id,
                    &PropertyKey::from_number(i as f64),
                    value,
                )?;
            }
        }
        agent.set_property(
            &removed,
            &PropertyKey::from_str("length"),
            JsValue::Number(delete_count as f64),
            true,
        )?;

        let items = args.get(2..).unwrap_or(&[]);
        let item_count = items.len() as u64;
        if item_count < delete_count {
            for i in start..(length - delete_count) {
                let from = PropertyKey::from_number((i + delete_count) as f64);
                let to = PropertyKey::from_number((i + item_count) as f64);
                if agent.has_property_value(&target, &from)? {
                    let value = agent.get(&target, &from)?;
                    agent.set_property(&target, &to, value, true)?;
                } else {
                    agent.delete_property_or_throw(id, &to)?;
                }
            }
            for i in ((length - delete_count + item_count)..length).rev() {
                agent.delete_property_or_throw(id, &PropertyKey::from_number(i as f64))?;
            }
        } else if item_count > delete_count {
            for i in (start..(length - delete_count)).rev() {
                let from = PropertyKey::from_number((i + delete_count) as f64);
                let to = PropertyKey::from_number((i + item_count) as f64);
                if agent.has_property_value(&target, &from)? {
                    let value = agent.get(&target, &from)?;
                    agent.set_property(&target, &to, value, true)?;
                } else {
                    agent.delete_property_or_throw(id, &to)?;
                }
            }
        }
        for (i, item) in items.iter().enumerate() {
            agent.set_property(
                &target,
                &PropertyKey::from_number((start + i as u64) as f64),
                item.clone(),
                true,
            )?;
        }
        agent.set_property(
            &target,
            &PropertyKey::from_str("length"),
            JsValue::Number((length - delete_count + item_count) as f64),
            true,
        )?;
        Ok(removed)
    });

    define_method(agent, prototype, "indexOf", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let search = args.first().cloned().unwrap_or(JsValue::Undefined);
        let from = match args.get(1) {
            Some(v) => agent.to_integer_or_infinity(v)?,
            None => 0.0,
        };
        let start = if from < 0.0 {
            ((length as f64) + from).max(0.0) as u64
        } else {
            from as u64
        };
        for i in start..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                if crate::interpreter::helpers::strict_equals(&value, &search) {
                    return Ok(JsValue::Number(i as f64));
                }
            }
        }
        Ok(JsValue::Number(-1.0))
    });

    define_method(agent, prototype, "includes", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let search = args.first().cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let value = agent.get(&target, &PropertyKey::from_number(i as f64))?;
            if crate::interpreter::helpers::same_value_zero(&value, &search) {
                return Ok(JsValue::Boolean(true));
            }
        }
        Ok(JsValue::Boolean(false))
    });

    define_method(agent, prototype, "join", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let separator = match args.first() {
            None | Some(JsValue::Undefined) => JsString::from_str(","),
            Some(v) => agent.to_string_value(v)?,
        };
        let mut out = JsString::empty();
        for i in 0..length {
            if i > 0 {
                out = out.concat(&separator);
            }
            let value = agent.get(&target, &PropertyKey::from_number(i as f64))?;
            if !value.is_nullish() {
                out = out.concat(&agent.to_string_value(&value)?);
            }
        }
        Ok(JsValue::String(out))
    });

    define_method(agent, prototype, "toString", 0, |agent, this, _args| {
        let join = agent.get_v(this, &PropertyKey::from_str("join"))?;
        if agent.is_callable(&join) {
            return agent.call(&join, this, &[]);
        }
        Ok(JsValue::String(JsString::from_str("[object Array]")))
    });

    define_method(agent, prototype, "concat", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let this_value = JsValue::object(id);
        let result = agent.array_species_create(&this_value, 0)?;
        let result_id = result.object_id().unwrap();
        let mut out = 0u64;
        let mut append = |agent: &mut Agent, item: &JsValue| -> Result<(), JsValue> {
            let spreadable = is_concat_spreadable(agent, item)?;
            if spreadable {
                let length = length_of_array_like(agent, item)?;
                for i in 0..length {
                    let key = PropertyKey::from_number(i as f64);
                    if agent.has_property_value(item, &key)? {
                        let value = agent.get(item, &key)?;
                        agent.create_data_property_or_throw(
                            result_id,
                            &PropertyKey::from_number(out as f64),
                            value,
                        )?;
                    }
                    out += 1;
                }
            } else {
                agent.create_data_property_or_throw(
                    result_id,
                    &PropertyKey::from_number(out as f64),
                    item.clone(),
                )?;
                out += 1;
            }
            Ok(())
        };
        append(agent, &this_value)?;
        for arg in args {
            append(agent, arg)?;
        }
        agent.set_property(
            &result,
            &PropertyKey::from_str("length"),
            JsValue::Number(out as f64),
            true,
        )?;
        Ok(result)
    });

    define_method(agent, prototype, "reverse", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let middle = length / 2;
        for lower in 0..middle {
            let upper = length - lower - 1;
            let lower_key = PropertyKey::from_number(lower as f64);
            let upper_key = PropertyKey::from_number(upper as f64);
            let lower_exists = agent.has_property_value(&target, &lower_key)?;
            let upper_exists = agent.has_property_value(&target, &upper_key)?;
            let lower_value = if lower_exists {
                Some(agent.get(&target, &lower_key)?)
            } else {
                None
            };
            let upper_value = if upper_exists {
                Some(agent.get(&target, &upper_key)?)
            } else {
                None
            };
            match (lower_value, upper_value) {
                (Some(lv), Some(uv)) => {
                    agent.set_property(&target, &lower_key, uv, true)?;
                    agent.set_property(&target, &upper_key, lv, true)?;
                }
                (None, Some(uv)) => {
                    agent.set_property(&target, &lower_key, uv, true)?;
                    agent.delete_property_or_throw(id, &upper_key)?;
                }
                (Some(lv), None) => {
                    agent.delete_property_or_throw(id, &lower_key)?;
                    agent.set_property(&target, &upper_key, lv, true)?;
                }
                (None, None) => {}
            }
        }
        Ok(target)
    });

    define_method(agent, prototype, "fill", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let start = relative_index(agent, args.get(1), length, 0)?;
        let end = relative_index(agent, args.get(2), length, length)?;
        for i in start..end {
            agent.set_property(
                &target,
                &PropertyKey::from_number(i as f64),
                value.clone(),
                true,
            )?;
        }
        Ok(target)
    });

    define_method(agent, prototype, "forEach", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                agent.call(
                    &callback,
                    &this_arg,
                    &[value, JsValue::Number(i as f64), target.clone()],
                )?;
            }
        }
        Ok(JsValue::Undefined)
    });

    define_method(agent, prototype, "map", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let result = agent.array_species_create(&target, length)?;
        let result_id = result.object_id().unwrap();
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                let mapped = agent.call(
                    &callback,
                    &this_arg,
                    &[value, JsValue::Number(i as f64), target.clone()],
                )?;
                agent.create_data_property_or_throw(result_id, &key, mapped)?;
            }
        }
        Ok(result)
    });

    define_method(agent, prototype, "filter", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        let result = agent.array_species_create(&target, 0)?;
        let result_id = result.object_id().unwrap();
        let mut out = 0u32;
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                let keep = agent.call(
                    &callback,
                    &this_arg,
                    &[value.clone(), JsValue::Number(i as f64), target.clone()],
                )?;
                if agent.to_boolean(&keep) {
                    agent.create_data_property_or_throw(
                        result_id,
                        &PropertyKey::Index(out),
                        value,
                    )?;
                    out += 1;
                }
            }
        }
        Ok(result)
    });

    define_method(agent, prototype, "reduce", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let mut accumulator = args.get(1).cloned();
        let mut index = 0u64;
        if accumulator.is_none() {
            while index < length {
                let key = PropertyKey::from_number(index as f64);
                index += 1;
                if agent.has_property_value(&target, &key)? {
                    accumulator = Some(agent.get(&target, &key)?);
                    break;
                }
            }
            if accumulator.is_none() {
                return Err(agent.type_error("Reduce of empty array with no initial value"));
            }
        }
        let mut acc = accumulator.unwrap();
        while index < length {
            let key = PropertyKey::from_number(index as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                acc = agent.call(
                    &callback,
                    &JsValue::Undefined,
                    &[acc, value, JsValue::Number(index as f64), target.clone()],
                )?;
            }
            index += 1;
        }
        Ok(acc)
    });

    define_method(agent, prototype, "some", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                let hit = agent.call(
                    &callback,
                    &this_arg,
                    &[value, JsValue::Number(i as f64), target.clone()],
                )?;
                if agent.to_boolean(&hit) {
                    return Ok(JsValue::Boolean(true));
                }
            }
        }
        Ok(JsValue::Boolean(false))
    });

    define_method(agent, prototype, "every", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let key = PropertyKey::from_number(i as f64);
            if agent.has_property_value(&target, &key)? {
                let value = agent.get(&target, &key)?;
                let hit = agent.call(
                    &callback,
                    &this_arg,
                    &[value, JsValue::Number(i as f64), target.clone()],
                )?;
                if !agent.to_boolean(&hit) {
                    return Ok(JsValue::Boolean(false));
                }
            }
        }
        Ok(JsValue::Boolean(true))
    });

    define_method(agent, prototype, "find", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let value = agent.get(&target, &PropertyKey::from_number(i as f64))?;
            let hit = agent.call(
                &callback,
                &this_arg,
                &[value.clone(), JsValue::Number(i as f64), target.clone()],
            )?;
            if agent.to_boolean(&hit) {
                return Ok(value);
            }
        }
        Ok(JsValue::Undefined)
    });

    define_method(agent, prototype, "findIndex", 1, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let callback = callback_arg(agent, args)?;
        let this_arg = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        for i in 0..length {
            let value = agent.get(&target, &PropertyKey::from_number(i as f64))?;
            let hit = agent.call(
                &callback,
                &this_arg,
                &[value, JsValue::Number(i as f64), target.clone()],
            )?;
            if agent.to_boolean(&hit) {
                return Ok(JsValue::Number(i as f64));
            }
        }
        Ok(JsValue::Number(-1.0))
    });

    define_method(agent, prototype, "flat", 0, |agent, this, args| {
        let id = agent.to_object(this)?;
        let target = JsValue::object(id);
        let length = length_of_array_like(agent, this)?;
        let depth = match args.first() {
            None | Some(JsValue::Undefined) => 1.0,
            Some(v) => agent.to_integer_or_infinity(v)?,
        };
        let result = agent.array_species_create(&target, 0)?;
        let result_id = result.object_id().unwrap();
        let mut out = 0u64;
        flatten_into(agent, &target, length, depth, result_id, &mut out)?;
        agent.set_property(
            &result,
            &PropertyKey::from_str("length"),
            JsValue::Number(out as f64),
            true,
        )?;
        Ok(result)
    });

    define_method(agent, prototype, "keys", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        Ok(agent.create_array_iterator(id, ArrayIterationKind::Key))
    });
    define_method(agent, prototype, "values", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        Ok(agent.create_array_iterator(id, ArrayIterationKind::Value))
    });
    define_method(agent, prototype, "entries", 0, |agent, this, _args| {
        let id = agent.to_object(this)?;
        Ok(agent.create_array_iterator(id, ArrayIterationKind::KeyValue))
    });
    let iterator_symbol = agent.well_known.iterator.clone();
    define_symbol_method(
        agent,
        prototype,
        iterator_symbol,
        "[Symbol.iterator]",
        0,
        |agent, this, _args| {
            let id = agent.to_object(this)?;
            Ok(agent.create_array_iterator(id, ArrayIterationKind::Value))
        },
    );

    // The Array constructor; new.target supplies the prototype so
    // subclasses construct their own instances.
    let ctor = create_constructor(agent, "Array", 1, prototype, |agent, _this, args| {
        let realm = agent.current_realm();
        let id = match args {
            [] => agent.array_create(0, realm),
            [JsValue::Number(n)] => {
                let length = number_ops::to_uint32(*n);
                if length as f64 != *n {
                    return Err(agent.range_error("Invalid array length"));
                }
                agent.array_create(length, realm)
            }
            items => {
                let id = agent.array_create(items.len() as u32, realm);
                for (i, item) in items.iter().enumerate() {
                    agent.create_data_property_or_throw(
                        id,
                        &PropertyKey::Index(i as u32),
                        item.clone(),
                    )?;
                }
                id
            }
        };
        apply_new_target_prototype(agent, id)?;
        Ok(JsValue::object(id))
    });
    agent.realms[realm].set_intrinsic(Intrinsic::ArrayConstructor, JsValue::object(ctor));

    define_method(agent, ctor, "isArray", 1, |agent, _this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        Ok(JsValue::Boolean(agent.is_array(&value)?))
    });

    define_method(agent, ctor, "of", 0, |agent, _this, args| {
        Ok(agent.create_array_from_list(args))
    });

    define_method(agent, ctor, "from", 1, |agent, _this, args| {
        let source = args.first().cloned().unwrap_or(JsValue::Undefined);
        let map_fn = args.get(1).cloned().unwrap_or(JsValue::Undefined);
        if !map_fn.is_undefined() && !agent.is_callable(&map_fn) {
            return Err(agent.type_error("Array.from map function is not callable"));
        }
        let iterator_key = PropertyKey::Symbol(agent.well_known.iterator.clone());
        let use_iterator = !source.is_nullish()
            && agent.get_method(&source, &iterator_key)?.is_some();
        let values = if use_iterator {
            agent.iterable_to_list(&source)?
        } else {
            agent.require_object_coercible(&source)?;
            agent.create_list_from_array_like(&source)?
        };
        let realm = agent.current_realm();
        let id = agent.array_create(values.len() as u32, realm);
        for (i, value) in values.into_iter().enumerate() {
            let value = if map_fn.is_undefined() {
                value
            } else {
                agent.call(&map_fn, &JsValue::Undefined, &[value, JsValue::Number(i as f64)])?
            };
            agent.create_data_property_or_throw(id, &PropertyKey::Index(i as u32), value)?;
        }
        Ok(JsValue::object(id))
    });

    // Array[@@species] is the constructor itself.
    let species_key = agent.well_known.species.clone();
    let species_getter =
        agent.create_native_function("get [Symbol.species]", 0, false, |_agent, this, _args| {
            Ok(this.clone())
        });
    {
        let obj = agent.get_object(ctor).unwrap();
        obj.borrow_mut().define(
            PropertyKey::Symbol(species_key),
            crate::interpreter::property::PropertyDescriptor {
                get: Some(species_getter),
                set: None,
                enumerable: Some(false),
                configurable: Some(true),
                ..Default::default()
            },
        );
    }
}

const fn number_ops_max_length() -> u64 {
    9007199254740991 // 2^53 − 1
}

/// Point a freshly constructed builtin instance at new.target's
/// prototype when a subclass is being constructed.
fn apply_new_target_prototype(agent: &mut Agent, id: u64) -> Result<(), JsValue> {
    let Some(new_target) = agent.native_new_target.clone() else {
        return Ok(());
    };
    if !new_target.is_object() {
        return Ok(());
    }
    let proto = agent.get(&new_target, &PropertyKey::from_str("prototype"))?;
    if let Some(proto_id) = proto.object_id() {
        let proto_ref = agent.get_object(proto_id);
        if let Some(obj) = agent.get_object(id) {
            obj.borrow_mut().prototype = proto_ref;
        }
    }
    Ok(())
}

/// LengthOfArrayLike: Get "length" then ToLength, in that order, which
/// tests observe through getters.
fn length_of_array_like(agent: &mut Agent, value: &JsValue) -> Result<u64, JsValue> {
    let length = agent.get_v(value, &PropertyKey::from_str("length"))?;
    agent.to_length(&length)
}

fn relative_index(
    agent: &mut Agent,
    value: Option<&JsValue>,
    length: u64,
    default: u64,
) -> Result<u64, JsValue> {
    let Some(value) = value else {
        return Ok(default);
    };
    if value.is_undefined() {
        return Ok(default);
    }
    let relative = agent.to_integer_or_infinity(value)?;
    Ok(if relative < 0.0 {
        ((length as f64) + relative).max(0.0) as u64
    } else {
        (relative as u64).min(length)
    })
}

fn callback_arg(agent: &mut Agent, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let callback = args.first().cloned().unwrap_or(JsValue::Undefined);
    if !agent.is_callable(&callback) {
        return Err(agent.type_error(&format!("{} is not a function", agent.inspect(&callback))));
    }
    Ok(callback)
}

/// FlattenIntoArray (§23.1.3.11.1).
fn flatten_into(
    agent: &mut Agent,
    source: &JsValue,
    length: u64,
    depth: f64,
    result: u64,
    out: &mut u64,
) -> Result<(), JsValue> {
    for i in 0..length {
        let key = PropertyKey::from_number(i as f64);
        if !agent.has_property_value(source, &key)? {
            continue;
        }
        let value = agent.get(source, &key)?;
        if depth > 0.0 && agent.is_array(&value)? {
            let inner_length = length_of_array_like(agent, &value)?;
            flatten_into(agent, &value, inner_length, depth - 1.0, result, out)?;
        } else {
            if *out >= number_ops_max_length() {
                return Err(agent.type_error("Array length exceeds 2^53 - 1"));
            }
            agent.create_data_property_or_throw(
                result,
                &PropertyKey::from_number(*out as f64),
                value,
            )?;
            *out += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::interpreter::agent::{Agent, AgentOptions};
    use crate::interpreter::Completion;
    use crate::types::JsValue;

    fn eval(src: &str) -> Completion {
        let mut agent = Agent::new(AgentOptions::default()).unwrap();
        let realm = agent.create_realm(None);
        agent.evaluate_script(realm, src, "array.js")
    }

    fn eval_number(src: &str) -> f64 {
        match eval(src) {
            Completion::Normal(JsValue::Number(n)) => n,
            other => panic!("expected number from {src}, got {other:?}"),
        }
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
    fn push_pop_track_length() {
        assert_eq!(eval_number("let a = [1,2,3]; a.push(4); a.length"), 4.0);
        assert_eq!(eval_number("let a = [1,2,3,4]; a.pop()"), 4.0);
        assert_eq!(eval_number("let a = [1,2,3,4]; a.pop(); a.length"), 3.0);
    }

    #[test]
    fn shift_unshift() {
        assert_eq!(eval_number("[1,2,3].shift()"), 1.0);
        assert_eq!(
            eval_string("var a = [2, 3]; a.unshift(0, 1); a.join(',')"),
            "0,1,2,3"
        );
    }

    #[test]
    fn slice_and_splice() {
        assert_eq!(eval_string("[1,2,3,4].slice(1, 3).join(',')"), "2,3");
        assert_eq!(eval_string("[1,2,3,4].slice(-2).join(',')"), "3,4");
        assert_eq!(
            eval_string("var a = [1,2,3,4]; var r = a.splice(1, 2, 'x'); r.join(',') + '|' + a.join(',')"),
            "2,3|1,x,4"
        );
    }

    #[test]
    fn flat_levels() {
        assert_eq!(eval_string("[[1,2],[3,[4]]].flat().join(',')"), "1,2,3,4");
        assert_eq!(
            eval_number("[[1,2],[3,[4]]].flat().filter(Array.isArray).length"),
            1.0
        );
        assert_eq!(
            eval_number("[[1,[2,[3]]]].flat(Infinity).filter(Array.isArray).length"),
            0.0
        );
    }

    #[test]
    fn higher_order_methods() {
        assert_eq!(
            eval_string("[1,2,3].map(function (x) { return x * 2; }).join(',')"),
            "2,4,6"
        );
        assert_eq!(
            eval_string("[1,2,3,4].filter(function (x) { return x % 2 === 0; }).join(',')"),
            "2,4"
        );
        assert_eq!(
            eval_number("[1,2,3].reduce(function (a, b) { return a + b; }, 10)"),
            16.0
        );
        assert!(eval_bool("[1,2,3].some(function (x) { return x === 2; })"));
        assert!(!eval_bool("[1,2,3].every(function (x) { return x < 3; })"));
        assert_eq!(
            eval_number("[5,6,7].findIndex(function (x) { return x === 6; })"),
            1.0
        );
    }

    #[test]
    fn holes_are_skipped_by_foreach() {
        assert_eq!(
            eval_number("var n = 0; [1, , 3].forEach(function () { n++; }); n"),
            2.0
        );
    }

    #[test]
    fn index_of_and_includes() {
        assert_eq!(eval_number("[1, 2, NaN].indexOf(NaN)"), -1.0);
        assert!(eval_bool("[1, 2, NaN].includes(NaN)"));
        assert_eq!(eval_number("['a','b','a'].indexOf('a', 1)"), 2.0);
    }

    #[test]
    fn non_configurable_element_blocks_truncation() {
        assert!(eval_bool(
            "const a = [];\n\
             Object.defineProperty(a, '0', { value: 1, configurable: false });\n\
             var threw = false;\n\
             try { a.length = 0; } catch (e) { threw = e instanceof TypeError; }\n\
             threw === false && a.length === 1 && a[0] === 1"
        ));
        // In strict mode the failed length set throws.
        assert!(eval_bool(
            "'use strict';\n\
             const a = [];\n\
             Object.defineProperty(a, '0', { value: 1, configurable: false });\n\
             try { a.length = 0; false } catch (e) { e instanceof TypeError && a.length === 1 }"
        ));
    }

    #[test]
    fn species_construction() {
        assert!(eval_bool(
            "class MyArray extends Array {}\n\
             var m = new MyArray();\n\
             m.push(1, 2, 3);\n\
             m.slice(1) instanceof MyArray"
        ));
    }

    #[test]
    fn array_from_and_of() {
        assert_eq!(eval_string("Array.of(1, 'a', 2).join(',')"), "1,a,2");
        assert_eq!(eval_string("Array.from('abc').join('-')"), "a-b-c");
        assert_eq!(
            eval_string("Array.from([1, 2], function (x) { return x * 10; }).join(',')"),
            "10,20"
        );
        assert_eq!(
            eval_string("Array.from({ length: 2, 0: 'x', 1: 'y' }).join(',')"),
            "x,y"
        );
    }
}
