use crate::types::{number_ops, JsString, JsSymbol, JsValue};
use std::fmt;

/// Property keys (§6.1.7). Canonical array-index strings fold into the
/// `Index` variant so enumeration order and array-exotic bookkeeping can
/// work numerically; everything else stays a string or symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(u32),
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    pub fn from_str(s: &str) -> PropertyKey {
        Self::from_js_string(JsString::from_str(s))
    }

    pub fn from_js_string(s: JsString) -> PropertyKey {
        if let Some(index) = canonical_array_index(&s) {
            return PropertyKey::Index(index);
        }
        PropertyKey::String(s)
    }

    pub fn from_number(n: f64) -> PropertyKey {
        if n >= 0.0 && n < u32::MAX as f64 && n.fract() == 0.0 {
            return PropertyKey::Index(n as u32);
        }
        PropertyKey::String(JsString::from_str(&number_ops::to_string(n)))
    }

    pub fn is_array_index(&self) -> bool {
        matches!(self, PropertyKey::Index(_))
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// The key as a language value (symbols stay symbols, indices become
    /// strings).
    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::Index(i) => JsValue::String(JsString::from_str(&i.to_string())),
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }

    /// String form for environments and diagnostics. Symbols render with
    /// their description.
    pub fn to_display_string(&self) -> String {
        match self {
            PropertyKey::Index(i) => i.to_string(),
            PropertyKey::String(s) => s.to_rust_string(),
            PropertyKey::Symbol(s) => match &s.description {
                Some(d) => format!("Symbol({d})"),
                None => "Symbol()".to_string(),
            },
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// A string is a canonical array index when ToString(ToUint32(s)) == s
/// and the value is below 2^32 − 1.
fn canonical_array_index(s: &JsString) -> Option<u32> {
    let text = s.to_rust_string();
    if text.is_empty() || text.len() > 10 {
        return None;
    }
    if text == "0" {
        return Some(0);
    }
    if text.starts_with('0') || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u64 = text.parse().ok()?;
    if n < u32::MAX as u64 {
        Some(n as u32)
    } else {
        None
    }
}

/// Property descriptors (§6.2.5). Every field may be absent; absence has
/// composition semantics distinct from a present `undefined`.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// The default for ordinary assignment-created properties.
    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    /// Built-in method attributes: writable, non-enumerable, configurable.
    pub fn builtin(value: JsValue) -> Self {
        Self::data(value, true, false, true)
    }

    pub fn accessor(
        get: JsValue,
        set: JsValue,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    // §6.2.5.1–3
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.get.is_none()
            && self.set.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
    }

    /// CompletePropertyDescriptor (§6.2.5.6): fill absent fields with
    /// their defaults, producing a fully populated descriptor.
    pub fn complete(mut self) -> PropertyDescriptor {
        if self.is_accessor_descriptor() {
            self.get.get_or_insert(JsValue::Undefined);
            self.set.get_or_insert(JsValue::Undefined);
        } else {
            self.value.get_or_insert(JsValue::Undefined);
            self.writable.get_or_insert(false);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
        self
    }
}

fn same_value(a: &JsValue, b: &JsValue) -> bool {
    crate::interpreter::helpers::same_value(a, b)
}

/// ValidateAndApplyPropertyDescriptor (§10.1.6.3), factored as a pure
/// merge: given the current descriptor (if any) and the object's
/// extensibility, returns the descriptor to store, or `None` when the
/// definition must be rejected. The caller is responsible for the store.
pub fn validate_and_apply(
    current: Option<&PropertyDescriptor>,
    extensible: bool,
    desc: &PropertyDescriptor,
) -> Option<PropertyDescriptor> {
    let Some(current) = current else {
        // New property: extensibility gates, absent fields default.
        if !extensible {
            return None;
        }
        return Some(desc.clone().complete());
    };

    if desc.is_empty() {
        return Some(current.clone());
    }

    if current.configurable == Some(false) {
        if desc.configurable == Some(true) {
            return None;
        }
        if let Some(e) = desc.enumerable {
            if Some(e) != current.enumerable {
                return None;
            }
        }
        // Data/accessor interconversion is forbidden on non-configurable
        // properties.
        if desc.is_data_descriptor() && current.is_accessor_descriptor()
            || desc.is_accessor_descriptor() && current.is_data_descriptor()
        {
            return None;
        }
        if current.is_data_descriptor() && desc.is_data_descriptor() {
            if current.writable == Some(false) {
                if desc.writable == Some(true) {
                    return None;
                }
                if let Some(new_value) = &desc.value {
                    let cur = current.value.clone().unwrap_or(JsValue::Undefined);
                    if !same_value(new_value, &cur) {
                        return None;
                    }
                }
            }
        } else if current.is_accessor_descriptor() && desc.is_accessor_descriptor() {
            if let Some(g) = &desc.get {
                let cur = current.get.clone().unwrap_or(JsValue::Undefined);
                if !same_value(g, &cur) {
                    return None;
                }
            }
            if let Some(s) = &desc.set {
                let cur = current.set.clone().unwrap_or(JsValue::Undefined);
                if !same_value(s, &cur) {
                    return None;
                }
            }
        }
    }

    // Converting between data and accessor resets the unspecified side.
    let merged = if desc.is_data_descriptor() && current.is_accessor_descriptor() {
        PropertyDescriptor {
            value: desc.value.clone().or(Some(JsValue::Undefined)),
            writable: desc.writable.or(Some(false)),
            get: None,
            set: None,
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
        }
    } else if desc.is_accessor_descriptor() && current.is_data_descriptor() {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: desc.get.clone().or(Some(JsValue::Undefined)),
            set: desc.set.clone().or(Some(JsValue::Undefined)),
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
        }
    } else if current.is_accessor_descriptor() {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: desc.get.clone().or(current.get.clone()),
            set: desc.set.clone().or(current.set.clone()),
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
        }
    } else {
        PropertyDescriptor {
            value: desc.value.clone().or(current.value.clone()),
            writable: desc.writable.or(current.writable),
            get: None,
            set: None,
            enumerable: desc.enumerable.or(current.enumerable),
            configurable: desc.configurable.or(current.configurable),
        }
    };
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: f64, writable: bool, configurable: bool) -> PropertyDescriptor {
        PropertyDescriptor::data(JsValue::Number(value), writable, true, configurable)
    }

    #[test]
    fn key_canonicalisation() {
        assert_eq!(PropertyKey::from_str("0"), PropertyKey::Index(0));
        assert_eq!(PropertyKey::from_str("42"), PropertyKey::Index(42));
        assert!(matches!(PropertyKey::from_str("01"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::from_str("-1"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::from_str(""), PropertyKey::String(_)));
        // 2^32 − 1 is not an array index
        assert!(matches!(
            PropertyKey::from_str("4294967295"),
            PropertyKey::String(_)
        ));
        assert_eq!(
            PropertyKey::from_str("4294967294"),
            PropertyKey::Index(4294967294)
        );
    }

    #[test]
    fn new_property_requires_extensibility() {
        assert!(validate_and_apply(None, false, &data(1.0, true, true)).is_none());
        let stored = validate_and_apply(None, true, &data(1.0, true, true)).unwrap();
        assert_eq!(stored.enumerable, Some(true));
        assert_eq!(stored.configurable, Some(true));
    }

    #[test]
    fn new_property_fills_defaults() {
        let partial = PropertyDescriptor {
            value: Some(JsValue::Number(1.0)),
            ..Default::default()
        };
        let stored = validate_and_apply(None, true, &partial).unwrap();
        assert_eq!(stored.writable, Some(false));
        assert_eq!(stored.enumerable, Some(false));
        assert_eq!(stored.configurable, Some(false));
    }

    #[test]
    fn cannot_reconfigure_non_configurable() {
        let current = data(1.0, true, false);
        let mut attempt = data(1.0, true, false);
        attempt.configurable = Some(true);
        assert!(validate_and_apply(Some(&current), true, &attempt).is_none());
    }

    #[test]
    fn cannot_widen_writability() {
        let current = data(1.0, false, false);
        let mut attempt = PropertyDescriptor::default();
        attempt.writable = Some(true);
        assert!(validate_and_apply(Some(&current), true, &attempt).is_none());
        // Same value is fine.
        let same = PropertyDescriptor {
            value: Some(JsValue::Number(1.0)),
            ..Default::default()
        };
        assert!(validate_and_apply(Some(&current), true, &same).is_some());
        // A different value is not.
        let different = PropertyDescriptor {
            value: Some(JsValue::Number(2.0)),
            ..Default::default()
        };
        assert!(validate_and_apply(Some(&current), true, &different).is_none());
    }

    #[test]
    fn no_interconversion_when_non_configurable() {
        let current = data(1.0, true, false);
        let accessor =
            PropertyDescriptor::accessor(JsValue::Undefined, JsValue::Undefined, true, false);
        assert!(validate_and_apply(Some(&current), true, &accessor).is_none());
    }

    #[test]
    fn interconversion_resets_other_side() {
        let current = data(1.0, true, true);
        let accessor =
            PropertyDescriptor::accessor(JsValue::Undefined, JsValue::Undefined, true, true);
        let merged = validate_and_apply(Some(&current), true, &accessor).unwrap();
        assert!(merged.value.is_none());
        assert!(merged.writable.is_none());
        assert!(merged.is_accessor_descriptor());
    }

    #[test]
    fn partial_update_keeps_unspecified_fields() {
        let current = data(1.0, true, true);
        let update = PropertyDescriptor {
            value: Some(JsValue::Number(2.0)),
            ..Default::default()
        };
        let merged = validate_and_apply(Some(&current), true, &update).unwrap();
        assert_eq!(merged.writable, Some(true));
        assert_eq!(merged.enumerable, Some(true));
        assert!(matches!(merged.value, Some(JsValue::Number(n)) if n == 2.0));
    }

    #[test]
    fn descriptor_shape_predicates() {
        let d = data(1.0, true, true);
        assert!(d.is_data_descriptor() && !d.is_accessor_descriptor());
        let a = PropertyDescriptor::accessor(JsValue::Undefined, JsValue::Undefined, false, false);
        assert!(a.is_accessor_descriptor() && !a.is_data_descriptor());
        assert!(PropertyDescriptor::default().is_generic_descriptor());
    }
}
