use std::fmt;
use std::rc::Rc;

/// The language value universe (§6.1). Primitives are immutable; `Object`
/// is a handle into the agent's heap and compares by identity.
#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(JsObject),
}

/// Immutable UTF-16 code-unit sequence (§6.1.4). Shared by refcount so
/// property keys and values can alias the same buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsString {
    units: Rc<Vec<u16>>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            units: Rc::new(s.encode_utf16().collect()),
        }
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self {
            units: Rc::new(units),
        }
    }

    pub fn empty() -> Self {
        Self::from_units(Vec::new())
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn code_unit(&self, i: usize) -> Option<u16> {
        self.units.get(i).copied()
    }

    /// Lossy conversion for host-facing display; lone surrogates become
    /// U+FFFD but the engine-internal representation keeps them intact.
    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut units = Vec::with_capacity(self.len() + other.len());
        units.extend_from_slice(&self.units);
        units.extend_from_slice(&other.units);
        JsString::from_units(units)
    }

    // §6.1.4.1 StringIndexOf
    pub fn index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let len = self.len();
        let slen = search.len();
        if slen == 0 {
            return if from <= len { Some(from) } else { None };
        }
        if from + slen > len {
            return None;
        }
        (from..=(len - slen)).find(|&i| self.units[i..i + slen] == search.units[..])
    }

    pub fn last_index_of(&self, search: &JsString, from: usize) -> Option<usize> {
        let len = self.len();
        let slen = search.len();
        if slen == 0 {
            return Some(from.min(len));
        }
        if slen > len {
            return None;
        }
        let max_start = from.min(len - slen);
        (0..=max_start)
            .rev()
            .find(|&i| self.units[i..i + slen] == search.units[..])
    }

    pub fn substring(&self, start: usize, end: usize) -> JsString {
        let s = start.min(self.len());
        let e = end.min(self.len());
        if s >= e {
            return JsString::empty();
        }
        JsString::from_units(self.units[s..e].to_vec())
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

/// Unique-identity symbol (§6.1.5). Equality is by id; the description is
/// carried only for display and `Symbol.prototype.description`.
#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl std::hash::Hash for JsSymbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

impl JsBigInt {
    pub fn from_i64(n: i64) -> Self {
        Self {
            value: num_bigint::BigInt::from(n),
        }
    }
}

/// Heap handle. The slot index is stable for the object's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JsObject {
    pub id: u64,
}

impl JsValue {
    pub fn object(id: u64) -> JsValue {
        JsValue::Object(JsObject { id })
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, JsValue::Number(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, JsValue::Symbol(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, JsValue::BigInt(_))
    }

    pub fn object_id(&self) -> Option<u64> {
        match self {
            JsValue::Object(o) => Some(o.id),
            _ => None,
        }
    }

    /// The `typeof` operator's answer for this value, callability aside
    /// (the evaluator special-cases callable objects to "function").
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Symbol(_) => "symbol",
            JsValue::BigInt(_) => "bigint",
            JsValue::Object(_) => "object",
        }
    }
}

/// §6.1.6.1 operations on the Number type. All take raw f64 and follow
/// the spec algorithms, including −0 and NaN handling.
pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn exponentiate(base: f64, exp: f64) -> f64 {
        base.powf(exp)
    }

    pub fn remainder(n: f64, d: f64) -> f64 {
        n % d
    }

    pub fn equal(x: f64, y: f64) -> bool {
        if x.is_nan() || y.is_nan() {
            return false;
        }
        x == y
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    // §7.1.6 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        (x.trunc() as i64 as u32) as i32
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        x.trunc() as i64 as u32
    }

    pub fn bitwise_not(x: f64) -> f64 {
        f64::from(!to_int32(x))
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x).wrapping_shl(to_uint32(y) & 0x1F))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x).wrapping_shr(to_uint32(y) & 0x1F))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        to_uint32(x).wrapping_shr(to_uint32(y) & 0x1F) as f64
    }

    // §6.1.6.1.20 Number::toString, radix 10. ryu-js gives the shortest
    // representation that round-trips, which is what the spec's algorithm
    // produces.
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    /// Number::toString with an explicit radix in 2..=36.
    pub fn to_string_radix(x: f64, radix: u32) -> String {
        if radix == 10 {
            return to_string(x);
        }
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let negative = x < 0.0;
        let mut n = x.abs().trunc() as u64;
        let mut frac = x.abs().fract();
        let mut digits = Vec::new();
        if n == 0 {
            digits.push('0');
        }
        while n > 0 {
            digits.push(char::from_digit((n % radix as u64) as u32, radix).unwrap_or('0'));
            n /= radix as u64;
        }
        if negative {
            digits.push('-');
        }
        digits.reverse();
        let mut out: String = digits.into_iter().collect();
        if frac > 0.0 {
            out.push('.');
            // 20 fractional digits is enough to distinguish doubles
            for _ in 0..20 {
                frac *= radix as f64;
                let d = frac.trunc() as u32;
                out.push(char::from_digit(d, radix).unwrap_or('0'));
                frac -= d as f64;
                if frac == 0.0 {
                    break;
                }
            }
        }
        out
    }
}

/// §6.1.6.2 operations on the BigInt type. Fallible operations report
/// the spec's error condition as a static message; callers wrap it in the
/// right error object kind.
pub mod bigint_ops {
    use num_bigint::{BigInt, Sign};

    pub fn unary_minus(x: &BigInt) -> BigInt {
        -x
    }

    pub fn bitwise_not(x: &BigInt) -> BigInt {
        -(x + BigInt::from(1))
    }

    pub fn exponentiate(base: &BigInt, exp: &BigInt) -> Result<BigInt, &'static str> {
        if exp.sign() == Sign::Minus {
            return Err("Exponent must be non-negative");
        }
        let e: u32 = exp.try_into().map_err(|_| "Exponent too large")?;
        Ok(base.pow(e))
    }

    pub fn divide(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x / y)
    }

    pub fn remainder(x: &BigInt, y: &BigInt) -> Result<BigInt, &'static str> {
        if y.sign() == Sign::NoSign {
            return Err("Division by zero");
        }
        Ok(x % y)
    }

    pub fn left_shift(x: &BigInt, y: &BigInt) -> BigInt {
        let shift: i64 = y.try_into().unwrap_or(0);
        if shift >= 0 {
            x << (shift as u64)
        } else {
            x >> ((-shift) as u64)
        }
    }

    pub fn signed_right_shift(x: &BigInt, y: &BigInt) -> BigInt {
        let shift: i64 = y.try_into().unwrap_or(0);
        if shift >= 0 {
            x >> (shift as u64)
        } else {
            x << ((-shift) as u64)
        }
    }

    // §6.1.6.2.11: always a TypeError for BigInt
    pub fn unsigned_right_shift(_x: &BigInt, _y: &BigInt) -> Result<BigInt, &'static str> {
        Err("BigInts have no unsigned right shift")
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => match &s.description {
                Some(d) => write!(f, "Symbol({d})"),
                None => write!(f, "Symbol()"),
            },
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_index_of() {
        let s = JsString::from_str("hello world");
        assert_eq!(s.index_of(&JsString::from_str("world"), 0), Some(6));
        assert_eq!(s.index_of(&JsString::from_str("world"), 7), None);
        assert_eq!(s.index_of(&JsString::empty(), 5), Some(5));
    }

    #[test]
    fn string_substring_clamps() {
        let s = JsString::from_str("abcdef");
        assert_eq!(s.substring(2, 4).to_rust_string(), "cd");
        assert_eq!(s.substring(4, 100).to_rust_string(), "ef");
        assert_eq!(s.substring(5, 2).to_rust_string(), "");
    }

    #[test]
    fn number_to_string_specials() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(42.0), "42");
        assert_eq!(number_ops::to_string(0.1), "0.1");
    }

    #[test]
    fn number_to_string_radix() {
        assert_eq!(number_ops::to_string_radix(255.0, 16), "ff");
        assert_eq!(number_ops::to_string_radix(-8.0, 2), "-1000");
        assert_eq!(number_ops::to_string_radix(0.5, 2), "0.1");
    }

    #[test]
    fn same_value_distinguishes_zeros() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value_zero(0.0, -0.0));
        assert!(!number_ops::equal(f64::NAN, f64::NAN));
    }

    #[test]
    fn to_int32_wraps() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(4294967296.0), 0);
        assert_eq!(number_ops::to_int32(-1.5), -1);
        assert_eq!(number_ops::to_uint32(-1.0), 4294967295);
    }

    #[test]
    fn shift_masks_count() {
        assert_eq!(number_ops::left_shift(1.0, 36.0), 16.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
    }

    #[test]
    fn bigint_errors() {
        use num_bigint::BigInt;
        assert!(bigint_ops::divide(&BigInt::from(1), &BigInt::from(0)).is_err());
        assert!(bigint_ops::exponentiate(&BigInt::from(2), &BigInt::from(-1)).is_err());
        assert!(bigint_ops::unsigned_right_shift(&BigInt::from(1), &BigInt::from(1)).is_err());
    }

    #[test]
    fn symbol_identity() {
        let a = JsSymbol {
            id: 1,
            description: Some(JsString::from_str("x")),
        };
        let b = JsSymbol {
            id: 1,
            description: None,
        };
        let c = JsSymbol {
            id: 2,
            description: Some(JsString::from_str("x")),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn type_of_answers() {
        assert_eq!(JsValue::Null.type_of(), "object");
        assert_eq!(JsValue::Undefined.type_of(), "undefined");
        assert_eq!(JsValue::Number(1.0).type_of(), "number");
    }
}
