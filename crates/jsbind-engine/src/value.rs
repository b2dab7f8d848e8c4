//! Engine values
//!
//! `Value` is the engine-side tagged union. Primitives are stored inline;
//! every object kind (plain objects, arrays, dates, functions, errors and
//! template instances) lives in the owning `Context` heap and is referred to
//! by an `ObjectId`.

use std::fmt;
use std::rc::Rc;

// ============================================================================
// JsString
// ============================================================================

/// Immutable UTF-16 string, the engine's native string representation.
///
/// Code units are kept verbatim, so strings carrying lone surrogates survive
/// a trip through the engine unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString(Rc<[u16]>);

impl JsString {
    /// Create from UTF-16 code units
    pub fn from_units(units: &[u16]) -> Self {
        JsString(Rc::from(units))
    }

    /// Borrow the raw code units
    pub fn as_units(&self) -> &[u16] {
        &self.0
    }

    /// Number of UTF-16 code units
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the string is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode to a Rust string, replacing unpaired surrogates
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Parse as a canonical array index (`"0"`, `"17"`, never `"01"`).
    pub fn as_array_index(&self) -> Option<u32> {
        let units = self.as_units();
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut index: u64 = 0;
        for &unit in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&unit) {
                return None;
            }
            index = index * 10 + u64::from(unit - u16::from(b'0'));
        }
        // 2^32 - 1 is not a valid array index
        u32::try_from(index).ok().filter(|&i| i != u32::MAX)
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        JsString(Rc::from(units))
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from(s.as_str())
    }
}

impl From<Vec<u16>> for JsString {
    fn from(units: Vec<u16>) -> Self {
        JsString(Rc::from(units))
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

// ============================================================================
// ObjectId
// ============================================================================

/// Identity of a heap object inside one `Context`.
///
/// Two values refer to the same engine object exactly when their ids are
/// equal; this is the key the conversion identity tracker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    /// Raw heap index
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

// ============================================================================
// Value
// ============================================================================

/// An engine value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Small integer (the engine's Smi fast path)
    Int(i32),
    /// Double precision number
    Number(f64),
    /// String
    String(JsString),
    /// Reference to a heap object
    Object(ObjectId),
}

impl Value {
    /// Create a string value
    pub fn string(s: &str) -> Self {
        Value::String(JsString::from(s))
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Either numeric representation
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Number(_))
    }

    /// Numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a 32-bit integer when it is exactly representable as one.
    ///
    /// Mirrors the engine's `IsInt32` predicate: `-0`, NaN, infinities and
    /// fractional values are excluded.
    pub fn as_exact_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Number(n) => {
                if n.fract() != 0.0 || !n.is_finite() {
                    return None;
                }
                if *n == 0.0 && n.is_sign_negative() {
                    return None;
                }
                if *n < f64::from(i32::MIN) || *n > f64::from(i32::MAX) {
                    return None;
                }
                Some(*n as i32)
            }
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Object id, if this is an object
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// `typeof`-style name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Value::String(s)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}
