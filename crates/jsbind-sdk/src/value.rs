//! Host values
//!
//! `HostValue` is the closed set of things host code can hand to (or receive
//! from) the bridge. Primitives are stored inline; containers, delegates,
//! exceptions and user objects are reference types, so two `HostValue`s can
//! share one underlying instance and identity is observable.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{DateTime, Local};
use indexmap::IndexMap;

use crate::error::HostException;
use crate::object::{Delegate, HostObject};
use crate::types::{HostType, TypeInfo};

// ============================================================================
// HostString
// ============================================================================

/// Immutable UTF-16 host string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostString(Rc<[u16]>);

impl HostString {
    /// Create from UTF-16 code units
    pub fn from_units(units: &[u16]) -> Self {
        HostString(Rc::from(units))
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
}

impl From<&str> for HostString {
    fn from(s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        HostString(Rc::from(units))
    }
}

impl From<String> for HostString {
    fn from(s: String) -> Self {
        HostString::from(s.as_str())
    }
}

impl fmt::Display for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

// ============================================================================
// Decimal
// ============================================================================

/// Fixed-point decimal: `mantissa * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    /// Unscaled value
    pub mantissa: i128,
    /// Number of fractional digits
    pub scale: u32,
}

impl Decimal {
    /// Create a decimal from its parts
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    /// Nearest double
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    /// Exact decimal form of a finite double's shortest representation.
    pub fn from_f64(n: f64) -> Option<Self> {
        if !n.is_finite() {
            return None;
        }
        n.to_string().parse().ok()
    }

    /// Same value with trailing fractional zeros removed
    pub fn normalized(self) -> Self {
        let mut d = self;
        while d.scale > 0 && d.mantissa % 10 == 0 {
            d.mantissa /= 10;
            d.scale -= 1;
        }
        d
    }

    /// Integral value, if there is no fractional part
    pub fn to_integer(self) -> Option<i128> {
        let divisor = 10i128.checked_pow(self.scale)?;
        (self.mantissa % divisor == 0).then(|| self.mantissa / divisor)
    }
}

/// Error parsing a decimal literal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal")]
pub struct ParseDecimalError;

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError);
        }
        let mut mantissa: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let digit = c.to_digit(10).ok_or(ParseDecimalError)?;
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(digit)))
                .ok_or(ParseDecimalError)?;
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| ParseDecimalError)?;
        Ok(Decimal::new(if negative { -mantissa } else { mantissa }, scale))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

// ============================================================================
// Enums
// ============================================================================

/// A host enumeration type: a name plus named integral variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    /// Type name
    pub name: String,
    /// `(variant name, value)` in declaration order
    pub variants: Vec<(String, i64)>,
}

impl EnumType {
    /// Create an enum type
    pub fn new(name: impl Into<String>, variants: &[(&str, i64)]) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            variants: variants
                .iter()
                .map(|(name, value)| ((*name).to_string(), *value))
                .collect(),
        })
    }

    /// Variant by name
    pub fn variant(self: &Rc<Self>, name: &str) -> Option<EnumValue> {
        self.variants
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| EnumValue { ty: self.clone(), index })
    }

    /// Variant by integral value
    pub fn variant_of(self: &Rc<Self>, value: i64) -> Option<EnumValue> {
        self.variants
            .iter()
            .position(|(_, v)| *v == value)
            .map(|index| EnumValue { ty: self.clone(), index })
    }
}

/// One variant of an `EnumType`.
#[derive(Debug, Clone)]
pub struct EnumValue {
    ty: Rc<EnumType>,
    index: usize,
}

impl EnumValue {
    /// The enum type
    pub fn enum_type(&self) -> &Rc<EnumType> {
        &self.ty
    }

    /// Variant name
    pub fn name(&self) -> &str {
        self.ty.variants.get(self.index).map_or("", |(n, _)| n.as_str())
    }

    /// Integral value
    pub fn value(&self) -> i64 {
        self.ty.variants.get(self.index).map_or(0, |(_, v)| *v)
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.index == other.index
    }
}

// ============================================================================
// HostValue
// ============================================================================

/// Shared, mutable host array
pub type HostArray = Rc<RefCell<Vec<HostValue>>>;

/// Shared, mutable host dictionary with string keys
pub type HostDictionary = Rc<RefCell<IndexMap<HostString, HostValue>>>;

/// A host value.
#[derive(Clone, Default)]
pub enum HostValue {
    /// Null reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed 8-bit integer
    I8(i8),
    /// Signed 16-bit integer
    I16(i16),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Single precision float
    F32(f32),
    /// Double precision float
    F64(f64),
    /// Unicode scalar
    Char(char),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// Enum variant
    Enum(EnumValue),
    /// Local date/time
    DateTime(DateTime<Local>),
    /// String
    String(HostString),
    /// Fixed-shape array
    Array(HostArray),
    /// String-keyed dictionary
    Dictionary(HostDictionary),
    /// Growable list
    List(HostArray),
    /// Callable delegate
    Delegate(Rc<Delegate>),
    /// Exception instance
    Exception(Rc<HostException>),
    /// User object described by reflective metadata
    Object(Rc<dyn HostObject>),
}

impl HostValue {
    /// Create a string value
    pub fn string(s: &str) -> Self {
        HostValue::String(HostString::from(s))
    }

    /// Create an array value
    pub fn array(items: Vec<HostValue>) -> Self {
        HostValue::Array(Rc::new(RefCell::new(items)))
    }

    /// Create a list value
    pub fn list(items: Vec<HostValue>) -> Self {
        HostValue::List(Rc::new(RefCell::new(items)))
    }

    /// Create a dictionary value
    pub fn dictionary<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: Into<HostString>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        HostValue::Dictionary(Rc::new(RefCell::new(map)))
    }

    /// Wrap a user object
    pub fn object<T: HostObject>(object: T) -> Self {
        HostValue::Object(Rc::new(object))
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Numeric value as a double, for every numeric kind
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            HostValue::I8(n) => f64::from(*n),
            HostValue::I16(n) => f64::from(*n),
            HostValue::I32(n) => f64::from(*n),
            HostValue::I64(n) => *n as f64,
            HostValue::U8(n) => f64::from(*n),
            HostValue::U16(n) => f64::from(*n),
            HostValue::U32(n) => f64::from(*n),
            HostValue::U64(n) => *n as f64,
            HostValue::F32(n) => f64::from(*n),
            HostValue::F64(n) => *n,
            HostValue::Decimal(d) => d.to_f64(),
            _ => return None,
        })
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&HostString> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// User object, if this is one
    pub fn as_object(&self) -> Option<&Rc<dyn HostObject>> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcast a user object to its concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object().and_then(|o| o.as_any().downcast_ref::<T>())
    }

    /// Runtime type
    pub fn host_type(&self) -> HostType {
        match self {
            HostValue::Null => HostType::Any,
            HostValue::Bool(_) => HostType::Bool,
            HostValue::I8(_) => HostType::I8,
            HostValue::I16(_) => HostType::I16,
            HostValue::I32(_) => HostType::I32,
            HostValue::I64(_) => HostType::I64,
            HostValue::U8(_) => HostType::U8,
            HostValue::U16(_) => HostType::U16,
            HostValue::U32(_) => HostType::U32,
            HostValue::U64(_) => HostType::U64,
            HostValue::F32(_) => HostType::F32,
            HostValue::F64(_) => HostType::F64,
            HostValue::Char(_) => HostType::Char,
            HostValue::Decimal(_) => HostType::Decimal,
            HostValue::Enum(e) => HostType::Enum(e.enum_type().clone()),
            HostValue::DateTime(_) => HostType::DateTime,
            HostValue::String(_) => HostType::String,
            HostValue::Array(_) => HostType::Array,
            HostValue::Dictionary(_) => HostType::Dictionary,
            HostValue::List(_) => HostType::List,
            HostValue::Delegate(_) => HostType::Delegate,
            HostValue::Exception(_) => HostType::Exception,
            HostValue::Object(o) => HostType::Object(Rc::from(o.type_info().name())),
        }
    }

    /// Reflective metadata for values that expose members
    pub fn type_info(&self) -> Option<Rc<TypeInfo>> {
        match self {
            HostValue::Object(o) => Some(o.type_info()),
            HostValue::Exception(_) => Some(HostException::type_info()),
            _ => None,
        }
    }

    /// Human-readable form, the host's `ToString`
    pub fn to_display_string(&self) -> String {
        match self {
            HostValue::Null => String::new(),
            HostValue::Bool(true) => "True".to_string(),
            HostValue::Bool(false) => "False".to_string(),
            HostValue::I8(n) => n.to_string(),
            HostValue::I16(n) => n.to_string(),
            HostValue::I32(n) => n.to_string(),
            HostValue::I64(n) => n.to_string(),
            HostValue::U8(n) => n.to_string(),
            HostValue::U16(n) => n.to_string(),
            HostValue::U32(n) => n.to_string(),
            HostValue::U64(n) => n.to_string(),
            HostValue::F32(n) => n.to_string(),
            HostValue::F64(n) => n.to_string(),
            HostValue::Char(c) => c.to_string(),
            HostValue::Decimal(d) => d.to_string(),
            HostValue::Enum(e) => e.name().to_string(),
            HostValue::DateTime(dt) => dt.to_rfc3339(),
            HostValue::String(s) => s.to_string_lossy(),
            HostValue::Array(_) => "Array".to_string(),
            HostValue::Dictionary(_) => "Dictionary".to_string(),
            HostValue::List(_) => "List".to_string(),
            HostValue::Delegate(_) => "Delegate".to_string(),
            HostValue::Exception(e) => e.to_string(),
            HostValue::Object(o) => o.to_host_string(),
        }
    }
}

/// Value equality for primitives, structural equality for containers, and
/// reference identity for delegates, exceptions and user objects.
///
/// Comparing two distinct cyclic containers does not terminate.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue as V;
        match (self, other) {
            (V::Null, V::Null) => true,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::I8(a), V::I8(b)) => a == b,
            (V::I16(a), V::I16(b)) => a == b,
            (V::I32(a), V::I32(b)) => a == b,
            (V::I64(a), V::I64(b)) => a == b,
            (V::U8(a), V::U8(b)) => a == b,
            (V::U16(a), V::U16(b)) => a == b,
            (V::U32(a), V::U32(b)) => a == b,
            (V::U64(a), V::U64(b)) => a == b,
            (V::F32(a), V::F32(b)) => a == b,
            (V::F64(a), V::F64(b)) => a == b,
            (V::Char(a), V::Char(b)) => a == b,
            (V::Decimal(a), V::Decimal(b)) => a == b,
            (V::Enum(a), V::Enum(b)) => a == b,
            (V::DateTime(a), V::DateTime(b)) => a == b,
            (V::String(a), V::String(b)) => a == b,
            (V::Array(a), V::Array(b)) | (V::List(a), V::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (V::Dictionary(a), V::Dictionary(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (V::Delegate(a), V::Delegate(b)) => Rc::ptr_eq(a, b),
            (V::Exception(a), V::Exception(b)) => Rc::ptr_eq(a, b),
            (V::Object(a), V::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => f.write_str("Null"),
            HostValue::Bool(b) => write!(f, "Bool({b})"),
            HostValue::I8(n) => write!(f, "I8({n})"),
            HostValue::I16(n) => write!(f, "I16({n})"),
            HostValue::I32(n) => write!(f, "I32({n})"),
            HostValue::I64(n) => write!(f, "I64({n})"),
            HostValue::U8(n) => write!(f, "U8({n})"),
            HostValue::U16(n) => write!(f, "U16({n})"),
            HostValue::U32(n) => write!(f, "U32({n})"),
            HostValue::U64(n) => write!(f, "U64({n})"),
            HostValue::F32(n) => write!(f, "F32({n:?})"),
            HostValue::F64(n) => write!(f, "F64({n:?})"),
            HostValue::Char(c) => write!(f, "Char({c:?})"),
            HostValue::Decimal(d) => write!(f, "Decimal({d})"),
            HostValue::Enum(e) => write!(f, "Enum({}.{})", e.enum_type().name, e.name()),
            HostValue::DateTime(dt) => write!(f, "DateTime({})", dt.to_rfc3339()),
            HostValue::String(s) => write!(f, "String({s:?})"),
            // Containers may be cyclic; print the shape only
            HostValue::Array(a) => write!(f, "Array(len={})", a.borrow().len()),
            HostValue::Dictionary(d) => write!(f, "Dictionary(len={})", d.borrow().len()),
            HostValue::List(l) => write!(f, "List(len={})", l.borrow().len()),
            HostValue::Delegate(d) => write!(f, "Delegate(arity={})", d.arity()),
            HostValue::Exception(e) => write!(f, "Exception({e})"),
            HostValue::Object(o) => write!(f, "Object({})", o.type_info().name()),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from(v: $ty) -> Self {
                    HostValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    Decimal => Decimal,
    EnumValue => Enum,
    DateTime<Local> => DateTime,
    HostString => String,
    Rc<Delegate> => Delegate,
    Rc<HostException> => Exception,
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::string(s)
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(HostString::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parse_and_display() {
        let d: Decimal = "-12.050".parse().unwrap();
        assert_eq!(d, Decimal::new(-12050, 3));
        assert_eq!(d.to_string(), "-12.050");
        assert_eq!(Decimal::new(5, 3).to_string(), "0.005");
        assert_eq!(Decimal::new(42, 0).to_string(), "42");
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_decimal_from_f64() {
        assert_eq!(Decimal::from_f64(0.1), Some(Decimal::new(1, 1)));
        assert_eq!(Decimal::from_f64(2.0), Some(Decimal::new(2, 0)));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
        assert_eq!(Decimal::new(300, 2).to_integer(), Some(3));
        assert_eq!(Decimal::new(301, 2).to_integer(), None);
        assert_eq!(Decimal::new(1200, 3).normalized(), Decimal::new(12, 1));
    }

    #[test]
    fn test_enum_lookup() {
        let color = EnumType::new("Color", &[("Red", 1), ("Green", 2)]);
        let green = color.variant("Green").unwrap();
        assert_eq!(green.name(), "Green");
        assert_eq!(green.value(), 2);
        assert_eq!(color.variant_of(1).unwrap().name(), "Red");
        assert!(color.variant("Blue").is_none());
    }

    #[test]
    fn test_container_equality() {
        let a = HostValue::array(vec![HostValue::I32(1), HostValue::string("x")]);
        let b = HostValue::array(vec![HostValue::I32(1), HostValue::string("x")]);
        assert_eq!(a, b);
        assert_ne!(a, HostValue::list(vec![HostValue::I32(1), HostValue::string("x")]));
        assert_ne!(HostValue::I32(1), HostValue::I64(1));
    }

    #[test]
    fn test_host_type_of_primitives() {
        assert_eq!(HostValue::U16(3).host_type(), HostType::U16);
        assert_eq!(HostValue::string("s").host_type(), HostType::String);
        assert_eq!(HostValue::Null.host_type(), HostType::Any);
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(HostValue::Bool(true).to_display_string(), "True");
        assert_eq!(HostValue::F64(1.5).to_display_string(), "1.5");
        assert_eq!(HostValue::Char('z').to_display_string(), "z");
    }
}
