//! Type coercion
//!
//! `convert_to_type` is the host's "change type" helper used when binding
//! script-supplied arguments to declared parameter types. It returns `None`
//! when no conversion exists, which callers treat as "this overload does not
//! fit".
//!
//! Integral targets round half to even and reject out-of-range values;
//! strings parse with surrounding whitespace ignored.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Local};

use crate::types::HostType;
use crate::value::{Decimal, HostString, HostValue};

/// A numeric source value, normalised.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    fn of(value: &HostValue) -> Option<Num> {
        Some(match value {
            HostValue::Bool(b) => Num::Int(i128::from(*b)),
            HostValue::I8(n) => Num::Int(i128::from(*n)),
            HostValue::I16(n) => Num::Int(i128::from(*n)),
            HostValue::I32(n) => Num::Int(i128::from(*n)),
            HostValue::I64(n) => Num::Int(i128::from(*n)),
            HostValue::U8(n) => Num::Int(i128::from(*n)),
            HostValue::U16(n) => Num::Int(i128::from(*n)),
            HostValue::U32(n) => Num::Int(i128::from(*n)),
            HostValue::U64(n) => Num::Int(i128::from(*n)),
            HostValue::F32(n) => Num::Float(f64::from(*n)),
            HostValue::F64(n) => Num::Float(*n),
            HostValue::Decimal(d) => match d.to_integer() {
                Some(i) => Num::Int(i),
                None => Num::Float(d.to_f64()),
            },
            HostValue::Enum(e) => Num::Int(i128::from(e.value())),
            HostValue::String(s) => return parse_number(&s.to_string_lossy()),
            _ => return None,
        })
    }

    fn to_integer(self) -> Option<i128> {
        match self {
            Num::Int(i) => Some(i),
            Num::Float(f) if f.is_finite() => {
                let rounded = f.round_ties_even();
                // Beyond i128 range every integral target is out of range anyway
                (rounded.abs() < 1e38).then_some(rounded as i128)
            }
            Num::Float(_) => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn parse_number(s: &str) -> Option<Num> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i128>() {
        return Some(Num::Int(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Num::Float)
}

fn to_numeric(num: Num, target: &HostType) -> Option<HostValue> {
    macro_rules! integral {
        ($ty:ty, $variant:ident) => {
            num.to_integer()
                .and_then(|i| <$ty>::try_from(i).ok())
                .map(HostValue::$variant)
        };
    }
    match target {
        HostType::I8 => integral!(i8, I8),
        HostType::I16 => integral!(i16, I16),
        HostType::I32 => integral!(i32, I32),
        HostType::I64 => integral!(i64, I64),
        HostType::U8 => integral!(u8, U8),
        HostType::U16 => integral!(u16, U16),
        HostType::U32 => integral!(u32, U32),
        HostType::U64 => integral!(u64, U64),
        HostType::F32 => Some(HostValue::F32(num.to_f64() as f32)),
        HostType::F64 => Some(HostValue::F64(num.to_f64())),
        HostType::Decimal => match num {
            Num::Int(i) => Some(HostValue::Decimal(Decimal::new(i, 0))),
            Num::Float(f) => Decimal::from_f64(f).map(HostValue::Decimal),
        },
        _ => None,
    }
}

fn to_bool(value: &HostValue) -> Option<bool> {
    match value {
        HostValue::String(s) => {
            let s = s.to_string_lossy();
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        HostValue::Char(_) | HostValue::DateTime(_) => None,
        other => Num::of(other).map(|n| n.to_f64() != 0.0),
    }
}

fn to_char(value: &HostValue) -> Option<char> {
    match value {
        HostValue::String(s) => {
            let s = s.to_string_lossy();
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        HostValue::F32(_) | HostValue::F64(_) | HostValue::Decimal(_) | HostValue::Bool(_) => None,
        other => Num::of(other)
            .and_then(Num::to_integer)
            .and_then(|i| u32::try_from(i).ok())
            .and_then(char::from_u32),
    }
}

fn is_string_convertible(value: &HostValue) -> bool {
    !matches!(
        value,
        HostValue::Array(_)
            | HostValue::Dictionary(_)
            | HostValue::List(_)
            | HostValue::Delegate(_)
            | HostValue::Object(_)
    )
}

/// Convert `value` to `target`, or `None` if no conversion exists.
pub fn convert_to_type(value: &HostValue, target: &HostType) -> Option<HostValue> {
    let converted = convert(value, target);
    if converted.is_none() {
        tracing::trace!(from = %value.host_type(), to = %target, "no conversion");
    }
    converted
}

fn convert(value: &HostValue, target: &HostType) -> Option<HostValue> {
    if value.is_null() || target.accepts(value) {
        return Some(value.clone());
    }
    match target {
        t if t.is_numeric() => match value {
            HostValue::Char(_) | HostValue::DateTime(_) => None,
            other => Num::of(other).and_then(|n| to_numeric(n, t)),
        },
        HostType::Bool => to_bool(value).map(HostValue::Bool),
        HostType::Char => to_char(value).map(HostValue::Char),
        HostType::String => is_string_convertible(value)
            .then(|| HostValue::String(HostString::from(value.to_display_string()))),
        HostType::Enum(ty) => match value {
            HostValue::String(s) => ty.variant(s.to_string_lossy().trim()).map(HostValue::Enum),
            other => Num::of(other)
                .and_then(Num::to_integer)
                .and_then(|i| i64::try_from(i).ok())
                .and_then(|i| ty.variant_of(i))
                .map(HostValue::Enum),
        },
        HostType::DateTime => match value {
            HostValue::String(s) => DateTime::parse_from_rfc3339(s.to_string_lossy().trim())
                .ok()
                .map(|dt| HostValue::DateTime(dt.with_timezone(&Local))),
            _ => None,
        },
        HostType::Array => match value {
            HostValue::List(items) => Some(HostValue::Array(Rc::new(RefCell::new(
                items.borrow().clone(),
            )))),
            _ => None,
        },
        HostType::List => match value {
            HostValue::Array(items) => Some(HostValue::List(Rc::new(RefCell::new(
                items.borrow().clone(),
            )))),
            _ => None,
        },
        _ => None,
    }
}
