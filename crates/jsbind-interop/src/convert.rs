//! Value converter
//!
//! Engine → host (`from_engine`), first match wins:
//!
//! 1. `null` / `undefined` → `Null`
//! 2. booleans and numbers → `Bool`, `I32` (exact 32-bit integers) or `F64`
//! 3. strings → `HostString` (code units copied verbatim)
//! 4. arrays → `Array`, recorded in the tracker before the elements
//! 5. dates → local `DateTime` (`Null` for invalid dates)
//! 6. functions → `ScriptFunction`
//! 7. wrappers → the wrapped host value
//! 8. error objects → the host exception they carry, or a `ScriptError`
//! 9. plain objects → `Dictionary`, recorded in the tracker before the entries
//!
//! Host → engine (`to_engine`) goes from the most specific kind to the least
//! specific, ending with wrapping the value as an object.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use jsbind_engine::{Context, JsString, ObjectId, ObjectKind, Value};
use jsbind_sdk::{Decimal, HostObject, HostString, HostValue};
use rustc_hash::FxHashMap;

use crate::bridge;
use crate::dispatch;
use crate::error::{BridgeError, BridgeResult};
use crate::exception::{exception_to_engine, recover_host_exception};
use crate::script_function::ScriptFunction;
use crate::tracker::IdentityTracker;
use crate::wrapper::{self, register_handle};

// ============================================================================
// Engine → host
// ============================================================================

/// Convert an engine value with a fresh identity tracker.
pub fn from_engine_value(ctx: &mut Context, value: &Value) -> BridgeResult<HostValue> {
    let mut tracker = IdentityTracker::new();
    from_engine(ctx, value, &mut tracker)
}

/// Convert an engine value, sharing `tracker` with the rest of the pass.
pub fn from_engine(ctx: &mut Context, value: &Value, tracker: &mut IdentityTracker) -> BridgeResult<HostValue> {
    Ok(match value {
        Value::Undefined | Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Int(i) => HostValue::I32(*i),
        Value::Number(n) => match value.as_exact_i32() {
            Some(i) => HostValue::I32(i),
            None => HostValue::F64(*n),
        },
        Value::String(s) => HostValue::String(HostString::from_units(s.as_units())),
        Value::Object(id) => return from_engine_object(ctx, *id, tracker),
    })
}

fn from_engine_object(ctx: &mut Context, id: ObjectId, tracker: &mut IdentityTracker) -> BridgeResult<HostValue> {
    if let Some(converted) = tracker.get(id) {
        return Ok(converted);
    }
    let kind = match ctx.object_kind(id) {
        Some(ObjectKind::Array(_)) => Kind::Array,
        Some(ObjectKind::Date(millis)) => Kind::Date(*millis),
        Some(ObjectKind::Function(_)) => Kind::Function,
        Some(ObjectKind::Error { .. }) => Kind::Error,
        Some(ObjectKind::Ordinary) => Kind::Ordinary,
        None => return Err(BridgeError::StaleHandle),
    };
    match kind {
        Kind::Array => {
            let items = Rc::new(RefCell::new(Vec::new()));
            tracker.insert(id, HostValue::Array(items.clone()));
            let len = ctx.array_len(id).unwrap_or(0);
            for index in 0..len {
                let element = ctx.get_index(id, u32::try_from(index).unwrap_or(u32::MAX))?;
                let converted = from_engine(ctx, &element, tracker)?;
                items.borrow_mut().push(converted);
            }
            Ok(HostValue::Array(items))
        }
        Kind::Date(millis) => Ok(date_from_millis(millis).map_or(HostValue::Null, HostValue::DateTime)),
        Kind::Function => Ok(HostValue::object(ScriptFunction::new(ctx.id(), id))),
        Kind::Error => Ok(HostValue::Exception(recover_host_exception(ctx, &Value::Object(id)))),
        Kind::Ordinary if ctx.internal_field_count(id) > 0 => {
            Ok(wrapper::handle_of(ctx, id)?.value().clone())
        }
        Kind::Ordinary => {
            let map = Rc::new(RefCell::new(IndexMap::new()));
            tracker.insert(id, HostValue::Dictionary(map.clone()));
            for name in ctx.own_property_names(id)? {
                let value = ctx.get(id, &name)?;
                let converted = from_engine(ctx, &value, tracker)?;
                map.borrow_mut()
                    .insert(HostString::from_units(name.as_units()), converted);
            }
            Ok(HostValue::Dictionary(map))
        }
    }
}

/// Copy of the heap object's kind without borrowing the context
enum Kind {
    Array,
    Date(f64),
    Function,
    Error,
    Ordinary,
}

/// Unix epoch plus `millis`, in local time.
fn date_from_millis(millis: f64) -> Option<DateTime<Local>> {
    let converted = millis
        .is_finite()
        .then(|| millis.trunc())
        .filter(|ms| ms.abs() <= 8.64e15)
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        .map(|utc| utc.with_timezone(&Local));
    if converted.is_none() {
        tracing::debug!(millis, "invalid date converted to null");
    }
    converted
}

// ============================================================================
// Host → engine
// ============================================================================

/// Engine objects created for host containers during one `to_engine` pass
type Seen = FxHashMap<usize, ObjectId>;

/// Convert a host value to an engine value.
pub fn to_engine(ctx: &mut Context, value: &HostValue) -> BridgeResult<Value> {
    let mut seen = Seen::default();
    to_engine_with(ctx, value, &mut seen)
}

fn to_engine_with(ctx: &mut Context, value: &HostValue, seen: &mut Seen) -> BridgeResult<Value> {
    Ok(match value {
        HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Bool(*b),
        HostValue::I8(n) => Value::Int(i32::from(*n)),
        HostValue::I16(n) => Value::Int(i32::from(*n)),
        HostValue::I32(n) => Value::Int(*n),
        HostValue::U8(n) => Value::Int(i32::from(*n)),
        HostValue::U16(n) => Value::Int(i32::from(*n)),
        HostValue::U32(n) => match i32::try_from(*n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Number(f64::from(*n)),
        },
        HostValue::I64(n) => {
            let f = *n as f64;
            check_exact(ctx, value, f as i128 == i128::from(*n))?;
            Value::Number(f)
        }
        HostValue::U64(n) => {
            let f = *n as f64;
            check_exact(ctx, value, f as i128 == i128::from(*n))?;
            Value::Number(f)
        }
        HostValue::F32(n) => Value::Number(f64::from(*n)),
        HostValue::F64(n) => Value::Number(*n),
        HostValue::Decimal(d) => {
            let f = d.to_f64();
            let exact = Decimal::from_f64(f).is_some_and(|back| back.normalized() == d.normalized());
            check_exact(ctx, value, exact)?;
            Value::Number(f)
        }
        HostValue::Char(c) => Value::String(JsString::from(c.to_string())),
        HostValue::Enum(e) => Value::String(JsString::from(e.name())),
        HostValue::DateTime(dt) => Value::Object(ctx.new_date(dt.timestamp_millis() as f64)),
        HostValue::String(s) => Value::String(JsString::from_units(s.as_units())),
        HostValue::Array(items) | HostValue::List(items) => {
            let key = Rc::as_ptr(items) as usize;
            if let Some(&array) = seen.get(&key) {
                return Ok(Value::Object(array));
            }
            let array = ctx.new_array(Vec::new());
            seen.insert(key, array);
            let snapshot = items.borrow().clone();
            for (index, item) in snapshot.iter().enumerate() {
                let converted = to_engine_with(ctx, item, seen)?;
                ctx.set_index(array, u32::try_from(index).unwrap_or(u32::MAX), converted)?;
            }
            Value::Object(array)
        }
        HostValue::Dictionary(entries) => {
            let key = Rc::as_ptr(entries) as usize;
            if let Some(&object) = seen.get(&key) {
                return Ok(Value::Object(object));
            }
            let object = ctx.new_object();
            seen.insert(key, object);
            let snapshot: Vec<_> = entries
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            entries_to_object(ctx, object, snapshot, seen)?;
            Value::Object(object)
        }
        HostValue::Delegate(_) => delegate_function(ctx, value.clone()),
        HostValue::Exception(e) => exception_to_engine(ctx, e)?,
        HostValue::Object(object) => return object_to_engine(ctx, value, object, seen),
    })
}

fn object_to_engine(
    ctx: &mut Context,
    value: &HostValue,
    object: &Rc<dyn HostObject>,
    seen: &mut Seen,
) -> BridgeResult<Value> {
    if let Some(function) = object.as_any().downcast_ref::<ScriptFunction>() {
        return function.to_engine(ctx);
    }
    if let Some(delegate) = object.as_delegate() {
        return Ok(delegate_function(ctx, HostValue::Delegate(delegate)));
    }
    let key = Rc::as_ptr(object) as *const () as usize;
    if let Some(&target) = seen.get(&key) {
        return Ok(Value::Object(target));
    }
    if object.type_info().own_properties().is_empty() {
        if let Some(entries) = object.keyed_entries() {
            let target = ctx.new_object();
            seen.insert(key, target);
            entries_to_object(ctx, target, entries, seen)?;
            return Ok(Value::Object(target));
        }
    }
    if let Some(items) = object.ordered_items() {
        let array = ctx.new_array(Vec::new());
        seen.insert(key, array);
        for (index, item) in items.iter().enumerate() {
            let converted = to_engine_with(ctx, item, seen)?;
            ctx.set_index(array, u32::try_from(index).unwrap_or(u32::MAX), converted)?;
        }
        return Ok(Value::Object(array));
    }
    Ok(wrapper::wrap_object(ctx, value.clone()))
}

fn entries_to_object(
    ctx: &mut Context,
    object: ObjectId,
    entries: Vec<(HostString, HostValue)>,
    seen: &mut Seen,
) -> BridgeResult<()> {
    for (key, item) in entries {
        let converted = to_engine_with(ctx, &item, seen)?;
        ctx.set(object, &JsString::from_units(key.as_units()), converted)?;
    }
    Ok(())
}

/// Script function forwarding to a host delegate
fn delegate_function(ctx: &mut Context, delegate: HostValue) -> Value {
    let arity = match &delegate {
        HostValue::Delegate(d) => d.arity(),
        _ => 0,
    };
    let options = bridge::options(ctx).wrap_options();
    let token = register_handle(ctx, delegate, options);
    let function = ctx.new_function("", u32::try_from(arity).unwrap_or(u32::MAX), move |ctx, call| {
        dispatch::delegate_callback(ctx, token, call)
    });
    Value::Object(function)
}

/// Enforce `reject_lossy_numbers` for a narrowing numeric conversion.
fn check_exact(ctx: &mut Context, value: &HostValue, exact: bool) -> BridgeResult<()> {
    if exact {
        return Ok(());
    }
    if bridge::options(ctx).reject_lossy_numbers {
        return Err(BridgeError::ConversionLoss {
            value: value.to_display_string(),
            target: "number",
        });
    }
    tracing::debug!(value = %value.to_display_string(), "number narrowed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_millis() {
        let epoch = date_from_millis(0.0).unwrap();
        assert_eq!(epoch.timestamp_millis(), 0);
        assert!(date_from_millis(f64::NAN).is_none());
        assert!(date_from_millis(9e15).is_none());
    }

    #[test]
    fn test_numbers_prefer_i32() {
        let mut ctx = Context::new();
        assert_eq!(from_engine_value(&mut ctx, &Value::Number(3.0)).unwrap(), HostValue::I32(3));
        assert_eq!(from_engine_value(&mut ctx, &Value::Number(3.5)).unwrap(), HostValue::F64(3.5));
        assert_eq!(from_engine_value(&mut ctx, &Value::Number(-0.0)).unwrap(), HostValue::F64(-0.0));
        assert_eq!(from_engine_value(&mut ctx, &Value::Undefined).unwrap(), HostValue::Null);
    }

    #[test]
    fn test_wide_integers_narrow_by_default() {
        let mut ctx = Context::new();
        let big = HostValue::I64((1 << 53) + 1);
        assert_eq!(to_engine(&mut ctx, &big).unwrap(), Value::Number(9007199254740992.0));
        assert_eq!(to_engine(&mut ctx, &HostValue::U32(u32::MAX)).unwrap(), Value::Number(4294967295.0));
        assert_eq!(to_engine(&mut ctx, &HostValue::U16(7)).unwrap(), Value::Int(7));
    }
}
