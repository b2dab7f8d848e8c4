//! Object wrapper
//!
//! A wrapped host value is an instance of the context's wrapper template whose
//! single internal slot holds a token for a `WrapperHandle` in the context's
//! handle registry. The handle owns the host value; it is released together
//! with the context, after which the token no longer resolves.
//!
//! Script access to a wrapper goes through the interceptors below:
//!
//! | Access           | Resolution                                                  |
//! |------------------|-------------------------------------------------------------|
//! | `o.name`         | method → property → `toString` alias → reject / fall through |
//! | `o.name = v`     | property setter (value coerced to the declared type)        |
//! | `o[i]`, `o[i]=v` | host indexer                                                |
//! | `for (k in o)`   | enumerable properties declared on the exact runtime type    |

use std::cell::RefCell;
use std::rc::Rc;

use jsbind_engine::{
    Context, EngineResult, HandleId, IndexedPropertyHandler, JsString, NamedPropertyHandler,
    ObjectId, Value,
};
use jsbind_sdk::{convert_to_type, HostException, HostValue};
use rustc_hash::FxHashMap;

use crate::bridge;
use crate::config::WrapOptions;
use crate::convert::{from_engine_value, to_engine};
use crate::dispatch;
use crate::error::{BridgeError, BridgeResult};
use crate::exception::raise;

const TO_STRING_ALIAS: &str = "toString";
const TO_STRING: &str = "ToString";

// ============================================================================
// Wrapper handle
// ============================================================================

/// The capsule behind a wrapped object.
pub struct WrapperHandle {
    value: HostValue,
    options: WrapOptions,
    /// Bound method functions, so that `o.m === o.m`
    methods: RefCell<FxHashMap<String, ObjectId>>,
}

impl WrapperHandle {
    fn new(value: HostValue, options: WrapOptions) -> Self {
        Self {
            value,
            options,
            methods: RefCell::new(FxHashMap::default()),
        }
    }

    /// The wrapped host value
    pub fn value(&self) -> &HostValue {
        &self.value
    }

    /// Options fixed at wrap time
    pub fn options(&self) -> WrapOptions {
        self.options
    }
}

impl std::fmt::Debug for WrapperHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperHandle")
            .field("value", &self.value)
            .field("options", &self.options)
            .field("cached_methods", &self.methods.borrow().len())
            .finish()
    }
}

/// Register a capsule for `value` and return its token.
pub(crate) fn register_handle(ctx: &mut Context, value: HostValue, options: WrapOptions) -> HandleId {
    ctx.register_external(Rc::new(WrapperHandle::new(value, options)))
}

/// Resolve a capsule token.
pub(crate) fn resolve_handle(ctx: &Context, token: HandleId) -> BridgeResult<Rc<WrapperHandle>> {
    ctx.external(token)
        .and_then(|capsule| capsule.downcast::<WrapperHandle>().ok())
        .ok_or(BridgeError::StaleHandle)
}

/// Capsule behind a wrapper object.
pub(crate) fn handle_of(ctx: &Context, object: ObjectId) -> BridgeResult<Rc<WrapperHandle>> {
    let token = ctx.internal_field(object, 0).ok_or(BridgeError::StaleHandle)?;
    resolve_handle(ctx, token)
}

// ============================================================================
// Public API
// ============================================================================

/// Wrap `value` for script access using the context's default wrap options.
pub fn wrap_object(ctx: &mut Context, value: HostValue) -> Value {
    let options = bridge::options(ctx).wrap_options();
    wrap_object_with(ctx, value, options)
}

/// Wrap `value` for script access with explicit options.
///
/// Every call creates a new wrapper and a new handle, even for a value that
/// is already wrapped elsewhere.
pub fn wrap_object_with(ctx: &mut Context, value: HostValue, options: WrapOptions) -> Value {
    let template = bridge::wrapper_template(ctx);
    let object = ctx.new_instance(&template);
    let token = register_handle(ctx, value, options);
    ctx.set_internal_field(object, 0, token);
    tracing::trace!(object = object.as_u32(), handle = token.index(), "wrapped host value");
    Value::Object(object)
}

/// The host value behind a wrapper, or `None` for anything else.
pub fn unwrap_object(ctx: &Context, value: &Value) -> Option<HostValue> {
    let object = value.as_object()?;
    handle_of(ctx, object).ok().map(|handle| handle.value.clone())
}

/// Whether `value` is an object carrying an internal slot, i.e. a wrapper.
pub fn is_wrapped_object(ctx: &Context, value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| ctx.internal_field_count(object) > 0)
}

// ============================================================================
// Named access
// ============================================================================

fn bound_method(ctx: &mut Context, holder: ObjectId, handle: &WrapperHandle, name: &str) -> BridgeResult<Value> {
    if let Some(&function) = handle.methods.borrow().get(name) {
        return Ok(Value::Object(function));
    }
    let token = ctx.internal_field(holder, 0).ok_or(BridgeError::StaleHandle)?;
    let arity = handle
        .value
        .type_info()
        .and_then(|info| info.methods_named(name).first().map(|m| m.arity()))
        .unwrap_or(0);
    let member = name.to_string();
    let function = ctx.new_function(name, u32::try_from(arity).unwrap_or(u32::MAX), move |ctx, call| {
        dispatch::method_callback(ctx, token, &member, call)
    });
    handle.methods.borrow_mut().insert(name.to_string(), function);
    Ok(Value::Object(function))
}

/// `ToString` for values whose type declares none
fn default_to_string(ctx: &mut Context, holder: ObjectId, handle: &WrapperHandle) -> BridgeResult<Value> {
    if let Some(&function) = handle.methods.borrow().get(TO_STRING) {
        return Ok(Value::Object(function));
    }
    let token = ctx.internal_field(holder, 0).ok_or(BridgeError::StaleHandle)?;
    let function = ctx.new_function(TO_STRING, 0, move |ctx, _call| {
        resolve_handle(ctx, token)
            .map(|handle| Value::String(JsString::from(handle.value.to_display_string())))
            .map_err(|e| raise(ctx, e))
    });
    handle.methods.borrow_mut().insert(TO_STRING.to_string(), function);
    Ok(Value::Object(function))
}

fn unknown_member(handle: &WrapperHandle, name: &str) -> BridgeResult<Option<Value>> {
    if handle.options.reject_unknown_properties {
        Err(BridgeError::UnknownMember {
            name: name.to_string(),
        })
    } else {
        Ok(None)
    }
}

/// Named property read on a wrapper
pub(crate) fn get_named(ctx: &mut Context, holder: ObjectId, name: &JsString) -> BridgeResult<Option<Value>> {
    let handle = handle_of(ctx, holder)?;
    let name = name.to_string_lossy();
    let info = handle.value.type_info();

    if let Some(info) = &info {
        if info.has_method(&name) {
            return bound_method(ctx, holder, &handle, &name).map(Some);
        }
        if let Some(property) = info.property(&name) {
            let value = property.get(&handle.value)?;
            return to_engine(ctx, &value).map(Some);
        }
    }

    if name == TO_STRING_ALIAS && bridge::options(ctx).to_string_alias {
        let declared = info.as_ref().is_some_and(|info| info.has_method(TO_STRING));
        return if declared {
            bound_method(ctx, holder, &handle, TO_STRING).map(Some)
        } else {
            default_to_string(ctx, holder, &handle).map(Some)
        };
    }

    unknown_member(&handle, &name)
}

/// Named property write on a wrapper
pub(crate) fn set_named(
    ctx: &mut Context,
    holder: ObjectId,
    name: &JsString,
    value: Value,
) -> BridgeResult<Option<Value>> {
    let handle = handle_of(ctx, holder)?;
    let name = name.to_string_lossy();

    let property = handle
        .value
        .type_info()
        .and_then(|info| info.property(&name).cloned());
    let Some(property) = property else {
        return unknown_member(&handle, &name);
    };

    let host = from_engine_value(ctx, &value)?;
    let coerced = convert_to_type(&host, property.ty()).ok_or_else(|| {
        HostException::new(
            "ArgumentException",
            format!(
                "Cannot assign {} to property '{}' of type {}",
                host.host_type(),
                name,
                property.ty()
            ),
        )
    });
    let coerced = coerced.map_err(|e| BridgeError::HostException(Rc::new(e)))?;
    property.set(&handle.value, coerced)?;
    Ok(Some(value))
}

/// Enumerable property names of a wrapper
pub(crate) fn enumerate(ctx: &mut Context, holder: ObjectId) -> BridgeResult<Vec<JsString>> {
    let handle = handle_of(ctx, holder)?;
    Ok(handle
        .value
        .type_info()
        .map(|info| {
            info.enumerable_properties()
                .map(|p| JsString::from(p.name()))
                .collect()
        })
        .unwrap_or_default())
}

// ============================================================================
// Indexed access
// ============================================================================

/// Indexed read on a wrapper
pub(crate) fn get_indexed(ctx: &mut Context, holder: ObjectId, index: u32) -> BridgeResult<Option<Value>> {
    let handle = handle_of(ctx, holder)?;
    let Some(indexer) = handle.value.type_info().and_then(|info| info.indexer().cloned()) else {
        return Ok(None);
    };
    let value = indexer.get(&handle.value, index)?;
    to_engine(ctx, &value).map(Some)
}

/// Indexed write on a wrapper
pub(crate) fn set_indexed(
    ctx: &mut Context,
    holder: ObjectId,
    index: u32,
    value: Value,
) -> BridgeResult<Option<Value>> {
    let handle = handle_of(ctx, holder)?;
    let Some(indexer) = handle.value.type_info().and_then(|info| info.indexer().cloned()) else {
        return Ok(None);
    };
    let host = from_engine_value(ctx, &value)?;
    let coerced = convert_to_type(&host, indexer.element_type()).unwrap_or(host);
    match indexer.set(&handle.value, index, coerced) {
        Some(result) => result?,
        None => {
            return Err(BridgeError::HostException(Rc::new(HostException::new(
                "InvalidOperationException",
                "Indexer is read-only",
            ))))
        }
    }
    Ok(Some(value))
}

// ============================================================================
// Interceptors
// ============================================================================

/// Named interceptor installed on the wrapper template
pub(crate) struct WrapperNamedHandler;

impl NamedPropertyHandler for WrapperNamedHandler {
    fn get(&self, ctx: &mut Context, holder: ObjectId, name: &JsString) -> EngineResult<Option<Value>> {
        get_named(ctx, holder, name).map_err(|e| raise(ctx, e))
    }

    fn set(
        &self,
        ctx: &mut Context,
        holder: ObjectId,
        name: &JsString,
        value: Value,
    ) -> EngineResult<Option<Value>> {
        set_named(ctx, holder, name, value).map_err(|e| raise(ctx, e))
    }

    fn enumerate(&self, ctx: &mut Context, holder: ObjectId) -> EngineResult<Vec<JsString>> {
        enumerate(ctx, holder).map_err(|e| raise(ctx, e))
    }
}

/// Indexed interceptor installed on the wrapper template
pub(crate) struct WrapperIndexedHandler;

impl IndexedPropertyHandler for WrapperIndexedHandler {
    fn get(&self, ctx: &mut Context, holder: ObjectId, index: u32) -> EngineResult<Option<Value>> {
        get_indexed(ctx, holder, index).map_err(|e| raise(ctx, e))
    }

    fn set(
        &self,
        ctx: &mut Context,
        holder: ObjectId,
        index: u32,
        value: Value,
    ) -> EngineResult<Option<Value>> {
        set_indexed(ctx, holder, index, value).map_err(|e| raise(ctx, e))
    }
}
