//! Exception translator
//!
//! Host exceptions cross into script as error objects whose `message` is the
//! host message and whose `InnerException` property holds the wrapped
//! original. Crossing back, that property is what lets host code recover the
//! very same exception instance.

use std::rc::Rc;

use jsbind_engine::{Context, EngineError, JsString, Value};
use jsbind_sdk::{HostException, HostValue};

use crate::error::{BridgeError, BridgeResult};
use crate::wrapper::{unwrap_object, wrap_object};

/// Property of a translated error object holding the original exception
pub const INNER_EXCEPTION: &str = "InnerException";

/// Exception type given to script errors that carry no host exception
pub const SCRIPT_ERROR: &str = "ScriptError";

/// Build the engine error object for a host exception.
pub fn exception_to_engine(ctx: &mut Context, exception: &Rc<HostException>) -> BridgeResult<Value> {
    let error = ctx.new_error(JsString::from(exception.message()));
    let inner = wrap_object(ctx, HostValue::Exception(exception.clone()));
    ctx.set(error, &JsString::from(INNER_EXCEPTION), inner)?;
    Ok(Value::Object(error))
}

/// Turn a bridge failure into what an engine callback returns.
///
/// Nothing is raised while execution is terminating; the callback just lets
/// the termination keep unwinding.
pub fn raise(ctx: &mut Context, error: BridgeError) -> EngineError {
    if ctx.is_execution_terminating() {
        return EngineError::Terminated;
    }
    match error {
        BridgeError::Engine(e) => e,
        BridgeError::TerminationInProgress => EngineError::Terminated,
        BridgeError::HostException(e) => {
            tracing::debug!(exception = %e, "host exception raised into script");
            match exception_to_engine(ctx, &e) {
                Ok(value) => EngineError::Thrown(value),
                Err(BridgeError::Engine(e)) => e,
                Err(other) => ctx.throw_error(&other.to_string()),
            }
        }
        other => {
            tracing::debug!(error = %other, "bridge error raised into script");
            ctx.throw_error(&other.to_string())
        }
    }
}

/// Map a thrown script value back to a host exception.
///
/// Errors produced by `exception_to_engine` (and wrapped exceptions thrown
/// directly) yield the original instance; anything else becomes a new
/// `ScriptError` carrying the script message.
pub fn recover_host_exception(ctx: &Context, thrown: &Value) -> Rc<HostException> {
    if let Some(HostValue::Exception(e)) = unwrap_object(ctx, thrown) {
        return e;
    }
    let Some(object) = thrown.as_object() else {
        let message = match thrown {
            Value::String(s) => s.to_string_lossy(),
            other => format!("{other:?}"),
        };
        return Rc::new(HostException::new(SCRIPT_ERROR, message));
    };
    let inner = ctx
        .object(object)
        .and_then(|o| o.properties().get(&JsString::from(INNER_EXCEPTION)).cloned());
    if let Some(HostValue::Exception(e)) = inner.and_then(|v| unwrap_object(ctx, &v)) {
        return e;
    }
    let message = ctx
        .error_message(object)
        .map(|m| m.to_string_lossy())
        .unwrap_or_else(|| "Script exception".to_string());
    Rc::new(HostException::new(SCRIPT_ERROR, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_object_carries_original() {
        let mut ctx = Context::new();
        let original = Rc::new(HostException::new("IOException", "disk full"));
        let error = exception_to_engine(&mut ctx, &original).unwrap();
        let id = error.as_object().unwrap();
        assert_eq!(ctx.error_message(id).unwrap().to_string_lossy(), "disk full");
        let recovered = recover_host_exception(&mut ctx, &error);
        assert!(Rc::ptr_eq(&recovered, &original));
    }

    #[test]
    fn test_plain_script_errors_become_script_error() {
        let mut ctx = Context::new();
        let error = ctx.new_error(JsString::from("bad"));
        let recovered = recover_host_exception(&mut ctx, &Value::Object(error));
        assert_eq!(recovered.type_name(), SCRIPT_ERROR);
        assert_eq!(recovered.message(), "bad");

        let recovered = recover_host_exception(&mut ctx, &Value::string("thrown string"));
        assert_eq!(recovered.message(), "thrown string");
    }

    #[test]
    fn test_raise_is_silent_while_terminating() {
        let mut ctx = Context::new();
        ctx.terminate_execution();
        let e = Rc::new(HostException::new("E", "ignored"));
        assert_eq!(raise(&mut ctx, BridgeError::HostException(e)), EngineError::Terminated);
    }
}
