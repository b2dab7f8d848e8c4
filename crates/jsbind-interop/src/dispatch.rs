//! Member dispatcher
//!
//! Overload resolution is a scored search over every method sharing the
//! requested name:
//!
//! - a candidate needs at least as many parameters as there are arguments;
//!   missing trailing arguments are bound to null
//! - null arguments bind to anything and do not score
//! - an argument whose runtime type equals the parameter type scores one
//! - any other argument must coerce to the parameter type, or the candidate
//!   is dropped
//! - the highest score wins; on a tie the later candidate wins only when its
//!   arity equals the argument count
//!
//! The search is greedy: `f(a, b, c)` and `f(a, b, c, d)` called with three
//! matching arguments resolve to the former even if a fourth argument was
//! meant for the latter.

use jsbind_engine::{CallArgs, Context, EngineResult, HandleId, Value};
use jsbind_sdk::{convert_to_type, Delegate, HostType, HostValue, InvokeError, MethodInfo};

use crate::convert::{from_engine, to_engine};
use crate::error::{BridgeError, BridgeResult};
use crate::exception::raise;
use crate::tracker::IdentityTracker;
use crate::wrapper::resolve_handle;

/// Bind converted arguments to a parameter list.
///
/// Returns the argument vector sized to the parameter list and the number of
/// exact type matches, or `None` if some argument cannot be coerced.
fn bind_arguments(supplied: &[HostValue], params: &[HostType]) -> Option<(Vec<HostValue>, usize)> {
    let mut bound = vec![HostValue::Null; params.len()];
    let mut matched = 0;
    for ((slot, arg), param) in bound.iter_mut().zip(supplied).zip(params) {
        if arg.is_null() {
            continue;
        }
        if arg.host_type() == *param {
            *slot = arg.clone();
            matched += 1;
        } else {
            *slot = convert_to_type(arg, param)?;
        }
    }
    Some((bound, matched))
}

/// Pick the best overload for `supplied`.
fn resolve_overload<'a>(
    candidates: &[&'a MethodInfo],
    supplied: &[HostValue],
) -> Option<(&'a MethodInfo, Vec<HostValue>, usize)> {
    let mut best: Option<(&MethodInfo, Vec<HostValue>, usize)> = None;
    for &method in candidates {
        if supplied.len() > method.arity() {
            continue;
        }
        let Some((bound, matched)) = bind_arguments(supplied, method.params()) else {
            continue;
        };
        let better = match &best {
            None => true,
            Some((_, _, best_matched)) => {
                matched > *best_matched
                    || (matched == *best_matched && supplied.len() == method.arity())
            }
        };
        if better {
            best = Some((method, bound, matched));
        }
    }
    best
}

/// Call the method `name` on `target` with script arguments.
pub fn invoke_method(ctx: &mut Context, target: &HostValue, name: &str, args: &[Value]) -> BridgeResult<Value> {
    let info = target.type_info().ok_or_else(|| BridgeError::UnknownMember {
        name: name.to_string(),
    })?;
    let candidates = info.methods_named(name);

    let mut tracker = IdentityTracker::new();
    let supplied = args
        .iter()
        .map(|arg| from_engine(ctx, arg, &mut tracker))
        .collect::<BridgeResult<Vec<_>>>()?;
    drop(tracker);

    let Some((method, bound, matched)) = resolve_overload(&candidates, &supplied) else {
        tracing::debug!(method = name, args = supplied.len(), "no overload accepts arguments");
        return Err(BridgeError::ArgumentMismatch {
            method: Some(name.to_string()),
        });
    };
    tracing::debug!(
        method = name,
        arity = method.arity(),
        matched,
        candidates = candidates.len(),
        "resolved overload"
    );

    let result = method.invoke(target, &bound)?;
    to_engine(ctx, &result)
}

/// Call a host delegate with script arguments.
///
/// Excess arguments are ignored and missing ones are null. Each argument is
/// coerced toward its parameter type when the runtime type differs; an
/// argument that cannot be coerced is passed as-is and fails binding.
pub fn invoke_delegate(ctx: &mut Context, delegate: &Delegate, args: &[Value]) -> BridgeResult<Value> {
    let mut tracker = IdentityTracker::new();
    let mut bound = Vec::with_capacity(delegate.arity());
    for index in 0..delegate.arity() {
        bound.push(match args.get(index) {
            Some(arg) => from_engine(ctx, arg, &mut tracker)?,
            None => HostValue::Null,
        });
    }
    drop(tracker);

    for (arg, param) in bound.iter_mut().zip(delegate.params()) {
        if arg.is_null() || arg.host_type() == *param {
            continue;
        }
        if let Some(converted) = convert_to_type(arg, param) {
            *arg = converted;
        }
    }

    match delegate.invoke(&bound) {
        Ok(result) => to_engine(ctx, &result),
        Err(InvokeError::ArgumentMismatch) => Err(BridgeError::ArgumentMismatch { method: None }),
        Err(InvokeError::Exception(e)) => Err(BridgeError::HostException(e)),
    }
}

// ============================================================================
// Engine callbacks
// ============================================================================

/// Body of a bound method function
pub(crate) fn method_callback(ctx: &mut Context, token: HandleId, name: &str, call: &CallArgs) -> EngineResult<Value> {
    let result = resolve_handle(ctx, token)
        .and_then(|handle| invoke_method(ctx, handle.value(), name, &call.args));
    result.map_err(|e| raise(ctx, e))
}

/// Body of a delegate function
pub(crate) fn delegate_callback(ctx: &mut Context, token: HandleId, call: &CallArgs) -> EngineResult<Value> {
    let result = resolve_handle(ctx, token).and_then(|handle| match handle.value() {
        HostValue::Delegate(delegate) => invoke_delegate(ctx, delegate, &call.args),
        _ => Err(BridgeError::StaleHandle),
    });
    result.map_err(|e| raise(ctx, e))
}
