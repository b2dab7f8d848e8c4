//! Script functions seen from the host
//!
//! A script function converted to the host becomes a `ScriptFunction`: a
//! host object that remembers which context and which engine function it came
//! from. Host code invokes it with host values; converted back to the engine,
//! it is the original function again.

use std::any::Any;
use std::rc::Rc;

use jsbind_engine::{Context, ContextId, EngineError, ObjectId, Value};
use jsbind_sdk::{HostObject, HostValue, TypeInfo, TypeInfoBuilder};

use crate::convert::{from_engine_value, to_engine};
use crate::error::{BridgeError, BridgeResult};
use crate::exception::recover_host_exception;

thread_local! {
    static SCRIPT_FUNCTION_TYPE: Rc<TypeInfo> =
        TypeInfoBuilder::<ScriptFunction>::new("ScriptFunction").build();
}

/// Host-side proxy for an engine function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFunction {
    context: ContextId,
    function: ObjectId,
}

impl ScriptFunction {
    pub(crate) fn new(context: ContextId, function: ObjectId) -> Self {
        Self { context, function }
    }

    /// Context the function lives in
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// The engine function object
    pub fn function(&self) -> ObjectId {
        self.function
    }

    fn check_context(&self, ctx: &Context) -> BridgeResult<()> {
        if ctx.id() == self.context {
            Ok(())
        } else {
            Err(BridgeError::ContextMismatch)
        }
    }

    /// Call the function with `undefined` as receiver.
    pub fn invoke(&self, ctx: &mut Context, args: &[HostValue]) -> BridgeResult<HostValue> {
        self.invoke_with_this(ctx, &HostValue::Null, args)
    }

    /// Call the function with `this` bound to a converted host value.
    ///
    /// A script exception comes back as `BridgeError::HostException`, holding
    /// the original host exception when the script error carries one.
    pub fn invoke_with_this(
        &self,
        ctx: &mut Context,
        this: &HostValue,
        args: &[HostValue],
    ) -> BridgeResult<HostValue> {
        self.check_context(ctx)?;
        let this = match this {
            HostValue::Null => Value::Undefined,
            other => to_engine(ctx, other)?,
        };
        let args = args
            .iter()
            .map(|arg| to_engine(ctx, arg))
            .collect::<BridgeResult<Vec<_>>>()?;
        match ctx.call(&Value::Object(self.function), this, args) {
            Ok(result) => from_engine_value(ctx, &result),
            Err(EngineError::Thrown(thrown)) => {
                Err(BridgeError::HostException(recover_host_exception(ctx, &thrown)))
            }
            Err(EngineError::Terminated) => Err(BridgeError::TerminationInProgress),
        }
    }

    /// The engine value for this function in `ctx`
    pub(crate) fn to_engine(&self, ctx: &Context) -> BridgeResult<Value> {
        self.check_context(ctx)?;
        Ok(Value::Object(self.function))
    }
}

impl HostObject for ScriptFunction {
    fn type_info(&self) -> Rc<TypeInfo> {
        SCRIPT_FUNCTION_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn to_host_string(&self) -> String {
        "function".to_string()
    }
}
