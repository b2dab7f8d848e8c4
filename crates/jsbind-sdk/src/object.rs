//! User objects and delegates

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::error::{HostResult, InvokeError};
use crate::types::{HostType, TypeInfo};
use crate::value::{HostString, HostValue};

// ============================================================================
// HostObject
// ============================================================================

/// A host object exposed to script through reflective metadata.
///
/// Beyond `type_info`, implementors may opt into capabilities that change
/// how the value is converted for script code:
/// - `as_delegate`: converted to a script function
/// - `keyed_entries`: converted to a plain object (only when the type
///   declares no properties of its own)
/// - `ordered_items`: converted to an array
pub trait HostObject: Any {
    /// Reflective metadata for this object's runtime type
    fn type_info(&self) -> Rc<TypeInfo>;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// View this object as the Rust type `target` that a base type's
    /// members were declared on.
    ///
    /// Derived types that embed their base override this to hand out the
    /// embedded base value.
    fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
        let any = self.as_any();
        (any.type_id() == target).then_some(any)
    }

    /// Host `ToString`
    fn to_host_string(&self) -> String {
        self.type_info().name().to_string()
    }

    /// Callable capability
    fn as_delegate(&self) -> Option<Rc<Delegate>> {
        None
    }

    /// Keyed-container capability: entries in iteration order
    fn keyed_entries(&self) -> Option<Vec<(HostString, HostValue)>> {
        None
    }

    /// Ordered-container capability: items in iteration order
    fn ordered_items(&self) -> Option<Vec<HostValue>> {
        None
    }
}

// ============================================================================
// Delegate
// ============================================================================

/// Delegate body
pub type DelegateFn = Rc<dyn Fn(&[HostValue]) -> HostResult<HostValue>>;

/// A callable host value with a fixed, typed parameter list.
pub struct Delegate {
    params: Vec<HostType>,
    func: DelegateFn,
}

impl Delegate {
    /// Create a delegate
    pub fn new<F>(params: Vec<HostType>, func: F) -> Rc<Self>
    where
        F: Fn(&[HostValue]) -> HostResult<HostValue> + 'static,
    {
        Rc::new(Self {
            params,
            func: Rc::new(func),
        })
    }

    /// Declared parameter types
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    /// Parameter count
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke with late binding.
    ///
    /// The argument count must equal the arity and every argument must be
    /// accepted by its declared type as-is; otherwise nothing runs and
    /// `InvokeError::ArgumentMismatch` is returned.
    pub fn invoke(&self, args: &[HostValue]) -> Result<HostValue, InvokeError> {
        if args.len() != self.params.len() {
            return Err(InvokeError::ArgumentMismatch);
        }
        if !self.params.iter().zip(args).all(|(ty, arg)| ty.accepts(arg)) {
            return Err(InvokeError::ArgumentMismatch);
        }
        (self.func)(args).map_err(InvokeError::Exception)
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
