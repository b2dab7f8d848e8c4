//! Host exceptions and invocation errors

use std::rc::Rc;

use crate::types::{HostType, TypeInfo, TypeInfoBuilder};
use crate::value::HostValue;

/// Result type for host members: failures are shared exception instances so
/// that identity survives a trip through script code.
pub type HostResult<T> = Result<T, Rc<HostException>>;

/// A host exception.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{type_name}: {message}")]
pub struct HostException {
    type_name: String,
    message: String,
    inner: Option<Rc<HostException>>,
}

thread_local! {
    static EXCEPTION_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<HostException>::new("Exception")
        .property("Message", HostType::String, |e| HostValue::string(&e.message))
        .enumerable()
        .property("TypeName", HostType::String, |e| HostValue::string(&e.type_name))
        .property("InnerException", HostType::Exception, |e| {
            e.inner.clone().map_or(HostValue::Null, HostValue::Exception)
        })
        .method("ToString", &[], |e, _| Ok(HostValue::from(e.to_string())))
        .build();
}

impl HostException {
    /// Create an exception of type `type_name`
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            inner: None,
        }
    }

    /// Attach the exception that caused this one
    pub fn with_inner(mut self, inner: Rc<HostException>) -> Self {
        self.inner = Some(inner);
        self
    }

    /// Exception type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Causing exception, if any
    pub fn inner(&self) -> Option<&Rc<HostException>> {
        self.inner.as_ref()
    }

    /// Metadata shared by every exception: `Message`, `TypeName`,
    /// `InnerException` and `ToString`
    pub fn type_info() -> Rc<TypeInfo> {
        EXCEPTION_TYPE.with(Rc::clone)
    }
}

/// Why a delegate invocation did not produce a value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// The arguments do not bind to the delegate's parameter list
    #[error("Argument mismatch")]
    ArgumentMismatch,

    /// The delegate body raised
    #[error("{0}")]
    Exception(Rc<HostException>),
}

impl From<Rc<HostException>> for InvokeError {
    fn from(e: Rc<HostException>) -> Self {
        InvokeError::Exception(e)
    }
}
