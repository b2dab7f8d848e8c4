//! jsbind engine
//!
//! A small JavaScript engine surface for embedders:
//! - `Value` / `JsString` / `ObjectId`: the engine value model
//! - `Context`: an isolated heap with property access, calls and termination
//! - `ObjectTemplate`: objects with internal slots and property interceptors
//! - `HandleRegistry`: per-context storage for embedder capsules
//!
//! The bridge in `jsbind-interop` is written purely against this surface.

#![warn(rust_2018_idioms)]

pub mod context;
pub mod handles;
pub mod object;
pub mod value;

pub use context::{Context, ContextId, ContextOptions};
pub use handles::{HandleId, HandleRegistry};
pub use object::{
    CallArgs, IndexedPropertyHandler, JsObject, NamedPropertyHandler, NativeCallback,
    NativeFunction, ObjectKind, ObjectTemplate,
};
pub use value::{JsString, ObjectId, Value};

/// Abnormal completion of engine work
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A script exception is propagating
    #[error("uncaught exception: {0:?}")]
    Thrown(Value),

    /// Execution is being terminated and cannot be caught
    #[error("execution terminated")]
    Terminated,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
