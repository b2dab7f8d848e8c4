//! jsbind SDK - the host object model
//!
//! This crate defines what host code looks like to the bridge, without
//! depending on any engine:
//!
//! - `HostValue`: the closed set of host values (primitives, strings, dates,
//!   containers, delegates, exceptions, user objects)
//! - `HostObject` + `TypeInfo`: user objects and their reflective metadata
//!   (overloaded methods, properties, indexers, base types, the
//!   script-enumerable marker)
//! - `coerce::convert_to_type`: the type coercion helper used for argument
//!   binding
//!
//! # Example
//!
//! ```ignore
//! use jsbind_sdk::{HostObject, HostType, HostValue, TypeInfo, TypeInfoBuilder};
//!
//! struct Greeter { name: String }
//!
//! impl HostObject for Greeter {
//!     fn type_info(&self) -> Rc<TypeInfo> {
//!         TypeInfoBuilder::<Greeter>::new("Greeter")
//!             .property("Name", HostType::String, |g| HostValue::string(&g.name))
//!             .enumerable()
//!             .method("Greet", &[HostType::String], |g, args| {
//!                 Ok(HostValue::from(format!("{} greets {:?}", g.name, args[0])))
//!             })
//!             .build()
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//! ```

#![warn(missing_docs)]

pub mod coerce;
pub mod error;
pub mod object;
pub mod types;
pub mod value;

pub use coerce::convert_to_type;
pub use error::{HostException, HostResult, InvokeError};
pub use object::{Delegate, DelegateFn, HostObject};
pub use types::{
    GetterFn, HostType, IndexGetFn, IndexSetFn, IndexerInfo, MethodFn, MethodInfo, PropertyInfo,
    SetterFn, TypeInfo, TypeInfoBuilder,
};
pub use value::{
    Decimal, EnumType, EnumValue, HostArray, HostDictionary, HostString, HostValue,
    ParseDecimalError,
};
