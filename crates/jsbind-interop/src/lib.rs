//! jsbind interop
//!
//! The bridge between the host object model (`jsbind-sdk`) and the engine
//! value model (`jsbind-engine`):
//!
//! - **Value converter** (`convert`): engine values to host values and back,
//!   preserving object identity across cyclic graphs
//! - **Identity tracker** (`tracker`): per-pass map from engine object to the
//!   host value produced for it
//! - **Object wrapper** (`wrapper`): exposes host objects to script through
//!   named/indexed interceptors on the context's wrapper template
//! - **Member dispatcher** (`dispatch`): overload resolution and delegate
//!   invocation
//! - **Exception translator** (`exception`): host exceptions to script errors
//!   and back, keeping instance identity
//!
//! # Example
//!
//! ```ignore
//! use jsbind_engine::{Context, JsString};
//! use jsbind_interop::{install, to_engine, BridgeOptions, BridgeResult};
//! use jsbind_sdk::HostValue;
//!
//! fn read_name(my_object: impl jsbind_sdk::HostObject) -> BridgeResult<()> {
//!     let mut ctx = Context::new();
//!     install(&mut ctx, BridgeOptions::default());
//!     let wrapped = to_engine(&mut ctx, &HostValue::object(my_object))?;
//!     if let Some(id) = wrapped.as_object() {
//!         let name = ctx.get(id, &JsString::from("Name"))?;
//!         println!("{name:?}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod exception;
pub mod script_function;
pub mod tracker;
pub mod wrapper;

pub use bridge::{install, BridgeState};
pub use config::{BridgeOptions, WrapOptions};
pub use convert::{from_engine, from_engine_value, to_engine};
pub use dispatch::{invoke_delegate, invoke_method};
pub use error::{BridgeError, BridgeResult, ConfigError};
pub use exception::{exception_to_engine, recover_host_exception, INNER_EXCEPTION, SCRIPT_ERROR};
pub use script_function::ScriptFunction;
pub use tracker::IdentityTracker;
pub use wrapper::{is_wrapped_object, unwrap_object, wrap_object, wrap_object_with, WrapperHandle};
