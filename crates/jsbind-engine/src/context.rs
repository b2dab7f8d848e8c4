//! Execution context
//!
//! A `Context` is one isolated engine instance:
//! - its own object heap
//! - the handle registry for embedder capsules
//! - the object template used to wrap embedder objects
//! - the "execution is terminating" flag
//!
//! Contexts are single-threaded (`!Send`); every callback receives the
//! context it runs in as `&mut Context`.

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handles::{HandleId, HandleRegistry};
use crate::object::{CallArgs, JsObject, NativeFunction, ObjectKind, ObjectTemplate};
use crate::value::{JsString, ObjectId, Value};
use crate::{EngineError, EngineResult};

/// Unique identifier for a Context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Create a new unique context ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for creating a Context
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Initial heap capacity (objects)
    pub heap_capacity: usize,

    /// Initial handle registry capacity
    pub handle_capacity: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            heap_capacity: 256,
            handle_capacity: 64,
        }
    }
}

/// Engine execution context
pub struct Context {
    /// Unique context ID
    id: ContextId,

    /// Object heap, indexed by `ObjectId`
    heap: Vec<JsObject>,

    /// Embedder capsules (wrapper handles)
    handles: HandleRegistry,

    /// Template used for wrapping embedder objects
    wrapper_template: Option<Rc<ObjectTemplate>>,

    /// Opaque per-context state owned by the embedder
    embedder_data: Option<Rc<dyn Any>>,

    /// Set by `terminate_execution`
    terminating: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("objects", &self.heap.len())
            .field("handles", &self.handles)
            .field("terminating", &self.terminating)
            .finish()
    }
}

impl Context {
    /// Create a new context with default options
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a new context with specific options
    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            id: ContextId::new(),
            heap: Vec::with_capacity(options.heap_capacity),
            handles: HandleRegistry::with_capacity(options.handle_capacity),
            wrapper_template: None,
            embedder_data: None,
            terminating: false,
        }
    }

    /// Get the context ID
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Number of objects allocated so far
    pub fn object_count(&self) -> usize {
        self.heap.len()
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn alloc(&mut self, object: JsObject) -> ObjectId {
        let id = ObjectId(u32::try_from(self.heap.len()).unwrap_or(u32::MAX));
        self.heap.push(object);
        id
    }

    /// Allocate an empty plain object
    pub fn new_object(&mut self) -> ObjectId {
        self.alloc(JsObject::new(ObjectKind::Ordinary))
    }

    /// Allocate an array holding `elements`
    pub fn new_array(&mut self, elements: Vec<Value>) -> ObjectId {
        self.alloc(JsObject::new(ObjectKind::Array(elements)))
    }

    /// Allocate a date (milliseconds since the Unix epoch)
    pub fn new_date(&mut self, millis: f64) -> ObjectId {
        self.alloc(JsObject::new(ObjectKind::Date(millis)))
    }

    /// Allocate an error object
    pub fn new_error(&mut self, message: JsString) -> ObjectId {
        self.alloc(JsObject::new(ObjectKind::Error { message }))
    }

    /// Allocate a function object backed by a native callback
    pub fn new_function<F>(&mut self, name: &str, length: u32, callback: F) -> ObjectId
    where
        F: Fn(&mut Context, &CallArgs) -> EngineResult<Value> + 'static,
    {
        self.alloc(JsObject::new(ObjectKind::Function(NativeFunction {
            name: JsString::from(name),
            length,
            callback: Rc::new(callback),
        })))
    }

    /// Instantiate an object template
    pub fn new_instance(&mut self, template: &Rc<ObjectTemplate>) -> ObjectId {
        self.alloc(JsObject::from_template(template.clone()))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Borrow a heap object
    pub fn object(&self, id: ObjectId) -> Option<&JsObject> {
        self.heap.get(id.0 as usize)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.heap.get_mut(id.0 as usize)
    }

    /// Kind of the object behind `id`
    pub fn object_kind(&self, id: ObjectId) -> Option<&ObjectKind> {
        self.object(id).map(JsObject::kind)
    }

    fn value_kind(&self, value: &Value) -> Option<&ObjectKind> {
        value.as_object().and_then(|id| self.object_kind(id))
    }

    /// `Array.isArray`
    pub fn is_array(&self, value: &Value) -> bool {
        matches!(self.value_kind(value), Some(ObjectKind::Array(_)))
    }

    /// Date object check
    pub fn is_date(&self, value: &Value) -> bool {
        matches!(self.value_kind(value), Some(ObjectKind::Date(_)))
    }

    /// Callable check
    pub fn is_function(&self, value: &Value) -> bool {
        matches!(self.value_kind(value), Some(ObjectKind::Function(_)))
    }

    /// Error object check
    pub fn is_error(&self, value: &Value) -> bool {
        matches!(self.value_kind(value), Some(ObjectKind::Error { .. }))
    }

    /// Array length
    pub fn array_len(&self, id: ObjectId) -> Option<usize> {
        match self.object_kind(id) {
            Some(ObjectKind::Array(elements)) => Some(elements.len()),
            _ => None,
        }
    }

    /// Date value in milliseconds since the epoch
    pub fn date_value(&self, id: ObjectId) -> Option<f64> {
        match self.object_kind(id) {
            Some(ObjectKind::Date(millis)) => Some(*millis),
            _ => None,
        }
    }

    /// Error message
    pub fn error_message(&self, id: ObjectId) -> Option<JsString> {
        match self.object_kind(id) {
            Some(ObjectKind::Error { message }) => Some(message.clone()),
            _ => None,
        }
    }

    // ========================================================================
    // Internal fields
    // ========================================================================

    /// Number of internal slots on an object (0 for non-template objects)
    pub fn internal_field_count(&self, id: ObjectId) -> usize {
        self.object(id).map_or(0, JsObject::internal_field_count)
    }

    /// Store a handle in an internal slot. Returns false if the slot does not exist.
    pub fn set_internal_field(&mut self, id: ObjectId, index: usize, handle: HandleId) -> bool {
        match self
            .object_mut(id)
            .and_then(|object| object.internal_fields.get_mut(index))
        {
            Some(slot) => {
                *slot = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Read an internal slot
    pub fn internal_field(&self, id: ObjectId, index: usize) -> Option<HandleId> {
        self.object(id)
            .and_then(|object| object.internal_fields.get(index).copied())
            .flatten()
    }

    // ========================================================================
    // Property access
    // ========================================================================

    fn template_of(&self, id: ObjectId) -> Option<Rc<ObjectTemplate>> {
        self.object(id).and_then(|object| object.template.clone())
    }

    fn check_object(&mut self, id: ObjectId) -> EngineResult<()> {
        if self.object(id).is_some() {
            Ok(())
        } else {
            Err(self.throw_type_error("invalid object reference"))
        }
    }

    /// `object[key]`
    pub fn get(&mut self, id: ObjectId, key: &JsString) -> EngineResult<Value> {
        if let Some(index) = key.as_array_index() {
            return self.get_index(id, index);
        }
        self.check_object(id)?;
        if let Some(handler) = self.template_of(id).and_then(|t| t.named_handler()) {
            if let Some(value) = handler.get(self, id, key)? {
                return Ok(value);
            }
        }
        let Some(object) = self.object(id) else {
            return Ok(Value::Undefined);
        };
        if let Some(value) = object.properties.get(key) {
            return Ok(value.clone());
        }
        let key = key.to_string_lossy();
        Ok(match (&object.kind, key.as_str()) {
            (ObjectKind::Array(elements), "length") => array_length_value(elements.len()),
            (ObjectKind::Error { message }, "message") => Value::String(message.clone()),
            (ObjectKind::Error { .. }, "name") => Value::string("Error"),
            (ObjectKind::Function(function), "name") => Value::String(function.name.clone()),
            (ObjectKind::Function(function), "length") => array_length_value(function.length as usize),
            _ => Value::Undefined,
        })
    }

    /// `object[index]`
    pub fn get_index(&mut self, id: ObjectId, index: u32) -> EngineResult<Value> {
        self.check_object(id)?;
        if let Some(handler) = self.template_of(id).and_then(|t| t.indexed_handler()) {
            if let Some(value) = handler.get(self, id, index)? {
                return Ok(value);
            }
        }
        let Some(object) = self.object(id) else {
            return Ok(Value::Undefined);
        };
        Ok(match &object.kind {
            ObjectKind::Array(elements) => {
                elements.get(index as usize).cloned().unwrap_or(Value::Undefined)
            }
            _ => object
                .properties
                .get(&JsString::from(index.to_string()))
                .cloned()
                .unwrap_or(Value::Undefined),
        })
    }

    /// `object[key] = value`
    pub fn set(&mut self, id: ObjectId, key: &JsString, value: Value) -> EngineResult<()> {
        if let Some(index) = key.as_array_index() {
            return self.set_index(id, index, value);
        }
        self.check_object(id)?;
        if let Some(handler) = self.template_of(id).and_then(|t| t.named_handler()) {
            if handler.set(self, id, key, value.clone())?.is_some() {
                return Ok(());
            }
        }
        let Some(object) = self.object_mut(id) else {
            return Ok(());
        };
        if let ObjectKind::Array(elements) = &mut object.kind {
            if key.to_string_lossy() == "length" {
                if let Some(len) = value.as_exact_i32().and_then(|n| usize::try_from(n).ok()) {
                    elements.resize(len, Value::Undefined);
                }
                return Ok(());
            }
        }
        object.properties.insert(key.clone(), value);
        Ok(())
    }

    /// `object[index] = value`
    pub fn set_index(&mut self, id: ObjectId, index: u32, value: Value) -> EngineResult<()> {
        self.check_object(id)?;
        if let Some(handler) = self.template_of(id).and_then(|t| t.indexed_handler()) {
            if handler.set(self, id, index, value.clone())?.is_some() {
                return Ok(());
            }
        }
        let Some(object) = self.object_mut(id) else {
            return Ok(());
        };
        match &mut object.kind {
            ObjectKind::Array(elements) => {
                let index = index as usize;
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                if let Some(slot) = elements.get_mut(index) {
                    *slot = value;
                }
            }
            _ => {
                object
                    .properties
                    .insert(JsString::from(index.to_string()), value);
            }
        }
        Ok(())
    }

    /// Own enumerable property names, in enumeration order.
    ///
    /// Template instances report what their named interceptor enumerates,
    /// followed by any ordinary properties stored on the instance itself.
    pub fn own_property_names(&mut self, id: ObjectId) -> EngineResult<Vec<JsString>> {
        self.check_object(id)?;
        let mut names = Vec::new();
        if let Some(handler) = self.template_of(id).and_then(|t| t.named_handler()) {
            names = handler.enumerate(self, id)?;
        }
        if let Some(object) = self.object(id) {
            if let ObjectKind::Array(elements) = &object.kind {
                names.extend((0..elements.len()).map(|i| JsString::from(i.to_string())));
            }
            for key in object.properties.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        Ok(names)
    }

    // ========================================================================
    // Calls and exceptions
    // ========================================================================

    /// Call `function` with `this` and `args`.
    ///
    /// Returns `Err(EngineError::Terminated)` without running anything once
    /// execution is terminating.
    pub fn call(&mut self, function: &Value, this: Value, args: Vec<Value>) -> EngineResult<Value> {
        if self.terminating {
            return Err(EngineError::Terminated);
        }
        let callee = function.as_object();
        let callback = callee
            .and_then(|id| match self.object_kind(id) {
                Some(ObjectKind::Function(f)) => Some(f.callback.clone()),
                _ => None,
            });
        let (Some(callee), Some(callback)) = (callee, callback) else {
            return Err(self.throw_type_error(&format!("{} is not a function", function.type_name())));
        };
        let call = CallArgs { callee, this, args };
        callback(self, &call)
    }

    /// Build an error object and return it as a thrown exception
    pub fn throw_error(&mut self, message: &str) -> EngineError {
        let error = self.new_error(JsString::from(message));
        EngineError::Thrown(Value::Object(error))
    }

    /// Build a `TypeError` and return it as a thrown exception
    pub fn throw_type_error(&mut self, message: &str) -> EngineError {
        let error = self.new_error(JsString::from(message));
        if let Some(object) = self.object_mut(error) {
            object
                .properties
                .insert(JsString::from("name"), Value::string("TypeError"));
        }
        EngineError::Thrown(Value::Object(error))
    }

    /// Start terminating execution; every further call unwinds immediately.
    pub fn terminate_execution(&mut self) {
        tracing::debug!(context = self.id.as_u64(), "terminating execution");
        self.terminating = true;
    }

    /// Resume normal execution after a termination has fully unwound
    pub fn cancel_terminate_execution(&mut self) {
        self.terminating = false;
    }

    /// Whether execution is currently terminating
    pub fn is_execution_terminating(&self) -> bool {
        self.terminating
    }

    // ========================================================================
    // Embedder support
    // ========================================================================

    /// Install the template used to wrap embedder objects
    pub fn set_object_wrapper_template(&mut self, template: Rc<ObjectTemplate>) {
        self.wrapper_template = Some(template);
    }

    /// Template used to wrap embedder objects
    pub fn object_wrapper_template(&self) -> Option<Rc<ObjectTemplate>> {
        self.wrapper_template.clone()
    }

    /// Attach opaque embedder state to this context
    pub fn set_embedder_data(&mut self, data: Rc<dyn Any>) {
        self.embedder_data = Some(data);
    }

    /// Opaque embedder state
    pub fn embedder_data(&self) -> Option<Rc<dyn Any>> {
        self.embedder_data.clone()
    }

    /// Register an embedder capsule and get its token
    pub fn register_external(&mut self, value: Rc<dyn Any>) -> HandleId {
        let id = self.handles.register(value);
        tracing::trace!(context = self.id.as_u64(), handle = id.index(), "registered handle");
        id
    }

    /// Fetch an embedder capsule by token
    pub fn external(&self, id: HandleId) -> Option<Rc<dyn Any>> {
        self.handles.get(id)
    }

    /// Number of live embedder capsules
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Release every embedder capsule. Tokens held by script objects go stale.
    pub fn release_handles(&mut self) -> usize {
        let released = self.handles.release_all();
        tracing::trace!(context = self.id.as_u64(), released, "released handles");
        released
    }

    /// Tear the context down, releasing embedder capsules exactly once.
    pub fn dispose(self) {}
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.release_handles();
        }
        // Embedder state may hold templates that point back at handlers
        self.embedder_data = None;
        self.wrapper_template = None;
    }
}

fn array_length_value(len: usize) -> Value {
    match i32::try_from(len) {
        Ok(n) => Value::Int(n),
        Err(_) => Value::Number(len as f64),
    }
}
