//! Heap objects, function callbacks and object templates

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::Context;
use crate::handles::HandleId;
use crate::value::{JsString, ObjectId, Value};
use crate::EngineResult;

// ============================================================================
// Function callbacks
// ============================================================================

/// Arguments of a function call as seen by a native callback.
#[derive(Debug, Clone)]
pub struct CallArgs {
    /// The function object being called
    pub callee: ObjectId,
    /// Receiver (`undefined` for plain calls)
    pub this: Value,
    /// Supplied arguments
    pub args: Vec<Value>,
}

impl CallArgs {
    /// Number of supplied arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if no arguments were supplied
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Argument at `index`, `undefined` when not supplied
    pub fn get(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Undefined)
    }
}

/// Native function body.
///
/// Script-visible functions are engine objects backed by one of these; an
/// `Err(EngineError::Thrown(v))` return raises `v` as a script exception.
pub type NativeCallback = Rc<dyn Fn(&mut Context, &CallArgs) -> EngineResult<Value>>;

/// A function object's payload
#[derive(Clone)]
pub struct NativeFunction {
    /// Function name (`fn.name`)
    pub name: JsString,
    /// Declared parameter count (`fn.length`)
    pub length: u32,
    /// Body
    pub callback: NativeCallback,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Interceptors
// ============================================================================

/// Named property interceptor installed on an object template.
///
/// Returning `Ok(None)` means "not intercepted": the engine falls back to the
/// object's ordinary own properties.
pub trait NamedPropertyHandler {
    /// Property read
    fn get(&self, ctx: &mut Context, holder: ObjectId, name: &JsString)
        -> EngineResult<Option<Value>>;

    /// Property write. `Ok(Some(_))` marks the write as handled.
    fn set(
        &self,
        ctx: &mut Context,
        holder: ObjectId,
        name: &JsString,
        value: Value,
    ) -> EngineResult<Option<Value>>;

    /// Names reported for `for..in` / `Object.keys`
    fn enumerate(&self, ctx: &mut Context, holder: ObjectId) -> EngineResult<Vec<JsString>>;
}

/// Indexed property interceptor installed on an object template.
pub trait IndexedPropertyHandler {
    /// Element read
    fn get(&self, ctx: &mut Context, holder: ObjectId, index: u32) -> EngineResult<Option<Value>>;

    /// Element write. `Ok(Some(_))` marks the write as handled.
    fn set(
        &self,
        ctx: &mut Context,
        holder: ObjectId,
        index: u32,
        value: Value,
    ) -> EngineResult<Option<Value>>;
}

/// Blueprint for objects with internal slots and interceptors.
#[derive(Clone, Default)]
pub struct ObjectTemplate {
    internal_field_count: usize,
    named: Option<Rc<dyn NamedPropertyHandler>>,
    indexed: Option<Rc<dyn IndexedPropertyHandler>>,
}

impl fmt::Debug for ObjectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTemplate")
            .field("internal_field_count", &self.internal_field_count)
            .field("named", &self.named.is_some())
            .field("indexed", &self.indexed.is_some())
            .finish()
    }
}

impl ObjectTemplate {
    /// Create an empty template
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of internal slots each instance gets
    pub fn set_internal_field_count(&mut self, count: usize) {
        self.internal_field_count = count;
    }

    /// Install the named property interceptor
    pub fn set_named_property_handler(&mut self, handler: Rc<dyn NamedPropertyHandler>) {
        self.named = Some(handler);
    }

    /// Install the indexed property interceptor
    pub fn set_indexed_property_handler(&mut self, handler: Rc<dyn IndexedPropertyHandler>) {
        self.indexed = Some(handler);
    }

    /// Internal slot count
    pub fn internal_field_count(&self) -> usize {
        self.internal_field_count
    }

    pub(crate) fn named_handler(&self) -> Option<Rc<dyn NamedPropertyHandler>> {
        self.named.clone()
    }

    pub(crate) fn indexed_handler(&self) -> Option<Rc<dyn IndexedPropertyHandler>> {
        self.indexed.clone()
    }
}

// ============================================================================
// Heap objects
// ============================================================================

/// What kind of object a heap cell holds.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Plain object (or a template instance)
    Ordinary,
    /// Dense array
    Array(Vec<Value>),
    /// Date, as milliseconds since the Unix epoch (NaN for invalid dates)
    Date(f64),
    /// Callable
    Function(NativeFunction),
    /// Error object
    Error {
        /// `error.message`
        message: JsString,
    },
}

/// A heap cell.
#[derive(Debug, Clone)]
pub struct JsObject {
    pub(crate) kind: ObjectKind,
    pub(crate) properties: IndexMap<JsString, Value>,
    pub(crate) template: Option<Rc<ObjectTemplate>>,
    pub(crate) internal_fields: Vec<Option<HandleId>>,
}

impl JsObject {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
            template: None,
            internal_fields: Vec::new(),
        }
    }

    pub(crate) fn from_template(template: Rc<ObjectTemplate>) -> Self {
        let fields = template.internal_field_count();
        Self {
            kind: ObjectKind::Ordinary,
            properties: IndexMap::new(),
            template: Some(template),
            internal_fields: vec![None; fields],
        }
    }

    /// Object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Own ordinary properties in insertion order
    pub fn properties(&self) -> &IndexMap<JsString, Value> {
        &self.properties
    }

    /// Number of internal slots
    pub fn internal_field_count(&self) -> usize {
        self.internal_fields.len()
    }
}
