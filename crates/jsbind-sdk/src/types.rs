//! Reflective type metadata
//!
//! A `TypeInfo` describes what a host type exposes to script: overloaded
//! methods, properties (with the script-enumerable marker), an optional
//! integer indexer and an optional base type. Metadata is built once per type
//! with `TypeInfoBuilder` and shared through `Rc`.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{HostException, HostResult};
use crate::value::{EnumType, HostValue};

// ============================================================================
// HostType
// ============================================================================

/// Declared type of a parameter, property or indexer element.
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    /// Accepts any value (the root object type)
    Any,
    /// Boolean
    Bool,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// Single precision float
    F32,
    /// Double precision float
    F64,
    /// Unicode scalar
    Char,
    /// Fixed-point decimal
    Decimal,
    /// A specific enum type
    Enum(Rc<EnumType>),
    /// Local date/time
    DateTime,
    /// String
    String,
    /// Array
    Array,
    /// Dictionary
    Dictionary,
    /// List
    List,
    /// Delegate
    Delegate,
    /// Exception
    Exception,
    /// User object type, by name (matches subtypes)
    Object(Rc<str>),
}

impl HostType {
    /// User object type by name
    pub fn object(name: &str) -> Self {
        HostType::Object(Rc::from(name))
    }

    /// Display name used in diagnostics
    pub fn name(&self) -> String {
        match self {
            HostType::Enum(e) => e.name.clone(),
            HostType::Object(name) => name.to_string(),
            other => format!("{other:?}"),
        }
    }

    /// Whether this is one of the numeric types
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            HostType::I8
                | HostType::I16
                | HostType::I32
                | HostType::I64
                | HostType::U8
                | HostType::U16
                | HostType::U32
                | HostType::U64
                | HostType::F32
                | HostType::F64
                | HostType::Decimal
        )
    }

    /// Whether `value` can be passed where this type is declared, without
    /// any conversion. Null is accepted everywhere.
    pub fn accepts(&self, value: &HostValue) -> bool {
        match (self, value) {
            (HostType::Any, _) | (_, HostValue::Null) => true,
            (HostType::Object(name), _) => value.type_info().is_some_and(|t| t.is_a(name)),
            _ => value.host_type() == *self,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ============================================================================
// Members
// ============================================================================

/// Method body: receiver plus arguments already bound to the parameter list.
pub type MethodFn = Rc<dyn Fn(&HostValue, &[HostValue]) -> HostResult<HostValue>>;

/// Property getter
pub type GetterFn = Rc<dyn Fn(&HostValue) -> HostResult<HostValue>>;

/// Property setter
pub type SetterFn = Rc<dyn Fn(&HostValue, HostValue) -> HostResult<()>>;

/// Indexer getter
pub type IndexGetFn = Rc<dyn Fn(&HostValue, u32) -> HostResult<HostValue>>;

/// Indexer setter
pub type IndexSetFn = Rc<dyn Fn(&HostValue, u32, HostValue) -> HostResult<()>>;

/// One method overload.
#[derive(Clone)]
pub struct MethodInfo {
    name: String,
    params: Vec<HostType>,
    invoke: MethodFn,
}

impl MethodInfo {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    /// Parameter count
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Invoke on `this` with exactly `arity()` arguments
    pub fn invoke(&self, this: &HostValue, args: &[HostValue]) -> HostResult<HostValue> {
        (self.invoke)(this, args)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A property.
#[derive(Clone)]
pub struct PropertyInfo {
    name: String,
    ty: HostType,
    getter: GetterFn,
    setter: Option<SetterFn>,
    enumerable: bool,
}

impl PropertyInfo {
    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type; assigned values are coerced to it
    pub fn ty(&self) -> &HostType {
        &self.ty
    }

    /// Whether script enumeration reports this property
    pub fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    /// Whether the property has no setter
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Read the property
    pub fn get(&self, this: &HostValue) -> HostResult<HostValue> {
        (self.getter)(this)
    }

    /// Write the property. Read-only properties raise `InvalidOperationException`.
    pub fn set(&self, this: &HostValue, value: HostValue) -> HostResult<()> {
        match &self.setter {
            Some(setter) => setter(this, value),
            None => Err(HostException::new(
                "InvalidOperationException",
                format!("Property '{}' is read-only", self.name),
            )
            .into()),
        }
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("read_only", &self.is_read_only())
            .field("enumerable", &self.enumerable)
            .finish()
    }
}

/// Integer indexer (`obj[i]`).
#[derive(Clone)]
pub struct IndexerInfo {
    element_type: HostType,
    getter: IndexGetFn,
    setter: Option<IndexSetFn>,
}

impl IndexerInfo {
    /// Declared element type
    pub fn element_type(&self) -> &HostType {
        &self.element_type
    }

    /// Read an element
    pub fn get(&self, this: &HostValue, index: u32) -> HostResult<HostValue> {
        (self.getter)(this, index)
    }

    /// Write an element; `None` when the indexer is read-only
    pub fn set(&self, this: &HostValue, index: u32, value: HostValue) -> Option<HostResult<()>> {
        self.setter.as_ref().map(|setter| setter(this, index, value))
    }
}

impl fmt::Debug for IndexerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerInfo")
            .field("element_type", &self.element_type)
            .field("read_only", &self.setter.is_none())
            .finish()
    }
}

// ============================================================================
// TypeInfo
// ============================================================================

/// Reflective description of one host type.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: String,
    base: Option<Rc<TypeInfo>>,
    methods: Vec<MethodInfo>,
    method_indices: FxHashMap<String, Vec<usize>>,
    properties: Vec<PropertyInfo>,
    property_indices: FxHashMap<String, usize>,
    indexer: Option<IndexerInfo>,
}

impl TypeInfo {
    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base type, if any
    pub fn base(&self) -> Option<&Rc<TypeInfo>> {
        self.base.as_ref()
    }

    /// This type followed by its base chain
    pub fn ancestry(&self) -> impl Iterator<Item = &TypeInfo> {
        std::iter::successors(Some(self), |t| t.base.as_deref())
    }

    /// Whether this type is `name` or derives from it
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestry().any(|t| t.name == name)
    }

    /// Every overload named `name`, most-derived type first, declaration
    /// order within a type.
    pub fn methods_named(&self, name: &str) -> Vec<&MethodInfo> {
        self.ancestry()
            .flat_map(|t| {
                t.method_indices
                    .get(name)
                    .into_iter()
                    .flatten()
                    .filter_map(move |&i| t.methods.get(i))
            })
            .collect()
    }

    /// Check if any method named `name` exists
    pub fn has_method(&self, name: &str) -> bool {
        self.ancestry().any(|t| t.method_indices.contains_key(name))
    }

    /// Property lookup through the base chain
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.ancestry().find_map(|t| {
            t.property_indices
                .get(name)
                .and_then(|&i| t.properties.get(i))
        })
    }

    /// Properties declared on this exact type, in declaration order
    pub fn own_properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Properties declared on this exact type and marked enumerable
    pub fn enumerable_properties(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.properties.iter().filter(|p| p.enumerable)
    }

    /// Indexer lookup through the base chain
    pub fn indexer(&self) -> Option<&IndexerInfo> {
        self.ancestry().find_map(|t| t.indexer.as_ref())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Resolve a receiver to the Rust type a member was declared on.
fn receiver<T: 'static>(this: &HostValue) -> HostResult<&T> {
    let any = match this {
        HostValue::Object(o) => o.upcast(TypeId::of::<T>()),
        HostValue::Exception(e) => Some(e.as_ref() as &dyn std::any::Any),
        _ => None,
    };
    any.and_then(|a| a.downcast_ref::<T>()).ok_or_else(|| {
        HostException::new(
            "InvalidCastException",
            format!("receiver is not a {}", std::any::type_name::<T>()),
        )
        .into()
    })
}

/// Builds the metadata of a host type implemented by the Rust type `T`.
///
/// ```ignore
/// let info = TypeInfoBuilder::<Point>::new("Point")
///     .property("X", HostType::F64, |p| HostValue::F64(p.x.get()))
///     .enumerable()
///     .method("Scale", &[HostType::F64], |p, args| { ... })
///     .build();
/// ```
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static> TypeInfoBuilder<T> {
    /// Start describing a type
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: TypeInfo {
                name: name.into(),
                base: None,
                methods: Vec::new(),
                method_indices: FxHashMap::default(),
                properties: Vec::new(),
                property_indices: FxHashMap::default(),
                indexer: None,
            },
            _marker: PhantomData,
        }
    }

    /// Set the base type
    pub fn base(mut self, base: Rc<TypeInfo>) -> Self {
        self.info.base = Some(base);
        self
    }

    /// Add a method overload
    pub fn method<F>(mut self, name: &str, params: &[HostType], f: F) -> Self
    where
        F: Fn(&T, &[HostValue]) -> HostResult<HostValue> + 'static,
    {
        let index = self.info.methods.len();
        self.info.methods.push(MethodInfo {
            name: name.to_string(),
            params: params.to_vec(),
            invoke: Rc::new(move |this: &HostValue, args: &[HostValue]| {
                f(receiver::<T>(this)?, args)
            }),
        });
        self.info
            .method_indices
            .entry(name.to_string())
            .or_default()
            .push(index);
        self
    }

    fn push_property(&mut self, property: PropertyInfo) {
        let index = self.info.properties.len();
        self.info.property_indices.insert(property.name.clone(), index);
        self.info.properties.push(property);
    }

    /// Add a read-only property
    pub fn property<G>(mut self, name: &str, ty: HostType, get: G) -> Self
    where
        G: Fn(&T) -> HostValue + 'static,
    {
        self.push_property(PropertyInfo {
            name: name.to_string(),
            ty,
            getter: Rc::new(move |this: &HostValue| Ok(get(receiver::<T>(this)?))),
            setter: None,
            enumerable: false,
        });
        self
    }

    /// Add a read/write property
    pub fn property_rw<G, S>(mut self, name: &str, ty: HostType, get: G, set: S) -> Self
    where
        G: Fn(&T) -> HostValue + 'static,
        S: Fn(&T, HostValue) -> HostResult<()> + 'static,
    {
        self.push_property(PropertyInfo {
            name: name.to_string(),
            ty,
            getter: Rc::new(move |this: &HostValue| Ok(get(receiver::<T>(this)?))),
            setter: Some(Rc::new(move |this: &HostValue, value: HostValue| {
                set(receiver::<T>(this)?, value)
            })),
            enumerable: false,
        });
        self
    }

    /// Mark the most recently added property as script-enumerable
    pub fn enumerable(mut self) -> Self {
        if let Some(property) = self.info.properties.last_mut() {
            property.enumerable = true;
        }
        self
    }

    /// Add a read-only integer indexer
    pub fn indexer<G>(mut self, element_type: HostType, get: G) -> Self
    where
        G: Fn(&T, u32) -> HostResult<HostValue> + 'static,
    {
        self.info.indexer = Some(IndexerInfo {
            element_type,
            getter: Rc::new(move |this: &HostValue, index: u32| get(receiver::<T>(this)?, index)),
            setter: None,
        });
        self
    }

    /// Add a read/write integer indexer
    pub fn indexer_rw<G, S>(mut self, element_type: HostType, get: G, set: S) -> Self
    where
        G: Fn(&T, u32) -> HostResult<HostValue> + 'static,
        S: Fn(&T, u32, HostValue) -> HostResult<()> + 'static,
    {
        self.info.indexer = Some(IndexerInfo {
            element_type,
            getter: Rc::new(move |this: &HostValue, index: u32| get(receiver::<T>(this)?, index)),
            setter: Some(Rc::new(move |this: &HostValue, index: u32, value: HostValue| {
                set(receiver::<T>(this)?, index, value)
            })),
        });
        self
    }

    /// Finish
    pub fn build(self) -> Rc<TypeInfo> {
        Rc::new(self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::Cell;

    use crate::object::HostObject;

    struct Counter {
        count: Cell<i32>,
    }

    thread_local! {
        static COUNTER_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Counter>::new("Counter")
            .property_rw(
                "Count",
                HostType::I32,
                |c| HostValue::I32(c.count.get()),
                |c, v| {
                    if let HostValue::I32(n) = v {
                        c.count.set(n);
                    }
                    Ok(())
                },
            )
            .enumerable()
            .property("Double", HostType::I32, |c| HostValue::I32(c.count.get() * 2))
            .method("Add", &[HostType::I32], |c, args| {
                if let Some(HostValue::I32(n)) = args.first() {
                    c.count.set(c.count.get() + n);
                }
                Ok(HostValue::I32(c.count.get()))
            })
            .method("Add", &[HostType::I32, HostType::I32], |c, _args| Ok(HostValue::I32(c.count.get())))
            .build();
    }

    impl HostObject for Counter {
        fn type_info(&self) -> Rc<TypeInfo> {
            COUNTER_TYPE.with(Rc::clone)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_overloads_in_declaration_order() {
        let info = COUNTER_TYPE.with(Rc::clone);
        let adds = info.methods_named("Add");
        assert_eq!(adds.len(), 2);
        assert_eq!(adds[0].arity(), 1);
        assert_eq!(adds[1].arity(), 2);
        assert!(info.methods_named("Missing").is_empty());
    }

    #[test]
    fn test_property_get_set() {
        let value = HostValue::object(Counter { count: Cell::new(3) });
        let info = value.type_info().unwrap();
        let count = info.property("Count").unwrap();
        assert_eq!(count.get(&value).unwrap(), HostValue::I32(3));
        count.set(&value, HostValue::I32(10)).unwrap();
        assert_eq!(info.property("Double").unwrap().get(&value).unwrap(), HostValue::I32(20));
        assert!(info.property("Double").unwrap().set(&value, HostValue::I32(1)).is_err());
    }

    #[test]
    fn test_method_invoke_downcasts_receiver() {
        let value = HostValue::object(Counter { count: Cell::new(1) });
        let info = value.type_info().unwrap();
        let add = info.methods_named("Add")[0];
        assert_eq!(add.invoke(&value, &[HostValue::I32(4)]).unwrap(), HostValue::I32(5));
        assert!(add.invoke(&HostValue::I32(0), &[HostValue::I32(4)]).is_err());
    }

    #[test]
    fn test_enumerable_marker() {
        let info = COUNTER_TYPE.with(Rc::clone);
        let names: Vec<_> = info.enumerable_properties().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Count"]);
    }

    #[test]
    fn test_accepts() {
        let counter = HostValue::object(Counter { count: Cell::new(0) });
        assert!(HostType::object("Counter").accepts(&counter));
        assert!(!HostType::object("Other").accepts(&counter));
        assert!(HostType::Any.accepts(&counter));
        assert!(HostType::I32.accepts(&HostValue::Null));
        assert!(!HostType::I32.accepts(&HostValue::I64(1)));
    }
}
