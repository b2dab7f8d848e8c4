//! Host types shared by the interop integration tests

#![allow(dead_code)]

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use jsbind_engine::{Context, EngineError, JsString, ObjectId, Value};
use jsbind_sdk::{
    HostException, HostObject, HostString, HostType, HostValue, TypeInfo, TypeInfoBuilder,
};

// ============================================================================
// Calculator
// ============================================================================

pub struct Calculator {
    pub memory: Cell<f64>,
    pub cells: RefCell<Vec<i32>>,
    pub last_arg: RefCell<HostValue>,
    pub failure: Rc<HostException>,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            memory: Cell::new(0.0),
            cells: RefCell::new(vec![10, 20]),
            last_arg: RefCell::new(HostValue::Null),
            failure: Rc::new(HostException::new("InvalidOperationException", "calculator on fire")),
        }
    }
}

fn text(s: &str) -> Result<HostValue, Rc<HostException>> {
    Ok(HostValue::string(s))
}

fn calculator_type() -> Rc<TypeInfo> {
    TypeInfoBuilder::<Calculator>::new("Calculator")
        .property_rw(
            "Memory",
            HostType::F64,
            |c| HostValue::F64(c.memory.get()),
            |c, v| {
                c.memory.set(v.as_f64().unwrap_or(0.0));
                Ok(())
            },
        )
        .enumerable()
        .property("Label", HostType::String, |_| HostValue::string("calc"))
        .method("Add", &[HostType::I32, HostType::I32], |_, args| {
            match (&args[0], &args[1]) {
                (HostValue::I32(a), HostValue::I32(b)) => Ok(HostValue::I32(a + b)),
                _ => Ok(HostValue::Null),
            }
        })
        .method("Pick", &[HostType::I32], |_, _| text("one"))
        .method("Pick", &[HostType::I32, HostType::I32, HostType::I32], |_, _| text("three"))
        .method("Describe", &[HostType::String], |_, _| text("string"))
        .method("Describe", &[HostType::I32], |_, _| text("int"))
        .method("Tie", &[HostType::Any], |_, _| text("any-1"))
        .method("Tie", &[HostType::Any, HostType::Any], |_, _| text("any-2"))
        .method("Order", &[HostType::Any, HostType::Any], |_, _| text("two"))
        .method("Order", &[HostType::Any], |_, _| text("one"))
        .method("Echo", &[HostType::Any], |c, args| {
            *c.last_arg.borrow_mut() = args[0].clone();
            Ok(args[0].clone())
        })
        .method("Same", &[HostType::Any, HostType::Any], |_, args| {
            Ok(HostValue::Bool(match (&args[0], &args[1]) {
                (HostValue::Dictionary(a), HostValue::Dictionary(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }))
        })
        .method("Fail", &[], |c, _| Err(c.failure.clone()))
        .method("Raise", &[HostType::String], |_, args| {
            Err(HostException::new("ArgumentException", args[0].to_display_string()).into())
        })
        .indexer_rw(
            HostType::I32,
            |c, i| {
                Ok(c.cells
                    .borrow()
                    .get(i as usize)
                    .map_or(HostValue::Null, |n| HostValue::I32(*n)))
            },
            |c, i, v| {
                let mut cells = c.cells.borrow_mut();
                if let HostValue::I32(n) = v {
                    if (i as usize) >= cells.len() {
                        cells.resize(i as usize + 1, 0);
                    }
                    cells[i as usize] = n;
                }
                Ok(())
            },
        )
        .build()
}

thread_local! {
    static CALCULATOR_TYPE: Rc<TypeInfo> = calculator_type();
    static SCIENTIFIC_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Scientific>::new("Scientific")
        .base(CALCULATOR_TYPE.with(Rc::clone))
        .property("Precision", HostType::I32, |s| HostValue::I32(s.precision))
        .enumerable()
        .property("Mode", HostType::String, |_| HostValue::string("rad"))
        .method("ToString", &[], |_, _| text("scientific"))
        .build();
}

impl HostObject for Calculator {
    fn type_info(&self) -> Rc<TypeInfo> {
        CALCULATOR_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Scientific {
    pub calculator: Calculator,
    pub precision: i32,
}

impl HostObject for Scientific {
    fn type_info(&self) -> Rc<TypeInfo> {
        SCIENTIFIC_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
        if target == TypeId::of::<Calculator>() {
            Some(&self.calculator)
        } else {
            (target == TypeId::of::<Scientific>()).then_some(self as &dyn Any)
        }
    }
}

// ============================================================================
// Containers by capability
// ============================================================================

/// Keyed container with no declared properties
pub struct Settings(pub Vec<(&'static str, HostValue)>);

/// Keyed container that also declares a property
pub struct Record(pub Vec<(&'static str, HostValue)>);

/// Ordered container
pub struct Queue(pub Vec<HostValue>);

/// Container whose single entry can point back at itself
pub struct Loop {
    pub keyed: bool,
    pub next: RefCell<HostValue>,
}

impl Loop {
    /// A container holding itself. Call `Loop::unlink` when done.
    pub fn cycle(keyed: bool) -> HostValue {
        let value = HostValue::object(Loop {
            keyed,
            next: RefCell::new(HostValue::Null),
        });
        if let Some(this) = value.downcast_ref::<Loop>() {
            *this.next.borrow_mut() = value.clone();
        }
        value
    }

    pub fn unlink(value: &HostValue) {
        if let Some(this) = value.downcast_ref::<Loop>() {
            *this.next.borrow_mut() = HostValue::Null;
        }
    }
}

thread_local! {
    static SETTINGS_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Settings>::new("Settings").build();
    static RECORD_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Record>::new("Record")
        .property("Count", HostType::I32, |r| HostValue::I32(r.0.len() as i32))
        .enumerable()
        .build();
    static QUEUE_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Queue>::new("Queue").build();
    static LOOP_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Loop>::new("Loop").build();
}

fn entries(items: &[(&'static str, HostValue)]) -> Option<Vec<(HostString, HostValue)>> {
    Some(
        items
            .iter()
            .map(|(k, v)| (HostString::from(*k), v.clone()))
            .collect(),
    )
}

impl HostObject for Settings {
    fn type_info(&self) -> Rc<TypeInfo> {
        SETTINGS_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn keyed_entries(&self) -> Option<Vec<(HostString, HostValue)>> {
        entries(&self.0)
    }
}

impl HostObject for Record {
    fn type_info(&self) -> Rc<TypeInfo> {
        RECORD_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn keyed_entries(&self) -> Option<Vec<(HostString, HostValue)>> {
        entries(&self.0)
    }
}

impl HostObject for Queue {
    fn type_info(&self) -> Rc<TypeInfo> {
        QUEUE_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn ordered_items(&self) -> Option<Vec<HostValue>> {
        Some(self.0.clone())
    }
}

impl HostObject for Loop {
    fn type_info(&self) -> Rc<TypeInfo> {
        LOOP_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn keyed_entries(&self) -> Option<Vec<(HostString, HostValue)>> {
        self.keyed
            .then(|| vec![(HostString::from("self"), self.next.borrow().clone())])
    }

    fn ordered_items(&self) -> Option<Vec<HostValue>> {
        (!self.keyed).then(|| vec![HostValue::I32(0), self.next.borrow().clone()])
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn key(s: &str) -> JsString {
    JsString::from(s)
}

/// `object.name(...args)`
pub fn call_method(ctx: &mut Context, object: ObjectId, name: &str, args: Vec<Value>) -> Result<Value, EngineError> {
    let function = ctx.get(object, &key(name))?;
    ctx.call(&function, Value::Object(object), args)
}

/// Message of a thrown error object
pub fn thrown_message(ctx: &Context, error: &EngineError) -> String {
    match error {
        EngineError::Thrown(Value::Object(id)) => ctx
            .error_message(*id)
            .map(|m| m.to_string_lossy())
            .unwrap_or_default(),
        other => panic!("expected a thrown error object, got {:?}", other),
    }
}
