//! Context integration tests
//!
//! Exercises the embedder-facing surface of the engine:
//! - object templates with internal slots
//! - named and indexed interceptors
//! - handle registration and release
//! - embedder data and termination

use std::cell::RefCell;
use std::rc::Rc;

use jsbind_engine::{
    Context, ContextOptions, EngineError, EngineResult, IndexedPropertyHandler, JsString,
    NamedPropertyHandler, ObjectId, ObjectTemplate, Value,
};

/// Interceptor that answers `x` and records every write
#[derive(Default)]
struct Recorder {
    writes: RefCell<Vec<(String, Value)>>,
}

impl NamedPropertyHandler for Recorder {
    fn get(&self, _ctx: &mut Context, _holder: ObjectId, name: &JsString) -> EngineResult<Option<Value>> {
        Ok(match name.to_string_lossy().as_str() {
            "x" => Some(Value::Int(7)),
            _ => None,
        })
    }

    fn set(
        &self,
        _ctx: &mut Context,
        _holder: ObjectId,
        name: &JsString,
        value: Value,
    ) -> EngineResult<Option<Value>> {
        let name = name.to_string_lossy();
        if name == "plain" {
            return Ok(None);
        }
        self.writes.borrow_mut().push((name, value.clone()));
        Ok(Some(value))
    }

    fn enumerate(&self, _ctx: &mut Context, _holder: ObjectId) -> EngineResult<Vec<JsString>> {
        Ok(vec![JsString::from("x")])
    }
}

struct Squares;

impl IndexedPropertyHandler for Squares {
    fn get(&self, _ctx: &mut Context, _holder: ObjectId, index: u32) -> EngineResult<Option<Value>> {
        Ok(i32::try_from(index).ok().map(|i| Value::Int(i * i)))
    }

    fn set(&self, ctx: &mut Context, _holder: ObjectId, _index: u32, _value: Value) -> EngineResult<Option<Value>> {
        Err(ctx.throw_error("read-only"))
    }
}

fn template_with(recorder: Rc<Recorder>) -> Rc<ObjectTemplate> {
    let mut template = ObjectTemplate::new();
    template.set_internal_field_count(1);
    template.set_named_property_handler(recorder);
    template.set_indexed_property_handler(Rc::new(Squares));
    Rc::new(template)
}

// ===== Template Tests =====

#[test]
fn test_template_instance_has_internal_slot() {
    let mut ctx = Context::new();
    let template = template_with(Rc::new(Recorder::default()));
    let obj = ctx.new_instance(&template);
    assert_eq!(ctx.internal_field_count(obj), 1);
    assert!(ctx.internal_field(obj, 0).is_none());

    let handle = ctx.register_external(Rc::new(String::from("payload")));
    assert!(ctx.set_internal_field(obj, 0, handle));
    assert!(!ctx.set_internal_field(obj, 1, handle));
    assert_eq!(ctx.internal_field(obj, 0), Some(handle));

    let capsule = ctx.external(handle).unwrap();
    assert_eq!(capsule.downcast_ref::<String>().unwrap(), "payload");
}

#[test]
fn test_plain_objects_have_no_internal_slots() {
    let mut ctx = Context::new();
    let obj = ctx.new_object();
    assert_eq!(ctx.internal_field_count(obj), 0);
}

// ===== Interceptor Tests =====

#[test]
fn test_named_interceptor_get_and_fallback() {
    let mut ctx = Context::new();
    let recorder = Rc::new(Recorder::default());
    let obj = ctx.new_instance(&template_with(recorder.clone()));

    assert_eq!(ctx.get(obj, &JsString::from("x")).unwrap(), Value::Int(7));
    assert_eq!(ctx.get(obj, &JsString::from("y")).unwrap(), Value::Undefined);

    // Not intercepted: lands on the instance as an ordinary property
    ctx.set(obj, &JsString::from("plain"), Value::Bool(true)).unwrap();
    assert_eq!(ctx.get(obj, &JsString::from("plain")).unwrap(), Value::Bool(true));

    ctx.set(obj, &JsString::from("y"), Value::Int(3)).unwrap();
    assert_eq!(recorder.writes.borrow().as_slice(), &[(String::from("y"), Value::Int(3))]);
    assert_eq!(ctx.get(obj, &JsString::from("y")).unwrap(), Value::Undefined);
}

#[test]
fn test_enumeration_merges_interceptor_and_own_names() {
    let mut ctx = Context::new();
    let obj = ctx.new_instance(&template_with(Rc::new(Recorder::default())));
    ctx.set(obj, &JsString::from("plain"), Value::Null).unwrap();
    let names = ctx.own_property_names(obj).unwrap();
    assert_eq!(names, vec![JsString::from("x"), JsString::from("plain")]);
}

#[test]
fn test_indexed_interceptor() {
    let mut ctx = Context::new();
    let obj = ctx.new_instance(&template_with(Rc::new(Recorder::default())));
    assert_eq!(ctx.get_index(obj, 5).unwrap(), Value::Int(25));
    // Numeric string keys route through the indexed interceptor
    assert_eq!(ctx.get(obj, &JsString::from("3")).unwrap(), Value::Int(9));

    let err = ctx.set_index(obj, 0, Value::Null).unwrap_err();
    let EngineError::Thrown(Value::Object(error)) = err else {
        panic!("expected a thrown error object");
    };
    assert_eq!(ctx.error_message(error).unwrap().to_string_lossy(), "read-only");
}

// ===== Handle Tests =====

#[test]
fn test_release_handles_invalidates_tokens() {
    let mut ctx = Context::with_options(ContextOptions {
        heap_capacity: 4,
        handle_capacity: 2,
    });
    let marker = Rc::new(1u8);
    let handle = ctx.register_external(marker.clone());
    assert_eq!(ctx.live_handles(), 1);
    assert_eq!(ctx.release_handles(), 1);
    assert_eq!(ctx.live_handles(), 0);
    assert!(ctx.external(handle).is_none());
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn test_drop_releases_handles() {
    let marker = Rc::new(());
    {
        let mut ctx = Context::new();
        ctx.register_external(marker.clone());
        ctx.register_external(marker.clone());
        assert_eq!(Rc::strong_count(&marker), 3);
    }
    assert_eq!(Rc::strong_count(&marker), 1);
}

// ===== Embedder Data Tests =====

#[test]
fn test_embedder_data_roundtrip() {
    let mut ctx = Context::new();
    assert!(ctx.embedder_data().is_none());
    ctx.set_embedder_data(Rc::new(99u32));
    let data = ctx.embedder_data().unwrap();
    assert_eq!(data.downcast_ref::<u32>(), Some(&99));
}

#[test]
fn test_wrapper_template_slot() {
    let mut ctx = Context::new();
    assert!(ctx.object_wrapper_template().is_none());
    ctx.set_object_wrapper_template(template_with(Rc::new(Recorder::default())));
    assert_eq!(ctx.object_wrapper_template().unwrap().internal_field_count(), 1);
}

// ===== Callback Tests =====

#[test]
fn test_callback_sees_this_and_can_reenter() {
    let mut ctx = Context::new();
    let obj = ctx.new_object();
    ctx.set(obj, &JsString::from("n"), Value::Int(4)).unwrap();
    let getter = ctx.new_function("getN", 0, |ctx, call| {
        let this = call.this.as_object().ok_or(EngineError::Terminated)?;
        ctx.get(this, &JsString::from("n"))
    });
    let result = ctx.call(&Value::Object(getter), Value::Object(obj), vec![]).unwrap();
    assert_eq!(result, Value::Int(4));
    assert_eq!(ctx.get(getter, &JsString::from("name")).unwrap(), Value::string("getN"));
}

#[test]
fn test_thrown_values_propagate() {
    let mut ctx = Context::new();
    let thrower = ctx.new_function("thrower", 0, |_ctx, _call| {
        Err(EngineError::Thrown(Value::string("nope")))
    });
    assert_eq!(
        ctx.call(&Value::Object(thrower), Value::Undefined, vec![]),
        Err(EngineError::Thrown(Value::string("nope")))
    );
}

#[test]
fn test_dates_and_kind_predicates() {
    let mut ctx = Context::new();
    let date = ctx.new_date(86_400_000.0);
    let arr = ctx.new_array(vec![]);
    assert!(ctx.is_date(&Value::Object(date)));
    assert!(!ctx.is_array(&Value::Object(date)));
    assert!(ctx.is_array(&Value::Object(arr)));
    assert!(!ctx.is_function(&Value::Int(1)));
    assert_eq!(ctx.date_value(date), Some(86_400_000.0));
}
