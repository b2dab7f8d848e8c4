//! Host model integration tests
//!
//! Covers inheritance through `TypeInfo::base` and `HostObject::upcast`,
//! capability hooks, and coercion against user object types.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

use jsbind_sdk::{
    convert_to_type, Delegate, HostObject, HostString, HostType, HostValue, TypeInfo,
    TypeInfoBuilder,
};

struct Animal {
    name: RefCell<String>,
}

struct Dog {
    animal: Animal,
    tricks: RefCell<Vec<String>>,
}

thread_local! {
    static ANIMAL_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Animal>::new("Animal")
        .property_rw(
            "Name",
            HostType::String,
            |a| HostValue::string(&a.name.borrow()),
            |a, v| {
                *a.name.borrow_mut() = v.to_display_string();
                Ok(())
            },
        )
        .enumerable()
        .method("Speak", &[], |a, _| Ok(HostValue::from(format!("{} makes a sound", a.name.borrow()))))
        .build();

    static DOG_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Dog>::new("Dog")
        .base(ANIMAL_TYPE.with(Rc::clone))
        .property("TrickCount", HostType::I32, |d| HostValue::I32(d.tricks.borrow().len() as i32))
        .enumerable()
        .property("Secret", HostType::String, |_| HostValue::string("hidden"))
        .method("Speak", &[], |d, _| Ok(HostValue::from(format!("{} barks", d.animal.name.borrow()))))
        .method("Learn", &[HostType::String], |d, args| {
            d.tricks.borrow_mut().push(args[0].to_display_string());
            Ok(HostValue::Null)
        })
        .indexer(HostType::String, |d, i| {
            Ok(d.tricks.borrow().get(i as usize).map_or(HostValue::Null, |t| HostValue::string(t)))
        })
        .build();
}

impl HostObject for Animal {
    fn type_info(&self) -> Rc<TypeInfo> {
        ANIMAL_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl HostObject for Dog {
    fn type_info(&self) -> Rc<TypeInfo> {
        DOG_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
        if target == TypeId::of::<Animal>() {
            Some(&self.animal)
        } else {
            (target == TypeId::of::<Dog>()).then_some(self as &dyn Any)
        }
    }
}

fn dog(name: &str) -> HostValue {
    HostValue::object(Dog {
        animal: Animal {
            name: RefCell::new(name.to_string()),
        },
        tricks: RefCell::new(Vec::new()),
    })
}

// ===== Inheritance Tests =====

#[test]
fn test_base_members_resolve_on_derived_instance() {
    let rex = dog("Rex");
    let info = rex.type_info().unwrap();
    let name = info.property("Name").unwrap();
    assert_eq!(name.get(&rex).unwrap(), HostValue::string("Rex"));
    name.set(&rex, HostValue::string("Max")).unwrap();
    assert_eq!(name.get(&rex).unwrap(), HostValue::string("Max"));
}

#[test]
fn test_derived_overloads_come_first() {
    let rex = dog("Rex");
    let info = rex.type_info().unwrap();
    let speaks = info.methods_named("Speak");
    assert_eq!(speaks.len(), 2);
    assert_eq!(speaks[0].invoke(&rex, &[]).unwrap(), HostValue::string("Rex barks"));
    assert_eq!(speaks[1].invoke(&rex, &[]).unwrap(), HostValue::string("Rex makes a sound"));
}

#[test]
fn test_enumerable_properties_exclude_inherited_and_unmarked() {
    let info = DOG_TYPE.with(Rc::clone);
    let names: Vec<_> = info.enumerable_properties().map(|p| p.name()).collect();
    assert_eq!(names, vec!["TrickCount"]);
}

#[test]
fn test_indexer() {
    let rex = dog("Rex");
    let info = rex.type_info().unwrap();
    info.methods_named("Learn")[0].invoke(&rex, &[HostValue::string("sit")]).unwrap();
    let indexer = info.indexer().unwrap();
    assert_eq!(indexer.get(&rex, 0).unwrap(), HostValue::string("sit"));
    assert_eq!(indexer.get(&rex, 1).unwrap(), HostValue::Null);
    assert!(indexer.set(&rex, 0, HostValue::Null).is_none());
}

#[test]
fn test_object_types_accept_subtypes() {
    let rex = dog("Rex");
    assert!(HostType::object("Animal").accepts(&rex));
    assert_eq!(convert_to_type(&rex, &HostType::object("Dog")), Some(rex.clone()));
    assert_eq!(convert_to_type(&rex, &HostType::object("Cat")), None);
    assert_eq!(convert_to_type(&rex, &HostType::String), None);
}

// ===== Capability Tests =====

struct Bag(Vec<(String, i32)>);

thread_local! {
    static BAG_TYPE: Rc<TypeInfo> = TypeInfoBuilder::<Bag>::new("Bag").build();
}

impl HostObject for Bag {
    fn type_info(&self) -> Rc<TypeInfo> {
        BAG_TYPE.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn keyed_entries(&self) -> Option<Vec<(HostString, HostValue)>> {
        Some(
            self.0
                .iter()
                .map(|(k, v)| (HostString::from(k.as_str()), HostValue::I32(*v)))
                .collect(),
        )
    }
}

#[test]
fn test_capability_defaults() {
    let bag = Bag(vec![("a".to_string(), 1)]);
    assert_eq!(bag.keyed_entries().unwrap().len(), 1);
    assert!(bag.ordered_items().is_none());
    assert!(bag.as_delegate().is_none());
    assert_eq!(bag.to_host_string(), "Bag");
}

#[test]
fn test_delegate_values_compare_by_identity() {
    let d = Delegate::new(vec![], |_| Ok(HostValue::Null));
    let a = HostValue::Delegate(d.clone());
    let b = HostValue::Delegate(d);
    let c = HostValue::Delegate(Delegate::new(vec![], |_| Ok(HostValue::Null)));
    assert_eq!(a, b);
    assert_ne!(a, c);
}
