//! Shared fixtures for the stream integration tests
//!
//! One registry covers every shape the streams handle: recursive classes
//! behind pointers, a derived class read through a base pointer, a SET
//! with defaults, a CHOICE and plain containers.

#![allow(dead_code)]

use rser_stream::{ObjectIStream, ObjectOStream, StreamConfig};
use rser_type::{
    ChoiceBuilder, ClassBuilder, ClassValue, EnumBuilder, Object, ObjectRef, TypeId,
    TypeRegistry, Value,
};

/// ============================================================================
/// REGISTRY FIXTURE
/// ============================================================================

pub struct Fixture {
    pub registry: TypeRegistry,
    /// SEQUENCE { label [0] VisibleString, next [1] NodeRef OPTIONAL, children [2] NodeList }
    pub node: TypeId,
    pub node_ref: TypeId,
    pub node_list: TypeId,
    /// SEQUENCE { name [0] VisibleString }
    pub base: TypeId,
    /// Base + { extra [1] INTEGER }
    pub derived: TypeId,
    pub base_ref: TypeId,
    pub base_list: TypeId,
    /// SET { level [0] INTEGER DEFAULT 3, note [1] VisibleString OPTIONAL }
    pub settings: TypeId,
    /// CHOICE { number [0] INTEGER, text [1] VisibleString, color [2] Color }
    pub shape: TypeId,
    pub color: TypeId,
    pub ints: TypeId,
    pub reals: TypeId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();

        let node = registry.declare("Node").unwrap();
        let node_ref = registry.pointer("NodeRef", node).unwrap();
        let node_list = registry.sequence_of("NodeList", node_ref).unwrap();
        registry
            .define(
                node,
                ClassBuilder::sequence()
                    .member("label", 0, TypeRegistry::STRING)
                    .optional_member("next", 1, node_ref)
                    .member("children", 2, node_list)
                    .build(),
            )
            .unwrap();

        let base = registry
            .register(
                "Base",
                ClassBuilder::sequence()
                    .member("name", 0, TypeRegistry::STRING)
                    .build(),
            )
            .unwrap();
        let derived = registry
            .register(
                "Derived",
                ClassBuilder::sequence()
                    .parent(base)
                    .member("extra", 1, TypeRegistry::INT)
                    .build(),
            )
            .unwrap();
        let base_ref = registry.pointer("BaseRef", base).unwrap();
        let base_list = registry.sequence_of("BaseList", base_ref).unwrap();

        let settings = registry
            .register(
                "Settings",
                ClassBuilder::set()
                    .default_member("level", 0, TypeRegistry::INT, Value::Int(3))
                    .optional_member("note", 1, TypeRegistry::STRING)
                    .build(),
            )
            .unwrap();

        let color = registry
            .register(
                "Color",
                EnumBuilder::new()
                    .item("red", 0)
                    .item("green", 1)
                    .item("blue", 2)
                    .build(),
            )
            .unwrap();
        let shape = registry
            .register(
                "Shape",
                ChoiceBuilder::new()
                    .variant("number", 0, TypeRegistry::INT)
                    .variant("text", 1, TypeRegistry::STRING)
                    .variant("color", 2, color)
                    .build(),
            )
            .unwrap();

        let ints = registry.sequence_of("Ints", TypeRegistry::INT).unwrap();
        let reals = registry.sequence_of("Reals", TypeRegistry::REAL).unwrap();

        Self {
            registry,
            node,
            node_ref,
            node_list,
            base,
            derived,
            base_ref,
            base_list,
            settings,
            shape,
            color,
            ints,
            reals,
        }
    }

    /// A node with no successor and no children
    pub fn node(&self, label: &str) -> ObjectRef {
        Object::new(
            self.node,
            Value::Class(ClassValue::new(vec![
                Some(Value::from(label)),
                None,
                Some(Value::List(Vec::new())),
            ])),
        )
    }

    pub fn base_object(&self, name: &str) -> ObjectRef {
        Object::new(
            self.base,
            Value::Class(ClassValue::from_values([Value::from(name)])),
        )
    }

    pub fn derived_object(&self, name: &str, extra: i64) -> ObjectRef {
        Object::new(
            self.derived,
            Value::Class(ClassValue::from_values([
                Value::from(name),
                Value::Int(extra),
            ])),
        )
    }

    pub fn write(&self, value: &Value, type_id: TypeId) -> Vec<u8> {
        self.write_with(value, type_id, StreamConfig::default())
    }

    pub fn write_with(&self, value: &Value, type_id: TypeId, config: StreamConfig) -> Vec<u8> {
        let mut stream = ObjectOStream::new(Vec::new(), &self.registry).with_config(config);
        stream
            .write_root(value, type_id)
            .expect("write should succeed");
        stream.into_inner().expect("flush should succeed")
    }

    pub fn read(&self, bytes: &[u8], type_id: TypeId) -> Value {
        let mut stream = ObjectIStream::new(bytes, &self.registry);
        let value = stream.read_root(type_id).expect("read should succeed");
        stream.expect_end().expect("input should be consumed");
        value
    }

    pub fn round_trip(&self, value: &Value, type_id: TypeId) -> Value {
        let bytes = self.write(value, type_id);
        self.read(&bytes, type_id)
    }
}

/// ============================================================================
/// GRAPH HELPERS
/// ============================================================================

pub fn set_next(from: &ObjectRef, to: Option<&ObjectRef>) {
    let mut value = from.borrow_mut();
    let class = value.as_class_mut().expect("node value");
    class.set(1, Some(Value::Pointer(to.cloned())));
}

pub fn add_child(parent: &ObjectRef, child: &ObjectRef) {
    let mut value = parent.borrow_mut();
    let class = value.as_class_mut().expect("node value");
    if let Some(Value::List(children)) = class.members.get_mut(2).and_then(Option::as_mut) {
        children.push(child.clone().into());
    }
}

pub fn next_of(node: &ObjectRef) -> Option<ObjectRef> {
    let value = node.borrow();
    value
        .as_class()
        .and_then(|class| class.get(1))
        .and_then(Value::as_pointer)
        .cloned()
}

pub fn children_of(node: &ObjectRef) -> Vec<ObjectRef> {
    let value = node.borrow();
    value
        .as_class()
        .and_then(|class| class.get(2))
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_pointer)
        .cloned()
        .collect()
}

pub fn label_of(node: &ObjectRef) -> String {
    match node.borrow().as_class().and_then(|class| class.get(0)) {
        Some(Value::String(label)) => label.clone(),
        other => panic!("node without label: {:?}", other),
    }
}

/// Drop every member so cyclic graphs free their objects
pub fn unlink(objects: &[ObjectRef]) {
    for object in objects {
        object.replace(Value::Null);
    }
}

/// Objects referenced from a list value, in order
pub fn pointers(value: &Value) -> Vec<ObjectRef> {
    value
        .as_list()
        .expect("list value")
        .iter()
        .map(|item| item.as_pointer().expect("non-null pointer").clone())
        .collect()
}
