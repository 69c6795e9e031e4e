//! JSON graph form
//!
//! Values map onto JSON by their registered type. Classes become objects
//! keyed by member name, a choice becomes a one-key object naming its
//! variant, octets are hex strings and enumerations use item names.
//!
//! Pointers keep the graph: the first time an object is met it is written
//! in full and numbered, every later occurrence only refers to it.
//!
//! ```text
//! {"@id": 0, "@type": "Node", "value": {...}}    first occurrence
//! {"@ref": 0}                                   any later one
//! ```
//!
//! Numbers follow first occurrence in a depth-first walk, so a document
//! produced by [`to_json`] only ever refers backwards.

use rser_stream::{Frame, FrameStack};
use rser_type::schema::{decode_hex, encode_hex};
use rser_type::{
    ChoiceValue, ClassValue, Object, ObjectId, ObjectRef, TypeId, TypeKind, TypeRegistry, Value,
};
use rser_util::FxHashMap;
use serde_json::{json, Map, Number, Value as Json};

use crate::error::{Result, RsertError};

const ID_KEY: &str = "@id";
const TYPE_KEY: &str = "@type";
const REF_KEY: &str = "@ref";
const VALUE_KEY: &str = "value";

/// Convert a value of type `type_id` into its JSON graph form
pub fn to_json(
    registry: &TypeRegistry,
    value: &Value,
    type_id: TypeId,
    max_depth: usize,
) -> Result<Json> {
    GraphWriter {
        registry,
        frames: FrameStack::new(),
        depth: 0,
        max_depth,
        ids: FxHashMap::default(),
    }
    .value(value, type_id)
}

/// Build a value of type `type_id` from its JSON graph form
pub fn from_json(
    registry: &TypeRegistry,
    json: &Json,
    type_id: TypeId,
    max_depth: usize,
) -> Result<Value> {
    GraphReader {
        registry,
        frames: FrameStack::new(),
        depth: 0,
        max_depth,
        objects: FxHashMap::default(),
    }
    .value(json, type_id)
}

fn special_real(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value.is_sign_negative() {
        "-inf"
    } else {
        "inf"
    }
}

/// ============================================================================
/// VALUE TO JSON
/// ============================================================================

struct GraphWriter<'r> {
    registry: &'r TypeRegistry,
    frames: FrameStack<'r>,
    depth: usize,
    max_depth: usize,
    ids: FxHashMap<ObjectId, u64>,
}

impl<'r> GraphWriter<'r> {
    fn fail(&self, message: impl Into<String>) -> RsertError {
        RsertError::Conversion {
            path: self.frames.path(),
            message: message.into(),
        }
    }

    fn value(&mut self, value: &Value, type_id: TypeId) -> Result<Json> {
        let registry = self.registry;
        let kind = registry.kind(type_id)?;
        if self.depth >= self.max_depth {
            return Err(self.fail(format!("nesting deeper than {}", self.max_depth)));
        }
        self.depth += 1;
        self.frames.push(Frame::Type(registry.name(type_id)));
        let json = self.shape(kind, value)?;
        self.frames.pop();
        self.depth -= 1;
        Ok(json)
    }

    fn shape(&mut self, kind: &'r TypeKind, value: &Value) -> Result<Json> {
        let json = match (kind, value) {
            (TypeKind::Bool, Value::Bool(b)) => Json::Bool(*b),
            (TypeKind::Char, Value::Char(c)) => Json::String(char::from(*c).to_string()),
            (TypeKind::Int, Value::Int(i)) => json!(i),
            (TypeKind::UInt, Value::UInt(u)) => json!(u),
            (TypeKind::Real, Value::Real(f)) => Number::from_f64(*f)
                .map_or_else(|| Json::String(special_real(*f).to_string()), Json::Number),
            (TypeKind::String | TypeKind::StringStore, Value::String(s)) => Json::String(s.clone()),
            (TypeKind::Null, Value::Null) => Json::Null,
            (TypeKind::Octets, Value::Octets(bytes)) => Json::String(encode_hex(bytes)),
            (TypeKind::Enumerated(values), Value::Enum(v)) => match values.name_of(*v) {
                Some(name) => json!(name),
                None => json!(v),
            },
            (TypeKind::Class(class), Value::Class(members)) => {
                let mut map = Map::new();
                for (index, member) in class.members.iter().enumerate() {
                    if let Some(value) = members.get(index) {
                        self.frames.push(Frame::Member(&member.name));
                        map.insert(member.name.clone(), self.value(value, member.type_id)?);
                        self.frames.pop();
                    }
                }
                Json::Object(map)
            }
            (TypeKind::Choice(choice), Value::Choice(selected)) => {
                let variant = choice
                    .variants
                    .get(selected.variant)
                    .ok_or_else(|| self.fail(format!("no variant {}", selected.variant)))?;
                self.frames.push(Frame::Member(&variant.name));
                let inner = self.value(&selected.value, variant.type_id)?;
                self.frames.pop();
                let mut map = Map::new();
                map.insert(variant.name.clone(), inner);
                Json::Object(map)
            }
            (TypeKind::Container(container), Value::List(items)) => {
                let mut array = Vec::with_capacity(items.len());
                for item in items {
                    self.frames.push(Frame::Element);
                    array.push(self.value(item, container.element)?);
                    self.frames.pop();
                }
                Json::Array(array)
            }
            (TypeKind::Pointer(_), Value::Pointer(None)) => Json::Null,
            (TypeKind::Pointer(pointer), Value::Pointer(Some(object))) => {
                self.object(pointer.pointee, object)?
            }
            (kind, value) => {
                return Err(self.fail(format!(
                    "value does not match {}: found {}",
                    kind.keyword(),
                    value.variant_name()
                )))
            }
        };
        Ok(json)
    }

    fn object(&mut self, pointee: TypeId, object: &ObjectRef) -> Result<Json> {
        if let Some(id) = self.ids.get(&object.id()) {
            return Ok(json!({ REF_KEY: id }));
        }

        let real = object.type_id();
        if !self.registry.is_derived(real, pointee) {
            return Err(self.fail(format!(
                "incompatible type: {} is not a {}",
                self.registry.name(real),
                self.registry.name(pointee)
            )));
        }
        let id = self.ids.len() as u64;
        self.ids.insert(object.id(), id);

        let value = object.borrow();
        let inner = self.value(&value, real)?;
        Ok(json!({
            ID_KEY: id,
            TYPE_KEY: self.registry.name(real),
            VALUE_KEY: inner,
        }))
    }
}

/// ============================================================================
/// JSON TO VALUE
/// ============================================================================

struct GraphReader<'r> {
    registry: &'r TypeRegistry,
    frames: FrameStack<'r>,
    depth: usize,
    max_depth: usize,
    objects: FxHashMap<u64, ObjectRef>,
}

impl<'r> GraphReader<'r> {
    fn fail(&self, message: impl Into<String>) -> RsertError {
        RsertError::Conversion {
            path: self.frames.path(),
            message: message.into(),
        }
    }

    fn expected(&self, what: &str, found: &Json) -> RsertError {
        self.fail(format!("expected {}, found {}", what, found))
    }

    fn value(&mut self, json: &Json, type_id: TypeId) -> Result<Value> {
        let registry = self.registry;
        let kind = registry.kind(type_id)?;
        if self.depth >= self.max_depth {
            return Err(self.fail(format!("nesting deeper than {}", self.max_depth)));
        }
        self.depth += 1;
        self.frames.push(Frame::Type(registry.name(type_id)));
        let value = self.shape(kind, json)?;
        self.frames.pop();
        self.depth -= 1;
        Ok(value)
    }

    fn shape(&mut self, kind: &'r TypeKind, json: &Json) -> Result<Value> {
        let value = match kind {
            TypeKind::Declared => return Err(self.fail("type has no definition")),
            TypeKind::Bool => Value::Bool(json.as_bool().ok_or_else(|| self.expected("a boolean", json))?),
            TypeKind::Char => json
                .as_str()
                .and_then(single_byte)
                .map(Value::Char)
                .ok_or_else(|| self.expected("a one-byte string", json))?,
            TypeKind::Int => Value::Int(json.as_i64().ok_or_else(|| self.expected("an integer", json))?),
            TypeKind::UInt => Value::UInt(
                json.as_u64()
                    .ok_or_else(|| self.expected("an unsigned integer", json))?,
            ),
            TypeKind::Real => Value::Real(real(json).ok_or_else(|| self.expected("a number", json))?),
            TypeKind::String | TypeKind::StringStore => Value::String(
                json.as_str()
                    .ok_or_else(|| self.expected("a string", json))?
                    .to_owned(),
            ),
            TypeKind::Null if json.is_null() => Value::Null,
            TypeKind::Null => return Err(self.expected("null", json)),
            TypeKind::Octets => json
                .as_str()
                .and_then(decode_hex)
                .map(Value::Octets)
                .ok_or_else(|| self.expected("a hex string", json))?,
            TypeKind::Enumerated(values) => {
                let number = match json {
                    Json::String(name) => values.value_of(name),
                    Json::Number(n) => n.as_i64().filter(|v| values.is_valid(*v)),
                    _ => None,
                };
                Value::Enum(number.ok_or_else(|| self.expected("an enumeration item", json))?)
            }
            TypeKind::Class(class) => {
                let map = json
                    .as_object()
                    .ok_or_else(|| self.expected("an object", json))?;
                if let Some(unknown) = map.keys().find(|key| class.member_by_name(key).is_none()) {
                    return Err(self.fail(format!("unknown member: {}", unknown)));
                }
                let mut slots = Vec::with_capacity(class.members.len());
                for member in &class.members {
                    let slot = match map.get(&member.name) {
                        Some(item) => {
                            self.frames.push(Frame::Member(&member.name));
                            let value = self.value(item, member.type_id)?;
                            self.frames.pop();
                            Some(value)
                        }
                        None if member.default.is_some() => member.default.clone(),
                        None if member.optional => None,
                        None => return Err(self.fail(format!("missing member: {}", member.name))),
                    };
                    slots.push(slot);
                }
                Value::Class(ClassValue::new(slots))
            }
            TypeKind::Choice(choice) => {
                let (name, item) = match json.as_object() {
                    Some(map) if map.len() == 1 => map.iter().next(),
                    _ => None,
                }
                .ok_or_else(|| self.expected("a single variant object", json))?;
                let index = choice
                    .variant_by_name(name)
                    .ok_or_else(|| self.fail(format!("unknown variant: {}", name)))?;
                let variant = &choice.variants[index];
                self.frames.push(Frame::Member(&variant.name));
                let value = self.value(item, variant.type_id)?;
                self.frames.pop();
                Value::Choice(ChoiceValue::new(index, value))
            }
            TypeKind::Container(container) => {
                let items = json
                    .as_array()
                    .ok_or_else(|| self.expected("an array", json))?;
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    self.frames.push(Frame::Element);
                    list.push(self.value(item, container.element)?);
                    self.frames.pop();
                }
                Value::List(list)
            }
            TypeKind::Pointer(_) if json.is_null() => Value::Pointer(None),
            TypeKind::Pointer(pointer) => Value::Pointer(Some(self.object(pointer.pointee, json)?)),
        };
        Ok(value)
    }

    fn object(&mut self, pointee: TypeId, json: &Json) -> Result<ObjectRef> {
        let map = json
            .as_object()
            .ok_or_else(|| self.expected("an object or null", json))?;

        if let Some(reference) = map.get(REF_KEY) {
            let object = reference
                .as_u64()
                .and_then(|index| self.objects.get(&index))
                .cloned()
                .ok_or_else(|| self.fail(format!("unknown object {}", reference)))?;
            self.check_derived(object.type_id(), pointee)?;
            return Ok(object);
        }

        let id = map
            .get(ID_KEY)
            .and_then(Json::as_u64)
            .ok_or_else(|| self.fail("object without @id or @ref"))?;
        if self.objects.contains_key(&id) {
            return Err(self.fail(format!("duplicate object {}", id)));
        }
        let real = match map.get(TYPE_KEY) {
            Some(Json::String(name)) => self
                .registry
                .lookup(name)
                .ok_or_else(|| self.fail(format!("unknown class: {}", name)))?,
            Some(other) => return Err(self.expected("a type name", other)),
            None => pointee,
        };
        self.check_derived(real, pointee)?;
        let inner = map
            .get(VALUE_KEY)
            .ok_or_else(|| self.fail(format!("object {} has no value", id)))?;

        // Registered before its value so references inside resolve to it
        let object = Object::new(real, Value::Null);
        self.objects.insert(id, object.clone());
        let value = self.value(inner, real)?;
        object.replace(value);
        Ok(object)
    }

    fn check_derived(&self, real: TypeId, pointee: TypeId) -> Result<()> {
        if self.registry.is_derived(real, pointee) {
            Ok(())
        } else {
            Err(self.fail(format!(
                "incompatible type: {} is not a {}",
                self.registry.name(real),
                self.registry.name(pointee)
            )))
        }
    }
}

fn single_byte(text: &str) -> Option<u8> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => u8::try_from(c).ok(),
        _ => None,
    }
}

fn real(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            "nan" => Some(f64::NAN),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rser_type::Schema;

    const SCHEMA: &str = r#"
[[types]]
name = "Node"
kind = "sequence"
members = [
    { name = "label", tag = 0, type = "VisibleString" },
    { name = "next", tag = 1, type = "NodeRef", optional = true },
    { name = "children", tag = 2, type = "NodeList" },
]

[[types]]
name = "NodeRef"
kind = "pointer"
pointee = "Node"

[[types]]
name = "NodeList"
kind = "sequence-of"
element = "NodeRef"

[[types]]
name = "Tagged"
kind = "sequence"
parent = "Node"
members = [{ name = "weight", tag = 3, type = "REAL", default = 1 }]

[[types]]
name = "Color"
kind = "enumerated"
items = [{ name = "red", value = 0 }, { name = "blue", value = 2 }]

[[types]]
name = "Blob"
kind = "set"
members = [
    { name = "bytes", tag = 0, type = "OCTET STRING" },
    { name = "color", tag = 1, type = "Color" },
    { name = "ratio", tag = 2, type = "REAL" },
]
"#;

    const DEPTH: usize = 64;

    fn registry() -> TypeRegistry {
        Schema::from_toml_str(SCHEMA)
            .unwrap()
            .into_registry()
            .unwrap()
    }

    fn node(registry: &TypeRegistry, label: &str) -> ObjectRef {
        Object::new(
            registry.lookup("Node").unwrap(),
            Value::Class(ClassValue::new(vec![
                Some(Value::from(label)),
                None,
                Some(Value::List(Vec::new())),
            ])),
        )
    }

    #[test]
    fn test_shared_object_written_once() {
        let registry = registry();
        let list = registry.lookup("NodeList").unwrap();
        let shared = node(&registry, "a");
        let value = Value::List(vec![shared.clone().into(), shared.into()]);

        let json = to_json(&registry, &value, list, DEPTH).unwrap();
        assert_eq!(
            json,
            json!([
                {"@id": 0, "@type": "Node", "value": {"label": "a", "children": []}},
                {"@ref": 0},
            ])
        );

        let copy = from_json(&registry, &json, list, DEPTH).unwrap();
        let items = copy.as_list().unwrap();
        assert!(ObjectRef::ptr_eq(
            items[0].as_pointer().unwrap(),
            items[1].as_pointer().unwrap()
        ));
        assert!(rser_type::isomorphic(&value, &copy));
    }

    #[test]
    fn test_cycle_refers_back() {
        let registry = registry();
        let node_ref = registry.lookup("NodeRef").unwrap();
        let a = node(&registry, "a");
        a.borrow_mut()
            .as_class_mut()
            .unwrap()
            .set(1, Some(Value::Pointer(Some(a.clone()))));

        let json = to_json(&registry, &a.clone().into(), node_ref, DEPTH).unwrap();
        assert_eq!(json["value"]["next"], json!({"@ref": 0}));

        let copy = from_json(&registry, &json, node_ref, DEPTH).unwrap();
        let object = copy.as_pointer().unwrap().clone();
        let next = object
            .borrow()
            .as_class()
            .and_then(|class| class.get(1))
            .and_then(Value::as_pointer)
            .cloned()
            .unwrap();
        assert!(ObjectRef::ptr_eq(&object, &next));

        a.replace(Value::Null);
        object.replace(Value::Null);
    }

    #[test]
    fn test_derived_object_keeps_its_type() {
        let registry = registry();
        let node_ref = registry.lookup("NodeRef").unwrap();
        let json = json!({
            "@id": 0,
            "@type": "Tagged",
            "value": {"label": "t", "children": []},
        });

        let value = from_json(&registry, &json, node_ref, DEPTH).unwrap();
        let object = value.as_pointer().unwrap();
        assert_eq!(registry.name(object.type_id()), "Tagged");
        // absent defaulted member takes its default
        assert_eq!(
            object.borrow().as_class().unwrap().get(3),
            Some(&Value::Real(1.0))
        );

        let back = to_json(&registry, &value, node_ref, DEPTH).unwrap();
        assert_eq!(back["@type"], json!("Tagged"));
        assert_eq!(back["value"]["weight"], json!(1.0));
    }

    #[test]
    fn test_primitives_and_specials() {
        let registry = registry();
        let blob = registry.lookup("Blob").unwrap();
        let value = Value::Class(ClassValue::from_values([
            Value::Octets(vec![0x0a, 0xff]),
            Value::Enum(2),
            Value::Real(f64::NEG_INFINITY),
        ]));

        let json = to_json(&registry, &value, blob, DEPTH).unwrap();
        assert_eq!(
            json,
            json!({"bytes": "0aff", "color": "blue", "ratio": "-inf"})
        );
        assert_eq!(from_json(&registry, &json, blob, DEPTH).unwrap(), value);
    }

    #[test]
    fn test_missing_member_is_located() {
        let registry = registry();
        let list = registry.lookup("NodeList").unwrap();
        let json = json!([{"@id": 0, "value": {"children": []}}]);

        let err = from_json(&registry, &json, list, DEPTH).unwrap_err();
        match err {
            RsertError::Conversion { path, message } => {
                assert_eq!(path, "NodeList[]");
                assert_eq!(message, "missing member: label");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_forward_reference_rejected() {
        let registry = registry();
        let list = registry.lookup("NodeList").unwrap();
        let json = json!([{"@ref": 1}]);

        let err = from_json(&registry, &json, list, DEPTH).unwrap_err();
        assert!(err.to_string().contains("unknown object 1"));
    }

    #[test]
    fn test_unknown_member_rejected() {
        let registry = registry();
        let blob = registry.lookup("Blob").unwrap();
        let json = json!({"bytes": "", "color": "red", "ratio": 0.5, "extra": 1});

        let err = from_json(&registry, &json, blob, DEPTH).unwrap_err();
        assert!(err.to_string().contains("unknown member: extra"));
    }

    #[test]
    fn test_depth_limit() {
        let registry = registry();
        let node_ref = registry.lookup("NodeRef").unwrap();
        let json = json!({"@id": 0, "value": {"label": "a", "children": []}});

        assert!(from_json(&registry, &json, node_ref, 2).is_err());
        assert!(from_json(&registry, &json, node_ref, 8).is_ok());
    }
}
