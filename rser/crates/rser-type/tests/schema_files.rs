//! Schema file loading from disk

use std::fs;

use rser_type::{Schema, TypeError, TypeKind, TypeRegistry, Value};
use tempfile::TempDir;

const NODE_TOML: &str = r#"
[[types]]
name = "Node"
kind = "sequence"
members = [
    { name = "label", tag = 0, type = "VisibleString" },
    { name = "next", tag = 1, type = "NodeRef", optional = true },
    { name = "data", tag = 2, type = "OCTET STRING", default = "cafe" },
]

[[types]]
name = "NodeRef"
kind = "pointer"
pointee = "Node"
"#;

#[test]
fn test_load_by_extension() {
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("nodes.toml");
    fs::write(&toml_path, NODE_TOML).unwrap();

    let json_path = dir.path().join("nodes.json");
    let schema = Schema::from_toml_str(NODE_TOML).unwrap();
    fs::write(&json_path, serde_json::to_string_pretty(&schema).unwrap()).unwrap();

    for path in [&toml_path, &json_path] {
        let registry = Schema::load(path).unwrap().into_registry().unwrap();
        let node = registry.id_of("Node").unwrap();
        let class = registry.class(node).unwrap();
        assert_eq!(class.members.len(), 3);
        assert!(class.members[1].optional);
        assert_eq!(class.members[2].default, Some(Value::Octets(vec![0xca, 0xfe])));

        let node_ref = registry.id_of("NodeRef").unwrap();
        assert!(matches!(
            registry.kind(node_ref).unwrap(),
            TypeKind::Pointer(p) if p.pointee == node
        ));
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Schema::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TypeError::Io(_)));
}

#[test]
fn test_schema_extends_existing_registry() {
    let mut registry = TypeRegistry::new();
    Schema::from_toml_str(NODE_TOML)
        .unwrap()
        .apply(&mut registry)
        .unwrap();

    // applying twice clashes on the names
    let again = Schema::from_toml_str(NODE_TOML)
        .unwrap()
        .apply(&mut registry)
        .unwrap_err();
    assert!(matches!(again, TypeError::DuplicateType { .. }));
}

#[test]
fn test_default_value_of_schema_type() {
    let registry = Schema::from_toml_str(NODE_TOML)
        .unwrap()
        .into_registry()
        .unwrap();
    let node = registry.id_of("Node").unwrap();
    let value = registry.create_default(node).unwrap();
    let class = value.as_class().unwrap();
    assert_eq!(class.get(0), Some(&Value::String(String::new())));
    assert_eq!(class.get(1), None);
    assert!(registry.conforms(node, &value));
}

#[test]
fn test_schema_pointer_pointees_must_be_distinguishable() {
    let to_null = r#"
[[types]]
name = "Nothing"
kind = "pointer"
pointee = "NULL"
"#;
    let err = Schema::from_toml_str(to_null)
        .unwrap()
        .into_registry()
        .unwrap_err();
    assert!(matches!(err, TypeError::InvalidPointee { .. }));

    // pointee declared after the pointer
    let to_pointer = r#"
[[types]]
name = "Outer"
kind = "pointer"
pointee = "Inner"

[[types]]
name = "Inner"
kind = "pointer"
pointee = "INTEGER"
"#;
    let err = Schema::from_toml_str(to_pointer)
        .unwrap()
        .into_registry()
        .unwrap_err();
    assert!(matches!(err, TypeError::InvalidPointee { .. }));
}
