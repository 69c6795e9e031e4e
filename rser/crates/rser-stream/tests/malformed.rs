//! Malformed Input Tests - Hard Errors, Never Panics
//!
//! Truncated, corrupted or hostile input must come back as a located
//! `StreamError` with the matching fail flag.

mod common;

use common::*;
use quickcheck_macros::quickcheck;
use rser_stream::{ber, ErrorKind, FailFlags, ObjectIStream, StreamConfig};
use rser_type::Value;

fn sample(f: &Fixture) -> Vec<u8> {
    let root = f.node("root");
    let child = f.node("child");
    add_child(&root, &child);
    add_child(&root, &child);
    set_next(&child, Some(&root));
    let bytes = f.write(&Value::from(root.clone()), f.node_ref);
    unlink(&[root, child]);
    bytes
}

#[test]
fn test_every_truncation_fails() {
    let f = Fixture::new();
    let bytes = sample(&f);
    for cut in 0..bytes.len() {
        let mut input = ObjectIStream::new(&bytes[..cut], &f.registry);
        let err = input.read_root(f.node_ref).unwrap_err();
        assert!(
            matches!(err.kind, ErrorKind::UnexpectedEof),
            "cut at {}: {}",
            cut,
            err
        );
        assert_eq!(input.fail_flags(), FailFlags::EOF);
    }
}

#[test]
fn test_reference_out_of_range() {
    let f = Fixture::new();
    // NodeList { [APPLICATION 2] 0 } before any object was read
    let bytes = [0x30, 0x80, 0x42, 0x01, 0x00, 0x00, 0x00];
    let err = ObjectIStream::new(&bytes, &f.registry)
        .read_root(f.node_list)
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::InvalidObjectIndex { index: 0, count: 0 }
    ));
    assert_eq!(err.path, "NodeList[]");
}

#[test]
fn test_reference_of_wrong_type() {
    let f = Fixture::new();
    let mut registry = f.registry;
    let int_ref = registry.pointer("IntRef", rser_type::TypeRegistry::INT).unwrap();
    let mixed = registry
        .register(
            "Mixed",
            rser_type::ClassBuilder::sequence()
                .member("node", 0, f.node_ref)
                .member("number", 1, int_ref)
                .build(),
        )
        .unwrap();

    // node is written in full, number refers back to it
    let bytes = [
        0x30, 0x80, //
        0xA0, 0x80, //
        0x30, 0x80, 0xA0, 0x80, 0x1A, 0x00, 0x00, 0x00, 0xA2, 0x80, 0x30, 0x80, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, //
        0xA1, 0x80, 0x42, 0x01, 0x00, 0x00, 0x00, //
        0x00, 0x00,
    ];
    let err = ObjectIStream::new(&bytes, &registry)
        .read_root(mixed)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IncompatibleType { .. }));
    assert_eq!(err.path, "Mixed.number");
}

#[test]
fn test_unknown_class_name() {
    let f = Fixture::new();
    let bytes = [0x7F, b'Z' | 0x80, b'z', 0x80, 0x00, 0x00];
    let err = ObjectIStream::new(&bytes, &f.registry)
        .read_root(f.base_ref)
        .unwrap_err();
    assert_eq!(err.kind.to_string(), "unknown class: Zz");
}

#[test]
fn test_unknown_enum_value() {
    let f = Fixture::new();
    let bytes = [0x0A, 0x01, 0x09];
    let err = ObjectIStream::new(&bytes, &f.registry)
        .read_root(f.color)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Format(_)));
}

#[test]
fn test_integer_overflow() {
    let f = Fixture::new();
    let bytes = [0x02, 0x09, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut input = ObjectIStream::new(&bytes, &f.registry);
    let err = input.read_root(rser_type::TypeRegistry::INT).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Overflow(_)));
    assert_eq!(input.fail_flags(), FailFlags::OVERFLOW);
}

#[test]
fn test_length_limit() {
    let f = Fixture::new();
    let bytes = [0x1A, 0x82, 0x01, 0x00];
    let config = StreamConfig {
        max_length: 64,
        ..Default::default()
    };
    let err = ObjectIStream::new(&bytes, &f.registry)
        .with_config(config)
        .read_root(rser_type::TypeRegistry::STRING)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::LimitExceeded(_)));
}

#[test]
fn test_container_overrun() {
    let f = Fixture::new();
    // definite SEQUENCE OF of 2 bytes holding a 3-byte INTEGER
    let bytes = [0x30, 0x02, 0x02, 0x01, 0x01];
    let err = ObjectIStream::new(&bytes, &f.registry)
        .read_root(f.ints)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Format(_)));
}

#[test]
fn test_stray_end_of_contents_in_dump() {
    let err = ber::dump(&[0x00, 0x00]).unwrap_err();
    assert_eq!(err.path, "#0");
    assert_eq!(err.flag(), FailFlags::FORMAT_ERROR);
}

#[test]
fn test_dump_matches_written_shape() {
    let f = Fixture::new();
    let bytes = sample(&f);
    let nodes = ber::dump(&bytes).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(ber::check(&bytes).unwrap(), nodes[0].count());
    assert!(nodes[0].to_string().contains("-> object 0"));
}

#[quickcheck]
fn prop_arbitrary_input_never_panics(bytes: Vec<u8>) -> bool {
    let f = Fixture::new();
    let mut input = ObjectIStream::new(&bytes, &f.registry);
    match input.read_root(f.node_ref) {
        Ok(value) => {
            if let Some(object) = value.as_pointer() {
                unlink(&[object.clone()]);
            }
            true
        }
        Err(err) => !input.fail_flags().is_empty() && err.offset <= bytes.len(),
    }
}

#[quickcheck]
fn prop_check_agrees_with_dump(bytes: Vec<u8>) -> bool {
    match (ber::check(&bytes), ber::dump(&bytes)) {
        (Ok(count), Ok(nodes)) => count == nodes.iter().map(|n| n.count()).sum::<usize>(),
        (Err(_), Err(_)) => true,
        _ => false,
    }
}
