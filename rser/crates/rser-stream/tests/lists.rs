//! Incremental List Tests - Container Completeness
//!
//! A container opened with `begin_list` must be closed with `end`, with
//! exactly the announced number of elements on the way out and every
//! element consumed on the way in. Anything else fails the stream.

mod common;

use common::*;
use rser_stream::{ErrorKind, FailFlags, ObjectIStream, ObjectOStream};
use rser_type::{ObjectRef, TypeRegistry, Value};

fn ints(count: i64) -> Vec<u8> {
    let f = Fixture::new();
    f.write(&Value::List((0..count).map(Value::Int).collect()), f.ints)
}

/// ============================================================================
/// WRITING
/// ============================================================================

#[test]
fn test_list_writer_matches_whole_value() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let mut list = output.begin_list(f.ints, Some(3)).unwrap();
    for i in 0..3 {
        list.write_element(&Value::Int(i)).unwrap();
    }
    assert_eq!(list.written(), 3);
    list.end().unwrap();
    assert!(output.is_ok());

    assert_eq!(output.into_inner().unwrap(), ints(3));
}

#[test]
fn test_list_writer_shares_objects_between_elements() {
    let f = Fixture::new();
    let shared = f.node("shared");

    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let mut list = output.begin_list(f.node_list, None).unwrap();
    list.write_element(&shared.clone().into()).unwrap();
    list.write_element(&shared.clone().into()).unwrap();
    list.end().unwrap();
    assert_eq!(output.objects_written(), 1);
    assert_eq!(output.references_written(), 1);
    let bytes = output.into_inner().unwrap();

    let copy = f.read(&bytes, f.node_list);
    let objects = pointers(&copy);
    assert!(ObjectRef::ptr_eq(&objects[0], &objects[1]));
}

#[test]
fn test_list_writer_short_count() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let mut list = output.begin_list(f.ints, Some(3)).unwrap();
    list.write_element(&Value::Int(1)).unwrap();
    list.write_element(&Value::Int(2)).unwrap();

    let err = list.end().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::NotAllWritten {
            written: 2,
            expected: 3
        }
    ));
    assert!(output.fail_flags().contains(FailFlags::ILLEGAL_CALL));
}

#[test]
fn test_list_writer_extra_element() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let mut list = output.begin_list(f.ints, Some(1)).unwrap();
    list.write_element(&Value::Int(1)).unwrap();
    let err = list.write_element(&Value::Int(2)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IllegalCall(_)));
}

#[test]
fn test_list_writer_dropped_without_end() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    {
        let mut list = output.begin_list(f.ints, None).unwrap();
        list.write_element(&Value::Int(1)).unwrap();
    }
    assert_eq!(output.fail_flags(), FailFlags::FAIL);

    let err = output
        .write_root(&Value::Int(1), TypeRegistry::INT)
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Failed(FailFlags::FAIL)));
}

#[test]
fn test_begin_list_needs_a_container() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let err = output.begin_list(f.node, None).err().unwrap();
    assert!(matches!(err.kind, ErrorKind::IllegalCall(_)));
}

#[test]
fn test_list_element_type_mismatch() {
    let f = Fixture::new();
    let mut output = ObjectOStream::new(Vec::new(), &f.registry);
    let mut list = output.begin_list(f.ints, None).unwrap();
    let err = list.write_element(&Value::from("two")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    assert_eq!(err.path, "Ints[]");
}

/// ============================================================================
/// READING
/// ============================================================================

#[test]
fn test_list_reader_reads_every_element() {
    let f = Fixture::new();
    let bytes = ints(4);
    let mut input = ObjectIStream::new(&bytes, &f.registry);

    let mut list = input.begin_list(f.ints).unwrap();
    let mut values = Vec::new();
    while let Some(value) = list.next_element().unwrap() {
        values.push(value);
    }
    assert_eq!(list.read(), 4);
    list.end().unwrap();

    assert_eq!(values, (0..4).map(Value::Int).collect::<Vec<_>>());
    input.expect_end().unwrap();
}

#[test]
fn test_list_reader_partial_read() {
    let f = Fixture::new();
    let bytes = ints(4);
    let mut input = ObjectIStream::new(&bytes, &f.registry);

    let mut list = input.begin_list(f.ints).unwrap();
    assert_eq!(list.next_element().unwrap(), Some(Value::Int(0)));
    let err = list.end().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotAllRead));
    assert!(input.fail_flags().contains(FailFlags::FORMAT_ERROR));
}

#[test]
fn test_list_reader_dropped_without_end() {
    let f = Fixture::new();
    let bytes = ints(2);
    let mut input = ObjectIStream::new(&bytes, &f.registry);
    {
        let mut list = input.begin_list(f.ints).unwrap();
        list.next_element().unwrap();
    }
    assert_eq!(input.fail_flags(), FailFlags::FAIL);
    assert!(matches!(
        input.skip_value().unwrap_err().kind,
        ErrorKind::Failed(_)
    ));
}

#[test]
fn test_list_reader_empty_list() {
    let f = Fixture::new();
    let bytes = ints(0);
    let mut input = ObjectIStream::new(&bytes, &f.registry);

    let mut list = input.begin_list(f.ints).unwrap();
    assert_eq!(list.next_element().unwrap(), None);
    list.end().unwrap();
    assert!(input.at_end());
}

#[test]
fn test_list_reader_resolves_references_between_elements() {
    let f = Fixture::new();
    let shared = f.node("shared");
    let bytes = f.write(
        &Value::List(vec![shared.clone().into(), shared.into()]),
        f.node_list,
    );

    let mut input = ObjectIStream::new(&bytes, &f.registry);
    let mut list = input.begin_list(f.node_list).unwrap();
    let first = list.next_element().unwrap().unwrap();
    let second = list.next_element().unwrap().unwrap();
    list.end().unwrap();
    assert_eq!(input.references_read(), 1);
    assert!(ObjectRef::ptr_eq(
        first.as_pointer().unwrap(),
        second.as_pointer().unwrap()
    ));
}
