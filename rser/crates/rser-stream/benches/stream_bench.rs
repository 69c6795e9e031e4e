//! Stream Throughput Benchmarks
//!
//! Run with: `cargo bench --package rser-stream`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rser_stream::{ber, ObjectIStream, ObjectOStream};
use rser_type::{ClassBuilder, ClassValue, Object, ObjectRef, TypeId, TypeRegistry, Value};

struct Tree {
    registry: TypeRegistry,
    node_ref: TypeId,
    ints: TypeId,
}

fn tree_types() -> Tree {
    let mut registry = TypeRegistry::new();
    let node = registry.declare("Node").unwrap();
    let node_ref = registry.pointer("NodeRef", node).unwrap();
    let children = registry.sequence_of("Children", node_ref).unwrap();
    registry
        .define(
            node,
            ClassBuilder::sequence()
                .member("label", 0, TypeRegistry::STRING)
                .member("weight", 1, TypeRegistry::REAL)
                .member("children", 2, children)
                .build(),
        )
        .unwrap();
    let ints = registry.sequence_of("Ints", TypeRegistry::INT).unwrap();
    Tree {
        registry,
        node_ref,
        ints,
    }
}

/// Wide tree whose leaves are all shared by every branch
fn shared_tree(tree: &Tree, branches: usize, leaves: usize) -> ObjectRef {
    let node_type = tree.registry.lookup("Node").unwrap();
    let node = |label: String, children: Vec<Value>| {
        Object::new(
            node_type,
            Value::Class(ClassValue::from_values([
                Value::from(label),
                Value::Real(1.5),
                Value::List(children),
            ])),
        )
    };
    let leaves: Vec<Value> = (0..leaves)
        .map(|i| node(format!("leaf{}", i), Vec::new()).into())
        .collect();
    let branches = (0..branches)
        .map(|i| node(format!("branch{}", i), leaves.clone()).into())
        .collect();
    node("root".to_string(), branches)
}

fn bench_write(c: &mut Criterion) {
    let tree = tree_types();
    let mut group = c.benchmark_group("write");

    for size in [10, 100] {
        let root = Value::from(shared_tree(&tree, size, size));
        group.bench_with_input(BenchmarkId::new("shared_tree", size), &root, |b, root| {
            b.iter(|| {
                let mut stream = ObjectOStream::new(Vec::new(), &tree.registry);
                stream.write_root(black_box(root), tree.node_ref).unwrap();
                black_box(stream.into_inner().unwrap())
            })
        });
    }

    let ints = Value::List((0..10_000).map(Value::Int).collect());
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("ints_10k", |b| {
        b.iter(|| {
            let mut stream = ObjectOStream::new(Vec::new(), &tree.registry);
            stream.write_root(black_box(&ints), tree.ints).unwrap();
            black_box(stream.into_inner().unwrap())
        })
    });

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let tree = tree_types();
    let mut group = c.benchmark_group("read");

    for size in [10, 100] {
        let root = Value::from(shared_tree(&tree, size, size));
        let mut stream = ObjectOStream::new(Vec::new(), &tree.registry);
        stream.write_root(&root, tree.node_ref).unwrap();
        let bytes = stream.into_inner().unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("shared_tree", size), &bytes, |b, bytes| {
            b.iter(|| {
                let mut stream = ObjectIStream::new(black_box(bytes), &tree.registry);
                black_box(stream.read_root(tree.node_ref).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_dump(c: &mut Criterion) {
    let tree = tree_types();
    let root = Value::from(shared_tree(&tree, 100, 100));
    let mut stream = ObjectOStream::new(Vec::new(), &tree.registry);
    stream.write_root(&root, tree.node_ref).unwrap();
    let bytes = stream.into_inner().unwrap();

    let mut group = c.benchmark_group("schema_less");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("check", |b| b.iter(|| ber::check(black_box(&bytes)).unwrap()));
    group.bench_function("dump", |b| b.iter(|| ber::dump(black_box(&bytes)).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_dump);
criterion_main!(benches);
