extern crate cilguard;

use std::{hint::black_box, sync::Arc};

use cilguard::{
    disassembler::decode_stream,
    metadata::{
        builder::{MethodDefBuilder, ModuleBuilder, TypeDefBuilder},
        identity::AssemblyIdentity,
        references::{MethodReference, TypeReference},
    },
    Module, Policy, Verifier,
};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

/// A module of `types` types with `methods` methods each, every body calling into the
/// framework `calls` times.
fn synthetic_module(types: usize, methods: usize, calls: usize) -> Module {
    let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Bench.Plugin"));
    let write_line = module.member_ref(MethodReference::new(
        TypeReference::new("System", "Console").with_scope(AssemblyIdentity::simple("mscorlib")),
        "WriteLine",
        "Void",
    ));

    let mut body = Vec::with_capacity(calls * 10 + 1);
    for index in 0..calls {
        // ldc.i4 index; call Console.WriteLine
        body.push(0x20);
        body.extend_from_slice(&(index as i32).to_le_bytes());
        body.push(0x28);
        body.extend_from_slice(&write_line.value().to_le_bytes());
    }
    body.push(0x2A);

    for ty in 0..types {
        TypeDefBuilder::new()
            .namespace("Bench")
            .name(format!("Type{}", ty))
            .build(&mut module)
            .unwrap();
        for method in 0..methods {
            MethodDefBuilder::new()
                .name(format!("Method{}", method))
                .code(body.clone())
                .build(&mut module)
                .unwrap();
        }
    }

    module.build()
}

fn bench_policy() -> Policy {
    Policy::from_json(
        r#"{
            "assemblies": [ { "name": "System.Net.Http" } ],
            "types": [ { "name": "System.Reflection.Emit.DynamicMethod", "include_derived": true } ],
            "methods": [ { "declaring_type": "System.IO.File", "name": "Delete" } ],
            "opcodes": [ { "opcode": "localloc" }, { "opcode": "calli" } ],
            "names": [ { "non_printable": true } ]
        }"#,
    )
    .unwrap()
}

/// Full passing scan, the common case for well-behaved plugins
fn bench_check(c: &mut Criterion) {
    let module = synthetic_module(50, 20, 64);
    let verifier = Verifier::new(Arc::new(bench_policy()));
    assert!(verifier.check(&module).passed());

    let mut group = c.benchmark_group("verifier");
    group.throughput(Throughput::Elements(50 * 20 * 129));
    group.bench_function("check_passing", |b| {
        b.iter(|| black_box(verifier.check(black_box(&module))));
    });

    let modules: Vec<_> = (0..16).map(|_| synthetic_module(10, 20, 64)).collect();
    group.bench_function("check_all_16", |b| {
        b.iter(|| black_box(verifier.check_all(black_box(&modules))));
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut code = Vec::new();
    for index in 0..4096_i32 {
        code.push(0x20);
        code.extend_from_slice(&index.to_le_bytes());
        code.push(0x26);
    }
    code.push(0x2A);

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("decode_stream", |b| {
        b.iter(|| black_box(decode_stream(black_box(&code)).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_check, bench_decode);
criterion_main!(benches);
