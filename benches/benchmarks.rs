use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wasmfetch::wasm::WasmValue;

/// `(module (func (export "add") (param i32 i32) (result i32) ...))`
const ADD_MODULE: &[u8] = &[
    0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, 0x01, 0x07, 0x01, 0x60, 0x02, 0x7f, 0x7f,
    0x01, 0x7f, 0x03, 0x02, 0x01, 0x00, 0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00,
    0x0a, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6a, 0x0b,
];

/// Compare the two load strategies for a module on disk
fn benchmark_load(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("add.wasm");
    std::fs::write(&path, ADD_MODULE).unwrap();
    let path = path.to_str().unwrap().to_string();

    let loader = wasmfetch::wasm_loader(None).unwrap();
    let mut group = c.benchmark_group("load");

    group.bench_function("streaming", |b| {
        loader.engine().set_streaming(true);
        b.iter(|| black_box(rt.block_on(loader.fetch(&path, None)).unwrap()))
    });

    group.bench_function("buffered", |b| {
        loader.engine().set_streaming(false);
        b.iter(|| black_box(rt.block_on(loader.fetch(&path, None)).unwrap()))
    });

    group.finish();
}

/// Call overhead through the exports handle
fn benchmark_call(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("add.wasm");
    std::fs::write(&path, ADD_MODULE).unwrap();

    let loader = wasmfetch::wasm_loader(None).unwrap();
    let exports = rt
        .block_on(loader.fetch(path.to_str().unwrap(), None))
        .unwrap()
        .unwrap();

    c.bench_function("call_add", |b| {
        b.iter(|| {
            black_box(
                exports
                    .call("add", &[WasmValue::I32(20), WasmValue::I32(22)])
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, benchmark_load, benchmark_call);
criterion_main!(benches);
