//! Throughput of record writes, reads and inheritance resolution.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gitpersona_profile::{Profile, ProfileName, resolve};
use gitpersona_store::{ProfileStore, StoreConfig};
use tempfile::TempDir;

fn profile_name(s: &str) -> ProfileName {
    ProfileName::new(s).expect("valid name")
}

fn open_store() -> (ProfileStore, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = ProfileStore::open(StoreConfig::new(dir.path())).expect("store");
    (store, dir)
}

fn bench_write(c: &mut Criterion) {
    let (store, _dir) = open_store();
    let profile = Profile::new(profile_name("bench"))
        .with_identity_name("Bench")
        .with_email("bench@example.com")
        .with_extension("core.editor", "vim");

    c.bench_function("write_record", |b| {
        b.iter(|| store.write(black_box(&profile)).expect("write"));
    });
}

fn bench_read(c: &mut Criterion) {
    let (store, _dir) = open_store();
    let profile = Profile::new(profile_name("bench")).with_email("bench@example.com");
    store.create(&profile).expect("create");

    c.bench_function("read_record", |b| {
        b.iter(|| store.read(black_box(&profile.name)).expect("read"));
    });
}

fn bench_resolve_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_chain");
    for depth in [1usize, 4, 8] {
        let (store, _dir) = open_store();
        for i in 0..depth {
            let mut profile = Profile::new(profile_name(&format!("p{i}")))
                .with_extension(format!("gp.level{i}"), i as i64);
            if i + 1 < depth {
                profile = profile.with_parent(profile_name(&format!("p{}", i + 1)));
            }
            store.create(&profile).expect("create");
        }
        let leaf = profile_name("p0");
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| resolve(&store, black_box(&leaf)).expect("resolve"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_resolve_chain);
criterion_main!(benches);
