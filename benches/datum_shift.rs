use camino::Utf8PathBuf;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use geoframe::compiler::compile_builtin;
use geoframe::config::EngineConfig;
use geoframe::geoframe::Geoframe;

/// Random geographic points over western Europe.
fn europe(rng: &mut StdRng, count: usize) -> Vec<[f64; 3]> {
    (0..count)
        .map(|_| {
            [
                rng.random_range(-5.0..10.0),
                rng.random_range(40.0..55.0),
                rng.random_range(0.0..500.0),
            ]
        })
        .collect()
}

fn bench_datum_shift(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    compile_builtin(&path).unwrap();
    let frame = Geoframe::new(EngineConfig::new(&path)).unwrap();
    let mut rng = StdRng::seed_from_u64(0xD47E);
    let samples = 1_000usize;

    for (label, source, target) in [
        ("molodensky", "ED50", "WGS84"),
        ("bursa_wolf", "OSGB", "WGS84"),
        ("seven_parameter_inverse", "WGS84", "DHDN"),
        ("through_wgs84", "ED50", "DHDN"),
    ] {
        let conversion = frame.datum_conversion(source, target).unwrap();
        c.bench_function(&format!("datum_shift/{label}"), |b| {
            b.iter_batched(
                || europe(&mut rng, samples),
                |points| {
                    for p in &points {
                        black_box(conversion.convert(p).unwrap());
                    }
                },
                BatchSize::LargeInput,
            )
        });
    }

    let ll84 = frame.create("LL84".into()).unwrap();
    let ed50_utm = frame.create("ED50-UTM31".into()).unwrap();
    c.bench_function("transform_points/LL84_to_ED50-UTM31", |b| {
        b.iter_batched(
            || europe(&mut rng, samples),
            |mut points| black_box(frame.transform_points(&ll84, &ed50_utm, &mut points).unwrap()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_datum_shift);
criterion_main!(benches);
