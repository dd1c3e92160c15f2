//! Benchmarks for document compression.
//!
//! Run with: cargo bench
//!
//! Documents are generated in memory: each page shows one noisy RGB image.

use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, Stream};
use reducepdf::{CompressionPolicy, PdfCompressor};

/// Creates a PDF with `page_count` pages, each drawing its own image.
fn create_test_pdf(page_count: usize, width: u32, height: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    let mut seed = 0x1234_5678u32;

    for _ in 0..page_count {
        let mut samples = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (seed >> 27) as u8;
                samples.push(((x * 255 / width) as u8).saturating_add(noise));
                samples.push(((y * 255 / height) as u8).saturating_add(noise));
                samples.push(128u8.saturating_add(noise));
            }
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples).unwrap();

        let image = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            encoder.finish().unwrap(),
        ));
        let content = doc.add_object(Stream::new(
            dictionary! {},
            b"q 612 0 0 792 0 0 cm /Im0 Do Q".to_vec(),
        ));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
            "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image } },
        });
        kids.push(Object::Reference(page));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Benchmark format detection on a real document.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1, 64, 64);

    c.bench_function("detect_valid_pdf", |b| {
        b.iter(|| reducepdf::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });
}

/// Benchmark whole-document compression at various page counts.
fn bench_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    group.sample_size(20);

    for page_count in [1, 4, 16] {
        let data = create_test_pdf(page_count, 256, 256);
        let parallel = PdfCompressor::new(CompressionPolicy::default()).unwrap();
        let sequential = PdfCompressor::new(CompressionPolicy::default().sequential()).unwrap();

        group.bench_with_input(BenchmarkId::new("parallel", page_count), &data, |b, data| {
            b.iter(|| parallel.compress(black_box(data)).unwrap());
        });
        group.bench_with_input(
            BenchmarkId::new("sequential", page_count),
            &data,
            |b, data| {
                b.iter(|| sequential.compress(black_box(data)).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark downsampling cost against plain re-encoding.
fn bench_downsampling(c: &mut Criterion) {
    let data = create_test_pdf(1, 1024, 768);
    let policy = CompressionPolicy::default().with_max_dimension(512);
    let compressor = PdfCompressor::new(policy).unwrap();

    c.bench_function("downsample_1024_to_512", |b| {
        b.iter(|| compressor.compress(black_box(&data)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_compression,
    bench_downsampling,
);
criterion_main!(benches);
