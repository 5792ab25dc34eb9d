// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the reconstruction pipeline: corner detection,
// rectification, adjustments, and page assembly on a synthetic photo.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};

use scanwerk_core::{AdjustmentState, ColorFilter, Point, Quad, Rotation};
use scanwerk_document::{
    AdjustmentPipeline, DocumentMetadata, EdgeDetector, ImageprocVision, PageAssembler, scan,
};

/// A light page on a dark table, 800x1000, page from (120,150) to (680,850).
fn synthetic_photo() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(800, 1000, |x, y| {
        if (120..680).contains(&x) && (150..850).contains(&y) {
            Rgba([232, 230, 225, 255])
        } else {
            Rgba([40, 38, 36, 255])
        }
    }))
}

fn bench_detect(c: &mut Criterion) {
    let vision = ImageprocVision::new();
    let photo = synthetic_photo();
    let detector = EdgeDetector::new(&vision);

    c.bench_function("detect (800x1000)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&photo))));
    });
}

fn bench_rectify(c: &mut Criterion) {
    let vision = ImageprocVision::new();
    let photo = synthetic_photo();
    let corners = Quad::new([
        Point::new(120.0, 150.0),
        Point::new(680.0, 160.0),
        Point::new(670.0, 850.0),
        Point::new(110.0, 840.0),
    ]);

    c.bench_function("rectify to 500x700", |b| {
        b.iter(|| black_box(scan::rectify(&vision, &photo, &corners, 500, 700)));
    });
}

fn bench_adjust(c: &mut Criterion) {
    let vision = ImageprocVision::new();
    let page = DynamicImage::ImageRgba8(synthetic_photo().to_rgba8());
    let state = AdjustmentState::new(ColorFilter::BlackAndWhite, Rotation::Deg90, 10, 20);
    let pipeline = AdjustmentPipeline::new(Some(&vision));

    c.bench_function("adjust black-and-white (800x1000)", |b| {
        b.iter(|| black_box(pipeline.render(&page, &state)));
    });
}

fn bench_assemble(c: &mut Criterion) {
    let page = synthetic_photo().to_rgba8();
    let assembler = PageAssembler::a4();
    let metadata = DocumentMetadata::titled("Bench");

    c.bench_function("assemble one page", |b| {
        b.iter(|| {
            let artifact = assembler
                .assemble(std::slice::from_ref(&page), &metadata)
                .expect("assemble");
            black_box(artifact.byte_size);
        });
    });
}

criterion_group!(benches, bench_detect, bench_rectify, bench_adjust, bench_assemble);
criterion_main!(benches);
