use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inference::{
    LabelTable,
    processing::{decode_classification, decode_detections},
};
use ndarray::{Array, IxDyn};
use preprocess::{CLASSIFIER_INPUT_SIZE, DETECTOR_INPUT_SIZE, DecodedImage, pack};

/// Mock detector output with `num_rows` candidates, `num_confident` of them above threshold
fn create_mock_detector_output(num_rows: usize, num_confident: usize) -> ndarray::ArrayD<f32> {
    let mut data = Vec::with_capacity(num_rows * 6);
    for i in 0..num_rows {
        let confidence = if i < num_confident { 0.9 } else { 0.05 };
        data.extend_from_slice(&[
            100.0,
            100.0,
            200.0,
            200.0,
            confidence,
            (i % 5) as f32,
        ]);
    }
    Array::from_shape_vec(IxDyn(&[1, num_rows, 6]), data).unwrap()
}

/// Synthetic grain photo with a gradient so the resize has real work to do
fn create_test_image(width: u32, height: u32) -> DecodedImage {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x % 256) as u8);
            pixels.push((y % 256) as u8);
            pixels.push(((x + y) % 256) as u8);
        }
    }
    DecodedImage::new(width, height, pixels)
}

fn benchmark_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("packing");

    let resolutions = [(640, 480), (1280, 720), (4032, 3024)];
    for (width, height) in resolutions.iter() {
        let image = create_test_image(*width, *height);

        for (name, target) in [
            ("classifier", CLASSIFIER_INPUT_SIZE),
            ("detector", DETECTOR_INPUT_SIZE),
        ] {
            group.bench_with_input(
                BenchmarkId::new(name, format!("{}x{}", width, height)),
                &image,
                |b, image| b.iter(|| pack(black_box(image), black_box(target)).unwrap()),
            );
        }
    }

    group.finish();
}

fn benchmark_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");
    let labels = LabelTable::classifier();

    let scores = Array::from_shape_vec(IxDyn(&[1, 5]), vec![0.1, 0.05, 0.6, 0.2, 0.05]).unwrap();
    group.bench_function("classification", |b| {
        b.iter(|| decode_classification(black_box(&scores), &labels).unwrap())
    });

    let scenarios = [(100, 0), (100, 10), (300, 50), (8400, 100)];
    for (rows, confident) in scenarios.iter() {
        let output = create_mock_detector_output(*rows, *confident);
        group.bench_with_input(
            BenchmarkId::new("detections", format!("{}rows_{}kept", rows, confident)),
            &output,
            |b, output| b.iter(|| decode_detections(black_box(output), &labels, 0.25).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_packing, benchmark_decoding);
criterion_main!(benches);
