use criterion::{Criterion, black_box, criterion_group, criterion_main};
use cm_core::Image;
use cm_morph::{BinarizeConfig, ThinningConfig, binarize_u8, thin_guo_hall};

fn synthetic_crack(width: usize, height: usize) -> Image<u8> {
    let mut data = vec![20u8; width * height];

    for x in 0..width {
        let yc = height as f32 * 0.5 + (x as f32 * 0.02).sin() * height as f32 * 0.2;
        let half = 3.0 + (x as f32 * 0.05).cos().abs() * 4.0;
        for y in 0..height {
            if (y as f32 - yc).abs() <= half {
                data[y * width + x] = 230;
            }
        }
    }

    Image::from_vec(width, height, data).expect("valid image")
}

fn bench_thin(c: &mut Criterion) {
    let img = synthetic_crack(1024, 512);
    let mask = binarize_u8(&img.as_view(), &BinarizeConfig::default()).expect("binarize");
    let cfg = ThinningConfig::default();

    c.bench_function("cm_morph_thin_1024x512", |b| {
        b.iter(|| {
            let out = thin_guo_hall(black_box(&mask.as_view()), black_box(&cfg));
            black_box(out.passes);
        });
    });

    c.bench_function("cm_morph_binarize_1024x512", |b| {
        b.iter(|| {
            let out = binarize_u8(black_box(&img.as_view()), &BinarizeConfig::default());
            black_box(out.map(|m| m.width()).unwrap_or(0));
        });
    });
}

criterion_group!(benches, bench_thin);
criterion_main!(benches);
