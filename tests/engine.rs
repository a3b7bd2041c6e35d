use image::Rgb;
use pixelmill::{
    EngineError, Filter, FilterExecutor, HistoryStack, PixelBuffer, SaveFormat, apply_filter,
    decode, encode,
};

/// xorshift64 so the "random" buffers are the same on every run.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn random_buffer(w: u32, h: u32, seed: u64) -> PixelBuffer {
    let mut rng = Rng(seed);
    let raw: Vec<u8> = (0..w as usize * h as usize * 3).map(|_| rng.next() as u8).collect();
    PixelBuffer::from_raw(w, h, raw).unwrap()
}

fn adversarial_inputs() -> Vec<PixelBuffer> {
    vec![
        PixelBuffer::new_filled(7, 5, Rgb([0, 0, 0])),
        PixelBuffer::new_filled(7, 5, Rgb([255, 255, 255])),
        random_buffer(61, 47, 0x9e3779b97f4a7c15),
    ]
}

#[test]
fn invert_is_an_involution() {
    let exec = FilterExecutor::new(4, 5).unwrap();
    for buf in adversarial_inputs() {
        let twice = exec.apply(&exec.apply(&buf, Filter::Invert).unwrap(), Filter::Invert).unwrap();
        assert_eq!(twice, buf);
    }
}

#[test]
fn output_is_independent_of_pool_and_partition_size() {
    let src = random_buffer(83, 59, 42);
    let reference = FilterExecutor::new(1, 59).unwrap();
    let variants = [
        FilterExecutor::new(1, 1).unwrap(),
        FilterExecutor::new(2, 3).unwrap(),
        FilterExecutor::new(8, 7).unwrap(),
        FilterExecutor::default(),
    ];
    for &filter in Filter::all() {
        let expected = reference.apply(&src, filter).unwrap();
        assert_eq!(reference.apply(&src, filter).unwrap(), expected, "{} repeat", filter);
        for exec in &variants {
            assert_eq!(exec.apply(&src, filter).unwrap(), expected, "{}", filter);
        }
    }
}

#[test]
fn every_filter_stays_in_range_and_keeps_dimensions() {
    // Channels are u8 so the range holds by type; this checks every filter is
    // total over the extremes and never changes the buffer shape.
    let exec = FilterExecutor::default();
    for buf in adversarial_inputs() {
        for &filter in Filter::all() {
            let out = exec.apply(&buf, filter).unwrap();
            assert_eq!(out.dimensions(), buf.dimensions(), "{}", filter);
        }
    }
    let white = PixelBuffer::new_filled(2, 2, Rgb([255, 255, 255]));
    let out = exec.apply(&white, Filter::BrightnessHigh).unwrap();
    assert!(out.pixels().all(|p| p == Rgb([255, 255, 255])));
    let black = PixelBuffer::new(2, 2);
    let out = exec.apply(&black, Filter::ContrastHigh).unwrap();
    assert!(out.pixels().all(|p| p == Rgb([0, 0, 0])));
}

#[test]
fn contrast_matches_sequential_reference_from_source_mean() {
    let src = random_buffer(40, 30, 7);

    // Sequential reference: statistic first, then a plain row-major pass.
    let mut total = 0.0f64;
    for p in src.pixels() {
        total += (p.0[0] as f64 + p.0[1] as f64 + p.0[2] as f64) / 3.0;
    }
    let avg = total / src.pixel_count() as f64;
    assert!((avg - src.average_intensity()).abs() < 1e-9);

    for (filter, factor) in [(Filter::ContrastHigh, 1.1), (Filter::ContrastLow, 0.9)] {
        let out = FilterExecutor::new(6, 1).unwrap().apply(&src, filter).unwrap();
        let mean = src.average_intensity();
        for (s, d) in src.pixels().zip(out.pixels()) {
            for ch in 0..3 {
                let expected = (((s.0[ch] as f64 - mean) * factor + mean) as i32).clamp(0, 255) as u8;
                assert_eq!(d.0[ch], expected);
            }
        }
    }
}

#[test]
fn black_and_white_scenario() {
    let src = PixelBuffer::from_pixels(
        2,
        2,
        &[Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255]), Rgb([255, 255, 255])],
    )
    .unwrap();
    let out = apply_filter(&src, "black-and-white").unwrap();
    let expected = PixelBuffer::from_pixels(
        2,
        2,
        &[Rgb([85, 85, 85]), Rgb([85, 85, 85]), Rgb([85, 85, 85]), Rgb([255, 255, 255])],
    )
    .unwrap();
    assert_eq!(out, expected);
}

#[test]
fn brightness_low_clamps_at_zero() {
    let src = PixelBuffer::new_filled(1, 1, Rgb([3, 3, 3]));
    let out = apply_filter(&src, "brightness-low").unwrap();
    assert_eq!(out.get(0, 0).unwrap(), Rgb([0, 0, 0]));
}

#[test]
fn history_revert_scenario() {
    let s0 = PixelBuffer::new_filled(2, 2, Rgb([1, 1, 1]));
    let s1 = PixelBuffer::new_filled(2, 2, Rgb([2, 2, 2]));

    let mut history = HistoryStack::new();
    history.record(s0.clone());
    history.record(s1);

    let restored = history.revert().unwrap();
    assert_eq!(restored, s0);
    assert_eq!(history.top(), Some(&s0));
    assert_eq!(history.depth(), 1);

    // The counter now equals the depth, so the next revert pops the re-pushed
    // S0 and pushes it back again.
    let again = history.revert().unwrap();
    assert_eq!(again, s0);
    assert_eq!(history.depth(), 1);

    let mut empty = HistoryStack::new();
    assert!(matches!(empty.revert(), Err(EngineError::HistoryUnderflow { .. })));
}

#[test]
fn png_round_trip_is_exact_and_jpeg_keeps_dimensions() {
    let src = random_buffer(33, 17, 99);
    let png = encode(&src, SaveFormat::Png, 90).unwrap();
    assert_eq!(decode(&png, "png").unwrap(), src);

    let jpg = encode(&src, SaveFormat::Jpeg, 90).unwrap();
    assert_eq!(decode(&jpg, "jpg").unwrap().dimensions(), (33, 17));
}
