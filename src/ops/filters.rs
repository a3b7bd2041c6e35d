// ============================================================================
// FILTER EXECUTOR: partitioned parallel application of catalog filters
// ============================================================================
//
// The destination buffer is split into disjoint blocks of whole rows with
// `par_chunks_mut`. Each worker reads the matching source rows and writes only
// its own block, so the hot path needs no locks and the output is identical
// regardless of worker count or block size.
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use image::Rgb;
use rayon::prelude::*;

use crate::canvas::{CHANNELS, PixelBuffer};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::ops::adjustments::{Filter, FilterDescriptor};
use crate::{log_info, log_warn};

/// Default number of rows handed to a worker at a time.
pub const DEFAULT_ROWS_PER_CHUNK: usize = 16;

/// Cooperative cancellation flag shared between a caller and a running pass.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Applies filters over a [`PixelBuffer`] on a rayon pool.
///
/// `pool: None` runs on rayon's global pool.
pub struct FilterExecutor {
    pool: Option<rayon::ThreadPool>,
    rows_per_chunk: usize,
}

impl FilterExecutor {
    /// Build an executor with `threads` workers (0 = rayon's default, one per
    /// logical CPU) handing out `rows_per_chunk` rows per task.
    pub fn new(threads: usize, rows_per_chunk: usize) -> Result<Self> {
        if rows_per_chunk == 0 {
            return Err(EngineError::Config("rows_per_chunk must be at least 1".to_string()));
        }
        let pool = if threads == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("pixelmill-filter-{}", i))
                .build()
                .map_err(|e| EngineError::Config(format!("failed to build worker pool: {}", e)))?;
            Some(pool)
        };
        Ok(Self { pool, rows_per_chunk })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.threads, config.rows_per_chunk)
    }

    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
    }

    pub fn rows_per_chunk(&self) -> usize {
        self.rows_per_chunk
    }

    /// Apply `filter` to `source`, returning a new buffer of the same size.
    pub fn apply(&self, source: &PixelBuffer, filter: Filter) -> Result<PixelBuffer> {
        self.run(source, filter, None)
    }

    /// Like [`apply`](Self::apply), but workers check `cancel` between row
    /// blocks. A cancelled pass returns [`EngineError::Cancelled`] and the
    /// partially written destination is discarded.
    pub fn apply_cancellable(
        &self,
        source: &PixelBuffer,
        filter: Filter,
        cancel: &CancelToken,
    ) -> Result<PixelBuffer> {
        self.run(source, filter, Some(cancel))
    }

    fn run(
        &self,
        source: &PixelBuffer,
        filter: Filter,
        cancel: Option<&CancelToken>,
    ) -> Result<PixelBuffer> {
        self.run_descriptor(source, filter.name(), filter.descriptor(), cancel)
    }

    fn run_descriptor(
        &self,
        source: &PixelBuffer,
        name: &str,
        descriptor: FilterDescriptor,
        cancel: Option<&CancelToken>,
    ) -> Result<PixelBuffer> {
        let (w, h) = source.dimensions();
        if source.is_empty() {
            return Ok(PixelBuffer::new(w, h));
        }

        let start = Instant::now();

        // Whole-image statistic: computed once from the untouched source,
        // before any worker starts.
        let statistic = match descriptor {
            FilterDescriptor::WithStatistic { statistic, .. } => statistic(source),
            FilterDescriptor::Pixel(_) => 0.0,
        };

        let stride = source.stride();
        // A block never spans more than the whole image.
        let block_len = stride * self.rows_per_chunk.min(h as usize);
        let src_raw = source.as_raw();
        let mut dst_raw = vec![0u8; src_raw.len()];

        let mut pass = || {
            dst_raw
                .par_chunks_mut(block_len)
                .enumerate()
                .try_for_each(|(block, out)| {
                    if cancel.is_some_and(CancelToken::is_cancelled) {
                        return Err(EngineError::Cancelled);
                    }
                    let offset = block * block_len;
                    let input = &src_raw[offset..offset + out.len()];
                    map_block(input, out, descriptor, statistic);
                    Ok(())
                })
        };
        let outcome = match &self.pool {
            Some(pool) => pool.install(pass),
            None => pass(),
        };

        if let Err(e) = outcome {
            log_warn!("{} on {}x{} stopped: {}", name, w, h, e);
            return Err(e);
        }

        log_info!(
            "{} on {}x{} ({} threads, {} rows/chunk) in {:.1}ms",
            name,
            w,
            h,
            self.threads(),
            self.rows_per_chunk,
            start.elapsed().as_secs_f64() * 1000.0
        );
        PixelBuffer::from_raw(w, h, dst_raw)
    }
}

impl Default for FilterExecutor {
    fn default() -> Self {
        Self { pool: None, rows_per_chunk: DEFAULT_ROWS_PER_CHUNK }
    }
}

/// Map one block of packed RGB bytes into its destination block.
#[inline]
fn map_block(input: &[u8], out: &mut [u8], descriptor: FilterDescriptor, statistic: f64) {
    let pairs = input.chunks_exact(CHANNELS).zip(out.chunks_exact_mut(CHANNELS));
    match descriptor {
        FilterDescriptor::Pixel(f) => {
            for (src, dst) in pairs {
                let Rgb(c) = f(Rgb([src[0], src[1], src[2]]));
                dst.copy_from_slice(&c);
            }
        }
        FilterDescriptor::WithStatistic { map, .. } => {
            for (src, dst) in pairs {
                let Rgb(c) = map(statistic, Rgb([src[0], src[1], src[2]]));
                dst.copy_from_slice(&c);
            }
        }
    }
}

/// Apply `filter` to an optional source buffer with a default executor.
/// A missing source is a [`EngineError::NullImage`].
pub fn apply_to(source: Option<&PixelBuffer>, filter: Filter) -> Result<PixelBuffer> {
    let source = source.ok_or(EngineError::NullImage)?;
    FilterExecutor::default().apply(source, filter)
}

/// Look up `filter_name` and apply it with a default executor.
pub fn apply_filter(source: &PixelBuffer, filter_name: &str) -> Result<PixelBuffer> {
    let filter: Filter = filter_name.parse()?;
    FilterExecutor::default().apply(source, filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use crate::canvas::Color;

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = ((x * 7 + y * 13) % 256) as u8;
                buf.set(x, y, Rgb([v, v.wrapping_mul(3), 255 - v])).unwrap();
            }
        }
        buf
    }

    #[test]
    fn output_matches_sequential_mapping() {
        let src = gradient(37, 23);
        let exec = FilterExecutor::new(4, 3).unwrap();
        let out = exec.apply(&src, Filter::Sepia).unwrap();
        for y in 0..23 {
            for x in 0..37 {
                let expected = crate::ops::adjustments::sepia(src.get(x, y).unwrap());
                assert_eq!(out.get(x, y).unwrap(), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn source_is_left_untouched() {
        let src = gradient(8, 8);
        let before = src.clone();
        let _ = FilterExecutor::new(2, 1).unwrap().apply(&src, Filter::Invert).unwrap();
        assert_eq!(src, before);
    }

    #[test]
    fn contrast_uses_source_mean() {
        let src = gradient(16, 9);
        let avg = src.average_intensity();
        let out = FilterExecutor::new(3, 2).unwrap().apply(&src, Filter::ContrastHigh).unwrap();
        for (s, d) in src.pixels().zip(out.pixels()) {
            assert_eq!(d, crate::ops::adjustments::contrast_high(avg, s));
        }
    }

    #[test]
    fn pre_cancelled_pass_reports_cancellation() {
        let src = gradient(64, 64);
        let token = CancelToken::new();
        token.cancel();
        let exec = FilterExecutor::new(2, 4).unwrap();
        let err = exec.apply_cancellable(&src, Filter::Invert, &token).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    static MID_PASS_TOKEN: OnceLock<CancelToken> = OnceLock::new();

    /// Inverts, and cancels the shared token the first time it runs.
    fn invert_then_cancel(c: Color) -> Color {
        if let Some(token) = MID_PASS_TOKEN.get() {
            token.cancel();
        }
        crate::ops::adjustments::invert(c)
    }

    #[test]
    fn cancel_during_pass_discards_partial_output() {
        let token = MID_PASS_TOKEN.get_or_init(CancelToken::new);
        let src = gradient(3, 200);
        let exec = FilterExecutor::new(1, 1).unwrap();
        let result = exec.run_descriptor(
            &src,
            "invert-then-cancel",
            FilterDescriptor::Pixel(invert_then_cancel),
            Some(token),
        );
        // The token is raised inside the first block, so later blocks stop.
        assert!(token.is_cancelled());
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[test]
    fn cancel_from_another_thread_never_yields_partial_buffer() {
        let src = gradient(64, 2048);
        let exec = FilterExecutor::new(1, 1).unwrap();
        let expected = exec.apply(&src, Filter::Sepia).unwrap();
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(1));
            remote.cancel();
        });
        let result = exec.apply_cancellable(&src, Filter::Sepia, &token);
        canceller.join().unwrap();
        match result {
            Ok(out) => assert_eq!(out, expected),
            Err(e) => assert!(matches!(e, EngineError::Cancelled)),
        }
    }

    #[test]
    fn oversized_rows_per_chunk_runs_as_one_block() {
        let config = EngineConfig::from_json(r#"{ "rows_per_chunk": 18446744073709551615 }"#).unwrap();
        let exec = FilterExecutor::from_config(&config).unwrap();
        let src = gradient(4, 4);
        let out = exec.apply(&src, Filter::Invert).unwrap();
        assert_eq!(out, FilterExecutor::new(1, 1).unwrap().apply(&src, Filter::Invert).unwrap());

        let exec = FilterExecutor::new(2, usize::MAX).unwrap();
        assert_eq!(exec.apply(&src, Filter::Invert).unwrap(), out);
    }

    #[test]
    fn uncancelled_token_completes() {
        let src = gradient(10, 10);
        let exec = FilterExecutor::new(2, 4).unwrap();
        let a = exec.apply_cancellable(&src, Filter::BlueDim, &CancelToken::new()).unwrap();
        let b = exec.apply(&src, Filter::BlueDim).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_area_buffer_is_total() {
        let src = PixelBuffer::new(0, 5);
        let out = FilterExecutor::default().apply(&src, Filter::ContrastLow).unwrap();
        assert_eq!(out.dimensions(), (0, 5));
    }

    #[test]
    fn missing_source_is_null_image() {
        assert!(matches!(apply_to(None, Filter::Invert), Err(EngineError::NullImage)));
    }

    #[test]
    fn zero_rows_per_chunk_is_rejected() {
        assert!(matches!(FilterExecutor::new(1, 0), Err(EngineError::Config(_))));
    }

    #[test]
    fn apply_filter_by_name() {
        let src = PixelBuffer::new_filled(2, 2, Rgb([3, 3, 3]));
        let out = apply_filter(&src, "brightness-low").unwrap();
        assert!(out.pixels().all(|p| p == Rgb([0, 0, 0])));
        assert!(matches!(apply_filter(&src, "emboss"), Err(EngineError::UnknownFilter(_))));
    }
}
