use crate::canvas::PixelBuffer;
use crate::error::{EngineError, Result};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// A full copy of the image taken after a destructive edit.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub description: String,
    pub pixels: PixelBuffer,
}

impl Snapshot {
    pub fn memory_size(&self) -> usize {
        self.pixels.memory_bytes() + self.description.len()
    }
}

// ============================================================================
// HISTORY STACK - counter-driven revert
// ============================================================================

/// Linear stack of image snapshots with a counter-driven revert.
///
/// Revert rules:
///
/// * `record` pushes a snapshot and increments `pending_revert_count`.
/// * `revert` pops `pending_revert_count` snapshots (not a caller-chosen
///   number), keeps the last one popped, pushes it back on top (so the revert
///   itself can be reverted) and then resets `pending_revert_count` to the new
///   depth.
/// * If fewer than `pending_revert_count` snapshots exist, or the counter is
///   zero, `revert` fails with [`EngineError::HistoryUnderflow`] and leaves the
///   stack untouched. Callers treat that as a no-op.
#[derive(Clone, Debug, Default)]
pub struct HistoryStack {
    snapshots: Vec<Snapshot>,
    pending_revert_count: usize,
    /// Running byte total across all snapshots.
    total_memory: usize,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot after a completed destructive edit.
    pub fn record(&mut self, buffer: PixelBuffer) {
        self.record_with("Edit", buffer);
    }

    /// Record a snapshot with a human-readable description.
    pub fn record_with(&mut self, description: impl Into<String>, buffer: PixelBuffer) {
        let snapshot = Snapshot { description: description.into(), pixels: buffer };
        self.total_memory += snapshot.memory_size();
        self.snapshots.push(snapshot);
        self.pending_revert_count += 1;
    }

    /// Revert by `pending_revert_count` steps and return the restored image.
    pub fn revert(&mut self) -> Result<PixelBuffer> {
        let depth = self.snapshots.len();
        let pending = self.pending_revert_count;
        if pending == 0 || depth < pending {
            return Err(EngineError::HistoryUnderflow { depth, pending });
        }

        // Everything above the target is discarded; only the deepest popped
        // entry survives.
        let mut restored = None;
        for _ in 0..pending {
            if let Some(snapshot) = self.snapshots.pop() {
                self.total_memory = self.total_memory.saturating_sub(snapshot.memory_size());
                restored = Some(snapshot);
            }
        }
        let restored = restored.ok_or(EngineError::HistoryUnderflow { depth, pending })?;

        let pixels = restored.pixels.clone();
        self.record_with(format!("Revert to {}", restored.description), restored.pixels);
        self.pending_revert_count = self.snapshots.len();
        Ok(pixels)
    }

    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn pending_revert_count(&self) -> usize {
        self.pending_revert_count
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Whether `revert` would currently succeed.
    pub fn can_revert(&self) -> bool {
        self.pending_revert_count > 0 && self.snapshots.len() >= self.pending_revert_count
    }

    /// Most recent snapshot.
    pub fn top(&self) -> Option<&PixelBuffer> {
        self.snapshots.last().map(|s| &s.pixels)
    }

    /// All descriptions, most recent first.
    pub fn descriptions(&self) -> Vec<String> {
        self.snapshots.iter().rev().map(|s| s.description.clone()).collect()
    }

    /// Current memory usage of the history (O(1) via cached total).
    pub fn memory_bytes(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.pending_revert_count = 0;
        self.total_memory = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(v: u8) -> PixelBuffer {
        PixelBuffer::new_filled(2, 2, Rgb([v, v, v]))
    }

    #[test]
    fn record_increments_depth_and_counter() {
        let mut h = HistoryStack::new();
        h.record(solid(0));
        h.record(solid(1));
        assert_eq!(h.depth(), 2);
        assert_eq!(h.pending_revert_count(), 2);
        assert_eq!(h.top(), Some(&solid(1)));
    }

    #[test]
    fn revert_restores_first_snapshot_and_repushes_it() {
        let mut h = HistoryStack::new();
        h.record(solid(0));
        h.record(solid(1));

        let restored = h.revert().unwrap();
        assert_eq!(restored, solid(0));
        assert_eq!(h.depth(), 1);
        assert_eq!(h.top(), Some(&solid(0)));
        assert_eq!(h.pending_revert_count(), 1);
    }

    #[test]
    fn counter_not_depth_decides_how_far_back() {
        let mut h = HistoryStack::new();
        h.record(solid(0));
        h.record(solid(1));
        h.revert().unwrap(); // stack: [0], counter 1
        h.record(solid(2)); // stack: [0, 2], counter 2
        h.record(solid(3)); // stack: [0, 2, 3], counter 3

        let restored = h.revert().unwrap();
        assert_eq!(restored, solid(0));
        assert_eq!(h.depth(), 1);
        assert_eq!(h.pending_revert_count(), 1);
    }

    #[test]
    fn second_revert_reapplies_the_repushed_state() {
        let mut h = HistoryStack::new();
        h.record(solid(0));
        h.record(solid(1));
        h.revert().unwrap();
        let again = h.revert().unwrap();
        assert_eq!(again, solid(0));
        assert_eq!(h.depth(), 1);
        assert_eq!(h.pending_revert_count(), 1);
    }

    #[test]
    fn empty_history_is_a_noop() {
        let mut h = HistoryStack::new();
        assert!(!h.can_revert());
        let err = h.revert().unwrap_err();
        assert!(matches!(err, EngineError::HistoryUnderflow { depth: 0, pending: 0 }));
        assert!(h.is_empty());
    }

    #[test]
    fn descriptions_and_memory_track_entries() {
        let mut h = HistoryStack::new();
        h.record_with("Open", solid(0));
        h.record_with("Sepia", solid(1));
        assert_eq!(h.descriptions(), vec!["Sepia".to_string(), "Open".to_string()]);
        assert_eq!(h.memory_bytes(), 2 * 12 + "Open".len() + "Sepia".len());

        h.revert().unwrap();
        assert_eq!(h.descriptions(), vec!["Revert to Open".to_string()]);
        assert_eq!(h.memory_bytes(), 12 + "Revert to Open".len());

        h.clear();
        assert_eq!(h.memory_bytes(), 0);
        assert_eq!(h.pending_revert_count(), 0);
    }
}
