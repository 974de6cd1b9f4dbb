//! Append-only delta log held by the authority.

use skirmish_core::Delta;

/// Ordered record of every committed delta; the index of a delta is its position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeltaLog {
    deltas: Vec<Delta>,
}

impl DeltaLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed deltas, which is also the index of the next one.
    #[must_use]
    pub fn head(&self) -> u32 {
        u32::try_from(self.deltas.len()).unwrap_or(u32::MAX)
    }

    /// Appends a committed batch and returns the head before the append.
    pub fn append(&mut self, batch: impl IntoIterator<Item = Delta>) -> u32 {
        let previous_head = self.head();
        self.deltas.extend(batch);
        previous_head
    }

    /// Delta committed at `index`.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&Delta> {
        self.deltas.get(usize::try_from(index).ok()?)
    }

    /// Contiguous suffix starting at `since`, truncated to `limit` deltas.
    #[must_use]
    pub fn since(&self, since: u32, limit: u32) -> &[Delta] {
        let start = usize::try_from(since)
            .unwrap_or(usize::MAX)
            .min(self.deltas.len());
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let end = start.saturating_add(limit).min(self.deltas.len());
        &self.deltas[start..end]
    }

    /// Every committed delta in order.
    #[must_use]
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }
}
