use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::AggregateId;

use super::ProjectionError;

/// Per-stream sequence cursors for idempotent event application.
///
/// A projection applies an envelope only when its sequence number is exactly
/// one past the stream's cursor. Anything at or below the cursor is a
/// redelivery and is skipped.
#[derive(Debug, Default)]
pub struct StreamCursors {
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => cursors.get(&aggregate_id).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Whether `seq` should be applied for this stream.
    ///
    /// `Ok(false)` for redeliveries; an error for gaps or a zero sequence.
    pub fn should_apply(&self, aggregate_id: AggregateId, seq: u64) -> Result<bool, ProjectionError> {
        let last = self.get(aggregate_id);
        if seq == 0 || seq > last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(seq == last + 1)
    }

    pub fn advance(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_next_skips_seen_rejects_gaps() {
        let cursors = StreamCursors::new();
        let id = AggregateId::new();

        assert!(cursors.should_apply(id, 1).unwrap());
        cursors.advance(id, 1);

        assert!(!cursors.should_apply(id, 1).unwrap());
        assert!(cursors.should_apply(id, 2).unwrap());
        assert!(matches!(
            cursors.should_apply(id, 4),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 4 })
        ));
        assert!(cursors.should_apply(id, 0).is_err());
    }
}
