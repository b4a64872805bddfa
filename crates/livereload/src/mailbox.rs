//! Single-slot hand-off between the watcher thread and the render thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;

/// Raw bytes of the tracked sources, captured after a quiet debounce
/// window. The watcher never parses or validates; interpreting the bytes
/// is the consumer's job.
#[derive(Debug, Clone)]
pub struct PendingChange {
    /// File contents keyed by logical file id (the tracked name, not the
    /// absolute path).
    pub sources: HashMap<String, Vec<u8>>,
    pub detected_at: Instant,
}

impl PendingChange {
    /// A change carrying no captured bytes; consumers fall back to reading
    /// the files from disk.
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
            detected_at: Instant::now(),
        }
    }
}

/// Latest-wins mailbox holding at most one [`PendingChange`].
///
/// Posting overwrites an unconsumed predecessor: only the most recent
/// file state matters, intermediate states are worthless. Clones share
/// the slot.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    slot: Arc<Mutex<Option<PendingChange>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingChange>> {
        // A poisoned slot still holds a coherent Option.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Posts a change, replacing whatever was waiting.
    pub fn post(&self, change: PendingChange) {
        let mut slot = self.lock();
        if slot.is_some() {
            debug!("replacing unconsumed pending change");
        }
        *slot = Some(change);
    }

    /// Non-blocking check-and-take.
    pub fn take(&self) -> Option<PendingChange> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change_with(id: &str, bytes: &[u8]) -> PendingChange {
        let mut sources = HashMap::new();
        sources.insert(id.to_string(), bytes.to_vec());
        PendingChange {
            sources,
            detected_at: Instant::now(),
        }
    }

    #[test]
    fn take_empties_the_slot() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());
        mailbox.post(change_with("shader.frag", b"v1"));
        assert!(!mailbox.is_empty());
        assert!(mailbox.take().is_some());
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn later_post_replaces_earlier() {
        let mailbox = Mailbox::new();
        mailbox.post(change_with("shader.frag", b"v1"));
        mailbox.post(change_with("shader.frag", b"v2"));
        let change = mailbox.take().unwrap();
        assert_eq!(change.sources["shader.frag"], b"v2");
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn clones_share_the_slot() {
        let a = Mailbox::new();
        let b = a.clone();
        a.post(change_with("shader.vert", b"x"));
        assert!(b.take().is_some());
        assert!(a.is_empty());
    }
}
