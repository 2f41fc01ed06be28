use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Settable, clearable interruption flag for a session's speech stream.
///
/// Clones share the same flag. The transport reader raises it on barge-in;
/// the synthesis pipeline clears it when a new stream starts and checks it
/// before forwarding every chunk.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Whether two handles point at the same flag.
    pub fn same_as(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}
