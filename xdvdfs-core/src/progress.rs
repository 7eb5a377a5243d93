//! Progress reporting contract.
//!
//! Mirrors the teacher crate's `ProgressVisitor` pattern (see
//! `xdvdfs-core::write::img::ProgressVisitor` upstream): the core emits
//! structured events through a trait object, and never assumes a
//! terminal, a GUI, or any particular rendering exists on the other end.

/// A single progress update emitted by the trimmer or verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub status_text: &'static str,
    pub bytes_processed: u64,
    pub total_bytes: u64,
}

/// Receives [`ProgressEvent`]s. The core holds `&mut dyn ProgressSink`
/// for the duration of a single trim or verify call.
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

/// A sink that discards every event, for callers that don't care.
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn report(&mut self, _event: ProgressEvent) {}
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}
