//! Transfer context — per-retrieval protocol state.
//!
//! Owned exclusively by one `Retriever::retrieve` call. Created fresh for
//! every call and dropped when it returns.

use x11rb::protocol::xproto::Atom;

use super::SelectionError;

/// Protocol phase of a retrieval attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request outstanding. The next step sends ConvertSelection.
    Idle,
    /// ConvertSelection sent, waiting for SelectionNotify.
    AwaitingNotify,
    /// INCR transfer in progress, waiting for chunk PropertyNotify events.
    Incremental,
    /// The owner refused the requested target.
    BadTarget,
}

/// Mutable state of one retrieval.
///
/// The valid byte count is the buffer length, so an empty buffer and a
/// zero length are the same condition.
#[derive(Debug)]
pub struct TransferContext {
    phase: Phase,
    data_type: Atom,
    buffer: Vec<u8>,
}

impl TransferContext {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            data_type: x11rb::NONE,
            buffer: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(super) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Type the owner responded with. `NONE` until the owner has replied.
    pub fn data_type(&self) -> Atom {
        self.data_type
    }

    pub(super) fn set_data_type(&mut self, data_type: Atom) {
        self.data_type = data_type;
    }

    /// Number of valid bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[allow(dead_code)]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop accumulated data. Called before every new request.
    pub(super) fn clear_buffer(&mut self) {
        self.buffer = Vec::new();
    }

    /// Reserve room for `additional` more bytes, reporting allocator
    /// failure instead of aborting.
    pub(super) fn reserve(&mut self, additional: usize) -> Result<(), SelectionError> {
        self.buffer
            .try_reserve(additional)
            .map_err(|_| SelectionError::AllocationFailure {
                requested: self.buffer.len().saturating_add(additional),
            })
    }

    /// Mutable access to the tail of the buffer for appending.
    pub(super) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    /// Return to `Idle` with an empty buffer and no data type.
    ///
    /// The driver calls this before retrying with a fallback target so
    /// nothing from the failed attempt survives.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.data_type = x11rb::NONE;
        self.clear_buffer();
    }

    /// Hand out the accumulated bytes, leaving the buffer empty.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}
