//! Selection transfer core — requester side of the X11 selection protocol.
//!
//! Splits clipboard retrieval into three layers:
//!
//! - [`context::TransferContext`] — mutable per-retrieval state (phase,
//!   returned type, accumulated bytes).
//! - [`machine::advance`] — one protocol step per incoming event.
//! - [`driver::Retriever`] — the event-wait loop and target fallback.
//!
//! All window-system access goes through the [`SelectionPort`] trait so the
//! protocol logic never touches a live connection directly. The X11
//! implementation lives in `crate::x11`.

pub mod context;
pub mod driver;
pub mod machine;

#[cfg(test)]
pub(crate) mod testing;

use x11rb::protocol::xproto::Atom;

pub use driver::Retriever;

/// Selection retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// The owner declined every candidate target (or nobody owns the
    /// selection). Carries the name of the last target tried.
    #[error("target {target} not available")]
    Unavailable { target: String },

    /// Growing the transfer buffer failed.
    #[error("could not allocate {requested} bytes for selection data")]
    AllocationFailure { requested: usize },

    /// The owner deposited data the protocol does not allow (unknown item
    /// format, short property value).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The event-wait deadline passed before the owner responded.
    #[error("timed out waiting for the selection owner")]
    Timeout,

    /// Connection, reply, or X error from the window system.
    #[error("X11: {0}")]
    X11(String),
}

/// Window-system event as seen by the transfer state machine.
///
/// The port translates raw events into this form and filters out anything
/// not addressed to its proxy window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Reply to a ConvertSelection request. `property` is `None` when the
    /// owner refused the conversion.
    SelectionNotify { property: Option<Atom> },

    /// A property on the proxy window changed.
    PropertyNotify { atom: Atom, state: PropertyState },

    /// Anything else the wait returned.
    Other,
}

/// PropertyNotify state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyState {
    NewValue,
    Deleted,
}

/// Result of a GetProperty query on the proxy property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyReply {
    /// Declared type (`INCR`, `UTF8_STRING`, ...). `NONE` if the property
    /// does not exist.
    pub type_: Atom,
    /// Item format: 8, 16 or 32 bits. 0 if the property does not exist.
    pub format: u8,
    /// Number of items returned in `value`.
    pub items: u32,
    /// Bytes remaining past the returned range. For a zero-length probe
    /// this is the full property size.
    pub bytes_after: u32,
    /// Raw item data as delivered on the wire.
    pub value: Vec<u8>,
}

/// Atoms the protocol needs, resolved once when the port is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolAtoms {
    /// Property on the proxy window the owner writes into.
    pub property: Atom,
    /// `INCR` marker type announcing an incremental transfer.
    pub incr: Atom,
}

/// Window-system operations the selection protocol is built from.
///
/// Every call acts on the port's own proxy window and proxy property.
pub trait SelectionPort {
    /// Protocol-control atoms for this connection.
    fn atoms(&self) -> ProtocolAtoms;

    /// Ask the owner of `selection` to convert it to `target` and store the
    /// result in the proxy property.
    fn convert_selection(&mut self, selection: Atom, target: Atom) -> Result<(), SelectionError>;

    /// Zero-length GetProperty: learn type, format and size without
    /// reading or deleting the data.
    fn probe_property(&mut self) -> Result<PropertyReply, SelectionError>;

    /// GetProperty for exactly `size` bytes of the proxy property.
    fn fetch_property(&mut self, size: u32) -> Result<PropertyReply, SelectionError>;

    /// Delete the proxy property. Acknowledges the data to the owner.
    fn delete_property(&mut self) -> Result<(), SelectionError>;

    /// Flush outgoing requests.
    fn flush(&mut self) -> Result<(), SelectionError>;

    /// Block for the next event addressed to the proxy window.
    fn wait_for_event(&mut self) -> Result<SelectionEvent, SelectionError>;

    /// Resolve an atom to its name, for diagnostics.
    fn atom_name(&mut self, atom: Atom) -> Result<String, SelectionError>;
}

/// A completed retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contents {
    /// Selection data. May be empty when the owner holds zero bytes.
    pub bytes: Vec<u8>,
    /// Type the owner reported for the data.
    pub data_type: Atom,
    /// Candidate target that the owner accepted.
    pub target: Atom,
}
