//! Transfer state machine — one protocol step per event.
//!
//! `advance()` is called once per event by the driver until it returns
//! [`Step::Complete`] or [`Step::BadTarget`]. It never blocks; all waiting
//! happens in the driver.
//!
//! Every property read is two round-trips: a zero-length probe to learn
//! type and size, then a fetch of exactly that size. Deleting the proxy
//! property after each read tells the owner the data was consumed.

use std::mem::size_of;
use std::os::raw::c_ulong;

use x11rb::protocol::xproto::Atom;

use super::context::{Phase, TransferContext};
use super::{PropertyReply, PropertyState, SelectionError, SelectionEvent, SelectionPort};

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More events are needed.
    Continue,
    /// The buffer holds the full selection contents.
    Complete,
    /// The owner refused the requested target.
    BadTarget,
}

/// One retrieval attempt: which selection, converted to which target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub selection: Atom,
    pub target: Atom,
}

/// Client-side size of one item of the given format.
///
/// Format-32 items are widened to the platform `long`, the layout Xlib
/// clients hand out. Returns `None` for formats the protocol does not
/// define.
pub fn item_size(format: u8) -> Option<usize> {
    match format {
        8 => Some(size_of::<u8>()),
        16 => Some(size_of::<u16>()),
        32 => Some(size_of::<c_ulong>()),
        _ => None,
    }
}

/// Advance the transfer by one step.
///
/// `event` is `None` only for the self-triggered step out of `Idle`.
/// Events that do not concern the current phase leave the context
/// untouched and yield [`Step::Continue`].
pub fn advance<P: SelectionPort>(
    port: &mut P,
    event: Option<&SelectionEvent>,
    request: &Request,
    ctx: &mut TransferContext,
) -> Result<Step, SelectionError> {
    match ctx.phase() {
        Phase::Idle => {
            ctx.clear_buffer();
            port.convert_selection(request.selection, request.target)?;
            ctx.set_phase(Phase::AwaitingNotify);
            tracing::debug!(
                selection = request.selection,
                requested = request.target,
                "ConvertSelection sent"
            );
            Ok(Step::Continue)
        }
        Phase::AwaitingNotify => {
            let property = match event {
                Some(SelectionEvent::SelectionNotify { property }) => *property,
                _ => return Ok(Step::Continue),
            };

            if property.is_none() {
                tracing::debug!(requested = request.target, "owner refused conversion");
                ctx.set_phase(Phase::BadTarget);
                return Ok(Step::BadTarget);
            }

            let probe = port.probe_property()?;
            ctx.set_data_type(probe.type_);

            if probe.type_ == port.atoms().incr {
                // Deleting the INCR marker starts the chunk stream.
                port.delete_property()?;
                port.flush()?;
                ctx.set_phase(Phase::Incremental);
                tracing::debug!("INCR transfer started");
                return Ok(Step::Continue);
            }

            let reply = port.fetch_property(probe.bytes_after)?;
            port.delete_property()?;

            let size = chunk_size(&reply)?;
            ctx.clear_buffer();
            ctx.reserve(size)?;
            append_items(ctx.buffer_mut(), &reply)?;
            ctx.set_data_type(reply.type_);
            ctx.set_phase(Phase::Idle);

            tracing::debug!(
                bytes = ctx.len(),
                format = reply.format,
                "selection received directly"
            );
            Ok(Step::Complete)
        }
        Phase::Incremental => {
            let watched = port.atoms().property;
            match event {
                Some(SelectionEvent::PropertyNotify {
                    atom,
                    state: PropertyState::NewValue,
                }) if *atom == watched => {}
                _ => return Ok(Step::Continue),
            }

            let probe = port.probe_property()?;

            if probe.bytes_after == 0 {
                if probe.type_ != x11rb::NONE {
                    ctx.set_data_type(probe.type_);
                }
                port.delete_property()?;
                ctx.set_phase(Phase::Idle);
                tracing::debug!(bytes = ctx.len(), "INCR transfer finished");
                return Ok(Step::Complete);
            }

            let reply = port.fetch_property(probe.bytes_after)?;
            let size = chunk_size(&reply)?;
            ctx.reserve(size)?;
            append_items(ctx.buffer_mut(), &reply)?;
            ctx.set_data_type(reply.type_);

            port.delete_property()?;
            port.flush()?;

            tracing::debug!(chunk = size, total = ctx.len(), "INCR chunk received");
            Ok(Step::Continue)
        }
        Phase::BadTarget => Ok(Step::BadTarget),
    }
}

/// Client-side byte length of a fetched property: `items * item_size`.
fn chunk_size(reply: &PropertyReply) -> Result<usize, SelectionError> {
    let item = item_size(reply.format).ok_or_else(|| {
        SelectionError::ProtocolViolation(format!("unsupported property format {}", reply.format))
    })?;
    (reply.items as usize).checked_mul(item).ok_or_else(|| {
        SelectionError::ProtocolViolation(format!("{} items overflow buffer size", reply.items))
    })
}

/// Append the client-side bytes decoded from `reply` to `buffer`.
///
/// 8- and 16-bit items are copied as delivered; 32-bit items are widened
/// to `c_ulong` in native byte order.
fn append_items(buffer: &mut Vec<u8>, reply: &PropertyReply) -> Result<(), SelectionError> {
    let items = reply.items as usize;
    let wire_len = items * usize::from(reply.format / 8);
    let wire = reply.value.get(..wire_len).ok_or_else(|| {
        SelectionError::ProtocolViolation(format!(
            "property holds {} bytes, {wire_len} declared",
            reply.value.len()
        ))
    })?;

    if reply.format == 32 {
        for item in wire.chunks_exact(4) {
            let value = u32::from_ne_bytes([item[0], item[1], item[2], item[3]]);
            buffer.extend_from_slice(&c_ulong::from(value).to_ne_bytes());
        }
    } else {
        buffer.extend_from_slice(wire);
    }
    Ok(())
}
