//! Event wait with optional deadline.
//!
//! Without a deadline this is a plain blocking `wait_for_event()`. With
//! one, the connection fd is polled via `nix::poll()` until an event is
//! queued or the deadline passes.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Instant;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::selection::SelectionError;

/// Block for the next X11 event, failing with `Timeout` once `deadline`
/// has passed.
pub fn next_event(
    conn: &RustConnection,
    deadline: Option<Instant>,
) -> Result<Event, SelectionError> {
    let Some(deadline) = deadline else {
        return conn
            .wait_for_event()
            .map_err(|e| SelectionError::X11(format!("wait_for_event: {e}")));
    };

    let raw_fd = conn.stream().as_raw_fd();

    loop {
        if let Some(event) = conn
            .poll_for_event()
            .map_err(|e| SelectionError::X11(format!("poll_for_event: {e}")))?
        {
            return Ok(event);
        }

        let now = Instant::now();
        if deadline <= now {
            return Err(SelectionError::Timeout);
        }

        // Rounds down; the extra millisecond avoids waking early.
        let millis = u16::try_from(deadline.duration_since(now).as_millis())
            .unwrap_or(u16::MAX)
            .saturating_add(1);

        // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
        let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(_) => {}
            Err(nix::Error::EINTR) => {}
            Err(e) => return Err(SelectionError::X11(format!("poll on X11 fd: {e}"))),
        }
    }
}
