//! Proxy window — the requestor identity for one retrieval.
//!
//! A 1×1 unmapped window that receives SelectionNotify and PropertyNotify
//! events. Destroyed on drop, so every exit path of a retrieval releases
//! it.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt, CreateWindowAux, EventMask, Window, WindowClass};
use x11rb::rust_connection::RustConnection;

use crate::selection::SelectionError;

pub struct ProxyWindow<'a> {
    conn: &'a RustConnection,
    id: Window,
}

impl<'a> ProxyWindow<'a> {
    /// Create the window under `root`, selecting property-change events.
    pub fn create(conn: &'a RustConnection, root: Window) -> Result<Self, SelectionError> {
        let id = conn
            .generate_id()
            .map_err(|e| SelectionError::X11(format!("generate_id: {e}")))?;

        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )
        .map_err(|e| SelectionError::X11(format!("create_window: {e}")))?;

        tracing::debug!(window = id, "proxy window created");
        Ok(Self { conn, id })
    }

    pub fn id(&self) -> Window {
        self.id
    }
}

impl Drop for ProxyWindow<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.destroy_window(self.id) {
            tracing::debug!(window = self.id, error = %e, "destroy_window failed");
        }
        if let Err(e) = self.conn.flush() {
            tracing::debug!(error = %e, "flush after destroy_window failed");
        }
    }
}
