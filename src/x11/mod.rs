//! X11 adapter — selection retrieval over an `x11rb` connection.
//!
//! [`X11Clipboard`] owns the display connection and the protocol atoms,
//! interned once at connect time. Each read creates a fresh proxy window,
//! wraps it in an [`X11Port`] and hands it to the selection driver.

mod wait;
mod window;

use std::time::{Duration, Instant};

use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConnectionExt, GetPropertyReply, GetPropertyType, Property, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::selection::{
    Contents, PropertyReply, PropertyState, ProtocolAtoms, Retriever, SelectionError,
    SelectionEvent, SelectionPort,
};

use window::ProxyWindow;

/// Property the owner is asked to deposit data into.
const PROXY_PROPERTY: &str = "CLIPFETCH_OUT";

/// X11 selection reader.
pub struct X11Clipboard {
    conn: RustConnection,
    root: Window,
    atoms: ProtocolAtoms,
    utf8_string: Atom,
    timeout: Option<Duration>,
}

impl X11Clipboard {
    /// Connect to `display` (or `$DISPLAY`) and intern the protocol atoms.
    pub fn connect(display: Option<&str>) -> Result<Self, SelectionError> {
        let (conn, screen_num) = RustConnection::connect(display)
            .map_err(|e| SelectionError::X11(format!("connect failed: {e}")))?;

        let root = conn.setup().roots[screen_num].root;

        let interned = intern_all(&conn, &[PROXY_PROPERTY, "INCR", "UTF8_STRING"])?;
        let atoms = ProtocolAtoms {
            property: interned[0],
            incr: interned[1],
        };

        tracing::debug!(
            screen = screen_num,
            property = atoms.property,
            incr = atoms.incr,
            "connected to X11 display"
        );

        Ok(Self {
            conn,
            root,
            atoms,
            utf8_string: interned[2],
            timeout: None,
        })
    }

    /// Bound every event wait of a read by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `selection` as UTF-8 text, falling back to `STRING`.
    pub fn read(&self, selection: &str) -> Result<Contents, SelectionError> {
        let selection = intern(&self.conn, selection)?;
        let targets = [self.utf8_string, AtomEnum::STRING.into()];
        self.retrieve(selection, &targets)
    }

    /// Read `selection`, trying `targets` in order.
    pub fn read_with_targets(
        &self,
        selection: &str,
        targets: &[String],
    ) -> Result<Contents, SelectionError> {
        let selection = intern(&self.conn, selection)?;
        let names: Vec<&str> = targets.iter().map(String::as_str).collect();
        let targets = intern_all(&self.conn, &names)?;
        self.retrieve(selection, &targets)
    }

    /// Name of `atom`, for reporting the returned type.
    pub fn atom_name(&self, atom: Atom) -> Result<String, SelectionError> {
        atom_name(&self.conn, atom)
    }

    fn retrieve(&self, selection: Atom, targets: &[Atom]) -> Result<Contents, SelectionError> {
        let window = ProxyWindow::create(&self.conn, self.root)?;
        let port = X11Port {
            conn: &self.conn,
            window,
            atoms: self.atoms,
            deadline: self.timeout.map(|t| Instant::now() + t),
        };
        Retriever::new(port).retrieve(selection, targets)
    }
}

/// [`SelectionPort`] over a live connection and proxy window.
struct X11Port<'a> {
    conn: &'a RustConnection,
    window: ProxyWindow<'a>,
    atoms: ProtocolAtoms,
    deadline: Option<Instant>,
}

impl X11Port<'_> {
    fn get_property(&self, long_length: u32) -> Result<PropertyReply, SelectionError> {
        let reply = self
            .conn
            .get_property(
                false,
                self.window.id(),
                self.atoms.property,
                GetPropertyType::ANY,
                0,
                long_length,
            )
            .map_err(|e| SelectionError::X11(format!("get_property: {e}")))?
            .reply()
            .map_err(|e| SelectionError::X11(format!("get_property reply: {e}")))?;
        Ok(property_reply(reply))
    }

    fn translate(&self, event: Event) -> Result<SelectionEvent, SelectionError> {
        let window = self.window.id();
        match event {
            Event::SelectionNotify(e) if e.requestor == window => {
                Ok(SelectionEvent::SelectionNotify {
                    property: (e.property != x11rb::NONE).then_some(e.property),
                })
            }
            Event::PropertyNotify(e) if e.window == window => {
                let state = if e.state == Property::NEW_VALUE {
                    PropertyState::NewValue
                } else {
                    PropertyState::Deleted
                };
                Ok(SelectionEvent::PropertyNotify {
                    atom: e.atom,
                    state,
                })
            }
            Event::Error(e) => Err(SelectionError::X11(format!("X error: {e:?}"))),
            other => {
                tracing::trace!(event = ?other, "ignoring unrelated event");
                Ok(SelectionEvent::Other)
            }
        }
    }
}

impl SelectionPort for X11Port<'_> {
    fn atoms(&self) -> ProtocolAtoms {
        self.atoms
    }

    fn convert_selection(&mut self, selection: Atom, target: Atom) -> Result<(), SelectionError> {
        self.conn
            .convert_selection(
                self.window.id(),
                selection,
                target,
                self.atoms.property,
                x11rb::CURRENT_TIME,
            )
            .map_err(|e| SelectionError::X11(format!("convert_selection: {e}")))?;
        Ok(())
    }

    fn probe_property(&mut self) -> Result<PropertyReply, SelectionError> {
        self.get_property(0)
    }

    fn fetch_property(&mut self, size: u32) -> Result<PropertyReply, SelectionError> {
        // GetProperty counts in 32-bit units.
        self.get_property(size.div_ceil(4))
    }

    fn delete_property(&mut self) -> Result<(), SelectionError> {
        self.conn
            .delete_property(self.window.id(), self.atoms.property)
            .map_err(|e| SelectionError::X11(format!("delete_property: {e}")))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SelectionError> {
        self.conn
            .flush()
            .map_err(|e| SelectionError::X11(format!("flush: {e}")))
    }

    fn wait_for_event(&mut self) -> Result<SelectionEvent, SelectionError> {
        // Outstanding requests must reach the server before we block.
        self.flush()?;
        let event = wait::next_event(self.conn, self.deadline)?;
        self.translate(event)
    }

    fn atom_name(&mut self, atom: Atom) -> Result<String, SelectionError> {
        atom_name(self.conn, atom)
    }
}

fn property_reply(reply: GetPropertyReply) -> PropertyReply {
    PropertyReply {
        type_: reply.type_,
        format: reply.format,
        items: reply.value_len,
        bytes_after: reply.bytes_after,
        value: reply.value,
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom, SelectionError> {
    Ok(intern_all(conn, &[name])?[0])
}

/// Intern several atoms with a single round-trip.
fn intern_all(conn: &RustConnection, names: &[&str]) -> Result<Vec<Atom>, SelectionError> {
    let cookies = names
        .iter()
        .map(|name| {
            conn.intern_atom(false, name.as_bytes())
                .map_err(|e| SelectionError::X11(format!("intern_atom {name}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    cookies
        .into_iter()
        .zip(names)
        .map(|(cookie, name)| {
            cookie
                .reply()
                .map(|reply| reply.atom)
                .map_err(|e| SelectionError::X11(format!("intern_atom {name} reply: {e}")))
        })
        .collect()
}

fn atom_name(conn: &RustConnection, atom: Atom) -> Result<String, SelectionError> {
    let reply = conn
        .get_atom_name(atom)
        .map_err(|e| SelectionError::X11(format!("get_atom_name: {e}")))?
        .reply()
        .map_err(|e| SelectionError::X11(format!("get_atom_name reply: {e}")))?;
    Ok(String::from_utf8_lossy(&reply.name).into_owned())
}
