//! Scripted selection owner for protocol tests.
//!
//! `FakePort` plays both the X server and the owning client: it records
//! every request the state machine makes and answers with the events and
//! property contents a well-behaved ICCCM owner would produce.

use std::collections::{HashMap, VecDeque};

use x11rb::protocol::xproto::Atom;

use super::{
    PropertyReply, PropertyState, ProtocolAtoms, SelectionError, SelectionEvent, SelectionPort,
};

pub const STRING: Atom = 31;
pub const CLIPBOARD: Atom = 250;
pub const PROPERTY: Atom = 300;
pub const INCR: Atom = 301;
pub const UTF8_STRING: Atom = 302;

/// One recorded port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Convert { selection: Atom, target: Atom },
    Probe,
    Fetch(u32),
    Delete,
    Flush,
    Wait,
}

/// Property contents as the owner stores them.
#[derive(Debug, Clone)]
pub struct Stored {
    type_: Atom,
    format: u8,
    data: Vec<u8>,
}

/// How the owner answers a conversion to a given target.
#[derive(Debug, Clone)]
pub enum OwnerReply {
    Refuse,
    /// Never answers the conversion.
    Silent,
    Direct(Stored),
    Incr {
        type_: Atom,
        format: u8,
        chunks: Vec<Vec<u8>>,
    },
}

impl OwnerReply {
    pub fn direct(type_: Atom, format: u8, data: &[u8]) -> Self {
        OwnerReply::Direct(Stored {
            type_,
            format,
            data: data.to_vec(),
        })
    }

    pub fn incr(type_: Atom, chunks: Vec<Vec<u8>>) -> Self {
        OwnerReply::Incr {
            type_,
            format: 8,
            chunks,
        }
    }
}

pub struct FakePort {
    pub calls: Vec<Call>,
    /// Return one byte less than the property holds on fetch.
    pub short_fetch: bool,
    responses: HashMap<Atom, OwnerReply>,
    property: Option<Stored>,
    pending: VecDeque<Stored>,
    events: VecDeque<SelectionEvent>,
}

impl FakePort {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            short_fetch: false,
            responses: HashMap::new(),
            property: None,
            pending: VecDeque::new(),
            events: VecDeque::new(),
        }
    }

    /// Configure the owner's answer for `target`. Unconfigured targets are
    /// refused.
    pub fn respond(&mut self, target: Atom, reply: OwnerReply) {
        self.responses.insert(target, reply);
    }

    /// Queue an event ahead of whatever the owner produces.
    pub fn push_event(&mut self, event: SelectionEvent) {
        self.events.push_back(event);
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn fetches(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Fetch(size) => Some(*size),
                _ => None,
            })
            .collect()
    }

    fn store(&mut self, stored: Stored) {
        self.property = Some(stored);
        self.events.push_back(SelectionEvent::PropertyNotify {
            atom: PROPERTY,
            state: PropertyState::NewValue,
        });
    }
}

impl SelectionPort for FakePort {
    fn atoms(&self) -> ProtocolAtoms {
        ProtocolAtoms {
            property: PROPERTY,
            incr: INCR,
        }
    }

    fn convert_selection(&mut self, selection: Atom, target: Atom) -> Result<(), SelectionError> {
        self.calls.push(Call::Convert { selection, target });

        let reply = self
            .responses
            .get(&target)
            .cloned()
            .unwrap_or(OwnerReply::Refuse);

        let property = match reply {
            OwnerReply::Silent => return Ok(()),
            OwnerReply::Refuse => None,
            OwnerReply::Direct(stored) => {
                self.property = Some(stored);
                Some(PROPERTY)
            }
            OwnerReply::Incr {
                type_,
                format,
                chunks,
            } => {
                let total: usize = chunks.iter().map(Vec::len).sum();
                self.property = Some(Stored {
                    type_: INCR,
                    format: 32,
                    data: (total as u32).to_ne_bytes().to_vec(),
                });
                self.pending = chunks
                    .into_iter()
                    .chain(std::iter::once(Vec::new()))
                    .map(|data| Stored {
                        type_,
                        format,
                        data,
                    })
                    .collect();
                Some(PROPERTY)
            }
        };

        self.events
            .push_back(SelectionEvent::SelectionNotify { property });
        Ok(())
    }

    fn probe_property(&mut self) -> Result<PropertyReply, SelectionError> {
        self.calls.push(Call::Probe);
        Ok(match &self.property {
            Some(stored) => PropertyReply {
                type_: stored.type_,
                format: stored.format,
                items: 0,
                bytes_after: stored.data.len() as u32,
                value: Vec::new(),
            },
            None => PropertyReply::default(),
        })
    }

    fn fetch_property(&mut self, size: u32) -> Result<PropertyReply, SelectionError> {
        self.calls.push(Call::Fetch(size));
        let Some(stored) = &self.property else {
            return Ok(PropertyReply::default());
        };

        let len = (size as usize).min(stored.data.len());
        let mut value = stored.data[..len].to_vec();
        let items = match stored.format {
            8 | 16 | 32 => value.len() / usize::from(stored.format / 8),
            _ => value.len(),
        };
        if self.short_fetch {
            value.pop();
        }

        Ok(PropertyReply {
            type_: stored.type_,
            format: stored.format,
            items: items as u32,
            bytes_after: (stored.data.len() - len) as u32,
            value,
        })
    }

    fn delete_property(&mut self) -> Result<(), SelectionError> {
        self.calls.push(Call::Delete);
        if self.property.take().is_some() {
            self.events.push_back(SelectionEvent::PropertyNotify {
                atom: PROPERTY,
                state: PropertyState::Deleted,
            });
            if let Some(next) = self.pending.pop_front() {
                self.store(next);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SelectionError> {
        self.calls.push(Call::Flush);
        Ok(())
    }

    fn wait_for_event(&mut self) -> Result<SelectionEvent, SelectionError> {
        self.calls.push(Call::Wait);
        // An empty queue would block forever against a real server.
        self.events.pop_front().ok_or(SelectionError::Timeout)
    }

    fn atom_name(&mut self, atom: Atom) -> Result<String, SelectionError> {
        Ok(match atom {
            STRING => "STRING".into(),
            CLIPBOARD => "CLIPBOARD".into(),
            PROPERTY => "CLIPFETCH_OUT".into(),
            INCR => "INCR".into(),
            UTF8_STRING => "UTF8_STRING".into(),
            other => format!("ATOM_{other}"),
        })
    }
}
