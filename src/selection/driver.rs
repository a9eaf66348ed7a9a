//! Retrieval driver — event loop and target fallback.
//!
//! Owns the port for the lifetime of the retrieval and feeds events to
//! [`machine::advance`] until it completes or every candidate target has
//! been refused.

use x11rb::protocol::xproto::Atom;

use super::context::{Phase, TransferContext};
use super::machine::{self, Request, Step};
use super::{Contents, SelectionError, SelectionPort};

/// Runs selection retrievals over a [`SelectionPort`].
pub struct Retriever<P> {
    port: P,
}

impl<P: SelectionPort> Retriever<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Release the port.
    #[allow(dead_code)]
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Retrieve `selection`, trying `candidates` in order.
    ///
    /// Each refused target resets the transfer context before the next
    /// one is requested, so data from a failed attempt never leaks into
    /// the result. An empty result is a success: the owner holds zero
    /// bytes. [`SelectionError::Unavailable`] is returned only after the
    /// last candidate has been refused.
    pub fn retrieve(
        &mut self,
        selection: Atom,
        candidates: &[Atom],
    ) -> Result<Contents, SelectionError> {
        if candidates.is_empty() {
            return Err(SelectionError::Unavailable {
                target: "(none)".into(),
            });
        }

        let mut ctx = TransferContext::new();
        let mut index = 0;

        loop {
            let request = Request {
                selection,
                target: candidates[index],
            };

            // The step out of Idle sends the request; it must not wait first.
            let event = if ctx.phase() == Phase::Idle {
                None
            } else {
                Some(self.port.wait_for_event()?)
            };

            match machine::advance(&mut self.port, event.as_ref(), &request, &mut ctx)? {
                Step::Continue => {}
                Step::Complete => break,
                Step::BadTarget => {
                    let refused = self.describe(request.target);
                    if index + 1 < candidates.len() {
                        index += 1;
                        ctx.reset();
                        tracing::warn!(
                            refused = %refused,
                            fallback = %self.describe(candidates[index]),
                            "target refused, falling back"
                        );
                        continue;
                    }
                    tracing::info!(refused = %refused, "no candidate target accepted");
                    return Err(SelectionError::Unavailable { target: refused });
                }
            }
        }

        let contents = Contents {
            bytes: ctx.take_bytes(),
            data_type: ctx.data_type(),
            target: candidates[index],
        };
        tracing::info!(
            bytes = contents.bytes.len(),
            data_type = contents.data_type,
            "selection retrieved"
        );
        Ok(contents)
    }

    /// Atom name for logs and errors; falls back to the numeric value.
    fn describe(&mut self, atom: Atom) -> String {
        self.port
            .atom_name(atom)
            .unwrap_or_else(|_| atom.to_string())
    }
}
