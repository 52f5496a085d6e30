//! Latest-request-wins sequencing.
//!
//! Every outgoing service request takes a ticket. When a response arrives it
//! is applied only if its ticket is still the most recently issued one;
//! anything older was superseded while in flight and is discarded.

use serde::Serialize;

use crate::{PlannerError, Result};

/// Sequence number attached to one outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Issues tickets and checks whether a completion is still current.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every ticket issued before it.
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// `Ok` if the ticket is current, `Superseded` otherwise.
    pub fn check(&self, ticket: RequestTicket) -> Result<()> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(PlannerError::Superseded {
                ticket: ticket.0,
                latest: self.latest,
            })
        }
    }
}
