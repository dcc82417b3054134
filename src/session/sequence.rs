//! Request sequencing so a late response cannot overwrite newer state.
//!
//! Every load takes a [`Ticket`] before its requests go out. A response is
//! applied only if its ticket belongs to the current identity (epoch) and is
//! not older than the last ticket applied on the same lane.

use tracing::warn;

/// Independent pieces of session data refreshed by responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Storage,
    Files,
}

impl Lane {
    fn index(self) -> usize {
        match self {
            Lane::Storage => 0,
            Lane::Files => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    epoch: u64,
    issued: u64,
    applied: [u64; 2],
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate every outstanding ticket (login, logout).
    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
        self.applied = [self.issued; 2];
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket {
            epoch: self.epoch,
            seq: self.issued,
        }
    }

    /// Whether a response carrying `ticket` may still be applied on `lane`.
    pub fn is_current(&self, ticket: Ticket, lane: Lane) -> bool {
        ticket.epoch == self.epoch && ticket.seq >= self.applied[lane.index()]
    }

    /// Check and record a ticket; stale tickets are rejected.
    pub fn accept(&mut self, ticket: Ticket, lane: Lane) -> bool {
        if !self.is_current(ticket, lane) {
            warn!(?lane, seq = ticket.seq, epoch = ticket.epoch, "dropping stale response");
            return false;
        }
        self.applied[lane.index()] = ticket.seq;
        true
    }
}
