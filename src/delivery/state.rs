//! State shared between a delivery client and its worker thread.

use std::fmt;

use parking_lot::Mutex;

use super::buffer::ByteBudget;

/// Connection lifecycle as seen by the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; set once the client has been closed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub(super) struct Shared {
    pub(super) budget: ByteBudget,
    state: Mutex<ConnectionState>,
}

impl Shared {
    pub(super) fn new(buffer_capacity: usize) -> Self {
        Self {
            budget: ByteBudget::new(buffer_capacity),
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub(super) fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Update the state unless the client has already been closed.
    pub(super) fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != ConnectionState::Closed {
            *state = next;
        }
    }
}
