use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// monotonically increasing request number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// issues tickets; the first ticket is 1
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// most recently issued ticket number, 0 before the first issue
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest()
    }
}

/// holds the result of the most recent request only.
///
/// Every request takes a ticket when it is issued. Its result is applied
/// only if no newer ticket has been issued since; slower answers to
/// superseded requests are dropped, not aborted.
#[derive(Debug)]
pub struct LatestSlot<T> {
    sequencer: RequestSequencer,
    current: Mutex<Option<(RequestTicket, T)>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            current: Mutex::new(None),
        }
    }
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        self.sequencer.issue()
    }

    pub fn latest(&self) -> u64 {
        self.sequencer.latest()
    }

    /// store `value` if `ticket` is still the latest issued; false when stale
    pub fn apply(&self, ticket: RequestTicket, value: T) -> bool {
        let mut current = self.current.lock();
        let latest = self.sequencer.latest();
        if ticket.0 != latest {
            tracing::debug!(ticket = ticket.0, latest, "discarding stale result");
            return false;
        }
        *current = Some((ticket, value));
        true
    }

    pub fn get(&self) -> Option<T> {
        self.current.lock().as_ref().map(|(_, value)| value.clone())
    }

    /// ticket of the value currently held
    pub fn applied_ticket(&self) -> Option<RequestTicket> {
        self.current.lock().as_ref().map(|(ticket, _)| *ticket)
    }
}
