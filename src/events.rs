use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::decimal::Money;
use crate::types::{AcademicPeriod, StudentId};

/// everything the engine records for audit and reminder collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // fee structure events
    FeeStructureResolved {
        class_name: String,
        period: Option<AcademicPeriod>,
        item_count: usize,
        total: Money,
        from_cache: bool,
        timestamp: DateTime<Utc>,
    },
    AdmissionGateApplied {
        student_id: StudentId,
        requested: AcademicPeriod,
        admitted: AcademicPeriod,
        timestamp: DateTime<Utc>,
    },
    StoreDegraded {
        endpoint: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentsAggregated {
        student_id: StudentId,
        period: Option<AcademicPeriod>,
        record_count: usize,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentSubmitted {
        student_id: StudentId,
        amount: Money,
        billing_type: String,
        reference: String,
        timestamp: DateTime<Utc>,
    },

    // balance events
    BalanceComputed {
        student_id: StudentId,
        period: Option<AcademicPeriod>,
        total_required: Money,
        total_paid: Money,
        balance: Money,
        timestamp: DateTime<Utc>,
    },
    StaleResultDiscarded {
        ticket: u64,
        latest: u64,
        timestamp: DateTime<Utc>,
    },

    // cache events
    CacheInvalidated {
        cache: String,
        key: String,
        timestamp: DateTime<Utc>,
    },
}

/// bounded event buffer; once full, each new event evicts the oldest.
///
/// A capacity of zero keeps nothing, which turns recording off.
#[derive(Debug)]
pub struct EventStore {
    events: VecDeque<Event>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity,
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: Event) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// held events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// events evicted or refused since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn discarded(ticket: u64) -> Event {
        Event::StaleResultDiscarded {
            ticket,
            latest: ticket + 1,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
        }
    }

    fn tickets(store: &EventStore) -> Vec<u64> {
        store
            .events()
            .filter_map(|e| match e {
                Event::StaleResultDiscarded { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_oldest_events_are_evicted() {
        let mut store = EventStore::with_capacity(3);
        for ticket in 1..=5 {
            store.emit(discarded(ticket));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(tickets(&store), vec![3, 4, 5]);
        assert_eq!(store.dropped(), 2);
    }

    #[test]
    fn test_take_events_empties_the_buffer() {
        let mut store = EventStore::new();
        store.emit(discarded(1));
        store.emit(discarded(2));

        assert_eq!(store.take_events().len(), 2);
        assert!(store.is_empty());
        assert_eq!(store.dropped(), 0);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut store = EventStore::with_capacity(0);
        store.emit(discarded(1));

        assert!(store.is_empty());
        assert_eq!(store.dropped(), 1);
    }
}
