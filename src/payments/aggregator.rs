use std::collections::BTreeMap;

use crate::decimal::Money;
use crate::payments::synonyms::{BillingKey, BillingTypeTable};
use crate::types::{AcademicPeriod, PaymentRecord, PaymentStatus};

/// paid amounts grouped by billing category
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentAggregate {
    pub paid_by_billing_type: BTreeMap<BillingKey, Money>,
    pub total_paid: Money,
    /// records that survived the status/type/period filters
    pub record_count: usize,
}

impl PaymentAggregate {
    pub fn paid_for(&self, key: &BillingKey) -> Money {
        self.paid_by_billing_type
            .get(key)
            .copied()
            .unwrap_or(Money::ZERO)
    }
}

/// sums settled payments per billing category
#[derive(Debug, Clone, Default)]
pub struct PaymentAggregator {
    table: BillingTypeTable,
}

impl PaymentAggregator {
    pub fn new(table: BillingTypeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BillingTypeTable {
        &self.table
    }

    /// group paid payment/sponsorship records by normalized billing type.
    ///
    /// With a period, records carrying term or year metadata must match it;
    /// records without that metadata always count.
    pub fn aggregate(&self, records: &[PaymentRecord], period: Option<AcademicPeriod>) -> PaymentAggregate {
        let mut aggregate = PaymentAggregate::default();

        for record in records {
            if record.status != PaymentStatus::Paid || !record.record_type.counts_as_payment() {
                continue;
            }
            if let Some(period) = period {
                if !Self::matches_period(record, period) {
                    continue;
                }
            }

            let key = self.table.normalize(&record.billing_type);
            *aggregate
                .paid_by_billing_type
                .entry(key)
                .or_insert(Money::ZERO) += record.amount;
            aggregate.record_count += 1;
        }

        aggregate.total_paid = aggregate.paid_by_billing_type.values().sum();
        aggregate
    }

    fn matches_period(record: &PaymentRecord, period: AcademicPeriod) -> bool {
        let term_ok = record
            .term
            .as_deref()
            .map_or(true, |term| term.trim().eq_ignore_ascii_case(period.term.label()));
        let year_ok = record
            .year
            .as_deref()
            .map_or(true, |year| year.trim() == period.year_label());
        term_ok && year_ok
    }
}
