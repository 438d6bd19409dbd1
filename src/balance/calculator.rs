use std::collections::{BTreeMap, HashMap, HashSet};

use crate::balance::{BalanceLine, BalanceSummary, GENERAL_LINE_LABEL};
use crate::decimal::Money;
use crate::payments::{BillingKey, BillingTypeTable};
use crate::types::{AcademicPeriod, FeeItem};

/// combines applicable fee items with aggregated payments
#[derive(Debug, Clone, Default)]
pub struct BalanceCalculator {
    table: BillingTypeTable,
}

impl BalanceCalculator {
    pub fn new(table: BillingTypeTable) -> Self {
        Self { table }
    }

    /// per-item and total required/paid/remaining figures.
    ///
    /// Payments are matched to items by normalized billing key. Items that
    /// share a key draw down that key's payments in order. Payments whose
    /// key matches no item land on the general line.
    pub fn compute_balance(
        &self,
        items: &[FeeItem],
        paid_by_billing_type: &BTreeMap<BillingKey, Money>,
        previous_balance: Money,
    ) -> BalanceSummary {
        let keyed: Vec<(BillingKey, &FeeItem)> = items
            .iter()
            .map(|item| (self.table.normalize(&item.fee_name), item))
            .collect();
        let item_keys: HashSet<&BillingKey> = keyed.iter().map(|(key, _)| key).collect();

        let mut buckets: HashMap<BillingKey, Money> = HashMap::new();
        for (key, amount) in paid_by_billing_type {
            let amount = (*amount).max(Money::ZERO);
            let target = if item_keys.contains(key) {
                key.clone()
            } else {
                BillingKey::general()
            };
            *buckets.entry(target).or_insert(Money::ZERO) += amount;
        }

        let mut items_left: HashMap<&BillingKey, usize> = HashMap::new();
        for (key, _) in &keyed {
            *items_left.entry(key).or_insert(0) += 1;
        }

        let mut breakdown = Vec::with_capacity(keyed.len() + 1);
        for (key, item) in &keyed {
            let required = item.amount.max(Money::ZERO);
            let left = buckets.entry(key.clone()).or_insert(Money::ZERO);
            let count = items_left.entry(key).or_insert(1);
            *count -= 1;

            // the last item for a key takes whatever is left, overpayment included
            let paid = if *count == 0 { *left } else { (*left).min(required) };
            *left = (*left).saturating_sub(paid);

            breakdown.push(BalanceLine {
                billing_type: item.fee_name.clone(),
                key: key.clone(),
                required,
                paid,
                remaining: required.saturating_sub(paid),
            });
        }

        let general = BillingKey::general();
        if !item_keys.contains(&general) {
            let unmatched = buckets.get(&general).copied().unwrap_or(Money::ZERO);
            if unmatched.is_positive() {
                tracing::debug!(amount = %unmatched, "payments without a matching fee item moved to general line");
                breakdown.push(BalanceLine {
                    billing_type: GENERAL_LINE_LABEL.to_string(),
                    key: general,
                    required: Money::ZERO,
                    paid: unmatched,
                    remaining: Money::ZERO,
                });
            }
        }

        let previous_balance = previous_balance.max(Money::ZERO);
        let total_fees_required =
            breakdown.iter().map(|line| line.required).sum::<Money>() + previous_balance;
        let total_paid: Money = breakdown.iter().map(|line| line.paid).sum();

        BalanceSummary {
            total_fees_required,
            total_paid,
            balance: total_fees_required.saturating_sub(total_paid),
            payment_breakdown: breakdown,
            previous_balance: previous_balance.is_positive().then_some(previous_balance),
            period: None,
        }
    }

    /// scoped views (a period given) never carry over a previous balance;
    /// unscoped views add it
    pub fn compute_for_period(
        &self,
        items: &[FeeItem],
        paid_by_billing_type: &BTreeMap<BillingKey, Money>,
        period: Option<AcademicPeriod>,
        previous_balance: Money,
    ) -> BalanceSummary {
        let carry_over = match period {
            Some(_) => Money::ZERO,
            None => previous_balance,
        };
        let mut summary = self.compute_balance(items, paid_by_billing_type, carry_over);
        summary.period = period;
        summary
    }
}
