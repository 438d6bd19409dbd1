pub mod calculator;
pub mod view;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::BillingKey;
use crate::types::AcademicPeriod;

pub use calculator::BalanceCalculator;
pub use view::{BalanceView, FeeReminder, StudentBalance};

/// label of the catch-all line for payments that match no fee item
pub const GENERAL_LINE_LABEL: &str = "General/Development";

/// required/paid/remaining for one fee item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceLine {
    pub billing_type: String,
    pub key: BillingKey,
    pub required: Money,
    pub paid: Money,
    pub remaining: Money,
}

/// derived balance for one student, never persisted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub total_fees_required: Money,
    pub total_paid: Money,
    pub balance: Money,
    pub payment_breakdown: Vec<BalanceLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_balance: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<AcademicPeriod>,
}

impl BalanceSummary {
    /// well-formed all-zero summary
    pub fn zero(period: Option<AcademicPeriod>) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// lines that still have something to pay
    pub fn outstanding_items(&self) -> impl Iterator<Item = &BalanceLine> {
        self.payment_breakdown
            .iter()
            .filter(|line| line.remaining.is_positive())
    }

    pub fn is_settled(&self) -> bool {
        self.balance.is_zero()
    }

    pub fn line(&self, billing_type: &str) -> Option<&BalanceLine> {
        self.payment_breakdown
            .iter()
            .find(|line| line.billing_type.eq_ignore_ascii_case(billing_type))
    }
}
