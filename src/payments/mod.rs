pub mod aggregator;
pub mod processor;
pub mod synonyms;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::balance::BalanceSummary;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::types::StudentId;

pub use aggregator::{PaymentAggregate, PaymentAggregator};
pub use processor::{PaymentProcessor, PaymentSummaryCache, SubmittedPayment};
pub use synonyms::{BillingKey, BillingTypeTable};

/// how a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Bank,
    Cheque,
    Card,
    Other,
}

/// `POST /payments/process` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSubmission {
    pub student_id: StudentId,
    pub amount: Money,
    pub billing_type: String,
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
    pub description: String,
}

impl PaymentSubmission {
    pub fn new(student_id: &str, amount: Money, billing_type: &str, method: PaymentMethod) -> Self {
        Self {
            student_id: student_id.to_string(),
            amount,
            billing_type: billing_type.to_string(),
            payment_method: method,
            payment_reference: String::new(),
            description: String::new(),
        }
    }

    pub fn reference(mut self, reference: &str) -> Self {
        self.payment_reference = reference.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// reject submissions the store should never see
    pub fn validate(&self) -> Result<()> {
        if self.student_id.trim().is_empty() {
            return Err(FeeError::MissingField {
                field: "studentId".to_string(),
            });
        }
        if self.billing_type.trim().is_empty() {
            return Err(FeeError::MissingField {
                field: "billingType".to_string(),
            });
        }
        if !self.amount.is_positive() {
            return Err(FeeError::InvalidPaymentAmount { amount: self.amount });
        }
        Ok(())
    }

    /// fill in a reference when the caller left it blank
    pub fn with_generated_reference(mut self) -> Self {
        if self.payment_reference.trim().is_empty() {
            self.payment_reference = format!("PAY-{}", Uuid::new_v4().simple());
        }
        self
    }
}

/// acknowledgement returned by the payment store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, deserialize_with = "crate::decimal::coerce_money")]
    pub amount: Money,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// receipt plus the balance recomputed from fresh store data
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub receipt: PaymentReceipt,
    pub summary: BalanceSummary,
    /// false when the post-payment re-read failed and `summary` is degraded
    pub refreshed: bool,
}
