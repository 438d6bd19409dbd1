pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::decimal::{coerce_money, Money};
use crate::errors::Result;
use crate::payments::{PaymentReceipt, PaymentSubmission};
use crate::types::{AcademicPeriod, FeeItem, PaymentRecord};

pub use http::HttpStore;
pub use memory::InMemoryStore;

/// `GET /fee-structures/{className}` response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureResponse {
    #[serde(default)]
    pub fee_structures: Vec<FeeItem>,
}

/// per-billing-type figure as reported by the payment store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedBreakdown {
    #[serde(default)]
    pub billing_type: String,
    #[serde(default, deserialize_with = "coerce_money")]
    pub paid: Money,
}

/// `GET /payments/summary/{studentId}` response body.
///
/// Only `financial_records` feeds the balance; the pre-computed totals are
/// kept for diagnostics and are never trusted as the amount paid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    #[serde(default, deserialize_with = "coerce_money")]
    pub total_paid: Money,
    #[serde(default, deserialize_with = "coerce_money")]
    pub total_fees_required: Money,
    #[serde(default)]
    pub payment_breakdown: Vec<ReportedBreakdown>,
    #[serde(default, alias = "payments")]
    pub financial_records: Vec<PaymentRecord>,
}

impl PaymentSummary {
    pub fn from_records(records: Vec<PaymentRecord>) -> Self {
        Self {
            financial_records: records,
            ..Self::default()
        }
    }
}

/// source of fee structures.
///
/// Owned by the school's api; implemented by [`HttpStore`] over REST and by
/// [`InMemoryStore`] for tests and offline use. Results are per-request read
/// models only.
#[async_trait]
pub trait FeeStructureStore: Send + Sync {
    /// fee items for a class; filtered server-side when a period is given
    async fn fee_structures(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<Vec<FeeItem>>;
}

/// source of payment and financial records, and the payment sink
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn payment_summary(
        &self,
        student_id: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<PaymentSummary>;

    async fn process_payment(&self, submission: &PaymentSubmission) -> Result<PaymentReceipt>;
}
