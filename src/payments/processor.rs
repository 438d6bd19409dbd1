use std::sync::Arc;

use crate::errors::Result;
use crate::fees::{AdvisoryCache, FeeStructureCache};
use crate::payments::{PaymentReceipt, PaymentSubmission};
use crate::store::{PaymentStore, PaymentSummary};
use crate::types::StudentId;

/// payment summaries keyed by student id
pub type PaymentSummaryCache = AdvisoryCache<StudentId, PaymentSummary>;

/// result of a successful submission
#[derive(Debug, Clone)]
pub struct SubmittedPayment {
    /// the submission as posted, reference filled in
    pub submission: PaymentSubmission,
    pub receipt: PaymentReceipt,
    /// records re-read from the store after the post; None if that read failed
    pub fresh: Option<PaymentSummary>,
}

/// gateway to the payment store: cached reads and the submission write path
pub struct PaymentProcessor {
    store: Arc<dyn PaymentStore>,
    summaries: Arc<PaymentSummaryCache>,
    fee_cache: Arc<FeeStructureCache>,
}

impl PaymentProcessor {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        summaries: Arc<PaymentSummaryCache>,
        fee_cache: Arc<FeeStructureCache>,
    ) -> Self {
        Self {
            store,
            summaries,
            fee_cache,
        }
    }

    pub fn summaries(&self) -> &Arc<PaymentSummaryCache> {
        &self.summaries
    }

    /// all of a student's financial records.
    ///
    /// `fresh` bypasses the cache and overwrites it with what the store
    /// returns. A cached read that was overtaken by an invalidation or a
    /// fresh read returns its answer without caching it. Errors are returned
    /// untouched for the caller to degrade.
    pub async fn summary(&self, student_id: &str, fresh: bool) -> Result<PaymentSummary> {
        let key = student_id.to_string();
        if fresh {
            let summary = self.store.payment_summary(student_id, None).await?;
            self.summaries.set(key, summary.clone());
            return Ok(summary);
        }

        if let Some(cached) = self.summaries.get(&key) {
            tracing::debug!(student_id, "payment summary cache hit");
            return Ok(cached);
        }

        let seen = self.summaries.generation(&key);
        let summary = self.store.payment_summary(student_id, None).await?;
        if !self.summaries.set_if_current(key, summary.clone(), seen) {
            tracing::debug!(student_id, "payment summary changed during read, result not cached");
        }
        Ok(summary)
    }

    /// validate, post and re-read.
    ///
    /// After the store accepts the payment the student's payment cache and
    /// the class fee cache are dropped and records are fetched fresh, so the
    /// next balance cannot be computed from pre-payment data.
    pub async fn submit(&self, submission: PaymentSubmission, class_name: &str) -> Result<SubmittedPayment> {
        submission.validate()?;
        let submission = submission.with_generated_reference();

        let receipt = self.store.process_payment(&submission).await?;
        tracing::info!(
            student_id = %submission.student_id,
            amount = %submission.amount,
            billing_type = %submission.billing_type,
            reference = %receipt.reference,
            "payment accepted"
        );

        self.summaries.invalidate(&submission.student_id);
        if !class_name.trim().is_empty() {
            self.fee_cache.invalidate(class_name.trim());
        }

        let fresh = match self.summary(&submission.student_id, true).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!(
                    student_id = %submission.student_id,
                    error = %err,
                    "payment recorded but records could not be re-read"
                );
                None
            }
        };

        Ok(SubmittedPayment {
            submission,
            receipt,
            fresh,
        })
    }
}
