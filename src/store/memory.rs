use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::errors::{FeeError, Result};
use crate::payments::{PaymentReceipt, PaymentSubmission};
use crate::store::{FeeStructureStore, PaymentStore, PaymentSummary};
use crate::types::{AcademicPeriod, FeeItem, PaymentRecord, PaymentStatus, RecordType, StudentId};

/// in-process fee and payment store.
///
/// Mirrors the api's filtering: fee items are matched on class and, when a
/// period is given, on term and year. Reads see the data as it was when the
/// request arrived, even when the answer is delayed. It can be switched into
/// a failing mode to exercise degraded paths.
#[derive(Default)]
pub struct InMemoryStore {
    fees: RwLock<HashMap<String, Vec<FeeItem>>>,
    records: RwLock<HashMap<StudentId, Vec<PaymentRecord>>>,
    unavailable: AtomicBool,
    fee_requests: AtomicUsize,
    payment_requests: AtomicUsize,
    latency: RwLock<HashMap<Option<AcademicPeriod>, Duration>>,
    next_summary_delay: RwLock<Option<Duration>>,
    /// period stamped onto records created by `process_payment`
    current_period: RwLock<Option<AcademicPeriod>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fee(&self, item: FeeItem) {
        self.fees
            .write()
            .entry(item.class_name.clone())
            .or_default()
            .push(item);
    }

    pub fn add_record(&self, record: PaymentRecord) {
        self.records
            .write()
            .entry(record.student_id.clone())
            .or_default()
            .push(record);
    }

    /// simulate an outage: every call fails with a 500
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// delay answers for one period, to reproduce out-of-order responses
    pub fn set_latency(&self, period: Option<AcademicPeriod>, latency: Duration) {
        self.latency.write().insert(period, latency);
    }

    /// hold back the answer to the next payment-summary read only
    pub fn delay_next_summary(&self, delay: Duration) {
        *self.next_summary_delay.write() = Some(delay);
    }

    pub fn set_current_period(&self, period: AcademicPeriod) {
        *self.current_period.write() = Some(period);
    }

    pub fn fee_requests(&self) -> usize {
        self.fee_requests.load(Ordering::SeqCst)
    }

    pub fn payment_requests(&self) -> usize {
        self.payment_requests.load(Ordering::SeqCst)
    }

    pub fn records_for(&self, student_id: &str) -> Vec<PaymentRecord> {
        self.records
            .read()
            .get(student_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self, endpoint: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FeeError::StoreUnavailable {
                status: 500,
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }

    fn latency_for(&self, period: Option<AcademicPeriod>) -> Option<Duration> {
        self.latency.read().get(&period).copied()
    }

    async fn answer_after<T>(delay: Option<Duration>, answer: T) -> T {
        if let Some(delay) = delay.filter(|delay| !delay.is_zero()) {
            tokio::time::sleep(delay).await;
        }
        answer
    }

    fn item_in_period(item: &FeeItem, period: AcademicPeriod) -> bool {
        let term_ok = item
            .term
            .as_deref()
            .map_or(true, |term| term.eq_ignore_ascii_case(period.term.label()));
        let year_ok = item
            .year
            .as_deref()
            .map_or(true, |year| year == period.year_label());
        term_ok && year_ok
    }
}

#[async_trait]
impl FeeStructureStore for InMemoryStore {
    async fn fee_structures(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<Vec<FeeItem>> {
        self.fee_requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.check_available("/fee-structures").map(|()| {
            let items = self.fees.read().get(class_name).cloned().unwrap_or_default();
            match period {
                Some(period) => items
                    .into_iter()
                    .filter(|item| Self::item_in_period(item, period))
                    .collect(),
                None => items,
            }
        });
        Self::answer_after(self.latency_for(period), answer).await
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn payment_summary(
        &self,
        student_id: &str,
        period: Option<AcademicPeriod>,
    ) -> Result<PaymentSummary> {
        self.payment_requests.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .next_summary_delay
            .write()
            .take()
            .or_else(|| self.latency_for(period));
        let answer = self
            .check_available("/payments/summary")
            .map(|()| PaymentSummary::from_records(self.records_for(student_id)));
        Self::answer_after(delay, answer).await
    }

    async fn process_payment(&self, submission: &PaymentSubmission) -> Result<PaymentReceipt> {
        self.check_available("/payments/process")?;

        let now = Utc::now();
        let mut record = PaymentRecord::paid(
            &submission.student_id,
            &submission.billing_type,
            submission.amount,
        )
        .with_status(PaymentStatus::Paid)
        .with_type(RecordType::Payment);
        record.date = Some(now);
        if let Some(period) = *self.current_period.read() {
            record = record.in_period(period);
        }
        self.add_record(record);

        Ok(PaymentReceipt {
            payment_id: Uuid::new_v4().to_string(),
            reference: submission.payment_reference.clone(),
            amount: submission.amount,
            recorded_at: Some(now),
        })
    }
}
