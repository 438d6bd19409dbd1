use futures::future::join_all;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::admission::AdmissionTermGate;
use crate::balance::{BalanceCalculator, BalanceSummary, FeeReminder, StudentBalance};
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{FeeError, Result};
use crate::events::{Event, EventStore};
use crate::fees::{FeeStructure, FeeStructureCache, FeeStructureResolver, ResidenceFilter, ResolutionSource};
use crate::payments::{
    BillingTypeTable, PaymentAggregate, PaymentAggregator, PaymentOutcome, PaymentProcessor,
    PaymentSubmission, PaymentSummaryCache,
};
use crate::sequence::LatestSlot;
use crate::store::{FeeStructureStore, HttpStore, PaymentStore, PaymentSummary};
use crate::types::{AcademicPeriod, Student};

/// everything one balance computation consumed
struct BalanceInputs {
    fees: FeeStructure,
    payments: PaymentAggregate,
    /// a store read failed and an empty stand-in was used
    degraded: bool,
}

/// reconciles fee structures against payments for students.
///
/// Read paths never fail: store errors are logged, recorded as
/// [`Event::StoreDegraded`] and replaced by empty data. Payment submission is
/// the only operation that returns an error.
pub struct ReconciliationEngine {
    config: EngineConfig,
    resolver: FeeStructureResolver,
    aggregator: PaymentAggregator,
    calculator: BalanceCalculator,
    payments: PaymentProcessor,
    clock: Arc<SafeTimeProvider>,
    events: Mutex<EventStore>,
}

impl ReconciliationEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// engine over a single store serving both fees and payments
    pub fn with_store<S>(config: EngineConfig, store: Arc<S>) -> Result<Self>
    where
        S: FeeStructureStore + PaymentStore + 'static,
    {
        EngineBuilder::new().config(config).store(store).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<SafeTimeProvider> {
        &self.clock
    }

    /// academic period the clock currently falls into
    pub fn current_period(&self) -> AcademicPeriod {
        AcademicPeriod::containing(self.clock.now())
    }

    /// fee items that apply to a student for a period, residence filter applied
    pub async fn fee_structure(&self, student: &Student, period: Option<AcademicPeriod>) -> FeeStructure {
        self.resolve_fees(student, period).await.0
    }

    /// paid amounts per billing type for a student and period
    pub async fn payments(&self, student: &Student, period: Option<AcademicPeriod>) -> PaymentAggregate {
        self.aggregate_payments(student, period, None).await.0
    }

    /// balance for one period, or the unscoped view when `period` is None.
    ///
    /// The unscoped view covers the current period and adds what was still
    /// owed for the term before it.
    pub async fn student_balance(&self, student: &Student, period: Option<AcademicPeriod>) -> BalanceSummary {
        self.balance_with(student, period, None).await
    }

    /// scoped balance of the term before `current`, zero when that term
    /// precedes admission or could not be read
    pub async fn previous_balance(&self, student: &Student, current: AcademicPeriod) -> Money {
        self.carry_over(student, current, None).await
    }

    /// post a payment and return the balance recomputed from fresh records
    pub async fn submit_payment(
        &self,
        student: &Student,
        mut submission: PaymentSubmission,
        period: Option<AcademicPeriod>,
    ) -> Result<PaymentOutcome> {
        if submission.student_id.trim().is_empty() {
            submission.student_id = student.id.clone();
        } else if submission.student_id != student.id {
            return Err(FeeError::StudentMismatch {
                expected: student.id.clone(),
                found: submission.student_id,
            });
        }

        let submitted = self.payments.submit(submission, &student.class_name).await?;
        let now = self.clock.now();
        self.emit(Event::PaymentSubmitted {
            student_id: student.id.clone(),
            amount: submitted.submission.amount,
            billing_type: submitted.submission.billing_type.clone(),
            reference: submitted.submission.payment_reference.clone(),
            timestamp: now,
        });
        self.emit(Event::CacheInvalidated {
            cache: self.payments.summaries().name().to_string(),
            key: student.id.clone(),
            timestamp: now,
        });
        self.emit(Event::CacheInvalidated {
            cache: self.resolver.cache().name().to_string(),
            key: student.class_name.clone(),
            timestamp: now,
        });

        let refreshed = submitted.fresh.is_some();
        let records = match submitted.fresh {
            Some(records) => records,
            None => {
                self.emit(Event::StoreDegraded {
                    endpoint: "payments/summary".to_string(),
                    reason: "re-read after payment failed".to_string(),
                    timestamp: self.clock.now(),
                });
                PaymentSummary::default()
            }
        };

        let summary = self.balance_with(student, period, Some(&records)).await;
        Ok(PaymentOutcome {
            receipt: submitted.receipt,
            summary,
            refreshed,
        })
    }

    /// compute a balance and publish it to `slot` unless a newer request was
    /// issued meanwhile; returns whether it was applied
    pub async fn refresh(
        &self,
        slot: &LatestSlot<BalanceSummary>,
        student: &Student,
        period: Option<AcademicPeriod>,
    ) -> bool {
        let ticket = slot.issue();
        let summary = self.student_balance(student, period).await;
        if slot.apply(ticket, summary) {
            return true;
        }
        self.emit(Event::StaleResultDiscarded {
            ticket: ticket.value(),
            latest: slot.latest(),
            timestamp: self.clock.now(),
        });
        false
    }

    /// balances for many students, fetched concurrently, in input order
    pub async fn class_balances(&self, students: &[Student], period: Option<AcademicPeriod>) -> Vec<StudentBalance> {
        join_all(students.iter().map(|student| async move {
            StudentBalance::new(student, self.student_balance(student, period).await)
        }))
        .await
    }

    /// reminder payloads for every student who still owes something
    pub async fn reminders(&self, students: &[Student], period: Option<AcademicPeriod>) -> Vec<FeeReminder> {
        let balances = self.class_balances(students, period).await;
        students
            .iter()
            .zip(balances.iter())
            .filter_map(|(student, balance)| FeeReminder::from_summary(student, &balance.summary))
            .collect()
    }

    /// drop cached fee structures for a class, e.g. after a fee edit
    pub fn invalidate_class(&self, class_name: &str) {
        let cache = self.resolver.cache();
        if cache.invalidate(class_name) {
            self.emit(Event::CacheInvalidated {
                cache: cache.name().to_string(),
                key: class_name.to_string(),
                timestamp: self.clock.now(),
            });
        }
    }

    /// drop a student's cached payment records
    pub fn invalidate_student(&self, student_id: &str) {
        let cache = self.payments.summaries();
        if cache.invalidate(&student_id.to_string()) {
            self.emit(Event::CacheInvalidated {
                cache: cache.name().to_string(),
                key: student_id.to_string(),
                timestamp: self.clock.now(),
            });
        }
    }

    pub fn clear_caches(&self) {
        self.resolver.cache().clear();
        self.payments.summaries().clear();
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().events().cloned().collect()
    }

    fn emit(&self, event: Event) {
        self.events.lock().emit(event);
    }

    async fn balance_with(
        &self,
        student: &Student,
        period: Option<AcademicPeriod>,
        records: Option<&PaymentSummary>,
    ) -> BalanceSummary {
        let (scope, carry_over) = match period {
            Some(period) => (period, Money::ZERO),
            None => {
                let current = self.current_period();
                (current, self.carry_over(student, current, records).await)
            }
        };

        let inputs = self.inputs(student, scope, records).await;
        let summary = self.calculator.compute_for_period(
            &inputs.fees.items,
            &inputs.payments.paid_by_billing_type,
            period,
            carry_over,
        );

        tracing::info!(
            student_id = %student.id,
            period = %scope,
            scoped = period.is_some(),
            required = %summary.total_fees_required,
            paid = %summary.total_paid,
            balance = %summary.balance,
            "balance computed"
        );
        self.emit(Event::BalanceComputed {
            student_id: student.id.clone(),
            period,
            total_required: summary.total_fees_required,
            total_paid: summary.total_paid,
            balance: summary.balance,
            timestamp: self.clock.now(),
        });
        summary
    }

    /// single-term lookback, never recursive
    async fn carry_over(&self, student: &Student, current: AcademicPeriod, records: Option<&PaymentSummary>) -> Money {
        let previous = current.previous();
        if self.resolver.gate().gates(student, previous) {
            return Money::ZERO;
        }

        let inputs = self.inputs(student, previous, records).await;
        if inputs.degraded {
            return Money::ZERO;
        }
        self.calculator
            .compute_for_period(
                &inputs.fees.items,
                &inputs.payments.paid_by_billing_type,
                Some(previous),
                Money::ZERO,
            )
            .balance
    }

    async fn inputs(&self, student: &Student, period: AcademicPeriod, records: Option<&PaymentSummary>) -> BalanceInputs {
        let (fees, fees_degraded) = self.resolve_fees(student, Some(period)).await;
        let (payments, payments_degraded) = self.aggregate_payments(student, Some(period), records).await;
        BalanceInputs {
            fees,
            payments,
            degraded: fees_degraded || payments_degraded,
        }
    }

    async fn resolve_fees(&self, student: &Student, period: Option<AcademicPeriod>) -> (FeeStructure, bool) {
        let resolution = self
            .resolver
            .resolve_detailed(&student.class_name, period, Some(student))
            .await;
        let timestamp = self.clock.now();

        let degraded = match &resolution.source {
            ResolutionSource::Store | ResolutionSource::Cache => {
                self.emit(Event::FeeStructureResolved {
                    class_name: student.class_name.clone(),
                    period,
                    item_count: resolution.structure.items.len(),
                    total: resolution.structure.total,
                    from_cache: resolution.source == ResolutionSource::Cache,
                    timestamp,
                });
                false
            }
            ResolutionSource::Gated { admitted } => {
                if let Some(requested) = period {
                    self.emit(Event::AdmissionGateApplied {
                        student_id: student.id.clone(),
                        requested,
                        admitted: *admitted,
                        timestamp,
                    });
                }
                false
            }
            ResolutionSource::Degraded { reason } => {
                self.emit(Event::StoreDegraded {
                    endpoint: "fee-structures".to_string(),
                    reason: reason.clone(),
                    timestamp,
                });
                true
            }
            ResolutionSource::EmptyInput => {
                tracing::warn!(student_id = %student.id, "student has no class, no fees resolved");
                false
            }
        };

        let filtered = ResidenceFilter::filter(&resolution.structure.items, student.residence_type);
        (filtered, degraded)
    }

    async fn aggregate_payments(
        &self,
        student: &Student,
        period: Option<AcademicPeriod>,
        records: Option<&PaymentSummary>,
    ) -> (PaymentAggregate, bool) {
        let (aggregate, degraded) = match records {
            Some(records) => (self.aggregator.aggregate(&records.financial_records, period), false),
            None => match self.payments.summary(&student.id, false).await {
                Ok(summary) => (self.aggregator.aggregate(&summary.financial_records, period), false),
                Err(err) => {
                    tracing::warn!(student_id = %student.id, error = %err, "payment store unavailable, treating as no payments");
                    self.emit(Event::StoreDegraded {
                        endpoint: "payments/summary".to_string(),
                        reason: err.to_string(),
                        timestamp: self.clock.now(),
                    });
                    (PaymentAggregate::default(), true)
                }
            },
        };

        self.emit(Event::PaymentsAggregated {
            student_id: student.id.clone(),
            period,
            record_count: aggregate.record_count,
            total_paid: aggregate.total_paid,
            timestamp: self.clock.now(),
        });
        (aggregate, degraded)
    }
}

/// wires stores, caches and the clock into an engine
pub struct EngineBuilder {
    config: EngineConfig,
    fee_store: Option<Arc<dyn FeeStructureStore>>,
    payment_store: Option<Arc<dyn PaymentStore>>,
    clock: Option<Arc<SafeTimeProvider>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            fee_store: None,
            payment_store: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// use one store for both fees and payments
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: FeeStructureStore + PaymentStore + 'static,
    {
        self.fee_store = Some(store.clone());
        self.payment_store = Some(store);
        self
    }

    pub fn fee_store(mut self, store: Arc<dyn FeeStructureStore>) -> Self {
        self.fee_store = Some(store);
        self
    }

    pub fn payment_store(mut self, store: Arc<dyn PaymentStore>) -> Self {
        self.payment_store = Some(store);
        self
    }

    /// share a time provider; system time when not set
    pub fn set_time(mut self, clock: Arc<SafeTimeProvider>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// build, falling back to an http store from `config.store` for any
    /// store not set explicitly
    pub fn build(self) -> Result<ReconciliationEngine> {
        let config = self.config;
        config.validate()?;

        let (fee_store, payment_store) = match (self.fee_store, self.payment_store) {
            (Some(fees), Some(payments)) => (fees, payments),
            (fees, payments) => {
                let http = Arc::new(HttpStore::new(&config.store)?);
                let fee_store: Arc<dyn FeeStructureStore> = match fees {
                    Some(fees) => fees,
                    None => http.clone(),
                };
                let payment_store: Arc<dyn PaymentStore> = match payments {
                    Some(payments) => payments,
                    None => http,
                };
                (fee_store, payment_store)
            }
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SafeTimeProvider::new(TimeSource::System)));
        let table = BillingTypeTable::from_config(&config.billing);
        let fee_cache = Arc::new(FeeStructureCache::new(config.cache.enabled));
        let summaries = Arc::new(PaymentSummaryCache::new("payment_summaries", config.cache.enabled));

        Ok(ReconciliationEngine {
            resolver: FeeStructureResolver::new(
                fee_store,
                Arc::clone(&fee_cache),
                AdmissionTermGate::new(&config.admission),
            ),
            aggregator: PaymentAggregator::new(table.clone()),
            calculator: BalanceCalculator::new(table),
            payments: PaymentProcessor::new(payment_store, summaries, fee_cache),
            clock,
            events: Mutex::new(EventStore::with_capacity(config.events.capacity)),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::GENERAL_LINE_LABEL;
    use crate::payments::PaymentMethod;
    use crate::store::InMemoryStore;
    use crate::types::{FeeItem, PaymentRecord, PaymentStatus, ResidenceType, Term};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn t1() -> AcademicPeriod {
        AcademicPeriod::new(Term::Term1, 2025)
    }

    fn t2() -> AcademicPeriod {
        AcademicPeriod::new(Term::Term2, 2025)
    }

    /// S.1 charges the same three items in term 1 and term 2 of 2025
    fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for period in [t1(), t2()] {
            store.add_fee(FeeItem::new("Tuition", Money::from_major(800_000)).for_class("S.1", period));
            store.add_fee(FeeItem::new("Boarding", Money::from_major(500_000)).for_class("S.1", period));
            store.add_fee(FeeItem::new("Lunch", Money::from_major(50_000)).for_class("S.1", period));
        }
        store.set_current_period(t2());
        store
    }

    /// clock in the middle of term 2 2025
    fn engine(store: Arc<InMemoryStore>) -> ReconciliationEngine {
        engine_with(store, EngineConfig::offline())
    }

    fn engine_with(store: Arc<InMemoryStore>, config: EngineConfig) -> ReconciliationEngine {
        let clock = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()));
        ReconciliationEngine::builder()
            .config(config)
            .store(store)
            .set_time(Arc::new(clock))
            .build()
            .unwrap()
    }

    fn day_student() -> Student {
        Student::new("STU-1", "Amina", "S.1")
            .with_residence(ResidenceType::Day)
            .admitted_at(Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap())
    }

    fn boarder() -> Student {
        Student::new("STU-2", "Brian", "S.1")
            .with_residence(ResidenceType::Boarding)
            .admitted_at(Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_day_student_fee_structure() {
        let engine = engine(seeded_store());
        let fees = engine.fee_structure(&day_student(), Some(t1())).await;

        let names: Vec<&str> = fees.items.iter().map(|i| i.fee_name.as_str()).collect();
        assert_eq!(names, vec!["Tuition", "Lunch"]);
        assert_eq!(fees.total, Money::from_major(850_000));
    }

    #[tokio::test]
    async fn test_boarding_student_fee_structure() {
        let engine = engine(seeded_store());
        let fees = engine.fee_structure(&boarder(), Some(t1())).await;

        let names: Vec<&str> = fees.items.iter().map(|i| i.fee_name.as_str()).collect();
        assert_eq!(names, vec!["Tuition", "Boarding"]);
        assert_eq!(fees.total, Money::from_major(1_300_000));
    }

    #[tokio::test]
    async fn test_paid_tuition_leaves_only_unpaid_items() {
        let store = seeded_store();
        store.add_record(PaymentRecord::paid("STU-1", "tuition", Money::from_major(800_000)).in_period(t1()));
        let engine = engine(store);

        let summary = engine.student_balance(&day_student(), Some(t1())).await;
        assert_eq!(summary.line("Tuition").unwrap().remaining, Money::ZERO);
        assert_eq!(summary.balance, Money::from_major(50_000));
        assert_eq!(summary.period, Some(t1()));
    }

    #[tokio::test]
    async fn test_store_outage_yields_zero_balance() {
        let store = seeded_store();
        store.set_unavailable(true);
        let engine = engine(Arc::clone(&store));

        let summary = engine.student_balance(&day_student(), Some(t1())).await;
        assert_eq!(summary, BalanceSummary::zero(Some(t1())));

        let degraded = engine
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, Event::StoreDegraded { .. }))
            .count();
        assert_eq!(degraded, 2);
    }

    #[tokio::test]
    async fn test_terms_before_admission_are_gated() {
        let engine = engine(seeded_store());
        let late = Student::new("STU-3", "Chloe", "S.1").admitted_at(Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap());

        let fees = engine.fee_structure(&late, Some(t1())).await;
        assert!(fees.items.is_empty());
        assert_eq!(fees.total, Money::ZERO);
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e, Event::AdmissionGateApplied { admitted, .. } if *admitted == t2())));
    }

    #[tokio::test]
    async fn test_carry_over_only_in_unscoped_view() {
        let store = seeded_store();
        store.add_record(PaymentRecord::paid("STU-1", "Tuition", Money::from_major(800_000)).in_period(t1()));
        let engine = engine(store);
        let student = day_student();

        assert_eq!(engine.previous_balance(&student, t2()).await, Money::from_major(50_000));

        let scoped = engine.student_balance(&student, Some(t2())).await;
        assert_eq!(scoped.previous_balance, None);
        assert_eq!(scoped.total_fees_required, Money::from_major(850_000));
        assert_eq!(scoped.balance, Money::from_major(850_000));

        let unscoped = engine.student_balance(&student, None).await;
        assert_eq!(unscoped.previous_balance, Some(Money::from_major(50_000)));
        assert_eq!(unscoped.total_fees_required, Money::from_major(900_000));
        assert_eq!(unscoped.balance, Money::from_major(900_000));
        assert_eq!(unscoped.period, None);
    }

    #[tokio::test]
    async fn test_no_carry_over_before_admission() {
        let engine = engine(seeded_store());
        let late = Student::new("STU-3", "Chloe", "S.1")
            .with_residence(ResidenceType::Day)
            .admitted_at(Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap());

        let unscoped = engine.student_balance(&late, None).await;
        assert_eq!(unscoped.previous_balance, None);
        assert_eq!(unscoped.balance, Money::from_major(850_000));
    }

    #[tokio::test]
    async fn test_pending_and_foreign_term_payments_ignored() {
        let store = seeded_store();
        store.add_record(
            PaymentRecord::paid("STU-1", "Lunch", Money::from_major(50_000))
                .in_period(t1())
                .with_status(PaymentStatus::Pending),
        );
        store.add_record(PaymentRecord::paid("STU-1", "Lunch", Money::from_major(50_000)).in_period(t2()));
        let engine = engine(store);

        let summary = engine.student_balance(&day_student(), Some(t1())).await;
        assert_eq!(summary.total_paid, Money::ZERO);
        assert_eq!(summary.balance, Money::from_major(850_000));
    }

    #[tokio::test]
    async fn test_unmatched_payment_lands_on_general_line() {
        let store = seeded_store();
        store.add_record(PaymentRecord::paid("STU-1", "Swimming Gala", Money::from_major(15_000)).in_period(t1()));
        let engine = engine(store);

        let summary = engine.student_balance(&day_student(), Some(t1())).await;
        assert_eq!(summary.line(GENERAL_LINE_LABEL).unwrap().paid, Money::from_major(15_000));
        assert_eq!(summary.total_paid, Money::from_major(15_000));
    }

    #[tokio::test]
    async fn test_submit_payment_recomputes_from_fresh_records() {
        let store = seeded_store();
        let engine = engine(Arc::clone(&store));
        let student = day_student();

        let before = engine.student_balance(&student, Some(t2())).await;
        assert_eq!(before.balance, Money::from_major(850_000));

        let submission = PaymentSubmission::new("STU-1", Money::from_major(800_000), "Tuition", PaymentMethod::Bank)
            .reference("BANK-001");
        let outcome = engine.submit_payment(&student, submission, Some(t2())).await.unwrap();

        assert!(outcome.refreshed);
        assert_eq!(outcome.receipt.reference, "BANK-001");
        assert_eq!(outcome.summary.balance, Money::from_major(50_000));
        assert_eq!(engine.student_balance(&student, Some(t2())).await.balance, Money::from_major(50_000));
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e, Event::PaymentSubmitted { reference, .. } if reference == "BANK-001")));
    }

    #[tokio::test]
    async fn test_submit_payment_for_other_student_rejected() {
        let store = seeded_store();
        let engine = engine(Arc::clone(&store));

        let submission = PaymentSubmission::new("STU-2", Money::from_major(10), "Tuition", PaymentMethod::Cash);
        let err = engine.submit_payment(&day_student(), submission, None).await.unwrap_err();

        assert!(matches!(err, FeeError::StudentMismatch { .. }));
        assert!(store.records_for("STU-2").is_empty());
    }

    #[tokio::test]
    async fn test_balance_read_during_payment_cannot_resurrect_old_records() {
        let store = seeded_store();
        let engine = engine_with(Arc::clone(&store), EngineConfig::default());
        let student = day_student();
        store.delay_next_summary(Duration::from_millis(100));

        let in_flight = engine.student_balance(&student, Some(t2()));
        let pay = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let submission = PaymentSubmission::new("STU-1", Money::from_major(800_000), "Tuition", PaymentMethod::Cash);
            engine.submit_payment(&student, submission, Some(t2())).await
        };
        let (stale, outcome) = tokio::join!(in_flight, pay);

        assert_eq!(stale.balance, Money::from_major(850_000));
        assert_eq!(outcome.unwrap().summary.balance, Money::from_major(50_000));
        assert_eq!(engine.student_balance(&student, Some(t2())).await.balance, Money::from_major(50_000));
        assert_eq!(store.payment_requests(), 2);
    }

    #[tokio::test]
    async fn test_failed_submission_is_an_error() {
        let store = seeded_store();
        store.set_unavailable(true);
        let engine = engine(Arc::clone(&store));

        let submission = PaymentSubmission::new("STU-1", Money::from_major(10), "Tuition", PaymentMethod::Cash);
        assert!(engine.submit_payment(&day_student(), submission, None).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_stale_refresh_is_discarded() {
        let store = seeded_store();
        store.set_latency(Some(t1()), Duration::from_millis(80));
        let engine = engine(Arc::clone(&store));
        let student = day_student();
        let slot = LatestSlot::new();

        let first = engine.refresh(&slot, &student, Some(t1()));
        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.refresh(&slot, &student, Some(t2())).await
        };
        let (first_applied, second_applied) = tokio::join!(first, second);

        assert!(!first_applied);
        assert!(second_applied);
        assert_eq!(slot.get().unwrap().period, Some(t2()));
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e, Event::StaleResultDiscarded { ticket: 1, latest: 2, .. })));
    }

    #[tokio::test]
    async fn test_fee_cache_reused_until_invalidated() {
        let store = seeded_store();
        let engine = engine_with(Arc::clone(&store), EngineConfig::default());
        let student = day_student();

        engine.fee_structure(&student, Some(t1())).await;
        engine.fee_structure(&boarder(), Some(t1())).await;
        assert_eq!(store.fee_requests(), 1);

        engine.invalidate_class("S.1");
        engine.fee_structure(&student, Some(t1())).await;
        assert_eq!(store.fee_requests(), 2);
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e, Event::CacheInvalidated { key, .. } if key == "S.1")));
    }

    #[tokio::test]
    async fn test_disabled_cache_always_reads_through() {
        let store = seeded_store();
        let mut config = EngineConfig::default();
        config.cache.enabled = false;
        let engine = engine_with(Arc::clone(&store), config);

        engine.fee_structure(&day_student(), Some(t1())).await;
        engine.fee_structure(&day_student(), Some(t1())).await;
        assert_eq!(store.fee_requests(), 2);
    }

    #[tokio::test]
    async fn test_class_balances_and_reminders() {
        let store = seeded_store();
        store.add_record(PaymentRecord::paid("STU-1", "Tuition", Money::from_major(800_000)).in_period(t1()));
        store.add_record(PaymentRecord::paid("STU-1", "Lunch", Money::from_major(50_000)).in_period(t1()));
        let engine = engine(store);
        let students = vec![day_student(), boarder()];

        let balances = engine.class_balances(&students, Some(t1())).await;
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].student_id, "STU-1");
        assert!(balances[0].summary.is_settled());
        assert_eq!(balances[1].summary.balance, Money::from_major(1_300_000));

        let reminders = engine.reminders(&students, Some(t1())).await;
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].student_id, "STU-2");
    }

    #[tokio::test]
    async fn test_event_log_is_capped() {
        let mut config = EngineConfig::offline();
        config.events.capacity = 4;
        let engine = engine_with(seeded_store(), config);

        for _ in 0..10 {
            engine.student_balance(&day_student(), Some(t2())).await;
        }

        let events = engine.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(events.last(), Some(Event::BalanceComputed { .. })));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.store.timeout_secs = 0;
        let result = ReconciliationEngine::builder()
            .config(config)
            .store(Arc::new(InMemoryStore::new()))
            .build();
        assert!(matches!(result, Err(FeeError::InvalidConfiguration { .. })));
    }
}
