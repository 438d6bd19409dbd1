pub mod admission;
pub mod balance;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fees;
pub mod payments;
pub mod sequence;
pub mod store;
pub mod telemetry;
pub mod types;

// re-export key types
pub use admission::AdmissionTermGate;
pub use balance::{
    BalanceCalculator, BalanceLine, BalanceSummary, BalanceView, FeeReminder, StudentBalance,
    GENERAL_LINE_LABEL,
};
pub use config::{
    AdmissionConfig, BillingConfig, CacheConfig, EngineConfig, EventConfig, LogConfig, StoreConfig,
};
pub use decimal::Money;
pub use engine::{EngineBuilder, ReconciliationEngine};
pub use errors::{FeeError, Result};
pub use events::{Event, EventStore};
pub use fees::{
    AdvisoryCache, CacheGeneration, FeeStructure, FeeStructureCache, FeeStructureResolver,
    ResidenceFilter,
};
pub use payments::{
    BillingKey, BillingTypeTable, PaymentAggregate, PaymentAggregator, PaymentMethod, PaymentOutcome,
    PaymentProcessor, PaymentReceipt, PaymentSubmission,
};
pub use sequence::{LatestSlot, RequestSequencer, RequestTicket};
pub use store::{FeeStructureStore, HttpStore, InMemoryStore, PaymentStore, PaymentSummary};
pub use types::{
    AcademicPeriod, FeeFrequency, FeeItem, PaymentRecord, PaymentStatus, RecordType, ResidenceType,
    Student, StudentId, Term,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
