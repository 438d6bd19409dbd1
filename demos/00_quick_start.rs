/// quick start - minimal example to get started
use school_fees_rs::{
    AcademicPeriod, BalanceView, EngineConfig, FeeItem, InMemoryStore, Money, PaymentRecord,
    ReconciliationEngine, ResidenceType, Student, Term,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let term1 = AcademicPeriod::new(Term::Term1, 2025);

    // fee structure and one payment for S.1
    let store = Arc::new(InMemoryStore::new());
    store.add_fee(FeeItem::new("Tuition", Money::from_major(800_000)).for_class("S.1", term1));
    store.add_fee(FeeItem::new("Boarding", Money::from_major(500_000)).for_class("S.1", term1));
    store.add_fee(FeeItem::new("Lunch", Money::from_major(50_000)).for_class("S.1", term1));
    store.add_record(PaymentRecord::paid("STU-001", "Tuition", Money::from_major(800_000)).in_period(term1));

    let engine = ReconciliationEngine::with_store(EngineConfig::offline(), store)?;

    // a day scholar owes tuition and lunch, never boarding
    let student = Student::new("STU-001", "Amina Nakato", "S.1").with_residence(ResidenceType::Day);
    let summary = engine.student_balance(&student, Some(term1)).await;

    println!("{}", BalanceView::from_summary(&student, &summary).json());

    Ok(())
}
