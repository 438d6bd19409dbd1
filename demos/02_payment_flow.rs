/// payment flow - submit payments, watch the balance refresh, collect reminders
use school_fees_rs::{
    AcademicPeriod, EngineConfig, Event, FeeItem, InMemoryStore, LatestSlot, Money, PaymentMethod,
    PaymentSubmission, ReconciliationEngine, ResidenceType, Student, Term,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment flow ===\n");

    let term = AcademicPeriod::new(Term::Term3, 2025);
    let store = Arc::new(InMemoryStore::new());
    store.set_current_period(term);
    store.add_fee(FeeItem::new("Tuition", Money::from_major(750_000)).for_class("P.7", term));
    store.add_fee(FeeItem::new("Boarding Fee", Money::from_major(450_000)).for_class("P.7", term));
    store.add_fee(FeeItem::new("Examination", Money::from_major(35_000)).for_class("P.7", term));

    let engine = ReconciliationEngine::with_store(EngineConfig::default(), store)?;

    let students = vec![
        Student::new("STU-100", "Peter Mugisha", "P.7").with_residence(ResidenceType::Boarding),
        Student::new("STU-101", "Grace Atim", "P.7").with_residence(ResidenceType::Day),
    ];

    let before = engine.student_balance(&students[0], Some(term)).await;
    println!("{} owes {}", students[0].name, before.balance);

    // tuition by mobile money, exam fee in cash
    let tuition = PaymentSubmission::new("STU-100", Money::from_major(750_000), "Tuition", PaymentMethod::MobileMoney)
        .description("term 3 tuition");
    let outcome = engine.submit_payment(&students[0], tuition, Some(term)).await?;
    println!("receipt {} for {}, balance now {}", outcome.receipt.reference, outcome.receipt.amount, outcome.summary.balance);

    let exam = PaymentSubmission::new("STU-100", Money::from_major(35_000), "exam fees", PaymentMethod::Cash);
    let outcome = engine.submit_payment(&students[0], exam, Some(term)).await?;
    println!("balance after exam fee: {}", outcome.summary.balance);

    // a rejected submission never reaches the store
    let bad = PaymentSubmission::new("STU-100", Money::ZERO, "Tuition", PaymentMethod::Cash);
    if let Err(e) = engine.submit_payment(&students[0], bad, Some(term)).await {
        println!("rejected: {}", e);
    }

    // latest-wins display slot
    let slot = LatestSlot::new();
    engine.refresh(&slot, &students[1], Some(term)).await;
    if let Some(summary) = slot.get() {
        println!("\n{} owes {}", students[1].name, summary.balance);
    }

    println!("\nreminders:");
    for reminder in engine.reminders(&students, Some(term)).await {
        println!("  {} ({}) owes {}", reminder.student_name, reminder.class_name, reminder.balance);
        for (item, amount) in &reminder.outstanding {
            println!("    {}: {}", item, amount);
        }
    }

    let submitted = engine
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, Event::PaymentSubmitted { .. }))
        .count();
    println!("\n{} payments recorded", submitted);

    Ok(())
}
