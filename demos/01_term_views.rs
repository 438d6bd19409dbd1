/// term views - scoped balances, the unscoped view with carry-over, and admission gating
use school_fees_rs::{
    AcademicPeriod, EngineConfig, FeeItem, InMemoryStore, Money, PaymentRecord, ReconciliationEngine,
    ResidenceType, SafeTimeProvider, Student, Term, TimeSource,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== term views ===\n");

    // pin the clock to mid term 2
    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    )));

    let store = Arc::new(InMemoryStore::new());
    for term in [Term::Term1, Term::Term2] {
        let period = AcademicPeriod::new(term, 2025);
        store.add_fee(FeeItem::new("Tuition", Money::from_major(800_000)).for_class("S.2", period));
        store.add_fee(FeeItem::new("Uniform Fee", Money::from_major(60_000)).for_class("S.2", period));
        store.add_fee(FeeItem::new("Lunch", Money::from_major(50_000)).for_class("S.2", period));
    }

    // term 1: tuition paid, uniform partly paid under a different name
    let term1 = AcademicPeriod::new(Term::Term1, 2025);
    store.add_record(PaymentRecord::paid("STU-010", "tuition fees", Money::from_major(800_000)).in_period(term1));
    store.add_record(PaymentRecord::paid("STU-010", "Uniform", Money::from_major(40_000)).in_period(term1));

    let engine = ReconciliationEngine::builder()
        .config(EngineConfig::offline())
        .store(store)
        .set_time(time.clone())
        .build()?;

    let joseph = Student::new("STU-010", "Joseph Okello", "S.2")
        .with_residence(ResidenceType::Day)
        .admitted_at(Utc.with_ymd_and_hms(2025, 1, 20, 8, 0, 0).unwrap());

    println!("today: {} ({})", time.now().format("%Y-%m-%d"), engine.current_period());

    for period in [term1, term1.next()] {
        let summary = engine.student_balance(&joseph, Some(period)).await;
        println!("\n{}: required {}, paid {}, balance {}", period, summary.total_fees_required, summary.total_paid, summary.balance);
        for line in &summary.payment_breakdown {
            println!("  {:<14} required {:>10}  paid {:>10}  remaining {:>10}", line.billing_type, line.required, line.paid, line.remaining);
        }
    }

    // no term selected: current term plus what term 1 left unpaid
    let all = engine.student_balance(&joseph, None).await;
    println!(
        "\nall terms: previous balance {}, total required {}, balance {}",
        all.previous_balance.unwrap_or(Money::ZERO),
        all.total_fees_required,
        all.balance
    );

    // a student admitted in term 2 owes nothing for term 1
    let late = Student::new("STU-011", "Sarah Auma", "S.2")
        .admitted_at(Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap());
    let gated = engine.fee_structure(&late, Some(term1)).await;
    println!("\n{} term 1 fees: {} items, total {}", late.name, gated.items.len(), gated.total);

    Ok(())
}
