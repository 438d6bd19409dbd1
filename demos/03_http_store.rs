/// http store - run the engine against the school api.
///
/// Reads `fees.toml` when present, otherwise talks to a local api. An
/// unreachable api degrades to zero balances instead of failing.
use school_fees_rs::{
    telemetry, AcademicPeriod, BalanceView, EngineConfig, Event, ReconciliationEngine, Student,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = if Path::new("fees.toml").exists() {
        EngineConfig::load("fees.toml")?
    } else {
        EngineConfig::local("http://localhost:5000/api")
    };
    telemetry::init(&config.log);

    let engine = ReconciliationEngine::builder().config(config).build()?;

    let student = Student::new("STU-001", "Amina Nakato", "S.1");
    let period = AcademicPeriod::parse("Term 1", "2025")?;
    let summary = engine.student_balance(&student, Some(period)).await;
    println!("{}", BalanceView::from_summary(&student, &summary).json());

    for event in engine.take_events() {
        if let Event::StoreDegraded { endpoint, reason, .. } = event {
            println!("degraded: {} ({})", endpoint, reason);
        }
    }

    Ok(())
}
