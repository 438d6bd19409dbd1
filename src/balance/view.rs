use serde::{Deserialize, Serialize};

use crate::balance::BalanceSummary;
use crate::decimal::Money;
use crate::types::{AcademicPeriod, ResidenceType, Student, StudentId};

/// a student together with the balance computed for them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBalance {
    pub student_id: StudentId,
    pub student_name: String,
    pub class_name: String,
    pub summary: BalanceSummary,
}

impl StudentBalance {
    pub fn new(student: &Student, summary: BalanceSummary) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            class_name: student.class_name.clone(),
            summary,
        }
    }
}

/// flat, serializable view of one student's fee position for the ui
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub student_id: StudentId,
    pub student_name: String,
    pub class_name: String,
    pub residence_type: Option<ResidenceType>,
    pub period: Option<AcademicPeriod>,
    pub total_fees_required: Money,
    pub total_paid: Money,
    pub balance: Money,
    pub previous_balance: Option<Money>,
    pub lines: Vec<LineView>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub billing_type: String,
    pub required: Money,
    pub paid: Money,
    pub remaining: Money,
}

impl BalanceView {
    pub fn from_summary(student: &Student, summary: &BalanceSummary) -> Self {
        BalanceView {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            class_name: student.class_name.clone(),
            residence_type: student.residence_type,
            period: summary.period,
            total_fees_required: summary.total_fees_required,
            total_paid: summary.total_paid,
            balance: summary.balance,
            previous_balance: summary.previous_balance,
            lines: summary
                .payment_breakdown
                .iter()
                .map(|line| LineView {
                    billing_type: line.billing_type.clone(),
                    required: line.required,
                    paid: line.paid,
                    remaining: line.remaining,
                })
                .collect(),
        }
    }

    /// pretty json snapshot
    pub fn json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

/// payload handed to the reminder collaborator for students who still owe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeReminder {
    pub student_id: StudentId,
    pub student_name: String,
    pub class_name: String,
    pub period: Option<AcademicPeriod>,
    pub balance: Money,
    pub outstanding: Vec<(String, Money)>,
}

impl FeeReminder {
    /// None when nothing is owed
    pub fn from_summary(student: &Student, summary: &BalanceSummary) -> Option<Self> {
        if summary.is_settled() {
            return None;
        }
        let mut outstanding: Vec<(String, Money)> = summary
            .outstanding_items()
            .map(|line| (line.billing_type.clone(), line.remaining))
            .collect();
        if let Some(previous) = summary.previous_balance {
            outstanding.push(("Previous term balance".to_string(), previous));
        }
        Some(FeeReminder {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            class_name: student.class_name.clone(),
            period: summary.period,
            balance: summary.balance,
            outstanding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::BalanceCalculator;
    use crate::payments::BillingTypeTable;
    use crate::types::{FeeItem, Term};
    use std::collections::BTreeMap;

    fn student() -> Student {
        Student::new("STU-9", "Grace", "S.3").with_residence(ResidenceType::Day)
    }

    fn summary(paid_tuition: i64, previous: i64) -> BalanceSummary {
        let items = vec![
            FeeItem::new("Tuition", Money::from_major(800_000)),
            FeeItem::new("Lunch", Money::from_major(50_000)),
        ];
        let mut paid = BTreeMap::new();
        paid.insert(
            BillingTypeTable::builtin().normalize("Tuition"),
            Money::from_major(paid_tuition),
        );
        BalanceCalculator::default().compute_balance(&items, &paid, Money::from_major(previous))
    }

    #[test]
    fn test_view_json_contains_totals() {
        let mut summary = summary(800_000, 0);
        summary.period = Some(AcademicPeriod::new(Term::Term1, 2025));
        let view = BalanceView::from_summary(&student(), &summary);
        let json = view.json();

        assert!(json.contains("\"studentId\": \"STU-9\""));
        assert!(json.contains("\"balance\": \"50000\""));
        assert_eq!(view.lines.len(), 2);
    }

    #[test]
    fn test_reminder_lists_outstanding_lines() {
        let reminder = FeeReminder::from_summary(&student(), &summary(800_000, 30_000)).unwrap();

        assert_eq!(reminder.balance, Money::from_major(80_000));
        assert_eq!(
            reminder.outstanding,
            vec![
                ("Lunch".to_string(), Money::from_major(50_000)),
                ("Previous term balance".to_string(), Money::from_major(30_000)),
            ]
        );
    }

    #[test]
    fn test_no_reminder_when_settled() {
        let mut settled = summary(800_000, 0);
        settled.balance = Money::ZERO;
        assert!(FeeReminder::from_summary(&student(), &settled).is_none());
    }
}
