use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decimal::{coerce_money, Money};
use crate::errors::{FeeError, Result};

/// student identifier as issued by the records store
pub type StudentId = String;

/// school term within an academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Term {
    Term1,
    Term2,
    Term3,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::Term1, Term::Term2, Term::Term3];

    pub fn number(&self) -> u8 {
        match self {
            Term::Term1 => 1,
            Term::Term2 => 2,
            Term::Term3 => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Term::Term1),
            2 => Some(Term::Term2),
            3 => Some(Term::Term3),
            _ => None,
        }
    }

    /// display label used by the stores, e.g. "Term 1"
    pub fn label(&self) -> &'static str {
        match self {
            Term::Term1 => "Term 1",
            Term::Term2 => "Term 2",
            Term::Term3 => "Term 3",
        }
    }

    /// Jan-Apr is term 1, May-Aug term 2, Sep-Dec term 3
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=4 => Term::Term1,
            5..=8 => Term::Term2,
            _ => Term::Term3,
        }
    }

    /// following term, wrapping from term 3 to term 1
    pub fn next(&self) -> Self {
        match self {
            Term::Term1 => Term::Term2,
            Term::Term2 => Term::Term3,
            Term::Term3 => Term::Term1,
        }
    }

    /// preceding term, wrapping from term 1 to term 3
    pub fn previous(&self) -> Self {
        match self {
            Term::Term1 => Term::Term3,
            Term::Term2 => Term::Term1,
            Term::Term3 => Term::Term2,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Term {
    type Err = FeeError;

    /// accepts "Term 1", "term 2", "TERM3" and bare "3"
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FeeError::InvalidTerm { value: s.to_string() };
        let trimmed = s.trim();
        let last = trimmed.chars().last().ok_or_else(invalid)?;
        let number = last.to_digit(10).ok_or_else(invalid)?;
        let prefix = trimmed[..trimmed.len() - last.len_utf8()].trim();
        if !(prefix.is_empty() || prefix.eq_ignore_ascii_case("term")) {
            return Err(invalid());
        }
        Term::from_number(number as u8).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Term {
    type Error = FeeError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        term.label().to_string()
    }
}

/// a (term, year) pair, ordered by year then term
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcademicPeriod {
    pub year: i32,
    pub term: Term,
}

impl AcademicPeriod {
    pub fn new(term: Term, year: i32) -> Self {
        Self { year, term }
    }

    /// parse the raw strings the stores and the ui pass around
    pub fn parse(term: &str, year: &str) -> Result<Self> {
        let term = term.parse()?;
        let year = year.trim().parse().map_err(|_| FeeError::InvalidYear {
            value: year.to_string(),
        })?;
        Ok(Self::new(term, year))
    }

    /// period a calendar instant falls into
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self::new(Term::from_month(at.month()), at.year())
    }

    pub fn containing_date(date: NaiveDate) -> Self {
        Self::new(Term::from_month(date.month()), date.year())
    }

    /// term immediately before this one, rolling back over the year boundary.
    /// The year saturates at the ends of the `i32` range.
    pub fn previous(&self) -> Self {
        let year = match self.term {
            Term::Term1 => self.year.saturating_sub(1),
            _ => self.year,
        };
        Self::new(self.term.previous(), year)
    }

    pub fn next(&self) -> Self {
        let year = match self.term {
            Term::Term3 => self.year.saturating_add(1),
            _ => self.year,
        };
        Self::new(self.term.next(), year)
    }

    pub fn year_label(&self) -> String {
        self.year.to_string()
    }
}

impl fmt::Display for AcademicPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.term, self.year)
    }
}

/// residence type, governs which fee items apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidenceType {
    Day,
    Boarding,
}

impl ResidenceType {
    /// case-insensitive; anything unrecognised is treated as unknown
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "day scholar" => Some(ResidenceType::Day),
            "boarding" | "boarder" => Some(ResidenceType::Boarding),
            _ => None,
        }
    }
}

/// how often a fee item is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FeeFrequency {
    #[default]
    Termly,
    Annually,
    Monthly,
    Once,
    Other,
}

impl From<String> for FeeFrequency {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "termly" | "per term" => FeeFrequency::Termly,
            "annually" | "annual" | "yearly" => FeeFrequency::Annually,
            "monthly" => FeeFrequency::Monthly,
            "once" | "one-time" | "one time" => FeeFrequency::Once,
            _ => FeeFrequency::Other,
        }
    }
}

/// billable fee item as held by the fee-structure store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeItem {
    #[serde(default, alias = "_id", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub fee_name: String,
    #[serde(default, deserialize_with = "coerce_money")]
    pub amount: Money,
    #[serde(default)]
    pub frequency: FeeFrequency,
    #[serde(default, deserialize_with = "lenient_string")]
    pub term: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, alias = "class")]
    pub class_name: String,
}

impl FeeItem {
    pub fn new(fee_name: &str, amount: Money) -> Self {
        Self {
            id: String::new(),
            fee_name: fee_name.to_string(),
            amount,
            frequency: FeeFrequency::Termly,
            term: None,
            year: None,
            class_name: String::new(),
        }
    }

    pub fn for_class(mut self, class_name: &str, period: AcademicPeriod) -> Self {
        self.class_name = class_name.to_string();
        self.term = Some(period.term.label().to_string());
        self.year = Some(period.year_label());
        self
    }
}

/// the slice of a student record the reconciliation engine needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "_id", deserialize_with = "lenient_id")]
    pub id: StudentId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "class", alias = "className")]
    pub class_name: String,
    #[serde(default, deserialize_with = "residence_from_wire")]
    pub residence_type: Option<ResidenceType>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn new(id: &str, name: &str, class_name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            class_name: class_name.to_string(),
            residence_type: None,
            created_at: None,
        }
    }

    pub fn with_residence(mut self, residence: ResidenceType) -> Self {
        self.residence_type = Some(residence);
        self
    }

    pub fn admitted_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// status of a payment or financial record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Pending,
    Overdue,
    Other,
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "paid" => PaymentStatus::Paid,
            "pending" => PaymentStatus::Pending,
            "overdue" => PaymentStatus::Overdue,
            _ => PaymentStatus::Other,
        }
    }
}

/// kind of financial record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RecordType {
    #[default]
    Payment,
    Sponsorship,
    Charge,
    Refund,
    Other,
}

impl From<String> for RecordType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "payment" => RecordType::Payment,
            "sponsorship" => RecordType::Sponsorship,
            "charge" | "fee" => RecordType::Charge,
            "refund" => RecordType::Refund,
            _ => RecordType::Other,
        }
    }
}

impl RecordType {
    /// record kinds that reduce what a student owes
    pub fn counts_as_payment(&self) -> bool {
        matches!(self, RecordType::Payment | RecordType::Sponsorship)
    }
}

/// payment or financial record as held by the payment store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub student_id: StudentId,
    #[serde(rename = "type", default)]
    pub record_type: RecordType,
    #[serde(default, alias = "category")]
    pub billing_type: String,
    #[serde(default, deserialize_with = "coerce_money")]
    pub amount: Money,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, deserialize_with = "lenient_string")]
    pub term: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub date: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn paid(student_id: &str, billing_type: &str, amount: Money) -> Self {
        Self {
            student_id: student_id.to_string(),
            record_type: RecordType::Payment,
            billing_type: billing_type.to_string(),
            amount,
            status: PaymentStatus::Paid,
            term: None,
            year: None,
            date: None,
        }
    }

    pub fn in_period(mut self, period: AcademicPeriod) -> Self {
        self.term = Some(period.term.label().to_string());
        self.year = Some(period.year_label());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_string(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
    }))
}

fn residence_from_wire<'de, D>(deserializer: D) -> std::result::Result<Option<ResidenceType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ResidenceType::parse))
}
