use crate::config::AdmissionConfig;
use crate::types::{AcademicPeriod, Student};

/// works out when a student joined and gates earlier terms.
///
/// A student cannot owe fees for a term that started before they were
/// enrolled. The admission term comes from `created_at` using the same month
/// ranges as [`Term::from_month`](crate::types::Term::from_month).
#[derive(Debug, Clone)]
pub struct AdmissionTermGate {
    fallback: AcademicPeriod,
}

impl Default for AdmissionTermGate {
    fn default() -> Self {
        Self::new(&AdmissionConfig::default())
    }
}

impl AdmissionTermGate {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            fallback: config.fallback,
        }
    }

    /// admission period of a student, or the configured fallback when the
    /// enrollment date is unknown
    pub fn admission_term(&self, student: &Student) -> AcademicPeriod {
        student
            .created_at
            .map(AcademicPeriod::containing)
            .unwrap_or(self.fallback)
    }

    /// true when `candidate` is strictly earlier than `admission`
    pub fn is_before(candidate: AcademicPeriod, admission: AcademicPeriod) -> bool {
        candidate.year < admission.year
            || (candidate.year == admission.year && candidate.term.number() < admission.term.number())
    }

    /// true when the student owes nothing for `candidate`
    pub fn gates(&self, student: &Student, candidate: AcademicPeriod) -> bool {
        Self::is_before(candidate, self.admission_term(student))
    }
}
