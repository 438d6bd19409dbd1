use std::sync::Arc;

use crate::admission::AdmissionTermGate;
use crate::fees::{FeeStructure, FeeStructureCache};
use crate::store::FeeStructureStore;
use crate::types::{AcademicPeriod, FeeItem, Student, Term};

/// where a resolved fee structure came from
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionSource {
    Store,
    Cache,
    /// no class name given
    EmptyInput,
    /// requested period precedes the student's admission
    Gated { admitted: AcademicPeriod },
    /// the store failed; the reason is logged and the result is empty
    Degraded { reason: String },
}

/// fee structure plus provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub structure: FeeStructure,
    pub source: ResolutionSource,
}

impl Resolution {
    fn empty(source: ResolutionSource) -> Self {
        Self {
            structure: FeeStructure::empty(),
            source,
        }
    }
}

/// determines the billable fee items for a class and period
pub struct FeeStructureResolver {
    store: Arc<dyn FeeStructureStore>,
    cache: Arc<FeeStructureCache>,
    gate: AdmissionTermGate,
}

impl FeeStructureResolver {
    pub fn new(
        store: Arc<dyn FeeStructureStore>,
        cache: Arc<FeeStructureCache>,
        gate: AdmissionTermGate,
    ) -> Self {
        Self { store, cache, gate }
    }

    pub fn cache(&self) -> &Arc<FeeStructureCache> {
        &self.cache
    }

    pub fn gate(&self) -> &AdmissionTermGate {
        &self.gate
    }

    /// `{items, total}` for a class; never fails
    pub async fn resolve(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
        student: Option<&Student>,
    ) -> FeeStructure {
        self.resolve_detailed(class_name, period, student).await.structure
    }

    pub async fn resolve_detailed(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
        student: Option<&Student>,
    ) -> Resolution {
        let class_name = class_name.trim();
        if class_name.is_empty() {
            return Resolution::empty(ResolutionSource::EmptyInput);
        }

        if let (Some(student), Some(requested)) = (student, period) {
            let admitted = self.gate.admission_term(student);
            if AdmissionTermGate::is_before(requested, admitted) {
                tracing::debug!(
                    student_id = %student.id,
                    %requested,
                    %admitted,
                    "period precedes admission, no fees owed"
                );
                return Resolution::empty(ResolutionSource::Gated { admitted });
            }
        }

        if let Some(cached) = self.cache.get(class_name, period) {
            tracing::debug!(class_name, ?period, "fee structure cache hit");
            return Resolution {
                structure: cached,
                source: ResolutionSource::Cache,
            };
        }

        let generation = self.cache.generation(class_name);
        match self.store.fee_structures(class_name, period).await {
            Ok(items) => {
                let items = match period {
                    Some(period) => Self::retain_period(items, period),
                    None => items,
                };
                let structure = FeeStructure::from_items(items);
                if !self.cache.set(class_name, period, structure.clone(), generation) {
                    tracing::debug!(class_name, ?period, "class invalidated during fetch, result not cached");
                }
                Resolution {
                    structure,
                    source: ResolutionSource::Store,
                }
            }
            Err(err) => {
                tracing::warn!(class_name, ?period, error = %err, "fee-structure store unavailable, using empty fee structure");
                Resolution::empty(ResolutionSource::Degraded {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// drop items whose own term/year metadata contradicts the request, in
    /// case the store ignored the query; untagged or unparsable items stay
    fn retain_period(items: Vec<FeeItem>, period: AcademicPeriod) -> Vec<FeeItem> {
        items
            .into_iter()
            .filter(|item| {
                let term_ok = item
                    .term
                    .as_deref()
                    .and_then(|raw| raw.parse::<Term>().ok())
                    .map_or(true, |term| term == period.term);
                let year_ok = item
                    .year
                    .as_deref()
                    .and_then(|raw| raw.trim().parse::<i32>().ok())
                    .map_or(true, |year| year == period.year);
                term_ok && year_ok
            })
            .collect()
    }
}
