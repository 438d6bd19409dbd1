use crate::fees::FeeStructure;
use crate::types::{FeeItem, ResidenceType};

/// name fragments that only apply to boarders
const BOARDING_MARKERS: &[&str] = &["board"];

/// name fragments that only apply to day scholars; "luch" matches a
/// misspelling that exists in historical fee data
const DAY_ONLY_MARKERS: &[&str] = &["lunch", "luch"];

/// drops fee items that do not apply to a residence type
pub struct ResidenceFilter;

impl ResidenceFilter {
    /// filter `items` for `residence`; an unknown residence counts as day
    pub fn filter(items: &[FeeItem], residence: Option<ResidenceType>) -> FeeStructure {
        let kept = items
            .iter()
            .filter(|item| Self::applies(item, residence))
            .cloned()
            .collect();
        FeeStructure::from_items(kept)
    }

    pub fn applies(item: &FeeItem, residence: Option<ResidenceType>) -> bool {
        let name = item.fee_name.to_lowercase();
        let excluded = match residence.unwrap_or(ResidenceType::Day) {
            ResidenceType::Day => BOARDING_MARKERS,
            ResidenceType::Boarding => DAY_ONLY_MARKERS,
        };
        !excluded.iter().any(|marker| name.contains(marker))
    }
}
