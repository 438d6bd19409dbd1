pub mod cache;
pub mod residence;
pub mod resolver;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::FeeItem;

pub use cache::{AdvisoryCache, CacheGeneration, FeeStructureCache};
pub use residence::ResidenceFilter;
pub use resolver::{FeeStructureResolver, Resolution, ResolutionSource};

/// applicable fee items and their total
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeStructure {
    pub items: Vec<FeeItem>,
    pub total: Money,
}

impl FeeStructure {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<FeeItem>) -> Self {
        let total = items.iter().map(|item| item.amount).sum();
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, fee_name: &str) -> Option<&FeeItem> {
        self.items
            .iter()
            .find(|item| item.fee_name.eq_ignore_ascii_case(fee_name))
    }
}
