use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::BillingConfig;

/// version of the built-in synonym table; bump when entries change
pub const BUILTIN_TABLE_VERSION: u32 = 1;

/// normalized billing category used to match fees against payments
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingKey(String);

impl BillingKey {
    pub const GENERAL: &'static str = "general";

    pub fn general() -> Self {
        BillingKey(Self::GENERAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_general(&self) -> bool {
        self.0 == Self::GENERAL
    }
}

impl fmt::Display for BillingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// (raw name, canonical category)
const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    ("tuition", "tuition"),
    ("tuition fee", "tuition"),
    ("tuition fees", "tuition"),
    ("school fees", "tuition"),
    ("uniform", "uniform"),
    ("uniform fee", "uniform"),
    ("uniforms", "uniform"),
    ("library", "library"),
    ("library fee", "library"),
    ("boarding", "boarding"),
    ("boarding fee", "boarding"),
    ("boarding fees", "boarding"),
    ("accommodation", "boarding"),
    ("lunch", "lunch"),
    ("lunch fee", "lunch"),
    ("luch", "lunch"),
    ("meals", "lunch"),
    ("exam", "examination"),
    ("exams", "examination"),
    ("exam fee", "examination"),
    ("exam fees", "examination"),
    ("examination", "examination"),
    ("examination fee", "examination"),
    ("examination fees", "examination"),
    ("transport", "transport"),
    ("transport fee", "transport"),
    ("bus fee", "transport"),
    ("medical", "medical"),
    ("medical fee", "medical"),
    ("sports", "sports"),
    ("sports fee", "sports"),
    ("registration", "registration"),
    ("registration fee", "registration"),
    ("admission fee", "registration"),
    ("development", "general"),
    ("development fee", "general"),
    ("general", "general"),
    ("general/development", "general"),
];

/// explicit, versioned map from raw billing names to canonical categories
#[derive(Debug, Clone)]
pub struct BillingTypeTable {
    version: u32,
    entries: HashMap<String, String>,
}

impl Default for BillingTypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BillingTypeTable {
    pub fn builtin() -> Self {
        let entries = BUILTIN_SYNONYMS
            .iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
            .collect();
        Self {
            version: BUILTIN_TABLE_VERSION,
            entries,
        }
    }

    /// built-in table with configured entries layered on top
    pub fn from_config(config: &BillingConfig) -> Self {
        let mut table = Self::builtin();
        for (raw, canonical) in &config.synonyms {
            table.insert(raw, canonical);
        }
        if let Some(version) = config.version {
            table.version = version;
        }
        table
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn insert(&mut self, raw: &str, canonical: &str) {
        self.entries.insert(clean(raw), clean(canonical));
    }

    /// canonical key for a raw billing or fee name
    pub fn normalize(&self, raw: &str) -> BillingKey {
        let cleaned = clean(raw);
        match self.entries.get(&cleaned) {
            Some(canonical) => BillingKey(canonical.clone()),
            None if cleaned.is_empty() => BillingKey::general(),
            None => BillingKey(cleaned),
        }
    }

    /// true when the table has an entry for `raw`
    pub fn knows(&self, raw: &str) -> bool {
        self.entries.contains_key(&clean(raw))
    }
}

/// trim, lower-case and collapse inner whitespace
fn clean(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_synonyms_fold_to_one_key() {
        let table = BillingTypeTable::builtin();

        assert_eq!(table.normalize("Uniform"), table.normalize("Uniform Fee"));
        assert_eq!(table.normalize("  TUITION   fees "), table.normalize("tuition"));
        assert_eq!(table.normalize("Development Fee"), BillingKey::general());
        assert_eq!(table.normalize("Luch"), table.normalize("Lunch"));
    }

    #[test]
    fn test_unknown_names_keep_their_own_key() {
        let table = BillingTypeTable::builtin();

        assert_eq!(table.normalize("Swimming  Gala").as_str(), "swimming gala");
        assert!(!table.knows("Swimming Gala"));
        assert!(table.normalize("").is_general());
    }

    #[test]
    fn test_config_overrides() {
        let mut synonyms = BTreeMap::new();
        synonyms.insert("Bus Fare".to_string(), "Transport".to_string());
        synonyms.insert("Meals".to_string(), "catering".to_string());
        let config = BillingConfig {
            version: Some(7),
            synonyms,
        };

        let table = BillingTypeTable::from_config(&config);
        assert_eq!(table.version(), 7);
        assert_eq!(table.normalize("bus fare").as_str(), "transport");
        assert_eq!(table.normalize("meals").as_str(), "catering");
        assert_eq!(BillingTypeTable::builtin().version(), BUILTIN_TABLE_VERSION);
    }
}
