// Catalog domain model
use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural sampling cadence of a series; drives cache expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub code: u32,
    pub canonical_name: String,
    pub description: String,
    pub periodicity: Periodicity,
    pub unit: String,
    pub aliases: Vec<String>,
}

impl CatalogEntry {
    pub fn new(
        code: u32,
        canonical_name: &str,
        description: &str,
        periodicity: Periodicity,
        unit: &str,
        aliases: &[&str],
    ) -> Self {
        Self {
            code,
            canonical_name: canonical_name.to_string(),
            description: description.to_string(),
            periodicity,
            unit: unit.to_string(),
            aliases: aliases.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    /// Case-insensitive substring match over name, description and aliases.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.canonical_name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.aliases.iter().any(|a| a.contains(needle))
    }
}
