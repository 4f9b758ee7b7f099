// Catalog service - Alias resolution and metadata search
use crate::domain::catalog::CatalogEntry;
use crate::error::{Result, SgsError};
use crate::infrastructure::catalog_table::default_entries;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Immutable after construction; cheap to clone.
#[derive(Debug, Clone)]
pub struct CatalogService {
    inner: Arc<CatalogIndex>,
}

#[derive(Debug)]
struct CatalogIndex {
    entries: BTreeMap<u32, CatalogEntry>,
    aliases: HashMap<String, u32>,
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new(default_entries())
    }
}

impl CatalogService {
    /// Build the lookup tables. Canonical names resolve like aliases.
    /// A later entry claiming an alias already taken replaces the earlier mapping.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut aliases = HashMap::new();
        let mut by_code = BTreeMap::new();

        for entry in entries {
            for alias in &entry.aliases {
                aliases.insert(alias.to_lowercase(), entry.code);
            }
            aliases.insert(entry.canonical_name.to_lowercase(), entry.code);
            by_code.insert(entry.code, entry);
        }

        Self {
            inner: Arc::new(CatalogIndex {
                entries: by_code,
                aliases,
            }),
        }
    }

    /// Resolve a numeric code or a case-insensitive alias to a series code.
    pub fn resolve(&self, identifier: &str) -> Result<u32> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(SgsError::invalid("series identifier is empty"));
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return match trimmed.parse::<u32>() {
                Ok(code) if code > 0 => Ok(code),
                _ => Err(SgsError::invalid(format!(
                    "series code '{trimmed}' is out of range"
                ))),
            };
        }

        self.inner
            .aliases
            .get(&trimmed.to_lowercase())
            .copied()
            .ok_or_else(|| SgsError::UnknownSeries(trimmed.to_string()))
    }

    pub fn metadata(&self, code: u32) -> Option<&CatalogEntry> {
        self.inner.entries.get(&code)
    }

    /// Entries whose name, description or aliases contain `term`,
    /// case-insensitively, ordered by code. No match is an empty result.
    pub fn search(&self, term: &str) -> Vec<&CatalogEntry> {
        let needle = term.trim().to_lowercase();
        self.inner
            .entries
            .values()
            .filter(|entry| entry.matches(&needle))
            .collect()
    }

    pub fn list(&self) -> Vec<&CatalogEntry> {
        self.inner.entries.values().collect()
    }
}
