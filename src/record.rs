use serde::{Deserialize, Serialize};

use crate::parser::text::name_key;

/// A healthcare provider as extracted from one source. Immutable once built
/// by a scraper or importer; consumed by the upsert engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderRecord {
    pub name: String,
    pub organization: Option<String>,
    pub category_names: Vec<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub hours: Option<String>,
    pub source: String,
}

impl ProviderRecord {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        ProviderRecord {
            name: name.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    /// Records without a name or source never reach the store.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.source.trim().is_empty()
    }

    /// Case-insensitive, trimmed name used for de-duplication.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Append categories from a free-text list such as `"Clinics; Therapy, HIV"`.
    /// Blank entries and repeats are dropped.
    pub fn with_category_text(mut self, text: &str) -> Self {
        for name in split_categories(text) {
            if !self.category_names.contains(&name) {
                self.category_names.push(name);
            }
        }
        self
    }

    /// Category names flattened for display/storage.
    pub fn category_text(&self) -> Option<String> {
        if self.category_names.is_empty() {
            None
        } else {
            Some(self.category_names.join(", "))
        }
    }
}

pub fn split_categories(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank optional fields are stored as NULL rather than empty strings.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ── Tests ──
