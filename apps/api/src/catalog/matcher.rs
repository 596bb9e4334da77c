//! Free-text category detection.
//!
//! Plain substring matching over each category's keyword list. Catalog order is the
//! priority order: the first category with any matching keyword wins, so "grocery dining"
//! resolves to dining because dining is listed first.

use crate::catalog::categories::{Category, CategoryCatalog};

impl CategoryCatalog {
    /// Detects the spending category of `query`. Never fails: queries with no keyword
    /// hit, including the empty string, resolve to the `"other"` category.
    pub fn detect(&self, query: &str) -> &Category {
        let query = query.to_lowercase();

        self.all()
            .iter()
            .find(|category| category.keywords.iter().any(|kw| query.contains(kw.as_str())))
            .unwrap_or_else(|| self.fallback())
    }
}
