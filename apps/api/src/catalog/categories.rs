use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Id of the catch-all category every catalog must carry.
pub const OTHER_CATEGORY_ID: &str = "other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    /// Lowercase substrings, checked in order.
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(id: &str, name: &str, icon: &str, keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.id == OTHER_CATEGORY_ID
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("category catalog has no '{OTHER_CATEGORY_ID}' category")]
    MissingFallback,

    #[error("category catalog has more than one '{OTHER_CATEGORY_ID}' category")]
    DuplicateFallback,

    #[error("the '{OTHER_CATEGORY_ID}' category must not have keywords")]
    FallbackHasKeywords,

    #[error("duplicate category id: {0}")]
    DuplicateId(String),
}

/// Ordered, immutable list of spending categories.
///
/// Order is matching priority: [`CategoryCatalog::detect`] returns the first category
/// whose keyword appears in the query.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    fallback: usize,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut fallback = None;
        for (idx, category) in categories.iter().enumerate() {
            if categories[..idx].iter().any(|c| c.id == category.id) {
                if category.is_fallback() {
                    return Err(CatalogError::DuplicateFallback);
                }
                return Err(CatalogError::DuplicateId(category.id.clone()));
            }
            if category.is_fallback() {
                if !category.keywords.is_empty() {
                    return Err(CatalogError::FallbackHasKeywords);
                }
                fallback = Some(idx);
            }
        }

        let fallback = fallback.ok_or(CatalogError::MissingFallback)?;
        Ok(Self {
            categories,
            fallback,
        })
    }

    /// The spending categories CardNinja tracks, in matching order.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(vec![
            Category::new(
                "dining",
                "Dining",
                "🍽️",
                &[
                    "restaurant", "food", "eat", "dining", "cafe", "coffee", "doordash",
                    "ubereats", "grubhub", "chipotle", "starbucks", "mcdonald", "lunch",
                    "dinner",
                ],
            ),
            Category::new(
                "groceries",
                "Groceries",
                "🛒",
                &[
                    "grocery", "groceries", "supermarket", "whole foods", "trader joe",
                    "safeway", "kroger", "costco", "walmart grocery", "target grocery",
                    "food store",
                ],
            ),
            Category::new(
                "travel",
                "Travel",
                "✈️",
                &[
                    "flight", "airline", "hotel", "airbnb", "travel", "vacation", "delta",
                    "united", "american airlines", "southwest", "marriott", "hilton",
                    "expedia", "booking",
                ],
            ),
            Category::new(
                "gas",
                "Gas",
                "⛽",
                &[
                    "gas", "fuel", "gas station", "shell", "chevron", "exxon", "mobil", "bp",
                    "costco gas",
                ],
            ),
            Category::new(
                "streaming",
                "Streaming",
                "📺",
                &[
                    "netflix", "hulu", "disney", "hbo", "spotify", "apple music", "youtube",
                    "streaming", "subscription", "amazon prime video",
                ],
            ),
            Category::new(
                "online_shopping",
                "Online Shopping",
                "🛍️",
                &[
                    "amazon", "online", "ebay", "etsy", "wayfair", "target", "walmart",
                    "best buy", "macy", "nordstrom", "zappos", "shopping", "ecommerce",
                ],
            ),
            Category::new(
                "transit",
                "Transit",
                "🚇",
                &[
                    "uber", "lyft", "taxi", "transit", "subway", "metro", "bus", "train",
                    "commute", "rideshare",
                ],
            ),
            Category::new(
                "entertainment",
                "Entertainment",
                "🎬",
                &[
                    "movie", "theater", "concert", "entertainment", "event", "ticket",
                    "ticketmaster", "stubhub", "amc", "regal",
                ],
            ),
            Category::new(
                "drugstore",
                "Drugstore",
                "💊",
                &[
                    "cvs", "walgreens", "pharmacy", "drugstore", "rite aid", "medicine",
                    "health",
                ],
            ),
            Category::new(OTHER_CATEGORY_ID, "Other", "💳", &[]),
        ])
    }

    pub fn all(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// The `"other"` category.
    pub fn fallback(&self) -> &Category {
        &self.categories[self.fallback]
    }

    /// Display name for a category id; unknown ids are returned unchanged.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|c| c.name.as_str()).unwrap_or(id)
    }
}
