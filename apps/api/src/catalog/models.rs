use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rate every consumer assumes for a category a card does not list.
pub const DEFAULT_REWARD_RATE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[default]
    Cashback,
    Points,
    Miles,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Cashback => "cashback",
            RewardType::Points => "points",
            RewardType::Miles => "miles",
        }
    }
}

/// Cents-per-point valuation of a card's rewards currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointValue {
    #[serde(default = "default_point_value")]
    pub base_value: f64,
    #[serde(default = "default_point_value")]
    pub best_value: f64,
    #[serde(default = "default_redemption")]
    pub best_redemption: String,
}

impl Default for PointValue {
    fn default() -> Self {
        Self {
            base_value: 1.0,
            best_value: 1.0,
            best_redemption: default_redemption(),
        }
    }
}

fn default_point_value() -> f64 {
    1.0
}

fn default_redemption() -> String {
    "Statement credit".to_string()
}

/// Coverage notes for one bonus category. Unlisted keys are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_covered: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A credit card as stored in `cards.json`.
///
/// Only the fields the recommender and the chat context read are typed; everything else
/// in the document (colour, image, credits, rotating categories, ...) is preserved in
/// `extra` and served back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    pub id: String,
    pub name: String,
    pub issuer: String,
    #[serde(default)]
    pub annual_fee: f64,
    /// Category id → reward rate. Read through [`CreditCard::rate_for`], never directly.
    #[serde(default)]
    pub categories: BTreeMap<String, f64>,
    #[serde(default)]
    pub special_offers: Vec<String>,
    #[serde(default)]
    pub reward_type: RewardType,
    #[serde(default)]
    pub point_value: PointValue,
    #[serde(default)]
    pub exclusions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub spending_caps: BTreeMap<String, String>,
    #[serde(default)]
    pub category_details: BTreeMap<String, CategoryDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreditCard {
    #[cfg(test)]
    pub fn new(id: &str, name: &str, issuer: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            issuer: issuer.to_string(),
            annual_fee: 0.0,
            categories: BTreeMap::new(),
            special_offers: Vec::new(),
            reward_type: RewardType::default(),
            point_value: PointValue::default(),
            exclusions: BTreeMap::new(),
            spending_caps: BTreeMap::new(),
            category_details: BTreeMap::new(),
            notes: None,
            source_url: None,
            extra: Map::new(),
        }
    }

    #[cfg(test)]
    pub fn with_rate(mut self, category_id: &str, rate: f64) -> Self {
        self.categories.insert(category_id.to_string(), rate);
        self
    }

    /// Reward rate for `category_id`, falling back to [`DEFAULT_REWARD_RATE`].
    pub fn rate_for(&self, category_id: &str) -> f64 {
        self.categories
            .get(category_id)
            .copied()
            .unwrap_or(DEFAULT_REWARD_RATE)
    }

    /// "Issuer Name", the way cards are referred to in answers.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.issuer, self.name)
    }
}

/// On-disk shape of `cards.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardsDocument {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub cards: Vec<CreditCard>,
}

/// One immutable, loaded version of the card catalog.
#[derive(Debug, Clone, Default)]
pub struct CardCatalog {
    cards: Vec<CreditCard>,
    last_updated: Option<String>,
}

impl CardCatalog {
    #[cfg(test)]
    pub fn new(cards: Vec<CreditCard>) -> Self {
        Self {
            cards,
            last_updated: None,
        }
    }

    pub fn cards(&self) -> &[CreditCard] {
        &self.cards
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl From<CardsDocument> for CardCatalog {
    fn from(doc: CardsDocument) -> Self {
        Self {
            cards: doc.cards,
            last_updated: doc.last_updated,
        }
    }
}
