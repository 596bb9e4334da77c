//! Card ranking by category reward rate.

use serde::Serialize;

use crate::catalog::categories::{Category, CategoryCatalog};
use crate::catalog::models::CreditCard;

/// Default number of cards returned per category.
pub const DEFAULT_TOP_N: usize = 3;

/// Best card for a free-text query.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation<'a> {
    pub category: &'a Category,
    /// `None` only when the card catalog is empty.
    pub card: Option<&'a CreditCard>,
    pub cashback: f64,
}

/// Returns up to `limit` cards ordered by descending reward rate for `category_id`.
///
/// The catalog itself is left untouched. The sort is stable, so cards with equal rates
/// keep their catalog order; an unknown category ranks every card at the default rate and
/// therefore yields catalog order.
pub fn top_cards_for_category<'a>(
    cards: &'a [CreditCard],
    category_id: &str,
    limit: usize,
) -> Vec<&'a CreditCard> {
    let mut ranked: Vec<&CreditCard> = cards.iter().collect();
    ranked.sort_by(|a, b| b.rate_for(category_id).total_cmp(&a.rate_for(category_id)));
    ranked.truncate(limit);
    ranked
}

/// Detects the query's category, then picks the top card for it.
pub fn best_card_for_query<'a>(
    categories: &'a CategoryCatalog,
    cards: &'a [CreditCard],
    query: &str,
) -> Recommendation<'a> {
    let category = categories.detect(query);
    let card = top_cards_for_category(cards, &category.id, 1)
        .into_iter()
        .next();

    Recommendation {
        category,
        card,
        cashback: card.map(|c| c.rate_for(&category.id)).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(cards: &[&CreditCard]) -> Vec<String> {
        cards.iter().map(|c| c.id.clone()).collect()
    }

    fn sample_cards() -> Vec<CreditCard> {
        vec![
            CreditCard::new("a", "Card A", "Bank One").with_rate("dining", 4.0),
            CreditCard::new("b", "Card B", "Bank Two"),
            CreditCard::new("c", "Card C", "Bank Three").with_rate("dining", 5.0),
        ]
    }

    #[test]
    fn test_top_two_dining() {
        let cards = sample_cards();
        let top = top_cards_for_category(&cards, "dining", 2);
        assert_eq!(ids(&top), vec!["c", "a"]);
    }

    #[test]
    fn test_absent_rate_counts_as_one() {
        let cards = vec![
            CreditCard::new("low", "Low", "X").with_rate("gas", 0.5),
            CreditCard::new("absent", "Absent", "X"),
        ];
        let top = top_cards_for_category(&cards, "gas", 2);
        assert_eq!(ids(&top), vec!["absent", "low"]);
    }

    #[test]
    fn test_unknown_category_keeps_catalog_order() {
        let cards = sample_cards();
        let top = top_cards_for_category(&cards, "no-such-category", 10);
        assert_eq!(ids(&top), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let cards = vec![
            CreditCard::new("first", "F", "X").with_rate("travel", 3.0),
            CreditCard::new("second", "S", "X").with_rate("travel", 3.0),
            CreditCard::new("best", "B", "X").with_rate("travel", 5.0),
            CreditCard::new("third", "T", "X").with_rate("travel", 3.0),
        ];
        let top = top_cards_for_category(&cards, "travel", 4);
        assert_eq!(ids(&top), vec!["best", "first", "second", "third"]);
    }

    #[test]
    fn test_length_is_min_of_limit_and_catalog() {
        let cards = sample_cards();
        for limit in 0..6 {
            let top = top_cards_for_category(&cards, "dining", limit);
            assert_eq!(top.len(), limit.min(cards.len()));
            assert!(top
                .windows(2)
                .all(|w| w[0].rate_for("dining") >= w[1].rate_for("dining")));
        }
    }

    #[test]
    fn test_ranking_is_idempotent_and_non_mutating() {
        let cards = sample_cards();
        let before = cards.clone();
        let first = ids(&top_cards_for_category(&cards, "dining", 3));
        let second = ids(&top_cards_for_category(&cards, "dining", 3));
        assert_eq!(first, second);
        assert_eq!(cards, before);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(top_cards_for_category(&[], "dining", 3).is_empty());
    }

    #[test]
    fn test_best_card_for_streaming_query() {
        let categories = CategoryCatalog::builtin().unwrap();
        let cards = vec![
            CreditCard::new("flat", "Flat", "X").with_rate("streaming", 2.0),
            CreditCard::new("stream", "Stream", "Y").with_rate("streaming", 6.0),
            CreditCard::new("dine", "Dine", "Z").with_rate("dining", 4.0),
        ];

        let rec = best_card_for_query(&categories, &cards, "best card for Netflix");
        assert_eq!(rec.category.id, "streaming");
        assert_eq!(rec.card.map(|c| c.id.as_str()), Some("stream"));
        assert_eq!(rec.cashback, 6.0);
    }

    #[test]
    fn test_best_card_cashback_defaults_to_one() {
        let categories = CategoryCatalog::builtin().unwrap();
        let cards = vec![CreditCard::new("plain", "Plain", "X")];

        let rec = best_card_for_query(&categories, &cards, "bus pass");
        assert_eq!(rec.category.id, "transit");
        assert_eq!(rec.cashback, 1.0);
    }

    #[test]
    fn test_best_card_with_empty_catalog() {
        let categories = CategoryCatalog::builtin().unwrap();
        let rec = best_card_for_query(&categories, &[], "groceries");
        assert_eq!(rec.category.id, "groceries");
        assert!(rec.card.is_none());
        assert_eq!(rec.cashback, 0.0);
    }
}
