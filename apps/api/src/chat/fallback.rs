//! Rule-based answers used when the language model is unavailable.

use crate::catalog::categories::CategoryCatalog;
use crate::catalog::models::{CreditCard, RewardType};
use crate::catalog::ranker::{best_card_for_query, top_cards_for_category};
use crate::chat::prompts::{fmt_rate, OFF_TOPIC_REPLY};

/// Words that mark a message as being about cards or spending.
const CREDIT_KEYWORDS: &[&str] = &[
    "card", "credit", "cash back", "cashback", "points", "rewards", "miles", "purchase", "buy",
    "spend", "grocery", "groceries", "dining", "restaurant", "travel", "hotel", "flight", "gas",
    "fuel", "amazon", "online", "shopping", "streaming", "netflix", "uber", "lyft", "transit",
    "drugstore", "pharmacy", "best card", "which card", "recommend", "annual fee", "bonus",
    "offer",
];

/// Merchants commonly carved out of grocery and shopping bonuses.
const COMMONLY_EXCLUDED_MERCHANTS: &[&str] =
    &["target", "walmart", "costco", "sam's club", "bj's", "wholesale"];

const CLARIFY_REPLY: &str = "I'd be happy to help you find the best credit card! \
    Could you tell me more specifically what you're looking to purchase? \
    For example, is it groceries, dining, gas, travel, or online shopping?";

const NO_CARDS_REPLY: &str = "I don't have any card data loaded right now, so I can't make a \
    recommendation yet. Please try again once the card catalog has been updated.";

pub fn is_credit_related(message: &str) -> bool {
    let lower = message.to_lowercase();
    CREDIT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Builds a deterministic answer from the catalog alone.
pub fn fallback_reply(categories: &CategoryCatalog, cards: &[CreditCard], message: &str) -> String {
    if !is_credit_related(message) {
        return OFF_TOPIC_REPLY.to_string();
    }

    let recommendation = best_card_for_query(categories, cards, message);
    let category = recommendation.category;
    if category.is_fallback() {
        return CLARIFY_REPLY.to_string();
    }

    let Some(card) = recommendation.card else {
        return NO_CARDS_REPLY.to_string();
    };
    let cashback = recommendation.cashback;
    let lower = message.to_lowercase();

    let exclusions: &[String] = card
        .exclusions
        .get(&category.id)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let excluded_merchant = mentioned_exclusion(&lower, exclusions);
    let runner_up = top_cards_for_category(cards, &category.id, 2)
        .into_iter()
        .nth(1);

    let earn = match card.reward_type {
        RewardType::Points | RewardType::Miles => {
            format!("{}x {}", fmt_rate(cashback), card.reward_type.as_str())
        }
        RewardType::Cashback => format!("{}% cash back", fmt_rate(cashback)),
    };
    let mut reply = format!(
        "For **{}** purchases, I recommend the **{}** — you'll earn **{earn}**!\n\n",
        category.name,
        card.display_name()
    );

    match &excluded_merchant {
        Some(merchant) => {
            reply.push_str(&format!(
                "**⚠️ Warning:** {merchant} is typically **excluded** from this card's {} bonus! \
                 You'll only earn the base rate (1%).\n\n",
                category.name
            ));
            if let Some(alt) = runner_up {
                reply.push_str(&format!(
                    "**Better option for {merchant}:** Consider using **{}** or a flat-rate card instead.\n\n",
                    alt.display_name()
                ));
            }
        }
        None => reply.push_str(&format!(
            "**Why this card?** It offers the highest rewards rate in the {} category among your available cards.",
            category.name
        )),
    }

    if excluded_merchant.is_none() && !exclusions.is_empty() {
        let listed: Vec<&str> = exclusions.iter().take(2).map(String::as_str).collect();
        reply.push_str(&format!(
            "\n\n**⚠️ Note:** This card excludes: {}.",
            listed.join(", ")
        ));
    }

    if let Some(cap) = card
        .spending_caps
        .get(&category.id)
        .or_else(|| card.spending_caps.get("top_category"))
    {
        reply.push_str(&format!("\n\n**📊 Spending cap:** {cap}"));
    }

    let value = &card.point_value;
    if excluded_merchant.is_none() && value.best_value > 1.0 && !value.best_redemption.is_empty() {
        reply.push_str(&format!(
            "\n\n**💡 Pro tip:** These {} can be worth up to **{}¢ each** ({}% effective return) when you {}.",
            card.reward_type.as_str(),
            fmt_rate(value.best_value),
            fmt_rate(cashback * value.best_value),
            value.best_redemption.to_lowercase()
        ));
    }

    if let (Some(alt), None) = (runner_up, &excluded_merchant) {
        reply.push_str(&format!(
            "\n\n**Runner-up:** {} at {}% — a solid backup if the primary card is declined.",
            alt.display_name(),
            fmt_rate(alt.rate_for(&category.id))
        ));
    }

    reply
}

/// A commonly excluded merchant named in the query that this card's exclusions list too.
fn mentioned_exclusion(lower_query: &str, exclusions: &[String]) -> Option<String> {
    COMMONLY_EXCLUDED_MERCHANTS
        .iter()
        .find(|merchant| {
            lower_query.contains(*merchant)
                && exclusions
                    .iter()
                    .any(|e| e.to_lowercase().contains(*merchant))
        })
        .map(|merchant| title_case(merchant))
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
