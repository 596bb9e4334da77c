// Prompt text for the CardNinja assistant and the per-card summary lines it is built from.

use crate::catalog::categories::CategoryCatalog;
use crate::catalog::models::{CreditCard, RewardType};
use crate::catalog::ranker::Recommendation;

/// Fixed redirect for questions that are not about cards or rewards.
pub const OFF_TOPIC_REPLY: &str = "🥷 I'm CardNinja, your credit card rewards expert! \
    I specialize in helping you maximize points and cash back on your purchases. \
    Ask me about which card to use for groceries, travel, dining, or any other spending category!";

/// Context template. Replace `{cards}`, `{question}` and `{category}` before sending.
pub const CONTEXT_TEMPLATE: &str = r#"### Role
You are "CardNinja", a credit card rewards optimization expert. Help the user earn the most cash back or points for every dollar they spend, using only the cards listed below.

### Stay on topic
Only answer questions about credit cards, rewards, points, cash back, card benefits, annual fees, spending categories and redemption strategies. For anything else, reply with exactly:
"{off_topic}"

### Available Credit Cards
{cards}

### The Question
{question}

### Detected Category
Based on the query, the most likely spending category is: {category}

### Instructions
1. If the question is not about credit cards or rewards, redirect as described above.
2. Find the card with the highest reward rate for this merchant or category.
3. Estimate the effective return, taking point valuations into account.
4. Check the "NOT covered" and "EXCLUDES" notes. Never recommend a bonus rate for a merchant the card does not cover; warn the user and suggest an alternative instead.
5. Mention spending caps that could affect the recommendation.
6. Briefly explain why the card wins (category match, point value, offers).
7. Mention the best redemption when it matters.
8. Name a runner-up card as a backup.
9. Keep the answer concise, friendly and actionable.
10. If the category is unclear, ask what they are buying.
"#;

/// Formats a rate without trailing zeros: `4.0` → `4`, `1.50` → `1.5`.
pub fn fmt_rate(rate: f64) -> String {
    let s = format!("{rate:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Builds the system context for one chat turn.
pub fn build_context(
    recommendation: &Recommendation<'_>,
    categories: &CategoryCatalog,
    cards: &[CreditCard],
    user_query: &str,
) -> String {
    let cards_text = cards
        .iter()
        .map(|card| card_summary(card, categories))
        .collect::<Vec<_>>()
        .join("\n");

    CONTEXT_TEMPLATE
        .replace("{off_topic}", OFF_TOPIC_REPLY)
        .replace("{cards}", &cards_text)
        .replace("{question}", user_query)
        .replace("{category}", &recommendation.category.name)
}

/// One bullet line describing a card's rewards, caps and coverage gaps.
pub fn card_summary(card: &CreditCard, categories: &CategoryCatalog) -> String {
    let mut bonus: Vec<(&str, f64)> = card
        .categories
        .iter()
        .filter(|(_, rate)| **rate > 1.0)
        .map(|(id, rate)| (id.as_str(), *rate))
        .collect();
    bonus.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut rewards: Vec<String> = bonus
        .iter()
        .take(3)
        .map(|(id, rate)| format!("{}% on {}", fmt_rate(*rate), categories.name_of(id)))
        .collect();
    rewards.push(format!(
        "{}% on everything else",
        fmt_rate(card.rate_for("other"))
    ));

    let mut line = format!("- {}: {}.", card.display_name(), rewards.join(", "));

    let value = &card.point_value;
    if card.reward_type != RewardType::Cashback && value.best_value > 1.0 {
        let unit = if card.reward_type == RewardType::Miles {
            "Miles"
        } else {
            "Points"
        };
        line.push_str(&format!(
            " [{unit} worth up to {}¢ via {}]",
            fmt_rate(value.best_value),
            value.best_redemption
        ));
    }

    let caps: Vec<String> = card
        .spending_caps
        .iter()
        .take(2)
        .map(|(cat, cap)| format!("{cat}: {cap}"))
        .collect();
    if !caps.is_empty() {
        line.push_str(&format!(" [Caps: {}]", caps.join(", ")));
    }

    let excluded: Vec<&str> = card
        .exclusions
        .values()
        .flat_map(|list| list.iter().take(2))
        .take(3)
        .map(String::as_str)
        .collect();
    if !excluded.is_empty() {
        line.push_str(&format!(" ⚠️ EXCLUDES: {}", excluded.join("; ")));
    }

    let not_covered: Vec<String> = card
        .category_details
        .iter()
        .filter(|(_, details)| !details.not_covered.is_empty())
        .map(|(cat, details)| {
            let items: Vec<&str> = details.not_covered.iter().take(3).map(String::as_str).collect();
            format!("{cat} NOT covered: {}", items.join(", "))
        })
        .collect();
    if !not_covered.is_empty() {
        line.push_str(&format!(" 🚫 {}", not_covered.join("; ")));
    }

    if let Some(notes) = card.notes.as_deref().filter(|n| !n.is_empty() && n.len() < 100) {
        line.push_str(&format!(" ℹ️ {notes}"));
    }

    if let Some(url) = card.source_url.as_deref().filter(|u| !u.is_empty()) {
        line.push_str(&format!(" | URL: {url}"));
    }

    line
}
