//! Spending categories, the card catalog, and the ranking over them.

pub mod categories;
pub mod handlers;
pub mod matcher;
pub mod models;
pub mod ranker;
pub mod store;
