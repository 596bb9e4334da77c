//! Password-gated maintenance endpoints.

pub mod handlers;
