// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Catalog and identity records, shared pricing rules, and the order core.
// Nothing in here talks to PostgreSQL or Telegram directly; persistence and
// notification come in through the traits in `storage` and `messaging`.
//
// ============================================================================

pub mod catalog;
pub mod identity;
pub mod order;
pub mod pricing;
