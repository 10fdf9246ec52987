// ============================================================================
// Catalog Domain - Categories and menu items
// ============================================================================
//
// Read-mostly data authored by administrators. Order creation reads current
// prices from here and snapshots them into order lines.
//
// ============================================================================

pub mod value_objects;

pub use value_objects::*;
