// ============================================================================
// Cart - client-resident shopping cart
// ============================================================================
//
// Lives in the customer's app, never on the server. A CartSession pairs the
// in-memory Cart with an injected CartStore so the cart survives reloads.
//
// ============================================================================

pub mod model;
pub mod session;
pub mod store;

pub use model::{Cart, CartLine};
pub use session::CartSession;
pub use store::{CartError, CartStore, JsonFileCartStore, MemoryCartStore};
