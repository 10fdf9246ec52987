// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, OrderItem, OrderStatus, Owner)
// - Commands (PlaceOrder, SetStatus)
// - Errors (OrderError)
// - Aggregate (OrderDraft pricing, transition policy)
// - Order numbers (OrderNumberGenerator)
// - Command handler (OrderCommandHandler)
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod commands;
pub mod errors;
pub mod order_number;
pub mod value_objects;

pub use aggregate::*;
pub use command_handler::*;
pub use commands::*;
pub use errors::*;
pub use order_number::*;
pub use value_objects::*;
