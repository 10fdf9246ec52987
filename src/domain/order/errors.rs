use uuid::Uuid;

use super::value_objects::OrderStatus;
use crate::storage::StorageError;
use crate::utils::IsTransient;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Menu item not found: {0}")]
    UnknownMenuItem(Uuid),

    #[error("Menu item is not available: {0}")]
    InactiveMenuItem(Uuid),

    #[error("Order total exceeds the largest payable amount")]
    AmountOutOfRange,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    Storage(StorageError),
}

impl OrderError {
    /// Machine-readable kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::EmptyItems
            | OrderError::InvalidQuantity(_)
            | OrderError::UnknownMenuItem(_)
            | OrderError::InactiveMenuItem(_)
            | OrderError::AmountOutOfRange
            | OrderError::Validation(_)
            | OrderError::InvalidTransition { .. } => "validation",
            OrderError::NotFound(_) => "not_found",
            OrderError::Conflict(_) => "conflict",
            OrderError::Storage(_) => "storage",
        }
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(what) => OrderError::Conflict(what),
            StorageError::MissingReference(what) => OrderError::Validation(format!("unknown {what}")),
            other => OrderError::Storage(other),
        }
    }
}

/// Only order number collisions are worth retrying with a fresh number.
impl IsTransient for OrderError {
    fn is_transient(&self) -> bool {
        matches!(self, OrderError::Conflict(_))
    }
}
