pub mod auth;
pub mod catalog;
pub mod error;
pub mod orders;
pub mod payloads;
pub mod server;
pub mod telegram_auth;

pub use error::ApiError;
pub use server::{configure, start_api_server, AppState};
pub use telegram_auth::InitDataVerifier;
