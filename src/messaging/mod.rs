pub mod dispatcher;
pub mod telegram;
pub mod templates;

pub use dispatcher::{NotificationDispatcher, StatusNotifier};
pub use telegram::{LogOnlySender, MessageSender, NotificationError, TelegramClient};
pub use templates::message_for;
