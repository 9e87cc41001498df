pub mod cancel;
pub mod exchange;
pub mod history;
pub mod message;
pub mod value;

// Re-export key types for easier access from other switchyard modules (and lib.rs)
pub use cancel::CancelScope;
pub use exchange::{Exchange, ENVIRONMENT_KEYS};
pub use history::{HistoryRecord, MessageHistory, MESSAGE_HISTORY_HEADER};
pub use message::Message;
pub use value::{CopyValue, Value, ValueKind, ValueMap};
