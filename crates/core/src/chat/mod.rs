pub mod backend;
pub mod quota;
pub mod session;

pub use backend::{ChatBackend, HttpChatBackend};
pub use quota::{MessageQuotaGate, FREE_MESSAGE_LIMIT};
pub use session::{ChatMessage, ChatSession, Role, SendOutcome};
