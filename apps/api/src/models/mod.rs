pub mod placeholder;
pub mod session;

pub use placeholder::{FieldType, Placeholder};
pub use session::{ConversationMessage, Role, Session};
