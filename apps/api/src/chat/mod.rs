pub mod handlers;
pub mod keyword;
pub mod prompts;
pub mod resolver;
pub mod scoring;

pub use keyword::KeywordChatResolver;
pub use resolver::{ChatResolver, LlmChatResolver};
