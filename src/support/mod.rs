//! Cross-cutting helpers: shutdown coordination and retry

pub mod retry;
pub mod shutdown;
