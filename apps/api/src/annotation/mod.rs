// Content Annotation Cache and the "strategic pulse" producer built on it.

pub mod cache;
pub mod handlers;
pub mod prompts;
pub mod pulse;
