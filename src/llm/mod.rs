// LLM abstraction layer

pub mod provider;
pub mod client;
pub mod chat;
pub mod assistant;

pub use provider::*;
