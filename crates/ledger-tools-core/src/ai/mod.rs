//! Pluggable LLM backend abstraction
//!
//! The classifier only needs one capability from a language model: turn a prompt
//! into text. Vendor HTTP clients live outside this crate and implement
//! [`LlmBackend`]; the suggestion engine treats every error they return as a
//! reason to fall back to its deterministic heuristic.
//!
//! # Usage
//!
//! ```rust,ignore
//! let backend: Arc<dyn LlmBackend> = Arc::new(MyVendorClient::new(&config.llm));
//! let engine = SuggestionEngine::new(config.llm.clone(), Some(backend));
//! let suggestion = engine.suggest("UPI/SWIGGY/1234", 320.0, "dinner");
//! ```

mod mock;
pub mod parsing;

pub use mock::MockBackend;
pub use parsing::SuggestionReply;

use crate::error::Result;

/// Text completion capability used for categorization and regex generation
///
/// Implementations should return an error for transport failures, provider
/// errors and empty completions alike.
pub trait LlmBackend: Send + Sync {
    /// Complete `prompt` and return the model's text reply
    fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;

    /// Model name (for logging)
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_shared_backend_as_trait_object() {
        let mock = Arc::new(MockBackend::with_reply("hello"));
        let backend: Arc<dyn LlmBackend> = mock.clone();
        assert_eq!(backend.complete("prompt", 0.3, 10).unwrap(), "hello");
        assert_eq!(backend.model(), "mock");
        assert_eq!(mock.prompts(), vec!["prompt".to_string()]);
    }
}
