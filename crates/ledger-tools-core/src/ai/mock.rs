//! Mock backend for testing
//!
//! Replays scripted replies in order and records every prompt it receives.
//! Useful for unit tests and development without an LLM provider.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

use super::LlmBackend;

/// Mock LLM backend for testing
///
/// Scripted replies are consumed first; once they run out every call returns
/// the default reply (or an error if none was set).
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    /// A backend that always answers with `reply`
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            default_reply: Some(reply.into()),
            ..Default::default()
        }
    }

    /// A backend whose every call fails like an unreachable provider
    pub fn failing() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.script).push_back(Ok(reply.into()));
    }

    /// Queue a failure for the next call
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Err(message.into()));
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

impl LlmBackend for MockBackend {
    fn complete(&self, prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String> {
        lock(&self.prompts).push(prompt.to_string());

        match lock(&self.script).pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::Llm(message)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| Error::Llm("mock backend has no reply".into())),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
