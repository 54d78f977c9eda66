//! Generative text collaborator
//!
//! The generator is opaque and fallible: it takes a persona prompt and source
//! text and returns rewritten post text, or a generation error. Real
//! implementations wrap an external service; this crate ships only the trait
//! and a configurable mock (available in all builds so integration tests and
//! the console frontend can use it).

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{PostwrightError, Result};

#[async_trait]
pub trait Generator: Send + Sync {
    /// Rewrite `source` under `persona`, returning the finished post text.
    ///
    /// # Errors
    ///
    /// Returns `PostwrightError::Generation` when the collaborator fails;
    /// the caller is responsible for preserving draft state on failure.
    async fn generate(&self, persona: &str, source: &str) -> Result<String>;
}

/// A recorded generation call, for verification in tests.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub persona: String,
    pub source: String,
}

/// Mock generator for testing and dry runs
pub struct MockGenerator {
    fail: bool,
    fail_after: Option<usize>,
    error: Option<String>,
    calls: Arc<Mutex<Vec<GenerationCall>>>,
}

impl MockGenerator {
    /// A generator that deterministically transforms its input.
    pub fn success() -> Self {
        Self {
            fail: false,
            fail_after: None,
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A generator that always fails with the given error.
    pub fn failure(error: &str) -> Self {
        Self {
            fail: true,
            fail_after: None,
            error: Some(error.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A generator that succeeds for the first `calls` calls and fails
    /// with the given error after that.
    pub fn failing_after(calls: usize, error: &str) -> Self {
        Self {
            fail: false,
            fail_after: Some(calls),
            error: Some(error.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, persona: &str, source: &str) -> Result<String> {
        let made = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(GenerationCall {
                persona: persona.to_string(),
                source: source.to_string(),
            });
            calls.len()
        };

        if self.fail || self.fail_after.is_some_and(|n| made > n) {
            let msg = self
                .error
                .clone()
                .unwrap_or_else(|| "Mock generation failed".to_string());
            return Err(PostwrightError::Generation(msg));
        }

        Ok(format!("rewritten: {}", source.trim()))
    }
}
