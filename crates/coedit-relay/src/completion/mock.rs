//! Offline engine that answers with a canned snippet.

use async_trait::async_trait;
use coedit_common::{CompletionError, CompletionRequest};
use rand::seq::SliceRandom;

use super::CompletionEngine;

const DEFAULT_SNIPPETS: &[&str] = &[
    "print('Hello World')",
    "def mock_function():\n    pass",
    "import os\nimport sys",
    "return True",
];

/// Returns one of a fixed set of snippets, picked at random.
pub struct MockEngine {
    snippets: Vec<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_snippets(DEFAULT_SNIPPETS.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_snippets(snippets: Vec<String>) -> Self {
        Self { snippets }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionEngine for MockEngine {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        tracing::debug!(context_len = request.context.len(), "Mock completion");
        Ok(self.snippets.choose(&mut rand::thread_rng()).cloned())
    }
}
