//! Completion engines behind `POST /autocomplete`.
//!
//! The relay answers completion requests itself; which engine runs is
//! chosen by `relay.completion.provider`.

mod claude;
mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use coedit_common::{CompletionError, CompletionRequest};
use coedit_config::{CompletionConfig, CompletionProvider};

pub use claude::ClaudeEngine;
pub use mock::MockEngine;

#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Produce at most one suggestion for the text before the cursor.
    async fn complete(&self, request: &CompletionRequest)
        -> Result<Option<String>, CompletionError>;
}

/// Build the engine selected in config.
pub fn build_engine(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionEngine>, CompletionError> {
    match config.provider {
        CompletionProvider::Mock => Ok(Arc::new(MockEngine::new())),
        CompletionProvider::Claude => Ok(Arc::new(ClaudeEngine::from_env(config)?)),
    }
}
