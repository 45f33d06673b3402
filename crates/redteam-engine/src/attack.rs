//! The `Attack` contract the engine implements to compose with the
//! broader attack catalog (the catalog itself is out of scope here).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::EngineError;
use crate::model::Prompt;

/// A single-goal or batch adversarial search that can be composed with
/// other attacks behind one interface.
///
/// Exposes both a synchronous and an asynchronous single-prompt form,
/// mirroring the original's `apply`/`run_attack_async`-backed split.
#[async_trait]
pub trait Attack: Send + Sync + Sized {
    /// Run the attack on one prompt and return the best candidate shaped
    /// to match the input (bare string, or message list with the human
    /// slot replaced). This is what `stream_abatch` and the batch façade
    /// call.
    async fn apply_async(&self, prompt: Prompt) -> Result<Prompt, EngineError>;

    /// Synchronous single-prompt form: blocks the calling thread until
    /// `apply_async` resolves.
    fn apply(&self, prompt: Prompt) -> Result<Prompt, EngineError> {
        futures::executor::block_on(self.apply_async(prompt))
    }

    /// Run the attack concurrently over many prompts, yielding results in
    /// input order regardless of completion order.
    fn stream_abatch<'a>(&'a self, prompts: Vec<Prompt>) -> BoxStream<'a, Result<Prompt, EngineError>> {
        crate::batch::run_batch(self, prompts)
    }

    fn get_name(&self) -> String;
    fn get_description(&self) -> String;
    fn get_params(&self) -> serde_json::Value;
}
