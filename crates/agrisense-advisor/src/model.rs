//! Generative model seam.
//!
//! The pipeline only needs two outcomes from a model: text, or an error.
//! Any error is treated as "unavailable" by the orchestrator.

use agrisense_core::Result;
use async_trait::async_trait;

use crate::types::ImageAttachment;

/// Hosted text-generation service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate text for `prompt` with the model identified by `model`.
    async fn generate(&self, prompt: &str, model: &str, max_tokens: usize) -> Result<String>;

    /// Generate with an attached image. Backends without vision support
    /// ignore the image.
    async fn generate_with_image(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: usize,
        image: &ImageAttachment,
    ) -> Result<String> {
        let _ = image;
        self.generate(prompt, model, max_tokens).await
    }

    /// Short backend name for logs.
    fn name(&self) -> &str;
}
