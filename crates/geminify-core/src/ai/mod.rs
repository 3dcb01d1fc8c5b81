pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::ApiError;
use crate::request::Attachment;

/// Lazy, finite, non-restartable sequence of text chunks.
///
/// `Ok(None)` is an event that carried no text (metadata, finish markers).
pub type ChunkStream = BoxStream<'static, Result<Option<String>, ApiError>>;

/// Outbound payload for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    pub attachments: Vec<Attachment>,
    /// Explicit reasoning budget; `None` leaves the model default.
    pub thinking_budget: Option<u32>,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Starts a streaming generation. Errors before the first chunk (bad
    /// status, network) come back here; later failures arrive in the stream.
    async fn stream(&self, request: GenerateRequest) -> Result<ChunkStream, ApiError>;
}
