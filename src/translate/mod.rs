//! Translation: request/response types, the remote translator seam, and the
//! deduplicating translation cache in front of it.

pub mod cache;
pub mod http;
pub mod languages;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::status::ServiceStatus;

pub use cache::{TranslationCache, TranslationCacheStats, TranslationKey};
pub use http::HttpTranslator;

/// Body sent to the remote translation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub from_lang: String,
    pub to_lang: String,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, from_lang: impl Into<String>, to_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
        }
    }
}

/// Backend health attached to a translation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: ServiceStatus,
    #[serde(default)]
    pub message: String,
}

/// Body returned by the remote translation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
    #[serde(default)]
    pub service_info: Option<ServiceInfo>,
}

impl TranslateResponse {
    /// Reported status; a response without service info counts as `success`.
    pub fn status(&self) -> ServiceStatus {
        self.service_info
            .as_ref()
            .map(|info| info.status)
            .unwrap_or_default()
    }
}

/// Remote translation collaborator (adapter for different backends).
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, TranslateError>;
}

/// Failure of a remote translation. `Clone` so one failure can be handed to
/// every caller that joined the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    Api(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("translation timeout")]
    Timeout,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("language '{0}' is not supported")]
    UnsupportedLanguage(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("translation task failed: {0}")]
    TaskFailed(String),
}
