//! HTTP translation client for the admin backend's `/translate` route.
//! Connection pooling via reqwest, one immediate retry on timeout, 429 and
//! other non-2xx statuses surfaced as errors.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::languages::is_supported;
use super::{TranslateError, TranslateRequest, TranslateResponse, Translator};
use crate::config::TranslateConfig;

pub struct HttpTranslator {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslateConfig) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout())
            .build()
            .map_err(|e| TranslateError::Api(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Build from `MEMOCACHE_*` environment variables.
    pub fn from_env() -> Result<Self, TranslateError> {
        let config = TranslateConfig::from_env().map_err(|e| TranslateError::InvalidInput(e.to_string()))?;
        Self::new(&config)
    }

    fn url(&self) -> String {
        format!("{}/translate", self.base_url)
    }

    /// POST the request, retrying once on timeout.
    async fn send_with_retry(&self, request: &TranslateRequest) -> Result<reqwest::Response, TranslateError> {
        let mut timeout_retried = false;

        loop {
            let mut builder = self.http.post(self.url()).json(request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().as_u16() == 429 => {
                    let retry_after_ms = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(|secs| secs.saturating_mul(1000))
                        .unwrap_or(0);
                    warn!(retry_after_ms, "translation backend rate limited");
                    return Err(TranslateError::RateLimited { retry_after_ms });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body_text = resp.text().await.unwrap_or_default();
                    return Err(TranslateError::Api(format!(
                        "unexpected status {}: {}",
                        status,
                        body_text.chars().take(200).collect::<String>()
                    )));
                }
                Err(e) if e.is_timeout() => {
                    if timeout_retried {
                        return Err(TranslateError::Timeout);
                    }
                    warn!("translation request timeout, retrying once");
                    timeout_retried = true;
                }
                Err(e) => return Err(TranslateError::Api(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, request: &TranslateRequest) -> Result<TranslateResponse, TranslateError> {
        for lang in [&request.from_lang, &request.to_lang] {
            if !is_supported(lang) {
                return Err(TranslateError::UnsupportedLanguage(lang.clone()));
            }
        }

        let resp = self.send_with_retry(request).await?;
        let body = resp.text().await.map_err(|e| TranslateError::Api(e.to_string()))?;
        let parsed: TranslateResponse =
            serde_json::from_str(&body).map_err(|e| TranslateError::Malformed(e.to_string()))?;

        debug!(
            status = %parsed.status(),
            chars = parsed.translated_text.chars().count(),
            "translation_received"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ServiceStatus;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn translator(endpoint: String, api_key: Option<&str>) -> HttpTranslator {
        HttpTranslator::new(&TranslateConfig {
            endpoint,
            api_key: api_key.map(str::to_string),
            timeout_secs: 5,
            ..TranslateConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_request_and_parses_response() {
        let app = Router::new().route(
            "/translate",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(body["from_lang"], "pt-BR");
                assert_eq!(body["to_lang"], "en-US");
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer k-123")
                );
                Json(json!({
                    "translated_text": format!("EN:{}", body["text"].as_str().unwrap_or_default()),
                    "service_info": { "status": "limited", "message": "partial" }
                }))
            }),
        );
        let endpoint = serve(app).await;

        let resp = translator(format!("{endpoint}/"), Some("k-123"))
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap();

        assert_eq!(resp.translated_text, "EN:Olá");
        assert_eq!(resp.status(), ServiceStatus::Limited);
        assert_eq!(resp.service_info.unwrap().message, "partial");
    }

    #[tokio::test]
    async fn missing_service_info_is_nominal() {
        let app = Router::new().route(
            "/translate",
            post(|| async { Json(json!({ "translated_text": "Hello" })) }),
        );
        let endpoint = serve(app).await;

        let resp = translator(endpoint, None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap();
        assert_eq!(resp.status(), ServiceStatus::Success);
        assert!(resp.service_info.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/translate",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let endpoint = serve(app).await;

        let err = translator(endpoint, None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap_err();
        match err {
            TranslateError::Api(msg) => assert!(msg.contains("502") && msg.contains("upstream down")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let app = Router::new().route(
            "/translate",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "2")], "slow down") }),
        );
        let endpoint = serve(app).await;

        let err = translator(endpoint, None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap_err();
        assert_eq!(err, TranslateError::RateLimited { retry_after_ms: 2000 });
    }

    #[tokio::test]
    async fn huge_retry_after_saturates() {
        let app = Router::new().route(
            "/translate",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("retry-after", "18446744073709552")],
                    "slow down",
                )
            }),
        );
        let endpoint = serve(app).await;

        let err = translator(endpoint, None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap_err();
        assert_eq!(err, TranslateError::RateLimited { retry_after_ms: u64::MAX });
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let app = Router::new().route(
            "/translate",
            post(|| async { Json(json!({ "text": "wrong shape" })) }),
        );
        let endpoint = serve(app).await;

        let err = translator(endpoint, None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "en-US"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Malformed(_)));
    }

    #[tokio::test]
    async fn unsupported_language_fails_before_network() {
        // Nothing listens here; an attempted request would surface as Api.
        let err = translator("http://127.0.0.1:9".into(), None)
            .translate(&TranslateRequest::new("Olá", "pt-BR", "xx-XX"))
            .await
            .unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedLanguage("xx-XX".into()));
    }
}
