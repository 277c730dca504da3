//! HTTP 전송 계층
//!
//! `ForumApi`는 `Transport` 트레이트만 알고 있으므로, 실제 HTTP 대신
//! 메모리 구현으로 교체해 테스트할 수 있습니다.

use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// 원시 HTTP 응답
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 원격 API 호출 추상화
#[async_trait]
pub trait Transport: Send + Sync {
    /// `path`는 `/api/...` 형태의 서버 상대 경로
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<ApiResponse>;
}

/// reqwest 기반 전송 구현
///
/// 쿠키 저장소를 켜서 브라우저의 `credentials: "include"`와 같은 세션 유지 동작을 합니다.
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { base_url, http })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidOperation(format!("Invalid request path '{}': {}", path, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<ApiResponse> {
        let url = self.url(path)?;

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            // .json()이 Content-Type: application/json 헤더를 설정
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ApiResponse { status, body })
    }
}
