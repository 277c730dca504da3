//! QA Client - Q&A 포럼 프론트엔드 코어 라이브러리
//!
//! 세션 확인, 쿼리 캐시(키 기반 무효화), 질문 상세 화면 상태와 뮤테이션을 담당합니다.
//! 실제 그리기는 호스트(UI)가 렌더 모델을 받아 처리합니다.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod notice;
pub mod query;
pub mod session;
pub mod view;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{ForumApi, HttpTransport, Transport};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::navigation::Navigator;
use crate::query::QueryClient;
use crate::session::SessionProvider;
use crate::view::{DetailSettings, QuestionDetailController};

/// tracing 구독자 설치 (이미 설치되어 있으면 무시)
pub fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// 앱 컨텍스트
///
/// 시작 시 쿼리 캐시, API 클라이언트, 세션 제공자를 만들고 `shutdown()`에서 캐시를 정리합니다.
pub struct ForumApp {
    config: ClientConfig,
    queries: QueryClient,
    api: ForumApi,
    sessions: SessionProvider,
    navigator: Arc<dyn Navigator>,
}

impl ForumApp {
    /// HTTP 전송으로 앱 시작
    pub fn start(config: ClientConfig, navigator: Arc<dyn Navigator>) -> ClientResult<Self> {
        let transport = HttpTransport::new(config.api_base_url.clone(), config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport), navigator))
    }

    /// 임의의 전송 구현으로 앱 구성
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let queries = QueryClient::new();
        let api = ForumApi::new(transport);
        let sessions = SessionProvider::new(queries.clone(), api.clone());

        tracing::info!("[App] Started (api: {})", config.api_base_url);

        Self {
            config,
            queries,
            api,
            sessions,
            navigator,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn api(&self) -> &ForumApi {
        &self.api
    }

    pub fn sessions(&self) -> &SessionProvider {
        &self.sessions
    }

    /// 질문 상세 컨트롤러 생성
    pub fn question_detail(&self) -> ClientResult<QuestionDetailController> {
        let settings = DetailSettings {
            login_url: self.config.login_url()?.to_string(),
            redirect_delay: self.config.redirect_delay,
            home_route: self.config.home_route.clone(),
        };
        Ok(QuestionDetailController::new(
            self.queries.clone(),
            self.api.clone(),
            self.sessions.clone(),
            self.navigator.clone(),
            settings,
        ))
    }

    /// 캐시 정리
    pub async fn shutdown(&self) {
        self.queries.shutdown().await;
        tracing::info!("[App] Shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use crate::api::{ApiResponse, AUTH_USER_PATH};
    use crate::error::ClientError;
    use crate::navigation::RecordingNavigator;
    use reqwest::Method;

    #[tokio::test]
    async fn test_app_lifecycle() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(401, "Unauthorized"));
        let app = ForumApp::with_transport(ClientConfig::default(), fake, Arc::new(RecordingNavigator::new()));

        let session = app.sessions().load().await;
        assert!(!session.is_authenticated);

        let controller = app.question_detail().unwrap();
        assert!(controller.question_id().is_none());

        app.shutdown().await;
        assert!(app.queries().is_shut_down());
        let err = app
            .queries()
            .set_query_data(&crate::query::QueryKey::auth_user(), serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Shutdown));
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("not a [valid filter");
    }
}
