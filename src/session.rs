//! Session State Provider
//!
//! `/api/auth/user` 조회 1회로 현재 사용자와 인증 여부를 제공합니다.
//! 401은 에러가 아니라 "로그인하지 않음" 상태입니다.

use serde::Serialize;

use crate::api::{ForumApi, UnauthorizedBehavior, AUTH_USER_PATH};
use crate::models::{Question, User};
use crate::query::{FetchStatus, QueryClient, QueryKey, QueryOptions, StaleTime};

/// 세션 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub is_authenticated: bool,
}

impl SessionState {
    pub fn from_user(user: Option<User>) -> Self {
        Self {
            is_authenticated: user.is_some(),
            user,
            is_loading: false,
        }
    }

    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
            is_authenticated: false,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    /// 답변 작성 가능 여부 (로그인 필요)
    pub fn can_answer(&self) -> bool {
        self.is_authenticated
    }

    /// 답변 채택 가능 여부 (질문 작성자만)
    pub fn can_accept(&self, question: &Question) -> bool {
        self.user_id() == Some(question.author_id.as_str())
    }
}

/// 세션 제공자
#[derive(Clone)]
pub struct SessionProvider {
    queries: QueryClient,
    api: ForumApi,
}

impl SessionProvider {
    pub fn new(queries: QueryClient, api: ForumApi) -> Self {
        Self { queries, api }
    }

    fn options() -> QueryOptions {
        // 캐시 수명 동안 1회만 조회, 재시도 없음
        QueryOptions::default().stale_time(StaleTime::Infinite).retry(0)
    }

    /// 캐시만 보고 현재 세션 상태 계산 (원격 호출 없음)
    pub async fn state(&self) -> SessionState {
        let state = self.queries.query_state(&QueryKey::auth_user()).await;
        match state.status {
            FetchStatus::Idle => SessionState::loading(),
            FetchStatus::Error => SessionState::from_user(None),
            FetchStatus::Success => SessionState::from_user(
                state
                    .data
                    .and_then(|value| serde_json::from_value::<Option<User>>(value).ok())
                    .flatten(),
            ),
        }
    }

    /// 세션 조회 (캐시되어 있으면 원격 호출 없음)
    pub async fn load(&self) -> SessionState {
        let api = self.api.clone();
        let result = self
            .queries
            .fetch_query(&QueryKey::auth_user(), Self::options(), move || {
                let api = api.clone();
                async move { api.get_query(AUTH_USER_PATH, UnauthorizedBehavior::ReturnNull).await }
            })
            .await;

        match result {
            Ok(value) => {
                let user = value
                    .map(serde_json::from_value::<Option<User>>)
                    .transpose()
                    .unwrap_or_else(|e| {
                        tracing::warn!("[Session] Unexpected user payload: {}", e);
                        None
                    })
                    .flatten();
                tracing::debug!("[Session] authenticated={}", user.is_some());
                SessionState::from_user(user)
            }
            Err(e) => {
                // 401 이외의 실패도 "사용자 없음"으로 처리
                tracing::warn!("[Session] Failed to load session: {}", e);
                SessionState::from_user(None)
            }
        }
    }

    /// 세션 키를 무효화하고 다시 조회
    pub async fn refresh(&self) -> SessionState {
        self.queries.invalidate_queries(&QueryKey::auth_user()).await;
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use crate::api::ApiResponse;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn provider(fake: Arc<FakeTransport>) -> SessionProvider {
        SessionProvider::new(QueryClient::new(), ForumApi::new(fake))
    }

    #[tokio::test]
    async fn test_unauthenticated_on_401() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(401, "Unauthorized"));
        let sessions = provider(fake);

        assert!(sessions.state().await.is_loading);

        let state = sessions.load().await;
        assert!(state.user.is_none());
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        assert!(!state.can_answer());
        assert_eq!(sessions.state().await, state);
    }

    #[tokio::test]
    async fn test_authenticated_fetches_once() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(
            Method::GET,
            AUTH_USER_PATH,
            ApiResponse::json(200, &json!({ "id": "u-1", "name": "Ada Lovelace" })),
        );
        let sessions = provider(fake.clone());

        let first = sessions.load().await;
        let second = sessions.load().await;
        assert!(first.is_authenticated);
        assert_eq!(first, second);
        assert_eq!(first.user_id(), Some("u-1"));
        assert_eq!(fake.count(Method::GET, AUTH_USER_PATH), 1);

        sessions.refresh().await;
        assert_eq!(fake.count(Method::GET, AUTH_USER_PATH), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_no_user_without_retry() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(500, "oops"));
        let sessions = provider(fake.clone());

        let state = sessions.load().await;
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(fake.count(Method::GET, AUTH_USER_PATH), 1);
        assert_eq!(sessions.state().await, SessionState::from_user(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_request() {
        let fake = Arc::new(FakeTransport::new());
        fake.with_latency(std::time::Duration::from_millis(10)).on(
            Method::GET,
            AUTH_USER_PATH,
            ApiResponse::json(200, &json!({ "id": "u-2", "username": "grace" })),
        );
        let sessions = provider(fake.clone());
        let other_view = sessions.clone();

        let (first, second) = tokio::join!(sessions.load(), other_view.load());
        assert!(first.is_authenticated);
        assert_eq!(first, second);
        assert_eq!(fake.count(Method::GET, AUTH_USER_PATH), 1);
    }
}
