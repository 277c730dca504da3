//! Forum REST API 클라이언트
//!
//! 서버 엔드포인트를 타입이 있는 메서드로 감쌉니다.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::api::transport::{ApiResponse, Transport};
use crate::error::{ClientError, ClientResult};
use crate::models::{NewAnswer, NewQuestion, Question, User, VoteDirection, VoteRequest, VoteTarget};

pub const AUTH_USER_PATH: &str = "/api/auth/user";
pub const QUESTIONS_PATH: &str = "/api/questions";

/// 401 응답 처리 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedBehavior {
    /// 401을 "데이터 없음"(`null`)으로 처리
    ReturnNull,
    /// 401을 에러로 처리
    Throw,
}

/// `/api/questions/{id}`
pub fn question_path(question_id: impl ToString) -> String {
    format!("{}/{}", QUESTIONS_PATH, urlencoding::encode(&question_id.to_string()))
}

/// Forum API 클라이언트
#[derive(Clone)]
pub struct ForumApi {
    transport: Arc<dyn Transport>,
}

impl ForumApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 실패 응답을 `"{status}: {본문}"` 에러로 변환
    fn ensure_success(response: ApiResponse) -> ClientResult<ApiResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let message = if response.body.trim().is_empty() {
            StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        } else {
            response.body
        };

        Err(ClientError::Status {
            status: response.status,
            message,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<ApiResponse> {
        tracing::debug!("[Api] {} {}", method, path);

        let result = self
            .transport
            .request(method.clone(), path, body)
            .await
            .and_then(Self::ensure_success);

        if let Err(e) = &result {
            tracing::warn!("[Api] {} {} failed: {}", method, path, e);
        }
        result
    }

    fn parse_body(body: &str) -> ClientResult<serde_json::Value> {
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(body)?)
    }

    /// 캐시 쿼리용 GET
    ///
    /// `ReturnNull`이면 401 응답을 에러 대신 `Value::Null`로 돌려줍니다.
    pub async fn get_query(
        &self,
        path: &str,
        on_unauthorized: UnauthorizedBehavior,
    ) -> ClientResult<serde_json::Value> {
        tracing::debug!("[Api] GET {}", path);

        let response = self.transport.request(Method::GET, path, None).await?;
        if on_unauthorized == UnauthorizedBehavior::ReturnNull && response.status == 401 {
            tracing::debug!("[Api] GET {} -> 401, treated as no data", path);
            return Ok(serde_json::Value::Null);
        }

        let response = Self::ensure_success(response).inspect_err(|e| {
            tracing::warn!("[Api] GET {} failed: {}", path, e);
        })?;
        Self::parse_body(&response.body)
    }

    /// 변경 요청 (POST 등). 응답 본문은 JSON이면 파싱, 비어있으면 `Null`
    pub async fn mutate(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ClientResult<serde_json::Value> {
        let response = self.send(method, path, body).await?;
        // 뮤테이션 응답 본문은 참고용이므로 JSON이 아니어도 성공으로 취급
        Ok(Self::parse_body(&response.body).unwrap_or(serde_json::Value::Null))
    }

    fn decode<T: DeserializeOwned>(value: serde_json::Value) -> ClientResult<Option<T>> {
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// 현재 로그인 사용자 (401 → `None`)
    pub async fn current_user(&self) -> ClientResult<Option<User>> {
        let value = self
            .get_query(AUTH_USER_PATH, UnauthorizedBehavior::ReturnNull)
            .await?;
        Self::decode(value)
    }

    /// 질문 상세 (작성자, 답변 포함)
    pub async fn question(&self, question_id: i64) -> ClientResult<Option<Question>> {
        let value = self
            .get_query(&question_path(question_id), UnauthorizedBehavior::Throw)
            .await?;
        Self::decode(value)
    }

    /// 답변 채택
    pub async fn accept_answer(&self, question_id: i64, answer_id: i64) -> ClientResult<()> {
        let path = format!("{}/answers/{}/accept", question_path(question_id), answer_id);
        self.mutate(Method::POST, &path, None).await?;
        Ok(())
    }

    /// 답변 작성
    pub async fn submit_answer(&self, question_id: i64, answer: &NewAnswer) -> ClientResult<serde_json::Value> {
        let path = format!("{}/answers", question_path(question_id));
        self.mutate(Method::POST, &path, Some(serde_json::to_value(answer)?))
            .await
    }

    /// 질문 또는 답변에 투표
    pub async fn vote(&self, target: VoteTarget, direction: VoteDirection) -> ClientResult<()> {
        let path = match target {
            VoteTarget::Question(id) => format!("{}/vote", question_path(id)),
            VoteTarget::Answer(id) => format!("/api/answers/{}/vote", id),
        };
        let body = serde_json::to_value(VoteRequest { vote_type: direction })?;
        self.mutate(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    /// 질문 작성
    pub async fn create_question(&self, question: &NewQuestion) -> ClientResult<serde_json::Value> {
        self.mutate(Method::POST, QUESTIONS_PATH, Some(serde_json::to_value(question)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use serde_json::json;

    fn api_with(fake: Arc<FakeTransport>) -> ForumApi {
        ForumApi::new(fake)
    }

    #[tokio::test]
    async fn test_current_user_401_is_none() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(401, "Unauthorized"));

        let user = api_with(fake.clone()).current_user().await.unwrap();
        assert!(user.is_none());
        assert_eq!(fake.count(Method::GET, AUTH_USER_PATH), 1);
    }

    #[tokio::test]
    async fn test_current_user_other_errors_propagate() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(500, ""));

        let err = api_with(fake).current_user().await.unwrap_err();
        assert_eq!(err.to_string(), "500: Internal Server Error");
    }

    #[tokio::test]
    async fn test_question_401_is_error() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::GET, "/api/questions/3", ApiResponse::new(401, "Unauthorized"));

        let err = api_with(fake).question(3).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_accept_answer_path() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(
            Method::POST,
            "/api/questions/3/answers/9/accept",
            ApiResponse::json(200, &json!({ "ok": true })),
        );

        api_with(fake.clone()).accept_answer(3, 9).await.unwrap();
        assert_eq!(fake.count(Method::POST, "/api/questions/3/answers/9/accept"), 1);
    }

    #[tokio::test]
    async fn test_vote_paths_and_body() {
        let fake = Arc::new(FakeTransport::new());
        fake.on(Method::POST, "/api/questions/3/vote", ApiResponse::new(200, ""));
        fake.on(Method::POST, "/api/answers/9/vote", ApiResponse::new(200, ""));

        let api = api_with(fake.clone());
        api.vote(VoteTarget::Question(3), VoteDirection::Up).await.unwrap();
        api.vote(VoteTarget::Answer(9), VoteDirection::Down).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].1, "/api/questions/3/vote");
        assert_eq!(calls[0].2, Some(json!({ "voteType": "up" })));
        assert_eq!(calls[1].1, "/api/answers/9/vote");
        assert_eq!(calls[1].2, Some(json!({ "voteType": "down" })));
    }

    #[test]
    fn test_question_path_encodes_segment() {
        assert_eq!(question_path(42), "/api/questions/42");
        assert_eq!(question_path("a/b"), "/api/questions/a%2Fb");
    }
}
