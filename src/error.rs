//! QA Client Error Types
//!
//! 클라이언트 전역 에러 타입 정의

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// 클라이언트 에러
///
/// 진행 중인 조회 결과를 여러 대기자에게 나눠주기 위해 `Clone`입니다.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    /// 2xx 이외의 응답. 메시지 형식은 `"{status}: {본문}"`
    #[error("{status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Query client has been shut down")]
    Shutdown,
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Http(Arc::new(error))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Serialization(Arc::new(error))
    }
}

impl ClientError {
    /// 세션 만료/미인증으로 인한 실패인지 여부
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// 호스트(UI)로 넘기기 위한 직렬화 가능한 에러
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<&ClientError> for ErrorPayload {
    fn from(error: &ClientError) -> Self {
        let code = match error {
            ClientError::Http(_) => "HTTP_ERROR",
            ClientError::Status { status: 401, .. } => "UNAUTHORIZED",
            ClientError::Status { status: 404, .. } => "NOT_FOUND",
            ClientError::Status { .. } => "HTTP_STATUS",
            ClientError::Serialization(_) => "SERIALIZATION_ERROR",
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::InvalidOperation(_) => "INVALID_OPERATION",
            ClientError::Shutdown => "SHUTDOWN",
        };

        ErrorPayload {
            code: code.to_string(),
            message: error.to_string(),
            details: error.status().map(|s| format!("status {}", s)),
        }
    }
}

impl From<ClientError> for ErrorPayload {
    fn from(error: ClientError) -> Self {
        ErrorPayload::from(&error)
    }
}

/// 클라이언트 결과 타입
pub type ClientResult<T> = Result<T, ClientError>;

/// 뮤테이션 실패 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationErrorKind {
    /// 세션 없음/만료 (서버가 401 응답)
    Unauthorized,
    /// 로그인이 필요한 동작을 미인증 상태에서 시도 (원격 호출 없음)
    LoginRequired,
    /// 클라이언트 측 입력 검증 실패 (원격 호출 없음)
    Invalid,
    /// 그 외 모든 실패
    Failed,
}

/// 뮤테이션 실패
///
/// 재시도/롤백 없음. 호출자가 다시 시도해야 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct MutationError {
    pub kind: MutationErrorKind,
    pub message: String,
}

impl MutationError {
    pub fn new(kind: MutationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn login_required() -> Self {
        Self::new(MutationErrorKind::LoginRequired, "Login required")
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(MutationErrorKind::Invalid, message)
    }
}

impl From<ClientError> for MutationError {
    fn from(error: ClientError) -> Self {
        let kind = if error.is_unauthorized() {
            MutationErrorKind::Unauthorized
        } else {
            MutationErrorKind::Failed
        };
        MutationError::new(kind, error.to_string())
    }
}

/// 뮤테이션 결과 타입
pub type MutationResult<T> = Result<T, MutationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_format() {
        let err = ClientError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "401: Unauthorized");
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_mutation_error_classification() {
        let unauthorized = MutationError::from(ClientError::Status {
            status: 401,
            message: "Unauthorized".to_string(),
        });
        assert_eq!(unauthorized.kind, MutationErrorKind::Unauthorized);

        let forbidden = MutationError::from(ClientError::Status {
            status: 403,
            message: "Only the question author can accept answers".to_string(),
        });
        assert_eq!(forbidden.kind, MutationErrorKind::Failed);

        let shutdown = MutationError::from(ClientError::Shutdown);
        assert_eq!(shutdown.kind, MutationErrorKind::Failed);
    }

    #[test]
    fn test_error_payload_codes() {
        let payload = ErrorPayload::from(ClientError::Status {
            status: 404,
            message: "Question not found".to_string(),
        });
        assert_eq!(payload.code, "NOT_FOUND");
        assert_eq!(payload.message, "404: Question not found");
        assert_eq!(payload.details.as_deref(), Some("status 404"));

        let payload = ErrorPayload::from(ClientError::Config("bad url".to_string()));
        assert_eq!(payload.code, "CONFIG_ERROR");
        assert!(payload.details.is_none());
    }

    #[test]
    fn test_source_errors_clone() {
        let err = ClientError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        let copy = err.clone();
        assert_eq!(copy.to_string(), err.to_string());
        assert_eq!(ErrorPayload::from(&copy).code, "SERIALIZATION_ERROR");
    }
}
