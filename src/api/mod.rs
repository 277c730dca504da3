//! Forum REST API 연동 모듈
//!
//! 세션 확인, 질문 조회, 답변 채택/작성, 투표 등 서버 엔드포인트를 호출합니다.

pub mod client;
pub mod transport;

pub use client::{question_path, ForumApi, UnauthorizedBehavior, AUTH_USER_PATH, QUESTIONS_PATH};
pub use transport::{ApiResponse, HttpTransport, Transport};
