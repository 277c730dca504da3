//! 쿼리 키
//!
//! 캐시 항목의 식별자. 무효화가 동작하려면 키가 정확히 일치해야 합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::{question_path, AUTH_USER_PATH, QUESTIONS_PATH};

/// 세그먼트 목록으로 구성된 쿼리 키 (`["/api/questions/5"]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// API 경로 하나로 된 키
    pub fn path(path: impl Into<String>) -> Self {
        Self(vec![path.into()])
    }

    /// `["/api/auth/user"]`
    pub fn auth_user() -> Self {
        Self::path(AUTH_USER_PATH)
    }

    /// `["/api/questions"]` (질문 목록)
    pub fn questions() -> Self {
        Self::path(QUESTIONS_PATH)
    }

    /// `["/api/questions/{id}"]` (질문 상세)
    pub fn question(question_id: i64) -> Self {
        Self::path(question_path(question_id))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// 필터 키의 세그먼트가 이 키의 앞부분과 일치하는지
    pub fn starts_with(&self, filter: &QueryKey) -> bool {
        self.0.len() >= filter.0.len() && self.0.iter().zip(&filter.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
