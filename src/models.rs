//! QA Data Models
//!
//! 서버 JSON 페이로드와 매핑되는 Rust 데이터 모델

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 사용자 (세션 사용자 및 질문/답변 작성자)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// 질문 (작성자 및 답변 목록 포함)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub title: String,
    /// HTML 본문
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub votes: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: i64,
    pub author_id: String,
    pub author: User,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<Answer>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn answer(&self, answer_id: i64) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == answer_id)
    }

    /// 채택된 답변 (서버가 질문당 최대 1개를 보장)
    pub fn accepted_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_accepted)
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }
}

/// 답변
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: i64,
    /// HTML 본문
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub votes: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_accepted: bool,
    pub author_id: String,
    pub author: User,
    pub created_at: DateTime<Utc>,
}

/// 답변 작성 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnswer {
    pub content: String,
}

/// 질문 작성 요청 (질문하기 모달)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 투표 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "itemType", content = "itemId", rename_all = "lowercase")]
pub enum VoteTarget {
    Question(i64),
    Answer(i64),
}

/// 투표 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// 투표 요청 본문
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: VoteDirection,
}

/// `null`을 기본값으로 취급 (`votes: null` → 0 등)
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
