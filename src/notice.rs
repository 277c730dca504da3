//! 일시 알림 (토스트)

use std::collections::VecDeque;

use serde::Serialize;
use uuid::Uuid;

/// 표시 대기 중인 알림 최대 개수. 넘치면 가장 오래된 알림부터 버림
pub const MAX_PENDING_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// 사용자에게 잠깐 보여줄 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>, variant: NoticeVariant) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            variant,
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new("Success", description, NoticeVariant::Default)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new("Error", description, NoticeVariant::Destructive)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            "Unauthorized",
            "You are logged out. Logging in again...",
            NoticeVariant::Destructive,
        )
    }

    pub fn login_required(description: impl Into<String>) -> Self {
        Self::new("Login Required", description, NoticeVariant::Destructive)
    }
}

/// 알림 큐 (표시 순서 유지)
///
/// 호스트가 표시한 알림을 `drain`/`dismiss`로 비웁니다.
/// 비우지 않아도 `MAX_PENDING_NOTICES`개를 넘게 쌓이지는 않습니다.
#[derive(Debug, Clone, Default)]
pub struct NoticeCenter {
    notices: VecDeque<Notice>,
}

impl NoticeCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notice: Notice) {
        tracing::debug!("[Notice] {}: {}", notice.title, notice.description);
        if self.notices.len() >= MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    /// 쌓인 알림을 모두 꺼냄 (호스트가 표시한 뒤 호출)
    pub fn drain(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        before != self.notices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn last(&self) -> Option<&Notice> {
        self.notices.back()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
