//! 렌더링 시 계산하는 표시용 필드 (저장하지 않음)

use chrono::{DateTime, Utc};

use crate::models::User;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 작성자 표시 이름: 이름 → 사용자명 → "Anonymous"
pub fn display_name(author: &User) -> String {
    non_empty(author.name.as_deref())
        .or_else(|| non_empty(author.username.as_deref()))
        .unwrap_or("Anonymous")
        .to_string()
}

/// 작성자 이니셜 (최대 2자)
///
/// 이름의 각 단어 첫 글자 → 사용자명 첫 글자 → "A"
pub fn initials(author: &User) -> String {
    if let Some(name) = non_empty(author.name.as_deref()) {
        return name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect();
    }

    non_empty(author.username.as_deref())
        .and_then(|u| u.chars().next())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "A".to_string())
}

/// 상대 시간 표시 ("5m ago", "3h ago", "2d ago")
///
/// 분 단위 내림. 미래 시각은 0분으로 취급하고, 일 단위에는 상한이 없습니다.
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", days)
    }
}

/// "1 Answer" / "N Answers"
pub fn answer_heading(count: usize) -> String {
    if count == 1 {
        "1 Answer".to_string()
    } else {
        format!("{} Answers", count)
    }
}
