//! 질문 상세 화면 렌더 모델
//!
//! 호스트(UI)는 이 구조체만 보고 그리면 됩니다. 모든 값은 `(세션, 질문, UI 플래그)`의
//! 순수 함수로 계산됩니다.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Answer, Question, User};
use crate::session::SessionState;
use crate::view::display::{answer_heading, display_name, initials, time_ago};

/// 화면 로컬 UI 상태 (이동 시 초기화, 저장하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    pub show_answer_form: bool,
    pub ask_modal_open: bool,
    pub chatbot_open: bool,
}

/// 질문 상세 화면
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DetailView {
    /// 스켈레톤 (불완전한 데이터는 그리지 않음)
    Loading,
    NotFound(NotFoundView),
    Loaded(Box<QuestionView>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundView {
    pub title: String,
    pub message: String,
    pub recovery: NavAction,
}

impl NotFoundView {
    pub fn new(home_route: &str) -> Self {
        Self {
            title: "Question Not Found".to_string(),
            message: "The question you're looking for doesn't exist or has been removed.".to_string(),
            recovery: NavAction {
                label: "Back to Home".to_string(),
                route: home_route.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavAction {
    pub label: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub name: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    pub time_ago: String,
}

impl AuthorView {
    fn new(author: &User, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            name: display_name(author),
            initials: initials(author),
            avatar_url: author.profile_image_url.clone(),
            time_ago: time_ago(created_at, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub views: i64,
    pub answers: usize,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: i64,
    pub content_html: String,
    pub votes: i64,
    pub author: AuthorView,
    pub is_accepted: bool,
    /// 질문 작성자이고 아직 채택되지 않은 답변일 때만
    pub can_accept: bool,
}

/// 답변이 없을 때 목록 대신 보여주는 안내
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyAnswersPrompt {
    pub title: String,
    pub message: String,
    /// "Write the First Answer" 버튼 (로그인 상태이고 작성 폼이 닫혀 있을 때)
    pub show_write_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// 챗봇 사이드바 자리를 오른쪽에 확보
    pub reserve_sidebar: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: i64,
    pub title: String,
    pub description_html: String,
    pub tags: Vec<String>,
    pub stats: QuestionStats,
    pub author: AuthorView,
    pub is_question_author: bool,
    pub can_answer: bool,
    pub answer_heading: String,
    /// 답변 작성 토글 버튼 라벨 (로그인 상태에서만)
    pub answer_form_toggle: Option<String>,
    pub answer_form_visible: bool,
    pub answers: Vec<AnswerView>,
    pub empty_answers: Option<EmptyAnswersPrompt>,
    /// 채택 요청 진행 중에는 채택 버튼 비활성화
    pub accept_disabled: bool,
    pub chatbot_visible: bool,
    pub layout: Layout,
    pub ask_modal_open: bool,
}

fn render_answer(answer: &Answer, is_question_author: bool, now: DateTime<Utc>) -> AnswerView {
    AnswerView {
        id: answer.id,
        content_html: answer.content.clone(),
        votes: answer.votes,
        author: AuthorView::new(&answer.author, answer.created_at, now),
        is_accepted: answer.is_accepted,
        can_accept: is_question_author && !answer.is_accepted,
    }
}

/// 로드된 질문의 렌더 모델 계산
pub fn render_question(
    question: &Question,
    session: &SessionState,
    ui: UiFlags,
    accept_pending: bool,
    now: DateTime<Utc>,
) -> QuestionView {
    let is_question_author = session.can_accept(question);
    let can_answer = session.can_answer();
    let answer_count = question.answer_count();
    let chatbot_visible = session.is_authenticated && ui.chatbot_open;

    let empty_answers = (answer_count == 0).then(|| EmptyAnswersPrompt {
        title: "No answers yet".to_string(),
        message: "Be the first to answer this question!".to_string(),
        show_write_first: can_answer && !ui.show_answer_form,
    });

    let answer_form_toggle = can_answer.then(|| {
        if ui.show_answer_form {
            "Cancel".to_string()
        } else {
            "Write Answer".to_string()
        }
    });

    QuestionView {
        id: question.id,
        title: question.title.clone(),
        description_html: question.description.clone(),
        tags: question.tags.clone(),
        stats: QuestionStats {
            views: question.views,
            answers: answer_count,
            votes: question.votes,
        },
        author: AuthorView::new(&question.author, question.created_at, now),
        is_question_author,
        can_answer,
        answer_heading: answer_heading(answer_count),
        answer_form_toggle,
        answer_form_visible: ui.show_answer_form,
        answers: question
            .answers
            .iter()
            .map(|a| render_answer(a, is_question_author, now))
            .collect(),
        empty_answers,
        accept_disabled: accept_pending,
        chatbot_visible,
        layout: Layout {
            reserve_sidebar: chatbot_visible,
        },
        ask_modal_open: ui.ask_modal_open,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    pub fn user(id: &str, name: Option<&str>, username: Option<&str>) -> User {
        User {
            id: id.to_string(),
            email: None,
            name: name.map(String::from),
            username: username.map(String::from),
            profile_image_url: None,
        }
    }

    pub fn answer(id: i64, author: User, is_accepted: bool) -> Answer {
        Answer {
            id,
            content: format!("<p>answer {}</p>", id),
            votes: 1,
            is_accepted,
            author_id: author.id.clone(),
            author,
            created_at: now() - chrono::Duration::hours(2),
        }
    }

    pub fn question(id: i64, author: User, answers: Vec<Answer>) -> Question {
        Question {
            id,
            title: "How do lifetimes work?".to_string(),
            description: "<p>Explain please</p>".to_string(),
            tags: vec!["rust".to_string()],
            votes: 4,
            views: 100,
            author_id: author.id.clone(),
            author,
            answers,
            created_at: now() - chrono::Duration::minutes(90),
        }
    }
}
