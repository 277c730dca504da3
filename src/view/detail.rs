//! Question Detail View Controller
//!
//! 질문 하나의 캐시 쿼리, 화면 로컬 UI 플래그, 뮤테이션을 조합합니다.
//! 뮤테이션이 성공하면 관련 쿼리 키를 무효화하고 질문을 다시 조회합니다 (낙관적 업데이트 없음).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::api::{question_path, ForumApi, UnauthorizedBehavior};
use crate::error::{ClientError, ClientResult, MutationError, MutationErrorKind, MutationResult};
use crate::models::{NewAnswer, NewQuestion, Question, VoteDirection, VoteTarget};
use crate::navigation::{schedule_login_redirect, Navigator};
use crate::notice::{Notice, NoticeCenter};
use crate::query::{QueryClient, QueryKey, QueryOptions, StaleTime};
use crate::session::{SessionProvider, SessionState};
use crate::view::render::{render_question, DetailView, NotFoundView, UiFlags};

/// 컨트롤러 설정
#[derive(Debug, Clone)]
pub struct DetailSettings {
    pub login_url: String,
    pub redirect_delay: Duration,
    pub home_route: String,
}

/// 주 쿼리(질문) 상태
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionStatus {
    Loading,
    Ready(Box<Question>),
    /// 404와 네트워크 실패를 구분하지 않음
    NotFound,
}

/// 질문 조회 요청 식별자
///
/// 더 최근 요청이 시작된 뒤 도착한 응답은 버립니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub question_id: i64,
    generation: u64,
}

/// 진행 중인 답변 채택 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptTicket {
    pub question_id: i64,
    pub answer_id: i64,
}

/// 질문 상세 컨트롤러
pub struct QuestionDetailController {
    queries: QueryClient,
    api: ForumApi,
    sessions: SessionProvider,
    navigator: Arc<dyn Navigator>,
    settings: DetailSettings,

    question_id: Option<i64>,
    generation: u64,
    status: QuestionStatus,
    ui: UiFlags,
    session: SessionState,
    notices: NoticeCenter,
    accept_pending: bool,
    pending_redirect: Option<JoinHandle<()>>,
}

impl QuestionDetailController {
    pub fn new(
        queries: QueryClient,
        api: ForumApi,
        sessions: SessionProvider,
        navigator: Arc<dyn Navigator>,
        settings: DetailSettings,
    ) -> Self {
        Self {
            queries,
            api,
            sessions,
            navigator,
            settings,
            question_id: None,
            generation: 0,
            status: QuestionStatus::Loading,
            ui: UiFlags::default(),
            session: SessionState::loading(),
            notices: NoticeCenter::new(),
            accept_pending: false,
            pending_redirect: None,
        }
    }

    pub fn question_id(&self) -> Option<i64> {
        self.question_id
    }

    pub fn status(&self) -> &QuestionStatus {
        &self.status
    }

    pub fn question(&self) -> Option<&Question> {
        match &self.status {
            QuestionStatus::Ready(q) => Some(q.as_ref()),
            _ => None,
        }
    }

    pub fn ui(&self) -> UiFlags {
        self.ui
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn notices(&self) -> &NoticeCenter {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// 예약된 로그인 리다이렉트 작업 (호스트가 기다리거나 취소)
    pub fn take_pending_redirect(&mut self) -> Option<JoinHandle<()>> {
        self.pending_redirect.take()
    }

    /// 질문 화면 진입: 세션 확인과 질문 조회를 동시에 진행
    pub async fn mount(&mut self, question_id: i64) -> &QuestionStatus {
        let ticket = self.begin_load(question_id);
        let fetch = self.question_fetch(ticket);
        let (session, result) = futures::join!(self.sessions.load(), fetch);
        self.session = session;
        self.finish_load(ticket, result);
        &self.status
    }

    /// 외부에서 세션 상태를 갱신할 때 사용
    pub fn set_session(&mut self, session: SessionState) {
        self.session = session;
    }

    /// 조회 시작. 다른 질문으로 이동하면 UI 플래그를 초기화하고 로딩 상태로 전환
    pub fn begin_load(&mut self, question_id: i64) -> LoadTicket {
        let switching = self.question_id != Some(question_id);
        if switching {
            self.ui = UiFlags::default();
            self.accept_pending = false;
        }
        if switching || !matches!(self.status, QuestionStatus::Ready(_)) {
            self.status = QuestionStatus::Loading;
        }

        self.question_id = Some(question_id);
        self.generation += 1;
        tracing::debug!("[Detail] load question {} (generation {})", question_id, self.generation);

        LoadTicket {
            question_id,
            generation: self.generation,
        }
    }

    /// 질문 조회 future (stale time 0, 재시도 없음)
    ///
    /// 컨트롤러를 빌리지 않으므로 호스트가 별도 태스크로 실행할 수 있습니다.
    pub fn question_fetch(
        &self,
        ticket: LoadTicket,
    ) -> impl Future<Output = ClientResult<Option<Question>>> + Send + 'static {
        let queries = self.queries.clone();
        let api = self.api.clone();
        async move {
            let key = QueryKey::question(ticket.question_id);
            let options = QueryOptions::default().stale_time(StaleTime::ZERO).retry(0);
            let path = question_path(ticket.question_id);

            let value = queries
                .fetch_query(&key, options, || {
                    let api = api.clone();
                    let path = path.clone();
                    async move { api.get_query(&path, UnauthorizedBehavior::Throw).await }
                })
                .await?;

            match value {
                Some(v) if !v.is_null() => Ok(Some(serde_json::from_value(v)?)),
                _ => Ok(None),
            }
        }
    }

    /// 조회 결과 반영. 최신 요청이 아니면 버리고 `false` 반환
    pub fn finish_load(&mut self, ticket: LoadTicket, result: ClientResult<Option<Question>>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "[Detail] discarding stale response for question {} (generation {} < {})",
                ticket.question_id,
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.status = match result {
            Ok(Some(question)) => QuestionStatus::Ready(Box::new(question)),
            Ok(None) => QuestionStatus::NotFound,
            Err(e) => {
                tracing::warn!("[Detail] question {} unavailable: {}", ticket.question_id, e);
                QuestionStatus::NotFound
            }
        };
        true
    }

    /// 현재 질문 다시 조회
    pub async fn refresh(&mut self) {
        let Some(question_id) = self.question_id else {
            return;
        };
        let ticket = self.begin_load(question_id);
        let result = self.question_fetch(ticket).await;
        self.finish_load(ticket, result);
    }

    /// 렌더 모델 계산
    pub fn render_at(&self, now: DateTime<Utc>) -> DetailView {
        match &self.status {
            QuestionStatus::Loading => DetailView::Loading,
            QuestionStatus::NotFound => DetailView::NotFound(NotFoundView::new(&self.settings.home_route)),
            QuestionStatus::Ready(question) => DetailView::Loaded(Box::new(render_question(
                question,
                &self.session,
                self.ui,
                self.accept_pending,
                now,
            ))),
        }
    }

    pub fn render(&self) -> DetailView {
        self.render_at(Utc::now())
    }

    fn loaded_question_id(&self) -> MutationResult<i64> {
        self.question()
            .map(|q| q.id)
            .ok_or_else(|| MutationError::new(MutationErrorKind::Failed, "Question is not loaded"))
    }

    fn require_session(&mut self, description: &str) -> MutationResult<()> {
        if self.session.is_authenticated {
            return Ok(());
        }
        self.notices.push(Notice::login_required(description));
        Err(MutationError::login_required())
    }

    /// 뮤테이션 실패 처리: 401이면 알림 + 지연 후 로그인으로 이동, 그 외에는 일반 실패 알림
    fn handle_mutation_error(&mut self, error: ClientError, failure: &str) -> MutationError {
        let error = MutationError::from(error);
        match error.kind {
            MutationErrorKind::Unauthorized => {
                self.notices.push(Notice::unauthorized());
                if let Some(previous) = self.pending_redirect.take() {
                    previous.abort();
                }
                self.pending_redirect = Some(schedule_login_redirect(
                    self.navigator.clone(),
                    self.settings.login_url.clone(),
                    self.settings.redirect_delay,
                ));
            }
            _ => self.notices.push(Notice::error(failure)),
        }
        error
    }

    /// 답변 채택 (질문 작성자 여부는 호출자가 확인)
    pub async fn accept_answer(&mut self, answer_id: i64) -> MutationResult<()> {
        let ticket = self.begin_accept(answer_id)?;
        let result = self.accept_request(ticket).await;
        self.finish_accept(ticket, result).await
    }

    /// 채택 시작. 끝날 때까지 렌더 모델의 채택 버튼이 비활성화됨
    pub fn begin_accept(&mut self, answer_id: i64) -> MutationResult<AcceptTicket> {
        let question_id = self.loaded_question_id()?;
        if self.accept_pending {
            return Err(MutationError::new(
                MutationErrorKind::Failed,
                "An answer is already being accepted",
            ));
        }
        self.accept_pending = true;
        Ok(AcceptTicket {
            question_id,
            answer_id,
        })
    }

    /// 채택 요청 future. 컨트롤러를 빌리지 않으므로 진행 중에도 렌더할 수 있음
    pub fn accept_request(
        &self,
        ticket: AcceptTicket,
    ) -> impl Future<Output = ClientResult<()>> + Send + 'static {
        let api = self.api.clone();
        async move { api.accept_answer(ticket.question_id, ticket.answer_id).await }
    }

    /// 채택 결과 반영: 성공이면 무효화 후 다시 조회, 실패면 알림(401이면 로그인 이동 예약)
    pub async fn finish_accept(&mut self, ticket: AcceptTicket, result: ClientResult<()>) -> MutationResult<()> {
        self.accept_pending = false;

        match result {
            Ok(()) => {
                tracing::info!(
                    "[Detail] answer {} accepted on question {}",
                    ticket.answer_id,
                    ticket.question_id
                );
                self.queries.invalidate_queries(&QueryKey::questions()).await;
                self.queries.invalidate_queries(&QueryKey::question(ticket.question_id)).await;
                self.notices.push(Notice::success("Answer accepted successfully"));
                if self.question_id == Some(ticket.question_id) {
                    self.refresh().await;
                }
                Ok(())
            }
            Err(e) => Err(self.handle_mutation_error(e, "Failed to accept answer")),
        }
    }

    /// 답변 작성
    pub async fn submit_answer(&mut self, content: &str) -> MutationResult<()> {
        let question_id = self.loaded_question_id()?;
        self.require_session("Please login to answer this question")?;

        if html_is_blank(content) {
            self.notices.push(Notice::error("Answer cannot be empty"));
            return Err(MutationError::invalid("Answer cannot be empty"));
        }

        let answer = NewAnswer {
            content: content.to_string(),
        };
        match self.api.submit_answer(question_id, &answer).await {
            Ok(_) => {
                self.ui.show_answer_form = false;
                self.queries.invalidate_queries(&QueryKey::question(question_id)).await;
                self.notices.push(Notice::success("Answer posted successfully"));
                self.refresh().await;
                Ok(())
            }
            Err(e) => Err(self.handle_mutation_error(e, "Failed to post answer")),
        }
    }

    /// 질문/답변 투표. 합계는 서버에서 다시 받아옴
    pub async fn vote(&mut self, target: VoteTarget, direction: VoteDirection) -> MutationResult<()> {
        let question_id = self.loaded_question_id()?;
        self.require_session("Please login to vote")?;

        match self.api.vote(target, direction).await {
            Ok(()) => {
                self.queries.invalidate_queries(&QueryKey::questions()).await;
                self.queries.invalidate_queries(&QueryKey::question(question_id)).await;
                self.refresh().await;
                Ok(())
            }
            Err(e) => Err(self.handle_mutation_error(e, "Failed to vote")),
        }
    }

    /// 질문하기 모달 열기 (로그인 필요)
    pub fn ask_question(&mut self) -> MutationResult<()> {
        self.require_session("Please login to ask a question")?;
        self.ui.ask_modal_open = true;
        Ok(())
    }

    pub fn close_ask_modal(&mut self) {
        self.ui.ask_modal_open = false;
    }

    /// 질문하기 모달 제출
    pub async fn submit_question(&mut self, question: NewQuestion) -> MutationResult<serde_json::Value> {
        self.require_session("Please login to ask a question")?;

        if question.title.trim().is_empty() || html_is_blank(&question.description) {
            self.notices.push(Notice::error("Title and description are required"));
            return Err(MutationError::invalid("Title and description are required"));
        }

        match self.api.create_question(&question).await {
            Ok(created) => {
                self.ui.ask_modal_open = false;
                self.queries.invalidate_queries(&QueryKey::questions()).await;
                self.notices.push(Notice::success("Question posted successfully"));
                Ok(created)
            }
            Err(e) => Err(self.handle_mutation_error(e, "Failed to post question")),
        }
    }

    /// 답변 작성 폼 토글 (로그인 상태에서만)
    pub fn toggle_answer_form(&mut self) {
        if self.session.is_authenticated {
            self.ui.show_answer_form = !self.ui.show_answer_form;
        }
    }

    pub fn open_answer_form(&mut self) {
        if self.session.is_authenticated {
            self.ui.show_answer_form = true;
        }
    }

    /// 헤더의 챗봇 버튼. 질문이 로드된 화면에서는 토글, 로딩/없음 화면에서는 열기만 함
    pub fn toggle_chatbot(&mut self) {
        self.ui.chatbot_open = match self.status {
            QuestionStatus::Ready(_) => !self.ui.chatbot_open,
            _ => true,
        };
    }

    pub fn close_chatbot(&mut self) {
        self.ui.chatbot_open = false;
    }

    /// 홈으로 이동 (없음 화면의 복구 동작)
    pub fn navigate_home(&self) {
        self.navigator.navigate(&self.settings.home_route);
    }
}

/// 태그와 `&nbsp;`를 제외하면 내용이 없는지
fn html_is_blank(html: &str) -> bool {
    let mut in_tag = false;
    let mut text = String::new();
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ").trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::fake::FakeTransport;
    use crate::api::{ApiResponse, AUTH_USER_PATH};
    use crate::navigation::RecordingNavigator;
    use crate::query::QueryEvent;
    use crate::view::render::fixtures;
    use reqwest::Method;
    use serde_json::json;

    const LOGIN_URL: &str = "http://localhost:5000/api/login";

    struct Harness {
        queries: QueryClient,
        navigator: Arc<RecordingNavigator>,
        controller: QuestionDetailController,
    }

    fn harness(fake: Arc<FakeTransport>) -> Harness {
        let queries = QueryClient::new();
        let api = ForumApi::new(fake.clone());
        let sessions = SessionProvider::new(queries.clone(), api.clone());
        let navigator = Arc::new(RecordingNavigator::new());
        let controller = QuestionDetailController::new(
            queries.clone(),
            api,
            sessions,
            navigator.clone(),
            DetailSettings {
                login_url: LOGIN_URL.to_string(),
                redirect_delay: Duration::from_millis(500),
                home_route: "/".to_string(),
            },
        );
        Harness {
            queries,
            navigator,
            controller,
        }
    }

    fn author_json() -> serde_json::Value {
        json!({ "id": "u-1", "name": "Ada Lovelace", "username": "ada" })
    }

    fn question_json(id: i64, accepted: bool) -> serde_json::Value {
        json!({
            "id": id,
            "title": "How do lifetimes work?",
            "description": "<p>Explain please</p>",
            "tags": ["rust"],
            "votes": 2,
            "views": 10,
            "authorId": "u-1",
            "author": author_json(),
            "answers": [{
                "id": 9,
                "content": "<p>Borrowing</p>",
                "votes": 0,
                "isAccepted": accepted,
                "authorId": "u-2",
                "author": { "id": "u-2", "username": "grace" },
                "createdAt": "2026-10-17T10:00:00Z"
            }],
            "createdAt": "2026-10-16T10:00:00Z"
        })
    }

    fn signed_in_as_author(fake: &FakeTransport) {
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::json(200, &author_json()));
    }

    fn signed_out(fake: &FakeTransport) {
        fake.on(Method::GET, AUTH_USER_PATH, ApiResponse::new(401, "Unauthorized"));
    }

    #[tokio::test]
    async fn test_mount_renders_loaded_question() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        let mut h = harness(fake);

        h.controller.mount(3).await;
        let DetailView::Loaded(view) = h.controller.render_at(fixtures::now()) else {
            panic!("expected loaded view");
        };
        assert_eq!(view.id, 3);
        assert!(view.is_question_author);
        assert!(view.answers[0].can_accept);
        assert_eq!(view.stats.answers, 1);
    }

    #[tokio::test]
    async fn test_not_found_and_network_failure_render_the_same() {
        let fake = Arc::new(FakeTransport::new());
        signed_out(&fake);
        fake.on(Method::GET, "/api/questions/404", ApiResponse::new(404, "Question not found"));
        fake.on_error(
            Method::GET,
            "/api/questions/500",
            ClientError::InvalidOperation("connection refused".to_string()),
        );
        let mut h = harness(fake.clone());

        h.controller.mount(404).await;
        let missing = h.controller.render_at(fixtures::now());
        h.controller.mount(500).await;
        let unreachable = h.controller.render_at(fixtures::now());

        assert_eq!(missing, unreachable);
        let DetailView::NotFound(view) = missing else {
            panic!("expected not found view");
        };
        assert_eq!(view.recovery.label, "Back to Home");
        // 재시도 없음
        assert_eq!(fake.count(Method::GET, "/api/questions/404"), 1);

        h.controller.navigate_home();
        assert_eq!(h.navigator.routes(), vec!["/".to_string()]);
    }

    #[tokio::test]
    async fn test_null_payload_is_not_found() {
        let fake = Arc::new(FakeTransport::new());
        signed_out(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::new(200, "null"));
        let mut h = harness(fake);

        assert_eq!(h.controller.mount(3).await, &QuestionStatus::NotFound);
    }

    #[tokio::test]
    async fn test_accept_success_invalidates_both_keys_once_then_refetches() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, true)));
        fake.on(Method::POST, "/api/questions/3/answers/9/accept", ApiResponse::new(200, ""));
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        let mut events = h.queries.subscribe();
        h.controller.accept_answer(9).await.unwrap();

        let mut invalidated = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let QueryEvent::Invalidated { filter, .. } = event {
                invalidated.push(filter);
            }
        }
        assert_eq!(invalidated, vec![QueryKey::questions(), QueryKey::question(3)]);

        // 낙관적 업데이트 없이 재조회 결과로 반영
        assert_eq!(fake.count(Method::GET, "/api/questions/3"), 2);
        assert!(h.controller.question().unwrap().answers[0].is_accepted);
        assert_eq!(h.controller.notices().last().unwrap().description, "Answer accepted successfully");
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_unauthorized_redirects_after_delay() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(
            Method::POST,
            "/api/questions/3/answers/9/accept",
            ApiResponse::new(401, "Unauthorized"),
        );
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        let mut events = h.queries.subscribe();
        let err = h.controller.accept_answer(9).await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Unauthorized);
        assert_eq!(h.controller.notices().last().unwrap().title, "Unauthorized");
        // 실패한 뮤테이션은 무효화하지 않음
        assert!(events.try_recv().is_err());
        assert!(h.navigator.redirects().is_empty());

        h.controller.take_pending_redirect().unwrap().await.unwrap();
        assert_eq!(h.navigator.redirects(), vec![LOGIN_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_accept_button_disabled_while_in_flight() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, true)));
        fake.on(Method::POST, "/api/questions/3/answers/9/accept", ApiResponse::new(200, ""));
        let mut h = harness(fake);
        h.controller.mount(3).await;

        let ticket = h.controller.begin_accept(9).unwrap();
        let DetailView::Loaded(view) = h.controller.render_at(fixtures::now()) else {
            panic!("expected loaded view");
        };
        assert!(view.accept_disabled);

        let err = h.controller.begin_accept(9).unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Failed);

        let result = h.controller.accept_request(ticket).await;
        h.controller.finish_accept(ticket, result).await.unwrap();
        let DetailView::Loaded(view) = h.controller.render_at(fixtures::now()) else {
            panic!("expected loaded view");
        };
        assert!(!view.accept_disabled);
        assert!(view.answers[0].is_accepted);
    }

    #[tokio::test]
    async fn test_accept_generic_failure() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::POST, "/api/questions/3/answers/9/accept", ApiResponse::new(500, "boom"));
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        let err = h.controller.accept_answer(9).await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Failed);
        assert_eq!(h.controller.notices().last().unwrap().description, "Failed to accept answer");
        assert!(h.controller.take_pending_redirect().is_none());
        assert_eq!(fake.count(Method::POST, "/api/questions/3/answers/9/accept"), 1);
        assert!(!h.controller.question().unwrap().answers[0].is_accepted);
    }

    #[tokio::test]
    async fn test_ask_question_rejected_when_signed_out() {
        let fake = Arc::new(FakeTransport::new());
        signed_out(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        let mut h = harness(fake);
        h.controller.mount(3).await;

        assert!(!h.controller.session().is_authenticated);
        let err = h.controller.ask_question().unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::LoginRequired);
        assert!(!h.controller.ui().ask_modal_open);
        let notice = h.controller.notices().last().unwrap();
        assert_eq!(notice.title, "Login Required");
        assert_eq!(notice.description, "Please login to ask a question");
    }

    #[tokio::test]
    async fn test_ask_question_and_submit() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::POST, "/api/questions", ApiResponse::json(201, &json!({ "id": 4 })));
        let mut h = harness(fake);
        h.controller.mount(3).await;

        h.controller.ask_question().unwrap();
        assert!(h.controller.ui().ask_modal_open);

        let created = h
            .controller
            .submit_question(NewQuestion {
                title: "Second question".to_string(),
                description: "<p>Details</p>".to_string(),
                tags: vec![],
            })
            .await
            .unwrap();
        assert_eq!(created, json!({ "id": 4 }));
        assert!(!h.controller.ui().ask_modal_open);
    }

    #[tokio::test]
    async fn test_submit_answer_closes_form_and_refetches() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::POST, "/api/questions/3/answers", ApiResponse::json(201, &json!({ "id": 10 })));
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        h.controller.toggle_answer_form();
        assert!(h.controller.ui().show_answer_form);

        let err = h.controller.submit_answer("<p>&nbsp;</p>").await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Invalid);
        assert_eq!(fake.count(Method::POST, "/api/questions/3/answers"), 0);

        h.controller.submit_answer("<p>Use references</p>").await.unwrap();
        assert!(!h.controller.ui().show_answer_form);
        assert_eq!(fake.count(Method::GET, "/api/questions/3"), 2);
    }

    #[tokio::test]
    async fn test_submit_answer_requires_login() {
        let fake = Arc::new(FakeTransport::new());
        signed_out(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        let err = h.controller.submit_answer("<p>Use references</p>").await.unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::LoginRequired);
        assert_eq!(h.controller.notices().last().unwrap().title, "Login Required");
        assert_eq!(fake.count(Method::POST, "/api/questions/3/answers"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vote_unauthorized_redirects_after_delay() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::POST, "/api/answers/9/vote", ApiResponse::new(401, "Unauthorized"));
        let mut h = harness(fake.clone());
        h.controller.mount(3).await;

        let mut events = h.queries.subscribe();
        let err = h
            .controller
            .vote(VoteTarget::Answer(9), VoteDirection::Down)
            .await
            .unwrap_err();
        assert_eq!(err.kind, MutationErrorKind::Unauthorized);
        let notice = h.controller.notices().last().unwrap();
        assert_eq!(notice.title, "Unauthorized");
        assert_eq!(notice.description, "You are logged out. Logging in again...");
        assert!(events.try_recv().is_err());
        assert_eq!(fake.count(Method::GET, "/api/questions/3"), 1);

        let redirect = h.controller.take_pending_redirect().unwrap();
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(h.navigator.redirects().is_empty());
        redirect.await.unwrap();
        assert_eq!(h.navigator.redirects(), vec![LOGIN_URL.to_string()]);
    }

    #[tokio::test]
    async fn test_vote_reconciles_from_server() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        let mut updated = question_json(3, false);
        updated["votes"] = json!(3);
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &question_json(3, false)));
        fake.on(Method::GET, "/api/questions/3", ApiResponse::json(200, &updated));
        fake.on(Method::POST, "/api/questions/3/vote", ApiResponse::new(200, ""));
        let mut h = harness(fake);
        h.controller.mount(3).await;

        let mut events = h.queries.subscribe();
        h.controller
            .vote(VoteTarget::Question(3), VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(h.controller.question().unwrap().votes, 3);

        let invalidations = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, QueryEvent::Invalidated { .. }))
            .count();
        assert_eq!(invalidations, 2);
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let fake = Arc::new(FakeTransport::new());
        signed_out(&fake);
        fake.on(Method::GET, "/api/questions/1", ApiResponse::json(200, &question_json(1, false)));
        fake.on(Method::GET, "/api/questions/2", ApiResponse::json(200, &question_json(2, false)));
        let mut h = harness(fake);

        let first = h.controller.begin_load(1);
        let first_fetch = h.controller.question_fetch(first);
        let second = h.controller.begin_load(2);
        let second_fetch = h.controller.question_fetch(second);

        let (first_result, second_result) = tokio::join!(first_fetch, second_fetch);
        assert!(h.controller.finish_load(second, second_result));
        assert!(!h.controller.finish_load(first, first_result));

        assert_eq!(h.controller.question().map(|q| q.id), Some(2));
    }

    #[tokio::test]
    async fn test_navigation_resets_ui_flags() {
        let fake = Arc::new(FakeTransport::new());
        signed_in_as_author(&fake);
        fake.on(Method::GET, "/api/questions/1", ApiResponse::json(200, &question_json(1, false)));
        fake.on(Method::GET, "/api/questions/2", ApiResponse::json(200, &question_json(2, false)));
        let mut h = harness(fake);

        h.controller.mount(1).await;
        h.controller.toggle_answer_form();
        h.controller.toggle_chatbot();
        assert!(h.controller.ui().chatbot_open);

        h.controller.mount(2).await;
        assert_eq!(h.controller.ui(), UiFlags::default());
    }

    #[tokio::test]
    async fn test_chatbot_toggle_before_load_only_opens() {
        let fake = Arc::new(FakeTransport::new());
        let mut h = harness(fake);

        h.controller.toggle_chatbot();
        h.controller.toggle_chatbot();
        assert!(h.controller.ui().chatbot_open);
        assert_eq!(h.controller.render_at(fixtures::now()), DetailView::Loading);

        h.controller.close_chatbot();
        assert!(!h.controller.ui().chatbot_open);
    }

    #[test]
    fn test_html_is_blank() {
        assert!(html_is_blank(""));
        assert!(html_is_blank("<p><br></p>"));
        assert!(html_is_blank("<p>&nbsp; </p>"));
        assert!(!html_is_blank("<p>text</p>"));
    }
}
