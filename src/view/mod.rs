//! 화면 컨트롤러 모듈
//!
//! - `detail`: 질문 상세 컨트롤러 (조회, UI 플래그, 뮤테이션)
//! - `render`: 호스트가 그릴 렌더 모델
//! - `display`: 표시 이름, 이니셜, 상대 시간

pub mod detail;
pub mod display;
pub mod render;

pub use detail::{AcceptTicket, DetailSettings, LoadTicket, QuestionDetailController, QuestionStatus};
pub use render::{DetailView, QuestionView, UiFlags};
