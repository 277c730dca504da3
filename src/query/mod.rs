//! 쿼리 캐시 모듈
//!
//! - 쿼리 키별 결과 캐시 (stale time, 재시도 옵션)
//! - 키 기반 무효화 프로토콜: 뮤테이션 성공 후 관련 키를 무효화하면 다음 조회 때 다시 가져옴
//! - 변경 이벤트 브로드캐스트

pub mod client;
pub mod key;

pub use client::{FetchStatus, QueryClient, QueryEvent, QueryOptions, QueryState, StaleTime};
pub use key::QueryKey;
