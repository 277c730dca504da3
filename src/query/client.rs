//! 쿼리 캐시 클라이언트
//!
//! 원격 조회 결과를 쿼리 키별로 보관하고, 무효화된 키는 다음 조회 때 다시 가져옵니다.
//! 전역 싱글톤이 아니라 앱 시작 시 생성해서 명시적으로 넘겨주는 컨텍스트 객체입니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::Instant;

use crate::error::{ClientError, ClientResult};
use crate::query::key::QueryKey;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// 캐시 데이터가 "신선"하다고 보는 기간
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleTime {
    After(Duration),
    /// 무효화 전까지 항상 신선
    Infinite,
}

impl StaleTime {
    /// 즉시 stale (마운트할 때마다 다시 조회)
    pub const ZERO: StaleTime = StaleTime::After(Duration::ZERO);

    fn is_fresh(&self, age: Duration) -> bool {
        match self {
            StaleTime::Infinite => true,
            StaleTime::After(limit) => age < *limit,
        }
    }
}

/// 쿼리 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: StaleTime,
    /// 실패 시 추가 시도 횟수 (0 = 재시도 없음)
    pub retry: u32,
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: StaleTime::Infinite,
            retry: 0,
            enabled: true,
        }
    }
}

impl QueryOptions {
    pub fn stale_time(mut self, stale_time: StaleTime) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// 캐시 변경 이벤트 (구독자가 다시 그리기/다시 조회하는 신호)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEvent {
    Updated(QueryKey),
    Failed { key: QueryKey, error: String },
    /// `invalidate_queries` 호출 1회당 정확히 1개
    Invalidated { filter: QueryKey, matched: usize },
    Cleared,
}

/// 쿼리 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// 아직 결과가 저장된 적 없음
    Idle,
    Success,
    Error,
}

/// 캐시 항목 스냅샷
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: FetchStatus,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub is_invalidated: bool,
    pub updated_at: Option<Instant>,
    pub fetch_count: u32,
}

#[derive(Debug, Default)]
struct CacheEntry {
    data: Option<serde_json::Value>,
    error: Option<String>,
    updated_at: Option<Instant>,
    invalidated: bool,
    fetch_count: u32,
}

impl CacheEntry {
    fn fresh_data(&self, stale_time: StaleTime) -> Option<&serde_json::Value> {
        if self.invalidated {
            return None;
        }
        let updated_at = self.updated_at?;
        if stale_time.is_fresh(updated_at.elapsed()) {
            self.data.as_ref()
        } else {
            None
        }
    }

    fn state(&self) -> QueryState {
        let status = if self.error.is_some() {
            FetchStatus::Error
        } else if self.updated_at.is_some() {
            FetchStatus::Success
        } else {
            FetchStatus::Idle
        };
        QueryState {
            status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_invalidated: self.invalidated,
            updated_at: self.updated_at,
            fetch_count: self.fetch_count,
        }
    }
}

/// 진행 중인 조회의 결과 (`None` = 아직 진행 중)
type SharedResult = Option<ClientResult<serde_json::Value>>;

struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    /// 키별 진행 중 조회. 같은 키의 동시 조회는 하나의 요청을 공유
    in_flight: Mutex<HashMap<QueryKey, watch::Receiver<SharedResult>>>,
    events: broadcast::Sender<QueryEvent>,
    closed: AtomicBool,
}

impl QueryCache {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<QueryKey, watch::Receiver<SharedResult>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 선행 조회가 끝나거나 취소(drop)되면 진행 중 표시를 지움
struct InFlightGuard<'a> {
    cache: &'a QueryCache,
    key: &'a QueryKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock_in_flight().remove(self.key);
    }
}

/// 쿼리 캐시 컨텍스트 (clone 시 같은 캐시를 공유)
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryCache>,
}

impl QueryClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(QueryCache {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                events,
                closed: AtomicBool::new(false),
            }),
        }
    }

    fn emit(&self, event: QueryEvent) {
        // 구독자가 없으면 send가 실패하지만 무시해도 됨
        let _ = self.inner.events.send(event);
    }

    fn ensure_open(&self) -> ClientResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(ClientError::Shutdown);
        }
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// 캐시 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<QueryEvent> {
        self.inner.events.subscribe()
    }

    /// 캐시된 값이 신선하면 그대로, 아니면 `fetcher`로 다시 조회
    ///
    /// 같은 키의 조회가 이미 진행 중이면 `fetcher`를 호출하지 않고 그 결과를 함께 받습니다.
    /// 비활성화된 쿼리는 `fetcher`를 호출하지 않고 `Ok(None)`을 반환합니다.
    pub async fn fetch_query<F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> ClientResult<Option<serde_json::Value>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ClientResult<serde_json::Value>>,
    {
        self.ensure_open()?;
        if !options.enabled {
            return Ok(None);
        }

        loop {
            if let Some(data) = self.cached_fresh(key, options.stale_time).await {
                tracing::debug!("[Query] {} served from cache", key);
                return Ok(Some(data));
            }

            let joined = {
                let mut in_flight = self.inner.lock_in_flight();
                let existing = in_flight.get(key).cloned();
                match existing {
                    Some(receiver) => Err(receiver),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        in_flight.insert(key.clone(), receiver);
                        Ok(sender)
                    }
                }
            };

            let mut receiver = match joined {
                Ok(sender) => return self.lead_fetch(key, options, &fetcher, sender).await.map(Some),
                Err(receiver) => receiver,
            };

            tracing::debug!("[Query] {} joining in-flight fetch", key);
            let shared = receiver
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|result| result.as_ref().cloned());
            if let Some(result) = shared {
                return result.map(Some);
            }
            // 앞선 조회가 취소됨
            tracing::debug!("[Query] {} in-flight fetch dropped, taking over", key);
        }
    }

    async fn cached_fresh(&self, key: &QueryKey, stale_time: StaleTime) -> Option<serde_json::Value> {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .and_then(|e| e.fresh_data(stale_time))
            .cloned()
    }

    /// 진행 중 표시를 잡은 호출자만 실행. 결과는 기다리던 호출자들에게 전달
    async fn lead_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: &F,
        sender: watch::Sender<SharedResult>,
    ) -> ClientResult<serde_json::Value>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ClientResult<serde_json::Value>>,
    {
        let guard = InFlightGuard { cache: &self.inner, key };

        // 직전에 끝난 조회가 캐시를 채웠을 수 있음
        let result = match self.cached_fresh(key, options.stale_time).await {
            Some(data) => Ok(data),
            None => self.run_fetch(key, options, fetcher).await,
        };

        drop(guard);
        let _ = sender.send(Some(result.clone()));
        result
    }

    async fn run_fetch<F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: &F,
    ) -> ClientResult<serde_json::Value>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ClientResult<serde_json::Value>>,
    {
        tracing::debug!("[Query] {} fetching", key);
        let mut attempt = 0u32;
        let result = loop {
            match fetcher().await {
                Ok(value) => break Ok(value),
                Err(e) if attempt < options.retry => {
                    // 지수 백오프: 1s, 2s, 4s ... 최대 30s
                    let delay_ms = std::cmp::min(1000u64 << attempt.min(15), MAX_RETRY_DELAY_MS);
                    tracing::warn!(
                        "[Query] {} attempt {} failed: {}. Retrying in {}ms...",
                        key,
                        attempt + 1,
                        e,
                        delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };

        // 조회 중 종료되었다면 결과를 저장하지 않음
        self.ensure_open()?;

        let mut entries = self.inner.entries.write().await;
        let entry = entries.entry(key.clone()).or_default();
        entry.fetch_count += 1;

        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.invalidated = false;
                drop(entries);

                self.emit(QueryEvent::Updated(key.clone()));
                Ok(value)
            }
            Err(e) => {
                entry.error = Some(e.to_string());
                drop(entries);

                tracing::warn!("[Query] {} failed: {}", key, e);
                self.emit(QueryEvent::Failed {
                    key: key.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// 필터와 일치하는 모든 항목을 무효화 (다음 조회 때 다시 가져옴)
    ///
    /// 일치하는 항목이 없어도 이벤트는 1회 발생합니다. 일치한 항목 수를 반환합니다.
    pub async fn invalidate_queries(&self, filter: &QueryKey) -> usize {
        let matched = {
            let mut entries = self.inner.entries.write().await;
            let mut matched = 0usize;
            for (key, entry) in entries.iter_mut() {
                if key.starts_with(filter) {
                    entry.invalidated = true;
                    matched += 1;
                }
            }
            matched
        };

        tracing::debug!("[Query] invalidated {} ({} entries)", filter, matched);
        self.emit(QueryEvent::Invalidated {
            filter: filter.clone(),
            matched,
        });
        matched
    }

    pub async fn get_query_data(&self, key: &QueryKey) -> Option<serde_json::Value> {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .and_then(|e| e.data.clone())
    }

    /// 원격 조회 없이 캐시 값을 직접 설정
    pub async fn set_query_data(&self, key: &QueryKey, value: serde_json::Value) -> ClientResult<()> {
        self.ensure_open()?;
        {
            let mut entries = self.inner.entries.write().await;
            let entry = entries.entry(key.clone()).or_default();
            entry.data = Some(value);
            entry.error = None;
            entry.updated_at = Some(Instant::now());
            entry.invalidated = false;
        }
        self.emit(QueryEvent::Updated(key.clone()));
        Ok(())
    }

    /// 캐시 항목 상태 (항목이 없으면 `Idle`)
    pub async fn query_state(&self, key: &QueryKey) -> QueryState {
        self.inner
            .entries
            .read()
            .await
            .get(key)
            .map(CacheEntry::state)
            .unwrap_or_else(|| CacheEntry::default().state())
    }

    /// 필터와 일치하는 항목 삭제
    pub async fn remove_queries(&self, filter: &QueryKey) -> usize {
        let mut entries = self.inner.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(filter));
        before - entries.len()
    }

    /// 캐시 종료: 모든 항목을 비우고 이후 조회를 거부
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.entries.write().await.clear();
        tracing::info!("[Query] Cache shut down");
        self.emit(QueryEvent::Cleared);
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}
