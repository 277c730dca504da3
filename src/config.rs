//! Client Configuration
//!
//! 환경 변수(`.env.local`, `.env` 포함)에서 클라이언트 설정을 읽습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_LOGIN_PATH: &str = "/api/login";
const DEFAULT_HOME_ROUTE: &str = "/";
const DEFAULT_REDIRECT_DELAY_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "info";

/// 클라이언트 설정
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API 서버 주소 (`/api/...` 경로의 기준)
    pub api_base_url: Url,
    /// 인증 실패 시 이동할 로그인 진입점
    pub login_path: String,
    /// "홈으로" 복구 동작의 라우트
    pub home_route: String,
    /// 로그인 리다이렉트 전 대기 시간
    pub redirect_delay: Duration,
    pub request_timeout: Duration,
    /// tracing EnvFilter 지시어
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base url is valid"),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            home_route: DEFAULT_HOME_ROUTE.to_string(),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    /// 프로세스 환경 변수에서 설정 로드
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 구성 (테스트에서 환경 변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(base) = get("QA_API_BASE_URL") {
            config.api_base_url = Url::parse(&base)
                .map_err(|e| ClientError::Config(format!("Invalid QA_API_BASE_URL '{}': {}", base, e)))?;
        }
        if let Some(path) = get("QA_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(ms) = get("QA_REDIRECT_DELAY_MS") {
            let ms = ms
                .parse::<u64>()
                .map_err(|e| ClientError::Config(format!("Invalid QA_REDIRECT_DELAY_MS '{}': {}", ms, e)))?;
            config.redirect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = get("QA_REQUEST_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| ClientError::Config(format!("Invalid QA_REQUEST_TIMEOUT_SECS '{}': {}", secs, e)))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(filter) = get("QA_LOG").or_else(|| get("RUST_LOG")) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// 로그인 진입점 전체 URL
    pub fn login_url(&self) -> ClientResult<Url> {
        self.api_base_url
            .join(&self.login_path)
            .map_err(|e| ClientError::Config(format!("Invalid login path '{}': {}", self.login_path, e)))
    }
}

const ENV_LOCAL_FILE: &str = ".env.local";
const MAX_PARENT_DIRS: usize = 6;

/// `.env.local`(현재 디렉토리부터 상위로 탐색)과 `.env`를 로드
///
/// 파일이 없어도 실패하지 않습니다. 로드된 `.env.local` 경로를 반환합니다.
pub fn load_env_files() -> Option<PathBuf> {
    let found = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_env_local(&cwd))
        .filter(|path| load_env_file(path));

    let _ = dotenvy::dotenv();
    found
}

fn find_env_local(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_PARENT_DIRS + 1)
        .map(|dir| dir.join(ENV_LOCAL_FILE))
        .find(|candidate| candidate.is_file())
}

/// 단일 env 파일 로드. dotenvy 파싱이 실패하면 `KEY=VALUE` 라인만 골라 적용
pub fn load_env_file(path: &Path) -> bool {
    if dotenvy::from_path(path).is_ok() {
        return true;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let pairs = parse_env_pairs(&text);
            tracing::debug!("[Config] {} parsed leniently ({} keys)", path.display(), pairs.len());
            let mut applied = 0usize;
            for (key, value) in pairs {
                // 이미 값이 있는 키는 덮어쓰지 않음
                if std::env::var(&key).map_or(true, |v| v.trim().is_empty()) {
                    std::env::set_var(&key, value);
                    applied += 1;
                }
            }
            applied > 0
        }
        Err(e) => {
            tracing::warn!("[Config] Failed to read {}: {}", path.display(), e);
            false
        }
    }
}

/// 대문자 키의 `KEY=VALUE` 라인만 추출 (주석, 설명 문장 등은 건너뜀)
fn parse_env_pairs(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().trim_start_matches("export ").trim(), value.trim()))
        .filter(|(key, _)| {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        })
        .map(|(key, value)| (key.to_string(), unquote(value).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value)
}
