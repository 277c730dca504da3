//! 화면 이동 및 로그인 리다이렉트

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

/// 앱 내 이동과 외부 리다이렉트 추상화
pub trait Navigator: Send + Sync {
    /// 앱 내부 라우트로 이동 (예: `/`)
    fn navigate(&self, route: &str);

    /// 앱을 떠나 외부 URL로 이동 (예: 로그인 진입점)
    fn redirect(&self, url: &str);
}

/// 시스템 브라우저를 여는 Navigator
#[derive(Debug, Default)]
pub struct BrowserNavigator {
    current_route: Mutex<String>,
}

impl BrowserNavigator {
    pub fn new() -> Self {
        Self {
            current_route: Mutex::new("/".to_string()),
        }
    }

    pub fn current_route(&self) -> String {
        self.current_route
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, route: &str) {
        tracing::info!("[Nav] -> {}", route);
        if let Ok(mut current) = self.current_route.lock() {
            *current = route.to_string();
        }
    }

    fn redirect(&self, url: &str) {
        tracing::info!("[Nav] Opening {}", url);
        if let Err(e) = open::that(url) {
            tracing::warn!("[Nav] Failed to open browser: {}", e);
        }
    }
}

/// 이동 기록만 남기는 Navigator (CLI 드라이런, 테스트용)
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route.to_string());
        }
    }

    fn redirect(&self, url: &str) {
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(url.to_string());
        }
    }
}

/// `delay` 후 로그인 URL로 리다이렉트하는 작업 예약
pub fn schedule_login_redirect(
    navigator: Arc<dyn Navigator>,
    login_url: String,
    delay: Duration,
) -> JoinHandle<()> {
    tracing::info!("[Nav] Redirecting to {} in {:?}", login_url, delay);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        navigator.redirect(&login_url);
    })
}
