// src/health.rs

use crate::{
    client::RobustClient,
    config::{
        AppConfig,
        remote::{ConfigSnapshot, RemoteConfigSync},
        state::StateStore,
    },
    constants::health,
    error::AppResult,
};
use futures::future::join_all;
use log::{info, warn};
use regex::Regex;
use std::{
    sync::{LazyLock, Mutex},
    time::Duration,
};
use tokio::task::JoinHandle;
use url::Url;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// 当前页面的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub host: String,
    pub title: String,
    pub body: String,
}

impl PageSnapshot {
    pub fn from_html(url: &str, html: &str) -> AppResult<Self> {
        let host = Url::parse(url)?.host_str().unwrap_or_default().to_lowercase();
        let title = TITLE_RE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        Ok(Self {
            host,
            title,
            body: html.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSignature {
    ServerErrorTitle,
    DeserializeError,
}

impl FailureSignature {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSignature::ServerErrorTitle => "http_500",
            FailureSignature::DeserializeError => "deserialize_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthVerdict {
    /// 页面不属于任何后端线路，监测不生效
    NotBackend,
    Healthy,
    Incident {
        signature: FailureSignature,
        notice: &'static str,
        reported: bool,
    },
}

pub fn detect_failure(page: &PageSnapshot) -> Option<FailureSignature> {
    if page.title.contains(health::SERVER_ERROR_TITLE) {
        return Some(FailureSignature::ServerErrorTitle);
    }
    let body = page.body.to_lowercase();
    health::DESERIALIZE_ERROR_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
        .then_some(FailureSignature::DeserializeError)
}

fn endpoint_host(endpoint: &str) -> Option<String> {
    Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// 只在后端域名的页面上运行的故障监测
pub struct ServiceHealthMonitor<'a> {
    client: &'a RobustClient,
    store: &'a StateStore,
    sync: &'a RemoteConfigSync,
    known_endpoints: Vec<String>,
    report_cooldown: Duration,
    pending_reports: Mutex<Vec<JoinHandle<()>>>,
}

impl<'a> ServiceHealthMonitor<'a> {
    pub fn new(
        client: &'a RobustClient,
        store: &'a StateStore,
        sync: &'a RemoteConfigSync,
        config: &AppConfig,
        snapshot: &ConfigSnapshot,
    ) -> Self {
        let mut known_endpoints = snapshot.endpoints.clone();
        known_endpoints.extend(config.fallback_apis.iter().cloned());
        Self {
            client,
            store,
            sync,
            known_endpoints,
            report_cooldown: config.report_cooldown,
            pending_reports: Mutex::new(Vec::new()),
        }
    }

    pub fn is_backend_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.known_endpoints
            .iter()
            .filter_map(|e| endpoint_host(e))
            .any(|h| h == host)
    }

    pub async fn inspect(&self, page: &PageSnapshot, now_ms: i64) -> AppResult<HealthVerdict> {
        if !self.is_backend_host(&page.host) {
            return Ok(HealthVerdict::NotBackend);
        }
        let Some(signature) = detect_failure(page) else {
            return Ok(HealthVerdict::Healthy);
        };

        warn!("检测到后端故障页面 ({}): {}", page.host, signature.as_str());
        let state = self.store.update(|state| state.lockout = true)?;

        let mut reported = false;
        if state.report_due(now_ms, self.report_cooldown) {
            match self.sync.fetch().await {
                Ok(remote) => {
                    if let Some(report_url) = remote.report_url.filter(|u| !u.trim().is_empty()) {
                        info!("上报故障: {}", report_url);
                        let handle = self.client.fire_and_forget(
                            report_url,
                            vec![
                                ("host".to_string(), page.host.clone()),
                                ("reason".to_string(), signature.as_str().to_string()),
                            ],
                        );
                        if let Ok(mut pending) = self.pending_reports.lock() {
                            pending.push(handle);
                        }
                        reported = true;
                    }
                }
                Err(e) => warn!("获取上报地址失败: {}", e),
            }
            self.store.update(|state| state.last_report_time = now_ms)?;
        } else {
            info!("距离上次上报不足冷却时间，跳过上报");
        }

        Ok(HealthVerdict::Incident {
            signature,
            notice: health::INCIDENT_NOTICE,
            reported,
        })
    }

    /// 进程退出前给尚未完成的上报请求一点时间
    pub async fn flush_reports(&self, grace: Duration) {
        let handles: Vec<_> = match self.pending_reports.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };
        if handles.is_empty() {
            return;
        }
        if tokio::time::timeout(grace, join_all(handles)).await.is_err() {
            warn!("上报请求未在 {:?} 内完成", grace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, body: &str) -> PageSnapshot {
        PageSnapshot {
            host: "dl.example.com".into(),
            title: title.into(),
            body: body.into(),
        }
    }

    #[test]
    fn test_detect_failure() {
        assert_eq!(
            detect_failure(&page("500 Internal Server Error", "")),
            Some(FailureSignature::ServerErrorTitle)
        );
        assert_eq!(
            detect_failure(&page("AList", "{\"message\":\"json: cannot unmarshal string into Go value\"}")),
            Some(FailureSignature::DeserializeError)
        );
        assert_eq!(detect_failure(&page("AList", "<div>ok</div>")), None);
    }

    #[test]
    fn test_page_snapshot_from_html() {
        let snapshot = PageSnapshot::from_html(
            "https://DL.Example.com/path?x=1",
            "<html><head><TITLE>\n 500 Internal Server Error </TITLE></head></html>",
        )
        .unwrap();
        assert_eq!(snapshot.host, "dl.example.com");
        assert_eq!(snapshot.title, "500 Internal Server Error");
    }
}
