// src/config/remote.rs

use super::{AppConfig, normalize_endpoints, state::{DurableState, StateStore}};
use crate::{
    client::RobustClient,
    constants::messages,
    error::{AppError, AppResult},
    transfer::pool::ApiPool,
};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// 远程控制文档。缺省字段表示 "保持不变"，未知字段忽略。
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(alias = "apis")]
    pub endpoints: Option<Vec<String>>,
    #[serde(alias = "target", alias = "api")]
    pub endpoint: Option<String>,
    pub enabled: Option<bool>,
    pub message: Option<String>,
    pub reset_token: Option<String>,
    pub report_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RemoteDocument {
    // 旧版文档直接是线路数组
    List(Vec<String>),
    Config(RemoteConfig),
}

impl RemoteConfig {
    pub fn parse(value: Value) -> AppResult<Self> {
        match serde_json::from_value::<RemoteDocument>(value) {
            Ok(RemoteDocument::List(endpoints)) => Ok(Self {
                endpoints: Some(endpoints),
                ..Default::default()
            }),
            Ok(RemoteDocument::Config(config)) => Ok(config),
            Err(e) => Err(AppError::RemoteConfig(e.to_string())),
        }
    }

    /// 有效的线路列表；为空时返回 None
    pub fn endpoint_list(&self) -> Option<Vec<String>> {
        let list = match (&self.endpoints, &self.endpoint) {
            (Some(list), _) => normalize_endpoints(list),
            (None, Some(single)) => normalize_endpoints([single]),
            (None, None) => return None,
        };
        (!list.is_empty()).then_some(list)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Fallback,
    Remote,
}

/// 某一时刻的只读配置。更新时生成新的快照，不做原地修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub endpoints: Vec<String>,
    pub remote_enabled: bool,
    pub locked_out: bool,
    pub message: Option<String>,
    pub report_url: Option<String>,
    pub source_prefix: String,
    pub failover_backoff: Duration,
    pub default_rate_limit_secs: u64,
    pub origin: SnapshotOrigin,
}

impl ConfigSnapshot {
    pub fn fallback(config: &AppConfig, state: &DurableState) -> Self {
        Self {
            endpoints: config.fallback_apis.clone(),
            remote_enabled: true,
            locked_out: state.lockout,
            message: None,
            report_url: None,
            source_prefix: config.source_prefix.clone(),
            failover_backoff: config.failover_backoff,
            default_rate_limit_secs: config.default_rate_limit_secs,
            origin: SnapshotOrigin::Fallback,
        }
    }

    pub fn is_available(&self) -> bool {
        self.remote_enabled && !self.locked_out
    }

    /// 不可用时给用户看的原因
    pub fn unavailable_reason(&self) -> Option<String> {
        if self.is_available() {
            return None;
        }
        Some(
            self.message
                .clone()
                .unwrap_or_else(|| messages::SERVICE_DISABLED.to_string()),
        )
    }

    /// 为单个任务复制一份线路池
    pub fn pool(&self) -> ApiPool {
        ApiPool::new(self.endpoints.clone())
    }

    pub fn with_lockout(&self, locked_out: bool) -> Self {
        Self {
            locked_out,
            ..self.clone()
        }
    }

    /// 合并远程文档与本地持久化状态，得到新的快照。
    ///
    /// 本地 lockout 会压过远程的 `enabled`，直到远程的 `resetToken`
    /// 与上次保存的不同为止；此时清除 lockout 并记录新的 token。
    pub fn merge(&self, remote: &RemoteConfig, state: &mut DurableState) -> Self {
        let mut next = self.clone();
        if let Some(endpoints) = remote.endpoint_list() {
            next.endpoints = endpoints;
        }
        if let Some(enabled) = remote.enabled {
            next.remote_enabled = enabled;
        }
        if let Some(message) = &remote.message {
            next.message = Some(message.trim().to_string()).filter(|m| !m.is_empty());
        }
        if let Some(report_url) = &remote.report_url {
            next.report_url = Some(report_url.trim().to_string()).filter(|u| !u.is_empty());
        }
        if let Some(token) = &remote.reset_token
            && *token != state.reset_token
        {
            if state.lockout {
                info!("远程 resetToken 已更新，解除故障锁定");
            }
            state.lockout = false;
            state.reset_token = token.clone();
        }
        next.locked_out = state.lockout;
        next.origin = SnapshotOrigin::Remote;
        next
    }
}

pub struct RemoteConfigSync {
    client: Arc<RobustClient>,
    url: Option<String>,
    timeout: Duration,
    store: Arc<StateStore>,
}

impl RemoteConfigSync {
    pub fn new(client: Arc<RobustClient>, config: &AppConfig, store: Arc<StateStore>) -> Self {
        Self {
            client,
            url: config.remote_config_url.clone(),
            timeout: config.remote_timeout,
            store,
        }
    }

    pub async fn fetch(&self) -> AppResult<RemoteConfig> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| AppError::RemoteConfig("未配置远程配置地址".into()))?;
        // 防止 CDN 缓存
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();
        let value = self
            .client
            .fetch_json(url, &[("_t", cache_buster.as_str())], Some(self.timeout))
            .await?;
        let remote = RemoteConfig::parse(value)?;
        debug!("远程配置: {:?}", remote);
        Ok(remote)
    }

    /// 拉取远程配置并生成新快照。任何失败都只会保留当前快照。
    pub async fn sync(&self, current: &ConfigSnapshot) -> ConfigSnapshot {
        let fetched = self.fetch().await;
        let mut state = match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("读取本地状态失败，维持当前配置: {}", e);
                return current.clone();
            }
        };

        match fetched {
            Ok(remote) => {
                let before = state.clone();
                let next = current.merge(&remote, &mut state);
                if state != before
                    && let Err(e) = self.store.save(&state)
                {
                    warn!("保存本地状态失败: {}", e);
                }
                info!(
                    "远程配置更新成功，线路数: {}, 可用: {}",
                    next.endpoints.len(),
                    next.is_available()
                );
                next
            }
            Err(e) => {
                warn!("远程配置获取失败，维持当前配置: {}", e);
                current.with_lockout(state.lockout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::fallback(&AppConfig::with_defaults(), &DurableState::default())
    }

    #[test]
    fn test_parse_legacy_list_and_object() {
        let legacy = RemoteConfig::parse(serde_json::json!(["https://a.example/"])).unwrap();
        assert_eq!(legacy.endpoint_list(), Some(vec!["https://a.example".to_string()]));

        let object = RemoteConfig::parse(serde_json::json!({
            "target": "https://b.example",
            "enabled": false,
            "resetToken": "r2",
            "somethingNew": 1
        }))
        .unwrap();
        assert_eq!(object.endpoint_list(), Some(vec!["https://b.example".to_string()]));
        assert_eq!(object.enabled, Some(false));
        assert_eq!(object.reset_token.as_deref(), Some("r2"));

        assert!(RemoteConfig::parse(serde_json::json!("nope")).is_err());
    }

    #[test]
    fn test_merge_missing_fields_mean_no_change() {
        let mut state = DurableState::default();
        let base = snapshot();
        let next = base.merge(&RemoteConfig::default(), &mut state);
        assert_eq!(next.endpoints, base.endpoints);
        assert!(next.remote_enabled);
        assert_eq!(next.origin, SnapshotOrigin::Remote);

        // 空列表不会清空线路
        let empty = RemoteConfig {
            endpoints: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(base.merge(&empty, &mut state).endpoints, base.endpoints);
    }

    #[test]
    fn test_lockout_persists_until_token_rotates() {
        let mut state = DurableState {
            lockout: true,
            reset_token: "t1".into(),
            last_report_time: 0,
        };
        let base = snapshot();

        let same_token = RemoteConfig {
            enabled: Some(true),
            reset_token: Some("t1".into()),
            ..Default::default()
        };
        let next = base.merge(&same_token, &mut state);
        assert!(next.locked_out);
        assert!(!next.is_available());
        assert!(state.lockout);

        let rotated = RemoteConfig {
            reset_token: Some("t2".into()),
            ..Default::default()
        };
        let next = next.merge(&rotated, &mut state);
        assert!(!next.locked_out);
        assert!(next.is_available());
        assert!(!state.lockout);
        assert_eq!(state.reset_token, "t2");
    }

    #[test]
    fn test_unavailable_reason_prefers_operator_message() {
        let mut state = DurableState::default();
        let disabled = RemoteConfig {
            enabled: Some(false),
            message: Some("维护中".into()),
            ..Default::default()
        };
        let next = snapshot().merge(&disabled, &mut state);
        assert_eq!(next.unavailable_reason().as_deref(), Some("维护中"));
        assert_eq!(snapshot().unavailable_reason(), None);
    }
}
