// src/config.rs

pub mod file;
pub mod remote;
pub mod state;

use self::file::load_or_create_external_config;
use crate::{cli::Cli, constants, error::AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub fallback_apis: Option<Vec<String>>,
    pub remote_config_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    /// 转存请求的总超时。留空则使用传输层默认行为
    pub timeout_secs: Option<u64>,
    pub remote_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransferConfig {
    pub source_prefix: Option<String>,
    pub failover_backoff_ms: Option<u64>,
    pub default_rate_limit_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthConfig {
    pub report_cooldown_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        Self {
            network: NetworkConfig {
                fallback_apis: Some(constants::DEFAULT_APIS.iter().map(|s| s.to_string()).collect()),
                remote_config_url: Some(constants::REMOTE_CONFIG_URL.into()),
                connect_timeout_secs: Some(10),
                timeout_secs: None,
                remote_timeout_secs: Some(constants::REMOTE_CONFIG_TIMEOUT_SECS),
                max_retries: Some(2),
            },
            transfer: TransferConfig {
                source_prefix: Some(constants::transfer::SOURCE_PATH_PREFIX.into()),
                failover_backoff_ms: Some(constants::transfer::FAILOVER_BACKOFF_MS),
                default_rate_limit_secs: Some(constants::transfer::DEFAULT_RATE_LIMIT_SECS),
            },
            health: HealthConfig {
                report_cooldown_secs: Some(constants::health::REPORT_COOLDOWN_SECS),
            },
        }
    }
}

/// 去掉线路地址的首尾空白和末尾的 `/`，并丢弃非 http(s) 地址
pub fn normalize_endpoints<I, S>(endpoints: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    endpoints
        .into_iter()
        .map(|e| e.as_ref().trim().trim_end_matches('/').to_string())
        .filter(|e| e.starts_with("http://") || e.starts_with("https://"))
        .collect()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub max_workers: usize,
    pub fallback_apis: Vec<String>,
    pub remote_config_url: Option<String>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub timeout: Option<Duration>,
    pub remote_timeout: Duration,
    pub max_retries: u32,
    pub source_prefix: String,
    pub failover_backoff: Duration,
    pub default_rate_limit_secs: u64,
    pub report_cooldown: Duration,
}

impl AppConfig {
    pub fn new(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        let mut config = Self::from_external(external_config);

        if let Some(workers) = args.workers {
            config.max_workers = workers.max(1);
        }
        if !args.api.is_empty() {
            config.fallback_apis = normalize_endpoints(&args.api);
        }
        if let Some(url) = &args.config_url {
            config.remote_config_url = Some(url.clone());
        }
        Ok(config)
    }

    pub fn from_external(external_config: ExternalConfig) -> Self {
        let network = external_config.network;
        let transfer = external_config.transfer;
        let fallback_apis = network
            .fallback_apis
            .map(normalize_endpoints)
            .filter(|apis| !apis.is_empty())
            .unwrap_or_else(|| normalize_endpoints(constants::DEFAULT_APIS));

        Self {
            max_workers: constants::DEFAULT_WORKERS,
            fallback_apis,
            remote_config_url: network.remote_config_url.filter(|u| !u.trim().is_empty()),
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(network.connect_timeout_secs.unwrap_or(10)),
            timeout: network.timeout_secs.map(Duration::from_secs),
            remote_timeout: Duration::from_secs(
                network
                    .remote_timeout_secs
                    .unwrap_or(constants::REMOTE_CONFIG_TIMEOUT_SECS),
            ),
            max_retries: network.max_retries.unwrap_or(2),
            source_prefix: transfer
                .source_prefix
                .unwrap_or_else(|| constants::transfer::SOURCE_PATH_PREFIX.into()),
            failover_backoff: Duration::from_millis(
                transfer
                    .failover_backoff_ms
                    .unwrap_or(constants::transfer::FAILOVER_BACKOFF_MS),
            ),
            default_rate_limit_secs: transfer
                .default_rate_limit_secs
                .unwrap_or(constants::transfer::DEFAULT_RATE_LIMIT_SECS),
            report_cooldown: Duration::from_secs(
                external_config
                    .health
                    .report_cooldown_secs
                    .unwrap_or(constants::health::REPORT_COOLDOWN_SECS),
            ),
        }
    }

    /// 不读取本地配置文件的默认配置
    pub fn with_defaults() -> Self {
        Self::from_external(ExternalConfig::default_app_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoints() {
        assert_eq!(
            normalize_endpoints([" https://a.example/ ", "ftp://b.example", "http://c.example//", ""]),
            vec!["https://a.example".to_string(), "http://c.example".to_string()]
        );
    }

    #[test]
    fn test_partial_external_config_uses_defaults() {
        let external: ExternalConfig =
            serde_json::from_str(r#"{"transfer": {"failover_backoff_ms": 0}}"#).unwrap();
        let config = AppConfig::from_external(external);
        assert_eq!(config.failover_backoff, Duration::ZERO);
        assert_eq!(config.fallback_apis.len(), constants::DEFAULT_APIS.len());
        assert_eq!(config.source_prefix, constants::transfer::SOURCE_PATH_PREFIX);
        assert_eq!(config.timeout, None);
        // 未配置远程地址时不做远程同步
        assert_eq!(config.remote_config_url, None);
    }
}
