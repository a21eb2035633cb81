// src/client.rs

use crate::{config::AppConfig, error::*};
use anyhow::anyhow;
use log::{debug, warn};
use reqwest::{IntoUrl, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;

/// 原始 HTTP 响应：状态码与正文
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Clone)]
pub struct RobustClient {
    /// 带重试中间件，用于远程配置等幂等 GET 请求
    pub client: ClientWithMiddleware,
    /// 不重试；转存请求的失败由线路切换处理
    plain: reqwest::Client,
}

impl RobustClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let plain = builder
            .build()
            .map_err(|e| AppError::Other(anyhow!("创建 HTTP 客户端失败: {}", e)))?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(plain.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, plain })
    }

    /// GET 并解析 JSON。非 2xx 状态视为错误。
    pub async fn fetch_json<T: IntoUrl>(
        &self,
        url: T,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> AppResult<Value> {
        let url = url.into_url()?;
        let mut request = self.client.get(url.clone()).query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let res = request.send().await?.error_for_status()?;
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|source| AppError::ApiParseFailed {
            url: url.to_string(),
            source,
        })
    }

    /// GET 页面内容，不检查状态码
    pub async fn fetch_page<T: IntoUrl>(&self, url: T) -> AppResult<RawResponse> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let body = res.text().await?;
        Ok(RawResponse { status, body })
    }

    /// POST JSON，返回原始响应供调用方校验。只有传输层失败才返回 Err。
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<RawResponse, reqwest::Error> {
        let res = self
            .plain
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json;charset=UTF-8")
            .json(body)
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;
        debug!("POST {} -> {}", url, status);
        Ok(RawResponse { status, body })
    }

    /// 发出请求后立即返回，不等待结果
    pub fn fire_and_forget(&self, url: String, query: Vec<(String, String)>) -> JoinHandle<()> {
        let client = self.plain.clone();
        tokio::spawn(async move {
            match client.get(&url).query(&query).send().await {
                Ok(res) => debug!("上报请求已发送: {} -> {}", url, res.status()),
                Err(e) => warn!("上报请求失败: {}", e),
            }
        })
    }
}
