// src/transfer/backend.rs

use crate::{
    client::RobustClient,
    constants::{api, messages},
    models::{
        AttemptFailure,
        api::{ApiStep, MkdirRequest, TransferRequest, decode_response},
    },
};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;

/// 一条线路上可执行的两个操作
#[async_trait]
pub trait TransferBackend: Send + Sync {
    async fn mkdir(&self, endpoint: &str, path: &str) -> Result<(), AttemptFailure>;
    async fn transfer(
        &self,
        endpoint: &str,
        request: &TransferRequest,
    ) -> Result<(), AttemptFailure>;
}

/// 基于 HTTP 的后端实现，对应 `/api/fs/mkdir` 与 `/api/fs/other`
pub struct HttpBackend {
    client: Arc<RobustClient>,
    default_rate_limit_secs: u64,
}

impl HttpBackend {
    pub fn new(client: Arc<RobustClient>, default_rate_limit_secs: u64) -> Self {
        Self {
            client,
            default_rate_limit_secs,
        }
    }

    async fn post<B: serde::Serialize + Sync + ?Sized>(
        &self,
        step: ApiStep,
        url: &str,
        body: &B,
    ) -> Result<(), AttemptFailure> {
        match self.client.post_json(url, body).await {
            Ok(res) => decode_response(
                step,
                res.status.as_u16(),
                &res.body,
                self.default_rate_limit_secs,
            ),
            Err(e) => {
                warn!("请求 {} 失败: {}", url, e);
                Err(AttemptFailure::Network(messages::NETWORK_INTERRUPTED.to_string()))
            }
        }
    }
}

#[async_trait]
impl TransferBackend for HttpBackend {
    async fn mkdir(&self, endpoint: &str, path: &str) -> Result<(), AttemptFailure> {
        let url = format!("{}{}", endpoint, api::MKDIR_PATH);
        self.post(ApiStep::Mkdir, &url, &MkdirRequest { path }).await
    }

    async fn transfer(
        &self,
        endpoint: &str,
        request: &TransferRequest,
    ) -> Result<(), AttemptFailure> {
        let url = format!("{}{}", endpoint, api::OTHER_PATH);
        self.post(ApiStep::Transfer, &url, request).await
    }
}
