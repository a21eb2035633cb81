// src/transfer/job.rs

use super::{backend::TransferBackend, pool::ApiPool};
use crate::{
    config::remote::ConfigSnapshot,
    constants::messages,
    models::{
        AttemptFailure, JobEvent, LinkRecord, TransferOutcome, TransferResult,
        api::TransferRequest,
    },
};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use std::time::Duration;

/// 目标文件夹名：ISO-8601 时间戳 (':' 与 '.' 替换为 '-')，有提取码时追加 `_提取码`
pub fn folder_name(now: DateTime<Utc>, code: Option<&str>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    match code.filter(|c| !c.is_empty()) {
        Some(code) => format!("/{}_{}", stamp, code),
        None => format!("/{}", stamp),
    }
}

/// 一次用户发起的转存。
///
/// 每次尝试依次调用 mkdir 与 transfer；失败后从私有线路池中
/// 取下一条线路，间隔固定时间后重试。尝试严格串行。
pub struct TransferJob {
    record: LinkRecord,
    materialized_url: String,
    folder: String,
    source_prefix: String,
    pool: ApiPool,
    budget: usize,
    backoff: Duration,
    attempted: Vec<String>,
    outcome: TransferOutcome,
}

impl TransferJob {
    pub fn new(record: LinkRecord, snapshot: &ConfigSnapshot) -> Self {
        Self::with_timestamp(record, snapshot, Utc::now())
    }

    pub fn with_timestamp(record: LinkRecord, snapshot: &ConfigSnapshot, now: DateTime<Utc>) -> Self {
        let pool = snapshot.pool();
        let budget = pool.len() + 1;
        Self {
            materialized_url: record.full_link(),
            folder: folder_name(now, record.code.as_deref()),
            source_prefix: snapshot.source_prefix.clone(),
            pool,
            budget,
            backoff: snapshot.failover_backoff,
            attempted: Vec::new(),
            outcome: TransferOutcome::Pending,
            record,
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn materialized_url(&self) -> &str {
        &self.materialized_url
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn attempted_endpoints(&self) -> &[String] {
        &self.attempted
    }

    pub fn outcome(&self) -> &TransferOutcome {
        &self.outcome
    }

    pub async fn run(&mut self, backend: &dyn TransferBackend) -> TransferOutcome {
        self.run_with_observer(backend, &mut |_| {}).await
    }

    pub async fn run_with_observer(
        &mut self,
        backend: &dyn TransferBackend,
        observer: &mut (dyn FnMut(JobEvent) + Send),
    ) -> TransferOutcome {
        if self.outcome.is_terminal() {
            return self.outcome.clone();
        }

        let Some(mut endpoint) = self.pool.select_next() else {
            warn!("线路池为空，无法转存 {}", self.record.url);
            return self.finish(TransferOutcome::Failed {
                reason: messages::NO_API_AVAILABLE.to_string(),
            });
        };
        let mut remaining = self.budget;

        loop {
            self.attempted.push(endpoint.clone());
            observer(JobEvent::AttemptStarted {
                attempt: self.attempted.len(),
                endpoint: endpoint.clone(),
            });

            let failure = match self.attempt(backend, &endpoint).await {
                Ok(()) => {
                    let target_url = format!("{}{}", endpoint, self.folder);
                    info!("转存成功: {} -> {}", self.record.url, target_url);
                    return self.finish(TransferOutcome::Success { target_url });
                }
                Err(failure) => failure,
            };

            if let AttemptFailure::RateLimited { remaining: secs, .. } = &failure {
                warn!("线路 {} 限流，需等待 {} 秒", endpoint, secs);
                return self.finish(failure.into());
            }

            warn!(
                "线路 {} 第 {} 次尝试失败: {}",
                endpoint,
                self.attempted.len(),
                failure.reason()
            );
            if remaining > 1
                && let Some(next) = self.pool.select_next()
            {
                remaining -= 1;
                observer(JobEvent::SwitchingEndpoint {
                    reason: failure.reason(),
                });
                tokio::time::sleep(self.backoff).await;
                endpoint = next;
                continue;
            }
            return self.finish(failure.into());
        }
    }

    async fn attempt(
        &self,
        backend: &dyn TransferBackend,
        endpoint: &str,
    ) -> Result<(), AttemptFailure> {
        debug!("在 {} 上创建文件夹 {}", endpoint, self.folder);
        backend.mkdir(endpoint, &self.folder).await?;
        let request = TransferRequest::new(&self.folder, &self.source_prefix, &self.materialized_url);
        backend.transfer(endpoint, &request).await
    }

    fn finish(&mut self, outcome: TransferOutcome) -> TransferOutcome {
        self.outcome = outcome.clone();
        outcome
    }

    pub fn into_result(self) -> TransferResult {
        TransferResult {
            record: self.record,
            folder: self.folder,
            outcome: self.outcome,
            attempted_endpoints: self.attempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_folder_name() {
        let now = Utc.with_ymd_and_hms(2025, 11, 30, 8, 5, 9).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(folder_name(now, None), "/2025-11-30T08-05-09-042Z");
        assert_eq!(folder_name(now, Some("9k2M")), "/2025-11-30T08-05-09-042Z_9k2M");
        assert_eq!(folder_name(now, Some("")), "/2025-11-30T08-05-09-042Z");
    }
}
