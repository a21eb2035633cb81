// src/models/mod.rs

pub mod api;

use crate::{extractor::materialize, symbols};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

/// 从文本中提取出的一条分享链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub code: Option<String>,
    pub unzip_password: Option<String>,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>, code: Option<String>) -> Self {
        Self {
            url: url.into(),
            code: code.filter(|c| !c.is_empty()),
            unzip_password: None,
        }
    }

    /// 链接本身是否已经带有 `pwd=` 参数
    pub fn has_embedded_password(&self) -> bool {
        materialize::has_password_param(&self.url)
    }

    /// 带提取码的完整链接
    pub fn full_link(&self) -> String {
        materialize::make_full_link(&self.url, self.code.as_deref())
    }
}

/// 单次尝试 (mkdir + transfer) 的失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Network(String),
    Api(String),
    RateLimited {
        remaining: u64,
        message: Option<String>,
    },
}

impl AttemptFailure {
    pub fn reason(&self) -> String {
        match self {
            AttemptFailure::Network(msg) | AttemptFailure::Api(msg) => msg.clone(),
            AttemptFailure::RateLimited { remaining, message } => message
                .clone()
                .unwrap_or_else(|| format!("请求过于频繁，请 {} 秒后重试", remaining)),
        }
    }
}

/// 转存任务的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Pending,
    Success { target_url: String },
    Failed { reason: String },
    RateLimited { remaining: u64, reason: String },
}

impl TransferOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferOutcome::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            TransferOutcome::Pending => (&*symbols::INFO, |s| s.cyan(), "等待处理"),
            TransferOutcome::Success { .. } => (&*symbols::OK, |s| s.green(), "转存成功"),
            TransferOutcome::Failed { .. } => (&*symbols::ERROR, |s| s.red(), "转存失败"),
            TransferOutcome::RateLimited { .. } => {
                (&*symbols::WAIT, |s| s.yellow(), "请求过于频繁")
            }
        }
    }
}

impl From<AttemptFailure> for TransferOutcome {
    fn from(failure: AttemptFailure) -> Self {
        match &failure {
            AttemptFailure::RateLimited { remaining, .. } => TransferOutcome::RateLimited {
                remaining: *remaining,
                reason: failure.reason(),
            },
            _ => TransferOutcome::Failed {
                reason: failure.reason(),
            },
        }
    }
}

/// 任务运行过程中的进度事件，仅用于界面展示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    AttemptStarted { attempt: usize, endpoint: String },
    SwitchingEndpoint { reason: String },
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub record: LinkRecord,
    pub folder: String,
    pub outcome: TransferOutcome,
    pub attempted_endpoints: Vec<String>,
}
