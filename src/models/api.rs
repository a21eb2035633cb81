// src/models/api.rs

use crate::{
    constants::{api, messages},
    models::AttemptFailure,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- 请求体 ---

#[derive(Serialize, Debug, Clone)]
pub struct MkdirRequest<'a> {
    pub path: &'a str,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub path: String,
    pub method: &'static str,
    pub data: TransferRequestData,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferRequestData {
    pub path: String,
    pub url: String,
}

impl TransferRequest {
    pub fn new(folder: &str, source_prefix: &str, share_url: &str) -> Self {
        Self {
            path: folder.to_string(),
            method: api::TRANSFER_METHOD,
            data: TransferRequestData {
                path: format!("{}{}", source_prefix.trim_end_matches('/'), folder),
                url: share_url.to_string(),
            },
        }
    }
}

// --- 响应体 ---

/// 后端统一的响应外壳 `{code, message?, data?}`
#[derive(Deserialize, Debug, Clone)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiEnvelope {
    fn message(&self) -> Option<String> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    fn remaining_seconds(&self) -> Option<u64> {
        let remaining = self.data.as_ref()?.get("remaining")?;
        remaining
            .as_u64()
            .or_else(|| remaining.as_f64().map(|f| f.ceil().max(0.0) as u64))
    }
}

#[derive(Deserialize, Debug, Clone)]
struct TransferData {
    errno: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStep {
    Mkdir,
    Transfer,
}

impl ApiStep {
    fn generic_failure(self) -> &'static str {
        match self {
            ApiStep::Mkdir => messages::MKDIR_FAILED,
            ApiStep::Transfer => messages::TRANSFER_FAILED,
        }
    }
}

/// 校验后端响应。任何与约定结构不符的响应都按接口错误处理。
pub fn decode_response(
    step: ApiStep,
    http_status: u16,
    body: &str,
    default_rate_limit_secs: u64,
) -> Result<(), AttemptFailure> {
    let rate_limited_status = i64::from(http_status) == api::CODE_RATE_LIMITED;

    let envelope: ApiEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if rate_limited_status => {
            return Err(AttemptFailure::RateLimited {
                remaining: default_rate_limit_secs,
                message: None,
            });
        }
        Err(_) => return Err(AttemptFailure::Api(step.generic_failure().to_string())),
    };

    if rate_limited_status || envelope.code == api::CODE_RATE_LIMITED {
        return Err(AttemptFailure::RateLimited {
            remaining: envelope
                .remaining_seconds()
                .unwrap_or(default_rate_limit_secs),
            message: envelope.message(),
        });
    }

    if envelope.code != api::CODE_OK {
        return Err(AttemptFailure::Api(
            envelope
                .message()
                .unwrap_or_else(|| step.generic_failure().to_string()),
        ));
    }

    match step {
        ApiStep::Mkdir => Ok(()),
        ApiStep::Transfer => {
            let errno = envelope
                .data
                .clone()
                .and_then(|data| serde_json::from_value::<TransferData>(data).ok())
                .map(|d| d.errno);
            match errno {
                Some(api::ERRNO_OK) => Ok(()),
                _ => Err(AttemptFailure::Api(
                    envelope
                        .message()
                        .unwrap_or_else(|| step.generic_failure().to_string()),
                )),
            }
        }
    }
}
