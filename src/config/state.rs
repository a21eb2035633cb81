// src/config/state.rs

use super::file::get_state_path;
use crate::error::AppResult;
use anyhow::Context;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// 需要跨进程保留的状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableState {
    #[serde(default)]
    pub lockout: bool,
    #[serde(default)]
    pub reset_token: String,
    /// 上次上报故障的时间 (epoch 毫秒)
    #[serde(default)]
    pub last_report_time: i64,
}

impl DurableState {
    pub fn report_due(&self, now_ms: i64, cooldown: Duration) -> bool {
        now_ms.saturating_sub(self.last_report_time) > cooldown.as_millis() as i64
    }
}

/// 持久化状态的唯一读写入口
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> AppResult<Self> {
        Ok(Self::new(get_state_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<DurableState> {
        if !self.path.is_file() {
            debug!("状态文件 {:?} 不存在，使用默认状态", self.path);
            return Ok(DurableState::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("读取状态文件 '{}' 失败", self.path.display()))?;
        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!("状态文件 '{}' 已损坏，将重置: {}", self.path.display(), e);
                Ok(DurableState::default())
            }
        }
    }

    pub fn save(&self, state: &DurableState) -> AppResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json_content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json_content)
            .with_context(|| format!("保存状态到 '{}' 失败", self.path.display()))?;
        debug!("状态已保存: {:?}", state);
        Ok(())
    }

    /// 读取、修改并写回。只有单一写入方，无需加锁。
    pub fn update<F>(&self, f: F) -> AppResult<DurableState>
    where
        F: FnOnce(&mut DurableState),
    {
        let mut state = self.load()?;
        let before = state.clone();
        f(&mut state);
        if state != before {
            self.save(&state)?;
        }
        Ok(state)
    }
}
