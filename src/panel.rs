// src/panel.rs

//! 交互面板的状态与指令。
//!
//! 每个条目的状态由 [`ItemStatus`] 明确表示，输出完全由状态计算得到；
//! 用户输入被解析为固定的 [`Intent`]，由工作流统一分派。

use crate::{constants, models::{LinkRecord, TransferOutcome}, utils};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Ready,
    Working,
    Succeeded { target_url: String },
    Failed { reason: String },
    CoolingDown { remaining: u64 },
    RetryAvailable,
    Locked { reason: String },
}

impl ItemStatus {
    pub fn from_outcome(outcome: &TransferOutcome) -> Self {
        match outcome {
            TransferOutcome::Pending => ItemStatus::Working,
            TransferOutcome::Success { target_url } => ItemStatus::Succeeded {
                target_url: target_url.clone(),
            },
            TransferOutcome::Failed { reason } => ItemStatus::Failed {
                reason: reason.clone(),
            },
            TransferOutcome::RateLimited { remaining, .. } => ItemStatus::CoolingDown {
                remaining: *remaining,
            },
        }
    }

    /// 按钮上的文字
    pub fn action_label(&self) -> &'static str {
        match self {
            ItemStatus::Ready => "转存",
            ItemStatus::Working => "处理中...",
            ItemStatus::Succeeded { .. } => "打开",
            ItemStatus::Failed { .. } | ItemStatus::RetryAvailable => "重试",
            ItemStatus::CoolingDown { .. } => "等待中",
            ItemStatus::Locked { .. } => "不可用",
        }
    }

    /// 是否可以发起 (或重新发起) 转存
    pub fn allows_transfer(&self) -> bool {
        matches!(
            self,
            ItemStatus::Ready
                | ItemStatus::Failed { .. }
                | ItemStatus::RetryAvailable
                | ItemStatus::Locked { .. }
        )
    }

    fn detail(&self) -> Option<String> {
        match self {
            ItemStatus::Ready | ItemStatus::Working => None,
            ItemStatus::Succeeded { target_url } => Some(format!("转存成功: {}", target_url)),
            ItemStatus::Failed { reason } => Some(reason.clone()),
            ItemStatus::CoolingDown { remaining } => Some(format!("请求过于频繁，{} 秒后可重试", remaining)),
            ItemStatus::RetryAvailable => Some("冷却结束，可以重试".to_string()),
            ItemStatus::Locked { reason } => Some(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Copy(usize),
    Transfer(usize),
    Open(usize),
    Retry(usize),
    Manual,
    List,
    Help,
    Quit,
}

/// 解析形如 `t 2`、`c1`、`q` 的指令。序号从 1 开始，返回值从 0 开始。
pub fn parse_intent(input: &str) -> Result<Intent, String> {
    let input = input.trim().to_lowercase();
    let (verb, rest) = match input.char_indices().nth(1) {
        Some((pos, _)) => input.split_at(pos),
        None => (input.as_str(), ""),
    };
    let index = || -> Result<usize, String> {
        match rest.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(format!("指令 '{}' 需要有效的序号", input)),
        }
    };
    match verb {
        "c" => Ok(Intent::Copy(index()?)),
        "t" => Ok(Intent::Transfer(index()?)),
        "o" => Ok(Intent::Open(index()?)),
        "r" => Ok(Intent::Retry(index()?)),
        "m" if rest.trim().is_empty() => Ok(Intent::Manual),
        "l" if rest.trim().is_empty() => Ok(Intent::List),
        "h" | "?" if rest.trim().is_empty() => Ok(Intent::Help),
        "q" if rest.trim().is_empty() => Ok(Intent::Quit),
        _ => Err(format!("无法识别的指令 '{}'，输入 h 查看帮助", input)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelItem {
    pub record: LinkRecord,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub items: Vec<PanelItem>,
}

impl PanelState {
    pub fn new(records: Vec<LinkRecord>) -> Self {
        Self {
            items: records
                .into_iter()
                .map(|record| PanelItem {
                    record,
                    status: ItemStatus::Ready,
                })
                .collect(),
        }
    }

    pub fn push(&mut self, record: LinkRecord) -> usize {
        self.items.push(PanelItem {
            record,
            status: ItemStatus::Ready,
        });
        self.items.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&PanelItem> {
        self.items.get(index)
    }

    pub fn set_status(&mut self, index: usize, status: ItemStatus) {
        if let Some(item) = self.items.get_mut(index) {
            item.status = status;
        }
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("检测到链接 ({})", self.items.len())];
        for (i, item) in self.items.iter().enumerate() {
            lines.extend(render_item(i, item));
        }
        lines
    }
}

pub fn render_item(index: usize, item: &PanelItem) -> Vec<String> {
    let record = &item.record;
    let mut lines = vec![format!(
        "[{}] {}",
        index + 1,
        utils::truncate_text(&record.url, constants::URL_TRUNCATE_LENGTH)
    )];
    let unzip = record
        .unzip_password
        .as_deref()
        .map(|u| format!(" | 解: {}", u))
        .unwrap_or_default();
    lines.push(format!(
        "    码: {}{}",
        record.code.as_deref().unwrap_or("无"),
        unzip
    ));
    let mut actions = format!("    [复制] [{}]", item.status.action_label());
    if let Some(detail) = item.status.detail() {
        actions.push_str(&format!("  {}", detail));
    }
    lines.push(actions);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intent() {
        assert_eq!(parse_intent("t 2"), Ok(Intent::Transfer(1)));
        assert_eq!(parse_intent("C1"), Ok(Intent::Copy(0)));
        assert_eq!(parse_intent(" o 10 "), Ok(Intent::Open(9)));
        assert_eq!(parse_intent("r 3"), Ok(Intent::Retry(2)));
        assert_eq!(parse_intent("m"), Ok(Intent::Manual));
        assert_eq!(parse_intent("q"), Ok(Intent::Quit));
        assert!(parse_intent("t 0").is_err());
        assert!(parse_intent("t").is_err());
        assert!(parse_intent("x 1").is_err());
        assert!(parse_intent("").is_err());
    }

    #[test]
    fn test_render_from_state() {
        let mut panel = PanelState::new(vec![LinkRecord {
            url: "https://pan.baidu.com/s/1abcde".into(),
            code: Some("ab12".into()),
            unzip_password: Some("zip9".into()),
        }]);
        let lines = panel.render();
        assert_eq!(lines[0], "检测到链接 (1)");
        assert_eq!(lines[1], "[1] https://pan.baidu.com/s/1abcde");
        assert_eq!(lines[2], "    码: ab12 | 解: zip9");
        assert_eq!(lines[3], "    [复制] [转存]");

        panel.set_status(0, ItemStatus::Succeeded { target_url: "https://dl.example/f".into() });
        assert_eq!(panel.render()[3], "    [复制] [打开]  转存成功: https://dl.example/f");
        assert!(!panel.get(0).unwrap().status.allows_transfer());

        panel.set_status(0, ItemStatus::Locked { reason: "维护中".into() });
        assert_eq!(panel.render()[3], "    [复制] [不可用]  维护中");
        // 锁定解除后可以再次发起，是否放行由当前配置快照决定
        assert!(panel.get(0).unwrap().status.allows_transfer());
    }

    #[test]
    fn test_status_from_outcome() {
        assert_eq!(
            ItemStatus::from_outcome(&TransferOutcome::RateLimited { remaining: 9, reason: "x".into() }),
            ItemStatus::CoolingDown { remaining: 9 }
        );
        assert!(ItemStatus::from_outcome(&TransferOutcome::Failed { reason: "x".into() }).allows_transfer());
    }
}
