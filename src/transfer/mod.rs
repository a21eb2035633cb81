// src/transfer/mod.rs

pub mod backend;
pub mod cooldown;
pub mod job;
pub mod pool;
mod task_runner;

pub use backend::{HttpBackend, TransferBackend};
pub use cooldown::{Cooldown, CooldownPhase};
pub use job::TransferJob;
pub use pool::ApiPool;
pub use task_runner::execute_jobs;

use crate::{
    models::{TransferOutcome, TransferResult},
    symbols, ui,
};
use colored::*;
use log::info;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct TransferStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub rate_limited: usize,
}

/// 批量转存的统计与报告
#[derive(Clone, Default)]
pub struct TransferManager {
    stats: Arc<Mutex<TransferStats>>,
    succeeded: Arc<Mutex<Vec<(String, String)>>>,
    failed: Arc<Mutex<Vec<(String, String)>>>,
}

impl TransferManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_batch(&self, total_tasks: usize) {
        info!("开始新一批转存任务，总数: {}", total_tasks);
        *self.stats.lock().unwrap() = TransferStats {
            total: total_tasks,
            ..Default::default()
        };
        self.succeeded.lock().unwrap().clear();
        self.failed.lock().unwrap().clear();
    }

    pub fn record(&self, result: &TransferResult) {
        let url = result.record.url.clone();
        let mut stats = self.stats.lock().unwrap();
        match &result.outcome {
            TransferOutcome::Success { target_url } => {
                stats.success += 1;
                self.succeeded.lock().unwrap().push((url, target_url.clone()));
            }
            TransferOutcome::Failed { reason } => {
                log::error!("链接 '{}' 转存失败: {}", url, reason);
                stats.failed += 1;
                self.failed.lock().unwrap().push((url, reason.clone()));
            }
            TransferOutcome::RateLimited { remaining, reason } => {
                stats.rate_limited += 1;
                self.failed
                    .lock()
                    .unwrap()
                    .push((url, format!("{} (需等待 {} 秒)", reason, remaining)));
            }
            TransferOutcome::Pending => {}
        }
    }

    pub fn get_stats(&self) -> TransferStats {
        self.stats.lock().unwrap().clone()
    }

    pub fn did_all_succeed(&self) -> bool {
        let stats = self.get_stats();
        stats.failed == 0 && stats.rate_limited == 0
    }

    pub fn print_report(&self) {
        let stats = self.get_stats();
        info!(
            "转存报告: Total={}, Success={}, Failed={}, RateLimited={}",
            stats.total, stats.success, stats.failed, stats.rate_limited
        );

        let succeeded = self.succeeded.lock().unwrap();
        if !succeeded.is_empty() {
            ui::print_sub_header("转存结果地址 (需手动打开)");
            for (url, target) in succeeded.iter() {
                println!("  {} {}\n    -> {}", *symbols::OK, url, target.green());
            }
        }

        let failed = self.failed.lock().unwrap();
        if !failed.is_empty() {
            println!("\n{} 未完成的链接 ({}个):", *symbols::ERROR, failed.len());
            print_grouped_report(&failed, |s| s.red());
        }

        ui::print_sub_header("任务总结");
        if stats.total > 0 && stats.success == stats.total {
            println!("{} 所有 {} 个链接均已转存成功。", *symbols::OK, stats.total);
        } else {
            let summary = format!(
                "{} | {} | {}",
                format!("成功: {}", stats.success).green(),
                format!("失败: {}", stats.failed).red(),
                format!("限流: {}", stats.rate_limited).yellow()
            );
            println!("{}", summary);
        }
    }
}

fn print_grouped_report(items: &[(String, String)], color_fn: fn(ColoredString) -> ColoredString) {
    let mut grouped: HashMap<&String, Vec<&String>> = HashMap::new();
    for (url, reason) in items {
        grouped.entry(reason).or_default().push(url);
    }
    let mut sorted_reasons: Vec<_> = grouped.keys().copied().collect();
    sorted_reasons.sort();
    for reason in sorted_reasons {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        let mut urls = grouped[reason].clone();
        urls.sort();
        for url in urls {
            println!("    - {}", url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkRecord;

    fn result(outcome: TransferOutcome) -> TransferResult {
        TransferResult {
            record: LinkRecord::new("https://pan.baidu.com/s/1abcde", None),
            folder: "/f".into(),
            outcome,
            attempted_endpoints: vec![],
        }
    }

    #[test]
    fn test_manager_counts_outcomes() {
        let manager = TransferManager::new();
        manager.start_batch(3);
        manager.record(&result(TransferOutcome::Success { target_url: "https://a/f".into() }));
        manager.record(&result(TransferOutcome::Failed { reason: "网络中断".into() }));
        manager.record(&result(TransferOutcome::RateLimited { remaining: 5, reason: "slow".into() }));
        assert_eq!(
            manager.get_stats(),
            TransferStats { total: 3, success: 1, failed: 1, rate_limited: 1 }
        );
        assert!(!manager.did_all_succeed());
    }
}
