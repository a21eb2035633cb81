// src/transfer/cooldown.rs

use log::debug;
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPhase {
    Counting(u64),
    RetryAvailable,
}

/// 限流倒计时。到期后只提供重试入口，不会自动重试。
#[derive(Debug, Clone)]
pub struct Cooldown<R> {
    remaining_seconds: u64,
    retry_target: R,
}

impl<R> Cooldown<R> {
    pub fn start(remaining_seconds: u64, retry_target: R) -> Self {
        debug!("开始限流倒计时: {} 秒", remaining_seconds);
        Self {
            remaining_seconds,
            retry_target,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn phase(&self) -> CooldownPhase {
        match self.remaining_seconds {
            0 => CooldownPhase::RetryAvailable,
            n => CooldownPhase::Counting(n),
        }
    }

    /// 推进一秒
    pub fn tick(&mut self) -> CooldownPhase {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.phase()
    }

    /// 倒计时结束后才能取得原请求
    pub fn retry_target(&self) -> Option<&R> {
        matches!(self.phase(), CooldownPhase::RetryAvailable).then_some(&self.retry_target)
    }

    /// 以一秒为间隔推进直到可重试，返回原请求 (不执行它)
    pub async fn run<F>(mut self, mut on_tick: F) -> R
    where
        F: FnMut(CooldownPhase),
    {
        let mut interval = tokio::time::interval(TICK);
        // interval 的第一次 tick 立即完成
        interval.tick().await;
        while self.phase() != CooldownPhase::RetryAvailable {
            interval.tick().await;
            on_tick(self.tick());
        }
        self.retry_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_available_after_exact_ticks() {
        let mut cooldown = Cooldown::start(5, "request");
        for expected in (1..5).rev() {
            assert_eq!(cooldown.tick(), CooldownPhase::Counting(expected));
            assert_eq!(cooldown.retry_target(), None);
        }
        assert_eq!(cooldown.tick(), CooldownPhase::RetryAvailable);
        assert_eq!(cooldown.retry_target(), Some(&"request"));
        // 到期后继续推进不会下溢
        assert_eq!(cooldown.tick(), CooldownPhase::RetryAvailable);
    }

    #[test]
    fn test_zero_cooldown_is_immediately_available() {
        let cooldown = Cooldown::start(0, 1u8);
        assert_eq!(cooldown.phase(), CooldownPhase::RetryAvailable);
        assert_eq!(cooldown.retry_target(), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_one_second_per_tick() {
        let started = tokio::time::Instant::now();
        let mut phases = Vec::new();
        let target = Cooldown::start(3, "again").run(|p| phases.push(p)).await;
        assert_eq!(target, "again");
        assert_eq!(
            phases,
            vec![
                CooldownPhase::Counting(2),
                CooldownPhase::Counting(1),
                CooldownPhase::RetryAvailable
            ]
        );
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3500));
    }
}
