// src/transfer/pool.rs

use rand::Rng;

/// 可互换的后端线路集合。每个任务持有自己的一份拷贝。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiPool {
    endpoints: Vec<String>,
}

impl ApiPool {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// 随机取出一条线路 (取出后不再放回)
    pub fn select_next(&mut self) -> Option<String> {
        self.select_next_with(&mut rand::thread_rng())
    }

    pub fn select_next_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.endpoints.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.endpoints.len());
        Some(self.endpoints.swap_remove(index))
    }
}
