//! 请求节奏控制
//!
//! 评分阶段在两个维度之间调用 `Pacer::pause`，避免触发后端限流

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait Pacer: Send + Sync {
    /// 在下一次请求之前等待
    async fn pause(&self);
}

/// 固定间隔
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalPacer {
    interval: Duration,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FixedIntervalPacer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Pacer for FixedIntervalPacer {
    async fn pause(&self) {
        debug!("等待 {}ms 后继续下一个请求", self.interval.as_millis());
        tokio::time::sleep(self.interval).await;
    }
}

/// 不等待，用于测试
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self) {}
}
