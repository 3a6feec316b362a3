//! 有界轮询
//!
//! 所有"等某件事发生"的地方都用这里的 `poll_until`，次数和间隔都是显式参数，
//! 不会无限等待。等待使用 `tokio::time`，测试中可以暂停时钟。

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// 轮询计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// 第一次检查前的等待
    pub leading_delay: Duration,
    /// 两次检查之间的间隔
    pub interval: Duration,
    /// 最多检查次数
    pub max_checks: u32,
}

impl PollSchedule {
    /// 立即检查一次，之后每隔 `interval` 检查，直到 `timeout` 用完
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let steps = timeout.as_nanos().div_ceil(interval.as_nanos());
        let max_checks = u32::try_from(steps).unwrap_or(u32::MAX).saturating_add(1);
        Self {
            leading_delay: Duration::ZERO,
            interval,
            max_checks,
        }
    }

    /// 每次检查前都先等待 `interval`，共检查 `count` 次
    pub fn every(interval: Duration, count: u32) -> Self {
        Self {
            leading_delay: interval,
            interval,
            max_checks: count.max(1),
        }
    }

    /// 完整轮询一遍（全部落空）所需的总时长
    pub fn budget(&self) -> Duration {
        self.leading_delay + self.interval * self.max_checks.saturating_sub(1)
    }
}

/// 按计划反复执行 `probe`，直到返回 `true` 或次数用完
///
/// 返回 `Ok(true)` 表示条件已满足，`Ok(false)` 表示超时；
/// `probe` 的错误会立即返回，不再继续轮询。
pub async fn poll_until<F, Fut, E>(schedule: &PollSchedule, mut probe: F) -> Result<bool, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    if !schedule.leading_delay.is_zero() {
        sleep(schedule.leading_delay).await;
    }

    for check in 1..=schedule.max_checks {
        if probe().await? {
            return Ok(true);
        }
        if check < schedule.max_checks {
            sleep(schedule.interval).await;
        }
    }

    Ok(false)
}
