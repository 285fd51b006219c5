//! 有界重试
//!
//! 两种用法：
//! - `RetryBudget`：验证码子循环手动扣减次数
//! - `RetryPolicy::run`：导航、下载等瞬时失败的操作自动重试

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（至少 1）
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn budget(&self) -> RetryBudget {
        RetryBudget {
            remaining: self.max_attempts,
            used: 0,
        }
    }

    /// 执行 `op`，失败后等待 `delay` 再试，直到成功或次数用完，返回最后一次的错误
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "{} 失败 (第 {}/{} 次): {}，{} 毫秒后重试",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay.as_millis()
                    );
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 剩余尝试次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    used: u32,
}

impl RetryBudget {
    /// 消耗一次，返回是否还有剩余
    pub fn consume(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.used += 1;
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[test]
    fn test_budget_counts_down() {
        let mut budget = RetryPolicy::new(3, Duration::ZERO).budget();
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(!budget.consume());
        assert_eq!(budget.used(), 3);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let started = Instant::now();

        let result: Result<u32, String> = policy
            .run("打开页面", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(format!("第 {n} 次失败"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_last_error() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(100));

        let result: Result<(), String> = policy
            .run("下载", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Err(format!("error {n}")) }
            })
            .await;

        assert_eq!(result, Err("error 2".to_string()));
        assert_eq!(calls.get(), 2);
    }
}
