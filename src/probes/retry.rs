// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::probes::whois::Strategy;
use crate::probes::{ErrorClass, ProbeError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 重试编排器
///
/// 用有限次重试与按错误分类的退避包装单目标探测。第一次尝试
/// 失败后会先以备用策略试一次，之后的重试只走主策略。
#[derive(Debug, Clone)]
pub struct RetryOrchestrator {
    max_attempts: u32,
}

impl Default for RetryOrchestrator {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryOrchestrator {
    /// 创建指定最大尝试次数的编排器
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// 计算第 attempt 次失败后的退避时间
    ///
    /// 基础档 attempt×3s；错误文本表明超时升到 attempt×5s；
    /// 表明限流升到 attempt×10s。
    pub fn backoff_for(error: &ProbeError, attempt: u32) -> Duration {
        let unit_secs = match error.classification() {
            ErrorClass::RateLimit => 10,
            ErrorClass::Timeout => 5,
            ErrorClass::Other => 3,
        };
        Duration::from_secs(u64::from(attempt) * unit_secs)
    }

    /// 执行带重试的探测操作
    ///
    /// `operation` 以执行策略为参数；所有尝试耗尽后返回内嵌
    /// 最后一次失败原因的错误。
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ProbeError>
    where
        F: FnMut(Strategy) -> Fut,
        Fut: Future<Output = Result<T, ProbeError>>,
    {
        let mut last_error: Option<ProbeError> = None;

        for attempt in 1..=self.max_attempts {
            match operation(Strategy::Primary).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    debug!(attempt, %error, "probe attempt failed");

                    // 仅在第一次尝试失败后试一次备用策略
                    let error = if attempt == 1 {
                        match operation(Strategy::Fallback).await {
                            Ok(value) => return Ok(value),
                            Err(fallback_error) => {
                                if !fallback_error.is_retryable() {
                                    return Err(fallback_error);
                                }
                                debug!(%fallback_error, "fallback strategy failed");
                                fallback_error
                            }
                        }
                    } else {
                        error
                    };

                    if attempt < self.max_attempts {
                        let backoff = Self::backoff_for(&error, attempt);
                        warn!(attempt, backoff_secs = backoff.as_secs(), "retrying probe");
                        sleep(backoff).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(ProbeError::RetriesExhausted {
            attempts: self.max_attempts,
            source: Box::new(
                last_error.unwrap_or_else(|| ProbeError::Subprocess("no attempts made".into())),
            ),
        })
    }
}
