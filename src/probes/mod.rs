// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 证书探测器
pub mod certificate;

/// 重试编排器
pub mod retry;

/// 子进程执行端口
pub mod runner;

/// WHOIS 探测器
pub mod whois;

/// WHOIS 响应解析
pub mod whois_parser;

use thiserror::Error;

/// 探测错误类型
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 域名格式无效，在任何网络调用之前被拒绝，不重试
    #[error("无效域名: {0}")]
    Validation(String),

    /// 超时（ETIMEDOUT）
    #[error("查询超时: {0}")]
    Timeout(String),

    /// 连接被对端重置
    #[error("连接被重置: {0}")]
    ConnectionReset(String),

    /// 触发对端限流
    #[error("触发限流: {0}")]
    RateLimited(String),

    /// whois 客户端不存在（ENOENT）
    #[error("whois 客户端不存在: {0}")]
    ClientMissing(String),

    /// 收到响应但无法从任何模式中解析出到期时间
    #[error("解析失败: {0}")]
    Parse(String),

    /// 子进程执行失败且没有可解析的输出
    #[error("子进程执行失败: {0}")]
    Subprocess(String),

    /// 重试次数耗尽，内嵌最后一次失败原因
    #[error("重试 {attempts} 次后仍然失败: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ProbeError>,
    },
}

impl ProbeError {
    /// 判断错误是否可重试
    ///
    /// 校验失败在网络调用之前发生，永不重试；客户端缺失重试也
    /// 不会恢复；响应已经完整收到但解析不出到期时间的，重试只会
    /// 拿到同样的文本。其余错误按有限次数重试。
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ProbeError::Validation(_) | ProbeError::ClientMissing(_) | ProbeError::Parse(_)
        )
    }

    /// 按错误文本分类，用于选择退避档位
    pub fn classification(&self) -> ErrorClass {
        ErrorClass::from_text(&self.to_string())
    }
}

/// 错误分类，决定重试退避的档位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 超时类错误
    Timeout,
    /// 限流类错误
    RateLimit,
    /// 其他错误
    Other,
}

impl ErrorClass {
    /// 根据错误文本匹配分类
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
            || lower.contains("限流")
        {
            ErrorClass::RateLimit
        } else if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("etimedout")
            || lower.contains("超时")
        {
            ErrorClass::Timeout
        } else {
            ErrorClass::Other
        }
    }
}
