// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 证书状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CertStatus {
    /// 有效期充足
    #[default]
    Active,
    /// 即将到期（默认 30 天内）
    Warning,
    /// 紧急（默认 7 天内）
    Critical,
    /// 已过期
    Expired,
    /// 探测失败，主机不可达或握手异常
    Error,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CertStatus::Active => write!(f, "active"),
            CertStatus::Warning => write!(f, "warning"),
            CertStatus::Critical => write!(f, "critical"),
            CertStatus::Expired => write!(f, "expired"),
            CertStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CertStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CertStatus::Active),
            "warning" => Ok(CertStatus::Warning),
            "critical" => Ok(CertStatus::Critical),
            "expired" => Ok(CertStatus::Expired),
            "error" => Ok(CertStatus::Error),
            _ => Err(()),
        }
    }
}

/// 证书探测结果
///
/// 探测失败（连接被拒、超时、握手异常）是一等结果值而不是异常：
/// `status` 为 Error、`accessible` 为 false、`days_remaining` 为 -1，
/// 失败原因记录在 `check_error` 中。下游代码不得假设失败时没有结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateResult {
    /// 探测的域名
    pub domain: String,
    /// 证书颁发者
    pub issuer: Option<String>,
    /// 证书主体
    pub subject: Option<String>,
    /// 生效时间
    pub valid_from: Option<DateTime<Utc>>,
    /// 到期时间
    pub valid_to: Option<DateTime<Utc>>,
    /// 剩余天数，探测失败时为 -1
    pub days_remaining: i64,
    /// 证书状态
    pub status: CertStatus,
    /// 主机是否可达
    pub accessible: bool,
    /// 探测失败原因
    pub check_error: Option<String>,
    /// 是否通配符证书（CN 以 `*.` 开头）
    pub is_wildcard: bool,
    /// 备用名称（SAN）列表
    pub alternative_names: Vec<String>,
}

impl CertificateResult {
    /// 构造一个探测失败的结果值
    pub fn unreachable(domain: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            issuer: None,
            subject: None,
            valid_from: None,
            valid_to: None,
            days_remaining: -1,
            status: CertStatus::Error,
            accessible: false,
            check_error: Some(error.into()),
            is_wildcard: false,
            alternative_names: Vec::new(),
        }
    }

    /// 按剩余天数分类证书状态
    ///
    /// 边界：负数为 Expired，≤7 为 Critical，≤30 为 Warning，其余 Active。
    pub fn classify(days_remaining: i64) -> CertStatus {
        if days_remaining < 0 {
            CertStatus::Expired
        } else if days_remaining <= 7 {
            CertStatus::Critical
        } else if days_remaining <= 30 {
            CertStatus::Warning
        } else {
            CertStatus::Active
        }
    }
}
