// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 评估引擎
//!
//! 两个独立的纯决策函数：把域名记录与可配置阈值映射为续费建议，
//! 把证书结果映射为状态标签。除返回值外没有任何副作用。

use crate::domain::models::certificate::{CertStatus, CertificateResult};
use crate::domain::models::domain_record::DomainRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 续费建议枚举
///
/// 统一后的规范集合；原系统中 5 值集合的「建议续费」按到期
/// 时间展开为 紧急续费/建议续费/保持续费 三档。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalSuggestion {
    /// 不续费，手动标记，优先级最高
    NoRenew,
    /// 紧急续费，有价值且临近到期
    Urgent,
    /// 建议续费
    Recommended,
    /// 保持续费，有价值但到期尚远
    Keep,
    /// 可不续费，闲置的通用域名或外国 ccTLD
    Optional,
    /// 请示领导，闲置的中国 ccTLD
    Escalate,
    /// 待评估，无法归类
    Pending,
}

impl fmt::Display for RenewalSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            RenewalSuggestion::NoRenew => "不续费",
            RenewalSuggestion::Urgent => "紧急续费",
            RenewalSuggestion::Recommended => "建议续费",
            RenewalSuggestion::Keep => "保持续费",
            RenewalSuggestion::Optional => "可不续费",
            RenewalSuggestion::Escalate => "请示领导",
            RenewalSuggestion::Pending => "待评估",
        };
        write!(f, "{}", label)
    }
}

/// 域名评估阈值（天）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainThresholds {
    pub urgent_days: i64,
    pub suggest_days: i64,
    pub attention_days: i64,
}

impl Default for DomainThresholds {
    fn default() -> Self {
        Self {
            urgent_days: 7,
            suggest_days: 30,
            attention_days: 60,
        }
    }
}

/// 证书评估阈值（天）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslThresholds {
    pub critical_days: i64,
    pub warning_days: i64,
    pub attention_days: i64,
}

impl Default for SslThresholds {
    fn default() -> Self {
        Self {
            critical_days: 7,
            warning_days: 30,
            attention_days: 60,
        }
    }
}

/// 评估阈值集合
///
/// 外部配置提供，单次评估内只读。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationThresholds {
    #[serde(default)]
    pub domain: DomainThresholds,
    #[serde(default)]
    pub ssl: SslThresholds,
}

/// 被视为闲置的业务用途占位值
const UNUSED_MARKERS: [&str; 5] = ["未使用", "闲置", "无", "none", "n/a"];

/// 评估引擎
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    thresholds: EvaluationThresholds,
}

impl EvaluationEngine {
    /// 用给定阈值创建引擎
    pub fn new(thresholds: EvaluationThresholds) -> Self {
        Self { thresholds }
    }

    /// 域名续费建议
    ///
    /// 优先级规则，先命中先生效：
    /// 1. 手动「不续费」标记无条件覆盖一切信号；
    /// 2. 有价值（特殊价值标记 / 有实际业务用途 / 有 ICP 备案）的
    ///    域名按到期剩余天数分为 紧急续费 / 建议续费 / 保持续费；
    /// 3. 闲置的中国 ccTLD（`.cn`、`.中国`）请示领导；
    /// 4. 闲置的通用域名或外国 ccTLD 可不续费；
    /// 5. 其余待评估。
    pub fn suggest(&self, record: &DomainRecord, now: DateTime<Utc>) -> RenewalSuggestion {
        if record.no_renew {
            return RenewalSuggestion::NoRenew;
        }

        if is_valued(record) {
            return match record.days_until_expiry(now) {
                Some(days) if days <= self.thresholds.domain.urgent_days => {
                    RenewalSuggestion::Urgent
                }
                Some(days) if days <= self.thresholds.domain.suggest_days => {
                    RenewalSuggestion::Recommended
                }
                Some(_) => RenewalSuggestion::Keep,
                // 有价值但没有到期信息，沿用原 5 值集合的建议续费
                None => RenewalSuggestion::Recommended,
            };
        }

        match classify_tld(&record.domain) {
            TldClass::ChineseCc => RenewalSuggestion::Escalate,
            TldClass::Generic | TldClass::ForeignCc => RenewalSuggestion::Optional,
            TldClass::Unknown => RenewalSuggestion::Pending,
        }
    }

    /// 重新分类证书状态
    ///
    /// 已经处于 error/不可达状态的证书是粘滞的，后续评估不会把它
    /// 悄悄改回良性状态，否则连通性问题会被掩盖成「正常」。
    pub fn reclassify_certificate(&self, result: &CertificateResult) -> CertStatus {
        if result.status == CertStatus::Error || !result.accessible {
            return CertStatus::Error;
        }
        let days = result.days_remaining;
        if days < 0 {
            CertStatus::Expired
        } else if days <= self.thresholds.ssl.critical_days {
            CertStatus::Critical
        } else if days <= self.thresholds.ssl.warning_days {
            CertStatus::Warning
        } else {
            CertStatus::Active
        }
    }
}

/// 域名是否有保留价值
fn is_valued(record: &DomainRecord) -> bool {
    record.special_value || has_meaningful_usage(record) || record.has_icp
}

fn has_meaningful_usage(record: &DomainRecord) -> bool {
    match &record.business_usage {
        Some(usage) => {
            let usage = usage.trim();
            !usage.is_empty()
                && !UNUSED_MARKERS
                    .iter()
                    .any(|marker| usage.eq_ignore_ascii_case(marker) || usage == *marker)
        }
        None => false,
    }
}

/// 顶级域分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TldClass {
    /// 中国 ccTLD
    ChineseCc,
    /// 其他国家 ccTLD
    ForeignCc,
    /// 通用 / 新通用顶级域
    Generic,
    /// 无法判断
    Unknown,
}

fn classify_tld(domain: &str) -> TldClass {
    if domain.ends_with(".cn") || domain.ends_with(".中国") {
        return TldClass::ChineseCc;
    }
    match domain.rsplit('.').next() {
        Some(tld) if tld.chars().count() == 2 => TldClass::ForeignCc,
        Some(tld) if tld.chars().count() >= 3 => TldClass::Generic,
        _ => TldClass::Unknown,
    }
}
