// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 域名记录
///
/// 持久化协作方持有的域名档案。扫描引擎只读取业务标记
/// （是否续费、业务用途、ICP 备案等），并把 WHOIS 探测结果
/// 写回到期时间等字段。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DomainRecord {
    /// 域名
    pub domain: String,
    /// 到期时间（WHOIS 探测回写）
    pub expiry_date: Option<DateTime<Utc>>,
    /// 注册商（WHOIS 探测回写，尽力而为）
    pub registrar: Option<String>,
    /// 域名服务器（WHOIS 探测回写，尽力而为）
    pub name_servers: Vec<String>,
    /// 手动标记：不续费，优先级最高
    pub no_renew: bool,
    /// 手动标记：特殊价值域名
    pub special_value: bool,
    /// 业务用途描述，空或「未使用」等占位值视为闲置
    pub business_usage: Option<String>,
    /// 是否有 ICP 备案
    pub has_icp: bool,
    /// 最近一次扫描的续费建议
    pub suggestion: Option<crate::evaluation::RenewalSuggestion>,
}

/// WHOIS 探测结果
///
/// 由 WhoisProbe 针对单个域名产出，用于回写域名记录并送入
/// 评估引擎。`partial` 表示子进程异常退出但仍从部分输出中
/// 解析出了数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainExpiryResult {
    /// 域名
    pub domain: String,
    /// 解析出的到期时间
    pub expiry_date: Option<DateTime<Utc>>,
    /// 注册商
    pub registrar: Option<String>,
    /// 域名服务器列表
    pub name_servers: Vec<String>,
    /// 是否来自部分输出
    pub partial: bool,
}

impl DomainRecord {
    /// 创建只含域名的最小记录
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// 应用 WHOIS 探测结果
    pub fn apply_whois(&mut self, result: &DomainExpiryResult) {
        if result.expiry_date.is_some() {
            self.expiry_date = result.expiry_date;
        }
        if result.registrar.is_some() {
            self.registrar = result.registrar.clone();
        }
        if !result.name_servers.is_empty() {
            self.name_servers = result.name_servers.clone();
        }
    }

    /// 距离到期的剩余天数
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiry_date
            .map(|expiry| (expiry - now).num_seconds().div_euclid(86_400))
    }
}
