// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 每个告警通道保留的发送历史上限
pub const HISTORY_CAP: usize = 30;

/// 告警提供方枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertProvider {
    /// 钉钉群机器人
    Dingtalk,
    /// 企业微信群机器人
    Wechat,
    /// 飞书群机器人
    Feishu,
}

/// 告警范围枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertScope {
    /// 仅域名到期
    Domain,
    /// 仅证书到期
    Ssl,
    /// 两者都告警
    #[default]
    Both,
}

impl AlertScope {
    /// 范围是否覆盖域名告警
    pub fn covers_domain(self) -> bool {
        matches!(self, AlertScope::Domain | AlertScope::Both)
    }

    /// 范围是否覆盖证书告警
    pub fn covers_ssl(self) -> bool {
        matches!(self, AlertScope::Ssl | AlertScope::Both)
    }
}

/// 告警通道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertChannelConfig {
    /// 提供方类型
    #[serde(rename = "type")]
    pub provider: AlertProvider,
    /// Webhook 地址
    pub webhook: String,
    /// 是否启用
    pub enabled: bool,
    /// 告警范围
    #[serde(default)]
    pub alert_scope: AlertScope,
    /// 域名告警提前天数
    #[serde(default = "default_domain_lead_days")]
    pub domain_lead_days: i64,
    /// 证书告警提前天数
    #[serde(default = "default_ssl_lead_days")]
    pub ssl_lead_days: i64,
}

fn default_domain_lead_days() -> i64 {
    30
}

fn default_ssl_lead_days() -> i64 {
    14
}

/// 单次发送的历史记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRecord {
    /// 发送时间
    pub sent_at: DateTime<Utc>,
    /// 本次告警包含的条目数
    pub item_count: usize,
    /// 是否发送成功
    pub success: bool,
    /// 失败原因
    pub error: Option<String>,
}

/// 有界的通道发送历史
///
/// 每次发送尝试后追加一条记录，超过上限时从队首淘汰。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelHistory {
    entries: VecDeque<SendRecord>,
}

impl ChannelHistory {
    /// 追加一条发送记录，超出上限时淘汰最旧的记录
    pub fn push(&mut self, record: SendRecord) {
        self.entries.push_back(record);
        while self.entries.len() > HISTORY_CAP {
            self.entries.pop_front();
        }
    }

    /// 历史记录条数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按时间顺序迭代历史记录
    pub fn iter(&self) -> impl Iterator<Item = &SendRecord> {
        self.entries.iter()
    }
}
