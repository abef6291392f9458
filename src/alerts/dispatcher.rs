// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::alerts::providers::{is_success, render_payload};
use crate::domain::models::alert::{
    AlertChannelConfig, ChannelHistory, SendRecord,
};
use crate::domain::models::certificate::{CertStatus, CertificateResult};
use crate::domain::models::domain_record::DomainRecord;
use crate::evaluation::RenewalSuggestion;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

/// 正常桶最多直接列出的条目数
const ACTIVE_BUCKET_CAP: usize = 5;

/// 告警通道运行态
///
/// 配置加上有界的发送历史。
#[derive(Debug)]
pub struct AlertChannel {
    /// 通道配置
    pub config: AlertChannelConfig,
    /// 发送历史，上限 30 条
    pub history: ChannelHistory,
}

impl AlertChannel {
    /// 从配置创建通道
    pub fn new(config: AlertChannelConfig) -> Self {
        Self {
            config,
            history: ChannelHistory::default(),
        }
    }
}

/// 优先级桶
#[derive(Debug, Clone)]
struct Bucket {
    emoji: &'static str,
    label: &'static str,
    lines: Vec<String>,
    /// 被截断的条目数（仅正常桶）
    more: usize,
}

impl Bucket {
    fn new(emoji: &'static str, label: &'static str) -> Self {
        Self {
            emoji,
            label,
            lines: Vec::new(),
            more: 0,
        }
    }

    fn render_into(&self, out: &mut String) {
        // 空桶不渲染标题
        if self.lines.is_empty() {
            return;
        }
        out.push_str(&format!("\n{} {}\n", self.emoji, self.label));
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        if self.more > 0 {
            out.push_str(&format!("  ...另有 {} 个\n", self.more));
        }
    }

    fn item_count(&self) -> usize {
        self.lines.len() + self.more
    }
}

/// 告警分发器
///
/// 把评估后的记录按通道范围与提前天数过滤，分组进有序优先级桶，
/// 渲染提供方专属信封并投递到 webhook。单个通道失败不影响其余
/// 通道。
pub struct AlertDispatcher {
    client: reqwest::Client,
    channels: Vec<AlertChannel>,
}

impl AlertDispatcher {
    /// 从通道配置创建分发器
    pub fn new(configs: Vec<AlertChannelConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            channels: configs.into_iter().map(AlertChannel::new).collect(),
        }
    }

    /// 读取通道（含发送历史）
    pub fn channels(&self) -> &[AlertChannel] {
        &self.channels
    }

    /// 对所有启用的通道执行一轮告警
    ///
    /// 返回尝试发送的通道数。
    pub async fn dispatch(
        &mut self,
        records: &[DomainRecord],
        certificates: &[CertificateResult],
        now: DateTime<Utc>,
    ) -> usize {
        let mut attempted = 0;
        for channel in &mut self.channels {
            if !channel.config.enabled {
                continue;
            }

            let mut sections = Vec::new();
            let mut item_count = 0;

            if channel.config.alert_scope.covers_domain() {
                let buckets =
                    build_domain_buckets(records, channel.config.domain_lead_days, now);
                let count: usize = buckets.iter().map(Bucket::item_count).sum();
                if count > 0 {
                    sections.push(("【域名到期提醒】", buckets));
                    item_count += count;
                }
            }
            if channel.config.alert_scope.covers_ssl() {
                let buckets = build_certificate_buckets(
                    certificates,
                    channel.config.ssl_lead_days,
                    now,
                );
                let count: usize = buckets.iter().map(Bucket::item_count).sum();
                if count > 0 {
                    sections.push(("【证书到期提醒】", buckets));
                    item_count += count;
                }
            }

            if sections.is_empty() {
                continue;
            }

            let mut content = String::new();
            for (title, buckets) in &sections {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(title);
                content.push('\n');
                for bucket in buckets {
                    bucket.render_into(&mut content);
                }
            }

            attempted += 1;
            let provider = channel.config.provider;
            let payload = render_payload(provider, &content);
            let outcome = match self
                .client
                .post(&channel.config.webhook)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => {
                    let http_status = response.status().as_u16();
                    let body = response.json::<serde_json::Value>().await.ok();
                    if is_success(provider, http_status, body.as_ref()) {
                        Ok(())
                    } else {
                        Err(format!(
                            "provider rejected payload (http {}): {}",
                            http_status,
                            body.map(|b| b.to_string()).unwrap_or_default()
                        ))
                    }
                }
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    info!(provider = ?provider, item_count, "alert sent");
                    channel.history.push(SendRecord {
                        sent_at: Utc::now(),
                        item_count,
                        success: true,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(provider = ?provider, %error, "alert send failed");
                    channel.history.push(SendRecord {
                        sent_at: Utc::now(),
                        item_count,
                        success: false,
                        error: Some(error),
                    });
                }
            }
        }
        attempted
    }
}

/// 域名侧优先级桶：已过期 → 紧急续费 → 建议续费 → 保持续费（截断）
/// → 其他到期域名（截断）
///
/// 最后一个桶收纳在窗口内但建议不是续费三档的域名（请示领导、
/// 可不续费、待评估或尚未评估），用中性标题避免把它们误报成
/// 「保持续费」。
fn build_domain_buckets(
    records: &[DomainRecord],
    lead_days: i64,
    now: DateTime<Utc>,
) -> Vec<Bucket> {
    let mut expired = Bucket::new("🔴", "已过期");
    let mut urgent = Bucket::new("🟠", "紧急续费");
    let mut recommended = Bucket::new("🟡", "建议续费");
    let mut keep = Bucket::new("🟢", "保持续费");
    let mut other = Bucket::new("⚪", "其他到期域名");

    for record in records {
        // 不续费的域名永不进入告警
        if record.suggestion == Some(RenewalSuggestion::NoRenew) || record.no_renew {
            continue;
        }
        let days = match record.days_until_expiry(now) {
            Some(days) if days <= lead_days => days,
            _ => continue,
        };
        let line = format_domain_line(record, days);
        if days < 0 {
            expired.lines.push(line);
            continue;
        }
        match record.suggestion {
            Some(RenewalSuggestion::Urgent) => urgent.lines.push(line),
            Some(RenewalSuggestion::Recommended) => recommended.lines.push(line),
            Some(RenewalSuggestion::Keep) => {
                if keep.lines.len() < ACTIVE_BUCKET_CAP {
                    keep.lines.push(line);
                } else {
                    keep.more += 1;
                }
            }
            _ => {
                if other.lines.len() < ACTIVE_BUCKET_CAP {
                    other.lines.push(line);
                } else {
                    other.more += 1;
                }
            }
        }
    }

    vec![expired, urgent, recommended, keep, other]
}

/// 证书侧优先级桶：已过期 → 紧急 → 即将到期 → 正常（截断）
fn build_certificate_buckets(
    certificates: &[CertificateResult],
    lead_days: i64,
    _now: DateTime<Utc>,
) -> Vec<Bucket> {
    let mut expired = Bucket::new("🔴", "证书已过期");
    let mut critical = Bucket::new("🟠", "证书紧急");
    let mut warning = Bucket::new("🟡", "证书即将到期");
    let mut active = Bucket::new("🟢", "证书正常");

    for cert in certificates {
        // 不可达主机走独立的运维渠道，不混入到期提醒
        if cert.status == CertStatus::Error || !cert.accessible {
            continue;
        }
        if cert.days_remaining > lead_days {
            continue;
        }
        let line = format!("  {} 剩余 {} 天", cert.domain, cert.days_remaining);
        match cert.status {
            CertStatus::Expired => expired.lines.push(line),
            CertStatus::Critical => critical.lines.push(line),
            CertStatus::Warning => warning.lines.push(line),
            CertStatus::Active => {
                if active.lines.len() < ACTIVE_BUCKET_CAP {
                    active.lines.push(line);
                } else {
                    active.more += 1;
                }
            }
            CertStatus::Error => unreachable!(),
        }
    }

    vec![expired, critical, warning, active]
}

fn format_domain_line(record: &DomainRecord, days: i64) -> String {
    match record.expiry_date {
        Some(expiry) => format!(
            "  {} 剩余 {} 天 ({})",
            record.domain,
            days,
            expiry.format("%Y-%m-%d")
        ),
        None => format!("  {} 剩余 {} 天", record.domain, days),
    }
}
