// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 告警分发集成测试
//!
//! 用 wiremock 模拟各提供方的 webhook 端点，验证信封格式、
//! 成功判定、通道隔离与发送历史。

use chrono::{Duration as ChronoDuration, Utc};
use renewrs::alerts::dispatcher::AlertDispatcher;
use renewrs::domain::models::alert::{AlertChannelConfig, AlertProvider, AlertScope};
use renewrs::domain::models::certificate::{CertStatus, CertificateResult};
use renewrs::domain::models::domain_record::DomainRecord;
use renewrs::evaluation::RenewalSuggestion;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn channel(provider: AlertProvider, webhook: String, scope: AlertScope) -> AlertChannelConfig {
    AlertChannelConfig {
        provider,
        webhook,
        enabled: true,
        alert_scope: scope,
        domain_lead_days: 30,
        ssl_lead_days: 14,
    }
}

fn expiring_domain(domain: &str, days: i64, suggestion: RenewalSuggestion) -> DomainRecord {
    let mut record = DomainRecord::new(domain);
    record.expiry_date = Some(Utc::now() + ChronoDuration::days(days));
    record.suggestion = Some(suggestion);
    record
}

fn expiring_cert(domain: &str, days: i64, status: CertStatus) -> CertificateResult {
    CertificateResult {
        domain: domain.to_string(),
        issuer: None,
        subject: None,
        valid_from: None,
        valid_to: None,
        days_remaining: days,
        status,
        accessible: true,
        check_error: None,
        is_wildcard: false,
        alternative_names: Vec::new(),
    }
}

#[tokio::test]
async fn dingtalk_success_recorded_in_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .and(body_partial_json(json!({"msgtype": "text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0, "errmsg": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = AlertDispatcher::new(vec![channel(
        AlertProvider::Dingtalk,
        format!("{}/robot/send", server.uri()),
        AlertScope::Domain,
    )]);

    let records = vec![expiring_domain("a.com", 5, RenewalSuggestion::Urgent)];
    let attempted = dispatcher.dispatch(&records, &[], Utc::now()).await;

    assert_eq!(attempted, 1);
    let history = &dispatcher.channels()[0].history;
    assert_eq!(history.len(), 1);
    let entry = history.iter().next().unwrap();
    assert!(entry.success);
    assert_eq!(entry.item_count, 1);
    assert!(entry.error.is_none());
}

#[tokio::test]
async fn provider_envelope_rejection_does_not_block_other_channels() {
    let server = MockServer::start().await;
    // 钉钉返回 HTTP 200 但信封表示失败
    Mock::given(method("POST"))
        .and(path("/dingtalk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 310000, "errmsg": "keywords not in content"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // 飞书正常
    Mock::given(method("POST"))
        .and(path("/feishu"))
        .and(body_partial_json(json!({"msg_type": "text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = AlertDispatcher::new(vec![
        channel(
            AlertProvider::Dingtalk,
            format!("{}/dingtalk", server.uri()),
            AlertScope::Both,
        ),
        channel(
            AlertProvider::Feishu,
            format!("{}/feishu", server.uri()),
            AlertScope::Both,
        ),
    ]);

    let certs = vec![expiring_cert("ok.example.com", 3, CertStatus::Critical)];
    let attempted = dispatcher.dispatch(&[], &certs, Utc::now()).await;
    assert_eq!(attempted, 2);

    let dingtalk = &dispatcher.channels()[0].history;
    assert!(!dingtalk.iter().next().unwrap().success);
    assert!(dingtalk.iter().next().unwrap().error.is_some());

    let feishu = &dispatcher.channels()[1].history;
    assert!(feishu.iter().next().unwrap().success);
}

#[tokio::test]
async fn wechat_uses_dingtalk_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"msgtype": "text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = AlertDispatcher::new(vec![channel(
        AlertProvider::Wechat,
        server.uri(),
        AlertScope::Ssl,
    )]);
    let certs = vec![expiring_cert("ok.example.com", 10, CertStatus::Warning)];
    assert_eq!(dispatcher.dispatch(&[], &certs, Utc::now()).await, 1);
    assert!(dispatcher.channels()[0].history.iter().next().unwrap().success);
}

#[tokio::test]
async fn nothing_in_window_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(0)
        .mount(&server)
        .await;

    let mut dispatcher = AlertDispatcher::new(vec![channel(
        AlertProvider::Dingtalk,
        server.uri(),
        AlertScope::Both,
    )]);

    // 到期尚远的域名 / 不续费域名都不在窗口内
    let records = vec![
        expiring_domain("far.com", 300, RenewalSuggestion::Keep),
        expiring_domain("skip.com", 3, RenewalSuggestion::NoRenew),
    ];
    let attempted = dispatcher.dispatch(&records, &[], Utc::now()).await;
    assert_eq!(attempted, 0);
    assert!(dispatcher.channels()[0].history.is_empty());
}

#[tokio::test]
async fn scope_filters_sections() {
    let server = MockServer::start().await;
    // 仅证书范围的通道，消息里不应出现域名提醒
    Mock::given(method("POST"))
        .and(wiremock::matchers::body_string_contains("证书到期提醒"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = AlertDispatcher::new(vec![channel(
        AlertProvider::Dingtalk,
        server.uri(),
        AlertScope::Ssl,
    )]);

    let records = vec![expiring_domain("a.com", 5, RenewalSuggestion::Urgent)];
    let certs = vec![expiring_cert("ok.example.com", 3, CertStatus::Critical)];
    let attempted = dispatcher.dispatch(&records, &certs, Utc::now()).await;
    assert_eq!(attempted, 1);
    assert!(dispatcher.channels()[0].history.iter().next().unwrap().success);

    // 收到的请求体不含域名段落
    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body).to_string();
    assert!(!body.contains("域名到期提醒"));
}

#[tokio::test]
async fn disabled_channel_is_skipped() {
    let mut config = channel(
        AlertProvider::Feishu,
        "http://127.0.0.1:1/unreachable".to_string(),
        AlertScope::Both,
    );
    config.enabled = false;

    let mut dispatcher = AlertDispatcher::new(vec![config]);
    let records = vec![expiring_domain("a.com", 5, RenewalSuggestion::Urgent)];
    assert_eq!(dispatcher.dispatch(&records, &[], Utc::now()).await, 0);
}

#[tokio::test]
async fn transport_failure_recorded_as_history_failure() {
    // 连接不上的 webhook：失败进入历史而不是向上抛出
    let mut dispatcher = AlertDispatcher::new(vec![channel(
        AlertProvider::Feishu,
        "http://127.0.0.1:1/unreachable".to_string(),
        AlertScope::Both,
    )]);
    let records = vec![expiring_domain("a.com", 5, RenewalSuggestion::Urgent)];
    let attempted = dispatcher.dispatch(&records, &[], Utc::now()).await;
    assert_eq!(attempted, 1);

    let entry_list: Vec<_> = dispatcher.channels()[0].history.iter().collect();
    assert_eq!(entry_list.len(), 1);
    assert!(!entry_list[0].success);
    assert!(entry_list[0].error.is_some());
}
