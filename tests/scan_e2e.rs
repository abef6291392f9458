// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 批量扫描端到端测试
//!
//! 用 mock 子进程运行器代替真实 whois，验证协调器、重试编排、
//! 解析级联与评估引擎串起来的整体行为。

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use renewrs::domain::models::certificate::CertStatus;
use renewrs::domain::models::domain_record::DomainRecord;
use renewrs::domain::models::scan_task::{ScanKind, ScanStatus, TriggerSource};
use renewrs::domain::repositories::record_store::{
    InMemoryRecordStore, InMemoryScanTaskStore, ScanTaskStore,
};
use renewrs::evaluation::{EvaluationEngine, RenewalSuggestion};
use renewrs::probes::certificate::CertificateProbe;
use renewrs::probes::retry::RetryOrchestrator;
use renewrs::probes::runner::{CommandOutput, CommandRunner, CommandSpec};
use renewrs::probes::whois::WhoisProbe;
use renewrs::probes::ProbeError;
use renewrs::scan::coordinator::BatchScanCoordinator;
use std::sync::Arc;
use std::time::Duration;

/// 按域名回放 WHOIS 文本的 mock 运行器
struct ScriptedWhois;

#[async_trait]
impl CommandRunner for ScriptedWhois {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        let domain = spec.args.last().cloned().unwrap_or_default();
        let stdout = match domain.as_str() {
            "a.com" => format!(
                "Domain Name: A.COM\nRegistry Expiry Date: {}\nRegistrar: Example Registrar\n",
                (Utc::now() + ChronoDuration::days(5)).to_rfc3339()
            ),
            "b.cn" => format!(
                "Domain Name: b.cn\nExpiration Time: {}\n",
                (Utc::now() + ChronoDuration::days(20)).format("%Y-%m-%d %H:%M:%S")
            ),
            // c.com 的注册局返回无法解析的文本
            _ => "No match for domain \"C.COM\".\n".to_string(),
        };
        Ok(CommandOutput {
            exit_ok: true,
            exit_code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

fn coordinator(
    records: Arc<InMemoryRecordStore>,
    tasks: Arc<InMemoryScanTaskStore>,
    certificates: Arc<CertificateProbe>,
) -> BatchScanCoordinator {
    let runner = Arc::new(ScriptedWhois);
    let whois = Arc::new(
        WhoisProbe::new(runner.clone(), runner).with_timeout(Duration::from_secs(2)),
    );
    BatchScanCoordinator::new(
        records,
        tasks,
        whois,
        certificates,
        RetryOrchestrator::new(1),
        EvaluationEngine::default(),
        5,
    )
}

#[tokio::test]
async fn domain_batch_classifies_and_records_parse_failure() {
    let records = Arc::new(InMemoryRecordStore::default());
    // a.com 有业务用途（有价值），b.cn 闲置，c.com 解析失败
    let mut valued = DomainRecord::new("a.com");
    valued.business_usage = Some("官网".to_string());
    records.insert_record(valued);
    records.insert_record(DomainRecord::new("b.cn"));
    records.insert_record(DomainRecord::new("c.com"));

    let tasks = Arc::new(InMemoryScanTaskStore::default());
    let task = coordinator(records.clone(), tasks.clone(), Arc::new(CertificateProbe::new()))
        .run(ScanKind::Domain, TriggerSource::Manual)
        .await;

    assert_eq!(task.status, ScanStatus::Completed);
    assert_eq!(task.total_items, 3);
    assert_eq!(task.scanned_items, 3);
    assert_eq!(task.success_count, 2);
    assert_eq!(task.failure_count, 1);
    assert_eq!(task.errors.len(), 1);
    assert_eq!(task.errors[0].item, "c.com");
    assert!(task.errors[0].error.contains("解析失败"));

    let a = records.get_record("a.com").unwrap();
    assert_eq!(a.suggestion, Some(RenewalSuggestion::Urgent));
    assert_eq!(a.suggestion.unwrap().to_string(), "紧急续费");
    assert_eq!(a.registrar.as_deref(), Some("Example Registrar"));

    let b = records.get_record("b.cn").unwrap();
    assert_eq!(b.suggestion, Some(RenewalSuggestion::Escalate));
    assert_eq!(b.suggestion.unwrap().to_string(), "请示领导");

    // 任务快照已持久化且可轮询
    let stored = tasks.find_by_id(task.id).await.unwrap().unwrap();
    let progress = stored.progress();
    assert_eq!(progress.progress.percentage, 100);
    assert_eq!(progress.progress.failed, 1);
}

#[tokio::test]
async fn ssl_batch_resolves_refused_connection_as_error_result() {
    // 绑定后立即释放端口，保证连接被拒绝
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let records = Arc::new(InMemoryRecordStore::with_domains(
        ["localhost".to_string()].into_iter(),
    ));
    let tasks = Arc::new(InMemoryScanTaskStore::default());
    let probe = Arc::new(
        CertificateProbe::new()
            .with_port(port)
            .with_timeout(Duration::from_secs(2)),
    );

    let task = coordinator(records.clone(), tasks, probe)
        .run(ScanKind::Ssl, TriggerSource::Scheduled)
        .await;

    // 不可达主机不会中断批量，也不算条目失败：错误编码在结果值里
    assert_eq!(task.status, ScanStatus::Completed);
    assert_eq!(task.success_count, 1);
    assert_eq!(task.failure_count, 0);

    let cert = records.get_certificate("localhost").unwrap();
    assert_eq!(cert.status, CertStatus::Error);
    assert!(!cert.accessible);
    assert_eq!(cert.days_remaining, -1);
    assert!(cert.check_error.is_some());
}

#[tokio::test]
async fn empty_worklist_completes_with_zero_counts() {
    let records = Arc::new(InMemoryRecordStore::default());
    let tasks = Arc::new(InMemoryScanTaskStore::default());
    let task = coordinator(records, tasks, Arc::new(CertificateProbe::new()))
        .run(ScanKind::Domain, TriggerSource::Manual)
        .await;

    assert_eq!(task.status, ScanStatus::Completed);
    assert_eq!(task.total_items, 0);
    assert_eq!(task.success_count + task.failure_count, task.scanned_items);
    assert_eq!(task.scanned_items, 0);
}

#[tokio::test]
async fn no_renew_flag_survives_scan_and_evaluation() {
    let records = Arc::new(InMemoryRecordStore::default());
    let mut flagged = DomainRecord::new("a.com");
    flagged.no_renew = true;
    flagged.special_value = true;
    flagged.has_icp = true;
    records.insert_record(flagged);

    let tasks = Arc::new(InMemoryScanTaskStore::default());
    coordinator(records.clone(), tasks, Arc::new(CertificateProbe::new()))
        .run(ScanKind::Domain, TriggerSource::Manual)
        .await;

    // 不续费标记无条件压过价值信号
    let record = records.get_record("a.com").unwrap();
    assert_eq!(record.suggestion, Some(RenewalSuggestion::NoRenew));
    assert_eq!(record.suggestion.unwrap().to_string(), "不续费");
}
