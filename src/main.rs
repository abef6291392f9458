// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use renewrs::alerts::dispatcher::AlertDispatcher;
use renewrs::config::settings::Settings;
use renewrs::domain::models::scan_task::{ScanKind, TriggerSource};
use renewrs::domain::repositories::record_store::{
    InMemoryRecordStore, InMemoryScanTaskStore, RecordStore,
};
use renewrs::evaluation::EvaluationEngine;
use renewrs::probes::certificate::CertificateProbe;
use renewrs::probes::retry::RetryOrchestrator;
use renewrs::probes::runner::{ShellRunner, SystemRunner};
use renewrs::probes::whois::WhoisProbe;
use renewrs::scan::coordinator::BatchScanCoordinator;
use renewrs::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，对配置的工作列表执行一轮域名与证书扫描，
/// 随后分发到期告警。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting renewrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    if settings.worklist.domains.is_empty() {
        info!("Worklist is empty, nothing to scan");
        return Ok(());
    }

    // 3. Wire components
    let records = Arc::new(InMemoryRecordStore::with_domains(
        settings.worklist.domains.clone(),
    ));
    let tasks = Arc::new(InMemoryScanTaskStore::default());

    let whois = Arc::new(
        WhoisProbe::new(Arc::new(SystemRunner), Arc::new(ShellRunner))
            .with_timeout(Duration::from_secs(settings.scan.whois_timeout_secs)),
    );
    let certificates = Arc::new(
        CertificateProbe::new()
            .with_timeout(Duration::from_secs(settings.scan.tls_timeout_secs)),
    );
    let retry = RetryOrchestrator::new(settings.scan.max_attempts);
    let evaluation = EvaluationEngine::new(settings.thresholds.clone());

    // 4. Run one domain batch and one certificate batch
    let domain_coordinator = BatchScanCoordinator::new(
        records.clone(),
        tasks.clone(),
        whois.clone(),
        certificates.clone(),
        retry.clone(),
        evaluation.clone(),
        settings.scan.domain_concurrency,
    );
    let domain_task = domain_coordinator
        .run(ScanKind::Domain, TriggerSource::Manual)
        .await;
    info!(
        progress = %serde_json::to_string(&domain_task.progress())?,
        "domain scan finished"
    );

    let ssl_coordinator = BatchScanCoordinator::new(
        records.clone(),
        tasks.clone(),
        whois,
        certificates,
        retry,
        evaluation,
        settings.scan.ssl_concurrency,
    );
    let ssl_task = ssl_coordinator
        .run(ScanKind::Ssl, TriggerSource::Manual)
        .await;
    info!(
        progress = %serde_json::to_string(&ssl_task.progress())?,
        "ssl scan finished"
    );

    // 5. Dispatch alerts
    let evaluated_records = records.list_records().await?;
    let certificates = records.list_certificates().await?;
    let mut dispatcher = AlertDispatcher::new(settings.alerts.channels);
    let sent = dispatcher
        .dispatch(&evaluated_records, &certificates, chrono::Utc::now())
        .await;
    info!(channels = sent, "alert dispatch finished");

    Ok(())
}
