// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan_task::{ScanKind, ScanTask, TriggerSource};
use crate::domain::repositories::record_store::{RecordStore, ScanTaskStore};
use crate::evaluation::EvaluationEngine;
use crate::probes::certificate::CertificateProbe;
use crate::probes::retry::RetryOrchestrator;
use crate::probes::whois::WhoisProbe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, instrument, warn};

/// 每完成多少个条目持久化一次任务快照
const PERSIST_EVERY: usize = 5;

/// 单个条目的完成消息
///
/// 工作协程只通过该消息上报结果，ScanTask 由协调器循环独占
/// 持有并更新，避免并发读改写竞争。
#[derive(Debug)]
struct ItemOutcome {
    item: String,
    error: Option<String>,
}

/// 批量扫描协调器
///
/// 在并发上限的信号量下对工作列表逐项运行重试编排的探测，
/// 维护持久化的任务进度记录，容忍单项失败。批量结束后对更新
/// 过的记录触发一轮评估。
pub struct BatchScanCoordinator {
    records: Arc<dyn RecordStore>,
    tasks: Arc<dyn ScanTaskStore>,
    whois: Arc<WhoisProbe>,
    certificates: Arc<CertificateProbe>,
    retry: RetryOrchestrator,
    evaluation: EvaluationEngine,
    concurrency: usize,
}

impl BatchScanCoordinator {
    /// 创建协调器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        records: Arc<dyn RecordStore>,
        tasks: Arc<dyn ScanTaskStore>,
        whois: Arc<WhoisProbe>,
        certificates: Arc<CertificateProbe>,
        retry: RetryOrchestrator,
        evaluation: EvaluationEngine,
        concurrency: usize,
    ) -> Self {
        Self {
            records,
            tasks,
            whois,
            certificates,
            retry,
            evaluation,
            concurrency: concurrency.max(1),
        }
    }

    /// 执行一次批量扫描
    ///
    /// 单项失败只记入任务的错误列表；只有枚举工作列表这类任务级
    /// 操作失败才会把任务整体标记为 failed。
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn run(&self, kind: ScanKind, triggered_by: TriggerSource) -> ScanTask {
        let mut task = ScanTask::new(kind, 0, triggered_by);

        let domains = match self.records.list_domains().await {
            Ok(domains) => domains,
            Err(e) => {
                error!(%e, "failed to enumerate worklist");
                let _ = task.fail();
                self.persist(&task).await;
                return task;
            }
        };

        task.total_items = domains.len();
        if task.start().is_err() {
            // 新建任务必然处于 Pending，这里不可达
            return task;
        }
        self.persist(&task).await;
        info!(task_id = %task.id, total = task.total_items, "batch scan started");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<ItemOutcome>(self.concurrency.max(1) * 2);

        for domain in domains {
            let permit_source = semaphore.clone();
            let tx = tx.clone();
            let records = self.records.clone();
            let whois = self.whois.clone();
            let certificates = self.certificates.clone();
            let retry = self.retry.clone();

            tokio::spawn(async move {
                let _permit = match permit_source.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let error = match kind {
                    ScanKind::Domain => {
                        let outcome = retry
                            .run(|strategy| whois.query(&domain, strategy))
                            .await;
                        match outcome {
                            Ok(result) => records
                                .apply_whois_result(&result)
                                .await
                                .err()
                                .map(|e| e.to_string()),
                            Err(e) => Some(e.to_string()),
                        }
                    }
                    ScanKind::Ssl => {
                        // 证书探测把失败编码进结果值，永远解析成功
                        let result = certificates.check(&domain).await;
                        records
                            .apply_certificate_result(&result)
                            .await
                            .err()
                            .map(|e| e.to_string())
                    }
                };
                let _ = tx
                    .send(ItemOutcome {
                        item: domain,
                        error,
                    })
                    .await;
            });
        }
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            match outcome.error {
                None => task.record_success(),
                Some(error) => {
                    warn!(item = %outcome.item, %error, "scan item failed");
                    task.record_failure(outcome.item, error);
                }
            }
            if task.scanned_items % PERSIST_EVERY == 0 {
                self.persist(&task).await;
            }
        }

        if task.complete().is_err() {
            warn!(task_id = %task.id, "task already terminal before completion");
        }
        self.persist(&task).await;
        info!(
            task_id = %task.id,
            success = task.success_count,
            failed = task.failure_count,
            "batch scan finished"
        );

        self.run_evaluation_pass(kind).await;
        task
    }

    /// 对更新过的记录做一轮评估
    async fn run_evaluation_pass(&self, kind: ScanKind) {
        let now = chrono::Utc::now();
        match kind {
            ScanKind::Domain => {
                let records = match self.records.list_records().await {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(%e, "evaluation pass skipped: record listing failed");
                        return;
                    }
                };
                for mut record in records {
                    let suggestion = self.evaluation.suggest(&record, now);
                    if record.suggestion != Some(suggestion) {
                        record.suggestion = Some(suggestion);
                        if let Err(e) = self.records.update_record(&record).await {
                            warn!(domain = %record.domain, %e, "suggestion write-back failed");
                        }
                    }
                }
            }
            ScanKind::Ssl => {
                let certificates = match self.records.list_certificates().await {
                    Ok(certificates) => certificates,
                    Err(e) => {
                        warn!(%e, "evaluation pass skipped: certificate listing failed");
                        return;
                    }
                };
                for mut certificate in certificates {
                    let status = self.evaluation.reclassify_certificate(&certificate);
                    if certificate.status != status {
                        certificate.status = status;
                        if let Err(e) =
                            self.records.apply_certificate_result(&certificate).await
                        {
                            warn!(domain = %certificate.domain, %e, "status write-back failed");
                        }
                    }
                }
            }
        }
    }

    async fn persist(&self, task: &ScanTask) {
        if let Err(e) = self.tasks.save(task).await {
            warn!(task_id = %task.id, %e, "task snapshot persist failed");
        }
    }
}
