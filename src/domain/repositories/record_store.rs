// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::certificate::CertificateResult;
use crate::domain::models::domain_record::{DomainExpiryResult, DomainRecord};
use crate::domain::models::scan_task::ScanTask;
use crate::utils::errors::RepositoryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// 记录仓库特质
///
/// 扫描引擎与外部持久化协作方之间的窄接口：枚举工作列表、
/// 回写探测结果、读取记录用于评估与告警。
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 枚举待扫描的域名列表
    async fn list_domains(&self) -> Result<Vec<String>, RepositoryError>;
    /// 回写 WHOIS 探测结果
    async fn apply_whois_result(
        &self,
        result: &DomainExpiryResult,
    ) -> Result<(), RepositoryError>;
    /// 回写证书探测结果
    async fn apply_certificate_result(
        &self,
        result: &CertificateResult,
    ) -> Result<(), RepositoryError>;
    /// 读取全部域名记录
    async fn list_records(&self) -> Result<Vec<DomainRecord>, RepositoryError>;
    /// 读取全部证书结果
    async fn list_certificates(&self) -> Result<Vec<CertificateResult>, RepositoryError>;
    /// 更新域名记录（评估结果回写）
    async fn update_record(&self, record: &DomainRecord) -> Result<(), RepositoryError>;
}

/// 任务仓库特质
///
/// 定义扫描任务快照的持久化接口
#[async_trait]
pub trait ScanTaskStore: Send + Sync {
    /// 持久化任务快照
    async fn save(&self, task: &ScanTask) -> Result<(), RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScanTask>, RepositoryError>;
}

/// 内存记录仓库
///
/// 外部持久化协作方的替身，供二进制入口与测试使用。
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, DomainRecord>>,
    certificates: RwLock<HashMap<String, CertificateResult>>,
}

impl InMemoryRecordStore {
    /// 用给定域名列表初始化仓库
    pub fn with_domains(domains: impl IntoIterator<Item = String>) -> Self {
        let store = Self::default();
        {
            let mut records = store.records.write();
            for domain in domains {
                records.insert(domain.clone(), DomainRecord::new(domain));
            }
        }
        store
    }

    /// 插入或替换一条域名记录
    pub fn insert_record(&self, record: DomainRecord) {
        self.records.write().insert(record.domain.clone(), record);
    }

    /// 读取单条域名记录
    pub fn get_record(&self, domain: &str) -> Option<DomainRecord> {
        self.records.read().get(domain).cloned()
    }

    /// 读取单条证书结果
    pub fn get_certificate(&self, domain: &str) -> Option<CertificateResult> {
        self.certificates.read().get(domain).cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_domains(&self) -> Result<Vec<String>, RepositoryError> {
        let mut domains: Vec<String> = self.records.read().keys().cloned().collect();
        domains.sort();
        Ok(domains)
    }

    async fn apply_whois_result(
        &self,
        result: &DomainExpiryResult,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .entry(result.domain.clone())
            .or_insert_with(|| DomainRecord::new(result.domain.clone()));
        record.apply_whois(result);
        Ok(())
    }

    async fn apply_certificate_result(
        &self,
        result: &CertificateResult,
    ) -> Result<(), RepositoryError> {
        self.certificates
            .write()
            .insert(result.domain.clone(), result.clone());
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<DomainRecord>, RepositoryError> {
        let mut records: Vec<DomainRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(records)
    }

    async fn list_certificates(&self) -> Result<Vec<CertificateResult>, RepositoryError> {
        let mut certs: Vec<CertificateResult> =
            self.certificates.read().values().cloned().collect();
        certs.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(certs)
    }

    async fn update_record(&self, record: &DomainRecord) -> Result<(), RepositoryError> {
        self.records
            .write()
            .insert(record.domain.clone(), record.clone());
        Ok(())
    }
}

/// 内存任务仓库
#[derive(Default)]
pub struct InMemoryScanTaskStore {
    tasks: RwLock<HashMap<Uuid, ScanTask>>,
}

impl InMemoryScanTaskStore {
    /// 已持久化的任务快照数量
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl ScanTaskStore for InMemoryScanTaskStore {
    async fn save(&self, task: &ScanTask) -> Result<(), RepositoryError> {
        self.tasks.write().insert(task.id, task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScanTask>, RepositoryError> {
        Ok(self.tasks.read().get(&id).cloned())
    }
}
