// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 扫描任务实体
///
/// 表示一次批量扫描的生命周期记录。任务在批量扫描发起时创建，
/// 由批量扫描协调器在每个条目完成时增量更新，进入终态
/// （Completed/Failed）后不再变化。运行期间由协调器独占持有。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTask {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 扫描类型，决定使用哪种探测器
    pub kind: ScanKind,
    /// 任务状态
    pub status: ScanStatus,
    /// 条目总数
    pub total_items: usize,
    /// 已完成条目数（成功 + 失败）
    pub scanned_items: usize,
    /// 成功条目数
    pub success_count: usize,
    /// 失败条目数
    pub failure_count: usize,
    /// 按完成顺序记录的条目错误
    pub errors: Vec<ScanItemError>,
    /// 任务开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 任务结束时间
    pub ended_at: Option<DateTime<Utc>>,
    /// 触发方式
    pub triggered_by: TriggerSource,
}

/// 单个条目的扫描错误记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanItemError {
    /// 出错的条目（域名）
    pub item: String,
    /// 错误描述
    pub error: String,
}

/// 扫描类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// 域名 WHOIS 到期扫描
    #[default]
    Domain,
    /// TLS 证书到期扫描
    Ssl,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanKind::Domain => write!(f, "domain"),
            ScanKind::Ssl => write!(f, "ssl"),
        }
    }
}

impl FromStr for ScanKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(ScanKind::Domain),
            "ssl" => Ok(ScanKind::Ssl),
            _ => Err(()),
        }
    }
}

/// 任务状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// 已创建，尚未开始执行
    #[default]
    Pending,
    /// 扫描进行中
    Running,
    /// 已完成，所有条目均已处理（允许部分条目失败）
    Completed,
    /// 系统性失败，任务级操作出错导致整体中止
    Failed,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "pending"),
            ScanStatus::Running => write!(f, "running"),
            ScanStatus::Completed => write!(f, "completed"),
            ScanStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ScanStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "running" => Ok(ScanStatus::Running),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 触发方式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// 手动触发
    #[default]
    Manual,
    /// 定时触发
    Scheduled,
}

/// 任务领域错误类型
#[derive(Error, Debug)]
pub enum TaskError {
    /// 无效的状态转换
    #[error("Invalid state transition")]
    InvalidStateTransition,
}

/// 任务进度快照
///
/// 供外部轮询接口消费的只读视图，错误列表截取前 10 条。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: Uuid,
    pub task_type: ScanKind,
    pub status: ScanStatus,
    pub progress: ProgressCounters,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub errors: Vec<ScanItemError>,
}

/// 进度计数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub total: usize,
    pub scanned: usize,
    pub success: usize,
    pub failed: usize,
    pub percentage: u32,
}

impl ScanTask {
    /// 创建一个新的扫描任务
    pub fn new(kind: ScanKind, total_items: usize, triggered_by: TriggerSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: ScanStatus::Pending,
            total_items,
            scanned_items: 0,
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
            started_at: None,
            ended_at: None,
            triggered_by,
        }
    }

    /// 启动任务
    ///
    /// 将任务状态从 Pending 变更为 Running
    pub fn start(&mut self) -> Result<(), TaskError> {
        match self.status {
            ScanStatus::Pending => {
                self.status = ScanStatus::Running;
                self.started_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(TaskError::InvalidStateTransition),
        }
    }

    /// 记录一个条目成功完成
    pub fn record_success(&mut self) {
        self.scanned_items += 1;
        self.success_count += 1;
    }

    /// 记录一个条目失败
    pub fn record_failure(&mut self, item: impl Into<String>, error: impl Into<String>) {
        self.scanned_items += 1;
        self.failure_count += 1;
        self.errors.push(ScanItemError {
            item: item.into(),
            error: error.into(),
        });
    }

    /// 完成任务
    ///
    /// 将任务状态从 Running 变更为 Completed
    pub fn complete(&mut self) -> Result<(), TaskError> {
        match self.status {
            ScanStatus::Running => {
                self.status = ScanStatus::Completed;
                self.ended_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(TaskError::InvalidStateTransition),
        }
    }

    /// 标记任务系统性失败
    pub fn fail(&mut self) -> Result<(), TaskError> {
        match self.status {
            ScanStatus::Pending | ScanStatus::Running => {
                self.status = ScanStatus::Failed;
                self.ended_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(TaskError::InvalidStateTransition),
        }
    }

    /// 任务是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ScanStatus::Completed | ScanStatus::Failed)
    }

    /// 生成进度快照
    ///
    /// 百分比按 `round(scanned/total*100)` 计算，total 为 0 时取 0；
    /// 错误列表只保留前 10 条。
    pub fn progress(&self) -> TaskProgress {
        let percentage = if self.total_items == 0 {
            0
        } else {
            ((self.scanned_items as f64 / self.total_items as f64) * 100.0).round() as u32
        };
        TaskProgress {
            task_id: self.id,
            task_type: self.kind,
            status: self.status,
            progress: ProgressCounters {
                total: self.total_items,
                scanned: self.scanned_items,
                success: self.success_count,
                failed: self.failure_count,
                percentage,
            },
            start_time: self.started_at,
            end_time: self.ended_at,
            errors: self.errors.iter().take(10).cloned().collect(),
        }
    }
}
