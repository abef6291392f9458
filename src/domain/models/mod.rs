// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 告警通道模型
pub mod alert;

/// 证书探测结果模型
pub mod certificate;

/// 域名记录模型
pub mod domain_record;

/// 扫描任务模型
pub mod scan_task;
