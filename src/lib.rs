// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 告警模块
///
/// 把评估后的记录分组进优先级桶并投递到各 webhook 通道
pub mod alerts;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体和仓库接口
pub mod domain;

/// 评估模块
///
/// 把记录与阈值映射为续费建议 / 证书状态的纯决策函数
pub mod evaluation;

/// 探测模块
///
/// 实现 WHOIS 与 TLS 证书探测、子进程端口和重试编排
pub mod probes;

/// 扫描模块
///
/// 实现并发受限、可容忍单项失败的批量扫描协调
pub mod scan;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
