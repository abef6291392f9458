// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::alert::AlertChannelConfig;
use crate::evaluation::EvaluationThresholds;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含扫描并发与超时、评估阈值、告警通道和工作列表等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 扫描配置
    pub scan: ScanSettings,
    /// 评估阈值
    #[serde(default)]
    pub thresholds: EvaluationThresholds,
    /// 告警配置
    #[serde(default)]
    pub alerts: AlertSettings,
    /// 工作列表配置
    #[serde(default)]
    pub worklist: WorklistSettings,
}

/// 扫描配置设置
#[derive(Debug, Deserialize)]
pub struct ScanSettings {
    /// 域名批量扫描并发上限
    pub domain_concurrency: usize,
    /// 证书批量扫描并发上限
    pub ssl_concurrency: usize,
    /// WHOIS 子进程超时（秒）
    pub whois_timeout_secs: u64,
    /// TLS 探测超时（秒）
    pub tls_timeout_secs: u64,
    /// 单目标最大尝试次数
    pub max_attempts: u32,
}

/// 告警配置设置
#[derive(Debug, Deserialize, Default)]
pub struct AlertSettings {
    /// 告警通道列表
    #[serde(default)]
    pub channels: Vec<AlertChannelConfig>,
}

/// 工作列表配置设置
///
/// 生产部署中工作列表来自外部持久化协作方，此处允许直接在
/// 配置里给出域名列表，便于独立运行。
#[derive(Debug, Deserialize, Default)]
pub struct WorklistSettings {
    /// 待扫描的域名
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件与环境变量加载，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default scan settings
            .set_default("scan.domain_concurrency", 5)?
            .set_default("scan.ssl_concurrency", 10)?
            .set_default("scan.whois_timeout_secs", 45)?
            .set_default("scan.tls_timeout_secs", 10)?
            .set_default("scan.max_attempts", 3)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("RENEWRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files() {
        let settings = Settings::new().expect("defaults should load");
        assert_eq!(settings.scan.domain_concurrency, 5);
        assert_eq!(settings.scan.ssl_concurrency, 10);
        assert_eq!(settings.scan.whois_timeout_secs, 45);
        assert_eq!(settings.scan.tls_timeout_secs, 10);
        assert_eq!(settings.scan.max_attempts, 3);
        assert!(settings.alerts.channels.is_empty());
        assert_eq!(settings.thresholds.domain.urgent_days, 7);
    }
}
