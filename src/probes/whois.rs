// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::domain_record::DomainExpiryResult;
use crate::probes::runner::{CommandRunner, CommandSpec};
use crate::probes::whois_parser::parse_whois;
use crate::probes::ProbeError;
use crate::utils::validators::validate_domain;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// WHOIS 子进程硬超时
pub const WHOIS_TIMEOUT: Duration = Duration::from_secs(45);

/// stdout 截断上限，防止异常注册局把内存撑爆
pub const WHOIS_OUTPUT_CAP: usize = 2 * 1024 * 1024;

/// CN 注册局专用 WHOIS 服务器
const CN_WHOIS_SERVER: &str = "whois.cnnic.cn";

/// 走 CN 注册局策略的后缀
const CN_SUFFIXES: [&str; 4] = [".com.cn", ".net.cn", ".org.cn", ".cn"];

/// 执行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// 直接 exec 的主策略
    Primary,
    /// 经 shell 间接调用的备用策略
    Fallback,
}

/// WHOIS 探测器
///
/// 对单个域名发起 WHOIS 查询：按后缀选择注册局策略，以强制
/// C locale 的子进程执行查询，再用模式级联解析非结构化响应。
pub struct WhoisProbe {
    primary: Arc<dyn CommandRunner>,
    fallback: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl WhoisProbe {
    /// 创建新的 WHOIS 探测器
    pub fn new(primary: Arc<dyn CommandRunner>, fallback: Arc<dyn CommandRunner>) -> Self {
        Self {
            primary,
            fallback,
            timeout: WHOIS_TIMEOUT,
        }
    }

    /// 覆盖默认超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 判断域名是否走 CN 注册局策略
    pub fn uses_cn_registry(domain: &str) -> bool {
        CN_SUFFIXES.iter().any(|suffix| domain.ends_with(suffix))
    }

    fn build_spec(&self, domain: &str) -> CommandSpec {
        let args = if Self::uses_cn_registry(domain) {
            vec!["-h".to_string(), CN_WHOIS_SERVER.to_string(), domain.to_string()]
        } else {
            vec![domain.to_string()]
        };
        CommandSpec {
            program: "whois".to_string(),
            args,
            // 强制 C locale，让日期以语言中立的形式输出
            envs: vec![
                ("LANG".to_string(), "C".to_string()),
                ("LC_ALL".to_string(), "C".to_string()),
            ],
            timeout: self.timeout,
            max_output: WHOIS_OUTPUT_CAP,
        }
    }

    /// 查询一个域名的到期信息
    ///
    /// 子进程异常退出但 stdout 仍有内容时（注册局输出完整应答后
    /// 未正常关闭套接字的常见情况），先对部分输出尝试解析再放弃。
    pub async fn query(
        &self,
        domain: &str,
        strategy: Strategy,
    ) -> Result<DomainExpiryResult, ProbeError> {
        validate_domain(domain).map_err(|e| ProbeError::Validation(e.to_string()))?;

        let spec = self.build_spec(domain);
        let runner = match strategy {
            Strategy::Primary => &self.primary,
            Strategy::Fallback => &self.fallback,
        };
        let output = runner.run(&spec).await?;

        let partial = !output.exit_ok;
        if partial {
            if output.stdout.trim().is_empty() {
                // 没有任何可解析的输出，按 stderr 归类失败
                return Err(classify_failure(domain, &output.stderr));
            }
            if is_connection_reset(&output.stderr) {
                warn!(
                    domain,
                    "whois exited abnormally with reset, parsing partial output"
                );
            } else {
                warn!(
                    domain,
                    exit_code = ?output.exit_code,
                    "whois exited abnormally, parsing partial output"
                );
            }
        }

        let parsed = parse_whois(&output.stdout);
        match parsed.expiry_date {
            Some(expiry) => {
                debug!(domain, %expiry, partial, "whois expiry extracted");
                Ok(DomainExpiryResult {
                    domain: domain.to_string(),
                    expiry_date: Some(expiry),
                    registrar: parsed.registrar,
                    name_servers: parsed.name_servers,
                    partial,
                })
            }
            None => Err(ProbeError::Parse(format!(
                "{}: 响应中未找到可解析的到期时间",
                domain
            ))),
        }
    }
}

/// 判断 stderr 是否为连接被重置类失败
fn is_connection_reset(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("connection reset by peer")
        || lower.contains("broken pipe")
        || lower.contains("sigpipe")
}

fn classify_failure(domain: &str, stderr: &str) -> ProbeError {
    if is_connection_reset(stderr) {
        ProbeError::ConnectionReset(format!("{}: {}", domain, stderr.trim()))
    } else {
        ProbeError::Subprocess(format!("{}: {}", domain, stderr.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::runner::CommandOutput;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// 记录调用并回放固定输出的 mock 运行器
    struct MockRunner {
        output: CommandOutput,
        specs: Mutex<Vec<CommandSpec>>,
    }

    impl MockRunner {
        fn new(output: CommandOutput) -> Arc<Self> {
            Arc::new(Self {
                output,
                specs: Mutex::new(Vec::new()),
            })
        }

        fn ok(stdout: &str) -> Arc<Self> {
            Self::new(CommandOutput {
                exit_ok: true,
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
            self.specs.lock().push(spec.clone());
            Ok(self.output.clone())
        }
    }

    const COM_RESPONSE: &str = "Domain Name: EXAMPLE.COM\n\
        Registry Expiry Date: 2025-09-15T04:00:00Z\n\
        Registrar: MarkMonitor Inc.\n\
        Name Server: NS1.EXAMPLE.COM\n";

    fn probe(runner: Arc<MockRunner>) -> WhoisProbe {
        WhoisProbe::new(runner.clone(), runner)
    }

    #[test]
    fn test_cn_registry_suffix_selection() {
        for domain in ["example.cn", "example.com.cn", "example.net.cn", "example.org.cn"] {
            assert!(WhoisProbe::uses_cn_registry(domain), "{}", domain);
        }
        for domain in ["example.com", "example.org", "example.com.hk", "cn.example.com"] {
            assert!(!WhoisProbe::uses_cn_registry(domain), "{}", domain);
        }
    }

    #[tokio::test]
    async fn test_query_parses_and_records_strategy_args() {
        let runner = MockRunner::ok(COM_RESPONSE);
        let result = probe(runner.clone())
            .query("example.com", Strategy::Primary)
            .await
            .unwrap();
        assert!(result.expiry_date.is_some());
        assert_eq!(result.registrar.as_deref(), Some("MarkMonitor Inc."));
        assert!(!result.partial);

        let specs = runner.specs.lock();
        assert_eq!(specs[0].args, vec!["example.com"]);
        assert!(specs[0]
            .envs
            .contains(&("LC_ALL".to_string(), "C".to_string())));
    }

    #[tokio::test]
    async fn test_cn_domain_targets_cn_server() {
        let runner = MockRunner::ok("Expiration Time: 2026-03-04 09:05:06\n");
        probe(runner.clone())
            .query("example.com.cn", Strategy::Primary)
            .await
            .unwrap();
        let specs = runner.specs.lock();
        assert_eq!(
            specs[0].args,
            vec!["-h", "whois.cnnic.cn", "example.com.cn"]
        );
    }

    #[tokio::test]
    async fn test_partial_output_still_parsed_on_reset() {
        let runner = MockRunner::new(CommandOutput {
            exit_ok: false,
            exit_code: Some(1),
            stdout: COM_RESPONSE.to_string(),
            stderr: "fgets: Connection reset by peer\n".to_string(),
        });
        let result = probe(runner)
            .query("example.com", Strategy::Primary)
            .await
            .unwrap();
        assert!(result.partial);
        assert!(result.expiry_date.is_some());
    }

    #[tokio::test]
    async fn test_empty_output_with_reset_is_connection_reset() {
        let runner = MockRunner::new(CommandOutput {
            exit_ok: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "Connection reset by peer\n".to_string(),
        });
        let err = probe(runner)
            .query("example.com", Strategy::Primary)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ConnectionReset(_)));
    }

    #[tokio::test]
    async fn test_unparseable_response_is_parse_error() {
        let runner = MockRunner::ok("No match for domain \"C.COM\".\n");
        let err = probe(runner)
            .query("c.com", Strategy::Primary)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[tokio::test]
    async fn test_invalid_domain_rejected_before_invocation() {
        let runner = MockRunner::ok(COM_RESPONSE);
        let err = probe(runner.clone())
            .query("Bad Domain", Strategy::Primary)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Validation(_)));
        assert!(runner.specs.lock().is_empty());
    }
}
