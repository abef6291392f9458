// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::probes::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// 子进程调用描述
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// 可执行程序
    pub program: String,
    /// 参数列表
    pub args: Vec<String>,
    /// 附加环境变量
    pub envs: Vec<(String, String)>,
    /// 硬超时
    pub timeout: Duration,
    /// stdout 截断上限（字节）
    pub max_output: usize,
}

/// 子进程输出
///
/// 非零退出不是 Err：注册局经常在输出完整应答后才异常关闭套接字，
/// 调用方需要在退出码异常时仍尝试解析 stdout。
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// 进程是否正常退出（退出码 0）
    pub exit_ok: bool,
    /// 退出码，被信号终止时为 None
    pub exit_code: Option<i32>,
    /// 标准输出（按 max_output 截断）
    pub stdout: String,
    /// 标准错误
    pub stderr: String,
}

/// 子进程执行端口
///
/// 抽象出主/备两种调用方式，测试中注入 mock 实现而不是
/// 真正拉起进程。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行命令并收集输出
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError>;
}

/// 直接执行的运行器（主策略）
#[derive(Debug, Default)]
pub struct SystemRunner;

/// 经由 shell 执行的运行器（备用策略）
///
/// 个别环境下直接 exec 会因继承的文件描述符或信号处理出现
/// 偶发失败，经 `sh -c` 间接调用可以绕开。
#[derive(Debug, Default)]
pub struct ShellRunner;

async fn run_command(mut command: Command, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
    command.kill_on_drop(true);
    for (key, value) in &spec.envs {
        command.env(key, value);
    }

    let output = match timeout(spec.timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProbeError::ClientMissing(spec.program.clone()));
        }
        Ok(Err(e)) => return Err(ProbeError::Subprocess(e.to_string())),
        Err(_) => {
            return Err(ProbeError::Timeout(format!(
                "{} {} ({}s)",
                spec.program,
                spec.args.join(" "),
                spec.timeout.as_secs()
            )));
        }
    };

    let mut stdout_bytes = output.stdout;
    stdout_bytes.truncate(spec.max_output);
    Ok(CommandOutput {
        exit_ok: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        run_command(command, spec).await
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        // 参数在进入此处之前已通过域名校验，不含 shell 元字符
        let command_line = std::iter::once(spec.program.as_str())
            .chain(spec.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        run_command(command, spec).await
    }
}
