// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// 校验错误类型
#[derive(Error, Debug)]
pub enum ValidationError {
    /// 域名格式无效
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9.-]+\.[a-z]{2,}$").expect("domain regex"));

/// 验证域名
///
/// 域名必须由小写字母、数字、点和连字符组成，且以至少两位字母的
/// 顶级域结尾。校验在任何网络调用之前进行，失败不会重试。
///
/// # 参数
///
/// * `domain` - 域名字符串
///
/// # 返回值
///
/// * `Ok(())` - 域名有效
/// * `Err(ValidationError)` - 域名格式无效
pub fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    if DOMAIN_RE.is_match(domain) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDomain(domain.to_string()))
    }
}
