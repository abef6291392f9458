// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// 从 WHOIS 文本解析出的结构化字段
#[derive(Debug, Clone, Default)]
pub struct ParsedWhois {
    /// 到期时间
    pub expiry_date: Option<DateTime<Utc>>,
    /// 注册商（尽力而为）
    pub registrar: Option<String>,
    /// 域名服务器（尽力而为）
    pub name_servers: Vec<String>,
}

type Normalizer = fn(&str) -> Option<DateTime<Utc>>;

/// 到期时间模式级联
///
/// 注册局对同一字段使用五花八门的名字和日期格式，按优先级
/// 逐个尝试 (正则, 归一化) 对，第一个解析出日期的模式胜出。
static EXPIRY_PATTERNS: Lazy<Vec<(Regex, Normalizer)>> = Lazy::new(|| {
    vec![
        // Verisign 等 gTLD："Registry Expiry Date: 2025-09-15T04:00:00Z"
        (
            Regex::new(r"(?i)Registry Expiry Date:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // 部分注册商："Expiry Date: 2025-09-15"
        (
            Regex::new(r"(?i)Expiry Date:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // CNNIC："Expiration Time: 2025-09-15 12:30:45"
        (
            Regex::new(r"(?i)Expiration Time:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // 常见变体："Expiration Date: 15-Sep-2025" / ISO
        (
            Regex::new(r"(?i)Expiration Date:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // .ru / .su："paid-till: 2025-09-15T21:00:00Z" 或 "2025.09.15"
        (
            Regex::new(r"(?i)paid-till:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // 个别注册局："Renewal Date: 2025.09.15"
        (
            Regex::new(r"(?i)Renewal Date:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
        // .fi / .cz 等："expires: 15.9.2025" / "expire: 2025-09-15"
        (
            Regex::new(r"(?im)^\s*expires?:\s*(\S.*)").unwrap(),
            normalize_datetime,
        ),
    ]
});

static REGISTRAR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?im)^\s*Sponsoring Registrar:\s*(\S.*?)\s*$").unwrap(),
        Regex::new(r"(?im)^\s*Registrar:\s*(\S.*?)\s*$").unwrap(),
    ]
});

static NAME_SERVER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?im)^\s*Name Server:\s*(\S+)").unwrap(),
        Regex::new(r"(?im)^\s*nserver:\s*(\S+)").unwrap(),
    ]
});

/// 英文月份缩写表，用于 DD-Mon-YYYY 形式
const MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

static DAY_MON_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})-([a-z]{3})-(\d{4})").unwrap());

/// 解析 WHOIS 文本
pub fn parse_whois(text: &str) -> ParsedWhois {
    ParsedWhois {
        expiry_date: extract_expiry(text),
        registrar: extract_registrar(text),
        name_servers: extract_name_servers(text),
    }
}

/// 按级联顺序提取到期时间
pub fn extract_expiry(text: &str) -> Option<DateTime<Utc>> {
    for (pattern, normalize) in EXPIRY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(raw) = captures.get(1) {
                if let Some(date) = normalize(raw.as_str().trim()) {
                    return Some(date);
                }
            }
        }
    }
    None
}

/// 提取注册商，缺失不是错误
pub fn extract_registrar(text: &str) -> Option<String> {
    for pattern in REGISTRAR_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(value) = captures.get(1) {
                let value = value.as_str().trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// 提取全部域名服务器，小写去重
pub fn extract_name_servers(text: &str) -> Vec<String> {
    let mut servers = Vec::new();
    for pattern in NAME_SERVER_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(value) = captures.get(1) {
                let server = value.as_str().trim_end_matches('.').to_lowercase();
                if !server.is_empty() && !servers.contains(&server) {
                    servers.push(server);
                }
            }
        }
    }
    servers
}

/// 归一化各注册局的日期写法
///
/// 依次尝试 ISO8601、`YYYY-MM-DD[ HH:MM:SS]`、点分 `YYYY.MM.DD`、
/// 带月份缩写的 `DD-Mon-YYYY` 与 `DD.MM.YYYY`。
fn normalize_datetime(raw: &str) -> Option<DateTime<Utc>> {
    // ISO 8601 / RFC 3339（"2025-09-15T04:00:00Z"）
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // 去掉尾部时区缩写（"2025-09-15 04:00:00 UTC"）
    let trimmed = raw
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim();

    for format in ["%Y-%m-%d %H:%M:%S", "%Y.%m.%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    // DD-Mon-YYYY（"15-Sep-2025"），按月份缩写表归一化
    if let Some(captures) = DAY_MON_YEAR_RE.captures(trimmed) {
        let day: u32 = captures[1].parse().ok()?;
        let month_name = captures[2].to_lowercase();
        let year: i32 = captures[3].parse().ok()?;
        let month = MONTHS
            .iter()
            .find(|(name, _)| *name == month_name)
            .map(|(_, number)| *number)?;
        return NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
    }

    None
}
