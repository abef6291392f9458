// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::alert::AlertProvider;
use serde_json::{json, Value};

/// 渲染提供方专属的消息信封
///
/// 钉钉与企业微信共用同一种文本信封，飞书的字段名不同。
pub fn render_payload(provider: AlertProvider, content: &str) -> Value {
    match provider {
        AlertProvider::Dingtalk | AlertProvider::Wechat => json!({
            "msgtype": "text",
            "text": { "content": content },
        }),
        AlertProvider::Feishu => json!({
            "msg_type": "text",
            "content": { "text": content },
        }),
    }
}

/// 判断提供方应答是否表示发送成功
///
/// 钉钉/企业微信以 `errcode == 0` 为准；飞书接受 `code == 0`、
/// `StatusCode == 0` 或 HTTP 200。
pub fn is_success(provider: AlertProvider, http_status: u16, body: Option<&Value>) -> bool {
    match provider {
        AlertProvider::Dingtalk | AlertProvider::Wechat => body
            .and_then(|b| b.get("errcode"))
            .and_then(Value::as_i64)
            == Some(0),
        AlertProvider::Feishu => {
            let code_ok = body.and_then(|b| b.get("code")).and_then(Value::as_i64) == Some(0);
            let status_code_ok =
                body.and_then(|b| b.get("StatusCode")).and_then(Value::as_i64) == Some(0);
            code_ok || status_code_ok || http_status == 200
        }
    }
}
