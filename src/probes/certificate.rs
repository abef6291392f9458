// Copyright (c) 2025 renewrs contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::certificate::CertificateResult;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

/// TLS 探测默认超时
pub const TLS_TIMEOUT: Duration = Duration::from_secs(10);

/// 证书探测器
///
/// 对 `domain:443` 发起 TLS 连接（SNI 为该域名），读取对端证书并
/// 计算剩余有效期。目标是检查对端实际出示的证书，而不是校验
/// 信任链，因此证书链校验被禁用。
///
/// 连接错误与超时不会向上抛出：它们被编码为
/// `{status: Error, accessible: false, days_remaining: -1}` 的结果值，
/// 批量扫描不会因为单个不可达主机而中断。
pub struct CertificateProbe {
    timeout: Duration,
    port: u16,
}

impl Default for CertificateProbe {
    fn default() -> Self {
        Self {
            timeout: TLS_TIMEOUT,
            port: 443,
        }
    }
}

impl CertificateProbe {
    /// 创建默认探测器
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖默认超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 覆盖默认端口（测试用）
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 探测一个域名的证书
    ///
    /// 永远解析为结果值而不是错误，失败原因在 `check_error` 中。
    pub async fn check(&self, domain: &str) -> CertificateResult {
        match self.fetch(domain).await {
            Ok(result) => result,
            Err(error) => {
                debug!(domain, %error, "certificate probe failed");
                CertificateResult::unreachable(domain, error.to_string())
            }
        }
    }

    async fn fetch(&self, domain: &str) -> Result<CertificateResult> {
        // 显式选用 ring，避免依赖进程级默认 provider
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("TLS protocol configuration")?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let server_name = rustls_pki_types::ServerName::try_from(domain.to_string())
            .map_err(|_| anyhow!("invalid SNI name: {}", domain))?;

        let address = (domain.to_string(), self.port);
        let tls_stream = timeout(self.timeout, async {
            let stream = TcpStream::connect(address)
                .await
                .context("TCP connect failed")?;
            connector
                .connect(server_name, stream)
                .await
                .context("TLS handshake failed")
        })
        .await
        .map_err(|_| anyhow!("connection timed out after {}s", self.timeout.as_secs()))??;

        let (_, connection) = tls_stream.get_ref();
        let certificate = connection
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or_else(|| anyhow!("no certificate presented by {}", domain))?;

        Self::parse(domain, certificate.as_ref())
    }

    /// 从 DER 字节解析出探测结果
    pub fn parse(domain: &str, der_bytes: &[u8]) -> Result<CertificateResult> {
        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| anyhow!("failed to parse certificate: {:?}", e))?;

        let valid_from = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0);
        let valid_to = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0);

        let now = Utc::now();
        let days_remaining = valid_to
            .map(|to| (to.timestamp() - now.timestamp()).div_euclid(86_400))
            .unwrap_or(-1);

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok());
        let is_wildcard = common_name.is_some_and(|cn| cn.starts_with("*."));

        let mut alternative_names = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    alternative_names.push(dns.to_string());
                }
            }
        }

        Ok(CertificateResult {
            domain: domain.to_string(),
            issuer: Some(cert.issuer().to_string()),
            subject: Some(cert.subject().to_string()),
            valid_from,
            valid_to,
            days_remaining,
            status: CertificateResult::classify(days_remaining),
            accessible: true,
            check_error: None,
            is_wildcard,
            alternative_names,
        })
    }
}

/// 跳过证书链校验的验证器
///
/// 探测目标是读取对端出示的证书本身，链是否可信是另一个
/// 未实现的关注点。
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls_pki_types::CertificateDer<'_>,
        _intermediates: &[rustls_pki_types::CertificateDer<'_>],
        _server_name: &rustls_pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
