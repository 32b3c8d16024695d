//! Resend 通知送信実装
//!
//! Resend の HTTP API（`POST /emails`）でメールを送信する。
//! SMTP ポートが塞がれた本番環境で使用する。

use std::time::Duration;

use async_trait::async_trait;
use fortlar_domain::notification::{EmailMessage, NotificationError};
use serde::{Deserialize, Serialize};

use super::{NotificationSender, SendReceipt};

/// Resend API のデフォルトのベース URL
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// リクエスト全体のタイムアウト
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resend の接続設定
#[derive(Clone)]
pub struct ResendSettings {
    /// API キー（`RESEND_API_KEY`）
    pub api_key:  String,
    /// API のベース URL
    pub base_url: String,
}

impl ResendSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key:  api_key.into(),
            base_url: DEFAULT_RESEND_API_URL.to_string(),
        }
    }

    /// ベース URL を差し替える
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl std::fmt::Debug for ResendSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// 送信リクエスト
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from:    &'a str,
    to:      Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc:      Vec<&'a str>,
    subject: &'a str,
    html:    &'a str,
    text:    &'a str,
}

/// 送信成功レスポンス
#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// エラーレスポンス
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    name:    Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Resend 通知送信
///
/// `reqwest::Client` をラップする。
pub struct ResendNotificationSender {
    client:   reqwest::Client,
    base_url: String,
    api_key:  String,
}

impl ResendNotificationSender {
    /// 新しい Resend 送信インスタンスを作成
    ///
    /// # エラー
    ///
    /// API キーが空、または HTTP クライアントを構築できない場合は
    /// `NotificationError::ConfigurationMissing` を返す。
    pub fn new(settings: ResendSettings) -> Result<Self, NotificationError> {
        if settings.api_key.trim().is_empty() {
            return Err(NotificationError::ConfigurationMissing(
                "RESEND_API_KEY が空です".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                NotificationError::ConfigurationMissing(format!(
                    "HTTP クライアントの初期化に失敗: {e}"
                ))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.trim().to_string(),
        })
    }
}

/// reqwest のエラーを配信失敗に変換する
///
/// リクエストが送信先に届かなかった場合はネットワークエラー、
/// それ以外（レスポンスの解釈失敗など）は送信先の拒否として扱う。
fn classify_request_error(err: reqwest::Error) -> NotificationError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        NotificationError::NetworkFailure(format!("Resend への接続に失敗: {err}"))
    } else {
        NotificationError::ProviderRejected(format!("Resend のレスポンスが不正: {err}"))
    }
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send_email(
        &self,
        from: &str,
        email: &EmailMessage,
    ) -> Result<SendReceipt, NotificationError> {
        let url = format!("{}/emails", self.base_url);
        let request = SendEmailRequest {
            from,
            to: vec![email.to.as_str()],
            cc: email.cc.iter().map(|cc| cc.as_str()).collect(),
            subject: &email.subject,
            html: &email.html_body,
            text: &email.text_body,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<SendEmailResponse>()
                .await
                .map_err(classify_request_error)?;
            return Ok(SendReceipt {
                message_id: Some(body.id),
            });
        }

        let raw = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = body.message.unwrap_or(raw);
        let detail = match body.name {
            Some(name) => format!("{status} {name}: {message}"),
            None => format!("{status}: {message}"),
        };

        Err(NotificationError::ProviderRejected(detail))
    }
}
