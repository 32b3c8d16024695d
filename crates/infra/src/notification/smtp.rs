//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! ローカル開発環境でのみ使用する（本番環境では SMTP ポートが塞がれている）。

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use fortlar_domain::{
    email::domain_of,
    notification::{EmailMessage, NotificationError},
};
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use uuid::Uuid;

use super::{NotificationSender, SendReceipt};

/// SMTP セッション全体のタイムアウト
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// 暗黙 TLS（SMTPS）で使う慣例ポート
const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP の TLS 方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    /// 接続直後から TLS（SMTPS、通常 465 番）
    Implicit,
    /// 平文で接続して STARTTLS で昇格（通常 587 番）
    StartTls,
    /// TLS なし（Mailpit 等のローカル SMTP 向け）
    None,
}

impl SmtpTls {
    /// ポート番号から既定の TLS 方式を決める
    pub fn for_port(port: u16) -> Self {
        if port == IMPLICIT_TLS_PORT {
            Self::Implicit
        } else {
            Self::StartTls
        }
    }
}

impl FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            "none" => Ok(Self::None),
            other => Err(format!("不明な MAIL_TLS: {other}")),
        }
    }
}

/// SMTP の接続設定
#[derive(Clone)]
pub struct SmtpSettings {
    /// SMTP サーバーのホスト名（`MAIL_SERVER`）
    pub host:     String,
    /// SMTP サーバーのポート番号（`MAIL_PORT`）
    pub port:     u16,
    /// 認証ユーザー名（`MAIL_USERNAME`）
    pub username: Option<String>,
    /// 認証パスワード（`MAIL_PASSWORD`）
    pub password: Option<String>,
    /// TLS 方式
    pub tls:      SmtpTls,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .finish()
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// 接続はまだ行わない。接続と認証は送信のたびに行われる。
    ///
    /// # エラー
    ///
    /// TLS パラメータを構築できない場合は `NotificationError::ConfigurationMissing` を返す。
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let host = settings.host.as_str();
        let builder = match settings.tls {
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
            SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|e| NotificationError::ConfigurationMissing(format!("SMTP TLS 設定失敗: {e}")))?;

        let mut builder = builder.port(settings.port).timeout(Some(SMTP_TIMEOUT));
        if let Some(username) = &settings.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn parse_mailbox(address: &str, role: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::InvalidMessage(format!("{role}アドレス不正: {e}")))
}

/// lettre のエラーを配信失敗に変換する
///
/// サーバーが応答コードで拒否した場合（認証失敗、宛先拒否など）は送信先の拒否、
/// 接続・TLS・タイムアウトはネットワークエラーとして扱う。
fn classify_smtp_error(err: lettre::transport::smtp::Error) -> NotificationError {
    if err.is_permanent() || err.is_transient() {
        NotificationError::ProviderRejected(format!("SMTP サーバーが拒否: {err}"))
    } else {
        NotificationError::NetworkFailure(format!("SMTP 送信失敗: {err}"))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(
        &self,
        from: &str,
        email: &EmailMessage,
    ) -> Result<SendReceipt, NotificationError> {
        let message_id = format!(
            "<{}@{}>",
            Uuid::now_v7(),
            domain_of(from).unwrap_or("localhost")
        );

        let mut builder = Message::builder()
            .from(parse_mailbox(from, "送信元")?)
            .to(parse_mailbox(email.to.as_str(), "宛先")?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()));
        for cc in &email.cc {
            builder = builder.cc(parse_mailbox(cc.as_str(), "CC ")?);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::InvalidMessage(format!("メッセージ構築失敗: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(classify_smtp_error)?;

        Ok(SendReceipt {
            message_id: Some(message_id),
        })
    }
}
