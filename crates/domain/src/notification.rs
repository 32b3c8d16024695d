//! # 通知
//!
//! メール通知に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 備考 |
//! |---|------------|------|
//! | [`EmailMessage`] | 送信するメール | HTML 本文とプレーンテキスト本文を持つ |
//! | [`AccountNotification`] | アカウント通知イベント | 初回アクセス、トークン再送、パスワード再設定 |
//! | [`OrderPlaced`](crate::order::OrderPlaced) | 受注確定 | 営業窓口へ CC する |
//! | [`NotificationError`] | 配信失敗の種別 | すべて呼び出し元には値として返る |
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 通知送信の失敗は会社登録やパスワード再設定を中断しない
//! - **状態の保存が先**: 呼び出し元はトークン等を永続化してから送信する
//! - **テンプレート分離**: 通知イベントとメール生成は分離（TemplateRenderer は mail-service）

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::email::EmailAddress;

/// HTML を表示できないクライアント向けの代替本文
pub const HTML_FALLBACK_TEXT: &str = "Seu cliente de email não suporta HTML.";

/// 配信失敗の種別
///
/// 配信境界ですべて捕捉され、[`DeliveryResult`](crate::dispatch::DeliveryResult)
/// に変換される。呼び出し元まで `Err` として伝播することはない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// 選択した経路に必要な設定が無い
    #[error("メール送信の設定が不足しています: {0}")]
    ConfigurationMissing(String),

    /// 本番環境では SMTP ポートが塞がれているため送信を見送った
    #[error("本番環境では SMTP 送信がブロックされています")]
    TransportBlocked,

    /// 送信先サービスが拒否した（未検証ドメイン、不正な API キー、認証失敗など）
    #[error("送信先サービスがメールを拒否しました: {0}")]
    ProviderRejected(String),

    /// 接続レベルの失敗（名前解決、タイムアウト、TLS など）
    #[error("ネットワークエラー: {0}")]
    NetworkFailure(String),

    /// メッセージを組み立てられなかった（アドレス不正など）
    #[error("メッセージ構築失敗: {0}")]
    InvalidMessage(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

impl NotificationError {
    /// `DeliveryResult.reason` に載せる機械可読なコード
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::TransportBlocked => "smtp_blocked_in_production",
            Self::ProviderRejected(_) => "provider_rejected",
            Self::NetworkFailure(_) => "network_failure",
            Self::InvalidMessage(_) => "invalid_message",
            Self::TemplateFailed(_) => "template_failed",
        }
    }
}

/// メールメッセージ
///
/// 送信元アドレスは持たない。送信元は配信時に
/// [`DispatchDecision`](crate::dispatch::DispatchDecision) が決める。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        EmailAddress,
    /// カーボンコピー
    pub cc:        Vec<EmailAddress>,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

impl EmailMessage {
    /// HTML とプレーンテキストの両方を指定して作成する
    pub fn new(
        to: EmailAddress,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            to,
            cc: Vec::new(),
            subject: subject.into(),
            html_body: html_body.into(),
            text_body: text_body.into(),
        }
    }

    /// HTML 本文だけを指定して作成する
    ///
    /// プレーンテキスト部には [`HTML_FALLBACK_TEXT`] が入る。
    pub fn html(to: EmailAddress, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self::new(to, subject, html_body, HTML_FALLBACK_TEXT)
    }

    /// カーボンコピーを設定する
    pub fn with_cc(mut self, cc: Vec<EmailAddress>) -> Self {
        self.cc = cc;
        self
    }
}

/// 通知イベント種別
///
/// ログの `notification.event_type` フィールドに出力される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEventType {
    /// 会社登録直後の初回アクセス案内
    FirstAccess,
    /// 検証トークンの再送
    VerificationResent,
    /// パスワード再設定
    PasswordReset,
    /// 受注確定
    OrderPlaced,
    /// テンプレートを使わない任意のメール
    Direct,
}

/// アカウント通知イベント
///
/// 各バリアントが会社アカウントのライフサイクルで送るメールに対応する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountNotification {
    /// 初回アクセス: 会社登録時に検証リンクを送る
    FirstAccess {
        recipient: EmailAddress,
        token:     String,
    },
    /// トークン再送: 検証リンクを再発行して送る
    VerificationResent {
        recipient:  EmailAddress,
        company_id: i64,
        token:      String,
    },
    /// パスワード再設定: 再設定リンクを送る
    PasswordReset {
        recipient: EmailAddress,
        token:     String,
    },
}

impl AccountNotification {
    /// 通知イベント種別を返す
    pub fn event_type(&self) -> NotificationEventType {
        match self {
            Self::FirstAccess { .. } => NotificationEventType::FirstAccess,
            Self::VerificationResent { .. } => NotificationEventType::VerificationResent,
            Self::PasswordReset { .. } => NotificationEventType::PasswordReset,
        }
    }

    /// 受信者のメールアドレスを返す
    pub fn recipient(&self) -> &EmailAddress {
        match self {
            Self::FirstAccess { recipient, .. }
            | Self::VerificationResent { recipient, .. }
            | Self::PasswordReset { recipient, .. } => recipient,
        }
    }

    /// 件名を返す
    pub fn subject(&self) -> &'static str {
        match self {
            Self::FirstAccess { .. } => "Primeiro Acesso",
            Self::VerificationResent { .. } => "Reenvio de Token de Validação",
            Self::PasswordReset { .. } => "Redefinição de Senha",
        }
    }

    /// メール本文に載せるトークンを返す
    pub fn token(&self) -> &str {
        match self {
            Self::FirstAccess { token, .. }
            | Self::VerificationResent { token, .. }
            | Self::PasswordReset { token, .. } => token,
        }
    }
}
