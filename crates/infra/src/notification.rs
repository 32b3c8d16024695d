//! # 通知送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **2 つの実装**: Resend（HTTP メール API、本番用）、SMTP（ローカル開発用）
//! - **起動時の構成**: 経路の切り替えはグローバル状態ではなく、
//!   [`EmailDispatcher`] が保持する不変の設定で行う
//! - **失敗の値化**: 送信実装は `Err` を返すが、[`EmailDispatcher`] がすべて
//!   `DeliveryResult` に変換し、呼び出し元にはエラーを伝播させない

mod dispatcher;
mod resend;
mod smtp;

use async_trait::async_trait;
pub use dispatcher::{DispatcherSettings, EmailDispatcher};
use fortlar_domain::notification::{EmailMessage, NotificationError};
pub use resend::{DEFAULT_RESEND_API_URL, ResendNotificationSender, ResendSettings};
pub use smtp::{SmtpNotificationSender, SmtpSettings, SmtpTls};

/// 送信成功時の受領情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// 送信先サービスが払い出した（または付与した）メッセージ ID
    pub message_id: Option<String>,
}

/// メール送信トレイト
///
/// 経路ごとの送信方法を抽象化する。送信元アドレスは経路の判断結果として
/// 呼び出しごとに渡される。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(
        &self,
        from: &str,
        email: &EmailMessage,
    ) -> Result<SendReceipt, NotificationError>;
}
