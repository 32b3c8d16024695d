//! # Fortlar インフラ層
//!
//! 外部のメール配信手段との通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **メール API クライアント**: HTTPS 経由のトランザクションメール API（Resend）
//! - **SMTP クライアント**: ローカル開発用のメールサーバー直接送信
//! - **配信ディスパッチャ**: ドメイン層の判断に従って経路を選び、失敗を値に変換する
//!
//! ## 依存関係
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`notification`] - 送信トレイト、各経路の実装、ディスパッチャ
//! - `mock` - テスト用のモック送信（`test-utils` feature）

pub mod notification;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use notification::{
    DispatcherSettings,
    EmailDispatcher,
    NotificationSender,
    ResendNotificationSender,
    ResendSettings,
    SendReceipt,
    SmtpNotificationSender,
    SmtpSettings,
    SmtpTls,
};
