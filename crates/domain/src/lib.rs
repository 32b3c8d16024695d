//! # Fortlar ドメイン層
//!
//! メール配信の判断ロジックと、それを支える値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **純粋関数**: 送信経路の判断（[`dispatch::DispatchPolicy::decide`]）は
//!   設定と環境だけから決まり、I/O を一切行わない
//! - **値オブジェクト**: 生成時に検証し、不正な値の存在を型レベルで排除
//! - **失敗の値化**: 配信失敗は [`dispatch::DeliveryResult`] として呼び出し元に返す
//!
//! ## 依存関係の方向
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（HTTP クライアント、SMTP）に一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`email`] - メールアドレス値オブジェクト
//! - [`notification`] - メールメッセージと通知イベント
//! - [`dispatch`] - 送信経路の判断と配信結果
//! - [`order`] - 受注確定メールの内容

pub mod dispatch;
pub mod email;
pub mod error;
pub mod notification;
pub mod order;

pub use error::DomainError;
