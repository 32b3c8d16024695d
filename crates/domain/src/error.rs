//! # ドメイン層エラー定義
//!
//! 入力値がビジネスルールに違反した場合のエラー型。
//!
//! メール配信そのものの失敗は [`NotificationError`](crate::notification::NotificationError)
//! で表現し、こちらには含めない。
//!
//! ## 使用例
//!
//! ```rust
//! use fortlar_domain::DomainError;
//!
//! fn validate_subject(subject: &str) -> Result<(), DomainError> {
//!     if subject.is_empty() {
//!         return Err(DomainError::Validation("件名は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
