//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、配信の判断はディスパッチャに委譲

pub mod email;
pub mod health;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
pub use email::{
    EmailState,
    send_email,
    send_first_access_email,
    send_order_email,
    send_password_reset_email,
    send_verification_email,
};
pub use health::health_check;

/// 全エンドポイントを登録したルーターを構築する
pub fn router(state: Arc<EmailState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/emails", post(send_email))
        .route("/internal/emails/first-access", post(send_first_access_email))
        .route("/internal/emails/verification", post(send_verification_email))
        .route(
            "/internal/emails/password-reset",
            post(send_password_reset_email),
        )
        .route("/internal/emails/order", post(send_order_email))
        .with_state(state)
}
