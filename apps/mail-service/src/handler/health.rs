//! # ヘルスチェックハンドラ
//!
//! ```text
//! GET /health
//! ```
//!
//! ## レスポンス例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "environment": "production",
//!   "transport": "http_provider"
//! }
//! ```

use std::sync::Arc;

use axum::{Json, extract::State};
use fortlar_shared::HealthResponse;

use super::EmailState;

/// ヘルスチェックエンドポイント
///
/// 起動時に確定した実行環境と配信経路もあわせて返す。
pub async fn health_check(State(state): State<Arc<EmailState>>) -> Json<HealthResponse> {
    let route = state.service.active_route();

    Json(HealthResponse::healthy(
        env!("CARGO_PKG_VERSION"),
        route.environment,
        route.transport,
    ))
}
