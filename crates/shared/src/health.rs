//! # ヘルスチェック共通型

use std::fmt::Display;

use serde::Serialize;

/// ヘルスチェックレスポンス
///
/// 稼働状態に加えて、起動時に確定した実行環境と配信経路を返す。
/// API キーを入れ忘れた本番環境は `transport` が `"suppressed"` になるため、
/// メールが届かない原因をここで確認できる。
///
/// ```
/// use fortlar_shared::HealthResponse;
///
/// let response = HealthResponse::healthy("0.1.0", "production", "http_provider");
/// assert_eq!(response.status, "healthy");
/// assert_eq!(response.transport, "http_provider");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// 稼働状態（`"healthy"` または `"unhealthy"`）
    pub status:      String,
    /// アプリケーションバージョン
    pub version:     String,
    /// 実行環境（`"production"` / `"local"`）
    pub environment: String,
    /// 有効な配信経路（`"http_provider"` / `"smtp"` / `"suppressed"`）
    pub transport:   String,
}

impl HealthResponse {
    /// 稼働中のレスポンスを作成する
    pub fn healthy(
        version: impl Into<String>,
        environment: impl Display,
        transport: impl Display,
    ) -> Self {
        Self {
            status:      "healthy".to_string(),
            version:     version.into(),
            environment: environment.to_string(),
            transport:   transport.to_string(),
        }
    }
}
