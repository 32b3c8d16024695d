//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! 内部 API で共通のエラーレスポンス構造体を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサービス側の責務（shared に axum 依存を入れない）
//!
//! メール配信の失敗はここに含まれない。配信失敗は `200` + `ok: false` で返し、
//! このエラー形式は入力不正にだけ使う。

use serde::{Deserialize, Serialize};

/// error_type URI のベースパス
const ERROR_TYPE_BASE: &str = "https://fortlar.com.br/errors";

/// エラーレスポンス（RFC 9457 Problem Details）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    /// 汎用コンストラクタ
    ///
    /// `error_type_suffix` はベース URI に付加される（例: `"invalid-recipient"`）。
    pub fn new(
        error_type_suffix: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{error_type_suffix}"),
            title: title.into(),
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("bad-request", "Bad Request", 400, detail)
    }

    /// 400 Validation Error
    pub fn validation_error(detail: impl Into<String>) -> Self {
        Self::new("validation-error", "Validation Error", 400, detail)
    }
}
