//! # Mail Service エラー定義
//!
//! HTTP レスポンスへの変換を伴うエラーを定義する。
//!
//! 配信失敗はここに含まれない。配信結果は常に `200` + `DeliveryResult` で返し、
//! このエラーは入力不正にだけ使う。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fortlar_domain::DomainError;
use fortlar_shared::ErrorResponse;
use thiserror::Error;

/// Mail Service で発生するエラー
#[derive(Debug, Error)]
pub enum MailServiceError {
    /// 入力値の検証エラー（宛先アドレス不正など）
    #[error("入力値が不正です: {0}")]
    Validation(#[from] DomainError),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
}

impl IntoResponse for MailServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            MailServiceError::Validation(DomainError::Validation(msg)) => {
                ErrorResponse::validation_error(msg.clone())
            }
            MailServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
        };

        let status = StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
