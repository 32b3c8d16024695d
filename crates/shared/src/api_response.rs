//! # API レスポンスエンベロープ
//!
//! 内部 API の成功レスポンスは `{ "data": T }` 形式に統一する。
//! メール配信 API では配信に失敗した場合も `200` でこの形式を返し、
//! `T` に入る配信結果の `ok` で成否を伝える。

use serde::{Deserialize, Serialize};

/// 内部 API の統一レスポンス型
///
/// ```
/// use fortlar_shared::ApiResponse;
///
/// let response = ApiResponse::new(true);
/// assert!(response.data);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
