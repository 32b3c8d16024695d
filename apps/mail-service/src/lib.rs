//! # Mail Service ライブラリ
//!
//! メール配信サービスの設定、ユースケース、ハンドラを公開する。
//! バイナリ（`main.rs`）とテストの両方から利用する。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
