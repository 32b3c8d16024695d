//! # ユースケース
//!
//! アカウント通知メールの生成と配信をまとめる。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成
//! - [`account_email`] - テンプレートレンダリング + 配信 + ビジネスイベント記録

pub mod account_email;
pub mod template_renderer;

pub use account_email::AccountEmailService;
pub use template_renderer::{AccountLinks, TemplateRenderer};
