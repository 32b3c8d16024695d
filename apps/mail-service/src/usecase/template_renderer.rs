//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンでアカウント通知メールと受注確定メールを
//! HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名**: 通知イベントごとに固定（[`AccountNotification::subject`]）
//! - **リンク**: 初回アクセスは `{verification_url}?token=…`、トークン再送は
//!   `{verification_url}?token=…&companyId=…`、再設定は `{password_reset_url}?token=…`
//! - **金額**: 受注メールの金額は Rust 側で小数 2 桁の文字列にしてから渡す

use fortlar_domain::{
    notification::{AccountNotification, EmailMessage, NotificationError},
    order::OrderPlaced,
};
use serde::Serialize;
use tera::{Context, Tera};
use url::Url;

/// メール内リンクのベース URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLinks {
    /// 会社登録の確認ページ（`VERIFICATION_URL`）
    pub verification_url:   Url,
    /// パスワード再設定ページ（`PASSWORD_RESET_URL`）
    pub password_reset_url: Url,
}

impl AccountLinks {
    /// 通知イベントに対応するリンクを組み立てる
    pub fn link_for(&self, notification: &AccountNotification) -> Url {
        match notification {
            AccountNotification::FirstAccess { token, .. } => {
                let mut url = self.verification_url.clone();
                url.query_pairs_mut().append_pair("token", token);
                url
            }
            AccountNotification::VerificationResent {
                company_id, token, ..
            } => {
                let mut url = self.verification_url.clone();
                url.query_pairs_mut()
                    .append_pair("token", token)
                    .append_pair("companyId", &company_id.to_string());
                url
            }
            AccountNotification::PasswordReset { token, .. } => {
                let mut url = self.password_reset_url.clone();
                url.query_pairs_mut().append_pair("token", token);
                url
            }
        }
    }
}

/// 受注メールの明細 1 行（表示用に整形済み）
#[derive(Debug, Serialize)]
struct OrderLine<'a> {
    code:       &'a str,
    name:       &'a str,
    quantity:   u32,
    unit_price: String,
    subtotal:   String,
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、`AccountNotification` から
/// `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine: Tera,
    links:  AccountLinks,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(links: AccountLinks) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "verification.html",
                    include_str!("../../templates/emails/verification.html"),
                ),
                (
                    "verification.txt",
                    include_str!("../../templates/emails/verification.txt"),
                ),
                (
                    "password_reset.html",
                    include_str!("../../templates/emails/password_reset.html"),
                ),
                (
                    "password_reset.txt",
                    include_str!("../../templates/emails/password_reset.txt"),
                ),
                ("order.html", include_str!("../../templates/emails/order.html")),
                ("order.txt", include_str!("../../templates/emails/order.txt")),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine, links })
    }

    /// 通知イベントからメールメッセージを生成する
    pub fn render(
        &self,
        notification: &AccountNotification,
    ) -> Result<EmailMessage, NotificationError> {
        let template_name = match notification {
            AccountNotification::FirstAccess { .. }
            | AccountNotification::VerificationResent { .. } => "verification",
            AccountNotification::PasswordReset { .. } => "password_reset",
        };

        let mut context = Context::new();
        context.insert("token", notification.token());
        context.insert("link", self.links.link_for(notification).as_str());

        let (html_body, text_body) = self.render_pair(template_name, &context)?;

        Ok(EmailMessage::new(
            notification.recipient().clone(),
            notification.subject(),
            html_body,
            text_body,
        ))
    }

    /// 受注確定メールを生成する
    ///
    /// CC は付けない。営業窓口への CC は呼び出し側で設定する。
    pub fn render_order(&self, order: &OrderPlaced) -> Result<EmailMessage, NotificationError> {
        let lines: Vec<OrderLine<'_>> = order
            .items()
            .iter()
            .map(|item| OrderLine {
                code:       &item.code,
                name:       &item.name,
                quantity:   item.quantity,
                unit_price: format_amount(item.unit_price),
                subtotal:   format_amount(item.subtotal),
            })
            .collect();

        let mut context = Context::new();
        context.insert("company_name", order.company_name());
        context.insert("items", &lines);
        context.insert("total", &format_amount(order.total()));
        context.insert("payment_method", order.payment_method().label());

        let (html_body, text_body) = self.render_pair("order", &context)?;

        Ok(EmailMessage::new(
            order.recipient().clone(),
            order.subject(),
            html_body,
            text_body,
        ))
    }

    fn render_pair(
        &self,
        template_name: &str,
        context: &Context,
    ) -> Result<(String, String), NotificationError> {
        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok((html_body, text_body))
    }
}
