//! # アカウント通知メールサービス
//!
//! テンプレートレンダリング → 配信 → ビジネスイベント記録を統合する。
//! 会社アカウントに届くメール（登録確認、パスワード再設定、受注確定）をすべて扱う。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 配信に失敗してもエラーを返さず、[`DeliveryResult`] で結果を伝える
//! - **ログ記録**: 成功・失敗・見送りのいずれもビジネスイベントとして出力する
//! - **経路の判断はディスパッチャに委ねる**: このサービスは送信元アドレスを渡すだけ
//! - **受注メールの CC**: `MAIL_USERNAME_ORDER` が設定されていれば営業窓口を CC に入れる

use fortlar_domain::{
    dispatch::{DeliveryResult, DispatchDecision, Transport},
    email::EmailAddress,
    notification::{AccountNotification, EmailMessage, NotificationError, NotificationEventType},
    order::OrderPlaced,
};
use fortlar_infra::EmailDispatcher;
use fortlar_shared::{event_log::event, log_business_event};

use super::TemplateRenderer;

/// アカウント通知メールサービス
///
/// `notify()`、`notify_order()`、`send_direct()` は常に [`DeliveryResult`] を返す。
pub struct AccountEmailService {
    dispatcher:        EmailDispatcher,
    template_renderer: TemplateRenderer,
    default_from:      String,
    order_copy:        Option<EmailAddress>,
}

impl AccountEmailService {
    pub fn new(
        dispatcher: EmailDispatcher,
        template_renderer: TemplateRenderer,
        default_from: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            template_renderer,
            default_from: default_from.into(),
            order_copy: None,
        }
    }

    /// 受注メールの CC 先を設定する
    pub fn with_order_copy(mut self, order_copy: Option<EmailAddress>) -> Self {
        self.order_copy = order_copy;
        self
    }

    /// 既定の送信元に対する現在の経路判断を返す（送信はしない）
    pub fn active_route(&self) -> DispatchDecision {
        self.dispatcher.decide(&self.default_from)
    }

    /// アカウント通知を送信する
    ///
    /// テンプレートのレンダリングに失敗した場合も送信は行わず、
    /// 理由 `template_failed` の結果を返す。
    pub async fn notify(&self, notification: AccountNotification) -> DeliveryResult {
        let event_type = notification.event_type();

        match self.template_renderer.render(&notification) {
            Ok(email) => self.deliver(event_type, &email).await,
            Err(e) => self.template_failed(event_type, notification.recipient(), &e),
        }
    }

    /// 受注確定メールを送信する
    ///
    /// CC 先が設定されていれば、宛先と同じメールを CC で届ける。
    pub async fn notify_order(&self, order: OrderPlaced) -> DeliveryResult {
        let event_type = NotificationEventType::OrderPlaced;

        match self.template_renderer.render_order(&order) {
            Ok(email) => {
                let email = email.with_cc(self.order_copy.iter().cloned().collect());
                self.deliver(event_type, &email).await
            }
            Err(e) => self.template_failed(event_type, order.recipient(), &e),
        }
    }

    /// 組み立て済みのメールをそのまま送信する
    pub async fn send_direct(&self, email: EmailMessage) -> DeliveryResult {
        self.deliver(NotificationEventType::Direct, &email).await
    }

    fn template_failed(
        &self,
        event_type: NotificationEventType,
        recipient: &EmailAddress,
        error: &NotificationError,
    ) -> DeliveryResult {
        tracing::error!(
            error = %error,
            event_type = %event_type,
            "通知テンプレートのレンダリングに失敗"
        );
        let result = DeliveryResult::failed(self.active_route().transport, error);
        record_delivery(event_type, recipient, &result);
        result
    }

    async fn deliver(
        &self,
        event_type: NotificationEventType,
        email: &EmailMessage,
    ) -> DeliveryResult {
        let result = self.dispatcher.dispatch(email, &self.default_from).await;
        record_delivery(event_type, &email.to, &result);
        result
    }
}

/// 配信結果をビジネスイベントとして出力する
fn record_delivery(
    event_type: NotificationEventType,
    recipient: &EmailAddress,
    result: &DeliveryResult,
) {
    let event_type: &str = event_type.into();

    if result.ok {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_SENT,
            event.entity_type = event::entity_type::EMAIL,
            event.result = event::result::SUCCESS,
            notification.event_type = event_type,
            notification.recipient = %recipient,
            notification.transport = %result.transport,
            notification.message_id = result.message_id.as_deref().unwrap_or("N/A"),
            "通知メール送信成功"
        );
    } else if result.transport == Transport::Suppressed {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_SUPPRESSED,
            event.entity_type = event::entity_type::EMAIL,
            event.result = event::result::SKIPPED,
            notification.event_type = event_type,
            notification.recipient = %recipient,
            notification.reason = result.reason().unwrap_or("unknown"),
            "通知メール送信見送り"
        );
    } else {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = event::entity_type::EMAIL,
            event.result = event::result::FAILURE,
            notification.event_type = event_type,
            notification.recipient = %recipient,
            notification.transport = %result.transport,
            notification.reason = result.reason().unwrap_or("unknown"),
            "通知メール送信失敗"
        );
    }
}
