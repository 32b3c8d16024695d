//! メール配信ディスパッチャ
//!
//! ドメイン層の [`DispatchPolicy`] に従って経路と送信元を決め、対応する
//! [`NotificationSender`] に送信を委ねる。
//!
//! どの経路で何が起きても [`DeliveryResult`] を返し、エラーを送出しない。
//! 呼び出し元（会社登録、パスワード再設定など）は自分の状態を保存してから
//! 送信し、`ok == false` を警告として扱う。

use std::sync::Arc;

use fortlar_domain::{
    dispatch::{DeliveryResult, DeploymentEnvironment, DispatchDecision, DispatchPolicy, Transport},
    email::EmailAddress,
    notification::{EmailMessage, NotificationError},
};

use super::{
    NotificationSender,
    ResendNotificationSender,
    ResendSettings,
    SmtpNotificationSender,
    SmtpSettings,
};

/// ディスパッチャの構成
///
/// 起動時に環境変数から組み立てる。
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// 実行環境
    pub environment: DeploymentEnvironment,
    /// メール API の設定（API キーが無ければ `None`）
    pub resend:      Option<ResendSettings>,
    /// SMTP の設定（`MAIL_SERVER` が無ければ `None`）
    pub smtp:        Option<SmtpSettings>,
}

/// メール配信ディスパッチャ
///
/// 経路の判断に使う設定は構築時に確定し、以後変わらない。
pub struct EmailDispatcher {
    policy:        DispatchPolicy,
    http_provider: Option<Arc<dyn NotificationSender>>,
    smtp:          Option<Arc<dyn NotificationSender>>,
}

impl EmailDispatcher {
    /// 送信実装を直接指定して作成する
    ///
    /// `http_provider` が `Some` であることが「API キーあり」を意味する。
    pub fn new(
        environment: DeploymentEnvironment,
        http_provider: Option<Arc<dyn NotificationSender>>,
        smtp: Option<Arc<dyn NotificationSender>>,
    ) -> Self {
        Self {
            policy: DispatchPolicy::new(environment, http_provider.is_some()),
            http_provider,
            smtp,
        }
    }

    /// 設定から送信実装を組み立てて作成する
    ///
    /// メール API クライアントを初期化できなかった場合は、API キーが無い場合と
    /// 同じ扱いになる（本番なら送信見送り、ローカルなら SMTP）。
    /// 本番環境では SMTP を使わないため、SMTP 送信は組み立てない。
    pub fn from_settings(settings: DispatcherSettings) -> Self {
        let http_provider = settings
            .resend
            .filter(|resend| !resend.api_key.trim().is_empty())
            .and_then(|resend| match ResendNotificationSender::new(resend) {
                Ok(sender) => Some(Arc::new(sender) as Arc<dyn NotificationSender>),
                Err(e) => {
                    tracing::error!(error = %e, "Resend クライアントの初期化に失敗");
                    None
                }
            });

        let smtp = match settings.environment {
            DeploymentEnvironment::Production => None,
            DeploymentEnvironment::Local => {
                settings
                    .smtp
                    .and_then(|smtp| match SmtpNotificationSender::new(&smtp) {
                        Ok(sender) => Some(Arc::new(sender) as Arc<dyn NotificationSender>),
                        Err(e) => {
                            tracing::error!(error = %e, "SMTP 送信の初期化に失敗");
                            None
                        }
                    })
            }
        };

        let dispatcher = Self::new(settings.environment, http_provider, smtp);

        match (dispatcher.policy.http_provider_available(), settings.environment) {
            (true, _) => tracing::info!("メール配信: Resend (HTTP) を使用"),
            (false, DeploymentEnvironment::Production) => tracing::warn!(
                "メール配信: RESEND_API_KEY が未設定のため本番環境ではメールを送信しません"
            ),
            (false, DeploymentEnvironment::Local) => {
                tracing::warn!("メール配信: SMTP を使用（ローカル開発用）");
            }
        }

        dispatcher
    }

    /// 経路の判断設定を返す
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// 送信元に対する判断結果を返す（送信はしない）
    pub fn decide(&self, configured_from: &str) -> DispatchDecision {
        self.policy.decide(configured_from)
    }

    /// HTML 本文のメールを 1 通送る
    ///
    /// プレーンテキスト部には代替本文が入る。
    pub async fn send(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        body: &str,
        configured_from: &str,
    ) -> DeliveryResult {
        let email = EmailMessage::html(recipient.clone(), subject, body);
        self.dispatch(&email, configured_from).await
    }

    /// 組み立て済みのメールを 1 通送る
    pub async fn dispatch(&self, email: &EmailMessage, configured_from: &str) -> DeliveryResult {
        let decision = self.policy.decide(configured_from);

        match decision.transport {
            Transport::Suppressed => {
                tracing::warn!(
                    transport = %decision.transport,
                    recipient = %email.to,
                    subject = %email.subject,
                    "本番環境では SMTP がブロックされるため送信を見送りました。RESEND_API_KEY を設定してください"
                );
                DeliveryResult::suppressed()
            }
            Transport::HttpProvider => {
                self.deliver(self.http_provider.as_deref(), &decision, email)
                    .await
            }
            Transport::Smtp => self.deliver(self.smtp.as_deref(), &decision, email).await,
        }
    }

    async fn deliver(
        &self,
        sender: Option<&dyn NotificationSender>,
        decision: &DispatchDecision,
        email: &EmailMessage,
    ) -> DeliveryResult {
        let Some(sender) = sender else {
            let error = NotificationError::ConfigurationMissing(format!(
                "{} の送信設定がありません",
                decision.transport
            ));
            tracing::warn!(
                transport = %decision.transport,
                recipient = %email.to,
                reason = error.reason_code(),
                error = %error,
                "メールを送信できませんでした"
            );
            return DeliveryResult::failed(decision.transport, &error);
        };

        match sender.send_email(&decision.sender_address, email).await {
            Ok(receipt) => {
                tracing::info!(
                    transport = %decision.transport,
                    recipient = %email.to,
                    cc = email.cc.len(),
                    message_id = receipt.message_id.as_deref().unwrap_or("N/A"),
                    "メールを送信しました"
                );
                DeliveryResult::delivered(decision.transport, receipt.message_id)
            }
            Err(error) => {
                tracing::warn!(
                    transport = %decision.transport,
                    sender = %decision.sender_address,
                    recipient = %email.to,
                    reason = error.reason_code(),
                    error = %error,
                    "メール送信に失敗しました"
                );
                DeliveryResult::failed(decision.transport, &error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use fortlar_domain::dispatch::PROVIDER_TEST_SENDER;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::mock::MockNotificationSender;

    fn recipient() -> EmailAddress {
        EmailAddress::new("cliente@example.com").unwrap()
    }

    fn dispatcher(
        environment: DeploymentEnvironment,
        http: Option<&MockNotificationSender>,
        smtp: Option<&MockNotificationSender>,
    ) -> EmailDispatcher {
        EmailDispatcher::new(
            environment,
            http.map(|m| Arc::new(m.clone()) as Arc<dyn NotificationSender>),
            smtp.map(|m| Arc::new(m.clone()) as Arc<dyn NotificationSender>),
        )
    }

    #[rstest]
    #[case(DeploymentEnvironment::Production)]
    #[case(DeploymentEnvironment::Local)]
    #[tokio::test]
    async fn apiキーがあれば環境によらずhttp経路で送る(
        #[case] environment: DeploymentEnvironment,
    ) {
        let http = MockNotificationSender::new();
        let smtp = MockNotificationSender::new();
        let sut = dispatcher(environment, Some(&http), Some(&smtp));

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert!(result.ok);
        assert_eq!(result.transport, Transport::HttpProvider);
        assert!(result.message_id.is_some());
        assert_eq!(http.call_count(), 1);
        assert_eq!(smtp.call_count(), 0);
    }

    #[tokio::test]
    async fn http経路ではフリーメールの送信元をテスト用送信元に置き換える() {
        let http = MockNotificationSender::new();
        let sut = dispatcher(DeploymentEnvironment::Production, Some(&http), None);

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "noreply@gmail.com")
            .await;

        assert!(result.ok);
        let sent = http.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, PROVIDER_TEST_SENDER);
        assert_eq!(sent[0].email.to, recipient());
    }

    #[tokio::test]
    async fn apiキーなしの本番は送信せずに見送る() {
        let smtp = MockNotificationSender::new();
        let sut = dispatcher(DeploymentEnvironment::Production, None, Some(&smtp));

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert_eq!(result, DeliveryResult::suppressed());
        assert_eq!(result.reason(), Some("smtp_blocked_in_production"));
        assert_eq!(smtp.call_count(), 0);
    }

    #[tokio::test]
    async fn apiキーなしのローカルはsmtpで送る() {
        let smtp = MockNotificationSender::new();
        let sut = dispatcher(DeploymentEnvironment::Local, None, Some(&smtp));

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "sitefortlar@gmail.com")
            .await;

        assert!(result.ok);
        assert_eq!(result.transport, Transport::Smtp);
        let sent = smtp.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "sitefortlar@gmail.com");
    }

    #[tokio::test]
    async fn smtp設定が無いローカルはconfiguration_missing() {
        let sut = dispatcher(DeploymentEnvironment::Local, None, None);

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert!(!result.ok);
        assert_eq!(result.transport, Transport::Smtp);
        assert_eq!(result.reason(), Some("configuration_missing"));
    }

    #[rstest]
    #[case(NotificationError::ProviderRejected("403 validation_error: domain is not verified".into()), "provider_rejected")]
    #[case(NotificationError::NetworkFailure("connection refused".into()), "network_failure")]
    #[case(NotificationError::InvalidMessage("from".into()), "invalid_message")]
    #[tokio::test]
    async fn http経路の失敗は値として返る(
        #[case] error: NotificationError,
        #[case] expected_reason: &str,
    ) {
        let http = MockNotificationSender::failing(error);
        let sut = dispatcher(DeploymentEnvironment::Production, Some(&http), None);

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert!(!result.ok);
        assert_eq!(result.transport, Transport::HttpProvider);
        assert_eq!(result.reason(), Some(expected_reason));
        assert_eq!(http.call_count(), 1);
    }

    #[tokio::test]
    async fn http経路の拒否後にテスト用送信元で再送しない() {
        let http = MockNotificationSender::failing(NotificationError::ProviderRejected(
            "domain is not verified".into(),
        ));
        let sut = dispatcher(DeploymentEnvironment::Local, Some(&http), None);

        sut.send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert_eq!(http.call_count(), 1);
    }

    #[tokio::test]
    async fn smtp経路の失敗は値として返る() {
        let smtp = MockNotificationSender::failing(NotificationError::ProviderRejected(
            "535 authentication failed".into(),
        ));
        let sut = dispatcher(DeploymentEnvironment::Local, None, Some(&smtp));

        let result = sut
            .send(&recipient(), "Pedido", "<p>Olá</p>", "vendas@fortlar.com.br")
            .await;

        assert!(!result.ok);
        assert_eq!(result.transport, Transport::Smtp);
        assert_eq!(result.reason(), Some("provider_rejected"));
    }

    #[tokio::test]
    async fn ccとテキスト本文がそのまま送信実装に渡る() {
        let http = MockNotificationSender::new();
        let sut = dispatcher(DeploymentEnvironment::Production, Some(&http), None);
        let email = EmailMessage::new(recipient(), "Pedido", "<p>Olá</p>", "Olá")
            .with_cc(vec![EmailAddress::new("vendas@fortlar.com.br").unwrap()]);

        sut.dispatch(&email, "vendas@fortlar.com.br").await;

        let sent = http.sent_emails();
        assert_eq!(sent[0].email, email);
    }

    #[test]
    fn 空のapiキーはキーなしと同じ扱い() {
        let sut = EmailDispatcher::from_settings(DispatcherSettings {
            environment: DeploymentEnvironment::Production,
            resend:      Some(ResendSettings::new("")),
            smtp:        None,
        });

        assert!(!sut.policy().http_provider_available());
        assert_eq!(sut.decide("vendas@fortlar.com.br").transport, Transport::Suppressed);
    }

    #[test]
    fn apiキーがあればhttp経路が有効になる() {
        let sut = EmailDispatcher::from_settings(DispatcherSettings {
            environment: DeploymentEnvironment::Local,
            resend:      Some(ResendSettings::new("re_123")),
            smtp:        None,
        });

        assert!(sut.policy().http_provider_available());
        assert_eq!(sut.decide("noreply@gmail.com").sender_address, PROVIDER_TEST_SENDER);
    }
}
