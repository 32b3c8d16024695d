//! # メール送信ハンドラ
//!
//! 他サービス（会社登録、パスワード再設定、受注）から呼ばれる内部 API。
//!
//! ## エンドポイント
//!
//! - `POST /internal/emails` - 任意のメールを送信
//! - `POST /internal/emails/first-access` - 会社登録時の検証メール
//! - `POST /internal/emails/verification` - 検証トークンの再送
//! - `POST /internal/emails/password-reset` - パスワード再設定メール
//! - `POST /internal/emails/order` - 受注確定メール（営業窓口へ CC）
//!
//! 配信に失敗しても `200` で `{ "data": DeliveryResult }` を返す。
//! `400` になるのは宛先アドレスなどの入力が不正な場合だけ。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use fortlar_domain::{
    email::EmailAddress,
    notification::{AccountNotification, EmailMessage, HTML_FALLBACK_TEXT},
    order::{OrderItem, OrderPlaced, PaymentMethod},
};
use fortlar_shared::ApiResponse;
use serde::Deserialize;

use crate::{error::MailServiceError, usecase::AccountEmailService};

/// メール API の共有状態
pub struct EmailState {
    pub service: AccountEmailService,
}

// --- リクエスト型 ---

/// 任意メール送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to:      String,
    #[serde(default)]
    pub cc:      Vec<String>,
    pub subject: String,
    pub html:    String,
    pub text:    Option<String>,
}

/// トークン再送メール送信リクエスト
#[derive(Debug, Deserialize)]
pub struct VerificationEmailRequest {
    pub to:         String,
    pub company_id: i64,
    pub token:      String,
}

/// トークンだけを載せるメールの送信リクエスト（初回アクセス・パスワード再設定）
#[derive(Debug, Deserialize)]
pub struct TokenEmailRequest {
    pub to:    String,
    pub token: String,
}

/// 受注明細リクエスト
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub code:       String,
    pub name:       String,
    pub quantity:   u32,
    pub unit_price: f64,
    pub subtotal:   f64,
}

/// 受注確定メール送信リクエスト
#[derive(Debug, Deserialize)]
pub struct OrderEmailRequest {
    pub to:             String,
    pub company_name:   String,
    pub items:          Vec<OrderItemRequest>,
    pub payment_method: PaymentMethod,
}

fn require_token(token: String) -> Result<String, MailServiceError> {
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(MailServiceError::BadRequest("token は必須です".to_string()));
    }
    Ok(token)
}

// --- ハンドラ ---

/// POST /internal/emails
///
/// 呼び出し元が組み立てたメールを送信する。`text` を省略した場合は
/// 代替本文が入る。
#[tracing::instrument(skip_all)]
pub async fn send_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, MailServiceError> {
    let to = EmailAddress::new(req.to)?;
    let cc = req
        .cc
        .into_iter()
        .map(EmailAddress::new)
        .collect::<Result<Vec<_>, _>>()?;
    let text = req.text.unwrap_or_else(|| HTML_FALLBACK_TEXT.to_string());
    let email = EmailMessage::new(to, req.subject, req.html, text).with_cc(cc);

    let result = state.service.send_direct(email).await;

    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// POST /internal/emails/first-access
///
/// 会社登録直後の検証メールを送信する。
#[tracing::instrument(skip_all)]
pub async fn send_first_access_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<TokenEmailRequest>,
) -> Result<impl IntoResponse, MailServiceError> {
    let notification = AccountNotification::FirstAccess {
        recipient: EmailAddress::new(req.to)?,
        token:     require_token(req.token)?,
    };

    let result = state.service.notify(notification).await;

    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// POST /internal/emails/verification
///
/// 検証トークンを再発行したときのメールを送信する。
#[tracing::instrument(skip_all)]
pub async fn send_verification_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<VerificationEmailRequest>,
) -> Result<impl IntoResponse, MailServiceError> {
    let notification = AccountNotification::VerificationResent {
        recipient:  EmailAddress::new(req.to)?,
        company_id: req.company_id,
        token:      require_token(req.token)?,
    };

    let result = state.service.notify(notification).await;

    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// POST /internal/emails/password-reset
#[tracing::instrument(skip_all)]
pub async fn send_password_reset_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<TokenEmailRequest>,
) -> Result<impl IntoResponse, MailServiceError> {
    let notification = AccountNotification::PasswordReset {
        recipient: EmailAddress::new(req.to)?,
        token:     require_token(req.token)?,
    };

    let result = state.service.notify(notification).await;

    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// POST /internal/emails/order
///
/// 受注確定メールを送信する。CC 先は設定から決まり、リクエストでは指定しない。
#[tracing::instrument(skip_all)]
pub async fn send_order_email(
    State(state): State<Arc<EmailState>>,
    Json(req): Json<OrderEmailRequest>,
) -> Result<impl IntoResponse, MailServiceError> {
    let items = req
        .items
        .into_iter()
        .map(|item| {
            OrderItem::new(
                item.code,
                item.name,
                item.quantity,
                item.unit_price,
                item.subtotal,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    let order = OrderPlaced::new(
        EmailAddress::new(req.to)?,
        req.company_name,
        items,
        req.payment_method,
    )?;

    let result = state.service.notify_order(order).await;

    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request},
    };
    use fortlar_domain::{
        dispatch::{DeploymentEnvironment, PROVIDER_TEST_SENDER},
        notification::NotificationError,
    };
    use fortlar_infra::{EmailDispatcher, NotificationSender, mock::MockNotificationSender};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::{
        handler::router,
        usecase::{AccountLinks, TemplateRenderer},
    };

    // --- ヘルパー ---

    fn create_test_app(
        environment: DeploymentEnvironment,
        http_provider: Option<MockNotificationSender>,
        default_from: &str,
    ) -> Router {
        create_test_app_with_order_copy(environment, http_provider, default_from, None)
    }

    fn create_test_app_with_order_copy(
        environment: DeploymentEnvironment,
        http_provider: Option<MockNotificationSender>,
        default_from: &str,
        order_copy: Option<&str>,
    ) -> Router {
        let dispatcher = EmailDispatcher::new(
            environment,
            http_provider.map(|s| Arc::new(s) as Arc<dyn NotificationSender>),
            None,
        );
        let renderer = TemplateRenderer::new(AccountLinks {
            verification_url:   Url::parse("https://vendas.fortlar.com.br/confirmar-cadastro")
                .unwrap(),
            password_reset_url: Url::parse("https://vendas.fortlar.com.br/reset-password")
                .unwrap(),
        })
        .unwrap();
        let service = AccountEmailService::new(dispatcher, renderer, default_from)
            .with_order_copy(order_copy.map(|value| EmailAddress::new(value).unwrap()));

        router(Arc::new(EmailState { service }))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn response_body(response: axum::http::Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // --- テストケース ---

    #[tokio::test]
    async fn test_post_初回アクセスメールを送信すると200と配信結果が返る() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/first-access",
                json!({ "to": "compras@cliente.com.br", "token": "a1b2c3" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(
            body,
            json!({ "data": { "ok": true, "transport": "http_provider", "message_id": "mock-1" } })
        );
        assert_eq!(provider.sent_emails()[0].email.subject, "Primeiro Acesso");
    }

    #[tokio::test]
    async fn test_post_本番でapiキーが無ければ200でok_falseが返る() {
        // Given
        let sut = create_test_app(DeploymentEnvironment::Production, None, "vendas@fortlar.com.br");

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/password-reset",
                json!({ "to": "compras@cliente.com.br", "token": "reset-77" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["data"]["ok"], false);
        assert_eq!(body["data"]["transport"], "suppressed");
        assert_eq!(body["data"]["reason"], "smtp_blocked_in_production");
    }

    #[tokio::test]
    async fn test_post_送信先が拒否しても200でok_falseが返る() {
        // Given
        let provider = MockNotificationSender::failing(NotificationError::ProviderRejected(
            "403 validation_error: domain is not verified".to_string(),
        ));
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/verification",
                json!({ "to": "compras@cliente.com.br", "company_id": 7, "token": "zz9" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["data"]["ok"], false);
        assert_eq!(body["data"]["reason"], "provider_rejected");
    }

    #[tokio::test]
    async fn test_post_任意メールはccとテスト用送信元で送られる() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Local,
            Some(provider.clone()),
            "noreply@gmail.com",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails",
                json!({
                    "to": "compras@cliente.com.br",
                    "cc": ["vendas@fortlar.com.br"],
                    "subject": "Novo Pedido",
                    "html": "<p>Pedido</p>"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let sent = provider.sent_emails();
        assert_eq!(sent[0].from, PROVIDER_TEST_SENDER);
        assert_eq!(sent[0].email.cc[0].as_str(), "vendas@fortlar.com.br");
        assert_eq!(sent[0].email.text_body, HTML_FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn test_post_宛先アドレスが不正なら400が返る() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/password-reset",
                json!({ "to": "sem-arroba", "token": "reset-77" }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body["type"], "https://fortlar.com.br/errors/validation-error");
        assert_eq!(body["status"], 400);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_post_ccのアドレスが不正なら400が返る() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails",
                json!({
                    "to": "compras@cliente.com.br",
                    "cc": ["invalido"],
                    "subject": "Novo Pedido",
                    "html": "<p>Pedido</p>"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_post_トークンが空なら400が返る() {
        // Given
        let sut = create_test_app(DeploymentEnvironment::Local, None, "vendas@fortlar.com.br");

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/first-access",
                json!({ "to": "compras@cliente.com.br", "token": "  " }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body["type"], "https://fortlar.com.br/errors/bad-request");
    }

    #[tokio::test]
    async fn test_post_受注メールを送信すると営業窓口がccに入る() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app_with_order_copy(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
            Some("vendas@fortlar.com.br"),
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/order",
                json!({
                    "to": "compras@cliente.com.br",
                    "company_name": "Loja Central",
                    "items": [
                        { "code": "TOR-01", "name": "Torneira Cromada", "quantity": 2, "unit_price": 37.5, "subtotal": 75.0 },
                        { "code": "REG-02", "name": "Registro de Gaveta", "quantity": 3, "unit_price": 25.0, "subtotal": 75.0 }
                    ],
                    "payment_method": "avista"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["data"]["ok"], true);
        let sent = provider.sent_emails();
        assert_eq!(
            sent[0].email.subject,
            "Novo Order - Loja Central - Total: R$ 150.00"
        );
        assert_eq!(sent[0].email.cc[0].as_str(), "vendas@fortlar.com.br");
        assert!(sent[0].email.html_body.contains("À Vista"));
    }

    #[tokio::test]
    async fn test_post_受注明細が空なら400が返る() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/order",
                json!({
                    "to": "compras@cliente.com.br",
                    "company_name": "Loja Central",
                    "items": [],
                    "payment_method": "30_dias"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body["type"], "https://fortlar.com.br/errors/validation-error");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_post_不明な支払方法は受け付けない() {
        // Given
        let provider = MockNotificationSender::new();
        let sut = create_test_app(
            DeploymentEnvironment::Production,
            Some(provider.clone()),
            "vendas@fortlar.com.br",
        );

        // When
        let response = sut
            .oneshot(post_json(
                "/internal/emails/order",
                json!({
                    "to": "compras@cliente.com.br",
                    "company_name": "Loja Central",
                    "items": [{ "code": "TOR-01", "name": "Torneira", "quantity": 1, "unit_price": 10.0, "subtotal": 10.0 }],
                    "payment_method": "90_dias"
                }),
            ))
            .await
            .unwrap();

        // Then
        assert!(response.status().is_client_error());
        assert_eq!(provider.call_count(), 0);
    }
}
