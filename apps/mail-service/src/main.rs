//! # Mail Service サーバー
//!
//! 会社登録・パスワード再設定・受注のメールを配信する内部サービス。
//!
//! ## 役割
//!
//! - **経路の選択**: メール API（Resend）/ SMTP / 送信見送りを 1 通ごとに判断
//! - **送信元の整形**: API 経由ではフリーメールの送信元をテスト用送信元に置き換える
//! - **失敗の吸収**: 配信失敗は `200` + `ok: false` で返し、呼び出し元を止めない
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `MAIL_SERVICE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `MAIL_SERVICE_PORT` | No | ポート番号（デフォルト: `13010`） |
//! | `APP_ENV` | No | `production` / `local`（未設定時は `RENDER` の有無で判定） |
//! | `RESEND_API_KEY` | No | 設定されていればメール API を使う |
//! | `RESEND_FROM_EMAIL` | No | メール API 使用時の送信元 |
//! | `MAIL_SERVER` / `MAIL_PORT` / `MAIL_TLS` | No | ローカル用 SMTP サーバー |
//! | `MAIL_USERNAME` / `MAIL_PASSWORD` / `MAIL_FROM` | No | SMTP 認証と送信元 |
//! | `MAIL_USERNAME_ORDER` | No | 受注メールの CC 先 |
//! | `VERIFICATION_URL` / `PASSWORD_RESET_URL` | No | メール内リンクのベース URL |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（Mailpit 等のローカル SMTP）
//! MAIL_SERVER=localhost MAIL_PORT=1025 MAIL_TLS=none cargo run -p fortlar-mail-service
//!
//! # 本番環境
//! RENDER=true RESEND_API_KEY=re_... cargo run -p fortlar-mail-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use axum::{body::Body, http::Request};
use fortlar_infra::EmailDispatcher;
use fortlar_mail_service::{
    config::MailServiceConfig,
    handler::{EmailState, router},
    usecase::{AccountEmailService, TemplateRenderer},
};
use fortlar_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

const SERVICE_NAME: &str = "mail-service";

/// リクエストごとのスパン
///
/// `main` のスパンは接続ごとのタスクに伝播しない。
fn make_request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        service = SERVICE_NAME,
        method = %request.method(),
        uri = %request.uri()
    )
}

/// Mail Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env(SERVICE_NAME);
    init_tracing(tracing_config.clone())?;
    let _tracing_guard = tracing_config.service_span().entered();

    let config = MailServiceConfig::from_env()?;

    tracing::info!(
        environment = %config.environment,
        "Mail Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let dispatcher = EmailDispatcher::from_settings(config.dispatcher_settings());
    let renderer = TemplateRenderer::new(config.links.clone())?;
    let service = AccountEmailService::new(dispatcher, renderer, config.default_from.clone())
        .with_order_copy(config.order_copy.clone());
    let state = Arc::new(EmailState { service });

    let app = router(state).layer(TraceLayer::new_for_http().make_span_with(make_request_span));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Mail Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
