//! テスト共通フィクスチャ
//!
//! ループバック上に立てるスタブサーバー（メール API、SMTP）。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
use fortlar_domain::email::EmailAddress;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};

pub fn address(value: &str) -> EmailAddress {
    EmailAddress::new(value).unwrap()
}

/// 接続を受け付けないループバックアドレスを返す
pub async fn unreachable_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

// =============================================================================
// メール API スタブ
// =============================================================================

/// スタブが受け取ったリクエスト
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body:          Value,
}

/// スタブの応答
#[derive(Debug, Clone)]
pub enum ProviderReply {
    /// 200 + `{"id": ...}`
    Accept(String),
    /// 指定ステータス + JSON 本文
    Reject(StatusCode, Value),
}

#[derive(Clone)]
struct ProviderState {
    reply:    ProviderReply,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

async fn handle_send(
    State(state): State<ProviderState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.captured.lock().unwrap().push(CapturedRequest {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    match state.reply {
        ProviderReply::Accept(id) => (StatusCode::OK, Json(serde_json::json!({ "id": id }))),
        ProviderReply::Reject(status, body) => (status, Json(body)),
    }
}

/// メール API スタブを起動し、ベース URL と受信記録を返す
pub async fn spawn_provider_stub(
    reply: ProviderReply,
) -> (String, Arc<Mutex<Vec<CapturedRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = ProviderState {
        reply,
        captured: captured.clone(),
    };
    let app = Router::new()
        .route("/emails", post(handle_send))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

// =============================================================================
// SMTP スタブ
// =============================================================================

/// SMTP スタブの振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpBehavior {
    /// すべて受け付ける
    Accept,
    /// RCPT TO を 550 で拒否する
    RejectRecipient,
}

/// 最小限の SMTP サーバーを起動し、ポートと受信した DATA を返す
pub async fn spawn_smtp_stub(behavior: SmtpBehavior) -> (u16, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let store = received.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let store = store.clone();
            tokio::spawn(async move {
                let (reader, mut writer) = stream.into_split();
                let mut lines = BufReader::new(reader).lines();

                if writer.write_all(b"220 localhost ESMTP stub\r\n").await.is_err() {
                    return;
                }

                while let Ok(Some(line)) = lines.next_line().await {
                    let command = line.to_ascii_uppercase();
                    let reply = if command.starts_with("EHLO") || command.starts_with("HELO")
                    {
                        "250 localhost\r\n"
                    } else if command.starts_with("MAIL FROM") {
                        "250 2.1.0 OK\r\n"
                    } else if command.starts_with("RCPT TO") {
                        match behavior {
                            SmtpBehavior::Accept => "250 2.1.5 OK\r\n",
                            SmtpBehavior::RejectRecipient => "550 5.1.1 mailbox unavailable\r\n",
                        }
                    } else if command == "DATA" {
                        if writer
                            .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                            .await
                            .is_err()
                        {
                            return;
                        }
                        let mut data = String::new();
                        while let Ok(Some(body_line)) = lines.next_line().await {
                            if body_line == "." {
                                break;
                            }
                            data.push_str(&body_line);
                            data.push('\n');
                        }
                        store.lock().unwrap().push(data);
                        "250 2.0.0 OK queued\r\n"
                    } else if command == "QUIT" {
                        let _ = writer.write_all(b"221 2.0.0 Bye\r\n").await;
                        return;
                    } else if command == "RSET" || command == "NOOP" {
                        "250 2.0.0 OK\r\n"
                    } else {
                        "502 5.5.2 not implemented\r\n"
                    };

                    if writer.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (port, received)
}
