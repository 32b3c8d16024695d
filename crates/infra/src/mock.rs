//! # テスト用モック送信
//!
//! ディスパッチャやユースケースのテストで使用するインメモリの送信実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! fortlar-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fortlar_domain::notification::{EmailMessage, NotificationError};

use crate::notification::{NotificationSender, SendReceipt};

/// モックが受け取ったメール
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// 送信元（ディスパッチャが決めたもの）
    pub from:  String,
    /// メール本体
    pub email: EmailMessage,
}

/// 送信内容を記録するモック
///
/// `clone()` したインスタンス同士で記録を共有する。
/// `failing()` で作ったモックは記録したうえで指定のエラーを返す。
#[derive(Debug, Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<SentEmail>>>,
    failure: Option<NotificationError>,
}

impl MockNotificationSender {
    /// 常に成功するモックを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に指定のエラーを返すモックを作成する
    pub fn failing(error: NotificationError) -> Self {
        Self {
            sent:    Arc::default(),
            failure: Some(error),
        }
    }

    /// 受け取ったメールの一覧
    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// 呼び出し回数
    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(
        &self,
        from: &str,
        email: &EmailMessage,
    ) -> Result<SendReceipt, NotificationError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentEmail {
                from:  from.to_string(),
                email: email.clone(),
            });
            sent.len()
        };

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(SendReceipt {
                message_id: Some(format!("mock-{count}")),
            }),
        }
    }
}
