//! # 送信経路の判断
//!
//! メール 1 通ごとに、どの経路（HTTP メール API / SMTP / 送信見送り）で
//! 送るか、どの送信元アドレスを使うかを決める。
//!
//! ## 判断表
//!
//! | API キー | 環境 | 経路 |
//! |---------|------|------|
//! | あり | どちらでも | [`Transport::HttpProvider`] |
//! | なし | [`DeploymentEnvironment::Production`] | [`Transport::Suppressed`] |
//! | なし | [`DeploymentEnvironment::Local`] | [`Transport::Smtp`] |
//!
//! 本番のホスティング環境は SMTP の送信ポートを塞いでいるため、API キーが無い
//! 本番環境では SMTP を試みずに見送る。
//!
//! ## 送信元の書き換え
//!
//! HTTP メール API は送信元ドメインの所有確認を要求する。フリーメール
//! ドメイン（[`PUBLIC_MAIL_DOMAINS`]）は確認できないため、API 経由の場合のみ
//! 事前検証済みのテスト用送信元 [`PROVIDER_TEST_SENDER`] に置き換える。
//! それ以外の未検証ドメインはそのまま送り、API 側の拒否を配信失敗として扱う。

use serde::Serialize;
use strum::IntoStaticStr;

use crate::{email::domain_of, notification::NotificationError};

/// メール API が事前検証済みとして受け付けるテスト用送信元
pub const PROVIDER_TEST_SENDER: &str = "onboarding@resend.dev";

/// 送信元として API で検証できないフリーメールドメイン
pub const PUBLIC_MAIL_DOMAINS: [&str; 4] = ["gmail.com", "yahoo.com", "hotmail.com", "outlook.com"];

/// 配信経路
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    /// HTTPS 経由のトランザクションメール API
    HttpProvider,
    /// メールサーバーへの直接送信
    Smtp,
    /// 送信を見送る
    Suppressed,
}

/// 実行環境
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeploymentEnvironment {
    /// 本番（SMTP ポートが塞がれている）
    Production,
    /// ローカル開発
    #[default]
    Local,
}

/// 送信経路の判断に使う設定
///
/// 起動時に一度だけ組み立て、以後は変更しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    environment:             DeploymentEnvironment,
    http_provider_available: bool,
}

impl DispatchPolicy {
    /// 新しい判断設定を作成する
    ///
    /// # 引数
    ///
    /// - `environment`: 実行環境
    /// - `http_provider_available`: メール API の認証情報（空でない API キー）があるか
    pub fn new(environment: DeploymentEnvironment, http_provider_available: bool) -> Self {
        Self {
            environment,
            http_provider_available,
        }
    }

    pub fn environment(&self) -> DeploymentEnvironment {
        self.environment
    }

    pub fn http_provider_available(&self) -> bool {
        self.http_provider_available
    }

    /// 1 通分の送信経路と送信元を決める
    pub fn decide(&self, configured_from: &str) -> DispatchDecision {
        let transport = match (self.http_provider_available, self.environment) {
            (true, _) => Transport::HttpProvider,
            (false, DeploymentEnvironment::Production) => Transport::Suppressed,
            (false, DeploymentEnvironment::Local) => Transport::Smtp,
        };

        let sender_address = match transport {
            Transport::HttpProvider => sanitize_sender(configured_from),
            Transport::Smtp | Transport::Suppressed => configured_from.trim().to_string(),
        };

        DispatchDecision {
            transport,
            sender_address,
            environment: self.environment,
        }
    }
}

/// 1 通分の判断結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchDecision {
    pub transport:      Transport,
    pub sender_address: String,
    pub environment:    DeploymentEnvironment,
}

/// ドメインがフリーメールかどうか
///
/// 大文字小文字は区別せず、FQDN 末尾のドット（`gmail.com.`）も同じドメインとみなす。
pub fn is_public_mail_domain(domain: &str) -> bool {
    let domain = domain.trim().trim_end_matches('.');
    PUBLIC_MAIL_DOMAINS
        .iter()
        .any(|public| public.eq_ignore_ascii_case(domain))
}

/// メール API 向けに送信元を整える
///
/// フリーメールドメインなら [`PROVIDER_TEST_SENDER`] を、それ以外は入力を返す。
pub fn sanitize_sender(configured_from: &str) -> String {
    match domain_of(configured_from) {
        Some(domain) if is_public_mail_domain(domain) => PROVIDER_TEST_SENDER.to_string(),
        _ => configured_from.trim().to_string(),
    }
}

/// 配信結果
///
/// 送信処理は常にこの値を返し、エラーを送出しない。
/// `ok == false` は呼び出し元にとって警告であり、処理の中断理由にはならない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    /// 配信に成功したか
    pub ok:         bool,
    /// 使用した（または見送った）経路
    pub transport:  Transport,
    /// 送信先サービスが払い出したメッセージ ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// 失敗理由コード（[`NotificationError::reason_code`]）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason:     Option<String>,
    /// 失敗の詳細メッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail:     Option<String>,
}

impl DeliveryResult {
    /// 配信成功
    pub fn delivered(transport: Transport, message_id: Option<String>) -> Self {
        Self {
            ok: true,
            transport,
            message_id,
            reason: None,
            detail: None,
        }
    }

    /// 配信失敗
    pub fn failed(transport: Transport, error: &NotificationError) -> Self {
        Self {
            ok: false,
            transport,
            message_id: None,
            reason: Some(error.reason_code().to_string()),
            detail: Some(error.to_string()),
        }
    }

    /// 本番環境での SMTP 送信見送り
    pub fn suppressed() -> Self {
        Self::failed(Transport::Suppressed, &NotificationError::TransportBlocked)
    }

    /// 失敗理由コードを返す
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}
