//! # Mail Service 設定
//!
//! 環境変数からメール配信サービスの設定を読み込む。
//! 起動時に一度だけ読み込み、以後は変更しない。
//!
//! ## 送信元アドレスの決め方
//!
//! | API キー | 優先順 |
//! |---------|--------|
//! | あり | `RESEND_FROM_EMAIL` → `MAIL_FROM` → `noreply@fortlar.com.br` |
//! | なし | `MAIL_FROM` → `MAIL_USERNAME` → `noreply@fortlar.com.br` |
//!
//! ## 実行環境の判定
//!
//! `APP_ENV`（`production` / `local`）が設定されていればそれに従う。
//! 未設定の場合、ホスティング環境のマーカー（`RENDER` / `RENDER_SERVICE_NAME`）が
//! あれば本番、無ければローカルとみなす。
//!
//! ## 受注メールの CC
//!
//! `MAIL_USERNAME_ORDER` が設定されていれば、受注確定メールをそのアドレスにも CC で送る。

use std::env;

use fortlar_domain::{dispatch::DeploymentEnvironment, email::EmailAddress};
use fortlar_infra::{DispatcherSettings, ResendSettings, SmtpSettings, SmtpTls};
use thiserror::Error;
use url::Url;

use crate::usecase::AccountLinks;

/// 送信元アドレスの最終フォールバック
pub const FALLBACK_FROM: &str = "noreply@fortlar.com.br";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 13010;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_VERIFICATION_URL: &str = "https://vendas.fortlar.com.br/confirmar-cadastro";
const DEFAULT_PASSWORD_RESET_URL: &str = "https://vendas.fortlar.com.br/reset-password";

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 値を解釈できない
    #[error("{name} の値が不正です: {value}")]
    InvalidValue { name: &'static str, value: String },

    /// URL として解釈できない
    #[error("{name} は有効な URL である必要があります: {source}")]
    InvalidUrl {
        name:   &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Mail Service サーバーの設定
#[derive(Debug, Clone)]
pub struct MailServiceConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// 実行環境
    pub environment:  DeploymentEnvironment,
    /// 送信元アドレス（送信元の書き換え前）
    pub default_from: String,
    /// メール API の設定（`RESEND_API_KEY` が無ければ `None`）
    pub resend:       Option<ResendSettings>,
    /// SMTP の設定（`MAIL_SERVER` が無ければ `None`）
    pub smtp:         Option<SmtpSettings>,
    /// メール内リンクのベース URL
    pub links:        AccountLinks,
    /// 受注メールの CC 先（`MAIL_USERNAME_ORDER`）
    pub order_copy:   Option<EmailAddress>,
}

impl MailServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列や空白だけの値は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match var("APP_ENV") {
            Some(value) => value
                .parse::<DeploymentEnvironment>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "APP_ENV",
                    value,
                })?,
            None if var("RENDER").is_some() || var("RENDER_SERVICE_NAME").is_some() => {
                DeploymentEnvironment::Production
            }
            None => DeploymentEnvironment::Local,
        };

        let resend = var("RESEND_API_KEY").map(|api_key| {
            let settings = ResendSettings::new(api_key);
            match var("RESEND_API_URL") {
                Some(base_url) => settings.with_base_url(base_url),
                None => settings,
            }
        });

        let smtp = match var("MAIL_SERVER") {
            Some(host) => {
                let port = match var("MAIL_PORT") {
                    Some(value) => parse_port("MAIL_PORT", value)?,
                    None => DEFAULT_SMTP_PORT,
                };
                let tls = match var("MAIL_TLS") {
                    Some(value) => value
                        .parse::<SmtpTls>()
                        .map_err(|_| ConfigError::InvalidValue {
                            name: "MAIL_TLS",
                            value,
                        })?,
                    None => SmtpTls::for_port(port),
                };
                Some(SmtpSettings {
                    host,
                    port,
                    username: var("MAIL_USERNAME"),
                    password: var("MAIL_PASSWORD"),
                    tls,
                })
            }
            None => None,
        };

        let default_from = if resend.is_some() {
            var("RESEND_FROM_EMAIL").or_else(|| var("MAIL_FROM"))
        } else {
            var("MAIL_FROM").or_else(|| var("MAIL_USERNAME"))
        }
        .unwrap_or_else(|| FALLBACK_FROM.to_string());

        let links = AccountLinks {
            verification_url:   parse_url(
                "VERIFICATION_URL",
                var("VERIFICATION_URL").as_deref().unwrap_or(DEFAULT_VERIFICATION_URL),
            )?,
            password_reset_url: parse_url(
                "PASSWORD_RESET_URL",
                var("PASSWORD_RESET_URL").as_deref().unwrap_or(DEFAULT_PASSWORD_RESET_URL),
            )?,
        };

        let order_copy = var("MAIL_USERNAME_ORDER")
            .map(|value| {
                EmailAddress::new(value.as_str()).map_err(|_| ConfigError::InvalidValue {
                    name: "MAIL_USERNAME_ORDER",
                    value,
                })
            })
            .transpose()?;

        Ok(Self {
            host: var("MAIL_SERVICE_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match var("MAIL_SERVICE_PORT") {
                Some(value) => parse_port("MAIL_SERVICE_PORT", value)?,
                None => DEFAULT_PORT,
            },
            environment,
            default_from,
            resend,
            smtp,
            links,
            order_copy,
        })
    }

    /// ディスパッチャの構成を返す
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            environment: self.environment,
            resend:      self.resend.clone(),
            smtp:        self.smtp.clone(),
        }
    }
}

fn parse_port(name: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}
