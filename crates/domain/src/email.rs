//! # メールアドレス
//!
//! 宛先・送信元に使うメールアドレスの値オブジェクト。
//!
//! 検証は `local@domain` の構造確認にとどめる。RFC 5322 の完全な検証は
//! 送信時に lettre / メール API 側で行われる。

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// メールアドレスの最大長
const MAX_LENGTH: usize = 255;

/// メールアドレス（値オブジェクト）
///
/// # 不変条件
///
/// - 空文字列ではない
/// - `@` で区切られた local 部と domain 部がどちらも空でない
/// - 最大 255 文字
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// メールアドレスを作成する
    ///
    /// 前後の空白は取り除く。
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.rsplit_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || domain.contains(char::is_whitespace) {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.len() > MAX_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは{MAX_LENGTH}文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ドメイン部（`@` より後ろ）を取得する
    pub fn domain(&self) -> &str {
        self.0
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default()
    }

    /// 所有権付きの文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// アドレス文字列からドメイン部を取り出す
///
/// 検証前の設定値（`RESEND_FROM_EMAIL` など）に対して使う。
/// `Nome <vendas@fortlar.com.br>` 形式の表示名付きアドレスにも対応する。
pub fn domain_of(address: &str) -> Option<&str> {
    let address = address.trim();
    let address = match (address.rfind('<'), address.rfind('>')) {
        (Some(start), Some(end)) if start < end => &address[start + 1..end],
        _ => address,
    };
    let (_, domain) = address.rsplit_once('@')?;
    let domain = domain.trim();
    (!domain.is_empty()).then_some(domain)
}
