//! # 受注
//!
//! 受注確定メールに載せる内容を定義する。
//!
//! 受注の永続化は呼び出し元の責務で、ここではメールに必要な値だけを持つ。
//! 金額は呼び出し元から受け取った値をそのまま使い、合計は各行の小計の和とする。

use serde::{Deserialize, Serialize};

use crate::{DomainError, email::EmailAddress};

/// 支払方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// 一括払い
    #[serde(rename = "avista")]
    Upfront,
    /// 30 日後払い
    #[serde(rename = "30_dias")]
    Net30,
    /// 60 日後払い
    #[serde(rename = "60_dias")]
    Net60,
}

impl PaymentMethod {
    /// メール本文に表示するラベル
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upfront => "À Vista",
            Self::Net30 => "30 Dias",
            Self::Net60 => "60 Dias",
        }
    }
}

/// 受注明細の 1 行
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// 商品コード
    pub code:       String,
    /// 商品名
    pub name:       String,
    /// 数量（1 以上）
    pub quantity:   u32,
    /// 単価
    pub unit_price: f64,
    /// 小計
    pub subtotal:   f64,
}

impl OrderItem {
    /// 明細行を作成する
    ///
    /// # エラー
    ///
    /// 数量が 0、または金額が負数・非有限の場合は `DomainError::Validation` を返す。
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: f64,
        subtotal: f64,
    ) -> Result<Self, DomainError> {
        let code = code.into().trim().to_string();
        let name = name.into().trim().to_string();

        if quantity == 0 {
            return Err(DomainError::Validation(format!(
                "商品 {code} の数量は 1 以上である必要があります"
            )));
        }
        for (label, amount) in [("単価", unit_price), ("小計", subtotal)] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(DomainError::Validation(format!(
                    "商品 {code} の{label}が不正です: {amount}"
                )));
            }
        }

        Ok(Self {
            code,
            name,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// 受注確定イベント
///
/// # 不変条件
///
/// - 明細が 1 行以上ある
/// - 会社名が空でない
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlaced {
    recipient:      EmailAddress,
    company_name:   String,
    items:          Vec<OrderItem>,
    payment_method: PaymentMethod,
}

impl OrderPlaced {
    pub fn new(
        recipient: EmailAddress,
        company_name: impl Into<String>,
        items: Vec<OrderItem>,
        payment_method: PaymentMethod,
    ) -> Result<Self, DomainError> {
        let company_name = company_name.into().trim().to_string();

        if company_name.is_empty() {
            return Err(DomainError::Validation("会社名は必須です".to_string()));
        }
        if items.is_empty() {
            return Err(DomainError::Validation(
                "受注明細が 1 件もありません".to_string(),
            ));
        }

        Ok(Self {
            recipient,
            company_name,
            items,
            payment_method,
        })
    }

    pub fn recipient(&self) -> &EmailAddress {
        &self.recipient
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// 合計金額（各行の小計の和）
    pub fn total(&self) -> f64 {
        self.items.iter().map(|item| item.subtotal).sum()
    }

    /// 件名を返す
    pub fn subject(&self) -> String {
        format!(
            "Novo Order - {} - Total: R$ {:.2}",
            self.company_name,
            self.total()
        )
    }
}
