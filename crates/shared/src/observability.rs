//! # Observability 基盤
//!
//! トレーシングの初期化とログ出力形式の設定を提供する。
//!
//! ## 環境変数
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `LOG_FORMAT` | `json`（本番）/ `pretty`（開発）。大文字小文字は区別しない |
//! | `RUST_LOG` | フィルタディレクティブ。未設定なら [`DEFAULT_FILTER`] |
//!
//! 配信結果は [`log_business_event!`](crate::log_business_event) で出力するため、
//! JSON モードではイベントのフィールドをトップレベルに展開する。
//!
//! サービス名は [`TracingConfig::service_span`] のスパンに載せ、JSON では
//! `span.service` として出力される。

use std::str::FromStr;

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,fortlar=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("不明な LOG_FORMAT: {other:?}")),
        }
    }
}

impl LogFormat {
    /// 環境変数 `LOG_FORMAT` から読み取る
    ///
    /// 未設定なら [`Pretty`](LogFormat::Pretty)。不正な値の場合もこれにフォールバックし、
    /// stderr に警告を出す（この時点ではまだ subscriber が無い）。
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                eprintln!("WARNING: {e}, pretty にフォールバックします");
                Self::Pretty
            }),
            Err(_) => Self::default(),
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（JSON ログの `span.service` フィールドに出力）
    pub service_name:   String,
    /// ログ出力形式
    pub log_format:     LogFormat,
    /// `RUST_LOG` 未設定時のフィルタ
    pub default_filter: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    /// 環境変数 `LOG_FORMAT` から出力形式を決めて作成する
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    /// `RUST_LOG` 未設定時のフィルタを差し替える
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// `service` フィールドにサービス名を持つルートスパンを作る
    ///
    /// `main` で `entered()` しておくと、その間のログに `span.service` が付く。
    /// 別タスクで動くリクエスト処理には引き継がれないため、リクエストスパンにも
    /// 同じフィールドを付けること。
    #[cfg(feature = "observability")]
    pub fn service_span(&self) -> tracing::Span {
        tracing::info_span!("app", service = %self.service_name)
    }
}

/// 出力形式に応じた fmt レイヤーを組み立てる
#[cfg(feature = "observability")]
fn fmt_layer<S, W>(
    log_format: LogFormat,
    writer: W,
) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::Layer as _;

    match log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    }
}

/// トレーシングを初期化する
///
/// グローバル subscriber が既に設定されている場合はエラーを返す。
#[cfg(feature = "observability")]
pub fn init_tracing(
    config: TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(config.log_format, std::io::stdout))
        .try_init()?;

    tracing::debug!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "トレーシングを初期化しました"
    );
    Ok(())
}
