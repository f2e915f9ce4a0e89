use badgeflow_common::CardSide;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BadgeError {
    /// 共通ライブラリのエラー（名簿不正・必須列なし・格子設定不正）
    #[error(transparent)]
    Common(#[from] badgeflow_common::Error),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("写真の取得に失敗: {path}: {reason}")]
    AssetFetchFailure { path: String, reason: String },

    #[error("カード画像の生成に失敗 (ID: {person_id}, {side}): {reason}")]
    RenderFailure {
        person_id: String,
        side: CardSide,
        reason: String,
    },

    /// index は出力順（一致した人の並び）のカード番号
    #[error("PDFへの画像配置に失敗 ({side} #{index}): {reason}")]
    EmbedFailure {
        index: usize,
        side: CardSide,
        reason: String,
    },

    #[error("PDF生成エラー: {0}")]
    Pdf(String),

    #[error("ZIP生成エラー: {0}")]
    Archive(String),

    #[error("レポート生成エラー: {0}")]
    Report(String),

    #[error("出力対象のカードがありません（写真と一致した名簿行が0件）")]
    NothingToExport,

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl BadgeError {
    /// 名簿起因のエラー（描画前に検出されるもの）か
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BadgeError::Common(badgeflow_common::Error::MalformedInput(_))
                | BadgeError::Common(badgeflow_common::Error::MissingRequiredColumn { .. })
        )
    }
}

impl From<zip::result::ZipError> for BadgeError {
    fn from(e: zip::result::ZipError) -> Self {
        BadgeError::Archive(e.to_string())
    }
}

impl From<lopdf::Error> for BadgeError {
    fn from(e: lopdf::Error) -> Self {
        BadgeError::Pdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BadgeError>;
