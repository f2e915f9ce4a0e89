//! 名簿・写真・照合結果の型定義
//!
//! - RosterRecord: 名簿1行（列順を保持した文字列マップ）
//! - ResolvedPerson: 列解決後の人物レコード
//! - PhotoAsset: ストレージ上の写真ファイル
//! - MatchResult: 照合結果（一致 / 写真なし / 名簿なし）

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// 名簿1行分のデータ
///
/// ヘッダー名は読み込んだまま（大文字小文字を区別）保持する。
/// 同名ヘッダーが複数ある場合、`get` は最初の列を返す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRecord {
    fields: Vec<(String, String)>,
}

impl RosterRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// (ヘッダー, 値) のペア列から生成
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for RosterRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (header, value) in &self.fields {
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// 列解決後の人物
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPerson {
    /// データ行の番号（0始まり、ヘッダー行を含まない）
    pub row_index: usize,
    /// 社員番号、なければ行番号
    pub person_id: String,
    /// 名簿に書かれた写真ファイル名（表示用）
    pub expected_photo_file: String,
    /// 照合キー（小文字化済み）
    pub expected_photo_key: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// ストレージ上の写真ファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAsset {
    pub original_filename: String,
    pub storage_path: String,
    pub lookup_key: String,
}

impl PhotoAsset {
    /// 照合キーはファイル名の小文字化のみ（前後の空白も保持）
    pub fn new(original_filename: impl Into<String>, storage_path: impl Into<String>) -> Self {
        let original_filename = original_filename.into();
        let lookup_key = original_filename.to_lowercase();
        Self {
            original_filename,
            storage_path: storage_path.into(),
            lookup_key,
        }
    }
}

/// 照合結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        person: ResolvedPerson,
        asset: PhotoAsset,
    },
    MissingPhoto {
        person: ResolvedPerson,
    },
    OrphanPhoto {
        asset: PhotoAsset,
    },
}

impl MatchResult {
    pub fn person(&self) -> Option<&ResolvedPerson> {
        match self {
            MatchResult::Matched { person, .. } | MatchResult::MissingPhoto { person } => {
                Some(person)
            }
            MatchResult::OrphanPhoto { .. } => None,
        }
    }

    pub fn asset(&self) -> Option<&PhotoAsset> {
        match self {
            MatchResult::Matched { asset, .. } | MatchResult::OrphanPhoto { asset } => Some(asset),
            MatchResult::MissingPhoto { .. } => None,
        }
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            MatchResult::Matched { .. } => MatchKind::Matched,
            MatchResult::MissingPhoto { .. } => MatchKind::MissingPhoto,
            MatchResult::OrphanPhoto { .. } => MatchKind::OrphanPhoto,
        }
    }
}

/// 照合結果の種別（データを持たないタグ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Matched,
    MissingPhoto,
    OrphanPhoto,
}

/// カードの面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSide {
    Front,
    Back,
}

impl std::fmt::Display for CardSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardSide::Front => write!(f, "FRONT"),
            CardSide::Back => write!(f, "BACK"),
        }
    }
}
