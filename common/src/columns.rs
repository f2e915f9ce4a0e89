//! 列解決モジュール
//!
//! 名簿のヘッダーから「写真ファイル名」「氏名」などの論理フィールドを特定する。
//! 候補ヘッダーは論理フィールドごとの優先順位テーブル（データ）として定義し、
//! テーブルの先頭から順に評価する。

use crate::error::{Error, Result};
use crate::roster::ParsedRoster;
use crate::types::{ResolvedPerson, RosterRecord};

/// ヘッダー判定ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    /// 正規化後のヘッダーが完全一致
    Exact(&'static str),
    /// 正規化後のヘッダーがすべての部分文字列を含む
    ContainsAll(&'static [&'static str]),
}

impl HeaderRule {
    pub fn matches(&self, normalized_header: &str) -> bool {
        match self {
            HeaderRule::Exact(name) => normalized_header == *name,
            HeaderRule::ContainsAll(parts) => parts.iter().all(|p| normalized_header.contains(p)),
        }
    }
}

/// 論理フィールドと優先順位テーブル
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [HeaderRule],
}

pub const PHOTO_KEY_RULES: FieldRules = FieldRules {
    field: "photo_filename",
    rules: &[
        HeaderRule::Exact("photo_filename"),
        HeaderRule::Exact("photo_file"),
        HeaderRule::Exact("photofilename"),
        HeaderRule::Exact("photo"),
        HeaderRule::Exact("photo_name"),
        HeaderRule::Exact("filename"),
        HeaderRule::Exact("file_name"),
        HeaderRule::Exact("image"),
        HeaderRule::Exact("image_filename"),
        HeaderRule::ContainsAll(&["photo", "file"]),
        HeaderRule::ContainsAll(&["photo", "name"]),
    ],
};

pub const FIRST_NAME_RULES: FieldRules = FieldRules {
    field: "first_name",
    rules: &[
        HeaderRule::Exact("first_name"),
        HeaderRule::Exact("firstname"),
        HeaderRule::Exact("forename"),
        HeaderRule::Exact("given_name"),
    ],
};

pub const LAST_NAME_RULES: FieldRules = FieldRules {
    field: "last_name",
    rules: &[
        HeaderRule::Exact("last_name"),
        HeaderRule::Exact("lastname"),
        HeaderRule::Exact("surname"),
        HeaderRule::Exact("family_name"),
    ],
};

pub const FULL_NAME_RULES: FieldRules = FieldRules {
    field: "name",
    rules: &[
        HeaderRule::Exact("full_name"),
        HeaderRule::Exact("fullname"),
        HeaderRule::Exact("name"),
        HeaderRule::Exact("display_name"),
    ],
};

pub const TITLE_RULES: FieldRules = FieldRules {
    field: "title",
    rules: &[
        HeaderRule::Exact("title"),
        HeaderRule::Exact("job_title"),
        HeaderRule::Exact("role"),
        HeaderRule::Exact("position"),
    ],
};

pub const DEPARTMENT_RULES: FieldRules = FieldRules {
    field: "department",
    rules: &[
        HeaderRule::Exact("department"),
        HeaderRule::Exact("dept"),
        HeaderRule::Exact("team"),
    ],
};

pub const PERSON_ID_RULES: FieldRules = FieldRules {
    field: "employee_id",
    rules: &[
        HeaderRule::Exact("employee_id"),
        HeaderRule::Exact("employeeid"),
        HeaderRule::Exact("staff_id"),
        HeaderRule::Exact("badge_id"),
        HeaderRule::Exact("id"),
    ],
};

/// 写真列が見つからない場合の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnPolicy {
    /// 候補がなければ MissingRequiredColumn
    #[default]
    Required,
    /// 候補がなければ先頭列を使う
    Lenient,
}

/// ヘッダー比較用の正規化（前後空白除去・小文字化・空白/ハイフン→_）
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// 優先順位テーブルに従ってヘッダーを探す
///
/// ルールの順が優先、同じルール内では列の順が優先。
pub fn find_header<'a>(headers: &'a [String], rules: &FieldRules) -> Option<&'a str> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    rules.rules.iter().find_map(|rule| {
        normalized
            .iter()
            .position(|h| rule.matches(h))
            .map(|i| headers[i].as_str())
    })
}

/// 解決済みの列マッピング
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub photo_key: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub person_id: Option<String>,
}

impl ColumnMap {
    /// ヘッダー一覧から列マッピングを解決
    pub fn resolve(headers: &[String], policy: ColumnPolicy) -> Result<Self> {
        let photo_key = match find_header(headers, &PHOTO_KEY_RULES) {
            Some(h) => h.to_string(),
            None => match (policy, headers.first()) {
                (ColumnPolicy::Lenient, Some(first)) => {
                    tracing::warn!(column = %first, "写真列が見つからないため先頭列を使用");
                    first.clone()
                }
                _ => {
                    return Err(Error::MissingRequiredColumn {
                        field: PHOTO_KEY_RULES.field,
                        headers: headers.to_vec(),
                    })
                }
            },
        };

        let pick = |rules: &FieldRules| find_header(headers, rules).map(str::to_string);

        let map = Self {
            photo_key,
            first_name: pick(&FIRST_NAME_RULES),
            last_name: pick(&LAST_NAME_RULES),
            full_name: pick(&FULL_NAME_RULES),
            title: pick(&TITLE_RULES),
            department: pick(&DEPARTMENT_RULES),
            person_id: pick(&PERSON_ID_RULES),
        };
        tracing::debug!(?map, "列を解決しました");
        Ok(map)
    }

    /// 1行を人物レコードに変換
    pub fn resolve_person(&self, row_index: usize, record: &RosterRecord) -> ResolvedPerson {
        let cell = |column: &Option<String>| -> String {
            column
                .as_deref()
                .and_then(|c| record.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let optional = |column: &Option<String>| -> Option<String> {
            Some(cell(column)).filter(|v| !v.is_empty())
        };

        let expected_photo_file = record
            .get(&self.photo_key)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let first_name = cell(&self.first_name);
        let last_name = cell(&self.last_name);

        let display_name = {
            let joined = [first_name.as_str(), last_name.as_str()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            if joined.is_empty() {
                cell(&self.full_name)
            } else {
                joined
            }
        };

        let person_id =
            optional(&self.person_id).unwrap_or_else(|| format!("{:04}", row_index + 1));

        ResolvedPerson {
            row_index,
            person_id,
            expected_photo_key: expected_photo_file.to_lowercase(),
            expected_photo_file,
            display_name,
            first_name,
            last_name,
            title: optional(&self.title),
            department: optional(&self.department),
        }
    }
}

/// 名簿全体を人物レコードに変換
pub fn resolve_people(roster: &ParsedRoster, policy: ColumnPolicy) -> Result<Vec<ResolvedPerson>> {
    let map = ColumnMap::resolve(&roster.headers, policy)?;
    Ok(roster
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| map.resolve_person(i, record))
        .collect())
}
