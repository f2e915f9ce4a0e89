//! 区切り文字形式の名簿パーサー
//!
//! 先頭の空でない行をヘッダーとして扱い、残りの行をRosterRecordに変換する。
//! 列数がヘッダーより少ない行は破棄し、ParseWarningとして記録する。

use crate::error::{Error, Result};
use crate::types::RosterRecord;
use serde::Serialize;

/// 名簿の読み込み結果
#[derive(Debug, Clone, Default)]
pub struct ParsedRoster {
    pub headers: Vec<String>,
    pub records: Vec<RosterRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// 破棄した行の情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    /// 1始まりの行番号
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: expected {} fields, found {}",
            self.line, self.expected, self.found
        )
    }
}

/// 区切り文字形式の名簿を読み込む
pub fn parse_delimited(bytes: &[u8], delimiter: char) -> Result<ParsedRoster> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedInput(format!("UTF-8ではありません: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| Error::MalformedInput("空の名簿です".to_string()))?;

    let headers: Vec<String> = split_line(header_line, delimiter)
        .into_iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (line_no, line) in lines {
        let fields = split_line(line, delimiter);
        if fields.len() < headers.len() {
            tracing::warn!(
                line = line_no + 1,
                expected = headers.len(),
                found = fields.len(),
                "列数不足の行を破棄"
            );
            warnings.push(ParseWarning {
                line: line_no + 1,
                expected: headers.len(),
                found: fields.len(),
            });
            continue;
        }

        // ヘッダーより多い列は無視
        let record = RosterRecord::new(
            headers
                .iter()
                .zip(fields)
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
        records.push(record);
    }

    tracing::debug!(
        headers = headers.len(),
        records = records.len(),
        dropped = warnings.len(),
        "名簿を読み込みました"
    );

    Ok(ParsedRoster {
        headers,
        records,
        warnings,
    })
}

/// 1行を区切り文字で分割（引用符内の区切り文字は分割しない）
fn split_line(line: &str, delimiter: char) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut field_start = 0;

    for (i, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            fields.push(trim_quotes(&line[field_start..i]));
            field_start = i + c.len_utf8();
        }
    }

    // 最後のフィールド
    fields.push(trim_quotes(&line[field_start..]));

    fields
}

fn trim_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}
