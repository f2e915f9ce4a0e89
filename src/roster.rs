//! 名簿ファイルの読み込み（CSV / TSV / Excel）

use crate::error::{BadgeError, Result};
use badgeflow_common::{parse_delimited, Error as CommonError, ParsedRoster, RosterRecord};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Delimited { delimiter: char },
    Workbook,
}

impl RosterFormat {
    /// 拡張子から形式を判定
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => RosterFormat::Workbook,
            "tsv" => RosterFormat::Delimited { delimiter: '\t' },
            _ => RosterFormat::Delimited { delimiter: ',' },
        }
    }
}

/// 名簿を読み込む
pub fn parse_roster(bytes: &[u8], format: RosterFormat) -> Result<ParsedRoster> {
    match format {
        RosterFormat::Delimited { delimiter } => Ok(parse_delimited(bytes, delimiter)?),
        RosterFormat::Workbook => parse_workbook(bytes),
    }
}

/// 名簿ファイルを読み込む
pub fn load_roster(path: &Path) -> Result<ParsedRoster> {
    if !path.exists() {
        return Err(BadgeError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    parse_roster(&bytes, RosterFormat::from_path(path))
}

fn malformed(message: String) -> BadgeError {
    BadgeError::Common(CommonError::MalformedInput(message))
}

/// 先頭シートのみ読む。最初の空でない行がヘッダー。
fn parse_workbook(bytes: &[u8]) -> Result<ParsedRoster> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| malformed(format!("ブックを開けません: {}", e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| malformed("シートがありません".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| malformed(format!("シート {} を読めません: {}", sheet, e)))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()));

    let headers = rows
        .next()
        .ok_or_else(|| malformed(format!("シート {} が空です", sheet)))?;

    let records: Vec<RosterRecord> = rows
        .map(|cells| {
            let fields = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect();
            RosterRecord::new(fields)
        })
        .collect();

    tracing::debug!(sheet = %sheet, records = records.len(), "ブックを読み込みました");

    Ok(ParsedRoster {
        headers,
        records,
        warnings: Vec::new(),
    })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}
