//! 照合レポート（Excel）生成
//!
//! 一致 / 写真なし / 名簿なし の3シートを持つブックをバッファに生成する。

use crate::matcher::Reconciliation;
use rust_xlsxwriter::*;

const MATCHED_HEADERS: &[&str] = &["ID", "氏名", "役職", "部署", "写真ファイル", "保存先"];
const MISSING_HEADERS: &[&str] = &["行", "ID", "氏名", "名簿の写真ファイル"];
const ORPHAN_HEADERS: &[&str] = &["写真ファイル", "保存先"];

/// 照合レポートをバッファに生成
pub fn generate_report_buffer(reconciliation: &Reconciliation) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_size(10.0)
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));

    // 一致
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matched").map_err(|e| format!("シート名設定エラー: {}", e))?;
        write_headers(sheet, MATCHED_HEADERS, &header_format)?;
        for (i, (person, asset)) in reconciliation.matched().enumerate() {
            let row = (i + 1) as u32;
            let cells = [
                person.person_id.as_str(),
                person.display_name.as_str(),
                person.title.as_deref().unwrap_or(""),
                person.department.as_deref().unwrap_or(""),
                asset.original_filename.as_str(),
                asset.storage_path.as_str(),
            ];
            write_row(sheet, row, &cells)?;
        }
    }

    // 写真なし
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Missing").map_err(|e| format!("シート名設定エラー: {}", e))?;
        write_headers(sheet, MISSING_HEADERS, &header_format)?;
        for (i, person) in reconciliation.missing().enumerate() {
            let row = (i + 1) as u32;
            sheet
                .write_number(row, 0, (person.row_index + 1) as f64)
                .map_err(|e| format!("セル書き込みエラー: {}", e))?;
            let cells = [
                person.person_id.as_str(),
                person.display_name.as_str(),
                person.expected_photo_file.as_str(),
            ];
            for (col, value) in cells.iter().enumerate() {
                sheet
                    .write_string(row, (col + 1) as u16, *value)
                    .map_err(|e| format!("セル書き込みエラー: {}", e))?;
            }
        }
    }

    // 名簿なし
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Orphans").map_err(|e| format!("シート名設定エラー: {}", e))?;
        write_headers(sheet, ORPHAN_HEADERS, &header_format)?;
        for (i, asset) in reconciliation.orphans().enumerate() {
            let cells = [asset.original_filename.as_str(), asset.storage_path.as_str()];
            write_row(sheet, (i + 1) as u32, &cells)?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Excel保存エラー: {}", e))
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<(), String> {
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, format)
            .map_err(|e| format!("ヘッダー書き込みエラー: {}", e))?;
        sheet
            .set_column_width(col as u16, 20.0)
            .map_err(|e| format!("列幅設定エラー: {}", e))?;
    }
    sheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("ウィンドウ枠固定エラー: {}", e))?;
    Ok(())
}

fn write_row(sheet: &mut Worksheet, row: u32, cells: &[&str]) -> Result<(), String> {
    for (col, value) in cells.iter().enumerate() {
        sheet
            .write_string(row, col as u16, *value)
            .map_err(|e| format!("セル書き込みエラー: {}", e))?;
    }
    Ok(())
}
