//! 照合レポート出力（JSON / Excel）

use crate::error::{BadgeError, Result};
use badgeflow_common::export::report_core::generate_report_buffer;
use badgeflow_common::{Reconciliation, ReconciliationSummary};
use std::path::{Path, PathBuf};

pub const REPORT_JSON: &str = "reconciliation.json";
pub const REPORT_XLSX: &str = "reconciliation.xlsx";

pub fn summary_json(summary: &ReconciliationSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

pub fn report_xlsx(reconciliation: &Reconciliation) -> Result<Vec<u8>> {
    generate_report_buffer(reconciliation).map_err(BadgeError::Report)
}

/// JSON と Excel のレポートを output_dir に書き出す
pub fn write_reports(
    output_dir: &Path,
    reconciliation: &Reconciliation,
    summary: &ReconciliationSummary,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let json_path = output_dir.join(REPORT_JSON);
    std::fs::write(&json_path, summary_json(summary)?)?;

    let xlsx_path = output_dir.join(REPORT_XLSX);
    std::fs::write(&xlsx_path, report_xlsx(reconciliation)?)?;

    Ok(vec![json_path, xlsx_path])
}
