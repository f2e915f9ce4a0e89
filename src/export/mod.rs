pub mod archive;
pub mod job;
pub mod pdf;
pub mod report;

pub use job::{CardStyle, ExportEntry, ExportJob, ExportStatus};

use crate::error::{BadgeError, Result};
use archive::SinglesArchive;
use badgeflow_common::{CardGeometry, CardSide};
use std::path::{Path, PathBuf};

pub const FRONTS_FILE: &str = "badgeflow_A4_fronts.pdf";
pub const BACKS_FILE: &str = "badgeflow_A4_backs.pdf";
pub const SINGLES_FILE: &str = "badgeflow_single_cards.zip";

/// 出力物（すべてメモリ上に作ってから書き出す）
#[derive(Debug, Clone)]
pub struct ExportArtifacts {
    pub fronts_pdf: Vec<u8>,
    pub backs_pdf: Vec<u8>,
    pub singles_zip: Vec<u8>,
    pub sheet_pages: usize,
    pub single_count: usize,
}

impl ExportArtifacts {
    /// output_dir に3ファイルを書き出す
    pub fn write_to(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;

        let files = [
            (FRONTS_FILE, &self.fronts_pdf),
            (BACKS_FILE, &self.backs_pdf),
            (SINGLES_FILE, &self.singles_zip),
        ];
        let mut written = Vec::with_capacity(files.len());
        for (name, bytes) in files {
            let path = output_dir.join(name);
            std::fs::write(&path, bytes)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// 描画済みジョブからシートPDF・単票ZIPを作る
pub fn compose_artifacts(job: &mut ExportJob, geometry: &CardGeometry) -> Result<ExportArtifacts> {
    let result = compose_inner(job, geometry);
    if let Err(e) = &result {
        job.set_status(ExportStatus::Failed(e.to_string()));
    }
    result
}

fn compose_inner(job: &mut ExportJob, geometry: &CardGeometry) -> Result<ExportArtifacts> {
    job.set_status(ExportStatus::ComposingSheets);
    let fronts = job.images(CardSide::Front);
    let backs = job.images(CardSide::Back);
    if fronts.is_empty() {
        return Err(BadgeError::NothingToExport);
    }
    let fronts_pdf = pdf::compose_sheet(&fronts, CardSide::Front, geometry)?;
    let backs_pdf = pdf::compose_sheet(&backs, CardSide::Back, geometry)?;
    let sheet_pages = fronts.len().div_ceil(geometry.capacity());

    job.set_status(ExportStatus::BuildingSingles);
    let mut archive = SinglesArchive::new();
    for entry in job.entries() {
        // 表裏がそろっていない人（写真なし）は単票を作らない
        let Some((front, back)) = entry.pair() else {
            continue;
        };
        // シートと同じ出力順の番号
        let document = pdf::build_single_document(archive.len(), front, back, geometry)?;
        archive.add(&entry.person, &document)?;
    }
    let single_count = archive.len();
    let singles_zip = archive.finish()?;

    job.set_status(ExportStatus::Complete);
    Ok(ExportArtifacts {
        fronts_pdf,
        backs_pdf,
        singles_zip,
        sheet_pages,
        single_count,
    })
}
