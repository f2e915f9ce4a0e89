//! 出力ジョブ
//!
//! 照合結果の人物を名簿順に並べ、一致した人だけ表面・裏面を順に描画する。
//! 描画した画像はエンコード済みのまま保持する。

use crate::error::{BadgeError, Result};
use crate::render::{render_checked, CardDescriptor, CardTheme, RenderAdapter};
use crate::storage::AssetStorage;
use badgeflow_common::{CardGeometry, CardSide, MatchKind, MatchResult, PhotoAsset, Reconciliation, ResolvedPerson};
use indicatif::ProgressBar;
use std::fmt;

/// ジョブの進行状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Pending,
    Rendering { done: usize, total: usize },
    ComposingSheets,
    BuildingSingles,
    Complete,
    Failed(String),
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Pending => write!(f, "待機中"),
            ExportStatus::Rendering { done, total } => write!(f, "描画中 ({}/{})", done, total),
            ExportStatus::ComposingSheets => write!(f, "A4シート作成中"),
            ExportStatus::BuildingSingles => write!(f, "単票PDF作成中"),
            ExportStatus::Complete => write!(f, "完了"),
            ExportStatus::Failed(reason) => write!(f, "失敗: {}", reason),
        }
    }
}

/// カードの描画スタイル
#[derive(Debug, Clone, Default)]
pub struct CardStyle {
    pub theme: CardTheme,
    pub company_name: Option<String>,
    /// 表面ヘッダーのロゴ画像
    pub logo: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub person: ResolvedPerson,
    pub kind: MatchKind,
    pub asset: Option<PhotoAsset>,
    pub front: Option<Vec<u8>>,
    pub back: Option<Vec<u8>>,
}

impl ExportEntry {
    pub fn is_matched(&self) -> bool {
        self.kind == MatchKind::Matched && self.asset.is_some()
    }

    /// 表裏がそろっていれば返す
    pub fn pair(&self) -> Option<(&[u8], &[u8])> {
        match (&self.front, &self.back) {
            (Some(front), Some(back)) => Some((front.as_slice(), back.as_slice())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    entries: Vec<ExportEntry>,
    status: ExportStatus,
}

impl ExportJob {
    /// 照合結果から作成（名簿にない写真は含めない）
    pub fn from_reconciliation(reconciliation: &Reconciliation) -> Self {
        let entries = reconciliation
            .results()
            .iter()
            .filter_map(|result| match result {
                MatchResult::Matched { person, asset } => Some(ExportEntry {
                    person: person.clone(),
                    kind: MatchKind::Matched,
                    asset: Some(asset.clone()),
                    front: None,
                    back: None,
                }),
                MatchResult::MissingPhoto { person } => Some(ExportEntry {
                    person: person.clone(),
                    kind: MatchKind::MissingPhoto,
                    asset: None,
                    front: None,
                    back: None,
                }),
                MatchResult::OrphanPhoto { .. } => None,
            })
            .collect();

        Self {
            entries,
            status: ExportStatus::Pending,
        }
    }

    pub fn entries(&self) -> &[ExportEntry] {
        &self.entries
    }

    pub fn status(&self) -> &ExportStatus {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: ExportStatus) {
        tracing::debug!("export status: {}", status);
        self.status = status;
    }

    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_matched()).count()
    }

    /// 一致した人の画像を順に描画する（失敗したらその時点で中断）
    pub async fn render_cards<R, S>(
        &mut self,
        renderer: &R,
        storage: &S,
        geometry: &CardGeometry,
        style: &CardStyle,
        progress: Option<&ProgressBar>,
    ) -> Result<()>
    where
        R: RenderAdapter + ?Sized,
        S: AssetStorage + ?Sized,
    {
        let total = self.matched_count();
        if total == 0 {
            return Err(BadgeError::NothingToExport);
        }

        let mut done = 0;
        self.set_status(ExportStatus::Rendering { done, total });

        for i in 0..self.entries.len() {
            if !self.entries[i].is_matched() {
                continue;
            }
            if let Err(e) = self.render_entry(i, renderer, storage, geometry, style).await {
                self.set_status(ExportStatus::Failed(e.to_string()));
                return Err(e);
            }
            done += 1;
            self.status = ExportStatus::Rendering { done, total };
            if let Some(pb) = progress {
                pb.inc(1);
            }
        }

        Ok(())
    }

    async fn render_entry<R, S>(
        &mut self,
        index: usize,
        renderer: &R,
        storage: &S,
        geometry: &CardGeometry,
        style: &CardStyle,
    ) -> Result<()>
    where
        R: RenderAdapter + ?Sized,
        S: AssetStorage + ?Sized,
    {
        let entry = &self.entries[index];
        let photo = match &entry.asset {
            Some(asset) => storage.fetch(&asset.storage_path).await?,
            None => return Ok(()),
        };

        let front = CardDescriptor::new(entry.person.clone(), CardSide::Front, geometry, style.theme)
            .with_photo(photo)
            .with_company_name(style.company_name.clone())
            .with_logo(style.logo.clone());
        let front_png = render_checked(renderer, &front).await?;
        drop(front);

        let back = CardDescriptor::new(entry.person.clone(), CardSide::Back, geometry, style.theme)
            .with_company_name(style.company_name.clone());
        let back_png = render_checked(renderer, &back).await?;

        tracing::debug!(person_id = %entry.person.person_id, "rendered front/back");

        let entry = &mut self.entries[index];
        entry.front = Some(front_png);
        entry.back = Some(back_png);
        Ok(())
    }

    /// 指定面の画像を入力順に
    pub fn images(&self, side: CardSide) -> Vec<&[u8]> {
        self.entries
            .iter()
            .filter_map(|e| match side {
                CardSide::Front => e.front.as_deref(),
                CardSide::Back => e.back.as_deref(),
            })
            .collect()
    }
}
