//! 照合から出力までの流れ
//!
//! 名簿の列解決は写真一覧の取得より先に行う。必須列がなければ保存先には触れない。

use crate::config::Config;
use crate::error::Result;
use crate::export::{compose_artifacts, CardStyle, ExportArtifacts, ExportJob};
use crate::render::{CardTheme, RenderAdapter};
use crate::storage::AssetStorage;
use badgeflow_common::{
    reconcile, resolve_people, CardGeometry, ColumnPolicy, ParsedRoster, PhotoAsset, Reconciliation,
    ReconciliationSummary,
};
use indicatif::ProgressBar;
use std::sync::Arc;

/// 実行時の設定
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub geometry: Arc<CardGeometry>,
    pub column_policy: ColumnPolicy,
    pub theme: CardTheme,
    pub company_name: Option<String>,
    pub logo: Option<Vec<u8>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            geometry: Arc::new(CardGeometry::cr80_a4()),
            column_policy: ColumnPolicy::default(),
            theme: CardTheme::default(),
            company_name: None,
            logo: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            geometry: Arc::new(CardGeometry::compute(&config.grid)?),
            column_policy: config.column_policy(),
            theme: config.card_theme()?,
            company_name: config.company_name.clone(),
            logo: config.load_logo()?,
        })
    }

    fn style(&self) -> CardStyle {
        CardStyle {
            theme: self.theme,
            company_name: self.company_name.clone(),
            logo: self.logo.clone(),
        }
    }
}

/// 照合結果一式
#[derive(Debug, Clone)]
pub struct BatchReconciliation {
    pub roster: ParsedRoster,
    pub reconciliation: Reconciliation,
    pub summary: ReconciliationSummary,
}

/// 名簿と保存先の写真を照合する
pub async fn reconcile_batch<S>(
    roster: ParsedRoster,
    storage: &S,
    photos_prefix: &str,
    policy: ColumnPolicy,
) -> Result<BatchReconciliation>
where
    S: AssetStorage + ?Sized,
{
    let people = resolve_people(&roster, policy)?;

    let assets: Vec<PhotoAsset> = storage
        .list(photos_prefix)
        .await?
        .into_iter()
        .map(|object| PhotoAsset::new(object.name, object.path))
        .collect();
    tracing::debug!(people = people.len(), photos = assets.len(), "照合開始");

    let reconciliation = reconcile(people, assets);
    let summary = reconciliation.summary(&roster.records);

    Ok(BatchReconciliation {
        roster,
        reconciliation,
        summary,
    })
}

/// 一致した人のカードを描画し、出力物を作る
///
/// 途中で失敗した場合は何も返さない（部分的な出力は作らない）。
pub async fn run_export<R, S>(
    batch: &BatchReconciliation,
    storage: &S,
    renderer: &R,
    options: &PipelineOptions,
    progress: Option<&ProgressBar>,
) -> Result<ExportArtifacts>
where
    R: RenderAdapter + ?Sized,
    S: AssetStorage + ?Sized,
{
    let mut job = ExportJob::from_reconciliation(&batch.reconciliation);
    if let Some(pb) = progress {
        pb.set_length(job.matched_count() as u64);
    }

    job.render_cards(renderer, storage, &options.geometry, &options.style(), progress)
        .await?;
    compose_artifacts(&mut job, &options.geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_default_config() {
        let options = PipelineOptions::from_config(&Config::default()).expect("既定設定で失敗");
        assert_eq!(options.geometry.capacity(), 10);
        assert_eq!(options.column_policy, ColumnPolicy::Required);
        assert_eq!(options.logo, None);
    }

    #[test]
    fn test_missing_logo_in_config() {
        let config = Config {
            logo_path: Some("/nonexistent/logo.png".into()),
            ..Config::default()
        };
        assert!(matches!(
            PipelineOptions::from_config(&config),
            Err(crate::error::BadgeError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_style_carries_logo() {
        let options = PipelineOptions {
            logo: Some(b"logo".to_vec()),
            company_name: Some("ACME".into()),
            ..PipelineOptions::default()
        };
        let style = options.style();
        assert_eq!(style.logo.as_deref(), Some(b"logo".as_slice()));
        assert_eq!(style.company_name.as_deref(), Some("ACME"));
    }

    #[test]
    fn test_invalid_grid_in_config() {
        let mut config = Config::default();
        config.grid.rows = 0;
        assert!(PipelineOptions::from_config(&config).is_err());
    }
}
