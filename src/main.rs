use badgeflow::common::{CardGeometry, ColumnPolicy, GridSpec, MatchResult};
use badgeflow::export::report;
use badgeflow::pipeline::{reconcile_batch, run_export, BatchReconciliation, PipelineOptions};
use badgeflow::render::{CardRasterizer, CardTheme};
use badgeflow::storage::{fetch_batch_logo, new_batch_id, stage_batch, LocalStorage};
use badgeflow::{cli, config, error, roster};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::{BadgeError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "badgeflow=debug,badgeflow_common=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Reconcile { roster, source, output, lenient } => {
            println!("🔎 badgeflow - 照合\n");

            let policy = if lenient { ColumnPolicy::Lenient } else { config.column_policy() };
            let (storage, prefix) = source.open(&config)?;
            let batch = load_and_reconcile(&roster, &storage, &prefix, policy).await?;
            print_reconciliation(&batch);

            if let Some(output_dir) = output {
                for path in report::write_reports(&output_dir, &batch.reconciliation, &batch.summary)? {
                    println!("✔ レポート出力: {}", path.display());
                }
            }

            println!("\n✅ 照合完了");
        }

        Commands::Export {
            roster,
            source,
            output,
            theme,
            company,
            logo,
            font,
            rows,
            cols,
            lenient,
            report: with_report,
        } => {
            println!("🪪 badgeflow - カード出力\n");

            let mut config = config;
            if let Some(theme) = theme {
                config.theme = theme;
            }
            if company.is_some() {
                config.company_name = company;
            }
            if logo.is_some() {
                config.logo_path = logo;
            }
            if font.is_some() {
                config.font_path = font;
            }
            apply_grid_overrides(&mut config.grid, rows, cols);
            if lenient {
                config.require_photo_column = false;
            }
            let mut options = PipelineOptions::from_config(&config)?;
            let font = config.load_font()?;

            println!("[1/3] 名簿と写真を照合中...");
            let (storage, prefix) = source.open(&config)?;
            if let (None, Some(batch_id)) = (&source.photos, &source.batch) {
                if options.logo.is_none() {
                    options.logo = fetch_batch_logo(&storage, batch_id).await?;
                }
            }
            let batch = load_and_reconcile(&roster, &storage, &prefix, options.column_policy).await?;
            println!(
                "✔ 一致 {}件 / 写真なし {}件 / 名簿なし {}件\n",
                batch.summary.matched, batch.summary.missing, batch.summary.orphans
            );
            if batch.summary.matched == 0 {
                return Err(BadgeError::NothingToExport);
            }

            println!("[2/3] カードを描画中... (配色: {})", options.theme.label);
            if font.is_none() {
                println!("  フォント未設定のため文字は描画しません（--font で指定）");
            }
            let renderer = CardRasterizer::new(options.geometry.card_width_px, options.geometry.card_height_px)
                .with_font(font);
            let progress = ProgressBar::new(batch.summary.matched as u64);
            if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
                progress.set_style(style);
            }
            let artifacts = run_export(&batch, &storage, &renderer, &options, Some(&progress)).await;
            progress.finish_and_clear();
            let artifacts = artifacts?;
            println!("✔ {}人分のカードを描画\n", artifacts.single_count);

            println!("[3/3] 出力中...");
            for path in artifacts.write_to(&output)? {
                println!("✔ 出力: {}", path.display());
            }
            println!("  A4シート: {}ページ（表・裏それぞれ）", artifacts.sheet_pages);
            if with_report {
                for path in report::write_reports(&output, &batch.reconciliation, &batch.summary)? {
                    println!("✔ レポート出力: {}", path.display());
                }
            }

            println!("\n✅ 出力完了");
        }

        Commands::Stage { photos, roster, logo, batch } => {
            println!("📦 badgeflow - バッチ保存\n");

            let batch_id = batch.unwrap_or_else(new_batch_id);
            let storage = LocalStorage::new(config.storage_root()?);
            let staged = stage_batch(&storage, &batch_id, roster.as_deref(), logo.as_deref(), &photos).await?;

            if let Some(path) = &staged.roster_path {
                println!("✔ 名簿: {}", path);
            }
            if let Some(path) = &staged.logo_path {
                println!("✔ ロゴ: {}", path);
            }
            println!("✔ 写真 {}枚を保存", staged.photo_paths.len());
            println!("\n✅ バッチID: {}", staged.batch_id);
            println!("   保存先: {}", storage.root().display());
        }

        Commands::Geometry { rows, cols, json } => {
            let mut grid = config.grid;
            apply_grid_overrides(&mut grid, rows, cols);
            let geometry = CardGeometry::compute(&grid)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&geometry)?);
            } else {
                print_geometry(&geometry);
            }
        }

        Commands::Config {
            set_theme,
            set_company,
            set_storage_root,
            set_logo,
            set_font,
            show,
        } => {
            let mut config = config;

            if let Some(theme) = set_theme {
                config.set_theme(theme)?;
                println!("✔ 配色を設定しました");
            }

            if let Some(company) = set_company {
                config.set_company_name(company)?;
                println!("✔ 会社名を設定しました");
            }

            if let Some(root) = set_storage_root {
                config.storage_root = Some(root);
                config.save()?;
                println!("✔ バッチ保存先を設定しました");
            }

            if let Some(path) = set_logo {
                config.set_logo_path(path)?;
                println!("✔ ロゴを設定しました");
            }

            if let Some(path) = set_font {
                config.set_font_path(path)?;
                println!("✔ フォントを設定しました");
            }

            if show {
                println!("設定:");
                println!("  配色: {}", config.theme);
                println!("  会社名: {}", config.company_name.as_deref().unwrap_or("未設定"));
                println!("  格子: {}列 x {}行", config.grid.cols, config.grid.rows);
                println!("  写真列必須: {}", if config.require_photo_column { "はい" } else { "いいえ" });
                println!("  バッチ保存先: {}", config.storage_root()?.display());
                let show_path = |path: &Option<std::path::PathBuf>| {
                    path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "未設定".to_string())
                };
                println!("  ロゴ: {}", show_path(&config.logo_path));
                println!("  フォント: {}", show_path(&config.font_path));
                let themes: Vec<&str> = badgeflow::render::THEMES.iter().map(|t| t.key).collect();
                println!("  使用可能な配色: {}", themes.join(", "));
                if CardTheme::by_key(&config.theme).is_none() {
                    println!("  ⚠ 配色 {} は不明です", config.theme);
                }
            }
        }
    }

    Ok(())
}

fn apply_grid_overrides(grid: &mut GridSpec, rows: Option<u32>, cols: Option<u32>) {
    if let Some(rows) = rows {
        grid.rows = rows;
    }
    if let Some(cols) = cols {
        grid.cols = cols;
    }
}

async fn load_and_reconcile(
    roster_path: &Path,
    storage: &LocalStorage,
    prefix: &str,
    policy: ColumnPolicy,
) -> Result<BatchReconciliation> {
    let parsed = roster::load_roster(roster_path)?;
    for warning in &parsed.warnings {
        println!("⚠ 列数不足の行を除外: {}", warning);
    }
    reconcile_batch(parsed, storage, prefix, policy).await
}

fn print_reconciliation(batch: &BatchReconciliation) {
    let summary = &batch.summary;
    println!("名簿 {}行 / 写真 {}枚", summary.roster_rows, summary.photos_uploaded);
    println!("✔ 一致: {}件", summary.matched);

    for result in batch.reconciliation.results() {
        match result {
            MatchResult::Matched { .. } => {}
            MatchResult::MissingPhoto { person } => {
                let file = if person.expected_photo_file.is_empty() {
                    "(写真ファイル名なし)"
                } else {
                    person.expected_photo_file.as_str()
                };
                println!("  写真なし: {} {} → {}", person.person_id, person.display_name, file);
            }
            MatchResult::OrphanPhoto { asset } => {
                println!("  名簿なし: {}", asset.original_filename);
            }
        }
    }
    println!("写真なし: {}件 / 名簿なし: {}件", summary.missing, summary.orphans);
}

fn print_geometry(geometry: &CardGeometry) {
    println!("カード: {:.3}in x {:.3}in", geometry.card_width_in, geometry.card_height_in);
    println!(
        "        {}px x {}px ({}dpi) / {:.2}pt x {:.2}pt",
        geometry.card_width_px, geometry.card_height_px, geometry.dpi, geometry.card_width_pt, geometry.card_height_pt
    );
    println!("用紙: {}pt x {}pt（左下原点）", geometry.sheet_width_pt, geometry.sheet_height_pt);
    println!("格子: {}列 x {}行 = {}枚/ページ", geometry.grid.cols, geometry.grid.rows, geometry.capacity());
    for (slot, pos) in geometry.positions.iter().enumerate() {
        println!("  [{:>2}] x={:.2} y={:.2}", slot, pos.x, pos.y);
    }
}
