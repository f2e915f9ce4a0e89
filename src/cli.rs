use crate::config::Config;
use crate::error::{BadgeError, Result};
use crate::storage::{photos_prefix, LocalStorage};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "badgeflow")]
#[command(about = "名簿と顔写真を照合し、CR80カードの印刷用PDFを生成するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// 写真の取得元（フォルダ または 保存済みバッチ）
#[derive(Args, Debug, Clone)]
pub struct PhotoSource {
    /// 顔写真フォルダ
    #[arg(short, long, conflicts_with = "batch")]
    pub photos: Option<PathBuf>,

    /// stage で保存したバッチID
    #[arg(short, long)]
    pub batch: Option<String>,
}

impl PhotoSource {
    /// 保存先と写真の prefix を返す
    pub fn open(&self, config: &Config) -> Result<(LocalStorage, String)> {
        match (&self.photos, &self.batch) {
            (Some(folder), _) => {
                if !folder.is_dir() {
                    return Err(BadgeError::FolderNotFound(folder.display().to_string()));
                }
                Ok((LocalStorage::new(folder), String::new()))
            }
            (None, Some(batch)) => Ok((LocalStorage::new(config.storage_root()?), photos_prefix(batch))),
            (None, None) => Err(BadgeError::Config(
                "--photos または --batch を指定してください".into(),
            )),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 名簿と写真を照合して結果を表示
    Reconcile {
        /// 名簿ファイル (csv/tsv/xlsx)
        #[arg(required = true)]
        roster: PathBuf,

        #[command(flatten)]
        source: PhotoSource,

        /// レポート(JSON/Excel)の出力先ディレクトリ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 写真列がなければ先頭列を使う
        #[arg(long)]
        lenient: bool,
    },

    /// カードを描画してA4シートPDFと単票ZIPを出力
    Export {
        /// 名簿ファイル (csv/tsv/xlsx)
        #[arg(required = true)]
        roster: PathBuf,

        #[command(flatten)]
        source: PhotoSource,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// 配色 (blue/green/red/neutral)
        #[arg(short, long)]
        theme: Option<String>,

        /// 会社名
        #[arg(long)]
        company: Option<String>,

        /// 会社ロゴ画像（省略時は設定またはバッチのロゴ）
        #[arg(long)]
        logo: Option<PathBuf>,

        /// 文字描画に使うフォント (ttf/otf)
        #[arg(long)]
        font: Option<PathBuf>,

        /// 1ページの行数
        #[arg(long)]
        rows: Option<u32>,

        /// 1ページの列数
        #[arg(long)]
        cols: Option<u32>,

        /// 写真列がなければ先頭列を使う
        #[arg(long)]
        lenient: bool,

        /// 照合レポートも出力
        #[arg(long)]
        report: bool,
    },

    /// 名簿と写真フォルダをバッチとして保存
    Stage {
        /// 顔写真フォルダ
        #[arg(required = true)]
        photos: PathBuf,

        /// 名簿ファイル
        #[arg(short, long)]
        roster: Option<PathBuf>,

        /// 会社ロゴ画像 (jpg/png)
        #[arg(long)]
        logo: Option<PathBuf>,

        /// バッチID（省略時は日時から生成）
        #[arg(short, long)]
        batch: Option<String>,
    },

    /// カード寸法と配置座標を表示
    Geometry {
        /// 1ページの行数
        #[arg(long)]
        rows: Option<u32>,

        /// 1ページの列数
        #[arg(long)]
        cols: Option<u32>,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 配色を設定
        #[arg(long)]
        set_theme: Option<String>,

        /// 会社名を設定
        #[arg(long)]
        set_company: Option<String>,

        /// バッチ保存先を設定
        #[arg(long)]
        set_storage_root: Option<PathBuf>,

        /// 会社ロゴ画像を設定
        #[arg(long)]
        set_logo: Option<PathBuf>,

        /// フォントを設定
        #[arg(long)]
        set_font: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export() {
        let cli = Cli::parse_from([
            "badgeflow", "export", "roster.csv", "--photos", "pics", "--theme", "green", "--rows", "4",
        ]);
        match cli.command {
            Commands::Export { roster, source, theme, rows, .. } => {
                assert_eq!(roster, PathBuf::from("roster.csv"));
                assert_eq!(source.photos, Some(PathBuf::from("pics")));
                assert_eq!(theme.as_deref(), Some("green"));
                assert_eq!(rows, Some(4));
            }
            _ => panic!("export expected"),
        }
    }

    #[test]
    fn test_parse_stage_with_logo() {
        let cli = Cli::parse_from(["badgeflow", "stage", "pics", "--roster", "r.csv", "--logo", "logo.png"]);
        match cli.command {
            Commands::Stage { photos, roster, logo, batch } => {
                assert_eq!(photos, PathBuf::from("pics"));
                assert_eq!(roster, Some(PathBuf::from("r.csv")));
                assert_eq!(logo, Some(PathBuf::from("logo.png")));
                assert_eq!(batch, None);
            }
            _ => panic!("stage expected"),
        }
    }

    #[test]
    fn test_photo_source_requires_one() {
        let source = PhotoSource { photos: None, batch: None };
        assert!(matches!(source.open(&Config::default()), Err(BadgeError::Config(_))));
    }

    #[test]
    fn test_photo_source_missing_folder() {
        let source = PhotoSource {
            photos: Some(PathBuf::from("/nonexistent/photos")),
            batch: None,
        };
        assert!(matches!(source.open(&Config::default()), Err(BadgeError::FolderNotFound(_))));
    }

    #[test]
    fn test_photo_source_batch_prefix() {
        let config = Config {
            storage_root: Some(PathBuf::from("/tmp/badgeflow-store")),
            ..Config::default()
        };
        let source = PhotoSource { photos: None, batch: Some("batch-1".into()) };
        let (storage, prefix) = source.open(&config).unwrap();
        assert_eq!(prefix, "batch-1/photos");
        assert_eq!(storage.root(), std::path::Path::new("/tmp/badgeflow-store"));
    }
}
