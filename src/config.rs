use crate::error::{BadgeError, Result};
use crate::render::{CardFont, CardTheme};
use badgeflow_common::{ColumnPolicy, GridSpec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// カードの配色 (blue/green/red/neutral)
    pub theme: String,
    /// カード表面に表示する会社名
    pub company_name: Option<String>,
    /// 用紙上の格子
    pub grid: GridSpec,
    /// 写真列がない名簿をエラーにする（false なら先頭列を使う）
    pub require_photo_column: bool,
    /// バッチ保存先（stage コマンド用）
    pub storage_root: Option<PathBuf>,
    /// 会社ロゴ画像
    pub logo_path: Option<PathBuf>,
    /// カードの文字描画に使うフォント（未設定なら文字を描かない）
    pub font_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BadgeError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("badgeflow").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            theme: CardTheme::default().key.to_string(),
            company_name: None,
            grid: GridSpec::default(),
            require_photo_column: true,
            storage_root: None,
            logo_path: None,
            font_path: None,
        }
    }

    /// 配色を取得（環境変数 BADGEFLOW_THEME を優先）
    pub fn card_theme(&self) -> Result<CardTheme> {
        let key = std::env::var("BADGEFLOW_THEME").unwrap_or_else(|_| self.theme.clone());
        CardTheme::by_key(&key)
            .ok_or_else(|| BadgeError::Config(format!("不明な配色: {} (blue/green/red/neutral)", key)))
    }

    pub fn set_theme(&mut self, key: String) -> Result<()> {
        if CardTheme::by_key(&key).is_none() {
            return Err(BadgeError::Config(format!("不明な配色: {}", key)));
        }
        self.theme = key;
        self.save()
    }

    pub fn set_company_name(&mut self, name: String) -> Result<()> {
        self.company_name = Some(name).filter(|n| !n.trim().is_empty());
        self.save()
    }

    pub fn set_logo_path(&mut self, path: PathBuf) -> Result<()> {
        if !path.is_file() {
            return Err(BadgeError::FileNotFound(path.display().to_string()));
        }
        self.logo_path = Some(path);
        self.save()
    }

    /// フォントとして読めることを確かめてから保存する
    pub fn set_font_path(&mut self, path: PathBuf) -> Result<()> {
        CardFont::load(&path)?;
        self.font_path = Some(path);
        self.save()
    }

    /// ロゴ画像を読む（未設定なら None）
    pub fn load_logo(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = &self.logo_path else {
            return Ok(None);
        };
        std::fs::read(path)
            .map(Some)
            .map_err(|_| BadgeError::FileNotFound(path.display().to_string()))
    }

    /// フォントを読む（未設定なら None）
    pub fn load_font(&self) -> Result<Option<CardFont>> {
        self.font_path.as_deref().map(CardFont::load).transpose()
    }

    pub fn column_policy(&self) -> ColumnPolicy {
        if self.require_photo_column {
            ColumnPolicy::Required
        } else {
            ColumnPolicy::Lenient
        }
    }

    /// バッチ保存先（未設定なら ~/.local/share/badgeflow/batches）
    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.storage_root {
            return Ok(root.clone());
        }
        let data = dirs::data_dir()
            .ok_or_else(|| BadgeError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data.join("badgeflow").join("batches"))
    }
}
