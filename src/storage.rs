//! 写真・名簿の保存先
//!
//! パスは "/" 区切りの相対パス（例: `batch-20240101-090000/photos/E1.jpg`）。

use crate::error::{BadgeError, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// バッチ直下のロゴのファイル名（拡張子なし）
const LOGO_STEM: &str = "logo";

/// 保存先のオブジェクト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// ファイル名
    pub name: String,
    /// 保存先パス
    pub path: String,
}

#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// prefix 直下の画像を列挙する
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>>;

    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;

    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()>;
}

/// ディレクトリを保存先とする実装
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 保存先パスをファイルパスに変換（ルート外は拒否）
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(BadgeError::AssetFetchFailure {
                path: path.to_string(),
                reason: "保存先の外を指すパスです".into(),
            });
        }
        Ok(self.root.join(relative))
    }
}

fn is_image_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[async_trait]
impl AssetStorage for LocalStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let folder = self.resolve(prefix)?;
        if !folder.exists() {
            tracing::debug!("prefix {} は空です", prefix);
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1) // 直下のみ
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !is_image_file(&name) {
                continue;
            }
            objects.push(StoredObject {
                path: join_key(prefix, &name),
                name,
            });
        }

        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file)
            .await
            .map_err(|e| BadgeError::AssetFetchFailure {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, bytes).await?;
        Ok(())
    }
}

/// 新しいバッチID（batch-YYYYMMDD-HHMMSS）
pub fn new_batch_id() -> String {
    format!("batch-{}", Local::now().format("%Y%m%d-%H%M%S"))
}

/// バッチ内の写真の prefix
pub fn photos_prefix(batch_id: &str) -> String {
    format!("{}/photos", batch_id.trim_matches('/'))
}

/// 保存した結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedBatch {
    pub batch_id: String,
    pub roster_path: Option<String>,
    pub logo_path: Option<String>,
    pub photo_paths: Vec<String>,
}

/// 名簿・ロゴ・写真フォルダをバッチとして保存する
///
/// ロゴは `{batch}/logo.{拡張子}`、写真は `{batch}/photos/` に置く。
pub async fn stage_batch<S>(
    storage: &S,
    batch_id: &str,
    roster: Option<&Path>,
    logo: Option<&Path>,
    photo_folder: &Path,
) -> Result<StagedBatch>
where
    S: AssetStorage + ?Sized,
{
    if !photo_folder.is_dir() {
        return Err(BadgeError::FolderNotFound(photo_folder.display().to_string()));
    }
    let logo_ext = match logo {
        Some(path) => Some(logo_extension(path)?),
        None => None,
    };

    let mut staged = StagedBatch {
        batch_id: batch_id.to_string(),
        ..Default::default()
    };

    if let Some(roster) = roster {
        let name = roster
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| BadgeError::FileNotFound(roster.display().to_string()))?;
        let bytes = tokio::fs::read(roster)
            .await
            .map_err(|_| BadgeError::FileNotFound(roster.display().to_string()))?;
        let path = join_key(batch_id, &name);
        storage.upload(&path, &bytes).await?;
        staged.roster_path = Some(path);
    }

    if let (Some(logo), Some(ext)) = (logo, logo_ext) {
        let bytes = tokio::fs::read(logo)
            .await
            .map_err(|_| BadgeError::FileNotFound(logo.display().to_string()))?;
        let path = join_key(batch_id, &format!("{}.{}", LOGO_STEM, ext));
        storage.upload(&path, &bytes).await?;
        staged.logo_path = Some(path);
    }

    let prefix = photos_prefix(batch_id);
    let mut files: Vec<_> = WalkDir::new(photo_folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') || !is_image_file(&name) {
            continue;
        }
        let bytes = tokio::fs::read(&file).await?;
        let path = join_key(&prefix, &name);
        storage.upload(&path, &bytes).await?;
        tracing::debug!("uploaded {}", path);
        staged.photo_paths.push(path);
    }

    Ok(staged)
}

/// ロゴの拡張子（小文字）。画像でなければ設定エラー。
fn logo_extension(path: &Path) -> Result<String> {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if !is_image_file(&name) {
        return Err(BadgeError::Config(format!(
            "ロゴは jpg/jpeg/png のみ対応しています: {}",
            path.display()
        )));
    }
    Ok(Path::new(&name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default())
}

/// バッチに保存されたロゴを取得する（なければ None）
pub async fn fetch_batch_logo<S>(storage: &S, batch_id: &str) -> Result<Option<Vec<u8>>>
where
    S: AssetStorage + ?Sized,
{
    let logo = storage.list(batch_id).await?.into_iter().find(|object| {
        Path::new(&object.name)
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(LOGO_STEM))
    });
    match logo {
        Some(object) => Ok(Some(storage.fetch(&object.path).await?)),
        None => Ok(None),
    }
}
