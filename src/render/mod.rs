//! カード画像レンダラ
//!
//! 描画方法はこのクレートの関心外で、`RenderAdapter` を実装したものを注入する。
//! レンダラは CardDescriptor に書かれたピクセル寸法ちょうどの画像を返すこと。
//! 寸法が違う画像は PDF 上で実寸にならないため RenderFailure とする。

mod raster;
mod text;
mod theme;

pub use raster::CardRasterizer;
pub use text::CardFont;
pub use theme::{CardTheme, THEMES};

use crate::error::{BadgeError, Result};
use async_trait::async_trait;
use badgeflow_common::{CardGeometry, CardSide, ResolvedPerson};
use image::ImageReader;
use std::io::Cursor;

/// 1枚のカードの描画指示
#[derive(Debug, Clone)]
pub struct CardDescriptor {
    pub person: ResolvedPerson,
    pub side: CardSide,
    pub width_px: u32,
    pub height_px: u32,
    /// 顔写真（表面のみ）
    pub photo: Option<Vec<u8>>,
    pub theme: CardTheme,
    pub company_name: Option<String>,
    /// 会社ロゴ（表面ヘッダーに表示）
    pub logo: Option<Vec<u8>>,
}

impl CardDescriptor {
    pub fn new(person: ResolvedPerson, side: CardSide, geometry: &CardGeometry, theme: CardTheme) -> Self {
        Self {
            person,
            side,
            width_px: geometry.card_width_px,
            height_px: geometry.card_height_px,
            photo: None,
            theme,
            company_name: None,
            logo: None,
        }
    }

    pub fn with_photo(mut self, photo: Vec<u8>) -> Self {
        self.photo = Some(photo);
        self
    }

    pub fn with_company_name(mut self, name: Option<String>) -> Self {
        self.company_name = name;
        self
    }

    pub fn with_logo(mut self, logo: Option<Vec<u8>>) -> Self {
        self.logo = logo;
        self
    }

    fn failure(&self, reason: impl Into<String>) -> BadgeError {
        BadgeError::RenderFailure {
            person_id: self.person.person_id.clone(),
            side: self.side,
            reason: reason.into(),
        }
    }
}

/// カード画像を生成する外部機能
///
/// 実装は共有の描画面を持つことがあるため、呼び出し側は1枚ずつ順に呼ぶ。
#[async_trait]
pub trait RenderAdapter: Send + Sync {
    /// 描画してエンコード済みのラスタ画像（PNG等）を返す
    async fn render(&self, descriptor: &CardDescriptor) -> Result<Vec<u8>>;
}

/// レンダラを呼び、戻り値の寸法を検証する
pub async fn render_checked<R>(renderer: &R, descriptor: &CardDescriptor) -> Result<Vec<u8>>
where
    R: RenderAdapter + ?Sized,
{
    let bytes = renderer.render(descriptor).await.map_err(|e| match e {
        e @ BadgeError::RenderFailure { .. } => e,
        other => descriptor.failure(other.to_string()),
    })?;

    let (width, height) = raster_dimensions(&bytes).map_err(|reason| descriptor.failure(reason))?;
    if (width, height) != (descriptor.width_px, descriptor.height_px) {
        return Err(descriptor.failure(format!(
            "画像サイズが {}x{} ではなく {}x{} です",
            descriptor.width_px, descriptor.height_px, width, height
        )));
    }

    Ok(bytes)
}

/// エンコード済み画像のヘッダーからピクセル寸法を読む（全体はデコードしない）
pub fn raster_dimensions(bytes: &[u8]) -> std::result::Result<(u32, u32), String> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("画像形式の判定に失敗: {}", e))?
        .into_dimensions()
        .map_err(|e| format!("画像ヘッダーの読み込みに失敗: {}", e))
}
