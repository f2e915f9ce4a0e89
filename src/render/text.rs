//! カード上の文字描画
//!
//! TrueType / OpenType の輪郭を tiny-skia のマスクに塗り、その濃度で描画面に色を重ねる。

use crate::error::{BadgeError, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tiny_skia::{FillRule, Mask, PathBuilder, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// カード描画用のフォント
#[derive(Clone)]
pub struct CardFont {
    data: Vec<u8>,
}

impl std::fmt::Debug for CardFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardFont").field("bytes", &self.data.len()).finish()
    }
}

impl CardFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Face::parse(&data, 0).map_err(|e| BadgeError::Config(format!("フォントの読み込みに失敗: {}", e)))?;
        Ok(Self { data })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|_| BadgeError::FileNotFound(path.display().to_string()))?;
        Self::from_bytes(data)
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }

    /// size_px で描いたときの文字列の幅
    pub fn text_width(&self, text: &str, size_px: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let scale = size_px / f32::from(face.units_per_em());
        text.chars()
            .map(|c| advance(&face, glyph_id(&face, c)) * scale)
            .sum()
    }

    /// 1行を origin（左上）から描く。max_width を超える場合は縮小する。
    pub fn draw_line(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        origin: (u32, u32),
        size_px: f32,
        max_width: u32,
        color: [u8; 3],
    ) {
        let text = text.trim();
        let Some(face) = self.face() else {
            return;
        };
        if text.is_empty() || max_width == 0 || size_px <= 0.0 {
            return;
        }

        let width = self.text_width(text, size_px);
        let size_px = if width > max_width as f32 {
            size_px * max_width as f32 / width
        } else {
            size_px
        };

        let scale = size_px / f32::from(face.units_per_em());
        let line_height = (size_px * 1.3).ceil() as u32;
        let mut outline = GlyphOutline {
            builder: PathBuilder::new(),
            x: 0.0,
            baseline: f32::from(face.ascender()) * scale,
            scale,
        };
        for c in text.chars() {
            let id = glyph_id(&face, c);
            face.outline_glyph(id, &mut outline);
            outline.x += advance(&face, id) * scale;
        }

        let Some(path) = outline.builder.finish() else {
            return;
        };
        let Some(mut mask) = Mask::new(max_width, line_height) else {
            return;
        };
        mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
        blend_mask(canvas, &mask, origin, color);
    }
}

fn glyph_id(face: &Face<'_>, c: char) -> GlyphId {
    face.glyph_index(c).unwrap_or(GlyphId(0))
}

fn advance(face: &Face<'_>, id: GlyphId) -> f32 {
    f32::from(face.glyph_hor_advance(id).unwrap_or(0))
}

/// フォント単位の輪郭をピクセル座標（y 下向き）に変換して積む
struct GlyphOutline {
    builder: PathBuilder,
    x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphOutline {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// マスクの濃度を不透明度として色を重ねる（描画面外は切り捨て）
fn blend_mask(canvas: &mut RgbaImage, mask: &Mask, (x, top): (u32, u32), color: [u8; 3]) {
    let width = mask.width();
    for (i, &coverage) in mask.data().iter().enumerate() {
        if coverage == 0 {
            continue;
        }
        let px = x + i as u32 % width;
        let py = top + i as u32 / width;
        if px >= canvas.width() || py >= canvas.height() {
            continue;
        }
        let alpha = u32::from(coverage);
        let dst = canvas.get_pixel(px, py).0;
        let mix = |src: u8, dst: u8| ((u32::from(src) * alpha + u32::from(dst) * (255 - alpha)) / 255) as u8;
        canvas.put_pixel(
            px,
            py,
            Rgba([mix(color[0], dst[0]), mix(color[1], dst[1]), mix(color[2], dst[2]), 0xFF]),
        );
    }
}
