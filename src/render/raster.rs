//! 組み込みのカード描画（image クレートによるラスタ描画）
//!
//! フォントを渡すと氏名・役職・会社名などを文字で描く。
//! フォントがなければ文字欄は帯で示し、配色・顔写真枠・ID 由来の縞模様で表裏を描き分ける。

use super::{CardDescriptor, CardFont, CardTheme, RenderAdapter};
use crate::error::{BadgeError, Result};
use async_trait::async_trait;
use badgeflow_common::CardSide;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tokio::sync::Mutex;

/// 描画面を1枚だけ持ち、呼び出しごとに塗り直して使う
pub struct CardRasterizer {
    canvas: Mutex<RgbaImage>,
    font: Option<CardFont>,
}

impl CardRasterizer {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            canvas: Mutex::new(RgbaImage::new(width_px, height_px)),
            font: None,
        }
    }

    pub fn with_font(mut self, font: Option<CardFont>) -> Self {
        self.font = font;
        self
    }
}

#[async_trait]
impl RenderAdapter for CardRasterizer {
    async fn render(&self, descriptor: &CardDescriptor) -> Result<Vec<u8>> {
        let mut canvas = self.canvas.lock().await;
        if canvas.dimensions() != (descriptor.width_px, descriptor.height_px) {
            *canvas = RgbaImage::new(descriptor.width_px, descriptor.height_px);
        }

        match descriptor.side {
            CardSide::Front => draw_front(&mut canvas, descriptor, self.font.as_ref())?,
            CardSide::Back => draw_back(&mut canvas, descriptor, self.font.as_ref()),
        }

        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(canvas.clone())
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| failure(descriptor, format!("PNGエンコードに失敗: {}", e)))?;
        Ok(buf)
    }
}

fn failure(descriptor: &CardDescriptor, reason: String) -> BadgeError {
    BadgeError::RenderFailure {
        person_id: descriptor.person.person_id.clone(),
        side: descriptor.side,
        reason,
    }
}

fn rgba(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 0xFF])
}

/// 矩形塗りつぶし（はみ出した分は切り捨て）
fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn stroke_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, t: u32, color: Rgba<u8>) {
    fill_rect(canvas, x, y, w, t, color);
    fill_rect(canvas, x, (y + h).saturating_sub(t), w, t, color);
    fill_rect(canvas, x, y, t, h, color);
    fill_rect(canvas, (x + w).saturating_sub(t), y, t, h, color);
}

fn scaled(value: u32, ratio: f32) -> u32 {
    (value as f32 * ratio).round() as u32
}

fn draw_frame(canvas: &mut RgbaImage, theme: &CardTheme) {
    let (w, h) = canvas.dimensions();
    fill_rect(canvas, 0, 0, w, h, rgba(theme.bg));
    stroke_rect(canvas, 0, 0, w, h, scaled(w, 0.004).max(1), rgba(theme.border));
}

/// ロゴを枠内に縦横比を保って置き、描いた幅を返す
fn draw_logo(
    canvas: &mut RgbaImage,
    descriptor: &CardDescriptor,
    bytes: &[u8],
    origin: (u32, u32),
    max: (u32, u32),
) -> Result<u32> {
    let logo = image::load_from_memory(bytes)
        .map_err(|e| failure(descriptor, format!("ロゴの読み込みに失敗: {}", e)))?;
    let fitted = logo.resize(max.0, max.1, FilterType::Triangle).to_rgba8();
    imageops::overlay(canvas, &fitted, origin.0 as i64, origin.1 as i64);
    Ok(fitted.width())
}

fn draw_front(canvas: &mut RgbaImage, descriptor: &CardDescriptor, font: Option<&CardFont>) -> Result<()> {
    let theme = &descriptor.theme;
    let person = &descriptor.person;
    let (w, h) = canvas.dimensions();
    draw_frame(canvas, theme);

    // ヘッダー帯（ロゴ・会社名）
    let header_h = scaled(h, 0.15);
    fill_rect(canvas, 0, 0, w, header_h, rgba(theme.primary));
    let pad = scaled(w, 0.036);
    let inset = header_h / 8;
    let mut header_x = pad;
    if let Some(bytes) = &descriptor.logo {
        let logo_w = draw_logo(
            canvas,
            descriptor,
            bytes,
            (header_x, inset),
            (scaled(w, 0.25), header_h.saturating_sub(inset * 2)),
        )?;
        header_x += logo_w + pad / 2;
    }
    if let (Some(font), Some(company)) = (font, &descriptor.company_name) {
        let size = header_h as f32 * 0.45;
        let top = (header_h as f32 - size * 1.3).max(0.0) as u32 / 2;
        font.draw_line(canvas, company, (header_x, top), size, w.saturating_sub(header_x + pad), theme.bg);
    }

    // 顔写真枠（3:3.6）
    let photo_w = scaled(w, 0.238);
    let photo_h = scaled(w, 0.286).min(h.saturating_sub(header_h + pad * 2));
    let (photo_x, photo_y) = (pad, header_h + pad);

    match &descriptor.photo {
        Some(bytes) => {
            let photo = image::load_from_memory(bytes)
                .map_err(|e| failure(descriptor, format!("顔写真の読み込みに失敗: {}", e)))?;
            let fitted = photo.resize_to_fill(photo_w, photo_h, FilterType::Triangle).to_rgba8();
            imageops::overlay(canvas, &fitted, photo_x as i64, photo_y as i64);
        }
        None => fill_rect(canvas, photo_x, photo_y, photo_w, photo_h, rgba(theme.secondary)),
    }
    stroke_rect(canvas, photo_x, photo_y, photo_w, photo_h, scaled(w, 0.003).max(1), rgba(theme.border));

    // 氏名・役職・部署（フォントがなければ表示欄を示す帯）
    let info_x = photo_x + photo_w + pad;
    let info_w = w.saturating_sub(info_x + pad);
    let mut line_y = photo_y + scaled(h, 0.04);
    let line_h = scaled(h, 0.06);
    match font {
        Some(font) => {
            let name_size = h as f32 * 0.085;
            font.draw_line(canvas, &person.display_name, (info_x, line_y), name_size, info_w, theme.text);
            line_y += (name_size * 1.5) as u32;
            for field in [&person.title, &person.department].into_iter().flatten() {
                let size = h as f32 * 0.055;
                font.draw_line(canvas, field, (info_x, line_y), size, info_w, theme.subtext);
                line_y += (size * 1.5) as u32;
            }
        }
        None => {
            fill_rect(canvas, info_x, line_y, scaled(info_w, 0.8), line_h, rgba(theme.text));
            for field in [&person.title, &person.department] {
                line_y += line_h * 2;
                if field.is_some() {
                    fill_rect(canvas, info_x, line_y, scaled(info_w, 0.5), line_h / 2, rgba(theme.subtext));
                }
            }
        }
    }

    // 下部のバッジ（ID）
    let badge_h = scaled(h, 0.07);
    let badge_y = h.saturating_sub(pad + badge_h);
    let badge_w = scaled(info_w, 0.45);
    fill_rect(canvas, info_x, badge_y, badge_w, badge_h, rgba(theme.secondary));
    if let Some(font) = font {
        let size = badge_h as f32 * 0.7;
        let inner = badge_h / 8;
        font.draw_line(
            canvas,
            &person.person_id,
            (info_x + inner * 2, badge_y + inner),
            size,
            badge_w.saturating_sub(inner * 4),
            theme.text,
        );
    }
    Ok(())
}

fn draw_back(canvas: &mut RgbaImage, descriptor: &CardDescriptor, font: Option<&CardFont>) {
    let theme = &descriptor.theme;
    let (w, h) = canvas.dimensions();
    draw_frame(canvas, theme);

    let band_h = scaled(h, 0.12);
    let band_y = h.saturating_sub(band_h);
    fill_rect(canvas, 0, band_y, w, band_h, rgba(theme.primary));
    if let (Some(font), Some(company)) = (font, &descriptor.company_name) {
        let size = band_h as f32 * 0.5;
        let pad = scaled(w, 0.036);
        font.draw_line(canvas, company, (pad, band_y + band_h / 5), size, w.saturating_sub(pad * 2), theme.bg);
    }

    // ID の各バイトから縞を作る
    let id = descriptor.person.person_id.as_bytes();
    if id.is_empty() {
        return;
    }
    let unit = scaled(w, 0.006).max(1);
    let stripe_h = scaled(h, 0.25);
    let stripe_y = (band_y / 2).saturating_sub(stripe_h / 2);
    let total: u32 = id.iter().map(|b| (u32::from(b % 4) + 1) * unit + unit).sum();
    let mut x = w.saturating_sub(total) / 2;
    for byte in id {
        let bar = (u32::from(byte % 4) + 1) * unit;
        fill_rect(canvas, x, stripe_y, bar, stripe_h, rgba(theme.text));
        x += bar + unit;
    }

    if let Some(font) = font {
        let size = h as f32 * 0.06;
        let text_w = font.text_width(&descriptor.person.person_id, size) as u32;
        let text_x = w.saturating_sub(text_w) / 2;
        let text_y = stripe_y + stripe_h + unit * 4;
        font.draw_line(
            canvas,
            &descriptor.person.person_id,
            (text_x, text_y),
            size,
            w.saturating_sub(text_x),
            theme.text,
        );
    }
}
