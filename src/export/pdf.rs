//! PDF 生成（A4 シート・カード単票）
//!
//! 座標は CardGeometry の左下原点（pt）をそのまま使う。
//! 配置計算は common の sheet_core に任せ、ここでは画像の埋め込みだけを行う。
//! 画像は1枚ずつデコードして圧縮ストリームにし、画素は次の画像に進む前に手放す。

use crate::error::{BadgeError, Result};
use crate::render::raster_dimensions;
use badgeflow_common::export::sheet_core::plan_sheets;
use badgeflow_common::{CardGeometry, CardSide};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// ページ寸法は 0.01pt 単位に丸める（242.64 × 153 など）
fn pt(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// ページに置く画像1枚
struct PlacedImage {
    id: ObjectId,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// ページを順に追加していく文書
struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfWriter {
    fn new(title: &str) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("badgeflow"),
        });
        doc.trailer.set("Info", info_id);
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// 画像を検証・デコードし、圧縮した画像 XObject として登録する
    fn embed_image(&mut self, bytes: &[u8], index: usize, side: CardSide, geometry: &CardGeometry) -> Result<ObjectId> {
        let failure = |reason: String| BadgeError::EmbedFailure { index, side, reason };

        let (width, height) = raster_dimensions(bytes).map_err(failure)?;
        if (width, height) != (geometry.card_width_px, geometry.card_height_px) {
            return Err(failure(format!(
                "画像サイズ {}x{} がカード寸法 {}x{} と一致しません",
                width, height, geometry.card_width_px, geometry.card_height_px
            )));
        }

        let pixels = image::load_from_memory(bytes)
            .map_err(|e| failure(format!("画像デコードエラー: {}", e)))?
            .into_rgb8()
            .into_raw();

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels,
        );
        stream
            .compress()
            .map_err(|e| failure(format!("画像圧縮エラー: {}", e)))?;
        Ok(self.doc.add_object(stream))
    }

    fn add_page(&mut self, width_pt: f32, height_pt: f32, images: &[PlacedImage]) -> Result<()> {
        let mut operations = Vec::with_capacity(images.len() * 4);
        let mut xobjects = lopdf::Dictionary::new();
        for (i, image) in images.iter().enumerate() {
            let name = format!("Im{}", i);
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    image.width.into(),
                    0.into(),
                    0.into(),
                    image.height.into(),
                    image.x.into(),
                    image.y.into(),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
            xobjects.set(name, image.id);
        }

        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), pt(width_pt).into(), pt(height_pt).into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc.save_to(&mut buf)?;
        Ok(buf)
    }
}

/// 片面分の画像を A4 シートに並べる
///
/// 画像 i はページ i / C、スロット i % C に置く。
pub fn compose_sheet(images: &[&[u8]], side: CardSide, geometry: &CardGeometry) -> Result<Vec<u8>> {
    if images.is_empty() {
        return Err(BadgeError::NothingToExport);
    }

    let mut writer = PdfWriter::new(&format!("BadgeFlow {} sheet", side));
    let plan = plan_sheets(images.len(), geometry);

    for placements in &plan.pages {
        let mut placed = Vec::with_capacity(placements.len());
        for placement in placements {
            let id = writer.embed_image(images[placement.index], placement.index, side, geometry)?;
            placed.push(PlacedImage {
                id,
                x: placement.position.x,
                y: placement.position.y,
                width: placement.width_pt,
                height: placement.height_pt,
            });
        }
        writer.add_page(geometry.sheet_width_pt, geometry.sheet_height_pt, &placed)?;
    }

    tracing::debug!(side = %side, cards = images.len(), pages = plan.page_count(), "シートPDFを作成");
    writer.finish()
}

/// カード実寸の2ページ PDF（1ページ目表面、2ページ目裏面）
///
/// index は出力順のカード番号（エラー表示用）。
pub fn build_single_document(
    index: usize,
    front: &[u8],
    back: &[u8],
    geometry: &CardGeometry,
) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new("BadgeFlow card");
    let (page_w, page_h) = (pt(geometry.card_width_pt), pt(geometry.card_height_pt));

    for (side, bytes) in [(CardSide::Front, front), (CardSide::Back, back)] {
        let id = writer.embed_image(bytes, index, side, geometry)?;
        let image = PlacedImage {
            id,
            x: 0.0,
            y: 0.0,
            width: page_w,
            height: page_h,
        };
        writer.add_page(page_w, page_h, &[image])?;
    }

    writer.finish()
}
