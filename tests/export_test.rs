//! カード出力（A4シートPDF・単票ZIP）の統合テスト

use async_trait::async_trait;
use badgeflow::common::export::sheet_core::plan_sheets;
use badgeflow::common::{parse_delimited, CardGeometry, CardSide, ColumnPolicy};
use badgeflow::error::{BadgeError, Result};
use badgeflow::export::{ExportArtifacts, BACKS_FILE, FRONTS_FILE, SINGLES_FILE};
use badgeflow::pipeline::{reconcile_batch, run_export, BatchReconciliation, PipelineOptions};
use badgeflow::render::{CardDescriptor, CardRasterizer, RenderAdapter};
use badgeflow::storage::LocalStorage;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::Document;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;
use zip::ZipArchive;

fn png(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([30, 60, 90, 255])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("PNGエンコード失敗");
    buf
}

/// 指定サイズの単色画像を返し、呼ばれた順を記録するレンダラ
struct FixedRenderer {
    image: Vec<u8>,
    calls: Mutex<Vec<(String, CardSide)>>,
    fail_at: Option<usize>,
}

impl FixedRenderer {
    fn new(w: u32, h: u32) -> Self {
        Self {
            image: png(w, h),
            calls: Mutex::new(Vec::new()),
            fail_at: None,
        }
    }

    fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }
}

#[async_trait]
impl RenderAdapter for FixedRenderer {
    async fn render(&self, descriptor: &CardDescriptor) -> Result<Vec<u8>> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((descriptor.person.person_id.clone(), descriptor.side));
        if Some(calls.len() - 1) == self.fail_at {
            return Err(BadgeError::RenderFailure {
                person_id: descriptor.person.person_id.clone(),
                side: descriptor.side,
                reason: "timeout".into(),
            });
        }
        Ok(self.image.clone())
    }
}

/// count 人分の名簿と写真を用意する
async fn prepare_batch(dir: &Path, count: usize, missing: usize) -> (LocalStorage, BatchReconciliation) {
    let photos = dir.join("photos");
    std::fs::create_dir_all(&photos).unwrap();

    let mut roster = String::from("employee_id,first_name,last_name,photo_filename\n");
    for i in 0..count + missing {
        roster.push_str(&format!("E{:03},First{},Last {},e{:03}.jpg\n", i, i, i, i));
        if i < count {
            std::fs::write(photos.join(format!("E{:03}.JPG", i)), png(60, 80)).unwrap();
        }
    }

    let storage = LocalStorage::new(&photos);
    let parsed = parse_delimited(roster.as_bytes(), ',').unwrap();
    let batch = reconcile_batch(parsed, &storage, "", ColumnPolicy::Required)
        .await
        .expect("照合に失敗");
    (storage, batch)
}

/// 各ページの MediaBox
fn media_boxes(pdf: &[u8]) -> Vec<Vec<f32>> {
    let doc = Document::load_mem(pdf).expect("PDF読み込み失敗");
    doc.get_pages()
        .values()
        .map(|id| {
            doc.get_dictionary(*id)
                .unwrap()
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_float().unwrap())
                .collect()
        })
        .collect()
}

/// ページ上の画像の配置（cm の平行移動量）
fn placements(pdf: &[u8], page: u32) -> Vec<(f32, f32)> {
    let doc = Document::load_mem(pdf).expect("PDF読み込み失敗");
    let page_id = doc.get_pages()[&page];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "cm")
        .map(|op| (op.operands[4].as_float().unwrap(), op.operands[5].as_float().unwrap()))
        .collect()
}

fn zip_entries(artifacts: &ExportArtifacts) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(Cursor::new(artifacts.singles_zip.clone())).expect("ZIP読み込み失敗");
    (0..zip.len())
        .map(|i| {
            let mut entry = zip.by_index(i).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

fn zip_names(artifacts: &ExportArtifacts) -> Vec<String> {
    let mut zip = ZipArchive::new(Cursor::new(artifacts.singles_zip.clone())).expect("ZIP読み込み失敗");
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

#[tokio::test]
async fn test_twelve_people_make_two_sheet_pages() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 12, 0).await;
    let options = PipelineOptions::default();
    let renderer = FixedRenderer::new(options.geometry.card_width_px, options.geometry.card_height_px);

    let artifacts = run_export(&batch, &storage, &renderer, &options, None)
        .await
        .expect("出力に失敗");

    assert_eq!(artifacts.sheet_pages, 2);
    for pdf in [&artifacts.fronts_pdf, &artifacts.backs_pdf] {
        let boxes = media_boxes(pdf);
        assert_eq!(boxes.len(), artifacts.sheet_pages);
        for media_box in boxes {
            assert_eq!(media_box, vec![0.0, 0.0, 595.0, 842.0]);
        }
        assert_eq!(placements(pdf, 1).len(), 10);
        let second = placements(pdf, 2);
        assert_eq!(second.len(), 2);
        for (slot, (x, y)) in second.iter().enumerate() {
            assert!((x - options.geometry.positions[slot].x).abs() < 0.01);
            assert!((y - options.geometry.positions[slot].y).abs() < 0.01);
        }
    }

    let plan = plan_sheets(12, &options.geometry);
    let pages: Vec<Vec<usize>> = plan
        .pages
        .iter()
        .map(|page| page.iter().map(|p| p.index).collect())
        .collect();
    assert_eq!(pages, vec![(0..10).collect::<Vec<_>>(), vec![10, 11]]);

    // 表面→裏面の順で1人ずつ
    let calls = renderer.calls.lock().unwrap();
    assert_eq!(calls.len(), 24);
    assert_eq!(calls[0], ("E000".to_string(), CardSide::Front));
    assert_eq!(calls[1], ("E000".to_string(), CardSide::Back));
    assert_eq!(calls[23], ("E011".to_string(), CardSide::Back));
}

#[tokio::test]
async fn test_singles_only_for_matched_people() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 3, 2).await;
    assert_eq!(batch.summary.missing, 2);

    let options = PipelineOptions::default();
    let renderer = FixedRenderer::new(options.geometry.card_width_px, options.geometry.card_height_px);
    let artifacts = run_export(&batch, &storage, &renderer, &options, None).await.unwrap();

    assert_eq!(artifacts.single_count, 3);
    assert_eq!(
        zip_names(&artifacts),
        vec!["E000_First0_Last_0.pdf", "E001_First1_Last_1.pdf", "E002_First2_Last_2.pdf"]
    );

    // 各単票は表裏2ページでカード実寸
    for (name, pdf) in zip_entries(&artifacts) {
        let boxes = media_boxes(&pdf);
        assert_eq!(boxes.len(), 2, "{} のページ数", name);
        for media_box in boxes {
            assert!((media_box[2] - 242.64).abs() < 0.001, "{} の幅 {}", name, media_box[2]);
            assert!((media_box[3] - 153.0).abs() < 0.001, "{} の高さ {}", name, media_box[3]);
        }
        assert_eq!(placements(&pdf, 1), vec![(0.0, 0.0)]);
        assert_eq!(placements(&pdf, 2), vec![(0.0, 0.0)]);
    }
}

#[tokio::test]
async fn test_write_artifacts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 2, 0).await;
    let options = PipelineOptions::default();
    let renderer = FixedRenderer::new(options.geometry.card_width_px, options.geometry.card_height_px);
    let artifacts = run_export(&batch, &storage, &renderer, &options, None).await.unwrap();

    let out = dir.path().join("out");
    let written = artifacts.write_to(&out).unwrap();
    assert_eq!(written.len(), 3);
    for name in [FRONTS_FILE, BACKS_FILE, SINGLES_FILE] {
        let metadata = std::fs::metadata(out.join(name)).expect("ファイルが作成されていない");
        assert!(metadata.len() > 0, "{} が空", name);
    }
}

#[tokio::test]
async fn test_render_failure_aborts_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 4, 0).await;
    let options = PipelineOptions::default();
    // 2人目の裏面で失敗
    let renderer = FixedRenderer::new(options.geometry.card_width_px, options.geometry.card_height_px)
        .failing_at(3);

    let err = run_export(&batch, &storage, &renderer, &options, None).await.unwrap_err();
    match err {
        BadgeError::RenderFailure { person_id, side, .. } => {
            assert_eq!(person_id, "E001");
            assert_eq!(side, CardSide::Back);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // 失敗後は描画しない
    assert_eq!(renderer.calls.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_wrong_size_raster_is_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 1, 0).await;
    let options = PipelineOptions::default();
    let renderer = FixedRenderer::new(1000, 638);

    let err = run_export(&batch, &storage, &renderer, &options, None).await.unwrap_err();
    assert!(matches!(err, BadgeError::RenderFailure { side: CardSide::Front, .. }));
}

#[tokio::test]
async fn test_nothing_matched_is_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 0, 2).await;
    let options = PipelineOptions::default();
    let renderer = FixedRenderer::new(options.geometry.card_width_px, options.geometry.card_height_px);

    let err = run_export(&batch, &storage, &renderer, &options, None).await.unwrap_err();
    assert!(matches!(err, BadgeError::NothingToExport));
    assert!(renderer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_builtin_rasterizer_end_to_end() {
    let dir = tempdir().expect("Failed to create temp dir");
    let (storage, batch) = prepare_batch(dir.path(), 2, 1).await;
    let geometry = CardGeometry::cr80_a4();
    let renderer = CardRasterizer::new(geometry.card_width_px, geometry.card_height_px);

    let artifacts = run_export(&batch, &storage, &renderer, &PipelineOptions::default(), None)
        .await
        .expect("組み込みレンダラでの出力に失敗");
    assert_eq!(artifacts.single_count, 2);
    assert_eq!(artifacts.sheet_pages, 1);
}
