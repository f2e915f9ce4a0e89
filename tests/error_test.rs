//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use badgeflow::common::{CardGeometry, CardSide, Error as CommonError, GridSpec};
use badgeflow::error::BadgeError;
use badgeflow::roster::{load_roster, parse_roster, RosterFormat};
use badgeflow::storage::{stage_batch, AssetStorage, LocalStorage};
use std::path::Path;
use tempfile::tempdir;

/// 存在しない名簿ファイル
#[test]
fn test_load_nonexistent_roster() {
    let result = load_roster(Path::new("/nonexistent/path/roster.csv"));
    assert!(matches!(result, Err(BadgeError::FileNotFound(_))));
}

/// 空の名簿
#[test]
fn test_empty_roster_is_malformed() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "\n  \n").unwrap();

    let err = load_roster(&path).unwrap_err();
    assert!(matches!(err, BadgeError::Common(CommonError::MalformedInput(_))));
    assert!(err.is_input_error());
}

/// UTF-8 でない名簿
#[test]
fn test_non_utf8_roster() {
    let result = parse_roster(&[0xFF, 0xFE, 0x00], RosterFormat::Delimited { delimiter: ',' });
    assert!(matches!(result, Err(BadgeError::Common(CommonError::MalformedInput(_)))));
}

/// ヘッダーのみの名簿はエラーではない
#[test]
fn test_header_only_roster() {
    let roster = parse_roster(b"photo_filename,name\n", RosterFormat::Delimited { delimiter: ',' })
        .expect("ヘッダーのみでも読み込める");
    assert!(roster.records.is_empty());
}

/// 列数不足の行は警告として残る
#[test]
fn test_short_rows_reported() {
    let roster = parse_roster(
        b"photo_filename,name,id\nA.jpg,Ann,1\nB.jpg\n",
        RosterFormat::Delimited { delimiter: ',' },
    )
    .unwrap();
    assert_eq!(roster.records.len(), 1);
    assert_eq!(roster.warnings.len(), 1);
    assert_eq!(roster.warnings[0].line, 3);
}

/// 用紙に収まらない格子
#[test]
fn test_invalid_grid() {
    for grid in [
        GridSpec { rows: 0, ..GridSpec::default() },
        GridSpec { cols: 0, ..GridSpec::default() },
        GridSpec { rows: 8, ..GridSpec::default() },
    ] {
        let result = CardGeometry::compute(&grid);
        assert!(
            matches!(result, Err(CommonError::InvalidGrid(_))),
            "格子 {:?} が受理された",
            grid
        );
    }
}

/// 写真の取得失敗
#[tokio::test]
async fn test_fetch_missing_asset() {
    let dir = tempdir().expect("Failed to create temp dir");
    let storage = LocalStorage::new(dir.path());

    let err = storage.fetch("batch/photos/none.jpg").await.unwrap_err();
    match err {
        BadgeError::AssetFetchFailure { path, .. } => assert_eq!(path, "batch/photos/none.jpg"),
        other => panic!("unexpected error: {:?}", other),
    }
}

/// 存在しない写真フォルダを保存しようとした場合
#[tokio::test]
async fn test_stage_nonexistent_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let storage = LocalStorage::new(dir.path());

    let result = stage_batch(&storage, "batch-1", None, None, Path::new("/nonexistent/photos")).await;
    assert!(matches!(result, Err(BadgeError::FolderNotFound(_))));
}

/// 桁あふれする格子はパニックせずに InvalidGrid
#[test]
fn test_huge_grid_from_config() {
    let grid = GridSpec { rows: 70_000, cols: 70_000, ..GridSpec::default() };
    assert!(matches!(CardGeometry::compute(&grid), Err(CommonError::InvalidGrid(_))));
}

/// 存在しないロゴ
#[tokio::test]
async fn test_stage_missing_logo() {
    let src = tempdir().expect("Failed to create temp dir");
    let photos = src.path().join("photos");
    std::fs::create_dir_all(&photos).unwrap();
    let dest = tempdir().expect("Failed to create temp dir");
    let storage = LocalStorage::new(dest.path());

    let missing = src.path().join("logo.png");
    let result = stage_batch(&storage, "batch-1", None, Some(&missing), &photos).await;
    assert!(matches!(result, Err(BadgeError::FileNotFound(_))));
}

/// エラーメッセージに人物IDと面が含まれる
#[test]
fn test_render_failure_message() {
    let err = BadgeError::RenderFailure {
        person_id: "E0001".to_string(),
        side: CardSide::Back,
        reason: "timeout".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("E0001"));
    assert!(message.contains("BACK"));
    assert!(!err.is_input_error());
}

#[test]
fn test_pdf_error_message() {
    let err = BadgeError::from(lopdf::Error::Unimplemented("test"));
    assert!(err.to_string().starts_with("PDF生成エラー"));
}

#[test]
fn test_embed_failure_message() {
    let err = BadgeError::EmbedFailure {
        index: 7,
        side: CardSide::Front,
        reason: "decode".to_string(),
    };
    assert!(err.to_string().contains("FRONT #7"));
}
