//! カード配置レイアウトモジュール
//!
//! CR80カード（3.370in × 2.125in）をA4用紙に格子状に並べるための寸法計算。
//! インチ基準の定数を Source of Truth とし、pt / px はすべて導出値。
//!
//! ## 座標系
//! 配置座標は **左下原点**（PDFのユーザー空間と同じ）で、
//! 各座標はカードの左下隅を指す。行0が用紙の最上段で、スロット番号は行優先。
//! 左上原点が必要な場合は [`CardGeometry::to_top_left`] で変換する。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================
// インチ基準（Source of Truth）
// ============================================

/// CR80カードサイズ（インチ）
pub const CARD_WIDTH_IN: f32 = 3.370;
pub const CARD_HEIGHT_IN: f32 = 2.125;

/// ラスタ解像度
pub const RASTER_DPI: f32 = 300.0;

/// 1インチあたりのpt
pub const POINTS_PER_INCH: f32 = 72.0;

/// A4縦（pt）
pub const A4_WIDTH_PT: f32 = 595.0;
pub const A4_HEIGHT_PT: f32 = 842.0;

/// 既定の格子: 2列 × 5行 = 10枚/ページ
pub const DEFAULT_ROWS: u32 = 5;
pub const DEFAULT_COLS: u32 = 2;

/// 既定の余白・間隔（pt）
pub const DEFAULT_MARGIN_X_PT: f32 = 40.0;
pub const DEFAULT_MARGIN_Y_PT: f32 = 36.0;
pub const DEFAULT_GAP_X_PT: f32 = 10.0;
pub const DEFAULT_GAP_Y_PT: f32 = 10.0;

// ============================================
// 変換
// ============================================

/// インチ → pt 変換
#[inline]
pub fn in_to_pt(inches: f32) -> f32 {
    inches * POINTS_PER_INCH
}

/// インチ → px 変換（四捨五入）
#[inline]
pub fn in_to_px(inches: f32, dpi: f32) -> u32 {
    (inches * dpi).round() as u32
}

// ============================================
// 格子設定
// ============================================

/// 用紙上の格子設定（pt）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
    pub margin_x_pt: f32,
    pub margin_y_pt: f32,
    pub gap_x_pt: f32,
    pub gap_y_pt: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            margin_x_pt: DEFAULT_MARGIN_X_PT,
            margin_y_pt: DEFAULT_MARGIN_Y_PT,
            gap_x_pt: DEFAULT_GAP_X_PT,
            gap_y_pt: DEFAULT_GAP_Y_PT,
        }
    }
}

impl GridSpec {
    /// 1ページの枚数（桁あふれする格子は None）
    pub fn capacity(&self) -> Option<usize> {
        (self.rows as usize).checked_mul(self.cols as usize)
    }

    /// 格子1セルの大きさ（pt）
    fn cell_size(&self) -> (f32, f32) {
        let usable_width = A4_WIDTH_PT - self.margin_x_pt * 2.0;
        let usable_height = A4_HEIGHT_PT - self.margin_y_pt * 2.0;
        let total_gap_x = self.gap_x_pt * (self.cols as f32 - 1.0);
        let total_gap_y = self.gap_y_pt * (self.rows as f32 - 1.0);
        (
            (usable_width - total_gap_x) / self.cols as f32,
            (usable_height - total_gap_y) / self.rows as f32,
        )
    }
}

/// 配置座標の原点。出力は常に左下原点。
pub const ORIGIN_BOTTOM_LEFT: &str = "bottom_left";

/// カード1枚の配置座標（pt）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellPosition {
    pub x: f32,
    pub y: f32,
}

// ============================================
// カード寸法
// ============================================

/// カード・用紙・格子の寸法一式
///
/// 定数と [`GridSpec`] だけから決まる不変値。
/// 複数のエクスポートから `Arc` で共有してよい。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardGeometry {
    pub card_width_in: f32,
    pub card_height_in: f32,
    pub dpi: f32,
    pub card_width_px: u32,
    pub card_height_px: u32,
    pub card_width_pt: f32,
    pub card_height_pt: f32,
    pub sheet_width_pt: f32,
    pub sheet_height_pt: f32,
    pub grid: GridSpec,
    pub cell_width_pt: f32,
    pub cell_height_pt: f32,
    pub origin: &'static str,
    /// スロット順（行優先）の配置座標
    pub positions: Vec<CellPosition>,
}

impl CardGeometry {
    /// 既定格子（2×5）でのCR80 / A4 寸法
    pub fn cr80_a4() -> Self {
        Self::build(&GridSpec::default())
    }

    /// 格子設定から寸法を計算
    ///
    /// カードが用紙からはみ出す、または隣のカードと重なる格子は InvalidGrid。
    pub fn compute(grid: &GridSpec) -> Result<Self> {
        if grid.rows == 0 || grid.cols == 0 {
            return Err(Error::InvalidGrid(format!(
                "rows/cols must be positive ({}x{})",
                grid.rows, grid.cols
            )));
        }
        let lengths = [grid.margin_x_pt, grid.margin_y_pt, grid.gap_x_pt, grid.gap_y_pt];
        if lengths.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidGrid("margins and gaps must be finite".into()));
        }

        // 座標を作る前に、格子の端のカードだけで重なりとはみ出しを判定する
        const EPS: f32 = 0.01;
        let card_width_pt = in_to_pt(CARD_WIDTH_IN);
        let card_height_pt = in_to_pt(CARD_HEIGHT_IN);
        let (cell_width, cell_height) = grid.cell_size();
        let step_x = cell_width + grid.gap_x_pt;
        let step_y = cell_height + grid.gap_y_pt;
        if (grid.cols > 1 && card_width_pt > step_x + EPS) || (grid.rows > 1 && card_height_pt > step_y + EPS) {
            return Err(Error::InvalidGrid(format!(
                "cards overlap in a {}x{} grid",
                grid.rows, grid.cols
            )));
        }

        let left = grid.margin_x_pt + (cell_width - card_width_pt) / 2.0;
        let right = left + (grid.cols - 1) as f32 * step_x + card_width_pt;
        let top = grid.margin_y_pt + (cell_height - card_height_pt) / 2.0;
        let bottom = top + (grid.rows - 1) as f32 * step_y + card_height_pt;
        if left < -EPS || top < -EPS || right > A4_WIDTH_PT + EPS || bottom > A4_HEIGHT_PT + EPS {
            return Err(Error::InvalidGrid(format!(
                "cards fall outside the sheet in a {}x{} grid",
                grid.rows, grid.cols
            )));
        }

        let geometry = Self::build(grid);
        for (slot, pos) in geometry.positions.iter().enumerate() {
            let inside = pos.x >= -EPS
                && pos.y >= -EPS
                && pos.x + geometry.card_width_pt <= A4_WIDTH_PT + EPS
                && pos.y + geometry.card_height_pt <= A4_HEIGHT_PT + EPS;
            if !inside {
                return Err(Error::InvalidGrid(format!(
                    "slot {} ({:.2}, {:.2}) is outside the sheet",
                    slot, pos.x, pos.y
                )));
            }
        }

        Ok(geometry)
    }

    /// 格子が妥当であることは呼び出し側で保証する
    fn build(grid: &GridSpec) -> Self {
        let card_width_pt = in_to_pt(CARD_WIDTH_IN);
        let card_height_pt = in_to_pt(CARD_HEIGHT_IN);

        let (cell_width_pt, cell_height_pt) = grid.cell_size();

        let mut positions = Vec::with_capacity(grid.capacity().unwrap_or(0));
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let cell_x = grid.margin_x_pt + col as f32 * (cell_width_pt + grid.gap_x_pt);
                let cell_y = grid.margin_y_pt + row as f32 * (cell_height_pt + grid.gap_y_pt);
                // セル中央に配置し、上端基準のセル座標を左下原点に変換
                let x = cell_x + (cell_width_pt - card_width_pt) / 2.0;
                let y = A4_HEIGHT_PT
                    - (cell_y + card_height_pt)
                    - (cell_height_pt - card_height_pt) / 2.0;
                positions.push(CellPosition { x, y });
            }
        }

        Self {
            card_width_in: CARD_WIDTH_IN,
            card_height_in: CARD_HEIGHT_IN,
            dpi: RASTER_DPI,
            card_width_px: in_to_px(CARD_WIDTH_IN, RASTER_DPI),
            card_height_px: in_to_px(CARD_HEIGHT_IN, RASTER_DPI),
            card_width_pt,
            card_height_pt,
            sheet_width_pt: A4_WIDTH_PT,
            sheet_height_pt: A4_HEIGHT_PT,
            grid: *grid,
            cell_width_pt,
            cell_height_pt,
            origin: ORIGIN_BOTTOM_LEFT,
            positions,
        }
    }

    /// 1ページあたりのカード枚数
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// 通し番号 → (ページ, スロット)
    pub fn page_and_slot(&self, index: usize) -> (usize, usize) {
        (index / self.capacity(), index % self.capacity())
    }

    /// 配置座標 → スロット番号（格子上にない座標は None）
    pub fn slot_at(&self, pos: CellPosition) -> Option<usize> {
        let grid = &self.grid;
        let step_x = self.cell_width_pt + grid.gap_x_pt;
        let step_y = self.cell_height_pt + grid.gap_y_pt;

        let cell_x = pos.x - (self.cell_width_pt - self.card_width_pt) / 2.0;
        let cell_y = self.sheet_height_pt
            - pos.y
            - self.card_height_pt
            - (self.cell_height_pt - self.card_height_pt) / 2.0;

        let col = ((cell_x - grid.margin_x_pt) / step_x).round();
        let row = ((cell_y - grid.margin_y_pt) / step_y).round();
        if col < 0.0 || row < 0.0 || col >= grid.cols as f32 || row >= grid.rows as f32 {
            return None;
        }

        let slot = row as usize * grid.cols as usize + col as usize;
        let expected = self.positions[slot];
        let close = (expected.x - pos.x).abs() < 0.5 && (expected.y - pos.y).abs() < 0.5;
        close.then_some(slot)
    }

    /// 左下原点の座標を左上原点（カード左上隅）に変換
    pub fn to_top_left(&self, pos: CellPosition) -> CellPosition {
        CellPosition {
            x: pos.x,
            y: self.sheet_height_pt - pos.y - self.card_height_pt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_dimensions() {
        let g = CardGeometry::cr80_a4();
        assert_eq!(g.card_width_px, 1011);
        assert_eq!(g.card_height_px, 638);
        assert!((g.card_width_pt - 242.64).abs() < 0.01);
        assert!((g.card_height_pt - 153.0).abs() < 0.01);
        assert_eq!(g.origin, ORIGIN_BOTTOM_LEFT);
    }

    #[test]
    fn test_default_grid() {
        let g = CardGeometry::cr80_a4();
        assert_eq!(g.capacity(), 10);
        assert!((g.cell_width_pt - 252.5).abs() < 0.01);
        assert!((g.cell_height_pt - 146.0).abs() < 0.01);

        // 最上段の左列: x = 40 + (252.5 - 242.64) / 2, y = 842 - 189 + 3.5
        let first = g.positions[0];
        assert!((first.x - 44.93).abs() < 0.01);
        assert!((first.y - 656.5).abs() < 0.01);

        // 行優先: スロット1は同じ行の右列
        assert!((g.positions[1].y - first.y).abs() < f32::EPSILON);
        assert!(g.positions[1].x > first.x);
        // 下の行ほど y が小さい（左下原点）
        assert!(g.positions[2].y < first.y);
    }

    #[test]
    fn test_all_cards_inside_sheet() {
        let g = CardGeometry::cr80_a4();
        for pos in &g.positions {
            assert!(pos.x >= 0.0 && pos.y >= 0.0);
            assert!(pos.x + g.card_width_pt <= A4_WIDTH_PT);
            assert!(pos.y + g.card_height_pt <= A4_HEIGHT_PT);
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        let a = CardGeometry::compute(&GridSpec::default()).unwrap();
        let b = CardGeometry::compute(&GridSpec::default()).unwrap();
        let bits = |g: &CardGeometry| -> Vec<(u32, u32)> {
            g.positions.iter().map(|p| (p.x.to_bits(), p.y.to_bits())).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_slot_round_trip() {
        let g = CardGeometry::cr80_a4();
        for (slot, pos) in g.positions.iter().enumerate() {
            assert_eq!(g.slot_at(*pos), Some(slot));
        }
        assert_eq!(g.slot_at(CellPosition { x: 0.0, y: 0.0 }), None);
    }

    #[test]
    fn test_to_top_left() {
        let g = CardGeometry::cr80_a4();
        let top = g.to_top_left(g.positions[0]);
        // 最上段のカード上端は用紙上端から 36 - 3.5 = 32.5pt
        assert!((top.y - 32.5).abs() < 0.01);
    }

    #[test]
    fn test_invalid_grid() {
        let zero = GridSpec { rows: 0, ..GridSpec::default() };
        assert!(matches!(CardGeometry::compute(&zero), Err(Error::InvalidGrid(_))));

        let too_many = GridSpec { rows: 8, ..GridSpec::default() };
        assert!(matches!(CardGeometry::compute(&too_many), Err(Error::InvalidGrid(_))));

        // 間隔が広すぎて左右のカードが用紙からはみ出す
        let wide_gap = GridSpec { rows: 1, cols: 2, margin_x_pt: 0.0, gap_x_pt: 300.0, ..GridSpec::default() };
        assert!(matches!(CardGeometry::compute(&wide_gap), Err(Error::InvalidGrid(_))));

        let nan_gap = GridSpec { gap_x_pt: f32::NAN, ..GridSpec::default() };
        assert!(matches!(CardGeometry::compute(&nan_gap), Err(Error::InvalidGrid(_))));
    }

    #[test]
    fn test_huge_grid_is_rejected_without_building() {
        for grid in [
            GridSpec { rows: 70_000, cols: 70_000, ..GridSpec::default() },
            GridSpec { rows: u32::MAX, cols: u32::MAX, ..GridSpec::default() },
            GridSpec { rows: 1, cols: u32::MAX, ..GridSpec::default() },
            GridSpec {
                rows: 1,
                cols: 1_000_000,
                margin_x_pt: -1.0e9,
                ..GridSpec::default()
            },
        ] {
            assert!(
                matches!(CardGeometry::compute(&grid), Err(Error::InvalidGrid(_))),
                "格子 {}x{} が受理された",
                grid.rows,
                grid.cols
            );
        }
    }

    #[test]
    fn test_grid_capacity_is_checked() {
        assert_eq!(GridSpec::default().capacity(), Some(10));
        let huge = GridSpec { rows: u32::MAX, cols: u32::MAX, ..GridSpec::default() };
        let expected = (u32::MAX as usize).checked_mul(u32::MAX as usize);
        assert_eq!(huge.capacity(), expected);
    }

    #[test]
    fn test_single_column_grid() {
        let grid = GridSpec { rows: 4, cols: 1, ..GridSpec::default() };
        let g = CardGeometry::compute(&grid).unwrap();
        assert_eq!(g.capacity(), 4);
        let center = g.positions[0].x + g.card_width_pt / 2.0;
        assert!((center - A4_WIDTH_PT / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_conversion() {
        assert!((in_to_pt(CARD_WIDTH_IN) - 242.64).abs() < 0.001);
        assert_eq!(in_to_px(CARD_HEIGHT_IN, RASTER_DPI), 638);
    }
}
