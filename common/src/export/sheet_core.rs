//! シート配置計算（PDF描画から独立した純粋関数）
//!
//! 入力順 i のカードは ページ i / C、スロット i % C に置く（C = 1ページの枚数）。
//! 各ページは毎回 CardGeometry の座標から作るので、ページ間で位置がずれない。

use crate::layout::{CardGeometry, CellPosition};

/// カード1枚の配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// 入力順の通し番号
    pub index: usize,
    pub page: usize,
    pub slot: usize,
    /// 左下原点（pt）
    pub position: CellPosition,
    pub width_pt: f32,
    pub height_pt: f32,
}

/// 全ページの配置計画
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetPlan {
    pub pages: Vec<Vec<Placement>>,
}

impl SheetPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.pages.iter().flatten()
    }
}

/// count 枚のカードを配置する
pub fn plan_sheets(count: usize, geometry: &CardGeometry) -> SheetPlan {
    let capacity = geometry.capacity();
    let mut pages: Vec<Vec<Placement>> = Vec::with_capacity(count.div_ceil(capacity));

    for index in 0..count {
        let (page, slot) = geometry.page_and_slot(index);
        if slot == 0 {
            pages.push(Vec::with_capacity(capacity));
        }
        let placement = Placement {
            index,
            page,
            slot,
            position: geometry.positions[slot],
            width_pt: geometry.card_width_pt,
            height_pt: geometry.card_height_pt,
        };
        if let Some(current) = pages.last_mut() {
            current.push(placement);
        }
    }

    SheetPlan { pages }
}
