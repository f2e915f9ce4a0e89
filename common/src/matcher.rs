//! 名簿と写真の照合
//!
//! 照合キーは小文字化したファイル名の完全一致のみ。
//! 写真側をハッシュ索引にして O(n + m) で三分割する。

use crate::types::{MatchResult, PhotoAsset, ResolvedPerson, RosterRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// 照合結果一式
///
/// 並び順: 名簿順の人物（一致 or 写真なし）→ ストレージ順の余剰写真
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    results: Vec<MatchResult>,
}

impl Reconciliation {
    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<MatchResult> {
        self.results
    }

    pub fn matched(&self) -> impl Iterator<Item = (&ResolvedPerson, &PhotoAsset)> {
        self.results.iter().filter_map(|r| match r {
            MatchResult::Matched { person, asset } => Some((person, asset)),
            _ => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &ResolvedPerson> {
        self.results.iter().filter_map(|r| match r {
            MatchResult::MissingPhoto { person } => Some(person),
            _ => None,
        })
    }

    pub fn orphans(&self) -> impl Iterator<Item = &PhotoAsset> {
        self.results.iter().filter_map(|r| match r {
            MatchResult::OrphanPhoto { asset } => Some(asset),
            _ => None,
        })
    }

    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    pub fn missing_count(&self) -> usize {
        self.missing().count()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans().count()
    }

    /// 呼び出し元向けの集計
    ///
    /// `records` は人物と同じ順の名簿行（プレビュー表示用）。
    pub fn summary(&self, records: &[RosterRecord]) -> ReconciliationSummary {
        let photos_uploaded = self.results.iter().filter(|r| r.asset().is_some()).count();
        let roster_rows = self.results.iter().filter(|r| r.person().is_some()).count();

        let mut seen = HashSet::new();
        let missing_files: Vec<String> = self
            .missing()
            .map(|p| p.expected_photo_key.clone())
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();

        let matched_cards = self
            .matched()
            .map(|(person, asset)| MatchedCard {
                file: asset.original_filename.clone(),
                path: asset.storage_path.clone(),
                name: person.display_name.clone(),
                person_id: person.person_id.clone(),
                title: person.title.clone(),
                department: person.department.clone(),
            })
            .collect();

        let missing_rows = self
            .missing()
            .map(|person| MissingRow {
                file: person.expected_photo_file.clone(),
                name: person.display_name.clone(),
                row: records.get(person.row_index).cloned().unwrap_or_default(),
            })
            .collect();

        let orphan_cards = self
            .orphans()
            .map(|asset| OrphanCard {
                file: asset.original_filename.clone(),
                path: asset.storage_path.clone(),
            })
            .collect();

        ReconciliationSummary {
            photos_uploaded,
            roster_rows,
            matched: self.matched_count(),
            missing: self.missing_count(),
            orphans: self.orphan_count(),
            missing_files,
            matched_cards,
            missing_rows,
            orphan_cards,
        }
    }
}

/// 照合サマリー
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub photos_uploaded: usize,
    pub roster_rows: usize,
    pub matched: usize,
    pub missing: usize,
    pub orphans: usize,
    /// 写真が見つからなかったファイル名（小文字、重複なし）
    pub missing_files: Vec<String>,
    pub matched_cards: Vec<MatchedCard>,
    pub missing_rows: Vec<MissingRow>,
    pub orphan_cards: Vec<OrphanCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedCard {
    pub file: String,
    pub path: String,
    pub name: String,
    pub person_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingRow {
    pub file: String,
    pub name: String,
    pub row: RosterRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanCard {
    pub file: String,
    pub path: String,
}

/// 人物と写真を照合する
///
/// 1枚の写真は1人にだけ割り当てる。同じキーを持つ人物が複数いる場合、
/// 名簿順に未割当の写真を取り、写真が尽きた人物は写真なしとなる。
pub fn reconcile(people: Vec<ResolvedPerson>, assets: Vec<PhotoAsset>) -> Reconciliation {
    let mut index: HashMap<&str, VecDeque<usize>> = HashMap::with_capacity(assets.len());
    for (i, asset) in assets.iter().enumerate() {
        index.entry(asset.lookup_key.as_str()).or_default().push_back(i);
    }

    for (key, slots) in &index {
        if slots.len() > 1 {
            tracing::warn!(key = %key, count = slots.len(), "同じファイル名の写真が複数あります");
        }
    }

    let mut pairing: Vec<Option<usize>> = Vec::with_capacity(people.len());

    for person in &people {
        let slot = if person.expected_photo_key.is_empty() {
            None
        } else {
            index
                .get_mut(person.expected_photo_key.as_str())
                .and_then(|queue| queue.pop_front())
        };
        pairing.push(slot);
    }

    drop(index);

    let mut asset_slots: Vec<Option<PhotoAsset>> = assets.into_iter().map(Some).collect();
    let mut results = Vec::with_capacity(people.len() + asset_slots.len());

    for (person, slot) in people.into_iter().zip(pairing) {
        match slot.and_then(|i| asset_slots[i].take()) {
            Some(asset) => results.push(MatchResult::Matched { person, asset }),
            None => results.push(MatchResult::MissingPhoto { person }),
        }
    }

    // 未割当の写真は名簿なし
    results.extend(
        asset_slots
            .into_iter()
            .flatten()
            .map(|asset| MatchResult::OrphanPhoto { asset }),
    );

    let reconciliation = Reconciliation { results };
    tracing::debug!(
        matched = reconciliation.matched_count(),
        missing = reconciliation.missing_count(),
        orphans = reconciliation.orphan_count(),
        "照合完了"
    );
    reconciliation
}
