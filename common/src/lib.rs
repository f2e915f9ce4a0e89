//! BadgeFlow Common Library
//!
//! 名簿の読み込み・列解決・写真照合・カード寸法計算など、
//! I/O を持たない処理をまとめたクレート

pub mod types;
pub mod layout;
pub mod error;
pub mod roster;
pub mod columns;
pub mod matcher;
pub mod export;

pub use types::{CardSide, MatchKind, MatchResult, PhotoAsset, ResolvedPerson, RosterRecord};
pub use layout::{CardGeometry, CellPosition, GridSpec};
pub use error::{Error, Result};
pub use roster::{parse_delimited, ParseWarning, ParsedRoster};
pub use columns::{resolve_people, ColumnMap, ColumnPolicy};
pub use matcher::{reconcile, Reconciliation, ReconciliationSummary};
