//! badgeflow
//!
//! 名簿と顔写真の照合、CR80カードの描画、A4シートPDF・単票ZIPの生成。

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod roster;
pub mod storage;

pub use badgeflow_common as common;
