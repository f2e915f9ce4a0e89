//! 単票PDFのZIPまとめ

use crate::error::Result;
use badgeflow_common::ResolvedPerson;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// 単票PDFのファイル名: `{ID}_{氏名}.pdf`
///
/// 氏名の空白の連続は `_` に、パス区切りは `-` にする。氏名が空なら `{ID}.pdf`。
pub fn single_document_name(person: &ResolvedPerson) -> String {
    let name = WHITESPACE_RUN.replace_all(person.display_name.trim(), "_");
    let stem = if name.is_empty() {
        person.person_id.clone()
    } else {
        format!("{}_{}", person.person_id, name)
    };
    format!("{}.pdf", stem.replace(['/', '\\'], "-"))
}

/// ZIP を組み立てる。同名は `_2`, `_3` … を付ける。
pub struct SinglesArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    used: HashSet<String>,
    count: usize,
}

impl SinglesArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            used: HashSet::new(),
            count: 0,
        }
    }

    fn unique_name(&mut self, name: String) -> String {
        if self.used.insert(name.clone()) {
            return name;
        }
        let stem = name.trim_end_matches(".pdf");
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}.pdf", stem, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// 追加したエントリ名を返す
    pub fn add(&mut self, person: &ResolvedPerson, pdf: &[u8]) -> Result<String> {
        let name = self.unique_name(single_document_name(person));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name.as_str(), options)?;
        self.writer.write_all(pdf)?;
        self.count += 1;
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.writer.finish()?.into_inner())
    }
}

impl Default for SinglesArchive {
    fn default() -> Self {
        Self::new()
    }
}
