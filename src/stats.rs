//! Corpus statistics by decade

use crate::corpus::Corpus;
use crate::decade::{Decade, decade_key};
use crate::token::Attributes;
use rustc_hash::{FxHashMap, FxHashSet};

/// Token and file counts for one decade bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecadeStats {
    pub total_tokens: usize,
    /// Tokens that are not symbols or whitespace
    pub content_tokens: usize,
    pub file_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub total_tokens: usize,
    pub content_tokens: usize,
    pub error_tokens: usize,
    pub file_count: usize,
    pub by_decade: FxHashMap<Decade, DecadeStats>,
}

/// Symbols (`記号`, `補助記号`) and whitespace (`空白`) are not content
pub fn is_content_pos(pos: &str) -> bool {
    !(pos.starts_with("記号") || pos.starts_with("補助記号") || pos == "空白")
}

impl CorpusStats {
    pub fn compute(corpus: &Corpus) -> Self {
        let mut stats = CorpusStats {
            total_tokens: corpus.len(),
            error_tokens: corpus.error_count(),
            file_count: corpus.file_count(),
            ..Default::default()
        };
        stats.by_decade = Decade::all().map(|d| (d, DecadeStats::default())).collect();

        let mut files: FxHashMap<Decade, FxHashSet<&str>> = FxHashMap::default();
        for token in corpus.tokens() {
            let decade = token
                .metadata()
                .and_then(|m| m.year.as_deref())
                .map_or(Decade::Unknown, decade_key);
            let content = !token.is_error() && is_content_pos(token.pos().unwrap_or(""));

            let entry = stats.by_decade.entry(decade).or_default();
            entry.total_tokens += 1;
            if content {
                entry.content_tokens += 1;
                stats.content_tokens += 1;
            }
            files.entry(decade).or_default().insert(token.file_name());
        }

        for (decade, names) in files {
            stats.by_decade.entry(decade).or_default().file_count = names.len();
        }
        stats
    }

    /// Stats of one bucket, zero when the bucket is empty
    pub fn decade(&self, decade: Decade) -> DecadeStats {
        self.by_decade.get(&decade).cloned().unwrap_or_default()
    }
}
