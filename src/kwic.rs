//! Keyword-in-context records for display
//!
//! String matches are rehydrated into the tokens they cover: the matched
//! text is split across token boundaries, and partial-token text outside
//! the match becomes a prefix or suffix remainder. Structured matches get the
//! same record with their context tokens flagged.

use crate::combination::MatchResult;
use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::token::TokenId;
use crate::wildcard::{StringMatch, TextIndex};
use log::warn;
use std::collections::BTreeSet;

/// A context token outside the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextToken {
    pub token_id: TokenId,
    pub surface: String,
    /// Chosen by a context condition
    pub highlighted: bool,
}

/// The part of one token that falls inside the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    pub token_id: TokenId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KwicLine {
    /// Representative token (the last one the key touches)
    pub token_id: TokenId,
    pub first_token_id: TokenId,
    pub last_token_id: TokenId,
    pub file_name: String,
    pub pre_context: Vec<ContextToken>,
    pub prefix_remainder: String,
    pub key_parts: Vec<KeyPart>,
    pub suffix_remainder: String,
    pub post_context: Vec<ContextToken>,
}

fn render_tokens(tokens: &[ContextToken], separator: &str) -> String {
    tokens
        .iter()
        .map(|t| {
            if t.highlighted {
                format!("[{}]", t.surface)
            } else {
                t.surface.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn join_nonempty(first: &str, second: &str, separator: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (_, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) => format!("{first}{separator}{second}"),
    }
}

impl KwicLine {
    /// Matched text without separators
    pub fn matched_text(&self) -> String {
        self.key_parts.iter().map(|p| p.text.as_str()).collect()
    }

    pub fn key_text(&self, separator: &str) -> String {
        self.key_parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Left context including the prefix remainder
    pub fn pre_text(&self, separator: &str) -> String {
        join_nonempty(
            &render_tokens(&self.pre_context, separator),
            &self.prefix_remainder,
            separator,
        )
    }

    /// Right context including the suffix remainder
    pub fn post_text(&self, separator: &str) -> String {
        join_nonempty(
            &self.suffix_remainder,
            &render_tokens(&self.post_context, separator),
            separator,
        )
    }

    /// Tab-separated left context, key and right context
    pub fn render(&self, separator: &str) -> String {
        format!(
            "{}\t{}\t{}",
            self.pre_text(separator),
            self.key_text(separator),
            self.post_text(separator)
        )
    }
}

/// Up to `size` tokens of the same file before `first`, nearest last
fn context_before(
    corpus: &Corpus,
    first: TokenId,
    size: usize,
    highlights: &BTreeSet<TokenId>,
) -> Vec<ContextToken> {
    let mut tokens: Vec<ContextToken> = (0..first)
        .rev()
        .take(size)
        .take_while(|&id| corpus.same_file(id, first))
        .filter_map(|id| context_token(corpus, id, highlights))
        .collect();
    tokens.reverse();
    tokens
}

/// Up to `size` tokens of the same file after `last`
fn context_after(
    corpus: &Corpus,
    last: TokenId,
    size: usize,
    highlights: &BTreeSet<TokenId>,
) -> Vec<ContextToken> {
    (last + 1..corpus.len())
        .take(size)
        .take_while(|&id| corpus.same_file(id, last))
        .filter_map(|id| context_token(corpus, id, highlights))
        .collect()
}

fn context_token(corpus: &Corpus, id: TokenId, highlights: &BTreeSet<TokenId>) -> Option<ContextToken> {
    let token = corpus.token(id)?;
    Some(ContextToken {
        token_id: id,
        surface: token.display_text().to_string(),
        highlighted: highlights.contains(&id),
    })
}

/// Rebuild the display record of one string match
///
/// Returns `None` when the match no longer lines up with the text index.
pub fn rehydrate(
    corpus: &Corpus,
    texts: &TextIndex,
    hit: &StringMatch,
    config: &SearchConfig,
) -> Option<KwicLine> {
    let token = corpus.token(hit.token_id)?;
    let file = texts.file_of(corpus, hit.token_id)?;

    let start = file.char_to_byte(hit.match_start)?;
    let end = start + hit.matched_string.len();
    if file.text.get(start..end) != Some(hit.matched_string.as_str()) {
        warn!(
            "Match {:?} at {} does not line up with file {}",
            hit.matched_string,
            hit.match_start,
            token.file_name()
        );
        return None;
    }

    let spans = file.overlapping(start, end);
    let (first, last) = match (spans.first(), spans.last()) {
        (Some(first), Some(last)) => (first.token_id, last.token_id),
        _ => return None,
    };
    if last != hit.token_id {
        warn!(
            "Match {:?} ends at token {} rather than {}",
            hit.matched_string, last, hit.token_id
        );
    }

    let mut prefix_remainder = String::new();
    let mut suffix_remainder = String::new();
    let mut key_parts = Vec::with_capacity(spans.len());
    for span in spans {
        if span.start < start {
            prefix_remainder.push_str(&file.text[span.start..start]);
        }
        if span.end > end {
            suffix_remainder.push_str(&file.text[end..span.end]);
        }
        let part = &file.text[span.start.max(start)..span.end.min(end)];
        if !part.is_empty() {
            key_parts.push(KeyPart {
                token_id: span.token_id,
                text: part.to_string(),
            });
        }
    }

    let none = BTreeSet::new();
    Some(KwicLine {
        token_id: last,
        first_token_id: first,
        last_token_id: last,
        file_name: token.file_name().to_string(),
        pre_context: context_before(corpus, first, config.context_size, &none),
        prefix_remainder,
        key_parts,
        suffix_remainder,
        post_context: context_after(corpus, last, config.context_size, &none),
    })
}

/// Rehydrate every match, dropping the ones that no longer line up
///
/// Callers may split `hits` into chunks; the concatenated output is the same.
pub fn rehydrate_all(
    corpus: &Corpus,
    texts: &TextIndex,
    hits: &[StringMatch],
    config: &SearchConfig,
) -> Vec<KwicLine> {
    hits.iter()
        .filter_map(|hit| rehydrate(corpus, texts, hit, config))
        .collect()
}

/// Context window around a structured match, with context hits flagged
pub fn context_window(corpus: &Corpus, result: &MatchResult, config: &SearchConfig) -> Option<KwicLine> {
    let key = corpus.token(result.key_token_id)?;
    let id = key.id();
    Some(KwicLine {
        token_id: id,
        first_token_id: id,
        last_token_id: id,
        file_name: key.file_name().to_string(),
        pre_context: context_before(corpus, id, config.context_size, &result.pre_highlight_ids),
        prefix_remainder: String::new(),
        key_parts: vec![KeyPart {
            token_id: id,
            text: key.display_text().to_string(),
        }],
        suffix_remainder: String::new(),
        post_context: context_after(corpus, id, config.context_size, &result.post_highlight_ids),
    })
}
