//! Key candidate generation
//!
//! Simple conditions on indexed attributes are answered from the inverted
//! index: the exact list, or for a value ending in `%` the union over every
//! indexed value with that prefix. Everything else, and any index lookup that
//! comes back empty, falls back to a full scan with the matcher.

use crate::condition::{AttributeCondition, Condition};
use crate::corpus::Corpus;
use crate::index::CorpusIndex;
use crate::matcher::evaluate_compound;
use crate::token::TokenId;
use log::debug;

/// Get every token satisfying the key condition, in ascending order
///
/// A `%`-terminated surface or lemma value is a prefix lookup here, while
/// the matcher compares it literally.
pub fn get_candidates(corpus: &Corpus, index: &CorpusIndex, key: &Condition) -> Vec<TokenId> {
    if !key.has_short_units() && key.main().attribute.is_indexed() {
        let candidates = get_candidates_from_index(corpus, index, key.main());
        if !candidates.is_empty() {
            return candidates;
        }
        debug!(
            "Index has no entry for {}={:?}, scanning corpus",
            key.main().attribute,
            key.main().value
        );
    }
    scan_candidates(corpus, key)
}

/// Full scan with the matcher
pub fn scan_candidates(corpus: &Corpus, key: &Condition) -> Vec<TokenId> {
    corpus
        .tokens()
        .filter(|token| evaluate_compound(token, key))
        .map(|token| token.id())
        .collect()
}

/// Get candidates from the index: the exact list, or the union over every
/// value sharing the prefix of a `%`-terminated pattern
fn get_candidates_from_index(
    corpus: &Corpus,
    index: &CorpusIndex,
    condition: &AttributeCondition,
) -> Vec<TokenId> {
    match condition.value.strip_suffix('%') {
        Some(prefix) => index.prefix_union(corpus, condition.attribute, prefix),
        None => index
            .get(corpus, condition.attribute, &condition.value)
            .map(<[TokenId]>::to_vec)
            .unwrap_or_default(),
    }
}
