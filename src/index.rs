//! Inverted indices for efficient candidate lookup
//!
//! This module maps attribute values to the ascending list of tokens that
//! carry them, so that key conditions on surface, lemma or pos can skip a
//! full corpus scan. Error tokens and blank values are never indexed.

use crate::condition::AttributeType;
use crate::corpus::{Corpus, TokenRef};
use crate::token::{Attributes, TokenId};
use lasso::Spur;
use log::debug;
use rustc_hash::FxHashMap;

/// Inverted index over a corpus snapshot
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    /// Index by surface form
    by_surface: FxHashMap<Spur, Vec<TokenId>>,
    /// Index by lemma
    by_lemma: FxHashMap<Spur, Vec<TokenId>>,
    /// Index by POS tag
    by_pos: FxHashMap<Spur, Vec<TokenId>>,
    /// Index by end-position marker
    by_utterance: FxHashMap<usize, Vec<TokenId>>,
}

impl CorpusIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a corpus
    pub fn build(corpus: &Corpus) -> Self {
        let mut index = Self::new();

        for token in corpus.tokens() {
            index.add_token(corpus, token);
        }

        debug!(
            "Indexed {} tokens: {} surfaces, {} lemmas, {} pos tags",
            corpus.len(),
            index.by_surface.len(),
            index.by_lemma.len(),
            index.by_pos.len()
        );
        index
    }

    /// Add a token to the index
    fn add_token(&mut self, corpus: &Corpus, token: TokenRef<'_>) {
        if token.is_error() {
            return;
        }
        let id = token.id();

        for attribute in [AttributeType::Surface, AttributeType::Lemma, AttributeType::Pos] {
            let Some(key) = corpus.attribute_key(id, attribute) else {
                continue;
            };
            if corpus.resolve(key).trim().is_empty() {
                continue;
            }
            if let Some(map) = self.map_mut(attribute) {
                map.entry(key).or_default().push(id);
            }
        }

        self.by_utterance
            .entry(token.end_position())
            .or_default()
            .push(id);
    }

    fn map(&self, attribute: AttributeType) -> Option<&FxHashMap<Spur, Vec<TokenId>>> {
        match attribute {
            AttributeType::Surface => Some(&self.by_surface),
            AttributeType::Lemma => Some(&self.by_lemma),
            AttributeType::Pos => Some(&self.by_pos),
            AttributeType::ConjType | AttributeType::ConjForm => None,
        }
    }

    fn map_mut(&mut self, attribute: AttributeType) -> Option<&mut FxHashMap<Spur, Vec<TokenId>>> {
        match attribute {
            AttributeType::Surface => Some(&mut self.by_surface),
            AttributeType::Lemma => Some(&mut self.by_lemma),
            AttributeType::Pos => Some(&mut self.by_pos),
            AttributeType::ConjType | AttributeType::ConjForm => None,
        }
    }

    /// Get candidate tokens whose attribute equals `value`
    pub fn get(&self, corpus: &Corpus, attribute: AttributeType, value: &str) -> Option<&[TokenId]> {
        let key = corpus.lookup(value)?;
        self.map(attribute)?.get(&key).map(|v| v.as_slice())
    }

    /// Get candidate tokens by surface form
    pub fn get_by_surface(&self, corpus: &Corpus, surface: &str) -> Option<&[TokenId]> {
        self.get(corpus, AttributeType::Surface, surface)
    }

    /// Get candidate tokens by lemma
    pub fn get_by_lemma(&self, corpus: &Corpus, lemma: &str) -> Option<&[TokenId]> {
        self.get(corpus, AttributeType::Lemma, lemma)
    }

    /// Get candidate tokens by POS tag
    pub fn get_by_pos(&self, corpus: &Corpus, pos: &str) -> Option<&[TokenId]> {
        self.get(corpus, AttributeType::Pos, pos)
    }

    /// Get tokens sharing an end-position marker
    pub fn get_by_utterance(&self, end_position: usize) -> Option<&[TokenId]> {
        self.by_utterance.get(&end_position).map(|v| v.as_slice())
    }

    /// Union of the lists of every indexed value starting with `prefix`,
    /// in ascending id order
    pub fn prefix_union(&self, corpus: &Corpus, attribute: AttributeType, prefix: &str) -> Vec<TokenId> {
        let Some(map) = self.map(attribute) else {
            return Vec::new();
        };
        let mut ids: Vec<TokenId> = map
            .iter()
            .filter(|(key, _)| corpus.resolve(**key).starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of distinct indexed values of an attribute
    pub fn distinct_values(&self, attribute: AttributeType) -> usize {
        self.map(attribute).map_or(0, |m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenError};

    fn create_test_corpus() -> Corpus {
        Corpus::from_tokens([
            Token::new("A", "先生", "先生", "名詞-普通名詞-一般").with_positions(0, 2),
            Token::new("A", "が", "が", "助詞-格助詞").with_positions(2, 3),
            Token::new("A", "先生", "先生", "名詞-普通名詞-一般").with_positions(3, 5),
            Token::new("A", " ", " ", "空白").with_positions(5, 6),
            Token::error(
                "A",
                TokenError {
                    line: 5,
                    message: "bad".to_string(),
                    content: "先生".to_string(),
                },
            ),
            Token::new("B", "名", "名", "名詞-固有名詞").with_positions(0, 5),
        ])
    }

    #[test]
    fn test_index_building() {
        let corpus = create_test_corpus();
        let index = CorpusIndex::build(&corpus);

        assert_eq!(index.get_by_lemma(&corpus, "先生").unwrap(), &[0, 2]);
        assert_eq!(index.get_by_surface(&corpus, "が").unwrap(), &[1]);
        assert_eq!(index.get_by_pos(&corpus, "名詞-固有名詞").unwrap(), &[5]);
        assert!(index.get_by_pos(&corpus, "動詞").is_none());
        assert!(index.get(&corpus, AttributeType::ConjType, "先生").is_none());
    }

    #[test]
    fn test_blank_and_error_tokens_not_indexed() {
        let corpus = create_test_corpus();
        let index = CorpusIndex::build(&corpus);

        assert!(index.get_by_surface(&corpus, " ").is_none());
        assert_eq!(index.get_by_pos(&corpus, "空白").unwrap(), &[3]);
        assert!(!index.get_by_lemma(&corpus, "先生").unwrap().contains(&4));
    }

    #[test]
    fn test_prefix_union() {
        let corpus = create_test_corpus();
        let index = CorpusIndex::build(&corpus);

        assert_eq!(index.prefix_union(&corpus, AttributeType::Pos, "名詞"), vec![0, 2, 5]);
        assert_eq!(index.prefix_union(&corpus, AttributeType::Pos, "助詞"), vec![1]);
        assert!(index.prefix_union(&corpus, AttributeType::Pos, "動詞").is_empty());
        assert!(index.prefix_union(&corpus, AttributeType::ConjForm, "").is_empty());
    }

    #[test]
    fn test_utterance_index() {
        let corpus = create_test_corpus();
        let index = CorpusIndex::build(&corpus);

        assert_eq!(index.get_by_utterance(5).unwrap(), &[2, 5]);
        assert_eq!(index.get_by_utterance(3).unwrap(), &[1]);
        assert!(index.get_by_utterance(99).is_none());
        assert_eq!(index.distinct_values(AttributeType::Lemma), 3);
    }
}
