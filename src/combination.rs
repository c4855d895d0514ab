//! Expansion of resolved context matches into match results
//!
//! Each key yields one result per element of the cartesian product of its
//! per-condition pre lists times the product of its post lists.

use crate::context::ContextMatches;
use crate::token::TokenId;
use std::collections::BTreeSet;

/// One concrete hit: a key plus the context tokens chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub key_token_id: TokenId,
    pub pre_highlight_ids: BTreeSet<TokenId>,
    pub post_highlight_ids: BTreeSet<TokenId>,
}

impl MatchResult {
    /// A key with no context
    pub fn key_only(key_token_id: TokenId) -> Self {
        Self {
            key_token_id,
            pre_highlight_ids: BTreeSet::new(),
            post_highlight_ids: BTreeSet::new(),
        }
    }
}

/// Cartesian product of the non-empty lists, in input order
///
/// With no non-empty list the product holds a single empty combination.
pub fn cartesian_product(lists: &[Vec<TokenId>]) -> Vec<Vec<TokenId>> {
    lists
        .iter()
        .filter(|list| !list.is_empty())
        .fold(vec![Vec::new()], |acc, list| {
            acc.iter()
                .flat_map(|prefix| {
                    list.iter().map(move |&id| {
                        let mut combination = prefix.clone();
                        combination.push(id);
                        combination
                    })
                })
                .collect()
        })
}

/// All match results for one resolved key
pub fn expand(key_token_id: TokenId, matches: &ContextMatches) -> Vec<MatchResult> {
    let pre = cartesian_product(&matches.pre);
    let post = cartesian_product(&matches.post);

    let mut results = Vec::with_capacity(pre.len() * post.len());
    for pre_combination in &pre {
        for post_combination in &post {
            results.push(MatchResult {
                key_token_id,
                pre_highlight_ids: pre_combination.iter().copied().collect(),
                post_highlight_ids: post_combination.iter().copied().collect(),
            });
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[TokenId]) -> BTreeSet<TokenId> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_cartesian_product() {
        let product = cartesian_product(&[vec![1, 2], vec![5]]);
        assert_eq!(product, vec![vec![1, 5], vec![2, 5]]);

        let product = cartesian_product(&[vec![1, 2], vec![], vec![7, 8]]);
        assert_eq!(product.len(), 4);
        assert_eq!(product[0], vec![1, 7]);
        assert_eq!(product[3], vec![2, 8]);

        assert_eq!(cartesian_product(&[]), vec![Vec::<TokenId>::new()]);
    }

    #[test]
    fn test_expand_pre_and_post() {
        let matches = ContextMatches {
            pre: vec![vec![1, 2]],
            post: vec![vec![5]],
        };
        let results = expand(3, &matches);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].pre_highlight_ids, ids(&[1]));
        assert_eq!(results[0].post_highlight_ids, ids(&[5]));
        assert_eq!(results[1].pre_highlight_ids, ids(&[2]));
        assert!(results.iter().all(|r| r.key_token_id == 3));
    }

    #[test]
    fn test_expand_one_side() {
        let matches = ContextMatches {
            pre: Vec::new(),
            post: vec![vec![4, 6], vec![7]],
        };
        let results = expand(3, &matches);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.pre_highlight_ids.is_empty()));
        assert_eq!(results[1].post_highlight_ids, ids(&[6, 7]));
    }

    #[test]
    fn test_expand_no_context() {
        let results = expand(9, &ContextMatches::default());
        assert_eq!(results, vec![MatchResult::key_only(9)]);
    }

    #[test]
    fn test_shared_token_collapses() {
        let matches = ContextMatches {
            pre: vec![vec![1], vec![1]],
            post: Vec::new(),
        };
        let results = expand(2, &matches);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pre_highlight_ids, ids(&[1]));
    }
}
