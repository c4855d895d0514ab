//! Co-occurrence resolution around a key token
//!
//! Every context condition with a non-empty value must find at least one
//! matching token for the key to survive. Windows never leave the key's file
//! and, unless crossing is enabled, never cross a sentence break. A break
//! lies before every sentence-initial token.

use crate::condition::{ContextCondition, RangeMode};
use crate::corpus::Corpus;
use crate::matcher::evaluate_compound;
use crate::token::TokenId;

/// Per-condition matches of a resolved key, pre matches in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextMatches {
    pub pre: Vec<Vec<TokenId>>,
    pub post: Vec<Vec<TokenId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

/// Resolves context conditions against one corpus snapshot
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    corpus: &'a Corpus,
    cross_boundary: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(corpus: &'a Corpus, cross_boundary: bool) -> Self {
        Self {
            corpus,
            cross_boundary,
        }
    }

    /// Match every pre and post condition around `key`
    ///
    /// Returns `None` as soon as one condition has no match.
    pub fn resolve(
        &self,
        key: TokenId,
        pre: &[ContextCondition],
        post: &[ContextCondition],
    ) -> Option<ContextMatches> {
        self.corpus.token(key)?;
        Some(ContextMatches {
            pre: self.resolve_side(key, pre, Direction::Backward)?,
            post: self.resolve_side(key, post, Direction::Forward)?,
        })
    }

    fn resolve_side(
        &self,
        key: TokenId,
        conditions: &[ContextCondition],
        direction: Direction,
    ) -> Option<Vec<Vec<TokenId>>> {
        let mut resolved = Vec::with_capacity(conditions.len());
        for context in conditions {
            if context.condition.is_empty() {
                continue;
            }
            let found = match context.mode {
                RangeMode::Within => self.scan_within(key, context, direction),
                RangeMode::ExactOffset => self.check_exact(key, context, direction),
            };
            if found.is_empty() {
                return None;
            }
            resolved.push(found);
        }
        Some(resolved)
    }

    fn step(&self, key: TokenId, offset: usize, direction: Direction) -> Option<TokenId> {
        let pos = match direction {
            Direction::Backward => key.checked_sub(offset)?,
            Direction::Forward => key.checked_add(offset)?,
        };
        self.corpus.same_file(key, pos).then_some(pos)
    }

    /// Whether the step that reaches `pos` from its neighbour toward the key
    /// crosses a sentence break
    fn crosses_break(&self, pos: TokenId, direction: Direction) -> bool {
        let opener = match direction {
            Direction::Backward => pos + 1,
            Direction::Forward => pos,
        };
        self.corpus
            .boundary(opener)
            .is_some_and(|boundary| boundary.is_initial())
    }

    fn accepts(&self, pos: TokenId, context: &ContextCondition) -> bool {
        self.corpus
            .token(pos)
            .is_some_and(|token| evaluate_compound(&token, &context.condition))
    }

    fn scan_within(
        &self,
        key: TokenId,
        context: &ContextCondition,
        direction: Direction,
    ) -> Vec<TokenId> {
        let mut found = Vec::new();
        for offset in 1..=context.range {
            let Some(pos) = self.step(key, offset, direction) else {
                break;
            };
            if !self.cross_boundary && self.crosses_break(pos, direction) {
                break;
            }
            if self.accepts(pos, context) {
                found.push(pos);
            }
        }
        if direction == Direction::Backward {
            found.reverse();
        }
        found
    }

    fn check_exact(
        &self,
        key: TokenId,
        context: &ContextCondition,
        direction: Direction,
    ) -> Vec<TokenId> {
        let Some(pos) = self.step(key, context.range, direction) else {
            return Vec::new();
        };
        if !self.cross_boundary {
            let mut between = match direction {
                Direction::Backward => pos..key,
                Direction::Forward => key + 1..pos + 1,
            };
            if between.any(|p| self.crosses_break(p, direction)) {
                return Vec::new();
            }
        }
        if self.accepts(pos, context) {
            vec![pos]
        } else {
            Vec::new()
        }
    }
}

/// Resolve with a throwaway [`Resolver`]
pub fn resolve(
    corpus: &Corpus,
    key: TokenId,
    pre: &[ContextCondition],
    post: &[ContextCondition],
    cross_boundary: bool,
) -> Option<ContextMatches> {
    Resolver::new(corpus, cross_boundary).resolve(key, pre, post)
}
