//! Condition matching against single tokens
//!
//! Matching is total: every token/condition pair yields a boolean and nothing
//! here can fail.

use crate::condition::{AttributeCondition, AttributeType, Condition, Logic};
use crate::token::Attributes;

/// Check one attribute condition against a token
///
/// - `surface`, `lemma`: exact equality
/// - `pos`: trailing `%` is a prefix test, `*` segments match any
///   `-`-separated segment, anything else is exact equality
/// - `conj_type`, `conj_form`: trailing `%` is a prefix test, a value
///   containing `-` is exact equality, anything else is a prefix test
///
/// An empty value matches every token; error tokens match nothing else.
pub fn matches<T: Attributes + ?Sized>(token: &T, condition: &AttributeCondition) -> bool {
    if condition.is_empty() {
        return true;
    }
    if token.is_error() {
        return false;
    }

    let value = condition.value.as_str();
    let actual = token.attribute(condition.attribute);
    match condition.attribute {
        AttributeType::Surface | AttributeType::Lemma => actual == Some(value),
        AttributeType::Pos => match_pos(actual.unwrap_or(""), value),
        AttributeType::ConjType | AttributeType::ConjForm => {
            actual.is_some_and(|a| !a.is_empty() && match_conjugation(a, value))
        }
    }
}

fn match_pos(pos: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('%') {
        pos.starts_with(prefix)
    } else if pattern.contains('*') {
        match_segments(pos, pattern)
    } else {
        pos == pattern
    }
}

/// Segment-wise comparison where `*` matches any single segment; segments
/// of `pos` past the end of the pattern are ignored
fn match_segments(pos: &str, pattern: &str) -> bool {
    let mut segments = pos.split('-');
    pattern.split('-').all(|part| {
        let segment = segments.next();
        part == "*" || segment == Some(part)
    })
}

fn match_conjugation(actual: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('%') {
        actual.starts_with(prefix)
    } else if pattern.contains('-') {
        actual == pattern
    } else {
        actual.starts_with(pattern)
    }
}

/// Evaluate a possibly compound condition
///
/// Short-unit conditions are read left to right after the main condition,
/// with `NOT` meaning AND NOT. AND and NOT bind tighter than OR: each run of
/// AND/NOT terms collapses into one value and the runs are then ORed.
pub fn evaluate_compound<T: Attributes + ?Sized>(token: &T, condition: &Condition) -> bool {
    let mut term = matches(token, condition.main());
    let mut any = false;

    for unit in condition.short_units() {
        let value = matches(token, &unit.condition);
        match unit.logic {
            Logic::And => term = term && value,
            Logic::Not => term = term && !value,
            Logic::Or => {
                any = any || term;
                term = value;
            }
        }
    }
    any || term
}
