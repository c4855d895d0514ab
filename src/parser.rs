//! Query language parser
//!
//! Parses query strings into a [`StructuredQuery`] using a pest grammar.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::condition::{
    AttributeCondition, AttributeType, Condition, ContextCondition, Logic, RangeMode,
    StructuredQuery,
};

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

/// Error type for parse failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Query has no key clause")]
    MissingKey,

    #[error("Query has more than one key clause")]
    DuplicateKey,

    #[error("Malformed {0}")]
    Malformed(&'static str),
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError::Syntax(Box::new(err))
    }
}

/// Parse a query string into a structured query
///
/// Ranges and value contents are not checked here; see
/// [`StructuredQuery::validate`].
pub fn parse_query(input: &str) -> Result<StructuredQuery, ParseError> {
    let mut pairs = QueryParser::parse(Rule::query, input)?;
    let Some(query_pair) = pairs.next() else {
        return Err(ParseError::Malformed("query"));
    };

    let mut key = None;
    let mut pre = Vec::new();
    let mut post = Vec::new();

    for clause in query_pair.into_inner() {
        if clause.as_rule() != Rule::clause {
            continue;
        }
        let Some(inner) = clause.into_inner().next() else {
            return Err(ParseError::Malformed("clause"));
        };

        match inner.as_rule() {
            Rule::key_clause => {
                if key.is_some() {
                    return Err(ParseError::DuplicateKey);
                }
                let condition = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::condition)
                    .ok_or(ParseError::Malformed("key clause"))?;
                key = Some(parse_condition(condition)?);
            }
            Rule::pre_clause => pre.push(parse_context_clause(inner)?),
            Rule::post_clause => post.push(parse_context_clause(inner)?),
            _ => {}
        }
    }

    let key = key.ok_or(ParseError::MissingKey)?;
    let mut query = StructuredQuery::new(key);
    query.pre = pre;
    query.post = post;
    Ok(query)
}

/// Parse `pre|post <range> [within|exact] <condition>`
fn parse_context_clause(pair: Pair<Rule>) -> Result<ContextCondition, ParseError> {
    let mut range = None;
    let mut mode = RangeMode::ExactOffset;
    let mut condition = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::range => {
                let text = part.as_str();
                range = Some(
                    text.parse::<usize>()
                        .map_err(|_| ParseError::InvalidRange(text.to_string()))?,
                );
            }
            Rule::mode => {
                if part.into_inner().any(|m| m.as_rule() == Rule::within) {
                    mode = RangeMode::Within;
                }
            }
            Rule::condition => condition = Some(parse_condition(part)?),
            _ => {}
        }
    }

    Ok(ContextCondition {
        condition: condition.ok_or(ParseError::Malformed("context clause"))?,
        range: range.ok_or(ParseError::Malformed("context clause"))?,
        mode,
    })
}

/// Parse `attr="value" (connective attr="value")*`
///
/// The first test is the main condition, the rest are short units.
fn parse_condition(pair: Pair<Rule>) -> Result<Condition, ParseError> {
    let mut inner = pair.into_inner();

    let Some(first) = inner.next() else {
        return Err(ParseError::Malformed("condition"));
    };
    let main = parse_attribute_test(first)?;
    let mut condition = Condition::Simple(main);

    while let Some(connective) = inner.next() {
        let logic = match connective.into_inner().next().map(|p| p.as_rule()) {
            Some(Rule::and_not) => Logic::Not,
            Some(Rule::or) => Logic::Or,
            Some(Rule::and) => Logic::And,
            _ => return Err(ParseError::Malformed("connective")),
        };
        let Some(test) = inner.next() else {
            return Err(ParseError::Malformed("condition"));
        };
        let test = parse_attribute_test(test)?;
        condition = condition.with_short_unit(logic, test.attribute, &test.value);
    }

    Ok(condition)
}

/// Parse a single test: attr="value"
fn parse_attribute_test(pair: Pair<Rule>) -> Result<AttributeCondition, ParseError> {
    let mut inner = pair.into_inner();

    let Some(attr_pair) = inner.next() else {
        return Err(ParseError::Malformed("attribute test"));
    };
    let attribute: AttributeType = attr_pair
        .as_str()
        .parse()
        .map_err(|_| ParseError::UnknownAttribute(attr_pair.as_str().to_string()))?;

    // Extract string from string_literal rule
    let value = inner
        .next()
        .and_then(|literal| literal.into_inner().next())
        .map(|inner| inner.as_str())
        .ok_or(ParseError::Malformed("string literal"))?;

    Ok(AttributeCondition::new(attribute, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ShortUnitCondition;
    use crate::config::SearchConfig;

    #[test]
    fn test_parse_key_only() {
        let query = parse_query(r#"key lemma="先生";"#).unwrap();
        assert_eq!(query.key, Condition::simple(AttributeType::Lemma, "先生"));
        assert!(query.pre.is_empty());
        assert!(query.post.is_empty());
    }

    #[test]
    fn test_parse_connectives() {
        let query =
            parse_query(r#"key pos="名詞%" and lemma="先生" or surface="x" and not conj_form="連用形";"#)
                .unwrap();

        assert_eq!(query.key.main(), &AttributeCondition::new(AttributeType::Pos, "名詞%"));
        let logics: Vec<Logic> = query.key.short_units().iter().map(|s| s.logic).collect();
        assert_eq!(logics, vec![Logic::And, Logic::Or, Logic::Not]);
        assert_eq!(
            query.key.short_units()[2],
            ShortUnitCondition {
                logic: Logic::Not,
                condition: AttributeCondition::new(AttributeType::ConjForm, "連用形"),
            }
        );
    }

    #[test]
    fn test_parse_context_clauses() {
        let query = parse_query(
            r#"
            // particles around a noun
            key pos="名詞%";
            pre 2 within lemma="の";
            post 1 pos="助詞%";
            post 3 EXACT 品詞="動詞%";
            "#,
        )
        .unwrap();

        assert_eq!(query.pre.len(), 1);
        assert_eq!(query.pre[0].range, 2);
        assert_eq!(query.pre[0].mode, RangeMode::Within);
        assert_eq!(query.pre[0].condition, Condition::simple(AttributeType::Lemma, "の"));

        assert_eq!(query.post.len(), 2);
        assert_eq!(query.post[0].mode, RangeMode::ExactOffset);
        assert_eq!(query.post[1].range, 3);
        assert_eq!(query.post[1].condition.main().attribute, AttributeType::Pos);

        assert!(query.validate(&SearchConfig::default()).is_ok());
    }

    #[test]
    fn test_parse_keyword_prefixed_attribute() {
        // `or` must not be split off the front of an attribute name
        let result = parse_query(r#"key lemma="a" orth="b";"#);
        assert!(matches!(result, Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_query(r#"pre 1 lemma="の";"#),
            Err(ParseError::MissingKey)
        ));
        assert!(matches!(
            parse_query(r#"key lemma="a"; key lemma="b";"#),
            Err(ParseError::DuplicateKey)
        ));
        assert!(matches!(
            parse_query(r#"key reading="a";"#),
            Err(ParseError::UnknownAttribute(name)) if name == "reading"
        ));
        assert!(matches!(
            parse_query(r#"post 99999999999999999999999 lemma="a"; key lemma="b";"#),
            Err(ParseError::InvalidRange(_))
        ));
        assert!(matches!(
            parse_query(r#"key lemma="a""#),
            Err(ParseError::Syntax(_))
        ));
    }

    #[test]
    fn test_empty_value_parses_but_fails_validation() {
        let query = parse_query(r#"key lemma="";"#).unwrap();
        assert!(query.validate(&SearchConfig::default()).is_err());
    }
}
