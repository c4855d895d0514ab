//! Condition model for structured queries
//!
//! A structured query is a key condition plus ordered lists of pre- and
//! post-context conditions. Each condition tests one attribute and may carry
//! short-unit sub-conditions joined by AND / OR / NOT.

use crate::config::SearchConfig;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which side of the key a context condition looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Pre,
    Post,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Pre => write!(f, "pre"),
            Side::Post => write!(f, "post"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Key condition has an empty value")]
    EmptyKeyValue,

    #[error("Empty value in {0}")]
    EmptyValue(String),

    #[error("Range {range} is out of bounds (1..={max})")]
    InvalidRange { range: usize, max: usize },

    #[error("Too many {side}-context conditions ({count}, at most {max})")]
    TooManyContextConditions { side: Side, count: usize, max: usize },

    #[error("Too many short-unit conditions ({count}, at most {max})")]
    TooManyShortUnits { count: usize, max: usize },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Unknown logic operator: {0}")]
    UnknownLogic(String),
}

/// Token attribute tested by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Surface,
    Lemma,
    Pos,
    ConjType,
    ConjForm,
}

impl AttributeType {
    pub const ALL: [AttributeType; 5] = [
        AttributeType::Surface,
        AttributeType::Lemma,
        AttributeType::Pos,
        AttributeType::ConjType,
        AttributeType::ConjForm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AttributeType::Surface => "surface",
            AttributeType::Lemma => "lemma",
            AttributeType::Pos => "pos",
            AttributeType::ConjType => "conj_type",
            AttributeType::ConjForm => "conj_form",
        }
    }

    /// Column label used by the corpus files
    pub fn label(self) -> &'static str {
        match self {
            AttributeType::Surface => "書字形出現形",
            AttributeType::Lemma => "語彙素",
            AttributeType::Pos => "品詞",
            AttributeType::ConjType => "活用型",
            AttributeType::ConjForm => "活用形",
        }
    }

    /// Whether the inverted index covers this attribute
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            AttributeType::Surface | AttributeType::Lemma | AttributeType::Pos
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeType {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        AttributeType::ALL
            .into_iter()
            .find(|attr| attr.name().eq_ignore_ascii_case(s) || attr.label() == s)
            .or(match s {
                "conjType" => Some(AttributeType::ConjType),
                "conjForm" => Some(AttributeType::ConjForm),
                _ => None,
            })
            .ok_or_else(|| ConditionError::UnknownAttribute(s.to_string()))
    }
}

/// Connective joining a short-unit condition to what precedes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    And,
    Or,
    /// AND NOT
    Not,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "AND"),
            Logic::Or => write!(f, "OR"),
            Logic::Not => write!(f, "NOT"),
        }
    }
}

impl FromStr for Logic {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            "NOT" | "AND NOT" => Ok(Logic::Not),
            _ => Err(ConditionError::UnknownLogic(s.to_string())),
        }
    }
}

/// A single attribute test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCondition {
    pub attribute: AttributeType,
    pub value: String,
}

impl AttributeCondition {
    pub fn new(attribute: AttributeType, value: &str) -> Self {
        Self {
            attribute,
            value: value.to_string(),
        }
    }

    /// An empty (or whitespace-only) value matches every token
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUnitCondition {
    pub logic: Logic,
    pub condition: AttributeCondition,
}

/// A main attribute test, optionally refined by short-unit conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Simple(AttributeCondition),
    Compound {
        main: AttributeCondition,
        short_units: Vec<ShortUnitCondition>,
    },
}

impl Condition {
    pub fn simple(attribute: AttributeType, value: &str) -> Self {
        Condition::Simple(AttributeCondition::new(attribute, value))
    }

    /// Append a short-unit condition, turning a simple condition into a compound one
    pub fn with_short_unit(self, logic: Logic, attribute: AttributeType, value: &str) -> Self {
        let unit = ShortUnitCondition {
            logic,
            condition: AttributeCondition::new(attribute, value),
        };
        match self {
            Condition::Simple(main) => Condition::Compound {
                main,
                short_units: vec![unit],
            },
            Condition::Compound {
                main,
                mut short_units,
            } => {
                short_units.push(unit);
                Condition::Compound { main, short_units }
            }
        }
    }

    pub fn main(&self) -> &AttributeCondition {
        match self {
            Condition::Simple(main) | Condition::Compound { main, .. } => main,
        }
    }

    pub fn short_units(&self) -> &[ShortUnitCondition] {
        match self {
            Condition::Simple(_) => &[],
            Condition::Compound { short_units, .. } => short_units,
        }
    }

    pub fn has_short_units(&self) -> bool {
        !self.short_units().is_empty()
    }

    /// True when the main value is empty
    pub fn is_empty(&self) -> bool {
        self.main().is_empty()
    }

    fn validate(&self, role: &str, config: &SearchConfig) -> Result<(), ConditionError> {
        let count = self.short_units().len();
        if count > config.max_short_unit_conditions {
            return Err(ConditionError::TooManyShortUnits {
                count,
                max: config.max_short_unit_conditions,
            });
        }
        for (i, unit) in self.short_units().iter().enumerate() {
            if unit.condition.is_empty() {
                return Err(ConditionError::EmptyValue(format!(
                    "{role} short-unit condition {}",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

/// How a context range is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    /// Any position at distance 1..=range
    Within,
    /// Exactly the position at distance range
    #[default]
    ExactOffset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCondition {
    pub condition: Condition,
    pub range: usize,
    pub mode: RangeMode,
}

impl ContextCondition {
    pub fn within(condition: Condition, range: usize) -> Self {
        Self {
            condition,
            range,
            mode: RangeMode::Within,
        }
    }

    pub fn exact(condition: Condition, range: usize) -> Self {
        Self {
            condition,
            range,
            mode: RangeMode::ExactOffset,
        }
    }
}

/// Key condition plus ordered context conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    pub key: Condition,
    pub pre: Vec<ContextCondition>,
    pub post: Vec<ContextCondition>,
}

impl StructuredQuery {
    pub fn new(key: Condition) -> Self {
        Self {
            key,
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn with_pre(mut self, condition: ContextCondition) -> Self {
        self.pre.push(condition);
        self
    }

    pub fn with_post(mut self, condition: ContextCondition) -> Self {
        self.post.push(condition);
        self
    }

    /// Check the query against the limits of `config`
    pub fn validate(&self, config: &SearchConfig) -> Result<(), ConditionError> {
        if self.key.is_empty() {
            return Err(ConditionError::EmptyKeyValue);
        }
        self.key.validate("key", config)?;

        for (side, conditions) in [(Side::Pre, &self.pre), (Side::Post, &self.post)] {
            if conditions.len() > config.max_context_conditions {
                return Err(ConditionError::TooManyContextConditions {
                    side,
                    count: conditions.len(),
                    max: config.max_context_conditions,
                });
            }
            for (i, context) in conditions.iter().enumerate() {
                let role = format!("{side}-context condition {}", i + 1);
                if context.condition.is_empty() {
                    return Err(ConditionError::EmptyValue(role));
                }
                if context.range == 0 || context.range > config.max_range {
                    return Err(ConditionError::InvalidRange {
                        range: context.range,
                        max: config.max_range,
                    });
                }
                context.condition.validate(&role, config)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_names() {
        assert_eq!("surface".parse::<AttributeType>(), Ok(AttributeType::Surface));
        assert_eq!("POS".parse::<AttributeType>(), Ok(AttributeType::Pos));
        assert_eq!("語彙素".parse::<AttributeType>(), Ok(AttributeType::Lemma));
        assert_eq!("活用形".parse::<AttributeType>(), Ok(AttributeType::ConjForm));
        assert_eq!("conjType".parse::<AttributeType>(), Ok(AttributeType::ConjType));
        assert!(matches!(
            "deprel".parse::<AttributeType>(),
            Err(ConditionError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn test_logic_parse() {
        assert_eq!("and".parse::<Logic>(), Ok(Logic::And));
        assert_eq!("OR".parse::<Logic>(), Ok(Logic::Or));
        assert_eq!("and not".parse::<Logic>(), Ok(Logic::Not));
        assert!("xor".parse::<Logic>().is_err());
    }

    #[test]
    fn test_compound_builder() {
        let cond = Condition::simple(AttributeType::Pos, "名詞%")
            .with_short_unit(Logic::Or, AttributeType::Lemma, "先生")
            .with_short_unit(Logic::Not, AttributeType::Surface, "x");

        assert_eq!(cond.main().value, "名詞%");
        assert_eq!(cond.short_units().len(), 2);
        assert_eq!(cond.short_units()[1].logic, Logic::Not);
        assert!(cond.has_short_units());
        assert!(!Condition::simple(AttributeType::Pos, "a").has_short_units());
    }

    #[test]
    fn test_validate_ok() {
        let query = StructuredQuery::new(Condition::simple(AttributeType::Lemma, "先生"))
            .with_pre(ContextCondition::within(
                Condition::simple(AttributeType::Surface, "の"),
                10,
            ))
            .with_post(ContextCondition::exact(
                Condition::simple(AttributeType::Pos, "助詞%"),
                1,
            ));
        assert_eq!(query.validate(&SearchConfig::default()), Ok(()));
    }

    #[test]
    fn test_validate_errors() {
        let config = SearchConfig::default();

        let query = StructuredQuery::new(Condition::simple(AttributeType::Lemma, "  "));
        assert_eq!(query.validate(&config), Err(ConditionError::EmptyKeyValue));

        let key = Condition::simple(AttributeType::Lemma, "a");
        let query = StructuredQuery::new(key.clone()).with_post(ContextCondition::within(
            Condition::simple(AttributeType::Lemma, "b"),
            11,
        ));
        assert_eq!(
            query.validate(&config),
            Err(ConditionError::InvalidRange { range: 11, max: 10 })
        );

        let query = StructuredQuery::new(key.clone()).with_pre(ContextCondition::exact(
            Condition::simple(AttributeType::Lemma, "b"),
            0,
        ));
        assert!(matches!(
            query.validate(&config),
            Err(ConditionError::InvalidRange { range: 0, .. })
        ));

        let query = StructuredQuery::new(key.clone()).with_pre(ContextCondition::exact(
            Condition::simple(AttributeType::Lemma, ""),
            1,
        ));
        assert!(matches!(query.validate(&config), Err(ConditionError::EmptyValue(_))));

        let mut query = StructuredQuery::new(key.clone());
        for _ in 0..6 {
            query = query.with_post(ContextCondition::exact(
                Condition::simple(AttributeType::Lemma, "b"),
                1,
            ));
        }
        assert_eq!(
            query.validate(&config),
            Err(ConditionError::TooManyContextConditions {
                side: Side::Post,
                count: 6,
                max: 5
            })
        );

        let mut cond = key;
        for _ in 0..6 {
            cond = cond.with_short_unit(Logic::And, AttributeType::Pos, "x");
        }
        assert_eq!(
            StructuredQuery::new(cond).validate(&config),
            Err(ConditionError::TooManyShortUnits { count: 6, max: 5 })
        );
    }
}
