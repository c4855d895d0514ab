//! Search configuration

/// Limits and presentation settings shared by every query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Allow context windows to reach across sentence breaks
    pub cross_sentence_boundary: bool,
    /// Maximum context conditions per side
    pub max_context_conditions: usize,
    /// Maximum short-unit conditions per condition
    pub max_short_unit_conditions: usize,
    pub max_range: usize,
    /// Tokens of KWIC context on each side of a hit
    pub context_size: usize,
    /// Token separator for rendered KWIC lines
    pub separator: String,
}

impl SearchConfig {
    pub fn new() -> Self {
        Self {
            cross_sentence_boundary: false,
            max_context_conditions: 5,
            max_short_unit_conditions: 5,
            max_range: 10,
            context_size: 20,
            separator: "|".to_string(),
        }
    }

    pub fn with_cross_sentence_boundary(mut self, cross: bool) -> Self {
        self.cross_sentence_boundary = cross;
        self
    }

    pub fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn with_max_range(mut self, max_range: usize) -> Self {
        self.max_range = max_range;
        self
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new()
    }
}
