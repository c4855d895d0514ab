//! Wildcard and regex string search over per-file surface text
//!
//! Surface forms of each file are concatenated without separators into one
//! string. Every token records its byte and character span in that string,
//! so regex matches can be mapped back to the tokens they overlap.

use crate::corpus::Corpus;
use crate::token::{Attributes, TokenId};
use log::{debug, warn};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Unterminated character class in wildcard query")]
    UnterminatedClass,

    #[error("Invalid search pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Unknown search mode: {0}")]
    UnknownMode(String),
}

/// How a string query is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Wildcard,
    Regex,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Wildcard => write!(f, "wildcard"),
            SearchMode::Regex => write!(f, "regex"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wildcard" => Ok(SearchMode::Wildcard),
            "regex" => Ok(SearchMode::Regex),
            _ => Err(PatternError::UnknownMode(s.to_string())),
        }
    }
}

/// Translate a wildcard query into regex syntax
///
/// `*` and `%` match any run (lazily), `?` and `_` match one character,
/// `[...]` is a character class (optionally negated with a leading `^`) and
/// every other character is literal.
pub fn wildcard_to_regex(query: &str) -> Result<String, PatternError> {
    let mut regex = String::with_capacity(query.len() * 2);
    let mut chars = query.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        if in_class {
            match c {
                ']' => {
                    regex.push(']');
                    in_class = false;
                }
                '\\' => match chars.next() {
                    Some(escaped) if escaped.is_ascii() => {
                        regex.push('\\');
                        regex.push(escaped);
                    }
                    Some(escaped) => regex.push(escaped),
                    None => regex.push_str("\\\\"),
                },
                // nested classes and set operators in the regex class syntax
                '[' | '&' | '~' => {
                    regex.push('\\');
                    regex.push(c);
                }
                _ => regex.push(c),
            }
            continue;
        }

        match c {
            '*' | '%' => regex.push_str(".*?"),
            '?' | '_' => regex.push('.'),
            '[' => {
                regex.push('[');
                in_class = true;
                if chars.next_if_eq(&'^').is_some() {
                    regex.push('^');
                }
            }
            '.' | '+' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '\\' | ']' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    if in_class {
        return Err(PatternError::UnterminatedClass);
    }
    Ok(regex)
}

/// A compiled string query
#[derive(Debug, Clone)]
pub struct SearchPattern {
    mode: SearchMode,
    source: String,
    regex: Regex,
}

impl SearchPattern {
    pub fn new(query: &str, mode: SearchMode) -> Result<Self, PatternError> {
        let translated = match mode {
            SearchMode::Wildcard => wildcard_to_regex(query)?,
            SearchMode::Regex => query.to_string(),
        };
        debug!("Compiled {mode} query {query:?} as /{translated}/");
        Ok(Self {
            mode,
            source: query.to_string(),
            regex: Regex::new(&translated)?,
        })
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Span of one token in its file text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub token_id: TokenId,
    /// Byte offsets
    pub start: usize,
    pub end: usize,
    /// Character offsets
    pub char_start: usize,
    pub char_end: usize,
}

/// Concatenated surface text of one file run
#[derive(Debug, Clone)]
pub struct FileText {
    /// Index into [`Corpus::file_ranges`]
    pub file_run: usize,
    pub text: String,
    spans: Vec<TokenSpan>,
}

impl FileText {
    pub fn spans(&self) -> &[TokenSpan] {
        &self.spans
    }

    /// Spans overlapping the byte range `start..end`, in token order
    pub fn overlapping(&self, start: usize, end: usize) -> &[TokenSpan] {
        let first = self.spans.partition_point(|s| s.end <= start);
        let last = first + self.spans[first..].partition_point(|s| s.start < end);
        &self.spans[first..last]
    }

    /// Character offset of a byte offset on a char boundary
    pub fn byte_to_char(&self, byte: usize) -> usize {
        let idx = self.spans.partition_point(|s| s.end <= byte);
        match self.spans.get(idx) {
            Some(span) if span.start <= byte => {
                span.char_start + self.text[span.start..byte].chars().count()
            }
            _ => self.spans.last().map_or(0, |s| s.char_end),
        }
    }

    /// Byte offset of a character offset, `None` past the end of the text
    pub fn char_to_byte(&self, char_offset: usize) -> Option<usize> {
        let idx = self.spans.partition_point(|s| s.char_end <= char_offset);
        match self.spans.get(idx) {
            Some(span) if span.char_start <= char_offset => {
                let skip = char_offset - span.char_start;
                self.text[span.start..span.end]
                    .char_indices()
                    .nth(skip)
                    .map(|(i, _)| span.start + i)
            }
            _ => (char_offset == self.spans.last().map_or(0, |s| s.char_end))
                .then_some(self.text.len()),
        }
    }
}

/// Per-file texts of a corpus, built once per load
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    files: Vec<FileText>,
    /// For each file run, its position in `files`
    by_run: Vec<Option<usize>>,
}

impl TextIndex {
    pub fn build(corpus: &Corpus) -> Self {
        let mut files = Vec::new();
        let mut by_run = Vec::with_capacity(corpus.file_ranges().len());

        for (run, range) in corpus.file_ranges().iter().enumerate() {
            let mut text = String::new();
            let mut spans = Vec::new();
            let mut chars = 0;

            for id in range.range.clone() {
                let Some(token) = corpus.token(id) else {
                    continue;
                };
                if token.is_error() {
                    continue;
                }
                let Some(surface) = token.surface() else {
                    continue;
                };
                let start = text.len();
                let char_start = chars;
                text.push_str(surface);
                chars += surface.chars().count();
                spans.push(TokenSpan {
                    token_id: id,
                    start,
                    end: text.len(),
                    char_start,
                    char_end: chars,
                });
            }

            if text.is_empty() {
                by_run.push(None);
            } else {
                by_run.push(Some(files.len()));
                files.push(FileText {
                    file_run: run,
                    text,
                    spans,
                });
            }
        }

        debug!("Built text index for {} files", files.len());
        Self { files, by_run }
    }

    pub fn files(&self) -> &[FileText] {
        &self.files
    }

    /// Text of the file run holding a token
    pub fn file_of(&self, corpus: &Corpus, id: TokenId) -> Option<&FileText> {
        let run = corpus.file_run(id)?;
        let idx = (*self.by_run.get(run)?)?;
        self.files.get(idx)
    }
}

/// One raw string match, offsets in characters of the file text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMatch {
    /// Last token the match overlaps
    pub token_id: TokenId,
    pub match_start: usize,
    pub matched_string: String,
}

/// All non-empty matches of `pattern` in one file text
pub fn search_file(file: &FileText, pattern: &SearchPattern) -> Vec<StringMatch> {
    let mut found = Vec::new();
    for m in pattern.regex.find_iter(&file.text) {
        if m.is_empty() {
            continue;
        }
        let Some(last) = file.overlapping(m.start(), m.end()).last() else {
            warn!(
                "Discarding match {:?} at byte {} overlapping no token",
                m.as_str(),
                m.start()
            );
            continue;
        };
        found.push(StringMatch {
            token_id: last.token_id,
            match_start: file.byte_to_char(m.start()),
            matched_string: m.as_str().to_string(),
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenError};

    fn create_test_corpus() -> Corpus {
        Corpus::from_tokens([
            Token::new("A", "先生", "先生", "名詞"),
            Token::new("A", "が", "が", "助詞"),
            Token::error(
                "A",
                TokenError {
                    line: 3,
                    message: "bad".to_string(),
                    content: "zzz".to_string(),
                },
            ),
            Token::new("A", "来る", "来る", "動詞"),
            Token::new("B", "先", "先", "名詞"),
            Token::new("B", "生", "生", "名詞"),
        ])
    }

    #[test]
    fn test_wildcard_translation() {
        assert_eq!(wildcard_to_regex("先%生").unwrap(), "先.*?生");
        assert_eq!(wildcard_to_regex("先*生").unwrap(), "先.*?生");
        assert_eq!(wildcard_to_regex("先?生_").unwrap(), "先.生.");
        assert_eq!(wildcard_to_regex("[ab]").unwrap(), "[ab]");
        assert_eq!(wildcard_to_regex("[^ab]c").unwrap(), "[^ab]c");
        assert_eq!(wildcard_to_regex("a.b(c)").unwrap(), "a\\.b\\(c\\)");
        assert_eq!(wildcard_to_regex("[a\\]]").unwrap(), "[a\\]]");
        assert!(matches!(
            wildcard_to_regex("["),
            Err(PatternError::UnterminatedClass)
        ));
        assert!(matches!(
            wildcard_to_regex("先[生"),
            Err(PatternError::UnterminatedClass)
        ));
    }

    #[test]
    fn test_translated_patterns_compile() {
        for query in ["先%生", "[ab]", "[^が]", "a.b", "^x$", "{1}", "x|y", "\\", "]"] {
            assert!(SearchPattern::new(query, SearchMode::Wildcard).is_ok(), "{query}");
        }
        assert!(matches!(
            SearchPattern::new("(", SearchMode::Regex),
            Err(PatternError::Regex(_))
        ));
    }

    #[test]
    fn test_search_mode_parse() {
        assert_eq!("wildcard".parse::<SearchMode>().unwrap(), SearchMode::Wildcard);
        assert_eq!("Regex".parse::<SearchMode>().unwrap(), SearchMode::Regex);
        assert!("glob".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_text_index() {
        let corpus = create_test_corpus();
        let texts = TextIndex::build(&corpus);

        assert_eq!(texts.files().len(), 2);
        let file = &texts.files()[0];
        assert_eq!(file.text, "先生が来る");
        assert_eq!(file.spans().len(), 3);
        assert_eq!(file.spans()[2].token_id, 3);
        assert_eq!(file.spans()[2].char_start, 3);
        assert_eq!(file.spans()[2].char_end, 5);

        assert!(std::ptr::eq(texts.file_of(&corpus, 5).unwrap(), &texts.files()[1]));
        assert!(texts.file_of(&corpus, 2).is_some());
        assert!(texts.file_of(&corpus, 99).is_none());
    }

    #[test]
    fn test_offsets() {
        let corpus = create_test_corpus();
        let texts = TextIndex::build(&corpus);
        let file = &texts.files()[0];

        // each character here is three bytes
        assert_eq!(file.byte_to_char(0), 0);
        assert_eq!(file.byte_to_char(6), 2);
        assert_eq!(file.byte_to_char(15), 5);
        assert_eq!(file.char_to_byte(2), Some(6));
        assert_eq!(file.char_to_byte(4), Some(12));
        assert_eq!(file.char_to_byte(5), Some(15));
        assert_eq!(file.char_to_byte(6), None);

        let ids: Vec<TokenId> = file.overlapping(3, 9).iter().map(|s| s.token_id).collect();
        assert_eq!(ids, vec![0, 1]);
        let ids: Vec<TokenId> = file.overlapping(6, 9).iter().map(|s| s.token_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_search_file() {
        let corpus = create_test_corpus();
        let texts = TextIndex::build(&corpus);

        let pattern = SearchPattern::new("生が来", SearchMode::Wildcard).unwrap();
        let found = search_file(&texts.files()[0], &pattern);
        assert_eq!(
            found,
            vec![StringMatch {
                token_id: 3,
                match_start: 1,
                matched_string: "生が来".to_string(),
            }]
        );

        // matches never span files
        let pattern = SearchPattern::new("来る先", SearchMode::Wildcard).unwrap();
        assert!(texts.files().iter().all(|f| search_file(f, &pattern).is_empty()));

        let pattern = SearchPattern::new("先%生", SearchMode::Wildcard).unwrap();
        let found = search_file(&texts.files()[1], &pattern);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token_id, 5);
        assert_eq!(found[0].matched_string, "先生");
    }

    #[test]
    fn test_zero_length_matches_skipped() {
        let corpus = create_test_corpus();
        let texts = TextIndex::build(&corpus);

        let pattern = SearchPattern::new("x*", SearchMode::Regex).unwrap();
        assert!(search_file(&texts.files()[0], &pattern).is_empty());

        let pattern = SearchPattern::new("が?", SearchMode::Regex).unwrap();
        let found = search_file(&texts.files()[0], &pattern);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token_id, 1);
        assert_eq!(found[0].match_start, 2);
    }
}
