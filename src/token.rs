//! Token records and per-file metadata
//!
//! A corpus is one flat sequence of tokens ordered by file and then by
//! position in the file. The records here are the input side of the corpus;
//! [`crate::corpus::Corpus`] interns them into its read-only snapshot.

use crate::condition::AttributeType;
use crate::decade::{normalize_year, parse_year};

/// Position of a token in the corpus sequence (0-based, dense)
pub type TokenId = usize;

/// Whether a token opens a new sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SentenceBoundary {
    Initial,
    #[default]
    Continuation,
}

impl SentenceBoundary {
    /// Read the boundary column of a corpus line (`B` opens a sentence)
    pub fn from_marker(marker: &str) -> Self {
        if marker.trim() == "B" {
            SentenceBoundary::Initial
        } else {
            SentenceBoundary::Continuation
        }
    }

    pub fn is_initial(self) -> bool {
        self == SentenceBoundary::Initial
    }
}

/// A source line that could not be parsed into a token
///
/// The token stays in the sequence so that positions remain contiguous, but
/// it is never indexed and never satisfies a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    /// 1-based line number in the source
    pub line: usize,
    pub message: String,
    pub content: String,
}

/// Attribute access shared by owned tokens and corpus views
pub trait Attributes {
    /// Value of a condition attribute, `None` when absent
    fn attribute(&self, attribute: AttributeType) -> Option<&str>;

    /// True for placeholders of malformed source lines
    fn is_error(&self) -> bool;
}

/// One linguistic unit of the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub file_name: String,
    pub surface: Option<String>,
    pub lemma: Option<String>,
    pub lemma_reading: Option<String>,
    pub pos: Option<String>,
    pub conj_type: Option<String>,
    pub conj_form: Option<String>,
    pub pronunciation: Option<String>,
    pub word_class: Option<String>,
    pub subcorpus: Option<String>,
    /// Character offset of the token in its source text
    pub start_position: usize,
    /// End-position marker, keyed by the utterance index
    pub end_position: usize,
    pub boundary: SentenceBoundary,
    pub error: Option<TokenError>,
}

impl Token {
    /// Create a token with the three indexed attributes
    pub fn new(file_name: &str, surface: &str, lemma: &str, pos: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            surface: Some(surface.to_string()),
            lemma: Some(lemma.to_string()),
            pos: Some(pos.to_string()),
            ..Default::default()
        }
    }

    /// Create the placeholder for a malformed line
    pub fn error(file_name: &str, error: TokenError) -> Self {
        Self {
            file_name: file_name.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_conjugation(mut self, conj_type: &str, conj_form: &str) -> Self {
        self.conj_type = Some(conj_type.to_string());
        self.conj_form = Some(conj_form.to_string());
        self
    }

    pub fn with_boundary(mut self, boundary: SentenceBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Mark this token as the first of a sentence
    pub fn sentence_initial(self) -> Self {
        self.with_boundary(SentenceBoundary::Initial)
    }

    pub fn with_positions(mut self, start: usize, end: usize) -> Self {
        self.start_position = start;
        self.end_position = end;
        self
    }
}

impl Attributes for Token {
    fn attribute(&self, attribute: AttributeType) -> Option<&str> {
        match attribute {
            AttributeType::Surface => self.surface.as_deref(),
            AttributeType::Lemma => self.lemma.as_deref(),
            AttributeType::Pos => self.pos.as_deref(),
            AttributeType::ConjType => self.conj_type.as_deref(),
            AttributeType::ConjForm => self.conj_form.as_deref(),
        }
    }

    fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Descriptive metadata attached to every token of a file
///
/// Only `year` takes part in matching (through the decade filter); the other
/// fields are carried through for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub year: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub gender: Option<String>,
    pub title: Option<String>,
    pub speaker_count: Option<String>,
    pub speaker_id: Option<String>,
    pub speaker_age: Option<String>,
    pub speaker_occupation: Option<String>,
    pub url: Option<String>,
}

impl FileMetadata {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn with_genre(mut self, genre: &str) -> Self {
        self.genre = Some(genre.to_string());
        self
    }

    /// Set the year, normalized to four digits when the value starts with them
    pub fn with_year(mut self, year: &str) -> Self {
        self.year = normalize_year(year);
        self
    }

    /// Year as a number, if the year string starts with four digits
    pub fn parsed_year(&self) -> Option<i32> {
        self.year.as_deref().and_then(parse_year)
    }
}
