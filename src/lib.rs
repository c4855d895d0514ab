//! Corpusquery: structured co-occurrence and string search over tagged corpora
//!
//! Tokens carry a surface form, lemma, part of speech and conjugation
//! attributes. Structured queries match a key condition and then require
//! context conditions within a window around each key; string queries run a
//! wildcard or regex pattern over the running text of each file and map the
//! hits back onto tokens.

// Data model
pub mod condition; // Typed conditions and validation
pub mod config; // Search limits and display settings
pub mod corpus; // Interned, read-only token store
pub mod token; // Tokens and file metadata
pub mod tsv; // Tab-separated corpus files (plain or gzip)

// Structured search
pub mod candidates; // Key candidate lookup
pub mod combination; // Cartesian expansion into match results
pub mod context; // Co-occurrence windows with sentence and file boundaries
pub mod index; // Inverted indices for candidate lookup
pub mod matcher; // Attribute and compound condition matching
pub mod parser; // Query language parser

// String search
pub mod kwic; // Rehydration into keyword-in-context lines
pub mod wildcard; // Wildcard/regex translation and per-file text scan

pub mod decade; // Year and decade filtering
pub mod searcher; // End-to-end search over one snapshot
pub mod service; // Single in-flight query over swappable snapshots
pub mod stats; // Token counts by decade

// Re-exports for convenience
pub use condition::{
    AttributeCondition, AttributeType, Condition, ConditionError, ContextCondition, Logic,
    RangeMode, StructuredQuery,
};
pub use config::SearchConfig;
pub use corpus::{Corpus, CorpusBuilder, TokenRef};
pub use decade::{Decade, YearFilter};
pub use kwic::KwicLine;
pub use parser::{ParseError, parse_query};
pub use searcher::{SearchError, Searcher, StringRequest, StructuredRequest};
pub use service::{SearchService, Stamped};
pub use token::{FileMetadata, SentenceBoundary, Token, TokenId};
pub use tsv::TsvReader;
pub use wildcard::SearchMode;
