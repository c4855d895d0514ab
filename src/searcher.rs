//! End-to-end search over one corpus snapshot
//!
//! A [`Searcher`] owns an immutable corpus together with the indexes built
//! from it and runs the two query pipelines:
//!
//! 1. Structured: validate, look up key candidates, apply the year filter,
//!    resolve context conditions, expand combinations.
//! 2. String: compile the wildcard or regex pattern, scan every file text,
//!    apply the year filter to each match.

use crate::candidates::get_candidates;
use crate::combination::{MatchResult, expand};
use crate::condition::{ConditionError, StructuredQuery};
use crate::config::SearchConfig;
use crate::context::Resolver;
use crate::corpus::Corpus;
use crate::decade::YearFilter;
use crate::index::CorpusIndex;
use crate::kwic::{self, KwicLine};
use crate::parser::{ParseError, parse_query};
use crate::token::TokenId;
use crate::wildcard::{PatternError, SearchMode, SearchPattern, StringMatch, TextIndex, search_file};
use log::{debug, info};
use thiserror::Error;

/// Error during search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid condition: {0}")]
    Condition(#[from] ConditionError),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No corpus is loaded")]
    NotReady,

    #[error("Another query is in progress")]
    Busy,
}

/// A structured query together with its year filter
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub query: StructuredQuery,
    pub years: YearFilter,
    /// Overrides [`SearchConfig::cross_sentence_boundary`] for this request
    pub cross_sentence_boundary: Option<bool>,
}

impl StructuredRequest {
    pub fn new(query: StructuredQuery) -> Self {
        Self {
            query,
            years: YearFilter::all(),
            cross_sentence_boundary: None,
        }
    }

    pub fn with_years(mut self, years: YearFilter) -> Self {
        self.years = years;
        self
    }

    pub fn with_cross_sentence_boundary(mut self, cross: bool) -> Self {
        self.cross_sentence_boundary = Some(cross);
        self
    }
}

/// A wildcard or regex string query together with its year filter
#[derive(Debug, Clone)]
pub struct StringRequest {
    pub query: String,
    pub mode: SearchMode,
    pub years: YearFilter,
}

impl StringRequest {
    pub fn new(query: &str, mode: SearchMode) -> Self {
        Self {
            query: query.to_string(),
            mode,
            years: YearFilter::all(),
        }
    }

    pub fn with_years(mut self, years: YearFilter) -> Self {
        self.years = years;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateHits {
    pub token_ids: Vec<TokenId>,
    pub total_hits: usize,
    /// Malformed tokens in the corpus, reported alongside every result
    pub error_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredHits {
    pub results: Vec<MatchResult>,
    pub total_hits: usize,
    pub error_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringHits {
    pub matches: Vec<StringMatch>,
    pub total_hits: usize,
    pub error_tokens: usize,
}

/// A corpus snapshot with its inverted index and per-file texts
#[derive(Debug)]
pub struct Searcher {
    corpus: Corpus,
    index: CorpusIndex,
    texts: TextIndex,
    config: SearchConfig,
}

impl Searcher {
    pub fn new(corpus: Corpus) -> Self {
        Self::with_config(corpus, SearchConfig::default())
    }

    /// Build every index for `corpus`
    pub fn with_config(corpus: Corpus, config: SearchConfig) -> Self {
        let index = CorpusIndex::build(&corpus);
        let texts = TextIndex::build(&corpus);
        info!(
            "Loaded corpus: {} tokens in {} files ({} malformed)",
            corpus.len(),
            corpus.file_count(),
            corpus.error_count()
        );
        Self {
            corpus,
            index,
            texts,
            config,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn texts(&self) -> &TextIndex {
        &self.texts
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn key_candidates(&self, request: &StructuredRequest) -> Result<Vec<TokenId>, SearchError> {
        request.query.validate(&self.config)?;
        let mut candidates = get_candidates(&self.corpus, &self.index, &request.query.key);
        candidates.retain(|&id| {
            request
                .years
                .passes(self.corpus.token(id).and_then(|t| t.metadata()))
        });
        Ok(candidates)
    }

    /// Key tokens that satisfy the key condition and the year filter
    pub fn find_candidates(&self, request: &StructuredRequest) -> Result<CandidateHits, SearchError> {
        let token_ids = self.key_candidates(request)?;
        info!("Found {} key candidates", token_ids.len());
        Ok(CandidateHits {
            total_hits: token_ids.len(),
            token_ids,
            error_tokens: self.corpus.error_count(),
        })
    }

    /// Run the full structured pipeline
    pub fn search(&self, request: &StructuredRequest) -> Result<StructuredHits, SearchError> {
        let candidates = self.key_candidates(request)?;
        let cross_boundary = request
            .cross_sentence_boundary
            .unwrap_or(self.config.cross_sentence_boundary);
        let resolver = Resolver::new(&self.corpus, cross_boundary);
        let query = &request.query;

        let mut results = Vec::new();
        let mut resolved = 0;
        for &key in &candidates {
            if let Some(matches) = resolver.resolve(key, &query.pre, &query.post) {
                resolved += 1;
                results.extend(expand(key, &matches));
            }
        }

        debug!("{} of {} candidates resolved", resolved, candidates.len());
        info!("Structured search: {} results", results.len());
        Ok(StructuredHits {
            total_hits: results.len(),
            results,
            error_tokens: self.corpus.error_count(),
        })
    }

    /// Parse a textual query and run it
    pub fn search_query(&self, text: &str, years: YearFilter) -> Result<StructuredHits, SearchError> {
        let query = parse_query(text)?;
        self.search(&StructuredRequest::new(query).with_years(years))
    }

    /// Wildcard or regex search over the surface text of every file
    pub fn search_string(&self, request: &StringRequest) -> Result<StringHits, SearchError> {
        let pattern = SearchPattern::new(&request.query, request.mode)?;
        debug!("Compiled {} query {:?} to {}", pattern.mode(), pattern.source(), pattern.as_str());

        let matches: Vec<StringMatch> = self
            .texts
            .files()
            .iter()
            .flat_map(|file| search_file(file, &pattern))
            .filter(|hit| {
                request
                    .years
                    .passes(self.corpus.token(hit.token_id).and_then(|t| t.metadata()))
            })
            .collect();

        info!("String search: {} matches", matches.len());
        Ok(StringHits {
            total_hits: matches.len(),
            matches,
            error_tokens: self.corpus.error_count(),
        })
    }

    /// Display records for string matches
    pub fn rehydrate(&self, hits: &[StringMatch]) -> Vec<KwicLine> {
        kwic::rehydrate_all(&self.corpus, &self.texts, hits, &self.config)
    }

    /// Display record for a structured match
    pub fn context_window(&self, result: &MatchResult) -> Option<KwicLine> {
        kwic::context_window(&self.corpus, result, &self.config)
    }
}
