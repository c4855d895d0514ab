//! Query service with a single in-flight query
//!
//! The service holds the current [`Searcher`] snapshot. Loading a corpus
//! builds a complete new snapshot and swaps it in at once; a query that is
//! already running keeps the snapshot it started with. Each result is
//! stamped with the generation of the snapshot it came from so callers can
//! drop results of a corpus that has since been replaced.

use crate::config::SearchConfig;
use crate::corpus::Corpus;
use crate::searcher::{
    CandidateHits, SearchError, Searcher, StringHits, StringRequest, StructuredHits,
    StructuredRequest,
};
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

/// A result together with the snapshot generation it was computed against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<T> {
    pub generation: u64,
    pub hits: T,
}

#[derive(Debug)]
struct Snapshot {
    generation: u64,
    searcher: Arc<Searcher>,
}

#[derive(Debug, Default)]
pub struct SearchService {
    config: SearchConfig,
    snapshot: RwLock<Option<Snapshot>>,
    in_flight: Mutex<()>,
    generation: AtomicU64,
}

impl SearchService {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Index `corpus` and make it the current snapshot
    ///
    /// Returns the generation of the new snapshot.
    pub fn load(&self, corpus: Corpus) -> u64 {
        let searcher = Arc::new(Searcher::with_config(corpus, self.config.clone()));

        // generation is assigned under the write lock
        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = Some(Snapshot {
            generation,
            searcher,
        });
        info!("Corpus snapshot {} is ready", generation);
        generation
    }

    /// Drop the current snapshot
    pub fn clear(&self) {
        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Generation of the current snapshot, if any
    pub fn generation(&self) -> Option<u64> {
        self.current().map(|(generation, _)| generation)
    }

    /// The current snapshot, for rehydrating results outside a query
    pub fn current(&self) -> Option<(u64, Arc<Searcher>)> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| (s.generation, Arc::clone(&s.searcher)))
    }

    fn run<T>(
        &self,
        query: impl FnOnce(&Searcher) -> Result<T, SearchError>,
    ) -> Result<Stamped<T>, SearchError> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("Rejected query: another query is in progress");
                return Err(SearchError::Busy);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let (generation, searcher) = self.current().ok_or(SearchError::NotReady)?;
        Ok(Stamped {
            generation,
            hits: query(&searcher)?,
        })
    }

    pub fn structured(&self, request: &StructuredRequest) -> Result<Stamped<StructuredHits>, SearchError> {
        self.run(|searcher| searcher.search(request))
    }

    pub fn candidates(&self, request: &StructuredRequest) -> Result<Stamped<CandidateHits>, SearchError> {
        self.run(|searcher| searcher.find_candidates(request))
    }

    pub fn string(&self, request: &StringRequest) -> Result<Stamped<StringHits>, SearchError> {
        self.run(|searcher| searcher.search_string(request))
    }
}
