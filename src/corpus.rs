//! Immutable, interned corpus snapshot
//!
//! Every attribute string is interned once in a [`lasso::Rodeo`] while the
//! corpus is built and then frozen into a [`RodeoReader`]. Tokens are stored
//! as compact records of interned keys, indexed by [`TokenId`].

use crate::condition::AttributeType;
use crate::token::{Attributes, FileMetadata, SentenceBoundary, Token, TokenError, TokenId};
use lasso::{Rodeo, RodeoReader, Spur};
use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Range;

/// Interned form of a [`Token`]
#[derive(Debug, Clone, Copy)]
struct TokenRecord {
    /// Index into `Corpus::files`
    file: u32,
    surface: Option<Spur>,
    lemma: Option<Spur>,
    lemma_reading: Option<Spur>,
    pos: Option<Spur>,
    conj_type: Option<Spur>,
    conj_form: Option<Spur>,
    pronunciation: Option<Spur>,
    word_class: Option<Spur>,
    subcorpus: Option<Spur>,
    start_position: usize,
    end_position: usize,
    boundary: SentenceBoundary,
}

/// One contiguous run of tokens sharing a file name
#[derive(Debug, Clone)]
pub struct FileRange {
    name: Spur,
    pub range: Range<TokenId>,
}

/// Builder collecting tokens in corpus order
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    strings: Rodeo,
    records: Vec<TokenRecord>,
    files: Vec<FileRange>,
    errors: FxHashMap<TokenId, TokenError>,
    metadata: FxHashMap<String, FileMetadata>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, value: Option<&str>) -> Option<Spur> {
        value.map(|v| self.strings.get_or_intern(v))
    }

    fn open_file(&mut self, name: Spur, file_name: &str, id: TokenId) {
        if self.files.iter().any(|f| f.name == name) {
            warn!(
                "File {} reappears at token {}; its tokens are no longer contiguous",
                file_name, id
            );
        }
        self.files.push(FileRange {
            name,
            range: id..id + 1,
        });
    }

    /// Append a token and return its id
    pub fn push(&mut self, token: Token) -> TokenId {
        let id = self.records.len();
        let name = self.strings.get_or_intern(&token.file_name);

        match self.files.last_mut() {
            Some(last) if last.name == name => last.range.end = id + 1,
            _ => self.open_file(name, &token.file_name, id),
        }

        let record = TokenRecord {
            file: (self.files.len() - 1) as u32,
            surface: self.intern(token.surface.as_deref()),
            lemma: self.intern(token.lemma.as_deref()),
            lemma_reading: self.intern(token.lemma_reading.as_deref()),
            pos: self.intern(token.pos.as_deref()),
            conj_type: self.intern(token.conj_type.as_deref()),
            conj_form: self.intern(token.conj_form.as_deref()),
            pronunciation: self.intern(token.pronunciation.as_deref()),
            word_class: self.intern(token.word_class.as_deref()),
            subcorpus: self.intern(token.subcorpus.as_deref()),
            start_position: token.start_position,
            end_position: token.end_position,
            boundary: token.boundary,
        };
        self.records.push(record);

        if let Some(error) = token.error {
            self.errors.insert(id, error);
        }
        id
    }

    /// Set the metadata of a file, replacing any earlier value
    pub fn set_metadata(&mut self, file_name: &str, metadata: FileMetadata) {
        self.metadata.insert(file_name.to_string(), metadata);
    }

    /// Set the metadata of a file unless it already has some
    pub fn default_metadata(&mut self, file_name: &str, metadata: FileMetadata) {
        self.metadata
            .entry(file_name.to_string())
            .or_insert(metadata);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the builder into a read-only corpus
    pub fn build(self) -> Corpus {
        debug!(
            "Built corpus: {} tokens, {} files, {} error tokens, {} distinct strings",
            self.records.len(),
            self.files.len(),
            self.errors.len(),
            self.strings.len()
        );
        Corpus {
            strings: self.strings.into_reader(),
            records: self.records,
            files: self.files,
            errors: self.errors,
            metadata: self.metadata,
        }
    }
}

/// Read-only token sequence with file metadata
#[derive(Debug)]
pub struct Corpus {
    strings: RodeoReader,
    records: Vec<TokenRecord>,
    files: Vec<FileRange>,
    errors: FxHashMap<TokenId, TokenError>,
    metadata: FxHashMap<String, FileMetadata>,
}

impl Corpus {
    /// Build a corpus directly from tokens in order
    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut builder = CorpusBuilder::new();
        for token in tokens {
            builder.push(token);
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// View of a token, `None` when the id is out of range
    pub fn token(&self, id: TokenId) -> Option<TokenRef<'_>> {
        (id < self.records.len()).then_some(TokenRef { corpus: self, id })
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenRef<'_>> + '_ {
        (0..self.records.len()).map(move |id| TokenRef { corpus: self, id })
    }

    /// Contiguous file runs in corpus order
    pub fn file_ranges(&self) -> &[FileRange] {
        &self.files
    }

    pub fn file_range_name(&self, range: &FileRange) -> &str {
        self.strings.resolve(&range.name)
    }

    /// Number of distinct file names
    pub fn file_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| f.name)
            .collect::<FxHashSet<Spur>>()
            .len()
    }

    /// Index into [`Corpus::file_ranges`] of the run holding a token
    pub fn file_run(&self, id: TokenId) -> Option<usize> {
        self.records.get(id).map(|r| r.file as usize)
    }

    /// Whether two tokens belong to the same contiguous file run
    pub fn same_file(&self, a: TokenId, b: TokenId) -> bool {
        match (self.records.get(a), self.records.get(b)) {
            (Some(x), Some(y)) => x.file == y.file,
            _ => false,
        }
    }

    pub fn boundary(&self, id: TokenId) -> Option<SentenceBoundary> {
        self.records.get(id).map(|r| r.boundary)
    }

    pub fn metadata(&self, file_name: &str) -> Option<&FileMetadata> {
        self.metadata.get(file_name)
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Interned key of a string, `None` if no token carries it
    pub fn lookup(&self, value: &str) -> Option<Spur> {
        self.strings.get(value)
    }

    pub fn resolve(&self, key: Spur) -> &str {
        self.strings.resolve(&key)
    }

    /// Interned key of an attribute value
    pub(crate) fn attribute_key(&self, id: TokenId, attribute: AttributeType) -> Option<Spur> {
        let record = self.records.get(id)?;
        match attribute {
            AttributeType::Surface => record.surface,
            AttributeType::Lemma => record.lemma,
            AttributeType::Pos => record.pos,
            AttributeType::ConjType => record.conj_type,
            AttributeType::ConjForm => record.conj_form,
        }
    }
}

/// Borrowed view of one token of a [`Corpus`]
#[derive(Debug, Clone, Copy)]
pub struct TokenRef<'a> {
    corpus: &'a Corpus,
    id: TokenId,
}

impl<'a> TokenRef<'a> {
    fn record(&self) -> &'a TokenRecord {
        &self.corpus.records[self.id]
    }

    fn resolve(&self, key: Option<Spur>) -> Option<&'a str> {
        key.map(|k| self.corpus.strings.resolve(&k))
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn file_name(&self) -> &'a str {
        let range = &self.corpus.files[self.record().file as usize];
        self.corpus.strings.resolve(&range.name)
    }

    pub fn surface(&self) -> Option<&'a str> {
        self.resolve(self.record().surface)
    }

    pub fn lemma(&self) -> Option<&'a str> {
        self.resolve(self.record().lemma)
    }

    pub fn lemma_reading(&self) -> Option<&'a str> {
        self.resolve(self.record().lemma_reading)
    }

    pub fn pos(&self) -> Option<&'a str> {
        self.resolve(self.record().pos)
    }

    pub fn conj_type(&self) -> Option<&'a str> {
        self.resolve(self.record().conj_type)
    }

    pub fn conj_form(&self) -> Option<&'a str> {
        self.resolve(self.record().conj_form)
    }

    pub fn pronunciation(&self) -> Option<&'a str> {
        self.resolve(self.record().pronunciation)
    }

    pub fn word_class(&self) -> Option<&'a str> {
        self.resolve(self.record().word_class)
    }

    pub fn subcorpus(&self) -> Option<&'a str> {
        self.resolve(self.record().subcorpus)
    }

    pub fn start_position(&self) -> usize {
        self.record().start_position
    }

    pub fn end_position(&self) -> usize {
        self.record().end_position
    }

    pub fn boundary(&self) -> SentenceBoundary {
        self.record().boundary
    }

    pub fn error(&self) -> Option<&'a TokenError> {
        self.corpus.errors.get(&self.id)
    }

    pub fn metadata(&self) -> Option<&'a FileMetadata> {
        self.corpus.metadata(self.file_name())
    }

    /// Surface form for display; empty for error tokens
    pub fn display_text(&self) -> &'a str {
        if self.is_error() {
            ""
        } else {
            self.surface().unwrap_or("")
        }
    }
}

impl Attributes for TokenRef<'_> {
    fn attribute(&self, attribute: AttributeType) -> Option<&str> {
        if self.is_error() {
            return None;
        }
        self.resolve(self.corpus.attribute_key(self.id, attribute))
    }

    fn is_error(&self) -> bool {
        self.corpus.errors.contains_key(&self.id)
    }
}
