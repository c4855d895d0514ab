//! Tab-separated corpus files
//!
//! Each line holds one token with 9 or 13 tab-separated fields:
//!
//! ```text
//! file  subcorpus  start  end  boundary  surface  lemma  lemma_reading  pos
//!       [conj_type  conj_form  pronunciation  word_class]
//! ```
//!
//! Lines with any other field count become error tokens so that the token
//! sequence stays contiguous. Files ending in `.gz` are decompressed on the
//! fly.

use crate::corpus::{Corpus, CorpusBuilder};
use crate::token::{FileMetadata, SentenceBoundary, Token, TokenError};
use bstr::ByteSlice;
use flate2::read::MultiGzDecoder;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SHORT_FIELD_COUNT: usize = 9;
const LONG_FIELD_COUNT: usize = 13;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("IO error at line {line}: {source}")]
    Io { line: usize, source: io::Error },
}

/// Reader that yields one token per non-empty line
pub struct TsvReader<R: BufRead> {
    reader: R,
    source: String,
    line_num: usize,
    buf: Vec<u8>,
}

impl TsvReader<Box<dyn BufRead>> {
    /// Create a reader from a file path, decompressing `.gz` files
    pub fn from_file(path: &Path) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader, &source_name(path)))
    }
}

impl<'a> TsvReader<&'a [u8]> {
    /// Create a reader from a string
    pub fn from_str(text: &'a str, source: &str) -> Self {
        Self::new(text.as_bytes(), source)
    }
}

impl<R: BufRead> TsvReader<R> {
    pub fn new(reader: R, source: &str) -> Self {
        Self {
            reader,
            source: source.to_string(),
            line_num: 0,
            buf: Vec::new(),
        }
    }

    /// Name of the source, used for error tokens without a file name
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<R: BufRead> Iterator for TsvReader<R> {
    type Item = Result<Token, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_num += 1,
                Err(source) => {
                    return Some(Err(ReadError::Io {
                        line: self.line_num + 1,
                        source,
                    }));
                }
            }

            let line = self.buf.trim_end_with(|c| c == '\n' || c == '\r');
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok(parse_line(line, self.line_num, &self.source)));
        }
    }
}

/// Split a line on tabs
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(LONG_FIELD_COUNT);
    let mut start = 0;
    for tab in memchr::memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[start..tab]);
        start = tab + 1;
    }
    fields.push(&line[start..]);
    fields
}

fn parse_position(field: &str) -> Option<usize> {
    atoi::atoi::<usize>(field.trim().as_bytes())
}

/// Parse one raw line into a token (or an error token)
pub fn parse_line(line: &[u8], line_num: usize, source: &str) -> Token {
    let text = line.to_str_lossy();
    let fields = split_fields(&text);

    let file_name = match fields.first() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{source}.txt"),
    };

    if fields.len() != SHORT_FIELD_COUNT && fields.len() != LONG_FIELD_COUNT {
        let mut token = Token::error(
            &file_name,
            TokenError {
                line: line_num,
                message: format!(
                    "Invalid field count ({}, expected {} or {})",
                    fields.len(),
                    SHORT_FIELD_COUNT,
                    LONG_FIELD_COUNT
                ),
                content: text.to_string(),
            },
        );
        token.subcorpus = fields.get(1).map(|s| s.to_string());
        return token;
    }

    let field = |i: usize| fields.get(i).map(|s| s.to_string());
    let start_position = parse_position(fields[2]).unwrap_or(0);
    let end_position = parse_position(fields[3]).unwrap_or(start_position);

    Token {
        file_name,
        subcorpus: field(1),
        start_position,
        end_position,
        boundary: SentenceBoundary::from_marker(fields[4]),
        surface: field(5),
        lemma: field(6),
        lemma_reading: field(7),
        pos: field(8),
        conj_type: field(9),
        conj_form: field(10),
        pronunciation: field(11),
        word_class: field(12),
        error: None,
    }
}

/// File name without directories and without `.gz` / `.txt`-style extensions
pub fn source_name(path: &Path) -> String {
    let mut name = path.file_name().map(Path::new).unwrap_or(path);
    if name.extension().is_some_and(|ext| ext == "gz") {
        name = name.file_stem().map(Path::new).unwrap_or(name);
    }
    name.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_digits(bytes: Option<&[u8]>) -> bool {
    bytes.is_some_and(|b| !b.is_empty() && b.iter().all(u8::is_ascii_digit))
}

/// Strip a `NN_NN_` or `NN.NN` volume prefix
fn strip_volume_prefix(name: &str) -> &str {
    let b = name.as_bytes();
    if b.len() > 6 && is_digits(b.get(0..2)) && b[2] == b'_' && is_digits(b.get(3..5)) && b[5] == b'_' {
        return &name[6..];
    }
    if b.len() > 5 && is_digits(b.get(0..2)) && b[2] == b'.' && is_digits(b.get(3..5)) {
        return &name[5..];
    }
    name
}

/// Strip a `_S<digits>` serial suffix
fn strip_serial_suffix(name: &str) -> &str {
    match name.rfind("_S") {
        Some(pos) if pos > 0 && is_digits(name.get(pos + 2..).map(str::as_bytes)) => &name[..pos],
        _ => name,
    }
}

/// Guess a work title from a source name
///
/// `"Author Title"` yields the title; otherwise volume prefixes and serial
/// suffixes are removed.
pub fn extract_work_title(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }

    let mut chars = name.char_indices();
    chars.next();
    if let Some((pos, _)) = chars.find(|(_, c)| c.is_whitespace()) {
        let title = name[pos..].trim();
        if !title.is_empty() {
            return Some(title.to_string());
        }
    }

    Some(strip_serial_suffix(strip_volume_prefix(name)).to_string())
}

/// Metadata guessed from a source name
pub fn metadata_from_source_name(name: &str) -> FileMetadata {
    let mut metadata = FileMetadata {
        title: extract_work_title(name),
        ..Default::default()
    };
    if let Some((author, title)) = name.split_once(' ')
        && !author.is_empty()
        && !title.trim().is_empty()
    {
        metadata.author = Some(author.trim().to_string());
        if metadata.title.as_deref() == Some(name) {
            metadata.title = Some(title.trim().to_string());
        }
    }
    metadata
}

/// Append every token of a reader to `builder`
///
/// Files first seen in this source get metadata guessed from the source name
/// unless the builder already has some for them.
pub fn load_reader<R: BufRead>(
    builder: &mut CorpusBuilder,
    reader: TsvReader<R>,
) -> Result<usize, ReadError> {
    let metadata = metadata_from_source_name(reader.source());
    let mut last_file: Option<String> = None;
    let mut count = 0;

    for token in reader {
        let token = token?;
        if last_file.as_deref() != Some(token.file_name.as_str()) {
            builder.default_metadata(&token.file_name, metadata.clone());
            last_file = Some(token.file_name.clone());
        }
        builder.push(token);
        count += 1;
    }
    Ok(count)
}

/// Build a corpus from an in-memory TSV string
pub fn load_str(text: &str, source: &str) -> Result<Corpus, ReadError> {
    let mut builder = CorpusBuilder::new();
    load_reader(&mut builder, TsvReader::from_str(text, source))?;
    Ok(builder.build())
}

/// Build a corpus from files in the given order, skipping unreadable ones
pub fn load_paths(paths: &[PathBuf]) -> Corpus {
    let mut builder = CorpusBuilder::new();
    for path in paths {
        let reader = match TsvReader::from_file(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };
        match load_reader(&mut builder, reader) {
            Ok(count) => info!("Read {} tokens from {:?}", count, path),
            Err(e) => warn!("Stopped reading {:?}: {}", path, e),
        }
    }
    builder.build()
}

/// Build a corpus from every file matching a glob pattern
///
/// Files are read in sorted order for deterministic token ids.
pub fn load_glob(pattern: &str) -> Result<Corpus, glob::PatternError> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
    paths.sort();
    Ok(load_paths(&paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Attributes;

    const SAMPLE: &str = "A\tsub\t0\t2\tB\t先生\t先生\tセンセイ\t名詞-普通名詞-一般\n\
A\tsub\t2\t3\tI\tが\tが\tガ\t助詞-格助詞\n\
\n\
A\tsub\t3\t4\tI\t来\t来る\tクル\t動詞-非自立可能\tカ行変格\t連用形-一般\tキ\t和\n\
broken line\n";

    #[test]
    fn test_parse_lines() {
        let tokens: Vec<Token> = TsvReader::from_str(SAMPLE, "upload")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tokens.len(), 4);

        assert_eq!(tokens[0].file_name, "A");
        assert_eq!(tokens[0].surface.as_deref(), Some("先生"));
        assert_eq!(tokens[0].lemma_reading.as_deref(), Some("センセイ"));
        assert_eq!(tokens[0].boundary, SentenceBoundary::Initial);
        assert_eq!(tokens[0].end_position, 2);
        assert_eq!(tokens[0].conj_type, None);

        assert_eq!(tokens[1].boundary, SentenceBoundary::Continuation);

        assert_eq!(tokens[2].conj_form.as_deref(), Some("連用形-一般"));
        assert_eq!(tokens[2].word_class.as_deref(), Some("和"));
        assert_eq!(tokens[2].start_position, 3);
    }

    #[test]
    fn test_error_line() {
        let tokens: Vec<Token> = TsvReader::from_str(SAMPLE, "upload")
            .collect::<Result<_, _>>()
            .unwrap();
        let error = &tokens[3];
        assert!(error.is_error());
        assert_eq!(error.file_name, "broken line");
        let info = error.error.as_ref().unwrap();
        assert_eq!(info.line, 5);
        assert_eq!(info.content, "broken line");
        assert!(info.message.contains("(1, expected 9 or 13)"));

        let token = parse_line(b"\tx\ty", 7, "upload");
        assert!(token.is_error());
        assert_eq!(token.file_name, "upload.txt");
        assert_eq!(token.subcorpus.as_deref(), Some("x"));
    }

    #[test]
    fn test_position_fallback() {
        let token = parse_line("A\ts\tx\t-1\tI\ta\ta\ta\tp".as_bytes(), 1, "src");
        assert_eq!(token.start_position, 0);
        assert_eq!(token.end_position, 0);

        let token = parse_line("A\ts\t5\t\tI\ta\ta\ta\tp\r".as_bytes(), 1, "src");
        assert_eq!(token.end_position, 5);
        assert_eq!(token.pos.as_deref(), Some("p\r"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let token = parse_line(b"A\ts\t0\t1\tI\t\xff\ta\ta\tp", 1, "src");
        assert_eq!(token.surface.as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn test_work_titles() {
        assert_eq!(extract_work_title("夏目漱石 こころ").as_deref(), Some("こころ"));
        assert_eq!(extract_work_title("01_02_牡丹灯籠_S003").as_deref(), Some("牡丹灯籠"));
        assert_eq!(extract_work_title("01_02_牡丹灯籠").as_deref(), Some("牡丹灯籠"));
        assert_eq!(extract_work_title("54.01夢浮橋").as_deref(), Some("夢浮橋"));
        assert_eq!(extract_work_title("作品_S12").as_deref(), Some("作品"));
        assert_eq!(extract_work_title("_S12").as_deref(), Some("_S12"));
        assert_eq!(extract_work_title("plain").as_deref(), Some("plain"));
        assert_eq!(extract_work_title(""), None);
    }

    #[test]
    fn test_metadata_from_source_name() {
        let meta = metadata_from_source_name("夏目漱石 こころ");
        assert_eq!(meta.author.as_deref(), Some("夏目漱石"));
        assert_eq!(meta.title.as_deref(), Some("こころ"));

        let meta = metadata_from_source_name("01_02_牡丹灯籠");
        assert_eq!(meta.author, None);
        assert_eq!(meta.title.as_deref(), Some("牡丹灯籠"));
    }

    #[test]
    fn test_source_name() {
        assert_eq!(source_name(Path::new("/data/夏目漱石 こころ.txt")), "夏目漱石 こころ");
        assert_eq!(source_name(Path::new("corpus.tsv.gz")), "corpus");
        assert_eq!(source_name(Path::new("plain")), "plain");
    }

    #[test]
    fn test_load_str() {
        let corpus = load_str(SAMPLE, "夏目漱石 こころ").unwrap();
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus.error_count(), 1);
        let meta = corpus.metadata("A").unwrap();
        assert_eq!(meta.title.as_deref(), Some("こころ"));
        assert_eq!(corpus.token(2).unwrap().lemma(), Some("来る"));
    }

    mod multi_file {
        use super::*;
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::fs;
        use std::io::Write;
        use tempfile::{TempDir, tempdir};

        /// Helper to create test files with given content
        fn create_test_files(contents: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
            let dir = tempdir().unwrap();
            let mut paths = Vec::new();

            for (filename, content) in contents {
                let path = dir.path().join(filename);
                let mut file = fs::File::create(&path).unwrap();
                write!(file, "{}", content).unwrap();
                paths.push(path);
            }

            (dir, paths)
        }

        #[test]
        fn test_load_paths() {
            let (_dir, paths) = create_test_files(&[
                ("b.txt", "B\ts\t0\t1\tB\t本\t本\tホン\t名詞\n"),
                ("a.txt", "A\ts\t0\t1\tB\t私\t私\tワタクシ\t代名詞\n"),
            ]);

            let corpus = load_paths(&paths);
            assert_eq!(corpus.len(), 2);
            assert_eq!(corpus.token(0).unwrap().file_name(), "B");
            assert_eq!(corpus.file_ranges().len(), 2);
        }

        #[test]
        fn test_load_glob_sorted() {
            let (dir, _paths) = create_test_files(&[
                ("b.txt", "B\ts\t0\t1\tB\t本\t本\tホン\t名詞\n"),
                ("a.txt", "A\ts\t0\t1\tB\t私\t私\tワタクシ\t代名詞\n"),
            ]);

            let pattern = format!("{}/*.txt", dir.path().display());
            let corpus = load_glob(&pattern).unwrap();
            assert_eq!(corpus.len(), 2);
            assert_eq!(corpus.token(0).unwrap().file_name(), "A");
            assert_eq!(corpus.token(1).unwrap().file_name(), "B");
        }

        #[test]
        fn test_missing_file_skipped() {
            let (dir, mut paths) = create_test_files(&[("a.txt", "A\ts\t0\t1\tB\t私\t私\tワタクシ\t代名詞\n")]);
            paths.insert(0, dir.path().join("missing.txt"));

            let corpus = load_paths(&paths);
            assert_eq!(corpus.len(), 1);
        }

        #[test]
        fn test_gzip_file() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("corpus.txt.gz");
            let mut encoder = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
            encoder
                .write_all("A\ts\t0\t1\tB\t私\t私\tワタクシ\t代名詞\nA\ts\t1\t2\tI\tの\tの\tノ\t助詞\n".as_bytes())
                .unwrap();
            encoder.finish().unwrap();

            let reader = TsvReader::from_file(&path).unwrap();
            assert_eq!(reader.source(), "corpus");
            let tokens: Vec<Token> = reader.collect::<Result<_, _>>().unwrap();
            assert_eq!(tokens.len(), 2);
            assert_eq!(tokens[1].surface.as_deref(), Some("の"));
        }

        #[test]
        fn test_open_error() {
            let dir = tempdir().unwrap();
            let result = TsvReader::from_file(&dir.path().join("nope.txt"));
            assert!(matches!(result, Err(ReadError::Open { .. })));
        }
    }
}
