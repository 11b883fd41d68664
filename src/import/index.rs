//! Multistream index reader
//!
//! A multistream dump ships with an index of `offset:page_offset:title` lines,
//! one per page. The byte offset names the start of the bzip2 segment holding
//! the page. Offsets in the published indexes were produced by a 32-bit
//! counter, so they wrap back to small (or negative) values every 2^32 bytes;
//! [`IndexReader`] reconstructs the real offset by assuming the sequence
//! never decreases.

use super::source::ImportError;
use std::fmt;
use std::io::BufRead;

/// Amount added to the running base each time the raw offset wraps
const WRAP_MODULUS: i64 = 1 << 32;

/// An individual page entry from the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Byte offset of the segment containing this page, wrap corrected
    pub stream_offset: i64,
    /// Page offset as recorded in the index
    pub page_offset: i32,
    /// Page title (may itself contain colons)
    pub article_name: String,
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.stream_offset, self.page_offset, self.article_name
        )
    }
}

/// One compressed segment: `count` consecutive pages starting at `offset`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexChunk {
    pub offset: i64,
    pub count: usize,
}

impl IndexChunk {
    pub fn new(offset: i64, count: usize) -> Self {
        Self { offset, count }
    }
}

/// Reads index entries line by line, correcting for offset wraparound
pub struct IndexReader<R> {
    reader: R,
    line: String,
    line_number: u64,
    base: i64,
    prev_offset: i64,
}

impl<R: BufRead> IndexReader<R> {
    /// Create a reader over a stream of index lines
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            base: 0,
            prev_offset: 0,
        }
    }

    /// Read the next entry, or `None` at the end of the index
    pub fn next_entry(&mut self) -> Result<Option<IndexEntry>, ImportError> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let line = self.line.trim_end_matches(['\n', '\r']);
        let mut parts = line.splitn(3, ':');
        let (Some(raw_offset), Some(page_offset), Some(name)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ImportError::malformed(self.line_number, "bad record"));
        };

        let offset: i64 = raw_offset.parse().map_err(|e| {
            ImportError::malformed(
                self.line_number,
                format!("invalid stream offset {:?}: {}", raw_offset, e),
            )
        })?;
        let page_offset: i32 = page_offset.parse().map_err(|e| {
            ImportError::malformed(
                self.line_number,
                format!("invalid page offset {:?}: {}", page_offset, e),
            )
        })?;

        if offset < self.prev_offset {
            self.base = self.base.checked_add(WRAP_MODULUS).ok_or_else(|| {
                ImportError::malformed(self.line_number, "too many offset wraps")
            })?;
        }
        self.prev_offset = offset;

        let stream_offset = offset.checked_add(self.base).ok_or_else(|| {
            ImportError::malformed(
                self.line_number,
                format!("stream offset {} overflows after wrap correction", offset),
            )
        })?;

        Ok(Some(IndexEntry {
            stream_offset,
            page_offset,
            article_name: name.to_string(),
        }))
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

impl<R: BufRead> Iterator for IndexReader<R> {
    type Item = Result<IndexEntry, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// One step of an [`IndexSummaryReader`]
///
/// The last real chunk arrives together with the end-of-stream signal as
/// [`Summary::Final`]; it carries data and must not be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    /// A complete run of entries; more follow
    Chunk(IndexChunk),
    /// The last pending run, delivered alongside end of stream
    Final(IndexChunk),
    /// Called again after `Final`; carries an empty chunk
    Exhausted,
}

impl Summary {
    /// The chunk carried by this step (`(0, 0)` once exhausted)
    pub fn chunk(&self) -> IndexChunk {
        match self {
            Summary::Chunk(chunk) | Summary::Final(chunk) => *chunk,
            Summary::Exhausted => IndexChunk::default(),
        }
    }

    /// Whether the underlying index has been fully consumed
    pub fn is_end(&self) -> bool {
        !matches!(self, Summary::Chunk(_))
    }
}

/// Collapses consecutive index entries sharing an offset into chunks
///
/// Use this when only segment positions and page counts matter, not the
/// individual titles.
pub struct IndexSummaryReader<R> {
    index: IndexReader<R>,
    current: IndexChunk,
    finished: bool,
}

impl<R: BufRead> IndexSummaryReader<R> {
    /// Create a summary reader, failing if the index has no entries
    pub fn new(reader: R) -> Result<Self, ImportError> {
        let mut index = IndexReader::new(reader);
        let first = index.next_entry()?.ok_or(ImportError::EmptyIndex)?;

        Ok(Self {
            index,
            current: IndexChunk::new(first.stream_offset, 1),
            finished: false,
        })
    }

    /// Pull entries until the offset changes and return the completed run
    pub fn next_summary(&mut self) -> Result<Summary, ImportError> {
        if self.finished {
            return Ok(Summary::Exhausted);
        }

        loop {
            match self.index.next_entry()? {
                Some(entry) if entry.stream_offset == self.current.offset => {
                    self.current.count += 1;
                }
                Some(entry) => {
                    let done = std::mem::replace(
                        &mut self.current,
                        IndexChunk::new(entry.stream_offset, 1),
                    );
                    return Ok(Summary::Chunk(done));
                }
                None => {
                    self.finished = true;
                    return Ok(Summary::Final(std::mem::take(&mut self.current)));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for IndexSummaryReader<R> {
    type Item = Result<IndexChunk, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_summary() {
            Ok(Summary::Chunk(chunk)) | Ok(Summary::Final(chunk)) => Some(Ok(chunk)),
            Ok(Summary::Exhausted) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
