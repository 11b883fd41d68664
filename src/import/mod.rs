//! Readers for Wikimedia XML dumps
//!
//! Two layouts are supported:
//!
//! - **Single stream**: one continuous (optionally bzip2 compressed) XML
//!   document, read front to back by [`SingleStreamReader`].
//! - **Multistream**: many independently compressed bzip2 segments plus an
//!   index of `offset:page_offset:title` lines. [`IndexedReader`] uses the
//!   index to decode segments in parallel.
//!
//! # Example Usage
//!
//! ```no_run
//! use wikidump::import::{open_indexed, PageStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = open_indexed(
//!     "enwiki-latest-pages-articles-multistream-index.txt.bz2",
//!     "enwiki-latest-pages-articles-multistream.xml.bz2",
//!     8,
//! )?;
//! println!("Reading {}", reader.site_info().site_name);
//!
//! for page in reader {
//!     match page {
//!         Ok(page) => println!("{}", page.title),
//!         Err(e) if e.is_fatal() => return Err(e.into()),
//!         Err(e) => eprintln!("skipped: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Both readers yield `Result<Page, ImportError>`: a broken page or segment
//! is reported as an `Err` item and reading continues, while
//! [`ImportError::is_fatal`] errors end the stream.

pub mod index;
pub mod multistream;
pub mod page;
pub mod payload;
pub mod progress;
pub mod source;
pub mod wikimedia;

// Re-export main types
pub use index::{IndexChunk, IndexEntry, IndexReader, IndexSummaryReader, Summary};
pub use multistream::IndexedReader;
pub use page::{Contributor, Namespace, Page, PageDecoder, Revision, SiteInfo};
pub use payload::{open_text, open_text_file, FileSource, MemorySource, SeekableSource};
pub use progress::TraverseProgress;
pub use source::{DumpLayout, ImportError, TraverseStats};
pub use wikimedia::{ReaderState, SingleStreamReader};

use std::path::Path;

/// A stream of pages plus the site info read from the dump header
pub trait PageStream: Iterator<Item = Result<Page, ImportError>> + Send {
    fn site_info(&self) -> &SiteInfo;
}

impl PageStream for IndexedReader {
    fn site_info(&self) -> &SiteInfo {
        IndexedReader::site_info(self)
    }
}

impl PageStream for SingleStreamReader {
    fn site_info(&self) -> &SiteInfo {
        SingleStreamReader::site_info(self)
    }
}

/// Open a multistream dump and its index, decoding with `workers` threads
pub fn open_indexed(
    index: impl AsRef<Path>,
    payload: impl AsRef<Path>,
    workers: usize,
) -> Result<IndexedReader, ImportError> {
    IndexedReader::open(FileSource::open(index)?, FileSource::open(payload)?, workers)
}

/// Open any dump for sequential reading
pub fn open_single(payload: impl AsRef<Path>) -> Result<SingleStreamReader, ImportError> {
    SingleStreamReader::open(FileSource::open(payload)?)
}
