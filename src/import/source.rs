//! Core error type and statistics shared by the dump readers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading a dump
///
/// Index-side failures are fatal to a pooled read because later segment
/// offsets cannot be located without a trustworthy index. Segment and record
/// failures only cost the pages they affect; see [`ImportError::is_fatal`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed index line {line}: {reason}")]
    MalformedIndex { line: u64, reason: String },

    #[error("Index contains no entries")]
    EmptyIndex,

    #[error("Index read error: {0}")]
    IndexIo(#[source] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Invalid dump format: {0}")]
    InvalidFormat(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Segment at offset {offset} failed after {decoded} of {declared} pages: {reason}")]
    Segment {
        offset: i64,
        decoded: usize,
        declared: usize,
        reason: String,
    },

    #[error("Worker {worker} stopped: {reason}")]
    Worker { worker: usize, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<quick_xml::Error> for ImportError {
    fn from(e: quick_xml::Error) -> Self {
        match e {
            // Decompression and medium failures surface through the XML reader
            quick_xml::Error::Io(io) => ImportError::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => ImportError::XmlParse(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for ImportError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ImportError::XmlParse(e.to_string())
    }
}

impl ImportError {
    /// Whether this error ends the whole ingestion rather than a single page or segment
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::MalformedIndex { .. }
                | ImportError::EmptyIndex
                | ImportError::IndexIo(_)
                | ImportError::Config(_)
                | ImportError::Internal(_)
        )
    }

    /// Reclassify a medium failure met while reading the index
    pub(crate) fn on_index(self) -> Self {
        match self {
            ImportError::Io(e) => ImportError::IndexIo(e),
            other => other,
        }
    }

    /// Whether an I/O error means a corrupt or short compressed segment
    /// rather than a failing medium
    pub(crate) fn is_corrupt_data(e: &std::io::Error) -> bool {
        matches!(
            e.kind(),
            std::io::ErrorKind::InvalidData
                | std::io::ErrorKind::InvalidInput
                | std::io::ErrorKind::UnexpectedEof
        )
    }

    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        ImportError::MalformedIndex {
            line,
            reason: reason.into(),
        }
    }
}

/// Dump layout, chosen by the files the caller provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpLayout {
    /// One continuous stream, read sequentially
    SingleStream,
    /// Independently compressed segments addressed by a companion index
    Multistream,
}

impl DumpLayout {
    /// Detect layout from the dump file name
    pub fn detect(path: &std::path::Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();

        if name.contains("multistream") && !name.contains("index") {
            DumpLayout::Multistream
        } else {
            DumpLayout::SingleStream
        }
    }
}

/// Traversal statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraverseStats {
    /// Pages decoded successfully
    pub pages_read: u64,
    /// Per-page or per-segment errors reported by the reader
    pub errors: u64,
    /// Pages with parseable coordinates
    pub coords_found: u64,
    /// Pages whose coordinate template failed to parse
    pub coords_failed: u64,
    /// Processing time in seconds
    pub elapsed_seconds: f64,
    /// Pages per second
    pub pages_per_second: f64,
}

impl TraverseStats {
    /// Calculate pages per second
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.pages_per_second = self.pages_read as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_fatal_classification() {
        assert!(ImportError::malformed(3, "bad record").is_fatal());
        assert!(ImportError::EmptyIndex.is_fatal());
        assert!(!ImportError::Segment {
            offset: 10,
            decoded: 1,
            declared: 2,
            reason: "truncated".into(),
        }
        .is_fatal());
        assert!(!ImportError::XmlParse("oops".into()).is_fatal());
    }

    #[test]
    fn test_io_errors_on_index_are_fatal() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short index");
        let plain = ImportError::Io(eof);
        assert!(!plain.is_fatal());

        let on_index = plain.on_index();
        assert!(matches!(on_index, ImportError::IndexIo(_)));
        assert!(on_index.is_fatal());

        // Non-I/O index errors keep their own variant
        assert!(matches!(
            ImportError::EmptyIndex.on_index(),
            ImportError::EmptyIndex
        ));
    }

    #[test]
    fn test_corrupt_data_kinds() {
        use std::io::{Error, ErrorKind};
        assert!(ImportError::is_corrupt_data(&Error::new(ErrorKind::InvalidInput, "bad block")));
        assert!(ImportError::is_corrupt_data(&Error::new(ErrorKind::UnexpectedEof, "short")));
        assert!(!ImportError::is_corrupt_data(&Error::new(ErrorKind::Other, "disk gone")));
        assert!(!ImportError::is_corrupt_data(&Error::new(ErrorKind::PermissionDenied, "denied")));
    }

    #[test]
    fn test_layout_detection() {
        assert_eq!(
            DumpLayout::detect(Path::new("enwiki-latest-pages-articles-multistream.xml.bz2")),
            DumpLayout::Multistream
        );
        assert_eq!(
            DumpLayout::detect(Path::new("enwiki-latest-pages-articles.xml.bz2")),
            DumpLayout::SingleStream
        );
    }

    #[test]
    fn test_stats_rate() {
        let mut stats = TraverseStats {
            pages_read: 500,
            elapsed_seconds: 2.0,
            ..Default::default()
        };
        stats.update_rate();
        assert_eq!(stats.pages_per_second, 250.0);
    }
}
