//! Sequential reader for a whole Wikimedia XML dump
//!
//! Reads one continuous stream front to back. Works on plain XML, single
//! stream `.xml.bz2` dumps and multistream dumps (all concatenated bzip2
//! streams are decoded in turn).

use super::page::{Page, PageDecoder, SiteInfo};
use super::payload::{open_text, SeekableSource};
use super::source::ImportError;
use std::io::BufRead;

/// Default read buffer (1MB)
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Give up after this many consecutive decode errors without a page in between
const MAX_CONSECUTIVE_ERRORS: u32 = 64;

/// Where the reader is in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Site info has been read, no page requested yet
    MetadataRead,
    /// Looking for the next page
    Decoding,
    /// A page was just returned
    PageEmitted,
    /// Input is finished; `next()` keeps returning `None`
    Exhausted,
}

/// Pages from a single sequential stream
pub struct SingleStreamReader {
    decoder: PageDecoder<Box<dyn BufRead + Send>>,
    site_info: SiteInfo,
    state: ReaderState,
    pages_read: u64,
    consecutive_errors: u32,
}

impl SingleStreamReader {
    /// Open a payload, decompressing bzip2 if present, and read its site info
    pub fn open<S: SeekableSource>(source: S) -> Result<Self, ImportError> {
        tracing::info!("Opening dump {}", source.describe());
        let reader = open_text(source.open_reader()?, READ_BUFFER_SIZE)?;
        Self::from_reader(reader)
    }

    /// Read from an already decompressed XML stream
    pub fn from_reader(reader: Box<dyn BufRead + Send>) -> Result<Self, ImportError> {
        let mut decoder = PageDecoder::new(reader);
        let site_info = decoder.read_site_info()?;
        tracing::debug!(
            "Site info: {} ({} namespaces)",
            site_info.site_name,
            site_info.namespaces.len()
        );

        Ok(Self {
            decoder,
            site_info,
            state: ReaderState::MetadataRead,
            pages_read: 0,
            consecutive_errors: 0,
        })
    }

    pub fn site_info(&self) -> &SiteInfo {
        &self.site_info
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Pages returned so far
    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }
}

impl Iterator for SingleStreamReader {
    type Item = Result<Page, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ReaderState::Exhausted {
            return None;
        }
        self.state = ReaderState::Decoding;

        match self.decoder.next_page() {
            Ok(Some(page)) => {
                self.state = ReaderState::PageEmitted;
                self.pages_read += 1;
                self.consecutive_errors = 0;
                Some(Ok(page))
            }
            Ok(None) => {
                tracing::debug!("End of dump after {} pages", self.pages_read);
                self.state = ReaderState::Exhausted;
                None
            }
            Err(e @ ImportError::Io(_)) => {
                tracing::warn!("Read failed after {} pages: {}", self.pages_read, e);
                self.state = ReaderState::Exhausted;
                Some(Err(e))
            }
            Err(e) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    tracing::warn!("Too many consecutive decode errors, stopping");
                    self.state = ReaderState::Exhausted;
                }
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::payload::{FileSource, MemorySource};
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported for testing -->
<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/">
  <siteinfo>
    <sitename>Wikipedia</sitename>
    <base>https://en.wikipedia.org/wiki/Main_Page</base>
    <generator>MediaWiki 1.41</generator>
    <case>first-letter</case>
    <namespaces>
      <namespace key="0" case="first-letter" />
      <namespace key="1" case="first-letter">Talk</namespace>
    </namespaces>
  </siteinfo>
  <page>
    <title>Test Article</title>
    <ns>0</ns>
    <id>12345</id>
    <revision>
      <id>100</id>
      <timestamp>2024-01-15T10:30:00Z</timestamp>
      <contributor><username>Tester</username><id>7</id></contributor>
      <text>This is a '''test article''' about [[testing]].</text>
    </revision>
  </page>
  <page>
    <title>Another Article</title>
    <ns>0</ns>
    <id>12346</id>
    <revision>
      <id>101</id>
      <text>Another article.</text>
    </revision>
  </page>
  <page>
    <title>Talk:Test Article</title>
    <ns>1</ns>
    <id>12347</id>
    <revision>
      <id>102</id>
      <text>Discussion about the test article.</text>
    </revision>
  </page>
</mediawiki>
"#;

    fn titles(reader: SingleStreamReader) -> Vec<String> {
        reader.map(|p| p.unwrap().title).collect()
    }

    #[test]
    fn test_parse_sample_xml() {
        let mut reader = SingleStreamReader::open(MemorySource::from(SAMPLE_XML.as_bytes().to_vec())).unwrap();
        assert_eq!(reader.state(), ReaderState::MetadataRead);
        assert_eq!(reader.site_info().site_name, "Wikipedia");

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.id, 12345);
        assert_eq!(first.title, "Test Article");
        assert_eq!(first.revisions[0].contributor.username, "Tester");
        assert_eq!(reader.state(), ReaderState::PageEmitted);

        assert_eq!(reader.next().unwrap().unwrap().id, 12346);
        assert_eq!(reader.next().unwrap().unwrap().namespace, 1);
        assert!(reader.next().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(reader.next().is_none());
        assert_eq!(reader.pages_read(), 3);
    }

    #[test]
    fn test_reads_bzip2_file() {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE_XML.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(&compressed).unwrap();

        let source = FileSource::open(temp_file.path()).unwrap();
        let reader = SingleStreamReader::open(source).unwrap();
        assert_eq!(
            titles(reader),
            vec!["Test Article", "Another Article", "Talk:Test Article"]
        );
    }

    #[test]
    fn test_reading_twice_gives_same_pages() {
        let source = MemorySource::from(SAMPLE_XML.as_bytes().to_vec());
        let first: Vec<Page> = SingleStreamReader::open(source.clone())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let second: Vec<Page> = SingleStreamReader::open(source)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_error_does_not_end_stream() {
        let xml = SAMPLE_XML.replace("<id>12346</id>", "<id>not-a-number</id>");
        let reader = SingleStreamReader::open(MemorySource::from(xml.into_bytes())).unwrap();
        let results: Vec<_> = reader.collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ImportError::InvalidRecord(_))));
        assert_eq!(results[2].as_ref().unwrap().id, 12347);
    }

    #[test]
    fn test_missing_siteinfo_fails_open() {
        let xml = "<mediawiki><page><title>X</title></page></mediawiki>";
        let result = SingleStreamReader::open(MemorySource::from(xml.as_bytes().to_vec()));
        assert!(matches!(result, Err(ImportError::InvalidFormat(_))));
    }

    #[test]
    fn test_truncated_header_fails_open() {
        let cut = &SAMPLE_XML[..SAMPLE_XML.find("<namespaces>").unwrap()];
        let result = SingleStreamReader::open(MemorySource::from(cut.as_bytes().to_vec()));
        assert!(result.is_err());
    }
}
